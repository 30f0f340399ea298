use std::fmt::Write as _;
use std::fs;

use proptest::prelude::*;
use tilegen_tools::{load_world_specs, run_world};

const KINDS: [&str; 4] = ["ca", "bsp", "room", "fill"];

fn stage_toml(kind: &str, value: f32) -> String {
    let parameter = match kind {
        "ca" => Some(("initial_chance", value)),
        "bsp" => Some(("min_leaf_size", 4.0 + value * 8.0)),
        "room" => Some(("num_rooms", 1.0 + value * 6.0)),
        _ => None,
    };
    let parameter = parameter.map_or(String::new(), |(name, value)| {
        format!("parameters = [{{ name = \"{name}\", value = {value:.3} }}]\n")
    });
    format!(
        "[[layers.stages]]\nkind = \"{kind}\"\nvalid_input_tiles = [\"A\"]\n\
         output_tile_type = \"B\"\n{parameter}"
    )
}

fn specs_toml(width: i32, height: i32, kinds: &[&str], value: f32, max_caves: i32) -> String {
    let mut text = format!("map_size = {{ x = {width}, y = {height} }}\n\n[[layers]]\n");
    for kind in kinds {
        text.push_str(&stage_toml(kind, value));
    }
    writeln!(
        text,
        "[[layers.stages]]\nkind = \"ca\"\nvalid_input_tiles = [\"A\"]\noutput_tile_type = \"C\"\n\
         parameters = [{{ name = \"max_caves\", value = {max_caves} }}]"
    )
    .expect("Failed to format stage");
    text.push_str(
        "\n[classification]\nterrain_layer = 0\n\
         terrain = [\n  { tile = \"A\", terrain = \"water\" },\n\
           { tile = \"B\", terrain = \"plains\" },\n]\n\
         \n[world_info]\nsub_grid_size = 8\n",
    );
    text
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_generated_specs_load_and_run_to_completion(
        width in 16i32..40,
        height in 16i32..40,
        kinds in prop::collection::vec(prop::sample::select(KINDS.to_vec()), 1..3),
        value in 0.0f32..1.0,
        max_caves in -1i32..4,
        seed in any::<u64>(),
        steps in 1u32..64,
    ) {
        let temp = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp.path().join("world.toml");
        fs::write(&path, specs_toml(width, height, &kinds, value, max_caves))
            .expect("Failed to write specs file");

        let specs = load_world_specs(&path).expect("generated specs should load");
        prop_assert_eq!(specs.layers.len(), 1);
        prop_assert_eq!(specs.layers[0].stages.len(), kinds.len() + 1);

        let (world, map) = run_world(specs, seed, steps).expect("world should generate");
        prop_assert_eq!((map.width(), map.height()), (width, height));
        let layer = &world.layers()[0];
        prop_assert_eq!((layer.width(), layer.height()), (width, height));
    }
}
