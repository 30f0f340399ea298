//! Runs every stage of every layer in order, one generator at a time, then
//! classifies the finished layers into a world map.

use log::{debug, info, warn};

use super::WorldMap;
use super::specs::{GenerationStage, StageKind, WorldGenSpecs};
use super::tile::WorldTile;
use crate::driver::GenerationJob;
use crate::error::GenError;
use crate::generators::{
    BspGenerator, CaGenerator, FillGenerator, FillParams, GenContext, LevelGenerator,
    RoomGenerator,
};
use crate::grid::Grid;
use crate::output::MapInfo;
use crate::random::{RandomSource, mix_seed_stream};
use crate::types::{Coordinate, TileType};

const INPUT_LAYER: &str = "input_layer";

/// One instance per kind, reconfigured for every stage that uses it.
#[derive(Clone, Debug, Default)]
struct StageGenerators {
    ca: CaGenerator,
    bsp: BspGenerator,
    room: RoomGenerator,
    fill: FillGenerator,
}

impl StageGenerators {
    fn get(&mut self, kind: StageKind) -> &mut dyn LevelGenerator {
        match kind {
            StageKind::Ca => &mut self.ca,
            StageKind::Bsp => &mut self.bsp,
            StageKind::Room => &mut self.room,
            StageKind::Fill => &mut self.fill,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ActiveStage {
    kind: StageKind,
    input_layer: usize,
}

pub struct WorldGenerator {
    specs: WorldGenSpecs,
    seed: u64,
    random: RandomSource,
    layers: Vec<Grid>,
    map_info: Vec<MapInfo>,
    generators: StageGenerators,
    current_layer: usize,
    current_stage: usize,
    active: Option<ActiveStage>,
    finished: bool,
}

impl WorldGenerator {
    pub fn new(specs: WorldGenSpecs, seed: u64) -> Result<Self, GenError> {
        specs.validate()?;
        let mut generator = Self {
            specs,
            seed,
            random: RandomSource::new(mix_seed_stream(seed, 0)),
            layers: Vec::new(),
            map_info: Vec::new(),
            generators: StageGenerators::default(),
            current_layer: 0,
            current_stage: 0,
            active: None,
            finished: false,
        };
        generator.initiate();
        Ok(generator)
    }

    /// Resets every layer to `A` and rewinds to the first stage.
    pub fn initiate(&mut self) {
        self.layers = (0..self.specs.layers.len())
            .map(|index| {
                let size = self.specs.layer_size(index);
                Grid::filled(size.x, size.y, TileType::A)
            })
            .collect();
        self.map_info = vec![MapInfo::default(); self.layers.len()];
        self.random = RandomSource::new(mix_seed_stream(self.seed, 0));
        self.current_layer = 0;
        self.current_stage = 0;
        self.active = None;
        self.finished = false;
        self.skip_empty_layers();
    }

    pub fn specs(&self) -> &WorldGenSpecs {
        &self.specs
    }

    pub fn layers(&self) -> &[Grid] {
        &self.layers
    }

    /// Rooms, corridors and caves produced on each layer.
    pub fn map_info(&self) -> &[MapInfo] {
        &self.map_info
    }

    pub fn current_layer(&self) -> usize {
        self.current_layer.min(self.layers.len().saturating_sub(1))
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn step(&mut self, frames: u32) -> Result<(), GenError> {
        if self.finished {
            return Err(GenError::AlreadyFinished { generator: "World Generator".to_string() });
        }
        let active = match self.active {
            Some(active) => active,
            None => self.configure_stage(),
        };

        let layer = self.current_layer;
        let generator = self.generators.get(active.kind);
        if active.input_layer < layer {
            let (earlier, rest) = self.layers.split_at_mut(layer);
            let input = &earlier[active.input_layer];
            let mut ctx = GenContext::with_input(&mut rest[0], input, &mut self.random);
            generator.run_generation_frames(&mut ctx, frames)?;
        } else {
            let mut ctx = GenContext::new(&mut self.layers[layer], &mut self.random);
            generator.run_generation_frames(&mut ctx, frames)?;
        }

        if generator.is_finished() {
            let output = generator.output(&self.layers[layer]);
            self.map_info[layer].merge(output.map_info);
            debug!("layer {layer} stage {} ({}) finished", self.current_stage, generator.name());
            self.active = None;
            self.current_stage += 1;
            self.skip_empty_layers();
        }
        Ok(())
    }

    pub fn run_to_completion(&mut self) -> Result<(), GenError> {
        while !self.finished {
            self.step(u32::MAX)?;
        }
        Ok(())
    }

    /// Moves past exhausted layers; marks the world finished after the last.
    fn skip_empty_layers(&mut self) {
        while self.current_layer < self.specs.layers.len()
            && self.current_stage >= self.specs.layers[self.current_layer].stages.len()
        {
            self.current_layer += 1;
            self.current_stage = 0;
        }
        if self.current_layer >= self.specs.layers.len() && !self.finished {
            self.finished = true;
            info!("world generation finished with {} layers", self.layers.len());
        }
    }

    fn configure_stage(&mut self) -> ActiveStage {
        let layer = self.current_layer;
        let stage = self.specs.layers[layer].stages[self.current_stage].clone();
        let (input_layer, unknown) = self.apply_stage(&stage);
        for name in unknown {
            warn!("invalid parameter name for {:?} generation: {name}", stage.kind);
        }

        let bounds = stage.resolve_bounds(self.layers[layer].bounds());
        let generator = self.generators.get(stage.kind);
        generator.setup(&self.layers[layer], bounds);
        debug!(
            "layer {layer} stage {} runs {} over {bounds:?}",
            self.current_stage,
            generator.name()
        );

        let active = ActiveStage { kind: stage.kind, input_layer };
        self.active = Some(active);
        active
    }

    /// Configures the generator for `stage` from the defaults plus its
    /// parameters. Returns the layer to read from and the names that were
    /// not recognized.
    fn apply_stage(&mut self, stage: &GenerationStage) -> (usize, Vec<String>) {
        let layer = self.current_layer;
        let mut input_layer = layer;
        let mut unknown = Vec::new();
        let defaults = &self.specs.defaults;

        let mut ca = defaults.ca.clone();
        let mut bsp = defaults.bsp.clone();
        let mut room = defaults.room.clone();
        for param in &stage.parameters {
            if param.name == INPUT_LAYER {
                input_layer = resolve_input_layer(param.value, layer);
                continue;
            }
            let known = match stage.kind {
                StageKind::Ca => ca.apply_param(&param.name, param.value),
                StageKind::Bsp => bsp.apply_param(&param.name, param.value),
                StageKind::Room => room.apply_param(&param.name, param.value),
                StageKind::Fill => false,
            };
            if !known {
                unknown.push(param.name.clone());
            }
        }

        let mask = stage.valid_input_tiles;
        let output = stage.output_tile_type;
        match stage.kind {
            StageKind::Ca => {
                ca.valid_base_tiles = mask;
                ca.fill_tile_type = output;
                self.generators.ca.apply_params(ca);
            }
            StageKind::Bsp => {
                bsp.valid_base_tiles = mask;
                bsp.fill_tile_type = output;
                self.generators.bsp.apply_params(bsp);
            }
            StageKind::Room => {
                room.valid_base_tiles = mask;
                room.fill_tile_type = output;
                self.generators.room.apply_params(room);
            }
            StageKind::Fill => {
                self.generators
                    .fill
                    .apply_params(FillParams { valid_base_tiles: mask, fill_tile_type: output });
            }
        }
        (input_layer, unknown)
    }

    /// Builds the macro-tile map from the finished layers.
    pub fn classify(&self) -> Result<WorldMap, GenError> {
        let classification = &self.specs.classification;
        let terrain_layer = self.layers.get(classification.terrain_layer).ok_or_else(|| {
            GenError::InvalidConfig(format!(
                "terrain layer {} does not exist",
                classification.terrain_layer
            ))
        })?;

        let mut tiles = Vec::with_capacity(terrain_layer.tiles().len());
        for y in 0..terrain_layer.height() {
            for x in 0..terrain_layer.width() {
                let coord = Coordinate::new(x, y);
                let tile = terrain_layer.tile_at(coord)?;
                let mut world_tile = WorldTile::new(classification.terrain_for(tile));
                for rule in &classification.traits {
                    let source = self.layers.get(rule.layer).and_then(|layer| layer.get(coord));
                    if source == Some(rule.tile) {
                        world_tile.add_trait(rule.tile_trait);
                    }
                }
                tiles.push(world_tile);
            }
        }
        Ok(WorldMap::new(
            terrain_layer.width(),
            terrain_layer.height(),
            tiles,
            self.seed,
            self.specs.world_info.clone(),
        ))
    }
}

/// Rounds a requested input layer; anything but an earlier or the current
/// layer falls back to the current one.
fn resolve_input_layer(value: f32, current: usize) -> usize {
    let requested = value.round();
    if requested >= 0.0 && (requested as usize) <= current {
        requested as usize
    } else {
        warn!("input_layer {requested} is not an earlier layer; reading layer {current} instead");
        current
    }
}

impl GenerationJob for WorldGenerator {
    fn name(&self) -> &str {
        "World Generator"
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn step(&mut self, frames: u32) -> Result<(), GenError> {
        WorldGenerator::step(self, frames)
    }

    fn active_layer(&self) -> usize {
        self.current_layer()
    }

    fn grid(&self, layer: usize) -> Option<&Grid> {
        self.layers.get(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::IntegerVector;
    use crate::types::TileTypeSet;
    use crate::world::specs::{GenerationLayer, GenerationParam, TraitRule};
    use crate::world::tile::{Terrain, TileTrait};

    fn stage(kind: StageKind, parameters: Vec<GenerationParam>) -> GenerationStage {
        GenerationStage { kind, parameters, ..GenerationStage::default() }
    }

    fn specs(layers: Vec<GenerationLayer>) -> WorldGenSpecs {
        WorldGenSpecs { map_size: IntegerVector::new(32, 24), layers, ..WorldGenSpecs::default() }
    }

    #[test]
    fn later_layer_reads_its_mask_from_an_earlier_layer() {
        let mut fill = stage(StageKind::Fill, vec![GenerationParam::new("input_layer", 0.0)]);
        fill.valid_input_tiles = TileTypeSet::from(TileType::B);
        fill.output_tile_type = TileType::C;
        let base = GenerationStage {
            kind: StageKind::Fill,
            size: IntegerVector::new(10, 0),
            output_tile_type: TileType::B,
            ..GenerationStage::default()
        };
        let specs = specs(vec![
            GenerationLayer { size: None, stages: vec![base] },
            GenerationLayer { size: None, stages: vec![fill] },
        ]);
        let mut world = WorldGenerator::new(specs, 1).unwrap();
        world.run_to_completion().unwrap();

        let second = &world.layers()[1];
        for coord in second.coordinates_in_rect(second.bounds(), false) {
            let expected = if coord.x < 10 { TileType::C } else { TileType::A };
            assert_eq!(second.cell(coord.x, coord.y), expected);
        }
    }

    #[test]
    fn unknown_parameters_and_bad_input_layers_do_not_stop_generation() {
        let specs = specs(vec![GenerationLayer {
            size: Some(IntegerVector::new(16, 16)),
            stages: vec![
                stage(StageKind::Ca, vec![
                    GenerationParam::new("not_a_param", 3.0),
                    GenerationParam::new("input_layer", 7.0),
                    GenerationParam::new("max_caves", 1.0),
                ]),
                stage(StageKind::Room, vec![GenerationParam::new("num_rooms", 2.0)]),
            ],
        }]);
        let mut world = WorldGenerator::new(specs, 9).unwrap();
        world.run_to_completion().unwrap();
        assert!(world.is_finished());
        assert_eq!(world.layers()[0].width(), 16);
        assert!(world.map_info()[0].caves.len() <= 1);
        assert!(!world.map_info()[0].rooms.is_empty());
        assert!(matches!(world.step(1), Err(GenError::AlreadyFinished { .. })));
    }

    #[test]
    fn reinitiating_reproduces_the_same_layers() {
        let specs = specs(vec![GenerationLayer {
            size: None,
            stages: vec![stage(StageKind::Bsp, Vec::new()), stage(StageKind::Ca, Vec::new())],
        }]);
        let mut world = WorldGenerator::new(specs, 77).unwrap();
        world.run_to_completion().unwrap();
        let first = world.layers()[0].fingerprint();
        world.initiate();
        assert!(!world.is_finished());
        world.run_to_completion().unwrap();
        assert_eq!(world.layers()[0].fingerprint(), first);
    }

    #[test]
    fn classification_applies_terrain_and_traits() {
        let mut forest = stage(StageKind::Fill, Vec::new());
        forest.size = IntegerVector::new(4, 4);
        forest.output_tile_type = TileType::B;
        let mut specs = specs(vec![
            GenerationLayer { size: None, stages: Vec::new() },
            GenerationLayer { size: None, stages: vec![forest] },
        ]);
        specs.classification.traits.push(TraitRule {
            layer: 1,
            tile: TileType::B,
            tile_trait: TileTrait::Forest,
        });
        let mut world = WorldGenerator::new(specs, 2).unwrap();
        world.run_to_completion().unwrap();
        let map = world.classify().unwrap();
        assert_eq!(map.width(), 32);
        let corner = map.tile(0, 0).unwrap();
        assert_eq!(corner.terrain, Terrain::Water);
        assert!(corner.has_trait(TileTrait::Forest));
        assert!(!map.tile(10, 10).unwrap().has_trait(TileTrait::Forest));
    }
}
