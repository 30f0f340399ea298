//! Loading, running and rendering shared by the `tilegen-tools` and `soak`
//! binaries.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use env_logger::{Builder, Env};
use log::debug;
use serde::{Deserialize, Serialize};
use tilegen::{
    GenerationDriver, GenerationJob, GenerationOutput, Grid, IntegerRect, LevelGenInput,
    LevelGenJob, LevelGenSettings, WorldGenSpecs, WorldGenerator, WorldMap,
};

/// The world specs shipped with the tools.
pub const DEFAULT_WORLD_SPECS: &str = include_str!("../specs/default_world.toml");

pub fn init_logging() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Ascii,
    Json,
}

/// A level request as read from disk: what to generate plus the generator
/// settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub input: LevelGenInput,
    pub settings: LevelGenSettings,
}

pub fn load_level_config(path: &Path) -> Result<LevelConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read level config: {}", path.display()))?;
    toml::from_str(&text)
        .with_context(|| format!("Failed to parse level config: {}", path.display()))
}

pub fn load_world_specs(path: &Path) -> Result<WorldGenSpecs> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read world specs: {}", path.display()))?;
    WorldGenSpecs::from_toml_str(&text)
        .with_context(|| format!("Invalid world specs: {}", path.display()))
}

/// Runs any job to completion through a driver, logging each tick.
fn drive<J: GenerationJob>(job: J, steps_per_update: u32) -> Result<J> {
    let mut driver = GenerationDriver::new(job, steps_per_update);
    driver.add_listener(|report| {
        debug!("tick on layer {}: {} cells changed", report.layer, report.changed.len());
    });
    let ticks = driver.run_to_completion()?;
    debug!("{} finished after {ticks} ticks", driver.job().name());
    Ok(driver.into_job())
}

pub fn run_level(
    config: &LevelConfig,
    seed: u64,
    steps_per_update: u32,
) -> Result<GenerationOutput> {
    let job = LevelGenJob::new(config.input.clone(), &config.settings, seed)
        .context("Failed to set up level generation")?;
    let job = drive(job, steps_per_update)?;
    Ok(job.output())
}

/// Generates every layer and classifies the result into macro-tiles.
pub fn run_world(
    specs: WorldGenSpecs,
    seed: u64,
    steps_per_update: u32,
) -> Result<(WorldGenerator, WorldMap)> {
    let world = WorldGenerator::new(specs, seed).context("Failed to set up world generation")?;
    let world = drive(world, steps_per_update)?;
    let map = world.classify().context("Failed to classify world layers")?;
    Ok((world, map))
}

pub fn render_level(output: &GenerationOutput, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(output).context("Failed to serialize level output")
        }
        OutputFormat::Ascii => {
            let mut text = output.grid.to_ascii();
            let info = &output.map_info;
            writeln!(
                text,
                "rooms: {}  corridors: {}  caves: {}  open tiles: {}",
                info.rooms.len(),
                info.corridors.len(),
                info.caves.len(),
                output.open_tiles.len()
            )?;
            Ok(text)
        }
    }
}

#[derive(Serialize)]
struct WorldReport<'a> {
    layers: &'a [Grid],
    map: &'a WorldMap,
}

/// Terrain glyphs for the macro-tile map, one row per line.
pub fn world_to_ascii(map: &WorldMap) -> String {
    let mut text = String::new();
    for y in 0..map.height() {
        for x in 0..map.width() {
            text.push(map.tile(x, y).map_or(' ', |tile| tile.terrain.glyph()));
        }
        text.push('\n');
    }
    text
}

pub fn render_world(
    world: &WorldGenerator,
    map: &WorldMap,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let report = WorldReport { layers: world.layers(), map };
            serde_json::to_string_pretty(&report).context("Failed to serialize world")
        }
        OutputFormat::Ascii => {
            let mut text = String::new();
            for (index, layer) in world.layers().iter().enumerate() {
                writeln!(text, "layer {index} ({}x{})", layer.width(), layer.height())?;
                text.push_str(&layer.to_ascii());
            }
            writeln!(text, "terrain")?;
            text.push_str(&world_to_ascii(map));
            Ok(text)
        }
    }
}

/// Initializes the terrain around one macro-tile and renders its detail grid.
pub fn render_tile_detail(map: &mut WorldMap, x: i32, y: i32) -> Result<String> {
    map.initialize_around(IntegerRect::new(x, y, 1, 1));
    let tile = map.tile(x, y).with_context(|| format!("No world tile at ({x}, {y})"))?;
    let detail = tile.detail().with_context(|| format!("Tile ({x}, {y}) has no detail"))?;
    let mut text = format!("tile ({x}, {y}): {:?} {:?}\n", tile.terrain, tile.traits());
    text.push_str(&detail.to_ascii());
    writeln!(text, "features: {}", detail.features().len())?;
    Ok(text)
}
