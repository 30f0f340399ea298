//! Single-level generation: pick a map size, configure one generator and own
//! the map it writes.

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::GenError;
use crate::generators::{
    BspGenerator, BspParams, CaGenerator, CaParams, GenContext, LevelGenerator, RoomGenerator,
    RoomParams,
};
use crate::grid::Grid;
use crate::math::{IntegerRect, IntegerVector};
use crate::output::GenerationOutput;
use crate::random::RandomSource;
use crate::types::TileType;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelGenKind {
    #[default]
    Ca,
    Bsp,
    Room,
}

/// What kind of level to build and the sizes it may come in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelGenInput {
    pub kind: LevelGenKind,
    pub map_sizes: Vec<IntegerVector>,
    /// Inclusive range; `x` is the low end.
    pub num_rooms_range: IntegerVector,
}

impl Default for LevelGenInput {
    fn default() -> Self {
        Self {
            kind: LevelGenKind::Ca,
            map_sizes: vec![IntegerVector::new(48, 32)],
            num_rooms_range: IntegerVector::new(3, 6),
        }
    }
}

/// Manager-level settings shared by every job.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelGenSettings {
    /// Cells kept out of the generator's bounds on every side.
    pub border: i32,
    pub ca: CaParams,
    pub bsp: BspParams,
    pub room: RoomParams,
}

pub struct LevelGenJob {
    input: LevelGenInput,
    map: Grid,
    generator: Box<dyn LevelGenerator>,
    random: RandomSource,
}

impl LevelGenJob {
    pub fn new(
        input: LevelGenInput,
        settings: &LevelGenSettings,
        seed: u64,
    ) -> Result<Self, GenError> {
        if input.map_sizes.is_empty() {
            return Err(GenError::InvalidConfig("level input lists no map sizes".to_string()));
        }
        let mut random = RandomSource::new(seed);

        let mut generator: Box<dyn LevelGenerator> = match input.kind {
            LevelGenKind::Ca => {
                Box::new(CaGenerator::new(CaParams { max_caves: 1, ..settings.ca.clone() }))
            }
            LevelGenKind::Bsp => Box::new(BspGenerator::new(settings.bsp.clone())),
            LevelGenKind::Room => {
                let range = input.num_rooms_range;
                let number_of_rooms = random.range_inclusive(range.x, range.y);
                let params = RoomParams { number_of_rooms, ..settings.room.clone() };
                Box::new(RoomGenerator::new(params))
            }
        };

        let size = input.map_sizes[random.index(input.map_sizes.len())];
        if size.x <= 0 || size.y <= 0 {
            return Err(GenError::InvalidConfig(format!(
                "map size {}x{} must be positive",
                size.x, size.y
            )));
        }
        let map = Grid::filled(size.x, size.y, TileType::A);
        let bounds = IntegerRect::new(
            settings.border,
            settings.border,
            size.x - settings.border * 2,
            size.y - settings.border * 2,
        );
        generator.setup(&map, bounds);

        Ok(Self { input, map, generator, random })
    }

    pub fn input(&self) -> &LevelGenInput {
        &self.input
    }

    pub fn map(&self) -> &Grid {
        &self.map
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    pub fn is_finished(&self) -> bool {
        self.generator.is_finished()
    }

    pub fn step(&mut self, frames: u32) -> Result<(), GenError> {
        let mut ctx = GenContext::new(&mut self.map, &mut self.random);
        self.generator.run_generation_frames(&mut ctx, frames)?;
        if self.generator.is_finished() {
            info!(
                "{} finished a {}x{} level",
                self.generator.name(),
                self.map.width(),
                self.map.height()
            );
        }
        Ok(())
    }

    pub fn run_to_completion(&mut self) -> Result<GenerationOutput, GenError> {
        while !self.is_finished() {
            self.step(u32::MAX)?;
        }
        Ok(self.output())
    }

    /// The generator's output tagged with the input that produced it.
    pub fn output(&self) -> GenerationOutput {
        let mut output = self.generator.output(&self.map);
        output.input = Some(self.input.clone());
        output
    }
}
