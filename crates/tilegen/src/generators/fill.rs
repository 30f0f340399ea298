//! Single-phase generator that paints every accepted cell in its bounds.

use serde::{Deserialize, Serialize};

use super::{GenContext, GeneratorCore, LevelGenerator};
use crate::error::GenError;
use crate::grid::Grid;
use crate::math::IntegerRect;
use crate::output::GenerationOutput;
use crate::types::{TileType, TileTypeSet};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillParams {
    pub valid_base_tiles: TileTypeSet,
    pub fill_tile_type: TileType,
}

impl Default for FillParams {
    fn default() -> Self {
        Self { valid_base_tiles: TileTypeSet::ALL, fill_tile_type: TileType::B }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillPhase {
    Fill,
}

#[derive(Clone, Debug)]
pub struct FillGenerator {
    core: GeneratorCore<FillPhase>,
    params: FillParams,
}

impl Default for FillGenerator {
    fn default() -> Self {
        Self::new(FillParams::default())
    }
}

impl FillGenerator {
    pub fn new(params: FillParams) -> Self {
        Self { core: GeneratorCore::new("Fill Generator"), params }
    }

    pub fn apply_params(&mut self, params: FillParams) {
        self.params = params;
    }

    pub fn params(&self) -> &FillParams {
        &self.params
    }
}

impl LevelGenerator for FillGenerator {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn bounds(&self) -> IntegerRect {
        self.core.bounds
    }

    fn setup(&mut self, map: &Grid, bounds: IntegerRect) {
        self.core.reset(map, bounds);
        self.core.schedule.push(FillPhase::Fill);
    }

    fn is_finished(&self) -> bool {
        self.core.schedule.is_finished()
    }

    fn run_generation_frames(
        &mut self,
        ctx: &mut GenContext<'_>,
        _frames: u32,
    ) -> Result<(), GenError> {
        match self.core.begin_frame()? {
            FillPhase::Fill => {
                ctx.map.fill_matching_tiles_in_rect(
                    self.core.bounds,
                    self.params.fill_tile_type,
                    self.params.valid_base_tiles,
                    ctx.input,
                );
                self.core.schedule.next_phase();
            }
        }
        Ok(())
    }

    fn output(&self, map: &Grid) -> GenerationOutput {
        self.core.base_output(map)
    }
}
