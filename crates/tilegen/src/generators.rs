//! Generator trait, the state every generator shares, and the run-to-completion helper.

pub mod bsp;
pub mod ca;
pub mod composite;
pub mod fill;
pub mod room;

use crate::error::GenError;
use crate::grid::{Grid, GridSubset};
use crate::math::IntegerRect;
use crate::output::GenerationOutput;
use crate::phase::PhaseSchedule;
use crate::random::RandomSource;
use crate::types::{Coordinate, TileType, TileTypeSet};

pub use bsp::{BspGenerator, BspNode, BspParams, BspPhase, NodeId};
pub use ca::{CaGenerator, CaParams, CaPhase};
pub use composite::{ChildGenerator, ChildSpec, CompositeGenerator, CompositePhase};
pub use fill::{FillGenerator, FillParams};
pub use room::{RoomGenerator, RoomParams};

/// Everything a generator touches while running: the map it writes, an
/// optional separate map it reads its valid-input mask from, and the shared
/// random stream.
pub struct GenContext<'a> {
    pub map: &'a mut Grid,
    pub input: Option<&'a Grid>,
    pub random: &'a mut RandomSource,
}

impl<'a> GenContext<'a> {
    pub fn new(map: &'a mut Grid, random: &'a mut RandomSource) -> Self {
        Self { map, input: None, random }
    }

    pub fn with_input(map: &'a mut Grid, input: &'a Grid, random: &'a mut RandomSource) -> Self {
        Self { map, input: Some(input), random }
    }

    /// Snapshot of the read source (the map itself when no input is set).
    pub fn input_snapshot(&self, bounds: IntegerRect) -> GridSubset {
        match self.input {
            Some(input) => input.copy_of_grid_rect(bounds),
            None => self.map.copy_of_grid_rect(bounds),
        }
    }
}

pub trait LevelGenerator {
    fn name(&self) -> &str;

    fn bounds(&self) -> IntegerRect;

    /// Rebuilds the phase list and clears per-run state. Bounds are clipped
    /// to the map.
    fn setup(&mut self, map: &Grid, bounds: IntegerRect);

    fn is_finished(&self) -> bool;

    /// Runs the current phase with a budget of `frames` work units. Errors
    /// when the generator has already finished.
    fn run_generation_frames(
        &mut self,
        ctx: &mut GenContext<'_>,
        frames: u32,
    ) -> Result<(), GenError>;

    fn output(&self, map: &Grid) -> GenerationOutput;
}

/// Sets up `generator` over `bounds` and runs it to completion with an
/// unlimited budget per call.
pub fn generate_entire_map<G: LevelGenerator + ?Sized>(
    generator: &mut G,
    ctx: &mut GenContext<'_>,
    bounds: IntegerRect,
) -> Result<GenerationOutput, GenError> {
    generator.setup(ctx.map, bounds);
    while !generator.is_finished() {
        generator.run_generation_frames(ctx, u32::MAX)?;
    }
    Ok(generator.output(ctx.map))
}

#[derive(Clone, Debug)]
pub(crate) struct GeneratorCore<K> {
    pub(crate) name: String,
    pub(crate) bounds: IntegerRect,
    pub(crate) open_tile_type: TileType,
    pub(crate) schedule: PhaseSchedule<K>,
}

impl<K: Copy> GeneratorCore<K> {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bounds: IntegerRect::default(),
            open_tile_type: TileType::B,
            schedule: PhaseSchedule::default(),
        }
    }

    pub(crate) fn reset(&mut self, map: &Grid, bounds: IntegerRect) {
        self.bounds = bounds.intersection(&map.bounds());
        self.schedule.clear();
    }

    pub(crate) fn begin_frame(&mut self) -> Result<K, GenError> {
        self.schedule.begin_frame(&self.name)
    }

    pub(crate) fn base_output(&self, map: &Grid) -> GenerationOutput {
        let open_tiles = map.list_of_coordinates_of_type(self.bounds, self.open_tile_type, false);
        GenerationOutput::new(map.clone(), open_tiles)
    }
}

pub(crate) fn accepts(snapshot: &GridSubset, mask: TileTypeSet, coord: Coordinate) -> bool {
    snapshot.at(coord).is_some_and(|tile| mask.contains(tile))
}

/// Work units a phase may consume this call.
pub(crate) fn budget(frames: u32) -> usize {
    usize::try_from(frames).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_clips_bounds_to_the_map() {
        let map = Grid::new(10, 8);
        let mut generator = FillGenerator::default();
        generator.setup(&map, IntegerRect::new(-2, 4, 30, 30));
        assert_eq!(generator.bounds(), IntegerRect::new(0, 4, 10, 4));
    }

    #[test]
    fn finished_generator_rejects_more_frames() {
        let mut map = Grid::new(6, 6);
        let mut random = RandomSource::new(5);
        let mut ctx = GenContext::new(&mut map, &mut random);
        let mut generator = FillGenerator::default();
        let bounds = ctx.map.bounds();
        generate_entire_map(&mut generator, &mut ctx, bounds).unwrap();
        assert!(matches!(
            generator.run_generation_frames(&mut ctx, 1),
            Err(GenError::AlreadyFinished { .. })
        ));
    }
}
