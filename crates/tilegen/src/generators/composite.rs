//! Runs an ordered list of child generators one after another over the same
//! map and concatenates their map info.

use super::{
    BspGenerator, BspParams, CaGenerator, CaParams, FillGenerator, FillParams, GenContext,
    GeneratorCore, LevelGenerator, RoomGenerator, RoomParams,
};
use crate::error::GenError;
use crate::grid::Grid;
use crate::math::IntegerRect;
use crate::output::{GenerationOutput, MapInfo};

/// One child run. `bounds_reduction` shrinks the composite's bounds on every
/// side before the child is set up.
#[derive(Clone, Debug, PartialEq)]
pub enum ChildSpec {
    Ca { params: CaParams, bounds_reduction: i32 },
    Bsp { params: BspParams, bounds_reduction: i32 },
    Room { params: RoomParams, bounds_reduction: i32 },
    Fill { params: FillParams, bounds_reduction: i32 },
}

impl ChildSpec {
    pub fn bounds_reduction(&self) -> i32 {
        match self {
            ChildSpec::Ca { bounds_reduction, .. }
            | ChildSpec::Bsp { bounds_reduction, .. }
            | ChildSpec::Room { bounds_reduction, .. }
            | ChildSpec::Fill { bounds_reduction, .. } => *bounds_reduction,
        }
    }

    fn build(&self) -> ChildGenerator {
        match self {
            ChildSpec::Ca { params, .. } => ChildGenerator::Ca(CaGenerator::new(params.clone())),
            ChildSpec::Bsp { params, .. } => ChildGenerator::Bsp(BspGenerator::new(params.clone())),
            ChildSpec::Room { params, .. } => {
                ChildGenerator::Room(RoomGenerator::new(params.clone()))
            }
            ChildSpec::Fill { params, .. } => {
                ChildGenerator::Fill(FillGenerator::new(params.clone()))
            }
        }
    }
}

/// A child generator held by a composite for the composite's whole life.
#[derive(Clone, Debug)]
pub enum ChildGenerator {
    Ca(CaGenerator),
    Bsp(BspGenerator),
    Room(RoomGenerator),
    Fill(FillGenerator),
}

impl ChildGenerator {
    pub fn as_generator(&mut self) -> &mut dyn LevelGenerator {
        match self {
            ChildGenerator::Ca(generator) => generator,
            ChildGenerator::Bsp(generator) => generator,
            ChildGenerator::Room(generator) => generator,
            ChildGenerator::Fill(generator) => generator,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositePhase {
    Init(usize),
    Run(usize),
    Cleanup,
}

#[derive(Clone, Debug)]
pub struct CompositeGenerator {
    core: GeneratorCore<CompositePhase>,
    children: Vec<ChildSpec>,
    generators: Vec<ChildGenerator>,
    active: Option<usize>,
    collected: MapInfo,
}

impl CompositeGenerator {
    pub fn new(name: &str, children: Vec<ChildSpec>) -> Self {
        let generators = children.iter().map(ChildSpec::build).collect();
        Self {
            core: GeneratorCore::new(name),
            children,
            generators,
            active: None,
            collected: MapInfo::default(),
        }
    }

    /// Several CA passes over the same bounds, producing nested splotches.
    pub fn multi_ca(params: Vec<CaParams>) -> Self {
        let children = params
            .into_iter()
            .map(|params| ChildSpec::Ca { params, bounds_reduction: 0 })
            .collect();
        Self::new("Multi CA Generator", children)
    }

    /// CA passes followed by rooms placed on top.
    pub fn ca_plus_room(ca_params: Vec<CaParams>, room_params: RoomParams) -> Self {
        let mut children: Vec<ChildSpec> = ca_params
            .into_iter()
            .map(|params| ChildSpec::Ca { params, bounds_reduction: 0 })
            .collect();
        children.push(ChildSpec::Room { params: room_params, bounds_reduction: 0 });
        Self::new("CA + Room Generator", children)
    }

    /// A BSP layout with a CA pass over a smaller inner region.
    pub fn bsp_plus_ca(
        bsp_params: BspParams,
        ca_params: CaParams,
        bsp_reduction: i32,
        ca_reduction: i32,
    ) -> Self {
        Self::new(
            "BSP + CA Generator",
            vec![
                ChildSpec::Bsp { params: bsp_params, bounds_reduction: bsp_reduction },
                ChildSpec::Ca { params: ca_params, bounds_reduction: ca_reduction },
            ],
        )
    }

    /// The specs the children were built from.
    pub fn children(&self) -> &[ChildSpec] {
        &self.children
    }

    /// The held child at `index`. Parameters applied here are used by every
    /// later run of the composite.
    pub fn child_mut(&mut self, index: usize) -> Option<&mut ChildGenerator> {
        self.generators.get_mut(index)
    }

    fn init_phase(&mut self, map: &Grid, index: usize) {
        if let (Some(spec), Some(child)) =
            (self.children.get(index), self.generators.get_mut(index))
        {
            let bounds = self.core.bounds.inset(spec.bounds_reduction());
            child.as_generator().setup(map, bounds);
            self.active = Some(index);
        }
        self.core.schedule.next_phase();
    }

    fn run_phase(&mut self, ctx: &mut GenContext<'_>, frames: u32) -> Result<(), GenError> {
        let Some(child) = self.active.and_then(|index| self.generators.get_mut(index)) else {
            self.core.schedule.next_phase();
            return Ok(());
        };
        let generator = child.as_generator();
        if !generator.is_finished() {
            generator.run_generation_frames(ctx, frames)?;
        }
        if generator.is_finished() {
            let output = generator.output(ctx.map);
            self.collected.merge(output.map_info);
            self.active = None;
            self.core.schedule.next_phase();
        }
        Ok(())
    }
}

impl LevelGenerator for CompositeGenerator {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn bounds(&self) -> IntegerRect {
        self.core.bounds
    }

    fn setup(&mut self, map: &Grid, bounds: IntegerRect) {
        self.core.reset(map, bounds);
        self.active = None;
        self.collected = MapInfo::default();
        for index in 0..self.children.len() {
            self.core.schedule.push(CompositePhase::Init(index));
            self.core.schedule.push(CompositePhase::Run(index));
        }
        self.core.schedule.push(CompositePhase::Cleanup);
    }

    fn is_finished(&self) -> bool {
        self.core.schedule.is_finished()
    }

    fn run_generation_frames(
        &mut self,
        ctx: &mut GenContext<'_>,
        frames: u32,
    ) -> Result<(), GenError> {
        match self.core.begin_frame()? {
            CompositePhase::Init(index) => self.init_phase(ctx.map, index),
            CompositePhase::Run(_) => self.run_phase(ctx, frames)?,
            CompositePhase::Cleanup => {
                self.active = None;
                self.core.schedule.next_phase();
            }
        }
        Ok(())
    }

    fn output(&self, map: &Grid) -> GenerationOutput {
        let mut output = self.core.base_output(map);
        output.add_map_info(self.collected.clone());
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::generate_entire_map;
    use crate::random::RandomSource;
    use crate::types::{TileType, TileTypeSet};

    #[test]
    fn bsp_plus_ca_keeps_the_border_band_out_of_the_cave_pass() {
        let mut map = Grid::new(48, 48);
        let mut random = RandomSource::new(21);
        let mut ctx = GenContext::new(&mut map, &mut random);
        let bounds = ctx.map.bounds();
        let ca = CaParams { fill_tile_type: TileType::C, max_caves: 2, ..CaParams::default() };
        let mut generator = CompositeGenerator::bsp_plus_ca(BspParams::default(), ca, 0, 8);

        let output = generate_entire_map(&mut generator, &mut ctx, bounds).unwrap();

        assert!(!output.map_info.rooms.is_empty());
        assert!(output.map_info.caves.len() <= 2);
        let inner = bounds.inset(8);
        for coord in output.grid.coordinates_in_rect(bounds, false) {
            if output.grid.cell(coord.x, coord.y) == TileType::C {
                assert!(inner.probes(coord.into()));
            }
        }
    }

    #[test]
    fn ca_plus_room_collects_every_child() {
        let mut map = Grid::new(40, 30);
        let mut random = RandomSource::new(8);
        let mut ctx = GenContext::new(&mut map, &mut random);
        let bounds = ctx.map.bounds();
        let passes = vec![
            CaParams { max_caves: 1, ..CaParams::default() },
            CaParams {
                valid_base_tiles: TileTypeSet::from(TileType::B),
                fill_tile_type: TileType::D,
                max_caves: 3,
                ..CaParams::default()
            },
        ];
        let rooms = RoomParams { number_of_rooms: 4, ..RoomParams::default() };
        let mut generator = CompositeGenerator::ca_plus_room(passes, rooms);
        assert_eq!(generator.children().len(), 3);

        let output = generate_entire_map(&mut generator, &mut ctx, bounds).unwrap();

        assert!(output.map_info.caves.len() <= 4);
        assert!(!output.map_info.rooms.is_empty());
        assert_eq!(output.map_info.corridors.len(), output.map_info.rooms.len() - 1);
    }

    #[test]
    fn test_params_applied_to_a_held_child_are_used() {
        let mut generator = CompositeGenerator::multi_ca(vec![CaParams::default()]);
        let Some(ChildGenerator::Ca(child)) = generator.child_mut(0) else {
            panic!("first child should be a CA generator");
        };
        child.apply_params(CaParams { fill_tile_type: TileType::E, ..CaParams::default() });

        for seed in [2, 3] {
            let mut map = Grid::new(32, 32);
            let mut random = RandomSource::new(seed);
            let mut ctx = GenContext::new(&mut map, &mut random);
            let bounds = ctx.map.bounds();
            let output = generate_entire_map(&mut generator, &mut ctx, bounds)
                .expect("composite should finish");
            let tiles = output.grid.tiles();
            assert!(tiles.contains(&TileType::E), "seed {seed} ignored the applied params");
            assert!(!tiles.contains(&TileType::B), "seed {seed} used the original params");
        }
        assert_eq!(generator.children()[0].bounds_reduction(), 0);
    }

    #[test]
    fn small_budget_matches_unlimited_budget() {
        let build = || CompositeGenerator::multi_ca(vec![CaParams::default(); 3]);

        let mut full_map = Grid::new(24, 24);
        let mut random = RandomSource::new(4);
        let mut ctx = GenContext::new(&mut full_map, &mut random);
        let bounds = ctx.map.bounds();
        generate_entire_map(&mut build(), &mut ctx, bounds).unwrap();

        let mut sliced_map = Grid::new(24, 24);
        let mut random = RandomSource::new(4);
        let mut ctx = GenContext::new(&mut sliced_map, &mut random);
        let mut generator = build();
        generator.setup(ctx.map, bounds);
        while !generator.is_finished() {
            generator.run_generation_frames(&mut ctx, 1).unwrap();
        }

        assert_eq!(full_map, sliced_map);
    }
}
