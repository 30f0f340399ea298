//! Cellular automata caves: seed, smooth, prune to the largest caves, then map
//! simulated cells back onto real tile types.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use super::{GenContext, GeneratorCore, LevelGenerator, accepts, budget};
use crate::error::GenError;
use crate::grid::{Grid, GridSubset};
use crate::math::IntegerRect;
use crate::output::{GenerationOutput, MapInfo};
use crate::types::{Coordinate, TileType, TileTypeSet};

const ALIVE: TileType = TileType::InternalA;
const DEAD: TileType = TileType::InternalB;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaParams {
    pub valid_base_tiles: TileTypeSet,
    pub fill_tile_type: TileType,
    pub initial_chance: f32,
    pub death_limit: i32,
    pub birth_limit: i32,
    pub number_of_steps: i32,
    /// Negative keeps every cave and skips pruning.
    pub max_caves: i32,
}

impl Default for CaParams {
    fn default() -> Self {
        Self {
            valid_base_tiles: TileTypeSet::ALL,
            fill_tile_type: TileType::B,
            initial_chance: 0.48,
            death_limit: 4,
            birth_limit: 4,
            number_of_steps: 3,
            max_caves: -1,
        }
    }
}

impl CaParams {
    /// Applies one named stage parameter; false when the name is unknown.
    pub fn apply_param(&mut self, name: &str, value: f32) -> bool {
        let rounded = value.round() as i32;
        match name {
            "max_caves" => self.max_caves = rounded,
            "initial_chance" => self.initial_chance = value,
            "death_limit" => self.death_limit = rounded,
            "birth_limit" => self.birth_limit = rounded,
            "number_of_steps" => self.number_of_steps = rounded,
            _ => return false,
        }
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaPhase {
    Initial,
    Automata,
    FillCaves,
    ApplyCorrectTileTypes,
}

#[derive(Clone, Debug)]
pub struct CaGenerator {
    core: GeneratorCore<CaPhase>,
    params: CaParams,
    original: Option<GridSubset>,
    input: Option<GridSubset>,
    steps_done: i32,
    caves: Vec<Vec<Coordinate>>,
}

impl Default for CaGenerator {
    fn default() -> Self {
        Self::new(CaParams::default())
    }
}

impl CaGenerator {
    pub fn new(params: CaParams) -> Self {
        Self {
            core: GeneratorCore::new("CA Generator"),
            params,
            original: None,
            input: None,
            steps_done: 0,
            caves: Vec::new(),
        }
    }

    pub fn apply_params(&mut self, params: CaParams) {
        self.params = params;
    }

    pub fn params(&self) -> &CaParams {
        &self.params
    }

    pub fn caves(&self) -> &[Vec<Coordinate>] {
        &self.caves
    }

    fn is_valid(&self, coord: Coordinate) -> bool {
        self.input.as_ref().is_some_and(|input| accepts(input, self.params.valid_base_tiles, coord))
    }

    fn initial_phase(&mut self, ctx: &mut GenContext<'_>) {
        let bounds = self.core.bounds;
        let mask = self.params.valid_base_tiles;
        self.original = Some(ctx.map.copy_of_grid_rect(bounds));
        let input = ctx.input_snapshot(bounds);
        let (min, max) = (bounds.min(), bounds.max());
        for x in min.x..max.x {
            for y in min.y..max.y {
                let coord = Coordinate::new(x, y);
                if accepts(&input, mask, coord) {
                    ctx.map.put(x, y, DEAD);
                }
            }
        }
        for x in min.x..max.x {
            for y in min.y..max.y {
                let coord = Coordinate::new(x, y);
                if accepts(&input, mask, coord) && ctx.random.chance(self.params.initial_chance) {
                    ctx.map.put(x, y, ALIVE);
                }
            }
        }
        self.input = Some(input);
        self.core.schedule.next_phase();
    }

    fn automata_phase(&mut self, ctx: &mut GenContext<'_>, frames: u32) {
        let remaining = (self.params.number_of_steps - self.steps_done).max(0) as usize;
        for _ in 0..budget(frames).min(remaining) {
            self.simulation_step(ctx.map);
            self.steps_done += 1;
        }
        if self.steps_done >= self.params.number_of_steps {
            self.core.schedule.next_phase();
        }
    }

    /// One generation, reading from a snapshot so every cell sees the same
    /// previous state. Cells outside the valid mask keep their contents.
    fn simulation_step(&self, map: &mut Grid) {
        let bounds = self.core.bounds;
        let previous = map.copy_of_grid_rect(bounds);
        let (min, max) = (bounds.min(), bounds.max());
        for x in min.x..max.x {
            for y in min.y..max.y {
                let coord = Coordinate::new(x, y);
                if !self.is_valid(coord) {
                    continue;
                }
                let neighbors = alive_neighbors(&previous, coord);
                let next = if previous.at(coord) == Some(ALIVE) {
                    if neighbors < self.params.death_limit { DEAD } else { ALIVE }
                } else if neighbors > self.params.birth_limit {
                    ALIVE
                } else {
                    DEAD
                };
                map.put(x, y, next);
            }
        }
    }

    fn fill_caves_phase(&mut self, map: &mut Grid) {
        let bounds = self.core.bounds;
        let mut pending = map.list_of_coordinates_of_type(bounds, DEAD, false);
        let mut claimed = vec![false; (bounds.area().max(0)) as usize];
        let claim_index = |coord: Coordinate| {
            ((coord.y - bounds.min().y) * bounds.width() + (coord.x - bounds.min().x)) as usize
        };

        let mut caves = Vec::new();
        while let Some(coord) = pending.pop() {
            if claimed[claim_index(coord)] {
                continue;
            }
            let cave: Vec<Coordinate> = map
                .flood_fill(coord, DEAD, false)
                .into_iter()
                .filter(|cell| bounds.probes((*cell).into()))
                .collect();
            for cell in &cave {
                claimed[claim_index(*cell)] = true;
            }
            caves.push(cave);
        }

        let keep = self.params.max_caves.max(0) as usize;
        if caves.len() > keep {
            caves.sort_by_key(|cave| Reverse(cave.len()));
            for cave in caves.drain(keep..) {
                for cell in cave {
                    map.put(cell.x, cell.y, ALIVE);
                }
            }
        }
        self.caves = caves;
        self.core.schedule.next_phase();
    }

    fn apply_correct_tile_types_phase(&mut self, map: &mut Grid) {
        let bounds = self.core.bounds;
        let (min, max) = (bounds.min(), bounds.max());
        for x in min.x..max.x {
            for y in min.y..max.y {
                let coord = Coordinate::new(x, y);
                let original = self
                    .original
                    .as_ref()
                    .and_then(|snapshot| snapshot.at(coord))
                    .unwrap_or_default();
                let tile = if map.cell(x, y) == ALIVE && self.is_valid(coord) {
                    self.params.fill_tile_type
                } else {
                    original
                };
                map.put(x, y, tile);
            }
        }
        self.core.schedule.next_phase();
    }
}

/// Alive cells among the eight neighbors; anything outside the simulated
/// region counts as alive.
fn alive_neighbors(previous: &GridSubset, coord: Coordinate) -> i32 {
    let mut count = 0;
    for dx in -1..=1 {
        for dy in -1..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            match previous.at(Coordinate::new(coord.x + dx, coord.y + dy)) {
                None | Some(ALIVE) => count += 1,
                Some(_) => {}
            }
        }
    }
    count
}

impl LevelGenerator for CaGenerator {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn bounds(&self) -> IntegerRect {
        self.core.bounds
    }

    fn setup(&mut self, map: &Grid, bounds: IntegerRect) {
        self.core.reset(map, bounds);
        self.original = None;
        self.input = None;
        self.steps_done = 0;
        self.caves.clear();

        self.core.schedule.push(CaPhase::Initial);
        self.core.schedule.push(CaPhase::Automata);
        if self.params.max_caves >= 0 {
            self.core.schedule.push(CaPhase::FillCaves);
        }
        self.core.schedule.push(CaPhase::ApplyCorrectTileTypes);
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
            CaPhase::Initial => self.initial_phase(ctx),
            CaPhase::Automata => self.automata_phase(ctx, frames),
            CaPhase::FillCaves => self.fill_caves_phase(ctx.map),
            CaPhase::ApplyCorrectTileTypes => self.apply_correct_tile_types_phase(ctx.map),
        }
        Ok(())
    }

    fn output(&self, map: &Grid) -> GenerationOutput {
        let mut output = self.core.base_output(map);
        output.add_map_info(MapInfo::caves(self.caves.clone()));
        output
    }
}
