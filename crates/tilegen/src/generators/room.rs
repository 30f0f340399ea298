//! Random non-overlapping rooms joined in placement order by L-shaped tunnels.

use serde::{Deserialize, Serialize};

use super::{GenContext, GeneratorCore, LevelGenerator, accepts, budget};
use crate::error::GenError;
use crate::grid::{Grid, GridSubset};
use crate::math::{IntegerRect, IntegerVector};
use crate::output::{GenerationOutput, MapInfo};
use crate::types::{Coordinate, TileType, TileTypeSet};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomParams {
    pub valid_base_tiles: TileTypeSet,
    pub fill_tile_type: TileType,
    pub number_of_rooms: i32,
    pub room_min_size: i32,
    pub room_max_size: i32,
    /// Shared by every room, not per room.
    pub max_retries: i32,
}

impl Default for RoomParams {
    fn default() -> Self {
        Self {
            valid_base_tiles: TileTypeSet::ALL,
            fill_tile_type: TileType::B,
            number_of_rooms: 3,
            room_min_size: 4,
            room_max_size: 6,
            max_retries: 20,
        }
    }
}

impl RoomParams {
    pub fn apply_param(&mut self, name: &str, value: f32) -> bool {
        let rounded = value.round() as i32;
        match name {
            "num_rooms" => self.number_of_rooms = rounded,
            "room_min_size" => self.room_min_size = rounded,
            "room_max_size" => self.room_max_size = rounded,
            "max_retries" => self.max_retries = rounded,
            _ => return false,
        }
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoomPhase {
    AddRooms,
}

#[derive(Clone, Debug)]
pub struct RoomGenerator {
    core: GeneratorCore<RoomPhase>,
    params: RoomParams,
    input: Option<GridSubset>,
    rooms: Vec<IntegerRect>,
    corridors: Vec<Vec<Coordinate>>,
    retries: i32,
}

impl Default for RoomGenerator {
    fn default() -> Self {
        Self::new(RoomParams::default())
    }
}

impl RoomGenerator {
    pub fn new(params: RoomParams) -> Self {
        Self {
            core: GeneratorCore::new("Room Generator"),
            params,
            input: None,
            rooms: Vec::new(),
            corridors: Vec::new(),
            retries: 0,
        }
    }

    pub fn apply_params(&mut self, params: RoomParams) {
        self.params = params;
    }

    pub fn params(&self) -> &RoomParams {
        &self.params
    }

    pub fn rooms(&self) -> &[IntegerRect] {
        &self.rooms
    }

    /// Where a player would start.
    pub fn first_room(&self) -> Option<IntegerRect> {
        self.rooms.first().copied()
    }

    /// Where stairs down would go.
    pub fn last_room(&self) -> Option<IntegerRect> {
        self.rooms.last().copied()
    }

    pub fn retries(&self) -> i32 {
        self.retries
    }

    fn is_done(&self) -> bool {
        self.rooms.len() as i32 >= self.params.number_of_rooms
            || self.retries >= self.params.max_retries
    }

    fn add_rooms_phase(&mut self, ctx: &mut GenContext<'_>, frames: u32) {
        if self.input.is_none() {
            self.input = Some(ctx.input_snapshot(self.core.bounds));
        }
        let mut attempts = 0;
        while attempts < budget(frames) && !self.is_done() {
            attempts += 1;
            self.attempt_room(ctx);
        }
        if self.is_done() {
            self.core.schedule.next_phase();
        }
    }

    fn attempt_room(&mut self, ctx: &mut GenContext<'_>) {
        let bounds = self.core.bounds;
        let (min, max) = (bounds.min(), bounds.max());
        let random = &mut *ctx.random;
        let (low, high) = (self.params.room_min_size, self.params.room_max_size);
        let width = random.range_inclusive(low, high).min(bounds.width());
        let height = random.range_inclusive(low, high).min(bounds.height());
        let x = random.range_inclusive(min.x, max.x - width);
        let y = random.range_inclusive(min.y, max.y - height);
        let room = IntegerRect::new(x, y, width, height);

        if self.rooms.iter().any(|other| room.overlaps(other)) {
            self.retries += 1;
            return;
        }

        self.paint_rect(ctx.map, room);
        if let Some(previous) = self.rooms.last().copied() {
            let horizontal_first = ctx.random.coin();
            let corridor = self.tunnel(ctx.map, previous.center(), room.center(), horizontal_first);
            self.corridors.push(corridor);
        }
        self.rooms.push(room);
    }

    fn paint_rect(&self, map: &mut Grid, rect: IntegerRect) {
        let (min, max) = (rect.min(), rect.max());
        for x in min.x..max.x {
            for y in min.y..max.y {
                self.paint(map, Coordinate::new(x, y));
            }
        }
    }

    /// Writes the fill type if the input mask allows it; true when the cell
    /// was not already the fill type.
    fn paint(&self, map: &mut Grid, coord: Coordinate) -> bool {
        let Some(input) = &self.input else {
            return false;
        };
        if !accepts(input, self.params.valid_base_tiles, coord) {
            return false;
        }
        let fresh = map.get(coord).is_some_and(|tile| tile != self.params.fill_tile_type);
        map.put(coord.x, coord.y, self.params.fill_tile_type);
        fresh
    }

    /// L-shaped path from `from` to `to`. Horizontal-first runs along
    /// `from.y` then down `to.x`; vertical-first runs along `from.x` then
    /// across `to.y`. Only newly carved cells are recorded.
    fn tunnel(
        &self,
        map: &mut Grid,
        from: IntegerVector,
        to: IntegerVector,
        horizontal_first: bool,
    ) -> Vec<Coordinate> {
        let corner = if horizontal_first {
            IntegerVector::new(to.x, from.y)
        } else {
            IntegerVector::new(from.x, to.y)
        };
        let mut corridor = Vec::new();
        for (start, end) in [(from, corner), (corner, to)] {
            let low = start.min(end);
            let high = start.max(end);
            for x in low.x..=high.x {
                for y in low.y..=high.y {
                    let coord = Coordinate::new(x, y);
                    if self.paint(map, coord) && !corridor.contains(&coord) {
                        corridor.push(coord);
                    }
                }
            }
        }
        corridor
    }
}

impl LevelGenerator for RoomGenerator {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn bounds(&self) -> IntegerRect {
        self.core.bounds
    }

    fn setup(&mut self, map: &Grid, bounds: IntegerRect) {
        self.core.reset(map, bounds);
        self.input = None;
        self.rooms.clear();
        self.corridors.clear();
        self.retries = 0;
        self.core.schedule.push(RoomPhase::AddRooms);
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
            RoomPhase::AddRooms => self.add_rooms_phase(ctx, frames),
        }
        Ok(())
    }

    fn output(&self, map: &Grid) -> GenerationOutput {
        let mut output = self.core.base_output(map);
        output.add_map_info(MapInfo::rooms(self.rooms.clone()));
        output.add_map_info(MapInfo::corridors(self.corridors.clone()));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::generate_entire_map;
    use crate::random::RandomSource;

    fn run(params: RoomParams, map: &mut Grid, seed: u64) -> (RoomGenerator, GenerationOutput) {
        let mut random = RandomSource::new(seed);
        let mut ctx = GenContext::new(map, &mut random);
        let bounds = ctx.map.bounds();
        let mut generator = RoomGenerator::new(params);
        let output = generate_entire_map(&mut generator, &mut ctx, bounds).unwrap();
        (generator, output)
    }

    #[test]
    fn consecutive_rooms_are_joined() {
        let mut map = Grid::new(40, 40);
        let params = RoomParams { number_of_rooms: 4, ..RoomParams::default() };
        let (generator, output) = run(params, &mut map, 11);
        let rooms = generator.rooms();
        assert_eq!(output.map_info.corridors.len(), rooms.len().saturating_sub(1));
        for pair in rooms.windows(2) {
            let from = Coordinate::from(pair[0].center());
            let to = Coordinate::from(pair[1].center());
            assert!(output.grid.can_path_between_coordinates(from, to, false));
        }
        assert_eq!(generator.first_room(), rooms.first().copied());
        assert_eq!(generator.last_room(), rooms.last().copied());
    }

    #[test]
    fn tunnel_is_a_single_bend() {
        let mut map = Grid::new(10, 10);
        let mut generator = RoomGenerator::default();
        generator.setup(&map, map.bounds());
        generator.input = Some(map.copy_of_grid_rect(map.bounds()));
        let corridor =
            generator.tunnel(&mut map, IntegerVector::new(1, 1), IntegerVector::new(5, 4), true);
        assert_eq!(corridor.len(), 8);
        assert!(corridor.contains(&Coordinate::new(5, 1)));
        assert!(!corridor.contains(&Coordinate::new(1, 4)));
    }

    #[test]
    fn rooms_stay_inside_bounds() {
        let mut map = Grid::new(30, 30);
        let bounds = IntegerRect::new(5, 5, 20, 20);
        let mut random = RandomSource::new(3);
        let mut ctx = GenContext::new(&mut map, &mut random);
        let params = RoomParams { number_of_rooms: 6, ..RoomParams::default() };
        let mut generator = RoomGenerator::new(params);
        generate_entire_map(&mut generator, &mut ctx, bounds).unwrap();
        for room in generator.rooms() {
            assert_eq!(room.intersection(&bounds), *room);
        }
    }
}
