//! Bounded 2D tile grid with region fills, flood fill, and subset snapshots.

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::GenError;
use crate::math::IntegerRect;
use crate::random::RandomSource;
use crate::types::{Coordinate, TileType, TileTypeSet};

/// A `width x height` array of tiles, fixed in size once created.
///
/// Every cell starts as the default tile type. Direct access outside the
/// grid is an error; use [`Grid::construct_valid_coordinate`] to wrap or
/// reject coordinates first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: i32,
    height: i32,
    tiles: Vec<TileType>,
}

/// A rectangular snapshot taken by [`Grid::copy_of_grid_rect`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridSubset {
    origin: Coordinate,
    width: i32,
    height: i32,
    tiles: Vec<TileType>,
}

impl GridSubset {
    pub fn origin(&self) -> Coordinate {
        self.origin
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Tile at a position relative to the subset's own origin.
    pub fn get(&self, x: i32, y: i32) -> Option<TileType> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some(self.tiles[(y * self.width + x) as usize])
    }

    /// Tile at an absolute grid coordinate, if the subset covers it.
    pub fn at(&self, coord: Coordinate) -> Option<TileType> {
        self.get(coord.x - self.origin.x, coord.y - self.origin.y)
    }
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Self {
        Self::filled(width, height, TileType::default())
    }

    pub fn filled(width: i32, height: i32, tile: TileType) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self { width, height, tiles: vec![tile; (width as usize) * (height as usize)] }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn bounds(&self) -> IntegerRect {
        IntegerRect::new(0, 0, self.width, self.height)
    }

    pub fn tiles(&self) -> &[TileType] {
        &self.tiles
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    fn index(&self, x: i32, y: i32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    pub fn get(&self, coord: Coordinate) -> Option<TileType> {
        self.in_bounds(coord.x, coord.y).then(|| self.tiles[self.index(coord.x, coord.y)])
    }

    pub fn tile_at(&self, coord: Coordinate) -> Result<TileType, GenError> {
        self.get(coord).ok_or_else(|| self.out_of_bounds(coord))
    }

    pub fn set_tile(&mut self, coord: Coordinate, tile: TileType) -> Result<(), GenError> {
        if !self.in_bounds(coord.x, coord.y) {
            return Err(self.out_of_bounds(coord));
        }
        let index = self.index(coord.x, coord.y);
        self.tiles[index] = tile;
        Ok(())
    }

    fn out_of_bounds(&self, coord: Coordinate) -> GenError {
        GenError::OutOfBounds { x: coord.x, y: coord.y, width: self.width, height: self.height }
    }

    /// Cell value for a coordinate already known to be inside the grid.
    pub(crate) fn cell(&self, x: i32, y: i32) -> TileType {
        self.tiles[self.index(x, y)]
    }

    pub(crate) fn put(&mut self, x: i32, y: i32, tile: TileType) {
        let index = self.index(x, y);
        self.tiles[index] = tile;
    }

    pub fn fill_completely(&mut self, tile: TileType) {
        self.tiles.fill(tile);
    }

    pub fn reset(&mut self) {
        self.fill_completely(TileType::default());
    }

    pub fn fill_rect(&mut self, rect: IntegerRect, tile: TileType) {
        self.fill_matching_tiles_in_rect(rect, tile, TileTypeSet::ALL, None);
    }

    /// Writes `tile` wherever the reference grid (self when `None`) holds a
    /// value inside `mask`.
    pub fn fill_matching_tiles_in_rect(
        &mut self,
        rect: IntegerRect,
        tile: TileType,
        mask: TileTypeSet,
        reference: Option<&Grid>,
    ) {
        let region = self.clip(rect, reference);
        let (min, max) = (region.min(), region.max());
        for x in min.x..max.x {
            for y in min.y..max.y {
                let reference_tile = match reference {
                    Some(grid) => grid.cell(x, y),
                    None => self.cell(x, y),
                };
                if mask.contains(reference_tile) {
                    self.put(x, y, tile);
                }
            }
        }
    }

    /// As [`Grid::fill_matching_tiles_in_rect`], plus one Bernoulli draw per
    /// matching cell. Non-matching cells consume no draw.
    pub fn fill_matching_tiles_with_chance(
        &mut self,
        rect: IntegerRect,
        tile: TileType,
        mask: TileTypeSet,
        chance: f32,
        reference: Option<&Grid>,
        random: &mut RandomSource,
    ) {
        let region = self.clip(rect, reference);
        let (min, max) = (region.min(), region.max());
        for x in min.x..max.x {
            for y in min.y..max.y {
                let reference_tile = match reference {
                    Some(grid) => grid.cell(x, y),
                    None => self.cell(x, y),
                };
                if mask.contains(reference_tile) && random.chance(chance) {
                    self.put(x, y, tile);
                }
            }
        }
    }

    fn clip(&self, rect: IntegerRect, reference: Option<&Grid>) -> IntegerRect {
        let region = rect.intersection(&self.bounds());
        match reference {
            Some(grid) => region.intersection(&grid.bounds()),
            None => region,
        }
    }

    pub fn construct_valid_coordinate(
        &self,
        x: i32,
        y: i32,
        allow_wrap: bool,
    ) -> Option<Coordinate> {
        if allow_wrap {
            if self.width == 0 || self.height == 0 {
                return None;
            }
            return Some(Coordinate::new(x.rem_euclid(self.width), y.rem_euclid(self.height)));
        }
        self.in_bounds(x, y).then_some(Coordinate::new(x, y))
    }

    /// The 4-connected region of cells equal to `tile` reachable from `start`.
    /// Empty when `start` is outside the grid or holds another type.
    pub fn flood_fill(
        &self,
        start: Coordinate,
        tile: TileType,
        allow_wrap: bool,
    ) -> Vec<Coordinate> {
        let Some(start) = self.construct_valid_coordinate(start.x, start.y, allow_wrap) else {
            return Vec::new();
        };
        let mut visited = vec![false; self.tiles.len()];
        let mut stack = vec![start];
        visited[self.index(start.x, start.y)] = true;
        let mut reached = Vec::new();

        while let Some(current) = stack.pop() {
            if self.cell(current.x, current.y) != tile {
                continue;
            }
            reached.push(current);
            let neighbors = [
                (current.x - 1, current.y),
                (current.x + 1, current.y),
                (current.x, current.y - 1),
                (current.x, current.y + 1),
            ];
            for (x, y) in neighbors {
                let Some(next) = self.construct_valid_coordinate(x, y, allow_wrap) else {
                    continue;
                };
                let index = self.index(next.x, next.y);
                if !visited[index] {
                    visited[index] = true;
                    stack.push(next);
                }
            }
        }
        reached
    }

    pub fn can_path_between_coordinates(
        &self,
        a: Coordinate,
        b: Coordinate,
        allow_wrap: bool,
    ) -> bool {
        let (Some(tile), Some(other)) = (self.get(a), self.get(b)) else {
            return false;
        };
        if tile != other {
            return false;
        }
        self.flood_fill(a, tile, allow_wrap).contains(&b)
    }

    pub fn coordinates_in_rect(&self, rect: IntegerRect, allow_wrap: bool) -> Vec<Coordinate> {
        let (min, max) = (rect.min(), rect.max());
        let mut coords = Vec::new();
        for x in min.x..max.x {
            for y in min.y..max.y {
                if let Some(coord) = self.construct_valid_coordinate(x, y, allow_wrap) {
                    coords.push(coord);
                }
            }
        }
        coords
    }

    /// Diamond of cells within `range` steps of `center`, column by column.
    pub fn coordinates_in_manhattan_range(
        &self,
        center: Coordinate,
        range: i32,
        allow_wrap: bool,
    ) -> Vec<Coordinate> {
        let mut coords = Vec::new();
        for x in (center.x - range)..=(center.x + range) {
            coords.extend(self.construct_valid_coordinate(x, center.y, allow_wrap));
            let range_at_column = range - (center.x - x).abs();
            for offset in 1..=range_at_column {
                coords.extend(self.construct_valid_coordinate(x, center.y + offset, allow_wrap));
                coords.extend(self.construct_valid_coordinate(x, center.y - offset, allow_wrap));
            }
        }
        coords
    }

    pub fn list_of_coordinates_of_type(
        &self,
        rect: IntegerRect,
        tile: TileType,
        allow_wrap: bool,
    ) -> Vec<Coordinate> {
        self.coordinates_in_rect(rect, allow_wrap)
            .into_iter()
            .filter(|coord| self.cell(coord.x, coord.y) == tile)
            .collect()
    }

    /// Snapshot of `rect` clipped to the grid.
    pub fn copy_of_grid_rect(&self, rect: IntegerRect) -> GridSubset {
        let region = rect.intersection(&self.bounds());
        let (min, max) = (region.min(), region.max());
        let mut tiles = Vec::with_capacity(region.area().max(0) as usize);
        for y in min.y..max.y {
            for x in min.x..max.x {
                tiles.push(self.cell(x, y));
            }
        }
        GridSubset {
            origin: Coordinate::from(min),
            width: region.width(),
            height: region.height(),
            tiles,
        }
    }

    pub fn apply_grid_subset(
        &mut self,
        origin_x: i32,
        origin_y: i32,
        subset: &GridSubset,
    ) -> Result<(), GenError> {
        let target = IntegerRect::new(origin_x, origin_y, subset.width, subset.height);
        if target.intersection(&self.bounds()) != target {
            return Err(GenError::SubsetOutOfBounds);
        }
        for y in 0..subset.height {
            for x in 0..subset.width {
                let tile = subset.tiles[(y * subset.width + x) as usize];
                self.put(origin_x + x, origin_y + y, tile);
            }
        }
        Ok(())
    }

    /// Coordinates whose tile differs from `previous`; every cell when the
    /// dimensions differ.
    pub fn changed_coordinates(&self, previous: &Grid) -> Vec<Coordinate> {
        if previous.width != self.width || previous.height != self.height {
            return self.coordinates_in_rect(self.bounds(), false);
        }
        let mut changed = Vec::new();
        for (index, (now, before)) in self.tiles.iter().zip(&previous.tiles).enumerate() {
            if now != before {
                let index = index as i32;
                changed.push(Coordinate::new(index % self.width, index / self.width));
            }
        }
        changed
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + self.tiles.len());
        bytes.extend((self.width as u32).to_le_bytes());
        bytes.extend((self.height as u32).to_le_bytes());
        bytes.extend(self.tiles.iter().map(|tile| tile.code()));
        bytes
    }

    pub fn fingerprint(&self) -> u64 {
        xxh3_64(&self.canonical_bytes())
    }

    /// One line per row, top row (`y == 0`) first.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity(self.tiles.len() + self.height as usize);
        for row in self.tiles.chunks(self.width.max(1) as usize) {
            out.extend(row.iter().map(|tile| tile.glyph()));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    fn grid_from_rows(rows: &[&str]) -> Grid {
        let mut grid = Grid::new(rows[0].len() as i32, rows.len() as i32);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let tile = if ch == '.' { TileType::B } else { TileType::A };
                grid.put(x as i32, y as i32, tile);
            }
        }
        grid
    }

    #[test]
    fn direct_access_outside_bounds_is_an_error() {
        let mut grid = Grid::new(4, 3);
        assert!(grid.get(Coordinate::new(4, 0)).is_none());
        assert!(matches!(
            grid.tile_at(Coordinate::new(-1, 0)),
            Err(GenError::OutOfBounds { x: -1, y: 0, width: 4, height: 3 })
        ));
        assert!(grid.set_tile(Coordinate::new(0, 3), TileType::B).is_err());
        assert!(grid.set_tile(Coordinate::new(3, 2), TileType::B).is_ok());
    }

    #[test]
    fn coordinates_wrap_or_are_rejected() {
        let grid = Grid::new(5, 4);
        assert_eq!(grid.construct_valid_coordinate(-1, 4, true), Some(Coordinate::new(4, 0)));
        assert_eq!(grid.construct_valid_coordinate(11, -9, true), Some(Coordinate::new(1, 3)));
        assert_eq!(grid.construct_valid_coordinate(-1, 2, false), None);
        assert_eq!(grid.construct_valid_coordinate(2, 2, false), Some(Coordinate::new(2, 2)));
    }

    #[test]
    fn fill_is_clipped_to_grid() {
        let mut grid = Grid::new(4, 4);
        grid.fill_rect(IntegerRect::new(2, 2, 10, 10), TileType::C);
        assert_eq!(grid.list_of_coordinates_of_type(grid.bounds(), TileType::C, false).len(), 4);
    }

    #[test]
    fn matching_fill_reads_reference_grid() {
        let reference = grid_from_rows(&["..##", "..##"]);
        let mut grid = Grid::new(4, 2);
        grid.fill_matching_tiles_in_rect(
            grid.bounds(),
            TileType::D,
            TileTypeSet::from(TileType::B),
            Some(&reference),
        );
        assert_eq!(grid.to_ascii(), ",,##\n,,##\n");
    }

    #[test]
    fn chance_fill_extremes() {
        let mut random = RandomSource::new(1);
        let mut grid = Grid::new(6, 6);
        let bounds = grid.bounds();
        let all = TileTypeSet::ALL;
        grid.fill_matching_tiles_with_chance(bounds, TileType::B, all, 0.0, None, &mut random);
        assert!(grid.tiles().iter().all(|&tile| tile == TileType::A));
        grid.fill_matching_tiles_with_chance(bounds, TileType::B, all, 1.0, None, &mut random);
        assert!(grid.tiles().iter().all(|&tile| tile == TileType::B));
    }

    #[test]
    fn flood_fill_wraps_across_edges() {
        let grid = grid_from_rows(&[".##.", "####", ".##."]);
        assert_eq!(grid.flood_fill(Coordinate::new(0, 0), TileType::B, false).len(), 1);
        assert_eq!(grid.flood_fill(Coordinate::new(0, 0), TileType::B, true).len(), 4);
        let origin = Coordinate::new(0, 0);
        assert!(grid.can_path_between_coordinates(origin, Coordinate::new(3, 2), true));
        assert!(!grid.can_path_between_coordinates(origin, Coordinate::new(3, 2), false));
        assert!(!grid.can_path_between_coordinates(origin, Coordinate::new(1, 0), true));
    }

    #[test]
    fn manhattan_range_is_a_diamond() {
        let grid = Grid::new(9, 9);
        let coords = grid.coordinates_in_manhattan_range(Coordinate::new(4, 4), 2, false);
        assert_eq!(coords.len(), 13);
        assert!(coords.iter().all(|c| (c.x - 4).abs() + (c.y - 4).abs() <= 2));
        let clipped = grid.coordinates_in_manhattan_range(Coordinate::new(0, 0), 2, false);
        assert_eq!(clipped.len(), 6);
    }

    #[test]
    fn subset_restores_snapshot() {
        let mut grid = grid_from_rows(&["....", ".##.", "...."]);
        let before = grid.clone();
        let subset = grid.copy_of_grid_rect(IntegerRect::new(1, 0, 3, 3));
        assert_eq!(subset.at(Coordinate::new(2, 1)), Some(TileType::A));
        grid.fill_completely(TileType::E);
        let column = grid.copy_of_grid_rect(IntegerRect::new(0, 0, 1, 3));
        grid.apply_grid_subset(0, 0, &column).unwrap();
        grid.apply_grid_subset(1, 0, &subset).unwrap();
        assert_eq!(
            grid.changed_coordinates(&before),
            vec![Coordinate::new(0, 0), Coordinate::new(0, 1), Coordinate::new(0, 2)]
        );
        assert!(matches!(grid.apply_grid_subset(2, 0, &subset), Err(GenError::SubsetOutOfBounds)));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let mut grid = Grid::new(8, 8);
        let baseline = grid.fingerprint();
        grid.fill_rect(IntegerRect::new(1, 1, 2, 2), TileType::B);
        assert_ne!(grid.fingerprint(), baseline);
        grid.reset();
        assert_eq!(grid.fingerprint(), baseline);
    }

    fn arb_grid() -> impl Strategy<Value = Grid> {
        (2_i32..12, 2_i32..12).prop_flat_map(|(width, height)| {
            proptest::collection::vec(prop::bool::ANY, (width * height) as usize).prop_map(
                move |cells| {
                    let mut grid = Grid::new(width, height);
                    for (index, open) in cells.into_iter().enumerate() {
                        if open {
                            let index = index as i32;
                            grid.put(index % width, index / width, TileType::B);
                        }
                    }
                    grid
                },
            )
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn fill_rect_is_idempotent(
            x in -3_i32..10, y in -3_i32..10, w in 0_i32..10, h in 0_i32..10, seed in any::<u64>()
        ) {
            let mut random = RandomSource::new(seed);
            let mut grid = Grid::new(8, 8);
            let bounds = grid.bounds();
            let all = TileTypeSet::ALL;
            grid.fill_matching_tiles_with_chance(bounds, TileType::B, all, 0.5, None, &mut random);
            let rect = IntegerRect::new(x, y, w, h);
            grid.fill_rect(rect, TileType::C);
            let once = grid.clone();
            grid.fill_rect(rect, TileType::C);
            prop_assert_eq!(grid, once);
        }

        #[test]
        fn flood_fill_is_closed_and_maximal(
            grid in arb_grid(),
            wrap in any::<bool>(),
            sx in 0_i32..12,
            sy in 0_i32..12,
        ) {
            let start = Coordinate::new(sx % grid.width(), sy % grid.height());
            let tile = grid.cell(start.x, start.y);
            let region = grid.flood_fill(start, tile, wrap);
            let members: HashSet<Coordinate> = region.iter().copied().collect();
            prop_assert_eq!(members.len(), region.len());
            prop_assert!(members.contains(&start));
            for coord in &region {
                prop_assert_eq!(grid.cell(coord.x, coord.y), tile);
                for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                    let next = grid.construct_valid_coordinate(coord.x + dx, coord.y + dy, wrap);
                    if let Some(next) = next
                        && grid.cell(next.x, next.y) == tile
                    {
                        prop_assert!(members.contains(&next));
                    }
                }
            }
        }
    }
}
