//! Multi-layer world composition and the macro-tile map built from it.

pub mod compose;
pub mod info;
pub mod specs;
pub mod terrain;
pub mod tile;

use serde::Serialize;

use crate::math::IntegerRect;
use crate::random::derive_tile_seed;

pub use compose::WorldGenerator;
pub use info::{TerrainProfile, WorldInfo};
pub use specs::{
    ClassificationSpec, GenerationLayer, GenerationParam, GenerationStage, StageDefaults,
    StageKind, TerrainRule, TraitRule, WorldGenSpecs,
};
pub use terrain::{Neighbor, Side, initialize_terrain};
pub use tile::{Feature, FeatureKind, Terrain, TerrainDetail, TileTrait, WorldTile};

/// Macro-tiles for the whole world. Edges wrap, so every tile has four
/// neighbors.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorldMap {
    width: i32,
    height: i32,
    seed: u64,
    #[serde(skip)]
    info: WorldInfo,
    tiles: Vec<WorldTile>,
}

impl WorldMap {
    pub fn new(width: i32, height: i32, tiles: Vec<WorldTile>, seed: u64, info: WorldInfo) -> Self {
        let (width, height) = (width.max(0), height.max(0));
        let mut tiles = tiles;
        tiles.resize_with((width * height) as usize, WorldTile::default);
        Self { width, height, seed, info, tiles }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn info(&self) -> &WorldInfo {
        &self.info
    }

    pub fn tiles(&self) -> &[WorldTile] {
        &self.tiles
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        (x >= 0 && y >= 0 && x < self.width && y < self.height)
            .then(|| (y * self.width + x) as usize)
    }

    fn wrap(&self, x: i32, y: i32) -> Option<(i32, i32)> {
        (self.width > 0 && self.height > 0)
            .then(|| (x.rem_euclid(self.width), y.rem_euclid(self.height)))
    }

    pub fn tile(&self, x: i32, y: i32) -> Option<&WorldTile> {
        self.index(x, y).map(|index| &self.tiles[index])
    }

    pub fn tile_mut(&mut self, x: i32, y: i32) -> Option<&mut WorldTile> {
        self.index(x, y).map(|index| &mut self.tiles[index])
    }

    /// The four edge neighbors of `(x, y)`, wrapping at world edges.
    pub fn neighbors(&self, x: i32, y: i32) -> Vec<Neighbor> {
        Side::ALL
            .into_iter()
            .filter_map(|side| {
                let (dx, dy) = side.offset();
                let (nx, ny) = self.wrap(x + dx, y + dy)?;
                self.tile(nx, ny).map(|tile| Neighbor::new(side, tile))
            })
            .collect()
    }

    /// Builds the detail grid for one tile. False when the tile does not
    /// exist or was already initialized.
    pub fn initialize_tile(&mut self, x: i32, y: i32) -> bool {
        let Some(tile) = self.tile(x, y) else {
            return false;
        };
        if tile.is_initialized() {
            return false;
        }
        let neighbors = self.neighbors(x, y);
        let seed = derive_tile_seed(self.seed, x, y);
        let detail = initialize_terrain(tile, &neighbors, &self.info, seed);
        if let Some(tile) = self.tile_mut(x, y) {
            tile.set_detail(detail);
        }
        true
    }

    /// Initializes every tile in `view` grown by one on each side, wrapping
    /// at world edges. Returns how many tiles were newly initialized.
    pub fn initialize_around(&mut self, view: IntegerRect) -> usize {
        let grown = view.inset(-1);
        let (min, max) = (grown.min(), grown.max());
        let mut initialized = 0;
        for y in min.y..max.y {
            for x in min.x..max.x {
                if let Some((wx, wy)) = self.wrap(x, y)
                    && self.initialize_tile(wx, wy)
                {
                    initialized += 1;
                }
            }
        }
        initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(terrains: &[Terrain]) -> WorldMap {
        let tiles = terrains.iter().map(|&terrain| WorldTile::new(terrain)).collect();
        WorldMap::new(terrains.len() as i32, 1, tiles, 42, WorldInfo::default())
    }

    #[test]
    fn neighbors_wrap_around_the_world() {
        let map = strip(&[Terrain::Water, Terrain::Plains, Terrain::Hills]);
        let neighbors = map.neighbors(0, 0);
        let west = neighbors.iter().find(|neighbor| neighbor.side == Side::West).unwrap();
        assert_eq!(west.terrain, Terrain::Hills);
        let north = neighbors.iter().find(|neighbor| neighbor.side == Side::North).unwrap();
        assert_eq!(north.terrain, Terrain::Water);
    }

    #[test]
    fn initialization_is_lazy_and_idempotent() {
        let mut map = strip(&[Terrain::Water, Terrain::Plains, Terrain::Hills, Terrain::Desert]);
        assert_eq!(map.initialize_around(IntegerRect::new(0, 0, 1, 1)), 3);
        assert!(map.tile(3, 0).unwrap().is_initialized());
        assert!(!map.tile(2, 0).unwrap().is_initialized());
        let before = map.tile(0, 0).cloned();
        assert_eq!(map.initialize_around(IntegerRect::new(0, 0, 1, 1)), 0);
        assert_eq!(map.tile(0, 0).cloned(), before);
    }

    #[test]
    fn detail_does_not_depend_on_initialization_order() {
        let terrains = [Terrain::Water, Terrain::Plains, Terrain::Desert, Terrain::Mountains];
        let mut forward = strip(&terrains);
        let mut backward = strip(&terrains);
        for x in 0..4 {
            forward.initialize_tile(x, 0);
            backward.initialize_tile(3 - x, 0);
        }
        assert_eq!(forward, backward);
    }
}
