//! Macro-tiles of the world map and the detail grid each one grows lazily.

use serde::{Deserialize, Serialize};

use crate::types::Coordinate;

/// Coarse terrain. Declaration order is the dominance rank used when
/// blending borders: a tile takes on the terrain of lower-ranked neighbors
/// along their shared edge.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Water,
    /// Only produced inside detail grids, where water meets plains.
    Beach,
    #[default]
    Plains,
    Desert,
    Hills,
    Mountains,
}

impl Terrain {
    pub const ALL: [Terrain; 6] = [
        Terrain::Water,
        Terrain::Beach,
        Terrain::Plains,
        Terrain::Desert,
        Terrain::Hills,
        Terrain::Mountains,
    ];

    pub fn glyph(self) -> char {
        match self {
            Terrain::Water => '~',
            Terrain::Beach => ',',
            Terrain::Plains => '.',
            Terrain::Desert => ':',
            Terrain::Hills => 'n',
            Terrain::Mountains => '^',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileTrait {
    Forest,
    MineralVein,
    City,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Tree,
    Rock,
    Ore,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub kind: FeatureKind,
    pub at: Coordinate,
}

/// Per-sub-tile terrain and height inside one macro-tile, row-major.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TerrainDetail {
    size: i32,
    terrain: Vec<Terrain>,
    heights: Vec<i32>,
    features: Vec<Feature>,
}

impl TerrainDetail {
    pub(crate) fn filled(size: i32, terrain: Terrain) -> Self {
        let cells = (size.max(0) as usize).pow(2);
        Self {
            size: size.max(0),
            terrain: vec![terrain; cells],
            heights: vec![0; cells],
            features: Vec::new(),
        }
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        (x >= 0 && y >= 0 && x < self.size && y < self.size).then(|| (y * self.size + x) as usize)
    }

    pub fn terrain_at(&self, x: i32, y: i32) -> Option<Terrain> {
        self.index(x, y).map(|index| self.terrain[index])
    }

    pub fn height_at(&self, x: i32, y: i32) -> Option<i32> {
        self.index(x, y).map(|index| self.heights[index])
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub(crate) fn set_terrain(&mut self, x: i32, y: i32, terrain: Terrain) {
        if let Some(index) = self.index(x, y) {
            self.terrain[index] = terrain;
        }
    }

    pub(crate) fn set_height(&mut self, x: i32, y: i32, height: i32) {
        if let Some(index) = self.index(x, y) {
            self.heights[index] = height;
        }
    }

    pub(crate) fn push_feature(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Distinct terrain types present, in rank order.
    pub fn terrains_present(&self) -> Vec<Terrain> {
        Terrain::ALL.into_iter().filter(|terrain| self.terrain.contains(terrain)).collect()
    }

    pub fn to_ascii(&self) -> String {
        let mut out = String::new();
        for row in self.terrain.chunks(self.size.max(1) as usize) {
            out.extend(row.iter().map(|terrain| terrain.glyph()));
            out.push('\n');
        }
        out
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WorldTile {
    pub terrain: Terrain,
    traits: Vec<TileTrait>,
    detail: Option<TerrainDetail>,
}

impl WorldTile {
    pub fn new(terrain: Terrain) -> Self {
        Self { terrain, traits: Vec::new(), detail: None }
    }

    pub fn traits(&self) -> &[TileTrait] {
        &self.traits
    }

    pub fn has_trait(&self, tile_trait: TileTrait) -> bool {
        self.traits.contains(&tile_trait)
    }

    pub fn add_trait(&mut self, tile_trait: TileTrait) {
        if !self.has_trait(tile_trait) {
            self.traits.push(tile_trait);
        }
    }

    pub fn remove_trait(&mut self, tile_trait: TileTrait) {
        self.traits.retain(|&existing| existing != tile_trait);
    }

    pub fn detail(&self) -> Option<&TerrainDetail> {
        self.detail.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.detail.is_some()
    }

    pub(crate) fn set_detail(&mut self, detail: TerrainDetail) {
        self.detail = Some(detail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traits_form_a_unique_set() {
        let mut tile = WorldTile::new(Terrain::Hills);
        tile.add_trait(TileTrait::Forest);
        tile.add_trait(TileTrait::City);
        tile.add_trait(TileTrait::Forest);
        assert_eq!(tile.traits(), &[TileTrait::Forest, TileTrait::City]);
        tile.remove_trait(TileTrait::Forest);
        assert!(!tile.has_trait(TileTrait::Forest));
        assert!(tile.has_trait(TileTrait::City));
        tile.remove_trait(TileTrait::MineralVein);
        assert_eq!(tile.traits().len(), 1);
    }

    #[test]
    fn rank_follows_declaration_order() {
        assert!(Terrain::Water < Terrain::Plains);
        assert!(Terrain::Plains < Terrain::Desert);
        assert!(Terrain::Hills < Terrain::Mountains);
    }

    #[test]
    fn detail_reports_present_terrain_in_rank_order() {
        let mut detail = TerrainDetail::filled(4, Terrain::Hills);
        detail.set_terrain(0, 0, Terrain::Water);
        detail.set_terrain(9, 9, Terrain::Desert);
        assert_eq!(detail.terrains_present(), vec![Terrain::Water, Terrain::Hills]);
        assert_eq!(detail.terrain_at(4, 0), None);
        assert_eq!(detail.to_ascii().lines().next(), Some("~nnn"));
    }
}
