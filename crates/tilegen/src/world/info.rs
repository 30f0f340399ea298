//! Tuning knobs for macro-tile terrain synthesis.

use serde::{Deserialize, Serialize};

use super::tile::Terrain;
use crate::math::IntegerVector;

/// Height synthesis for one terrain type.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainProfile {
    /// Inclusive height range, `x` low and `y` high.
    pub height_range: IntegerVector,
    pub perlin_frequency: f32,
    /// Noise is raised to this power before mapping into the range.
    pub perlin_power: i32,
}

impl Default for TerrainProfile {
    fn default() -> Self {
        Self { height_range: IntegerVector::new(0, 4), perlin_frequency: 0.1, perlin_power: 1 }
    }
}

impl TerrainProfile {
    pub const fn new(low: i32, high: i32, perlin_frequency: f32, perlin_power: i32) -> Self {
        Self { height_range: IntegerVector::new(low, high), perlin_frequency, perlin_power }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldInfo {
    /// Side length of every macro-tile's detail grid.
    pub sub_grid_size: i32,
    /// Height given to every water cell.
    pub sea_level: i32,
    pub beach: TerrainProfile,
    pub plains: TerrainProfile,
    pub desert: TerrainProfile,
    pub hills: TerrainProfile,
    pub mountains: TerrainProfile,
    /// Relative spread applied to each profile's frequency per tile.
    pub frequency_range: f32,
    /// Fraction of the sub-grid a lower-ranked neighbor reaches in.
    pub border_percentage: f32,
    /// Random and noise spread around the border depth, in cells.
    pub border_range: i32,
    pub border_frequency: f32,
    pub keep_corner_chance: f32,
    pub tree_chance: f32,
    pub ore_chance: f32,
    pub rock_chance: f32,
    pub feature_frequency: f32,
    /// Distance from an edge over which features fade in when the
    /// neighbor across it lacks the trait.
    pub feature_falloff: i32,
}

impl Default for WorldInfo {
    fn default() -> Self {
        Self {
            sub_grid_size: 32,
            sea_level: 0,
            beach: TerrainProfile::new(1, 2, 0.2, 1),
            plains: TerrainProfile::new(1, 4, 0.08, 1),
            desert: TerrainProfile::new(2, 6, 0.12, 2),
            hills: TerrainProfile::new(4, 12, 0.1, 2),
            mountains: TerrainProfile::new(10, 30, 0.14, 3),
            frequency_range: 0.25,
            border_percentage: 0.25,
            border_range: 4,
            border_frequency: 0.15,
            keep_corner_chance: 0.5,
            tree_chance: 0.35,
            ore_chance: 0.08,
            rock_chance: 0.04,
            feature_frequency: 0.2,
            feature_falloff: 6,
        }
    }
}

impl WorldInfo {
    /// Water has no profile; it sits at sea level.
    pub fn profile(&self, terrain: Terrain) -> Option<&TerrainProfile> {
        match terrain {
            Terrain::Water => None,
            Terrain::Beach => Some(&self.beach),
            Terrain::Plains => Some(&self.plains),
            Terrain::Desert => Some(&self.desert),
            Terrain::Hills => Some(&self.hills),
            Terrain::Mountains => Some(&self.mountains),
        }
    }
}
