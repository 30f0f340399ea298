//! Declarative world description: layers of generation stages plus the rules
//! that turn finished layers into macro-tiles.

use serde::{Deserialize, Serialize};

use super::info::WorldInfo;
use super::tile::{Terrain, TileTrait};
use crate::error::GenError;
use crate::generators::{BspParams, CaParams, RoomParams};
use crate::math::{IntegerRect, IntegerVector};
use crate::types::{TileType, TileTypeSet};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    #[default]
    Ca,
    Bsp,
    Room,
    Fill,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationParam {
    pub name: String,
    pub value: f32,
}

impl GenerationParam {
    pub fn new(name: &str, value: f32) -> Self {
        Self { name: name.to_string(), value }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationStage {
    pub kind: StageKind,
    pub min: IntegerVector,
    /// Non-positive components extend to the layer edge.
    pub size: IntegerVector,
    pub valid_input_tiles: TileTypeSet,
    pub output_tile_type: TileType,
    pub parameters: Vec<GenerationParam>,
}

impl Default for GenerationStage {
    fn default() -> Self {
        Self {
            kind: StageKind::Ca,
            min: IntegerVector::ZERO,
            size: IntegerVector::ZERO,
            valid_input_tiles: TileTypeSet::ALL,
            output_tile_type: TileType::B,
            parameters: Vec::new(),
        }
    }
}

impl GenerationStage {
    /// The stage rectangle resolved against a layer of the given size.
    pub fn resolve_bounds(&self, layer: IntegerRect) -> IntegerRect {
        let width = if self.size.x <= 0 { layer.max().x - self.min.x } else { self.size.x };
        let height = if self.size.y <= 0 { layer.max().y - self.min.y } else { self.size.y };
        IntegerRect::new(self.min.x, self.min.y, width, height).intersection(&layer)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationLayer {
    /// Overrides the world map size for this layer.
    pub size: Option<IntegerVector>,
    pub stages: Vec<GenerationStage>,
}

/// Starting parameters each stage's overrides are applied on top of.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageDefaults {
    pub ca: CaParams,
    pub bsp: BspParams,
    pub room: RoomParams,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainRule {
    pub tile: TileType,
    pub terrain: Terrain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitRule {
    pub layer: usize,
    pub tile: TileType,
    pub tile_trait: TileTrait,
}

/// How finished layers become macro-tiles: one layer decides terrain, any
/// layer may add traits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationSpec {
    pub terrain_layer: usize,
    pub terrain: Vec<TerrainRule>,
    pub default_terrain: Terrain,
    pub traits: Vec<TraitRule>,
}

impl Default for ClassificationSpec {
    fn default() -> Self {
        Self {
            terrain_layer: 0,
            terrain: vec![
                TerrainRule { tile: TileType::A, terrain: Terrain::Water },
                TerrainRule { tile: TileType::B, terrain: Terrain::Plains },
                TerrainRule { tile: TileType::C, terrain: Terrain::Desert },
                TerrainRule { tile: TileType::D, terrain: Terrain::Hills },
                TerrainRule { tile: TileType::E, terrain: Terrain::Mountains },
            ],
            default_terrain: Terrain::Plains,
            traits: Vec::new(),
        }
    }
}

impl ClassificationSpec {
    pub fn terrain_for(&self, tile: TileType) -> Terrain {
        self.terrain
            .iter()
            .find(|rule| rule.tile == tile)
            .map_or(self.default_terrain, |rule| rule.terrain)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldGenSpecs {
    pub map_size: IntegerVector,
    pub layers: Vec<GenerationLayer>,
    pub defaults: StageDefaults,
    pub classification: ClassificationSpec,
    pub world_info: WorldInfo,
}

impl Default for WorldGenSpecs {
    fn default() -> Self {
        Self {
            map_size: IntegerVector::new(64, 64),
            layers: Vec::new(),
            defaults: StageDefaults::default(),
            classification: ClassificationSpec::default(),
            world_info: WorldInfo::default(),
        }
    }
}

impl WorldGenSpecs {
    pub fn from_toml_str(text: &str) -> Result<Self, GenError> {
        let specs: WorldGenSpecs = toml::from_str(text)?;
        specs.validate()?;
        Ok(specs)
    }

    pub fn layer_size(&self, index: usize) -> IntegerVector {
        self.layers.get(index).and_then(|layer| layer.size).unwrap_or(self.map_size)
    }

    /// Structural checks only; parameter values are not range-checked.
    pub fn validate(&self) -> Result<(), GenError> {
        if self.layers.is_empty() {
            return Err(GenError::InvalidConfig("world specs define no layers".to_string()));
        }
        for index in 0..self.layers.len() {
            let size = self.layer_size(index);
            if size.x <= 0 || size.y <= 0 {
                return Err(GenError::InvalidConfig(format!(
                    "layer {index} has non-positive size {}x{}",
                    size.x, size.y
                )));
            }
        }
        let classification = &self.classification;
        if classification.terrain_layer >= self.layers.len() {
            return Err(GenError::InvalidConfig(format!(
                "terrain layer {} does not exist",
                classification.terrain_layer
            )));
        }
        let layer_count = self.layers.len();
        if let Some(rule) = classification.traits.iter().find(|rule| rule.layer >= layer_count) {
            return Err(GenError::InvalidConfig(format!(
                "trait rule reads missing layer {}",
                rule.layer
            )));
        }
        if self.world_info.sub_grid_size <= 0 {
            return Err(GenError::InvalidConfig("sub-grid size must be positive".to_string()));
        }
        Ok(())
    }
}
