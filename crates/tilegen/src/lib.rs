pub mod driver;
pub mod error;
pub mod generators;
pub mod grid;
pub mod level;
pub mod math;
pub mod output;
pub mod phase;
pub mod random;
pub mod types;
pub mod world;

pub use driver::{GenerationDriver, GenerationJob, TickReport};
pub use error::GenError;
pub use generators::{GenContext, LevelGenerator, generate_entire_map};
pub use grid::{Grid, GridSubset};
pub use level::{LevelGenInput, LevelGenJob, LevelGenKind, LevelGenSettings};
pub use math::{IntegerRect, IntegerVector};
pub use output::{GenerationOutput, MapInfo, MapInfoKind};
pub use random::{NoiseSource, RandomSource};
pub use types::*;
pub use world::{WorldGenSpecs, WorldGenerator, WorldMap};
