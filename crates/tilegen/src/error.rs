//! Hard failures surfaced to callers; algorithmic shortfalls are logged instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenError {
    #[error("generator `{generator}` has already finished")]
    AlreadyFinished { generator: String },
    #[error("generation job `{job}` was halted")]
    Halted { job: String },
    #[error("coordinate ({x}, {y}) is outside a {width}x{height} grid")]
    OutOfBounds { x: i32, y: i32, width: i32, height: i32 },
    #[error("grid subset does not fit at the requested origin")]
    SubsetOutOfBounds,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("could not parse generation specs: {0}")]
    SpecsParse(#[from] toml::de::Error),
}
