// Error taxonomy for the simulation engine.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// A request the engine refuses to run. Always raised before sampling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("roster of {requested} players exceeds pool of {available}")]
    RosterExceedsPool { requested: usize, available: usize },

    #[error("sample size {sample_size} exceeds population of {population}")]
    SampleExceedsPopulation {
        sample_size: usize,
        population: usize,
    },

    #[error("weight at index {index} is negative ({value})")]
    NegativeWeight { index: usize, value: f64 },

    #[error("weight at index {index} is not finite")]
    NonFiniteWeight { index: usize },

    #[error("weights must sum to a positive value")]
    ZeroWeights,

    #[error("unknown tie-break method `{0}`")]
    UnknownTieMethod(String),

    #[error("invalid value for `{field}`: {message}")]
    InvalidParameter { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Data shape errors
// ---------------------------------------------------------------------------

/// Input tables or intermediate tensors that do not line up. These indicate
/// an integration bug in the caller rather than a bad request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataShapeError {
    #[error("column `{0}` not found in player pool")]
    MissingColumn(String),

    #[error("at least one category column is required")]
    NoCategories,

    #[error("{stage}: expected shape {expected:?}, found {found:?}")]
    ShapeMismatch {
        stage: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("player index {index} out of range for pool of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("axis {axis} out of range for array with {ndim} dimensions")]
    InvalidAxis { axis: usize, ndim: usize },

    #[error("duplicate player id `{0}`")]
    DuplicateId(String),

    #[error("column `{column}` has {found} values, pool has {expected} players")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },
}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("data shape error: {0}")]
    DataShape(#[from] DataShapeError),
}

pub type Result<T, E = SimulationError> = std::result::Result<T, E>;
