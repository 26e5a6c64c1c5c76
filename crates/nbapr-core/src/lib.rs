// Monte Carlo player-value engine: simulated drafts scored by category rank.

pub mod aggregate;
pub mod attribution;
pub mod error;
pub mod pool;
pub mod rank;
pub mod sampler;
pub mod score;
pub mod simulate;
pub mod teams;

pub use error::{ConfigurationError, DataShapeError, SimulationError};
pub use pool::{PlayerId, PlayerPool};
pub use rank::TieMethod;
pub use score::{PlayerScore, ScoreTable};
pub use simulate::{simulate, simulate_with_rng, League, SimulationConfig};
