// Simulation orchestrator: pool -> sample -> teams -> totals -> ranks ->
// points -> per-player averages.
//
// Iterations can be split into independent chunks that run on the rayon pool.
// Each chunk owns its random source (seeded from the master source) and
// returns its own Attribution; chunks share nothing but the read-only pool
// matrices and are merged by summation at the end.

use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::aggregate::{team_points, team_stats};
use crate::attribution::Attribution;
use crate::error::{ConfigurationError, Result};
use crate::pool::PlayerPool;
use crate::rank::{rank_axis, TieMethod};
use crate::sampler::{normalize_weights, sample_indices};
use crate::score::ScoreTable;
use crate::teams::form_teams;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Shape and execution settings of one simulation run. Deserializes from a
/// config table; missing keys take the [`Default`] values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of simulated leagues.
    pub n_iterations: usize,
    /// Teams per league.
    pub n_teams: usize,
    /// Roster size of every team.
    pub n_players: usize,
    pub tie_method: TieMethod,
    /// Seed for the master random source. `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Number of independent chunks the iterations are split into.
    pub workers: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            n_iterations: 500,
            n_teams: 10,
            n_players: 10,
            tie_method: TieMethod::Average,
            seed: None,
            workers: 1,
        }
    }
}

impl SimulationConfig {
    /// Players drafted per simulated league.
    pub fn roster_size(&self) -> usize {
        self.n_teams * self.n_players
    }

    /// Reject configurations that cannot be simulated against a pool of
    /// `pool_len` players.
    pub fn validate(&self, pool_len: usize) -> Result<()> {
        let positive: [(&str, usize); 4] = [
            ("n_teams", self.n_teams),
            ("n_players", self.n_players),
            ("n_iterations", self.n_iterations),
            ("workers", self.workers),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigurationError::InvalidParameter {
                    field: field.to_string(),
                    message: "must be greater than 0".into(),
                }
                .into());
            }
        }
        if self.roster_size() > pool_len {
            return Err(ConfigurationError::RosterExceedsPool {
                requested: self.roster_size(),
                available: pool_len,
            }
            .into());
        }
        Ok(())
    }

    /// Iterations per chunk. Earlier chunks absorb the remainder; empty
    /// chunks are dropped.
    pub fn chunk_sizes(&self) -> Vec<usize> {
        let workers = self.workers.max(1);
        let base = self.n_iterations / workers;
        let extra = self.n_iterations % workers;
        (0..workers)
            .map(|i| base + usize::from(i < extra))
            .filter(|&n| n > 0)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// One chunk of simulated leagues
// ---------------------------------------------------------------------------

/// Every intermediate tensor of one chunk of simulated leagues.
#[derive(Debug, Clone)]
pub struct League {
    /// (iterations, teams, roster) pool row indices.
    pub teams: Array3<usize>,
    /// (iterations, teams, categories) category totals.
    pub team_stats: Array3<f64>,
    /// (iterations, teams, categories) rank of each total within its league.
    pub team_ranks: Array3<f64>,
    /// (iterations, teams) sum of category ranks.
    pub team_points: Array2<f64>,
}

impl League {
    /// Draft, total, and rank `n_iterations` leagues.
    ///
    /// `stats` is the (pool players x categories) matrix, `weights` the
    /// per-player selection weights.
    pub fn draw<R: Rng + ?Sized>(
        stats: ArrayView2<f64>,
        weights: ArrayView1<f64>,
        n_iterations: usize,
        n_teams: usize,
        n_players: usize,
        tie_method: TieMethod,
        rng: &mut R,
    ) -> Result<Self> {
        let samples = sample_indices(n_iterations, n_teams * n_players, weights, rng)?;
        let teams = form_teams(samples, n_teams, n_players)?;
        let totals = team_stats(stats, teams.view())?;
        let ranks = rank_axis(&totals, Axis(1), tie_method)?;
        let points = team_points(ranks.view());
        debug!(
            "drew {} leagues: teams {:?}, totals {:?}",
            n_iterations,
            teams.shape(),
            totals.shape()
        );
        Ok(League {
            teams,
            team_stats: totals,
            team_ranks: ranks,
            team_points: points,
        })
    }

    pub fn n_iterations(&self) -> usize {
        self.teams.len_of(Axis(0))
    }

    /// Attribute this chunk's team points back onto pool players.
    pub fn attribute(&self, pool_len: usize) -> Result<Attribution> {
        Attribution::from_league(
            pool_len,
            self.teams.view(),
            self.team_points.view(),
            self.team_ranks.view(),
        )
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Run a full simulation and average team points back onto every player.
///
/// Uses `config.seed` when set, OS entropy otherwise.
pub fn simulate<S: AsRef<str>>(
    pool: &PlayerPool,
    config: &SimulationConfig,
    category_columns: &[S],
    weight_column: &str,
) -> Result<ScoreTable> {
    let mut rng = match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    simulate_with_rng(pool, config, category_columns, weight_column, &mut rng)
}

/// Like [`simulate`], but driven by a caller-supplied random source.
///
/// With a single worker the source is used directly; otherwise it only seeds
/// one private source per chunk, so the result does not depend on thread
/// scheduling.
pub fn simulate_with_rng<S: AsRef<str>, R: Rng + ?Sized>(
    pool: &PlayerPool,
    config: &SimulationConfig,
    category_columns: &[S],
    weight_column: &str,
    rng: &mut R,
) -> Result<ScoreTable> {
    config.validate(pool.len())?;
    let stats = pool.category_matrix(category_columns)?;
    let weights = normalize_weights(pool.weight_vector(weight_column)?.view())?;
    let categories: Vec<String> = category_columns
        .iter()
        .map(|c| c.as_ref().to_string())
        .collect();

    let chunks = config.chunk_sizes();
    info!(
        "Simulating {} leagues of {} teams x {} players from a pool of {} ({} categories, {} chunk(s))",
        config.n_iterations,
        config.n_teams,
        config.n_players,
        pool.len(),
        categories.len(),
        chunks.len()
    );

    let attribution = if chunks.len() == 1 {
        run_chunk(&stats, &weights, config, config.n_iterations, rng)?
    } else {
        let plan: Vec<(usize, u64)> = chunks.iter().map(|&n| (n, rng.gen())).collect();
        let partials: Vec<Result<Attribution>> = plan
            .into_par_iter()
            .map(|(n, seed)| {
                let mut chunk_rng = ChaCha8Rng::seed_from_u64(seed);
                run_chunk(&stats, &weights, config, n, &mut chunk_rng)
            })
            .collect();
        partials
            .into_iter()
            .try_fold(Attribution::empty(pool.len(), categories.len()), |acc, part| {
                acc.merge(&part?)
            })?
    };

    let table = ScoreTable::from_attribution(pool, categories, &attribution);
    let unscored = table.unscored().count();
    if unscored > 0 {
        warn!("{} of {} players were never drafted and have no score", unscored, table.len());
    }
    info!(
        "Simulation complete: {} roster spots attributed",
        attribution.total_appearances()
    );
    Ok(table)
}

fn run_chunk<R: Rng + ?Sized>(
    stats: &Array2<f64>,
    weights: &Array1<f64>,
    config: &SimulationConfig,
    n_iterations: usize,
    rng: &mut R,
) -> Result<Attribution> {
    let league = League::draw(
        stats.view(),
        weights.view(),
        n_iterations,
        config.n_teams,
        config.n_players,
        config.tie_method,
        rng,
    )?;
    league.attribute(stats.nrows())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
