// Back-attribution of team scores onto the players who earned them.
//
// Membership is tracked with an explicit boolean mask over flattened
// (trial, team) slots. A player's score is the mean team score over the
// slots they occupy. Unoccupied slots are excluded, never counted as zero.

use ndarray::{Array1, Array2, ArrayView2, ArrayView3, Axis, Zip};

use crate::error::{DataShapeError, Result};

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// Build the (pool players x slots) membership mask for a team tensor.
///
/// Slot `s` is trial `s / n_teams`, team `s % n_teams`. Entry `[p, s]` is true
/// exactly when pool row `p` is on the roster of slot `s`.
pub fn membership_mask(pool_len: usize, teams: ArrayView3<usize>) -> Result<Array2<bool>> {
    let (trials, n_teams, roster) = teams.dim();
    let slots = trials * n_teams;
    let mut mask = Array2::from_elem((pool_len, slots), false);
    for (slot, lineup) in teams
        .to_shape((slots, roster))
        .map_err(|_| shape_error("membership", vec![slots, roster], teams.shape().to_vec()))?
        .rows()
        .into_iter()
        .enumerate()
    {
        for &player in lineup.iter() {
            if player >= pool_len {
                return Err(DataShapeError::IndexOutOfRange {
                    index: player,
                    len: pool_len,
                }
                .into());
            }
            mask[[player, slot]] = true;
        }
    }
    Ok(mask)
}

fn shape_error(stage: &'static str, expected: Vec<usize>, found: Vec<usize>) -> DataShapeError {
    DataShapeError::ShapeMismatch {
        stage,
        expected,
        found,
    }
}

// ---------------------------------------------------------------------------
// Accumulated attribution
// ---------------------------------------------------------------------------

/// Per-player sums of team points and category ranks, with appearance
/// counts. Attributions from independent chunks of trials combine with
/// [`Attribution::merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    points: Array1<f64>,
    category_ranks: Array2<f64>,
    appearances: Array1<u64>,
}

impl Attribution {
    /// An attribution with no appearances.
    pub fn empty(pool_len: usize, n_categories: usize) -> Self {
        Attribution {
            points: Array1::zeros(pool_len),
            category_ranks: Array2::zeros((pool_len, n_categories)),
            appearances: Array1::zeros(pool_len),
        }
    }

    /// Attribute one chunk of simulated leagues.
    ///
    /// `teams` is (trials, teams, roster), `team_points` (trials, teams) and
    /// `team_ranks` (trials, teams, categories).
    pub fn from_league(
        pool_len: usize,
        teams: ArrayView3<usize>,
        team_points: ArrayView2<f64>,
        team_ranks: ArrayView3<f64>,
    ) -> Result<Self> {
        let (trials, n_teams, _) = teams.dim();
        if team_points.dim() != (trials, n_teams) {
            return Err(shape_error(
                "attribution points",
                vec![trials, n_teams],
                team_points.shape().to_vec(),
            )
            .into());
        }
        let (rank_trials, rank_teams, n_categories) = team_ranks.dim();
        if (rank_trials, rank_teams) != (trials, n_teams) {
            return Err(shape_error(
                "attribution ranks",
                vec![trials, n_teams, n_categories],
                team_ranks.shape().to_vec(),
            )
            .into());
        }

        let slots = trials * n_teams;
        let mask = membership_mask(pool_len, teams)?;
        let flat_points = team_points
            .to_shape(slots)
            .map_err(|_| shape_error("attribution points", vec![slots], team_points.shape().to_vec()))?;
        let flat_ranks = team_ranks
            .to_shape((slots, n_categories))
            .map_err(|_| {
                shape_error(
                    "attribution ranks",
                    vec![slots, n_categories],
                    team_ranks.shape().to_vec(),
                )
            })?;

        let mut attribution = Attribution::empty(pool_len, n_categories);
        Zip::from(mask.rows())
            .and(&mut attribution.points)
            .and(attribution.category_ranks.rows_mut())
            .and(&mut attribution.appearances)
            .for_each(|member, points, mut ranks, count| {
                for (slot, &on_roster) in member.iter().enumerate() {
                    if !on_roster {
                        continue;
                    }
                    *points += flat_points[slot];
                    ranks += &flat_ranks.row(slot);
                    *count += 1;
                }
            });
        Ok(attribution)
    }

    /// Combine with another chunk over the same pool and categories.
    pub fn merge(mut self, other: &Attribution) -> Result<Self> {
        if self.category_ranks.dim() != other.category_ranks.dim() {
            let (p, c) = self.category_ranks.dim();
            let (op, oc) = other.category_ranks.dim();
            return Err(shape_error("attribution merge", vec![p, c], vec![op, oc]).into());
        }
        self.points += &other.points;
        self.category_ranks += &other.category_ranks;
        self.appearances += &other.appearances;
        Ok(self)
    }

    pub fn appearances(&self) -> &Array1<u64> {
        &self.appearances
    }

    /// Total number of roster spots filled across all attributed slots.
    pub fn total_appearances(&self) -> u64 {
        self.appearances.sum()
    }

    /// Mean team points per player; `None` for players never drafted.
    pub fn mean_points(&self) -> Vec<Option<f64>> {
        self.points
            .iter()
            .zip(self.appearances.iter())
            .map(|(&sum, &n)| (n > 0).then(|| sum / n as f64))
            .collect()
    }

    /// Mean rank per category per player; rows of `None` for players never
    /// drafted.
    pub fn mean_category_ranks(&self) -> Vec<Vec<Option<f64>>> {
        self.category_ranks
            .axis_iter(Axis(0))
            .zip(self.appearances.iter())
            .map(|(sums, &n)| {
                sums.iter()
                    .map(|&sum| (n > 0).then(|| sum / n as f64))
                    .collect()
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
