// Player score table: the engine's output.

use std::cmp::Ordering;

use serde::Serialize;

use crate::attribution::Attribution;
use crate::pool::{PlayerId, PlayerPool};

/// Averaged simulation result for one pool player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerScore {
    pub id: PlayerId,
    /// Pass-through descriptive values, ordered like [`ScoreTable::label_names`].
    pub labels: Vec<String>,
    /// Number of simulated teams the player was drafted onto.
    pub appearances: u64,
    /// Mean team points over those teams. `None` when never drafted.
    pub score: Option<f64>,
    /// Mean rank per category, ordered like [`ScoreTable::categories`].
    pub category_ranks: Vec<Option<f64>>,
}

/// One [`PlayerScore`] per pool row, in pool order unless re-sorted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreTable {
    pub categories: Vec<String>,
    pub label_names: Vec<String>,
    pub rows: Vec<PlayerScore>,
}

impl ScoreTable {
    /// Assemble the table from a pool and its accumulated attribution.
    pub fn from_attribution(pool: &PlayerPool, categories: Vec<String>, attribution: &Attribution) -> Self {
        let points = attribution.mean_points();
        let ranks = attribution.mean_category_ranks();
        let rows = pool
            .ids()
            .iter()
            .zip(points)
            .zip(ranks)
            .enumerate()
            .map(|(row, ((id, score), category_ranks))| PlayerScore {
                id: id.clone(),
                labels: pool.labels_of(row),
                appearances: attribution.appearances()[row],
                score,
                category_ranks,
            })
            .collect();
        ScoreTable {
            categories,
            label_names: pool.label_names().map(str::to_string).collect(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: &PlayerId) -> Option<&PlayerScore> {
        self.rows.iter().find(|r| &r.id == id)
    }

    /// Players never drafted in any trial.
    pub fn unscored(&self) -> impl Iterator<Item = &PlayerScore> {
        self.rows.iter().filter(|r| r.score.is_none())
    }

    /// Sort descending by score; players without a score go last.
    pub fn sorted_by_score(mut self) -> Self {
        self.rows.sort_by(|a, b| match (a.score, b.score) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        self
    }

    /// Express ranks relative to an average team in an `n_teams` league.
    ///
    /// Each category rank drops by the league-average rank
    /// `(n_teams + 1) / 2`; the total drops by that amount times the number of
    /// categories. Missing values stay missing.
    pub fn over_replacement(mut self, n_teams: usize) -> Self {
        let average_rank = (n_teams as f64 + 1.0) / 2.0;
        let total_baseline = average_rank * self.categories.len() as f64;
        for row in &mut self.rows {
            row.score = row.score.map(|s| s - total_baseline);
            for rank in &mut row.category_ranks {
                *rank = rank.map(|r| r - average_rank);
            }
        }
        self
    }
}
