// Team category totals and composite team points.

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis, Zip};

use crate::error::{DataShapeError, Result};

/// Sum each category over every roster.
///
/// `stats` is the (pool players x categories) matrix and `teams` the
/// (trials, teams, roster) tensor of pool row indices. The result has shape
/// (trials, teams, categories). No sign adjustment happens here: a category
/// where lower is better must already be negated in `stats`.
pub fn team_stats(stats: ArrayView2<f64>, teams: ArrayView3<usize>) -> Result<Array3<f64>> {
    let (pool_len, n_categories) = stats.dim();
    if n_categories == 0 {
        return Err(DataShapeError::NoCategories.into());
    }
    if let Some(&index) = teams.iter().find(|&&idx| idx >= pool_len) {
        return Err(DataShapeError::IndexOutOfRange {
            index,
            len: pool_len,
        }
        .into());
    }

    let (trials, n_teams, _) = teams.dim();
    let mut totals = Array3::<f64>::zeros((trials, n_teams, n_categories));
    Zip::from(totals.lanes_mut(Axis(2)))
        .and(teams.lanes(Axis(2)))
        .for_each(|mut total, roster| {
            for &player in roster.iter() {
                total += &stats.row(player);
            }
        });
    Ok(totals)
}

/// Composite score of each team: the sum of its category ranks.
pub fn team_points(ranks: ArrayView3<f64>) -> Array2<f64> {
    ranks.sum_axis(Axis(2))
}
