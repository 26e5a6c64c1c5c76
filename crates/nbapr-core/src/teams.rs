// Team formation: split each trial's draft into rosters.

use ndarray::{Array2, Array3};

use crate::error::{DataShapeError, Result};

/// Reshape a (trials, n_teams * n_players) sample matrix into
/// (trials, n_teams, n_players).
///
/// Row-major: the first `n_players` picks of a trial are team 0, the next
/// `n_players` are team 1, and so on. Values are not reordered.
pub fn form_teams(samples: Array2<usize>, n_teams: usize, n_players: usize) -> Result<Array3<usize>> {
    let (trials, picks) = samples.dim();
    if picks != n_teams * n_players {
        return Err(DataShapeError::ShapeMismatch {
            stage: "team formation",
            expected: vec![trials, n_teams * n_players],
            found: vec![trials, picks],
        }
        .into());
    }
    // Row-major grouping needs standard layout.
    let samples = samples.as_standard_layout().into_owned();
    let teams = samples
        .into_shape_with_order((trials, n_teams, n_players))
        .map_err(|_| DataShapeError::ShapeMismatch {
            stage: "team formation",
            expected: vec![trials, n_teams, n_players],
            found: vec![trials, picks],
        })?;
    Ok(teams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimulationError;
    use ndarray::{array, s};

    #[test]
    fn groups_consecutive_picks_into_teams() {
        let samples = array![[0, 1, 2, 3, 4, 5], [6, 7, 8, 9, 10, 11]];
        let teams = form_teams(samples, 3, 2).unwrap();
        assert_eq!(teams.dim(), (2, 3, 2));
        assert_eq!(teams.slice(s![0, 0, ..]).to_vec(), vec![0, 1]);
        assert_eq!(teams.slice(s![0, 2, ..]).to_vec(), vec![4, 5]);
        assert_eq!(teams.slice(s![1, 1, ..]).to_vec(), vec![8, 9]);
    }

    #[test]
    fn column_major_input_keeps_row_major_grouping() {
        let samples = array![[0, 1, 2, 3], [4, 5, 6, 7]];
        let transposed_twice = samples.t().to_owned().reversed_axes();
        let teams = form_teams(transposed_twice, 2, 2).unwrap();
        assert_eq!(teams.slice(s![1, 0, ..]).to_vec(), vec![4, 5]);
    }

    #[test]
    fn rejects_mismatched_pick_count() {
        let samples = array![[0, 1, 2]];
        let err = form_teams(samples, 2, 2).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::DataShape(DataShapeError::ShapeMismatch { stage: "team formation", .. })
        ));
    }
}
