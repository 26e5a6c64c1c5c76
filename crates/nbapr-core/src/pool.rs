// Player pool: the tabular input to the simulation engine.
//
// One row per player. Numeric columns hold both statistical categories and
// selection weights; label columns are carried through to the score table
// untouched.

use std::collections::HashSet;
use std::fmt;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{DataShapeError, Result};

// ---------------------------------------------------------------------------
// Player identity
// ---------------------------------------------------------------------------

/// Unique identity of a player row. Stats providers use either numeric ids
/// (nba.com `PLAYER_ID`) or names, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayerId {
    Num(i64),
    Name(String),
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerId::Num(n) => write!(f, "{n}"),
            PlayerId::Name(s) => f.write_str(s),
        }
    }
}

impl From<i64> for PlayerId {
    fn from(n: i64) -> Self {
        PlayerId::Num(n)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        PlayerId::Name(s.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(s: String) -> Self {
        PlayerId::Name(s)
    }
}

// ---------------------------------------------------------------------------
// Pool table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct NumericColumn {
    name: String,
    values: Vec<f64>,
}

#[derive(Debug, Clone)]
struct LabelColumn {
    name: String,
    values: Vec<String>,
}

/// Ordered player table consumed by [`crate::simulate::simulate`].
#[derive(Debug, Clone)]
pub struct PlayerPool {
    ids: Vec<PlayerId>,
    numeric: Vec<NumericColumn>,
    labels: Vec<LabelColumn>,
}

impl PlayerPool {
    /// Create a pool with the given identities and no columns.
    ///
    /// Fails with [`DataShapeError::DuplicateId`] if any identity repeats.
    pub fn new<I>(ids: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<PlayerId>,
    {
        let ids: Vec<PlayerId> = ids.into_iter().map(Into::into).collect();
        let mut seen = HashSet::with_capacity(ids.len());
        for id in &ids {
            if !seen.insert(id) {
                return Err(DataShapeError::DuplicateId(id.to_string()).into());
            }
        }
        Ok(PlayerPool {
            ids,
            numeric: Vec::new(),
            labels: Vec::new(),
        })
    }

    /// Add (or replace) a numeric column.
    pub fn with_column(mut self, name: &str, values: Vec<f64>) -> Result<Self> {
        self.check_len(name, values.len())?;
        match self.numeric.iter_mut().find(|c| c.name == name) {
            Some(col) => col.values = values,
            None => self.numeric.push(NumericColumn {
                name: name.to_string(),
                values,
            }),
        }
        Ok(self)
    }

    /// Add (or replace) a descriptive pass-through column.
    pub fn with_label(mut self, name: &str, values: Vec<String>) -> Result<Self> {
        self.check_len(name, values.len())?;
        match self.labels.iter_mut().find(|c| c.name == name) {
            Some(col) => col.values = values,
            None => self.labels.push(LabelColumn {
                name: name.to_string(),
                values,
            }),
        }
        Ok(self)
    }

    fn check_len(&self, name: &str, found: usize) -> Result<()> {
        if found != self.ids.len() {
            return Err(DataShapeError::ColumnLength {
                column: name.to_string(),
                expected: self.ids.len(),
                found,
            }
            .into());
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[PlayerId] {
        &self.ids
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.numeric.iter().any(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.numeric.iter().map(|c| c.name.as_str())
    }

    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|c| c.name.as_str())
    }

    /// Values of a numeric column, in pool order.
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.numeric
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| DataShapeError::MissingColumn(name.to_string()).into())
    }

    /// Label values of one row, ordered like [`PlayerPool::label_names`].
    pub fn labels_of(&self, row: usize) -> Vec<String> {
        self.labels
            .iter()
            .map(|c| c.values.get(row).cloned().unwrap_or_default())
            .collect()
    }

    /// Gather the named columns into a (players x categories) matrix.
    pub fn category_matrix<S: AsRef<str>>(&self, names: &[S]) -> Result<Array2<f64>> {
        if names.is_empty() {
            return Err(DataShapeError::NoCategories.into());
        }
        let columns = names
            .iter()
            .map(|n| self.column(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Array2::from_shape_fn((self.len(), columns.len()), |(row, col)| {
            columns[col][row]
        }))
    }

    /// A single numeric column as a 1-D array.
    pub fn weight_vector(&self, name: &str) -> Result<Array1<f64>> {
        Ok(Array1::from(self.column(name)?.to_vec()))
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimulationError;

    fn small_pool() -> PlayerPool {
        PlayerPool::new([1_i64, 2, 3])
            .unwrap()
            .with_column("PTS", vec![10.0, 20.0, 30.0])
            .unwrap()
            .with_column("REB", vec![1.0, 2.0, 3.0])
            .unwrap()
            .with_label("PLAYER_NAME", vec!["A".into(), "B".into(), "C".into()])
            .unwrap()
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = PlayerPool::new(["x", "y", "x"]).unwrap_err();
        assert_eq!(
            err,
            SimulationError::DataShape(DataShapeError::DuplicateId("x".into()))
        );
    }

    #[test]
    fn rejects_column_of_wrong_length() {
        let err = PlayerPool::new([1_i64, 2])
            .unwrap()
            .with_column("PTS", vec![1.0])
            .unwrap_err();
        assert!(matches!(
            err,
            SimulationError::DataShape(DataShapeError::ColumnLength { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn category_matrix_is_players_by_categories() {
        let pool = small_pool();
        let m = pool.category_matrix(&["REB", "PTS"]).unwrap();
        assert_eq!(m.dim(), (3, 2));
        assert_eq!(m[[2, 0]], 3.0);
        assert_eq!(m[[2, 1]], 30.0);
    }

    #[test]
    fn category_matrix_reports_missing_column() {
        let pool = small_pool();
        let err = pool.category_matrix(&["PTS", "AST"]).unwrap_err();
        assert_eq!(
            err,
            SimulationError::DataShape(DataShapeError::MissingColumn("AST".into()))
        );
    }

    #[test]
    fn category_matrix_requires_categories() {
        let pool = small_pool();
        let empty: [&str; 0] = [];
        assert!(pool.category_matrix(&empty).is_err());
    }

    #[test]
    fn replacing_a_column_keeps_order() {
        let pool = small_pool().with_column("PTS", vec![0.0, 0.0, 1.0]).unwrap();
        let names: Vec<&str> = pool.column_names().collect();
        assert_eq!(names, vec!["PTS", "REB"]);
        assert_eq!(pool.column("PTS").unwrap(), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn labels_follow_rows() {
        let pool = small_pool();
        assert_eq!(pool.labels_of(1), vec!["B".to_string()]);
    }

    #[test]
    fn player_id_display_and_serde() {
        assert_eq!(PlayerId::Num(203999).to_string(), "203999");
        assert_eq!(PlayerId::from("Jokic").to_string(), "Jokic");
        let json = serde_json::to_string(&PlayerId::Num(7)).unwrap();
        assert_eq!(json, "7");
        let back: PlayerId = serde_json::from_str("\"Curry\"").unwrap();
        assert_eq!(back, PlayerId::Name("Curry".into()));
    }
}
