// Tie-aware ranking of numeric arrays along an arbitrary axis.
//
// The smallest value receives rank 1, so a larger category total always earns
// more points. Each 1-D lane along the ranking axis is ranked on its own.

use std::cmp::Ordering;
use std::str::FromStr;

use ndarray::{Array, ArrayBase, Axis, Data, Dimension, Zip};
use serde::Deserialize;

use crate::error::{ConfigurationError, DataShapeError, Result};

// ---------------------------------------------------------------------------
// Tie-break conventions
// ---------------------------------------------------------------------------

/// How tied values share rank positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieMethod {
    /// Mean of the positions the tied group occupies.
    #[default]
    Average,
    /// Lowest position of the tied group.
    Min,
    /// Highest position of the tied group.
    Max,
    /// Distinct values numbered 1, 2, 3, ... with no gaps.
    Dense,
    /// Ties broken by input position.
    Ordinal,
}

impl TieMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TieMethod::Average => "average",
            TieMethod::Min => "min",
            TieMethod::Max => "max",
            TieMethod::Dense => "dense",
            TieMethod::Ordinal => "ordinal",
        }
    }
}

impl FromStr for TieMethod {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "average" => Ok(TieMethod::Average),
            "min" => Ok(TieMethod::Min),
            "max" => Ok(TieMethod::Max),
            "dense" => Ok(TieMethod::Dense),
            "ordinal" => Ok(TieMethod::Ordinal),
            _ => Err(ConfigurationError::UnknownTieMethod(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// 1-D ranking
// ---------------------------------------------------------------------------

/// Rank a slice of values. Returns one rank per input, starting at 1.
pub fn rank_slice(values: &[f64], method: TieMethod) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }

    // Stable sort keeps equal values in input order, which is what
    // `Ordinal` relies on.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    if method == TieMethod::Ordinal {
        for (pos, &idx) in order.iter().enumerate() {
            ranks[idx] = (pos + 1) as f64;
        }
        return ranks;
    }

    let mut dense = 0usize;
    let mut start = 0usize;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]].total_cmp(&values[order[start]]) == Ordering::Equal {
            end += 1;
        }
        dense += 1;
        // Positions start+1 ..= end are occupied by this tied group.
        let rank = match method {
            TieMethod::Average => (start + 1 + end) as f64 / 2.0,
            TieMethod::Min => (start + 1) as f64,
            TieMethod::Max => end as f64,
            TieMethod::Dense => dense as f64,
            TieMethod::Ordinal => unreachable!("handled above"),
        };
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}

// ---------------------------------------------------------------------------
// n-D ranking
// ---------------------------------------------------------------------------

/// Rank every lane of `array` along `axis` independently.
///
/// The output has the same shape as the input. An empty input yields an
/// empty output without ranking anything.
pub fn rank_axis<S, D>(
    array: &ArrayBase<S, D>,
    axis: Axis,
    method: TieMethod,
) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    if axis.index() >= array.ndim() {
        return Err(DataShapeError::InvalidAxis {
            axis: axis.index(),
            ndim: array.ndim(),
        }
        .into());
    }

    let mut ranked = Array::<f64, D>::zeros(array.raw_dim());
    if array.is_empty() {
        return Ok(ranked);
    }

    let mut buf = Vec::with_capacity(array.len_of(axis));
    Zip::from(array.lanes(axis))
        .and(ranked.lanes_mut(axis))
        .for_each(|lane, mut out| {
            buf.clear();
            buf.extend(lane.iter().copied());
            for (slot, rank) in out.iter_mut().zip(rank_slice(&buf, method)) {
                *slot = rank;
            }
        });
    Ok(ranked)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
