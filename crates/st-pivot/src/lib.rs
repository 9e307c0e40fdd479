#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use st_frame::{Frame, FrameError};
use st_types::{KeyScalar, Scalar, nancount, nanmean, nansum};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PivotError {
    #[error("unsupported aggregator {name:?} (expected sum, mean or count)")]
    UnsupportedAggregator { name: String },
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Associative reduction applied to each (index-key, store) cell group.
/// All three skip missing values the way pandas aggregations do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregator {
    #[default]
    Sum,
    Mean,
    Count,
}

impl Aggregator {
    #[must_use]
    pub fn apply(&self, values: &[Scalar]) -> Scalar {
        match self {
            Self::Sum => nansum(values),
            Self::Mean => nanmean(values),
            Self::Count => nancount(values),
        }
    }
}

impl FromStr for Aggregator {
    type Err = PivotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Self::Sum),
            "mean" => Ok(Self::Mean),
            "count" => Ok(Self::Count),
            other => Err(PivotError::UnsupportedAggregator {
                name: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PivotSpec {
    pub index_columns: Vec<String>,
    pub value_column: String,
    pub pivot_column: String,
    pub aggregator: Aggregator,
}

impl Default for PivotSpec {
    fn default() -> Self {
        Self {
            index_columns: [
                "SKU_CODE",
                "SKU_DESCRIPTION",
                "Brand",
                "Category",
                "Activity",
                "Gen",
                "Subgen",
            ]
            .iter()
            .map(|s| (*s).to_owned())
            .collect(),
            value_column: "AVAILABLE".to_owned(),
            pivot_column: "STORE_CODE".to_owned(),
            aggregator: Aggregator::Sum,
        }
    }
}

/// Group by `(index_columns..., pivot_column)`, aggregate `value_column`
/// per group, then unstack so each distinct pivot value becomes a column.
///
/// (index, pivot-value) combinations absent from the input are filled with
/// `0`: an absent stock line means zero stock, not unknown stock. Rows are
/// sorted by index-key tuple and pivot columns by key order, so identical
/// input always yields identical output.
pub fn pivot(frame: &Frame, spec: &PivotSpec) -> Result<Frame, PivotError> {
    let mut required: Vec<&str> = spec.index_columns.iter().map(String::as_str).collect();
    required.push(&spec.value_column);
    required.push(&spec.pivot_column);
    frame.require_columns(&required)?;

    let index_cols: Vec<_> = spec
        .index_columns
        .iter()
        .map(|name| frame.column_required(name))
        .collect::<Result<_, _>>()?;
    let value_col = frame.column_required(&spec.value_column)?;
    let pivot_col = frame.column_required(&spec.pivot_column)?;

    let mut groups: BTreeMap<Vec<KeyScalar>, BTreeMap<KeyScalar, Vec<Scalar>>> = BTreeMap::new();
    let mut pivot_keys: BTreeSet<KeyScalar> = BTreeSet::new();

    for row in 0..frame.len() {
        let key: Vec<KeyScalar> = index_cols
            .iter()
            .map(|column| KeyScalar::new(column.values()[row].clone()))
            .collect();
        let pivot_key = KeyScalar::new(pivot_col.values()[row].clone());
        pivot_keys.insert(pivot_key.clone());
        groups
            .entry(key)
            .or_default()
            .entry(pivot_key)
            .or_default()
            .push(value_col.values()[row].clone());
    }

    let mut out: Vec<(String, Vec<Scalar>)> = spec
        .index_columns
        .iter()
        .map(|name| (name.clone(), Vec::with_capacity(groups.len())))
        .collect();
    for key in groups.keys() {
        for (slot, part) in out.iter_mut().zip(key.iter()) {
            slot.1.push(part.scalar().clone());
        }
    }

    for pivot_key in &pivot_keys {
        let cells: Vec<Scalar> = groups
            .values()
            .map(|per_pivot| match per_pivot.get(pivot_key) {
                Some(values) => spec.aggregator.apply(values),
                None => Scalar::Int64(0),
            })
            .collect();
        out.push((pivot_key.scalar().to_string(), cells));
    }

    Ok(Frame::from_columns(out)?)
}
