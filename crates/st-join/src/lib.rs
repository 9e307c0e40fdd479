#![forbid(unsafe_code)]

use std::collections::HashMap;

use st_frame::{Frame, FrameError};
use st_types::{KeyScalar, Scalar};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JoinError {
    #[error(transparent)]
    Frame(#[from] FrameError),
}

#[derive(Debug, Clone)]
pub struct MergeSpec {
    /// Columns carried over from the price table; the join key must be one
    /// of them.
    pub needed_right_columns: Vec<String>,
    pub on: String,
}

impl Default for MergeSpec {
    fn default() -> Self {
        Self {
            needed_right_columns: ["SKU_CODE", "SalePrice", "InitialPrice", "PurchasePrice"]
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            on: "SKU_CODE".to_owned(),
        }
    }
}

/// Left join: every row of `left` is kept. A key matching several `right`
/// rows fans out (the left row repeats once per match); an unmatched key
/// gets Null in every attached column. Attached columns are
/// `needed_right_columns` minus the key, appended after the left columns.
pub fn merge(left: &Frame, right: &Frame, spec: &MergeSpec) -> Result<Frame, JoinError> {
    let needed: Vec<&str> = spec
        .needed_right_columns
        .iter()
        .map(String::as_str)
        .collect();
    right.require_columns(&needed)?;
    left.require_columns(&[spec.on.as_str()])?;
    let restricted = right.select_columns(&needed)?;
    let right_key = restricted.column_required(&spec.on)?;

    let mut right_map: HashMap<KeyScalar, Vec<usize>> = HashMap::new();
    for (pos, value) in right_key.values().iter().enumerate() {
        right_map
            .entry(KeyScalar::new(value.clone()))
            .or_default()
            .push(pos);
    }

    let left_key = left.column_required(&spec.on)?;
    let mut left_positions: Vec<usize> = Vec::with_capacity(left.len());
    let mut right_positions: Vec<Option<usize>> = Vec::with_capacity(left.len());
    for (left_pos, value) in left_key.values().iter().enumerate() {
        match right_map.get(&KeyScalar::new(value.clone())) {
            Some(matches) => {
                for right_pos in matches {
                    left_positions.push(left_pos);
                    right_positions.push(Some(*right_pos));
                }
            }
            None => {
                left_positions.push(left_pos);
                right_positions.push(None);
            }
        }
    }

    let mut out = left.take_rows(&left_positions).reset_index();
    for name in &needed {
        if *name == spec.on {
            continue;
        }
        let source = restricted.column_required(name)?;
        let values: Vec<Scalar> = right_positions
            .iter()
            .map(|pos| match pos {
                Some(pos) => source.values()[*pos].clone(),
                None => Scalar::Null,
            })
            .collect();
        out = out.insert_column(name, values)?;
    }

    Ok(out)
}
