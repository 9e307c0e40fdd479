#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use st_types::{DType, Scalar, TypeError, cast_scalar, common_dtype};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("missing required columns: {columns:?}")]
    MissingColumns { columns: Vec<String> },
    #[error("duplicate column name {name:?}")]
    DuplicateColumn { name: String },
    #[error("column {name:?} has {actual} values but the frame has {expected} rows")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("column order {order:?} is not a permutation of the frame's columns")]
    InvalidColumnOrder { order: Vec<String> },
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// A single column of cell values. The dtype is inferred on construction:
/// numerics widen to Float64, and a numeric/text mix degrades to Utf8
/// without rewriting the stored values (a pandas object column).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    dtype: DType,
    values: Vec<Scalar>,
}

impl Column {
    #[must_use]
    pub fn from_values(values: Vec<Scalar>) -> Self {
        let mut dtype = DType::Null;
        for value in &values {
            dtype = match common_dtype(dtype, value.dtype()) {
                Ok(widened) => widened,
                Err(_) => DType::Utf8,
            };
        }
        Self { dtype, values }
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    #[must_use]
    pub fn value(&self, idx: usize) -> Option<&Scalar> {
        self.values.get(idx)
    }

    /// Rows at the given positions, in the given order. Positions must be
    /// in bounds; this is an internal reindexing primitive.
    #[must_use]
    pub fn take(&self, positions: &[usize]) -> Self {
        let values = positions
            .iter()
            .map(|pos| self.values[*pos].clone())
            .collect();
        Self::from_values(values)
    }

    /// Cast every value to the target dtype. Fails loudly on any lossy or
    /// non-numeric conversion; missing values stay missing.
    pub fn cast(&self, target: DType) -> Result<Self, TypeError> {
        let values = self
            .values
            .iter()
            .map(|value| cast_scalar(value, target))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            dtype: target,
            values,
        })
    }

    #[must_use]
    pub fn semantic_eq(&self, other: &Self) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(a, b)| a.semantic_eq(b))
    }
}

/// An in-memory table: uniquely named columns whose left-to-right order is
/// significant, plus a row-label index. Filtering keeps the surviving
/// labels; `reset_index` renumbers them `0..n`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<(String, Column)>,
    index: Vec<i64>,
}

impl Frame {
    pub fn new(columns: Vec<(String, Column)>) -> Result<Self, FrameError> {
        let rows = columns.first().map_or(0, |(_, col)| col.len());
        for (name, column) in &columns {
            if column.len() != rows {
                return Err(FrameError::LengthMismatch {
                    name: name.clone(),
                    expected: rows,
                    actual: column.len(),
                });
            }
        }
        for (pos, (name, _)) in columns.iter().enumerate() {
            if columns[..pos].iter().any(|(other, _)| other == name) {
                return Err(FrameError::DuplicateColumn { name: name.clone() });
            }
        }
        let index = (0..rows as i64).collect();
        Ok(Self { columns, index })
    }

    /// Convenience constructor from (name, cells) pairs.
    pub fn from_columns<N: Into<String>>(
        columns: Vec<(N, Vec<Scalar>)>,
    ) -> Result<Self, FrameError> {
        Self::new(
            columns
                .into_iter()
                .map(|(name, values)| (name.into(), Column::from_values(values)))
                .collect(),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    #[must_use]
    pub fn index(&self) -> &[i64] {
        &self.index
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(other, _)| other == name)
            .map(|(_, column)| column)
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Check that every requested column exists, reporting all missing
    /// names in one failure rather than stopping at the first.
    pub fn require_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<(), FrameError> {
        let missing: Vec<String> = names
            .iter()
            .map(|name| name.as_ref())
            .filter(|name| !self.has_column(name))
            .map(str::to_owned)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FrameError::MissingColumns { columns: missing })
        }
    }

    pub fn column_required(&self, name: &str) -> Result<&Column, FrameError> {
        self.column(name).ok_or_else(|| FrameError::MissingColumns {
            columns: vec![name.to_owned()],
        })
    }

    /// Rows at the given positions, in order, keeping their index labels.
    #[must_use]
    pub fn take_rows(&self, positions: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|(name, column)| (name.clone(), column.take(positions)))
            .collect();
        let index = positions.iter().map(|pos| self.index[*pos]).collect();
        Self { columns, index }
    }

    /// Keep the rows where `column == value` (semantic equality, so
    /// Int64(4315) matches Float64(4315.0)). Surviving rows keep their
    /// original index labels.
    pub fn filter_eq(&self, column: &str, value: &Scalar) -> Result<Self, FrameError> {
        let target = self.column_required(column)?;
        let positions: Vec<usize> = target
            .values()
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.semantic_eq(value))
            .map(|(pos, _)| pos)
            .collect();
        Ok(self.take_rows(&positions))
    }

    /// Renumber the row index to a contiguous `0..n`.
    #[must_use]
    pub fn reset_index(mut self) -> Self {
        self.index = (0..self.len() as i64).collect();
        self
    }

    /// Drop the named columns. With `tolerate_missing` the drop set is
    /// first filtered to the columns that exist; otherwise absent names
    /// are a `MissingColumns` failure.
    pub fn drop_columns<S: AsRef<str>>(
        &self,
        names: &[S],
        tolerate_missing: bool,
    ) -> Result<Self, FrameError> {
        if !tolerate_missing {
            self.require_columns(names)?;
        }
        let dropped: Vec<&str> = names.iter().map(|name| name.as_ref()).collect();
        let columns = self
            .columns
            .iter()
            .filter(|(name, _)| !dropped.contains(&name.as_str()))
            .cloned()
            .collect();
        Ok(Self {
            columns,
            index: self.index.clone(),
        })
    }

    /// Rename columns per `(from, to)` pairs. Every `from` must exist
    /// (aggregated into one failure) and no `to` may collide with a column
    /// that survives the rename.
    pub fn rename_columns(&self, renames: &[(String, String)]) -> Result<Self, FrameError> {
        let froms: Vec<&str> = renames.iter().map(|(from, _)| from.as_str()).collect();
        self.require_columns(&froms)?;

        for (_, to) in renames {
            let collides = self
                .columns
                .iter()
                .any(|(name, _)| name == to && !froms.contains(&name.as_str()));
            if collides {
                return Err(FrameError::DuplicateColumn { name: to.clone() });
            }
        }

        let columns = self
            .columns
            .iter()
            .map(|(name, column)| {
                let renamed = renames
                    .iter()
                    .find(|(from, _)| from == name)
                    .map_or_else(|| name.clone(), |(_, to)| to.clone());
                (renamed, column.clone())
            })
            .collect();
        Ok(Self {
            columns,
            index: self.index.clone(),
        })
    }

    /// Restrict to the named columns, in the given order.
    pub fn select_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, FrameError> {
        self.require_columns(names)?;
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            columns.push((name.to_owned(), self.column_required(name)?.clone()));
        }
        Ok(Self {
            columns,
            index: self.index.clone(),
        })
    }

    /// Assign a column: overwrite in place when the name exists, append at
    /// the right edge otherwise.
    pub fn insert_column(&self, name: &str, values: Vec<Scalar>) -> Result<Self, FrameError> {
        if values.len() != self.len() {
            return Err(FrameError::LengthMismatch {
                name: name.to_owned(),
                expected: self.len(),
                actual: values.len(),
            });
        }
        let column = Column::from_values(values);
        let mut columns = self.columns.clone();
        match columns.iter_mut().find(|(other, _)| other == name) {
            Some((_, existing)) => *existing = column,
            None => columns.push((name.to_owned(), column)),
        }
        Ok(Self {
            columns,
            index: self.index.clone(),
        })
    }

    /// Reorder columns to exactly `order`, which must be a permutation of
    /// the current names.
    pub fn reorder_columns<S: AsRef<str>>(&self, order: &[S]) -> Result<Self, FrameError> {
        let order: Vec<&str> = order.iter().map(|name| name.as_ref()).collect();
        let has_duplicates = order
            .iter()
            .enumerate()
            .any(|(pos, name)| order[..pos].contains(name));
        if order.len() != self.columns.len() || has_duplicates {
            return Err(FrameError::InvalidColumnOrder {
                order: order.iter().map(|s| (*s).to_owned()).collect(),
            });
        }
        let mut columns = Vec::with_capacity(order.len());
        for name in &order {
            match self.columns.iter().find(|(other, _)| other == name) {
                Some((name, column)) => columns.push((name.clone(), column.clone())),
                None => {
                    return Err(FrameError::InvalidColumnOrder {
                        order: order.iter().map(|s| (*s).to_owned()).collect(),
                    });
                }
            }
        }
        // equal length + every name resolved + unique source names ⇒ permutation
        Ok(Self {
            columns,
            index: self.index.clone(),
        })
    }

    /// Cast one column to a dtype, failing loudly on lossy conversions.
    pub fn cast_column(&self, name: &str, dtype: DType) -> Result<Self, FrameError> {
        let column = self.column_required(name)?.cast(dtype)?;
        let columns = self
            .columns
            .iter()
            .map(|(other, existing)| {
                if other == name {
                    (other.clone(), column.clone())
                } else {
                    (other.clone(), existing.clone())
                }
            })
            .collect();
        Ok(Self {
            columns,
            index: self.index.clone(),
        })
    }

    /// Value-level equality that treats NaN as equal to NaN; index labels
    /// and column order must match too.
    #[must_use]
    pub fn semantic_eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(other.columns.iter())
                .all(|((a_name, a), (b_name, b))| a_name == b_name && a.semantic_eq(b))
    }
}
