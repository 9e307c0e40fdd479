#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    Null,
    Int64,
    Float64,
    Utf8,
}

/// A single cell value. Missing data is either an explicit `Null` or a
/// `Float64` NaN; both count as missing for aggregation purposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Scalar {
    Null,
    Int64(i64),
    Float64(f64),
    Utf8(String),
}

impl Scalar {
    #[must_use]
    pub fn dtype(&self) -> DType {
        match self {
            Self::Null => DType::Null,
            Self::Int64(_) => DType::Int64,
            Self::Float64(_) => DType::Float64,
            Self::Utf8(_) => DType::Utf8,
        }
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Float64(v) => v.is_nan(),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int64(_) | Self::Float64(_))
    }

    pub fn to_f64(&self) -> Result<f64, TypeError> {
        match self {
            Self::Int64(v) => Ok(*v as f64),
            Self::Float64(v) => Ok(*v),
            Self::Null => Err(TypeError::ValueIsMissing),
            Self::Utf8(v) => Err(TypeError::NonNumericValue { value: v.clone() }),
        }
    }

    /// Numeric view for element-wise arithmetic: missing values become NaN
    /// so they propagate through the computation, text is still an error.
    pub fn numeric_or_nan(&self) -> Result<f64, TypeError> {
        match self {
            Self::Null => Ok(f64::NAN),
            Self::Utf8(v) => Err(TypeError::NonNumericValue { value: v.clone() }),
            other => other.to_f64(),
        }
    }

    /// Value equality that treats NaN as equal to NaN and compares
    /// numerics across dtypes, so Int64(4315) matches Float64(4315.0).
    #[must_use]
    pub fn semantic_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Float64(a), Self::Float64(b)) => (a.is_nan() && b.is_nan()) || (a == b),
            (Self::Int64(a), Self::Float64(b)) | (Self::Float64(b), Self::Int64(a)) => {
                *a as f64 == *b
            }
            _ => self == other,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => {
                if v.is_nan() {
                    Ok(())
                } else {
                    write!(f, "{v}")
                }
            }
            Self::Utf8(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("dtypes {left:?} and {right:?} have no common numeric type")]
    IncompatibleDtypes { left: DType, right: DType },
    #[error("cannot cast {from:?} to {to:?}")]
    InvalidCast { from: DType, to: DType },
    #[error("cannot cast float {value} to int64 without loss")]
    LossyFloatToInt { value: f64 },
    #[error("value {value:?} is not numeric")]
    NonNumericValue { value: String },
    #[error("value is missing")]
    ValueIsMissing,
}

pub fn common_dtype(left: DType, right: DType) -> Result<DType, TypeError> {
    use DType::{Float64, Int64, Null, Utf8};

    let out = match (left, right) {
        (a, b) if a == b => a,
        (Null, other) | (other, Null) => other,
        (Int64, Float64) | (Float64, Int64) => Float64,
        _ => return Err(TypeError::IncompatibleDtypes { left, right }),
    };

    Ok(out)
}

pub fn infer_dtype(values: &[Scalar]) -> Result<DType, TypeError> {
    let mut current = DType::Null;
    for value in values {
        current = common_dtype(current, value.dtype())?;
    }
    Ok(current)
}

/// Cast a scalar to a target dtype. Lossy casts fail: a fractional float or
/// a text value never silently becomes an integer.
pub fn cast_scalar(value: &Scalar, target: DType) -> Result<Scalar, TypeError> {
    let from = value.dtype();
    if matches!(value, Scalar::Null) {
        return Ok(Scalar::Null);
    }
    if from == target {
        return Ok(value.clone());
    }

    match target {
        DType::Null => Ok(Scalar::Null),
        DType::Int64 => match value {
            Scalar::Float64(v) => {
                if v.is_nan() {
                    return Ok(Scalar::Null);
                }
                if !v.is_finite() || *v != v.trunc() {
                    return Err(TypeError::LossyFloatToInt { value: *v });
                }
                if *v < i64::MIN as f64 || *v > i64::MAX as f64 {
                    return Err(TypeError::LossyFloatToInt { value: *v });
                }
                Ok(Scalar::Int64(*v as i64))
            }
            Scalar::Utf8(v) => Err(TypeError::NonNumericValue { value: v.clone() }),
            _ => Err(TypeError::InvalidCast { from, to: target }),
        },
        DType::Float64 => match value {
            Scalar::Int64(v) => Ok(Scalar::Float64(*v as f64)),
            Scalar::Utf8(v) => Err(TypeError::NonNumericValue { value: v.clone() }),
            _ => Err(TypeError::InvalidCast { from, to: target }),
        },
        DType::Utf8 => Err(TypeError::InvalidCast { from, to: target }),
    }
}

// ── Grouping / join keys ───────────────────────────────────────────────

/// Hashable, totally ordered view of a scalar for use as a group or join
/// key. Integral Float64 values canonicalize to Int64 on construction, so
/// Int64(2) and Float64(2.0) land in the same bucket while integer keys
/// past 2^53 stay exact. NaN equals NaN, Null sorts first and Utf8 last.
#[derive(Debug, Clone)]
pub struct KeyScalar(Scalar);

impl KeyScalar {
    #[must_use]
    pub fn new(value: Scalar) -> Self {
        let canonical = match value {
            Scalar::Float64(v) if v.is_nan() => Scalar::Float64(f64::NAN),
            // upper bound is exclusive: i64::MAX as f64 rounds up to 2^63
            Scalar::Float64(v)
                if v.is_finite()
                    && v == v.trunc()
                    && v >= i64::MIN as f64
                    && v < i64::MAX as f64 =>
            {
                Scalar::Int64(v as i64)
            }
            other => other,
        };
        Self(canonical)
    }

    #[must_use]
    pub fn scalar(&self) -> &Scalar {
        &self.0
    }

    #[must_use]
    pub fn into_scalar(self) -> Scalar {
        self.0
    }

    fn rank(&self) -> u8 {
        match self.0 {
            Scalar::Null => 0,
            Scalar::Int64(_) | Scalar::Float64(_) => 1,
            Scalar::Utf8(_) => 2,
        }
    }

}

impl From<Scalar> for KeyScalar {
    fn from(value: Scalar) -> Self {
        Self::new(value)
    }
}

impl PartialEq for KeyScalar {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Int64(a), Scalar::Int64(b)) => a == b,
            // canonical floats are non-integral, infinite or the canonical
            // NaN, so bit equality is value equality
            (Scalar::Float64(a), Scalar::Float64(b)) => a.to_bits() == b.to_bits(),
            (Scalar::Utf8(a), Scalar::Utf8(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for KeyScalar {}

impl Hash for KeyScalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(self.rank());
        match &self.0 {
            Scalar::Null => {}
            Scalar::Int64(v) => state.write_i64(*v),
            Scalar::Float64(v) => state.write_u64(v.to_bits()),
            Scalar::Utf8(v) => v.hash(state),
        }
    }
}

impl Ord for KeyScalar {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_rank = self.rank().cmp(&other.rank());
        if by_rank != Ordering::Equal {
            return by_rank;
        }
        match (&self.0, &other.0) {
            (Scalar::Null, Scalar::Null) => Ordering::Equal,
            (Scalar::Utf8(a), Scalar::Utf8(b)) => a.cmp(b),
            (Scalar::Int64(a), Scalar::Int64(b)) => a.cmp(b),
            (Scalar::Float64(a), Scalar::Float64(b)) => a.total_cmp(b),
            // a canonical float never holds an integer value, so the
            // rounded cross comparison cannot report a false tie
            (Scalar::Int64(a), Scalar::Float64(b)) => (*a as f64).total_cmp(b),
            (Scalar::Float64(a), Scalar::Int64(b)) => a.total_cmp(&(*b as f64)),
            _ => unreachable!("ranks already matched"),
        }
    }
}

impl PartialOrd for KeyScalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ── Null-skipping reductions ───────────────────────────────────────────

fn collect_numeric(values: &[Scalar]) -> Vec<f64> {
    values
        .iter()
        .filter(|v| !v.is_missing())
        .filter_map(|v| v.to_f64().ok())
        .collect()
}

/// Sum that stays Int64 when every non-missing input is Int64, so stock
/// counts survive aggregation without widening to float.
pub fn nansum(values: &[Scalar]) -> Scalar {
    let all_int = values
        .iter()
        .filter(|v| !v.is_missing())
        .all(|v| matches!(v, Scalar::Int64(_)));
    if all_int {
        let total: i64 = values
            .iter()
            .filter_map(|v| match v {
                Scalar::Int64(n) => Some(*n),
                _ => None,
            })
            .sum();
        return Scalar::Int64(total);
    }
    Scalar::Float64(collect_numeric(values).iter().sum())
}

pub fn nanmean(values: &[Scalar]) -> Scalar {
    let nums = collect_numeric(values);
    if nums.is_empty() {
        return Scalar::Float64(f64::NAN);
    }
    let sum: f64 = nums.iter().sum();
    Scalar::Float64(sum / nums.len() as f64)
}

pub fn nancount(values: &[Scalar]) -> Scalar {
    let n = values.iter().filter(|v| !v.is_missing()).count();
    Scalar::Int64(n as i64)
}
