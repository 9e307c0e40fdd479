use st_frame::Frame;
use st_types::Scalar;

use crate::error::PipelineError;
use crate::formulas::Formula;
use crate::reorder::move_after;

/// Post-assignment touch-up applied to the freshly written column.
#[derive(Debug, Clone, Copy)]
pub enum Formatter {
    Round { decimals: i32 },
}

impl Formatter {
    fn apply(&self, frame: &Frame, column: &str) -> Result<Frame, PipelineError> {
        match self {
            Self::Round { decimals } => {
                let factor = 10f64.powi(*decimals);
                let source = frame.column_required(column)?;
                let mut values = Vec::with_capacity(source.len());
                for cell in source.values() {
                    if cell.is_missing() {
                        values.push(cell.clone());
                        continue;
                    }
                    let number = cell.numeric_or_nan()?;
                    values.push(Scalar::Float64((number * factor).round() / factor));
                }
                Ok(frame.insert_column(column, values)?)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddColumnOptions {
    pub formula: Option<Formula>,
    pub formatter: Option<Formatter>,
    pub after: Option<String>,
}

/// Add (or overwrite) a derived column. The steps compose in a fixed
/// order: compute the values (a Null-filled column when no formula is
/// given), assign, apply the formatter, then reposition the column after
/// `after` when requested.
pub fn add_column(
    frame: &Frame,
    name: &str,
    options: &AddColumnOptions,
) -> Result<Frame, PipelineError> {
    let values = match &options.formula {
        Some(formula) => formula.apply(frame)?,
        None => vec![Scalar::Null; frame.len()],
    };

    let mut out = frame.insert_column(name, values)?;
    if let Some(formatter) = &options.formatter {
        out = formatter.apply(&out, name)?;
    }
    if let Some(after) = &options.after {
        out = move_after(&out, after, &[name.to_owned()])?;
    }
    Ok(out)
}
