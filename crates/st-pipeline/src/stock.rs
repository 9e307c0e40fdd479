use st_frame::Frame;
use st_types::{DType, Scalar};

use crate::error::PipelineError;

#[derive(Debug, Clone)]
pub struct StockOptions {
    pub concept_filter: String,
    pub columns_to_drop: Vec<String>,
    pub int_columns: Vec<String>,
}

impl Default for StockOptions {
    fn default() -> Self {
        Self {
            concept_filter: "OUTLET".to_owned(),
            columns_to_drop: [
                "STOCK_UPDATE",
                "SIZE",
                "Subcategory",
                "Licence",
                "Barcode",
                "STOCK_WITHOUT_REZERVED",
                "REZERVED",
            ]
            .iter()
            .map(|s| (*s).to_owned())
            .collect(),
            int_columns: vec!["AVAILABLE".to_owned()],
        }
    }
}

/// Clean a raw stock-availability export: drop the noise columns
/// (tolerating ones a given export happens to lack), keep only the rows
/// for one retail concept, renumber, then force the quantity columns to
/// integers. The integer cast fails loudly on fractional or textual
/// values; silently truncating inventory counts is never acceptable.
pub fn process_stock(frame: &Frame, options: &StockOptions) -> Result<Frame, PipelineError> {
    let dropped = frame.drop_columns(&options.columns_to_drop, true)?;

    let mut required = vec!["Concept".to_owned()];
    required.extend(options.int_columns.iter().cloned());
    dropped.require_columns(&required)?;

    let mut out = dropped
        .filter_eq(
            "Concept",
            &Scalar::Utf8(options.concept_filter.clone()),
        )?
        .reset_index();

    for name in &options.int_columns {
        out = out.cast_column(name, DType::Int64)?;
    }
    Ok(out)
}
