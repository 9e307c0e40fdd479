use st_frame::Frame;
use st_types::Scalar;
use tracing::{error, warn};

use crate::error::PipelineError;

/// The price columns a raw price list carries as free text. Built fresh
/// per call so callers can extend their copy freely.
#[must_use]
pub fn default_price_columns() -> Vec<String> {
    ["SalePrice", "InitialPrice", "PurchasePrice"]
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}

/// Coerce free-text price columns to numbers by stripping every character
/// that is not a digit or a decimal point ("1,234.50 лв" becomes 1234.5).
///
/// Tolerant by contract: absent columns are skipped with a warning, an
/// empty column list is a logged no-op, and a column with any unparseable
/// value is left untouched (an error is logged) while the others still
/// convert. Missing cells stay missing.
pub fn format_prices(frame: &Frame, columns: &[String]) -> Result<Frame, PipelineError> {
    if columns.is_empty() {
        warn!("no price columns requested; returning the table unchanged");
        return Ok(frame.clone());
    }

    let mut out = frame.clone();
    for name in columns {
        let Some(column) = out.column(name) else {
            warn!(column = %name, "price column not present; skipping");
            continue;
        };

        match convert_column(column.values()) {
            Ok(values) => out = out.insert_column(name, values)?,
            Err(sample) => {
                error!(
                    column = %name,
                    value = %sample,
                    "price value did not parse after stripping; column left unconverted"
                );
            }
        }
    }
    Ok(out)
}

/// Err carries the first offending raw value, for the log line.
fn convert_column(values: &[Scalar]) -> Result<Vec<Scalar>, String> {
    let mut converted = Vec::with_capacity(values.len());
    for value in values {
        if value.is_missing() {
            converted.push(value.clone());
            continue;
        }
        let stripped: String = value
            .to_string()
            .chars()
            .filter(|ch| ch.is_ascii_digit() || *ch == '.')
            .collect();
        match stripped.parse::<f64>() {
            Ok(number) => converted.push(Scalar::Float64(number)),
            Err(_) => return Err(value.to_string()),
        }
    }
    Ok(converted)
}

#[derive(Debug, Clone)]
pub struct PriceCleanOptions {
    pub plant: i64,
    pub rename: Vec<(String, String)>,
}

impl Default for PriceCleanOptions {
    fn default() -> Self {
        Self {
            plant: 4315,
            rename: vec![("Material".to_owned(), "SKU_CODE".to_owned())],
        }
    }
}

/// Filter the price list to one plant and rename its identifying columns
/// (`Material` → `SKU_CODE` by default). `Plant` and every rename source
/// must exist; all missing names are reported in one failure. Run
/// [`format_prices`] first when the price columns are free text.
pub fn clean_prices(frame: &Frame, options: &PriceCleanOptions) -> Result<Frame, PipelineError> {
    let mut required = vec!["Plant".to_owned()];
    required.extend(options.rename.iter().map(|(from, _)| from.clone()));
    frame.require_columns(&required)?;

    let filtered = frame
        .filter_eq("Plant", &Scalar::Int64(options.plant))?
        .reset_index();
    Ok(filtered.rename_columns(&options.rename)?)
}

#[cfg(test)]
mod tests {
    use st_frame::{Frame, FrameError};
    use st_types::Scalar;

    use super::{PriceCleanOptions, clean_prices, default_price_columns, format_prices};
    use crate::error::PipelineError;

    fn raw_prices() -> Frame {
        let s = |v: &str| Scalar::Utf8(v.to_owned());
        Frame::from_columns(vec![
            ("Material", vec![Scalar::Int64(101), Scalar::Int64(102), Scalar::Int64(103)]),
            (
                "Plant",
                vec![Scalar::Int64(4315), Scalar::Int64(9000), Scalar::Int64(4315)],
            ),
            ("SalePrice", vec![s("19.90 лв"), s("25.00"), s("1,034.50")]),
        ])
        .expect("raw prices")
    }

    #[test]
    fn format_strips_currency_noise() {
        let out = format_prices(&raw_prices(), &["SalePrice".to_owned()]).expect("format");
        assert_eq!(
            out.column("SalePrice").expect("col").values(),
            &[
                Scalar::Float64(19.9),
                Scalar::Float64(25.0),
                Scalar::Float64(1034.5)
            ]
        );
    }

    #[test]
    fn format_skips_absent_columns_and_converts_the_rest() {
        let out = format_prices(
            &raw_prices(),
            &["NoSuchCol".to_owned(), "SalePrice".to_owned()],
        )
        .expect("format");
        assert_eq!(
            out.column("SalePrice").expect("col").values()[0],
            Scalar::Float64(19.9)
        );
    }

    #[test]
    fn format_with_no_columns_is_a_no_op() {
        let frame = raw_prices();
        let out = format_prices(&frame, &[]).expect("format");
        assert!(out.semantic_eq(&frame));
    }

    #[test]
    fn unparseable_value_leaves_the_whole_column_unconverted() {
        let s = |v: &str| Scalar::Utf8(v.to_owned());
        let frame = Frame::from_columns(vec![
            ("SalePrice", vec![s("19.90"), s("n/a")]),
            ("InitialPrice", vec![s("29.90"), s("31.00")]),
        ])
        .expect("frame");

        let out = format_prices(
            &frame,
            &["SalePrice".to_owned(), "InitialPrice".to_owned()],
        )
        .expect("format");
        // "n/a" strips to "" and fails to parse: original values retained
        assert_eq!(out.column("SalePrice").expect("col").values()[0], s("19.90"));
        // the sibling column still converts
        assert_eq!(
            out.column("InitialPrice").expect("col").values()[1],
            Scalar::Float64(31.0)
        );
    }

    #[test]
    fn format_keeps_missing_cells_missing() {
        let frame = Frame::from_columns(vec![(
            "SalePrice",
            vec![Scalar::Null, Scalar::Utf8("12.50".into())],
        )])
        .expect("frame");
        let out = format_prices(&frame, &["SalePrice".to_owned()]).expect("format");
        assert_eq!(out.column("SalePrice").expect("col").values()[0], Scalar::Null);
        assert_eq!(
            out.column("SalePrice").expect("col").values()[1],
            Scalar::Float64(12.5)
        );
    }

    #[test]
    fn default_columns_convert_every_price_field() {
        let s = |v: &str| Scalar::Utf8(v.to_owned());
        let frame = Frame::from_columns(vec![
            ("SalePrice", vec![s("19.90 лв")]),
            ("InitialPrice", vec![s("29.90 лв")]),
            ("PurchasePrice", vec![s("8.00 лв")]),
        ])
        .expect("frame");

        let out = format_prices(&frame, &default_price_columns()).expect("format");
        for name in default_price_columns() {
            assert!(matches!(
                out.column(&name).expect("col").values()[0],
                Scalar::Float64(_)
            ));
        }
    }

    #[test]
    fn clean_filters_plant_and_renames_material() {
        let out = clean_prices(&raw_prices(), &PriceCleanOptions::default()).expect("clean");
        assert_eq!(out.len(), 2);
        assert_eq!(out.index(), &[0, 1]);
        assert_eq!(out.names(), vec!["SKU_CODE", "Plant", "SalePrice"]);
        assert_eq!(
            out.column("SKU_CODE").expect("col").values(),
            &[Scalar::Int64(101), Scalar::Int64(103)]
        );
    }

    #[test]
    fn clean_reports_all_missing_required_columns() {
        let frame = Frame::from_columns(vec![(
            "SalePrice",
            vec![Scalar::Float64(1.0)],
        )])
        .expect("frame");
        let err = clean_prices(&frame, &PriceCleanOptions::default()).expect_err("missing");
        match err {
            PipelineError::Frame(FrameError::MissingColumns { columns }) => {
                assert_eq!(columns, vec!["Plant".to_owned(), "Material".to_owned()]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }
}
