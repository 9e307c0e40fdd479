use std::str::FromStr;

use st_frame::Frame;
use st_types::Scalar;

use crate::error::PipelineError;

/// Countries with a known VAT divisor. Markup works on tax-inclusive sale
/// prices, so the sale price is first divided back to its pre-VAT value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Country {
    #[default]
    Bg,
    Ro,
    Gr,
}

impl Country {
    #[must_use]
    pub fn vat_divisor(&self) -> f64 {
        match self {
            Self::Bg => 1.2,
            Self::Ro => 1.21,
            Self::Gr => 1.24,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Bg => "BG",
            Self::Ro => "RO",
            Self::Gr => "GR",
        }
    }
}

impl FromStr for Country {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BG" => Ok(Self::Bg),
            "RO" => Ok(Self::Ro),
            "GR" => Ok(Self::Gr),
            other => Err(PipelineError::UnsupportedCountry {
                country: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MarkupParams {
    pub cost_col: String,
    pub sale_col: String,
    pub country: Country,
    pub round_to: i32,
}

impl Default for MarkupParams {
    fn default() -> Self {
        Self {
            cost_col: "PurchasePrice".to_owned(),
            sale_col: "SalePrice".to_owned(),
            country: Country::Bg,
            round_to: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PercentageParams {
    pub init_col: String,
    pub sale_col: String,
}

impl Default for PercentageParams {
    fn default() -> Self {
        Self {
            init_col: "InitialPrice".to_owned(),
            sale_col: "SalePrice".to_owned(),
        }
    }
}

/// The closed set of derived-column computations. Each variant carries its
/// own explicit parameters and produces a numeric column the same length
/// as the frame, leaving the frame itself untouched.
#[derive(Debug, Clone)]
pub enum Formula {
    Markup(MarkupParams),
    PercentageChange(PercentageParams),
}

impl Formula {
    pub fn apply(&self, frame: &Frame) -> Result<Vec<Scalar>, PipelineError> {
        match self {
            Self::Markup(params) => markup(frame, params),
            Self::PercentageChange(params) => percentage(frame, params),
        }
    }
}

/// Element-wise `round(sale / vat_divisor / cost, round_to)`. Both price
/// columns must exist; missing names are reported together. Missing cells
/// yield NaN.
pub fn markup(frame: &Frame, params: &MarkupParams) -> Result<Vec<Scalar>, PipelineError> {
    frame.require_columns(&[params.cost_col.as_str(), params.sale_col.as_str()])?;
    let cost = frame.column_required(&params.cost_col)?;
    let sale = frame.column_required(&params.sale_col)?;
    let divisor = params.country.vat_divisor();

    let mut out = Vec::with_capacity(frame.len());
    for (cost_cell, sale_cell) in cost.values().iter().zip(sale.values()) {
        let value = sale_cell.numeric_or_nan()? / divisor / cost_cell.numeric_or_nan()?;
        out.push(Scalar::Float64(round_to(value, params.round_to)));
    }
    Ok(out)
}

/// Element-wise `sale / init - 1`. A zero initial price yields ±inf per
/// IEEE semantics; that is accepted, not trapped.
pub fn percentage(frame: &Frame, params: &PercentageParams) -> Result<Vec<Scalar>, PipelineError> {
    frame.require_columns(&[params.init_col.as_str(), params.sale_col.as_str()])?;
    let init = frame.column_required(&params.init_col)?;
    let sale = frame.column_required(&params.sale_col)?;

    let mut out = Vec::with_capacity(frame.len());
    for (init_cell, sale_cell) in init.values().iter().zip(sale.values()) {
        let value = sale_cell.numeric_or_nan()? / init_cell.numeric_or_nan()? - 1.0;
        out.push(Scalar::Float64(value));
    }
    Ok(out)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use st_frame::{Frame, FrameError};
    use st_types::Scalar;

    use super::{Country, MarkupParams, PercentageParams, markup, percentage};
    use crate::error::PipelineError;

    fn priced() -> Frame {
        Frame::from_columns(vec![
            (
                "PurchasePrice",
                vec![Scalar::Float64(100.0), Scalar::Float64(50.0)],
            ),
            (
                "SalePrice",
                vec![Scalar::Float64(150.0), Scalar::Float64(90.0)],
            ),
            (
                "InitialPrice",
                vec![Scalar::Float64(200.0), Scalar::Float64(0.0)],
            ),
        ])
        .expect("priced")
    }

    #[test]
    fn markup_divides_out_bulgarian_vat() {
        let out = markup(&priced(), &MarkupParams::default()).expect("markup");
        // 150 / 1.2 / 100 = 1.25
        assert_eq!(out[0], Scalar::Float64(1.25));
        // 90 / 1.2 / 50 = 1.5
        assert_eq!(out[1], Scalar::Float64(1.5));
    }

    #[test]
    fn markup_rounds_to_requested_precision() {
        let params = MarkupParams {
            country: Country::Ro,
            round_to: 4,
            ..MarkupParams::default()
        };
        let out = markup(&priced(), &params).expect("markup");
        // 150 / 1.21 / 100 = 1.2396694... -> 1.2397, not the 1.24 the
        // two-decimal default would give
        assert_eq!(out[0], Scalar::Float64(1.2397));
    }

    #[test]
    fn unsupported_country_fails_before_any_computation() {
        let err = "FR".parse::<Country>().expect_err("unsupported");
        match err {
            PipelineError::UnsupportedCountry { country } => assert_eq!(country, "FR"),
            other => panic!("expected UnsupportedCountry, got {other:?}"),
        }
    }

    #[test]
    fn country_codes_round_trip() {
        for code in ["BG", "RO", "GR"] {
            let country: Country = code.parse().expect("supported");
            assert_eq!(country.code(), code);
        }
    }

    #[test]
    fn markup_reports_missing_price_columns_together() {
        let frame = Frame::from_columns(vec![(
            "SKU_CODE",
            vec![Scalar::Int64(1)],
        )])
        .expect("frame");
        let err = markup(&frame, &MarkupParams::default()).expect_err("missing");
        match err {
            PipelineError::Frame(FrameError::MissingColumns { columns }) => {
                assert_eq!(
                    columns,
                    vec!["PurchasePrice".to_owned(), "SalePrice".to_owned()]
                );
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn percentage_matches_worked_example() {
        let out = percentage(&priced(), &PercentageParams::default()).expect("percentage");
        // 150 / 200 - 1 = -0.25
        assert_eq!(out[0], Scalar::Float64(-0.25));

        let frame = Frame::from_columns(vec![
            ("InitialPrice", vec![Scalar::Float64(200.0)]),
            ("SalePrice", vec![Scalar::Float64(250.0)]),
        ])
        .expect("frame");
        let out = percentage(&frame, &PercentageParams::default()).expect("percentage");
        assert_eq!(out[0], Scalar::Float64(0.25));
    }

    #[test]
    fn percentage_division_by_zero_yields_infinity() {
        let out = percentage(&priced(), &PercentageParams::default()).expect("percentage");
        match &out[1] {
            Scalar::Float64(v) => assert!(v.is_infinite() && *v > 0.0),
            other => panic!("expected Float64, got {other:?}"),
        }
    }

    #[test]
    fn missing_cells_propagate_as_nan() {
        let frame = Frame::from_columns(vec![
            ("PurchasePrice", vec![Scalar::Null]),
            ("SalePrice", vec![Scalar::Float64(150.0)]),
        ])
        .expect("frame");
        let out = markup(&frame, &MarkupParams::default()).expect("markup");
        match &out[0] {
            Scalar::Float64(v) => assert!(v.is_nan()),
            other => panic!("expected Float64, got {other:?}"),
        }
    }
}
