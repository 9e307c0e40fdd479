use st_frame::Frame;

use crate::error::PipelineError;

/// The price columns usually relocated next to the product attributes.
/// Built fresh per call so callers can extend their copy freely.
#[must_use]
pub fn default_price_move_set() -> Vec<String> {
    ["SalePrice", "InitialPrice", "PurchasePrice"]
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}

/// Relocate `columns_to_move` so they sit, in their given order, as one
/// contiguous block immediately after `anchor`. Every other column keeps
/// its relative position. The anchor must exist, every moved column must
/// exist (all missing names reported together), and the anchor itself may
/// not be in the moved set.
pub fn move_after(
    frame: &Frame,
    anchor: &str,
    columns_to_move: &[String],
) -> Result<Frame, PipelineError> {
    if columns_to_move.iter().any(|name| name == anchor) {
        return Err(PipelineError::AnchorInMoveSet {
            column: anchor.to_owned(),
        });
    }
    frame.require_columns(&[anchor])?;
    frame.require_columns(columns_to_move)?;

    let moved: Vec<&str> = columns_to_move.iter().map(String::as_str).collect();
    let reduced: Vec<&str> = frame
        .names()
        .into_iter()
        .filter(|name| !moved.contains(name))
        .collect();
    // anchor is not in the moved set, so it survives into `reduced`
    let insert_at = reduced
        .iter()
        .position(|name| *name == anchor)
        .map_or(reduced.len(), |pos| pos + 1);

    let mut order: Vec<&str> = Vec::with_capacity(frame.width());
    order.extend(&reduced[..insert_at]);
    order.extend(&moved);
    order.extend(&reduced[insert_at..]);

    Ok(frame.reorder_columns(&order)?)
}
