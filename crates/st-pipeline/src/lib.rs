#![forbid(unsafe_code)]

mod derive;
mod error;
mod formulas;
mod prices;
mod reorder;
mod stock;

pub use derive::{AddColumnOptions, Formatter, add_column};
pub use error::PipelineError;
pub use formulas::{Country, Formula, MarkupParams, PercentageParams, markup, percentage};
pub use prices::{PriceCleanOptions, clean_prices, default_price_columns, format_prices};
pub use reorder::{default_price_move_set, move_after};
pub use stock::{StockOptions, process_stock};
