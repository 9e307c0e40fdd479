#![forbid(unsafe_code)]

use st_frame::Frame;
use st_io::{read_csv, write_csv};
use st_join::{MergeSpec, merge};
use st_pipeline::{
    AddColumnOptions, Country, Formula, MarkupParams, PercentageParams, PriceCleanOptions,
    StockOptions, add_column, clean_prices, default_price_columns, default_price_move_set,
    format_prices, move_after, process_stock,
};
use st_pivot::{Aggregator, PivotSpec, pivot};

#[derive(Debug, Default)]
struct Flags {
    input: Option<String>,
    prices: Option<String>,
    out: Option<String>,
    header_row: Option<usize>,
    concept: Option<String>,
    plant: Option<i64>,
    country: Option<Country>,
    aggregator: Option<Aggregator>,
    with_index: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let command = match args.next() {
        Some(command) => command,
        None => {
            print_help();
            return Err("missing command".into());
        }
    };
    if command == "--help" || command == "-h" {
        print_help();
        return Ok(());
    }

    let flags = parse_flags(args)?;
    match command.as_str() {
        "stock" => run_stock(&flags),
        "pivot" => run_pivot(&flags),
        "clean-prices" => run_clean_prices(&flags),
        "merge" => run_merge(&flags),
        "report" => run_report(&flags),
        other => Err(format!("unknown command: {other}").into()),
    }
}

fn parse_flags(
    mut args: impl Iterator<Item = String>,
) -> Result<Flags, Box<dyn std::error::Error>> {
    let mut flags = Flags::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--in" => {
                flags.input = Some(args.next().ok_or("--in requires a file path")?);
            }
            "--prices" => {
                flags.prices = Some(args.next().ok_or("--prices requires a file path")?);
            }
            "--out" => {
                flags.out = Some(args.next().ok_or("--out requires a file path")?);
            }
            "--header-row" => {
                let value = args.next().ok_or("--header-row requires a row number")?;
                flags.header_row = Some(value.parse()?);
            }
            "--concept" => {
                flags.concept = Some(args.next().ok_or("--concept requires a value")?);
            }
            "--plant" => {
                let value = args.next().ok_or("--plant requires a plant code")?;
                flags.plant = Some(value.parse()?);
            }
            "--country" => {
                let value = args.next().ok_or("--country requires a country code")?;
                flags.country = Some(value.parse()?);
            }
            "--agg" => {
                let value = args.next().ok_or("--agg requires sum, mean or count")?;
                flags.aggregator = Some(value.parse()?);
            }
            "--with-index" => {
                flags.with_index = true;
            }
            other => {
                return Err(format!("unknown argument: {other}").into());
            }
        }
    }
    Ok(flags)
}

fn required<'a>(
    value: &'a Option<String>,
    flag: &str,
) -> Result<&'a str, Box<dyn std::error::Error>> {
    value
        .as_deref()
        .ok_or_else(|| format!("{flag} is required for this command").into())
}

fn read_input(flags: &Flags, default_header_row: usize) -> Result<Frame, Box<dyn std::error::Error>> {
    let path = required(&flags.input, "--in")?;
    Ok(read_csv(path, flags.header_row.unwrap_or(default_header_row))?)
}

fn write_output(frame: &Frame, flags: &Flags) -> Result<(), Box<dyn std::error::Error>> {
    let path = required(&flags.out, "--out")?;
    write_csv(frame, path, flags.with_index)?;
    tracing::info!(path, rows = frame.len(), "wrote output table");
    Ok(())
}

/// Raw export -> StockProcessor. Raw exports carry two banner rows, hence
/// the default header offset of 2.
fn run_stock(flags: &Flags) -> Result<(), Box<dyn std::error::Error>> {
    let frame = read_input(flags, 2)?;
    let mut options = StockOptions::default();
    if let Some(concept) = &flags.concept {
        options.concept_filter = concept.clone();
    }
    let out = process_stock(&frame, &options)?;
    write_output(&out, flags)
}

fn run_pivot(flags: &Flags) -> Result<(), Box<dyn std::error::Error>> {
    let frame = read_input(flags, 0)?;
    let mut spec = PivotSpec::default();
    if let Some(aggregator) = flags.aggregator {
        spec.aggregator = aggregator;
    }
    let out = pivot(&frame, &spec)?;
    write_output(&out, flags)
}

/// Price list -> PriceFormatter -> PriceCleaner, in that order: numeric
/// cleaning has to happen while the free-text price columns still exist.
fn run_clean_prices(flags: &Flags) -> Result<(), Box<dyn std::error::Error>> {
    let frame = read_input(flags, 0)?;
    let formatted = format_prices(&frame, &default_price_columns())?;
    let mut options = PriceCleanOptions::default();
    if let Some(plant) = flags.plant {
        options.plant = plant;
    }
    let out = clean_prices(&formatted, &options)?;
    write_output(&out, flags)
}

fn run_merge(flags: &Flags) -> Result<(), Box<dyn std::error::Error>> {
    let stock = read_input(flags, 0)?;
    let prices = read_csv(required(&flags.prices, "--prices")?, 0)?;
    let out = merge(&stock, &prices, &MergeSpec::default())?;
    write_output(&out, flags)
}

/// Full report: merge prices into the pivoted stock table, tuck the price
/// columns in after Subgen, then derive markup and percentage change.
fn run_report(flags: &Flags) -> Result<(), Box<dyn std::error::Error>> {
    let stock = read_input(flags, 0)?;
    let prices = read_csv(required(&flags.prices, "--prices")?, 0)?;

    let merged = merge(&stock, &prices, &MergeSpec::default())?;
    let positioned = move_after(&merged, "Subgen", &default_price_move_set())?;

    let markup_params = MarkupParams {
        country: flags.country.unwrap_or_default(),
        ..MarkupParams::default()
    };
    let with_markup = add_column(
        &positioned,
        "Mkp",
        &AddColumnOptions {
            formula: Some(Formula::Markup(markup_params)),
            ..AddColumnOptions::default()
        },
    )?;
    let out = add_column(
        &with_markup,
        "Pct",
        &AddColumnOptions {
            formula: Some(Formula::PercentageChange(PercentageParams::default())),
            ..AddColumnOptions::default()
        },
    )?;
    write_output(&out, flags)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn print_help() {
    println!(
        "stocktab — retail stock & price spreadsheet pipeline

USAGE:
    stocktab <COMMAND> [FLAGS]

COMMANDS:
    stock          clean a raw stock export (drop noise columns, keep one
                   concept, coerce quantities to integers)
    pivot          pivot a cleaned stock table to one column per store
    clean-prices   numeric-clean the price columns, filter to one plant,
                   rename Material to SKU_CODE
    merge          left-join price columns onto a stock table by SKU_CODE
    report         merge, reposition price columns after Subgen, and add
                   Mkp / Pct derived columns

FLAGS:
    --in <path>          input table (stock table for merge/report)
    --prices <path>      price table (merge/report)
    --out <path>         output file
    --header-row <n>     zero-indexed header row (default 2 for stock, else 0)
    --concept <value>    concept filter for stock (default OUTLET)
    --plant <code>       plant filter for clean-prices (default 4315)
    --country <code>     VAT country for report: BG, RO or GR (default BG)
    --agg <name>         pivot aggregator: sum, mean or count (default sum)
    --with-index         write the row index as a leading column"
    );
}
