#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use st_frame::{Column, Frame, FrameError};
use st_types::Scalar;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("file {path:?} not found")]
    FileNotFound { path: PathBuf },
    #[error("csv input has no header row")]
    MissingHeaders,
    #[error("header row {header_row} is past the end of the file ({rows} rows)")]
    HeaderRowOutOfRange { header_row: usize, rows: usize },
    #[error("row {row} has {found} fields but the header has {expected}")]
    RowTooWide {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Read a CSV file into a frame. `header_row` is the zero-indexed row that
/// becomes the column names; rows before it (banner rows on raw exports)
/// are discarded. 0 suits already-clean files, 2 the raw stock export.
pub fn read_csv(path: impl AsRef<Path>, header_row: usize) -> Result<Frame, IoError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IoError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)?;
    read_csv_str(&content, header_row)
}

pub fn read_csv_str(input: &str, header_row: usize) -> Result<Frame, IoError> {
    // Banner rows rarely match the table's field count, so headers are
    // resolved by hand from a flexible, headerless reader.
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input.as_bytes());

    let mut records = reader.records();
    let mut skipped = 0usize;
    for _ in 0..header_row {
        if records.next().transpose()?.is_none() {
            return Err(IoError::HeaderRowOutOfRange { header_row, rows: skipped });
        }
        skipped += 1;
    }

    let headers = match records.next().transpose()? {
        Some(record) => record,
        None => {
            return Err(IoError::HeaderRowOutOfRange { header_row, rows: skipped });
        }
    };
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(IoError::MissingHeaders);
    }

    let header_count = headers.len();
    let mut columns: Vec<Vec<Scalar>> = (0..header_count).map(|_| Vec::new()).collect();
    // the flexible reader only tolerates the banner rows; data rows are
    // held to the header width (short rows pad with Null, wider rows fail)
    let mut row_number = header_row + 1;
    for row in records {
        let record = row?;
        row_number += 1;
        if record.len() > header_count {
            return Err(IoError::RowTooWide {
                row: row_number,
                found: record.len(),
                expected: header_count,
            });
        }
        for (idx, column) in columns.iter_mut().enumerate() {
            let field = record.get(idx).unwrap_or_default();
            column.push(parse_scalar(field));
        }
    }

    let named = headers
        .iter()
        .zip(columns)
        .map(|(name, values)| (name.to_owned(), Column::from_values(values)))
        .collect();
    Ok(Frame::new(named)?)
}

/// Write a frame to a CSV file. The file is produced in one shot from a
/// fully rendered string, so a failed transform never leaves a partial
/// output behind.
pub fn write_csv(
    frame: &Frame,
    path: impl AsRef<Path>,
    include_index: bool,
) -> Result<(), IoError> {
    let rendered = write_csv_string(frame, include_index)?;
    fs::write(path, rendered)?;
    Ok(())
}

pub fn write_csv_string(frame: &Frame, include_index: bool) -> Result<String, IoError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    let names = frame.names();
    let mut header: Vec<&str> = Vec::with_capacity(names.len() + 1);
    if include_index {
        header.push("");
    }
    header.extend(names.iter().copied());
    writer.write_record(&header)?;

    for row_idx in 0..frame.len() {
        let mut row: Vec<String> = Vec::with_capacity(names.len() + 1);
        if include_index {
            row.push(frame.index()[row_idx].to_string());
        }
        for name in &names {
            let cell = frame
                .column(name)
                .and_then(|column| column.value(row_idx))
                .map_or_else(String::new, Scalar::to_string);
            row.push(cell);
        }
        writer.write_record(&row)?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn parse_scalar(field: &str) -> Scalar {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Scalar::Null;
    }

    if let Ok(value) = trimmed.parse::<i64>() {
        return Scalar::Int64(value);
    }
    if let Ok(value) = trimmed.parse::<f64>() {
        return Scalar::Float64(value);
    }

    Scalar::Utf8(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use st_types::Scalar;

    use super::{IoError, read_csv, read_csv_str, write_csv, write_csv_string};

    #[test]
    fn read_sniffs_numeric_and_missing_cells() {
        let input = "SKU_CODE,SalePrice\n1,10\n2,\n3,3.5\n";
        let frame = read_csv_str(input, 0).expect("read");
        let prices = frame.column("SalePrice").expect("prices");

        assert_eq!(prices.values()[0], Scalar::Int64(10));
        assert_eq!(prices.values()[1], Scalar::Null);
        assert_eq!(prices.values()[2], Scalar::Float64(3.5));
    }

    #[test]
    fn header_offset_skips_banner_rows() {
        let input = "Available Stock Report\nExported 2024-01-05\nSKU_CODE,AVAILABLE\n1,5\n2,7\n";
        let frame = read_csv_str(input, 2).expect("read");
        assert_eq!(frame.names(), vec!["SKU_CODE", "AVAILABLE"]);
        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn header_offset_past_eof_is_an_error() {
        let err = read_csv_str("a,b\n1,2\n", 5).expect_err("past eof");
        assert!(matches!(err, IoError::HeaderRowOutOfRange { .. }));
    }

    #[test]
    fn overlong_data_row_is_rejected() {
        let err = read_csv_str("a,b\n1,2\n3,4,5\n", 0).expect_err("wide row");
        match err {
            IoError::RowTooWide {
                row,
                found,
                expected,
            } => {
                // rows are reported 1-indexed from the top of the file
                assert_eq!((row, found, expected), (3, 3, 2));
            }
            other => panic!("expected RowTooWide, got {other:?}"),
        }
    }

    #[test]
    fn short_data_rows_pad_with_nulls() {
        let frame = read_csv_str("a,b\n1\n", 0).expect("read");
        assert_eq!(frame.column("a").expect("col").values(), &[Scalar::Int64(1)]);
        assert_eq!(frame.column("b").expect("col").values(), &[Scalar::Null]);
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let err = read_csv("/no/such/file.csv", 0).expect_err("missing");
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }

    #[test]
    fn write_renders_nulls_as_empty_cells() {
        let frame = read_csv_str("a,b\n1,\n2,x\n", 0).expect("read");
        let out = write_csv_string(&frame, false).expect("write");
        assert_eq!(out, "a,b\n1,\n2,x\n");
    }

    #[test]
    fn write_with_index_prepends_row_labels() {
        let frame = read_csv_str("a\n10\n20\n", 0).expect("read");
        let out = write_csv_string(&frame, true).expect("write");
        assert_eq!(out, ",a\n0,10\n1,20\n");
    }

    #[test]
    fn file_round_trip_through_a_temp_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stock.csv");

        let frame = read_csv_str("SKU_CODE,AVAILABLE\n1,5\n2,7\n", 0).expect("read");
        write_csv(&frame, &path, false).expect("write");

        let back = read_csv(&path, 0).expect("re-read");
        assert!(back.semantic_eq(&frame));
    }

    #[test]
    fn blank_header_row_is_rejected() {
        let err = read_csv_str(",\n1,2\n", 0).expect_err("blank header");
        assert!(matches!(err, IoError::MissingHeaders));
    }
}
