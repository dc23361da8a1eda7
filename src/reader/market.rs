//! Housing-market tracker loader
//!
//! The tracker file is gzip-compressed, tab-separated, with double-quoted
//! fields and a header row. The whole file is decompressed into memory and
//! parsed with schema inference disabled, so every column arrives as a
//! string column and numeric interpretation is deferred to the pipeline's
//! strict casts.

use std::io::{Cursor, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use polars::prelude::*;

use crate::{HousemapError, Result};

/// Columns the pipeline requires. Checked at load time so a truncated or
/// foreign file fails with a clear reader error instead of a late join
/// failure.
pub(super) const REQUIRED_COLUMNS: [&str; 8] = [
    "period_begin",
    "period_end",
    "period_duration",
    "property_type",
    "median_sale_price",
    "median_sale_price_yoy",
    "homes_sold",
    "state_code",
];

pub(super) fn load(path: &Path) -> Result<DataFrame> {
    let raw = std::fs::read(path).map_err(|e| {
        HousemapError::ReaderError(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let mut decoder = GzDecoder::new(raw.as_slice());
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed).map_err(|e| {
        HousemapError::ReaderError(format!("Failed to decompress {}: {}", path.display(), e))
    })?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(b'\t')
                .with_quote_char(Some(b'"')),
        )
        .into_reader_with_file_handle(Cursor::new(decompressed))
        .finish()
        .map_err(|e| {
            HousemapError::ReaderError(format!("Failed to parse {}: {}", path.display(), e))
        })?;

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|name| df.column(name).is_err())
        .collect();
    if !missing.is_empty() {
        return Err(HousemapError::ReaderError(format!(
            "{} is missing required columns: {}",
            path.display(),
            missing.join(", ")
        )));
    }

    Ok(df)
}
