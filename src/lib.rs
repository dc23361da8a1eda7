/*!
housemap - interactive choropleth dashboard for U.S. housing-market data

Loads a gzip-compressed, tab-separated housing-market tracker and a GeoJSON
state-boundary file, joins them on state code, filters by the active
selection (snapshot month, property type, metric), and renders a two-layer
Leaflet map embedded in a composed HTML page.

## Architecture

```text
reader  ->  pipeline  ->  writer  ->  page
 (cached      (join +      (map        (document
  loads)      filter)      fragment)    assembly)
                 ^
             selection
```

- [`reader`] - cached dataset loads (market TSV, boundary GeoJSON)
- [`pipeline`] - column projection, date window, join, selection filter
- [`selection`] - snapshot month / property type / metric controls
- [`map`] - declarative map specification (layers, styles, legend)
- [`writer`] - renders a `MapSpec` + data into a Leaflet HTML fragment
- [`page`] - composes the full dashboard page

## Example

```rust,ignore
use housemap::reader;
use housemap::pipeline;
use housemap::selection::Selection;
use housemap::map::MapSpec;
use housemap::writer::{LeafletWriter, Writer};

let market = reader::read_market("state_market_tracker.tsv000.gz")?;
let boundaries = reader::read_boundaries("us-state-boundaries.geojson")?;

let joined = pipeline::join_boundaries(
    &pipeline::market_window(&market)?,
    &boundaries.attribute_frame()?,
)?;
let selection = Selection::default_for(&joined)?;
let filtered = pipeline::apply_selection(&joined, &selection)?;

let writer = LeafletWriter::new();
let map_html = writer.write(&MapSpec::for_selection(&selection), &filtered, &boundaries)?;
```
*/

pub mod map;
pub mod page;
pub mod pipeline;
pub mod reader;
pub mod selection;
pub mod writer;

/// Crate version, exposed by the CLI and the server's version endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export so downstream code does not need a direct polars dependency
/// for the common case.
pub use polars::prelude::DataFrame;

/// Error type covering every stage of the dashboard pipeline.
///
/// Failures are fatal: a missing or malformed input file aborts rendering.
/// There is no retry or partial-load fallback anywhere.
#[derive(Debug, thiserror::Error)]
pub enum HousemapError {
    /// Source file missing, unreadable, or structurally malformed.
    #[error("Reader error: {0}")]
    ReaderError(String),

    /// Join/filter failure, including unparsable numeric fields.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// Map rendering failure.
    #[error("Writer error: {0}")]
    WriterError(String),

    /// Invariant violation that should not occur in normal operation.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, HousemapError>;

impl From<polars::prelude::PolarsError> for HousemapError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        HousemapError::PipelineError(err.to_string())
    }
}
