//! Join & filter pipeline
//!
//! Turns the two raw tables into the one-row-per-state table the map
//! renderer consumes. Steps run in a fixed order:
//!
//! 1. [`market_window`] - project the tracker to the eight housing columns
//!    (with strict numeric casts) and restrict to the inclusive snapshot
//!    window.
//! 2. [`join_boundaries`] - full join of boundary attributes with housing
//!    rows on `stusab = state_code`, then drop rows with no
//!    `period_begin` (boundaries with no housing data in the window).
//! 3. [`apply_selection`] - equality filters for the active snapshot month
//!    and property type, projected down to the single active metric.
//!
//! Every step derives a new frame; nothing is mutated in place, so
//! re-running with identical inputs yields identical output.

use polars::prelude::*;

use crate::selection::Selection;
use crate::Result;

/// Inclusive snapshot window bounds on `period_begin`. One year of
/// snapshots keeps the month selector responsive.
pub const WINDOW_START: &str = "2020-10-01";
/// See [`WINDOW_START`].
pub const WINDOW_END: &str = "2021-10-01";

/// The housing columns carried through the pipeline, in output order.
const HOUSING_COLUMNS: [&str; 8] = [
    "period_begin",
    "period_end",
    "period_duration",
    "property_type",
    "median_sale_price",
    "median_sale_price_yoy",
    "homes_sold",
    "state_code",
];

/// Project the raw tracker to the eight housing columns and apply the
/// inclusive date window.
///
/// Numeric columns are cast strictly: a malformed number in the source
/// file is a fatal pipeline error, not a silent null. Date columns stay
/// ISO-8601 strings; lexicographic comparison on those equals
/// chronological comparison.
pub fn market_window(market: &DataFrame) -> Result<DataFrame> {
    let df = market
        .clone()
        .lazy()
        .select([
            col("period_begin"),
            col("period_end"),
            col("period_duration").strict_cast(DataType::Int32),
            col("property_type"),
            col("median_sale_price").strict_cast(DataType::Float64),
            col("median_sale_price_yoy").strict_cast(DataType::Float64),
            col("homes_sold").strict_cast(DataType::Int64),
            col("state_code"),
        ])
        .filter(
            col("period_begin")
                .gt_eq(lit(WINDOW_START))
                .and(col("period_begin").lt_eq(lit(WINDOW_END))),
        )
        .collect()?;
    Ok(df)
}

/// Full (outer) join of boundary attributes with windowed housing rows on
/// `stusab = state_code`, preserving `name` and `stusab` alongside the
/// housing fields, then dropping rows with a null `period_begin`.
///
/// Geometry never enters the frame; the writer re-attaches it by `stusab`
/// at render time.
pub fn join_boundaries(market: &DataFrame, boundary_attrs: &DataFrame) -> Result<DataFrame> {
    let mut columns: Vec<Expr> = HOUSING_COLUMNS.iter().map(|c| col(*c)).collect();
    columns.push(col("name"));
    columns.push(col("stusab"));

    let df = boundary_attrs
        .clone()
        .lazy()
        .join(
            market.clone().lazy(),
            [col("stusab")],
            [col("state_code")],
            JoinArgs::new(JoinType::Full),
        )
        .filter(col("period_begin").is_not_null())
        .select(columns)
        .collect()?;
    Ok(df)
}

/// Apply the active selection: equality filters on `period_begin` and
/// `property_type`, then project to the columns the renderer needs,
/// keeping only the selected metric column.
///
/// A selection with zero matching rows yields an empty frame, not an
/// error; the renderer handles that by drawing a neutral map.
pub fn apply_selection(joined: &DataFrame, selection: &Selection) -> Result<DataFrame> {
    let df = joined
        .clone()
        .lazy()
        .filter(col("period_begin").eq(lit(selection.period_begin.clone())))
        .filter(col("property_type").eq(lit(selection.property_type.label().to_string())))
        .select([
            col("period_begin"),
            col("period_end"),
            col("period_duration"),
            col("property_type"),
            col(selection.metric.column()),
            col("state_code"),
            col("name"),
            col("stusab"),
        ])
        .collect()?;
    Ok(df)
}

/// Distinct `period_begin` values in the joined table, sorted descending
/// so the most recent snapshot comes first.
pub fn snapshot_months(joined: &DataFrame) -> Result<Vec<String>> {
    let series = joined
        .column("period_begin")?
        .as_materialized_series()
        .unique()?;
    let mut months: Vec<String> = series
        .str()?
        .into_iter()
        .flatten()
        .map(|s| s.to_string())
        .collect();
    months.sort_unstable_by(|a, b| b.cmp(a));
    Ok(months)
}
