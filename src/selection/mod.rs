//! Selection controls
//!
//! Three independent, order-insensitive choices parametrize the pipeline's
//! final filter step: snapshot month, property type, and metric. Selections
//! are transient UI state; every change triggers a full re-run of the
//! filter and a full re-render of the map.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{HousemapError, Result};

/// Property-type filter values. Labels are the exact strings used by the
/// tracker's `property_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    AllResidential,
    SingleFamilyResidential,
    Townhouse,
    CondoCoOp,
    SingleUnitsOnly,
    MultiFamily,
}

impl PropertyType {
    /// Every selectable property type, in display order.
    pub const ALL: [PropertyType; 6] = [
        PropertyType::AllResidential,
        PropertyType::SingleFamilyResidential,
        PropertyType::Townhouse,
        PropertyType::CondoCoOp,
        PropertyType::SingleUnitsOnly,
        PropertyType::MultiFamily,
    ];

    /// The dataset string this variant filters on.
    pub fn label(&self) -> &'static str {
        match self {
            PropertyType::AllResidential => "All Residential",
            PropertyType::SingleFamilyResidential => "Single Family Residential",
            PropertyType::Townhouse => "Townhouse",
            PropertyType::CondoCoOp => "Condo/Co-op",
            PropertyType::SingleUnitsOnly => "Single Units Only",
            PropertyType::MultiFamily => "Multi-Family (2-4 Unit)",
        }
    }

    /// Exact-match parse from the dataset label.
    pub fn from_label(label: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.label() == label)
            .ok_or_else(|| {
                HousemapError::PipelineError(format!("Unknown property type '{}'", label))
            })
    }
}

impl Default for PropertyType {
    fn default() -> Self {
        PropertyType::AllResidential
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The housing metric driving the choropleth fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    MedianSalePrice,
    MedianSalePriceYoy,
    HomesSold,
}

impl Metric {
    pub const ALL: [Metric; 3] = [
        Metric::MedianSalePrice,
        Metric::MedianSalePriceYoy,
        Metric::HomesSold,
    ];

    /// The DataFrame column this metric reads from.
    pub fn column(&self) -> &'static str {
        match self {
            Metric::MedianSalePrice => "median_sale_price",
            Metric::MedianSalePriceYoy => "median_sale_price_yoy",
            Metric::HomesSold => "homes_sold",
        }
    }

    /// Human-readable label for tooltips and the legend.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::MedianSalePrice => "Median Sale Price",
            Metric::MedianSalePriceYoy => "Median Sale Price YoY",
            Metric::HomesSold => "Homes Sold",
        }
    }

    /// Parse from the column name used in the selector.
    pub fn from_column(column: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.column() == column)
            .ok_or_else(|| HousemapError::PipelineError(format!("Unknown metric '{}'", column)))
    }

    /// The two metric columns a selection of `self` drops from the output.
    pub fn dropped_columns(&self) -> [&'static str; 2] {
        match self {
            Metric::MedianSalePrice => ["median_sale_price_yoy", "homes_sold"],
            Metric::MedianSalePriceYoy => ["median_sale_price", "homes_sold"],
            Metric::HomesSold => ["median_sale_price", "median_sale_price_yoy"],
        }
    }

    /// Localized display string for tooltips: thousands separators for
    /// prices and counts, percentage for the YoY fraction.
    pub fn format_value(&self, value: f64) -> String {
        match self {
            Metric::MedianSalePrice => format!("${}", group_thousands(value.round() as i64)),
            Metric::MedianSalePriceYoy => format!("{:.1}%", value * 100.0),
            Metric::HomesSold => group_thousands(value.round() as i64),
        }
    }
}

impl Default for Metric {
    fn default() -> Self {
        Metric::MedianSalePrice
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// The active UI state: one snapshot month, one property type, one metric.
/// Not persisted; rebuilt with defaults for each fresh session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Chosen `period_begin`, an ISO-8601 date string.
    pub period_begin: String,
    pub property_type: PropertyType,
    pub metric: Metric,
}

impl Selection {
    /// Default selection against a joined table: the most recent snapshot
    /// month, all-residential, median sale price.
    pub fn default_for(joined: &DataFrame) -> Result<Self> {
        let months = crate::pipeline::snapshot_months(joined)?;
        let period_begin = months.into_iter().next().ok_or_else(|| {
            HousemapError::PipelineError(
                "No snapshot months available in the joined table".to_string(),
            )
        })?;
        Ok(Self {
            period_begin,
            property_type: PropertyType::default(),
            metric: Metric::default(),
        })
    }
}
