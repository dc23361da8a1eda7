//! Declarative map specification
//!
//! A [`MapSpec`] describes everything the renderer draws: the base map,
//! the choropleth fill layer, and the transparent interactive overlay.
//! Building the spec is separate from rendering it, so the same spec can
//! be inspected by tests or serialized by the API without touching
//! Leaflet.

use serde::Serialize;

use crate::selection::Selection;

/// Base tile layer. Fixed to a light map with the layer-toggle control
/// suppressed.
#[derive(Debug, Clone, Serialize)]
pub struct TileLayer {
    pub url: &'static str,
    pub attribution: &'static str,
    pub name: &'static str,
}

/// Choropleth fill layer keyed by the boundary file's postal code.
#[derive(Debug, Clone, Serialize)]
pub struct ChoroplethLayer {
    pub name: &'static str,
    /// GeoJSON property the fill is keyed on.
    pub key_property: &'static str,
    /// DataFrame column driving the fill color.
    pub value_column: &'static str,
    /// Fill for states with no matching data, visually distinct from a
    /// low metric value.
    pub missing_fill_color: &'static str,
    pub fill_opacity: f64,
    pub line_opacity: f64,
    pub line_color: &'static str,
    pub legend_name: &'static str,
}

/// Transparent overlay carrying tooltips and hover highlight. Carries no
/// persistent fill so it does not duplicate the choropleth's coloring.
#[derive(Debug, Clone, Serialize)]
pub struct TooltipLayer {
    pub name: &'static str,
    /// (DataFrame column, human-readable alias) tooltip rows, in order.
    pub fields: Vec<(String, String)>,
    pub line_color: &'static str,
    pub line_weight: f64,
    pub highlight_weight: f64,
    pub highlight_fill_color: &'static str,
}

/// The full map description handed to a writer.
#[derive(Debug, Clone, Serialize)]
pub struct MapSpec {
    /// [lat, lon] map center, approx. the continental-U.S. centroid.
    pub center: [f64; 2],
    pub zoom: u8,
    pub tiles: TileLayer,
    pub choropleth: ChoroplethLayer,
    pub overlay: TooltipLayer,
}

impl MapSpec {
    /// Build the spec for the active selection. Everything except the
    /// metric-driven pieces (value column, tooltip alias) is fixed.
    pub fn for_selection(selection: &Selection) -> Self {
        let metric = selection.metric;
        Self {
            center: [40.0, -100.0],
            zoom: 4,
            tiles: TileLayer {
                url: "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
                attribution: "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>",
                name: "Light Map",
            },
            choropleth: ChoroplethLayer {
                name: "Choropleth Map of U.S. Housing Prices",
                key_property: "stusab",
                value_column: metric.column(),
                missing_fill_color: "white",
                fill_opacity: 0.7,
                line_opacity: 0.2,
                line_color: "black",
                legend_name: "Housing Market Metrics",
            },
            overlay: TooltipLayer {
                name: "United States Housing Prices",
                fields: vec![
                    ("period_begin".to_string(), "Period Begin:".to_string()),
                    ("period_end".to_string(), "Period End:".to_string()),
                    ("name".to_string(), "State:".to_string()),
                    (
                        metric.column().to_string(),
                        format!("{}:", metric.label()),
                    ),
                ],
                line_color: "black",
                line_weight: 0.5,
                highlight_weight: 3.0,
                highlight_fill_color: "grey",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{Metric, PropertyType};

    fn selection(metric: Metric) -> Selection {
        Selection {
            period_begin: "2021-09-01".to_string(),
            property_type: PropertyType::AllResidential,
            metric,
        }
    }

    #[test]
    fn base_map_is_fixed() {
        let spec = MapSpec::for_selection(&selection(Metric::MedianSalePrice));
        assert_eq!(spec.center, [40.0, -100.0]);
        assert_eq!(spec.zoom, 4);
        assert!(spec.tiles.url.contains("cartocdn"));
    }

    #[test]
    fn choropleth_tracks_the_selected_metric() {
        let spec = MapSpec::for_selection(&selection(Metric::HomesSold));
        assert_eq!(spec.choropleth.value_column, "homes_sold");
        assert_eq!(spec.choropleth.key_property, "stusab");
        assert_eq!(spec.choropleth.missing_fill_color, "white");
        assert!((spec.choropleth.fill_opacity - 0.7).abs() < f64::EPSILON);
        assert!((spec.choropleth.line_opacity - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn tooltip_fields_carry_readable_aliases() {
        let spec = MapSpec::for_selection(&selection(Metric::MedianSalePriceYoy));
        let aliases: Vec<&str> = spec.overlay.fields.iter().map(|(_, a)| a.as_str()).collect();
        assert_eq!(
            aliases,
            vec![
                "Period Begin:",
                "Period End:",
                "State:",
                "Median Sale Price YoY:"
            ]
        );
        assert_eq!(spec.overlay.fields[3].0, "median_sale_price_yoy");
    }

    #[test]
    fn overlay_highlight_is_grey_and_thickened() {
        let spec = MapSpec::for_selection(&selection(Metric::MedianSalePrice));
        assert_eq!(spec.overlay.highlight_fill_color, "grey");
        assert!(spec.overlay.highlight_weight > spec.overlay.line_weight);
    }
}
