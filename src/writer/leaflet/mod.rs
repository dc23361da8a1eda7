//! Leaflet HTML writer
//!
//! Renders a [`MapSpec`] plus the filtered one-row-per-state table into a
//! self-contained HTML fragment: base tile layer, a choropleth GeoJSON
//! layer whose per-feature fill is precomputed in Rust, a transparent
//! overlay carrying tooltips and hover highlight, and a gradient legend.
//!
//! The choropleth styles every boundary feature (neutral fill when a
//! state has no data, so missing data reads differently from a low
//! value); the overlay only emits features whose key matched a data row,
//! which is what makes it carry no duplicate coloring.

pub mod scale;

use std::collections::BTreeMap;

use polars::prelude::*;
use serde_json::{json, Value};

use crate::map::MapSpec;
use crate::reader::BoundaryCollection;
use crate::selection::Metric;
use crate::writer::Writer;
use crate::{HousemapError, Result};

pub use scale::SequentialScale;

/// One state's worth of filtered data, keyed by postal code.
#[derive(Debug, Clone)]
struct StateRow {
    period_begin: String,
    period_end: String,
    name: Option<String>,
    value: Option<f64>,
}

/// Leaflet renderer. Stateless; one instance can render any number of
/// specs.
pub struct LeafletWriter;

impl LeafletWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LeafletWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for LeafletWriter {
    type Output = String;

    fn write(
        &self,
        spec: &MapSpec,
        data: &DataFrame,
        boundaries: &BoundaryCollection,
    ) -> Result<String> {
        self.validate(spec)?;

        let choropleth = choropleth_feature_collection(spec, data, boundaries)?;
        let overlay = overlay_feature_collection(spec, data, boundaries)?;
        let legend = legend(spec, data)?;

        render_fragment(spec, &choropleth, &overlay, &legend)
    }

    fn validate(&self, spec: &MapSpec) -> Result<()> {
        if !(0.0..=1.0).contains(&spec.choropleth.fill_opacity)
            || !(0.0..=1.0).contains(&spec.choropleth.line_opacity)
        {
            return Err(HousemapError::WriterError(
                "Layer opacities must lie in [0, 1]".to_string(),
            ));
        }
        if spec.overlay.fields.is_empty() {
            return Err(HousemapError::WriterError(
                "The tooltip overlay needs at least one field".to_string(),
            ));
        }
        // The value column must be a known metric so tooltip values can
        // be formatted.
        Metric::from_column(spec.choropleth.value_column)
            .map_err(|e| HousemapError::WriterError(e.to_string()))?;
        Ok(())
    }
}

/// Extract the filtered table into per-state rows keyed by `state_code`.
fn state_rows(data: &DataFrame, value_column: &str) -> Result<BTreeMap<String, StateRow>> {
    let mut rows = BTreeMap::new();
    if data.height() == 0 {
        return Ok(rows);
    }

    let codes = data.column("state_code")?.as_materialized_series().clone();
    let codes = codes.str()?;
    let begins = data.column("period_begin")?.as_materialized_series().clone();
    let begins = begins.str()?;
    let ends = data.column("period_end")?.as_materialized_series().clone();
    let ends = ends.str()?;
    let names = data.column("name")?.as_materialized_series().clone();
    let names = names.str()?;
    let values = data
        .column(value_column)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let values = values.f64()?;

    for i in 0..data.height() {
        let Some(code) = codes.get(i) else {
            // A row with no state code cannot be drawn; skip it.
            continue;
        };
        rows.insert(
            code.to_string(),
            StateRow {
                period_begin: begins.get(i).unwrap_or_default().to_string(),
                period_end: ends.get(i).unwrap_or_default().to_string(),
                name: names.get(i).map(|s| s.to_string()),
                value: values.get(i),
            },
        );
    }
    Ok(rows)
}

fn metric_values(rows: &BTreeMap<String, StateRow>) -> Vec<f64> {
    rows.values().filter_map(|r| r.value).collect()
}

/// The choropleth layer: every boundary feature, with a precomputed
/// `fill_color` property. States absent from the data (or with a null
/// metric) get the spec's missing-data fill.
pub fn choropleth_feature_collection(
    spec: &MapSpec,
    data: &DataFrame,
    boundaries: &BoundaryCollection,
) -> Result<Value> {
    let rows = state_rows(data, spec.choropleth.value_column)?;
    let scale = SequentialScale::ylgn(&metric_values(&rows))?;

    let features: Vec<Value> = boundaries
        .features
        .iter()
        .map(|feature| {
            let code = feature.properties.stusab.as_str();
            let fill = rows
                .get(code)
                .and_then(|r| r.value)
                .and_then(|v| scale.color_for(v));
            let has_data = fill.is_some();
            json!({
                "type": "Feature",
                "properties": {
                    "stusab": code,
                    "name": feature.properties.name,
                    "fill_color": fill.unwrap_or_else(|| spec.choropleth.missing_fill_color.to_string()),
                    "has_data": has_data,
                },
                "geometry": feature.geometry,
            })
        })
        .collect();

    Ok(json!({"type": "FeatureCollection", "features": features}))
}

/// The interactive overlay: only boundary features that matched a data
/// row, each carrying a prebuilt tooltip.
pub fn overlay_feature_collection(
    spec: &MapSpec,
    data: &DataFrame,
    boundaries: &BoundaryCollection,
) -> Result<Value> {
    let metric = Metric::from_column(spec.choropleth.value_column)?;
    let rows = state_rows(data, spec.choropleth.value_column)?;

    let features: Vec<Value> = boundaries
        .features
        .iter()
        .filter_map(|feature| {
            let code = feature.properties.stusab.as_str();
            let row = rows.get(code)?;
            let tooltip = tooltip_html(spec, metric, row, &feature.properties.name);
            Some(json!({
                "type": "Feature",
                "properties": {
                    "stusab": code,
                    "name": feature.properties.name,
                    "tooltip_html": tooltip,
                },
                "geometry": feature.geometry,
            }))
        })
        .collect();

    Ok(json!({"type": "FeatureCollection", "features": features}))
}

/// Legend payload: ramp gradient plus formatted domain bounds. Domain
/// labels are null when the filtered table is empty.
pub fn legend(spec: &MapSpec, data: &DataFrame) -> Result<Value> {
    let metric = Metric::from_column(spec.choropleth.value_column)?;
    let rows = state_rows(data, spec.choropleth.value_column)?;
    let scale = SequentialScale::ylgn(&metric_values(&rows))?;

    let (min_label, max_label) = match scale.domain() {
        Some((min, max)) => (
            Value::String(metric.format_value(min)),
            Value::String(metric.format_value(max)),
        ),
        None => (Value::Null, Value::Null),
    };

    Ok(json!({
        "title": spec.choropleth.legend_name,
        "metric": metric.label(),
        "gradient": scale.legend_stops(9),
        "min_label": min_label,
        "max_label": max_label,
    }))
}

fn tooltip_html(spec: &MapSpec, metric: Metric, row: &StateRow, feature_name: &str) -> String {
    let mut lines = Vec::with_capacity(spec.overlay.fields.len());
    for (column, alias) in &spec.overlay.fields {
        let value = match column.as_str() {
            "period_begin" => row.period_begin.clone(),
            "period_end" => row.period_end.clone(),
            "name" => row.name.clone().unwrap_or_else(|| feature_name.to_string()),
            c if c == metric.column() => row
                .value
                .map(|v| metric.format_value(v))
                .unwrap_or_else(|| "No data".to_string()),
            other => format!("(unknown field {})", other),
        };
        lines.push(format!(
            "<b>{}</b> {}",
            escape_html(alias),
            escape_html(&value)
        ));
    }
    lines.join("<br>")
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Assemble the final fragment. Data is injected into a static template
/// via placeholder substitution so the Leaflet glue stays readable.
fn render_fragment(
    spec: &MapSpec,
    choropleth: &Value,
    overlay: &Value,
    legend: &Value,
) -> Result<String> {
    let serialize = |v: &Value| {
        serde_json::to_string(v)
            .map_err(|e| HousemapError::WriterError(format!("Failed to serialize layer: {}", e)))
    };

    let fragment = MAP_TEMPLATE
        .replace("__CENTER__", &format!("[{}, {}]", spec.center[0], spec.center[1]))
        .replace("__ZOOM__", &spec.zoom.to_string())
        .replace("__TILE_URL__", spec.tiles.url)
        .replace("__TILE_ATTRIBUTION__", spec.tiles.attribution)
        .replace("__FILL_OPACITY__", &spec.choropleth.fill_opacity.to_string())
        .replace("__LINE_OPACITY__", &spec.choropleth.line_opacity.to_string())
        .replace("__LINE_COLOR__", spec.choropleth.line_color)
        .replace("__OVERLAY_COLOR__", spec.overlay.line_color)
        .replace("__OVERLAY_WEIGHT__", &spec.overlay.line_weight.to_string())
        .replace(
            "__HIGHLIGHT_WEIGHT__",
            &spec.overlay.highlight_weight.to_string(),
        )
        .replace("__HIGHLIGHT_FILL__", spec.overlay.highlight_fill_color)
        .replace("__CHORO_DATA__", &serialize(choropleth)?)
        .replace("__OVERLAY_DATA__", &serialize(overlay)?)
        .replace("__LEGEND__", &serialize(legend)?);

    Ok(fragment)
}

const MAP_TEMPLATE: &str = r#"<div id="housemap" style="height: 600px;"></div>
<script>
  var map = L.map('housemap', { zoomControl: true }).setView(__CENTER__, __ZOOM__);
  L.tileLayer('__TILE_URL__', { attribution: '__TILE_ATTRIBUTION__' }).addTo(map);

  var choroplethData = __CHORO_DATA__;
  L.geoJson(choroplethData, {
    smoothFactor: 2,
    style: function (feature) {
      return {
        fillColor: feature.properties.fill_color,
        fillOpacity: __FILL_OPACITY__,
        color: '__LINE_COLOR__',
        opacity: __LINE_OPACITY__,
        weight: 1
      };
    }
  }).addTo(map);

  var overlayData = __OVERLAY_DATA__;
  var overlay = L.geoJson(overlayData, {
    smoothFactor: 2,
    style: function () {
      return { color: '__OVERLAY_COLOR__', fillColor: 'transparent', weight: __OVERLAY_WEIGHT__ };
    },
    onEachFeature: function (feature, layer) {
      layer.bindTooltip(feature.properties.tooltip_html, { sticky: false });
      layer.on('mouseover', function () {
        layer.setStyle({ weight: __HIGHLIGHT_WEIGHT__, fillColor: '__HIGHLIGHT_FILL__' });
      });
      layer.on('mouseout', function () {
        layer.setStyle({ weight: __OVERLAY_WEIGHT__, fillColor: 'transparent' });
      });
    }
  }).addTo(map);

  var legendData = __LEGEND__;
  var legend = L.control({ position: 'bottomright' });
  legend.onAdd = function () {
    var div = L.DomUtil.create('div', 'housemap-legend');
    var gradient = 'linear-gradient(to right, ' + legendData.gradient.join(', ') + ')';
    var bounds = legendData.min_label === null
      ? '<span>No data for this selection</span>'
      : '<span>' + legendData.min_label + '</span><span style="float: right;">' + legendData.max_label + '</span>';
    div.innerHTML =
      '<div class="housemap-legend-title">' + legendData.title + '</div>' +
      '<div class="housemap-legend-bar" style="background: ' + gradient + ';"></div>' +
      '<div class="housemap-legend-labels">' + bounds + '</div>';
    return div;
  };
  legend.addTo(map);
</script>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::test_fixtures::BOUNDARIES_GEOJSON;
    use crate::selection::{PropertyType, Selection};
    use std::collections::BTreeSet;

    fn boundaries() -> BoundaryCollection {
        serde_json::from_str(BOUNDARIES_GEOJSON).unwrap()
    }

    fn price_selection() -> Selection {
        Selection {
            period_begin: "2021-09-01".to_string(),
            property_type: PropertyType::AllResidential,
            metric: Metric::MedianSalePrice,
        }
    }

    /// Filtered table shaped like pipeline::apply_selection output.
    fn filtered() -> DataFrame {
        df!(
            "period_begin" => &["2021-09-01", "2021-09-01"],
            "period_end" => &["2021-09-30", "2021-09-30"],
            "period_duration" => &[30i32, 30],
            "property_type" => &["All Residential", "All Residential"],
            "median_sale_price" => &[450000.0, 310000.0],
            "state_code" => &["CA", "TX"],
            "name" => &["California", "Texas"],
            "stusab" => &["CA", "TX"],
        )
        .unwrap()
    }

    fn empty_filtered() -> DataFrame {
        filtered().head(Some(0))
    }

    fn feature_keys(collection: &Value) -> BTreeSet<String> {
        collection["features"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["properties"]["stusab"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn choropleth_and_overlay_key_sets_agree() {
        let spec = MapSpec::for_selection(&price_selection());
        let data = filtered();
        let bounds = boundaries();

        let choropleth = choropleth_feature_collection(&spec, &data, &bounds).unwrap();
        let overlay = overlay_feature_collection(&spec, &data, &bounds).unwrap();

        let colored: BTreeSet<String> = choropleth["features"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|f| f["properties"]["has_data"] == true)
            .map(|f| f["properties"]["stusab"].as_str().unwrap().to_string())
            .collect();
        let overlay_keys = feature_keys(&overlay);
        let boundary_keys: BTreeSet<String> =
            bounds.key_set().iter().map(|s| s.to_string()).collect();

        assert_eq!(colored, overlay_keys);
        assert!(overlay_keys.is_subset(&boundary_keys));
        // The choropleth styles every boundary, matched or not.
        assert_eq!(feature_keys(&choropleth), boundary_keys);
    }

    #[test]
    fn states_without_data_get_the_neutral_fill() {
        let spec = MapSpec::for_selection(&price_selection());
        let choropleth =
            choropleth_feature_collection(&spec, &filtered(), &boundaries()).unwrap();

        let features = choropleth["features"].as_array().unwrap();
        let wy = features
            .iter()
            .find(|f| f["properties"]["stusab"] == "WY")
            .unwrap();
        assert_eq!(wy["properties"]["fill_color"], "white");
        assert_eq!(wy["properties"]["has_data"], false);

        let ca = features
            .iter()
            .find(|f| f["properties"]["stusab"] == "CA")
            .unwrap();
        assert_ne!(ca["properties"]["fill_color"], "white");
    }

    #[test]
    fn tooltip_carries_aliases_and_localized_values() {
        let spec = MapSpec::for_selection(&price_selection());
        let overlay = overlay_feature_collection(&spec, &filtered(), &boundaries()).unwrap();

        let ca = overlay["features"]
            .as_array()
            .unwrap()
            .iter()
            .find(|f| f["properties"]["stusab"] == "CA")
            .unwrap();
        let tooltip = ca["properties"]["tooltip_html"].as_str().unwrap();
        assert!(tooltip.contains("Period Begin:"));
        assert!(tooltip.contains("2021-09-01"));
        assert!(tooltip.contains("State:"));
        assert!(tooltip.contains("California"));
        assert!(tooltip.contains("Median Sale Price:"));
        assert!(tooltip.contains("$450,000"));
    }

    #[test]
    fn empty_selection_still_renders_a_map() {
        let spec = MapSpec::for_selection(&price_selection());
        let writer = LeafletWriter::new();
        let html = writer
            .write(&spec, &empty_filtered(), &boundaries())
            .unwrap();

        assert!(html.contains("L.map('housemap'"));
        assert!(html.contains("cartocdn"));

        let overlay =
            overlay_feature_collection(&spec, &empty_filtered(), &boundaries()).unwrap();
        assert!(overlay["features"].as_array().unwrap().is_empty());

        let choropleth =
            choropleth_feature_collection(&spec, &empty_filtered(), &boundaries()).unwrap();
        assert!(choropleth["features"]
            .as_array()
            .unwrap()
            .iter()
            .all(|f| f["properties"]["fill_color"] == "white"));
    }

    #[test]
    fn legend_reports_the_metric_domain() {
        let spec = MapSpec::for_selection(&price_selection());
        let legend = legend(&spec, &filtered()).unwrap();
        assert_eq!(legend["title"], "Housing Market Metrics");
        assert_eq!(legend["min_label"], "$310,000");
        assert_eq!(legend["max_label"], "$450,000");
        assert_eq!(legend["gradient"].as_array().unwrap().len(), 9);
    }

    #[test]
    fn legend_domain_is_null_when_empty() {
        let spec = MapSpec::for_selection(&price_selection());
        let legend = legend(&spec, &empty_filtered()).unwrap();
        assert!(legend["min_label"].is_null());
        assert!(legend["max_label"].is_null());
    }

    #[test]
    fn fragment_embeds_both_layers_and_the_legend() {
        let spec = MapSpec::for_selection(&price_selection());
        let writer = LeafletWriter::new();
        let html = writer.write(&spec, &filtered(), &boundaries()).unwrap();

        assert!(html.contains("choroplethData"));
        assert!(html.contains("overlayData"));
        assert!(html.contains("Housing Market Metrics"));
        assert!(html.contains("fillColor: 'transparent'"));
        assert!(html.contains("'grey'"));
        // No layer-toggle control is ever emitted.
        assert!(!html.contains("L.control.layers"));
    }

    #[test]
    fn html_in_tooltip_values_is_escaped() {
        let spec = MapSpec::for_selection(&price_selection());
        let row = StateRow {
            period_begin: "2021-09-01".to_string(),
            period_end: "2021-09-30".to_string(),
            name: Some("<script>alert(1)</script>".to_string()),
            value: Some(1.0),
        };
        let tooltip = tooltip_html(&spec, Metric::MedianSalePrice, &row, "fallback");
        assert!(!tooltip.contains("<script>"));
        assert!(tooltip.contains("&lt;script&gt;"));
    }

    #[test]
    fn validate_rejects_out_of_range_opacity() {
        let mut spec = MapSpec::for_selection(&price_selection());
        spec.choropleth.fill_opacity = 1.5;
        assert!(LeafletWriter::new().validate(&spec).is_err());
    }
}
