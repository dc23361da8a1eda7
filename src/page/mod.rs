//! Page composition
//!
//! Assembles the full dashboard document: sidebar, main title and
//! description, the three-column selector row, and the rendered map.
//! Purely presentational; every control change submits the form and the
//! server re-runs the whole pipeline for the new selection.

use crate::selection::{Metric, PropertyType, Selection};

pub const SIDEBAR_TITLE: &str = "US Housing Market Dashboard";
pub const SIDEBAR_DESCRIPTION: &str =
    "This app uses data sourced from Redfin housing market data.";
pub const PAGE_TITLE: &str = "U.S. Real Estate Insights";
pub const PAGE_DESCRIPTION: &str = "Where are the hottest housing markets in the U.S.? \
Select the housing market metrics you are interested in and your insights are just a \
couple clicks away. Hover over the map to view more details.";

/// Compose the full HTML document around a rendered map fragment.
///
/// `months` is the snapshot-month list in display order (most recent
/// first); the selects echo the active selection back as their selected
/// options.
pub fn compose(selection: &Selection, months: &[String], map_html: &str) -> String {
    PAGE_TEMPLATE
        .replace("__SIDEBAR_TITLE__", SIDEBAR_TITLE)
        .replace("__SIDEBAR_DESCRIPTION__", SIDEBAR_DESCRIPTION)
        .replace("__PAGE_TITLE__", PAGE_TITLE)
        .replace("__PAGE_DESCRIPTION__", PAGE_DESCRIPTION)
        .replace("__MONTH_OPTIONS__", &month_options(selection, months))
        .replace("__PROPERTY_OPTIONS__", &property_options(selection))
        .replace("__METRIC_OPTIONS__", &metric_options(selection))
        .replace("__MAP__", map_html)
}

fn month_options(selection: &Selection, months: &[String]) -> String {
    months
        .iter()
        .map(|month| option(month, month, *month == selection.period_begin))
        .collect()
}

fn property_options(selection: &Selection) -> String {
    PropertyType::ALL
        .iter()
        .map(|p| option(p.label(), p.label(), *p == selection.property_type))
        .collect()
}

fn metric_options(selection: &Selection) -> String {
    Metric::ALL
        .iter()
        .map(|m| option(m.column(), m.column(), *m == selection.metric))
        .collect()
}

fn option(value: &str, label: &str, selected: bool) -> String {
    format!(
        "<option value=\"{}\"{}>{}</option>",
        escape_html(value),
        if selected { " selected" } else { "" },
        escape_html(label)
    )
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>__PAGE_TITLE__</title>
  <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
  <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
  <style>
    body { margin: 0; font-family: "Source Sans Pro", sans-serif; display: flex; }
    .sidebar { width: 260px; min-height: 100vh; background: #f0f2f6; padding: 1.5rem; }
    .sidebar h3 { margin-top: 0; }
    .main { flex: 1; padding: 1.5rem 2rem; }
    .selector-row { display: flex; gap: 1rem; margin: 1rem 0; }
    .selector-row label { display: block; font-size: 0.85rem; margin-bottom: 0.25rem; }
    .selector-col { flex: 1; }
    .selector-col select { width: 100%; padding: 0.35rem; }
    .housemap-legend { background: white; padding: 6px 8px; border-radius: 4px;
      box-shadow: 0 0 4px rgba(0,0,0,0.3); font-size: 0.8rem; width: 180px; }
    .housemap-legend-title { font-weight: bold; margin-bottom: 4px; }
    .housemap-legend-bar { height: 10px; border-radius: 2px; }
    .housemap-legend-labels { margin-top: 2px; }
  </style>
</head>
<body>
  <aside class="sidebar">
    <h3>__SIDEBAR_TITLE__</h3>
    <p>__SIDEBAR_DESCRIPTION__</p>
  </aside>
  <main class="main">
    <h1>__PAGE_TITLE__</h1>
    <p>__PAGE_DESCRIPTION__</p>
    <form method="get" action="/">
      <div class="selector-row">
        <div class="selector-col">
          <label for="period">Snapshot Month</label>
          <select id="period" name="period" onchange="this.form.submit()">
            __MONTH_OPTIONS__
          </select>
        </div>
        <div class="selector-col">
          <label for="property_type">View by Property Type</label>
          <select id="property_type" name="property_type" onchange="this.form.submit()">
            __PROPERTY_OPTIONS__
          </select>
        </div>
        <div class="selector-col">
          <label for="metric">Select Housing Metrics</label>
          <select id="metric" name="metric" onchange="this.form.submit()">
            __METRIC_OPTIONS__
          </select>
        </div>
      </div>
    </form>
    __MAP__
  </main>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn selection() -> Selection {
        Selection {
            period_begin: "2021-09-01".to_string(),
            property_type: PropertyType::CondoCoOp,
            metric: Metric::HomesSold,
        }
    }

    fn months() -> Vec<String> {
        vec!["2021-09-01".to_string(), "2021-08-01".to_string()]
    }

    #[test]
    fn page_carries_titles_and_map() {
        let html = compose(&selection(), &months(), "<div id=\"housemap\"></div>");
        assert!(html.contains(PAGE_TITLE));
        assert!(html.contains(SIDEBAR_TITLE));
        assert!(html.contains("<div id=\"housemap\"></div>"));
    }

    #[test]
    fn three_selectors_in_one_row() {
        let html = compose(&selection(), &months(), "");
        assert_eq!(html.matches("<select").count(), 3);
        assert!(html.contains("Snapshot Month"));
        assert!(html.contains("View by Property Type"));
        assert!(html.contains("Select Housing Metrics"));
    }

    #[test]
    fn active_selection_is_marked_selected() {
        let html = compose(&selection(), &months(), "");
        assert!(html.contains("<option value=\"2021-09-01\" selected>"));
        assert!(html.contains("<option value=\"Condo/Co-op\" selected>"));
        assert!(html.contains("<option value=\"homes_sold\" selected>"));
        // Non-active options are not marked.
        assert!(html.contains("<option value=\"2021-08-01\">"));
        assert!(html.contains("<option value=\"median_sale_price\">"));
    }

    #[test]
    fn all_property_types_and_metrics_are_listed() {
        let html = compose(&selection(), &months(), "");
        for p in PropertyType::ALL {
            assert!(html.contains(&escape_html(p.label())), "missing {}", p);
        }
        for m in Metric::ALL {
            assert!(html.contains(m.column()), "missing {}", m);
        }
    }

    #[test]
    fn selector_changes_submit_the_form() {
        let html = compose(&selection(), &months(), "");
        assert_eq!(html.matches("onchange=\"this.form.submit()\"").count(), 3);
        assert!(html.contains("method=\"get\""));
    }
}
