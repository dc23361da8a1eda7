//! State-boundary GeoJSON loader
//!
//! The boundary file is a GeoJSON FeatureCollection whose features carry a
//! `stusab` two-letter postal code, a `name`, and a polygon/multipolygon
//! geometry. Geometry is kept as raw JSON and re-attached by key when the
//! map is rendered; only the (stusab, name) attributes enter the tabular
//! join.

use std::collections::BTreeSet;
use std::path::Path;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{HousemapError, Result};

/// One state/territory boundary.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoundaryFeature {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: BoundaryProperties,
    pub geometry: serde_json::Value,
}

/// Feature attributes used by the dashboard. Extra properties present in
/// the source file are preserved untouched.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoundaryProperties {
    pub name: String,
    pub stusab: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The parsed boundary file: one feature per state/territory, immutable
/// after load.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoundaryCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<BoundaryFeature>,
}

impl BoundaryCollection {
    /// Tabular view of the collection for the join: one row per feature
    /// with `stusab` and `name` columns.
    pub fn attribute_frame(&self) -> Result<DataFrame> {
        let stusab: Vec<&str> = self
            .features
            .iter()
            .map(|f| f.properties.stusab.as_str())
            .collect();
        let name: Vec<&str> = self
            .features
            .iter()
            .map(|f| f.properties.name.as_str())
            .collect();
        let df = df!("stusab" => stusab, "name" => name)?;
        Ok(df)
    }

    /// Look up a feature by its two-letter postal code.
    pub fn feature_by_code(&self, code: &str) -> Option<&BoundaryFeature> {
        self.features.iter().find(|f| f.properties.stusab == code)
    }

    /// All postal codes present in the file.
    pub fn key_set(&self) -> BTreeSet<&str> {
        self.features
            .iter()
            .map(|f| f.properties.stusab.as_str())
            .collect()
    }
}

pub(super) fn load(path: &Path) -> Result<BoundaryCollection> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        HousemapError::ReaderError(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let collection: BoundaryCollection = serde_json::from_str(&raw).map_err(|e| {
        HousemapError::ReaderError(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    if collection.kind != "FeatureCollection" {
        return Err(HousemapError::ReaderError(format!(
            "{} is not a GeoJSON FeatureCollection (found type '{}')",
            path.display(),
            collection.kind
        )));
    }

    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::test_fixtures::BOUNDARIES_GEOJSON;

    fn parsed() -> BoundaryCollection {
        serde_json::from_str(BOUNDARIES_GEOJSON).unwrap()
    }

    #[test]
    fn parses_feature_collection() {
        let collection = parsed();
        assert_eq!(collection.kind, "FeatureCollection");
        assert_eq!(collection.features.len(), 3);
        assert_eq!(collection.features[0].properties.stusab, "CA");
        assert_eq!(collection.features[0].properties.name, "California");
        assert_eq!(collection.features[0].geometry["type"], "Polygon");
    }

    #[test]
    fn attribute_frame_has_one_row_per_feature() {
        let df = parsed().attribute_frame().unwrap();
        assert_eq!(df.shape(), (3, 2));
        let codes = df.column("stusab").unwrap();
        assert_eq!(codes.str().unwrap().get(2).unwrap(), "WY");
    }

    #[test]
    fn feature_lookup_by_code() {
        let collection = parsed();
        assert_eq!(
            collection.feature_by_code("TX").unwrap().properties.name,
            "Texas"
        );
        assert!(collection.feature_by_code("ZZ").is_none());
    }

    #[test]
    fn key_set_covers_all_features() {
        let collection = parsed();
        let keys = collection.key_set();
        assert_eq!(keys.len(), 3);
        assert!(keys.contains("WY"));
    }

    #[test]
    fn non_collection_type_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feature.geojson");
        std::fs::write(
            &path,
            r#"{"type": "Feature", "properties": {"name": "X", "stusab": "XX"}, "geometry": null, "features": []}"#,
        )
        .unwrap();
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("FeatureCollection"));
    }
}
