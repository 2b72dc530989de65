//! Remote interactive map layer operations.
//!
//! [`InteractiveMapApi`] is the seam between the workflow (resolver and sync)
//! and the HERE platform. [`crate::client::HereClient`] is the HTTP
//! implementation; tests substitute an in-memory one.

use geojson::FeatureCollection;
use serde::Serialize;
use std::fmt;

use crate::error::HereError;

pub const INTERACTIVE_MAP_LAYER_TYPE: &str = "interactivemap";

/// A resolved interactive map layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerHandle {
    pub catalog_hrn: String,
    pub layer_id: String,
    /// Base URL of the interactive API for this catalog
    pub base_url: String,
}

impl LayerHandle {
    pub fn features_url(&self) -> String {
        format!(
            "{}/layers/{}/features",
            self.base_url.trim_end_matches('/'),
            self.layer_id
        )
    }

    pub fn search_url(&self) -> String {
        format!(
            "{}/layers/{}/search",
            self.base_url.trim_end_matches('/'),
            self.layer_id
        )
    }
}

/// Catalog metadata used when provisioning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogSpec {
    pub id: String,
    pub name: String,
    pub summary: String,
    pub description: String,
}

/// Layer details used when provisioning.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSpec {
    pub id: String,
    pub name: String,
    pub summary: String,
    pub description: String,
    pub layer_type: String,
    pub interactive_map_properties: serde_json::Map<String, serde_json::Value>,
}

impl LayerSpec {
    pub fn interactive_map(id: &str, name: &str, summary: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            summary: summary.to_string(),
            description: description.to_string(),
            layer_type: INTERACTIVE_MAP_LAYER_TYPE.to_string(),
            interactive_map_properties: serde_json::Map::new(),
        }
    }
}

// Greater-or-equal filter on one property, rendered as `<property>=gte=<value>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureFilter {
    pub property: String,
    pub value: String,
}

impl FeatureFilter {
    /// Matches every feature with an id (`id >= "0"`).
    pub fn all_ids() -> Self {
        Self {
            property: "id".to_string(),
            value: "0".to_string(),
        }
    }
}

impl fmt::Display for FeatureFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=gte={}", self.property, self.value)
    }
}

/// Operations consumed from the HERE interactive map layer API.
pub trait InteractiveMapApi {
    /// Finds an existing layer. Returns [`HereError::NotFound`] when the
    /// catalog or the layer is absent.
    fn lookup_layer(&self, catalog_hrn: &str, layer_id: &str) -> Result<LayerHandle, HereError>;

    /// Creates a catalog containing a single layer.
    fn create_catalog_and_layer(
        &self,
        catalog: &CatalogSpec,
        layer: &LayerSpec,
    ) -> Result<LayerHandle, HereError>;

    fn search_features(
        &self,
        layer: &LayerHandle,
        filter: &FeatureFilter,
    ) -> Result<FeatureCollection, HereError>;

    /// Deletes the given ids. Callers keep `ids` within the batch size.
    fn delete_features(&self, layer: &LayerHandle, ids: &[String]) -> Result<(), HereError>;

    fn write_features(
        &self,
        layer: &LayerHandle,
        features: &FeatureCollection,
    ) -> Result<(), HereError>;
}
