use geojson::feature::Id;
use geojson::{FeatureCollection, GeoJson};
use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::Path;
use tracing::{debug, enabled, info, Level};

use crate::api::{FeatureFilter, InteractiveMapApi, LayerHandle};
use crate::config::SyncSettings;
use crate::error::HereError;
use crate::extent::collection_extent;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub deleted: usize,
    pub delete_batches: usize,
    /// Zero when the local file had nothing to upload
    pub uploaded: usize,
}

pub fn id_batches(ids: &[String], batch_size: NonZeroUsize) -> impl Iterator<Item = &[String]> {
    ids.chunks(batch_size.get())
}

// Ids of the features in a collection, in order. Features without an id are skipped.
pub fn feature_ids(collection: &FeatureCollection) -> Vec<String> {
    collection
        .features
        .iter()
        .filter_map(|feature| match &feature.id {
            Some(Id::String(id)) => Some(id.clone()),
            Some(Id::Number(id)) => Some(id.to_string()),
            None => None,
        })
        .collect()
}

// Absent or blank files load as an empty collection, a single Feature as a collection of one
pub fn load_features(path: &Path) -> Result<FeatureCollection, HereError> {
    let empty = FeatureCollection {
        bbox: None,
        features: Vec::new(),
        foreign_members: None,
    };

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("Geo data file {} does not exist", path.display());
            return Ok(empty);
        }
        Err(err) => return Err(err.into()),
    };
    if content.trim().is_empty() {
        debug!("Geo data file {} is empty", path.display());
        return Ok(empty);
    }

    match content.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        GeoJson::Feature(feature) => Ok(FeatureCollection {
            features: vec![feature],
            ..empty
        }),
        GeoJson::Geometry(_) => Err(HereError::GeoJson(format!(
            "{} holds a bare geometry, expected a FeatureCollection",
            path.display()
        ))),
    }
}

// Delete every feature currently stored in the layer, one batch per request
pub fn purge_features<A: InteractiveMapApi + ?Sized>(
    api: &A,
    layer: &LayerHandle,
    batch_size: NonZeroUsize,
) -> Result<(usize, usize), HereError> {
    let existing = api.search_features(layer, &FeatureFilter::all_ids())?;
    let ids = feature_ids(&existing);

    info!("Deleting all existing activities from the HERE interactive map layer");

    let mut batches = 0;
    for batch in id_batches(&ids, batch_size) {
        debug!("Deleting {} features", batch.len());
        api.delete_features(layer, batch)?;
        batches += 1;
    }

    Ok((ids.len(), batches))
}

// Optional purge, then one write. Nothing is persisted in between, so a failed
// upload after a purge leaves the layer empty.
pub fn sync<A: InteractiveMapApi + ?Sized>(
    api: &A,
    layer: &LayerHandle,
    geo_data_file: &Path,
    refresh: bool,
    settings: &SyncSettings,
) -> Result<SyncReport, HereError> {
    let mut report = SyncReport::default();

    if refresh {
        let (deleted, batches) = purge_features(api, layer, settings.delete_batch_size)?;
        report.deleted = deleted;
        report.delete_batches = batches;
    }

    let collection = load_features(geo_data_file)?;
    if collection.features.is_empty() {
        return Ok(report);
    }

    info!(
        "Uploading {} activities from '{}' to the HERE interactive map layer",
        collection.features.len(),
        geo_data_file.display()
    );
    if enabled!(Level::DEBUG) {
        if let Some(extent) = collection_extent(&collection) {
            debug!(
                "Upload extent: ({:.4}, {:.4}) to ({:.4}, {:.4})",
                extent.min().x,
                extent.min().y,
                extent.max().x,
                extent.max().y
            );
        }
    }

    api.write_features(layer, &collection)?;
    report.uploaded = collection.features.len();

    Ok(report)
}
