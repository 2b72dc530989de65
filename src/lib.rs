use std::path::Path;
use tracing::info;

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod extent;
pub mod resolver;
pub mod sync;
pub mod transport;

pub use api::{InteractiveMapApi, LayerHandle};
pub use config::{SyncSettings, ToolConfig};
pub use error::{HereError, UploadError};
pub use resolver::{resolve, Resolution};
pub use sync::{sync, SyncReport};

/// Uploads the activity geo data to the interactive map layer, provisioning
/// the layer on first use. With `refresh` every existing feature is deleted
/// before the upload.
pub fn upload_geo_data<A: InteractiveMapApi + ?Sized>(
    api: &A,
    geo_data_file: &Path,
    refresh: bool,
    settings: &SyncSettings,
) -> Result<SyncReport, UploadError> {
    let layer = resolve(api, settings)
        .into_handle()
        .map_err(UploadError::Provisioning)?;

    let report = sync(api, &layer, geo_data_file, refresh, settings)?;
    info!(
        "Sync complete: {} deleted in {} batches, {} uploaded",
        report.deleted, report.delete_batches, report.uploaded
    );

    Ok(report)
}
