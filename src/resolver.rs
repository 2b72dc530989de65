use tracing::{debug, info, warn};

use crate::api::{InteractiveMapApi, LayerHandle};
use crate::config::SyncSettings;

/// Outcome of locating or provisioning the activity layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(LayerHandle),
    Created(LayerHandle),
    /// Neither lookup nor creation produced a layer. Carries the remote error text.
    Unrecoverable(String),
}

impl Resolution {
    pub fn into_handle(self) -> Result<LayerHandle, String> {
        match self {
            Resolution::Found(handle) | Resolution::Created(handle) => Ok(handle),
            Resolution::Unrecoverable(message) => Err(message),
        }
    }
}

// Locate the configured layer, creating the catalog and layer if it does not exist
pub fn resolve<A: InteractiveMapApi + ?Sized>(api: &A, settings: &SyncSettings) -> Resolution {
    let catalog_hrn = settings.catalog_hrn();
    info!("Locating the HERE interactive map layer '{}'", settings.layer_id);

    match api.lookup_layer(&catalog_hrn, &settings.layer_id) {
        Ok(handle) => {
            info!(
                "Found an existing HERE interactive map layer with ID '{}'",
                settings.layer_id
            );
            return Resolution::Found(handle);
        }
        Err(err) if err.is_not_found() => {
            debug!("Lookup of {} reported: {}", catalog_hrn, err);
        }
        // Anything other than absence (outage, bad credentials) must not trigger provisioning
        Err(err) => {
            warn!("Lookup of {} failed: {}", catalog_hrn, err);
            return Resolution::Unrecoverable(err.to_string());
        }
    }

    info!("No existing HERE interactive map layer found. Creating a new catalog and layer.");

    match api.create_catalog_and_layer(&settings.catalog_spec(), &settings.layer_spec()) {
        Ok(handle) => {
            info!(
                "Created a new catalog with ID '{}' and interactive map layer with ID '{}'",
                settings.catalog_id, settings.layer_id
            );
            Resolution::Created(handle)
        }
        Err(err) => Resolution::Unrecoverable(err.to_string()),
    }
}
