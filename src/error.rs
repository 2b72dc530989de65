//! Error types shared by the HERE client and the sync workflow.

use thiserror::Error;

/// Errors returned by the interactive map API and the sync operation.
#[derive(Debug, Error)]
pub enum HereError {
    /// The catalog or layer does not exist on the platform
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The platform answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced a response
    #[error("Request failed: {0}")]
    Transport(String),

    /// The response body could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The platform reported catalog creation as failed or never finished it
    #[error("Catalog creation did not complete: {0}")]
    CatalogCreation(String),

    /// Token acquisition failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Failed to read geo data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid GeoJSON: {0}")]
    GeoJson(String),
}

/// Failure of a full upload run.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The layer could neither be found nor created
    #[error("HERE returned the following error: {0}")]
    Provisioning(String),

    #[error(transparent)]
    Sync(#[from] HereError),
}

impl HereError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, HereError::NotFound(_))
    }
}

impl From<geojson::Error> for HereError {
    fn from(err: geojson::Error) -> Self {
        HereError::GeoJson(err.to_string())
    }
}
