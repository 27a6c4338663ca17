use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown region: {0}")]
    UnknownRegion(String),

    #[error("failed to load records for {region}: {reason}")]
    Load { region: String, reason: String },
}

/// Categorized position-acquisition failures.
///
/// Display strings double as the user-visible transient message, so they
/// are phrased for end users rather than logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("Location access denied. Please enable location services.")]
    PermissionDenied,

    #[error("Location information is unavailable.")]
    Unavailable,

    #[error("Location request timed out.")]
    Timeout,

    #[error("An unknown location error occurred.")]
    Unknown,
}
