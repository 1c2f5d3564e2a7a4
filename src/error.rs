use thiserror::Error;

/// Failures surfaced to the user by the viewer
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CamError {
    /// Camera or its capture stream is not ready
    #[error("camera not available")]
    DeviceUnavailable,

    /// Detector weights could not be fetched or parsed
    #[error("failed to load detection model: {0}")]
    ModelLoad(String),

    /// Stop requested while nothing is being recorded
    #[error("recorder is not recording")]
    RecorderInactive,

    #[error("failed to encode frame: {0}")]
    Encode(String),
}
