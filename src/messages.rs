use crate::error::CamError;
use tokio::sync::oneshot;

/// User-facing notification texts
pub const CAMERA_NOT_FOUND: &str = "Camera not found. Please refresh.";
pub const RECORDING_STARTED: &str = "Recording started";
pub const RECORDING_SAVED: &str = "Recording saved to downloads";
pub const SCREENSHOT_SAVED: &str = "Screenshot saved to downloads";
pub const AUTO_RECORD_ENABLED: &str = "Auto record enabled";
pub const AUTO_RECORD_DISABLED: &str = "Auto record disabled";
pub const LOADING_MODEL: &str = "Loading model...";

/// Commands for the Recorder service
pub enum RecorderCommand {
    /// Start silently when idle, stop and save when recording
    Toggle,
    StartIfIdle { audible_cue: bool },
    Stop(oneshot::Sender<Result<(), CamError>>),
}

/// Recorder state (observable via watch channel)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    /// Stream is being finalized; collapses back to `Idle`
    Stopping,
}
