use crate::error::CamError;
use crate::frame::FrameSource;
use crate::messages;
use crate::persistence;
use crate::services::Outputs;

/// Save the current frame as a PNG download
pub async fn capture(source: &dyn FrameSource, outputs: &Outputs) {
    if !source.is_ready() {
        outputs.notifier.notify(messages::CAMERA_NOT_FOUND);
        return;
    }

    let png = match source.screenshot() {
        Ok(png) => png,
        Err(CamError::DeviceUnavailable) => {
            outputs.notifier.notify(messages::CAMERA_NOT_FOUND);
            return;
        }
        Err(e) => {
            tracing::error!("Screenshot failed: {}", e);
            return;
        }
    };

    let filename = persistence::screenshot_filename(&chrono::Local::now());
    match outputs.persistence.save(&png, &filename).await {
        Ok(()) => outputs.notifier.notify(messages::SCREENSHOT_SAVED),
        Err(e) => tracing::error!("Failed to save screenshot: {:#}", e),
    }
}
