use super::RecorderHandle;
use crate::detection::Detector;
use crate::frame::FrameSource;
use crate::overlay::{OverlayRenderer, Surface};
use crate::policy;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Everything one run of the loop reads; a change means a restart
pub struct LoopInputs<S> {
    pub source: Arc<dyn FrameSource>,
    pub detector: Arc<dyn Detector>,
    pub overlay: Arc<Mutex<OverlayRenderer<S>>>,
    pub recorder: RecorderHandle,
    pub mirrored: bool,
    pub auto_record_enabled: bool,
}

struct Running {
    shutdown: watch::Sender<bool>,
    _task: JoinHandle<()>,
}

/// Fixed-period detect, paint and auto-record cycle
///
/// Each tick awaits its detector call before the next tick is taken, and
/// missed ticks are skipped, so detector calls never overlap. Stopping lets an
/// in-flight detector call finish but drops its result.
pub struct DetectionLoop {
    period: Duration,
    running: Option<Running>,
}

impl DetectionLoop {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Start, or restart with new inputs
    pub fn start<S>(&mut self, inputs: LoopInputs<S>)
    where
        S: Surface + Serialize + Send + 'static,
    {
        self.stop();

        tracing::info!(
            "Detection loop every {:?} (mirrored: {}, auto record: {})",
            self.period,
            inputs.mirrored,
            inputs.auto_record_enabled
        );

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(self.period, inputs, shutdown_rx));
        self.running = Some(Running {
            shutdown,
            _task: task,
        });
    }

    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.shutdown.send_replace(true);
            tracing::debug!("Detection loop stopped");
        }
    }
}

impl Drop for DetectionLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run<S: Surface + Serialize>(
    period: Duration,
    inputs: LoopInputs<S>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }

        let Some(frame) = inputs.source.current_frame() else {
            tracing::trace!("No frame yet, skipping tick");
            continue;
        };

        let detections = inputs.detector.detect(&frame).await;

        if *shutdown.borrow() {
            tracing::debug!("Discarding {} detections from stopped loop", detections.len());
            break;
        }

        {
            let mut overlay = inputs.overlay.lock().unwrap_or_else(PoisonError::into_inner);
            overlay.paint(
                (frame.width(), frame.height()),
                &detections,
                inputs.mirrored,
            );
            if tracing::enabled!(target: "overlay", tracing::Level::TRACE) {
                match serde_json::to_string(overlay.surface()) {
                    Ok(json) => tracing::trace!(target: "overlay", "{}", json),
                    Err(e) => tracing::warn!("Failed to serialize overlay: {}", e),
                }
            }
        }

        // stop() may have landed while painting
        if *shutdown.borrow() {
            break;
        }

        if policy::should_start_recording(&detections, inputs.auto_record_enabled) {
            tracing::debug!("Person detected, requesting auto record");
            if let Err(e) = inputs.recorder.start_if_idle(true).await {
                tracing::warn!("Auto record request failed: {}", e);
            }
        }
    }
}
