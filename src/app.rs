use crate::commands::{self, UserCommand};
use crate::config::Config;
use crate::detection::{Detector, ModelLoader, ReplayModelLoader};
use crate::error::CamError;
use crate::feedback::RodioTone;
use crate::frame::{FrameSource, StillFrameSource};
use crate::messages::{self, RecorderState};
use crate::notify::LogNotifier;
use crate::overlay::{DisplayList, OverlayRenderer};
use crate::persistence::DownloadDir;
use crate::preferences::PlaybackPreferences;
use crate::screenshot;
use crate::services::{DetectionLoop, LoopInputs, Outputs, Recorder, RecorderHandle};

use anyhow::Result;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

const RECORDER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct App {
    config: Config,
    prefs: watch::Sender<PlaybackPreferences>,
    source: Arc<dyn FrameSource>,
    loader: Arc<dyn ModelLoader>,
    detector: Option<Arc<dyn Detector>>,
    overlay: Arc<Mutex<OverlayRenderer<DisplayList>>>,
    recorder: RecorderHandle,
    recorder_task: JoinHandle<()>,
    detection_loop: DetectionLoop,
    outputs: Outputs,
    command_rx: mpsc::Receiver<UserCommand>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let source: Arc<dyn FrameSource> =
            Arc::new(StillFrameSource::open(&config.frames_dir, config.frame_rate));
        let loader: Arc<dyn ModelLoader> = Arc::new(ReplayModelLoader::new(&config.model_path));
        let outputs = Outputs {
            notifier: Arc::new(LogNotifier),
            tone: Arc::new(RodioTone::new(
                config.tone_frequency_hz,
                config.tone_duration(),
            )),
            persistence: Arc::new(DownloadDir::new(&config.downloads_dir)),
        };
        let command_rx = Self::setup_command_input();

        Self::with_parts(config, source, loader, outputs, command_rx)
    }

    pub fn with_parts(
        config: Config,
        source: Arc<dyn FrameSource>,
        loader: Arc<dyn ModelLoader>,
        outputs: Outputs,
        command_rx: mpsc::Receiver<UserCommand>,
    ) -> Self {
        let (prefs, prefs_rx) = watch::channel(PlaybackPreferences::from_config(&config));

        // Create and spawn Recorder
        let (recorder_tx, recorder_rx) = mpsc::channel(10);
        let recorder = Recorder::new(
            recorder_rx,
            source.clone(),
            prefs_rx,
            config.max_clip_duration(),
            outputs.clone(),
        );
        tokio::spawn(log_recorder_state(recorder.subscribe()));
        let recorder_task = tokio::spawn(recorder.run());

        Self {
            detection_loop: DetectionLoop::new(config.detection_interval()),
            config,
            prefs,
            source,
            loader,
            detector: None,
            overlay: Arc::new(Mutex::new(OverlayRenderer::new(DisplayList::default()))),
            recorder: RecorderHandle::new(recorder_tx),
            recorder_task,
            outputs,
            command_rx,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        tracing::info!("Hold up... loading {} model", self.config.model_base);
        self.outputs.notifier.notify(messages::LOADING_MODEL);

        let loader = self.loader.clone();
        let model = self.config.model();
        let loading = async move { loader.load(&model).await };
        tokio::pin!(loading);
        let mut model_pending = true;
        let mut commands_open = true;

        loop {
            tokio::select! {
                result = &mut loading, if model_pending => {
                    model_pending = false;
                    self.on_model_loaded(result);
                }

                cmd = self.command_rx.recv(), if commands_open => match cmd {
                    Some(UserCommand::Quit) => break,
                    Some(cmd) => self.handle_command(cmd).await,
                    None => {
                        tracing::debug!("Command input closed");
                        commands_open = false;
                    }
                },

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    break;
                }
            }
        }

        self.shutdown().await;
        tracing::info!("camwatch shutdown complete");
        Ok(())
    }

    fn on_model_loaded(&mut self, result: Result<Arc<dyn Detector>, CamError>) {
        match result {
            Ok(detector) => {
                tracing::info!("Model loaded");
                self.detector = Some(detector);
                self.restart_detection();
            }
            Err(e) => {
                // Stays in the loading state; there is no retry
                tracing::error!("{}", e);
                self.outputs.notifier.notify(&e.to_string());
            }
        }
    }

    /// Restart the loop so it picks up the current inputs
    fn restart_detection(&mut self) {
        let Some(detector) = self.detector.clone() else {
            tracing::debug!("Model not loaded yet, detection loop not started");
            return;
        };
        let prefs = *self.prefs.borrow();

        if self.detection_loop.is_running() {
            tracing::debug!("Restarting detection loop with {:?}", prefs);
        }
        self.detection_loop.start(LoopInputs {
            source: self.source.clone(),
            detector,
            overlay: self.overlay.clone(),
            recorder: self.recorder.clone(),
            mirrored: prefs.mirrored,
            auto_record_enabled: prefs.auto_record_enabled,
        });
    }

    async fn handle_command(&mut self, cmd: UserCommand) {
        tracing::debug!("handle_command: {:?}", cmd);

        match cmd {
            UserCommand::Screenshot => {
                screenshot::capture(self.source.as_ref(), &self.outputs).await
            }

            UserCommand::Record => {
                if let Err(e) = self.recorder.toggle().await {
                    tracing::error!("Error toggling recording: {}", e);
                }
            }

            UserCommand::ToggleAutoRecord => {
                let mut prefs = *self.prefs.borrow();
                let enabled = prefs.toggle_auto_record();
                self.prefs.send_replace(prefs);

                self.outputs.notifier.notify(if enabled {
                    messages::AUTO_RECORD_ENABLED
                } else {
                    messages::AUTO_RECORD_DISABLED
                });
                self.restart_detection();
            }

            UserCommand::ToggleMirror => {
                let mut prefs = *self.prefs.borrow();
                let mirrored = prefs.toggle_mirrored();
                self.prefs.send_replace(prefs);

                tracing::info!("Mirrored: {}", mirrored);
                self.restart_detection();
            }

            UserCommand::SetVolume(level) => {
                let mut prefs = *self.prefs.borrow();
                let volume = prefs.set_volume(level);
                self.prefs.send_replace(prefs);

                tracing::info!("Notification volume: {:.1}", volume);
                self.outputs.tone.play_tone(volume);
            }

            UserCommand::Quit => {}
        }
    }

    async fn shutdown(mut self) {
        self.detection_loop.stop();

        match self.recorder.stop().await {
            Ok(()) => tracing::info!("Active recording saved"),
            Err(e) => match e.downcast_ref::<CamError>() {
                Some(CamError::RecorderInactive) => tracing::debug!("No active recording"),
                _ => tracing::warn!("Failed to stop recorder: {}", e),
            },
        }

        let Self {
            recorder,
            recorder_task,
            ..
        } = self;
        drop(recorder);
        if tokio::time::timeout(RECORDER_SHUTDOWN_TIMEOUT, recorder_task)
            .await
            .is_err()
        {
            tracing::warn!("Recorder did not shut down in time");
        }
    }

    fn setup_command_input() -> mpsc::Receiver<UserCommand> {
        let (command_tx, command_rx) = mpsc::channel(10);
        tokio::spawn(async move {
            if let Err(e) = commands::monitor_stdin(command_tx).await {
                tracing::error!("Command input failed: {}", e);
            }
        });
        command_rx
    }
}

/// Follows recorder transitions until the recorder goes away
async fn log_recorder_state(mut state: watch::Receiver<RecorderState>) {
    while state.changed().await.is_ok() {
        let current = *state.borrow_and_update();
        tracing::info!("Recorder: {:?}", current);
    }
}
