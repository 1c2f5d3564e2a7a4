use super::Outputs;
use crate::error::CamError;
use crate::frame::{FrameSource, MediaStream};
use crate::messages::{self, RecorderCommand, RecorderState};
use crate::persistence;
use crate::preferences::PlaybackPreferences;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant};

/// Media accumulated during one recording
#[derive(Debug, Default)]
pub struct Clip {
    bytes: Vec<u8>,
    chunks: usize,
}

impl Clip {
    fn push(&mut self, chunk: Vec<u8>) {
        self.bytes.extend_from_slice(&chunk);
        self.chunks += 1;
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Owns the recording state machine
///
/// This service:
/// - Obtains the media stream from the frame source on first use
/// - Collects encoded chunks into a single active clip
/// - Enforces the maximum clip duration with its own deadline
/// - Saves the sealed clip on every stop
///
/// All state lives in this task, so every check-and-act on `RecorderState`
/// is serialized through the command channel.
pub struct Recorder {
    cmd_rx: mpsc::Receiver<RecorderCommand>,
    source: Arc<dyn FrameSource>,
    stream: Option<Box<dyn MediaStream>>,
    chunk_rx: Option<mpsc::Receiver<Vec<u8>>>,
    clip: Option<Clip>,
    state_tx: watch::Sender<RecorderState>,
    prefs: watch::Receiver<PlaybackPreferences>,
    max_duration: Duration,
    deadline: Option<Instant>,
    outputs: Outputs,
}

impl Recorder {
    pub fn new(
        cmd_rx: mpsc::Receiver<RecorderCommand>,
        source: Arc<dyn FrameSource>,
        prefs: watch::Receiver<PlaybackPreferences>,
        max_duration: Duration,
        outputs: Outputs,
    ) -> Self {
        let (state_tx, _) = watch::channel(RecorderState::Idle);
        Self {
            cmd_rx,
            source,
            stream: None,
            chunk_rx: None,
            clip: None,
            state_tx,
            prefs,
            max_duration,
            deadline: None,
            outputs,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RecorderState> {
        self.state_tx.subscribe()
    }

    fn state(&self) -> RecorderState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: RecorderState) {
        tracing::debug!("Recorder: {:?} -> {:?}", self.state(), state);
        self.state_tx.send_replace(state);
    }

    pub async fn run(mut self) {
        loop {
            let deadline = self.deadline;
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => break,
                },

                // Collect encoded media (only while a stream is running)
                Some(chunk) = next_chunk(&mut self.chunk_rx) => {
                    if let Some(clip) = self.clip.as_mut() {
                        clip.push(chunk);
                    }
                }

                _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.on_max_duration().await;
                }
            }
        }

        // Handles are gone; seal whatever is in flight
        if self.state() == RecorderState::Recording {
            self.finish_clip().await;
        }
        tracing::info!("Recorder shut down");
    }

    async fn handle_command(&mut self, cmd: RecorderCommand) {
        match cmd {
            RecorderCommand::Toggle => match self.state() {
                RecorderState::Idle => {
                    if let Err(CamError::DeviceUnavailable) = self.start_clip(false) {
                        self.outputs.notifier.notify(messages::CAMERA_NOT_FOUND);
                    }
                }
                RecorderState::Recording => {
                    self.finish_clip().await;
                    self.outputs.notifier.notify(messages::RECORDING_SAVED);
                }
                RecorderState::Stopping => tracing::debug!("Already stopping, ignoring toggle"),
            },

            RecorderCommand::StartIfIdle { audible_cue } => {
                if let Err(e) = self.start_clip(audible_cue) {
                    tracing::warn!("Auto record could not start: {}", e);
                }
            }

            RecorderCommand::Stop(reply) => {
                let result = if self.state() == RecorderState::Recording {
                    self.finish_clip().await;
                    self.outputs.notifier.notify(messages::RECORDING_SAVED);
                    Ok(())
                } else {
                    Err(CamError::RecorderInactive)
                };
                let _ = reply.send(result);
            }
        }
    }

    /// No-op unless idle
    fn start_clip(&mut self, audible_cue: bool) -> Result<(), CamError> {
        if self.state() != RecorderState::Idle {
            tracing::debug!("Recorder busy ({:?}), start ignored", self.state());
            return Ok(());
        }

        if self.stream.is_none() {
            self.stream = self.source.media_stream();
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(CamError::DeviceUnavailable);
        };

        let (chunk_tx, chunk_rx) = mpsc::channel(64);
        if let Err(e) = stream.start(chunk_tx) {
            tracing::error!("Failed to start media stream: {:#}", e);
            // Reacquire next time
            self.stream = None;
            return Err(CamError::DeviceUnavailable);
        }

        self.chunk_rx = Some(chunk_rx);
        self.clip = Some(Clip::default());
        self.set_state(RecorderState::Recording);

        if audible_cue {
            let volume = self.prefs.borrow().notification_volume;
            self.outputs.tone.play_tone(volume);
        }

        self.deadline = Some(Instant::now() + self.max_duration);
        tracing::info!("Recording started (max {:?})", self.max_duration);
        self.outputs.notifier.notify(messages::RECORDING_STARTED);
        Ok(())
    }

    /// Maximum-duration deadline reached
    async fn on_max_duration(&mut self) {
        self.deadline = None;
        if self.state() != RecorderState::Recording {
            return;
        }
        tracing::info!("Maximum clip duration reached");
        self.finish_clip().await;
        self.outputs.notifier.notify(messages::RECORDING_SAVED);
    }

    /// Flush, stop the stream, save the clip and return to idle
    async fn finish_clip(&mut self) {
        self.deadline = None;
        self.set_state(RecorderState::Stopping);

        let extension = match self.stream.as_mut() {
            Some(stream) => {
                if let Err(e) = stream.stop().await {
                    tracing::error!("Failed to stop media stream: {:#}", e);
                }
                stream.extension()
            }
            None => "bin",
        };

        let mut clip = self.clip.take().unwrap_or_default();
        if let Some(mut chunk_rx) = self.chunk_rx.take() {
            while let Ok(chunk) = chunk_rx.try_recv() {
                clip.push(chunk);
            }
        }

        if clip.is_empty() {
            tracing::warn!("Recording produced no data, nothing saved");
        } else {
            let filename = persistence::clip_filename(&chrono::Local::now(), extension);
            tracing::info!(
                "Saving clip {} ({} bytes, {} chunks)",
                filename,
                clip.len(),
                clip.chunks
            );
            if let Err(e) = self.outputs.persistence.save(&clip.bytes, &filename).await {
                tracing::error!("Failed to save clip: {:#}", e);
            }
        }

        self.set_state(RecorderState::Idle);
        tracing::info!("Recording stopped");
    }
}

async fn next_chunk(chunk_rx: &mut Option<mpsc::Receiver<Vec<u8>>>) -> Option<Vec<u8>> {
    match chunk_rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Handle for communicating with the Recorder
#[derive(Clone)]
pub struct RecorderHandle {
    tx: mpsc::Sender<RecorderCommand>,
}

impl RecorderHandle {
    pub fn new(tx: mpsc::Sender<RecorderCommand>) -> Self {
        Self { tx }
    }

    /// Manual record button
    pub async fn toggle(&self) -> Result<()> {
        self.tx
            .send(RecorderCommand::Toggle)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send toggle command: {}", e))
    }

    pub async fn start_if_idle(&self, audible_cue: bool) -> Result<()> {
        self.tx
            .send(RecorderCommand::StartIfIdle { audible_cue })
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send start command: {}", e))
    }

    /// Stop and save; fails with `CamError::RecorderInactive` when idle
    pub async fn stop(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RecorderCommand::Stop(reply))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send stop command: {}", e))?;

        rx.await
            .map_err(|e| anyhow::anyhow!("Failed to receive stop response: {}", e))??;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::feedback::TonePlayer;
    use crate::frame::Frame;
    use crate::notify::Notifier;
    use crate::persistence::Persistence;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub(crate) struct Captured {
        pub notes: Mutex<Vec<String>>,
        pub tones: Mutex<Vec<f32>>,
        pub saved: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl Captured {
        pub fn notes(&self) -> Vec<String> {
            self.notes.lock().unwrap().clone()
        }

        pub fn saved(&self) -> Vec<(String, Vec<u8>)> {
            self.saved.lock().unwrap().clone()
        }
    }

    impl Notifier for Captured {
        fn notify(&self, message: &str) {
            self.notes.lock().unwrap().push(message.to_string());
        }
    }

    impl TonePlayer for Captured {
        fn play_tone(&self, volume: f32) {
            self.tones.lock().unwrap().push(volume);
        }
    }

    #[async_trait]
    impl Persistence for Captured {
        async fn save(&self, bytes: &[u8], filename: &str) -> anyhow::Result<()> {
            self.saved
                .lock()
                .unwrap()
                .push((filename.to_string(), bytes.to_vec()));
            Ok(())
        }
    }

    pub(crate) fn outputs(captured: &Arc<Captured>) -> Outputs {
        Outputs {
            notifier: captured.clone(),
            tone: captured.clone(),
            persistence: captured.clone(),
        }
    }

    /// Emits one chunk on start and one more on stop
    pub(crate) struct FakeStream {
        starts: Arc<AtomicUsize>,
        tx: Option<mpsc::Sender<Vec<u8>>>,
    }

    #[async_trait]
    impl MediaStream for FakeStream {
        fn extension(&self) -> &'static str {
            "webm"
        }

        fn start(&mut self, chunk_tx: mpsc::Sender<Vec<u8>>) -> Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            chunk_tx.try_send(vec![1, 2, 3])?;
            self.tx = Some(chunk_tx);
            Ok(())
        }

        async fn stop(&mut self) -> Result<()> {
            if let Some(tx) = self.tx.take() {
                tx.try_send(vec![4])?;
            }
            Ok(())
        }
    }

    pub(crate) struct FakeSource {
        pub ready: bool,
        pub starts: Arc<AtomicUsize>,
    }

    impl FakeSource {
        pub fn ready() -> Self {
            Self {
                ready: true,
                starts: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn offline() -> Self {
            Self {
                ready: false,
                ..Self::ready()
            }
        }
    }

    impl FrameSource for FakeSource {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn current_frame(&self) -> Option<Frame> {
            self.ready.then(|| Frame::new(image::RgbImage::new(200, 100)))
        }

        fn media_stream(&self) -> Option<Box<dyn MediaStream>> {
            self.ready.then(|| {
                Box::new(FakeStream {
                    starts: self.starts.clone(),
                    tx: None,
                }) as Box<dyn MediaStream>
            })
        }
    }

    struct Harness {
        recorder: Recorder,
        captured: Arc<Captured>,
        starts: Arc<AtomicUsize>,
        _cmd_tx: mpsc::Sender<RecorderCommand>,
    }

    fn harness(source: FakeSource) -> Harness {
        let captured = Arc::new(Captured::default());
        let starts = source.starts.clone();
        let (cmd_tx, cmd_rx) = mpsc::channel(10);
        let (_prefs_tx, prefs_rx) = watch::channel(PlaybackPreferences {
            notification_volume: 0.5,
            ..PlaybackPreferences::default()
        });
        let recorder = Recorder::new(
            cmd_rx,
            Arc::new(source),
            prefs_rx,
            Duration::from_secs(30),
            outputs(&captured),
        );
        Harness {
            recorder,
            captured,
            starts,
            _cmd_tx: cmd_tx,
        }
    }

    #[tokio::test]
    async fn test_manual_start_is_silent() {
        let mut h = harness(FakeSource::ready());

        h.recorder.handle_command(RecorderCommand::Toggle).await;

        assert_eq!(h.recorder.state(), RecorderState::Recording);
        assert!(h.captured.tones.lock().unwrap().is_empty());
        assert_eq!(h.captured.notes(), vec![messages::RECORDING_STARTED]);
    }

    #[tokio::test]
    async fn test_start_if_idle_while_recording_is_noop() {
        let mut h = harness(FakeSource::ready());

        h.recorder
            .handle_command(RecorderCommand::StartIfIdle { audible_cue: true })
            .await;
        assert_eq!(*h.captured.tones.lock().unwrap(), vec![0.5]);

        h.recorder
            .handle_command(RecorderCommand::StartIfIdle { audible_cue: true })
            .await;

        assert_eq!(h.recorder.state(), RecorderState::Recording);
        assert_eq!(h.starts.load(Ordering::SeqCst), 1);
        assert_eq!(h.captured.tones.lock().unwrap().len(), 1);
        assert_eq!(h.captured.notes(), vec![messages::RECORDING_STARTED]);
    }

    #[tokio::test]
    async fn test_manual_stop_cancels_deadline() {
        let mut h = harness(FakeSource::ready());

        h.recorder.handle_command(RecorderCommand::Toggle).await;
        assert!(h.recorder.deadline.is_some());

        h.recorder.handle_command(RecorderCommand::Toggle).await;
        assert_eq!(h.recorder.state(), RecorderState::Idle);
        assert!(h.recorder.deadline.is_none());

        // A late timer fire changes nothing
        h.recorder.on_max_duration().await;

        assert_eq!(h.recorder.state(), RecorderState::Idle);
        assert_eq!(h.captured.saved().len(), 1);
        assert_eq!(
            h.captured.notes(),
            vec![messages::RECORDING_STARTED, messages::RECORDING_SAVED]
        );
    }

    #[tokio::test]
    async fn test_stop_flushes_buffered_chunks() {
        let mut h = harness(FakeSource::ready());

        h.recorder.handle_command(RecorderCommand::Toggle).await;
        h.recorder.handle_command(RecorderCommand::Toggle).await;

        let saved = h.captured.saved();
        let (name, bytes) = &saved[0];
        assert_eq!(bytes, &vec![1, 2, 3, 4]);
        assert!(name.starts_with("video-"));
        assert!(name.ends_with(".webm"));
    }

    #[tokio::test]
    async fn test_toggle_without_camera_notifies() {
        let mut h = harness(FakeSource::offline());

        h.recorder.handle_command(RecorderCommand::Toggle).await;
        h.recorder.handle_command(RecorderCommand::Toggle).await;

        assert_eq!(h.recorder.state(), RecorderState::Idle);
        assert_eq!(
            h.captured.notes(),
            vec![messages::CAMERA_NOT_FOUND, messages::CAMERA_NOT_FOUND]
        );
        assert!(h.captured.saved().is_empty());
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_inactive() {
        let mut h = harness(FakeSource::ready());
        let (reply, rx) = oneshot::channel();

        h.recorder.handle_command(RecorderCommand::Stop(reply)).await;

        assert_eq!(rx.await.unwrap(), Err(CamError::RecorderInactive));
        assert!(h.captured.notes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stops_at_max_duration() {
        let h = harness(FakeSource::ready());
        let captured = h.captured.clone();
        let mut state = h.recorder.subscribe();
        let handle = RecorderHandle::new(h._cmd_tx.clone());
        tokio::spawn(h.recorder.run());

        handle.toggle().await.unwrap();
        state
            .wait_for(|s| *s == RecorderState::Recording)
            .await
            .unwrap();
        let started = Instant::now();

        state.wait_for(|s| *s == RecorderState::Idle).await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(30));
        assert!(elapsed < Duration::from_secs(30) + Duration::from_millis(100));
        assert_eq!(captured.saved().len(), 1);
        assert_eq!(
            captured.notes(),
            vec![messages::RECORDING_STARTED, messages::RECORDING_SAVED]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_stop_before_deadline() {
        let h = harness(FakeSource::ready());
        let captured = h.captured.clone();
        let mut state = h.recorder.subscribe();
        let handle = RecorderHandle::new(h._cmd_tx.clone());
        tokio::spawn(h.recorder.run());

        handle.start_if_idle(false).await.unwrap();
        state
            .wait_for(|s| *s == RecorderState::Recording)
            .await
            .unwrap();
        time::sleep(Duration::from_secs(10)).await;
        handle.stop().await.unwrap();

        // Past the original deadline: nothing else fires
        time::sleep(Duration::from_secs(60)).await;

        assert_eq!(*state.borrow(), RecorderState::Idle);
        assert_eq!(captured.saved().len(), 1);
        assert_eq!(
            captured.notes(),
            vec![messages::RECORDING_STARTED, messages::RECORDING_SAVED]
        );

        let err = handle.stop().await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<CamError>(),
            Some(&CamError::RecorderInactive)
        );
    }
}
