use super::{Frame, FrameSource, MediaStream};
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const MJPEG_QUALITY: u8 = 80;

struct Playback {
    frames: Vec<Frame>,
    period: Duration,
    started: Instant,
}

impl Playback {
    fn current(&self) -> Option<Frame> {
        if self.frames.is_empty() {
            return None;
        }
        let ticks = self.started.elapsed().as_millis() / self.period.as_millis();
        Some(self.frames[(ticks % self.frames.len() as u128) as usize].clone())
    }
}

/// Camera stand-in that plays a directory of still images on a loop
///
/// Images are decoded once at startup in file-name order. Files that fail to
/// decode are skipped; with no decodable image the source never becomes ready.
#[derive(Clone)]
pub struct StillFrameSource {
    playback: Arc<Playback>,
}

impl StillFrameSource {
    pub fn open(dir: &Path, frame_rate: u32) -> Self {
        let mut paths: Vec<_> = match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect(),
            Err(e) => {
                tracing::warn!("Cannot read frames directory {:?}: {}", dir, e);
                Vec::new()
            }
        };
        paths.sort();

        let frames: Vec<Frame> = paths
            .iter()
            .filter_map(|path| match image::open(path) {
                Ok(img) => Some(Frame::new(img.to_rgb8())),
                Err(e) => {
                    tracing::debug!("Skipping {:?}: {}", path, e);
                    None
                }
            })
            .collect();

        tracing::info!("Camera: {} frames from {:?}", frames.len(), dir);
        Self::from_frames(frames, frame_rate)
    }

    pub fn from_frames(frames: Vec<Frame>, frame_rate: u32) -> Self {
        let period = Duration::from_millis((1000 / u64::from(frame_rate.max(1))).max(1));
        Self {
            playback: Arc::new(Playback {
                frames,
                period,
                started: Instant::now(),
            }),
        }
    }
}

impl FrameSource for StillFrameSource {
    fn is_ready(&self) -> bool {
        !self.playback.frames.is_empty()
    }

    fn current_frame(&self) -> Option<Frame> {
        self.playback.current()
    }

    fn media_stream(&self) -> Option<Box<dyn MediaStream>> {
        if !self.is_ready() {
            return None;
        }
        Some(Box::new(MjpegStream {
            playback: self.playback.clone(),
            task: None,
        }))
    }
}

/// Emits one JPEG per frame period while started
pub struct MjpegStream {
    playback: Arc<Playback>,
    task: Option<JoinHandle<()>>,
}

impl MjpegStream {
    async fn pump(playback: Arc<Playback>, tx: mpsc::Sender<Vec<u8>>) {
        let mut ticker = tokio::time::interval(playback.period);
        loop {
            ticker.tick().await;
            let Some(frame) = playback.current() else {
                continue;
            };
            match frame.to_jpeg(MJPEG_QUALITY) {
                Ok(jpeg) => {
                    if tx.send(jpeg).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!("Dropping clip frame: {}", e),
            }
        }
    }
}

#[async_trait]
impl MediaStream for MjpegStream {
    fn extension(&self) -> &'static str {
        "mjpeg"
    }

    fn start(&mut self, chunk_tx: mpsc::Sender<Vec<u8>>) -> Result<()> {
        if self.task.is_some() {
            anyhow::bail!("MJPEG stream already started");
        }
        self.task = Some(tokio::spawn(Self::pump(self.playback.clone(), chunk_tx)));
        tracing::debug!("MJPEG stream started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
            // Wait for the sender to drop so the recorder can drain everything
            let _ = task.await;
        }
        tracing::debug!("MJPEG stream stopped");
        Ok(())
    }
}

impl Drop for MjpegStream {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
