pub mod still;

pub use still::StillFrameSource;

use crate::error::CamError;
use anyhow::Result;
use async_trait::async_trait;
use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One decoded camera image, cheap to clone
#[derive(Debug, Clone)]
pub struct Frame {
    image: Arc<RgbImage>,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn to_png(&self) -> Result<Vec<u8>, CamError> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| CamError::Encode(e.to_string()))?;
        Ok(bytes)
    }

    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>, CamError> {
        let mut bytes = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, quality)
            .encode_image(self.image.as_ref())
            .map_err(|e| CamError::Encode(e.to_string()))?;
        Ok(bytes)
    }
}

/// Live camera feed
pub trait FrameSource: Send + Sync {
    /// A decoded frame is available
    fn is_ready(&self) -> bool;

    /// Current frame, `None` until the feed is ready
    fn current_frame(&self) -> Option<Frame>;

    /// Current frame as PNG bytes
    fn screenshot(&self) -> Result<Vec<u8>, CamError> {
        self.current_frame()
            .ok_or(CamError::DeviceUnavailable)?
            .to_png()
    }

    /// Raw stream for recording, `None` when it cannot be obtained
    fn media_stream(&self) -> Option<Box<dyn MediaStream>>;
}

/// Encoded media stream feeding the recorder
///
/// While started, encoded data is pushed on the channel handed to `start`.
/// `stop` must flush anything buffered before it returns and drop the sender.
#[async_trait]
pub trait MediaStream: Send {
    /// File extension for clips produced by this stream
    fn extension(&self) -> &'static str;

    fn start(&mut self, chunk_tx: mpsc::Sender<Vec<u8>>) -> Result<()>;

    async fn stop(&mut self) -> Result<()>;
}
