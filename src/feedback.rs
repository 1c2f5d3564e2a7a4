use rodio::source::{SineWave, Source};
use rodio::{OutputStreamBuilder, Sink};
use std::time::Duration;

/// Short audible cue
pub trait TonePlayer: Send + Sync {
    /// Fire-and-forget; `volume` is in [0, 1]
    fn play_tone(&self, volume: f32);
}

/// Sine beep on the default output device
pub struct RodioTone {
    frequency_hz: f32,
    duration: Duration,
}

impl RodioTone {
    pub fn new(frequency_hz: f32, duration: Duration) -> Self {
        Self {
            frequency_hz,
            duration,
        }
    }
}

impl TonePlayer for RodioTone {
    fn play_tone(&self, volume: f32) {
        let frequency_hz = self.frequency_hz;
        let duration = self.duration;
        let volume = volume.clamp(0.0, 1.0);

        tokio::task::spawn_blocking(move || {
            if let Err(e) = play_tone_blocking(frequency_hz, duration, volume) {
                tracing::warn!("Failed to play tone: {}", e);
            }
        });
    }
}

fn play_tone_blocking(
    frequency_hz: f32,
    duration: Duration,
    volume: f32,
) -> Result<(), Box<dyn std::error::Error>> {
    let stream_handle = OutputStreamBuilder::open_default_stream()?;
    let sink = Sink::connect_new(stream_handle.mixer());
    sink.append(
        SineWave::new(frequency_hz)
            .take_duration(duration)
            .amplify(volume),
    );
    sink.sleep_until_end();

    Ok(())
}
