pub mod detection_loop;
pub mod recorder;

pub use detection_loop::{DetectionLoop, LoopInputs};
pub use recorder::{Recorder, RecorderHandle};

use crate::feedback::TonePlayer;
use crate::notify::Notifier;
use crate::persistence::Persistence;
use std::sync::Arc;

/// User-facing side effects shared by the services
#[derive(Clone)]
pub struct Outputs {
    pub notifier: Arc<dyn Notifier>,
    pub tone: Arc<dyn TonePlayer>,
    pub persistence: Arc<dyn Persistence>,
}
