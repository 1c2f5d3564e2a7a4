use crate::detection::Detection;

/// Whether the latest cycle should kick off an automatic recording
pub fn should_start_recording(detections: &[Detection], auto_record_enabled: bool) -> bool {
    auto_record_enabled && detections.iter().any(Detection::is_person)
}
