/// Short-lived status messages for the user
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Surfaces notifications as log events on the `notify` target
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::info!(target: "notify", "{}", message);
    }
}
