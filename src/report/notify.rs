use log::info;

/// Receives user-facing completion messages
pub trait Notifier: Send + Sync {
    /// Deliver a message. Must not block.
    fn notify(&self, message: &str);
}

/// Writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        info!("{}", message);
    }
}
