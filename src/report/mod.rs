//! Progress and notification sinks
//!
//! The transfer engine never talks to a terminal directly. It reports
//! through two small traits:
//!
//! - [`ProgressReporter`] hands out [`TaskProgress`] handles, one per unit of
//!   work (a volume pass, a single copy, a comparison).
//! - [`Notifier`] receives one-line, user-facing messages such as
//!   "Finished downloading files from 'E:'".
//!
//! Both are fire-and-forget: implementations must not block.

mod notify;
mod progress;

pub use notify::{LogNotifier, Notifier};
pub use progress::{LogProgress, ProgressReporter, TaskGuard, TaskProgress};
