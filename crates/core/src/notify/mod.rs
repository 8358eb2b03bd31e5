//! User-facing notifications.
//!
//! Notifications are best-effort: implementations log delivery problems and
//! never fail the caller.

mod log_notifier;
mod types;

pub use log_notifier::LogNotifier;
pub use types::{Notification, Notifier, PinningState, Progress};
