//! # pingwatch-cli
//!
//! Host-side pieces of the `pingwatch` binary: layered settings, the
//! single-instance lock, webhook alert delivery and console output.

pub mod console;
pub mod lock;
pub mod notify;
pub mod settings;

pub use lock::{InstanceLock, LockError};
pub use notify::WebhookNotifier;
pub use settings::{Overrides, ProbeKind, Settings};
