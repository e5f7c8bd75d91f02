//! Notification delivery.
//!
//! The engine only sees the [`Notifier`] capability. Delivery failures are
//! returned to the caller, which logs them and moves on.

mod email;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::NotifyError;

pub use email::EmailNotifier;

/// Sends a short human-readable message to the operator.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}

/// Writes notifications to the log only.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        log::info!("[notify] {message}");
        Ok(())
    }
}

/// Records every message in memory.
///
/// Clones share the same buffer, so a test can keep one handle and give
/// another to the engine.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    messages: Arc<Mutex<Vec<String>>>,
    failing: bool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier that records and then reports a delivery failure.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
        if self.failing {
            return Err(NotifyError::Delivery("memory notifier set to fail".into()));
        }
        Ok(())
    }
}
