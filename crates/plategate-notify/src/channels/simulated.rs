//! In-process channel for development and tests.

use std::sync::{Arc, Mutex, PoisonError};

use super::Channel;
use crate::error::{NotifyError, Result};
use crate::event::Notification;

#[derive(Debug, Default)]
struct SimulatedState {
    failure: Option<String>,
    attempts: usize,
    delivered: Vec<Notification>,
}

/// Channel that records what it receives. Clones share state.
#[derive(Debug, Clone)]
pub struct SimulatedChannel {
    name: &'static str,
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedChannel {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Arc::default(),
        }
    }

    /// Reject every following delivery with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        self.lock().failure = Some(message.into());
    }

    pub fn recover(&self) {
        self.lock().failure = None;
    }

    pub fn delivered(&self) -> Vec<Notification> {
        self.lock().delivered.clone()
    }

    pub fn delivery_count(&self) -> usize {
        self.lock().delivered.len()
    }

    /// Deliveries attempted, failed ones included.
    pub fn attempt_count(&self) -> usize {
        self.lock().attempts
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Channel for SimulatedChannel {
    fn name(&self) -> &str {
        self.name
    }

    async fn send(&self, notification: &Notification) -> Result<()> {
        let mut state = self.lock();
        state.attempts += 1;
        if let Some(message) = &state.failure {
            return Err(NotifyError::delivery(self.name, message.clone()));
        }
        state.delivered.push(notification.clone());
        Ok(())
    }
}
