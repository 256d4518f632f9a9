//! Test doubles shared by this crate's tests and the HTTP tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use villa_core::notify::{Notification, Notifier};

/// Notifier that keeps every delivered email in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    attempts: AtomicUsize,
    fail: bool,
    delay: Option<Duration>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send returns an error.
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    /// Every send sleeps for `delay` first.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Most recent one-time code sent to `to`, if any.
    pub fn last_code_for(&self, to: &str) -> Option<u32> {
        self.sent().into_iter().rev().find_map(|n| match n {
            Notification::CancellationCode { to: addr, code, .. }
            | Notification::RegistrationCode { to: addr, code, .. }
                if addr == to =>
            {
                Some(code)
            }
            _ => None,
        })
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        notification: &Notification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err("mail provider unavailable".into());
        }
        self.sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(notification.clone());
        Ok(())
    }
}
