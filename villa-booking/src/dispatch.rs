use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use villa_core::notify::{Notification, Notifier};
use villa_shared::Masked;

/// How the dispatcher waits on the mail provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// Hand the email to a detached task and return immediately.
    Background,
    /// Await delivery, giving up after `timeout`.
    Inline { timeout: Duration },
}

/// Best-effort email delivery. Never fails its caller: errors and timeouts
/// are logged and dropped, with no retry.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    policy: DispatchPolicy,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, policy: DispatchPolicy) -> Self {
        Self { notifier, policy }
    }

    pub async fn dispatch(&self, notification: Notification) {
        match self.policy {
            DispatchPolicy::Background => {
                let notifier = Arc::clone(&self.notifier);
                tokio::spawn(async move {
                    deliver(notifier.as_ref(), &notification).await;
                });
            }
            DispatchPolicy::Inline { timeout } => {
                if tokio::time::timeout(timeout, deliver(self.notifier.as_ref(), &notification))
                    .await
                    .is_err()
                {
                    warn!(
                        kind = notification.kind(),
                        to = %Masked(notification.recipient()),
                        timeout_ms = timeout.as_millis() as u64,
                        "Notification timed out"
                    );
                }
            }
        }
    }
}

async fn deliver(notifier: &dyn Notifier, notification: &Notification) {
    match notifier.send(notification).await {
        Ok(()) => debug!(kind = notification.kind(), "Notification delivered"),
        Err(e) => warn!(
            kind = notification.kind(),
            to = %Masked(notification.recipient()),
            error = %e,
            "Notification failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingNotifier;

    fn code_email() -> Notification {
        Notification::CancellationCode {
            to: "guest@example.com".to_string(),
            code: 111222,
            ttl_seconds: 30,
        }
    }

    #[tokio::test]
    async fn test_inline_delivers_before_returning() {
        let recorder = Arc::new(RecordingNotifier::new());
        let dispatcher = NotificationDispatcher::new(
            recorder.clone(),
            DispatchPolicy::Inline { timeout: Duration::from_secs(1) },
        );

        dispatcher.dispatch(code_email()).await;
        assert_eq!(recorder.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let recorder = Arc::new(RecordingNotifier::failing());
        let dispatcher = NotificationDispatcher::new(
            recorder.clone(),
            DispatchPolicy::Inline { timeout: Duration::from_secs(1) },
        );

        dispatcher.dispatch(code_email()).await;
        assert!(recorder.sent().is_empty());
        assert_eq!(recorder.attempts(), 1);
    }

    #[tokio::test]
    async fn test_inline_timeout_does_not_block() {
        let recorder = Arc::new(RecordingNotifier::with_delay(Duration::from_secs(5)));
        let dispatcher = NotificationDispatcher::new(
            recorder.clone(),
            DispatchPolicy::Inline { timeout: Duration::from_millis(20) },
        );

        let started = std::time::Instant::now();
        dispatcher.dispatch(code_email()).await;
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(recorder.sent().is_empty());
    }

    #[tokio::test]
    async fn test_background_returns_immediately() {
        let recorder = Arc::new(RecordingNotifier::with_delay(Duration::from_millis(50)));
        let dispatcher = NotificationDispatcher::new(recorder.clone(), DispatchPolicy::Background);

        dispatcher.dispatch(code_email()).await;
        assert!(recorder.sent().is_empty());

        for _ in 0..100 {
            if !recorder.sent().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(recorder.sent().len(), 1);
    }
}
