use amiquip::{Connection, Exchange, Publish, QueueDeclareOptions};
use std::sync::Arc;
use tokio::task;

use crate::communication::messages::EmergencyRaised;
use crate::global_variables::{AMQP_URL, QUEUE_EMERGENCY_ALERTS};
use crate::monitoring::error::NotifyError;

/// Delivers an emergency alert somewhere outside the controller. May block.
pub trait NotificationAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn notify(&self, event: &EmergencyRaised) -> Result<(), NotifyError>;
}

#[derive(Debug, Default)]
pub struct LogNotifier;

impl NotificationAdapter for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    fn notify(&self, event: &EmergencyRaised) -> Result<(), NotifyError> {
        log::error!(
            "EMERGENCY RAISED at {} (confidence {:.2})",
            event.timestamp,
            event.confidence
        );
        Ok(())
    }
}

/// Publishes the alert as JSON on the emergency alerts queue.
#[derive(Debug, Clone)]
pub struct AmqpNotifier {
    url: String,
    queue: String,
}

impl AmqpNotifier {
    pub fn new(url: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            queue: queue.into(),
        }
    }
}

impl Default for AmqpNotifier {
    fn default() -> Self {
        Self::new(AMQP_URL, QUEUE_EMERGENCY_ALERTS)
    }
}

impl NotificationAdapter for AmqpNotifier {
    fn name(&self) -> &'static str {
        "amqp"
    }

    fn notify(&self, event: &EmergencyRaised) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(event)?;
        let mut connection = Connection::insecure_open(&self.url)?;
        let channel = connection.open_channel(None)?;
        let exchange = Exchange::direct(&channel);
        channel.queue_declare(self.queue.as_str(), QueueDeclareOptions::default())?;
        exchange.publish(Publish::new(payload.as_bytes(), self.queue.as_str()))?;
        log::info!("Published EmergencyRaised to '{}'", self.queue);
        connection.close()?;
        Ok(())
    }
}

/// Runs every notifier on the blocking pool. Failures are logged and counted, never returned.
pub async fn dispatch(notifiers: &[Arc<dyn NotificationAdapter>], event: &EmergencyRaised) -> usize {
    let mut failures = 0;
    for notifier in notifiers {
        let notifier = Arc::clone(notifier);
        let name = notifier.name();
        let event = event.clone();
        let result = task::spawn_blocking(move || notifier.notify(&event))
            .await
            .unwrap_or_else(|e| Err(NotifyError::Task(e.to_string())));
        if let Err(e) = result {
            log::warn!("{} notifier failed: {}", name, e);
            failures += 1;
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        received: Mutex<Vec<EmergencyRaised>>,
    }

    impl NotificationAdapter for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn notify(&self, event: &EmergencyRaised) -> Result<(), NotifyError> {
            self.received.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct Broken;

    impl NotificationAdapter for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn notify(&self, _event: &EmergencyRaised) -> Result<(), NotifyError> {
            Err(NotifyError::Task("line busy".to_string()))
        }
    }

    #[tokio::test]
    async fn failing_notifier_does_not_block_the_rest() {
        let recording = Arc::new(Recording::default());
        let notifiers: Vec<Arc<dyn NotificationAdapter>> = vec![
            Arc::new(Broken),
            recording.clone(),
            Arc::new(LogNotifier),
        ];
        let event = EmergencyRaised {
            timestamp: 1,
            confidence: 0.97,
            frame: Some(12),
        };

        let failures = dispatch(&notifiers, &event).await;

        assert_eq!(failures, 1);
        assert_eq!(recording.received.lock().unwrap().as_slice(), &[event]);
    }
}
