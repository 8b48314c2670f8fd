//! Alert emission: persist each burst alert, then notify about it.

use std::sync::Arc;

use super::Notifier;
use crate::models::{BurstAlert, StoredAlert};
use crate::persistence::AlertStore;

/// Tally of one emission pass
#[derive(Debug, Default)]
pub struct EmitOutcome {
    pub stored: Vec<StoredAlert>,
    pub persist_failures: usize,
    pub notify_failures: usize,
}

/// Hands burst alerts to the alert store and the notifier
///
/// Each alert is handled on its own: a store or notifier failure for one
/// address is logged and the remaining alerts are still emitted.
#[derive(Clone)]
pub struct AlertEmitter {
    store: Arc<dyn AlertStore>,
    notifier: Arc<dyn Notifier>,
    default_recipient: Option<String>,
}

impl AlertEmitter {
    pub fn new(
        store: Arc<dyn AlertStore>,
        notifier: Arc<dyn Notifier>,
        default_recipient: Option<String>,
    ) -> Self {
        AlertEmitter {
            store,
            notifier,
            default_recipient,
        }
    }

    /// Emit every alert; `recipient` overrides the configured default
    pub fn emit(&self, alerts: &[BurstAlert], recipient: Option<&str>) -> EmitOutcome {
        let recipient = recipient.or(self.default_recipient.as_deref());
        let mut outcome = EmitOutcome::default();

        for alert in alerts {
            match self.store.create(alert) {
                Ok(stored) => outcome.stored.push(stored),
                Err(e) => {
                    log::warn!("Failed to persist alert for {}: {}", alert.source_address, e);
                    outcome.persist_failures += 1;
                }
            }

            let Some(recipient) = recipient else {
                log::debug!("No recipient for alert on {}, skipping notification", alert.source_address);
                continue;
            };

            if let Err(e) = self.notifier.notify(recipient, &alert.subject(), &alert.body()) {
                log::warn!("Failed to notify about {}: {}", alert.source_address, e);
                outcome.notify_failures += 1;
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::AlertError;
    use crate::persistence::{AlertQuery, PersistenceError, SqliteAlertStore};
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String, String)>>,
        fail_for: Option<String>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), AlertError> {
            if self.fail_for.as_deref().map_or(false, |ip| subject.contains(ip)) {
                return Err(AlertError::ChannelClosed);
            }
            self.sent
                .lock()
                .unwrap()
                .push((recipient.to_string(), subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    /// Store that rejects one address and keeps the rest
    struct FlakyStore {
        inner: SqliteAlertStore,
        reject: String,
    }

    impl AlertStore for FlakyStore {
        fn create(&self, alert: &BurstAlert) -> Result<StoredAlert, PersistenceError> {
            if alert.source_address == self.reject {
                return Err(PersistenceError::InvalidData("rejected".to_string()));
            }
            self.inner.create(alert)
        }

        fn query(&self, query: &AlertQuery) -> Result<Vec<StoredAlert>, PersistenceError> {
            self.inner.query(query)
        }

        fn clear_all(&self) -> Result<(), PersistenceError> {
            self.inner.clear_all()
        }
    }

    fn alert(address: &str) -> BurstAlert {
        BurstAlert {
            source_address: address.to_string(),
            attempt_count: 5,
            window_seconds: 40.0,
            detected_at: Utc::now(),
        }
    }

    #[test]
    fn test_persists_and_notifies() {
        let store = Arc::new(SqliteAlertStore::in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let emitter = AlertEmitter::new(store.clone(), notifier.clone(), None);

        let outcome = emitter.emit(&[alert("10.0.0.1")], Some("ops@example.com"));

        assert_eq!(outcome.stored.len(), 1);
        assert_eq!(store.query(&AlertQuery::all()).unwrap().len(), 1);

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "ops@example.com");
        assert_eq!(sent[0].1, "Suspicious IP: 10.0.0.1");
        assert_eq!(sent[0].2, "IP: 10.0.0.1\nAttempts: 5\nWindow: 40.00s");
    }

    #[test]
    fn test_default_recipient_used() {
        let store = Arc::new(SqliteAlertStore::in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let emitter = AlertEmitter::new(store, notifier.clone(), Some("default@example.com".to_string()));

        emitter.emit(&[alert("10.0.0.1")], None);
        assert_eq!(notifier.sent.lock().unwrap()[0].0, "default@example.com");

        emitter.emit(&[alert("10.0.0.2")], Some("override@example.com"));
        assert_eq!(notifier.sent.lock().unwrap()[1].0, "override@example.com");
    }

    #[test]
    fn test_no_recipient_skips_notification() {
        let store = Arc::new(SqliteAlertStore::in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let emitter = AlertEmitter::new(store, notifier.clone(), None);

        let outcome = emitter.emit(&[alert("10.0.0.1")], None);
        assert_eq!(outcome.stored.len(), 1);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_persist_failure_isolated() {
        let store = Arc::new(FlakyStore {
            inner: SqliteAlertStore::in_memory().unwrap(),
            reject: "10.0.0.1".to_string(),
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let emitter = AlertEmitter::new(store.clone(), notifier.clone(), None);

        let outcome = emitter.emit(&[alert("10.0.0.1"), alert("10.0.0.2")], Some("ops"));

        assert_eq!(outcome.persist_failures, 1);
        assert_eq!(outcome.stored.len(), 1);
        assert_eq!(outcome.stored[0].alert.source_address, "10.0.0.2");
        // Notification still goes out for the alert that failed to persist
        assert_eq!(notifier.sent.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_notify_failure_isolated() {
        let store = Arc::new(SqliteAlertStore::in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier {
            fail_for: Some("10.0.0.1".to_string()),
            ..RecordingNotifier::default()
        });
        let emitter = AlertEmitter::new(store, notifier.clone(), None);

        let outcome = emitter.emit(
            &[alert("10.0.0.1"), alert("10.0.0.2"), alert("10.0.0.3")],
            Some("ops"),
        );

        assert_eq!(outcome.notify_failures, 1);
        assert_eq!(outcome.stored.len(), 3);
        assert_eq!(notifier.sent.lock().unwrap().len(), 2);
    }
}
