//! Background update sync engine.
//!
//! One dedicated thread long-polls the provider, advances a monotonic
//! offset, deduplicates against the store's ledger, normalizes events into
//! chat/message writes, and reports new activity and connectivity flips on
//! the notification bus.
//!
//! The loop is the only place the offset lives; it starts at 0 each
//! session and the ledger covers cross-restart dedup within its window.
//! The offset advances past every event id seen — including events the
//! provider could not interpret — so a malformed event can never stall the
//! stream. The ledger check is what prevents double-application.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::bus::{Notification, NotificationBus};
use crate::config::CoreConfig;
use crate::models::{Direction, MessageDraft};
use crate::provider::{EventPayload, MessagingProvider, RemoteEvent};
use crate::store::Store;

pub struct SyncEngine {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SyncEngine {
    /// Spawn the poll loop. It runs until `stop()`.
    pub fn start(
        provider: Arc<dyn MessagingProvider>,
        store: Arc<Store>,
        bus: NotificationBus,
        config: &CoreConfig,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let worker = PollWorker {
            provider,
            store,
            bus,
            running: running.clone(),
            poll_wait: config.poll_wait,
            poll_interval: config.poll_interval,
        };
        let handle = std::thread::spawn(move || worker.run());
        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Cooperative stop: the flag is checked at iteration boundaries, so a
    /// request already in flight completes or times out on its own. Joins
    /// the worker thread; once this returns, no further store writes can
    /// occur.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("sync worker panicked");
            }
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

struct PollWorker {
    provider: Arc<dyn MessagingProvider>,
    store: Arc<Store>,
    bus: NotificationBus,
    running: Arc<AtomicBool>,
    poll_wait: std::time::Duration,
    poll_interval: std::time::Duration,
}

impl PollWorker {
    fn run(self) {
        tracing::info!("sync engine started");
        let mut offset: i64 = 0;
        // Edge-triggered: notify only when the connectivity state flips.
        let mut connected: Option<bool> = None;

        while self.running.load(Ordering::Relaxed) {
            match self.provider.fetch_events(offset + 1, self.poll_wait) {
                Ok(mut events) => {
                    self.set_connected(&mut connected, true);
                    events.sort_by_key(|event| event.event_id);
                    for event in events {
                        offset = offset.max(event.event_id);
                        if self.store.is_event_processed(event.event_id) {
                            continue;
                        }
                        let event_id = event.event_id;
                        self.apply_event(event);
                        self.store.mark_event_processed(event_id);
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, "poll failed");
                    self.set_connected(&mut connected, false);
                }
            }

            if !self.running.load(Ordering::Relaxed) {
                break;
            }
            std::thread::sleep(self.poll_interval);
        }
        tracing::info!("sync engine stopped");
    }

    fn set_connected(&self, current: &mut Option<bool>, connected: bool) {
        if *current != Some(connected) {
            *current = Some(connected);
            self.bus
                .emit(Notification::ConnectivityChanged { connected });
        }
    }

    /// Normalize one event into store writes. Events without an
    /// interpretable detail are skipped here; the caller still advances the
    /// offset and marks them processed.
    fn apply_event(&self, event: RemoteEvent) {
        let Some(detail) = event.detail else {
            tracing::debug!(event_id = event.event_id, "skipping uninterpretable event");
            return;
        };
        let mut chat = detail.chat;
        if chat.id.is_empty() {
            tracing::debug!(event_id = event.event_id, "skipping event with empty chat id");
            return;
        }
        let chat_id = chat.id.clone();
        chat.last_activity = chrono::Utc::now().timestamp_millis();
        self.store.upsert_chat(chat);

        let draft = match detail.payload {
            EventPayload::Text { text } => MessageDraft::text(Direction::Inbound, text),
            EventPayload::Photo { file_id, caption } => {
                // Secondary synchronous fetch. On failure the message is
                // still recorded with placeholder text and no attachment —
                // never dropped.
                let bytes = self
                    .provider
                    .resolve_file(&file_id)
                    .and_then(|path| self.provider.download(&path));
                let bytes = match bytes {
                    Ok(bytes) => Some(bytes),
                    Err(err) => {
                        tracing::warn!(%err, chat_id, "photo fetch failed, storing placeholder");
                        None
                    }
                };
                MessageDraft::photo(Direction::Inbound, caption, bytes)
            }
            EventPayload::Document { file_name } => {
                MessageDraft::document(Direction::Inbound, file_name)
            }
        };

        self.store.append_message(&chat_id, draft);
        self.bus.emit(Notification::NewMessage { chat_id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageKind;
    use crate::provider::mock::{photo_event, text_event, unsupported_event, MockProvider};
    use crate::provider::ProviderError;
    use crate::store::PHOTO_PLACEHOLDER;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn test_config(dir: &std::path::Path) -> CoreConfig {
        let mut config = CoreConfig::new(dir);
        config.poll_wait = Duration::from_millis(1);
        config.poll_interval = Duration::from_millis(1);
        config
    }

    /// Spin until `cond` holds or two seconds pass.
    fn wait_for(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not met in time");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn start_engine(
        provider: &Arc<MockProvider>,
        store: &Arc<Store>,
        bus: NotificationBus,
        config: &CoreConfig,
    ) -> SyncEngine {
        SyncEngine::start(
            provider.clone() as Arc<dyn MessagingProvider>,
            store.clone(),
            bus,
            config,
        )
    }

    #[test]
    fn test_out_of_order_batch_stores_all_and_offset_is_max() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let store = Arc::new(Store::open(&config.data_dir, config.message_cap).unwrap());
        let provider = Arc::new(MockProvider::new());
        provider.push_batch(Ok(vec![
            text_event(5, "7", "hi"),
            text_event(3, "7", "yo"),
        ]));

        let mut engine = start_engine(&provider, &store, NotificationBus::new(), &config);
        wait_for(|| store.get_messages("7").len() == 2);
        // Next poll asks past the max id seen.
        wait_for(|| provider.offsets.lock().last() == Some(&6));
        engine.stop();

        let messages = store.get_messages("7");
        // Ascending event-id order: 3 before 5.
        assert_eq!(messages[0].text, "yo");
        assert_eq!(messages[1].text, "hi");
        assert!(store.is_event_processed(3));
        assert!(store.is_event_processed(5));
    }

    #[test]
    fn test_same_event_delivered_twice_is_applied_once() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let store = Arc::new(Store::open(&config.data_dir, config.message_cap).unwrap());
        let provider = Arc::new(MockProvider::new());
        provider.push_batch(Ok(vec![text_event(5, "7", "hi")]));
        provider.push_batch(Ok(vec![text_event(5, "7", "hi")]));

        let mut engine = start_engine(&provider, &store, NotificationBus::new(), &config);
        wait_for(|| provider.offsets.lock().len() >= 3);
        engine.stop();

        assert_eq!(store.get_messages("7").len(), 1);
    }

    #[test]
    fn test_uninterpretable_event_advances_offset_without_a_message() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let store = Arc::new(Store::open(&config.data_dir, config.message_cap).unwrap());
        let provider = Arc::new(MockProvider::new());
        provider.push_batch(Ok(vec![unsupported_event(8)]));

        let mut engine = start_engine(&provider, &store, NotificationBus::new(), &config);
        wait_for(|| provider.offsets.lock().last() == Some(&9));
        engine.stop();

        assert!(store.list_chats().is_empty());
        assert!(store.is_event_processed(8));
    }

    #[test]
    fn test_photo_event_downloads_and_references_blob() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let store = Arc::new(Store::open(&config.data_dir, config.message_cap).unwrap());
        let provider = Arc::new(MockProvider::new());
        provider.serve_file("f1", b"image".to_vec());
        provider.push_batch(Ok(vec![photo_event(1, "7", "f1")]));

        let mut engine = start_engine(&provider, &store, NotificationBus::new(), &config);
        wait_for(|| store.get_messages("7").len() == 1);
        engine.stop();

        let messages = store.get_messages("7");
        assert_eq!(messages[0].kind, MessageKind::Photo);
        let blob_id = messages[0].attachment.clone().expect("blob reference");
        assert_eq!(store.attachments().load(&blob_id).unwrap(), b"image");
    }

    #[test]
    fn test_photo_fetch_failure_keeps_placeholder_message() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let store = Arc::new(Store::open(&config.data_dir, config.message_cap).unwrap());
        let provider = Arc::new(MockProvider::new());
        provider
            .fail_downloads
            .store(true, std::sync::atomic::Ordering::Relaxed);
        provider.push_batch(Ok(vec![photo_event(1, "7", "f1")]));

        let mut engine = start_engine(&provider, &store, NotificationBus::new(), &config);
        wait_for(|| store.get_messages("7").len() == 1);
        engine.stop();

        let messages = store.get_messages("7");
        assert_eq!(messages[0].text, PHOTO_PLACEHOLDER);
        assert!(messages[0].attachment.is_none());
    }

    #[test]
    fn test_connectivity_notifications_are_edge_triggered() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let store = Arc::new(Store::open(&config.data_dir, config.message_cap).unwrap());
        let provider = Arc::new(MockProvider::new());
        provider.push_batch(Err(ProviderError::Unavailable("down".to_string())));
        provider.push_batch(Err(ProviderError::Unavailable("down".to_string())));
        // Drained queue means successful empty batches afterwards.

        let bus = NotificationBus::new();
        let rx = bus.subscribe();
        let mut engine = start_engine(&provider, &store, bus, &config);
        wait_for(|| provider.offsets.lock().len() >= 4);
        engine.stop();

        let flips: Vec<Notification> = rx.try_iter().collect();
        assert_eq!(
            flips,
            vec![
                Notification::ConnectivityChanged { connected: false },
                Notification::ConnectivityChanged { connected: true },
            ]
        );
    }

    #[test]
    fn test_new_message_notification_names_the_chat() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let store = Arc::new(Store::open(&config.data_dir, config.message_cap).unwrap());
        let provider = Arc::new(MockProvider::new());
        provider.push_batch(Ok(vec![text_event(1, "7", "hi")]));

        let bus = NotificationBus::new();
        let rx = bus.subscribe();
        let mut engine = start_engine(&provider, &store, bus, &config);
        wait_for(|| store.get_messages("7").len() == 1);
        engine.stop();

        let got_new_message = rx.try_iter().any(|n| {
            n == Notification::NewMessage {
                chat_id: "7".to_string(),
            }
        });
        assert!(got_new_message);
    }

    #[test]
    fn test_stop_joins_the_worker() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let store = Arc::new(Store::open(&config.data_dir, config.message_cap).unwrap());
        let provider = Arc::new(MockProvider::new());

        let mut engine = start_engine(&provider, &store, NotificationBus::new(), &config);
        wait_for(|| !provider.offsets.lock().is_empty());
        engine.stop();
        assert!(engine.handle.is_none());

        // No polls happen after stop returned.
        let polls = provider.offsets.lock().len();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(provider.offsets.lock().len(), polls);
    }
}
