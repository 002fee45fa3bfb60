//! Scripted in-memory provider for engine and dispatcher tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::{
    EventDetail, EventPayload, MessagingProvider, ProviderError, RemoteEvent, UploadKind,
};
use crate::models::Chat;

#[derive(Default)]
pub struct MockProvider {
    /// Outcomes returned by successive `fetch_events` calls. Once drained,
    /// every further call returns an empty batch (a long poll that timed
    /// out without news).
    batches: Mutex<VecDeque<Result<Vec<RemoteEvent>, ProviderError>>>,
    /// Offsets requested by the engine, in call order.
    pub offsets: Mutex<Vec<i64>>,
    /// file_id -> bytes served by `resolve_file` + `download`.
    pub files: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_downloads: AtomicBool,
    pub fail_sends: AtomicBool,
    pub sent_texts: Mutex<Vec<(String, String)>>,
    pub sent_files: Mutex<Vec<(String, String, UploadKind)>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_batch(&self, batch: Result<Vec<RemoteEvent>, ProviderError>) {
        self.batches.lock().push_back(batch);
    }

    pub fn serve_file(&self, file_id: &str, bytes: Vec<u8>) {
        self.files.lock().insert(file_id.to_string(), bytes);
    }
}

pub fn text_event(event_id: i64, chat_id: &str, text: &str) -> RemoteEvent {
    RemoteEvent {
        event_id,
        detail: Some(EventDetail {
            chat: Chat::new(chat_id),
            payload: EventPayload::Text {
                text: text.to_string(),
            },
        }),
    }
}

pub fn photo_event(event_id: i64, chat_id: &str, file_id: &str) -> RemoteEvent {
    RemoteEvent {
        event_id,
        detail: Some(EventDetail {
            chat: Chat::new(chat_id),
            payload: EventPayload::Photo {
                file_id: file_id.to_string(),
                caption: None,
            },
        }),
    }
}

pub fn unsupported_event(event_id: i64) -> RemoteEvent {
    RemoteEvent {
        event_id,
        detail: None,
    }
}

impl MessagingProvider for MockProvider {
    fn fetch_events(&self, offset: i64, _wait: Duration) -> Result<Vec<RemoteEvent>, ProviderError> {
        self.offsets.lock().push(offset);
        self.batches.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn resolve_file(&self, file_id: &str) -> Result<String, ProviderError> {
        if self.fail_downloads.load(Ordering::Relaxed) {
            return Err(ProviderError::Unavailable("resolve failed".to_string()));
        }
        Ok(format!("files/{}", file_id))
    }

    fn download(&self, remote_path: &str) -> Result<Vec<u8>, ProviderError> {
        if self.fail_downloads.load(Ordering::Relaxed) {
            return Err(ProviderError::Unavailable("download failed".to_string()));
        }
        let file_id = remote_path.trim_start_matches("files/");
        self.files
            .lock()
            .get(file_id)
            .cloned()
            .ok_or_else(|| ProviderError::Unavailable("unknown file".to_string()))
    }

    fn send_text(&self, chat_id: &str, text: &str) -> Result<(), ProviderError> {
        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(ProviderError::Unavailable("chat not found".to_string()));
        }
        self.sent_texts
            .lock()
            .push((chat_id.to_string(), text.to_string()));
        Ok(())
    }

    fn send_file(
        &self,
        chat_id: &str,
        file_name: &str,
        _bytes: Vec<u8>,
        kind: UploadKind,
    ) -> Result<(), ProviderError> {
        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(ProviderError::Unavailable("chat not found".to_string()));
        }
        self.sent_files
            .lock()
            .push((chat_id.to_string(), file_name.to_string(), kind));
        Ok(())
    }
}
