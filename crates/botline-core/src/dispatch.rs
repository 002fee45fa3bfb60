//! Outgoing send path.
//!
//! Remote call first, local mirror second: a message is written to the
//! store only after the provider confirms the send, so a failed send
//! leaves no local row and a retried send can never produce duplicates.
//! The core does not retry; the caller owns retry policy.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::bus::{Notification, NotificationBus};
use crate::models::{Chat, Direction, Message, MessageDraft};
use crate::provider::{MessagingProvider, UploadKind};
use crate::store::Store;

/// A send the provider rejected or never received. Carries the
/// human-readable reason for the caller's retry affordance.
#[derive(Debug, Clone, Error)]
#[error("send failed: {reason}")]
pub struct SendError {
    pub reason: String,
}

impl SendError {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

const PHOTO_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Clone)]
pub struct Dispatcher {
    provider: Arc<dyn MessagingProvider>,
    store: Arc<Store>,
    bus: NotificationBus,
}

impl Dispatcher {
    pub fn new(
        provider: Arc<dyn MessagingProvider>,
        store: Arc<Store>,
        bus: NotificationBus,
    ) -> Self {
        Self {
            provider,
            store,
            bus,
        }
    }

    /// Send a text message and, on confirmation, mirror it into the store
    /// as an outbound message.
    pub fn send_text(&self, chat_id: &str, text: &str) -> Result<Message, SendError> {
        self.provider
            .send_text(chat_id, text)
            .map_err(|err| SendError::new(err.to_string()))?;

        let message = self
            .store
            .append_message(chat_id, MessageDraft::text(Direction::Outbound, text));
        self.touch_chat(chat_id, message.created_at);
        self.bus.emit(Notification::NewMessage {
            chat_id: chat_id.to_string(),
        });
        Ok(message)
    }

    /// Upload a local file, classified by extension into photo vs generic
    /// document. On confirmation the photo bytes are retained in the
    /// attachment cache so the message can be displayed later.
    pub fn send_attachment(&self, chat_id: &str, path: &Path) -> Result<Message, SendError> {
        let bytes = fs::read(path).map_err(|err| SendError::new(err.to_string()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let kind = classify(path);

        self.provider
            .send_file(chat_id, &file_name, bytes.clone(), kind)
            .map_err(|err| SendError::new(err.to_string()))?;

        let mut draft = match kind {
            UploadKind::Photo => MessageDraft::photo(Direction::Outbound, None, Some(bytes)),
            UploadKind::Document => MessageDraft::document(Direction::Outbound, file_name.clone()),
        };
        draft.file_name = Some(file_name);

        let message = self.store.append_message(chat_id, draft);
        self.touch_chat(chat_id, message.created_at);
        self.bus.emit(Notification::NewMessage {
            chat_id: chat_id.to_string(),
        });
        Ok(message)
    }

    fn touch_chat(&self, chat_id: &str, at: i64) {
        let mut chat = Chat::new(chat_id);
        chat.last_activity = at;
        self.store.upsert_chat(chat);
    }
}

fn classify(path: &Path) -> UploadKind {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some(ext) if PHOTO_EXTENSIONS.contains(&ext) => UploadKind::Photo,
        _ => UploadKind::Document,
    }
}
