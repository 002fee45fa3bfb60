//! Durable, process-local persistence for chats, messages, attachment
//! blobs, and the processed-event ledger.
//!
//! Four independent collections live under the data dir: `messages.json`
//! (chat id -> ordered message list), `chats.json` (chat id -> chat),
//! `processed.json` (event-id ledger), and `attachments/` (blob files).
//! Every operation — readers included — serializes through one
//! process-wide lock for its whole read-modify-write cycle. That trades
//! throughput for the guarantee that no write is torn or lost, which is
//! the right trade at human chat cadence.
//!
//! Failure posture: a corrupt or missing file reads as empty, and a failed
//! write is logged and swallowed. The application stays usable with
//! partially damaged local state; transient divergence between memory and
//! disk is accepted.

pub mod attachments;
pub mod ledger;

pub use attachments::AttachmentCache;
pub use ledger::ProcessedEventLedger;

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::models::message::format_clock;
use crate::models::{Chat, Message, MessageDraft, MessageKind};

const MESSAGES_FILE: &str = "messages.json";
const CHATS_FILE: &str = "chats.json";
const PROCESSED_FILE: &str = "processed.json";
const ATTACHMENTS_DIR: &str = "attachments";

pub const PHOTO_PLACEHOLDER: &str = "Photo";
pub const DOCUMENT_PLACEHOLDER: &str = "File";

type MessageLog = HashMap<String, Vec<Message>>;
type ChatMap = HashMap<String, Chat>;

/// Internal failure modes of the backing files. Never escapes the store's
/// public surface: corrupt reads degrade to empty and failed writes are
/// logged and swallowed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt data: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub struct Store {
    root: PathBuf,
    attachments: AttachmentCache,
    /// Guards every backing file for the duration of each operation's
    /// read-modify-write cycle.
    lock: Mutex<()>,
    message_cap: usize,
}

impl Store {
    pub fn open<P: AsRef<Path>>(root: P, message_cap: usize) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        let attachments = AttachmentCache::open(root.join(ATTACHMENTS_DIR))?;
        Ok(Self {
            root,
            attachments,
            lock: Mutex::new(()),
            message_cap,
        })
    }

    pub fn attachments(&self) -> &AttachmentCache {
        &self.attachments
    }

    // ===== Messages =====

    /// Append a message to a chat's log and return it as stored.
    ///
    /// The store generates the id from capture time (bumped past the last
    /// entry if two appends land in the same millisecond), synthesizes
    /// placeholder text for photo/document drafts without visible text,
    /// persists attached bytes before recording the blob reference, and
    /// enforces the per-chat retention cap by evicting oldest entries.
    pub fn append_message(&self, chat_id: &str, draft: MessageDraft) -> Message {
        let _guard = self.lock.lock();
        let mut log: MessageLog = self.read_collection(MESSAGES_FILE);
        let entries = log.entry(chat_id.to_string()).or_default();

        let now = Utc::now().timestamp_millis();
        let mut id = now;
        if let Some(last) = entries.last() {
            if id <= last.id {
                id = last.id + 1;
            }
        }

        let text = if !draft.text.is_empty() {
            draft.text
        } else {
            match draft.kind {
                MessageKind::Text => draft.text,
                MessageKind::Photo => PHOTO_PLACEHOLDER.to_string(),
                MessageKind::Document => draft
                    .file_name
                    .clone()
                    .unwrap_or_else(|| DOCUMENT_PLACEHOLDER.to_string()),
            }
        };

        let attachment = draft.bytes.and_then(|bytes| {
            let ext = draft
                .file_name
                .as_deref()
                .and_then(|name| Path::new(name).extension()?.to_str())
                .unwrap_or("jpg");
            match self.attachments.save(&bytes, ext) {
                Ok(blob_id) => Some(blob_id),
                Err(err) => {
                    // The message still goes in; it just loses its blob.
                    tracing::warn!(chat_id, %err, "failed to persist attachment blob");
                    None
                }
            }
        });

        let message = Message {
            id,
            text,
            direction: draft.direction,
            kind: draft.kind,
            created_at: now,
            time: format_clock(now),
            attachment,
            file_name: draft.file_name,
        };
        entries.push(message.clone());

        if entries.len() > self.message_cap {
            let excess = entries.len() - self.message_cap;
            entries.drain(..excess);
        }

        self.write_collection(MESSAGES_FILE, &log);
        message
    }

    /// A chat's messages, oldest first. Structurally incomplete legacy
    /// entries are back-filled with presentation defaults rather than
    /// rejected, so old logs stay readable across schema evolution.
    pub fn get_messages(&self, chat_id: &str) -> Vec<Message> {
        let _guard = self.lock.lock();
        let mut log: MessageLog = self.read_collection(MESSAGES_FILE);
        let mut messages = log.remove(chat_id).unwrap_or_default();
        for message in &mut messages {
            message.backfill();
        }
        messages
    }

    /// Remove exactly one message. Returns whether it existed.
    pub fn delete_message(&self, chat_id: &str, message_id: i64) -> bool {
        let _guard = self.lock.lock();
        let mut log: MessageLog = self.read_collection(MESSAGES_FILE);
        let Some(entries) = log.get_mut(chat_id) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|msg| msg.id != message_id);
        if entries.len() == before {
            return false;
        }
        self.write_collection(MESSAGES_FILE, &log);
        true
    }

    /// Empty a chat's message list, keeping the chat itself.
    pub fn clear_chat(&self, chat_id: &str) -> bool {
        let _guard = self.lock.lock();
        let mut log: MessageLog = self.read_collection(MESSAGES_FILE);
        let Some(entries) = log.get_mut(chat_id) else {
            return false;
        };
        entries.clear();
        self.write_collection(MESSAGES_FILE, &log);
        true
    }

    // ===== Chats =====

    /// Create or merge a chat record. Fields only fill gaps; populated
    /// fields are never overwritten with blanks.
    pub fn upsert_chat(&self, chat: Chat) {
        if chat.id.is_empty() {
            tracing::warn!("dropping chat upsert with empty id");
            return;
        }
        let _guard = self.lock.lock();
        let mut chats: ChatMap = self.read_collection(CHATS_FILE);
        match chats.get_mut(&chat.id) {
            Some(existing) => existing.merge_from(&chat),
            None => {
                chats.insert(chat.id.clone(), chat);
            }
        }
        self.write_collection(CHATS_FILE, &chats);
    }

    pub fn list_chats(&self) -> HashMap<String, Chat> {
        let _guard = self.lock.lock();
        let mut chats: ChatMap = self.read_collection(CHATS_FILE);
        for (chat_id, chat) in chats.iter_mut() {
            if chat.id.is_empty() {
                chat.id = chat_id.clone();
            }
        }
        chats
    }

    // ===== Processed-event ledger =====

    pub fn is_event_processed(&self, event_id: i64) -> bool {
        let _guard = self.lock.lock();
        let ledger: ProcessedEventLedger = self.read_collection(PROCESSED_FILE);
        ledger.contains(event_id)
    }

    pub fn mark_event_processed(&self, event_id: i64) {
        let _guard = self.lock.lock();
        let mut ledger: ProcessedEventLedger = self.read_collection(PROCESSED_FILE);
        ledger.insert(event_id);
        self.write_collection(PROCESSED_FILE, &ledger);
    }

    // ===== Session =====

    /// Irreversibly clear all four collections. Only called on explicit
    /// account logout.
    pub fn purge_all(&self) {
        let _guard = self.lock.lock();
        self.write_collection(MESSAGES_FILE, &MessageLog::new());
        self.write_collection(CHATS_FILE, &ChatMap::new());
        self.write_collection(PROCESSED_FILE, &ProcessedEventLedger::default());
        self.attachments.purge();
    }

    // ===== Backing files =====

    /// Read a collection, degrading to its empty value when the file is
    /// missing or unreadable. The store must stay usable with damaged
    /// local state, so corruption is logged, never propagated.
    fn read_collection<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        let path = self.root.join(name);
        match self.try_read(&path) {
            Ok(value) => value,
            Err(StoreError::Io(err)) if err.kind() == io::ErrorKind::NotFound => T::default(),
            Err(err) => {
                tracing::warn!(file = name, %err, "unreadable store file, treating as empty");
                T::default()
            }
        }
    }

    fn try_read<T: DeserializeOwned>(&self, path: &Path) -> Result<T, StoreError> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Write a collection atomically (temp file + rename). Failures are
    /// logged and swallowed; the in-memory effect is allowed to diverge
    /// from durable state transiently.
    fn write_collection<T: Serialize>(&self, name: &str, value: &T) {
        if let Err(err) = self.try_write(name, value) {
            tracing::warn!(file = name, %err, "store write failed");
        }
    }

    fn try_write<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let tmp = self.root.join(format!("{}.tmp", name));
        fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
        fs::rename(&tmp, self.root.join(name))?;
        Ok(())
    }
}
