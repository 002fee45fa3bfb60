pub mod http;
#[cfg(test)]
pub mod mock;

use std::time::Duration;

use thiserror::Error;

use crate::models::Chat;

pub use http::BotApiProvider;

/// Anything that can go wrong talking to the remote provider. Callers are
/// required to treat every flavor the same way (the provider is simply
/// unavailable), so one variant carries the whole taxonomy.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// What kind of payload an outgoing file upload should be presented as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Photo,
    Document,
}

/// Payload of one inbound event, tagged by kind so each variant carries
/// only the fields that exist for it.
#[derive(Debug, Clone)]
pub enum EventPayload {
    Text {
        text: String,
    },
    /// `file_id` is a provider handle that must be resolved and downloaded
    /// in a second step before the bytes are available.
    Photo {
        file_id: String,
        caption: Option<String>,
    },
    Document {
        file_name: String,
    },
}

/// The chat and payload of an event the provider could interpret.
#[derive(Debug, Clone)]
pub struct EventDetail {
    pub chat: Chat,
    pub payload: EventPayload,
}

/// One inbound event from the provider.
///
/// `detail` is `None` for updates the provider cannot interpret; the event
/// id is still reported so the sync offset advances past them and a
/// malformed event can never stall the stream.
#[derive(Debug, Clone)]
pub struct RemoteEvent {
    pub event_id: i64,
    pub detail: Option<EventDetail>,
}

/// The remote messaging provider as the core sees it. One long-poll fetch,
/// a two-step file download, and two send calls. Every method is bounded by
/// an internal request timeout; any non-success collapses to
/// `ProviderError::Unavailable`.
pub trait MessagingProvider: Send + Sync {
    /// Long-poll for events with id >= `offset`, waiting server-side up to
    /// `wait` before returning an empty batch.
    fn fetch_events(&self, offset: i64, wait: Duration) -> Result<Vec<RemoteEvent>, ProviderError>;

    /// Resolve a file handle into a downloadable remote path.
    fn resolve_file(&self, file_id: &str) -> Result<String, ProviderError>;

    /// Download the bytes behind a resolved remote path.
    fn download(&self, remote_path: &str) -> Result<Vec<u8>, ProviderError>;

    fn send_text(&self, chat_id: &str, text: &str) -> Result<(), ProviderError>;

    fn send_file(
        &self,
        chat_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        kind: UploadKind,
    ) -> Result<(), ProviderError>;
}
