//! Bot-API HTTP provider.
//!
//! Talks to a Telegram-style bot gateway: `getUpdates` long-polling under
//! `<base>/bot<token>/`, a two-step `getFile` + download for attachments,
//! and `sendMessage` / `sendPhoto` / `sendDocument` for the outgoing path.

use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde::Deserialize;

use super::{EventDetail, EventPayload, MessagingProvider, ProviderError, RemoteEvent, UploadKind};
use crate::models::{Chat, ChatKind};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
/// Headroom added on top of the long-poll wait so the HTTP timeout fires
/// after the server-side one.
const REQUEST_HEADROOM: Duration = Duration::from_secs(5);

pub struct BotApiProvider {
    http: Client,
    base: String,
    token: String,
}

impl BotApiProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base(DEFAULT_API_BASE, token)
    }

    pub fn with_base(base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base, self.token, method)
    }

    fn file_url(&self, remote_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.base, self.token, remote_path)
    }
}

fn transport(err: reqwest::Error) -> ProviderError {
    ProviderError::Unavailable(err.to_string())
}

/// Unwrap the `{ok, result, description}` envelope every bot-API response
/// is wrapped in.
fn unwrap_envelope<T>(envelope: ApiEnvelope<T>) -> Result<T, ProviderError> {
    if !envelope.ok {
        return Err(ProviderError::Unavailable(
            envelope
                .description
                .unwrap_or_else(|| "API error".to_string()),
        ));
    }
    envelope
        .result
        .ok_or_else(|| ProviderError::Unavailable("API response missing result".to_string()))
}

impl MessagingProvider for BotApiProvider {
    fn fetch_events(&self, offset: i64, wait: Duration) -> Result<Vec<RemoteEvent>, ProviderError> {
        let response = self
            .http
            .get(self.method_url("getUpdates"))
            .query(&[("offset", offset), ("timeout", wait.as_secs() as i64)])
            .timeout(wait + REQUEST_HEADROOM)
            .send()
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let envelope: ApiEnvelope<Vec<WireUpdate>> = response.json().map_err(transport)?;
        let updates = unwrap_envelope(envelope)?;
        Ok(updates.into_iter().map(RemoteEvent::from).collect())
    }

    fn resolve_file(&self, file_id: &str) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(self.method_url("getFile"))
            .form(&[("file_id", file_id)])
            .timeout(REQUEST_HEADROOM)
            .send()
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let envelope: ApiEnvelope<WireFile> = response.json().map_err(transport)?;
        let file = unwrap_envelope(envelope)?;
        file.file_path
            .ok_or_else(|| ProviderError::Unavailable("file has no path".to_string()))
    }

    fn download(&self, remote_path: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .http
            .get(self.file_url(remote_path))
            .timeout(Duration::from_secs(15))
            .send()
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "HTTP {}",
                response.status()
            )));
        }
        Ok(response.bytes().map_err(transport)?.to_vec())
    }

    fn send_text(&self, chat_id: &str, text: &str) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(self.method_url("sendMessage"))
            .form(&[("chat_id", chat_id), ("text", text)])
            .timeout(REQUEST_HEADROOM)
            .send()
            .map_err(transport)?;

        check_send_response(response)
    }

    fn send_file(
        &self,
        chat_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        kind: UploadKind,
    ) -> Result<(), ProviderError> {
        let (method, field) = match kind {
            UploadKind::Photo => ("sendPhoto", "photo"),
            UploadKind::Document => ("sendDocument", "document"),
        };

        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part(field, Part::bytes(bytes).file_name(file_name.to_string()));

        let response = self
            .http
            .post(self.method_url(method))
            .multipart(form)
            .timeout(Duration::from_secs(60))
            .send()
            .map_err(transport)?;

        check_send_response(response)
    }
}

fn check_send_response(response: reqwest::blocking::Response) -> Result<(), ProviderError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Unavailable(format!("HTTP {}", status)));
    }
    let envelope: ApiEnvelope<serde_json::Value> = response.json().map_err(transport)?;
    unwrap_envelope(envelope).map(|_| ())
}

// ===== Wire types =====

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUpdate {
    update_id: i64,
    message: Option<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    chat: WireChat,
    text: Option<String>,
    caption: Option<String>,
    photo: Option<Vec<WirePhotoSize>>,
    document: Option<WireDocument>,
}

#[derive(Debug, Deserialize)]
struct WireChat {
    id: Option<i64>,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    username: String,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct WirePhotoSize {
    file_id: String,
    #[serde(default)]
    file_size: i64,
}

#[derive(Debug, Deserialize)]
struct WireDocument {
    file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireFile {
    file_path: Option<String>,
}

impl From<WireUpdate> for RemoteEvent {
    fn from(update: WireUpdate) -> Self {
        let detail = update.message.and_then(|msg| {
            let chat_id = msg.chat.id?;
            let chat = Chat {
                id: chat_id.to_string(),
                first_name: msg.chat.first_name,
                last_name: msg.chat.last_name,
                username: msg.chat.username,
                kind: ChatKind::from_provider(&msg.chat.kind),
                last_activity: 0,
            };

            let payload = if let Some(text) = msg.text {
                EventPayload::Text { text }
            } else if let Some(photo) = msg.photo.filter(|sizes| !sizes.is_empty()) {
                // The provider lists several size variants; take the largest.
                let best = photo
                    .into_iter()
                    .max_by_key(|size| size.file_size)?;
                EventPayload::Photo {
                    file_id: best.file_id,
                    caption: msg.caption,
                }
            } else if let Some(doc) = msg.document {
                EventPayload::Document {
                    file_name: doc.file_name.unwrap_or_else(|| "Document".to_string()),
                }
            } else {
                return None;
            };

            Some(EventDetail { chat, payload })
        });

        RemoteEvent {
            event_id: update.update_id,
            detail,
        }
    }
}
