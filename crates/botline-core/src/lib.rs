pub mod bus;
pub mod config;
pub mod dispatch;
pub mod models;
pub mod provider;
pub mod runtime;
pub mod store;
pub mod sync;
pub mod tracing_setup;

// Re-export the types a consumer touches on every call path
pub use bus::{Notification, NotificationBus};
pub use config::CoreConfig;
pub use dispatch::{Dispatcher, SendError};
pub use models::{Chat, ChatKind, Direction, Message, MessageDraft, MessageKind};
pub use provider::{EventDetail, EventPayload, MessagingProvider, ProviderError, RemoteEvent};
pub use runtime::CoreRuntime;
pub use store::Store;
pub use sync::SyncEngine;
