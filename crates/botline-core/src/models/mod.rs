pub mod chat;
pub mod message;

pub use chat::{Chat, ChatKind};
pub use message::{Direction, Message, MessageDraft, MessageKind};
