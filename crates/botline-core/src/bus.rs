use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use parking_lot::Mutex;

/// Events fanned out from the sync engine and dispatcher to whoever is
/// listening (the UI, a watch loop, a test).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    NewMessage { chat_id: String },
    ConnectivityChanged { connected: bool },
}

/// Fan-out over plain mpsc channels. Each subscriber gets its own channel,
/// so delivery to one slow consumer never blocks the others and events for
/// the same chat arrive in emission order per subscriber. Subscribers that
/// dropped their receiver are pruned on the next emit.
#[derive(Clone, Default)]
pub struct NotificationBus {
    subscribers: Arc<Mutex<Vec<Sender<Notification>>>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<Notification> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn emit(&self, notification: Notification) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(notification.clone()).is_ok());
    }
}
