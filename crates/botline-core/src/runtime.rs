//! Session-level wiring: owns the store, bus, dispatcher, and the sync
//! engine's lifecycle. Consumers construct one `CoreRuntime` per session
//! and start/stop sync at login/logout boundaries.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use anyhow::Result;

use crate::bus::{Notification, NotificationBus};
use crate::config::CoreConfig;
use crate::dispatch::Dispatcher;
use crate::provider::MessagingProvider;
use crate::store::Store;
use crate::sync::SyncEngine;

pub struct CoreRuntime {
    config: CoreConfig,
    provider: Arc<dyn MessagingProvider>,
    store: Arc<Store>,
    bus: NotificationBus,
    dispatcher: Dispatcher,
    engine: Option<SyncEngine>,
}

impl CoreRuntime {
    pub fn new(config: CoreConfig, provider: Arc<dyn MessagingProvider>) -> Result<Self> {
        let store = Arc::new(Store::open(&config.data_dir, config.message_cap)?);
        let bus = NotificationBus::new();
        let dispatcher = Dispatcher::new(provider.clone(), store.clone(), bus.clone());
        Ok(Self {
            config,
            provider,
            store,
            bus,
            dispatcher,
            engine: None,
        })
    }

    pub fn store(&self) -> Arc<Store> {
        self.store.clone()
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    pub fn subscribe(&self) -> Receiver<Notification> {
        self.bus.subscribe()
    }

    /// Start the background poll loop. A second call while running is a
    /// no-op.
    pub fn start_sync(&mut self) {
        if self.engine.is_some() {
            return;
        }
        self.engine = Some(SyncEngine::start(
            self.provider.clone(),
            self.store.clone(),
            self.bus.clone(),
            &self.config,
        ));
    }

    /// Stop the poll loop and wait for it to exit. No store writes from
    /// the engine happen after this returns.
    pub fn stop_sync(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.stop();
        }
    }

    /// Explicit account logout: stop syncing and irreversibly clear all
    /// local data.
    pub fn logout(&mut self) {
        self.stop_sync();
        self.store.purge_all();
    }
}

impl Drop for CoreRuntime {
    fn drop(&mut self) {
        self.stop_sync();
    }
}
