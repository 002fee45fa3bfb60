//! Bounded set of already-applied event ids.
//!
//! The ledger suppresses duplicate application of recently-seen events
//! (the offset alone does not survive a restart). It is insertion-ordered;
//! once it grows past `LEDGER_MAX` entries only the most recent
//! `LEDGER_KEEP` are retained, bounding disk and scan cost while still
//! covering any realistic re-delivery window.

use serde::{Deserialize, Serialize};

pub const LEDGER_MAX: usize = 1000;
pub const LEDGER_KEEP: usize = 500;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessedEventLedger {
    ids: Vec<i64>,
}

impl ProcessedEventLedger {
    pub fn contains(&self, event_id: i64) -> bool {
        self.ids.contains(&event_id)
    }

    pub fn insert(&mut self, event_id: i64) {
        if self.contains(event_id) {
            return;
        }
        self.ids.push(event_id);
        if self.ids.len() > LEDGER_MAX {
            let excess = self.ids.len() - LEDGER_KEEP;
            self.ids.drain(..excess);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.ids.len()
    }
}
