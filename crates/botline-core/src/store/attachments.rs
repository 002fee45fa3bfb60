//! Blob storage for message attachments.
//!
//! Blobs live as individual files under `attachments/` in the data dir,
//! keyed by a generated id that embeds the extension. Nothing here counts
//! references; a blob whose message was deleted is an accepted leak,
//! reclaimed by `purge`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

pub struct AttachmentCache {
    dir: PathBuf,
}

impl AttachmentCache {
    pub fn open<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Persist `bytes` under a fresh id and return it.
    pub fn save(&self, bytes: &[u8], ext: &str) -> io::Result<String> {
        let id = format!("{}.{}", Uuid::new_v4(), ext);
        fs::write(self.dir.join(&id), bytes)?;
        Ok(id)
    }

    pub fn path(&self, id: &str) -> PathBuf {
        self.dir.join(id)
    }

    pub fn load(&self, id: &str) -> Option<Vec<u8>> {
        fs::read(self.dir.join(id)).ok()
    }

    /// Delete every stored blob. Individual failures are skipped; a file
    /// that cannot be removed now will be caught by the next purge.
    pub fn purge(&self) {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.flatten() {
            if let Err(err) = fs::remove_file(entry.path()) {
                tracing::warn!(path = %entry.path().display(), %err, "failed to remove attachment");
            }
        }
    }
}
