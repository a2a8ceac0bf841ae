//! Durable write-through for the entity collections.
//!
//! Collections are loaded once; until that has happened the `ready` gate
//! suppresses every outbound write, so the empty pre-load state can never
//! clobber what is already on disk.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::store::Collection;

/// Keyed text storage. `put_all` must apply every entry or none.
pub trait BlobStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn put_all(&mut self, entries: &[(&str, String)]) -> anyhow::Result<()>;
}

pub struct PersistenceSync {
    backend: Box<dyn BlobStore>,
    ready: bool,
}

impl PersistenceSync {
    pub fn new(backend: Box<dyn BlobStore>) -> Self {
        Self {
            backend,
            ready: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    /// Missing, unreadable or malformed content all degrade to an empty collection.
    pub fn read_collection<T: DeserializeOwned>(&self, collection: Collection) -> Vec<T> {
        let raw = match self.backend.get(collection.key()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(collection = collection.key(), error = %format!("{e:#}"), "read failed, starting empty");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!(collection = collection.key(), error = %e, "malformed payload, starting empty");
                Vec::new()
            }
        }
    }

    pub fn write_through(&mut self, payloads: &[(Collection, String)]) -> anyhow::Result<()> {
        if payloads.is_empty() {
            return Ok(());
        }
        if !self.ready {
            debug!(count = payloads.len(), "initial load pending, write suppressed");
            return Ok(());
        }
        let entries: Vec<(&str, String)> = payloads
            .iter()
            .map(|(c, p)| (c.key(), p.clone()))
            .collect();
        self.backend.put_all(&entries)?;
        for (c, p) in payloads {
            debug!(collection = c.key(), bytes = p.len(), "collection written");
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod memory {
    use super::BlobStore;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;

    /// In-process storage. Clones share the same entries, so a second store built
    /// from a clone observes what the first one wrote.
    #[derive(Debug, Default, Clone)]
    pub struct MemoryBlobs {
        entries: Rc<RefCell<HashMap<String, String>>>,
        failing: Rc<Cell<bool>>,
    }

    impl MemoryBlobs {
        pub fn with_entry(self, key: &str, payload: &str) -> Self {
            self.entries
                .borrow_mut()
                .insert(key.to_string(), payload.to_string());
            self
        }

        pub fn raw(&self, key: &str) -> Option<String> {
            self.entries.borrow().get(key).cloned()
        }

        /// From now on every `put_all` fails without writing anything.
        pub fn fail_writes(&self) {
            self.failing.set(true);
        }
    }

    impl BlobStore for MemoryBlobs {
        fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            Ok(self.raw(key))
        }

        fn put_all(&mut self, entries: &[(&str, String)]) -> anyhow::Result<()> {
            if self.failing.get() {
                anyhow::bail!("disk full");
            }
            let mut map = self.entries.borrow_mut();
            for (key, payload) in entries {
                map.insert(key.to_string(), payload.clone());
            }
            Ok(())
        }
    }

    /// Backend whose writes always fail; reads see nothing.
    pub struct FailingBlobs;

    impl BlobStore for FailingBlobs {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }

        fn put_all(&mut self, _entries: &[(&str, String)]) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }
}
