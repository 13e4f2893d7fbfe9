//! Durable storage of the last known data store descriptor.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use datalayer_common::datastore::DataStoreDescriptor;
use tracing::{debug, warn};

/// Key the descriptor is stored under.
pub const DATASTORE_INFO_KEY: &str = "datastore_info";

/// Synchronous key-value storage of the descriptor.
pub trait DescriptorStore {
    /// Stored descriptor, or `None` if missing, cleared or unreadable.
    fn get(&self) -> Option<DataStoreDescriptor>;

    /// Overwrite the stored descriptor. `None` clears it.
    fn set(&self, descriptor: Option<&DataStoreDescriptor>) -> std::io::Result<()>;
}

/// Parse a stored value. Anything other than a JSON object reads as absent.
fn decode(raw: &str) -> Option<DataStoreDescriptor> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "undefined" {
        return None;
    }
    match serde_json::from_str::<Option<DataStoreDescriptor>>(raw) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            warn!("Ignoring malformed stored descriptor: {e}");
            None
        }
    }
}

fn encode(descriptor: Option<&DataStoreDescriptor>) -> std::io::Result<String> {
    serde_json::to_string(&descriptor).map_err(std::io::Error::other)
}

// ─── File store ──────────────────────────────────────────────────────────────

/// Stores each key as `<dir>/<key>.json`.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{DATASTORE_INFO_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DescriptorStore for FileStore {
    fn get(&self) -> Option<DataStoreDescriptor> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        decode(&raw)
    }

    fn set(&self, descriptor: Option<&DataStoreDescriptor>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, encode(descriptor)?)?;
        debug!(path = %self.path.display(), present = descriptor.is_some(), "Saved descriptor");
        Ok(())
    }
}

// ─── Memory store ────────────────────────────────────────────────────────────

/// In-process store keyed like local storage. Raw strings are kept so that
/// malformed values can be seeded in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store a raw string under the descriptor key.
    pub fn set_raw(&self, raw: impl Into<String>) {
        self.entries()
            .insert(DATASTORE_INFO_KEY.to_string(), raw.into());
    }

    pub fn raw(&self) -> Option<String> {
        self.entries().get(DATASTORE_INFO_KEY).cloned()
    }
}

impl DescriptorStore for MemoryStore {
    fn get(&self) -> Option<DataStoreDescriptor> {
        self.raw().as_deref().and_then(decode)
    }

    fn set(&self, descriptor: Option<&DataStoreDescriptor>) -> std::io::Result<()> {
        self.set_raw(encode(descriptor)?);
        Ok(())
    }
}

impl<S: DescriptorStore + ?Sized> DescriptorStore for &S {
    fn get(&self) -> Option<DataStoreDescriptor> {
        (**self).get()
    }

    fn set(&self, descriptor: Option<&DataStoreDescriptor>) -> std::io::Result<()> {
        (**self).set(descriptor)
    }
}

impl<S: DescriptorStore + ?Sized> DescriptorStore for std::sync::Arc<S> {
    fn get(&self) -> Option<DataStoreDescriptor> {
        (**self).get()
    }

    fn set(&self, descriptor: Option<&DataStoreDescriptor>) -> std::io::Result<()> {
        (**self).set(descriptor)
    }
}
