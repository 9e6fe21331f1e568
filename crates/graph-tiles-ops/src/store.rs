//! Tile persistence.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;

/// Sink for encoded tiles.
///
/// Implementations decide where tiles live; the generator only supplies the
/// bytes and a relative key such as `tiles/1/0-1.png`. Writes are awaited one
/// at a time, so implementations need not handle concurrent stores.
#[async_trait]
pub trait TileStore: Send + Sync {
    /// Persist `bytes` under `key`.
    async fn store(&self, bytes: Vec<u8>, key: &str) -> Result<(), StoreError>;
}

/// Writes tiles below a base directory, creating parent directories as needed.
#[derive(Debug, Clone)]
pub struct FsTileStore {
    base: PathBuf,
}

impl FsTileStore {
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    /// Directory every key is resolved against.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Filesystem path a key is written to.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.base.join(key)
    }
}

#[async_trait]
impl TileStore for FsTileStore {
    async fn store(&self, bytes: Vec<u8>, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let io = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io)?;
        }
        tokio::fs::write(&path, &bytes).await.map_err(io)?;

        debug!(path = %path.display(), bytes = bytes.len(), "Stored tile");
        Ok(())
    }
}

/// Keeps tiles in memory, keyed by storage key.
#[derive(Debug, Default)]
pub struct MemoryTileStore {
    tiles: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryTileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored keys in lexicographic order.
    pub async fn keys(&self) -> Vec<String> {
        self.tiles.lock().await.keys().cloned().collect()
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.tiles.lock().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.tiles.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tiles.lock().await.is_empty()
    }

    /// Take every stored tile out of the store.
    pub async fn drain(&self) -> BTreeMap<String, Vec<u8>> {
        std::mem::take(&mut *self.tiles.lock().await)
    }
}

#[async_trait]
impl TileStore for MemoryTileStore {
    async fn store(&self, bytes: Vec<u8>, key: &str) -> Result<(), StoreError> {
        self.tiles.lock().await.insert(key.to_string(), bytes);
        Ok(())
    }
}
