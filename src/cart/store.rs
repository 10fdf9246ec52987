use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::model::Cart;

#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("Cart storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored cart is unreadable: {0}")]
    Format(#[from] serde_json::Error),
}

/// Where a cart lives between sessions.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The saved cart, or `None` if nothing has been saved yet.
    async fn load(&self) -> Result<Option<Cart>, CartError>;

    async fn save(&self, cart: &Cart) -> Result<(), CartError>;
}

/// One JSON document on disk. Writes go to a sibling temp file first and are
/// renamed into place, so a crash mid-write leaves the old cart intact.
pub struct JsonFileCartStore {
    path: PathBuf,
}

impl JsonFileCartStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CartStore for JsonFileCartStore {
    async fn load(&self) -> Result<Option<Cart>, CartError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, cart: &Cart) -> Result<(), CartError> {
        let bytes = serde_json::to_vec_pretty(cart)?;
        let tmp = self.path.with_extension("json.tmp");

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCartStore {
    saved: Mutex<Option<Cart>>,
}

impl MemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn load(&self) -> Result<Option<Cart>, CartError> {
        Ok(self.saved.lock().await.clone())
    }

    async fn save(&self, cart: &Cart) -> Result<(), CartError> {
        *self.saved.lock().await = Some(cart.clone());
        Ok(())
    }
}
