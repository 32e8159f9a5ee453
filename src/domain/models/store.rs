use anyhow::Result;
use async_trait::async_trait;

use super::PersistedState;

/// External key-value persistence for the session identity, so a restarted
/// process can resume the same remote conversation.
#[async_trait]
pub trait StateStore {
    async fn load(&self) -> Result<PersistedState>;
    async fn save(&self, state: &PersistedState) -> Result<()>;
}

pub type StateStoreBox = Box<dyn StateStore + Send + Sync>;
