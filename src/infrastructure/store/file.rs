#[cfg(test)]
#[path = "file_test.rs"]
mod tests;

use std::path;

use anyhow::Result;
use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::PersistedState;
use crate::domain::models::StateStore;

/// Persists the session identity as a small JSON file in the cache
/// directory. A missing file reads back as the default (stopped) state.
pub struct FileStore {
    pub state_file: path::PathBuf,
}

impl Default for FileStore {
    fn default() -> FileStore {
        return FileStore::new(path::PathBuf::from(Config::get(ConfigKey::StateFile)));
    }
}

impl FileStore {
    pub fn new(state_file: path::PathBuf) -> FileStore {
        return FileStore { state_file };
    }
}

#[async_trait]
impl StateStore for FileStore {
    #[allow(clippy::implicit_return)]
    async fn load(&self) -> Result<PersistedState> {
        if !self.state_file.exists() {
            return Ok(PersistedState::default());
        }

        let payload = fs::read_to_string(&self.state_file).await?;
        let state: PersistedState = serde_json::from_str(&payload)?;

        return Ok(state);
    }

    #[allow(clippy::implicit_return)]
    async fn save(&self, state: &PersistedState) -> Result<()> {
        if let Some(parent) = self.state_file.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        let payload = serde_json::to_string(state)?;
        let mut file = fs::File::create(&self.state_file).await?;
        file.write_all(payload.as_bytes()).await?;

        return Ok(());
    }
}
