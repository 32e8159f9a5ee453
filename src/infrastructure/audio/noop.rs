use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::AudioSource;

/// Stand-in audio source for hosts without microphone capture. Start and
/// stop succeed silently and no chunks are ever produced.
#[derive(Default)]
pub struct NoopAudio {}

#[async_trait]
impl AudioSource for NoopAudio {
    #[allow(clippy::implicit_return)]
    async fn start(&self) -> Result<()> {
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn stop(&self) -> Result<()> {
        return Ok(());
    }
}
