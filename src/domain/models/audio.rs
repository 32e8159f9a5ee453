use anyhow::Result;
use async_trait::async_trait;

/// External collaborator that records the microphone. While started it emits
/// fixed-size 16-bit 16kHz mono PCM chunks, delivered to the coordinator as
/// `Request::AudioChunk`.
#[async_trait]
pub trait AudioSource {
    async fn start(&self) -> Result<()>;
    async fn stop(&self) -> Result<()>;
}

pub type AudioBox = Box<dyn AudioSource + Send + Sync>;
