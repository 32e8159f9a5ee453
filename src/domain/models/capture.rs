use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

/// External collaborator that produces one still image of whatever surface
/// the session is watching. Errors mean "nothing capturable right now" and
/// are always recoverable.
#[async_trait]
pub trait CaptureSource {
    /// Returns one JPEG-encoded frame.
    async fn capture(&self) -> Result<Vec<u8>>;
}

pub type CaptureBox = Arc<dyn CaptureSource + Send + Sync>;
