use anyhow::anyhow;
use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::CaptureSource;

/// Stand-in capture source for hosts without a capturable surface. Every
/// attempt fails, which the cadence driver treats as a skipped upload.
#[derive(Default)]
pub struct NoopCapture {}

#[async_trait]
impl CaptureSource for NoopCapture {
    #[allow(clippy::implicit_return)]
    async fn capture(&self) -> Result<Vec<u8>> {
        return Err(anyhow!("no capturable surface available"));
    }
}
