//! Core traits for asset processing

use async_trait::async_trait;
use bytes::Bytes;
use gametools_core::AppResult;

/// External image optimisation service.
///
/// Implementations must return `AppError::CompressionFailed` carrying the
/// provider's message on any failure; they never hand back the input unchanged
/// in place of an error.
#[async_trait]
pub trait ImageCompressor: Send + Sync {
    /// Human-readable service name used in logs
    fn name(&self) -> &str;

    /// Optimise the image and return the new bytes
    async fn compress(&self, data: Bytes) -> AppResult<Bytes>;
}
