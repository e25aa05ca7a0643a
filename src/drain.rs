use crate::error::Result;
use crate::gateway::StoreGateway;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Repeatedly reindexes chunks until the store reports zero remaining
/// unindexed records.
///
/// The loop issues the next chunk immediately after the previous one
/// settles. Termination relies on the store's contract that each call makes
/// progress; a store that never decreases `remaining` would loop forever.
pub struct ReindexDrainer<G> {
    gateway: Arc<G>,
    bucket: String,
}

impl<G: StoreGateway> ReindexDrainer<G> {
    pub fn new(gateway: Arc<G>, bucket: impl Into<String>) -> Self {
        ReindexDrainer {
            gateway,
            bucket: bucket.into(),
        }
    }

    /// Drain to completion. Returns the number of chunk calls made.
    pub async fn drain(&self, chunk_size: NonZeroUsize) -> Result<u64> {
        let mut passes = 0u64;
        loop {
            let status = self
                .gateway
                .reindex_objects(&self.bucket, chunk_size.get())
                .await?;
            passes += 1;

            tracing::debug!(
                bucket = %self.bucket,
                remaining = status.remaining,
                passes,
                "reindex chunk complete"
            );

            if status.remaining == 0 {
                tracing::info!(bucket = %self.bucket, passes, "reindex drained");
                return Ok(passes);
            }
        }
    }
}
