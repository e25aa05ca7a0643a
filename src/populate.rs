use crate::error::{Result, StoreError};
use crate::gateway::StoreGateway;
use crate::types::ObjectTemplate;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

/// Outcome of a completed population run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulateSummary {
    /// Records confirmed inserted. Always equals the requested total on
    /// success.
    pub created: u64,
    /// Puts actually issued. Exceeds `created` when transient failures
    /// forced slots to be re-minted.
    pub attempts: u64,
    /// Sequential waves issued.
    pub waves: u64,
}

/// Inserts records in sequential waves of at most `concurrency` concurrent
/// puts. A wave must fully settle before the next one starts.
pub struct BatchPopulator<G> {
    gateway: Arc<G>,
    bucket: String,
}

impl<G: StoreGateway> BatchPopulator<G> {
    pub fn new(gateway: Arc<G>, bucket: impl Into<String>) -> Self {
        BatchPopulator {
            gateway,
            bucket: bucket.into(),
        }
    }

    /// Insert `total` clones of `template`, each under a fresh v4 key.
    ///
    /// Per-put classification: duplicate-key and invalid-index-type failures
    /// abort immediately (after the in-flight wave settles, since nothing is
    /// cancelled); any other failure abandons that slot and the next wave
    /// mints a brand-new key for it. Total attempts are therefore unbounded
    /// under sustained transient failure, but success always means exactly
    /// `total` records were created.
    pub async fn populate(
        &self,
        template: &ObjectTemplate,
        total: u64,
        concurrency: NonZeroUsize,
    ) -> Result<PopulateSummary> {
        let mut created = 0u64;
        let mut attempts = 0u64;
        let mut waves = 0u64;

        while created < total {
            let wave_size = (total - created).min(concurrency.get() as u64) as usize;
            let mut wave = JoinSet::new();

            for _ in 0..wave_size {
                let gateway = Arc::clone(&self.gateway);
                let bucket = self.bucket.clone();
                let template = template.clone();
                wave.spawn(async move {
                    let key = Uuid::new_v4().to_string();
                    let value = template.instantiate(&key);
                    gateway.put_object(&bucket, &key, value).await
                });
            }
            attempts += wave_size as u64;
            waves += 1;

            // Settle the whole wave before acting on any failure.
            let mut fatal: Option<StoreError> = None;
            while let Some(joined) = wave.join_next().await {
                match joined {
                    Ok(Ok(())) => created += 1,
                    Ok(Err(e)) if e.is_fatal_put() => {
                        if fatal.is_none() {
                            fatal = Some(e);
                        }
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(
                            bucket = %self.bucket,
                            error = %e,
                            "transient put failure, abandoning slot"
                        );
                    }
                    Err(e) => {
                        if fatal.is_none() {
                            fatal = Some(StoreError::Internal(format!(
                                "put task failed to complete: {}",
                                e
                            )));
                        }
                    }
                }
            }

            if let Some(e) = fatal {
                tracing::error!(
                    bucket = %self.bucket,
                    created,
                    error = %e,
                    "aborting population on fatal put failure"
                );
                return Err(e);
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            created,
            attempts,
            waves,
            "population complete"
        );
        Ok(PopulateSummary {
            created,
            attempts,
            waves,
        })
    }
}
