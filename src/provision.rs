use crate::error::Result;
use crate::gateway::StoreGateway;
use crate::types::BucketConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What to do when the bucket already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResetPolicy {
    /// Delete and recreate, so every run starts from a clean slate.
    #[default]
    Recreate,
    /// Keep the existing bucket and skip create/update entirely. Assumes a
    /// previous run already brought it to the target schema.
    ReuseIfExists,
}

/// Brings a bucket to the target schema version, idempotently.
///
/// Creation happens in two steps on purpose: create at the initial schema,
/// then update to the target. The update is what leaves previously-written
/// records unindexed on the new fields, which is the condition the rest of
/// the workflow exercises.
pub struct BucketProvisioner<G> {
    gateway: Arc<G>,
}

impl<G: StoreGateway> BucketProvisioner<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        BucketProvisioner { gateway }
    }

    pub async fn ensure(
        &self,
        name: &str,
        initial: &BucketConfig,
        target: &BucketConfig,
        policy: ResetPolicy,
    ) -> Result<()> {
        let existing = match self.gateway.get_bucket(name).await {
            Ok(bucket) => Some(bucket),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        match (policy, existing) {
            (ResetPolicy::ReuseIfExists, Some(bucket)) => {
                tracing::info!(
                    bucket = %name,
                    version = bucket.config.options.version,
                    "reusing existing bucket"
                );
                return Ok(());
            }
            (ResetPolicy::Recreate, Some(_)) => {
                tracing::info!(bucket = %name, "deleting existing bucket");
                self.gateway.delete_bucket(name).await?;
            }
            (_, None) => {}
        }

        tracing::info!(
            bucket = %name,
            version = initial.options.version,
            "creating bucket"
        );
        self.gateway.create_bucket(name, initial).await?;

        tracing::info!(
            bucket = %name,
            version = target.options.version,
            "updating bucket schema"
        );
        self.gateway.update_bucket(name, target).await?;

        Ok(())
    }
}
