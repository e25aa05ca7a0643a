use crate::config::BenchConfig;
use crate::drain::ReindexDrainer;
use crate::error::Result;
use crate::gateway::StoreGateway;
use crate::populate::BatchPopulator;
use crate::provision::BucketProvisioner;
use crate::types::{
    sentinel_value, BucketConfig, Expectation, ExpectedProperty, Filter, IndexType, ObjectTemplate,
    KEY_FIELD,
};
use crate::verify::{SearchVerifier, VerifyReport};
use std::sync::Arc;

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub created: u64,
    pub reindex_passes: u64,
    /// One report per reindexed field, in string/boolean/number order.
    pub verifications: Vec<VerifyReport>,
}

/// Fixed fail-fast pipeline: provision → drain pre-existing index debt →
/// populate both cohorts → drain → verify each reindexed field.
///
/// The first fatal error aborts the remaining steps; the gateway is closed
/// on every exit path.
pub struct ReindexWorkflow<G> {
    gateway: Arc<G>,
    config: BenchConfig,
}

impl<G: StoreGateway> ReindexWorkflow<G> {
    pub fn new(gateway: Arc<G>, config: BenchConfig) -> Self {
        ReindexWorkflow { gateway, config }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let result = self.run_pipeline().await;
        self.gateway.close().await;

        match &result {
            Ok(report) => tracing::info!(
                created = report.created,
                reindex_passes = report.reindex_passes,
                "all done"
            ),
            Err(e) => tracing::error!(error = %e, "benchmark failed"),
        }
        result
    }

    async fn run_pipeline(&self) -> Result<RunReport> {
        let config = &self.config;
        let find_opts = config.find_options()?;

        self.gateway.connect().await?;

        let provisioner = BucketProvisioner::new(Arc::clone(&self.gateway));
        provisioner
            .ensure(
                &config.bucket,
                &BucketConfig::initial(),
                &BucketConfig::target(),
                config.reset_policy,
            )
            .await?;

        // Clear any index debt the schema update itself created before
        // records go in; on a fresh bucket this is a single no-op call.
        let drainer = ReindexDrainer::new(Arc::clone(&self.gateway), config.bucket.clone());
        drainer.drain(config.reindex_chunk).await?;

        let populator = BatchPopulator::new(Arc::clone(&self.gateway), config.bucket.clone());
        let sentinel_count = config.sentinel_count();
        let non_sentinel_count = config.non_sentinel_count();

        tracing::info!(count = sentinel_count, "adding sentinel objects");
        let sentinel = populator
            .populate(&ObjectTemplate::sentinel(), sentinel_count, config.concurrency)
            .await?;

        tracing::info!(count = non_sentinel_count, "adding non-sentinel objects");
        let non_sentinel = populator
            .populate(
                &ObjectTemplate::non_sentinel(),
                non_sentinel_count,
                config.concurrency,
            )
            .await?;

        let reindex_passes = drainer.drain(config.reindex_chunk).await?;

        let verifier = SearchVerifier::new(
            Arc::clone(&self.gateway),
            config.bucket.clone(),
            config.strict_verify,
        );

        let mut verifications = Vec::with_capacity(IndexType::ALL.len());
        for field_type in IndexType::ALL {
            let field = field_type.reindexed_field();
            let value = sentinel_value(field_type);
            let filter = Filter::and([
                Filter::present(KEY_FIELD),
                Filter::eq(field, value.clone()),
            ]);
            let expectation = Expectation {
                expected_count: Some(sentinel_count),
                properties: vec![ExpectedProperty {
                    name: field.to_string(),
                    value,
                }],
            };
            verifications.push(verifier.verify(&filter, &find_opts, &expectation).await?);
        }

        Ok(RunReport {
            created: sentinel.created + non_sentinel.created,
            reindex_passes,
            verifications,
        })
    }
}
