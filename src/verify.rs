use crate::error::{Result, StoreError};
use crate::gateway::StoreGateway;
use crate::types::{Expectation, Filter, FindOptions};
use std::sync::Arc;

/// Result of one verification pass.
#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    /// Records the scan returned.
    pub matched: u64,
    /// Human-readable soft failures. Empty means every check passed.
    pub mismatches: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Runs an uncapped filtered scan and checks the result against an
/// [`Expectation`], consuming the record stream in a single pass so the
/// result set is never held in memory.
///
/// In the default lenient mode a property check is existential (one
/// matching record satisfies it) and mismatches are logged, not fatal. In
/// strict mode property checks are universal and any mismatch fails the
/// pass with [`StoreError::Verification`].
pub struct SearchVerifier<G> {
    gateway: Arc<G>,
    bucket: String,
    strict: bool,
}

impl<G: StoreGateway> SearchVerifier<G> {
    pub fn new(gateway: Arc<G>, bucket: impl Into<String>, strict: bool) -> Self {
        SearchVerifier {
            gateway,
            bucket: bucket.into(),
            strict,
        }
    }

    pub async fn verify(
        &self,
        filter: &Filter,
        opts: &FindOptions,
        expectation: &Expectation,
    ) -> Result<VerifyReport> {
        tracing::info!(
            bucket = %self.bucket,
            filter = %filter,
            options = %serde_json::to_string(opts).unwrap_or_default(),
            "searching objects"
        );

        let mut stream = self.gateway.find_objects(&self.bucket, filter, opts).await?;

        let mut matched = 0u64;
        let mut any = vec![false; expectation.properties.len()];
        let mut all = vec![true; expectation.properties.len()];

        while let Some(item) = stream.next().await {
            let record = item?;
            matched += 1;
            for (i, property) in expectation.properties.iter().enumerate() {
                let hit = record.value.get(&property.name) == Some(&property.value);
                any[i] |= hit;
                all[i] &= hit;
            }
        }

        let mut mismatches = Vec::new();

        if let Some(expected) = expectation.expected_count {
            tracing::info!(bucket = %self.bucket, "{}/{} objects found", matched, expected);
            if matched != expected {
                mismatches.push(format!("expected {} objects, found {}", expected, matched));
            }
        }

        for (i, property) in expectation.properties.iter().enumerate() {
            let ok = if self.strict { all[i] } else { any[i] };
            if ok {
                tracing::info!(
                    bucket = %self.bucket,
                    property = %property.name,
                    "values for property match expected value {}",
                    property.value
                );
            } else {
                mismatches.push(format!(
                    "values for property {} do not match expected value {}",
                    property.name, property.value
                ));
            }
        }

        for mismatch in &mismatches {
            tracing::warn!(bucket = %self.bucket, "{}", mismatch);
        }

        if self.strict && !mismatches.is_empty() {
            return Err(StoreError::Verification(mismatches.join("; ")));
        }

        Ok(VerifyReport {
            matched,
            mismatches,
        })
    }
}
