use crate::error::Result;
use crate::provision::ResetPolicy;
use crate::types::FindOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::num::NonZeroUsize;

pub const DEFAULT_BUCKET: &str = "reindex_bench";
pub const DEFAULT_TOTAL_OBJECTS: u64 = 1000;
pub const DEFAULT_CONCURRENCY: usize = 100;
pub const DEFAULT_REINDEX_CHUNK: usize = 100;

/// Everything one benchmark run needs, passed explicitly to the workflow.
/// There is no process-wide configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub bucket: String,
    /// Records to create across both cohorts.
    pub total_objects: u64,
    /// Maximum puts in flight within one wave.
    pub concurrency: NonZeroUsize,
    /// Records per reindex chunk call.
    pub reindex_chunk: NonZeroUsize,
    pub reset_policy: ResetPolicy,
    /// Fail the pipeline on count or property mismatches instead of only
    /// logging them.
    pub strict_verify: bool,
    /// Free-form JSON merged into the scan's [`FindOptions`].
    pub find_opts: Option<Value>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            bucket: DEFAULT_BUCKET.to_string(),
            total_objects: DEFAULT_TOTAL_OBJECTS,
            concurrency: NonZeroUsize::new(DEFAULT_CONCURRENCY).unwrap(),
            reindex_chunk: NonZeroUsize::new(DEFAULT_REINDEX_CHUNK).unwrap(),
            reset_policy: ResetPolicy::default(),
            strict_verify: false,
            find_opts: None,
        }
    }
}

impl BenchConfig {
    /// Sentinel cohort size: half the total, but at least one record so a
    /// non-empty run always has something to find.
    pub fn sentinel_count(&self) -> u64 {
        if self.total_objects == 0 {
            0
        } else {
            (self.total_objects / 2).max(1)
        }
    }

    pub fn non_sentinel_count(&self) -> u64 {
        self.total_objects - self.sentinel_count()
    }

    /// Scan options for verification: the free-form overrides with
    /// `noLimit` forced on, since the whole matching set must be checked.
    pub fn find_options(&self) -> Result<FindOptions> {
        let mut opts: FindOptions = match &self.find_opts {
            Some(value) => serde_json::from_value(value.clone())?,
            None => FindOptions::default(),
        };
        opts.no_limit = true;
        Ok(opts)
    }
}
