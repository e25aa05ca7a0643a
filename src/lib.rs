//! Benchmark and validation harness for the reindexing feature of
//! bucket-based object stores.
//!
//! When a bucket's schema gains new indexed fields, records written before
//! the change only become queryable on those fields after a chunked reindex
//! backfill completes. This crate drives that workflow end to end against a
//! [`gateway::StoreGateway`]: provision a bucket through a schema upgrade,
//! bulk-populate two record cohorts under bounded concurrency, drain the
//! reindex queue, then verify filtered scans return the expected cohort.

pub mod config;
pub mod drain;
pub mod error;
pub mod gateway;
pub mod http;
pub mod populate;
pub mod provision;
pub mod types;
pub mod verify;
pub mod workflow;

pub use config::BenchConfig;
pub use error::{Result, StoreError};
pub use gateway::{RecordSink, RecordStream, StoreGateway};
pub use http::HttpGateway;
pub use provision::ResetPolicy;
pub use workflow::{ReindexWorkflow, RunReport};
