use crate::error::{Result, StoreError};
use crate::types::{Bucket, BucketConfig, Filter, FindOptions, Record, ReindexStatus};
use serde_json::{Map, Value};
use std::future::Future;
use tokio::sync::mpsc;

/// Async contract the workflow consumes from a store.
///
/// Every method is a suspension point. `connect` must complete before any
/// other call; `close` releases the connection and is always called, success
/// or failure. Implementations are shared behind an `Arc`, so methods take
/// `&self`.
pub trait StoreGateway: Send + Sync + 'static {
    fn connect(&self) -> impl Future<Output = Result<()>> + Send;

    /// Fetch a bucket. A missing bucket is reported as
    /// [`StoreError::BucketNotFound`], which callers may treat as benign.
    fn get_bucket(&self, name: &str) -> impl Future<Output = Result<Bucket>> + Send;

    fn create_bucket(
        &self,
        name: &str,
        config: &BucketConfig,
    ) -> impl Future<Output = Result<()>> + Send;

    fn update_bucket(
        &self,
        name: &str,
        config: &BucketConfig,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_bucket(&self, name: &str) -> impl Future<Output = Result<()>> + Send;

    /// Insert one record. Duplicate-key and invalid-index-type failures are
    /// fatal for population; anything else is transient (see
    /// [`StoreError::is_fatal_put`]).
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        value: Map<String, Value>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Reindex up to `chunk_size` not-yet-indexed records and report how
    /// many remain.
    fn reindex_objects(
        &self,
        bucket: &str,
        chunk_size: usize,
    ) -> impl Future<Output = Result<ReindexStatus>> + Send;

    /// Start a filtered scan. The result is lazy: records arrive through the
    /// returned stream and the full set is never materialized by the gateway.
    fn find_objects(
        &self,
        bucket: &str,
        filter: &Filter,
        opts: &FindOptions,
    ) -> impl Future<Output = Result<RecordStream>> + Send;

    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// Lazy sequence of scan results.
///
/// End-of-results is signalled by the producer dropping its [`RecordSink`];
/// a scan failure arrives as a final `Err` item. Backed by a bounded channel
/// so a slow consumer applies back-pressure instead of buffering the whole
/// result set.
#[derive(Debug)]
pub struct RecordStream {
    rx: mpsc::Receiver<Result<Record>>,
}

impl RecordStream {
    /// Create a connected sink/stream pair.
    pub fn channel(capacity: usize) -> (RecordSink, RecordStream) {
        let (tx, rx) = mpsc::channel(capacity);
        (RecordSink { tx }, RecordStream { rx })
    }

    /// Next record, `Some(Err(_))` on scan failure, or `None` once the
    /// producer has finished.
    pub async fn next(&mut self) -> Option<Result<Record>> {
        self.rx.recv().await
    }
}

/// Producer half of a [`RecordStream`]. Dropping it ends the stream.
pub struct RecordSink {
    tx: mpsc::Sender<Result<Record>>,
}

impl RecordSink {
    /// Send one record. Returns `false` if the consumer is gone, at which
    /// point the producer should stop.
    pub async fn record(&self, record: Record) -> bool {
        self.tx.send(Ok(record)).await.is_ok()
    }

    /// Terminate the stream with an error.
    pub async fn error(self, error: StoreError) {
        let _ = self.tx.send(Err(error)).await;
    }
}
