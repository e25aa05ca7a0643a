//! Shared test fixture: an in-memory store gateway with fault injection.
//!
//! Index-debt model (one schema epoch, which is all the workflow exercises):
//! a bucket update that bumps the version starts a backfill epoch, and every
//! record written during it joins the unindexed set. Reindex calls remove up
//! to a chunk of that set; scans that require the new schema version are
//! rejected while the set is non-empty.
#![allow(dead_code)]

use reindex_bench::error::{Result, StoreError};
use reindex_bench::gateway::{RecordStream, StoreGateway};
use reindex_bench::types::{Bucket, BucketConfig, Filter, FindOptions, Record, ReindexStatus};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct SimBucket {
    config: BucketConfig,
    records: BTreeMap<String, Map<String, Value>>,
    unindexed: Vec<String>,
    backfill_pending: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    buckets: Mutex<HashMap<String, SimBucket>>,
    puts_issued: AtomicU64,
    reindex_calls: AtomicU64,
    inflight_puts: AtomicU64,
    max_inflight_puts: AtomicU64,
    transient_put_failures: Mutex<u64>,
    fatal_put: Mutex<Option<(u64, StoreError)>>,
    scripted_reindex: Mutex<VecDeque<Result<u64>>>,
    connected: AtomicBool,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    // -- fault injection --

    /// Fail the next `n` puts with a transient error.
    pub fn fail_next_puts_transient(&self, n: u64) {
        *self.transient_put_failures.lock().unwrap() = n;
    }

    /// Fail the `nth` put (1-based, counted across the store) with `error`.
    pub fn fail_put_fatal(&self, nth: u64, error: StoreError) {
        *self.fatal_put.lock().unwrap() = Some((nth, error));
    }

    /// Override reindex results with a fixed `remaining` sequence.
    pub fn script_reindex(&self, remaining: impl IntoIterator<Item = u64>) {
        self.scripted_reindex
            .lock()
            .unwrap()
            .extend(remaining.into_iter().map(Ok));
    }

    pub fn fail_next_reindex(&self, bucket: &str, reason: &str) {
        self.scripted_reindex
            .lock()
            .unwrap()
            .push_back(Err(StoreError::Reindex {
                bucket: bucket.to_string(),
                reason: reason.to_string(),
            }));
    }

    // -- observation --

    pub fn puts_issued(&self) -> u64 {
        self.puts_issued.load(Ordering::SeqCst)
    }

    pub fn reindex_calls(&self) -> u64 {
        self.reindex_calls.load(Ordering::SeqCst)
    }

    pub fn max_inflight_puts(&self) -> u64 {
        self.max_inflight_puts.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn record_count(&self, bucket: &str) -> usize {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .map_or(0, |b| b.records.len())
    }

    pub fn unindexed_count(&self, bucket: &str) -> usize {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .map_or(0, |b| b.unindexed.len())
    }

    pub fn bucket_version(&self, bucket: &str) -> Option<u32> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .map(|b| b.config.options.version)
    }

    fn do_put(&self, bucket: &str, key: &str, value: Map<String, Value>) -> Result<()> {
        let nth = self.puts_issued.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some((at, error)) = &*self.fatal_put.lock().unwrap() {
            if *at == nth {
                return Err(error.clone());
            }
        }
        {
            let mut transient = self.transient_put_failures.lock().unwrap();
            if *transient > 0 {
                *transient -= 1;
                return Err(StoreError::Put {
                    bucket: bucket.to_string(),
                    reason: "injected transient failure".to_string(),
                });
            }
        }

        let mut buckets = self.buckets.lock().unwrap();
        let b = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;

        if b.records.contains_key(key) {
            return Err(StoreError::DuplicateKey {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        for (field, index) in &b.config.index {
            if let Some(v) = value.get(field) {
                if !v.is_null() && !index.field_type.accepts(v) {
                    return Err(StoreError::InvalidIndexType {
                        field: field.clone(),
                        expected: index.field_type.to_string(),
                    });
                }
            }
        }

        if b.backfill_pending {
            b.unindexed.push(key.to_string());
        }
        b.records.insert(key.to_string(), value);
        Ok(())
    }
}

impl StoreGateway for MemoryStore {
    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn get_bucket(&self, name: &str) -> Result<Bucket> {
        self.buckets
            .lock()
            .unwrap()
            .get(name)
            .map(|b| Bucket {
                name: name.to_string(),
                config: b.config.clone(),
            })
            .ok_or_else(|| StoreError::BucketNotFound(name.to_string()))
    }

    async fn create_bucket(&self, name: &str, config: &BucketConfig) -> Result<()> {
        let mut buckets = self.buckets.lock().unwrap();
        if buckets.contains_key(name) {
            return Err(StoreError::Bucket {
                bucket: name.to_string(),
                reason: "bucket already exists".to_string(),
            });
        }
        buckets.insert(
            name.to_string(),
            SimBucket {
                config: config.clone(),
                ..SimBucket::default()
            },
        );
        Ok(())
    }

    async fn update_bucket(&self, name: &str, config: &BucketConfig) -> Result<()> {
        let mut buckets = self.buckets.lock().unwrap();
        let b = buckets
            .get_mut(name)
            .ok_or_else(|| StoreError::BucketNotFound(name.to_string()))?;

        if config.options.version < b.config.options.version {
            return Err(StoreError::Bucket {
                bucket: name.to_string(),
                reason: "schema version must not decrease".to_string(),
            });
        }
        if config.options.version > b.config.options.version {
            b.backfill_pending = true;
            let existing: Vec<String> = b.records.keys().cloned().collect();
            b.unindexed = existing;
        }
        b.config = config.clone();
        Ok(())
    }

    async fn delete_bucket(&self, name: &str) -> Result<()> {
        self.buckets.lock().unwrap().remove(name);
        Ok(())
    }

    async fn put_object(&self, bucket: &str, key: &str, value: Map<String, Value>) -> Result<()> {
        let inflight = self.inflight_puts.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_inflight_puts.fetch_max(inflight, Ordering::SeqCst);
        // Suspend once so the rest of the wave gets issued before any put
        // completes, making the concurrency high-water mark observable.
        tokio::task::yield_now().await;

        let result = self.do_put(bucket, key, value);
        self.inflight_puts.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn reindex_objects(&self, bucket: &str, chunk_size: usize) -> Result<ReindexStatus> {
        self.reindex_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(scripted) = self.scripted_reindex.lock().unwrap().pop_front() {
            return scripted.map(|remaining| ReindexStatus { remaining });
        }

        let mut buckets = self.buckets.lock().unwrap();
        let b = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;

        let processed = chunk_size.min(b.unindexed.len());
        b.unindexed.drain(..processed);
        Ok(ReindexStatus {
            remaining: b.unindexed.len() as u64,
        })
    }

    async fn find_objects(
        &self,
        bucket: &str,
        filter: &Filter,
        opts: &FindOptions,
    ) -> Result<RecordStream> {
        let matching: Vec<Record> = {
            let buckets = self.buckets.lock().unwrap();
            let b = buckets
                .get(bucket)
                .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;

            if let Some(required) = opts.required_bucket_version {
                if required > b.config.options.version {
                    return Err(StoreError::Scan {
                        bucket: bucket.to_string(),
                        reason: format!(
                            "bucket at version {}, version {} required",
                            b.config.options.version, required
                        ),
                    });
                }
                if required > 0 && !b.unindexed.is_empty() {
                    return Err(StoreError::Scan {
                        bucket: bucket.to_string(),
                        reason: format!(
                            "reindex in progress, {} objects not yet indexed",
                            b.unindexed.len()
                        ),
                    });
                }
            }

            b.records
                .iter()
                .filter(|(_, value)| filter.matches(value))
                .map(|(key, value)| Record {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect()
        };

        let (sink, stream) = RecordStream::channel(32);
        tokio::spawn(async move {
            for record in matching {
                if !sink.record(record).await {
                    return;
                }
            }
        });
        Ok(stream)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
