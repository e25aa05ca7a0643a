use crate::error::{Result, StoreError};
use crate::gateway::{RecordSink, RecordStream, StoreGateway};
use crate::types::{Bucket, BucketConfig, Filter, FindOptions, Record, ReindexStatus};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const FIND_STREAM_BUFFER: usize = 64;

#[derive(Serialize)]
struct FindRequest<'a> {
    filter: String,
    options: &'a FindOptions,
}

#[derive(Serialize)]
struct ReindexRequest {
    count: usize,
}

/// [`StoreGateway`] over the store's JSON HTTP API.
///
/// Scan results arrive as newline-delimited JSON and are decoded
/// incrementally into a [`RecordStream`]; the gateway never buffers the
/// full result set. No overall request timeout is set because uncapped
/// scans can legitimately run long; only connection establishment is
/// bounded.
pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        HttpGateway {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn bucket_url(&self, name: &str) -> String {
        format!("{}/buckets/{}", self.base_url, name)
    }

    fn bucket_error(bucket: &str, detail: impl std::fmt::Display) -> StoreError {
        StoreError::Bucket {
            bucket: bucket.to_string(),
            reason: detail.to_string(),
        }
    }
}

impl StoreGateway for HttpGateway {
    async fn connect(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Connection(format!(
                "store returned {}",
                response.status()
            )));
        }
        tracing::debug!(url = %self.base_url, "connected to store");
        Ok(())
    }

    async fn get_bucket(&self, name: &str) -> Result<Bucket> {
        let response = self
            .client
            .get(&self.bucket_url(name))
            .send()
            .await
            .map_err(|e| Self::bucket_error(name, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::BucketNotFound(name.to_string())),
            status if status.is_success() => {
                response.json().await.map_err(|e| Self::bucket_error(name, e))
            }
            status => Err(Self::bucket_error(name, format!("store returned {}", status))),
        }
    }

    async fn create_bucket(&self, name: &str, config: &BucketConfig) -> Result<()> {
        let response = self
            .client
            .post(&self.bucket_url(name))
            .json(config)
            .send()
            .await
            .map_err(|e| Self::bucket_error(name, e))?;

        if !response.status().is_success() {
            return Err(Self::bucket_error(
                name,
                format!("create returned {}", response.status()),
            ));
        }
        Ok(())
    }

    async fn update_bucket(&self, name: &str, config: &BucketConfig) -> Result<()> {
        let response = self
            .client
            .put(&self.bucket_url(name))
            .json(config)
            .send()
            .await
            .map_err(|e| Self::bucket_error(name, e))?;

        if !response.status().is_success() {
            return Err(Self::bucket_error(
                name,
                format!("update returned {}", response.status()),
            ));
        }
        Ok(())
    }

    async fn delete_bucket(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .delete(&self.bucket_url(name))
            .send()
            .await
            .map_err(|e| Self::bucket_error(name, e))?;

        if !response.status().is_success() {
            return Err(Self::bucket_error(
                name,
                format!("delete returned {}", response.status()),
            ));
        }
        Ok(())
    }

    async fn put_object(&self, bucket: &str, key: &str, value: Map<String, Value>) -> Result<()> {
        let url = format!("{}/objects/{}", self.bucket_url(bucket), key);
        let response = self
            .client
            .put(&url)
            .json(&value)
            .send()
            .await
            .map_err(|e| StoreError::Put {
                bucket: bucket.to_string(),
                reason: e.to_string(),
            })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(StoreError::DuplicateKey {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            StatusCode::UNPROCESSABLE_ENTITY => {
                let detail = response.text().await.unwrap_or_default();
                Err(StoreError::InvalidIndexType {
                    field: detail,
                    expected: "schema index type".to_string(),
                })
            }
            status => Err(StoreError::Put {
                bucket: bucket.to_string(),
                reason: format!("store returned {}", status),
            }),
        }
    }

    async fn reindex_objects(&self, bucket: &str, chunk_size: usize) -> Result<ReindexStatus> {
        let url = format!("{}/reindex", self.bucket_url(bucket));
        let response = self
            .client
            .post(&url)
            .json(&ReindexRequest { count: chunk_size })
            .send()
            .await
            .map_err(|e| StoreError::Reindex {
                bucket: bucket.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(StoreError::Reindex {
                bucket: bucket.to_string(),
                reason: format!("store returned {}", response.status()),
            });
        }

        response.json().await.map_err(|e| StoreError::Reindex {
            bucket: bucket.to_string(),
            reason: e.to_string(),
        })
    }

    async fn find_objects(
        &self,
        bucket: &str,
        filter: &Filter,
        opts: &FindOptions,
    ) -> Result<RecordStream> {
        let url = format!("{}/find", self.bucket_url(bucket));
        let response = self
            .client
            .post(&url)
            .json(&FindRequest {
                filter: filter.to_string(),
                options: opts,
            })
            .send()
            .await
            .map_err(|e| StoreError::Scan {
                bucket: bucket.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(StoreError::Scan {
                bucket: bucket.to_string(),
                reason: format!("store returned {}", response.status()),
            });
        }

        let (sink, stream) = RecordStream::channel(FIND_STREAM_BUFFER);
        let bucket = bucket.to_string();
        tokio::spawn(pump_ndjson(response, sink, bucket));
        Ok(stream)
    }

    async fn close(&self) {
        // reqwest connections are pooled and released on drop.
        tracing::debug!(url = %self.base_url, "closing store connection");
    }
}

/// Decode newline-delimited JSON records from the response body into the
/// sink. Dropping the sink signals end-of-results; a decode or transport
/// failure terminates the stream with a scan error.
async fn pump_ndjson(mut response: reqwest::Response, sink: RecordSink, bucket: String) {
    let mut buf: Vec<u8> = Vec::new();

    loop {
        match response.chunk().await {
            Ok(Some(bytes)) => {
                buf.extend_from_slice(&bytes);
                while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    match decode_line(&line[..line.len() - 1]) {
                        Ok(None) => {}
                        Ok(Some(record)) => {
                            if !sink.record(record).await {
                                return;
                            }
                        }
                        Err(e) => {
                            sink.error(scan_error(&bucket, e)).await;
                            return;
                        }
                    }
                }
            }
            Ok(None) => {
                // Body finished; a final record may lack the trailing newline.
                match decode_line(&buf) {
                    Ok(None) => {}
                    Ok(Some(record)) => {
                        sink.record(record).await;
                    }
                    Err(e) => {
                        sink.error(scan_error(&bucket, e)).await;
                    }
                }
                return;
            }
            Err(e) => {
                sink.error(scan_error(&bucket, e)).await;
                return;
            }
        }
    }
}

fn decode_line(line: &[u8]) -> std::result::Result<Option<Record>, serde_json::Error> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(line).map(Some)
}

fn scan_error(bucket: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::Scan {
        bucket: bucket.to_string(),
        reason: detail.to_string(),
    }
}
