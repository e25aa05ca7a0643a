use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Bucket operation failed on {bucket}: {reason}")]
    Bucket { bucket: String, reason: String },

    #[error("Duplicate key {key} in bucket {bucket}")]
    DuplicateKey { bucket: String, key: String },

    #[error("Invalid value for indexed field {field}: expected {expected}")]
    InvalidIndexType { field: String, expected: String },

    #[error("Put failed in bucket {bucket}: {reason}")]
    Put { bucket: String, reason: String },

    #[error("Reindex failed in bucket {bucket}: {reason}")]
    Reindex { bucket: String, reason: String },

    #[error("Scan failed in bucket {bucket}: {reason}")]
    Scan { bucket: String, reason: String },

    #[error("Verification failed: {0}")]
    Verification(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("JSON error: {0}")]
    Json(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// A missing bucket is benign for provisioning: it means "create it".
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::BucketNotFound(_))
    }

    /// Put failures that indicate a schema or key problem. Retrying these
    /// with a different key cannot succeed, so they abort population.
    /// Every other put failure is treated as transient.
    pub fn is_fatal_put(&self) -> bool {
        matches!(
            self,
            StoreError::DuplicateKey { .. } | StoreError::InvalidIndexType { .. }
        )
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Json(e.to_string())
    }
}
