use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Field every record carries; also the bucket's unique key field.
pub const KEY_FIELD: &str = "uuid";

/// Fields added by the version-1 schema update, one per indexable type.
pub const REINDEXED_STRING: &str = "reindexed_string";
pub const REINDEXED_BOOLEAN: &str = "reindexed_boolean";
pub const REINDEXED_NUMBER: &str = "reindexed_number";

/// Value types a bucket index can cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    String,
    Boolean,
    Number,
}

impl IndexType {
    /// The three reindexed fields, in the order the workflow verifies them.
    pub const ALL: [IndexType; 3] = [IndexType::String, IndexType::Boolean, IndexType::Number];

    pub fn reindexed_field(self) -> &'static str {
        match self {
            IndexType::String => REINDEXED_STRING,
            IndexType::Boolean => REINDEXED_BOOLEAN,
            IndexType::Number => REINDEXED_NUMBER,
        }
    }

    /// Whether a JSON value is acceptable for this index type.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            IndexType::String => value.is_string(),
            IndexType::Boolean => value.is_boolean(),
            IndexType::Number => value.is_number(),
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexType::String => write!(f, "string"),
            IndexType::Boolean => write!(f, "boolean"),
            IndexType::Number => write!(f, "number"),
        }
    }
}

/// One indexed field in a bucket schema.
/// Wire shape: `{ "type": "string" | "boolean" | "number" }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexField {
    #[serde(rename = "type")]
    pub field_type: IndexType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BucketOptions {
    pub version: u32,
}

/// A bucket's versioned schema.
/// Wire shape: `{ "index": { field: { "type": ... } }, "options": { "version": n } }`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BucketConfig {
    pub index: BTreeMap<String, IndexField>,
    pub options: BucketOptions,
}

impl BucketConfig {
    pub fn new(version: u32) -> Self {
        BucketConfig {
            index: BTreeMap::new(),
            options: BucketOptions { version },
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, field_type: IndexType) -> Self {
        self.index.insert(name.into(), IndexField { field_type });
        self
    }

    /// Initial schema: only the unique key field is indexed.
    pub fn initial() -> Self {
        BucketConfig::new(0).with_field(KEY_FIELD, IndexType::String)
    }

    /// Target schema: version 1, adds one indexed field per type. Records
    /// written before a reindex completes are not queryable on these.
    pub fn target() -> Self {
        BucketConfig::new(1)
            .with_field(KEY_FIELD, IndexType::String)
            .with_field(REINDEXED_STRING, IndexType::String)
            .with_field(REINDEXED_BOOLEAN, IndexType::Boolean)
            .with_field(REINDEXED_NUMBER, IndexType::Number)
    }
}

/// A bucket as reported by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    #[serde(flatten)]
    pub config: BucketConfig,
}

/// A stored record: unique key plus its field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub value: Map<String, Value>,
}

/// Progress report from one reindex chunk call. `remaining == 0` is the
/// drain loop's terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexStatus {
    pub remaining: u64,
}

/// The fixed sentinel value for an index type. Sentinel records carry these
/// so a filtered scan can be checked against a known cohort size.
pub fn sentinel_value(field_type: IndexType) -> Value {
    match field_type {
        IndexType::String => Value::from("sentinel"),
        IndexType::Boolean => Value::from(true),
        IndexType::Number => Value::from(42),
    }
}

/// The non-sentinel counterpart: same type, guaranteed to never match a
/// sentinel filter.
pub fn non_sentinel_value(field_type: IndexType) -> Value {
    match field_type {
        IndexType::String => Value::from("nonSentinel"),
        IndexType::Boolean => Value::from(false),
        IndexType::Number => Value::from(24),
    }
}

/// Immutable field template for one test cohort. Each inserted record is a
/// clone of the template with a fresh unique key merged in.
#[derive(Debug, Clone)]
pub struct ObjectTemplate {
    fields: Map<String, Value>,
}

impl ObjectTemplate {
    pub fn new(fields: Map<String, Value>) -> Self {
        ObjectTemplate { fields }
    }

    /// Template for the sentinel cohort: every reindexed field carries its
    /// sentinel value.
    pub fn sentinel() -> Self {
        let mut fields = Map::new();
        for ty in IndexType::ALL {
            fields.insert(ty.reindexed_field().to_string(), sentinel_value(ty));
        }
        ObjectTemplate { fields }
    }

    pub fn non_sentinel() -> Self {
        let mut fields = Map::new();
        for ty in IndexType::ALL {
            fields.insert(ty.reindexed_field().to_string(), non_sentinel_value(ty));
        }
        ObjectTemplate { fields }
    }

    /// Clone the template and merge in the record's unique key.
    pub fn instantiate(&self, key: &str) -> Map<String, Value> {
        let mut value = self.fields.clone();
        value.insert(KEY_FIELD.to_string(), Value::from(key));
        value
    }
}

/// Structured scan filter, rendered LDAP-style for logging and the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `(field=*)` — the field is present (and non-null).
    Present(String),
    /// `(field=value)` — exact match.
    Eq(String, Value),
    /// `(&(a)(b)...)` — conjunction.
    And(Vec<Filter>),
}

impl Filter {
    pub fn present(field: impl Into<String>) -> Self {
        Filter::Present(field.into())
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    /// Evaluate against a record's field map.
    pub fn matches(&self, value: &Map<String, Value>) -> bool {
        match self {
            Filter::Present(field) => value.get(field).is_some_and(|v| !v.is_null()),
            Filter::Eq(field, expected) => value.get(field) == Some(expected),
            Filter::And(filters) => filters.iter().all(|f| f.matches(value)),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Present(field) => write!(f, "({}=*)", field),
            Filter::Eq(field, value) => match value {
                Value::String(s) => write!(f, "({}={})", field, s),
                other => write!(f, "({}={})", field, other),
            },
            Filter::And(filters) => {
                write!(f, "(&")?;
                for inner in filters {
                    write!(f, "{}", inner)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Options forwarded to a filtered scan. Free-form JSON from the command
/// line deserializes into this; unrecognized keys ride along in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_bucket_version: Option<u32>,
    #[serde(default)]
    pub no_limit: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What a verification pass expects from a scan.
#[derive(Debug, Clone, Default)]
pub struct Expectation {
    pub expected_count: Option<u64>,
    pub properties: Vec<ExpectedProperty>,
}

#[derive(Debug, Clone)]
pub struct ExpectedProperty {
    pub name: String,
    pub value: Value,
}
