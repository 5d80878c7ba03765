//! Worker output record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Opaque source descriptor attached to a worker result.
pub type Citation = BTreeMap<String, String>;

/// Scalar or list value stored in a result's auxiliary data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuxValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<AuxValue>),
}

impl AuxValue {
    /// Render the value for a human-readable data listing.
    ///
    /// Floats get two decimals, lists are comma-joined (`None` when empty) and
    /// empty or zero-like scalars render as `N/A`.
    pub fn render(&self) -> String {
        match self {
            AuxValue::Float(f) => format!("{:.2}", f),
            AuxValue::List(items) if items.is_empty() => "None".to_string(),
            AuxValue::List(items) => items
                .iter()
                .map(|item| item.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            AuxValue::Bool(false) | AuxValue::Int(0) => "N/A".to_string(),
            AuxValue::Text(s) if s.is_empty() => "N/A".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for AuxValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuxValue::Bool(b) => write!(f, "{}", b),
            AuxValue::Int(i) => write!(f, "{}", i),
            AuxValue::Float(x) => write!(f, "{}", x),
            AuxValue::Text(s) => write!(f, "{}", s),
            AuxValue::List(items) => {
                let joined = items
                    .iter()
                    .map(|item| item.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "[{}]", joined)
            }
        }
    }
}

impl From<bool> for AuxValue {
    fn from(v: bool) -> Self {
        AuxValue::Bool(v)
    }
}

impl From<i64> for AuxValue {
    fn from(v: i64) -> Self {
        AuxValue::Int(v)
    }
}

impl From<usize> for AuxValue {
    fn from(v: usize) -> Self {
        AuxValue::Int(v as i64)
    }
}

impl From<f64> for AuxValue {
    fn from(v: f64) -> Self {
        AuxValue::Float(v)
    }
}

impl From<&str> for AuxValue {
    fn from(v: &str) -> Self {
        AuxValue::Text(v.to_string())
    }
}

impl From<String> for AuxValue {
    fn from(v: String) -> Self {
        AuxValue::Text(v)
    }
}

impl<T: Into<AuxValue>> From<Vec<T>> for AuxValue {
    fn from(v: Vec<T>) -> Self {
        AuxValue::List(v.into_iter().map(Into::into).collect())
    }
}

/// Successful output of one worker.
///
/// Constructed once through [`WorkerResult::builder`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResult {
    worker_name: String,
    query: String,
    body: String,
    aux_data: BTreeMap<String, AuxValue>,
    confidence: f64,
    citations: Vec<Citation>,
    timestamp_created: DateTime<Utc>,
    duration_ms: u64,
}

impl WorkerResult {
    /// Start building a result for `worker_name` answering `query`.
    pub fn builder(
        worker_name: impl Into<String>,
        query: impl Into<String>,
        body: impl Into<String>,
    ) -> WorkerResultBuilder {
        WorkerResultBuilder {
            worker_name: worker_name.into(),
            query: query.into(),
            body: body.into(),
            aux_data: BTreeMap::new(),
            confidence: 0.0,
            citations: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }

    /// The sub-query this worker answered.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn aux_data(&self) -> &BTreeMap<String, AuxValue> {
        &self.aux_data
    }

    /// Confidence in `[0.0, 1.0]`.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    pub fn timestamp_created(&self) -> DateTime<Utc> {
        self.timestamp_created
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

/// Builder for [`WorkerResult`].
#[derive(Debug, Clone)]
pub struct WorkerResultBuilder {
    worker_name: String,
    query: String,
    body: String,
    aux_data: BTreeMap<String, AuxValue>,
    confidence: f64,
    citations: Vec<Citation>,
    duration: Duration,
}

impl WorkerResultBuilder {
    /// Add one auxiliary data entry, replacing an existing key.
    pub fn aux(mut self, key: impl Into<String>, value: impl Into<AuxValue>) -> Self {
        self.aux_data.insert(key.into(), value.into());
        self
    }

    /// Set the confidence; values outside `[0.0, 1.0]` are clamped and NaN becomes 0.
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        self
    }

    /// Append a citation. Citations keep insertion order and are never deduplicated.
    pub fn citation<K, V, I>(mut self, entries: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.citations.push(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Finish the result, stamping the creation time.
    pub fn build(self) -> WorkerResult {
        WorkerResult {
            worker_name: self.worker_name,
            query: self.query,
            body: self.body,
            aux_data: self.aux_data,
            confidence: self.confidence,
            citations: self.citations,
            timestamp_created: Utc::now(),
            duration_ms: self.duration.as_millis() as u64,
        }
    }
}
