use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of one claimed job, produced exactly once by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: String,
    pub success: bool,
    /// Raw executor output (base64 on the wire).
    #[serde(
        rename = "result_data",
        with = "crate::wire::base64_bytes_opt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub output_payload: Option<Vec<u8>>,
    /// Executor confidence in 0.0..=1.0, when meaningful.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_output: Option<Map<String, Value>>,
    /// Present iff `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(rename = "execution_time_sec")]
    pub execution_time_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_memory_mb: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl JobResult {
    pub fn success(job_id: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            job_id: job_id.into(),
            success: true,
            output_payload: None,
            confidence: None,
            structured_output: None,
            error_message: None,
            execution_time_seconds: elapsed.as_secs_f64(),
            peak_memory_mb: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(job_id: impl Into<String>, message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            job_id: job_id.into(),
            success: false,
            output_payload: None,
            confidence: None,
            structured_output: None,
            error_message: Some(message.into()),
            execution_time_seconds: elapsed.as_secs_f64(),
            peak_memory_mb: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_output(mut self, payload: Vec<u8>) -> Self {
        self.output_payload = Some(payload);
        self
    }

    /// Attach a confidence score, clamped into 0.0..=1.0. Non-finite values
    /// are dropped.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.is_finite().then(|| confidence.clamp(0.0, 1.0));
        self
    }

    pub fn with_structured_output(mut self, output: Map<String, Value>) -> Self {
        self.structured_output = Some(output);
        self
    }

    pub fn with_peak_memory_mb(mut self, megabytes: f64) -> Self {
        self.peak_memory_mb = Some(megabytes);
        self
    }

    /// `error_message` is present iff the result is a failure.
    pub fn is_consistent(&self) -> bool {
        self.success == self.error_message.is_none() && self.execution_time_seconds >= 0.0
    }
}
