use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ParseJobTypeError, TransitionError};

/// Kind of work a job carries. Determines which executor handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    ImageClassification,
    TextEmbedding,
    Ocr,
    ObjectDetection,
    SentimentAnalysis,
    AudioTranscription,
    /// Any type this build does not recognise. Never executable.
    #[serde(other)]
    Unknown,
}

impl JobType {
    /// Every executable job type, in wire order.
    pub const ALL: [JobType; 6] = [
        JobType::ImageClassification,
        JobType::TextEmbedding,
        JobType::Ocr,
        JobType::ObjectDetection,
        JobType::SentimentAnalysis,
        JobType::AudioTranscription,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::ImageClassification => "image_classification",
            JobType::TextEmbedding => "text_embedding",
            JobType::Ocr => "ocr",
            JobType::ObjectDetection => "object_detection",
            JobType::SentimentAnalysis => "sentiment_analysis",
            JobType::AudioTranscription => "audio_transcription",
            JobType::Unknown => "unknown",
        }
    }

    /// Typical completion time advertised to the coordinator before any
    /// local measurements exist.
    pub fn typical_duration_seconds(&self) -> f64 {
        match self {
            JobType::ImageClassification => 0.5,
            JobType::TextEmbedding => 0.3,
            JobType::Ocr => 2.0,
            JobType::ObjectDetection => 1.0,
            JobType::SentimentAnalysis => 0.2,
            JobType::AudioTranscription => 5.0,
            JobType::Unknown => 0.0,
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = ParseJobTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        JobType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| ParseJobTypeError(s.to_string()))
    }
}

/// Lifecycle state of a job.
///
/// `Pending` is only ever observed on the coordinator side. A worker drives
/// `Claimed -> Executing -> terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Claimed,
    Executing,
    Completed,
    Failed,
    Cancelled,
    Timeout,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled | JobStatus::Timeout
        )
    }

    /// Whether `claimed_at` must be set for a job in this state.
    pub fn is_claimed(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Pending, JobStatus::Claimed) => true,
            (JobStatus::Claimed, JobStatus::Executing) => true,
            // A claimed job with no executor is failed or cancelled without running.
            (JobStatus::Claimed, JobStatus::Failed | JobStatus::Cancelled) => true,
            (JobStatus::Executing, next) => next.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Claimed => "claimed",
            JobStatus::Executing => "executing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Timeout => "timeout",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_status() -> JobStatus {
    JobStatus::Pending
}

/// A unit of work offered by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Opaque, coordinator-assigned identifier.
    pub id: String,
    pub job_type: JobType,
    #[serde(default = "default_status")]
    pub status: JobStatus,
    /// Raw input payload (base64 on the wire).
    #[serde(rename = "input_data", with = "crate::wire::base64_bytes", default)]
    pub input: Vec<u8>,
    #[serde(default)]
    pub reward_credits: u64,
    /// Execution ceiling in seconds. 0 means "use the worker default".
    #[serde(rename = "max_duration_sec", default)]
    pub max_duration_seconds: u64,
    /// Higher is preferred. Ordering is the coordinator's job.
    #[serde(default)]
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_memory_mb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cpu_percent: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a pending job with default limits.
    pub fn new(id: impl Into<String>, job_type: JobType, input: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            job_type,
            status: JobStatus::Pending,
            input,
            reward_credits: 0,
            max_duration_seconds: 0,
            priority: 0,
            metadata: None,
            estimated_memory_mb: None,
            estimated_cpu_percent: None,
            created_at: Some(Utc::now()),
            claimed_at: None,
            completed_at: None,
        }
    }

    pub fn with_max_duration(mut self, seconds: u64) -> Self {
        self.max_duration_seconds = seconds;
        self
    }

    pub fn with_reward(mut self, credits: u64) -> Self {
        self.reward_credits = credits;
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Hard execution deadline: the job's own ceiling when positive,
    /// otherwise `default`.
    pub fn deadline(&self, default: Duration) -> Duration {
        if self.max_duration_seconds > 0 {
            Duration::from_secs(self.max_duration_seconds)
        } else {
            default
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Record a successful claim. A job the coordinator already reports as
    /// claimed only gets its missing timestamp filled in.
    pub fn mark_claimed(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status == JobStatus::Claimed {
            self.claimed_at.get_or_insert(at);
            self.completed_at = None;
            return Ok(());
        }
        self.transition(JobStatus::Claimed, at)
    }

    pub fn start_executing(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Executing, at)
    }

    /// Move the job into a terminal state.
    pub fn finish(&mut self, status: JobStatus, at: DateTime<Utc>) -> Result<(), TransitionError> {
        if !status.is_terminal() {
            return Err(self.transition_error(status));
        }
        self.transition(status, at)
    }

    /// Apply one state-machine step, keeping the timestamps consistent with
    /// the new status.
    pub fn transition(&mut self, next: JobStatus, at: DateTime<Utc>) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(self.transition_error(next));
        }
        self.status = next;
        if next.is_claimed() {
            self.claimed_at.get_or_insert(at);
        }
        if next.is_terminal() {
            self.completed_at = Some(at);
        }
        Ok(())
    }

    /// `claimed_at` is set iff the job has been claimed, and `completed_at`
    /// iff it is terminal.
    pub fn timestamps_consistent(&self) -> bool {
        self.claimed_at.is_some() == self.status.is_claimed()
            && self.completed_at.is_some() == self.status.is_terminal()
    }

    fn transition_error(&self, to: JobStatus) -> TransitionError {
        TransitionError {
            job_id: self.id.clone(),
            from: self.status,
            to,
        }
    }
}
