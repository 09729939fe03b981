use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::JobType;

/// What this node can do, sent to the coordinator on registration.
///
/// The static part (hardware, supported job types) is fixed at construction;
/// `is_available` and `last_heartbeat` change over the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub device_id: String,
    pub device_model: String,
    pub os_version: String,
    pub supported_frameworks: Vec<String>,
    pub supported_job_types: Vec<JobType>,
    pub total_memory_mb: u64,
    pub cpu_cores: usize,
    pub has_neural_engine: bool,
    pub has_gpu_support: bool,
    /// Job types this node runs best, most preferred first.
    pub preferred_job_types: Vec<JobType>,
    pub max_concurrent_jobs: usize,
    /// Average completion time per job type, in seconds.
    pub avg_completion_time: BTreeMap<JobType, f64>,
    pub is_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl CapabilityDescriptor {
    /// Describe the current host for the given job types.
    pub fn for_host(
        device_id: impl Into<String>,
        supported_job_types: Vec<JobType>,
        max_concurrent_jobs: usize,
    ) -> Self {
        let supported_job_types: Vec<JobType> = supported_job_types
            .into_iter()
            .filter(|t| *t != JobType::Unknown)
            .collect();
        let avg_completion_time = supported_job_types
            .iter()
            .map(|t| (*t, t.typical_duration_seconds()))
            .collect();
        let cpu_cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            device_id: device_id.into(),
            device_model: std::env::consts::ARCH.to_string(),
            os_version: std::env::consts::OS.to_string(),
            supported_frameworks: Vec::new(),
            preferred_job_types: supported_job_types.clone(),
            supported_job_types,
            total_memory_mb: 0,
            cpu_cores,
            has_neural_engine: false,
            has_gpu_support: false,
            max_concurrent_jobs,
            avg_completion_time,
            is_available: true,
            last_heartbeat: None,
        }
    }

    pub fn with_total_memory_mb(mut self, megabytes: u64) -> Self {
        self.total_memory_mb = megabytes;
        self
    }

    pub fn supports(&self, job_type: JobType) -> bool {
        self.supported_job_types.contains(&job_type)
    }

    /// Record a heartbeat and the node's current availability.
    pub fn touch(&mut self, now: DateTime<Utc>, available: bool) {
        self.last_heartbeat = Some(now);
        self.is_available = available;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_host_drops_unknown_types() {
        let caps = CapabilityDescriptor::for_host(
            "dev-1",
            vec![JobType::Ocr, JobType::Unknown, JobType::TextEmbedding],
            1,
        );
        assert_eq!(caps.supported_job_types, vec![JobType::Ocr, JobType::TextEmbedding]);
        assert!(caps.supports(JobType::Ocr));
        assert!(!caps.supports(JobType::Unknown));
        assert_eq!(caps.avg_completion_time[&JobType::Ocr], 2.0);
        assert!(caps.cpu_cores >= 1);
    }

    #[test]
    fn serializes_completion_times_keyed_by_wire_name() {
        let caps = CapabilityDescriptor::for_host("dev-1", vec![JobType::SentimentAnalysis], 1);
        let json = serde_json::to_value(&caps).unwrap();
        assert_eq!(json["avg_completion_time"]["sentiment_analysis"], 0.2);
        assert_eq!(json["supported_job_types"][0], "sentiment_analysis");
        assert_eq!(json["max_concurrent_jobs"], 1);
    }

    #[test]
    fn touch_updates_heartbeat() {
        let mut caps = CapabilityDescriptor::for_host("dev-1", vec![JobType::Ocr], 1);
        let now = Utc::now();
        caps.touch(now, false);
        assert_eq!(caps.last_heartbeat, Some(now));
        assert!(!caps.is_available);
    }
}
