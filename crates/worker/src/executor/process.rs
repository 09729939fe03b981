//! Executor that hands the job to an external program.
//!
//! The job input is written to the child's stdin and stdout becomes the
//! result payload. A stdout that parses as a JSON object is also attached as
//! structured output, with its `confidence` field (if numeric) lifted onto
//! the result. A non-zero exit status fails the job.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::debug;

use edgeloop_core::{ExecutorCommand, Job, JobResult, JobType};

use super::{ExecutorError, JobExecutor};

#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    job_type: JobType,
    program: String,
    args: Vec<String>,
}

impl ProcessExecutor {
    pub fn new(job_type: JobType, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            job_type,
            program: program.into(),
            args,
        }
    }

    pub fn from_command(job_type: JobType, command: &ExecutorCommand) -> Self {
        Self::new(job_type, command.command.clone(), command.args.clone())
    }
}

#[async_trait]
impl JobExecutor for ProcessExecutor {
    fn job_type(&self) -> JobType {
        self.job_type
    }

    async fn execute(&self, job: &Job) -> Result<JobResult, ExecutorError> {
        let started = Instant::now();
        debug!(job_id = %job.id, program = %self.program, "spawning executor process");

        // Dropping the future (deadline fired) drops the child and kills it.
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("EDGELOOP_JOB_ID", &job.id)
            .env("EDGELOOP_JOB_TYPE", job.job_type.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take();
        let write_input = async move {
            if let Some(mut stdin) = stdin {
                match stdin.write_all(&job.input).await {
                    // The program may exit without reading its input.
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                    other => other?,
                }
            }
            Ok::<_, std::io::Error>(())
        };
        let (written, output) = tokio::join!(write_input, child.wait_with_output());
        let output = output?;
        written?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = match stderr.trim() {
                "" => format!("exit status {}", output.status.code().unwrap_or(-1)),
                msg => msg.to_string(),
            };
            return Err(ExecutorError::Failed(reason));
        }

        let mut result = JobResult::success(&job.id, started.elapsed());
        if let Ok(serde_json::Value::Object(map)) =
            serde_json::from_slice::<serde_json::Value>(&output.stdout)
        {
            if let Some(confidence) = map.get("confidence").and_then(|v| v.as_f64()) {
                result = result.with_confidence(confidence);
            }
            result = result.with_structured_output(map);
        }
        Ok(result.with_output(output.stdout))
    }
}
