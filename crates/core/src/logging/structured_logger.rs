//! Structured logging utilities
//!
//! Run lifecycle events emitted with stable `event` names so that an external
//! log collector can pick them up regardless of the console format.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{JobResult, JobStatus, RunState, RunSummary};

/// Structured logging utilities
pub struct StructuredLogger;

impl StructuredLogger {
    /// Log job dispatch
    pub fn log_job_dispatched(run_id: Uuid, job_id: i64, command: &str, dispatched_at: DateTime<Utc>) {
        info!(
            event = "job_dispatched",
            run.id = %run_id,
            job.id = job_id,
            job.command = command,
            job.dispatched_at = %dispatched_at,
            "Job dispatched"
        );
    }

    /// Log job resolution
    pub fn log_job_resolved(run_id: Uuid, result: &JobResult) {
        let duration_ms = result.duration_ms();
        match result.status {
            JobStatus::Success => {
                info!(
                    event = "job_resolved",
                    run.id = %run_id,
                    job.id = result.id,
                    job.status = %result.status,
                    job.exit_code = ?result.exit_code,
                    job.duration_ms = duration_ms,
                    "Job completed successfully"
                );
            }
            JobStatus::Failure | JobStatus::Cancelled => {
                warn!(
                    event = "job_resolved",
                    run.id = %run_id,
                    job.id = result.id,
                    job.status = %result.status,
                    job.exit_code = ?result.exit_code,
                    job.duration_ms = duration_ms,
                    "Job did not succeed"
                );
            }
            JobStatus::Timeout | JobStatus::SpawnError => {
                error!(
                    event = "job_resolved",
                    run.id = %run_id,
                    job.id = result.id,
                    job.status = %result.status,
                    job.duration_ms = duration_ms,
                    job.error = result.stderr.lines().last().unwrap_or("Unknown error"),
                    "Job failed"
                );
            }
        }
    }

    /// Log run state machine transition
    pub fn log_run_state_changed(run_id: Uuid, from: RunState, to: RunState) {
        info!(
            event = "run_state_changed",
            run.id = %run_id,
            run.from = %from,
            run.to = %to,
            "Run state changed"
        );
    }

    /// Log final run summary
    pub fn log_run_summary(run_id: Uuid, summary: &RunSummary) {
        info!(
            event = "run_summary",
            run.id = %run_id,
            run.total = summary.total,
            run.succeeded = summary.succeeded,
            run.failed = summary.failed,
            run.failed_ids = ?summary.failed_ids,
            run.skipped_ids = ?summary.skipped_ids,
            run.interrupted = summary.interrupted,
            run.wall_time_seconds = summary.wall_time_seconds,
            "Run finished"
        );
    }
}
