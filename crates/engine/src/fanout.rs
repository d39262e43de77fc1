// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded worker-pool fan-out
//!
//! Every target of a batch becomes a [`Job`] on a queue sized to the batch.
//! A fixed pool of workers drains the queue, applying one shared
//! [`TargetOperation`] per job, and reports back over an event channel.
//! Collection waits for one outcome per job; a failing job never stops the
//! others.

use crate::error::FanOutError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tandem_core::fanout::{worker_count, DEFAULT_MAX_WORKERS};
use tandem_core::{BatchProgress, BatchReport, FanOutConfig, Job, JobOutcome};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Message recorded for jobs that were never started because the batch was cancelled
pub const CANCELLED_MESSAGE: &str = "batch cancelled before job started";

/// The business step applied to each target
///
/// Implementations should be idempotent: running the same target twice must
/// converge on the same state.
#[async_trait]
pub trait TargetOperation<T>: Send + Sync + 'static {
    type Error: fmt::Display + Send;

    async fn apply(&self, target: &T) -> Result<(), Self::Error>;
}

enum WorkerEvent<T> {
    Started(usize),
    Finished(JobOutcome<T>),
}

/// Runs batches with at most `max_workers` jobs in flight
#[derive(Clone, Copy, Debug)]
pub struct FanOutExecutor {
    max_workers: usize,
}

impl Default for FanOutExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}

impl FanOutExecutor {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    /// Sized by the `[fanout]` section of the configuration
    pub fn from_config(config: &FanOutConfig) -> Self {
        Self::new(config.max_workers)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Run a batch and fail with one aggregated error if any target failed
    pub async fn run<T, O>(
        &self,
        cancel: &CancellationToken,
        targets: Vec<T>,
        op: Arc<O>,
    ) -> Result<BatchReport<T>, FanOutError>
    where
        T: Clone + Send + Sync + fmt::Display + 'static,
        O: TargetOperation<T>,
    {
        let report = self.run_report(cancel, targets, op).await?;
        match report.failure_summary() {
            Some(summary) => Err(FanOutError::PartialFailure {
                failed: report.failure_count(),
                total: report.total(),
                summary,
            }),
            None => Ok(report),
        }
    }

    /// Run a batch and return every outcome, successful or not
    pub async fn run_report<T, O>(
        &self,
        cancel: &CancellationToken,
        targets: Vec<T>,
        op: Arc<O>,
    ) -> Result<BatchReport<T>, FanOutError>
    where
        T: Clone + Send + Sync + fmt::Display + 'static,
        O: TargetOperation<T>,
    {
        let jobs = Job::batch(targets);
        let total = jobs.len();
        let mut report = BatchReport::new(total);
        if total == 0 {
            return Ok(report);
        }

        let workers = worker_count(self.max_workers, total);
        let batch = cancel.child_token();

        let (job_tx, job_rx) = mpsc::channel(total);
        for job in jobs.iter().cloned() {
            job_tx.send(job).await.map_err(|_| FanOutError::QueueClosed)?;
        }
        drop(job_tx);
        let job_rx = Arc::new(Mutex::new(job_rx));

        // Two events per job at most, so workers never block on reporting
        let (event_tx, mut event_rx) = mpsc::channel(total * 2);
        let mut pool = JoinSet::new();
        for _ in 0..workers {
            pool.spawn(work(
                Arc::clone(&job_rx),
                event_tx.clone(),
                Arc::clone(&op),
                batch.clone(),
            ));
        }
        drop(event_tx);

        tracing::info!(total, workers, "fan-out batch started");

        while let Some(event) = event_rx.recv().await {
            match event {
                WorkerEvent::Started(index) => report.mark_running(index),
                WorkerEvent::Finished(outcome) => {
                    if let Some(error) = &outcome.error {
                        tracing::warn!(target_id = %outcome.target, %error, "fan-out target failed");
                    }
                    match report.record(outcome) {
                        Ok(BatchProgress::Done { .. }) => break,
                        Ok(BatchProgress::Collecting { .. }) => {}
                        Err(e) => tracing::warn!(error = %e, "discarding outcome"),
                    }
                }
            }
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "fan-out worker died");
            }
        }

        // A worker that died mid-job never reported; its job still gets an outcome
        for job in jobs {
            if report.state(job.index).is_some_and(|s| !s.is_terminal()) {
                let _ = report.record(JobOutcome::failed(job, "worker stopped before reporting"));
            }
        }

        tracing::info!(
            total,
            failed = report.failure_count(),
            "fan-out batch finished"
        );
        Ok(report)
    }
}

async fn work<T, O>(
    jobs: Arc<Mutex<mpsc::Receiver<Job<T>>>>,
    events: mpsc::Sender<WorkerEvent<T>>,
    op: Arc<O>,
    cancel: CancellationToken,
) where
    T: Send + Sync + 'static,
    O: TargetOperation<T>,
{
    loop {
        let next = jobs.lock().await.recv().await;
        let Some(job) = next else {
            break;
        };

        let outcome = if cancel.is_cancelled() {
            JobOutcome::failed(job, CANCELLED_MESSAGE)
        } else {
            let _ = events.send(WorkerEvent::Started(job.index)).await;
            match op.apply(&job.target).await {
                Ok(()) => JobOutcome::succeeded(job),
                Err(e) => JobOutcome::failed(job, e),
            }
        };

        if events.send(WorkerEvent::Finished(outcome)).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
#[path = "fanout_tests.rs"]
mod tests;
