// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out batch bookkeeping
//!
//! A batch is a list of [`Job`] records, one per target. Every job ends in
//! exactly one [`JobOutcome`]; the [`BatchReport`] collects them and decides
//! whether the batch as a whole succeeded.

use std::fmt;

/// Default bound on concurrently running jobs
pub const DEFAULT_MAX_WORKERS: usize = 10;

/// Number of workers to start for a batch of `jobs`
pub fn worker_count(max_workers: usize, jobs: usize) -> usize {
    max_workers.max(1).min(jobs)
}

/// One unit of work: a target and its position in the batch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job<T> {
    pub index: usize,
    pub target: T,
}

impl<T> Job<T> {
    /// Tag each target with its position
    pub fn batch(targets: impl IntoIterator<Item = T>) -> Vec<Job<T>> {
        targets
            .into_iter()
            .enumerate()
            .map(|(index, target)| Job { index, target })
            .collect()
    }
}

/// Lifecycle of a single job
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// Result of one job
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobOutcome<T> {
    pub index: usize,
    pub target: T,
    /// Failure message, `None` on success
    pub error: Option<String>,
}

impl<T> JobOutcome<T> {
    pub fn succeeded(job: Job<T>) -> Self {
        Self {
            index: job.index,
            target: job.target,
            error: None,
        }
    }

    pub fn failed(job: Job<T>, error: impl fmt::Display) -> Self {
        Self {
            index: job.index,
            target: job.target,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Where a batch stands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchProgress {
    Collecting { received: usize, total: usize },
    Done { failed: usize, total: usize },
}

/// Errors recording an outcome that does not belong to the batch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    #[error("job index {index} out of range for batch of {total}")]
    UnknownJob { index: usize, total: usize },
    #[error("job {index} already reported")]
    DuplicateOutcome { index: usize },
}

/// Collected outcomes of a batch, indexed by job position
#[derive(Clone, Debug)]
pub struct BatchReport<T> {
    states: Vec<JobState>,
    outcomes: Vec<Option<JobOutcome<T>>>,
    received: usize,
}

impl<T> BatchReport<T> {
    pub fn new(total: usize) -> Self {
        Self {
            states: vec![JobState::Pending; total],
            outcomes: (0..total).map(|_| None).collect(),
            received: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.states.len()
    }

    pub fn state(&self, index: usize) -> Option<JobState> {
        self.states.get(index).copied()
    }

    /// Mark a job as picked up by a worker
    pub fn mark_running(&mut self, index: usize) {
        if let Some(state) = self.states.get_mut(index) {
            if *state == JobState::Pending {
                *state = JobState::Running;
            }
        }
    }

    /// Record the single outcome of a job
    pub fn record(&mut self, outcome: JobOutcome<T>) -> Result<BatchProgress, ReportError> {
        let index = outcome.index;
        let total = self.total();
        let state = self
            .states
            .get_mut(index)
            .ok_or(ReportError::UnknownJob { index, total })?;
        if state.is_terminal() {
            return Err(ReportError::DuplicateOutcome { index });
        }
        *state = if outcome.is_success() {
            JobState::Succeeded
        } else {
            JobState::Failed
        };
        self.outcomes[index] = Some(outcome);
        self.received += 1;
        Ok(self.progress())
    }

    pub fn progress(&self) -> BatchProgress {
        let total = self.total();
        if self.received < total {
            BatchProgress::Collecting {
                received: self.received,
                total,
            }
        } else {
            BatchProgress::Done {
                failed: self.failure_count(),
                total,
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.progress(), BatchProgress::Done { .. })
    }

    pub fn failure_count(&self) -> usize {
        self.states
            .iter()
            .filter(|s| **s == JobState::Failed)
            .count()
    }

    /// Outcomes received so far, in job order
    pub fn outcomes(&self) -> impl Iterator<Item = &JobOutcome<T>> {
        self.outcomes.iter().flatten()
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobOutcome<T>> {
        self.outcomes().filter(|o| !o.is_success())
    }

    pub fn successes(&self) -> impl Iterator<Item = &JobOutcome<T>> {
        self.outcomes().filter(|o| o.is_success())
    }
}

impl<T: fmt::Display> BatchReport<T> {
    /// `target=<id> err=<msg>` for each failure, joined by `; `
    pub fn failure_summary(&self) -> Option<String> {
        let parts: Vec<String> = self
            .failures()
            .map(|o| {
                format!(
                    "target={} err={}",
                    o.target,
                    o.error.as_deref().unwrap_or_default()
                )
            })
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

#[cfg(test)]
#[path = "fanout_tests.rs"]
mod tests;
