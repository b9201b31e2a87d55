//! Run lifecycle state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scoring::OptimizationResult;

/// Unique optimization run identifier.
pub type RunId = Uuid;

/// Lifecycle of the orchestrator's current (or last) run.
///
/// `Idle` only occurs before the first run. Every accepted start replaces
/// the previous terminal state, dropping its results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Running {
        run_id: RunId,
        /// Percentage in `[0, 100]`, only moved by backend progress reports.
        progress: f64,
        current_iteration: u32,
        total_iterations: u32,
        started_at: DateTime<Utc>,
    },
    Completed {
        run_id: RunId,
        results: Vec<OptimizationResult>,
        best: Option<OptimizationResult>,
        finished_at: DateTime<Utc>,
    },
    Failed {
        run_id: RunId,
        error: String,
        finished_at: DateTime<Utc>,
    },
}

impl RunState {
    pub fn running(run_id: RunId, total_iterations: u32) -> Self {
        Self::Running {
            run_id,
            progress: 0.0,
            current_iteration: 0,
            total_iterations,
            started_at: Utc::now(),
        }
    }

    pub fn completed(
        run_id: RunId,
        results: Vec<OptimizationResult>,
        best: Option<OptimizationResult>,
    ) -> Self {
        Self::Completed {
            run_id,
            results,
            best,
            finished_at: Utc::now(),
        }
    }

    pub fn failed(run_id: RunId, error: impl Into<String>) -> Self {
        Self::Failed {
            run_id,
            error: error.into(),
            finished_at: Utc::now(),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    /// True while `run_id` is the run in flight.
    pub fn is_running_run(&self, id: RunId) -> bool {
        matches!(self, Self::Running { run_id, .. } if *run_id == id)
    }

    pub fn run_id(&self) -> Option<RunId> {
        match self {
            Self::Idle => None,
            Self::Running { run_id, .. }
            | Self::Completed { run_id, .. }
            | Self::Failed { run_id, .. } => Some(*run_id),
        }
    }

    /// Results of a completed run; empty in every other state.
    pub fn results(&self) -> &[OptimizationResult] {
        match self {
            Self::Completed { results, .. } => results,
            _ => &[],
        }
    }

    pub fn best(&self) -> Option<&OptimizationResult> {
        match self {
            Self::Completed { best, .. } => best.as_ref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn progress(&self) -> Option<f64> {
        match self {
            Self::Running { progress, .. } => Some(*progress),
            _ => None,
        }
    }

    /// Record a backend progress report for run `id`. Reports for any other
    /// run, or once the run has settled, are ignored. Returns whether the
    /// state changed.
    pub fn record_progress(&mut self, id: RunId, iteration: u32) -> bool {
        match self {
            Self::Running {
                run_id,
                progress,
                current_iteration,
                total_iterations,
                ..
            } if *run_id == id => {
                let clamped = iteration.min(*total_iterations);
                if clamped == *current_iteration {
                    return false;
                }
                *current_iteration = clamped;
                *progress = if *total_iterations == 0 {
                    0.0
                } else {
                    f64::from(clamped) / f64::from(*total_iterations) * 100.0
                };
                true
            }
            _ => false,
        }
    }
}
