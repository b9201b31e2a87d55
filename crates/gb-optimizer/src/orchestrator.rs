//! Run orchestration: validation, the single in-flight search, scoring and
//! applying the winner.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::apply::{Notification, ResultApplier, FAILED_TITLE};
use crate::config::OptimizationConfig;
use crate::error::{OptimizerError, OptimizerResult};
use crate::range::{validate_ranges, ParameterRange};
use crate::run::{RunId, RunState};
use crate::scoring::{normalize, select_best, OptimizationResult};
use crate::search::{ProgressReporter, SearchProvider};

/// Error recorded when a run's future is dropped before the search settles.
pub const ABANDONED_MESSAGE: &str = "optimization run was abandoned";

/// Drives optimization runs against a [`SearchProvider`].
///
/// At most one run is in flight; a second `start` while one is running is
/// rejected. Runs cannot be cancelled: the search either resolves or fails.
/// Observers can follow the lifecycle through [`RunOrchestrator::subscribe`].
pub struct RunOrchestrator<P> {
    provider: P,
    applier: ResultApplier,
    state: Arc<watch::Sender<RunState>>,
}

impl<P: SearchProvider> RunOrchestrator<P> {
    pub fn new(provider: P, applier: ResultApplier) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            provider,
            applier,
            state: Arc::new(state),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.state.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().is_running()
    }

    /// Receiver that sees every state transition and progress report.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Run one optimization over `ranges` with `config`.
    ///
    /// Invalid input is rejected before anything else happens. On success
    /// the best result (if any) has already been applied when this returns.
    /// A failed search is recorded as [`RunState::Failed`], reported to the
    /// notifier, and returned as [`OptimizerError::Search`].
    pub async fn start(
        &self,
        ranges: Vec<ParameterRange>,
        config: OptimizationConfig,
    ) -> OptimizerResult<Option<OptimizationResult>> {
        if let Err(e) = validate_ranges(&ranges) {
            warn!(error = %e, "rejected optimization start");
            return Err(e.into());
        }
        if let Err(e) = config.validate() {
            warn!(error = %e, "rejected optimization start");
            return Err(e.into());
        }

        let run_id = self.begin(config.iterations)?;
        let _guard = AbandonGuard {
            run_id,
            state: self.state.clone(),
        };

        info!(
            %run_id,
            method = %config.method(),
            backend = self.provider.name(),
            ranges = ranges.len(),
            iterations = config.iterations,
            "optimization started"
        );

        let progress = ProgressReporter::new(run_id, self.state.clone());
        match self.provider.search(&ranges, &config, progress).await {
            Ok(raw) => {
                let results: Vec<OptimizationResult> = raw.into_iter().map(normalize).collect();
                let best = select_best(&results).cloned();
                if let Some(best) = &best {
                    self.applier.apply(best);
                }

                info!(
                    %run_id,
                    results = results.len(),
                    has_best = best.is_some(),
                    "optimization completed"
                );
                self.settle(run_id, RunState::completed(run_id, results, best.clone()));
                Ok(best)
            }
            Err(e) => {
                let message = e.message().to_string();
                error!(%run_id, error = %message, "optimization failed");
                self.applier
                    .notifier()
                    .notify(Notification::error(FAILED_TITLE, message.clone()));
                self.settle(run_id, RunState::failed(run_id, message));
                Err(e.into())
            }
        }
    }

    /// Apply one result of the last completed run, e.g. a runner-up the user
    /// prefers over the automatically applied best.
    pub fn apply_result(&self, index: usize) -> OptimizerResult<()> {
        let result = {
            let state = self.state.borrow();
            let RunState::Completed { results, .. } = &*state else {
                return Err(OptimizerError::NoCompletedRun);
            };
            results
                .get(index)
                .cloned()
                .ok_or(OptimizerError::ResultNotFound { index })?
        };
        self.applier.apply(&result);
        Ok(())
    }

    /// Move to `Running` unless a run is already in flight.
    fn begin(&self, total_iterations: u32) -> OptimizerResult<RunId> {
        let run_id = Uuid::new_v4();
        let mut active = None;
        self.state.send_if_modified(|state| {
            if let RunState::Running { run_id: current, .. } = state {
                active = Some(*current);
                return false;
            }
            *state = RunState::running(run_id, total_iterations);
            true
        });

        match active {
            Some(active) => {
                warn!(active_run = %active, "optimization already running");
                Err(OptimizerError::AlreadyRunning { run_id: active })
            }
            None => Ok(run_id),
        }
    }

    fn settle(&self, run_id: RunId, next: RunState) {
        replace_running(&self.state, run_id, next);
    }
}

/// Replace the `Running` state of `run_id` with `next`.
fn replace_running(state: &watch::Sender<RunState>, run_id: RunId, next: RunState) -> bool {
    state.send_if_modified(|current| {
        if !current.is_running_run(run_id) {
            return false;
        }
        *current = next;
        true
    })
}

/// Marks the run failed if `start` is dropped before the search settles, so
/// the orchestrator never stays stuck in `Running`.
struct AbandonGuard {
    run_id: RunId,
    state: Arc<watch::Sender<RunState>>,
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if replace_running(
            &self.state,
            self.run_id,
            RunState::failed(self.run_id, ABANDONED_MESSAGE),
        ) {
            warn!(run_id = %self.run_id, "optimization run abandoned");
        }
    }
}
