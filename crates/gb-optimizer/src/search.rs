//! The search backend boundary.
//!
//! The optimizer never samples parameters itself. Grid, random, Bayesian,
//! evolutionary and particle-swarm backends live behind [`SearchProvider`]
//! and hand back evaluated candidates.

use async_trait::async_trait;
use gb_types::GbResult;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::config::OptimizationConfig;
use crate::error::SearchError;
use crate::range::ParameterRange;
use crate::run::{RunId, RunState};
use crate::scoring::RawResult;

/// An external optimization backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Evaluate candidates within `ranges` using the method in `config`.
    ///
    /// Backends that track iterations may report them through `progress`;
    /// those that do not simply ignore it.
    async fn search(
        &self,
        ranges: &[ParameterRange],
        config: &OptimizationConfig,
        progress: ProgressReporter,
    ) -> Result<Vec<RawResult>, SearchError>;

    /// Human-readable backend name.
    fn name(&self) -> &str {
        "external"
    }
}

#[async_trait]
impl<P: SearchProvider + ?Sized> SearchProvider for Arc<P> {
    async fn search(
        &self,
        ranges: &[ParameterRange],
        config: &OptimizationConfig,
        progress: ProgressReporter,
    ) -> Result<Vec<RawResult>, SearchError> {
        (**self).search(ranges, config, progress).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Handle through which a backend reports iteration progress for one run.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    run_id: RunId,
    state: Arc<watch::Sender<RunState>>,
}

impl ProgressReporter {
    pub(crate) fn new(run_id: RunId, state: Arc<watch::Sender<RunState>>) -> Self {
        Self { run_id, state }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Record that `iteration` iterations have finished. Has no effect once
    /// the run has settled.
    pub fn report(&self, iteration: u32) {
        let run_id = self.run_id;
        let changed = self
            .state
            .send_if_modified(|state| state.record_progress(run_id, iteration));
        if changed {
            debug!(%run_id, iteration, "optimization progress");
        }
    }
}

/// Backend that returns candidates evaluated earlier by an external
/// optimizer, e.g. loaded from a JSON export.
#[derive(Debug, Clone, Default)]
pub struct ReplaySearchProvider {
    results: Vec<RawResult>,
}

impl ReplaySearchProvider {
    pub fn new(results: Vec<RawResult>) -> Self {
        Self { results }
    }

    /// Parse a JSON array of raw results.
    pub fn from_json(json: &str) -> GbResult<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> GbResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[async_trait]
impl SearchProvider for ReplaySearchProvider {
    async fn search(
        &self,
        ranges: &[ParameterRange],
        config: &OptimizationConfig,
        _progress: ProgressReporter,
    ) -> Result<Vec<RawResult>, SearchError> {
        debug!(
            method = %config.method(),
            ranges = ranges.len(),
            results = self.results.len(),
            "replaying recorded optimization results"
        );
        Ok(self.results.clone())
    }

    fn name(&self) -> &str {
        "replay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn reporter_updates_its_own_run() {
        let id = Uuid::new_v4();
        let (tx, rx) = watch::channel(RunState::running(id, 20));
        let reporter = ProgressReporter::new(id, Arc::new(tx));

        reporter.report(5);
        assert_eq!(rx.borrow().progress(), Some(25.0));
        assert_eq!(reporter.run_id(), id);
    }

    #[test]
    fn reporter_ignores_settled_runs() {
        let id = Uuid::new_v4();
        let (tx, rx) = watch::channel(RunState::failed(id, "timeout"));
        let reporter = ProgressReporter::new(id, Arc::new(tx));

        reporter.report(5);
        assert_eq!(rx.borrow().error(), Some("timeout"));
    }

    #[tokio::test]
    async fn replay_returns_recorded_results() {
        let provider = ReplaySearchProvider::from_json(
            r#"[
                { "parameters": { "stopLoss": 1.5 },
                  "metrics": { "winRate": 52, "profitFactor": 1.3, "sharpeRatio": 0.8,
                               "maxDrawdown": 14, "sortino": 1.1 } },
                { "parameters": { "stopLoss": 2.0 },
                  "metrics": { "winRate": 48, "profitFactor": 1.1, "sharpeRatio": 0.5,
                               "maxDrawdown": 9 } }
            ]"#,
        )
        .unwrap();
        assert_eq!(provider.len(), 2);
        assert_eq!(provider.name(), "replay");

        let id = Uuid::new_v4();
        let (tx, _rx) = watch::channel(RunState::running(id, 10));
        let ranges = vec![ParameterRange::around("stopLoss", 2.0)];
        let progress = ProgressReporter::new(id, Arc::new(tx));
        let results = provider
            .search(&ranges, &OptimizationConfig::default(), progress)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].metrics.sortino, Some(1.1));
        assert_eq!(results[1].metrics.sortino, None);
    }

    #[test]
    fn replay_rejects_malformed_json() {
        assert!(matches!(
            ReplaySearchProvider::from_json("{ not json"),
            Err(gb_types::GbError::Serialization(_))
        ));
    }
}
