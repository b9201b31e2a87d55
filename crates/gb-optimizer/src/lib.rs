//! # gb-optimizer
//!
//! Strategy parameter tuning for GlowBack.
//!
//! Derives parameter ranges from a strategy snapshot, hands them with a
//! method configuration to an external search backend, scores the returned
//! candidates and applies the best one back to the strategy owner.

mod apply;
mod config;
mod error;
mod orchestrator;
mod range;
mod run;
mod scoring;
mod search;

pub use apply::{
    Notification, NotificationSink, ParameterSink, ResultApplier, Severity, TracingNotifier,
    APPLIED_DESCRIPTION, APPLIED_TITLE, FAILED_TITLE,
};
pub use config::{
    BayesianSettings, ConfigField, ConfigModel, EvolutionarySettings, MethodSettings,
    OptimizationConfig, OptimizationMethod, ParticleSwarmSettings,
};
pub use error::{
    ConfigFieldError, OptimizerError, OptimizerResult, SearchError, ValidationError,
    UNKNOWN_ERROR_MESSAGE,
};
pub use orchestrator::{RunOrchestrator, ABANDONED_MESSAGE};
pub use range::{derive_ranges, validate_ranges, ParameterRange, RangeField};
pub use run::{RunId, RunState};
pub use scoring::{
    normalize, rank, score, select_best, OptimizationMetrics, OptimizationResult, RawMetrics,
    RawResult,
};
pub use search::{ProgressReporter, ReplaySearchProvider, SearchProvider};
