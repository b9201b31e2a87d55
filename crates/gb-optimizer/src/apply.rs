//! Pushing a chosen result back to the strategy owner.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::scoring::OptimizationResult;

pub const APPLIED_TITLE: &str = "Parameters Applied";
pub const APPLIED_DESCRIPTION: &str = "Optimized parameters have been applied to the strategy.";
pub const FAILED_TITLE: &str = "Optimization Failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
        }
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, Severity::Success)
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, Severity::Error)
    }
}

/// Receives user-facing notifications (toasts, alert channels, ...).
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Default sink: writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, notification: Notification) {
        let Notification {
            title,
            description,
            severity,
        } = notification;
        match severity {
            Severity::Info | Severity::Success => info!(%title, %description, "notification"),
            Severity::Warning => warn!(%title, %description, "notification"),
            Severity::Error => error!(%title, %description, "notification"),
        }
    }
}

/// The strategy owner's entry point for updated parameter values.
pub trait ParameterSink: Send + Sync {
    fn apply_parameters(&self, parameters: &HashMap<String, f64>);
}

impl<F> ParameterSink for F
where
    F: Fn(&HashMap<String, f64>) + Send + Sync,
{
    fn apply_parameters(&self, parameters: &HashMap<String, f64>) {
        self(parameters)
    }
}

/// Forwards a result's parameters to the owner and confirms it to the user.
#[derive(Clone)]
pub struct ResultApplier {
    sink: Arc<dyn ParameterSink>,
    notifier: Arc<dyn NotificationSink>,
}

impl std::fmt::Debug for ResultApplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultApplier").finish_non_exhaustive()
    }
}

impl ResultApplier {
    pub fn new(sink: Arc<dyn ParameterSink>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { sink, notifier }
    }

    /// Applier that only logs its notifications.
    pub fn with_sink(sink: Arc<dyn ParameterSink>) -> Self {
        Self::new(sink, Arc::new(TracingNotifier))
    }

    pub fn notifier(&self) -> &Arc<dyn NotificationSink> {
        &self.notifier
    }

    /// Hand `result.parameters` to the owner. Repeated calls simply
    /// overwrite; the last one wins.
    pub fn apply(&self, result: &OptimizationResult) {
        self.sink.apply_parameters(&result.parameters);
        info!(parameters = result.parameters.len(), "applied optimized parameters");
        self.notifier
            .notify(Notification::success(APPLIED_TITLE, APPLIED_DESCRIPTION));
    }
}
