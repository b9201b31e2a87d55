use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::{GbResult, StrategyError};
use crate::validation_error;

/// Name of the risk-management field holding the maximum position size.
pub const MAX_POSITION_SIZE: &str = "maxPositionSize";
/// Name of the risk-management field holding the stop-loss distance.
pub const STOP_LOSS: &str = "stopLoss";
/// Name of the risk-management field holding the take-profit distance.
pub const TAKE_PROFIT: &str = "takeProfit";

/// Read-only view of a strategy as handed to the optimizer.
///
/// Only the parts the optimizer tunes are modelled: indicator parameters of
/// the entry conditions and the numeric risk-management block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategySnapshot {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub entry_conditions: Vec<EntryCondition>,
    pub risk_management: RiskManagement,
}

/// A single entry condition; conditions without an indicator contribute no
/// tunable parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntryCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator: Option<IndicatorSpec>,
}

/// Indicator attached to an entry condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSpec {
    #[serde(rename = "type")]
    pub indicator_type: String,
    /// Parameters keep their declaration order.
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskManagement {
    pub max_position_size: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// Outcome of [`StrategySnapshot::apply_parameters`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterUpdate {
    /// Fields written, counting every indicator that shares a qualified name.
    pub written: usize,
    /// Names with no matching field on the strategy, sorted.
    pub skipped: Vec<String>,
}

impl ParameterUpdate {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

impl IndicatorSpec {
    pub fn new(indicator_type: impl Into<String>) -> Self {
        Self {
            indicator_type: indicator_type.into(),
            params: serde_json::Map::new(),
        }
    }

    pub fn with_param<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.params.insert(
            key.to_string(),
            serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
        );
        self
    }

    /// Fully qualified name of one of this indicator's parameters, e.g. `RSI-period`.
    pub fn qualified_name(&self, param: &str) -> String {
        format!("{}-{}", self.indicator_type, param)
    }

    /// Numeric parameters only, in declaration order.
    pub fn numeric_params(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.params
            .iter()
            .filter_map(|(name, value)| value.as_f64().map(|v| (name.as_str(), v)))
    }
}

impl RiskManagement {
    pub fn new(max_position_size: f64, stop_loss: f64, take_profit: f64) -> Self {
        Self {
            max_position_size,
            stop_loss,
            take_profit,
        }
    }

    /// The tunable risk fields in their canonical order.
    pub fn fields(&self) -> [(&'static str, f64); 3] {
        [
            (MAX_POSITION_SIZE, self.max_position_size),
            (STOP_LOSS, self.stop_loss),
            (TAKE_PROFIT, self.take_profit),
        ]
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut f64> {
        match name {
            MAX_POSITION_SIZE => Some(&mut self.max_position_size),
            STOP_LOSS => Some(&mut self.stop_loss),
            TAKE_PROFIT => Some(&mut self.take_profit),
            _ => None,
        }
    }
}

impl StrategySnapshot {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        risk_management: RiskManagement,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entry_conditions: Vec::new(),
            risk_management,
        }
    }

    pub fn add_indicator(&mut self, indicator: IndicatorSpec) -> &mut Self {
        self.entry_conditions.push(EntryCondition {
            indicator: Some(indicator),
        });
        self
    }

    /// Parse a snapshot from JSON and check that it is usable for tuning.
    pub fn from_json(json: &str) -> GbResult<Self> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn to_json(&self) -> GbResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> GbResult<()> {
        for (index, condition) in self.entry_conditions.iter().enumerate() {
            if let Some(indicator) = &condition.indicator {
                if indicator.indicator_type.trim().is_empty() {
                    return Err(validation_error!(
                        "entry condition {} has an indicator without a type",
                        index
                    ));
                }
            }
        }
        for (name, value) in self.risk_management.fields() {
            if !value.is_finite() {
                return Err(validation_error!("risk field {} is not finite: {}", name, value));
            }
        }
        Ok(())
    }

    /// Indicators of all entry conditions, in condition order.
    pub fn indicators(&self) -> impl Iterator<Item = &IndicatorSpec> + '_ {
        self.entry_conditions
            .iter()
            .filter_map(|condition| condition.indicator.as_ref())
    }

    /// Write tuned values back into the snapshot.
    ///
    /// Keys use the optimizer's naming: `{indicatorType}-{param}` for
    /// indicator parameters and the bare field name for risk settings. Keys
    /// the strategy does not know (e.g. dimensions added by hand to the
    /// search) are skipped and reported. A non-finite value rejects the
    /// whole update before anything is written.
    pub fn apply_parameters(
        &mut self,
        parameters: &HashMap<String, f64>,
    ) -> Result<ParameterUpdate, StrategyError> {
        if let Some((name, value)) = parameters.iter().find(|(_, value)| !value.is_finite()) {
            return Err(StrategyError::ParameterError {
                parameter: name.clone(),
                message: format!("value {value} is not finite"),
            });
        }

        let mut update = ParameterUpdate::default();
        for (name, value) in parameters {
            if !self.has_parameter(name) {
                update.skipped.push(name.clone());
                continue;
            }
            if let Some(field) = self.risk_management.field_mut(name) {
                *field = *value;
                update.written += 1;
                continue;
            }
            for condition in &mut self.entry_conditions {
                let Some(indicator) = condition.indicator.as_mut() else {
                    continue;
                };
                let Some(param) = name
                    .strip_prefix(indicator.indicator_type.as_str())
                    .and_then(|rest| rest.strip_prefix('-'))
                else {
                    continue;
                };
                if let Some(slot) = indicator.params.get_mut(param) {
                    if slot.is_number() {
                        *slot = serde_json::Value::from(*value);
                        update.written += 1;
                    }
                }
            }
        }
        update.skipped.sort();
        Ok(update)
    }

    fn has_parameter(&self, name: &str) -> bool {
        if self.risk_management.fields().iter().any(|(field, _)| *field == name) {
            return true;
        }
        self.indicators().any(|indicator| {
            indicator
                .numeric_params()
                .any(|(param, _)| indicator.qualified_name(param) == name)
        })
    }
}
