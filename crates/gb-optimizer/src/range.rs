//! Parameter ranges: derivation from a strategy snapshot, manual editing,
//! and the checks a range set must pass before a run.

use gb_types::StrategySnapshot;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ValidationError;

/// Lower bound factor applied to a parameter's current value.
pub const LOWER_FACTOR: f64 = 0.5;
/// Upper bound factor applied to a parameter's current value.
pub const UPPER_FACTOR: f64 = 1.5;
/// Step size as a fraction of the current value.
pub const STEP_FACTOR: f64 = 0.1;

/// One tunable numeric dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub current: f64,
}

/// Editable fields of a [`ParameterRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeField {
    Name,
    Min,
    Max,
    Step,
    Current,
}

impl ParameterRange {
    pub fn new(name: impl Into<String>, min: f64, max: f64, step: f64, current: f64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            step,
            current,
        }
    }

    /// Range centred on `value`: half to one and a half times the value,
    /// stepping by a tenth of it.
    ///
    /// Negative values get their bounds ordered and a positive step. Zero
    /// collapses to a zero-width range with a zero step, which
    /// [`ParameterRange::validate`] rejects until the caller widens it.
    pub fn around(name: impl Into<String>, value: f64) -> Self {
        let lower = value * LOWER_FACTOR;
        let upper = value * UPPER_FACTOR;
        Self {
            name: name.into(),
            min: lower.min(upper),
            max: lower.max(upper),
            step: value.abs() * STEP_FACTOR,
            current: value,
        }
    }

    /// A fresh row for a manually added parameter.
    pub fn blank() -> Self {
        Self::new("", 0.0, 100.0, 1.0, 50.0)
    }

    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    /// Apply raw user input to one field.
    ///
    /// Numeric fields ignore input that does not parse to a finite number;
    /// returns whether the range changed.
    pub fn edit(&mut self, field: RangeField, input: &str) -> bool {
        let slot = match field {
            RangeField::Name => {
                self.name = input.to_string();
                return true;
            }
            RangeField::Min => &mut self.min,
            RangeField::Max => &mut self.max,
            RangeField::Step => &mut self.step,
            RangeField::Current => &mut self.current,
        };

        match input.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => {
                *slot = value;
                true
            }
            _ => false,
        }
    }

    /// Check this range in isolation. `index` is used to identify unnamed rows.
    pub fn validate(&self, index: usize) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName { index });
        }
        if !(self.min.is_finite() && self.max.is_finite() && self.step.is_finite()) {
            return Err(ValidationError::NonFinite {
                name: self.name.clone(),
            });
        }
        if self.min > self.max {
            return Err(ValidationError::InvertedBounds {
                name: self.name.clone(),
                min: self.min,
                max: self.max,
            });
        }
        if self.step <= 0.0 {
            return Err(ValidationError::NonPositiveStep {
                name: self.name.clone(),
                step: self.step,
            });
        }
        Ok(())
    }
}

/// Check a whole range set before it is handed to a search backend.
pub fn validate_ranges(ranges: &[ParameterRange]) -> Result<(), ValidationError> {
    if ranges.is_empty() {
        return Err(ValidationError::EmptyRanges);
    }
    ranges
        .iter()
        .enumerate()
        .try_for_each(|(index, range)| range.validate(index))
}

/// Build the initial ranges for a strategy.
///
/// Every numeric indicator parameter of the entry conditions comes first,
/// named `{indicatorType}-{param}`, followed by the three risk-management
/// fields.
pub fn derive_ranges(snapshot: &StrategySnapshot) -> Vec<ParameterRange> {
    let mut ranges: Vec<ParameterRange> = snapshot
        .indicators()
        .flat_map(|indicator| {
            indicator
                .numeric_params()
                .map(move |(param, value)| {
                    ParameterRange::around(indicator.qualified_name(param), value)
                })
        })
        .collect();

    ranges.extend(
        snapshot
            .risk_management
            .fields()
            .into_iter()
            .map(|(name, value)| ParameterRange::around(name, value)),
    );

    debug!(
        strategy = %snapshot.id,
        ranges = ranges.len(),
        "derived parameter ranges"
    );
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use gb_types::{IndicatorSpec, RiskManagement};

    fn snapshot() -> StrategySnapshot {
        let mut snapshot =
            StrategySnapshot::new("s1", "Test", RiskManagement::new(10.0, 2.0, 4.0));
        snapshot
            .add_indicator(
                IndicatorSpec::new("RSI")
                    .with_param("period", 14)
                    .with_param("source", "close")
                    .with_param("overbought", 70.0),
            )
            .add_indicator(IndicatorSpec::new("SMA").with_param("length", 20));
        snapshot.entry_conditions.push(Default::default());
        snapshot
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn derives_indicator_then_risk_ranges_in_order() {
        let ranges = derive_ranges(&snapshot());
        let names: Vec<_> = ranges.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "RSI-period",
                "RSI-overbought",
                "SMA-length",
                "maxPositionSize",
                "stopLoss",
                "takeProfit",
            ]
        );
    }

    #[test]
    fn positive_values_use_fixed_factors() {
        for value in [0.25, 1.0, 14.0, 250.0] {
            let range = ParameterRange::around("x", value);
            assert_close(range.min, value * 0.5);
            assert_close(range.max, value * 1.5);
            assert_close(range.step, value * 0.1);
            assert_eq!(range.current, value);
            assert!(range.validate(0).is_ok());
        }
    }

    #[test]
    fn zero_value_gives_degenerate_range_that_fails_validation() {
        let range = ParameterRange::around("stopLoss", 0.0);
        assert!(range.is_degenerate());
        assert_eq!((range.min, range.max, range.step), (0.0, 0.0, 0.0));
        assert!(matches!(
            range.validate(0),
            Err(ValidationError::NonPositiveStep { .. })
        ));
    }

    #[test]
    fn negative_value_keeps_bounds_ordered() {
        let range = ParameterRange::around("offset", -10.0);
        assert_close(range.min, -15.0);
        assert_close(range.max, -5.0);
        assert_close(range.step, 1.0);
        assert!(range.validate(0).is_ok());
    }

    #[test]
    fn edit_ignores_unparseable_numbers() {
        let mut range = ParameterRange::blank();
        assert!(!range.edit(RangeField::Min, "abc"));
        assert!(!range.edit(RangeField::Max, "NaN"));
        assert_eq!(range, ParameterRange::blank());

        assert!(range.edit(RangeField::Step, " 0.5 "));
        assert!(range.edit(RangeField::Name, "ATR-period"));
        assert_eq!(range.step, 0.5);
        assert_eq!(range.name, "ATR-period");
    }

    #[test]
    fn validate_ranges_reports_first_problem() {
        assert_eq!(validate_ranges(&[]), Err(ValidationError::EmptyRanges));

        let ranges = vec![
            ParameterRange::new("a", 0.0, 1.0, 0.1, 0.5),
            ParameterRange::blank(),
        ];
        assert_eq!(
            validate_ranges(&ranges),
            Err(ValidationError::EmptyName { index: 1 })
        );

        let inverted = vec![ParameterRange::new("b", 2.0, 1.0, 0.1, 1.5)];
        assert!(matches!(
            validate_ranges(&inverted),
            Err(ValidationError::InvertedBounds { .. })
        ));

        let degenerate_but_valid = vec![ParameterRange::new("c", 1.0, 1.0, 0.1, 1.0)];
        assert!(validate_ranges(&degenerate_but_valid).is_ok());
    }
}
