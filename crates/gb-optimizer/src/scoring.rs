//! Result normalization and fitness scoring.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const WIN_RATE_WEIGHT: f64 = 0.3;
pub const PROFIT_FACTOR_WEIGHT: f64 = 0.3;
pub const SHARPE_RATIO_WEIGHT: f64 = 0.2;
pub const DRAWDOWN_WEIGHT: f64 = 0.2;

/// Performance metrics of one evaluated parameter assignment.
///
/// `win_rate` and `max_drawdown` are percentages in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationMetrics {
    pub win_rate: f64,
    pub profit_factor: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub recovery_factor: f64,
    pub profitability: f64,
}

/// One evaluated candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub parameters: HashMap<String, f64>,
    pub metrics: OptimizationMetrics,
}

/// Metrics as reported by a search backend. Older backends only report the
/// first four.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMetrics {
    pub win_rate: f64,
    pub profit_factor: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sortino: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calmar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profitability: Option<f64>,
}

/// A candidate as reported by a search backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    pub parameters: HashMap<String, f64>,
    pub metrics: RawMetrics,
}

impl RawMetrics {
    pub fn new(win_rate: f64, profit_factor: f64, sharpe_ratio: f64, max_drawdown: f64) -> Self {
        Self {
            win_rate,
            profit_factor,
            sharpe_ratio,
            max_drawdown,
            ..Self::default()
        }
    }
}

impl From<RawMetrics> for OptimizationMetrics {
    fn from(raw: RawMetrics) -> Self {
        Self {
            win_rate: raw.win_rate,
            profit_factor: raw.profit_factor,
            sharpe_ratio: raw.sharpe_ratio,
            max_drawdown: raw.max_drawdown,
            sortino: raw.sortino.unwrap_or(0.0),
            calmar: raw.calmar.unwrap_or(0.0),
            recovery_factor: raw.recovery_factor.unwrap_or(0.0),
            profitability: raw.profitability.unwrap_or(0.0),
        }
    }
}

impl From<RawResult> for OptimizationResult {
    fn from(raw: RawResult) -> Self {
        Self {
            parameters: raw.parameters,
            metrics: raw.metrics.into(),
        }
    }
}

/// Convert a backend result into the canonical shape, zero-filling any
/// extended metric the backend did not report.
pub fn normalize(raw: RawResult) -> OptimizationResult {
    raw.into()
}

/// Weighted fitness of a result; higher is better.
pub fn score(result: &OptimizationResult) -> f64 {
    let m = &result.metrics;
    m.win_rate * WIN_RATE_WEIGHT
        + m.profit_factor * PROFIT_FACTOR_WEIGHT
        + m.sharpe_ratio * SHARPE_RATIO_WEIGHT
        + (1.0 - m.max_drawdown / 100.0) * DRAWDOWN_WEIGHT
}

/// Highest scoring result. On equal scores the earliest result wins.
pub fn select_best(results: &[OptimizationResult]) -> Option<&OptimizationResult> {
    let (first, rest) = results.split_first()?;
    let mut best = first;
    let mut best_score = score(first);
    for candidate in rest {
        let candidate_score = score(candidate);
        if candidate_score > best_score {
            best = candidate;
            best_score = candidate_score;
        }
    }
    Some(best)
}

/// Result indices paired with their scores, best first. Equal scores keep
/// their original order; unordered scores (NaN) sort last.
pub fn rank(results: &[OptimizationResult]) -> Vec<(usize, f64)> {
    let mut ranked: Vec<(usize, f64)> = results
        .iter()
        .enumerate()
        .map(|(index, result)| (index, score(result)))
        .collect();
    ranked.sort_by(|a, b| match (a.1.is_nan(), b.1.is_nan()) {
        (false, false) => b.1.total_cmp(&a.1),
        (nan_a, nan_b) => nan_a.cmp(&nan_b),
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(
        win_rate: f64,
        profit_factor: f64,
        sharpe_ratio: f64,
        max_drawdown: f64,
    ) -> OptimizationResult {
        normalize(RawResult {
            parameters: HashMap::new(),
            metrics: RawMetrics::new(win_rate, profit_factor, sharpe_ratio, max_drawdown),
        })
    }

    fn tagged(tag: f64, win_rate: f64) -> OptimizationResult {
        let mut r = result(win_rate, 0.0, 0.0, 100.0);
        r.parameters.insert("tag".to_string(), tag);
        r
    }

    #[test]
    fn score_uses_fixed_weights() {
        let r = result(100.0, 2.0, 1.0, 0.0);
        // 30 + 0.6 + 0.2 + (1 - 0 / 100) * 0.2
        assert!((score(&r) - 31.0).abs() < 1e-9);
    }

    #[test]
    fn score_penalises_drawdown() {
        let shallow = result(50.0, 1.5, 1.0, 10.0);
        let deep = result(50.0, 1.5, 1.0, 60.0);
        assert!(score(&shallow) > score(&deep));
    }

    #[test]
    fn select_best_empty_and_single() {
        assert!(select_best(&[]).is_none());
        let only = result(40.0, 1.2, 0.5, 20.0);
        assert_eq!(select_best(std::slice::from_ref(&only)), Some(&only));
    }

    #[test]
    fn select_best_picks_highest_score() {
        let results = vec![tagged(1.0, 10.0), tagged(2.0, 60.0), tagged(3.0, 30.0)];
        assert_eq!(select_best(&results).unwrap().parameters["tag"], 2.0);
    }

    #[test]
    fn select_best_ties_keep_earliest() {
        let a = tagged(1.0, 40.0);
        let b = tagged(2.0, 40.0);
        assert_eq!(score(&a), score(&b));

        let ab = vec![a.clone(), b.clone()];
        assert_eq!(select_best(&ab).unwrap().parameters["tag"], 1.0);

        let ba = vec![b, a];
        assert_eq!(select_best(&ba).unwrap().parameters["tag"], 2.0);
    }

    #[test]
    fn normalize_zero_fills_extended_metrics() {
        let raw: RawResult = serde_json::from_str(
            r#"{ "parameters": { "RSI-period": 14 },
                 "metrics": { "winRate": 55, "profitFactor": 1.4,
                              "sharpeRatio": 0.9, "maxDrawdown": 12 } }"#,
        )
        .unwrap();
        let normalized = normalize(raw);
        let m = normalized.metrics;
        assert_eq!(
            (m.win_rate, m.profit_factor, m.sharpe_ratio, m.max_drawdown),
            (55.0, 1.4, 0.9, 12.0)
        );
        assert_eq!(
            (m.sortino, m.calmar, m.recovery_factor, m.profitability),
            (0.0, 0.0, 0.0, 0.0)
        );
        assert_eq!(normalized.parameters["RSI-period"], 14.0);
    }

    #[test]
    fn normalize_keeps_reported_extended_metrics() {
        let mut raw = RawMetrics::new(50.0, 1.0, 1.0, 10.0);
        raw.sortino = Some(1.7);
        raw.profitability = Some(0.4);
        let m = OptimizationMetrics::from(raw);
        assert_eq!(m.sortino, 1.7);
        assert_eq!(m.calmar, 0.0);
        assert_eq!(m.profitability, 0.4);
    }

    #[test]
    fn rank_orders_best_first_and_is_stable() {
        let results = vec![
            tagged(1.0, 20.0),
            tagged(2.0, 50.0),
            tagged(3.0, 20.0),
            tagged(4.0, f64::NAN),
        ];
        let order: Vec<usize> = rank(&results).into_iter().map(|(i, _)| i).collect();
        assert_eq!(order, vec![1, 0, 2, 3]);
    }
}
