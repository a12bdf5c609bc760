//! Response-time percentile ranking
//!
//! One interface over the two ranking approaches that historically evolved
//! side by side: a hardcoded benchmark table and a lognormal CDF model.
//! The strategy is an explicit tagged choice, selected in configuration.
//!
//! The returned value reads as "replies faster than N% of conversations";
//! it is a heuristic entertainment calibration, not a population study.

use serde::{Deserialize, Serialize};

/// Percentile ranking strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PercentileStrategy {
    /// Piecewise benchmark table with fixed fences
    HardcodedBenchmark,
    /// Lognormal model: `median_ms` is the assumed population median,
    /// `sigma` the log-space spread
    LognormalCdf { median_ms: f64, sigma: f64 },
}

impl Default for PercentileStrategy {
    fn default() -> Self {
        PercentileStrategy::HardcodedBenchmark
    }
}

/// Benchmark fences: replies at or under the bound rank at the percentile.
const BENCHMARK_TABLE: &[(f64, f64)] = &[
    (60_000.0, 95.0),      // under a minute
    (300_000.0, 85.0),     // under 5 minutes
    (900_000.0, 70.0),     // under 15 minutes
    (3_600_000.0, 55.0),   // under an hour
    (10_800_000.0, 35.0),  // under 3 hours
    (21_600_000.0, 20.0),  // under 6 hours
];

const BENCHMARK_FLOOR: f64 = 5.0;

/// Rank a median reply latency against the configured population model.
///
/// Always in `[0, 100]`; non-positive latencies rank at the top.
pub fn response_time_percentile(median_ms: f64, strategy: &PercentileStrategy) -> f64 {
    match strategy {
        PercentileStrategy::HardcodedBenchmark => {
            if median_ms <= 0.0 {
                return BENCHMARK_TABLE[0].1;
            }
            for &(bound, pct) in BENCHMARK_TABLE {
                if median_ms <= bound {
                    return pct;
                }
            }
            BENCHMARK_FLOOR
        }
        PercentileStrategy::LognormalCdf { median_ms: m, sigma } => {
            if median_ms <= 0.0 {
                return 100.0;
            }
            if *m <= 0.0 || *sigma <= 0.0 {
                return 50.0;
            }
            let z = (median_ms.ln() - m.ln()) / sigma;
            ((1.0 - normal_cdf(z)) * 100.0).clamp(0.0, 100.0)
        }
    }
}

/// Standard normal CDF via the Abramowitz-Stegun erf approximation
/// (formula 7.1.26, max error ~1.5e-7).
fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + 0.3275911 * x);
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    sign * (1.0 - poly * (-x * x).exp())
}
