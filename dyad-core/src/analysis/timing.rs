//! Per-person response-time statistics
//!
//! Response events are derived at every sender change; the latency is
//! measured from the **most recent** prior message of the other sender,
//! not the first message of that sender's run. During multi-message
//! bursts this under-counts the true wait time — a documented behavior of
//! this design that downstream composite scores are calibrated against,
//! so it must not be silently corrected.
//!
//! Extreme values (multi-day silences) are excluded from central-tendency
//! statistics by an IQR fence, but the raw events are never deleted: order
//! statistics and sample-size audit fields always reflect the full sample,
//! and the silences themselves stay visible in [`SilenceStats`] and the
//! ghost-risk signal.

use crate::config::TimingConfig;
use crate::types::{Measured, MessageKind, UnifiedMessage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A sender change and the reply latency it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEvent {
    /// Sender of the message being replied to
    pub prior_sender: String,
    /// Sender of the reply
    pub reply_sender: String,
    /// Reply latency in milliseconds
    pub delta_ms: i64,
    /// Position of the reply in the sorted message slice
    pub reply_position: usize,
    /// Timestamp of the reply (epoch ms)
    pub reply_ms: i64,
}

/// Derive response events from a sorted message slice.
///
/// System messages carry no conversational latency and are skipped.
pub fn response_events(messages: &[UnifiedMessage]) -> Vec<ResponseEvent> {
    let mut events = Vec::new();
    let mut prev: Option<(usize, &UnifiedMessage)> = None;

    for (pos, msg) in messages.iter().enumerate() {
        if msg.kind == MessageKind::System {
            continue;
        }
        if let Some((_, prior)) = prev {
            if prior.sender != msg.sender {
                events.push(ResponseEvent {
                    prior_sender: prior.sender.clone(),
                    reply_sender: msg.sender.clone(),
                    delta_ms: msg.timestamp_ms - prior.timestamp_ms,
                    reply_position: pos,
                    reply_ms: msg.timestamp_ms,
                });
            }
        }
        prev = Some((pos, msg));
    }

    events
}

/// Group reply latencies by replier, preserving event order.
pub fn deltas_by_replier(events: &[ResponseEvent]) -> BTreeMap<String, Vec<i64>> {
    let mut map: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for event in events {
        map.entry(event.reply_sender.clone())
            .or_default()
            .push(event.delta_ms);
    }
    map
}

/// Response-time distribution statistics for one participant.
///
/// Order statistics (`median`, quartiles, `p75`/`p90`/`p95`) are computed
/// on the raw sample; `mean`, `trimmed_mean`, `std_dev` and `skewness` on
/// the outlier-filtered sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseStats {
    pub mean_ms: f64,
    pub median_ms: f64,
    pub trimmed_mean_ms: f64,
    /// Population standard deviation
    pub std_dev_ms: f64,
    pub q1_ms: f64,
    pub q3_ms: f64,
    pub iqr_ms: f64,
    pub p75_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    /// Population skewness of the filtered sample
    pub skewness: f64,
    /// Events observed before any filtering
    pub raw_sample_size: usize,
    /// Events contributing to central-tendency statistics
    pub filtered_sample_size: usize,
    /// Events above the outlier fence
    pub outliers_excluded: usize,
}

impl ResponseStats {
    /// Compute statistics over a participant's reply latencies.
    ///
    /// Filtering policy: values above `Q3 + multiplier * IQR` are excluded
    /// from central-tendency statistics, with the IQR floored at
    /// `min_iqr_floor_ms` so tightly clustered sub-minute replies do not
    /// get over-trimmed. Samples below `min_filter_sample_size` are never
    /// filtered.
    pub fn compute(deltas: &[i64], config: &TimingConfig) -> Measured<ResponseStats> {
        if deltas.is_empty() {
            return Measured::InsufficientData;
        }

        let mut sorted: Vec<f64> = deltas.iter().map(|&d| d as f64).collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let q1 = percentile(&sorted, 25.0);
        let q3 = percentile(&sorted, 75.0);
        let iqr = q3 - q1;

        let filtered: Vec<f64> = if sorted.len() >= config.min_filter_sample_size {
            let effective_iqr = iqr.max(config.min_iqr_floor_ms as f64);
            let fence = q3 + config.outlier_iqr_multiplier * effective_iqr;
            sorted.iter().copied().filter(|&v| v <= fence).collect()
        } else {
            sorted.clone()
        };

        let mean = mean(&filtered);
        let std_dev = population_std_dev(&filtered, mean);

        Measured::Measured(ResponseStats {
            mean_ms: mean,
            median_ms: percentile(&sorted, 50.0),
            trimmed_mean_ms: trimmed_mean(&filtered, config.trim_fraction),
            std_dev_ms: std_dev,
            q1_ms: q1,
            q3_ms: q3,
            iqr_ms: iqr,
            p75_ms: percentile(&sorted, 75.0),
            p90_ms: percentile(&sorted, 90.0),
            p95_ms: percentile(&sorted, 95.0),
            skewness: population_skewness(&filtered, mean, std_dev),
            raw_sample_size: sorted.len(),
            filtered_sample_size: filtered.len(),
            outliers_excluded: sorted.len() - filtered.len(),
        })
    }
}

/// Longest silence in the conversation, kept visible regardless of the
/// outlier fence applied to response-time statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilenceStats {
    /// Longest gap between consecutive messages (ms)
    pub longest_gap_ms: i64,
    /// When the silence began (epoch ms)
    pub started_ms: i64,
    /// Participant who eventually broke it
    pub broken_by: String,
    /// P75 of all inter-message gaps (ms)
    pub p75_gap_ms: f64,
}

/// Compute silence statistics over the full timeline.
pub fn silence_stats(messages: &[UnifiedMessage]) -> Measured<SilenceStats> {
    if messages.len() < 2 {
        return Measured::InsufficientData;
    }

    let mut longest = 0i64;
    let mut started = messages[0].timestamp_ms;
    let mut broken_by = messages[0].sender.clone();
    let mut gaps: Vec<f64> = Vec::with_capacity(messages.len() - 1);

    for pair in messages.windows(2) {
        let gap = pair[1].timestamp_ms - pair[0].timestamp_ms;
        gaps.push(gap as f64);
        if gap > longest {
            longest = gap;
            started = pair[0].timestamp_ms;
            broken_by = pair[1].sender.clone();
        }
    }

    gaps.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    Measured::Measured(SilenceStats {
        longest_gap_ms: longest,
        started_ms: started,
        broken_by,
        p75_gap_ms: percentile(&gaps, 75.0),
    })
}

/// Linear-interpolation percentile (R-7) over a sorted slice.
pub(crate) fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn trimmed_mean(sorted: &[f64], trim_fraction: f64) -> f64 {
    let n = sorted.len();
    let trim = (n as f64 * trim_fraction).floor() as usize;
    if n == 0 || trim * 2 >= n {
        return mean(sorted);
    }
    mean(&sorted[trim..n - trim])
}

fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance =
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn population_skewness(values: &[f64], mean: f64, std_dev: f64) -> f64 {
    if values.is_empty() || std_dev == 0.0 {
        return 0.0;
    }
    values
        .iter()
        .map(|v| {
            let z = (v - mean) / std_dev;
            z * z * z
        })
        .sum::<f64>()
        / values.len() as f64
}
