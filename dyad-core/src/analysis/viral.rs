//! Composite "viral" scores
//!
//! Compatibility, per-person interest, ghost risk, and the delusion score.
//! These are heuristic entertainment metrics with documented weights, not
//! calibrated psychology — the weights must stay exactly as written so
//! repeated analyses of the same conversation agree.

use crate::analysis::engagement::PersonEngagement;
use crate::analysis::patterns::{Heatmap, PatternReport};
use crate::analysis::percentile::{response_time_percentile, PercentileStrategy};
use crate::analysis::reciprocity::primary_pair;
use crate::analysis::session::Session;
use crate::analysis::timing::{ResponseEvent, ResponseStats};
use crate::types::{Measured, SubScore, UnifiedMessage};
use chrono::{DateTime, Datelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Interest-score term weights (sum to 1.0).
const RESPONSE_SPEED_WEIGHT: f64 = 0.25;
const INITIATION_WEIGHT: f64 = 0.20;
const DOUBLE_TEXT_WEIGHT: f64 = 0.10;
const ENGAGEMENT_WEIGHT: f64 = 0.15;
const MESSAGE_EFFORT_WEIGHT: f64 = 0.15;
const LATE_NIGHT_WEIGHT: f64 = 0.15;

// Ghost-risk factor weights (sum to 1.0).
const RESPONSE_TREND_WEIGHT: f64 = 0.30;
const VOLUME_TREND_WEIGHT: f64 = 0.30;
const INITIATION_TREND_WEIGHT: f64 = 0.20;
const LENGTH_TREND_WEIGHT: f64 = 0.20;

/// Months of data required before ghost risk is measurable.
const GHOST_MIN_MONTHS: usize = 3;

/// Hours counted as late night (22:00-03:59).
const LATE_NIGHT_HOURS: [usize; 6] = [22, 23, 0, 1, 2, 3];

/// Compatibility between the primary pair: equal-weighted mean of five
/// sub-scores, each recorded for auditability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityScore {
    /// The pair scored (most active two participants)
    pub pair: Option<(String, String)>,
    /// Equal-weighted mean of the five sub-scores, 0-100
    pub score: f64,
    /// Heatmap overlap of active hours
    pub activity_overlap: SubScore,
    /// Balance of median reply latencies
    pub response_symmetry: SubScore,
    /// Balance of message counts
    pub message_balance: SubScore,
    /// Balance of reaction give rates
    pub engagement_balance: SubScore,
    /// Balance of mean message lengths
    pub length_match: SubScore,
}

impl Default for CompatibilityScore {
    fn default() -> Self {
        Self {
            pair: None,
            score: 50.0,
            activity_overlap: SubScore::unmeasured(),
            response_symmetry: SubScore::unmeasured(),
            message_balance: SubScore::unmeasured(),
            engagement_balance: SubScore::unmeasured(),
            length_match: SubScore::unmeasured(),
        }
    }
}

/// Per-person interest score: weighted sum of six behavioral terms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterestScore {
    /// Weighted sum, 0-100
    pub score: f64,
    /// Reply-speed percentile rank
    pub response_speed: f64,
    /// Session-initiation term
    pub initiation: f64,
    /// Double-text term
    pub double_text: f64,
    /// Reaction engagement term, `min(100, receive_rate x 500)`
    pub engagement: f64,
    /// Message-length effort term
    pub message_effort: f64,
    /// Late-night messaging term (22:00-03:59 window)
    pub late_night: f64,
}

/// Ghost-risk level bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostRiskLevel {
    Low,
    Medium,
    High,
}

/// Ghost risk: four trend factors over the monthly series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GhostRiskScore {
    /// Weighted composite, 0-100
    pub score: f64,
    pub level: GhostRiskLevel,
    /// Reply latency growing vs baseline
    pub response_trend: f64,
    /// Message volume declining vs baseline
    pub volume_trend: f64,
    /// Initiation share declining vs baseline
    pub initiation_trend: f64,
    /// Message length shrinking vs baseline
    pub length_trend: f64,
}

/// All viral scores for a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViralScores {
    pub compatibility: CompatibilityScore,
    /// Interest score per participant
    pub interest: BTreeMap<String, InterestScore>,
    /// Ghost risk per participant; the sentinel marks conversations with
    /// under three months of data
    pub ghost_risk: BTreeMap<String, Measured<GhostRiskScore>>,
    /// Absolute difference between the primary pair's interest scores
    pub delusion: Measured<f64>,
}

/// Compute all viral scores.
#[allow(clippy::too_many_arguments)]
pub fn compute_viral(
    messages: &[UnifiedMessage],
    sessions: &[Session],
    events: &[ResponseEvent],
    engagement: &BTreeMap<String, PersonEngagement>,
    timing: &BTreeMap<String, Measured<ResponseStats>>,
    patterns: &PatternReport,
    participants: &[String],
    strategy: &PercentileStrategy,
) -> ViralScores {
    let pair = primary_pair(engagement, participants);

    let compatibility = compatibility_score(pair.clone(), engagement, timing, patterns);

    let mut interest = BTreeMap::new();
    for person in participants {
        interest.insert(
            person.clone(),
            interest_score(person, engagement, timing, patterns, strategy),
        );
    }

    let months: Vec<String> = patterns.monthly_volume.keys().cloned().collect();
    let mut ghost_risk = BTreeMap::new();
    for person in participants {
        ghost_risk.insert(
            person.clone(),
            ghost_risk_score(person, &months, messages, sessions, events, patterns),
        );
    }

    let delusion = match &pair {
        Some((a, b)) => {
            let ia = interest.get(a).map(|i| i.score).unwrap_or(0.0);
            let ib = interest.get(b).map(|i| i.score).unwrap_or(0.0);
            Measured::Measured((ia - ib).abs())
        }
        None => Measured::InsufficientData,
    };

    ViralScores {
        compatibility,
        interest,
        ghost_risk,
        delusion,
    }
}

fn compatibility_score(
    pair: Option<(String, String)>,
    engagement: &BTreeMap<String, PersonEngagement>,
    timing: &BTreeMap<String, Measured<ResponseStats>>,
    patterns: &PatternReport,
) -> CompatibilityScore {
    let Some((a, b)) = pair else {
        return CompatibilityScore::default();
    };

    let ea = engagement.get(&a).cloned().unwrap_or_default();
    let eb = engagement.get(&b).cloned().unwrap_or_default();

    let activity_overlap = match (patterns.heatmaps.get(&a), patterns.heatmaps.get(&b)) {
        (Some(ha), Some(hb)) => heatmap_overlap(ha, hb),
        _ => SubScore::unmeasured(),
    };

    let response_symmetry = match (median_of(timing, &a), median_of(timing, &b)) {
        (Some(ra), Some(rb)) if ra.max(rb) > 0.0 => {
            SubScore::measured(ra.min(rb) / ra.max(rb) * 100.0)
        }
        _ => SubScore::unmeasured(),
    };

    let message_balance = balance(ea.messages as f64, eb.messages as f64);
    let engagement_balance = balance(ea.reaction_give_rate, eb.reaction_give_rate);
    let length_match = balance(ea.avg_message_chars, eb.avg_message_chars);

    let score = (activity_overlap.value
        + response_symmetry.value
        + message_balance.value
        + engagement_balance.value
        + length_match.value)
        / 5.0;

    CompatibilityScore {
        pair: Some((a, b)),
        score: score.clamp(0.0, 100.0),
        activity_overlap,
        response_symmetry,
        message_balance,
        engagement_balance,
        length_match,
    }
}

/// Histogram intersection of two normalized heatmaps, 0-100.
fn heatmap_overlap(a: &Heatmap, b: &Heatmap) -> SubScore {
    let total_a = a.total() as f64;
    let total_b = b.total() as f64;
    if total_a == 0.0 || total_b == 0.0 {
        return SubScore::unmeasured();
    }

    let mut overlap = 0.0;
    for weekday in 0..7 {
        for hour in 0..24 {
            let na = f64::from(a.cells[weekday][hour]) / total_a;
            let nb = f64::from(b.cells[weekday][hour]) / total_b;
            overlap += na.min(nb);
        }
    }
    SubScore::measured(overlap * 100.0)
}

fn interest_score(
    person: &str,
    engagement: &BTreeMap<String, PersonEngagement>,
    timing: &BTreeMap<String, Measured<ResponseStats>>,
    patterns: &PatternReport,
    strategy: &PercentileStrategy,
) -> InterestScore {
    let stats = engagement.get(person).cloned().unwrap_or_default();

    let response_speed = median_of(timing, person)
        .map(|median| response_time_percentile(median, strategy))
        .unwrap_or(0.0);

    let initiation = (stats.initiation_share * 2.0).min(100.0);

    let double_text_rate = if stats.messages > 0 {
        stats.double_texts as f64 / stats.messages as f64
    } else {
        0.0
    };
    let double_text = (double_text_rate * 500.0).min(100.0);

    let engagement_term = (stats.reaction_receive_rate * 500.0).min(100.0);

    let message_effort = (stats.avg_message_words * 5.0).min(100.0);

    let late_night = patterns
        .heatmaps
        .get(person)
        .map(late_night_share)
        .map(|share| (share * 250.0).min(100.0))
        .unwrap_or(0.0);

    let score = response_speed * RESPONSE_SPEED_WEIGHT
        + initiation * INITIATION_WEIGHT
        + double_text * DOUBLE_TEXT_WEIGHT
        + engagement_term * ENGAGEMENT_WEIGHT
        + message_effort * MESSAGE_EFFORT_WEIGHT
        + late_night * LATE_NIGHT_WEIGHT;

    InterestScore {
        score: score.clamp(0.0, 100.0),
        response_speed,
        initiation,
        double_text,
        engagement: engagement_term,
        message_effort,
        late_night,
    }
}

/// Share of a person's messages landing in the late-night window.
fn late_night_share(heatmap: &Heatmap) -> f64 {
    let total = heatmap.total() as f64;
    if total == 0.0 {
        return 0.0;
    }
    let late: u64 = heatmap
        .cells
        .iter()
        .map(|row| LATE_NIGHT_HOURS.iter().map(|&h| u64::from(row[h])).sum::<u64>())
        .sum();
    late as f64 / total
}

fn ghost_risk_score(
    person: &str,
    months: &[String],
    messages: &[UnifiedMessage],
    sessions: &[Session],
    events: &[ResponseEvent],
    patterns: &PatternReport,
) -> Measured<GhostRiskScore> {
    if months.len() < GHOST_MIN_MONTHS {
        return Measured::InsufficientData;
    }

    let recent_month = &months[months.len() - 1];
    let baseline_months = &months[..months.len() - 1];

    // Volume: recent month vs mean of prior months
    let person_volume = |month: &String| -> f64 {
        patterns
            .monthly_volume
            .get(month)
            .and_then(|m| m.get(person))
            .copied()
            .unwrap_or(0) as f64
    };
    let recent_volume = person_volume(recent_month);
    let baseline_volume = mean(baseline_months.iter().map(person_volume));
    let volume_trend = decline_risk(recent_volume, baseline_volume, 125.0);

    // Reply latency: recent vs baseline mean
    let latency = monthly_means(
        events
            .iter()
            .filter(|e| e.reply_sender == person)
            .map(|e| (month_key_ms(e.reply_ms), e.delta_ms as f64)),
    );
    let recent_latency = latency.get(recent_month).copied();
    let baseline_latency = mean_of_months(&latency, baseline_months);
    let response_trend = match (recent_latency, baseline_latency) {
        (Some(recent), Some(baseline)) if baseline > 0.0 => {
            (((recent / baseline) - 1.0) * 50.0).clamp(0.0, 100.0)
        }
        // No recent replies at all from someone who used to reply is
        // itself a strong withdrawal signal
        (None, Some(_)) => 100.0,
        _ => 50.0,
    };

    // Initiation share: recent vs baseline
    let initiation = monthly_means(sessions.iter().map(|s| {
        (
            month_key_ms(s.start_ms),
            if s.starter == person { 100.0 } else { 0.0 },
        )
    }));
    let recent_initiation = initiation.get(recent_month).copied();
    let baseline_initiation = mean_of_months(&initiation, baseline_months);
    let initiation_trend = match (recent_initiation, baseline_initiation) {
        (Some(recent), Some(baseline)) => ((baseline - recent) * 2.5).clamp(0.0, 100.0),
        (None, Some(_)) => 100.0,
        _ => 50.0,
    };

    // Message length: recent vs baseline
    let lengths = monthly_means(messages.iter().filter(|m| m.sender == person).map(|m| {
        (
            month_key_ms(m.timestamp_ms),
            m.content.chars().count() as f64,
        )
    }));
    let recent_length = lengths.get(recent_month).copied().unwrap_or(0.0);
    let baseline_length = mean_of_months(&lengths, baseline_months);
    let length_trend = match baseline_length {
        Some(baseline) => decline_risk(recent_length, baseline, 200.0),
        None => 50.0,
    };

    let score = response_trend * RESPONSE_TREND_WEIGHT
        + volume_trend * VOLUME_TREND_WEIGHT
        + initiation_trend * INITIATION_TREND_WEIGHT
        + length_trend * LENGTH_TREND_WEIGHT;
    let score = score.clamp(0.0, 100.0);

    let level = if score < 35.0 {
        GhostRiskLevel::Low
    } else if score < 65.0 {
        GhostRiskLevel::Medium
    } else {
        GhostRiskLevel::High
    };

    Measured::Measured(GhostRiskScore {
        score,
        level,
        response_trend,
        volume_trend,
        initiation_trend,
        length_trend,
    })
}

fn balance(a: f64, b: f64) -> SubScore {
    let max = a.max(b);
    if max <= 0.0 {
        return SubScore::unmeasured();
    }
    SubScore::measured(a.min(b) / max * 100.0)
}

fn median_of(timing: &BTreeMap<String, Measured<ResponseStats>>, person: &str) -> Option<f64> {
    timing
        .get(person)
        .and_then(|m| m.value())
        .map(|s| s.median_ms)
}

fn month_key_ms(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|ts| format!("{:04}-{:02}", ts.year(), ts.month()))
        .unwrap_or_default()
}

/// Collapse (month, value) samples into per-month means.
fn monthly_means(samples: impl Iterator<Item = (String, f64)>) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for (month, value) in samples {
        let entry = sums.entry(month).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(month, (sum, n))| (month, sum / n as f64))
        .collect()
}

fn mean_of_months(values: &BTreeMap<String, f64>, months: &[String]) -> Option<f64> {
    let present: Vec<f64> = months.iter().filter_map(|m| values.get(m)).copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        return 0.0;
    }
    collected.iter().sum::<f64>() / collected.len() as f64
}

/// Risk from a value declining against its baseline: 0 when stable or
/// growing, `scale x` the relative drop otherwise.
fn decline_risk(recent: f64, baseline: f64, scale: f64) -> f64 {
    if baseline <= 0.0 {
        return 50.0;
    }
    ((1.0 - recent / baseline) * scale).clamp(0.0, 100.0)
}
