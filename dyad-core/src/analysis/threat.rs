//! Threat meters
//!
//! Named meters, each a weighted linear combination of previously computed
//! sub-metrics. Polarity is tagged per meter: most read "higher = more
//! concerning", but trust is inverted ("higher = healthier") and callers
//! must branch on the tag, never on position.
//!
//! Also hosts the four-factor relational-conflict index (criticism,
//! contempt, defensiveness, stonewalling), a pure function over pattern
//! confidences supplied by the screening layer plus timing/ghost context
//! from this pipeline.

use crate::analysis::conflict::{ConflictKind, ConflictReport};
use crate::analysis::engagement::PersonEngagement;
use crate::analysis::pursuit::PursuitReport;
use crate::analysis::reciprocity::{primary_pair, ReciprocityIndex};
use crate::analysis::timing::ResponseStats;
use crate::analysis::viral::ViralScores;
use crate::types::Measured;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reading direction of a meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterPolarity {
    /// Higher score = more concerning
    Concern,
    /// Higher score = healthier
    Health,
}

/// One weighted input to a meter, recorded for auditability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterFactor {
    pub factor: String,
    /// Input value, 0-100
    pub value: f64,
    pub weight: f64,
}

/// A named threat meter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatMeter {
    pub id: String,
    pub name: String,
    /// Weighted combination of the breakdown, 0-100
    pub score: f64,
    pub polarity: MeterPolarity,
    pub breakdown: Vec<MeterFactor>,
}

/// All threat meters for a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreatMeters {
    pub meters: Vec<ThreatMeter>,
}

/// Log-scale response-time asymmetry: `|log10(max(ratio, 0.01))| x 30`,
/// capped at 100. Equal latencies score 0.
pub fn response_asymmetry_score(median_a_ms: f64, median_b_ms: f64) -> f64 {
    if median_a_ms <= 0.0 || median_b_ms <= 0.0 {
        return 0.0;
    }
    let ratio = (median_a_ms / median_b_ms).max(0.01);
    (ratio.log10().abs() * 30.0).min(100.0)
}

/// Compute the threat meters.
pub fn compute_threat(
    engagement: &BTreeMap<String, PersonEngagement>,
    timing: &BTreeMap<String, Measured<ResponseStats>>,
    conflict: &ConflictReport,
    pursuit: &PursuitReport,
    reciprocity: &ReciprocityIndex,
    viral: &ViralScores,
    participants: &[String],
) -> ThreatMeters {
    let pair = primary_pair(engagement, participants);

    let (initiation_imbalance, message_imbalance, double_text_norm, asymmetry) = match &pair {
        Some((a, b)) => {
            let ea = engagement.get(a).cloned().unwrap_or_default();
            let eb = engagement.get(b).cloned().unwrap_or_default();
            let double_rate = |e: &PersonEngagement| {
                if e.messages > 0 {
                    e.double_texts as f64 / e.messages as f64
                } else {
                    0.0
                }
            };
            let asymmetry = match (median_of(timing, a), median_of(timing, b)) {
                (Some(ra), Some(rb)) => response_asymmetry_score(ra, rb),
                _ => 0.0,
            };
            (
                (ea.initiation_share - eb.initiation_share).abs().min(100.0),
                (ea.message_share - eb.message_share).abs().min(100.0),
                (double_rate(&ea).max(double_rate(&eb)) * 500.0).min(100.0),
                asymmetry,
            )
        }
        None => (0.0, 0.0, 0.0, 0.0),
    };

    let total_cycles: usize = pursuit.cycles.len();
    let pursuit_intensity = (total_cycles as f64 * 25.0).min(100.0);

    let escalations = count_events(conflict, ConflictKind::Escalation);
    let cold_silences = count_events(conflict, ConflictKind::ColdSilence);
    let conflict_load =
        (escalations as f64 * 10.0 + cold_silences as f64 * 15.0).min(100.0);

    let measured_ghost: Vec<f64> = viral
        .ghost_risk
        .values()
        .filter_map(|g| g.value())
        .map(|g| g.score)
        .collect();
    let ghost_avg = if measured_ghost.is_empty() {
        50.0
    } else {
        measured_ghost.iter().sum::<f64>() / measured_ghost.len() as f64
    };

    let meters = vec![
        weighted_meter(
            "codependency",
            "Codependency",
            MeterPolarity::Concern,
            vec![
                ("initiation_imbalance", initiation_imbalance, 0.35),
                ("double_text_rate", double_text_norm, 0.18),
                ("response_asymmetry", asymmetry, 0.27),
                ("pursuit_intensity", pursuit_intensity, 0.20),
            ],
        ),
        weighted_meter(
            "power_imbalance",
            "Power Imbalance",
            MeterPolarity::Concern,
            vec![
                ("initiation_imbalance", initiation_imbalance, 0.40),
                ("message_imbalance", message_imbalance, 0.30),
                ("response_asymmetry", asymmetry, 0.30),
            ],
        ),
        weighted_meter(
            "volatility",
            "Volatility",
            MeterPolarity::Concern,
            vec![
                ("conflict_load", conflict_load, 0.60),
                ("pursuit_intensity", pursuit_intensity, 0.40),
            ],
        ),
        weighted_meter(
            "trust",
            "Trust",
            MeterPolarity::Health,
            vec![
                ("reciprocity", reciprocity.score, 0.50),
                ("ghost_calm", 100.0 - ghost_avg, 0.30),
                ("conflict_calm", 100.0 - conflict_load, 0.20),
            ],
        ),
    ];

    ThreatMeters { meters }
}

fn weighted_meter(
    id: &str,
    name: &str,
    polarity: MeterPolarity,
    factors: Vec<(&str, f64, f64)>,
) -> ThreatMeter {
    let score: f64 = factors.iter().map(|(_, value, weight)| value * weight).sum();
    ThreatMeter {
        id: id.to_string(),
        name: name.to_string(),
        score: score.clamp(0.0, 100.0),
        polarity,
        breakdown: factors
            .into_iter()
            .map(|(factor, value, weight)| MeterFactor {
                factor: factor.to_string(),
                value,
                weight,
            })
            .collect(),
    }
}

fn count_events(conflict: &ConflictReport, kind: ConflictKind) -> usize {
    conflict.events.iter().filter(|e| e.kind == kind).count()
}

fn median_of(timing: &BTreeMap<String, Measured<ResponseStats>>, person: &str) -> Option<f64> {
    timing
        .get(person)
        .and_then(|m| m.value())
        .map(|s| s.median_ms)
}

// ============================================
// Four-factor relational-conflict index
// ============================================

/// Pattern-confidence inputs, 0-100 each, supplied by the screening layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternInputs {
    pub control: f64,
    pub self_focused: f64,
    pub manipulation: f64,
    pub dramatization: f64,
    pub passive: f64,
    pub suspicion: f64,
    pub avoidance: f64,
    pub distance: f64,
}

/// Timing/ghost context from this pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingContext {
    /// Median reply latency of the first party (ms)
    pub median_rt_a_ms: f64,
    /// Median reply latency of the second party (ms)
    pub median_rt_b_ms: f64,
    /// Ghost-risk composite, 0-100 (0 when unmeasured)
    pub ghost_risk_score: f64,
}

/// Severity band of a factor score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityBand {
    None,
    Mild,
    Moderate,
    Severe,
}

impl SeverityBand {
    /// Band for a 0-100 score: `<25` none, `25-44` mild, `45-69` moderate,
    /// `>=70` severe.
    pub fn of(score: f64) -> Self {
        if score < 25.0 {
            SeverityBand::None
        } else if score < 45.0 {
            SeverityBand::Mild
        } else if score < 70.0 {
            SeverityBand::Moderate
        } else {
            SeverityBand::Severe
        }
    }
}

/// One factor of the relational-conflict index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    /// 0-100
    pub score: f64,
    pub severity: SeverityBand,
    /// True iff severity is not `None`
    pub present: bool,
}

impl FactorScore {
    fn of(score: f64) -> Self {
        let score = score.clamp(0.0, 100.0);
        let severity = SeverityBand::of(score);
        Self {
            score,
            severity,
            present: severity != SeverityBand::None,
        }
    }
}

/// The four-factor relational-conflict index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelationalConflictIndex {
    pub criticism: FactorScore,
    pub contempt: FactorScore,
    pub defensiveness: FactorScore,
    pub stonewalling: FactorScore,
}

/// Compute the four factors from pattern confidences and timing context.
pub fn relational_conflict_index(
    inputs: &PatternInputs,
    ctx: &TimingContext,
) -> RelationalConflictIndex {
    let criticism = inputs.control * 0.6 + inputs.self_focused * 0.4;

    // Minutes of absolute latency difference, 5 minutes per point, capped
    let asymmetry_boost =
        ((ctx.median_rt_a_ms - ctx.median_rt_b_ms).abs() / 60_000.0 / 5.0).min(20.0);
    let contempt = inputs.manipulation * 0.5 + inputs.dramatization * 0.3 + asymmetry_boost;

    let defensiveness = inputs.passive * 0.5 + inputs.suspicion * 0.5;

    let stonewalling = inputs.avoidance * 0.4
        + inputs.distance * 0.4
        + (ctx.ghost_risk_score * 0.2).min(20.0);

    RelationalConflictIndex {
        criticism: FactorScore::of(criticism),
        contempt: FactorScore::of(contempt),
        defensiveness: FactorScore::of(defensiveness),
        stonewalling: FactorScore::of(stonewalling),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criticism_formula_exact() {
        let inputs = PatternInputs {
            control: 60.0,
            self_focused: 40.0,
            ..Default::default()
        };
        let index = relational_conflict_index(&inputs, &TimingContext::default());
        assert_eq!(index.criticism.score, 52.0);
        assert_eq!(index.criticism.severity, SeverityBand::Moderate);
        assert!(index.criticism.present);
    }

    #[test]
    fn test_all_zero_inputs_yield_absent_factors() {
        let index =
            relational_conflict_index(&PatternInputs::default(), &TimingContext::default());
        for factor in [
            index.criticism,
            index.contempt,
            index.defensiveness,
            index.stonewalling,
        ] {
            assert_eq!(factor.score, 0.0);
            assert_eq!(factor.severity, SeverityBand::None);
            assert!(!factor.present);
        }
    }

    #[test]
    fn test_contempt_asymmetry_boost_caps_at_twenty() {
        let ctx = TimingContext {
            median_rt_a_ms: 0.0,
            median_rt_b_ms: 10.0 * 3_600_000.0, // ten hours apart
            ghost_risk_score: 0.0,
        };
        let index = relational_conflict_index(&PatternInputs::default(), &ctx);
        assert_eq!(index.contempt.score, 20.0);
        assert_eq!(index.contempt.severity, SeverityBand::None);
    }

    #[test]
    fn test_stonewalling_ghost_term_caps() {
        let ctx = TimingContext {
            ghost_risk_score: 100.0,
            ..Default::default()
        };
        let index = relational_conflict_index(&PatternInputs::default(), &ctx);
        assert_eq!(index.stonewalling.score, 20.0);
    }

    #[test]
    fn test_severity_band_edges() {
        assert_eq!(SeverityBand::of(24.9), SeverityBand::None);
        assert_eq!(SeverityBand::of(25.0), SeverityBand::Mild);
        assert_eq!(SeverityBand::of(44.9), SeverityBand::Mild);
        assert_eq!(SeverityBand::of(45.0), SeverityBand::Moderate);
        assert_eq!(SeverityBand::of(69.9), SeverityBand::Moderate);
        assert_eq!(SeverityBand::of(70.0), SeverityBand::Severe);
    }

    #[test]
    fn test_response_asymmetry_log_transform() {
        // Equal latencies: no asymmetry
        assert_eq!(response_asymmetry_score(60_000.0, 60_000.0), 0.0);
        // 10x asymmetry: |log10(10)| x 30 = 30
        let ten_x = response_asymmetry_score(600_000.0, 60_000.0);
        assert!((ten_x - 30.0).abs() < 1e-9);
        // Symmetric in argument order
        let reversed = response_asymmetry_score(60_000.0, 600_000.0);
        assert!((ten_x - reversed).abs() < 1e-9);
    }

    #[test]
    fn test_trust_meter_polarity_tagged_health() {
        let meters = compute_threat(
            &BTreeMap::new(),
            &BTreeMap::new(),
            &ConflictReport::default(),
            &PursuitReport::default(),
            &ReciprocityIndex::default(),
            &ViralScores::default(),
            &[],
        );
        let trust = meters.meters.iter().find(|m| m.id == "trust").unwrap();
        assert_eq!(trust.polarity, MeterPolarity::Health);
        for meter in meters.meters.iter().filter(|m| m.id != "trust") {
            assert_eq!(meter.polarity, MeterPolarity::Concern);
        }
    }

    #[test]
    fn test_meter_scores_bounded_and_weights_documented() {
        let meters = compute_threat(
            &BTreeMap::new(),
            &BTreeMap::new(),
            &ConflictReport::default(),
            &PursuitReport::default(),
            &ReciprocityIndex::default(),
            &ViralScores::default(),
            &[],
        );
        assert_eq!(meters.meters.len(), 4);
        for meter in &meters.meters {
            assert!((0.0..=100.0).contains(&meter.score));
            let weight_sum: f64 = meter.breakdown.iter().map(|f| f.weight).sum();
            assert!((weight_sum - 1.0).abs() < 1e-9, "weights of {}", meter.id);
        }
    }
}
