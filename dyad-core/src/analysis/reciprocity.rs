//! Reciprocity index
//!
//! A weighted composite measuring balance of effort between the two most
//! active participants: message balance 30%, initiation balance 25%,
//! response-time symmetry 15%, reaction balance 30%.
//!
//! Any sub-score with insufficient underlying data defaults to a neutral
//! 50 but carries `measured == false`, so callers can distinguish "neutral
//! because balanced" from "neutral because unmeasured".

use crate::analysis::engagement::PersonEngagement;
use crate::analysis::timing::ResponseStats;
use crate::types::{Measured, SubScore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MESSAGE_WEIGHT: f64 = 0.30;
const INITIATION_WEIGHT: f64 = 0.25;
const RESPONSE_WEIGHT: f64 = 0.15;
const REACTION_WEIGHT: f64 = 0.30;

/// Reciprocity composite for the conversation's primary pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReciprocityIndex {
    /// The two participants the index covers (most active pair)
    pub pair: Option<(String, String)>,
    /// Weighted composite, 0-100
    pub score: f64,
    /// Balance of message counts
    pub message_balance: SubScore,
    /// Balance of session initiations
    pub initiation_balance: SubScore,
    /// `min(rtA, rtB) / max(rtA, rtB)` over median reply latencies;
    /// extreme asymmetry drives this sharply toward 0
    pub response_symmetry: SubScore,
    /// Balance of reactions given
    pub reaction_balance: SubScore,
    /// Every sub-score was backed by real data
    pub fully_measured: bool,
}

impl Default for ReciprocityIndex {
    fn default() -> Self {
        Self {
            pair: None,
            score: 50.0,
            message_balance: SubScore::unmeasured(),
            initiation_balance: SubScore::unmeasured(),
            response_symmetry: SubScore::unmeasured(),
            reaction_balance: SubScore::unmeasured(),
            fully_measured: false,
        }
    }
}

/// Pick the two most active participants by message count, breaking ties
/// by conversation participant order.
pub fn primary_pair(
    engagement: &BTreeMap<String, PersonEngagement>,
    participants: &[String],
) -> Option<(String, String)> {
    if participants.len() < 2 {
        return None;
    }
    let mut ranked: Vec<&String> = participants.iter().collect();
    ranked.sort_by(|a, b| {
        let ma = engagement.get(*a).map(|e| e.messages).unwrap_or(0);
        let mb = engagement.get(*b).map(|e| e.messages).unwrap_or(0);
        mb.cmp(&ma).then_with(|| {
            let pa = participants.iter().position(|p| p == *a).unwrap_or(0);
            let pb = participants.iter().position(|p| p == *b).unwrap_or(0);
            pa.cmp(&pb)
        })
    });
    Some((ranked[0].clone(), ranked[1].clone()))
}

/// Compute the reciprocity index.
pub fn compute_reciprocity(
    engagement: &BTreeMap<String, PersonEngagement>,
    timing: &BTreeMap<String, Measured<ResponseStats>>,
    participants: &[String],
) -> ReciprocityIndex {
    let Some((a, b)) = primary_pair(engagement, participants) else {
        return ReciprocityIndex::default();
    };

    let ea = engagement.get(&a).cloned().unwrap_or_default();
    let eb = engagement.get(&b).cloned().unwrap_or_default();

    let message_balance = balance_score(ea.messages as f64, eb.messages as f64);
    let initiation_balance = balance_score(ea.initiations as f64, eb.initiations as f64);
    let reaction_balance = balance_score(ea.reactions_given as f64, eb.reactions_given as f64);

    let response_symmetry = match (median_of(timing, &a), median_of(timing, &b)) {
        (Some(ra), Some(rb)) if ra.max(rb) > 0.0 => {
            SubScore::measured(ra.min(rb) / ra.max(rb) * 100.0)
        }
        _ => SubScore::unmeasured(),
    };

    let score = message_balance.value * MESSAGE_WEIGHT
        + initiation_balance.value * INITIATION_WEIGHT
        + response_symmetry.value * RESPONSE_WEIGHT
        + reaction_balance.value * REACTION_WEIGHT;

    let fully_measured = message_balance.measured
        && initiation_balance.measured
        && response_symmetry.measured
        && reaction_balance.measured;

    ReciprocityIndex {
        pair: Some((a, b)),
        score: score.clamp(0.0, 100.0),
        message_balance,
        initiation_balance,
        response_symmetry,
        reaction_balance,
        fully_measured,
    }
}

/// `min/max * 100` balance; unmeasured when both sides are zero.
fn balance_score(a: f64, b: f64) -> SubScore {
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
