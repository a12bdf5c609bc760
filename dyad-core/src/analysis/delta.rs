//! Longitudinal delta comparison
//!
//! Compares two complete analyses of the same conversation taken at
//! different times. Conversations are identified by a sha256 fingerprint
//! of platform, participant list, and first-message timestamp, so the
//! fingerprint stays stable while the conversation keeps growing.
//! Comparing snapshots of different conversations is the one hard error
//! in this module.

use crate::error::{Error, Result};
use crate::types::ParsedConversation;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stable identity of a conversation across re-analyses.
pub fn conversation_fingerprint(conversation: &ParsedConversation) -> String {
    let mut hasher = Sha256::new();
    hasher.update(conversation.platform.as_str().as_bytes());
    for participant in &conversation.participants {
        hasher.update([0u8]);
        hasher.update(participant.as_bytes());
    }
    if let Some(first) = conversation.messages.first() {
        hasher.update(first.timestamp_ms.to_be_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Compact summary of one full analysis, kept by the caller between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    /// Conversation fingerprint this snapshot belongs to
    pub fingerprint: String,
    /// When the caller captured the snapshot (epoch ms)
    pub captured_at_ms: i64,
    pub total_messages: usize,
    pub total_words: usize,
    pub session_count: usize,
    /// Mean reply latency across all response events (0 when none)
    pub avg_response_time_ms: f64,
    /// Mean message length in characters
    pub avg_message_chars: f64,
    /// Messages per day over the conversation span
    pub messages_per_day: f64,
}

/// Context-sensitive reading of a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaDirection {
    /// The change reads as positive for the relationship
    Improved,
    /// The change reads as negative
    Declined,
    /// Neither direction is inherently better (message length)
    Neutral,
    /// No change
    Unchanged,
}

/// One compared metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub metric: String,
    pub before: f64,
    pub after: f64,
    pub change: f64,
    /// Percent change relative to `before` (100 when growing from zero)
    pub change_pct: f64,
    pub direction: DeltaDirection,
}

/// Overall message-volume movement between snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeTrend {
    Increasing,
    Stable,
    Decreasing,
}

/// Full comparison of two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDelta {
    pub fingerprint: String,
    /// Time between the two captures (ms)
    pub elapsed_ms: i64,
    pub deltas: Vec<MetricDelta>,
    pub volume_trend: VolumeTrend,
}

/// Daily-rate ratio bounds for calling the volume trend stable.
const STABLE_RATIO_LOW: f64 = 0.9;
const STABLE_RATIO_HIGH: f64 = 1.1;

/// Compare two snapshots of the same conversation.
pub fn compare_snapshots(
    before: &AnalysisSnapshot,
    after: &AnalysisSnapshot,
) -> Result<AnalysisDelta> {
    if before.fingerprint != after.fingerprint {
        return Err(Error::FingerprintMismatch {
            before: before.fingerprint.clone(),
            after: after.fingerprint.clone(),
        });
    }

    let deltas = vec![
        delta(
            "total_messages",
            before.total_messages as f64,
            after.total_messages as f64,
            more_is_better,
        ),
        delta(
            "total_words",
            before.total_words as f64,
            after.total_words as f64,
            more_is_better,
        ),
        delta(
            "session_count",
            before.session_count as f64,
            after.session_count as f64,
            more_is_better,
        ),
        delta(
            "avg_response_time_ms",
            before.avg_response_time_ms,
            after.avg_response_time_ms,
            less_is_better,
        ),
        // Message length has no inherent good direction
        delta(
            "avg_message_chars",
            before.avg_message_chars,
            after.avg_message_chars,
            neutral,
        ),
    ];

    let volume_trend = if before.messages_per_day <= 0.0 {
        if after.messages_per_day > 0.0 {
            VolumeTrend::Increasing
        } else {
            VolumeTrend::Stable
        }
    } else {
        let ratio = after.messages_per_day / before.messages_per_day;
        if ratio > STABLE_RATIO_HIGH {
            VolumeTrend::Increasing
        } else if ratio < STABLE_RATIO_LOW {
            VolumeTrend::Decreasing
        } else {
            VolumeTrend::Stable
        }
    };

    Ok(AnalysisDelta {
        fingerprint: after.fingerprint.clone(),
        elapsed_ms: after.captured_at_ms - before.captured_at_ms,
        deltas,
        volume_trend,
    })
}

fn delta(
    metric: &str,
    before: f64,
    after: f64,
    direction_of: fn(f64) -> DeltaDirection,
) -> MetricDelta {
    let change = after - before;
    let change_pct = if before == 0.0 {
        if change == 0.0 {
            0.0
        } else {
            100.0
        }
    } else {
        change / before * 100.0
    };
    MetricDelta {
        metric: metric.to_string(),
        before,
        after,
        change,
        change_pct,
        direction: if change == 0.0 {
            DeltaDirection::Unchanged
        } else {
            direction_of(change)
        },
    }
}

fn more_is_better(change: f64) -> DeltaDirection {
    if change > 0.0 {
        DeltaDirection::Improved
    } else {
        DeltaDirection::Declined
    }
}

fn less_is_better(change: f64) -> DeltaDirection {
    if change < 0.0 {
        DeltaDirection::Improved
    } else {
        DeltaDirection::Declined
    }
}

fn neutral(_change: f64) -> DeltaDirection {
    DeltaDirection::Neutral
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MessageKind, Platform, UnifiedMessage};

    fn snapshot(fingerprint: &str) -> AnalysisSnapshot {
        AnalysisSnapshot {
            fingerprint: fingerprint.to_string(),
            captured_at_ms: 1_000,
            total_messages: 100,
            total_words: 800,
            session_count: 10,
            avg_response_time_ms: 300_000.0,
            avg_message_chars: 42.0,
            messages_per_day: 12.0,
        }
    }

    fn message(index: usize, sender: &str, ts: i64) -> UnifiedMessage {
        UnifiedMessage {
            index,
            sender: sender.to_string(),
            content: "hi".to_string(),
            timestamp_ms: ts,
            kind: MessageKind::Text,
            reactions: vec![],
            has_media: false,
            has_link: false,
            is_unsent: false,
        }
    }

    #[test]
    fn test_fingerprint_stable_as_conversation_grows() {
        let participants = vec!["ana".to_string(), "ben".to_string()];
        let short = ParsedConversation::new(
            Platform::Whatsapp,
            participants.clone(),
            vec![message(0, "ana", 1_000)],
        );
        let long = ParsedConversation::new(
            Platform::Whatsapp,
            participants,
            vec![message(0, "ana", 1_000), message(1, "ben", 2_000)],
        );
        assert_eq!(
            conversation_fingerprint(&short),
            conversation_fingerprint(&long)
        );
    }

    #[test]
    fn test_fingerprint_differs_across_conversations() {
        let a = ParsedConversation::new(
            Platform::Whatsapp,
            vec!["ana".to_string(), "ben".to_string()],
            vec![message(0, "ana", 1_000)],
        );
        let b = ParsedConversation::new(
            Platform::Imessage,
            vec!["ana".to_string(), "ben".to_string()],
            vec![message(0, "ana", 1_000)],
        );
        assert_ne!(conversation_fingerprint(&a), conversation_fingerprint(&b));
    }

    #[test]
    fn test_mismatched_fingerprints_error() {
        let before = snapshot("aaa");
        let after = snapshot("bbb");
        assert!(matches!(
            compare_snapshots(&before, &after),
            Err(Error::FingerprintMismatch { .. })
        ));
    }

    #[test]
    fn test_lower_response_time_is_improvement() {
        let before = snapshot("fp");
        let mut after = snapshot("fp");
        after.captured_at_ms = 2_000;
        after.avg_response_time_ms = 120_000.0;

        let comparison = compare_snapshots(&before, &after).unwrap();
        let rt = comparison
            .deltas
            .iter()
            .find(|d| d.metric == "avg_response_time_ms")
            .unwrap();
        assert_eq!(rt.direction, DeltaDirection::Improved);
        assert!(rt.change < 0.0);
        assert_eq!(comparison.elapsed_ms, 1_000);
    }

    #[test]
    fn test_message_length_change_is_neutral() {
        let before = snapshot("fp");
        let mut after = snapshot("fp");
        after.avg_message_chars = 80.0;

        let comparison = compare_snapshots(&before, &after).unwrap();
        let length = comparison
            .deltas
            .iter()
            .find(|d| d.metric == "avg_message_chars")
            .unwrap();
        assert_eq!(length.direction, DeltaDirection::Neutral);
    }

    #[test]
    fn test_unchanged_metrics_tagged_unchanged() {
        let before = snapshot("fp");
        let after = snapshot("fp");
        let comparison = compare_snapshots(&before, &after).unwrap();
        assert!(comparison
            .deltas
            .iter()
            .all(|d| d.direction == DeltaDirection::Unchanged));
        assert_eq!(comparison.volume_trend, VolumeTrend::Stable);
    }

    #[test]
    fn test_volume_trend_thresholds() {
        let before = snapshot("fp");

        let mut after = snapshot("fp");
        after.messages_per_day = 20.0;
        assert_eq!(
            compare_snapshots(&before, &after).unwrap().volume_trend,
            VolumeTrend::Increasing
        );

        after.messages_per_day = 5.0;
        assert_eq!(
            compare_snapshots(&before, &after).unwrap().volume_trend,
            VolumeTrend::Decreasing
        );

        after.messages_per_day = 12.5;
        assert_eq!(
            compare_snapshots(&before, &after).unwrap().volume_trend,
            VolumeTrend::Stable
        );
    }
}
