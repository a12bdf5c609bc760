//! Conflict event detection
//!
//! A state machine over the timeline detecting three event kinds:
//!
//! - **Escalation**: a message whose intensity signal exceeds a multiple of
//!   the rolling average while the exchange is a rapid back-and-forth.
//!   A conflict-indicative bigram upgrades severity to severe.
//! - **Cold silence**: a gap exceeding both the configured threshold and
//!   the conversation's historical P75 gap, preceded by an active window
//!   (so silences starting from an already-quiet period do not count).
//! - **Resolution**: a burst of short messages shortly after a cold
//!   silence ends.

use crate::analysis::sentiment;
use crate::analysis::timing::percentile;
use crate::config::ConflictConfig;
use crate::types::UnifiedMessage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bigrams that mark a heated exchange. Matched case-insensitively against
/// message content.
const CONFLICT_BIGRAMS: &[&str] = &[
    "you always",
    "you never",
    "i hate",
    "shut up",
    "leave me",
    "stop texting",
    "stop talking",
    "don't care",
    "dont care",
    "your fault",
    "i'm done",
    "im done",
    "so done",
    "fed up",
    "whatever then",
];

/// Per-event score weights for the conflict-prone ranking.
const ESCALATION_WEIGHT: f64 = 2.0;
const COLD_SILENCE_WEIGHT: f64 = 1.5;
const RESOLUTION_WEIGHT: f64 = -0.5;

/// Kind of conflict event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Escalation,
    ColdSilence,
    Resolution,
}

/// Severity of a conflict event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Mild,
    Severe,
}

/// A detected conflict event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictEvent {
    pub kind: ConflictKind,
    pub severity: ConflictSeverity,
    /// When the event occurred (epoch ms)
    pub timestamp_ms: i64,
    /// Participants the event is attributed to
    pub participants: Vec<String>,
    /// Positions in the sorted message slice (inclusive)
    pub message_range: (usize, usize),
}

/// Conflict detection output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    /// All detected events in timeline order
    pub events: Vec<ConflictEvent>,
    /// Weighted conflict score per participant
    pub scores: BTreeMap<String, f64>,
    /// Participant with the highest positive score
    pub most_conflict_prone: Option<String>,
}

/// Run the conflict state machine over a sorted message slice.
pub fn detect_conflicts(
    messages: &[UnifiedMessage],
    participants: &[String],
    config: &ConflictConfig,
) -> ConflictReport {
    let mut report = ConflictReport::default();
    if messages.len() < 2 {
        return report;
    }

    detect_escalations(messages, config, &mut report.events);
    let silences = detect_cold_silences(messages, participants, config, &mut report.events);
    detect_resolutions(messages, &silences, config, &mut report.events);

    report
        .events
        .sort_by_key(|e| (e.timestamp_ms, e.message_range.0));

    report.scores = score_participants(&report.events, participants);
    report.most_conflict_prone = report
        .scores
        .iter()
        .filter(|(_, &score)| score > 0.0)
        .fold(None, |best: Option<(&String, f64)>, (name, &score)| {
            match best {
                Some((_, s)) if s >= score => best,
                _ => Some((name, score)),
            }
        })
        .map(|(name, _)| name.clone());

    tracing::debug!(events = report.events.len(), "Conflict detection complete");
    report
}

/// Local intensity of a single message.
///
/// Baseline 1.0 plus exclamation marks, shouted words, and negative-lexicon
/// hits, so the rolling average never collapses to zero on calm stretches.
fn message_intensity(msg: &UnifiedMessage) -> f64 {
    let exclamations = msg.content.matches('!').count().min(5);
    let shouted = msg
        .content
        .split_whitespace()
        .filter(|w| w.len() >= 3 && w.chars().any(|c| c.is_alphabetic()))
        .filter(|w| w.chars().filter(|c| c.is_alphabetic()).all(|c| c.is_uppercase()))
        .count();
    let negative = sentiment::negative_word_count(&msg.content);

    1.0 + exclamations as f64 + shouted as f64 * 1.5 + negative as f64 * 2.0
}

fn contains_conflict_bigram(content: &str) -> bool {
    let lowered = content.to_lowercase();
    CONFLICT_BIGRAMS.iter().any(|b| lowered.contains(b))
}

/// Back-and-forth check: enough sender alternations inside the trailing
/// window, and the window itself fits within the rapid-exchange span.
fn is_back_and_forth(messages: &[UnifiedMessage], at: usize, config: &ConflictConfig) -> bool {
    if at + 1 < config.alternation_window {
        return false;
    }
    let start = at + 1 - config.alternation_window;
    let window = &messages[start..=at];

    let alternations = window
        .windows(2)
        .filter(|pair| pair[0].sender != pair[1].sender)
        .count();
    let span = window[window.len() - 1].timestamp_ms - window[0].timestamp_ms;

    alternations >= config.min_alternations && span <= config.rapid_exchange_span_ms
}

fn detect_escalations(
    messages: &[UnifiedMessage],
    config: &ConflictConfig,
    events: &mut Vec<ConflictEvent>,
) {
    let intensities: Vec<f64> = messages.iter().map(message_intensity).collect();

    for i in 1..messages.len() {
        let window_start = i.saturating_sub(config.rolling_window);
        let window = &intensities[window_start..i];
        let rolling_avg = window.iter().sum::<f64>() / window.len() as f64;

        if intensities[i] > config.escalation_ratio * rolling_avg
            && is_back_and_forth(messages, i, config)
        {
            let severity = if contains_conflict_bigram(&messages[i].content) {
                ConflictSeverity::Severe
            } else {
                ConflictSeverity::Mild
            };
            events.push(ConflictEvent {
                kind: ConflictKind::Escalation,
                severity,
                timestamp_ms: messages[i].timestamp_ms,
                participants: vec![messages[i].sender.clone()],
                message_range: (i + 1 - config.alternation_window, i),
            });
        }
    }
}

/// Detect cold silences; returns the positions of the messages that broke
/// each silence, for the resolution pass.
fn detect_cold_silences(
    messages: &[UnifiedMessage],
    participants: &[String],
    config: &ConflictConfig,
    events: &mut Vec<ConflictEvent>,
) -> Vec<usize> {
    let mut gaps: Vec<f64> = messages
        .windows(2)
        .map(|pair| (pair[1].timestamp_ms - pair[0].timestamp_ms) as f64)
        .collect();
    gaps.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let p75_gap = percentile(&gaps, 75.0);

    let mut breakers = Vec::new();
    for i in 1..messages.len() {
        let gap = messages[i].timestamp_ms - messages[i - 1].timestamp_ms;
        if gap <= config.cold_silence_gap_ms || (gap as f64) <= p75_gap {
            continue;
        }

        // The silence only counts if the conversation was active right
        // before it went quiet.
        let silence_start = messages[i - 1].timestamp_ms;
        let lookback_from = silence_start - config.cold_lookback_ms;
        let active = messages[..i]
            .iter()
            .rev()
            .take_while(|m| m.timestamp_ms >= lookback_from)
            .count();
        if active < config.cold_lookback_min_messages {
            continue;
        }

        let last_sender = &messages[i - 1].sender;
        let withdrawn: Vec<String> = participants
            .iter()
            .filter(|p| *p != last_sender)
            .cloned()
            .collect();
        let severity = if gap > 2 * config.cold_silence_gap_ms {
            ConflictSeverity::Severe
        } else {
            ConflictSeverity::Mild
        };

        events.push(ConflictEvent {
            kind: ConflictKind::ColdSilence,
            severity,
            timestamp_ms: silence_start,
            participants: withdrawn,
            message_range: (i - 1, i),
        });
        breakers.push(i);
    }
    breakers
}

fn detect_resolutions(
    messages: &[UnifiedMessage],
    silence_breakers: &[usize],
    config: &ConflictConfig,
    events: &mut Vec<ConflictEvent>,
) {
    for &start in silence_breakers {
        let window_end_ms = messages[start].timestamp_ms + config.resolution_window_ms;
        let mut short_counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();

        let mut last = start;
        for (pos, msg) in messages.iter().enumerate().skip(start) {
            if msg.timestamp_ms > window_end_ms {
                break;
            }
            last = pos;
            if msg.word_count() <= config.resolution_max_words && msg.word_count() > 0 {
                let entry = short_counts.entry(msg.sender.as_str()).or_insert((0, pos));
                entry.0 += 1;
                entry.1 = pos;
            }
        }

        for (sender, (count, _)) in &short_counts {
            if *count > config.resolution_burst {
                events.push(ConflictEvent {
                    kind: ConflictKind::Resolution,
                    severity: ConflictSeverity::Mild,
                    timestamp_ms: messages[start].timestamp_ms,
                    participants: vec![(*sender).to_string()],
                    message_range: (start, last),
                });
            }
        }
    }
}

/// Weighted ranking: escalation 2.0, cold silence 1.5, resolution -0.5.
fn score_participants(
    events: &[ConflictEvent],
    participants: &[String],
) -> BTreeMap<String, f64> {
    let mut scores: BTreeMap<String, f64> = participants
        .iter()
        .map(|p| (p.clone(), 0.0))
        .collect();

    for event in events {
        let weight = match event.kind {
            ConflictKind::Escalation => ESCALATION_WEIGHT,
            ConflictKind::ColdSilence => COLD_SILENCE_WEIGHT,
            ConflictKind::Resolution => RESOLUTION_WEIGHT,
        };
        for participant in &event.participants {
            *scores.entry(participant.clone()).or_insert(0.0) += weight;
        }
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageKind;

    const MIN_MS: i64 = 60_000;
    const HOUR_MS: i64 = 3_600_000;

    fn msg(index: usize, sender: &str, ts: i64, content: &str) -> UnifiedMessage {
        UnifiedMessage {
            index,
            sender: sender.to_string(),
            content: content.to_string(),
            timestamp_ms: ts,
            kind: MessageKind::Text,
            reactions: vec![],
            has_media: false,
            has_link: false,
            is_unsent: false,
        }
    }

    fn participants() -> Vec<String> {
        vec!["ana".to_string(), "ben".to_string()]
    }

    /// Rapid alternating exchange with calm lead-in, ending in a hot message.
    fn heated_timeline(last_content: &str) -> Vec<UnifiedMessage> {
        let mut messages = Vec::new();
        // Calm lead-in establishes a low rolling average
        for i in 0..10 {
            let sender = if i % 2 == 0 { "ana" } else { "ben" };
            messages.push(msg(i, sender, i as i64 * MIN_MS, "ok sounds good"));
        }
        messages.push(msg(10, "ana", 10 * MIN_MS, last_content));
        messages
    }

    #[test]
    fn test_escalation_detected_in_rapid_exchange() {
        let messages = heated_timeline("STOP THIS NOW!!!");
        let report = detect_conflicts(&messages, &participants(), &ConflictConfig::default());
        let escalations: Vec<_> = report
            .events
            .iter()
            .filter(|e| e.kind == ConflictKind::Escalation)
            .collect();
        assert_eq!(escalations.len(), 1);
        assert_eq!(escalations[0].severity, ConflictSeverity::Mild);
        assert_eq!(escalations[0].participants, vec!["ana".to_string()]);
    }

    #[test]
    fn test_conflict_bigram_upgrades_to_severe() {
        let messages = heated_timeline("YOU ALWAYS do this!!! i hate it");
        let report = detect_conflicts(&messages, &participants(), &ConflictConfig::default());
        let escalation = report
            .events
            .iter()
            .find(|e| e.kind == ConflictKind::Escalation)
            .expect("escalation");
        assert_eq!(escalation.severity, ConflictSeverity::Severe);
    }

    #[test]
    fn test_no_escalation_without_alternation() {
        // Same hot message, but a monologue: no back-and-forth
        let mut messages = Vec::new();
        for i in 0..10 {
            messages.push(msg(i, "ana", i as i64 * MIN_MS, "ok sounds good"));
        }
        messages.push(msg(10, "ana", 10 * MIN_MS, "STOP THIS NOW!!!"));
        let report = detect_conflicts(&messages, &participants(), &ConflictConfig::default());
        assert!(report
            .events
            .iter()
            .all(|e| e.kind != ConflictKind::Escalation));
    }

    /// Busy evening ending on ana's message, then a long silence from ben.
    fn silence_timeline(gap_ms: i64) -> Vec<UnifiedMessage> {
        let mut messages = Vec::new();
        for i in 0..8 {
            let sender = if i % 2 == 0 { "ben" } else { "ana" };
            messages.push(msg(i, sender, i as i64 * 10 * MIN_MS, "chatting away"));
        }
        let silence_start = 70 * MIN_MS;
        messages.push(msg(8, "ben", silence_start + gap_ms, "hey, sorry"));
        messages
    }

    #[test]
    fn test_cold_silence_detected() {
        let messages = silence_timeline(14 * HOUR_MS);
        let report = detect_conflicts(&messages, &participants(), &ConflictConfig::default());
        let silence = report
            .events
            .iter()
            .find(|e| e.kind == ConflictKind::ColdSilence)
            .expect("cold silence");
        // ana sent the last message before the gap, so ben went silent
        assert_eq!(silence.participants, vec!["ben".to_string()]);
        assert_eq!(silence.severity, ConflictSeverity::Mild);
    }

    #[test]
    fn test_short_gap_is_not_cold_silence() {
        let messages = silence_timeline(10 * HOUR_MS);
        let report = detect_conflicts(&messages, &participants(), &ConflictConfig::default());
        assert!(report
            .events
            .iter()
            .all(|e| e.kind != ConflictKind::ColdSilence));
    }

    #[test]
    fn test_silence_from_quiet_period_ignored() {
        // Only 2 messages in the 6h before the gap: not a cold silence
        let messages = vec![
            msg(0, "ana", 0, "hi"),
            msg(1, "ben", 10 * MIN_MS, "hello"),
            msg(2, "ana", 20 * HOUR_MS, "you there?"),
        ];
        let report = detect_conflicts(&messages, &participants(), &ConflictConfig::default());
        assert!(report
            .events
            .iter()
            .all(|e| e.kind != ConflictKind::ColdSilence));
    }

    #[test]
    fn test_resolution_after_cold_silence() {
        let mut messages = silence_timeline(14 * HOUR_MS);
        let return_ms = messages.last().unwrap().timestamp_ms;
        // ben follows up with a burst of short messages
        for i in 0..4 {
            messages.push(msg(
                9 + i,
                "ben",
                return_ms + (i as i64 + 1) * MIN_MS,
                "i'm sorry ok",
            ));
        }
        let report = detect_conflicts(&messages, &participants(), &ConflictConfig::default());
        let resolution = report
            .events
            .iter()
            .find(|e| e.kind == ConflictKind::Resolution)
            .expect("resolution");
        assert_eq!(resolution.participants, vec!["ben".to_string()]);
    }

    #[test]
    fn test_conflict_prone_ranking() {
        let mut messages = silence_timeline(14 * HOUR_MS);
        let return_ms = messages.last().unwrap().timestamp_ms;
        for i in 0..4 {
            messages.push(msg(
                9 + i,
                "ben",
                return_ms + (i as i64 + 1) * MIN_MS,
                "i'm sorry ok",
            ));
        }
        let report = detect_conflicts(&messages, &participants(), &ConflictConfig::default());
        // ben: cold silence 1.5, resolutions -0.5 each; still positive
        assert!(report.scores["ben"] > 0.0);
        assert_eq!(report.scores["ana"], 0.0);
        assert_eq!(report.most_conflict_prone.as_deref(), Some("ben"));
    }

    #[test]
    fn test_empty_and_tiny_input() {
        assert_eq!(
            detect_conflicts(&[], &participants(), &ConflictConfig::default()),
            ConflictReport::default()
        );
        let one = vec![msg(0, "ana", 0, "hi")];
        let report = detect_conflicts(&one, &participants(), &ConflictConfig::default());
        assert!(report.events.is_empty());
    }
}
