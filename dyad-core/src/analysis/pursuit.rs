//! Pursuit-withdrawal cycle detection
//!
//! A pursuit is a burst of consecutive messages from one sender packed
//! into a short window; a withdrawal is a long silence immediately after
//! it. Cycles pair the pursuer with the party who went quiet and record
//! whether that party ever re-engaged.

use crate::config::PursuitConfig;
use crate::types::UnifiedMessage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One paired pursuit-withdrawal cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PursuitCycle {
    /// Sender of the pursuit burst
    pub pursuer: String,
    /// Party who went silent (most recent other sender before the burst)
    pub withdrawer: Option<String>,
    /// When the burst began (epoch ms)
    pub start_ms: i64,
    /// Messages in the burst
    pub burst_messages: usize,
    /// Silence length: burst end to the withdrawer's return, or to the
    /// next message when the withdrawer never came back
    pub duration_ms: i64,
    /// The withdrawer eventually re-engaged
    pub resolved: bool,
    /// Positions of the burst in the sorted message slice (inclusive)
    pub message_range: (usize, usize),
}

/// Pursuit-withdrawal detection output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PursuitReport {
    /// Cycles in timeline order
    pub cycles: Vec<PursuitCycle>,
    /// Cycles per pursuer
    pub pursuit_counts: BTreeMap<String, usize>,
}

/// Detect pursuit-withdrawal cycles over a sorted message slice.
pub fn detect_pursuit(
    messages: &[UnifiedMessage],
    participants: &[String],
    config: &PursuitConfig,
) -> PursuitReport {
    let mut report = PursuitReport::default();
    for p in participants {
        report.pursuit_counts.insert(p.clone(), 0);
    }
    if messages.is_empty() {
        return report;
    }

    // A run breaks on sender change or on any withdrawal-length silence;
    // the latter also closes a pursuer's own run (a double-texter gone
    // quiet still withdrew the burst). Trailing runs have no observable
    // silence and are skipped.
    let mut run_start = 0usize;
    for i in 1..messages.len() {
        let silence = messages[i].timestamp_ms - messages[i - 1].timestamp_ms;

        if silence > config.withdrawal_silence_ms {
            if is_pursuit_burst(&messages[run_start..i], config) {
                let cycle = build_cycle(messages, participants, run_start, i - 1);
                *report
                    .pursuit_counts
                    .entry(cycle.pursuer.clone())
                    .or_default() += 1;
                report.cycles.push(cycle);
            }
            run_start = i;
        } else if messages[i].sender != messages[run_start].sender {
            run_start = i;
        }
    }

    report
}

/// A run qualifies as a pursuit burst if some `burst_size` consecutive
/// messages of it fit inside the pursuit window.
fn is_pursuit_burst(run: &[UnifiedMessage], config: &PursuitConfig) -> bool {
    if run.len() < config.burst_size {
        return false;
    }
    run.windows(config.burst_size).any(|w| {
        w[w.len() - 1].timestamp_ms - w[0].timestamp_ms <= config.window_ms
    })
}

fn build_cycle(
    messages: &[UnifiedMessage],
    participants: &[String],
    run_start: usize,
    run_end: usize,
) -> PursuitCycle {
    let pursuer = messages[run_start].sender.clone();

    // The party who went quiet: whoever spoke most recently before the
    // burst, falling back to participant order when the burst opens the
    // conversation.
    let withdrawer = messages[..run_start]
        .iter()
        .rev()
        .find(|m| m.sender != pursuer)
        .map(|m| m.sender.clone())
        .or_else(|| participants.iter().find(|p| **p != pursuer).cloned());

    let burst_end_ms = messages[run_end].timestamp_ms;
    let returned = withdrawer.as_ref().and_then(|w| {
        messages[run_end + 1..]
            .iter()
            .find(|m| m.sender == *w)
            .map(|m| m.timestamp_ms)
    });

    let (resolved, duration_ms) = match returned {
        Some(ts) => (true, ts - burst_end_ms),
        None => (
            false,
            messages
                .get(run_end + 1)
                .map(|m| m.timestamp_ms - burst_end_ms)
                .unwrap_or(0),
        ),
    };

    PursuitCycle {
        pursuer,
        withdrawer,
        start_ms: messages[run_start].timestamp_ms,
        burst_messages: run_end - run_start + 1,
        duration_ms,
        resolved,
        message_range: (run_start, run_end),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageKind;

    const MIN_MS: i64 = 60_000;
    const HOUR_MS: i64 = 3_600_000;

    fn msg(index: usize, sender: &str, ts: i64) -> UnifiedMessage {
        UnifiedMessage {
            index,
            sender: sender.to_string(),
            content: "hey".to_string(),
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

    /// ben replies once, then ana sends a 4-message burst, then silence,
    /// then `returner` speaks.
    fn cycle_timeline(silence_ms: i64, returner: &str) -> Vec<UnifiedMessage> {
        let mut messages = vec![msg(0, "ben", 0)];
        for i in 0..4 {
            messages.push(msg(1 + i, "ana", MIN_MS + i as i64 * 10 * MIN_MS));
        }
        let burst_end = MIN_MS + 30 * MIN_MS;
        messages.push(msg(5, returner, burst_end + silence_ms));
        messages
    }

    #[test]
    fn test_cycle_detected_and_resolved() {
        let messages = cycle_timeline(8 * HOUR_MS, "ben");
        let report = detect_pursuit(&messages, &participants(), &PursuitConfig::default());
        assert_eq!(report.cycles.len(), 1);
        let cycle = &report.cycles[0];
        assert_eq!(cycle.pursuer, "ana");
        assert_eq!(cycle.withdrawer.as_deref(), Some("ben"));
        assert_eq!(cycle.burst_messages, 4);
        assert!(cycle.resolved);
        assert_eq!(cycle.duration_ms, 8 * HOUR_MS);
        assert_eq!(report.pursuit_counts["ana"], 1);
    }

    #[test]
    fn test_unresolved_when_pursuer_returns_alone() {
        let messages = cycle_timeline(8 * HOUR_MS, "ana");
        let report = detect_pursuit(&messages, &participants(), &PursuitConfig::default());
        assert_eq!(report.cycles.len(), 1);
        let cycle = &report.cycles[0];
        assert!(!cycle.resolved);
        assert_eq!(cycle.duration_ms, 8 * HOUR_MS);
    }

    #[test]
    fn test_short_silence_is_no_withdrawal() {
        let messages = cycle_timeline(2 * HOUR_MS, "ben");
        let report = detect_pursuit(&messages, &participants(), &PursuitConfig::default());
        assert!(report.cycles.is_empty());
    }

    #[test]
    fn test_slow_run_is_no_pursuit() {
        // 4 messages spread over 9 hours never fit the 2-hour window
        let mut messages = vec![msg(0, "ben", 0)];
        for i in 0..4 {
            messages.push(msg(1 + i, "ana", MIN_MS + i as i64 * 3 * HOUR_MS));
        }
        messages.push(msg(5, "ben", MIN_MS + 9 * HOUR_MS + 7 * HOUR_MS));
        let report = detect_pursuit(&messages, &participants(), &PursuitConfig::default());
        assert!(report.cycles.is_empty());
    }

    #[test]
    fn test_trailing_burst_without_successor_is_ignored() {
        // Silence length is unobservable when the conversation just ends
        let mut messages = vec![msg(0, "ben", 0)];
        for i in 0..4 {
            messages.push(msg(1 + i, "ana", MIN_MS + i as i64 * MIN_MS));
        }
        let report = detect_pursuit(&messages, &participants(), &PursuitConfig::default());
        assert!(report.cycles.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let report = detect_pursuit(&[], &participants(), &PursuitConfig::default());
        assert!(report.cycles.is_empty());
    }
}
