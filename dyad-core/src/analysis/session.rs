//! Session segmentation
//!
//! A session is a maximal contiguous run of messages where no gap between
//! consecutive messages exceeds the configured threshold (6 hours by
//! default). The threshold is fixed per conversation, not adapted per user
//! chronotype, so a single long gap always ends a session regardless of
//! cause.

use crate::types::UnifiedMessage;
use serde::{Deserialize, Serialize};

/// A contiguous message range forming one session.
///
/// `start`/`end` are positions into the sorted message slice (inclusive),
/// so sessions partition the timeline with no overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session ordinal (0-based)
    pub index: usize,
    /// First message position (inclusive)
    pub start: usize,
    /// Last message position (inclusive)
    pub end: usize,
    /// Timestamp of the first message (epoch ms)
    pub start_ms: i64,
    /// Timestamp of the last message (epoch ms)
    pub end_ms: i64,
    /// Messages in this session
    pub message_count: usize,
    /// Participant who sent the first message
    pub starter: String,
}

impl Session {
    /// Session duration in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }
}

/// Partition a sorted message slice into sessions.
///
/// A new session starts whenever the gap to the previous message exceeds
/// `gap_ms`. Empty input yields no sessions.
pub fn segment_sessions(messages: &[UnifiedMessage], gap_ms: i64) -> Vec<Session> {
    let mut sessions = Vec::new();
    if messages.is_empty() {
        return sessions;
    }

    let mut start = 0usize;
    for i in 1..messages.len() {
        if messages[i].timestamp_ms - messages[i - 1].timestamp_ms > gap_ms {
            sessions.push(build_session(messages, sessions.len(), start, i - 1));
            start = i;
        }
    }
    sessions.push(build_session(messages, sessions.len(), start, messages.len() - 1));

    tracing::debug!(
        sessions = sessions.len(),
        messages = messages.len(),
        "Segmented conversation into sessions"
    );

    sessions
}

fn build_session(messages: &[UnifiedMessage], index: usize, start: usize, end: usize) -> Session {
    Session {
        index,
        start,
        end,
        start_ms: messages[start].timestamp_ms,
        end_ms: messages[end].timestamp_ms,
        message_count: end - start + 1,
        starter: messages[start].sender.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageKind;

    const HOUR_MS: i64 = 3_600_000;
    const GAP_MS: i64 = 21_600_000;

    fn msg(index: usize, sender: &str, ts: i64) -> UnifiedMessage {
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
    fn test_empty_input_yields_no_sessions() {
        assert!(segment_sessions(&[], GAP_MS).is_empty());
    }

    #[test]
    fn test_seven_hour_gap_splits_two_messages() {
        // Two messages 7 hours apart must land in separate sessions
        let messages = vec![msg(0, "ana", 0), msg(1, "ben", 7 * HOUR_MS)];
        let sessions = segment_sessions(&messages, GAP_MS);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].message_count, 1);
        assert_eq!(sessions[1].message_count, 1);
        assert_eq!(sessions[1].starter, "ben");
    }

    #[test]
    fn test_gap_exactly_at_threshold_stays_one_session() {
        // The rule is strictly greater-than
        let messages = vec![msg(0, "ana", 0), msg(1, "ben", GAP_MS)];
        let sessions = segment_sessions(&messages, GAP_MS);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].message_count, 2);
    }

    #[test]
    fn test_sessions_partition_the_timeline() {
        let mut messages = Vec::new();
        let mut ts = 0i64;
        for i in 0..50 {
            // A long gap every 10 messages
            if i % 10 == 0 && i > 0 {
                ts += 8 * HOUR_MS;
            } else {
                ts += 5 * 60_000;
            }
            messages.push(msg(i, if i % 2 == 0 { "ana" } else { "ben" }, ts));
        }

        let sessions = segment_sessions(&messages, GAP_MS);
        assert_eq!(sessions.len(), 5);

        let total: usize = sessions.iter().map(|s| s.message_count).sum();
        assert_eq!(total, messages.len());

        // Contiguous and non-overlapping
        for pair in sessions.windows(2) {
            assert_eq!(pair[0].end + 1, pair[1].start);
        }
        assert_eq!(sessions.first().unwrap().start, 0);
        assert_eq!(sessions.last().unwrap().end, messages.len() - 1);
    }
}
