//! Core domain types for dyad
//!
//! These types represent the normalized conversation model that platform
//! importers (WhatsApp, iMessage, Instagram, ...) produce and that every
//! analyzer consumes. The analytics pipeline treats a [`ParsedConversation`]
//! as read-only input: all metrics are derived views, recomputed wholesale
//! on each run and never mutated in place.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Participant** | A named party in the conversation |
//! | **Session** | A maximal run of messages with no gap above the session threshold |
//! | **ResponseEvent** | A sender change plus the latency it carries |
//! | **Measured** | A value that knows whether enough data backed it |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Platform
// ============================================

/// Source platform of a conversation export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Whatsapp,
    Imessage,
    Instagram,
    Telegram,
    Discord,
    /// Any platform the importer layer does not name explicitly
    Other,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Whatsapp => "whatsapp",
            Platform::Imessage => "imessage",
            Platform::Instagram => "instagram",
            Platform::Telegram => "telegram",
            Platform::Discord => "discord",
            Platform::Other => "other",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whatsapp" => Ok(Platform::Whatsapp),
            "imessage" => Ok(Platform::Imessage),
            "instagram" => Ok(Platform::Instagram),
            "telegram" => Ok(Platform::Telegram),
            "discord" => Ok(Platform::Discord),
            "other" => Ok(Platform::Other),
            _ => Err(format!("unknown platform: {}", s)),
        }
    }
}

// ============================================
// Messages
// ============================================

/// Kind of message within a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain text message
    Text,
    /// Photo, video, voice note, sticker
    Media,
    /// Voice or video call record
    Call,
    /// Platform-generated notice (member added, name changed, ...)
    System,
    /// Message deleted by its sender
    Unsent,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Media => "media",
            MessageKind::Call => "call",
            MessageKind::System => "system",
            MessageKind::Unsent => "unsent",
        }
    }
}

impl std::str::FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageKind::Text),
            "media" => Ok(MessageKind::Media),
            "call" => Ok(MessageKind::Call),
            "system" => Ok(MessageKind::System),
            "unsent" => Ok(MessageKind::Unsent),
            _ => Err(format!("unknown message kind: {}", s)),
        }
    }
}

/// An emoji reaction attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    /// The reaction emoji
    pub emoji: String,
    /// Participant who placed the reaction
    pub actor: String,
}

/// A single message in the normalized timeline.
///
/// Messages are sorted ascending by timestamp; ties break by `index`
/// (the stable original export order).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedMessage {
    /// Stable original order, used as tie-break
    pub index: usize,
    /// Participant who sent this message
    pub sender: String,
    /// Text content (empty for pure media/call records)
    pub content: String,
    /// Epoch milliseconds
    pub timestamp_ms: i64,
    /// Kind of message
    pub kind: MessageKind,
    /// Reactions placed on this message
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    /// Message carries an attachment
    #[serde(default)]
    pub has_media: bool,
    /// Message carries a URL
    #[serde(default)]
    pub has_link: bool,
    /// Message was deleted by its sender
    #[serde(default)]
    pub is_unsent: bool,
}

impl UnifiedMessage {
    /// Timestamp as a UTC datetime.
    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp_ms).unwrap_or_default()
    }

    /// Whitespace-separated word count of the content.
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    /// Whether this message carries analyzable text.
    pub fn is_text(&self) -> bool {
        self.kind == MessageKind::Text && !self.is_unsent
    }
}

// ============================================
// Conversation
// ============================================

/// Inclusive timestamp range of a conversation (epoch ms).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_ms: i64,
    pub end_ms: i64,
}

/// Conversation-level metadata derived once from the message list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationMetadata {
    /// Number of messages in the timeline
    pub total_messages: usize,
    /// First/last message timestamps
    pub date_range: DateRange,
    /// More than two participants
    pub is_group: bool,
    /// Days spanned by the date range (at least 1 for non-empty conversations)
    pub duration_days: i64,
}

/// A normalized conversation, produced once by the external importer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedConversation {
    /// Source platform
    pub platform: Platform,
    /// Ordered, unique participant names
    pub participants: Vec<String>,
    /// Messages, sorted ascending by (timestamp, index)
    pub messages: Vec<UnifiedMessage>,
    /// Derived conversation metadata
    pub metadata: ConversationMetadata,
}

impl ParsedConversation {
    /// Build a conversation, defensively re-sorting messages by
    /// `(timestamp, index)` and deriving metadata.
    ///
    /// Sorting is the importer's responsibility, but the pipeline does not
    /// assume it held (malformed input degrades, never aborts).
    pub fn new(
        platform: Platform,
        participants: Vec<String>,
        mut messages: Vec<UnifiedMessage>,
    ) -> Self {
        let sorted = messages
            .windows(2)
            .all(|w| (w[0].timestamp_ms, w[0].index) <= (w[1].timestamp_ms, w[1].index));
        if !sorted {
            tracing::warn!("importer delivered unsorted messages, re-sorting");
            messages.sort_by_key(|m| (m.timestamp_ms, m.index));
        }

        let metadata = Self::derive_metadata(&participants, &messages);
        Self {
            platform,
            participants,
            messages,
            metadata,
        }
    }

    fn derive_metadata(
        participants: &[String],
        messages: &[UnifiedMessage],
    ) -> ConversationMetadata {
        let date_range = match (messages.first(), messages.last()) {
            (Some(first), Some(last)) => DateRange {
                start_ms: first.timestamp_ms,
                end_ms: last.timestamp_ms,
            },
            _ => DateRange::default(),
        };

        let duration_days = if messages.is_empty() {
            0
        } else {
            ((date_range.end_ms - date_range.start_ms) / 86_400_000) + 1
        };

        ConversationMetadata {
            total_messages: messages.len(),
            date_range,
            is_group: participants.len() > 2,
            duration_days,
        }
    }
}

// ============================================
// Data sufficiency
// ============================================

/// A metric value that distinguishes "measured" from "not enough data".
///
/// Callers must be able to branch on sufficiency rather than receive a
/// numeric default indistinguishable from a real low/neutral score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Measured<T> {
    /// Enough underlying data existed; the value is real
    Measured(T),
    /// Not enough underlying data; no value is reported
    InsufficientData,
}

impl<T> Default for Measured<T> {
    fn default() -> Self {
        Measured::InsufficientData
    }
}

impl<T> Measured<T> {
    /// Whether a real value is present.
    pub fn is_measured(&self) -> bool {
        matches!(self, Measured::Measured(_))
    }

    /// The value, if measured.
    pub fn value(&self) -> Option<&T> {
        match self {
            Measured::Measured(v) => Some(v),
            Measured::InsufficientData => None,
        }
    }
}

/// A composite sub-score whose audit-documented default is a neutral 50.
///
/// `measured == false` means the 50 is a placeholder for missing signal,
/// not an actual balanced measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScore {
    /// Score in [0, 100]
    pub value: f64,
    /// Whether enough underlying data existed
    pub measured: bool,
}

impl SubScore {
    /// A real, data-backed sub-score.
    pub fn measured(value: f64) -> Self {
        Self {
            value: value.clamp(0.0, 100.0),
            measured: true,
        }
    }

    /// The neutral placeholder used when underlying data is insufficient.
    pub fn unmeasured() -> Self {
        Self {
            value: 50.0,
            measured: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(index: usize, sender: &str, ts: i64) -> UnifiedMessage {
        UnifiedMessage {
            index,
            sender: sender.to_string(),
            content: "hello there".to_string(),
            timestamp_ms: ts,
            kind: MessageKind::Text,
            reactions: vec![],
            has_media: false,
            has_link: false,
            is_unsent: false,
        }
    }

    #[test]
    fn test_conversation_resorts_unsorted_input() {
        let messages = vec![msg(1, "ana", 2_000), msg(0, "ben", 1_000)];
        let convo = ParsedConversation::new(
            Platform::Whatsapp,
            vec!["ana".to_string(), "ben".to_string()],
            messages,
        );
        assert_eq!(convo.messages[0].sender, "ben");
        assert_eq!(convo.metadata.date_range.start_ms, 1_000);
        assert_eq!(convo.metadata.date_range.end_ms, 2_000);
    }

    #[test]
    fn test_metadata_duration_days() {
        let messages = vec![msg(0, "ana", 0), msg(1, "ben", 86_400_000 * 2)];
        let convo = ParsedConversation::new(
            Platform::Imessage,
            vec!["ana".to_string(), "ben".to_string()],
            messages,
        );
        assert_eq!(convo.metadata.duration_days, 3);
        assert!(!convo.metadata.is_group);
    }

    #[test]
    fn test_empty_conversation_metadata() {
        let convo = ParsedConversation::new(Platform::Other, vec![], vec![]);
        assert_eq!(convo.metadata.total_messages, 0);
        assert_eq!(convo.metadata.duration_days, 0);
    }

    #[test]
    fn test_measured_serialization_distinguishes_sentinel() {
        let measured: Measured<f64> = Measured::Measured(50.0);
        let insufficient: Measured<f64> = Measured::InsufficientData;

        let a = serde_json::to_string(&measured).unwrap();
        let b = serde_json::to_string(&insufficient).unwrap();
        assert_ne!(a, b);
        assert!(b.contains("insufficient_data"));
    }

    #[test]
    fn test_message_kind_round_trip() {
        for kind in [
            MessageKind::Text,
            MessageKind::Media,
            MessageKind::Call,
            MessageKind::System,
            MessageKind::Unsent,
        ] {
            assert_eq!(kind.as_str().parse::<MessageKind>().unwrap(), kind);
        }
    }
}
