//! Analytics pipeline
//!
//! A synchronous, single-pass batch computation over an immutable
//! [`ParsedConversation`]. Stages run in dependency order, each a pure
//! function of the message slice plus earlier outputs:
//!
//! ```text
//! sessions ──► timing ─────────┐
//!    │           │             ▼
//!    │           ▼         composites (badges, viral, threat)
//!    ├──► engagement/patterns ─┘
//!    │           │
//!    └──► detectors (conflict, pursuit, reciprocity)
//!                │
//!                ▼
//!         text mining (phrases, best times)
//! ```
//!
//! Per-participant timing statistics shard across rayon workers and merge
//! by participant key, so the merged order never depends on completion
//! order and a run is bit-for-bit identical to the sequential computation.

pub mod badges;
pub mod conflict;
pub mod delta;
pub mod engagement;
pub mod patterns;
pub mod percentile;
pub mod phrases;
pub mod pursuit;
pub mod reciprocity;
pub mod sentiment;
pub mod session;
pub mod threat;
pub mod timing;
pub mod viral;

use crate::config::AnalysisConfig;
use crate::types::{Measured, ParsedConversation, Platform, UnifiedMessage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use badges::Badge;
pub use conflict::ConflictReport;
pub use delta::{
    compare_snapshots, conversation_fingerprint, AnalysisDelta, AnalysisSnapshot,
    DeltaDirection, MetricDelta, VolumeTrend,
};
pub use engagement::PersonEngagement;
pub use patterns::PatternReport;
pub use percentile::{response_time_percentile, PercentileStrategy};
pub use phrases::PhraseReport;
pub use pursuit::PursuitReport;
pub use reciprocity::ReciprocityIndex;
pub use session::Session;
pub use threat::{
    relational_conflict_index, PatternInputs, RelationalConflictIndex, ThreatMeters,
    TimingContext,
};
pub use timing::{ResponseEvent, ResponseStats, SilenceStats};
pub use viral::{GhostRiskLevel, GhostRiskScore, InterestScore, ViralScores};

/// Whole-conversation aggregates used by the delta comparator and report
/// consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationTotals {
    pub messages: usize,
    pub words: usize,
    pub sessions: usize,
    pub response_events: usize,
    /// Mean reply latency over all response events (0 when none)
    pub avg_response_time_ms: f64,
    /// Mean message length in characters
    pub avg_message_chars: f64,
    /// Days spanned by the conversation
    pub duration_days: i64,
    /// Messages per day over the span
    pub messages_per_day: f64,
}

/// The aggregate result of one full pipeline run.
///
/// Consumers treat this as read-only; a re-analysis replaces it wholesale.
/// Name-keyed maps serialize in lexicographic participant order, months as
/// `YYYY-MM` strings, so serialization is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Stable conversation identity (sha256)
    pub fingerprint: String,
    pub platform: Platform,
    /// Participants in conversation order
    pub participants: Vec<String>,
    pub totals: ConversationTotals,
    pub sessions: Vec<Session>,
    /// Response-time statistics per participant
    pub timing: BTreeMap<String, Measured<ResponseStats>>,
    /// Longest-silence audit signal
    pub silence: Measured<SilenceStats>,
    pub engagement: BTreeMap<String, PersonEngagement>,
    pub patterns: PatternReport,
    pub conflict: ConflictReport,
    pub pursuit: PursuitReport,
    pub reciprocity: ReciprocityIndex,
    pub badges: Vec<Badge>,
    pub viral: ViralScores,
    pub threat: ThreatMeters,
    pub phrases: PhraseReport,
}

impl AnalysisReport {
    /// Compact snapshot for longitudinal comparison.
    ///
    /// `captured_at_ms` comes from the caller so the report itself stays a
    /// pure function of its input.
    pub fn snapshot(&self, captured_at_ms: i64) -> AnalysisSnapshot {
        AnalysisSnapshot {
            fingerprint: self.fingerprint.clone(),
            captured_at_ms,
            total_messages: self.totals.messages,
            total_words: self.totals.words,
            session_count: self.totals.sessions,
            avg_response_time_ms: self.totals.avg_response_time_ms,
            avg_message_chars: self.totals.avg_message_chars,
            messages_per_day: self.totals.messages_per_day,
        }
    }
}

/// Run the full pipeline.
///
/// Infallible: sparse data degrades to explicit insufficient-data
/// sentinels, and an empty message list yields every component's defined
/// empty state.
pub fn analyze(conversation: &ParsedConversation, config: &AnalysisConfig) -> AnalysisReport {
    // The importer guarantees sorting, but do not assume it held.
    let resorted;
    let messages: &[UnifiedMessage] = if is_sorted(&conversation.messages) {
        &conversation.messages
    } else {
        tracing::warn!("input messages unsorted, re-sorting defensively");
        let mut owned = conversation.messages.clone();
        owned.sort_by_key(|m| (m.timestamp_ms, m.index));
        resorted = owned;
        &resorted
    };
    let participants = &conversation.participants;

    tracing::debug!(
        messages = messages.len(),
        participants = participants.len(),
        platform = %conversation.platform,
        "Starting analysis run"
    );

    let sessions = session::segment_sessions(messages, config.session.gap_ms);
    let events = timing::response_events(messages);

    // Per-participant shard, merged by key
    let deltas = timing::deltas_by_replier(&events);
    let timing_stats: BTreeMap<String, Measured<ResponseStats>> = participants
        .par_iter()
        .map(|person| {
            let stats = deltas
                .get(person)
                .map(|d| ResponseStats::compute(d, &config.timing))
                .unwrap_or(Measured::InsufficientData);
            (person.clone(), stats)
        })
        .collect::<Vec<_>>()
        .into_iter()
        .collect();

    let silence = timing::silence_stats(messages);
    let engagement = engagement::compute_engagement(messages, &sessions, participants);
    let pattern_report =
        patterns::compute_patterns(messages, &sessions, &events, participants, &config.patterns);

    let conflict_report = conflict::detect_conflicts(messages, participants, &config.conflict);
    let pursuit_report = pursuit::detect_pursuit(messages, participants, &config.pursuit);
    let reciprocity_index =
        reciprocity::compute_reciprocity(&engagement, &timing_stats, participants);

    let badge_list = badges::award_badges(
        messages,
        &sessions,
        &engagement,
        &timing_stats,
        &pattern_report,
        &config.badges,
    );
    let viral_scores = viral::compute_viral(
        messages,
        &sessions,
        &events,
        &engagement,
        &timing_stats,
        &pattern_report,
        participants,
        &config.percentile,
    );
    let threat_meters = threat::compute_threat(
        &engagement,
        &timing_stats,
        &conflict_report,
        &pursuit_report,
        &reciprocity_index,
        &viral_scores,
        participants,
    );

    let phrase_report =
        phrases::mine_phrases(messages, participants, &pattern_report, &config.phrases);

    let totals = compute_totals(messages, &sessions, &events);

    tracing::debug!(
        sessions = totals.sessions,
        badges = badge_list.len(),
        conflict_events = conflict_report.events.len(),
        "Analysis run complete"
    );

    AnalysisReport {
        fingerprint: delta::conversation_fingerprint(conversation),
        platform: conversation.platform,
        participants: participants.clone(),
        totals,
        sessions,
        timing: timing_stats,
        silence,
        engagement,
        patterns: pattern_report,
        conflict: conflict_report,
        pursuit: pursuit_report,
        reciprocity: reciprocity_index,
        badges: badge_list,
        viral: viral_scores,
        threat: threat_meters,
        phrases: phrase_report,
    }
}

fn is_sorted(messages: &[UnifiedMessage]) -> bool {
    messages
        .windows(2)
        .all(|w| (w[0].timestamp_ms, w[0].index) <= (w[1].timestamp_ms, w[1].index))
}

fn compute_totals(
    messages: &[UnifiedMessage],
    sessions: &[Session],
    events: &[ResponseEvent],
) -> ConversationTotals {
    let words: usize = messages.iter().map(|m| m.word_count()).sum();
    let chars: usize = messages.iter().map(|m| m.content.chars().count()).sum();

    let avg_response_time_ms = if events.is_empty() {
        0.0
    } else {
        events.iter().map(|e| e.delta_ms as f64).sum::<f64>() / events.len() as f64
    };

    let duration_days = match (messages.first(), messages.last()) {
        (Some(first), Some(last)) => {
            ((last.timestamp_ms - first.timestamp_ms) / 86_400_000) + 1
        }
        _ => 0,
    };

    ConversationTotals {
        messages: messages.len(),
        words,
        sessions: sessions.len(),
        response_events: events.len(),
        avg_response_time_ms,
        avg_message_chars: if messages.is_empty() {
            0.0
        } else {
            chars as f64 / messages.len() as f64
        },
        duration_days,
        messages_per_day: if duration_days > 0 {
            messages.len() as f64 / duration_days as f64
        } else {
            0.0
        },
    }
}
