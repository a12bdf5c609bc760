//! Achievement badges
//!
//! Fixed-threshold rules evaluated independently per person against
//! absolute counts. A short conversation and a multi-year one use the same
//! cutoffs. Rules are monotone in their qualifying count: increasing the
//! count can never take an earned badge away.

use crate::analysis::engagement::PersonEngagement;
use crate::analysis::patterns::PatternReport;
use crate::analysis::session::Session;
use crate::analysis::timing::ResponseStats;
use crate::config::BadgeConfig;
use crate::types::{Measured, UnifiedMessage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An earned achievement badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    /// Stable rule identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Participant who earned it
    pub holder: String,
    /// Human-readable justification
    pub evidence: String,
}

impl Badge {
    fn new(id: &str, name: &str, holder: &str, evidence: String) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            holder: holder.to_string(),
            evidence,
        }
    }
}

/// Evaluate every badge rule for every participant.
///
/// Badges come out grouped per person in participant-name order, rule
/// order fixed within a person, so output is deterministic.
pub fn award_badges(
    messages: &[UnifiedMessage],
    sessions: &[Session],
    engagement: &BTreeMap<String, PersonEngagement>,
    timing: &BTreeMap<String, Measured<ResponseStats>>,
    patterns: &PatternReport,
    config: &BadgeConfig,
) -> Vec<Badge> {
    let session_peaks = per_session_peaks(messages, sessions);
    let mut badges = Vec::new();

    for (person, stats) in engagement {
        if let Some(streaks) = patterns.streaks.get(person) {
            if streaks.longest_days > config.streak_days {
                badges.push(Badge::new(
                    "streak_master",
                    "Streak Master",
                    person,
                    format!("messaged {} days in a row", streaks.longest_days),
                ));
            }
        }

        if stats.double_texts >= config.double_texts {
            badges.push(Badge::new(
                "double_texter",
                "Double Texter",
                person,
                format!("followed up on their own message {} times", stats.double_texts),
            ));
        }

        if stats.initiations >= config.initiations {
            badges.push(Badge::new(
                "conversation_starter",
                "Conversation Starter",
                person,
                format!("opened {} conversations", stats.initiations),
            ));
        }

        if let Some(heatmap) = patterns.heatmaps.get(person) {
            let late_night = hour_window_total(heatmap, &[22, 23, 0, 1, 2, 3]);
            if late_night >= config.window_messages {
                badges.push(Badge::new(
                    "night_owl",
                    "Night Owl",
                    person,
                    format!("{} messages sent between 10pm and 4am", late_night),
                ));
            }

            let early_morning = hour_window_total(heatmap, &[5, 6, 7, 8]);
            if early_morning >= config.window_messages {
                badges.push(Badge::new(
                    "early_bird",
                    "Early Bird",
                    person,
                    format!("{} messages sent between 5am and 9am", early_morning),
                ));
            }
        }

        if stats.messages >= config.novelist_min_messages
            && stats.avg_message_chars >= config.novelist_avg_chars
        {
            badges.push(Badge::new(
                "novelist",
                "Novelist",
                person,
                format!(
                    "averages {:.0} characters per message",
                    stats.avg_message_chars
                ),
            ));
        }

        if stats.reactions_given >= config.reactions {
            badges.push(Badge::new(
                "reactor",
                "Reactor",
                person,
                format!("gave {} reactions", stats.reactions_given),
            ));
        }

        if stats.reactions_received >= config.reactions {
            badges.push(Badge::new(
                "crowd_favorite",
                "Crowd Favorite",
                person,
                format!("collected {} reactions", stats.reactions_received),
            ));
        }

        if let Some(Measured::Measured(response)) = timing.get(person) {
            if response.raw_sample_size >= config.rapid_min_samples
                && response.median_ms <= config.rapid_median_ms
            {
                badges.push(Badge::new(
                    "rapid_responder",
                    "Rapid Responder",
                    person,
                    format!(
                        "typical reply lands in {:.0} seconds",
                        response.median_ms / 1000.0
                    ),
                ));
            }
        }

        if let Some(&peak) = session_peaks.get(person) {
            if peak >= config.marathon_messages {
                badges.push(Badge::new(
                    "marathoner",
                    "Marathoner",
                    person,
                    format!("sent {} messages in a single sitting", peak),
                ));
            }
        }
    }

    tracing::debug!(badges = badges.len(), "Badge evaluation complete");
    badges
}

/// Most messages each person sent within any single session.
fn per_session_peaks(
    messages: &[UnifiedMessage],
    sessions: &[Session],
) -> BTreeMap<String, usize> {
    let mut peaks: BTreeMap<String, usize> = BTreeMap::new();
    for session in sessions {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for msg in &messages[session.start..=session.end] {
            *counts.entry(msg.sender.as_str()).or_default() += 1;
        }
        for (person, count) in counts {
            let entry = peaks.entry(person.to_string()).or_default();
            *entry = (*entry).max(count);
        }
    }
    peaks
}

fn hour_window_total(heatmap: &crate::analysis::patterns::Heatmap, hours: &[usize]) -> u64 {
    heatmap
        .cells
        .iter()
        .map(|row| hours.iter().map(|&h| u64::from(row[h])).sum::<u64>())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::patterns::StreakStats;

    fn base_engagement() -> BTreeMap<String, PersonEngagement> {
        let mut map = BTreeMap::new();
        map.insert("ana".to_string(), PersonEngagement::default());
        map
    }

    fn empty_patterns() -> PatternReport {
        let mut patterns = PatternReport::default();
        patterns.streaks.insert("ana".to_string(), StreakStats::default());
        patterns
    }

    fn award(
        engagement: &BTreeMap<String, PersonEngagement>,
        patterns: &PatternReport,
    ) -> Vec<Badge> {
        award_badges(
            &[],
            &[],
            engagement,
            &BTreeMap::new(),
            patterns,
            &BadgeConfig::default(),
        )
    }

    fn has_badge(badges: &[Badge], id: &str) -> bool {
        badges.iter().any(|b| b.id == id)
    }

    #[test]
    fn test_streak_master_requires_more_than_fourteen_days() {
        let engagement = base_engagement();
        let mut patterns = empty_patterns();

        patterns.streaks.get_mut("ana").unwrap().longest_days = 14;
        assert!(!has_badge(&award(&engagement, &patterns), "streak_master"));

        patterns.streaks.get_mut("ana").unwrap().longest_days = 15;
        let badges = award(&engagement, &patterns);
        assert!(has_badge(&badges, "streak_master"));
        let badge = badges.iter().find(|b| b.id == "streak_master").unwrap();
        assert_eq!(badge.holder, "ana");
        assert!(badge.evidence.contains("15"));
    }

    #[test]
    fn test_badge_monotonicity() {
        // Once a count qualifies, any larger count still qualifies
        let patterns = empty_patterns();
        for double_texts in [30usize, 31, 100, 10_000] {
            let mut engagement = base_engagement();
            engagement.get_mut("ana").unwrap().double_texts = double_texts;
            assert!(
                has_badge(&award(&engagement, &patterns), "double_texter"),
                "badge lost at count {}",
                double_texts
            );
        }
    }

    #[test]
    fn test_novelist_needs_both_volume_and_length() {
        let patterns = empty_patterns();

        let mut engagement = base_engagement();
        engagement.get_mut("ana").unwrap().messages = 500;
        engagement.get_mut("ana").unwrap().avg_message_chars = 50.0;
        assert!(!has_badge(&award(&engagement, &patterns), "novelist"));

        engagement.get_mut("ana").unwrap().avg_message_chars = 120.0;
        assert!(has_badge(&award(&engagement, &patterns), "novelist"));
    }

    #[test]
    fn test_night_owl_counts_late_window() {
        let engagement = base_engagement();
        let mut patterns = empty_patterns();
        let heatmap = patterns.heatmaps.entry("ana".to_string()).or_default();
        for _ in 0..100 {
            heatmap.record(2, 23);
        }
        assert!(has_badge(&award(&engagement, &patterns), "night_owl"));
        assert!(!has_badge(&award(&engagement, &patterns), "early_bird"));
    }

    #[test]
    fn test_no_badges_on_empty_conversation() {
        let badges = award(&base_engagement(), &empty_patterns());
        assert!(badges.is_empty());
    }
}
