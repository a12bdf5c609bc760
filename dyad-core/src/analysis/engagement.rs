//! Per-person engagement metrics
//!
//! Counts and ratios over the raw timeline: message share, double-texts,
//! initiation share, reaction give/receive rates, media/link volume.
//! Everything here is a single pass over the sorted message slice plus the
//! session list; no filtering is applied.

use crate::analysis::session::Session;
use crate::types::UnifiedMessage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Engagement aggregates for one participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonEngagement {
    /// Messages sent
    pub messages: usize,
    /// Total words sent
    pub words: usize,
    /// Share of all messages, 0-100
    pub message_share: f64,
    /// Messages that continued the sender's own run (no intervening reply)
    pub double_texts: usize,
    /// Longest run of consecutive own messages
    pub max_consecutive_run: usize,
    /// Sessions this person opened
    pub initiations: usize,
    /// Share of all sessions opened, 0-100
    pub initiation_share: f64,
    /// Reactions this person placed on others' messages
    pub reactions_given: usize,
    /// Reactions others placed on this person's messages
    pub reactions_received: usize,
    /// Reactions given per message sent by anyone else
    pub reaction_give_rate: f64,
    /// Reactions received per own message
    pub reaction_receive_rate: f64,
    /// Mean content length in characters
    pub avg_message_chars: f64,
    /// Mean content length in words
    pub avg_message_words: f64,
    /// Messages carrying media
    pub media_count: usize,
    /// Messages carrying links
    pub link_count: usize,
    /// Messages later unsent
    pub unsent_count: usize,
    /// Most-used reaction emojis, count-ranked (ties by emoji string)
    pub top_emojis: Vec<(String, usize)>,
}

/// Compute engagement aggregates for every participant.
///
/// Participants with no messages still appear, with zeroed counts.
pub fn compute_engagement(
    messages: &[UnifiedMessage],
    sessions: &[Session],
    participants: &[String],
) -> BTreeMap<String, PersonEngagement> {
    let mut map: BTreeMap<String, PersonEngagement> = participants
        .iter()
        .map(|p| (p.clone(), PersonEngagement::default()))
        .collect();

    let mut emoji_counts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    let mut run_sender: Option<&str> = None;
    let mut run_len = 0usize;
    let mut chars: BTreeMap<String, usize> = BTreeMap::new();

    for msg in messages {
        if run_sender == Some(msg.sender.as_str()) {
            run_len += 1;
        } else {
            run_len = 1;
        }
        run_sender = Some(msg.sender.as_str());

        let entry = map.entry(msg.sender.clone()).or_default();
        entry.messages += 1;
        entry.words += msg.word_count();
        *chars.entry(msg.sender.clone()).or_default() += msg.content.chars().count();
        if msg.has_media {
            entry.media_count += 1;
        }
        if msg.has_link {
            entry.link_count += 1;
        }
        if msg.is_unsent {
            entry.unsent_count += 1;
        }
        entry.reactions_received += msg.reactions.len();
        if run_len > 1 {
            entry.double_texts += 1;
        }
        entry.max_consecutive_run = entry.max_consecutive_run.max(run_len);

        for reaction in &msg.reactions {
            let giver = map.entry(reaction.actor.clone()).or_default();
            giver.reactions_given += 1;
            *emoji_counts
                .entry(reaction.actor.clone())
                .or_default()
                .entry(reaction.emoji.clone())
                .or_default() += 1;
        }
    }

    for session in sessions {
        map.entry(session.starter.clone()).or_default().initiations += 1;
    }

    let total_messages = messages.len();
    let total_sessions = sessions.len();

    for (name, entry) in map.iter_mut() {
        if total_messages > 0 {
            entry.message_share = entry.messages as f64 / total_messages as f64 * 100.0;
        }
        if total_sessions > 0 {
            entry.initiation_share = entry.initiations as f64 / total_sessions as f64 * 100.0;
        }
        if entry.messages > 0 {
            entry.reaction_receive_rate = entry.reactions_received as f64 / entry.messages as f64;
            entry.avg_message_chars =
                chars.get(name).copied().unwrap_or(0) as f64 / entry.messages as f64;
            entry.avg_message_words = entry.words as f64 / entry.messages as f64;
        }
        let others = total_messages.saturating_sub(entry.messages);
        if others > 0 {
            entry.reaction_give_rate = entry.reactions_given as f64 / others as f64;
        }
        if let Some(counts) = emoji_counts.get(name) {
            let mut ranked: Vec<(String, usize)> =
                counts.iter().map(|(e, c)| (e.clone(), *c)).collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            ranked.truncate(5);
            entry.top_emojis = ranked;
        }
    }

    map
}
