//! Text-pattern mining
//!
//! Catchphrase extraction (personal and shared n-grams), language-style
//! matching over function-word usage, and best-time-to-text derived from
//! the activity heatmaps.
//!
//! No recency weighting anywhere: equally-old and equally-recent
//! repetitions count identically.

use crate::analysis::patterns::PatternReport;
use crate::config::PhraseConfig;
use crate::types::{Measured, UnifiedMessage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tokens excluded from n-gram tables.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "if", "then", "than", "that",
    "this", "these", "those", "i", "you", "he", "she", "it", "we", "they",
    "me", "him", "her", "us", "them", "my", "your", "his", "its", "our",
    "their", "is", "am", "are", "was", "were", "be", "been", "being",
    "have", "has", "had", "do", "does", "did", "will", "would", "can",
    "could", "should", "to", "of", "in", "on", "at", "by", "for", "with",
    "about", "from", "up", "down", "out", "so", "just", "not", "no", "yes",
    "ok", "okay", "im", "u", "ur",
];

/// Function-word categories for language-style matching.
const LSM_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "pronouns",
        &[
            "i", "you", "we", "he", "she", "they", "me", "him", "her", "us", "them", "my",
            "your", "our", "it",
        ],
    ),
    ("articles", &["a", "an", "the"]),
    (
        "prepositions",
        &["in", "on", "at", "by", "for", "with", "about", "from", "to", "of"],
    ),
    ("conjunctions", &["and", "but", "or", "so", "because"]),
    ("negations", &["no", "not", "never", "don't", "can't", "won't"]),
    (
        "auxiliaries",
        &[
            "am", "is", "are", "was", "were", "be", "have", "has", "had", "do", "does",
            "did", "will", "would", "can", "could", "should",
        ],
    ),
    (
        "quantifiers",
        &["all", "some", "many", "much", "few", "more", "most"],
    ),
];

/// A phrase one person keeps using.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catchphrase {
    pub phrase: String,
    /// This person's occurrences
    pub count: usize,
    /// This person's share of all occurrences, 0-1
    pub uniqueness: f64,
    /// Ranking score: `count x uniqueness`
    pub score: f64,
}

/// A phrase genuinely shared across participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedPhrase {
    pub phrase: String,
    /// Occurrences across everyone
    pub count: usize,
    /// Per-contributor occurrence counts
    pub contributors: BTreeMap<String, usize>,
}

/// Best moment to reach one person, from their heatmap peak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestTimeToText {
    /// Weekday of the peak cell (0=Sunday)
    pub weekday: usize,
    /// Hour of the peak cell (0-23)
    pub hour: usize,
    /// Messages in the peak cell
    pub count: u32,
    /// Display window start, one hour before the peak (wraps at midnight)
    pub window_start_hour: usize,
    /// Display window end, one hour after the peak (wraps at midnight)
    pub window_end_hour: usize,
}

/// Text-pattern mining output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhraseReport {
    /// Top catchphrases per person
    pub catchphrases: BTreeMap<String, Vec<Catchphrase>>,
    /// Shared phrases, count-ranked
    pub shared: Vec<SharedPhrase>,
    /// Language-style matching between the two most active participants,
    /// 0-100
    pub style_match: Measured<f64>,
    /// Best time to text per person
    pub best_times: BTreeMap<String, BestTimeToText>,
}

/// Mine phrases, style matching, and best times.
pub fn mine_phrases(
    messages: &[UnifiedMessage],
    participants: &[String],
    patterns: &PatternReport,
    config: &PhraseConfig,
) -> PhraseReport {
    let mut report = PhraseReport::default();

    let phrase_counts = build_phrase_tables(messages);
    report.catchphrases = extract_catchphrases(&phrase_counts, participants, config);
    report.shared = extract_shared(&phrase_counts, config);
    report.style_match = language_style_match(messages, participants);

    for (person, heatmap) in &patterns.heatmaps {
        if let Some((weekday, hour, count)) = heatmap.peak() {
            report.best_times.insert(
                person.clone(),
                BestTimeToText {
                    weekday,
                    hour,
                    count,
                    window_start_hour: (hour + 23) % 24,
                    window_end_hour: (hour + 1) % 24,
                },
            );
        }
    }

    report
}

/// Lowercased tokens with emoji and punctuation stripped, stopwords and
/// single characters removed.
fn content_tokens(content: &str) -> Vec<String> {
    content
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\'').to_lowercase())
        .filter(|t| t.len() >= 2 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// phrase -> contributor -> count, over bigrams and trigrams.
fn build_phrase_tables(
    messages: &[UnifiedMessage],
) -> BTreeMap<String, BTreeMap<String, usize>> {
    let mut counts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();

    for msg in messages.iter().filter(|m| m.is_text()) {
        let tokens = content_tokens(&msg.content);
        for n in [2usize, 3] {
            if tokens.len() < n {
                continue;
            }
            for gram in tokens.windows(n) {
                let phrase = gram.join(" ");
                *counts
                    .entry(phrase)
                    .or_default()
                    .entry(msg.sender.clone())
                    .or_default() += 1;
            }
        }
    }

    counts
}

fn extract_catchphrases(
    phrase_counts: &BTreeMap<String, BTreeMap<String, usize>>,
    participants: &[String],
    config: &PhraseConfig,
) -> BTreeMap<String, Vec<Catchphrase>> {
    let mut result: BTreeMap<String, Vec<Catchphrase>> = participants
        .iter()
        .map(|p| (p.clone(), Vec::new()))
        .collect();

    for (phrase, contributors) in phrase_counts {
        let global: usize = contributors.values().sum();
        for (person, &count) in contributors {
            if count < config.min_count {
                continue;
            }
            let uniqueness = count as f64 / global as f64;
            if uniqueness < config.min_uniqueness {
                continue;
            }
            result.entry(person.clone()).or_default().push(Catchphrase {
                phrase: phrase.clone(),
                count,
                uniqueness,
                score: count as f64 * uniqueness,
            });
        }
    }

    for phrases in result.values_mut() {
        phrases.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.phrase.cmp(&b.phrase))
        });
        phrases.truncate(config.top_per_person);
    }

    result
}

fn extract_shared(
    phrase_counts: &BTreeMap<String, BTreeMap<String, usize>>,
    config: &PhraseConfig,
) -> Vec<SharedPhrase> {
    let mut shared: Vec<SharedPhrase> = phrase_counts
        .iter()
        .filter_map(|(phrase, contributors)| {
            let global: usize = contributors.values().sum();
            if global < config.shared_min_global {
                return None;
            }
            let committed = contributors
                .values()
                .filter(|&&c| c >= config.shared_min_per_contributor)
                .count();
            if committed < 2 {
                return None;
            }
            let max_share = contributors
                .values()
                .map(|&c| c as f64 / global as f64)
                .fold(0.0, f64::max);
            if max_share >= config.shared_dominance_cap {
                return None;
            }
            Some(SharedPhrase {
                phrase: phrase.clone(),
                count: global,
                contributors: contributors.clone(),
            })
        })
        .collect();

    shared.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.phrase.cmp(&b.phrase)));
    shared
}

/// Language-style matching: per function-word category, compare usage
/// rates of the two most message-active participants; 100 = identical
/// style. Unmeasured with fewer than two participants or when either has
/// no words.
fn language_style_match(
    messages: &[UnifiedMessage],
    participants: &[String],
) -> Measured<f64> {
    if participants.len() < 2 {
        return Measured::InsufficientData;
    }

    let mut message_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for msg in messages {
        *message_counts.entry(msg.sender.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<&String> = participants.iter().collect();
    ranked.sort_by(|a, b| {
        let ma = message_counts.get(a.as_str()).copied().unwrap_or(0);
        let mb = message_counts.get(b.as_str()).copied().unwrap_or(0);
        mb.cmp(&ma)
    });
    let (a, b) = (ranked[0].as_str(), ranked[1].as_str());

    let rates_a = function_word_rates(messages, a);
    let rates_b = function_word_rates(messages, b);
    let (Some(rates_a), Some(rates_b)) = (rates_a, rates_b) else {
        return Measured::InsufficientData;
    };

    let mut sum = 0.0;
    for (category, _) in LSM_CATEGORIES {
        let ra = rates_a[*category];
        let rb = rates_b[*category];
        let similarity = if ra + rb == 0.0 {
            1.0
        } else {
            1.0 - (ra - rb).abs() / (ra + rb)
        };
        sum += similarity;
    }

    Measured::Measured(sum / LSM_CATEGORIES.len() as f64 * 100.0)
}

/// Function-word usage rates per category; `None` when the person sent no
/// words at all.
fn function_word_rates(
    messages: &[UnifiedMessage],
    person: &str,
) -> Option<BTreeMap<&'static str, f64>> {
    let mut total_words = 0usize;
    let mut category_counts: BTreeMap<&'static str, usize> =
        LSM_CATEGORIES.iter().map(|(name, _)| (*name, 0)).collect();

    for msg in messages
        .iter()
        .filter(|m| m.sender == person && m.is_text())
    {
        for raw in msg.content.split_whitespace() {
            let token: String = raw
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '\'')
                .collect::<String>()
                .to_lowercase();
            if token.is_empty() {
                continue;
            }
            total_words += 1;
            for (name, words) in LSM_CATEGORIES {
                if words.contains(&token.as_str()) {
                    if let Some(count) = category_counts.get_mut(name) {
                        *count += 1;
                    }
                }
            }
        }
    }

    if total_words == 0 {
        return None;
    }

    Some(
        category_counts
            .into_iter()
            .map(|(name, count)| (name, count as f64 / total_words as f64))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::patterns::compute_patterns;
    use crate::analysis::session::segment_sessions;
    use crate::config::PatternConfig;
    use crate::types::MessageKind;

    const MIN_MS: i64 = 60_000;

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

    fn mine(messages: &[UnifiedMessage]) -> PhraseReport {
        let sessions = segment_sessions(messages, 21_600_000);
        let events = crate::analysis::timing::response_events(messages);
        let patterns = compute_patterns(
            messages,
            &sessions,
            &events,
            &participants(),
            &PatternConfig::default(),
        );
        mine_phrases(messages, &participants(), &patterns, &PhraseConfig::default())
    }

    #[test]
    fn test_personal_catchphrase_extracted() {
        let mut messages = Vec::new();
        for i in 0..4 {
            messages.push(msg(i, "ana", i as i64 * MIN_MS, "honestly lowkey obsessed"));
        }
        messages.push(msg(4, "ben", 5 * MIN_MS, "nice weather today"));
        let report = mine(&messages);

        let phrases = &report.catchphrases["ana"];
        assert!(phrases
            .iter()
            .any(|c| c.phrase == "honestly lowkey obsessed" && c.count == 4));
        let best = &phrases[0];
        assert_eq!(best.uniqueness, 1.0);
        assert!(report.catchphrases["ben"].is_empty());
    }

    #[test]
    fn test_below_count_threshold_is_no_catchphrase() {
        let messages = vec![
            msg(0, "ana", 0, "honestly lowkey obsessed"),
            msg(1, "ana", MIN_MS, "honestly lowkey obsessed"),
        ];
        let report = mine(&messages);
        assert!(report.catchphrases["ana"].is_empty());
    }

    #[test]
    fn test_evenly_split_phrase_qualifies_as_shared() {
        // Six occurrences, three each: shared, and a catchphrase for
        // neither (uniqueness 0.5 still meets the >= 0.5 bar for both)
        let mut messages = Vec::new();
        for i in 0..3 {
            messages.push(msg(i, "ana", i as i64 * MIN_MS, "vibe check passed"));
        }
        for i in 3..6 {
            messages.push(msg(i, "ben", i as i64 * MIN_MS, "vibe check passed"));
        }
        let report = mine(&messages);

        let shared = report
            .shared
            .iter()
            .find(|s| s.phrase == "vibe check passed")
            .expect("shared phrase");
        assert_eq!(shared.count, 6);
        assert_eq!(shared.contributors["ana"], 3);
        assert_eq!(shared.contributors["ben"], 3);
    }

    #[test]
    fn test_dominated_phrase_is_not_shared() {
        // 8 of 10 occurrences from ana: dominance cap blocks sharing
        let mut messages = Vec::new();
        for i in 0..8 {
            messages.push(msg(i, "ana", i as i64 * MIN_MS, "vibe check passed"));
        }
        for i in 8..10 {
            messages.push(msg(i, "ben", i as i64 * MIN_MS, "vibe check passed"));
        }
        let report = mine(&messages);
        assert!(report.shared.iter().all(|s| s.phrase != "vibe check passed"));
    }

    #[test]
    fn test_emoji_and_stopwords_stripped() {
        let mut messages = Vec::new();
        for i in 0..3 {
            messages.push(msg(i, "ana", i as i64 * MIN_MS, "🔥🔥 the vibe check 🔥"));
        }
        let report = mine(&messages);
        // "the" is a stopword; emoji vanish; bigram survives
        assert!(report.catchphrases["ana"]
            .iter()
            .any(|c| c.phrase == "vibe check"));
    }

    #[test]
    fn test_best_time_window_wraps_midnight() {
        // Peak at hour 0
        let messages = vec![msg(0, "ana", 5 * MIN_MS, "hello")];
        let report = mine(&messages);
        let best = &report.best_times["ana"];
        assert_eq!(best.hour, 0);
        assert_eq!(best.window_start_hour, 23);
        assert_eq!(best.window_end_hour, 1);
    }

    #[test]
    fn test_style_match_high_for_identical_style() {
        let mut messages = Vec::new();
        for i in 0..5 {
            messages.push(msg(
                2 * i,
                "ana",
                (2 * i) as i64 * MIN_MS,
                "i think we should go to the park",
            ));
            messages.push(msg(
                2 * i + 1,
                "ben",
                (2 * i + 1) as i64 * MIN_MS,
                "i think we should go to the beach",
            ));
        }
        let report = mine(&messages);
        let score = *report.style_match.value().expect("measured");
        assert!(score > 95.0);
    }

    #[test]
    fn test_style_match_insufficient_when_one_side_silent() {
        let messages = vec![msg(0, "ana", 0, "hello there")];
        let report = mine(&messages);
        assert_eq!(report.style_match, Measured::InsufficientData);
    }

    #[test]
    fn test_empty_conversation() {
        let report = mine(&[]);
        assert!(report.shared.is_empty());
        assert!(report.best_times.is_empty());
        assert_eq!(report.style_match, Measured::InsufficientData);
    }
}
