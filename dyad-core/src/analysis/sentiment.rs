//! Lexicon-based sentiment scoring
//!
//! A fixed wordlist scorer feeding the monthly sentiment trend and the
//! conflict detector's intensity signal. Heuristic by design: no model
//! inference, no language detection, equally weighted unigram matches.

/// Positive unigrams. Matching is case-insensitive on cleaned tokens.
const POSITIVE_WORDS: &[&str] = &[
    "love", "loved", "lovely", "great", "good", "nice", "happy", "glad",
    "awesome", "amazing", "wonderful", "best", "fun", "funny", "cool",
    "sweet", "cute", "beautiful", "perfect", "excited", "yay", "thanks",
    "thank", "appreciate", "miss", "proud", "win", "won", "congrats",
    "haha", "lol", "lmao", "hehe", "yes", "sure", "absolutely", "adorable",
    "gorgeous", "brilliant", "fantastic",
];

/// Negative unigrams.
const NEGATIVE_WORDS: &[&str] = &[
    "hate", "hated", "angry", "mad", "annoyed", "annoying", "sad", "upset",
    "terrible", "horrible", "awful", "worst", "bad", "ugh", "wtf", "damn",
    "stupid", "dumb", "idiot", "ridiculous", "unfair", "liar", "lying",
    "lies", "never", "whatever", "fine", "forget", "leave", "alone",
    "done", "tired", "sick", "cry", "crying", "hurt", "ignore", "ignored",
    "sorry", "no",
];

/// Sentiment of a text in `[-1, 1]`.
///
/// `(positives - negatives) / matched`, 0.0 when nothing matches.
pub fn score_text(content: &str) -> f64 {
    let mut positives = 0i64;
    let mut negatives = 0i64;

    for token in tokens(content) {
        if POSITIVE_WORDS.contains(&token.as_str()) {
            positives += 1;
        } else if NEGATIVE_WORDS.contains(&token.as_str()) {
            negatives += 1;
        }
    }

    let matched = positives + negatives;
    if matched == 0 {
        return 0.0;
    }
    (positives - negatives) as f64 / matched as f64
}

/// Count of negative-lexicon tokens in a text (conflict intensity input).
pub fn negative_word_count(content: &str) -> usize {
    tokens(content)
        .filter(|t| NEGATIVE_WORDS.contains(&t.as_str()))
        .count()
}

/// Lowercased alphanumeric tokens (apostrophes kept, everything else split).
fn tokens(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_text_scores_zero() {
        assert_eq!(score_text("see you at the station tomorrow"), 0.0);
        assert_eq!(score_text(""), 0.0);
    }

    #[test]
    fn test_positive_text() {
        assert!(score_text("that was awesome, love it") > 0.0);
        assert_eq!(score_text("love love love"), 1.0);
    }

    #[test]
    fn test_negative_text() {
        assert!(score_text("this is terrible and unfair") < 0.0);
        assert_eq!(score_text("hate hate"), -1.0);
    }

    #[test]
    fn test_mixed_text_averages() {
        // one positive, one negative
        assert_eq!(score_text("love this awful weather"), 0.0);
    }

    #[test]
    fn test_negative_word_count_ignores_case_and_punctuation() {
        assert_eq!(negative_word_count("WHATEVER. Fine!! I'm DONE."), 3);
        assert_eq!(negative_word_count("all good here"), 0);
    }
}
