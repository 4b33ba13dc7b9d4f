use regex::Regex;
use std::sync::LazyLock;

/// Phrases that turn a reply into an inbox task
pub const TASK_KEYWORDS: &[&str] = &["remind", "notify", "todo", "to-do", "follow up", "follow-up"];

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "thanks", "thank", "awesome", "love", "nice", "excellent", "happy", "perfect",
    "cool", "glad",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "broken", "hate", "angry", "annoyed", "terrible", "awful", "frustrated", "sad", "bug",
    "fail", "failed", "worse", "worst",
];

static WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}']+").expect("WORD_REGEX is a compile-time constant"));

/// True when the reply asks for a follow-up
#[must_use]
pub fn detect_task(text: &str) -> bool {
    let lower = text.to_lowercase();
    TASK_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Keyword sentiment of a human message in `-1.0..=1.0`
#[must_use]
pub fn score_sentiment(text: &str) -> f32 {
    let lower = text.to_lowercase();
    let (mut positive, mut negative) = (0i32, 0i32);

    for word in WORD_REGEX.find_iter(&lower) {
        let word = word.as_str().trim_matches('\'');
        if POSITIVE_WORDS.contains(&word) {
            positive += 1;
        } else if NEGATIVE_WORDS.contains(&word) {
            negative += 1;
        }
    }

    ((positive - negative) as f32 / 3.0).clamp(-1.0, 1.0)
}
