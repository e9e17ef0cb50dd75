//! Keyword heuristics that tag a turn when the caller supplies no context.
//!
//! All matching is lowercase substring matching over fixed tables; the first
//! table entry that matches wins where a single answer is needed.

use crate::memory::{Sentiment, TurnContext};

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "happy", "accha", "bahut", "nice", "wonderful", "love",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "poor", "issue", "problem", "concern", "worried", "delay", "kharab",
];

const QUESTION_MARKERS: &[&str] = &["?", "kya", "kab", "kaise", "when", "what", "how", "why"];

const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("construction_progress", &["progress", "update", "kya hua", "construction", "kaam"]),
    ("payment", &["payment", "installment", "pay", "paisa", "amount"]),
    ("site_visit", &["visit", "dekhna", "site", "aana"]),
    ("tiles", &["tiles", "tile", "flooring"]),
    ("plumbing", &["plumbing", "pipe", "water"]),
    ("electrical", &["electrical", "wiring", "light", "bijli"]),
    ("painting", &["paint", "color", "rang"]),
    ("interior", &["interior", "design", "furniture"]),
    ("timeline", &["when", "kab", "complete", "ready", "timeline"]),
    ("garden", &["garden", "landscaping", "grass"]),
    ("amenities", &["amenity", "amenities", "facility", "facilities"]),
];

const CONCERN_KEYWORDS: &[(&str, &[&str])] = &[
    ("delay", &["delay", "late", "slow", "der"]),
    ("quality", &["quality", "kharab", "issue", "problem"]),
    ("cost", &["expensive", "cost", "budget", "paisa"]),
    ("timeline", &["when", "kab", "complete"]),
];

const NEXT_STEP_KEYWORDS: &[(&str, &[&str])] = &[
    ("site_visit", &["visit", "dekhna", "site pe"]),
    ("payment", &["payment", "installment"]),
    ("meeting", &["meeting", "baat", "discuss"]),
    ("inspection", &["inspection", "check"]),
    ("follow_up", &["call", "update", "bataunga"]),
];

fn count_hits(text: &str, words: &[&str]) -> usize {
    words.iter().filter(|w| text.contains(*w)).count()
}

fn matching_tags(text: &str, table: &[(&str, &[&str])]) -> Vec<String> {
    let lower = text.to_lowercase();
    table
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(tag, _)| tag.to_string())
        .collect()
}

/// Questions are `Inquiry`; otherwise the larger keyword count wins.
pub fn analyze_sentiment(message: &str) -> Sentiment {
    let lower = message.to_lowercase();

    if QUESTION_MARKERS.iter().any(|q| lower.contains(q)) {
        return Sentiment::Inquiry;
    }

    let positive = count_hits(&lower, POSITIVE_WORDS);
    let negative = count_hits(&lower, NEGATIVE_WORDS);
    if positive > negative {
        Sentiment::Positive
    } else if negative > positive {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

pub fn extract_topic(message: &str) -> String {
    matching_tags(message, TOPIC_KEYWORDS)
        .into_iter()
        .next()
        .unwrap_or_else(|| "general".to_string())
}

pub fn extract_concerns(message: &str) -> Vec<String> {
    matching_tags(message, CONCERN_KEYWORDS)
}

pub fn extract_next_steps(response: &str) -> Vec<String> {
    matching_tags(response, NEXT_STEP_KEYWORDS)
}

/// Tag a turn from its text alone.
pub fn derive_context(user_message: &str, ai_response: &str) -> TurnContext {
    TurnContext {
        topic: extract_topic(user_message),
        sentiment: analyze_sentiment(user_message),
        concerns: extract_concerns(user_message),
        next_steps: extract_next_steps(ai_response),
        ..TurnContext::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn questions_are_inquiries() {
        assert_eq!(analyze_sentiment("Plumbing kaise chal raha hai"), Sentiment::Inquiry);
        assert_eq!(analyze_sentiment("Is it done?"), Sentiment::Inquiry);
    }

    #[test]
    fn keyword_balance_decides_sentiment() {
        assert_eq!(analyze_sentiment("Great work, very happy"), Sentiment::Positive);
        assert_eq!(analyze_sentiment("There is a delay and a problem"), Sentiment::Negative);
        assert_eq!(analyze_sentiment("Theek hai"), Sentiment::Neutral);
    }

    #[test]
    fn first_matching_topic_wins() {
        assert_eq!(extract_topic("Bathroom tiles ka scene batao"), "tiles");
        assert_eq!(extract_topic("Payment ka status"), "payment");
        assert_eq!(extract_topic("Namaste"), "general");
        // "update" belongs to construction_progress, listed before timeline.
        assert_eq!(extract_topic("Update on when it is ready"), "construction_progress");
    }

    #[test]
    fn concerns_and_steps_are_tagged_in_table_order() {
        assert_eq!(
            extract_concerns("The budget is high and work is slow"),
            vec!["delay", "cost"]
        );
        assert_eq!(
            extract_next_steps("Site pe visit karo, phir meeting arrange karte hain"),
            vec!["site_visit", "meeting"]
        );
    }

    #[test]
    fn derived_context_combines_all_extractors() {
        let ctx = derive_context(
            "Painting mein delay kyun hai?",
            "Main aapko kal call karke update dungi.",
        );
        assert_eq!(ctx.topic, "painting");
        assert_eq!(ctx.sentiment, Sentiment::Inquiry);
        assert_eq!(ctx.concerns, vec!["delay"]);
        assert_eq!(ctx.next_steps, vec!["follow_up"]);
    }
}
