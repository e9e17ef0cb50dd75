//! Windowed summaries over a customer's recent turns.

use super::types::{ConversationTurn, LastConversation, Sentiment, SummarizedContext};

const SYNOPSIS_CHARS: usize = 100;

/// Majority of upbeat vs troubled turns; ties and empty windows are neutral.
pub fn aggregate_sentiment(turns: &[ConversationTurn]) -> Sentiment {
    let upbeat = turns.iter().filter(|t| t.context.sentiment.is_upbeat()).count();
    let troubled = turns.iter().filter(|t| t.context.sentiment.is_troubled()).count();

    if upbeat > troubled {
        Sentiment::Positive
    } else if troubled > upbeat {
        Sentiment::Concerned
    } else {
        Sentiment::Neutral
    }
}

/// Insertion-ordered dedup.
fn unique<'a>(items: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for item in items {
        if !seen.contains(item) {
            seen.push(item.clone());
        }
    }
    seen
}

/// First 100 chars of the response, always followed by an ellipsis.
fn synopsis(text: &str) -> String {
    let head: String = text.chars().take(SYNOPSIS_CHARS).collect();
    format!("{head}...")
}

pub fn summarize(turns: &[ConversationTurn]) -> SummarizedContext {
    let Some(last) = turns.last() else {
        return SummarizedContext::empty();
    };

    SummarizedContext {
        has_history: true,
        conversation_count: turns.len(),
        recent_topics: unique(
            turns
                .iter()
                .map(|t| &t.context.topic)
                .filter(|topic| !topic.is_empty()),
        ),
        concerns: unique(turns.iter().flat_map(|t| &t.context.concerns)),
        next_steps: unique(turns.iter().flat_map(|t| &t.context.next_steps)),
        sentiment: aggregate_sentiment(turns),
        last_conversation: Some(LastConversation {
            date: last.timestamp,
            topic: last.context.topic.clone(),
            user_message: last.user_message.clone(),
            summary: synopsis(&last.ai_response),
        }),
    }
}
