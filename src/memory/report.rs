//! Markdown conversation report for one customer.

use std::collections::BTreeMap;

use chrono::Duration;

use super::store::MemoryStore;
use super::summary::aggregate_sentiment;
use super::types::{ConversationTurn, CustomerContext};

fn format_span(span: Duration) -> String {
    let minutes = span.num_minutes().max(0);
    if minutes < 60 {
        format!("{minutes}m")
    } else {
        let hours = minutes / 60;
        if hours < 24 {
            format!("{hours}h {}m", minutes % 60)
        } else {
            format!("{}d {}h", hours / 24, hours % 24)
        }
    }
}

/// Char-safe truncation for table cells; pipes and newlines would break the row.
fn truncate(text: &str, max_len: usize) -> String {
    let cleaned = text.replace('|', "/").replace('\n', " ");
    if cleaned.chars().count() <= max_len {
        cleaned
    } else {
        let head: String = cleaned.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

pub fn render_report(
    customer_id: &str,
    turns: &[ConversationTurn],
    context: Option<&CustomerContext>,
) -> String {
    let (Some(first), Some(last)) = (turns.first(), turns.last()) else {
        return format!("# Conversation Report - {customer_id}\n\nNo conversations recorded.");
    };

    let mut tally: BTreeMap<String, usize> = BTreeMap::new();
    for t in turns {
        *tally.entry(t.context.sentiment.to_string()).or_insert(0) += 1;
    }
    let tally = tally
        .iter()
        .map(|(sentiment, count)| format!("{sentiment} {count}"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut lines = vec![
        format!("# Conversation Report - {customer_id}"),
        String::new(),
        "## Summary".to_string(),
        format!("- **Turns**: {}", turns.len()),
        format!("- **First call**: {}", first.timestamp.format("%Y-%m-%d %H:%M")),
        format!("- **Last call**: {}", last.timestamp.format("%Y-%m-%d %H:%M")),
        format!("- **Active span**: {}", format_span(last.timestamp - first.timestamp)),
        format!(
            "- **Overall sentiment**: {} ({tally})",
            aggregate_sentiment(turns)
        ),
    ];

    if let Some(ctx) = context {
        lines.push(format!("- **Open concerns**: {}", list_or_none(&ctx.concerns)));
        lines.push(format!(
            "- **Topics discussed**: {}",
            list_or_none(&ctx.topics_discussed)
        ));
        if let Some(visit) = ctx.upcoming_visit {
            lines.push(format!("- **Upcoming visit**: {}", visit.format("%Y-%m-%d %H:%M")));
        }
    }

    lines.extend([
        String::new(),
        "## Conversation Log".to_string(),
        String::new(),
        "| Date | Topic | Sentiment | Customer | Agent |".to_string(),
        "|------|-------|-----------|----------|-------|".to_string(),
    ]);

    for t in turns {
        let customer = if t.user_message.is_empty() {
            "-".to_string()
        } else {
            truncate(&t.user_message, 30)
        };
        lines.push(format!(
            "| {} | {} | {} | {customer} | {} |",
            t.timestamp.format("%m-%d %H:%M"),
            t.context.topic,
            t.context.sentiment,
            truncate(&t.ai_response, 40),
        ));
    }

    lines.join("\n")
}

/// Report over a customer's full log plus their context record.
pub async fn generate_report(store: &MemoryStore, customer_id: &str) -> String {
    let turns = store.conversation_history(customer_id, usize::MAX).await;
    let context = store.customer_context(customer_id).await;
    render_report(customer_id, &turns, context.as_ref())
}
