use chrono::{Duration, TimeZone, Utc};
use serde_json::Value;
use tempfile::TempDir;
use voice_agent_rs::config::MemoryConfig;
use voice_agent_rs::memory::{report, MemoryStore, Sentiment, TurnContext};

fn store_in(dir: &TempDir) -> MemoryStore {
    MemoryStore::new(MemoryConfig {
        data_dir: dir.path().to_path_buf(),
        ..MemoryConfig::default()
    })
}

#[tokio::test]
async fn log_is_capped_at_max_turns_dropping_oldest() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let start = Utc.with_ymd_and_hms(2024, 11, 1, 9, 0, 0).unwrap();

    for i in 0..101 {
        let at = start + Duration::minutes(i);
        assert!(
            store
                .save_conversation("CUST001", &format!("question {i}"), "answer", Some(at), None)
                .await
        );
    }

    let history = store.conversation_history("CUST001", usize::MAX).await;
    assert_eq!(history.len(), 100);
    assert_eq!(history[0].user_message, "question 1");
    assert_eq!(history[99].user_message, "question 100");
}

#[tokio::test]
async fn unknown_customer_has_empty_views() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    assert!(store.conversation_history("CUST404", 5).await.is_empty());
    assert!(store.customer_context("CUST404").await.is_none());

    let summary = store.summarized_context("CUST404", 5).await;
    assert!(!summary.has_history);
    assert_eq!(summary.conversation_count, 0);
}

#[tokio::test]
async fn clearing_a_missing_log_succeeds_without_creating_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    assert!(store.clear_history("CUST404").await);
    assert!(!dir.path().join("conversations/CUST404.json").exists());
}

#[tokio::test]
async fn saved_turn_reads_back_as_latest() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let context = TurnContext::new("payment_schedule", Sentiment::Concerned)
        .with_concerns(&["payment_due"]);

    assert!(store.save_conversation("CUST003", "first", "one", None, None).await);
    assert!(
        store
            .save_conversation("CUST003", "Next payment kab hai?", "15th November", None, Some(context.clone()))
            .await
    );

    let latest = store.conversation_history("CUST003", 1).await;
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].user_message, "Next payment kab hai?");
    assert_eq!(latest[0].ai_response, "15th November");
    assert_eq!(latest[0].context, context);

    assert!(store.conversation_history("CUST003", 0).await.is_empty());
}

#[tokio::test]
async fn log_file_uses_the_documented_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    assert!(store.save_conversation("CUST001", "Hello", "Namaste!", None, None).await);

    let raw = std::fs::read_to_string(dir.path().join("conversations/CUST001.json")).unwrap();
    let turns: Value = serde_json::from_str(&raw).unwrap();
    let turn = &turns[0];
    assert!(turn["date"].is_string());
    assert_eq!(turn["userMessage"], "Hello");
    assert_eq!(turn["aiResponse"], "Namaste!");
    assert_eq!(turn["context"]["topic"], "general");
    assert_eq!(turn["context"]["sentiment"], "neutral");
    assert_eq!(turn["context"]["nextSteps"], Value::Array(vec![]));
}

#[tokio::test]
async fn stats_cover_every_customer_with_a_log() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let empty = store.memory_stats().await;
    assert_eq!(empty.total_customers, 0);
    assert_eq!(empty.average_conversations_per_customer, 0);

    for _ in 0..3 {
        store.save_conversation("CUST001", "q", "a", None, None).await;
    }
    for _ in 0..2 {
        store.save_conversation("CUST002", "q", "a", None, None).await;
    }

    let stats = store.memory_stats().await;
    assert_eq!(stats.total_customers, 2);
    assert_eq!(stats.total_conversations, 5);
    // 2.5 rounds away from zero.
    assert_eq!(stats.average_conversations_per_customer, 3);
    assert_eq!(stats.customers[0].customer_id, "CUST001");
    assert_eq!(stats.customers[0].conversation_count, 3);
    assert!(stats.customers[1].last_conversation.is_some());
}

#[tokio::test]
async fn seeded_store_summarizes_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    assert!(store.seed_sample_data().await.unwrap());

    let summary = store.summarized_context("CUST003", 5).await;
    assert_eq!(summary.conversation_count, 3);
    assert_eq!(summary.sentiment, Sentiment::Concerned);
    assert_eq!(
        summary.concerns,
        vec!["payment_due", "interior_cost", "payment_flexibility"]
    );

    let markdown = report::generate_report(&store, "CUST001").await;
    assert!(markdown.starts_with("# Conversation Report - CUST001"));
    assert!(markdown.contains("- **Turns**: 4"));
    assert!(markdown.contains("- **Open concerns**: bathroom_tiles"));
}
