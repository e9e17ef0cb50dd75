//! File-backed conversation memory.
//!
//! Layout under `data_dir`:
//! - `conversations/{customer_id}.json`: pretty JSON array of turns, oldest first
//! - `customer_context.json`: object mapping customer id → context record
//!
//! Every file write goes through a temp file and a rename. Log writes are
//! serialized per customer; context writes share one lock since they touch
//! a single file.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};

use super::samples;
use super::summary::summarize;
use super::types::{
    ContextUpdate, ConversationTurn, CustomerContext, CustomerStats, MemoryStats,
    SummarizedContext, TurnContext,
};
use crate::config::MemoryConfig;
use crate::error::{MemoryError, MemoryResult};

const CONVERSATIONS_DIR: &str = "conversations";
const CONTEXT_FILE: &str = "customer_context.json";

type ContextMap = BTreeMap<String, CustomerContext>;

/// Reject ids that are empty or could escape the conversations directory.
pub fn validate_customer_id(customer_id: &str) -> MemoryResult<()> {
    let valid = !customer_id.is_empty()
        && customer_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(MemoryError::InvalidCustomerId(customer_id.to_string()))
    }
}

async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> MemoryResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Read a file, mapping "does not exist" to `None`.
async fn read_optional(path: &Path) -> MemoryResult<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub struct MemoryStore {
    config: MemoryConfig,
    conversations_dir: PathBuf,
    context_file: PathBuf,
    customer_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    context_lock: AsyncMutex<()>,
}

impl MemoryStore {
    pub fn new(config: MemoryConfig) -> Self {
        let conversations_dir = config.data_dir.join(CONVERSATIONS_DIR);
        let context_file = config.data_dir.join(CONTEXT_FILE);
        Self {
            config,
            conversations_dir,
            context_file,
            customer_locks: Mutex::new(HashMap::new()),
            context_lock: AsyncMutex::new(()),
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Create the data directories and an empty context file if missing.
    pub async fn init(&self) -> MemoryResult<()> {
        fs::create_dir_all(&self.conversations_dir).await?;
        if read_optional(&self.context_file).await?.is_none() {
            write_json_atomic(&self.context_file, &ContextMap::new()).await?;
            debug!("Created {}", self.context_file.display());
        }
        Ok(())
    }

    fn log_path(&self, customer_id: &str) -> PathBuf {
        self.conversations_dir.join(format!("{customer_id}.json"))
    }

    fn customer_lock(&self, customer_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .customer_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(customer_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Drop the map entry once nobody else holds or waits on the lock.
    /// Call only after the guard is released.
    fn release_customer_lock(&self, customer_id: &str, lock: Arc<AsyncMutex<()>>) {
        let mut locks = self
            .customer_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let ours = locks
            .get(customer_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &lock));
        // One reference in the map, one here.
        if ours && Arc::strong_count(&lock) == 2 {
            locks.remove(customer_id);
        }
    }

    /// Load a customer's full log. A missing file is an empty log.
    pub async fn read_log(&self, customer_id: &str) -> MemoryResult<Vec<ConversationTurn>> {
        validate_customer_id(customer_id)?;
        match read_optional(&self.log_path(customer_id)).await? {
            Some(contents) => Ok(serde_json::from_str(&contents)?),
            None => Ok(Vec::new()),
        }
    }

    async fn read_contexts(&self) -> MemoryResult<ContextMap> {
        match read_optional(&self.context_file).await? {
            Some(contents) => Ok(serde_json::from_str(&contents)?),
            None => Ok(ContextMap::new()),
        }
    }

    // --- Conversation log ---

    /// Append a turn, keep the newest `max_turns`, then stamp `last_call_date`.
    pub async fn save_conversation(
        &self,
        customer_id: &str,
        user_message: &str,
        ai_response: &str,
        timestamp: Option<DateTime<Utc>>,
        context: Option<TurnContext>,
    ) -> bool {
        let turn = ConversationTurn {
            timestamp: timestamp.unwrap_or_else(Utc::now),
            user_message: user_message.to_string(),
            ai_response: ai_response.to_string(),
            context: context.unwrap_or_default(),
        };

        match self.append_turn(customer_id, turn).await {
            Ok(()) => {
                info!("Conversation saved for {customer_id}");
                true
            }
            Err(e) => {
                error!("Failed to save conversation for {customer_id}: {e}");
                false
            }
        }
    }

    async fn append_turn(&self, customer_id: &str, turn: ConversationTurn) -> MemoryResult<()> {
        validate_customer_id(customer_id)?;
        let lock = self.customer_lock(customer_id);
        let written = {
            let _guard = lock.lock().await;
            self.write_turn(customer_id, turn).await
        };
        self.release_customer_lock(customer_id, lock);
        written?;

        self.modify_context(customer_id, true, |ctx| {
            ctx.last_call_date = Some(Utc::now());
            Ok(())
        })
        .await
    }

    /// Caller holds the customer's lock.
    async fn write_turn(&self, customer_id: &str, turn: ConversationTurn) -> MemoryResult<()> {
        let mut turns = self.read_log(customer_id).await?;
        turns.push(turn);
        if turns.len() > self.config.max_turns {
            let excess = turns.len() - self.config.max_turns;
            turns.drain(..excess);
        }
        write_json_atomic(&self.log_path(customer_id), &turns).await
    }

    /// The most recent `last_n` turns, oldest first. Empty when no log exists
    /// or it cannot be read.
    pub async fn conversation_history(
        &self,
        customer_id: &str,
        last_n: usize,
    ) -> Vec<ConversationTurn> {
        match self.read_log(customer_id).await {
            Ok(mut turns) => {
                let start = turns.len().saturating_sub(last_n);
                turns.split_off(start)
            }
            Err(e) => {
                warn!("Failed to read conversation history for {customer_id}: {e}");
                Vec::new()
            }
        }
    }

    pub async fn summarized_context(&self, customer_id: &str, last_n: usize) -> SummarizedContext {
        let turns = self.conversation_history(customer_id, last_n).await;
        summarize(&turns)
    }

    /// Delete a customer's log. A log that does not exist counts as cleared.
    pub async fn clear_history(&self, customer_id: &str) -> bool {
        if let Err(e) = validate_customer_id(customer_id) {
            error!("Failed to clear history: {e}");
            return false;
        }

        let lock = self.customer_lock(customer_id);
        let removed = {
            let _guard = lock.lock().await;
            fs::remove_file(self.log_path(customer_id)).await
        };
        self.release_customer_lock(customer_id, lock);

        match removed {
            Ok(()) => {
                info!("Conversation history cleared for {customer_id}");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                error!("Failed to clear history for {customer_id}: {e}");
                false
            }
        }
    }

    /// Ids of all customers with a log file, sorted.
    pub async fn customers_with_history(&self) -> Vec<String> {
        let mut entries = match fs::read_dir(&self.conversations_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to list conversations: {e}");
                }
                return Vec::new();
            }
        };

        let mut ids = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    if path.extension().and_then(|e| e.to_str()) != Some("json") {
                        continue;
                    }
                    match path.file_stem().and_then(|s| s.to_str()) {
                        Some(stem) if validate_customer_id(stem).is_ok() => {
                            ids.push(stem.to_string());
                        }
                        _ => debug!("Skipping foreign file {}", path.display()),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read conversations dir entry: {e}");
                    break;
                }
            }
        }

        ids.sort();
        ids
    }

    pub async fn memory_stats(&self) -> MemoryStats {
        let customer_ids = self.customers_with_history().await;

        let mut total_conversations = 0;
        let mut customers = Vec::with_capacity(customer_ids.len());
        for customer_id in customer_ids {
            let turns = self.conversation_history(&customer_id, usize::MAX).await;
            total_conversations += turns.len();
            customers.push(CustomerStats {
                conversation_count: turns.len(),
                last_conversation: turns.last().map(|t| t.timestamp),
                customer_id,
            });
        }

        let total_customers = customers.len();
        let average_conversations_per_customer = if total_customers > 0 {
            (total_conversations as f64 / total_customers as f64).round() as usize
        } else {
            0
        };

        MemoryStats {
            total_customers,
            total_conversations,
            average_conversations_per_customer,
            customers,
        }
    }

    // --- Customer context ---

    pub async fn customer_context(&self, customer_id: &str) -> Option<CustomerContext> {
        match self.read_contexts().await {
            Ok(mut contexts) => contexts.remove(customer_id),
            Err(e) => {
                error!("Failed to read customer context: {e}");
                None
            }
        }
    }

    /// Read-modify-write one context record under the context lock. With
    /// `create` unset, a missing record is left alone.
    async fn modify_context<F>(&self, customer_id: &str, create: bool, apply: F) -> MemoryResult<()>
    where
        F: FnOnce(&mut CustomerContext) -> MemoryResult<()>,
    {
        validate_customer_id(customer_id)?;
        let _guard = self.context_lock.lock().await;

        let mut contexts = self.read_contexts().await?;
        let now = Utc::now();
        if create && !contexts.contains_key(customer_id) {
            contexts.insert(customer_id.to_string(), CustomerContext::skeleton(now));
        }
        let Some(ctx) = contexts.get_mut(customer_id) else {
            return Ok(());
        };

        apply(ctx)?;
        ctx.updated_at = Some(now);

        write_json_atomic(&self.context_file, &contexts).await
    }

    /// Shallow-merge `updates` into the customer's context, creating it first
    /// if needed.
    pub async fn update_customer_context(&self, customer_id: &str, updates: ContextUpdate) -> bool {
        let result = self
            .modify_context(customer_id, true, |ctx| {
                let mut merged = serde_json::to_value(&*ctx)?;
                if let Value::Object(fields) = &mut merged {
                    fields.extend(updates);
                }
                *ctx = serde_json::from_value(merged)
                    .map_err(|e| MemoryError::InvalidUpdate(e.to_string()))?;
                Ok(())
            })
            .await;

        match result {
            Ok(()) => {
                info!("Customer context updated for {customer_id}");
                true
            }
            Err(e) => {
                error!("Failed to update customer context for {customer_id}: {e}");
                false
            }
        }
    }

    pub async fn add_concern(&self, customer_id: &str, concern: &str) -> bool {
        self.log_outcome(
            "add concern",
            customer_id,
            self.modify_context(customer_id, true, |ctx| {
                push_unique(&mut ctx.concerns, concern);
                Ok(())
            })
            .await,
        )
    }

    pub async fn remove_concern(&self, customer_id: &str, concern: &str) -> bool {
        self.log_outcome(
            "remove concern",
            customer_id,
            self.modify_context(customer_id, false, |ctx| {
                ctx.concerns.retain(|c| c != concern);
                Ok(())
            })
            .await,
        )
    }

    pub async fn add_discussed_topic(&self, customer_id: &str, topic: &str) -> bool {
        self.log_outcome(
            "add topic",
            customer_id,
            self.modify_context(customer_id, true, |ctx| {
                push_unique(&mut ctx.topics_discussed, topic);
                Ok(())
            })
            .await,
        )
    }

    fn log_outcome(&self, action: &str, customer_id: &str, result: MemoryResult<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to {action} for {customer_id}: {e}");
                false
            }
        }
    }

    // --- Demo data ---

    /// Write the demo customers when no context records exist yet.
    /// Returns whether anything was written.
    pub async fn seed_sample_data(&self) -> MemoryResult<bool> {
        self.init().await?;
        let _guard = self.context_lock.lock().await;

        let mut contexts = self.read_contexts().await?;
        if !contexts.is_empty() {
            debug!("Context store already populated, skipping sample data");
            return Ok(false);
        }

        info!("Creating sample conversation data...");
        for sample in samples::sample_customers() {
            write_json_atomic(&self.log_path(sample.customer_id), &sample.turns).await?;
            contexts.insert(sample.customer_id.to_string(), sample.context);
        }
        write_json_atomic(&self.context_file, &contexts).await?;
        info!("Sample conversation data created for {} customers", contexts.len());

        Ok(true)
    }
}

fn push_unique(items: &mut Vec<String>, item: &str) {
    if !items.iter().any(|existing| existing == item) {
        items.push(item.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::Sentiment;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> MemoryStore {
        MemoryStore::new(MemoryConfig {
            data_dir: dir.path().to_path_buf(),
            ..MemoryConfig::default()
        })
    }

    fn updates(value: Value) -> ContextUpdate {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn customer_ids_are_validated() {
        assert!(validate_customer_id("CUST001").is_ok());
        assert!(validate_customer_id("cust_01-a").is_ok());
        assert!(validate_customer_id("").is_err());
        assert!(validate_customer_id("../etc").is_err());
        assert!(validate_customer_id("a/b").is_err());
    }

    #[tokio::test]
    async fn save_applies_context_defaults_and_stamps_last_call() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.save_conversation("CUST001", "Hello", "Namaste!", None, None).await);

        let history = store.conversation_history("CUST001", 5).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].context.topic, "general");
        assert_eq!(history[0].context.sentiment, Sentiment::Neutral);

        let ctx = store.customer_context("CUST001").await.unwrap();
        assert!(ctx.last_call_date.is_some());
        assert!(ctx.updated_at.is_some());
    }

    #[tokio::test]
    async fn invalid_id_fails_without_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(!store.save_conversation("../evil", "hi", "hello", None, None).await);
        assert!(store.conversation_history("../evil", 5).await.is_empty());
        assert!(!store.clear_history("../evil").await);
        assert!(!dir.path().join("evil.json").exists());
    }

    #[tokio::test]
    async fn malformed_log_reads_as_empty_and_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.init().await.unwrap();

        let path = dir.path().join("conversations/CUST009.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(store.conversation_history("CUST009", 5).await.is_empty());
        assert!(!store.save_conversation("CUST009", "hi", "hello", None, None).await);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn update_is_a_shallow_merge() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(
            store
                .update_customer_context(
                    "CUST002",
                    updates(json!({
                        "topics_discussed": ["garden_landscaping"],
                        "preferences": { "call_time": "evening", "language": "balanced_hinglish" },
                        "vip": true
                    })),
                )
                .await
        );
        assert!(
            store
                .update_customer_context(
                    "CUST002",
                    updates(json!({ "preferences": { "communication_style": "casual" } })),
                )
                .await
        );

        let ctx = store.customer_context("CUST002").await.unwrap();
        assert_eq!(ctx.topics_discussed, vec!["garden_landscaping"]);
        // Top-level keys are replaced wholesale.
        assert_eq!(ctx.preferences.call_time, None);
        assert_eq!(ctx.preferences.communication_style.as_deref(), Some("casual"));
        assert_eq!(ctx.extra["vip"], json!(true));
    }

    #[tokio::test]
    async fn update_with_wrong_shape_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(
            !store
                .update_customer_context("CUST003", updates(json!({ "concerns": "not a list" })))
                .await
        );
        assert!(store.customer_context("CUST003").await.is_none());
    }

    #[tokio::test]
    async fn concerns_and_topics_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.add_concern("CUST003", "interior_cost").await);
        assert!(store.add_concern("CUST003", "interior_cost").await);
        assert!(store.add_concern("CUST003", "payment_flexibility").await);
        assert!(store.add_discussed_topic("CUST003", "payment").await);
        assert!(store.add_discussed_topic("CUST003", "payment").await);

        let ctx = store.customer_context("CUST003").await.unwrap();
        assert_eq!(ctx.concerns, vec!["interior_cost", "payment_flexibility"]);
        assert_eq!(ctx.topics_discussed, vec!["payment"]);

        assert!(store.remove_concern("CUST003", "interior_cost").await);
        let ctx = store.customer_context("CUST003").await.unwrap();
        assert_eq!(ctx.concerns, vec!["payment_flexibility"]);
    }

    #[tokio::test]
    async fn remove_concern_without_record_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.remove_concern("CUST404", "delay").await);
        assert!(store.customer_context("CUST404").await.is_none());
    }

    #[tokio::test]
    async fn concurrent_saves_do_not_lose_turns() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .save_conversation("CUST001", &format!("msg {i}"), "ok", None, None)
                        .await
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        assert_eq!(store.conversation_history("CUST001", 100).await.len(), 20);
    }

    #[tokio::test]
    async fn seeding_only_happens_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.seed_sample_data().await.unwrap());
        assert!(!store.seed_sample_data().await.unwrap());

        assert_eq!(
            store.customers_with_history().await,
            vec!["CUST001", "CUST002", "CUST003"]
        );
        let ctx = store.customer_context("CUST001").await.unwrap();
        assert_eq!(ctx.preferences.language.as_deref(), Some("more_hindi"));
    }

    fn lock_entries(store: &MemoryStore) -> usize {
        store.customer_locks.lock().unwrap().len()
    }

    #[tokio::test]
    async fn lock_map_does_not_grow_with_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));

        for i in 0..500 {
            assert!(store.clear_history(&format!("ghost{i}")).await);
        }
        assert_eq!(lock_entries(&store), 0);

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let id = format!("CUST{}", i % 5);
                    store.save_conversation(&id, "hi", "hello", None, None).await
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        assert_eq!(lock_entries(&store), 0);
        assert_eq!(store.conversation_history("CUST0", 100).await.len(), 10);
    }

    #[tokio::test]
    async fn foreign_log_files_are_not_customers() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.save_conversation("CUST001", "hi", "hello", None, None).await);

        let conversations = dir.path().join("conversations");
        std::fs::write(conversations.join("bad.id.json"), "[]").unwrap();
        std::fs::write(conversations.join("notes.txt"), "x").unwrap();

        assert_eq!(store.customers_with_history().await, vec!["CUST001"]);
        let stats = store.memory_stats().await;
        assert_eq!(stats.total_customers, 1);
        assert_eq!(stats.total_conversations, 1);
    }
}
