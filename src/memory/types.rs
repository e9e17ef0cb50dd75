use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
    Inquiry,
    Concerned,
    Excited,
    VeryPositive,
}

impl Sentiment {
    /// Counts toward the positive side when aggregating a window.
    pub fn is_upbeat(self) -> bool {
        matches!(self, Sentiment::Positive | Sentiment::Excited)
    }

    /// Counts toward the negative side when aggregating a window.
    pub fn is_troubled(self) -> bool {
        matches!(self, Sentiment::Negative | Sentiment::Concerned)
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Inquiry => "inquiry",
            Sentiment::Concerned => "concerned",
            Sentiment::Excited => "excited",
            Sentiment::VeryPositive => "very_positive",
        };
        write!(f, "{name}")
    }
}

fn default_topic() -> String {
    "general".to_string()
}

/// Metadata recorded with each turn. Keys other than the four recognized
/// ones are kept in `extra` and written back verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnContext {
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default)]
    pub sentiment: Sentiment,
    #[serde(default)]
    pub concerns: Vec<String>,
    #[serde(default, rename = "nextSteps")]
    pub next_steps: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for TurnContext {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            sentiment: Sentiment::default(),
            concerns: Vec::new(),
            next_steps: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl TurnContext {
    pub fn new(topic: impl Into<String>, sentiment: Sentiment) -> Self {
        Self {
            topic: topic.into(),
            sentiment,
            ..Self::default()
        }
    }

    pub fn with_concerns(mut self, concerns: &[&str]) -> Self {
        self.concerns = concerns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_next_steps(mut self, steps: &[&str]) -> Self {
        self.next_steps = steps.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// One recorded user-message / assistant-response pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    #[serde(rename = "date", alias = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub user_message: String,
    pub ai_response: String,
    #[serde(default)]
    pub context: TurnContext,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication_style: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Mutable per-customer summary state, distinct from the turn log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerContext {
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_call_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub topics_discussed: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
    #[serde(default)]
    pub upcoming_visit: Option<DateTime<Utc>>,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CustomerContext {
    /// Default skeleton for a customer seen for the first time.
    pub fn skeleton(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: None,
            last_call_date: None,
            topics_discussed: Vec::new(),
            concerns: Vec::new(),
            upcoming_visit: None,
            preferences: Preferences::default(),
            extra: Map::new(),
        }
    }
}

/// Top-level keys to shallow-merge into a `CustomerContext`.
pub type ContextUpdate = Map<String, Value>;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LastConversation {
    pub date: DateTime<Utc>,
    pub topic: String,
    pub user_message: String,
    pub summary: String,
}

/// Reduced view over the most recent turns of one customer.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummarizedContext {
    pub has_history: bool,
    pub conversation_count: usize,
    pub recent_topics: Vec<String>,
    pub concerns: Vec<String>,
    pub next_steps: Vec<String>,
    pub sentiment: Sentiment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_conversation: Option<LastConversation>,
}

impl SummarizedContext {
    pub fn empty() -> Self {
        Self {
            has_history: false,
            conversation_count: 0,
            recent_topics: Vec::new(),
            concerns: Vec::new(),
            next_steps: Vec::new(),
            sentiment: Sentiment::Neutral,
            last_conversation: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerStats {
    pub customer_id: String,
    pub conversation_count: usize,
    pub last_conversation: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub total_customers: usize,
    pub total_conversations: usize,
    pub average_conversations_per_customer: usize,
    pub customers: Vec<CustomerStats>,
}
