//! Data model (spec §3) — row types shared by storage, the attention graph,
//! and the query engine. Every row carries a `tenant_id`; nothing here
//! implements cross-tenant access.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of an [`Entity`] (concept node).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    #[default]
    Concept,
    Decision,
    Session,
    Person,
    Place,
    Project,
    Tool,
    Topic,
    Event,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Concept => "concept",
            EntityType::Decision => "decision",
            EntityType::Session => "session",
            EntityType::Person => "person",
            EntityType::Place => "place",
            EntityType::Project => "project",
            EntityType::Tool => "tool",
            EntityType::Topic => "topic",
            EntityType::Event => "event",
        }
    }

    pub fn parse_name(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "decision" => EntityType::Decision,
            "session" => EntityType::Session,
            "person" => EntityType::Person,
            "place" => EntityType::Place,
            "project" => EntityType::Project,
            "tool" => EntityType::Tool,
            "topic" => EntityType::Topic,
            "event" => EntityType::Event,
            _ => EntityType::Concept,
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A concept/entity row. `(lower(name), tenant_id)` is the logical dedup key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: i64,
    pub tenant_id: String,
    pub name: String,
    pub entity_type: EntityType,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A verbatim user/assistant turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub tenant_id: String,
    pub user_message: String,
    pub ai_response: String,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub metadata: serde_json::Value,
    pub thinking: Option<String>,
}

/// Role of an [`AutoMessage`] row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoMessageRole {
    User,
    Assistant,
    Thinking,
}

impl AutoMessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutoMessageRole::User => "user",
            AutoMessageRole::Assistant => "assistant",
            AutoMessageRole::Thinking => "thinking",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Some(AutoMessageRole::User),
            "assistant" => Some(AutoMessageRole::Assistant),
            "thinking" => Some(AutoMessageRole::Thinking),
            _ => None,
        }
    }
}

/// A single per-role log line within an instance's turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoMessage {
    pub id: i64,
    pub tenant_id: String,
    pub instance_id: String,
    pub timestamp: DateTime<Utc>,
    pub message_number: i64,
    pub role: AutoMessageRole,
    pub content: String,
    pub metadata: serde_json::Value,
}

/// A decision extracted from assistant-role text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub id: i64,
    pub tenant_id: String,
    pub instance_id: String,
    pub timestamp: DateTime<Utc>,
    pub decision_text: String,
    pub context: Option<String>,
    pub extracted_from: String,
}

/// Edge type for an [`AttentionLink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkType {
    CoOccurrence,
    Hebbian,
    Neural,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::CoOccurrence => "co-occurrence",
            LinkType::Hebbian => "hebbian",
            LinkType::Neural => "neural",
        }
    }

    pub fn parse_name(s: &str) -> Self {
        match s {
            "hebbian" => LinkType::Hebbian,
            "neural" => LinkType::Neural,
            _ => LinkType::CoOccurrence,
        }
    }
}

/// An unordered weighted association between two concept names within a
/// tenant. `strength` is always clamped to `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttentionLink {
    pub id: i64,
    pub tenant_id: String,
    pub concept_a: String,
    pub concept_b: String,
    pub link_type: LinkType,
    pub strength: f64,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

/// A canonicalized combination of up to three co-occurring concepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundConcept {
    pub tenant_id: String,
    pub compound_name: String,
    pub component_concepts: Vec<String>,
    pub co_occurrence_count: i64,
    pub last_seen: DateTime<Utc>,
}

/// Status of an [`Intention`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentionStatus {
    Pending,
    Completed,
    Abandoned,
}

impl IntentionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentionStatus::Pending => "pending",
            IntentionStatus::Completed => "completed",
            IntentionStatus::Abandoned => "abandoned",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Some(IntentionStatus::Pending),
            "completed" => Some(IntentionStatus::Completed),
            "abandoned" => Some(IntentionStatus::Abandoned),
            _ => None,
        }
    }
}

/// A resumable work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intention {
    pub id: i64,
    pub tenant_id: String,
    pub intention: String,
    pub context: Option<String>,
    pub priority: i32,
    pub status: IntentionStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub session_id: Option<String>,
    pub metadata: serde_json::Value,
}

/// Kind of change recorded by [`ConceptEvolutionEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvolutionEventType {
    Created,
    Strengthened,
    Weakened,
    Connected,
    Refined,
    Contradicted,
}

impl EvolutionEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvolutionEventType::Created => "created",
            EvolutionEventType::Strengthened => "strengthened",
            EvolutionEventType::Weakened => "weakened",
            EvolutionEventType::Connected => "connected",
            EvolutionEventType::Refined => "refined",
            EvolutionEventType::Contradicted => "contradicted",
        }
    }
}

/// A single concept-evolution audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptEvolutionEvent {
    pub id: i64,
    pub tenant_id: String,
    pub concept_name: String,
    pub event_type: EvolutionEventType,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub context: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A point-in-time serialization of engine metrics, used by
/// `take_snapshot`/`compare_snapshots`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingSnapshot {
    pub id: i64,
    pub tenant_id: String,
    pub snapshot_type: String,
    pub content: serde_json::Value,
    pub metrics: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_roundtrip() {
        for t in [
            EntityType::Concept,
            EntityType::Decision,
            EntityType::Session,
            EntityType::Person,
            EntityType::Place,
            EntityType::Project,
            EntityType::Tool,
            EntityType::Topic,
            EntityType::Event,
        ] {
            assert_eq!(EntityType::parse_name(t.as_str()), t);
        }
    }

    #[test]
    fn link_type_roundtrip() {
        for t in [LinkType::CoOccurrence, LinkType::Hebbian, LinkType::Neural] {
            assert_eq!(LinkType::parse_name(t.as_str()), t);
        }
    }

    #[test]
    fn intention_status_roundtrip() {
        for s in [
            IntentionStatus::Pending,
            IntentionStatus::Completed,
            IntentionStatus::Abandoned,
        ] {
            assert_eq!(IntentionStatus::parse_name(s.as_str()), Some(s));
        }
    }
}
