//! Export/import (spec §6). Export is a point-in-time JSON snapshot of a
//! tenant's concepts, messages, attention links, and compounds. Import is
//! idempotent: concepts dedup by case-insensitive name, edges dedup by
//! unordered pair — matching `storage::upsert_entity`/`get_link`.

use serde::{Deserialize, Serialize};

use crate::entities::{AttentionLink, CompoundConcept, Entity, LinkType, Message};
use crate::error::Result;
use crate::storage::Storage;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub tenant_id: String,
    pub exported_at: chrono::DateTime<chrono::Utc>,
    pub schema_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub metadata: ExportMetadata,
    pub concepts: Vec<Entity>,
    pub sessions: Vec<Message>,
    pub edges: Vec<AttentionLink>,
    pub compounds: Vec<CompoundConcept>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub concepts_imported: usize,
    pub concepts_skipped: usize,
    pub edges_imported: usize,
    pub edges_skipped: usize,
    pub sessions_imported: usize,
    pub compounds_imported: usize,
}

/// Snapshots every row belonging to `tenant_id`.
pub fn export_tenant(storage: &Storage, tenant_id: &str) -> Result<ExportBundle> {
    Ok(ExportBundle {
        metadata: ExportMetadata { tenant_id: tenant_id.to_string(), exported_at: chrono::Utc::now(), schema_version: SCHEMA_VERSION },
        concepts: storage.list_entities(tenant_id, None, i64::MAX, 0)?,
        sessions: storage.list_messages(tenant_id, i64::MAX)?,
        edges: storage.list_all_links(tenant_id)?,
        compounds: storage.list_compounds(tenant_id, i64::MAX)?,
    })
}

/// Replays a bundle into `tenant_id`. Concepts dedup by case-insensitive
/// name (via `upsert_entity`); edges dedup by unordered pair (via
/// `get_link`). Sessions and compounds are always replayed.
pub fn import_tenant(storage: &Storage, tenant_id: &str, bundle: &ExportBundle) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for concept in &bundle.concepts {
        let existed = storage.get_entity(tenant_id, &concept.name)?.is_some();
        storage.upsert_entity(tenant_id, &concept.name, concept.entity_type, concept.description.as_deref())?;
        if existed {
            summary.concepts_skipped += 1;
        } else {
            summary.concepts_imported += 1;
        }
    }

    for edge in &bundle.edges {
        if storage.get_link(tenant_id, &edge.concept_a, &edge.concept_b)?.is_some() {
            summary.edges_skipped += 1;
            continue;
        }
        storage.insert_link(tenant_id, &edge.concept_a, &edge.concept_b, edge.link_type, edge.strength)?;
        summary.edges_imported += 1;
    }

    for message in &bundle.sessions {
        storage.insert_message(
            tenant_id,
            &message.user_message,
            &message.ai_response,
            &message.session_id,
            &message.metadata,
            message.thinking.as_deref(),
        )?;
        summary.sessions_imported += 1;
    }

    for compound in &bundle.compounds {
        storage.upsert_compound(tenant_id, &compound.compound_name, &compound.component_concepts)?;
        summary.compounds_imported += 1;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn export_then_import_is_idempotent_for_concepts_and_edges() {
        let storage = Storage::open_in_memory(&Config::default()).unwrap();
        storage.upsert_entity("t1", "Rust", crate::entities::EntityType::Concept, None).unwrap();
        storage.upsert_entity("t1", "Cargo", crate::entities::EntityType::Concept, None).unwrap();
        storage.insert_link("t1", "Rust", "Cargo", LinkType::CoOccurrence, 0.5).unwrap();
        storage.insert_message("t1", "hi", "hello", "s1", &serde_json::json!({}), None).unwrap();

        let bundle = export_tenant(&storage, "t1").unwrap();
        assert_eq!(bundle.concepts.len(), 2);
        assert_eq!(bundle.edges.len(), 1);

        let target = Storage::open_in_memory(&Config::default()).unwrap();
        let first = import_tenant(&target, "t1", &bundle).unwrap();
        assert_eq!(first.concepts_imported, 2);
        assert_eq!(first.edges_imported, 1);

        let second = import_tenant(&target, "t1", &bundle).unwrap();
        assert_eq!(second.concepts_imported, 0);
        assert_eq!(second.concepts_skipped, 2);
        assert_eq!(second.edges_imported, 0);
        assert_eq!(second.edges_skipped, 1);
    }
}
