//! Federation contribution enforcer (spec §4.8). Gates whether a tenant's
//! memories are mirrored to a shared substrate and, if so, at what
//! anonymization level. No networking lives here — this is the policy
//! decision a sync worker consults before it ships anything.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Subscription tier. Drives both contribution policy and anonymization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FederationTier {
    Free,
    Pro,
    Enterprise,
}

/// How aggressively `anonymize_memory` strips identifying data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnonymizationLevel {
    None,
    Standard,
    Aggressive,
}

impl FederationTier {
    /// Whether this tier may opt out of contributing.
    pub fn can_opt_out(&self) -> bool {
        !matches!(self, FederationTier::Free)
    }

    pub fn anonymization_level(&self) -> AnonymizationLevel {
        match self {
            FederationTier::Free => AnonymizationLevel::Aggressive,
            FederationTier::Pro => AnonymizationLevel::Standard,
            FederationTier::Enterprise => AnonymizationLevel::None,
        }
    }
}

/// A memory as seen by the federation layer — the subset of fields
/// `anonymize_memory` knows how to strip or hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedMemory {
    pub concept: String,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub entities: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    /// Present only after `AnonymizationLevel::Aggressive` runs.
    pub time_context: Option<TimeContext>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeContext {
    pub hour: u32,
    pub day_of_week: u32,
}

/// Whether `tenant_id` at `tier` may contribute, and why not if it can't.
pub fn check_contribution_allowed(tier: FederationTier, opt_out_requested: bool) -> (bool, Option<String>) {
    if tier == FederationTier::Free && opt_out_requested {
        return (false, Some("upgrade required to opt out of federation contribution".to_string()));
    }
    (true, None)
}

/// Applies `tier`'s anonymization level to `memory`, returning a new value.
pub fn anonymize_memory(memory: &FederatedMemory, tier: FederationTier) -> FederatedMemory {
    match tier.anonymization_level() {
        AnonymizationLevel::None => memory.clone(),
        AnonymizationLevel::Standard => FederatedMemory {
            concept: memory.concept.clone(),
            tenant_id: None,
            user_id: None,
            session_id: memory.session_id.clone(),
            entities: memory.entities.iter().map(|e| format!("hash_{}", short_hash(e))).collect(),
            created_at: memory.created_at.map(|dt| dt.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc()),
            time_context: None,
        },
        AnonymizationLevel::Aggressive => FederatedMemory {
            concept: truncate_with_ellipsis(&memory.concept, 100),
            tenant_id: None,
            user_id: None,
            session_id: None,
            entities: memory.entities.iter().map(|e| full_sha256(e)).collect(),
            created_at: None,
            time_context: memory.created_at.map(|dt| TimeContext {
                hour: dt.hour(),
                day_of_week: dt.weekday().num_days_from_monday(),
            }),
        },
    }
}

/// Combines `check_contribution_allowed` and `anonymize_memory`'s policy
/// selection into the metadata a sync worker logs alongside the decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionDecision {
    pub allowed: bool,
    pub error: Option<String>,
    pub policy: &'static str,
    pub contribution_required: bool,
    pub anonymization_level: AnonymizationLevel,
    pub action_required: Option<String>,
}

pub fn enforce_contribution(tier: FederationTier, opt_out_requested: bool) -> ContributionDecision {
    let (allowed, error) = check_contribution_allowed(tier, opt_out_requested);
    let policy = if tier.can_opt_out() { "optional" } else { "mandatory" };
    ContributionDecision {
        allowed,
        action_required: error.clone(),
        error,
        policy,
        contribution_required: !tier.can_opt_out(),
        anonymization_level: tier.anonymization_level(),
    }
}

/// Running contribution/consumption ledger for a tenant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionStats {
    pub contributed: u64,
    pub consumed: u64,
    pub ratio: f64,
    pub last_contribution: Option<DateTime<Utc>>,
}

/// Folds a new contribution/consumption observation into `stats`.
pub fn track_contribution(stats: &mut ContributionStats, contributed: u64, consumed: u64) {
    stats.contributed += contributed;
    stats.consumed += consumed;
    stats.ratio = if stats.consumed == 0 { 0.0 } else { stats.contributed as f64 / stats.consumed as f64 };
    if contributed > 0 {
        stats.last_contribution = Some(Utc::now());
    }
}

fn short_hash(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    digest.iter().take(4).map(|b| format!("{b:02x}")).collect()
}

fn full_sha256(value: &str) -> String {
    Sha256::digest(value.as_bytes()).iter().map(|b| format!("{b:02x}")).collect()
}

fn truncate_with_ellipsis(value: &str, max_len: usize) -> String {
    if value.chars().count() <= max_len {
        value.to_string()
    } else {
        let truncated: String = value.chars().take(max_len).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_tier_cannot_opt_out() {
        let (allowed, reason) = check_contribution_allowed(FederationTier::Free, true);
        assert!(!allowed);
        assert!(reason.unwrap().contains("upgrade"));
    }

    #[test]
    fn pro_tier_can_opt_out() {
        let (allowed, reason) = check_contribution_allowed(FederationTier::Pro, true);
        assert!(allowed);
        assert!(reason.is_none());
    }

    #[test]
    fn enterprise_anonymization_is_identity() {
        let memory = FederatedMemory {
            concept: "X".repeat(200),
            tenant_id: Some("t".to_string()),
            user_id: Some("u".to_string()),
            session_id: Some("s".to_string()),
            entities: vec!["a".to_string(), "b".to_string()],
            created_at: Some(Utc::now()),
            time_context: None,
        };
        let anonymized = anonymize_memory(&memory, FederationTier::Enterprise);
        assert_eq!(anonymized.tenant_id, memory.tenant_id);
        assert_eq!(anonymized.concept, memory.concept);
    }

    #[test]
    fn free_anonymization_strips_identifiers_and_hashes_entities() {
        let created_at = DateTime::parse_from_rfc3339("2025-12-16T14:30:00Z").unwrap().with_timezone(&Utc);
        let memory = FederatedMemory {
            concept: "X".repeat(200),
            tenant_id: Some("t".to_string()),
            user_id: Some("u".to_string()),
            session_id: Some("s".to_string()),
            entities: vec!["a".to_string(), "b".to_string()],
            created_at: Some(created_at),
            time_context: None,
        };
        let anonymized = anonymize_memory(&memory, FederationTier::Free);
        assert!(anonymized.tenant_id.is_none());
        assert!(anonymized.user_id.is_none());
        assert!(anonymized.session_id.is_none());
        assert!(anonymized.created_at.is_none());
        assert_eq!(anonymized.entities[0].len(), 64);
        assert_eq!(anonymized.concept.chars().count(), 103);
        assert!(anonymized.concept.ends_with("..."));
        let tc = anonymized.time_context.unwrap();
        assert_eq!(tc.hour, 14);
        assert_eq!(tc.day_of_week, 1);
    }

    #[test]
    fn track_contribution_computes_ratio() {
        let mut stats = ContributionStats::default();
        track_contribution(&mut stats, 10, 5);
        assert_eq!(stats.ratio, 2.0);
    }

    #[test]
    fn track_contribution_ratio_is_zero_when_nothing_consumed() {
        let mut stats = ContributionStats::default();
        track_contribution(&mut stats, 3, 0);
        assert_eq!(stats.ratio, 0.0);
    }
}
