//! Tier-driven rate limiting (spec §6: "per minute and per day; concurrent-
//! request cap. A 429 MUST carry `Retry-After`."). Plain fixed-window
//! counters — no external limiter crate is used anywhere in the example
//! pack, so this stays a small, dependency-free component like the
//! teacher's own in-process counters.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use continuum_core::FederationTier;
use dashmap::DashMap;

/// Per-tier request budget.
#[derive(Debug, Clone, Copy)]
pub struct TierPolicy {
    pub per_minute: u32,
    pub per_day: u32,
    pub concurrent: u32,
}

pub fn policy_for(tier: FederationTier) -> TierPolicy {
    match tier {
        FederationTier::Free => TierPolicy { per_minute: 20, per_day: 500, concurrent: 2 },
        FederationTier::Pro => TierPolicy { per_minute: 120, per_day: 20_000, concurrent: 10 },
        FederationTier::Enterprise => TierPolicy { per_minute: 1_000, per_day: 1_000_000, concurrent: 50 },
    }
}

struct Window {
    started_at: Instant,
    count: u32,
}

struct TenantUsage {
    minute: Mutex<Window>,
    day: Mutex<Window>,
    concurrent: Mutex<u32>,
}

impl TenantUsage {
    fn new(now: Instant) -> Self {
        Self {
            minute: Mutex::new(Window { started_at: now, count: 0 }),
            day: Mutex::new(Window { started_at: now, count: 0 }),
            concurrent: Mutex::new(0),
        }
    }
}

/// Outcome of a rate-limit check: either the caller may proceed (and must
/// call `release` when the request finishes) or it was rejected with a
/// `Retry-After` duration.
pub enum Admission {
    Allowed,
    Rejected(Duration),
}

pub struct RateLimiter {
    tenants: DashMap<String, TenantUsage>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self { tenants: DashMap::new() }
    }

    /// Checks and, if admitted, reserves one concurrent slot for `tenant_id`.
    /// Callers MUST call `release` exactly once after the request completes.
    pub fn admit(&self, tenant_id: &str, tier: FederationTier) -> Admission {
        let policy = policy_for(tier);
        let now = Instant::now();
        let usage = self.tenants.entry(tenant_id.to_string()).or_insert_with(|| TenantUsage::new(now));

        {
            let mut concurrent = usage.concurrent.lock().unwrap();
            if *concurrent >= policy.concurrent {
                return Admission::Rejected(Duration::from_secs(1));
            }
        }

        {
            let mut minute = usage.minute.lock().unwrap();
            if now.duration_since(minute.started_at) >= Duration::from_secs(60) {
                minute.started_at = now;
                minute.count = 0;
            }
            if minute.count >= policy.per_minute {
                let retry_after = Duration::from_secs(60) - now.duration_since(minute.started_at);
                return Admission::Rejected(retry_after);
            }
            minute.count += 1;
        }

        {
            let mut day = usage.day.lock().unwrap();
            if now.duration_since(day.started_at) >= Duration::from_secs(86_400) {
                day.started_at = now;
                day.count = 0;
            }
            if day.count >= policy.per_day {
                let retry_after = Duration::from_secs(86_400) - now.duration_since(day.started_at);
                return Admission::Rejected(retry_after);
            }
            day.count += 1;
        }

        *usage.concurrent.lock().unwrap() += 1;
        Admission::Allowed
    }

    /// Releases the concurrent slot reserved by a prior `Admission::Allowed`.
    pub fn release(&self, tenant_id: &str) {
        if let Some(usage) = self.tenants.get(tenant_id) {
            let mut concurrent = usage.concurrent.lock().unwrap();
            *concurrent = concurrent.saturating_sub(1);
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_tier_rejects_after_concurrent_cap() {
        let limiter = RateLimiter::new();
        for _ in 0..policy_for(FederationTier::Free).concurrent {
            assert!(matches!(limiter.admit("t1", FederationTier::Free), Admission::Allowed));
        }
        assert!(matches!(limiter.admit("t1", FederationTier::Free), Admission::Rejected(_)));
    }

    #[test]
    fn release_frees_a_concurrent_slot() {
        let limiter = RateLimiter::new();
        let cap = policy_for(FederationTier::Free).concurrent;
        for _ in 0..cap {
            limiter.admit("t1", FederationTier::Free);
        }
        limiter.release("t1");
        assert!(matches!(limiter.admit("t1", FederationTier::Free), Admission::Allowed));
    }

    #[test]
    fn different_tenants_have_independent_budgets() {
        let limiter = RateLimiter::new();
        let cap = policy_for(FederationTier::Free).concurrent;
        for _ in 0..cap {
            limiter.admit("t1", FederationTier::Free);
        }
        assert!(matches!(limiter.admit("t2", FederationTier::Free), Admission::Allowed));
    }
}
