//! Quota policy: decides, from a usage record alone, whether one more
//! analysis may start. Pure and side-effect free; callers own the storage.

use crate::models::{QuotaLimit, UsageRecord};

/// Outcome of a quota check
#[derive(Debug, Clone, Copy)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub limit: QuotaLimit,
}

/// Whether the user behind `record` may start another analysis
///
/// Callers use this two ways: as a cheap advisory pre-check before paying
/// for the upstream call, and inside the store's write transaction as the
/// authoritative check that actually gates the increment.
pub fn can_proceed(record: &UsageRecord) -> QuotaDecision {
    let limit = record.tier.limit();
    QuotaDecision {
        allowed: limit.allows(record.analyses_used),
        limit,
    }
}
