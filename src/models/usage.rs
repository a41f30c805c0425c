use serde::{Deserialize, Serialize, Serializer};

use crate::constants::FREE_TIER_ANALYSES;

/// Subscription tier of a user
///
/// Stored as a tagged enum, never a boolean, so further tiers can be added
/// without touching existing records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Premium,
}

impl Tier {
    /// Analysis allowance for this tier
    pub fn limit(&self) -> QuotaLimit {
        match self {
            Tier::Free => QuotaLimit::Limited(FREE_TIER_ANALYSES),
            Tier::Premium => QuotaLimit::Unlimited,
        }
    }
}

/// Per-tier analysis allowance
///
/// `Unlimited` is its own variant rather than a large sentinel number, so
/// "no ceiling" can never be confused with a real limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaLimit {
    Limited(u32),
    Unlimited,
}

impl QuotaLimit {
    /// Whether a user with `used` consumed analyses may start another one
    pub fn allows(&self, used: u32) -> bool {
        match self {
            QuotaLimit::Limited(max) => used < *max,
            QuotaLimit::Unlimited => true,
        }
    }
}

/// On the wire the limit is the plain number for finite tiers and the
/// literal string "unlimited" for premium; clients branch on the JSON type.
impl Serialize for QuotaLimit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            QuotaLimit::Limited(max) => serializer.serialize_u32(*max),
            QuotaLimit::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

/// Usage record stored in redb, one per user, keyed by user id
/// Uses Unix timestamp for compact storage with bincode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Current subscription tier
    pub tier: Tier,
    /// Successful analyses performed so far (never reset by tier changes)
    pub analyses_used: u32,
    /// When the record was first created (Unix timestamp)
    pub created_at: i64,
}

impl UsageRecord {
    /// Default record for a user seen for the first time
    pub fn new(now: i64) -> Self {
        Self {
            tier: Tier::Free,
            analyses_used: 0,
            created_at: now,
        }
    }
}

/// Usage payload returned by every endpoint that touches the record
#[derive(Debug, Clone, Serialize)]
pub struct UsageResponse {
    pub user_id: String,
    pub tier: Tier,
    pub analyses_used: u32,
    pub limit: QuotaLimit,
}

impl UsageResponse {
    pub fn from_record(user_id: &str, record: &UsageRecord) -> Self {
        Self {
            user_id: user_id.to_string(),
            tier: record.tier,
            analyses_used: record.analyses_used,
            limit: record.tier.limit(),
        }
    }
}
