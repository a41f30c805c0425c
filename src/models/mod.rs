pub mod usage;

pub use usage::{QuotaLimit, Tier, UsageRecord, UsageResponse};
