use redb::TableDefinition;

/// Usage table: user_id -> UsageRecord (serialized)
/// One row per user; created lazily on the user's first authenticated request
pub const USAGE: TableDefinition<&str, &[u8]> = TableDefinition::new("usage");
