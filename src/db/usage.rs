//! Usage store operations.
//!
//! All read-then-write sequences against a user's record run inside a single
//! redb write transaction, which serializes writers and keeps the record
//! consistent under concurrent requests. These functions block; handlers
//! call them through `tokio::task::spawn_blocking`.

use chrono::Utc;
use redb::{Database, ReadableTable};

use crate::db::tables;
use crate::error::{AppError, Result};
use crate::models::{Tier, UsageRecord};
use crate::quota;

/// Load a user's usage record, creating the default one on first touch
///
/// New users start on the free tier with zero analyses used. The presence
/// check repeats inside the write transaction so two racing first requests
/// converge on a single record.
pub fn read_or_create(db: &Database, user_id: &str) -> Result<UsageRecord> {
    // Fast path: existing record under a read transaction (MVCC, never
    // blocks behind writers)
    {
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(tables::USAGE)?;
        if let Some(bytes) = table.get(user_id)? {
            return Ok(bincode::deserialize(bytes.value())?);
        }
    }

    let write_txn = db.begin_write()?;
    let record = {
        let mut table = write_txn.open_table(tables::USAGE)?;

        let existing: Option<UsageRecord> = match table.get(user_id)? {
            Some(bytes) => Some(bincode::deserialize(bytes.value())?),
            None => None,
        };

        match existing {
            Some(record) => record,
            None => {
                let record = UsageRecord::new(Utc::now().timestamp());
                let bytes = bincode::serialize(&record)?;
                table.insert(user_id, bytes.as_slice())?;
                tracing::info!("Created usage record for user {}", user_id);
                record
            }
        }
    };
    write_txn.commit()?;

    Ok(record)
}

/// Atomically consume one analysis credit
///
/// The quota is re-evaluated inside the write transaction, so of two racing
/// requests exactly one increments and the other gets `QuotaExceeded` with
/// the winner's count. This is the authoritative check; any earlier
/// pre-check is advisory only.
pub fn try_increment(db: &Database, user_id: &str) -> Result<UsageRecord> {
    let write_txn = db.begin_write()?;
    let record = {
        let mut table = write_txn.open_table(tables::USAGE)?;

        let mut record = match table.get(user_id)? {
            Some(bytes) => bincode::deserialize(bytes.value())?,
            None => UsageRecord::new(Utc::now().timestamp()),
        };

        let decision = quota::can_proceed(&record);
        if !decision.allowed {
            tracing::warn!(
                "Quota exhausted for user {}: {} used on {:?} tier",
                user_id,
                record.analyses_used,
                record.tier
            );
            // Dropping the uncommitted transaction aborts it
            return Err(AppError::QuotaExceeded {
                user_id: user_id.to_string(),
                record,
            });
        }

        record.analyses_used += 1;
        let bytes = bincode::serialize(&record)?;
        table.insert(user_id, bytes.as_slice())?;
        record
    };
    write_txn.commit()?;

    Ok(record)
}

/// Switch a user's tier, leaving the usage counter untouched
///
/// Idempotent: re-applying the current tier rewrites the same record.
pub fn set_tier(db: &Database, user_id: &str, tier: Tier) -> Result<UsageRecord> {
    let write_txn = db.begin_write()?;
    let record = {
        let mut table = write_txn.open_table(tables::USAGE)?;

        let mut record = match table.get(user_id)? {
            Some(bytes) => bincode::deserialize(bytes.value())?,
            None => UsageRecord::new(Utc::now().timestamp()),
        };

        record.tier = tier;
        let bytes = bincode::serialize(&record)?;
        table.insert(user_id, bytes.as_slice())?;
        record
    };
    write_txn.commit()?;

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_database;
    use tempfile::TempDir;

    fn test_db(temp_dir: &TempDir) -> crate::db::Db {
        open_database(temp_dir.path().join("test.db")).expect("Failed to create test database")
    }

    #[test]
    fn test_read_or_create_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let db = test_db(&temp_dir);

        let record = read_or_create(&db, "user_1").unwrap();

        assert_eq!(record.tier, Tier::Free);
        assert_eq!(record.analyses_used, 0);
        assert!(record.created_at > 0);
    }

    #[test]
    fn test_read_or_create_is_stable() {
        let temp_dir = TempDir::new().unwrap();
        let db = test_db(&temp_dir);

        let first = read_or_create(&db, "user_1").unwrap();
        let second = read_or_create(&db, "user_1").unwrap();

        assert_eq!(first.tier, second.tier);
        assert_eq!(first.analyses_used, second.analyses_used);
        assert_eq!(first.created_at, second.created_at);
    }

    #[test]
    fn test_try_increment_free_tier() {
        let temp_dir = TempDir::new().unwrap();
        let db = test_db(&temp_dir);

        // First analysis consumes the free allowance
        let record = try_increment(&db, "user_1").unwrap();
        assert_eq!(record.analyses_used, 1);

        // Second attempt is rejected, counter untouched
        let err = try_increment(&db, "user_1").unwrap_err();
        match err {
            AppError::QuotaExceeded { user_id, record } => {
                assert_eq!(user_id, "user_1");
                assert_eq!(record.analyses_used, 1);
            }
            other => panic!("expected QuotaExceeded, got {:?}", other),
        }

        let record = read_or_create(&db, "user_1").unwrap();
        assert_eq!(record.analyses_used, 1);
    }

    #[test]
    fn test_try_increment_premium() {
        let temp_dir = TempDir::new().unwrap();
        let db = test_db(&temp_dir);

        set_tier(&db, "user_1", Tier::Premium).unwrap();

        for expected in 1..=5 {
            let record = try_increment(&db, "user_1").unwrap();
            assert_eq!(record.analyses_used, expected);
        }
    }

    #[test]
    fn test_try_increment_creates_record() {
        let temp_dir = TempDir::new().unwrap();
        let db = test_db(&temp_dir);

        // No prior read_or_create: the increment itself lazily creates
        let record = try_increment(&db, "user_1").unwrap();

        assert_eq!(record.tier, Tier::Free);
        assert_eq!(record.analyses_used, 1);
    }

    #[test]
    fn test_set_tier_preserves_counter() {
        let temp_dir = TempDir::new().unwrap();
        let db = test_db(&temp_dir);

        set_tier(&db, "user_1", Tier::Premium).unwrap();
        for _ in 0..7 {
            try_increment(&db, "user_1").unwrap();
        }

        // Downgrading keeps the count, so the free limit denies immediately
        let record = set_tier(&db, "user_1", Tier::Free).unwrap();
        assert_eq!(record.tier, Tier::Free);
        assert_eq!(record.analyses_used, 7);

        assert!(matches!(
            try_increment(&db, "user_1"),
            Err(AppError::QuotaExceeded { .. })
        ));

        let record = read_or_create(&db, "user_1").unwrap();
        assert_eq!(record.analyses_used, 7);
    }

    #[test]
    fn test_set_tier_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let db = test_db(&temp_dir);

        try_increment(&db, "user_1").unwrap();

        let first = set_tier(&db, "user_1", Tier::Premium).unwrap();
        let second = set_tier(&db, "user_1", Tier::Premium).unwrap();

        assert_eq!(first.tier, Tier::Premium);
        assert_eq!(second.tier, Tier::Premium);
        assert_eq!(first.analyses_used, 1);
        assert_eq!(second.analyses_used, 1);
    }
}
