pub mod tables;
pub mod usage;

use redb::{Database, Error as RedbError};
use std::path::Path;
use std::sync::Arc;

/// Database handle type (Arc-wrapped for sharing across handlers)
pub type Db = Arc<Database>;

/// Open or create the redb database at the given path
///
/// Creates all required tables on first run.
#[allow(clippy::result_large_err)]
pub fn open_database(path: impl AsRef<Path>) -> Result<Db, RedbError> {
    tracing::info!("Opening usage store at: {:?}", path.as_ref());

    // Create parent directory if it doesn't exist
    if let Some(parent) = path.as_ref().parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                tracing::error!("Failed to create database directory: {}", e);
                RedbError::Io(e)
            })?;
        }
    }

    let db = Database::create(path)?;

    // Opening the table inside a committed txn creates it on first run,
    // so later read transactions never see a missing table.
    let write_txn = db.begin_write()?;
    {
        let _ = write_txn.open_table(tables::USAGE)?;
    }
    write_txn.commit()?;

    tracing::info!("Usage store ready");

    Ok(Arc::new(db))
}
