//! Embedded `redb` store initializer.
//!
//! Opens (creating if needed) the database file and makes sure every table
//! the router reads exists, recording the schema version on first run. The
//! work runs on a blocking thread because `redb` is synchronous.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;

use crate::traits::{InitError, PlatformEnv, StoreInitializer};

/// Schema version written on creation and checked on every later start.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_VERSION_KEY: &str = "schema_version";

const META: TableDefinition<&str, u32> = TableDefinition::new("meta");

/// Data tables keyed by record id, values are serialized records.
const DATA_TABLES: [TableDefinition<&str, &[u8]>; 5] = [
    TableDefinition::new("users"),
    TableDefinition::new("devices"),
    TableDefinition::new("folders"),
    TableDefinition::new("ciphers"),
    TableDefinition::new("sends"),
];

enum SchemaCheck {
    Created,
    Verified,
    Mismatch(u32),
}

/// Creates or verifies the database at `path`. Idempotent.
#[derive(Debug, Clone)]
pub struct RedbStoreInitializer {
    path: PathBuf,
}

impl RedbStoreInitializer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StoreInitializer for RedbStoreInitializer {
    async fn initialize(&self, _env: &PlatformEnv) -> Result<(), InitError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || create_or_verify(&path))
            .await
            .map_err(|e| InitError::Other(e.into()))?
    }
}

fn create_or_verify(path: &Path) -> Result<(), InitError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    match ensure_tables(path)? {
        SchemaCheck::Created => {
            debug!(path = %path.display(), version = SCHEMA_VERSION, "Created store schema");
            Ok(())
        }
        SchemaCheck::Verified => {
            debug!(path = %path.display(), "Verified store schema");
            Ok(())
        }
        SchemaCheck::Mismatch(found) => Err(InitError::SchemaMismatch {
            found,
            expected: SCHEMA_VERSION,
        }),
    }
}

/// Opens every table in one write transaction, committing only when the
/// stored schema version is absent or current.
fn ensure_tables(path: &Path) -> Result<SchemaCheck, redb::Error> {
    let db = Database::create(path)?;
    let txn = db.begin_write()?;

    let check = {
        for table in DATA_TABLES {
            txn.open_table(table)?;
        }
        let mut meta = txn.open_table(META)?;
        let stored = meta.get(SCHEMA_VERSION_KEY)?.map(|v| v.value());
        match stored {
            None => {
                meta.insert(SCHEMA_VERSION_KEY, SCHEMA_VERSION)?;
                SchemaCheck::Created
            }
            Some(v) if v == SCHEMA_VERSION => SchemaCheck::Verified,
            Some(v) => SchemaCheck::Mismatch(v),
        }
    };

    if matches!(check, SchemaCheck::Mismatch(_)) {
        txn.abort()?;
    } else {
        txn.commit()?;
    }
    Ok(check)
}
