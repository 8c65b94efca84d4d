//! Store initializers.
//!
//! - [`redb`]: creates or verifies the embedded `redb` database file

pub mod redb;

pub use self::redb::{RedbStoreInitializer, SCHEMA_VERSION};
