//! Throwaway stores for tests.
//!
//! Each call gets a fresh schema in the database named by
//! `TALLY_TEST_DATABASE_URL`, so tests never see each other's rows. When the
//! variable is unset the helpers return `None` and callers skip.
//!
//! ```bash
//! TALLY_TEST_DATABASE_URL=postgres://postgres@localhost:5432/tally_test cargo test
//! ```

use uuid::Uuid;

use crate::{Database, DbConfig};

/// Environment variable naming the Postgres database tests may write to.
pub const TEST_DATABASE_URL_ENV: &str = "TALLY_TEST_DATABASE_URL";

/// Config for a new, uniquely named schema, or `None` without a test database.
pub fn isolated_config() -> Option<DbConfig> {
    let Ok(url) = std::env::var(TEST_DATABASE_URL_ENV) else {
        eprintln!("{TEST_DATABASE_URL_ENV} not set; skipping database test");
        return None;
    };

    let schema = format!("tally_test_{}", Uuid::new_v4().simple());
    Some(DbConfig::new(url).schema(schema).max_connections(8))
}

/// A migrated store in its own schema.
pub async fn database() -> Option<Database> {
    let config = isolated_config()?;
    Some(
        Database::new(config)
            .await
            .expect("failed to create test database"),
    )
}
