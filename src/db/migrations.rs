//! Database migrations
//!
//! Code-based migrations embedded in the binary for single-binary
//! deployment. Each migration has a unique, sequential version; applied
//! versions are recorded in the `_migrations` table and skipped on later
//! runs.

use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements to apply
    pub up: &'static str,
}

/// All migrations for the Fundtrack service.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up: r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                is_verified INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
        "#,
    },
    Migration {
        version: 2,
        name: "create_investments",
        // UNIQUE(user_id, scheme_code): at most one open position per user
        // per scheme, enforced here rather than by lookup-before-insert so
        // concurrent duplicate creations cannot race past each other.
        up: r#"
            CREATE TABLE IF NOT EXISTS investments (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                scheme_code BIGINT NOT NULL,
                scheme_name VARCHAR(255) NOT NULL,
                fund_family VARCHAR(255) NOT NULL,
                units DOUBLE NOT NULL,
                nav DOUBLE NOT NULL,
                nav_date VARCHAR(32) NOT NULL,
                current_value DOUBLE NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, scheme_code)
            );
            CREATE INDEX IF NOT EXISTS idx_investments_user ON investments(user_id);
        "#,
    },
];

/// Run all pending migrations against the pool.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create migrations table")?;

    for migration in MIGRATIONS {
        let applied = sqlx::query("SELECT version FROM _migrations WHERE version = ?")
            .bind(migration.version)
            .fetch_optional(pool)
            .await
            .context("Failed to query applied migrations")?
            .is_some();

        if applied {
            continue;
        }

        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );

        let mut tx = pool.begin().await.context("Failed to begin transaction")?;

        // SQLite executes one statement per query call; split on ';'
        for statement in migration
            .up
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .with_context(|| {
                    format!("Migration {} ({}) failed", migration.version, migration.name)
                })?;
        }

        sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .execute(&mut *tx)
            .await
            .context("Failed to record migration")?;

        tx.commit().await.context("Failed to commit migration")?;
    }

    Ok(())
}

/// Return the highest applied migration version, if any.
pub async fn current_version(pool: &SqlitePool) -> Result<Option<i64>> {
    let row = sqlx::query("SELECT MAX(version) AS version FROM _migrations")
        .fetch_one(pool)
        .await
        .context("Failed to read migration version")?;
    Ok(row.try_get::<Option<i64>, _>("version")?)
}
