use super::{validate_table_name, EventStore};
use crate::models::{Event, NewEvent, StoreError};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use sqlx::types::Json;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Postgres error codes raised when two processes run the same
/// `IF NOT EXISTS` DDL at once: `unique_violation`, `duplicate_table`,
/// `duplicate_object`.
const CONCURRENT_DDL_CODES: [&str; 3] = ["23505", "42P07", "42710"];

#[derive(Debug, Clone, PartialEq, Eq)]
struct Statements {
    create_table: String,
    create_index: String,
    insert: String,
    select_recent: String,
}

impl Statements {
    fn for_table(table: &str) -> Self {
        Self {
            create_table: format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id          BIGSERIAL PRIMARY KEY,
                    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
                    event_type  TEXT,
                    user_name   TEXT,
                    email       TEXT,
                    payload     JSONB,
                    ip          TEXT,
                    ua          TEXT,
                    path        TEXT
                )"
            ),
            create_index: format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_created_at ON {table} (created_at DESC, id DESC)"
            ),
            insert: format!(
                "INSERT INTO {table} (event_type, user_name, email, payload, ip, ua, path)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)"
            ),
            select_recent: format!(
                "SELECT id, created_at, event_type, user_name, email, payload, ip, ua, path
                 FROM {table}
                 ORDER BY created_at DESC, id DESC
                 LIMIT $1"
            ),
        }
    }
}

/// Event store backed by a single lazily opened Postgres connection.
#[derive(Debug)]
pub struct PgEventStore {
    pool: PgPool,
    table: String,
    statements: Statements,
    schema_ready: OnceCell<()>,
}

impl PgEventStore {
    /// Prepares the pool without connecting; the first query opens the connection.
    ///
    /// # Errors
    ///
    /// Invalid table name or unparsable connection string.
    #[tracing::instrument(skip(url))]
    pub fn connect_lazy(
        url: &SecretString,
        table: &str,
        acquire_timeout: Duration,
        require_tls: bool,
    ) -> Result<Self, StoreError> {
        let table = validate_table_name(table)?.to_owned();
        let url = url.expose_secret();
        let mut options = PgConnectOptions::from_str(url)?;
        if require_tls && !sets_ssl_mode(url) {
            options = options.ssl_mode(PgSslMode::Require);
        }
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(acquire_timeout)
            .connect_lazy_with(options);
        debug!(%table, "Prepared Postgres pool");

        Ok(Self::from_pool(pool, &table))
    }

    pub fn from_pool(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            table: table.to_owned(),
            statements: Statements::for_table(table),
            schema_ready: OnceCell::new(),
        }
    }

    async fn run_ddl(&self, sql: &str) -> Result<(), StoreError> {
        match sqlx::query(sql).execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(err) if is_concurrent_ddl(&err) => {
                warn!(table = %self.table, %err, "Schema was created concurrently");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// An explicit `sslmode` in the connection string wins over `require_tls`.
fn sets_ssl_mode(url: &str) -> bool {
    url::Url::parse(url).is_ok_and(|parsed| {
        parsed
            .query_pairs()
            .any(|(key, _)| key.eq_ignore_ascii_case("sslmode") || key.eq_ignore_ascii_case("ssl-mode"))
    })
}

fn is_concurrent_ddl(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| CONCURRENT_DDL_CODES.iter().any(|known| code == *known))
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.schema_ready
            .get_or_try_init(|| async {
                self.run_ddl(&self.statements.create_table).await?;
                self.run_ddl(&self.statements.create_index).await?;
                info!(table = %self.table, "Ensured event table");
                Ok::<_, StoreError>(())
            })
            .await?;
        Ok(())
    }

    async fn insert(&self, event: NewEvent) -> Result<(), StoreError> {
        sqlx::query(&self.statements.insert)
            .bind(event.event_type)
            .bind(event.user_name)
            .bind(event.email)
            .bind(event.payload.map(Json))
            .bind(event.ip)
            .bind(event.ua)
            .bind(event.path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn select_recent(&self, limit: i64) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query_as::<_, Event>(&self.statements.select_recent)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        debug!(count = rows.len(), limit, "Fetched recent events");
        Ok(rows)
    }

    async fn close(&self) {
        self.pool.close().await;
        info!(table = %self.table, "Closed Postgres pool");
    }
}
