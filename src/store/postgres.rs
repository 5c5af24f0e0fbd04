use std::time::Duration;

use tokio::time::{sleep, timeout};
use tokio_postgres::{Client, NoTls};
use tracing::{error, info, warn};

use super::{ErrorCategory, KnowledgeStore, QueryFailure, RowSet, quote_ident};
use crate::{
    config::{DatabaseConfig, RetryConfig},
    error::{
        AppResult, connectivity_error, describe, store_error, timeout_error, unknown_table_error
    },
    schema::{ColumnSchema, TableSchema}
};

/// Extra time granted to the client-side timer over `statement_timeout`
const TIMER_GRACE: Duration = Duration::from_secs(2);

/// PostgreSQL-backed knowledge base.
///
/// Every query runs in its own `READ ONLY` transaction with a local
/// `statement_timeout`, and through the extended protocol, which rejects
/// multi-statement strings.
pub struct PostgresStore {
    client:            Client,
    schema:            String,
    sample_rows:       usize,
    statement_timeout: Duration
}

impl PostgresStore {
    /// Open one connection; the connection task is spawned on the runtime
    pub async fn connect(config: &DatabaseConfig, sample_rows: usize) -> AppResult<Self> {
        let pg = config.pg_config()?;
        let secs = config.connect_timeout_secs;
        let (client, connection) = timeout(Duration::from_secs(secs), pg.connect(NoTls))
            .await
            .map_err(|_| timeout_error("Database connect", secs))?
            .map_err(|e| connectivity_error("Database", e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "database connection closed");
            }
        });
        info!(db = %config.display_target(), "connected to knowledge base");
        Ok(Self {
            client,
            schema: config.schema.clone(),
            sample_rows,
            statement_timeout: Duration::from_secs(config.statement_timeout_secs)
        })
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    /// End the per-query transaction; a no-op warning when none is open
    async fn rollback(&self) {
        if let Err(e) = self.client.batch_execute("ROLLBACK").await {
            warn!(error = %e, "rollback after query failed");
        }
    }
}

/// Connect, retrying transient failures with the same backoff as LLM calls
pub async fn connect_with_retry(
    config: &DatabaseConfig,
    retry: &RetryConfig,
    sample_rows: usize
) -> AppResult<PostgresStore> {
    config.validate()?;
    let mut delay = retry.initial_delay_ms;
    let mut attempt = 0;
    loop {
        match PostgresStore::connect(config, sample_rows).await {
            Ok(store) => return Ok(store),
            Err(e) if attempt < retry.max_retries => {
                attempt += 1;
                warn!(
                    error = %describe(&e),
                    attempt = attempt + 1,
                    max = retry.max_retries + 1,
                    delay_ms = delay,
                    "retrying database connect"
                );
                sleep(Duration::from_millis(delay)).await;
                delay = ((delay as f64 * retry.backoff_factor) as u64).min(retry.max_delay_ms);
            }
            Err(e) => return Err(e)
        }
    }
}

impl KnowledgeStore for PostgresStore {
    async fn list_tables(&self) -> AppResult<Vec<String>> {
        let rows = self
            .client
            .query(
                r#"
                SELECT table_name::text AS name
                FROM information_schema.tables
                WHERE table_schema = $1
                  AND table_type IN ('BASE TABLE', 'VIEW')
                ORDER BY table_name
                "#,
                &[&self.schema]
            )
            .await
            .map_err(store_error)?;
        Ok(rows.iter().map(|row| row.get("name")).collect())
    }

    async fn describe_table(&self, table: &str) -> AppResult<TableSchema> {
        let rows = self
            .client
            .query(
                r#"
                SELECT
                    column_name::text AS name,
                    data_type::text AS data_type,
                    is_nullable = 'YES' AS is_nullable
                FROM information_schema.columns
                WHERE table_schema = $1 AND table_name = $2
                ORDER BY ordinal_position
                "#,
                &[&self.schema, &table]
            )
            .await
            .map_err(store_error)?;
        if rows.is_empty() {
            return Err(unknown_table_error(table));
        }
        let columns = rows
            .iter()
            .map(|row| ColumnSchema {
                name:        row.get("name"),
                data_type:   row.get("data_type"),
                is_nullable: row.get("is_nullable")
            })
            .collect();

        let sample = if self.sample_rows == 0 {
            RowSet::default()
        } else {
            let sql = format!(
                "SELECT * FROM {}.{} LIMIT {}",
                quote_ident(&self.schema),
                quote_ident(table),
                self.sample_rows
            );
            match self.client.query(sql.as_str(), &[]).await {
                Ok(rows) => RowSet::from_rows(&rows),
                Err(e) => {
                    warn!(table, error = %e, "could not read sample rows");
                    RowSet::default()
                }
            }
        };

        Ok(TableSchema {
            name: table.to_string(),
            columns,
            sample
        })
    }

    async fn run(&self, sql: &str) -> Result<RowSet, QueryFailure> {
        let millis = self.statement_timeout.as_millis();
        let begin = self
            .client
            .batch_execute(&format!(
                "BEGIN READ ONLY; SET LOCAL statement_timeout = {}",
                millis
            ))
            .await;
        if let Err(e) = begin {
            self.rollback().await;
            return Err(QueryFailure::from_pg_error(&e));
        }

        let outcome = timeout(
            self.statement_timeout + TIMER_GRACE,
            self.client.query(sql, &[])
        )
        .await;

        self.rollback().await;

        match outcome {
            Ok(Ok(rows)) => Ok(RowSet::from_rows(&rows)),
            Ok(Err(e)) => Err(QueryFailure::from_pg_error(&e)),
            Err(_) => Err(QueryFailure::other(
                ErrorCategory::Timeout,
                format!("statement exceeded {}ms", millis)
            ))
        }
    }
}
