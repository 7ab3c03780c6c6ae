//! PostgreSQL client implementation
//!
//! Owns the connection pool and applies the statement timeout to every query.

use crate::config::schema::PostgreSQLConfig;
use crate::domain::{PipelineError, Result};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use postgres_native_tls::MakeTlsConnector;
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::config::SslMode;
use tokio_postgres::{NoTls, Row};

/// Pooled PostgreSQL client
pub struct PostgreSQLClient {
    pool: Pool,
    config: PostgreSQLConfig,
}

fn manager_config() -> ManagerConfig {
    ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    }
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// The pool connects lazily; use [`PostgreSQLClient::test_connection`] to
    /// verify connectivity up front.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] for an unparseable connection
    /// string or TLS setup failure, and [`PipelineError::Storage`] if the pool
    /// cannot be built.
    pub async fn new(config: PostgreSQLConfig) -> Result<Self> {
        let mut pg_config: tokio_postgres::Config =
            config.connection_string.expose_secret().parse().map_err(|e| {
                PipelineError::Configuration(format!(
                    "Invalid PostgreSQL connection string: {}",
                    e
                ))
            })?;

        let manager = match config.ssl_mode.as_str() {
            "disable" => {
                pg_config.ssl_mode(SslMode::Disable);
                Manager::from_config(pg_config, NoTls, manager_config())
            }
            mode => {
                pg_config.ssl_mode(if mode == "require" {
                    SslMode::Require
                } else {
                    SslMode::Prefer
                });
                let connector = native_tls::TlsConnector::builder().build().map_err(|e| {
                    PipelineError::Configuration(format!("Failed to build TLS connector: {}", e))
                })?;
                Manager::from_config(pg_config, MakeTlsConnector::new(connector), manager_config())
            }
        };

        let timeout = Some(Duration::from_secs(config.connection_timeout_seconds));
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .wait_timeout(timeout)
            .create_timeout(timeout)
            .recycle_timeout(timeout)
            .build()
            .map_err(|e| {
                PipelineError::Storage(format!("Failed to create connection pool: {}", e))
            })?;

        Ok(Self { pool, config })
    }

    /// Get a connection and run `SELECT 1`
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;

        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| PipelineError::Storage(format!("Connection test failed: {}", e)))?;

        tracing::info!(target_db = %self.connection_string_safe(), "PostgreSQL connection test successful");
        Ok(())
    }

    /// Get a connection from the pool
    pub async fn get_connection(&self) -> Result<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            PipelineError::Storage(format!("Failed to get connection from pool: {}", e))
        })
    }

    async fn timed_connection(&self) -> Result<deadpool_postgres::Object> {
        let client = self.get_connection().await?;
        let timeout_query = format!(
            "SET statement_timeout = {}",
            self.config.statement_timeout_seconds * 1000
        );
        client.execute(&timeout_query, &[]).await.map_err(|e| {
            PipelineError::Storage(format!("Failed to set statement timeout: {}", e))
        })?;
        Ok(client)
    }

    /// Run several statements in one round trip
    pub async fn batch_execute(&self, sql: &str) -> Result<()> {
        let client = self.timed_connection().await?;
        client
            .batch_execute(sql)
            .await
            .map_err(|e| PipelineError::Storage(format!("Batch execution failed: {}", e)))
    }

    /// Execute a query and return rows
    pub async fn query(
        &self,
        query: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<Row>> {
        let client = self.timed_connection().await?;
        client
            .query(query, params)
            .await
            .map_err(|e| PipelineError::Storage(format!("Query failed: {}", e)))
    }

    /// Execute a statement and return the number of affected rows
    pub async fn execute(
        &self,
        statement: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<u64> {
        let client = self.timed_connection().await?;
        client
            .execute(statement, params)
            .await
            .map_err(|e| PipelineError::Storage(format!("Statement execution failed: {}", e)))
    }

    /// Connection target with credentials removed
    pub fn connection_string_safe(&self) -> String {
        redact_connection_string(self.config.connection_string.expose_secret().as_ref())
    }

    /// Get the pool statistics
    pub fn pool_status(&self) -> deadpool_postgres::Status {
        self.pool.status()
    }
}

/// Replace everything before the host with `***`
pub fn redact_connection_string(connection_string: &str) -> String {
    match connection_string.rsplit_once('@') {
        Some((_, host)) => format!("postgresql://***@{}", host),
        None => connection_string.to_string(),
    }
}
