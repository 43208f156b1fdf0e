//! Database handle: runs statements through a client with logging, timeouts
//! and error observers.

use crate::client::GenericClient;
use crate::error::{SqlError, SqlResult};
use crate::placeholder::Placeholder;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Callback receiving every execution error by reference.
pub type ErrorHandler = Arc<dyn Fn(&SqlError) + Send + Sync>;

/// Configuration for a [`Db`].
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Deadline for a single statement. `None` means no timeout (default).
    pub query_timeout: Option<Duration>,
    /// Longest SQL text written to the log; longer statements are cut.
    pub max_logged_sql_len: Option<usize>,
    /// Placeholder syntax override. `None` uses the client's own.
    pub placeholder: Option<Placeholder>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            query_timeout: None,
            max_logged_sql_len: Some(200),
            placeholder: None,
        }
    }
}

impl DbConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the query timeout.
    ///
    /// Statements running longer are cancelled on the server and return
    /// [`SqlError::Timeout`].
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn max_logged_sql_len(mut self, len: usize) -> Self {
        self.max_logged_sql_len = Some(len);
        self
    }

    /// Log SQL text in full.
    pub fn no_truncate(mut self) -> Self {
        self.max_logged_sql_len = None;
        self
    }

    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = Some(placeholder);
        self
    }
}

/// A client wrapped with [`DbConfig`] and error observers.
///
/// `Db` is itself a [`GenericClient`], so statement builders execute against
/// it exactly as they would against a bare client.
///
/// # Example
///
/// ```ignore
/// use sqlweave::{Db, DbConfig, qb::{self, SqlQb}};
/// use std::time::Duration;
///
/// let db = Db::with_config(client, DbConfig::new().with_query_timeout(Duration::from_secs(5)))
///     .on_error(|err| eprintln!("query failed: {err}"));
///
/// let total: i64 = qb::select_from("users").eq("active", true).get_count(&db).await?;
/// ```
pub struct Db<C> {
    pub(crate) client: C,
    pub(crate) config: DbConfig,
    pub(crate) handlers: Vec<ErrorHandler>,
}

impl<C> fmt::Debug for Db<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("config", &self.config)
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

impl<C: GenericClient> Db<C> {
    pub fn new(client: C) -> Self {
        Self::with_config(client, DbConfig::default())
    }

    pub fn with_config(client: C, config: DbConfig) -> Self {
        Self {
            client,
            config,
            handlers: Vec::new(),
        }
    }

    /// Register an error observer. Observers run in registration order and
    /// cannot change the error returned to the caller.
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&SqlError) + Send + Sync + 'static,
    {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    /// Run `future` under the configured deadline.
    async fn execute_with_timeout<T, F>(&self, future: F) -> SqlResult<T>
    where
        F: std::future::Future<Output = SqlResult<T>> + Send,
    {
        match self.config.query_timeout {
            Some(timeout) => {
                tokio::pin!(future);
                tokio::select! {
                    result = &mut future => result,
                    _ = tokio::time::sleep(timeout) => {
                        if let Some(cancel_token) = self.client.cancel_token() {
                            tokio::spawn(async move {
                                let _ = cancel_token.cancel_query(tokio_postgres::NoTls).await;
                            });
                        }
                        Err(SqlError::Timeout(timeout))
                    }
                }
            }
            None => future.await,
        }
    }

    /// Log the statement, run it, then report a failure to the observers.
    async fn run<T, F>(&self, sql: &str, param_count: usize, future: F) -> SqlResult<T>
    where
        F: std::future::Future<Output = SqlResult<T>> + Send,
    {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "sqlweave.sql",
            param_count,
            sql = %self.log_sql(sql),
            "executing statement"
        );

        let result = self.execute_with_timeout(future).await;
        if let Err(err) = &result {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                target: "sqlweave.sql",
                error = %err,
                param_count,
                sql = %self.log_sql(sql),
                "statement failed"
            );
            #[cfg(not(feature = "tracing"))]
            let _ = (sql, param_count);

            for handler in &self.handlers {
                handler(err);
            }
        }
        result
    }

    #[cfg(feature = "tracing")]
    fn log_sql<'s>(&self, sql: &'s str) -> std::borrow::Cow<'s, str> {
        match self.config.max_logged_sql_len {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)).into(),
            _ => sql.into(),
        }
    }
}

/// Cut `sql` to at most `max_bytes`, backing off to a char boundary.
#[cfg(any(feature = "tracing", test))]
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

impl<C: GenericClient> GenericClient for Db<C> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> SqlResult<Vec<Row>> {
        self.run(sql, params.len(), self.client.query(sql, params)).await
    }

    async fn query_one(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> SqlResult<Row> {
        self.run(sql, params.len(), self.client.query_one(sql, params)).await
    }

    async fn query_opt(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> SqlResult<Option<Row>> {
        self.run(sql, params.len(), self.client.query_opt(sql, params)).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> SqlResult<u64> {
        self.run(sql, params.len(), self.client.execute(sql, params)).await
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        self.client.cancel_token()
    }

    fn placeholder(&self) -> Placeholder {
        self.config
            .placeholder
            .unwrap_or_else(|| self.client.placeholder())
    }
}

/// Connect to PostgreSQL without TLS and drive the connection on a
/// background task.
///
/// # Example
///
/// ```ignore
/// let db = sqlweave::connect("postgres://postgres@localhost/app").await?;
/// ```
pub async fn connect(database_url: &str) -> SqlResult<Db<tokio_postgres::Client>> {
    connect_with_config(database_url, DbConfig::default()).await
}

/// [`connect`] with an explicit [`DbConfig`].
pub async fn connect_with_config(
    database_url: &str,
    config: DbConfig,
) -> SqlResult<Db<tokio_postgres::Client>> {
    let (client, connection) = tokio_postgres::connect(database_url, tokio_postgres::NoTls)
        .await
        .map_err(|e| SqlError::Connection(e.to_string()))?;

    tokio::spawn(async move {
        if let Err(_e) = connection.await {
            #[cfg(feature = "tracing")]
            tracing::error!(target: "sqlweave.sql", error = %_e, "connection closed with error");
        }
    });

    Ok(Db::with_config(client, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate_sql_bytes("SELECT 1", 100), "SELECT 1");
        assert_eq!(truncate_sql_bytes("SELECT 1", 6), "SELECT");
        // 'é' is two bytes; cutting inside it backs off.
        assert_eq!(truncate_sql_bytes("é", 1), "");
    }

    #[test]
    fn config_builder() {
        let config = DbConfig::new()
            .with_query_timeout(Duration::from_millis(250))
            .no_truncate()
            .with_placeholder(Placeholder::Question);
        assert_eq!(config.query_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.max_logged_sql_len, None);
        assert_eq!(config.placeholder, Some(Placeholder::Question));
        assert_eq!(DbConfig::default().max_logged_sql_len, Some(200));
    }
}
