//! Transaction scopes.
//!
//! [`Db::transactional`] begins a transaction, hands the callback a
//! transaction-scoped [`Tx`], and commits when the callback returns `Ok`.
//! On `Err` the transaction is rolled back; if the rollback fails too, both
//! errors are returned together as [`SqlError::Rollback`]. A callback that
//! panics drops the transaction, which rolls it back on the server.
//!
//! # Example
//!
//! ```ignore
//! use sqlweave::{connect, qb::{self, MutationQb}, SqlResult};
//!
//! # async fn demo() -> SqlResult<()> {
//! let mut db = connect("postgres://...").await?;
//! db.transactional(async |tx| {
//!     qb::update("accounts").set("balance", qb::indirect("balance - 100")).eq("id", 1).execute(tx).await?;
//!     qb::update("accounts").set("balance", qb::indirect("balance + 100")).eq("id", 2).execute(tx).await?;
//!     Ok(())
//! })
//! .await?;
//! # Ok(()) }
//! ```

use crate::client::GenericClient;
use crate::db::Db;
use crate::error::{SqlError, SqlResult};
use crate::qb::{MutationQb, set_timeout};
use std::time::Duration;
use tokio_postgres::IsolationLevel;

/// A [`Db`] bound to an open transaction. Shares the parent's configuration
/// and error observers.
pub type Tx<'a> = Db<tokio_postgres::Transaction<'a>>;

/// Isolation level for a new transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionIsolation {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl From<TransactionIsolation> for IsolationLevel {
    fn from(level: TransactionIsolation) -> Self {
        match level {
            TransactionIsolation::ReadUncommitted => IsolationLevel::ReadUncommitted,
            TransactionIsolation::ReadCommitted => IsolationLevel::ReadCommitted,
            TransactionIsolation::RepeatableRead => IsolationLevel::RepeatableRead,
            TransactionIsolation::Serializable => IsolationLevel::Serializable,
        }
    }
}

/// Options applied when beginning a transaction. Unset fields keep the
/// server defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    pub isolation: Option<TransactionIsolation>,
    pub read_only: Option<bool>,
    pub deferrable: Option<bool>,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn isolation(mut self, level: TransactionIsolation) -> Self {
        self.isolation = Some(level);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = Some(read_only);
        self
    }

    /// Only meaningful for SERIALIZABLE read-only transactions.
    pub fn deferrable(mut self, deferrable: bool) -> Self {
        self.deferrable = Some(deferrable);
        self
    }
}

/// A client that can begin transactions.
pub trait TransactionSource: GenericClient {
    fn pg_client_mut(&mut self) -> &mut tokio_postgres::Client;
}

impl TransactionSource for tokio_postgres::Client {
    fn pg_client_mut(&mut self) -> &mut tokio_postgres::Client {
        self
    }
}

#[cfg(feature = "pool")]
impl TransactionSource for deadpool_postgres::Client {
    fn pg_client_mut(&mut self) -> &mut tokio_postgres::Client {
        &mut ***self
    }
}

impl<C: TransactionSource> Db<C> {
    /// Run `f` inside a transaction with the server's default options.
    pub async fn transactional<T, F>(&mut self, f: F) -> SqlResult<T>
    where
        F: AsyncFnOnce(&Tx<'_>) -> SqlResult<T>,
    {
        self.transactional_with(TransactionOptions::default(), f).await
    }

    /// Run `f` inside a transaction started with `options`.
    pub async fn transactional_with<T, F>(&mut self, options: TransactionOptions, f: F) -> SqlResult<T>
    where
        F: AsyncFnOnce(&Tx<'_>) -> SqlResult<T>,
    {
        let config = self.config.clone();
        let handlers = self.handlers.clone();

        let mut builder = self.client.pg_client_mut().build_transaction();
        if let Some(level) = options.isolation {
            builder = builder.isolation_level(level.into());
        }
        if let Some(read_only) = options.read_only {
            builder = builder.read_only(read_only);
        }
        if let Some(deferrable) = options.deferrable {
            builder = builder.deferrable(deferrable);
        }

        let transaction = builder
            .start()
            .await
            .map_err(|e| SqlError::Transaction(format!("begin failed: {e}")))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(target: "sqlweave.sql", ?options, "transaction started");

        let tx = Db {
            client: transaction,
            config,
            handlers,
        };

        match f(&tx).await {
            Ok(value) => {
                tx.client
                    .commit()
                    .await
                    .map_err(|e| SqlError::Transaction(format!("commit failed: {e}")))?;
                #[cfg(feature = "tracing")]
                tracing::debug!(target: "sqlweave.sql", "transaction committed");
                Ok(value)
            }
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(target: "sqlweave.sql", %error, "rolling back transaction");
                match tx.client.rollback().await {
                    Ok(()) => Err(error),
                    Err(rollback) => Err(SqlError::Rollback {
                        source: Box::new(error),
                        rollback: Box::new(SqlError::Transaction(rollback.to_string())),
                    }),
                }
            }
        }
    }
}

impl Tx<'_> {
    /// Limit how long each following statement of this transaction may run,
    /// via `SET LOCAL statement_timeout`.
    pub async fn set_timeout(&self, timeout: Duration) -> SqlResult<()> {
        set_timeout(timeout).execute(self).await.map(|_| ())
    }
}
