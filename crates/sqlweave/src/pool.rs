//! Pooled connections.
//!
//! A pooled client implements [`GenericClient`](crate::GenericClient) and
//! [`TransactionSource`](crate::TransactionSource), so statement builders run
//! against it directly or through a [`Db`] that adds timeouts and error
//! observers:
//!
//! ```ignore
//! let pool = sqlweave::create_pool(&database_url)?;
//! let db = Db::from_pool_with_config(&pool, DbConfig::new().with_query_timeout(Duration::from_secs(5))).await?;
//! let names: Vec<String> = qb::select(["name"]).from("users").fetch_scalar_all(&db).await?;
//! ```

use crate::db::{Db, DbConfig};
use crate::error::{SqlError, SqlResult};
use deadpool_postgres::{Client, Manager, ManagerConfig, Pool, PoolBuilder, RecyclingMethod};
use tokio_postgres::Socket;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};
use tokio_postgres::{Config, NoTls};

/// Pool size used by [`create_pool`].
pub const DEFAULT_POOL_SIZE: usize = 16;

/// Build a plain-TCP pool of [`DEFAULT_POOL_SIZE`] connections for `database_url`.
///
/// No connection is opened until the first checkout.
pub fn create_pool(database_url: &str) -> SqlResult<Pool> {
    create_pool_with_config(database_url, DEFAULT_POOL_SIZE)
}

/// Like [`create_pool`] with an explicit maximum number of connections.
pub fn create_pool_with_config(database_url: &str, max_size: usize) -> SqlResult<Pool> {
    create_pool_with_manager_config(database_url, NoTls, fast_recycling(), |builder| {
        builder.max_size(max_size)
    })
}

/// Build a pool with a caller-supplied TLS connector, recycling policy and
/// pool tuning.
///
/// A malformed URL is reported as [`SqlError::Connection`]; an invalid pool
/// setup as [`SqlError::Pool`].
pub fn create_pool_with_manager_config<T>(
    database_url: &str,
    tls: T,
    manager_config: ManagerConfig,
    configure_pool: impl FnOnce(PoolBuilder) -> PoolBuilder,
) -> SqlResult<Pool>
where
    T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
    T::Stream: Sync + Send,
    T::TlsConnect: Sync + Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    let config = parse_url(database_url)?;
    let manager = Manager::from_config(config, tls, manager_config);
    configure_pool(Pool::builder(manager))
        .build()
        .map_err(|e| SqlError::Pool(e.to_string()))
}

fn parse_url(database_url: &str) -> SqlResult<Config> {
    database_url
        .parse()
        .map_err(|e: tokio_postgres::Error| SqlError::Connection(e.to_string()))
}

fn fast_recycling() -> ManagerConfig {
    ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    }
}

impl Db<Client> {
    /// Check a client out of `pool` and wrap it with the default [`DbConfig`].
    ///
    /// The connection returns to the pool when the `Db` is dropped.
    pub async fn from_pool(pool: &Pool) -> SqlResult<Self> {
        Self::from_pool_with_config(pool, DbConfig::default()).await
    }

    /// Check a client out of `pool` and wrap it with `config`.
    pub async fn from_pool_with_config(pool: &Pool, config: DbConfig) -> SqlResult<Self> {
        let client = pool.get().await?;
        Ok(Db::with_config(client, config))
    }
}
