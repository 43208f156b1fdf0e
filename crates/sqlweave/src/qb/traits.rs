//! Trait definitions for statement builders.

use crate::client::GenericClient;
use crate::error::{SqlError, SqlResult};
use crate::qb::param::BuiltQuery;
use crate::row::FromRow;
use tokio_postgres::Row;
use tokio_postgres::types::FromSql;

/// Base trait for all statement builders.
///
/// `build` is pure: it renders the statement without touching the builder,
/// so it can run any number of times and from several readers at once.
/// Execution renders, asks the executor to rebind the placeholders, and runs
/// the statement with the bindings in the same order.
pub trait SqlQb: Sync {
    /// Render SQL (with `?` placeholders) and the bindings for it.
    fn build(&self) -> SqlResult<BuiltQuery>;

    /// Debug helper returning only the SQL text.
    fn to_sql(&self) -> SqlResult<String> {
        self.build().map(|built| built.sql)
    }

    /// Execute query and return all rows.
    fn query(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = SqlResult<Vec<Row>>> + Send {
        async move {
            let built = self.build()?;
            let sql = conn.rebind(&built.sql);
            let params = built.params_ref();
            conn.query(&sql, &params).await
        }
    }

    /// Execute query and return at most one row.
    fn query_opt(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = SqlResult<Option<Row>>> + Send {
        async move {
            let built = self.build()?;
            let sql = conn.rebind(&built.sql);
            let params = built.params_ref();
            conn.query_opt(&sql, &params).await
        }
    }

    /// Execute query and return the first row, `NotFound` if there is none.
    fn query_one(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = SqlResult<Row>> + Send {
        async move {
            let built = self.build()?;
            let sql = conn.rebind(&built.sql);
            let params = built.params_ref();
            conn.query_one(&sql, &params).await
        }
    }

    /// Execute query and map all rows to `T`.
    fn fetch_all<T: FromRow>(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = SqlResult<Vec<T>>> + Send {
        async move {
            let rows = self.query(conn).await?;
            rows.iter().map(T::from_row).collect()
        }
    }

    /// Execute query and map at most one row to `T`.
    fn fetch_opt<T: FromRow>(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = SqlResult<Option<T>>> + Send {
        async move {
            let row = self.query_opt(conn).await?;
            row.as_ref().map(T::from_row).transpose()
        }
    }

    /// Execute query and map the first row to `T`.
    fn fetch_one<T: FromRow>(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = SqlResult<T>> + Send {
        async move {
            let row = self.query_one(conn).await?;
            T::from_row(&row)
        }
    }

    /// Execute query and decode the first column of the first row.
    fn fetch_scalar_one<T>(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = SqlResult<T>> + Send
    where
        T: for<'a> FromSql<'a> + Send,
    {
        async move {
            let row = self.query_one(conn).await?;
            row.try_get(0).map_err(|e| SqlError::decode("0", e.to_string()))
        }
    }

    /// Execute query and decode the first column of every row.
    fn fetch_scalar_all<T>(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = SqlResult<Vec<T>>> + Send
    where
        T: for<'a> FromSql<'a> + Send,
    {
        async move {
            let rows = self.query(conn).await?;
            rows.iter()
                .map(|row| row.try_get(0).map_err(|e| SqlError::decode("0", e.to_string())))
                .collect()
        }
    }
}

/// Trait for statements run for their side effects (INSERT/UPDATE/DELETE/WITH/SET).
pub trait MutationQb: SqlQb {
    /// Execute and return the affected row count.
    fn execute(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = SqlResult<u64>> + Send {
        async move {
            let built = self.build()?;
            let sql = conn.rebind(&built.sql);
            let params = built.params_ref();
            conn.execute(&sql, &params).await
        }
    }
}
