//! # sqlweave
//!
//! Composable, fully parameterized SQL statement builders.
//!
//! ## Features
//!
//! - **One binding list per statement**: the i-th `?` in the rendered SQL is
//!   always the i-th binding, across nested conditions, sub-selects, joins,
//!   CTEs and upsert clauses
//! - **Closed condition algebra**: AND/OR/NOT, IN, EXISTS, ANY/ALL array
//!   comparisons, JSONB operators and raw SQL fragments
//! - **Driver-agnostic rendering**: statements render with `?` and the
//!   executor rebinds them (`$1`, `:arg1`, `@p1`) right before running
//! - **Deterministic output**: SET lists and JSONB objects render their keys
//!   in sorted order, so the same statement always yields the same SQL
//! - **Transaction scopes** with commit on success and rollback on error
//!
//! ## Query Builder (qb)
//!
//! ```ignore
//! use sqlweave::qb::{self, MutationQb, SqlQb, eq, gt, in_list, indirect, or};
//!
//! let db = sqlweave::connect("postgres://localhost/app").await?;
//!
//! // SELECT
//! let names: Vec<String> = qb::select(["name"])
//!     .from("users")
//!     .and_where(or([eq("status", "active"), gt("karma", 100)]))
//!     .order_by(qb::desc("created_at"))
//!     .limit(10)
//!     .fetch_scalar_all(&db)
//!     .await?;
//!
//! // INSERT
//! qb::insert_into("users")
//!     .set("username", "alice")
//!     .set("created_at", indirect("NOW()"))
//!     .execute(&db)
//!     .await?;
//!
//! // UPDATE
//! qb::update("users")
//!     .set("status", "inactive")
//!     .and_where(in_list("id", [1, 2, 3]))
//!     .execute(&db)
//!     .await?;
//!
//! // DELETE
//! qb::delete_from("users").eq("id", 7).execute(&db).await?;
//! ```

pub mod client;
pub mod db;
pub mod error;
pub mod placeholder;
pub mod prelude;
pub mod qb;
pub mod row;
pub mod transaction;

#[cfg(feature = "pool")]
pub mod pool;

pub use client::GenericClient;
pub use db::{Db, DbConfig, ErrorHandler, connect, connect_with_config};
pub use error::{InvalidStatement, SqlError, SqlResult};
pub use placeholder::Placeholder;
pub use row::{FromRow, RowExt};
pub use transaction::{TransactionIsolation, TransactionOptions, TransactionSource, Tx};

pub use qb::{
    BuiltQuery, Condition, DeleteQb, InsertQb, MutationQb, SelectQb, SetQb, SqlQb, UpdateQb,
    WithQb, delete_from, insert_into, select, select_from, update, with,
};

#[cfg(feature = "pool")]
pub use pool::{DEFAULT_POOL_SIZE, create_pool, create_pool_with_config, create_pool_with_manager_config};

/// Build a row of [`Value`](crate::qb::Value)s from expressions of mixed
/// kinds: plain bindings, `indirect(..)` fragments, update functions and
/// JSONB builders.
///
/// # Example
///
/// ```ignore
/// use sqlweave::{values, qb::{insert_into, indirect}};
///
/// let stmt = insert_into("users")
///     .columns(["name", "age", "created_at"])
///     .values(values!["alice", 30, indirect("NOW()")]);
/// ```
#[macro_export]
macro_rules! values {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::qb::IntoValue::into_value($value)),*]
    };
}
