//! Statement builders and the condition algebra.
//!
//! Every builder renders SQL with `?` placeholders plus one flat binding list
//! whose i-th element belongs to the i-th placeholder, however deeply
//! conditions, sub-selects, joins, CTEs and upsert clauses are nested. The
//! executor rebinds `?` to its own syntax right before running the statement.
//!
//! # Usage
//!
//! ```ignore
//! use sqlweave::qb::{self, eq, or, gt, in_list, indirect, SqlQb, MutationQb};
//!
//! // SELECT
//! let users = qb::select(["id", "name"])
//!     .from("users")
//!     .and_where(or([eq("status", "active"), gt("karma", 100)]))
//!     .order_by(qb::desc("created_at"))
//!     .limit(20)
//!     .fetch_all::<User>(&db)
//!     .await?;
//!
//! // INSERT ... ON CONFLICT
//! qb::insert_into("users")
//!     .columns(["name", "email"])
//!     .values(["alice", "alice@example.com"])
//!     .on_conflict(qb::on_conflict(["email"]).do_update().set("name", indirect("EXCLUDED.name")))
//!     .execute(&db)
//!     .await?;
//!
//! // UPDATE
//! qb::update("users")
//!     .set("status", "inactive")
//!     .and_where(in_list("id", ids))
//!     .execute(&db)
//!     .await?;
//! ```
//!
//! A builder is an owned value: each configuration call consumes it and
//! hands it back, so a chain is never shared while it is being built.
//! Rendering borrows it immutably and can be repeated.

/// Generates WHERE shortcut methods for a builder with an `and_where` method.
macro_rules! impl_where_shortcuts {
    ($qb:ty) => {
        impl $qb {
            /// Add WHERE: column = value
            pub fn eq(self, column: &str, value: impl $crate::qb::IntoValue) -> Self {
                self.and_where($crate::qb::condition::eq(column, value))
            }

            /// Add WHERE: column <> value
            pub fn ne(self, column: &str, value: impl $crate::qb::IntoValue) -> Self {
                self.and_where($crate::qb::condition::ne(column, value))
            }

            /// Add WHERE: column > value
            pub fn gt(self, column: &str, value: impl $crate::qb::IntoValue) -> Self {
                self.and_where($crate::qb::condition::gt(column, value))
            }

            /// Add WHERE: column >= value
            pub fn gte(self, column: &str, value: impl $crate::qb::IntoValue) -> Self {
                self.and_where($crate::qb::condition::gte(column, value))
            }

            /// Add WHERE: column < value
            pub fn lt(self, column: &str, value: impl $crate::qb::IntoValue) -> Self {
                self.and_where($crate::qb::condition::lt(column, value))
            }

            /// Add WHERE: column <= value
            pub fn lte(self, column: &str, value: impl $crate::qb::IntoValue) -> Self {
                self.and_where($crate::qb::condition::lte(column, value))
            }

            /// Add WHERE: column IN (values...)
            pub fn in_list<V: $crate::qb::IntoValue>(
                self,
                column: &str,
                values: impl IntoIterator<Item = V>,
            ) -> Self {
                self.and_where($crate::qb::condition::in_list(column, values))
            }

            /// Add WHERE: column IS NULL
            pub fn is_null(self, column: &str) -> Self {
                self.and_where($crate::qb::condition::is_null(column))
            }

            /// Add WHERE: column IS NOT NULL
            pub fn is_not_null(self, column: &str) -> Self {
                self.and_where($crate::qb::condition::is_not_null(column))
            }
        }
    };
}

mod condition;
mod conflict;
mod delete;
mod insert;
mod jsonb;
mod param;
mod select;
mod set;
mod traits;
mod update;
mod value;
mod with;

pub use condition::{
    Condition, JsonbOp, Quantifier, and, array_cmp, compare, eq, eq_all, eq_any, exists, gt, gt_all,
    gt_any, gte, gte_all, gte_any, ilike, in_list, in_select, is_not_null, is_null, jsonb_op, like,
    lt, lt_all, lt_any, lte, lte_all, lte_any, ne, ne_all, ne_any, not, not_exists, not_ilike,
    not_in, not_in_select, not_like, or, parse_conditions, sql_cond,
};
pub use conflict::{ConflictAction, ConflictClause, on_conflict};
pub use delete::DeleteQb;
pub use insert::{InsertQb, SqliteConflict};
pub use jsonb::{IntoJsonb, JsonbBuilder, jsonb_array, jsonb_object};
pub use param::{BuiltQuery, Param, ParamList};
pub use select::{
    JoinClause, JoinType, LockClause, LockStrength, LockWait, Nulls, OrderColumn, SelectQb, asc,
    desc, for_key_share, for_no_key_update, for_share, for_update,
};
pub use set::{SetLevel, SetQb, set_timeout};
pub use traits::{MutationQb, SqlQb};
pub use update::UpdateQb;
pub use value::{
    Indirect, IntoValue, UpdateFunction, Value, array_append, array_concat, array_prepend,
    array_remove, indirect, indirect_with, int_array, update_fn,
};
pub use with::{Statement, WithQb};

/// Create a SELECT statement for the given columns. No columns means `*`.
///
/// # Example
/// ```ignore
/// let qb = sqlweave::qb::select(["id", "name"]).from("users").eq("id", 1);
/// ```
pub fn select<I, S>(cols: I) -> SelectQb
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    SelectQb::new().columns(cols)
}

/// Create a `SELECT * FROM table` statement.
pub fn select_from(table: impl Into<String>) -> SelectQb {
    SelectQb::new().from(table)
}

/// Create an INSERT statement for the given table.
pub fn insert_into(table: impl Into<String>) -> InsertQb {
    InsertQb::new(table)
}

/// Create an UPDATE statement for the given table.
pub fn update(table: impl Into<String>) -> UpdateQb {
    UpdateQb::new(table)
}

/// Create a DELETE statement for the given table.
///
/// Without WHERE conditions every row is deleted.
pub fn delete_from(table: impl Into<String>) -> DeleteQb {
    DeleteQb::new(table)
}

/// Start a WITH statement with its first auxiliary statement.
///
/// # Example
/// ```ignore
/// let qb = sqlweave::qb::with(select(["id"]).from("users").eq("active", true), "active_users")
///     .then(delete_from("sessions").and_where(in_select("user_id", select(["id"]).from("active_users"))));
/// ```
pub fn with(stmt: impl Into<Statement>, alias: impl Into<String>) -> WithQb {
    WithQb::new(stmt, alias)
}

/// Create a `SET param TO value` command.
///
/// The value is spliced into the SQL as-is; never pass user input.
pub fn set(param: impl Into<String>, value: impl Into<String>) -> SetQb {
    SetQb::new(param, value)
}
