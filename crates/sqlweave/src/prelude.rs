//! Convenient imports for typical `sqlweave` usage.
//!
//! ```ignore
//! use sqlweave::prelude::*;
//! ```

pub use crate::qb::{
    self, Condition, IntoValue, MutationQb, SqlQb, and, eq, gt, gte, in_list, indirect, is_not_null,
    is_null, lt, lte, ne, not, or,
};
pub use crate::{Db, DbConfig, FromRow, GenericClient, RowExt, SqlError, SqlResult, Tx, values};

#[cfg(feature = "pool")]
pub use crate::{create_pool, create_pool_with_config};
