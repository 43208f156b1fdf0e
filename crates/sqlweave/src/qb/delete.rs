//! DELETE statement builder.

use crate::error::{InvalidStatement, SqlResult};
use crate::qb::condition::{Condition, parse_conditions};
use crate::qb::param::{BuiltQuery, ParamList};
use crate::qb::traits::{MutationQb, SqlQb};

/// DELETE statement builder.
///
/// A DELETE without conditions removes every row of the table.
#[derive(Clone, Debug, Default)]
pub struct DeleteQb {
    table: String,
    using: Vec<String>,
    conditions: Vec<Condition>,
    returning: Vec<String>,
}

impl DeleteQb {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// `DELETE FROM table USING t1, t2`
    pub fn using<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.using.extend(tables.into_iter().map(Into::into));
        self
    }

    pub fn and_where(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn where_all(mut self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.conditions.extend(conditions);
        self
    }

    pub fn returning<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.returning.extend(cols.into_iter().map(Into::into));
        self
    }

    pub(crate) fn render(&self, params: &mut ParamList) -> SqlResult<String> {
        if self.table.is_empty() {
            return Err(InvalidStatement::NoTable.into());
        }

        let mut clauses = vec![format!("DELETE FROM {}", self.table)];

        if !self.using.is_empty() {
            clauses.push(format!("USING {}", self.using.join(", ")));
        }

        let where_sql = parse_conditions(&self.conditions, params);
        if !where_sql.is_empty() {
            clauses.push(format!("WHERE {}", where_sql));
        }

        if !self.returning.is_empty() {
            clauses.push(format!("RETURNING {}", self.returning.join(", ")));
        }

        Ok(clauses.join(" "))
    }
}

impl_where_shortcuts!(DeleteQb);

impl SqlQb for DeleteQb {
    fn build(&self) -> SqlResult<BuiltQuery> {
        let mut params = ParamList::new();
        let sql = self.render(&mut params)?;
        Ok(BuiltQuery::new(sql, params.into_vec()))
    }
}

impl MutationQb for DeleteQb {}
