//! UPDATE statement builder.

use crate::error::{InvalidStatement, SqlResult};
use crate::qb::condition::{Condition, parse_conditions};
use crate::qb::conflict::render_assignments;
use crate::qb::param::{BuiltQuery, ParamList};
use crate::qb::select::SelectQb;
use crate::qb::traits::{MutationQb, SqlQb};
use crate::qb::value::{IntoValue, Value};
use std::collections::BTreeMap;

/// UPDATE statement builder.
///
/// Assignments are stored by column name and rendered in ascending column
/// order; setting the same column twice keeps the last value.
#[derive(Clone, Debug, Default)]
pub struct UpdateQb {
    table: String,
    updates: BTreeMap<String, Value>,
    from: Option<(Box<SelectQb>, String)>,
    conditions: Vec<Condition>,
    returning: Vec<String>,
}

impl UpdateQb {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Set a column value. Accepts plain values, `indirect(..)` fragments and
    /// update functions such as `array_append(col, v)`.
    pub fn set(self, column: impl Into<String>, value: impl IntoValue) -> Self {
        self.set_if(column, value, true)
    }

    /// Set a column only when `condition` holds.
    pub fn set_if(mut self, column: impl Into<String>, value: impl IntoValue, condition: bool) -> Self {
        if condition {
            self.updates.insert(column.into(), value.into_value());
        }
        self
    }

    /// Set an optional column value (`None` skips the column).
    pub fn set_opt<T: IntoValue>(self, column: impl Into<String>, value: Option<T>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Set several columns at once.
    pub fn set_map<K, V>(mut self, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: IntoValue,
    {
        for (column, value) in values {
            self.updates.insert(column.into(), value.into_value());
        }
        self
    }

    /// Set a JSON column from any serializable value.
    pub fn set_json<T: serde::Serialize>(self, column: impl Into<String>, value: &T) -> serde_json::Result<Self> {
        let json = serde_json::to_value(value)?;
        Ok(self.set(column, json))
    }

    /// `UPDATE ... SET ... FROM (<select>) alias`
    pub fn from_select(mut self, select: SelectQb, alias: impl Into<String>) -> Self {
        self.from = Some((Box::new(select), alias.into()));
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
        if self.updates.is_empty() {
            return Err(InvalidStatement::NoUpdates.into());
        }

        let mut clauses = vec![
            format!("UPDATE {}", self.table),
            format!("SET {}", render_assignments(&self.updates, params)),
        ];

        if let Some((select, alias)) = &self.from {
            clauses.push(format!("FROM ({}) {}", select.render(params), alias));
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

impl_where_shortcuts!(UpdateQb);

impl SqlQb for UpdateQb {
    fn build(&self) -> SqlResult<BuiltQuery> {
        let mut params = ParamList::new();
        let sql = self.render(&mut params)?;
        Ok(BuiltQuery::new(sql, params.into_vec()))
    }
}

impl MutationQb for UpdateQb {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SqlError;
    use crate::qb::condition::{eq, gt};
    use crate::qb::value::{array_append, array_remove, indirect, indirect_with};

    #[test]
    fn sets_render_sorted() {
        let built = UpdateQb::new("users")
            .set("name", "bob")
            .set("age", 31)
            .eq("id", 7)
            .build()
            .unwrap();
        assert_eq!(built.sql, "UPDATE users SET age = ?, name = ? WHERE id = ?");
        assert_eq!(built.params_debug(), vec!["31", "\"bob\"", "7"]);
    }

    #[test]
    fn set_if_skips_without_binding() {
        let built = UpdateQb::new("users")
            .set_if("nickname", "bobby", false)
            .set_opt::<i32>("age", None)
            .set("name", "bob")
            .build()
            .unwrap();
        assert_eq!(built.sql, "UPDATE users SET name = ?");
        assert_eq!(built.params.len(), 1);
    }

    #[test]
    fn indirect_and_update_functions() {
        let built = UpdateQb::new("posts")
            .set("updated_at", indirect("NOW()"))
            .set("tags", array_append("tags", "rust"))
            .set("slug", indirect_with("replace(slug, ?, '')", vec![crate::qb::Param::new("-")]))
            .set("flags", array_remove("flags", 3))
            .and_where(gt("id", 10))
            .returning(["id", "tags"])
            .build()
            .unwrap();
        assert_eq!(
            built.sql,
            "UPDATE posts SET flags = array_remove(flags, ?), slug = replace(slug, ?, ''), \
             tags = array_append(tags, ?), updated_at = NOW() WHERE id > ? RETURNING id, tags"
        );
        assert_eq!(built.params_debug(), vec!["3", "\"-\"", "\"rust\"", "10"]);
    }

    #[test]
    fn from_select_binds_before_where() {
        let totals = SelectQb::new()
            .columns(["user_id", "SUM(amount) AS total"])
            .from("orders")
            .and_where(gt("amount", 0))
            .group_by(["user_id"]);
        let built = UpdateQb::new("users u")
            .set("balance", indirect("o.total"))
            .from_select(totals, "o")
            .and_where(eq("u.id", indirect("o.user_id")))
            .eq("u.active", true)
            .build()
            .unwrap();
        assert_eq!(
            built.sql,
            "UPDATE users u SET balance = o.total FROM (SELECT user_id, SUM(amount) AS total \
             FROM orders WHERE amount > ? GROUP BY user_id) o WHERE u.id = o.user_id AND u.active = ?"
        );
        assert_eq!(built.params_debug(), vec!["0", "true"]);
    }

    #[test]
    fn render_errors() {
        assert!(matches!(
            UpdateQb::new("").set("a", 1).build(),
            Err(SqlError::Invalid(InvalidStatement::NoTable))
        ));
        assert!(matches!(
            UpdateQb::new("t").set_if("a", 1, false).build(),
            Err(SqlError::Invalid(InvalidStatement::NoUpdates))
        ));
    }
}
