//! INSERT statement builder.

use crate::error::{InvalidStatement, SqlResult};
use crate::qb::conflict::ConflictClause;
use crate::qb::param::{BuiltQuery, ParamList};
use crate::qb::select::SelectQb;
use crate::qb::traits::{MutationQb, SqlQb};
use crate::qb::value::{IntoValue, Value};
use std::collections::BTreeMap;

/// SQLite `INSERT OR <action>` conflict resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SqliteConflict {
    Ignore,
    Replace,
    Abort,
    Rollback,
    Fail,
}

impl SqliteConflict {
    fn keyword(self) -> &'static str {
        match self {
            SqliteConflict::Ignore => "IGNORE",
            SqliteConflict::Replace => "REPLACE",
            SqliteConflict::Abort => "ABORT",
            SqliteConflict::Rollback => "ROLLBACK",
            SqliteConflict::Fail => "FAIL",
        }
    }
}

/// INSERT statement builder.
///
/// Rows come from exactly one source. When several are configured the
/// precedence is: source SELECT, then the single VALUES row, then the
/// multi-row VALUES list.
#[derive(Clone, Debug, Default)]
pub struct InsertQb {
    table: String,
    sqlite_conflict: Option<SqliteConflict>,
    columns: Vec<String>,
    values: Vec<Value>,
    rows: Vec<Vec<Value>>,
    select: Option<Box<SelectQb>>,
    conflicts: Vec<ConflictClause>,
    returning: Vec<String>,
}

impl InsertQb {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Append column names.
    pub fn columns<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(cols.into_iter().map(Into::into));
        self
    }

    /// Append values to the single VALUES row, positionally matching the
    /// columns. Mix value kinds with the [`values!`](crate::values) macro.
    pub fn values<V: IntoValue>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.values.extend(values.into_iter().map(IntoValue::into_value));
        self
    }

    /// Append one column together with its value.
    pub fn set(mut self, column: impl Into<String>, value: impl IntoValue) -> Self {
        self.columns.push(column.into());
        self.values.push(value.into_value());
        self
    }

    /// Append a column holding a serialized JSON document (bound as `jsonb`).
    pub fn set_json<T: serde::Serialize>(self, column: impl Into<String>, value: &T) -> serde_json::Result<Self> {
        let json = serde_json::to_value(value)?;
        Ok(self.set(column, json))
    }

    /// Append columns and values from a map; columns are taken in ascending
    /// order.
    pub fn value_map<K, V>(mut self, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: IntoValue,
    {
        let sorted: BTreeMap<String, Value> = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into_value()))
            .collect();
        for (column, value) in sorted {
            self.columns.push(column);
            self.values.push(value);
        }
        self
    }

    /// Append rows for a multi-row `VALUES (...), (...)` insert.
    pub fn values_multiple(mut self, rows: impl IntoIterator<Item = Vec<Value>>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// `INSERT INTO table [(cols)] SELECT ...`
    pub fn from_select(mut self, select: SelectQb) -> Self {
        self.select = Some(Box::new(select));
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

    /// Add an `ON CONFLICT` clause, see [`on_conflict`](crate::qb::on_conflict).
    pub fn on_conflict(mut self, clause: ConflictClause) -> Self {
        self.conflicts.push(clause);
        self
    }

    /// `ON CONFLICT DO NOTHING`
    pub fn on_conflict_do_nothing(self) -> Self {
        self.on_conflict(ConflictClause::default())
    }

    /// `INSERT OR IGNORE` (SQLite)
    pub fn or_ignore(self) -> Self {
        self.sqlite_conflict(SqliteConflict::Ignore)
    }

    /// `INSERT OR REPLACE` (SQLite)
    pub fn or_replace(self) -> Self {
        self.sqlite_conflict(SqliteConflict::Replace)
    }

    /// `INSERT OR ABORT` (SQLite)
    pub fn or_abort(self) -> Self {
        self.sqlite_conflict(SqliteConflict::Abort)
    }

    /// `INSERT OR ROLLBACK` (SQLite)
    pub fn or_rollback(self) -> Self {
        self.sqlite_conflict(SqliteConflict::Rollback)
    }

    /// `INSERT OR FAIL` (SQLite)
    pub fn or_fail(self) -> Self {
        self.sqlite_conflict(SqliteConflict::Fail)
    }

    pub fn sqlite_conflict(mut self, action: SqliteConflict) -> Self {
        self.sqlite_conflict = Some(action);
        self
    }

    pub(crate) fn render(&self, params: &mut ParamList) -> SqlResult<String> {
        if self.table.is_empty() {
            return Err(InvalidStatement::NoTable.into());
        }

        #[cfg(feature = "tracing")]
        {
            let sources = usize::from(self.select.is_some())
                + usize::from(!self.values.is_empty())
                + usize::from(!self.rows.is_empty());
            if sources > 1 {
                tracing::warn!(
                    target: "sqlweave.qb",
                    table = %self.table,
                    "INSERT has more than one row source; the SELECT or single row wins"
                );
            }
        }

        let mut clauses = Vec::with_capacity(6);
        clauses.push(match self.sqlite_conflict {
            Some(action) => format!("INSERT OR {} INTO {}", action.keyword(), self.table),
            None => format!("INSERT INTO {}", self.table),
        });

        if !self.columns.is_empty() {
            clauses.push(format!("({})", self.columns.join(", ")));
        }

        if let Some(select) = &self.select {
            clauses.push(select.render(params));
        } else if !self.values.is_empty() {
            clauses.push(format!("VALUES ({})", render_row(&self.values, params)));
        } else if !self.rows.is_empty() {
            let rows: Vec<String> = self
                .rows
                .iter()
                .map(|row| format!("({})", render_row(row, params)))
                .collect();
            clauses.push(format!("VALUES {}", rows.join(", ")));
        } else {
            return Err(InvalidStatement::NoValues.into());
        }

        for conflict in &self.conflicts {
            clauses.push(conflict.render(params)?);
        }

        if !self.returning.is_empty() {
            clauses.push(format!("RETURNING {}", self.returning.join(", ")));
        }

        Ok(clauses.join(" "))
    }
}

fn render_row(values: &[Value], params: &mut ParamList) -> String {
    values
        .iter()
        .map(|value| value.build(params))
        .collect::<Vec<_>>()
        .join(", ")
}

impl SqlQb for InsertQb {
    fn build(&self) -> SqlResult<BuiltQuery> {
        let mut params = ParamList::new();
        let sql = self.render(&mut params)?;
        Ok(BuiltQuery::new(sql, params.into_vec()))
    }
}

impl MutationQb for InsertQb {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qb::conflict::on_conflict;
    use crate::qb::jsonb::JsonbBuilder;
    use crate::qb::value::indirect;

    #[test]
    fn simple_insert() {
        let built = InsertQb::new("users")
            .columns(["name", "age"])
            .values(crate::values!["alice", 30])
            .build()
            .unwrap();
        assert_eq!(built.sql, "INSERT INTO users (name, age) VALUES (?, ?)");
        assert_eq!(built.params_debug(), vec!["\"alice\"", "30"]);
    }

    #[test]
    fn set_pairs_columns_with_values() {
        let built = InsertQb::new("users")
            .set("name", "bob")
            .set("created_at", indirect("NOW()"))
            .returning(["id"])
            .build()
            .unwrap();
        assert_eq!(built.sql, "INSERT INTO users (name, created_at) VALUES (?, NOW()) RETURNING id");
        assert_eq!(built.params.len(), 1);
    }

    #[test]
    fn value_map_is_sorted() {
        let built = InsertQb::new("t")
            .value_map([("zeta", 3), ("alpha", 1), ("mid", 2)])
            .build()
            .unwrap();
        assert_eq!(built.sql, "INSERT INTO t (alpha, mid, zeta) VALUES (?, ?, ?)");
        assert_eq!(built.params_debug(), vec!["1", "2", "3"]);
    }

    #[test]
    fn multiple_rows() {
        let built = InsertQb::new("t")
            .columns(["a", "b"])
            .values_multiple([crate::values![1, "x"], crate::values![2, indirect("DEFAULT")]])
            .build()
            .unwrap();
        assert_eq!(built.sql, "INSERT INTO t (a, b) VALUES (?, ?), (?, DEFAULT)");
        assert_eq!(built.params_debug(), vec!["1", "\"x\"", "2"]);
    }

    #[test]
    fn jsonb_value_in_row() {
        let built = InsertQb::new("docs")
            .columns(["id", "body"])
            .values(crate::values![7, JsonbBuilder::object().insert("k", "v")])
            .build()
            .unwrap();
        assert_eq!(built.sql, "INSERT INTO docs (id, body) VALUES (?, jsonb_build_object(?, ?))");
        assert_eq!(built.params_debug(), vec!["7", "\"k\"", "\"v\""]);
    }

    #[test]
    fn select_source_wins() {
        let built = InsertQb::new("archive")
            .values([1])
            .from_select(SelectQb::new().from("live").and_where(crate::qb::lt("age", 5)))
            .build()
            .unwrap();
        assert_eq!(built.sql, "INSERT INTO archive SELECT * FROM live WHERE age < ?");
        assert_eq!(built.params_debug(), vec!["5"]);
    }

    #[test]
    fn sqlite_prefix_and_conflicts() {
        assert_eq!(
            InsertQb::new("t").values([1]).or_ignore().to_sql().unwrap(),
            "INSERT OR IGNORE INTO t VALUES (?)"
        );
        let built = InsertQb::new("t")
            .columns(["id", "n"])
            .values([1, 2])
            .on_conflict(on_conflict(["id"]).do_update().set("n", indirect("EXCLUDED.n")))
            .returning(["id"])
            .build()
            .unwrap();
        assert_eq!(
            built.sql,
            "INSERT INTO t (id, n) VALUES (?, ?) ON CONFLICT (id) DO UPDATE SET n = EXCLUDED.n RETURNING id"
        );
        assert_eq!(
            InsertQb::new("t").values([1]).on_conflict_do_nothing().to_sql().unwrap(),
            "INSERT INTO t VALUES (?) ON CONFLICT DO NOTHING"
        );
    }

    #[test]
    fn render_errors() {
        let err = InsertQb::new("").values([1]).build().unwrap_err();
        assert!(matches!(err, crate::SqlError::Invalid(InvalidStatement::NoTable)));
        let err = InsertQb::new("t").columns(["a"]).build().unwrap_err();
        assert!(matches!(err, crate::SqlError::Invalid(InvalidStatement::NoValues)));
    }

    #[test]
    fn set_json_binds_document() {
        #[derive(serde::Serialize)]
        struct Prefs {
            theme: &'static str,
        }
        let built = InsertQb::new("settings")
            .set_json("prefs", &Prefs { theme: "dark" })
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(built.sql, "INSERT INTO settings (prefs) VALUES (?)");
        assert_eq!(built.params_debug(), vec!["Object {\"theme\": String(\"dark\")}"]);
    }
}
