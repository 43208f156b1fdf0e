//! `ON CONFLICT` (upsert) clause for INSERT statements.

use crate::error::{InvalidStatement, SqlResult};
use crate::qb::param::ParamList;
use crate::qb::value::{IntoValue, Value};
use std::collections::BTreeMap;

/// Conflict resolution action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictAction {
    #[default]
    DoNothing,
    DoUpdate,
}

/// `ON CONFLICT [(targets)] DO NOTHING | DO UPDATE SET ...`
///
/// Assignments are kept sorted by column name, so the rendered SQL does not
/// depend on the order of `set` calls. They are only recorded once
/// [`ConflictClause::do_update`] has been called.
#[derive(Debug, Clone, Default)]
pub struct ConflictClause {
    targets: Vec<String>,
    action: ConflictAction,
    updates: BTreeMap<String, Value>,
}

/// Start a conflict clause on the given target columns (may be empty).
pub fn on_conflict<I, S>(targets: I) -> ConflictClause
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ConflictClause {
        targets: targets.into_iter().map(Into::into).collect(),
        ..ConflictClause::default()
    }
}

impl ConflictClause {
    pub fn do_nothing(mut self) -> Self {
        self.action = ConflictAction::DoNothing;
        self
    }

    /// Switch to `DO UPDATE`; follow with `set`, `set_if` or `set_map`.
    pub fn do_update(mut self) -> Self {
        self.action = ConflictAction::DoUpdate;
        self
    }

    /// Assign a column. Use `indirect("EXCLUDED.col")` to take the proposed value.
    pub fn set(self, column: impl Into<String>, value: impl IntoValue) -> Self {
        self.set_if(column, value, true)
    }

    /// Assign a column only when `condition` holds.
    pub fn set_if(mut self, column: impl Into<String>, value: impl IntoValue, condition: bool) -> Self {
        if self.action == ConflictAction::DoUpdate && condition {
            self.updates.insert(column.into(), value.into_value());
        }
        self
    }

    /// Assign several columns.
    pub fn set_map<K, V>(mut self, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: IntoValue,
    {
        if self.action == ConflictAction::DoUpdate {
            for (column, value) in values {
                self.updates.insert(column.into(), value.into_value());
            }
        }
        self
    }

    pub fn action(&self) -> ConflictAction {
        self.action
    }

    pub(crate) fn render(&self, params: &mut ParamList) -> SqlResult<String> {
        let mut sql = "ON CONFLICT".to_string();
        if !self.targets.is_empty() {
            sql.push_str(&format!(" ({})", self.targets.join(", ")));
        }

        match self.action {
            ConflictAction::DoNothing => sql.push_str(" DO NOTHING"),
            ConflictAction::DoUpdate => {
                if self.updates.is_empty() {
                    return Err(InvalidStatement::NoUpdates.into());
                }
                sql.push_str(" DO UPDATE SET ");
                sql.push_str(&render_assignments(&self.updates, params));
            }
        }
        Ok(sql)
    }
}

/// `col = expr, ...` in map order, shared with UPDATE.
pub(crate) fn render_assignments(updates: &BTreeMap<String, Value>, params: &mut ParamList) -> String {
    updates
        .iter()
        .map(|(column, value)| format!("{} = {}", column, value.build(params)))
        .collect::<Vec<_>>()
        .join(", ")
}
