//! WITH (common table expression) statement builder.

use crate::error::{InvalidStatement, SqlResult};
use crate::qb::delete::DeleteQb;
use crate::qb::insert::InsertQb;
use crate::qb::param::{BuiltQuery, ParamList};
use crate::qb::select::SelectQb;
use crate::qb::traits::{MutationQb, SqlQb};
use crate::qb::update::UpdateQb;

/// A statement that can appear inside a WITH clause, either as an auxiliary
/// statement or as the main one.
#[derive(Clone, Debug)]
pub enum Statement {
    Select(SelectQb),
    Insert(InsertQb),
    Update(UpdateQb),
    Delete(DeleteQb),
}

impl Statement {
    pub(crate) fn render(&self, params: &mut ParamList) -> SqlResult<String> {
        match self {
            Statement::Select(stmt) => Ok(stmt.render(params)),
            Statement::Insert(stmt) => stmt.render(params),
            Statement::Update(stmt) => stmt.render(params),
            Statement::Delete(stmt) => stmt.render(params),
        }
    }
}

impl From<SelectQb> for Statement {
    fn from(stmt: SelectQb) -> Self {
        Statement::Select(stmt)
    }
}

impl From<InsertQb> for Statement {
    fn from(stmt: InsertQb) -> Self {
        Statement::Insert(stmt)
    }
}

impl From<UpdateQb> for Statement {
    fn from(stmt: UpdateQb) -> Self {
        Statement::Update(stmt)
    }
}

impl From<DeleteQb> for Statement {
    fn from(stmt: DeleteQb) -> Self {
        Statement::Delete(stmt)
    }
}

/// `WITH [RECURSIVE] alias AS (aux), ... main`
///
/// Bindings follow the text: every auxiliary statement in declaration order,
/// then the main statement.
#[derive(Clone, Debug)]
pub struct WithQb {
    recursive: bool,
    auxiliary: Vec<(Statement, String)>,
    main: Option<Box<Statement>>,
}

impl WithQb {
    pub fn new(stmt: impl Into<Statement>, alias: impl Into<String>) -> Self {
        Self {
            recursive: false,
            auxiliary: vec![(stmt.into(), alias.into())],
            main: None,
        }
    }

    /// Add another auxiliary statement.
    pub fn and(mut self, stmt: impl Into<Statement>, alias: impl Into<String>) -> Self {
        self.auxiliary.push((stmt.into(), alias.into()));
        self
    }

    /// Emit `WITH RECURSIVE`.
    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    /// Set the main statement, which may refer to the auxiliary aliases.
    pub fn then(mut self, main: impl Into<Statement>) -> Self {
        self.main = Some(Box::new(main.into()));
        self
    }

    pub(crate) fn render(&self, params: &mut ParamList) -> SqlResult<String> {
        let Some(main) = &self.main else {
            return Err(InvalidStatement::NoMainStatement.into());
        };

        let mut parts = Vec::with_capacity(self.auxiliary.len());
        for (stmt, alias) in &self.auxiliary {
            parts.push(format!("{} AS ({})", alias, stmt.render(params)?));
        }

        let keyword = if self.recursive { "WITH RECURSIVE" } else { "WITH" };
        Ok(format!("{} {} {}", keyword, parts.join(", "), main.render(params)?))
    }
}

impl SqlQb for WithQb {
    fn build(&self) -> SqlResult<BuiltQuery> {
        let mut params = ParamList::new();
        let sql = self.render(&mut params)?;
        Ok(BuiltQuery::new(sql, params.into_vec()))
    }
}

impl MutationQb for WithQb {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SqlError;
    use crate::qb::condition::{eq, gt, in_select};
    use crate::qb::value::indirect;

    #[test]
    fn aux_bindings_precede_main() {
        let built = WithQb::new(
            SelectQb::new().columns(["id"]).from("users").and_where(eq("active", true)),
            "active_users",
        )
        .and(
            SelectQb::new().columns(["user_id"]).from("orders").and_where(gt("total", 100)),
            "big_spenders",
        )
        .then(
            UpdateQb::new("users")
                .set("vip", true)
                .and_where(in_select("id", SelectQb::new().columns(["user_id"]).from("big_spenders")))
                .and_where(in_select("id", SelectQb::new().columns(["id"]).from("active_users"))),
        )
        .build()
        .unwrap();
        assert_eq!(
            built.sql,
            "WITH active_users AS (SELECT id FROM users WHERE active = ?), \
             big_spenders AS (SELECT user_id FROM orders WHERE total > ?) \
             UPDATE users SET vip = ? WHERE id IN (SELECT user_id FROM big_spenders) \
             AND id IN (SELECT id FROM active_users)"
        );
        assert_eq!(built.params_debug(), vec!["true", "100", "true"]);
    }

    #[test]
    fn data_modifying_aux_statement() {
        let built = WithQb::new(
            DeleteQb::new("queue").and_where(eq("id", 5)).returning(["payload"]),
            "taken",
        )
        .then(
            InsertQb::new("archive")
                .columns(["payload"])
                .from_select(SelectQb::new().columns(["payload"]).from("taken")),
        )
        .build()
        .unwrap();
        assert_eq!(
            built.sql,
            "WITH taken AS (DELETE FROM queue WHERE id = ? RETURNING payload) \
             INSERT INTO archive (payload) SELECT payload FROM taken"
        );
        assert_eq!(built.params.len(), 1);
    }

    #[test]
    fn recursive_keyword() {
        let sql = WithQb::new(
            SelectQb::new()
                .columns(["id", "parent_id"])
                .from("nodes")
                .and_where(eq("id", 1))
                .union_all(
                    SelectQb::new()
                        .columns(["n.id", "n.parent_id"])
                        .from("nodes n")
                        .inner_join("tree t", [eq("n.parent_id", indirect("t.id"))]),
                ),
            "tree",
        )
        .recursive()
        .then(SelectQb::new().from("tree"))
        .to_sql()
        .unwrap();
        assert_eq!(
            sql,
            "WITH RECURSIVE tree AS (SELECT id, parent_id FROM nodes WHERE id = ? UNION ALL \
             SELECT n.id, n.parent_id FROM nodes n INNER JOIN tree t ON n.parent_id = t.id) \
             SELECT * FROM tree"
        );
    }

    #[test]
    fn missing_main_is_invalid() {
        let err = WithQb::new(SelectQb::new().from("t"), "x").build().unwrap_err();
        assert!(matches!(err, SqlError::Invalid(InvalidStatement::NoMainStatement)));
    }

    #[test]
    fn aux_errors_propagate() {
        let err = WithQb::new(UpdateQb::new("t"), "x")
            .then(SelectQb::new().from("x"))
            .build()
            .unwrap_err();
        assert!(matches!(err, SqlError::Invalid(InvalidStatement::NoUpdates)));
    }
}
