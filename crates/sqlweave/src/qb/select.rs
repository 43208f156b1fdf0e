//! SELECT statement builder.

use crate::client::GenericClient;
use crate::error::SqlResult;
use crate::qb::condition::{Condition, parse_conditions};
use crate::qb::param::{BuiltQuery, ParamList};
use crate::qb::traits::SqlQb;

/// Kind of JOIN.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    fn keyword(self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL JOIN",
        }
    }
}

/// One JOIN clause. When `result_set` is present the target is a
/// parenthesized sub-select and `table` is its alias.
#[derive(Clone, Debug)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub lateral: bool,
    pub table: String,
    pub result_set: Option<Box<SelectQb>>,
    pub conditions: Vec<Condition>,
}

impl JoinClause {
    fn render(&self, params: &mut ParamList) -> String {
        let mut sql = self.join_type.keyword().to_string();
        if self.lateral {
            sql.push_str(" LATERAL");
        }

        // The sub-select precedes ON in the text, so its bindings go first.
        match &self.result_set {
            Some(rs) => {
                sql.push_str(" (");
                sql.push_str(&rs.render(params));
                sql.push_str(") ");
            }
            None => sql.push(' '),
        }
        sql.push_str(&self.table);

        let on = parse_conditions(&self.conditions, params);
        if !on.is_empty() {
            sql.push_str(" ON ");
            sql.push_str(&on);
        }
        sql
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Nulls {
    First,
    Last,
}

/// A column in an ORDER BY clause.
#[derive(Clone, Debug)]
pub struct OrderColumn {
    pub column: String,
    pub desc: bool,
    pub nulls: Option<Nulls>,
}

impl OrderColumn {
    pub fn nulls_first(mut self) -> Self {
        self.nulls = Some(Nulls::First);
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = Some(Nulls::Last);
        self
    }

    fn render(&self) -> String {
        let mut sql = format!("{} {}", self.column, if self.desc { "DESC" } else { "ASC" });
        match self.nulls {
            Some(Nulls::First) => sql.push_str(" NULLS FIRST"),
            Some(Nulls::Last) => sql.push_str(" NULLS LAST"),
            None => {}
        }
        sql
    }
}

/// `col ASC`
pub fn asc(column: impl Into<String>) -> OrderColumn {
    OrderColumn {
        column: column.into(),
        desc: false,
        nulls: None,
    }
}

/// `col DESC`
pub fn desc(column: impl Into<String>) -> OrderColumn {
    OrderColumn {
        column: column.into(),
        desc: true,
        nulls: None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockStrength {
    Update,
    NoKeyUpdate,
    Share,
    KeyShare,
}

/// What to do when a row lock cannot be acquired immediately.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LockWait {
    #[default]
    Wait,
    NoWait,
    SkipLocked,
}

/// Row-level locking clause (`FOR UPDATE OF t NOWAIT`, ...).
#[derive(Clone, Debug)]
pub struct LockClause {
    pub strength: LockStrength,
    pub tables: Vec<String>,
    pub wait: LockWait,
}

impl LockClause {
    pub fn new(strength: LockStrength) -> Self {
        Self {
            strength,
            tables: Vec::new(),
            wait: LockWait::Wait,
        }
    }

    pub fn of_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables.extend(tables.into_iter().map(Into::into));
        self
    }

    pub fn no_wait(mut self) -> Self {
        self.wait = LockWait::NoWait;
        self
    }

    pub fn skip_locked(mut self) -> Self {
        self.wait = LockWait::SkipLocked;
        self
    }

    fn render(&self) -> String {
        let mut sql = match self.strength {
            LockStrength::Update => "FOR UPDATE",
            LockStrength::NoKeyUpdate => "FOR NO KEY UPDATE",
            LockStrength::Share => "FOR SHARE",
            LockStrength::KeyShare => "FOR KEY SHARE",
        }
        .to_string();

        if !self.tables.is_empty() {
            sql.push_str(" OF ");
            sql.push_str(&self.tables.join(", "));
        }

        match self.wait {
            LockWait::Wait => {}
            LockWait::NoWait => sql.push_str(" NOWAIT"),
            LockWait::SkipLocked => sql.push_str(" SKIP LOCKED"),
        }
        sql
    }
}

pub fn for_update() -> LockClause {
    LockClause::new(LockStrength::Update)
}

pub fn for_no_key_update() -> LockClause {
    LockClause::new(LockStrength::NoKeyUpdate)
}

pub fn for_share() -> LockClause {
    LockClause::new(LockStrength::Share)
}

pub fn for_key_share() -> LockClause {
    LockClause::new(LockStrength::KeyShare)
}

#[derive(Clone, Debug)]
struct Union {
    all: bool,
    stmt: Box<SelectQb>,
}

/// SELECT statement builder.
///
/// Clauses render in this order, each only when populated:
/// `SELECT [DISTINCT [ON (..)]] cols FROM table JOIN.. WHERE GROUP BY HAVING
/// ORDER BY LIMIT OFFSET FOR.. UNION..`.
///
/// A statement without a table renders without `FROM`, e.g. `SELECT NOW()`.
#[derive(Clone, Debug, Default)]
pub struct SelectQb {
    distinct: bool,
    distinct_on: Vec<String>,
    columns: Vec<String>,
    table: String,
    source: Option<Box<SelectQb>>,
    joins: Vec<JoinClause>,
    conditions: Vec<Condition>,
    grouping: Vec<String>,
    having: Vec<Condition>,
    ordering: Vec<OrderColumn>,
    limit: i64,
    offset: i64,
    offset_rows: i64,
    locks: Vec<LockClause>,
    unions: Vec<Union>,
}

impl SelectQb {
    /// An empty SELECT; without columns it selects `*`.
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Columns & source ====================

    /// Append SELECT columns. Any SQL expression is accepted.
    pub fn columns<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(cols.into_iter().map(Into::into));
        self
    }

    /// `SELECT DISTINCT`
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// `SELECT DISTINCT ON (cols)`
    pub fn distinct_on<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.distinct = true;
        self.distinct_on.extend(cols.into_iter().map(Into::into));
        self
    }

    /// Set the FROM table (aliases allowed: `"users u"`).
    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self.source = None;
        self
    }

    /// `FROM (SELECT ...) alias`. The sub-select's bindings precede those of
    /// the joins and WHERE clause.
    pub fn from_select(mut self, select: SelectQb, alias: impl Into<String>) -> Self {
        self.table = alias.into();
        self.source = Some(Box::new(select));
        self
    }

    // ==================== JOIN ====================

    /// Join a table. An empty condition list omits `ON`.
    pub fn join(
        mut self,
        join_type: JoinType,
        table: impl Into<String>,
        conditions: impl IntoIterator<Item = Condition>,
    ) -> Self {
        self.joins.push(JoinClause {
            join_type,
            lateral: false,
            table: table.into(),
            result_set: None,
            conditions: conditions.into_iter().collect(),
        });
        self
    }

    /// Join the result set of another SELECT under `alias`.
    pub fn join_rs(
        mut self,
        join_type: JoinType,
        rs: SelectQb,
        alias: impl Into<String>,
        conditions: impl IntoIterator<Item = Condition>,
    ) -> Self {
        self.joins.push(JoinClause {
            join_type,
            lateral: false,
            table: alias.into(),
            result_set: Some(Box::new(rs)),
            conditions: conditions.into_iter().collect(),
        });
        self
    }

    /// `JOIN LATERAL (SELECT ...) alias`: the sub-select may reference
    /// columns of the preceding FROM items.
    pub fn join_lateral(
        mut self,
        join_type: JoinType,
        rs: SelectQb,
        alias: impl Into<String>,
        conditions: impl IntoIterator<Item = Condition>,
    ) -> Self {
        self.joins.push(JoinClause {
            join_type,
            lateral: true,
            table: alias.into(),
            result_set: Some(Box::new(rs)),
            conditions: conditions.into_iter().collect(),
        });
        self
    }

    pub fn inner_join(self, table: impl Into<String>, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.join(JoinType::Inner, table, conditions)
    }

    pub fn left_join(self, table: impl Into<String>, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.join(JoinType::Left, table, conditions)
    }

    pub fn right_join(self, table: impl Into<String>, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.join(JoinType::Right, table, conditions)
    }

    pub fn full_join(self, table: impl Into<String>, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.join(JoinType::Full, table, conditions)
    }

    pub fn inner_join_rs(
        self,
        rs: SelectQb,
        alias: impl Into<String>,
        conditions: impl IntoIterator<Item = Condition>,
    ) -> Self {
        self.join_rs(JoinType::Inner, rs, alias, conditions)
    }

    pub fn left_join_rs(
        self,
        rs: SelectQb,
        alias: impl Into<String>,
        conditions: impl IntoIterator<Item = Condition>,
    ) -> Self {
        self.join_rs(JoinType::Left, rs, alias, conditions)
    }

    pub fn right_join_rs(
        self,
        rs: SelectQb,
        alias: impl Into<String>,
        conditions: impl IntoIterator<Item = Condition>,
    ) -> Self {
        self.join_rs(JoinType::Right, rs, alias, conditions)
    }

    pub fn full_join_rs(
        self,
        rs: SelectQb,
        alias: impl Into<String>,
        conditions: impl IntoIterator<Item = Condition>,
    ) -> Self {
        self.join_rs(JoinType::Full, rs, alias, conditions)
    }

    pub fn inner_join_lateral(
        self,
        rs: SelectQb,
        alias: impl Into<String>,
        conditions: impl IntoIterator<Item = Condition>,
    ) -> Self {
        self.join_lateral(JoinType::Inner, rs, alias, conditions)
    }

    pub fn left_join_lateral(
        self,
        rs: SelectQb,
        alias: impl Into<String>,
        conditions: impl IntoIterator<Item = Condition>,
    ) -> Self {
        self.join_lateral(JoinType::Left, rs, alias, conditions)
    }

    // ==================== WHERE ====================

    /// Add a WHERE condition. Conditions are ANDed.
    pub fn and_where(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add several WHERE conditions.
    pub fn where_all(mut self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.conditions.extend(conditions);
        self
    }

    // ==================== Grouping & ordering ====================

    pub fn group_by<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grouping.extend(cols.into_iter().map(Into::into));
        self
    }

    /// Add a HAVING condition. Conditions are ANDed.
    pub fn having(mut self, condition: Condition) -> Self {
        self.having.push(condition);
        self
    }

    pub fn order_by(mut self, column: OrderColumn) -> Self {
        self.ordering.push(column);
        self
    }

    pub fn order_by_all(mut self, columns: impl IntoIterator<Item = OrderColumn>) -> Self {
        self.ordering.extend(columns);
        self
    }

    // ==================== Pagination ====================

    /// Set LIMIT. Zero (the default) means no limit.
    pub fn limit(mut self, n: i64) -> Self {
        self.limit = n;
        self
    }

    /// Set OFFSET. Zero (the default) means no offset.
    pub fn offset(mut self, start: i64) -> Self {
        self.offset = start;
        self
    }

    /// `OFFSET start rows`, for databases accepting a row count after the
    /// offset.
    pub fn offset_rows(mut self, start: i64, rows: i64) -> Self {
        self.offset = start;
        self.offset_rows = rows;
        self
    }

    // ==================== Locking & set operations ====================

    /// Add a row-locking clause. Locks render in registration order.
    pub fn lock(mut self, lock: LockClause) -> Self {
        self.locks.push(lock);
        self
    }

    /// `... UNION SELECT ...`
    pub fn union(mut self, other: SelectQb) -> Self {
        self.unions.push(Union {
            all: false,
            stmt: Box::new(other),
        });
        self
    }

    /// `... UNION ALL SELECT ...`
    pub fn union_all(mut self, other: SelectQb) -> Self {
        self.unions.push(Union {
            all: true,
            stmt: Box::new(other),
        });
        self
    }

    // ==================== Build ====================

    /// Render into `params`, used for nesting inside other statements.
    pub(crate) fn render(&self, params: &mut ParamList) -> String {
        let mut clauses: Vec<String> = vec!["SELECT".to_string()];

        if self.distinct {
            clauses.push("DISTINCT".to_string());
            if !self.distinct_on.is_empty() {
                clauses.push(format!("ON ({})", self.distinct_on.join(", ")));
            }
        }

        if self.columns.is_empty() {
            clauses.push("*".to_string());
        } else {
            clauses.push(self.columns.join(", "));
        }

        match &self.source {
            Some(source) => {
                let sub = source.render(params);
                clauses.push(format!("FROM ({}) {}", sub, self.table));
            }
            None if !self.table.is_empty() => clauses.push(format!("FROM {}", self.table)),
            None => {}
        }

        for join in &self.joins {
            clauses.push(join.render(params));
        }

        let where_sql = parse_conditions(&self.conditions, params);
        if !where_sql.is_empty() {
            clauses.push(format!("WHERE {}", where_sql));
        }

        if !self.grouping.is_empty() {
            clauses.push(format!("GROUP BY {}", self.grouping.join(", ")));
        }

        let having_sql = parse_conditions(&self.having, params);
        if !having_sql.is_empty() {
            clauses.push(format!("HAVING {}", having_sql));
        }

        if !self.ordering.is_empty() {
            let ordering: Vec<String> = self.ordering.iter().map(OrderColumn::render).collect();
            clauses.push(format!("ORDER BY {}", ordering.join(", ")));
        }

        if self.limit > 0 {
            clauses.push(format!("LIMIT {}", self.limit));
        }

        if self.offset > 0 {
            if self.offset_rows > 0 {
                clauses.push(format!("OFFSET {} {}", self.offset, self.offset_rows));
            } else {
                clauses.push(format!("OFFSET {}", self.offset));
            }
        }

        for lock in &self.locks {
            clauses.push(lock.render());
        }

        for union in &self.unions {
            let keyword = if union.all { "UNION ALL" } else { "UNION" };
            clauses.push(format!("{} {}", keyword, union.stmt.render(params)));
        }

        clauses.join(" ")
    }

    /// The statement used by [`SelectQb::get_count`]: same joins, WHERE,
    /// GROUP BY and HAVING, columns replaced by `COUNT(*)`, and no ordering,
    /// limit, offset or locks.
    ///
    /// A DISTINCT or UNION statement is counted through a sub-select instead:
    /// `SELECT COUNT(*) FROM (SELECT DISTINCT ...) count_src`.
    pub fn count_query(&self) -> SelectQb {
        let mut count = self.clone();
        count.ordering.clear();
        count.limit = 0;
        count.offset = 0;
        count.offset_rows = 0;
        count.locks.clear();

        if count.distinct || !count.unions.is_empty() {
            return SelectQb::new()
                .columns(["COUNT(*)"])
                .from_select(count, "count_src");
        }
        count.columns = vec!["COUNT(*)".to_string()];
        count
    }

    /// Count the rows this statement would return, ignoring pagination.
    pub async fn get_count(&self, conn: &impl GenericClient) -> SqlResult<i64> {
        self.count_query().fetch_scalar_one::<i64>(conn).await
    }
}

impl_where_shortcuts!(SelectQb);

impl SqlQb for SelectQb {
    fn build(&self) -> SqlResult<BuiltQuery> {
        let mut params = ParamList::new();
        let sql = self.render(&mut params);
        Ok(BuiltQuery::new(sql, params.into_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qb::condition::{eq, gt, not_exists, sql_cond};
    use crate::qb::value::indirect;

    #[test]
    fn join_without_conditions_omits_on() {
        let qb = SelectQb::new().from("a").join(JoinType::Full, "b", []);
        assert_eq!(qb.to_sql().unwrap(), "SELECT * FROM a FULL JOIN b");
    }

    #[test]
    fn lateral_join() {
        let latest = SelectQb::new()
            .columns(["total"])
            .from("orders o")
            .and_where(eq("o.user_id", indirect("u.id")))
            .order_by(desc("o.created_at"))
            .limit(1);
        let qb = SelectQb::new()
            .columns(["u.id", "l.total"])
            .from("users u")
            .left_join_lateral(latest, "l", [sql_cond("true", vec![])]);
        assert_eq!(
            qb.to_sql().unwrap(),
            "SELECT u.id, l.total FROM users u LEFT JOIN LATERAL (SELECT total FROM orders o \
             WHERE o.user_id = u.id ORDER BY o.created_at DESC LIMIT 1) l ON true"
        );
    }

    #[test]
    fn locks_render_in_order() {
        let qb = SelectQb::new()
            .from("jobs")
            .lock(for_update().of_tables(["jobs"]).skip_locked())
            .lock(for_key_share().no_wait());
        assert_eq!(
            qb.to_sql().unwrap(),
            "SELECT * FROM jobs FOR UPDATE OF jobs SKIP LOCKED FOR KEY SHARE NOWAIT"
        );
    }

    #[test]
    fn zero_limit_and_offset_are_unset() {
        let qb = SelectQb::new().from("t").limit(0).offset(0);
        assert_eq!(qb.to_sql().unwrap(), "SELECT * FROM t");

        let qb = SelectQb::new().from("t").limit(10).offset_rows(20, 5);
        assert_eq!(qb.to_sql().unwrap(), "SELECT * FROM t LIMIT 10 OFFSET 20 5");
    }

    #[test]
    fn count_query_keeps_filters_and_drops_paging() {
        let qb = SelectQb::new()
            .columns(["id", "name"])
            .from("users")
            .and_where(gt("age", 18))
            .order_by(asc("name").nulls_last())
            .limit(10)
            .offset(30)
            .lock(for_share());
        let count = qb.count_query();

        let built = count.build().unwrap();
        assert_eq!(built.sql, "SELECT COUNT(*) FROM users WHERE age > ?");
        assert_eq!(built.params_debug(), vec!["18"]);

        // The original is untouched.
        assert_eq!(
            qb.to_sql().unwrap(),
            "SELECT id, name FROM users WHERE age > ? ORDER BY name ASC NULLS LAST \
             LIMIT 10 OFFSET 30 FOR SHARE"
        );
    }

    #[test]
    fn select_without_table() {
        assert_eq!(SelectQb::new().columns(["NOW()"]).to_sql().unwrap(), "SELECT NOW()");
    }

    #[test]
    fn distinct_and_distinct_on() {
        let built = SelectQb::new()
            .columns(["country"])
            .from("users")
            .distinct()
            .and_where(eq("active", true))
            .build()
            .unwrap();
        assert_eq!(built.sql, "SELECT DISTINCT country FROM users WHERE active = ?");
        assert_eq!(built.params_debug(), vec!["true"]);

        let built = SelectQb::new()
            .columns(["user_id", "created_at"])
            .from("logins")
            .distinct_on(["user_id"])
            .order_by(asc("user_id"))
            .order_by(desc("created_at").nulls_first())
            .build()
            .unwrap();
        assert_eq!(
            built.sql,
            "SELECT DISTINCT ON (user_id) user_id, created_at FROM logins \
             ORDER BY user_id ASC, created_at DESC NULLS FIRST"
        );
        assert!(built.params.is_empty());
    }

    #[test]
    fn union_binds_after_outer_clauses() {
        let built = SelectQb::new()
            .columns(["id"])
            .from("admins")
            .and_where(eq("org_id", 7))
            .union(SelectQb::new().columns(["id"]).from("owners").and_where(gt("since", 2020)))
            .build()
            .unwrap();
        assert_eq!(
            built.sql,
            "SELECT id FROM admins WHERE org_id = ? UNION SELECT id FROM owners WHERE since > ?"
        );
        assert_eq!(built.params_debug(), vec!["7", "2020"]);
    }

    #[test]
    fn not_exists_subselect() {
        let built = SelectQb::new()
            .from("users u")
            .and_where(eq("u.active", true))
            .and_where(not_exists(
                SelectQb::new()
                    .columns(["1"])
                    .from("bans b")
                    .and_where(eq("b.user_id", indirect("u.id")))
                    .and_where(gt("b.until", "2024-01-01")),
            ))
            .build()
            .unwrap();
        assert_eq!(
            built.sql,
            "SELECT * FROM users u WHERE u.active = ? AND NOT EXISTS \
             (SELECT 1 FROM bans b WHERE b.user_id = u.id AND b.until > ?)"
        );
        assert_eq!(built.params_debug(), vec!["true", "\"2024-01-01\""]);
    }

    #[test]
    fn from_select_binds_before_where() {
        let built = SelectQb::new()
            .columns(["t.id"])
            .from_select(SelectQb::new().columns(["id"]).from("orders").and_where(gt("total", 100)), "t")
            .and_where(eq("t.id", 5))
            .build()
            .unwrap();
        assert_eq!(
            built.sql,
            "SELECT t.id FROM (SELECT id FROM orders WHERE total > ?) t WHERE t.id = ?"
        );
        assert_eq!(built.params_debug(), vec!["100", "5"]);
    }

    #[test]
    fn count_query_wraps_union() {
        let qb = SelectQb::new()
            .columns(["id", "name"])
            .from("a")
            .and_where(eq("kind", "x"))
            .union(SelectQb::new().columns(["id", "name"]).from("b"))
            .limit(5);
        let built = qb.count_query().build().unwrap();
        assert_eq!(
            built.sql,
            "SELECT COUNT(*) FROM (SELECT id, name FROM a WHERE kind = ? \
             UNION SELECT id, name FROM b) count_src"
        );
        assert_eq!(built.params_debug(), vec!["\"x\""]);
    }

    #[test]
    fn count_query_wraps_distinct() {
        let qb = SelectQb::new()
            .columns(["country"])
            .from("users")
            .distinct()
            .order_by(asc("country"))
            .limit(3);
        assert_eq!(
            qb.count_query().to_sql().unwrap(),
            "SELECT COUNT(*) FROM (SELECT DISTINCT country FROM users) count_src"
        );

        let qb = SelectQb::new()
            .columns(["user_id", "created_at"])
            .from("logins")
            .distinct_on(["user_id"])
            .lock(for_update());
        assert_eq!(
            qb.count_query().to_sql().unwrap(),
            "SELECT COUNT(*) FROM (SELECT DISTINCT ON (user_id) user_id, created_at FROM logins) count_src"
        );
    }
}
