//! Condition algebra for WHERE, HAVING and JOIN ... ON clauses.
//!
//! A [`Condition`] renders itself into SQL with `?` placeholders and pushes
//! exactly one binding per placeholder, in textual order, into the shared
//! [`ParamList`]. Conditions are built with the free constructor functions of
//! this module (`eq`, `or`, `in_list`, `eq_any`, `exists`, ...).

use crate::qb::param::{Param, ParamList};
use crate::qb::select::SelectQb;
use crate::qb::value::{IntoValue, Value, indirect};
use std::borrow::Cow;

/// Quantifier of an array comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantifier {
    Any,
    All,
}

impl Quantifier {
    fn as_str(self) -> &'static str {
        match self {
            Quantifier::Any => "ANY",
            Quantifier::All => "ALL",
        }
    }
}

/// PostgreSQL JSONB operators usable with [`jsonb_op`].
///
/// The key-existence operators are written as `??`, `??|` and `??&`, which
/// placeholder rebinding turns back into `?`, `?|` and `?&`. They are only
/// valid under the numbered styles (`Dollar`, `Named`, `At`):
/// [`Placeholder::Question`](crate::Placeholder::Question) passes the text
/// through unchanged, so the doubled mark would reach the server as is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JsonbOp {
    /// `@>`
    Contains,
    /// `<@`
    ContainedBy,
    /// `?`
    HasKey,
    /// `?|`
    HasAnyKey,
    /// `?&`
    HasAllKeys,
    /// `||`
    Concat,
    /// `-`
    Minus,
    /// `#-`
    DeletePath,
}

impl JsonbOp {
    pub fn as_str(self) -> &'static str {
        match self {
            JsonbOp::Contains => "@>",
            JsonbOp::ContainedBy => "<@",
            JsonbOp::HasKey => "??",
            JsonbOp::HasAnyKey => "??|",
            JsonbOp::HasAllKeys => "??&",
            JsonbOp::Concat => "||",
            JsonbOp::Minus => "-",
            JsonbOp::DeletePath => "#-",
        }
    }
}

/// A predicate.
#[derive(Clone, Debug)]
pub enum Condition {
    /// `left OP [right]`
    Simple {
        left: String,
        operator: Cow<'static, str>,
        right: Option<Value>,
    },

    /// `(c1 AND c2 ...)` or `(c1 OR c2 ...)`
    AndOr { is_or: bool, children: Vec<Condition> },

    /// `KEYWORD (inner)`
    Pre {
        keyword: &'static str,
        inner: Box<Condition>,
    },

    /// `column [NOT] IN (v1, v2, ...)`
    In {
        negated: bool,
        column: String,
        values: Vec<Value>,
    },

    /// `left OP ANY|ALL(right)`
    Array {
        left: Value,
        operator: Cow<'static, str>,
        quantifier: Quantifier,
        right: Value,
    },

    /// `[column] OPERATOR (SELECT ...)`
    Subquery {
        column: Option<String>,
        operator: &'static str,
        stmt: Box<SelectQb>,
    },

    /// Verbatim SQL with its own bindings.
    Raw { sql: String, params: Vec<Param> },
}

impl Condition {
    /// Render the condition, pushing its bindings in placeholder order.
    pub fn build(&self, params: &mut ParamList) -> String {
        match self {
            Condition::Simple {
                left,
                operator,
                right,
            } => match right {
                Some(value) => format!("{} {} {}", left, operator, value.build(params)),
                None => format!("{} {}", left, operator),
            },
            Condition::AndOr { .. } => format!("({})", self.build_bare(params)),
            Condition::Pre { keyword, inner } => {
                format!("{} ({})", keyword, inner.build_bare(params))
            }
            Condition::In {
                negated,
                column,
                values,
            } => {
                if values.is_empty() {
                    return if *negated { "1=1" } else { "1=0" }.to_string();
                }
                let items: Vec<String> = values.iter().map(|v| v.build(params)).collect();
                let keyword = if *negated { "NOT IN" } else { "IN" };
                format!("{} {} ({})", column, keyword, items.join(", "))
            }
            Condition::Array {
                left,
                operator,
                quantifier,
                right,
            } => {
                let left = left.build(params);
                let right = right.build(params);
                format!("{} {} {}({})", left, operator, quantifier.as_str(), right)
            }
            Condition::Subquery {
                column,
                operator,
                stmt,
            } => {
                let sub = stmt.render(params);
                match column {
                    Some(column) => format!("{} {} ({})", column, operator, sub),
                    None => format!("{} ({})", operator, sub),
                }
            }
            Condition::Raw { sql, params: binds } => {
                params.extend_params(binds.iter().cloned());
                sql.clone()
            }
        }
    }

    /// Render without the outer parentheses of an AND/OR group.
    pub(crate) fn build_bare(&self, params: &mut ParamList) -> String {
        match self {
            Condition::AndOr { is_or, children } => join_children(*is_or, children, params),
            other => other.build(params),
        }
    }
}

fn join_children(is_or: bool, children: &[Condition], params: &mut ParamList) -> String {
    if children.is_empty() {
        return if is_or { "1=0" } else { "1=1" }.to_string();
    }
    let separator = if is_or { " OR " } else { " AND " };
    children
        .iter()
        .map(|c| c.build(params))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Render a list of conditions as one AND-joined expression.
///
/// Returns an empty string for an empty list; the caller then skips the
/// clause keyword. The outermost group is never parenthesized.
pub fn parse_conditions(conditions: &[Condition], params: &mut ParamList) -> String {
    match conditions {
        [] => String::new(),
        [single] => single.build_bare(params),
        many => join_children(false, many, params),
    }
}

fn simple(left: impl Into<String>, operator: &'static str, right: Option<Value>) -> Condition {
    Condition::Simple {
        left: left.into(),
        operator: Cow::Borrowed(operator),
        right,
    }
}

/// `left OP right` with an arbitrary operator.
pub fn compare(
    left: impl Into<String>,
    operator: impl Into<Cow<'static, str>>,
    right: impl IntoValue,
) -> Condition {
    Condition::Simple {
        left: left.into(),
        operator: operator.into(),
        right: Some(right.into_value()),
    }
}

/// `col = value`
pub fn eq(col: impl Into<String>, value: impl IntoValue) -> Condition {
    simple(col, "=", Some(value.into_value()))
}

/// `col <> value`
pub fn ne(col: impl Into<String>, value: impl IntoValue) -> Condition {
    simple(col, "<>", Some(value.into_value()))
}

/// `col > value`
pub fn gt(col: impl Into<String>, value: impl IntoValue) -> Condition {
    simple(col, ">", Some(value.into_value()))
}

/// `col >= value`
pub fn gte(col: impl Into<String>, value: impl IntoValue) -> Condition {
    simple(col, ">=", Some(value.into_value()))
}

/// `col < value`
pub fn lt(col: impl Into<String>, value: impl IntoValue) -> Condition {
    simple(col, "<", Some(value.into_value()))
}

/// `col <= value`
pub fn lte(col: impl Into<String>, value: impl IntoValue) -> Condition {
    simple(col, "<=", Some(value.into_value()))
}

/// `col LIKE pattern`
pub fn like(col: impl Into<String>, pattern: impl IntoValue) -> Condition {
    simple(col, "LIKE", Some(pattern.into_value()))
}

/// `col NOT LIKE pattern`
pub fn not_like(col: impl Into<String>, pattern: impl IntoValue) -> Condition {
    simple(col, "NOT LIKE", Some(pattern.into_value()))
}

/// `col ILIKE pattern`
pub fn ilike(col: impl Into<String>, pattern: impl IntoValue) -> Condition {
    simple(col, "ILIKE", Some(pattern.into_value()))
}

/// `col NOT ILIKE pattern`
pub fn not_ilike(col: impl Into<String>, pattern: impl IntoValue) -> Condition {
    simple(col, "NOT ILIKE", Some(pattern.into_value()))
}

/// `col IS NULL`
pub fn is_null(col: impl Into<String>) -> Condition {
    simple(col, "IS NULL", None)
}

/// `col IS NOT NULL`
pub fn is_not_null(col: impl Into<String>) -> Condition {
    simple(col, "IS NOT NULL", None)
}

/// `left OP value` using a JSONB operator.
pub fn jsonb_op(op: JsonbOp, left: impl Into<String>, value: impl IntoValue) -> Condition {
    simple(left, op.as_str(), Some(value.into_value()))
}

/// `(c1 AND c2 ...)`. Passing several conditions to a WHERE clause already
/// ANDs them, so this is mostly useful inside [`or`].
pub fn and(conditions: impl IntoIterator<Item = Condition>) -> Condition {
    Condition::AndOr {
        is_or: false,
        children: conditions.into_iter().collect(),
    }
}

/// `(c1 OR c2 ...)`
pub fn or(conditions: impl IntoIterator<Item = Condition>) -> Condition {
    Condition::AndOr {
        is_or: true,
        children: conditions.into_iter().collect(),
    }
}

/// `NOT (condition)`
pub fn not(condition: Condition) -> Condition {
    Condition::Pre {
        keyword: "NOT",
        inner: Box::new(condition),
    }
}

/// `col IN (v1, v2, ...)`; an empty list renders `1=0`.
pub fn in_list<V: IntoValue>(col: impl Into<String>, values: impl IntoIterator<Item = V>) -> Condition {
    Condition::In {
        negated: false,
        column: col.into(),
        values: values.into_iter().map(IntoValue::into_value).collect(),
    }
}

/// `col NOT IN (v1, v2, ...)`; an empty list renders `1=1`.
pub fn not_in<V: IntoValue>(col: impl Into<String>, values: impl IntoIterator<Item = V>) -> Condition {
    Condition::In {
        negated: true,
        column: col.into(),
        values: values.into_iter().map(IntoValue::into_value).collect(),
    }
}

/// `EXISTS (SELECT ...)`
pub fn exists(stmt: SelectQb) -> Condition {
    Condition::Subquery {
        column: None,
        operator: "EXISTS",
        stmt: Box::new(stmt),
    }
}

/// `NOT EXISTS (SELECT ...)`
pub fn not_exists(stmt: SelectQb) -> Condition {
    Condition::Subquery {
        column: None,
        operator: "NOT EXISTS",
        stmt: Box::new(stmt),
    }
}

/// `col IN (SELECT ...)`
pub fn in_select(col: impl Into<String>, stmt: SelectQb) -> Condition {
    Condition::Subquery {
        column: Some(col.into()),
        operator: "IN",
        stmt: Box::new(stmt),
    }
}

/// `col NOT IN (SELECT ...)`
pub fn not_in_select(col: impl Into<String>, stmt: SelectQb) -> Condition {
    Condition::Subquery {
        column: Some(col.into()),
        operator: "NOT IN",
        stmt: Box::new(stmt),
    }
}

/// Verbatim SQL condition. Use `?` for placeholders whatever the driver.
pub fn sql_cond(sql: impl Into<String>, params: Vec<Param>) -> Condition {
    Condition::Raw {
        sql: sql.into(),
        params,
    }
}

/// `left OP ANY|ALL(right)` with arbitrary operands.
pub fn array_cmp(
    left: impl IntoValue,
    operator: impl Into<Cow<'static, str>>,
    quantifier: Quantifier,
    right: impl IntoValue,
) -> Condition {
    Condition::Array {
        left: left.into_value(),
        operator: operator.into(),
        quantifier,
        right: right.into_value(),
    }
}

fn array_col(value: impl IntoValue, operator: &'static str, quantifier: Quantifier, col: &str) -> Condition {
    array_cmp(value, operator, quantifier, indirect(col))
}

macro_rules! array_constructors {
    ($($name:ident => $op:literal, $quantifier:ident;)*) => {
        $(
            #[doc = concat!("`value ", $op, " ", stringify!($quantifier), "(col)` on an array column")]
            pub fn $name(col: &str, value: impl IntoValue) -> Condition {
                array_col(value, $op, Quantifier::$quantifier, col)
            }
        )*
    };
}

array_constructors! {
    eq_any => "=", Any;
    ne_any => "<>", Any;
    lt_any => "<", Any;
    lte_any => "<=", Any;
    gt_any => ">", Any;
    gte_any => ">=", Any;
    eq_all => "=", All;
    ne_all => "<>", All;
    lt_all => "<", All;
    lte_all => "<=", All;
    gt_all => ">", All;
    gte_all => ">=", All;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qb::value::{indirect_with, int_array};

    fn render(conditions: &[Condition]) -> (String, Vec<String>) {
        let mut params = ParamList::new();
        let sql = parse_conditions(conditions, &mut params);
        (sql, params.into_vec().iter().map(|p| format!("{p:?}")).collect())
    }

    #[test]
    fn empty_list_renders_nothing() {
        assert_eq!(render(&[]), (String::new(), vec![]));
    }

    #[test]
    fn single_condition_is_not_wrapped() {
        assert_eq!(render(&[eq("id", 1)]), ("id = ?".to_string(), vec!["1".to_string()]));
    }

    #[test]
    fn several_conditions_are_anded() {
        let (sql, params) = render(&[eq("a", 1), gt("b", 2), is_null("c")]);
        assert_eq!(sql, "a = ? AND b > ? AND c IS NULL");
        assert_eq!(params, vec!["1", "2"]);
    }

    #[test]
    fn lone_group_loses_outer_parens_only() {
        let (sql, params) = render(&[or([eq("a", 1), and([eq("b", 2), lt("c", 3)])])]);
        assert_eq!(sql, "a = ? OR (b = ? AND c < ?)");
        assert_eq!(params, vec!["1", "2", "3"]);
    }

    #[test]
    fn group_next_to_other_conditions_keeps_parens() {
        let (sql, _) = render(&[eq("a", 1), or([eq("b", 2), eq("b", 3)])]);
        assert_eq!(sql, "a = ? AND (b = ? OR b = ?)");
    }

    #[test]
    fn empty_groups() {
        assert_eq!(render(&[and([])]).0, "1=1");
        assert_eq!(render(&[or([])]).0, "1=0");
        assert_eq!(render(&[eq("a", 1), or([])]).0, "a = ? AND (1=0)");
    }

    #[test]
    fn indirect_right_side_has_no_binding() {
        let (sql, params) = render(&[eq("a.id", indirect("b.id")), ne("created", indirect("NOW()"))]);
        assert_eq!(sql, "a.id = b.id AND created <> NOW()");
        assert!(params.is_empty());
    }

    #[test]
    fn indirect_with_bindings() {
        let (sql, params) = render(&[eq(
            "slug",
            indirect_with("replace(name, ?, '')", vec![Param::new(" ")]),
        )]);
        assert_eq!(sql, "slug = replace(name, ?, '')");
        assert_eq!(params, vec!["\" \""]);
    }

    #[test]
    fn not_wraps_inner() {
        assert_eq!(render(&[not(eq("a", 1))]).0, "NOT (a = ?)");
        assert_eq!(render(&[not(or([eq("a", 1), eq("b", 2)]))]).0, "NOT (a = ? OR b = ?)");
    }

    #[test]
    fn in_conditions() {
        let (sql, params) = render(&[in_list("id", [1, 2, 3, 4])]);
        assert_eq!(sql, "id IN (?, ?, ?, ?)");
        assert_eq!(params, vec!["1", "2", "3", "4"]);

        assert_eq!(render(&[not_in("name", ["a", "b"])]).0, "name NOT IN (?, ?)");
        assert_eq!(render(&[in_list("id", Vec::<i64>::new())]).0, "1=0");
        assert_eq!(render(&[not_in("id", Vec::<i64>::new())]).0, "1=1");
    }

    #[test]
    fn array_conditions() {
        let (sql, params) = render(&[eq_any("tags", "x"), ne_all("flags", indirect("NOW()"))]);
        assert_eq!(sql, "? = ANY(tags) AND NOW() <> ALL(flags)");
        assert_eq!(params, vec!["\"x\""]);

        let (sql, params) = render(&[array_cmp(indirect("id"), "=", Quantifier::Any, int_array([1, 2, 3]))]);
        assert_eq!(sql, "id = ANY(?)");
        assert_eq!(params, vec!["[1, 2, 3]"]);
    }

    #[test]
    fn jsonb_operators() {
        let (sql, _) = render(&[
            jsonb_op(JsonbOp::Contains, "data", "{\"a\":1}"),
            jsonb_op(JsonbOp::HasKey, "data", "a"),
        ]);
        assert_eq!(sql, "data @> ? AND data ?? ?");
        assert_eq!(crate::placeholder::count_placeholders(&sql), 2);
    }

    #[test]
    fn raw_condition_passes_through() {
        let (sql, params) = render(&[sql_cond("a BETWEEN ? AND ?", vec![Param::new(1), Param::new(5)])]);
        assert_eq!(sql, "a BETWEEN ? AND ?");
        assert_eq!(params, vec!["1", "5"]);
    }

    #[test]
    fn exists_renders_subselect_with_its_bindings() {
        let sub = SelectQb::new()
            .columns(["1"])
            .from("orders o")
            .and_where(eq("o.user_id", indirect("u.id")))
            .and_where(gt("o.total", 100));
        let (sql, params) = render(&[exists(sub), eq("u.active", true)]);
        assert_eq!(
            sql,
            "EXISTS (SELECT 1 FROM orders o WHERE o.user_id = u.id AND o.total > ?) AND u.active = ?"
        );
        assert_eq!(params, vec!["100", "true"]);
    }

    #[test]
    fn in_select_renders_column() {
        let sub = SelectQb::new().columns(["user_id"]).from("bans");
        assert_eq!(
            render(&[not_in_select("id", sub)]).0,
            "id NOT IN (SELECT user_id FROM bans)"
        );
    }
}
