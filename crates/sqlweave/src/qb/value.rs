//! Values that can appear in value positions: bound parameters, verbatim
//! SQL fragments, update functions, JSONB builders and integer lists.

use crate::qb::jsonb::JsonbBuilder;
use crate::qb::param::{Param, ParamList};
use tokio_postgres::types::ToSql;

/// A fragment spliced into SQL verbatim instead of being bound.
///
/// Use it for column references, function calls such as `NOW()`, or aliases
/// introduced by a WITH statement. The fragment may contain its own `?`
/// placeholders, in which case `bindings` supplies their values in order.
///
/// Never build an `Indirect` from user input.
#[derive(Clone, Debug)]
pub struct Indirect {
    pub reference: String,
    pub bindings: Vec<Param>,
}

impl Indirect {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            bindings: Vec::new(),
        }
    }

    /// A fragment carrying bindings for its own placeholders.
    pub fn with_bindings(reference: impl Into<String>, bindings: Vec<Param>) -> Self {
        Self {
            reference: reference.into(),
            bindings,
        }
    }
}

/// Shorthand for [`Indirect::new`].
pub fn indirect(reference: impl Into<String>) -> Indirect {
    Indirect::new(reference)
}

/// Shorthand for [`Indirect::with_bindings`].
pub fn indirect_with(reference: impl Into<String>, bindings: Vec<Param>) -> Indirect {
    Indirect::with_bindings(reference, bindings)
}

/// A SQL function call used as the right-hand side of an assignment, e.g.
/// `tags = array_append(tags, ?)`.
#[derive(Clone, Debug)]
pub struct UpdateFunction {
    pub name: String,
    pub args: Vec<Value>,
}

/// Call `name` with the given arguments.
pub fn update_fn(name: impl Into<String>, args: impl IntoIterator<Item = Value>) -> UpdateFunction {
    UpdateFunction {
        name: name.into(),
        args: args.into_iter().collect(),
    }
}

/// `array_append(col, value)`
pub fn array_append(col: &str, value: impl IntoValue) -> UpdateFunction {
    update_fn("array_append", [Value::from(indirect(col)), value.into_value()])
}

/// `array_prepend(value, col)`
pub fn array_prepend(col: &str, value: impl IntoValue) -> UpdateFunction {
    update_fn("array_prepend", [value.into_value(), Value::from(indirect(col))])
}

/// `array_remove(col, value)`
pub fn array_remove(col: &str, value: impl IntoValue) -> UpdateFunction {
    update_fn("array_remove", [Value::from(indirect(col)), value.into_value()])
}

/// `array_cat(col, value)`
pub fn array_concat(col: &str, value: impl IntoValue) -> UpdateFunction {
    update_fn("array_cat", [Value::from(indirect(col)), value.into_value()])
}

/// Any value that can sit where SQL expects a value.
#[derive(Clone, Debug)]
pub enum Value {
    /// Rendered as `?` with one binding
    Bind(Param),
    /// Rendered verbatim, plus the fragment's own bindings
    Indirect(Indirect),
    /// Rendered as `name(arg, ...)`
    Function(UpdateFunction),
    /// Rendered as a `jsonb_build_object(...)` / `jsonb_build_array(...)` call
    Jsonb(JsonbBuilder),
    /// Rendered as a single `?` bound to the whole list as `int8[]`
    IntArray(Vec<i64>),
}

impl Value {
    /// Render this value, pushing its bindings in placeholder order.
    pub fn build(&self, params: &mut ParamList) -> String {
        match self {
            Value::Bind(param) => {
                params.push_param(param.clone());
                "?".to_string()
            }
            Value::Indirect(indirect) => {
                params.extend_params(indirect.bindings.iter().cloned());
                indirect.reference.clone()
            }
            Value::Function(func) => {
                let args: Vec<String> = func.args.iter().map(|arg| arg.build(params)).collect();
                format!("{}({})", func.name, args.join(", "))
            }
            Value::Jsonb(builder) => builder.build(params),
            Value::IntArray(items) => {
                params.push(items.clone());
                "?".to_string()
            }
        }
    }
}

impl From<Indirect> for Value {
    fn from(value: Indirect) -> Self {
        Value::Indirect(value)
    }
}

impl From<UpdateFunction> for Value {
    fn from(value: UpdateFunction) -> Self {
        Value::Function(value)
    }
}

impl From<JsonbBuilder> for Value {
    fn from(value: JsonbBuilder) -> Self {
        Value::Jsonb(value)
    }
}

impl From<Param> for Value {
    fn from(value: Param) -> Self {
        Value::Bind(value)
    }
}

/// Bind a list of integers as one `int8[]` parameter instead of one binding
/// per element: `id = ANY(?)`.
pub fn int_array(items: impl IntoIterator<Item = i64>) -> Value {
    Value::IntArray(items.into_iter().collect())
}

/// Conversion into a [`Value`].
///
/// Every `ToSql` type becomes a bound value; the marker types of this module
/// keep their own rendering.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl<T: ToSql + Send + Sync + 'static> IntoValue for T {
    fn into_value(self) -> Value {
        Value::Bind(Param::new(self))
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for Indirect {
    fn into_value(self) -> Value {
        Value::Indirect(self)
    }
}

impl IntoValue for UpdateFunction {
    fn into_value(self) -> Value {
        Value::Function(self)
    }
}

impl IntoValue for JsonbBuilder {
    fn into_value(self) -> Value {
        Value::Jsonb(self)
    }
}

impl IntoValue for Param {
    fn into_value(self) -> Value {
        Value::Bind(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(value: impl IntoValue) -> (String, Vec<String>) {
        let mut params = ParamList::new();
        let sql = value.into_value().build(&mut params);
        let params = params.into_vec().iter().map(|p| format!("{p:?}")).collect();
        (sql, params)
    }

    #[test]
    fn bound_value_is_a_placeholder() {
        assert_eq!(render(5_i32), ("?".to_string(), vec!["5".to_string()]));
    }

    #[test]
    fn indirect_is_verbatim_with_own_bindings() {
        assert_eq!(render(indirect("NOW()")), ("NOW()".to_string(), vec![]));
        assert_eq!(
            render(indirect_with("replace(name, ?, '')", vec![Param::new("x")])),
            ("replace(name, ?, '')".to_string(), vec!["\"x\"".to_string()])
        );
    }

    #[test]
    fn array_functions() {
        assert_eq!(
            render(array_append("tags", "new")),
            ("array_append(tags, ?)".to_string(), vec!["\"new\"".to_string()])
        );
        assert_eq!(
            render(array_prepend("tags", "first")),
            ("array_prepend(?, tags)".to_string(), vec!["\"first\"".to_string()])
        );
        assert_eq!(render(array_remove("tags", "old")).0, "array_remove(tags, ?)");
        assert_eq!(render(array_concat("tags", indirect("other_tags"))).0, "array_cat(tags, other_tags)");
    }

    #[test]
    fn int_array_binds_one_array() {
        assert_eq!(
            render(int_array([1, 2, 3])),
            ("?".to_string(), vec!["[1, 2, 3]".to_string()])
        );
    }

    #[test]
    fn int_array_encodes_as_int8_array() {
        use bytes::BytesMut;
        use tokio_postgres::types::Type;

        let mut params = ParamList::new();
        int_array([1, 2, 3]).build(&mut params);
        let params = params.into_vec();
        assert_eq!(params.len(), 1);

        let mut buf = BytesMut::new();
        assert!(params[0].as_ref().to_sql_checked(&Type::INT8_ARRAY, &mut buf).is_ok());
        assert!(!buf.is_empty());
        assert!(params[0].as_ref().to_sql_checked(&Type::TEXT, &mut BytesMut::new()).is_err());
    }
}
