//! SET run-time parameter command.

use crate::error::SqlResult;
use crate::qb::param::BuiltQuery;
use crate::qb::traits::{MutationQb, SqlQb};
use std::time::Duration;

/// Scope of a `SET` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetLevel {
    /// Lasts until the end of the current transaction.
    Local,
    /// Lasts for the session (PostgreSQL's default).
    Session,
}

impl SetLevel {
    fn keyword(self) -> &'static str {
        match self {
            SetLevel::Local => "LOCAL",
            SetLevel::Session => "SESSION",
        }
    }
}

/// `SET [LOCAL | SESSION] param TO value`
///
/// PostgreSQL does not accept bind parameters in SET, so the value is
/// spliced into the text as given and the statement carries no bindings.
#[derive(Clone, Debug)]
pub struct SetQb {
    param: String,
    value: String,
    level: Option<SetLevel>,
}

impl SetQb {
    pub fn new(param: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            value: value.into(),
            level: None,
        }
    }

    pub fn local(self) -> Self {
        self.level(SetLevel::Local)
    }

    pub fn session(self) -> Self {
        self.level(SetLevel::Session)
    }

    pub fn level(mut self, level: SetLevel) -> Self {
        self.level = Some(level);
        self
    }

    fn render(&self) -> String {
        match self.level {
            Some(level) => format!("SET {} {} TO {}", level.keyword(), self.param, self.value),
            None => format!("SET {} TO {}", self.param, self.value),
        }
    }
}

/// `SET LOCAL statement_timeout TO "<ms>ms"`, scoped to the running transaction.
pub fn set_timeout(timeout: Duration) -> SetQb {
    SetQb::new("statement_timeout", format!("\"{}ms\"", timeout.as_millis())).local()
}

impl SqlQb for SetQb {
    fn build(&self) -> SqlResult<BuiltQuery> {
        Ok(BuiltQuery::new(self.render(), Vec::new()))
    }
}

impl MutationQb for SetQb {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels() {
        assert_eq!(SetQb::new("search_path", "app").to_sql().unwrap(), "SET search_path TO app");
        assert_eq!(
            SetQb::new("search_path", "app").local().to_sql().unwrap(),
            "SET LOCAL search_path TO app"
        );
        assert_eq!(
            SetQb::new("work_mem", "'64MB'").session().to_sql().unwrap(),
            "SET SESSION work_mem TO '64MB'"
        );
    }

    #[test]
    fn statement_timeout() {
        let built = set_timeout(Duration::from_secs(3)).build().unwrap();
        assert_eq!(built.sql, "SET LOCAL statement_timeout TO \"3000ms\"");
        assert!(built.params.is_empty());
    }
}
