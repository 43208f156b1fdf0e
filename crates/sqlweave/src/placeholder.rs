//! Placeholder rebinding.
//!
//! Builders always emit `?`. Before execution the executor rewrites them into
//! its own syntax with [`Placeholder::rebind`]. Question marks inside single
//! quoted literals or double quoted identifiers are left alone, and `??` is
//! emitted as a single literal `?` (useful for the JSONB `?` operators).

/// Placeholder syntax understood by a driver.
///
/// Only the numbered styles unescape `??`; see [`JsonbOp`](crate::qb::JsonbOp).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placeholder {
    /// `?` (MySQL, SQLite). Rebinding is a no-op.
    Question,
    /// `$1, $2, ...` (PostgreSQL)
    #[default]
    Dollar,
    /// `:arg1, :arg2, ...` (Oracle)
    Named,
    /// `@p1, @p2, ...` (SQL Server)
    At,
}

impl Placeholder {
    /// Rewrite `?` placeholders into this syntax.
    pub fn rebind(self, sql: &str) -> String {
        if self == Placeholder::Question {
            return sql.to_string();
        }

        let mut out = String::with_capacity(sql.len() + 16);
        let mut index = 0usize;
        scan(sql, |token| match token {
            Token::Text(c) => out.push(c),
            Token::Literal => out.push('?'),
            Token::Placeholder => {
                index += 1;
                out.push_str(self.prefix());
                out.push_str(&index.to_string());
            }
        });
        out
    }

    fn prefix(self) -> &'static str {
        match self {
            Placeholder::Question => "?",
            Placeholder::Dollar => "$",
            Placeholder::Named => ":arg",
            Placeholder::At => "@p",
        }
    }
}

/// Count the `?` placeholders in `sql` using the same rules as rebinding.
pub fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    scan(sql, |token| {
        if matches!(token, Token::Placeholder) {
            count += 1;
        }
    });
    count
}

enum Token {
    Text(char),
    /// `??`, an escaped question mark
    Literal,
    Placeholder,
}

fn scan(sql: &str, mut emit: impl FnMut(Token)) {
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            emit(Token::Text(c));
            continue;
        }

        match c {
            '\'' | '"' => {
                quote = Some(c);
                emit(Token::Text(c));
            }
            '?' if chars.peek() == Some(&'?') => {
                chars.next();
                emit(Token::Literal);
            }
            '?' => emit(Token::Placeholder),
            _ => emit(Token::Text(c)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_numbers_in_order() {
        assert_eq!(
            Placeholder::Dollar.rebind("SELECT * FROM t WHERE a = ? AND b IN (?, ?)"),
            "SELECT * FROM t WHERE a = $1 AND b IN ($2, $3)"
        );
    }

    #[test]
    fn question_is_untouched() {
        let sql = "UPDATE t SET a = ? WHERE b = ?";
        assert_eq!(Placeholder::Question.rebind(sql), sql);
    }

    #[test]
    fn question_keeps_doubled_marks() {
        let sql = "SELECT * FROM t WHERE data ?? ? AND id = ?";
        assert_eq!(Placeholder::Question.rebind(sql), sql);
        assert_eq!(count_placeholders(sql), 2);
    }

    #[test]
    fn named_and_at_styles() {
        assert_eq!(Placeholder::Named.rebind("a = ? OR b = ?"), "a = :arg1 OR b = :arg2");
        assert_eq!(Placeholder::At.rebind("a = ? OR b = ?"), "a = @p1 OR b = @p2");
    }

    #[test]
    fn quoted_text_is_skipped() {
        assert_eq!(
            Placeholder::Dollar.rebind("SELECT '?', \"we?rd\" FROM t WHERE x = replace(y, ?, 'it''s?')"),
            "SELECT '?', \"we?rd\" FROM t WHERE x = replace(y, $1, 'it''s?')"
        );
    }

    #[test]
    fn doubled_question_mark_is_literal() {
        assert_eq!(
            Placeholder::Dollar.rebind("SELECT * FROM t WHERE data ?? ? AND id = ?"),
            "SELECT * FROM t WHERE data ? $1 AND id = $2"
        );
        assert_eq!(count_placeholders("data ?? ? AND id = ?"), 2);
    }
}
