//! `?` → `$n` placeholder rewrite for the PostgreSQL store.
//!
//! Callers write every statement in the SQLite `?` dialect. Before a statement
//! reaches PostgreSQL each bare `?` becomes `$1`, `$2`, … in left-to-right
//! order. Question marks inside single-quoted literals, double-quoted
//! identifiers, `--` comments and `/* */` comments are copied through.
//!
//! Not recognised: dollar-quoted strings (`$$ … $$`) and the PostgreSQL JSON
//! operators `?`, `?|`, `?&`. Statements using either must not go through the
//! facade.

use std::borrow::Cow;

/// Rewrite positional `?` placeholders to PostgreSQL's numbered form.
///
/// Returns the input untouched (borrowed) when it holds no placeholder.
pub fn rewrite_placeholders(sql: &str) -> Cow<'_, str> {
    if !sql.contains('?') {
        return Cow::Borrowed(sql);
    }

    let mut out = String::with_capacity(sql.len() + 8);
    let mut next = 1usize;
    let mut state = Scan::Code;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            Scan::Code => match c {
                '?' => {
                    out.push('$');
                    out.push_str(&next.to_string());
                    next += 1;
                    continue;
                }
                '\'' => state = Scan::Literal,
                '"' => state = Scan::Identifier,
                '-' if chars.peek() == Some(&'-') => state = Scan::LineComment,
                '/' if chars.peek() == Some(&'*') => {
                    out.push(c);
                    out.push('*');
                    chars.next();
                    state = Scan::BlockComment;
                    continue;
                }
                _ => {}
            },
            // A doubled quote is an escaped quote; the second one reopens the
            // literal on the next iteration.
            Scan::Literal if c == '\'' => state = Scan::Code,
            Scan::Identifier if c == '"' => state = Scan::Code,
            Scan::LineComment if c == '\n' => state = Scan::Code,
            Scan::BlockComment if c == '*' && chars.peek() == Some(&'/') => {
                out.push(c);
                out.push('/');
                chars.next();
                state = Scan::Code;
                continue;
            }
            _ => {}
        }
        out.push(c);
    }

    Cow::Owned(out)
}

#[derive(Clone, Copy)]
enum Scan {
    Code,
    Literal,
    Identifier,
    LineComment,
    BlockComment,
}
