//! SQL text helpers for logging and EXPLAIN.

use serde_json::Value;

/// Truncate `sql` to at most `max_bytes`, backing off to a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Truncate for display, appending `...` when anything was cut.
pub(crate) fn truncate_for_log(sql: &str, max_bytes: Option<usize>) -> String {
    match max_bytes {
        Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
        _ => sql.to_string(),
    }
}

/// Inline bound parameters into a statement.
///
/// Positional `?` placeholders consume parameters in order; numbered `$n`
/// placeholders refer to the n-th parameter (1-based). Placeholders inside
/// quoted literals or identifiers are left alone, as are placeholders with
/// no matching parameter. String literals may escape quotes either by
/// doubling them or with a backslash.
///
/// The output is meant for logs and for re-issuing the statement under
/// EXPLAIN; it is not a substitute for parameter binding.
pub fn render_sql(sql: &str, params: &[Value]) -> String {
    if params.is_empty() {
        return sql.to_string();
    }

    let mut out = String::with_capacity(sql.len() + params.len() * 8);
    let mut chars = sql.char_indices().peekable();
    let mut quote: Option<char> = None;
    let mut positional = 0usize;

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' && q != '`' {
                // Backslash escape inside a string literal.
                if let Some((_, escaped)) = chars.next() {
                    out.push(escaped);
                }
                continue;
            }
            if c == q {
                // A doubled quote is an escaped quote.
                if chars.peek().map(|&(_, next)| next) == Some(q) {
                    chars.next();
                    out.push(q);
                } else {
                    quote = None;
                }
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            '?' => {
                match params.get(positional) {
                    Some(value) => push_literal(&mut out, value),
                    None => out.push('?'),
                }
                positional += 1;
            }
            '$' => {
                let mut end = i + 1;
                while let Some(&(j, d)) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    end = j + 1;
                    chars.next();
                }
                let param = sql[i + 1..end]
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|n| params.get(n));
                match param {
                    Some(value) => push_literal(&mut out, value),
                    None => out.push_str(&sql[i..end]),
                }
            }
            _ => out.push(c),
        }
    }

    out
}

fn push_literal(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("NULL"),
        Value::Bool(true) => out.push_str("TRUE"),
        Value::Bool(false) => out.push_str("FALSE"),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => push_quoted(out, s),
        other => push_quoted(out, &other.to_string()),
    }
}

fn push_quoted(out: &mut String, s: &str) {
    out.push('\'');
    out.push_str(&s.replace('\'', "''"));
    out.push('\'');
}
