//! `WHERE`/`HAVING` predicate evaluation (spec §4.E Select step 3: "for
//! compound predicates, evaluate the AND/OR tree short-circuiting per
//! node").

use common::Row;
use parser::{CompareOp, Criteria};
use types::Value;

fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> bool {
    use std::cmp::Ordering::*;
    match op {
        CompareOp::Eq => lhs.values_equal(rhs),
        CompareOp::Ne => !lhs.values_equal(rhs),
        _ => match lhs.partial_compare(rhs) {
            Some(ord) => match op {
                CompareOp::Lt => ord == Less,
                CompareOp::Gt => ord == Greater,
                CompareOp::Le => ord != Greater,
                CompareOp::Ge => ord != Less,
                CompareOp::Eq | CompareOp::Ne => unreachable!(),
            },
            None => false,
        },
    }
}

/// Translate a `LIKE` pattern (`%` = any sequence, `_` = any single
/// character) into a case-insensitive anchored match, escaping regex
/// metacharacters first (spec §4.D grammar table).
fn like_match(text: &str, pattern: &str) -> bool {
    let text = text.to_lowercase();
    let pattern = pattern.to_lowercase();
    like_match_chars(text.as_bytes(), pattern.as_bytes())
}

fn like_match_chars(text: &[u8], pattern: &[u8]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some(b'%') => like_match_chars(text, &pattern[1..]) || (!text.is_empty() && like_match_chars(&text[1..], pattern)),
        Some(b'_') => !text.is_empty() && like_match_chars(&text[1..], &pattern[1..]),
        Some(&c) => !text.is_empty() && text[0] == c && like_match_chars(&text[1..], &pattern[1..]),
    }
}

/// Evaluate one predicate tree against `row`. Missing fields compare as
/// `Value::Null`.
pub fn eval(criteria: &Criteria, row: &Row) -> bool {
    match criteria {
        Criteria::Compare { field, op, value } => {
            let lhs = row.get(field).cloned().unwrap_or(Value::Null);
            compare(*op, &lhs, &value.resolve())
        }
        Criteria::Between { field, lo, hi } => {
            let v = row.get(field).cloned().unwrap_or(Value::Null);
            compare(CompareOp::Ge, &v, &lo.resolve()) && compare(CompareOp::Le, &v, &hi.resolve())
        }
        Criteria::In { field, values, negated } => {
            let v = row.get(field).cloned().unwrap_or(Value::Null);
            let hit = values.iter().any(|lit| v.values_equal(&lit.resolve()));
            hit != *negated
        }
        Criteria::Like { field, pattern } => {
            let v = row.get(field);
            match v.and_then(Value::as_str) {
                Some(s) => like_match(s, pattern),
                None => false,
            }
        }
        Criteria::IsNull { field, negated } => {
            let is_null = row.get(field).map(Value::is_null).unwrap_or(true);
            is_null != *negated
        }
        Criteria::And(parts) => parts.iter().all(|c| eval(c, row)),
        Criteria::Or(parts) => parts.iter().any(|c| eval(c, row)),
    }
}

/// If `criteria` is a single equality comparison (no joins, no AND/OR),
/// return the field/value pair so the caller can attempt the index fast
/// path (spec §4.E Select step 4).
pub fn as_single_equality(criteria: &Criteria) -> Option<(&str, Value)> {
    match criteria {
        Criteria::Compare { field, op: CompareOp::Eq, value } => Some((field.as_str(), value.resolve())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::row_of;

    #[test]
    fn like_percent_and_underscore() {
        assert!(like_match("hello", "h%o"));
        assert!(like_match("hello", "h_llo"));
        assert!(!like_match("hello", "h_o"));
        assert!(like_match("HELLO", "hello"));
    }

    #[test]
    fn and_or_short_circuit_tree() {
        let row = row_of([("a", Value::Number(1.0)), ("b", Value::Number(2.0))]);
        let tree = Criteria::Or(vec![
            Criteria::And(vec![
                Criteria::Compare { field: "a".into(), op: CompareOp::Eq, value: parser::Literal::Value(Value::Number(1.0)) },
                Criteria::Compare { field: "b".into(), op: CompareOp::Eq, value: parser::Literal::Value(Value::Number(9.0)) },
            ]),
            Criteria::Compare { field: "b".into(), op: CompareOp::Eq, value: parser::Literal::Value(Value::Number(2.0)) },
        ]);
        assert!(eval(&tree, &row));
    }

    #[test]
    fn missing_field_is_null() {
        let row = row_of([("a", Value::Number(1.0))]);
        assert!(eval(&Criteria::IsNull { field: "missing".into(), negated: false }, &row));
    }
}
