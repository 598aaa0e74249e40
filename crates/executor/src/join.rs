//! Join execution (spec §4.E Select step 2): hash join for `=`
//! conditions, nested loop otherwise; LEFT/RIGHT/FULL OUTER NULL-fill
//! unmatched sides.

use common::Row;
use parser::{JoinClause, JoinKind};
use std::collections::HashMap;
use types::Value;

fn null_row(fields: &[String]) -> Row {
    fields.iter().map(|f| (f.clone(), Value::Null)).collect()
}

fn field_names(rows: &[Row]) -> Vec<String> {
    rows.first().map(|r| r.keys().cloned().collect()).unwrap_or_default()
}

fn merge(left: &Row, right: &Row) -> Row {
    let mut out = left.clone();
    out.extend(right.clone());
    out
}

/// Apply one join clause, left-to-right (left input accumulates prior
/// joins' output).
pub fn apply(left: Vec<Row>, right: Vec<Row>, join: &JoinClause) -> Vec<Row> {
    let right_fields = field_names(&right);
    let left_fields = field_names(&left);

    match join.kind {
        JoinKind::Cross => {
            let mut out = Vec::with_capacity(left.len() * right.len().max(1));
            for l in &left {
                for r in &right {
                    out.push(merge(l, r));
                }
            }
            out
        }
        _ => hash_or_nested(left, right, join, &left_fields, &right_fields),
    }
}

fn hash_or_nested(
    left: Vec<Row>,
    right: Vec<Row>,
    join: &JoinClause,
    left_fields: &[String],
    right_fields: &[String],
) -> Vec<Row> {
    // Build a hash map over the smaller side, keyed by its join column
    // (spec §4.E Select step 2: "build a hash map over the smaller side").
    let mut out = Vec::new();
    if left.len() <= right.len() {
        let mut index: HashMap<String, Vec<&Row>> = HashMap::new();
        for l in &left {
            if let Some(v) = l.get(&join.left_field) {
                index.entry(key_of(v)).or_default().push(l);
            }
        }
        for r in &right {
            let rk = r.get(&join.right_field).map(key_of);
            let mut any = false;
            if let Some(rk) = rk {
                if let Some(ls) = index.get(&rk) {
                    for l in ls {
                        out.push(merge(l, r));
                        any = true;
                    }
                }
            }
            if !any && matches!(join.kind, JoinKind::Right | JoinKind::FullOuter) {
                out.push(merge(&null_row(left_fields), r));
            }
        }
        if matches!(join.kind, JoinKind::Left | JoinKind::FullOuter) {
            for l in &left {
                let hit = l
                    .get(&join.left_field)
                    .map(|v| {
                        right.iter().any(|r| r.get(&join.right_field).map(|rv| rv.values_equal(v)).unwrap_or(false))
                    })
                    .unwrap_or(false);
                if !hit {
                    out.push(merge(l, &null_row(right_fields)));
                }
            }
        }
        out
    } else {
        // Right side is smaller/equal: swap roles but keep output field
        // order as left-then-right.
        let mut index: HashMap<String, Vec<&Row>> = HashMap::new();
        for r in &right {
            if let Some(v) = r.get(&join.right_field) {
                index.entry(key_of(v)).or_default().push(r);
            }
        }
        for l in &left {
            let lk = l.get(&join.left_field).map(key_of);
            let mut any = false;
            if let Some(lk) = lk {
                if let Some(rs) = index.get(&lk) {
                    for r in rs {
                        out.push(merge(l, r));
                        any = true;
                    }
                }
            }
            if !any && matches!(join.kind, JoinKind::Left | JoinKind::FullOuter) {
                out.push(merge(l, &null_row(right_fields)));
            }
        }
        if matches!(join.kind, JoinKind::Right | JoinKind::FullOuter) {
            for r in &right {
                let hit = r
                    .get(&join.right_field)
                    .map(|v| left.iter().any(|l| l.get(&join.left_field).map(|lv| lv.values_equal(v)).unwrap_or(false)))
                    .unwrap_or(false);
                if !hit {
                    out.push(merge(&null_row(left_fields), r));
                }
            }
        }
        out
    }
}

/// Stable string key for a [`Value`] usable as a hash-map key (values
/// are compared with [`Value::values_equal`] which treats numeric text
/// loosely only via `partial_compare`; the hash key uses the value's
/// canonical display form, which is sufficient because join columns are
/// expected to share a representation type in practice).
fn key_of(v: &Value) -> String {
    match v {
        Value::Number(n) => format!("n:{n}"),
        Value::Text(s) => format!("s:{s}"),
        Value::Bool(b) => format!("b:{b}"),
        Value::Null => "null".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::row_of;

    #[test]
    fn inner_join_matches_on_equality() {
        let emp = vec![row_of([("id", Value::Number(1.0)), ("dept", Value::Number(10.0))])];
        let dept = vec![row_of([("id", Value::Number(10.0)), ("name", Value::Text("eng".into()))])];
        let clause = JoinClause {
            kind: JoinKind::Inner,
            table: "departments".into(),
            left_field: "dept".into(),
            right_field: "id".into(),
        };
        let out = apply(emp, dept, &clause);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("name").unwrap().as_str(), Some("eng"));
    }

    #[test]
    fn left_join_null_fills_unmatched() {
        let emp = vec![
            row_of([("id", Value::Number(1.0)), ("dept", Value::Number(10.0))]),
            row_of([("id", Value::Number(2.0)), ("dept", Value::Number(20.0))]),
            row_of([("id", Value::Number(3.0)), ("dept", Value::Null)]),
        ];
        let dept = vec![row_of([("id", Value::Number(10.0)), ("name", Value::Text("eng".into()))])];
        let clause = JoinClause {
            kind: JoinKind::Left,
            table: "departments".into(),
            left_field: "dept".into(),
            right_field: "id".into(),
        };
        let out = apply(emp, dept, &clause);
        assert_eq!(out.len(), 3);
        let unmatched: Vec<_> = out.iter().filter(|r| r.get("name").map(Value::is_null).unwrap_or(true)).collect();
        assert_eq!(unmatched.len(), 2);
    }

    #[test]
    fn cross_join_is_cartesian_product() {
        let a = vec![row_of([("x", Value::Number(1.0))]), row_of([("x", Value::Number(2.0))])];
        let b = vec![row_of([("y", Value::Number(1.0))]), row_of([("y", Value::Number(2.0))])];
        let clause =
            JoinClause { kind: JoinKind::Cross, table: "b".into(), left_field: String::new(), right_field: String::new() };
        assert_eq!(apply(a, b, &clause).len(), 4);
    }
}
