//! `AGGREGATE` execution (spec §4.E "Aggregate"): `COUNT/SUM/AVG/MIN/MAX`
//! with optional `GROUP BY` and post-aggregation `HAVING`.

use crate::{criteria, scan};
use catalog::Catalog;
use common::{DbResult, Row};
use parser::{AggFunc, AggregateStmt};
use std::collections::BTreeMap;
use storage::Pager;
use types::Value;

#[derive(Default, Clone)]
struct Accumulator {
    count: u64,
    non_null_count: u64,
    sum: f64,
    min: Option<Value>,
    max: Option<Value>,
}

impl Accumulator {
    fn observe(&mut self, value: Option<&Value>) {
        self.count += 1;
        if let Some(v) = value {
            if !v.is_null() {
                self.non_null_count += 1;
                if let Some(n) = v.as_number() {
                    self.sum += n;
                }
                self.min = Some(match &self.min {
                    Some(cur) if cur.partial_compare(v) == Some(std::cmp::Ordering::Greater) => v.clone(),
                    Some(cur) => cur.clone(),
                    None => v.clone(),
                });
                self.max = Some(match &self.max {
                    Some(cur) if cur.partial_compare(v) == Some(std::cmp::Ordering::Less) => v.clone(),
                    Some(cur) => cur.clone(),
                    None => v.clone(),
                });
            }
        }
    }

    fn finish(&self, func: AggFunc) -> Value {
        match func {
            AggFunc::Count => Value::Number(self.count as f64),
            AggFunc::Sum => Value::Number(self.sum),
            AggFunc::Avg => {
                if self.non_null_count == 0 {
                    Value::Null
                } else {
                    Value::Number(self.sum / self.non_null_count as f64)
                }
            }
            AggFunc::Min => self.min.clone().unwrap_or(Value::Null),
            AggFunc::Max => self.max.clone().unwrap_or(Value::Null),
        }
    }
}

fn group_key(row: &Row, group_by: &[String]) -> Vec<Value> {
    group_by.iter().map(|f| row.get(f).cloned().unwrap_or(Value::Null)).collect()
}

/// Evaluate one aggregate statement, returning one result row per group
/// (a single row if `group_by` is empty).
pub fn run(pager: &mut Pager, catalog: &Catalog, stmt: &AggregateStmt) -> DbResult<Vec<Row>> {
    let rows = scan::filtered_scan(pager, catalog, &stmt.table, stmt.criteria.as_ref())?;

    let mut groups: BTreeMap<Vec<String>, (Vec<Value>, Vec<Accumulator>)> = BTreeMap::new();
    for (_, row) in &rows {
        let key = group_key(row, &stmt.group_by);
        let key_str: Vec<String> = key.iter().map(display_key).collect();
        let entry = groups.entry(key_str).or_insert_with(|| (key.clone(), vec![Accumulator::default(); stmt.items.len()]));
        for (acc, item) in entry.1.iter_mut().zip(&stmt.items) {
            match &item.field {
                Some(f) => acc.observe(row.get(f)),
                None => acc.observe(Some(&Value::Number(1.0))),
            }
        }
    }

    let mut out = Vec::new();
    for (_, (keys, accs)) in groups {
        let mut result = Row::new();
        for (field, value) in stmt.group_by.iter().zip(&keys) {
            result.insert(field.clone(), value.clone());
        }
        for (item, acc) in stmt.items.iter().zip(&accs) {
            result.insert(item.func.alias(item.field.as_deref()), acc.finish(item.func));
        }
        if let Some(having) = &stmt.having {
            if !criteria::eval(having, &result) {
                continue;
            }
        }
        out.push(result);
    }
    Ok(out)
}

fn display_key(v: &Value) -> String {
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
    use parser::AggregateItem;
    use tempfile::tempdir;

    fn open() -> (tempfile::TempDir, Pager) {
        let dir = tempdir().unwrap();
        let pager = Pager::open(dir.path().join("t.sawit"), 32).unwrap();
        (dir, pager)
    }

    #[test]
    fn count_star_counts_all_rows() {
        let (_d, mut pager) = open();
        let mut catalog = Catalog::open(&mut pager).unwrap();
        let entry = catalog.tables.create_table(&mut pager, "t").unwrap();
        let mut last = entry.last_page;
        for i in 0..3 {
            let (new_last, _) =
                storage::heap::append_row(&mut pager, last, &row_of([("id", Value::Number(i as f64))])).unwrap();
            last = new_last;
        }
        let stmt = AggregateStmt {
            table: "t".into(),
            group_by: vec![],
            items: vec![AggregateItem { func: AggFunc::Count, field: None }],
            criteria: None,
            having: None,
        };
        let out = run(&mut pager, &catalog, &stmt).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("count_star"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn avg_over_empty_set_is_null() {
        let (_d, mut pager) = open();
        let mut catalog = Catalog::open(&mut pager).unwrap();
        catalog.tables.create_table(&mut pager, "t").unwrap();
        let stmt = AggregateStmt {
            table: "t".into(),
            group_by: vec![],
            items: vec![AggregateItem { func: AggFunc::Avg, field: Some("n".into()) }],
            criteria: None,
            having: None,
        };
        let out = run(&mut pager, &catalog, &stmt).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn group_by_buckets_and_having_filters() {
        let (_d, mut pager) = open();
        let mut catalog = Catalog::open(&mut pager).unwrap();
        let entry = catalog.tables.create_table(&mut pager, "t").unwrap();
        let mut last = entry.last_page;
        for (dept, n) in [("a", 1.0), ("a", 2.0), ("b", 10.0)] {
            let (new_last, _) = storage::heap::append_row(
                &mut pager,
                last,
                &row_of([("dept", Value::Text(dept.into())), ("n", Value::Number(n))]),
            )
            .unwrap();
            last = new_last;
        }
        let stmt = AggregateStmt {
            table: "t".into(),
            group_by: vec!["dept".into()],
            items: vec![AggregateItem { func: AggFunc::Sum, field: Some("n".into()) }],
            criteria: None,
            having: Some(parser::Criteria::Compare {
                field: "sum_n".into(),
                op: parser::CompareOp::Gt,
                value: parser::Literal::Value(Value::Number(5.0)),
            }),
        };
        let out = run(&mut pager, &catalog, &stmt).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("dept"), Some(&Value::Text("b".into())));
    }
}
