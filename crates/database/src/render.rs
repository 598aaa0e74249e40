//! Renders a parsed [`SelectStmt`] back into SQL source text.
//!
//! `CREATE VIEW` only has the parsed statement in hand (spec §4.D's
//! grammar does not carry source spans), but [`catalog::ViewManager`]
//! catalogs a view as raw `SELECT` text so it can re-parse and recurse
//! on substitution (spec §4.E Select step 1). This renders a canonical
//! statement equivalent in meaning to what the user wrote, not
//! necessarily identical to their original source.

use parser::{CompareOp, Criteria, JoinKind, Literal, Projection, SelectStmt, SortDir};
use types::Value;

pub fn render_select(stmt: &SelectStmt) -> String {
    let mut out = String::from("SELECT ");
    if stmt.distinct {
        out.push_str("DISTINCT ");
    }
    match &stmt.projection {
        Projection::Star => out.push('*'),
        Projection::Fields(fields) => out.push_str(&fields.join(", ")),
    }
    out.push_str(" FROM ");
    out.push_str(&stmt.table);

    for join in &stmt.joins {
        out.push(' ');
        out.push_str(join_keyword(join.kind));
        out.push(' ');
        out.push_str(&join.table);
        if !matches!(join.kind, JoinKind::Cross) {
            out.push_str(&format!(" ON {}.{} = {}.{}", stmt.table, join.left_field, join.table, join.right_field));
        }
    }

    if let Some(criteria) = &stmt.criteria {
        out.push_str(" WHERE ");
        out.push_str(&render_criteria(criteria));
    }

    if let Some((field, dir)) = &stmt.order_by {
        out.push_str(&format!(" ORDER BY {field} {}", sort_keyword(*dir)));
    }
    if let Some(limit) = stmt.limit {
        out.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = stmt.offset {
        out.push_str(&format!(" OFFSET {offset}"));
    }
    out
}

fn join_keyword(kind: JoinKind) -> &'static str {
    match kind {
        JoinKind::Inner => "INNER JOIN",
        JoinKind::Left => "LEFT JOIN",
        JoinKind::Right => "RIGHT JOIN",
        JoinKind::FullOuter => "FULL OUTER JOIN",
        JoinKind::Cross => "CROSS JOIN",
    }
}

fn sort_keyword(dir: SortDir) -> &'static str {
    match dir {
        SortDir::Asc => "ASC",
        SortDir::Desc => "DESC",
    }
}

fn compare_keyword(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "=",
        CompareOp::Ne => "!=",
        CompareOp::Lt => "<",
        CompareOp::Gt => ">",
        CompareOp::Le => "<=",
        CompareOp::Ge => ">=",
    }
}

fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::Value(value) => render_value(value),
        Literal::Param(name) => format!("@{name}"),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Number(n) => format!("{n}"),
        Value::Bool(b) => b.to_string(),
        Value::Null => "NULL".to_string(),
        Value::Text(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
    }
}

fn render_criteria(criteria: &Criteria) -> String {
    match criteria {
        Criteria::Compare { field, op, value } => format!("{field} {} {}", compare_keyword(*op), render_literal(value)),
        Criteria::Between { field, lo, hi } => {
            format!("{field} BETWEEN {} AND {}", render_literal(lo), render_literal(hi))
        }
        Criteria::In { field, values, negated } => format!(
            "{field} {}IN ({})",
            if *negated { "NOT " } else { "" },
            values.iter().map(render_literal).collect::<Vec<_>>().join(", ")
        ),
        Criteria::Like { field, pattern } => format!("{field} LIKE '{}'", pattern.replace('\'', "\\'")),
        Criteria::IsNull { field, negated } => format!("{field} IS {}NULL", if *negated { "NOT " } else { "" }),
        Criteria::And(parts) => parts.iter().map(render_criteria).collect::<Vec<_>>().join(" AND "),
        Criteria::Or(parts) => {
            parts.iter().map(|c| format!("({})", render_criteria(c))).collect::<Vec<_>>().join(" OR ")
        }
    }
}
