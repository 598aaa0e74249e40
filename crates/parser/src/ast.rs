//! Command records produced by [`crate::parse`] (spec §4.D).
//!
//! A parsed statement is always one of the tags in [`Command`]; parsing
//! never fails outright — a malformed statement becomes `Command::Error`.
//! Values that may still be an unbound `@name` parameter are carried as
//! [`Literal`] until [`Command::bind`] resolves them against a binding map.

use common::Row;
use std::collections::BTreeMap;
use types::{SqlType, Value};

/// A literal value in source position, possibly an unresolved `@name`
/// parameter (spec §4.D "Parameter binding").
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Value(Value),
    Param(String),
}

impl Literal {
    /// Resolve to a concrete value. An unbound parameter degrades to the
    /// opaque string `@name` per spec ("unsafe but preserved for backward
    /// compatibility").
    pub fn resolve(&self) -> Value {
        match self {
            Literal::Value(v) => v.clone(),
            Literal::Param(name) => Value::Text(format!("@{name}")),
        }
    }

    fn bind(&self, params: &BTreeMap<String, Value>) -> Literal {
        match self {
            Literal::Param(name) => match params.get(name) {
                Some(v) => Literal::Value(v.clone()),
                None => Literal::Value(Value::Text(format!("@{name}"))),
            },
            other => other.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

/// A `WHERE`/`HAVING` predicate tree (spec §4.D grammar table).
#[derive(Clone, Debug)]
pub enum Criteria {
    Compare { field: String, op: CompareOp, value: Literal },
    Between { field: String, lo: Literal, hi: Literal },
    In { field: String, values: Vec<Literal>, negated: bool },
    Like { field: String, pattern: String },
    IsNull { field: String, negated: bool },
    And(Vec<Criteria>),
    Or(Vec<Criteria>),
}

impl Criteria {
    fn bind(&self, params: &BTreeMap<String, Value>) -> Criteria {
        match self {
            Criteria::Compare { field, op, value } => Criteria::Compare {
                field: field.clone(),
                op: *op,
                value: value.bind(params),
            },
            Criteria::Between { field, lo, hi } => Criteria::Between {
                field: field.clone(),
                lo: lo.bind(params),
                hi: hi.bind(params),
            },
            Criteria::In { field, values, negated } => Criteria::In {
                field: field.clone(),
                values: values.iter().map(|v| v.bind(params)).collect(),
                negated: *negated,
            },
            Criteria::Like { field, pattern } => Criteria::Like { field: field.clone(), pattern: pattern.clone() },
            Criteria::IsNull { field, negated } => Criteria::IsNull { field: field.clone(), negated: *negated },
            Criteria::And(list) => Criteria::And(list.iter().map(|c| c.bind(params)).collect()),
            Criteria::Or(list) => Criteria::Or(list.iter().map(|c| c.bind(params)).collect()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    FullOuter,
    Cross,
}

#[derive(Clone, Debug)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub table: String,
    pub left_field: String,
    pub right_field: String,
}

#[derive(Clone, Debug)]
pub enum Projection {
    Star,
    Fields(Vec<String>),
}

#[derive(Clone, Debug)]
pub struct SelectStmt {
    pub projection: Projection,
    pub distinct: bool,
    pub table: String,
    pub joins: Vec<JoinClause>,
    pub criteria: Option<Criteria>,
    pub order_by: Option<(String, SortDir)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggFunc {
    pub fn alias(&self, field: Option<&str>) -> String {
        let name = match self {
            AggFunc::Count => "count",
            AggFunc::Sum => "sum",
            AggFunc::Avg => "avg",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
        };
        format!("{name}_{}", field.unwrap_or("star"))
    }
}

#[derive(Clone, Debug)]
pub struct AggregateItem {
    pub func: AggFunc,
    pub field: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AggregateStmt {
    pub table: String,
    pub group_by: Vec<String>,
    pub items: Vec<AggregateItem>,
    pub criteria: Option<Criteria>,
    pub having: Option<Criteria>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerTiming {
    Before,
    After,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

#[derive(Clone, Debug)]
pub struct SchemaColumn {
    pub name: String,
    pub ty: SqlType,
    pub required: bool,
    pub default: Option<Value>,
}

/// A fully parsed statement. Every variant corresponds to a tag named in
/// spec §4.D; `Error` and `Empty` stand in for parse failure and blank
/// input respectively.
#[derive(Clone, Debug)]
pub enum Command {
    CreateTable { name: String, columns: Vec<String> },
    DropTable { name: String },
    ShowTables,
    ShowIndexes,
    ShowStats,
    CreateIndex { table: String, field: String },
    Insert { table: String, columns: Vec<String>, values: Vec<Literal> },
    Select(SelectStmt),
    Update { table: String, assignments: Vec<(String, Literal)>, criteria: Option<Criteria> },
    Delete { table: String, criteria: Option<Criteria> },
    Aggregate(AggregateStmt),
    Explain { analyze: bool, inner: Box<Command> },
    Begin,
    Commit,
    Rollback,
    CreateView { name: String, select: SelectStmt },
    DropView { name: String },
    DefineSchema { table: String, columns: Vec<SchemaColumn> },
    CreateTrigger {
        name: String,
        table: String,
        timing: TriggerTiming,
        event: TriggerEvent,
        action: String,
    },
    DropTrigger { name: String },
    CreateProcedure { name: String, body: String },
    ExecuteProcedure { name: String },
    Backup { path: String },
    Restore { path: String },
    CreateDatabase { name: String },
    UseDatabase { name: String },
    ShowDatabases,
    DropDatabase { name: String },
    Error(String),
    Empty,
}

impl Command {
    /// Deep-copy and resolve every `@name` parameter against `params`
    /// (spec §9 "Query cache shallow clone": only the mutable subfields
    /// need cloning, but cloning the whole command is simplest and cheap
    /// for statement-sized ASTs).
    pub fn bind(&self, params: &BTreeMap<String, Value>) -> Command {
        match self {
            Command::Insert { table, columns, values } => Command::Insert {
                table: table.clone(),
                columns: columns.clone(),
                values: values.iter().map(|v| v.bind(params)).collect(),
            },
            Command::Update { table, assignments, criteria } => Command::Update {
                table: table.clone(),
                assignments: assignments.iter().map(|(f, v)| (f.clone(), v.bind(params))).collect(),
                criteria: criteria.as_ref().map(|c| c.bind(params)),
            },
            Command::Delete { table, criteria } => Command::Delete {
                table: table.clone(),
                criteria: criteria.as_ref().map(|c| c.bind(params)),
            },
            Command::Select(stmt) => Command::Select(SelectStmt {
                criteria: stmt.criteria.as_ref().map(|c| c.bind(params)),
                ..stmt.clone()
            }),
            Command::Aggregate(stmt) => Command::Aggregate(AggregateStmt {
                criteria: stmt.criteria.as_ref().map(|c| c.bind(params)),
                having: stmt.having.as_ref().map(|c| c.bind(params)),
                ..stmt.clone()
            }),
            Command::Explain { analyze, inner } => Command::Explain {
                analyze: *analyze,
                inner: Box::new(inner.bind(params)),
            },
            other => other.clone(),
        }
    }
}

/// Convenience constructor used by the executor's insert path: zip
/// columns with resolved literal values into a [`Row`].
pub fn zip_row(columns: &[String], values: &[Literal]) -> Row {
    columns
        .iter()
        .zip(values.iter())
        .map(|(c, v)| (c.clone(), v.resolve()))
        .collect()
}
