//! Tokenizer and dual-dialect recursive-descent parser (spec §4.D).
//!
//! Parsing never fails outright: [`parse`] always returns a [`Command`],
//! falling back to `Command::Error(message)` for anything it cannot make
//! sense of, and `Command::Empty` for blank input.

mod ast;
mod lexer;
#[cfg(test)]
mod tests;

pub use ast::*;
pub use lexer::{tokenize, Token};

use std::collections::BTreeMap;
use types::{SqlType, Value};

/// Statement-introducing and type keywords that differ between dialects
/// (spec SPEC_FULL.md §2.1). Multi-word phrases are listed longest-first
/// so the canonicalizer prefers the longer match.
const PHRASES: &[(&[&str], &str)] = &[
    (&["CREATE", "TABLE"], "CREATE_TABLE"),
    (&["BUAT", "TABEL"], "CREATE_TABLE"),
    (&["INSERT", "INTO"], "INSERT_INTO"),
    (&["TAMBAH", "KE"], "INSERT_INTO"),
    (&["DELETE", "FROM"], "DELETE_FROM"),
    (&["HAPUS", "DARI"], "DELETE_FROM"),
    (&["DROP", "TABLE"], "DROP_TABLE"),
    (&["HAPUS", "TABEL"], "DROP_TABLE"),
    (&["CREATE", "DATABASE"], "CREATE_DATABASE"),
    (&["BUAT", "BASISDATA"], "CREATE_DATABASE"),
    (&["SHOW", "DATABASES"], "SHOW_DATABASES"),
    (&["TAMPIL", "BASISDATA"], "SHOW_DATABASES"),
    (&["DROP", "DATABASE"], "DROP_DATABASE"),
    (&["HAPUS", "BASISDATA"], "DROP_DATABASE"),
    (&["SHOW", "TABLES"], "SHOW_TABLES"),
    (&["SHOW", "INDEXES"], "SHOW_INDEXES"),
    (&["SHOW", "STATS"], "SHOW_STATS"),
    (&["CREATE", "INDEX"], "CREATE_INDEX"),
    (&["CREATE", "VIEW"], "CREATE_VIEW"),
    (&["DROP", "VIEW"], "DROP_VIEW"),
    (&["DEFINE", "SCHEMA"], "DEFINE_SCHEMA"),
    (&["CREATE", "TRIGGER"], "CREATE_TRIGGER"),
    (&["DROP", "TRIGGER"], "DROP_TRIGGER"),
    (&["CREATE", "PROCEDURE"], "CREATE_PROCEDURE"),
    (&["EXECUTE", "PROCEDURE"], "EXECUTE_PROCEDURE"),
    (&["IS", "NOT", "NULL"], "IS_NOT_NULL"),
    (&["IS", "NULL"], "IS_NULL"),
    (&["NOT", "IN"], "NOT_IN"),
    (&["ORDER", "BY"], "ORDER_BY"),
    (&["GROUP", "BY"], "GROUP_BY"),
    (&["LEFT", "JOIN"], "LEFT_JOIN"),
    (&["RIGHT", "JOIN"], "RIGHT_JOIN"),
    (&["FULL", "OUTER", "JOIN"], "FULL_OUTER_JOIN"),
    (&["INNER", "JOIN"], "INNER_JOIN"),
    (&["CROSS", "JOIN"], "CROSS_JOIN"),
    (&["EXPLAIN", "ANALYZE"], "EXPLAIN_ANALYZE"),
];

/// Single-word keywords that differ between dialects, mapped to their
/// canonical English spelling.
const WORDS: &[(&str, &str)] = &[
    ("SELECT", "SELECT"),
    ("PILIH", "SELECT"),
    ("FROM", "FROM"),
    ("DARI", "FROM"),
    ("WHERE", "WHERE"),
    ("DIMANA", "WHERE"),
    ("VALUES", "VALUES"),
    ("NILAI", "VALUES"),
    ("UPDATE", "UPDATE"),
    ("UBAH", "UPDATE"),
    ("SET", "SET"),
    ("ATUR", "SET"),
    ("AND", "AND"),
    ("DAN", "AND"),
    ("OR", "OR"),
    ("ATAU", "OR"),
    ("USE", "USE"),
    ("PAKAI", "USE"),
    ("NUMBER", "NUMBER"),
    ("ANGKA", "NUMBER"),
    ("BOOLEAN", "BOOLEAN"),
    ("BENAR_SALAH", "BOOLEAN"),
    ("DATE", "DATE"),
    ("TANGGAL", "DATE"),
];

fn canonical_word(word: &str) -> String {
    let upper = word.to_ascii_uppercase();
    WORDS
        .iter()
        .find(|(k, _)| *k == upper)
        .map(|(_, v)| v.to_string())
        .unwrap_or(upper)
}

/// Merge dialect phrases into single canonical identifiers and map every
/// remaining identifier to its canonical spelling, so the recursive
/// descent parser below only ever has to recognize English keywords.
fn canonicalize(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    'outer: while i < tokens.len() {
        for (words, canonical) in PHRASES {
            if i + words.len() <= tokens.len() {
                let matches = words.iter().enumerate().all(|(k, w)| match &tokens[i + k] {
                    Token::Ident(s) => s.eq_ignore_ascii_case(w),
                    _ => false,
                });
                if matches {
                    out.push(Token::Ident(canonical.to_string()));
                    i += words.len();
                    continue 'outer;
                }
            }
        }
        match &tokens[i] {
            Token::Ident(s) => out.push(Token::Ident(canonical_word(s))),
            other => out.push(other.clone()),
        }
        i += 1;
    }
    out
}

struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, String>;

impl Cursor {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
            || matches!(self.tokens.get(self.pos), Some(Token::Semicolon))
    }

    fn kw(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s.eq_ignore_ascii_case(word))
    }

    fn eat_kw(&mut self, word: &str) -> bool {
        if self.kw(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_kw(&mut self, word: &str) -> PResult<()> {
        if self.eat_kw(word) {
            Ok(())
        } else {
            Err(format!("expected `{word}`, found {:?}", self.peek()))
        }
    }

    fn ident(&mut self) -> PResult<String> {
        match self.bump() {
            Some(Token::Ident(s)) => Ok(s),
            other => Err(format!("expected identifier, found {other:?}")),
        }
    }

    fn eat(&mut self, t: &Token) -> bool {
        if self.peek() == Some(t) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn literal(&mut self) -> PResult<Literal> {
        match self.bump() {
            Some(Token::Param(name)) => Ok(Literal::Param(name)),
            Some(tok) => tok
                .as_literal_value()
                .map(Literal::Value)
                .ok_or_else(|| format!("expected literal value, found {tok:?}")),
            None => Err("expected literal value, found end of input".into()),
        }
    }

    fn uint_literal(&mut self) -> PResult<u64> {
        match self.bump() {
            Some(Token::Number(n)) if n >= 0.0 => Ok(n as u64),
            other => Err(format!("expected non-negative integer, found {other:?}")),
        }
    }
}

/// Parse `text` into a single [`Command`]. Only the first statement
/// (up to a trailing `;` or end of input) is honored.
pub fn parse(text: &str) -> Command {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Command::Empty;
    }
    let tokens = canonicalize(tokenize(trimmed));
    if tokens.is_empty() {
        return Command::Empty;
    }
    let mut cur = Cursor { tokens, pos: 0 };
    match parse_command(&mut cur) {
        Ok(cmd) => cmd,
        Err(msg) => Command::Error(msg),
    }
}

/// Parse `text` and resolve `@name` parameters against `params` in one
/// step (spec §4.D "Parameter binding").
pub fn parse_with_params(text: &str, params: &BTreeMap<String, Value>) -> Command {
    parse(text).bind(params)
}

fn parse_command(cur: &mut Cursor) -> PResult<Command> {
    if cur.eat_kw("EXPLAIN") {
        let analyze = cur.eat_kw("ANALYZE") || cur.eat_kw("EXPLAIN_ANALYZE");
        let inner = parse_command(cur)?;
        return Ok(Command::Explain { analyze, inner: Box::new(inner) });
    }
    if cur.eat_kw("BEGIN") {
        return Ok(Command::Begin);
    }
    if cur.eat_kw("COMMIT") {
        return Ok(Command::Commit);
    }
    if cur.eat_kw("ROLLBACK") {
        return Ok(Command::Rollback);
    }
    if cur.eat_kw("CREATE_TABLE") {
        return parse_create_table(cur);
    }
    if cur.eat_kw("DROP_TABLE") {
        let name = cur.ident()?;
        return Ok(Command::DropTable { name });
    }
    if cur.eat_kw("SHOW_TABLES") {
        return Ok(Command::ShowTables);
    }
    if cur.eat_kw("SHOW_INDEXES") {
        return Ok(Command::ShowIndexes);
    }
    if cur.eat_kw("SHOW_STATS") {
        return Ok(Command::ShowStats);
    }
    if cur.eat_kw("CREATE_INDEX") {
        return parse_create_index(cur);
    }
    if cur.eat_kw("INSERT_INTO") {
        return parse_insert(cur);
    }
    if cur.kw("SELECT") {
        return parse_select(cur).map(Command::Select);
    }
    if cur.eat_kw("UPDATE") {
        return parse_update(cur);
    }
    if cur.eat_kw("DELETE_FROM") {
        return parse_delete(cur);
    }
    if cur.eat_kw("CREATE_VIEW") {
        return parse_create_view(cur);
    }
    if cur.eat_kw("DROP_VIEW") {
        let name = cur.ident()?;
        return Ok(Command::DropView { name });
    }
    if cur.eat_kw("DEFINE_SCHEMA") {
        return parse_define_schema(cur);
    }
    if cur.eat_kw("CREATE_TRIGGER") {
        return parse_create_trigger(cur);
    }
    if cur.eat_kw("DROP_TRIGGER") {
        let name = cur.ident()?;
        return Ok(Command::DropTrigger { name });
    }
    if cur.eat_kw("CREATE_PROCEDURE") {
        let name = cur.ident()?;
        let body = parse_procedure_body(cur)?;
        return Ok(Command::CreateProcedure { name, body });
    }
    if cur.eat_kw("EXECUTE_PROCEDURE") {
        let name = cur.ident()?;
        return Ok(Command::ExecuteProcedure { name });
    }
    if cur.eat_kw("BACKUP") {
        let path = parse_path_literal(cur)?;
        return Ok(Command::Backup { path });
    }
    if cur.eat_kw("RESTORE") {
        let path = parse_path_literal(cur)?;
        return Ok(Command::Restore { path });
    }
    if cur.eat_kw("CREATE_DATABASE") {
        let name = cur.ident()?;
        return Ok(Command::CreateDatabase { name });
    }
    if cur.eat_kw("USE") {
        let name = cur.ident()?;
        return Ok(Command::UseDatabase { name });
    }
    if cur.eat_kw("SHOW_DATABASES") {
        return Ok(Command::ShowDatabases);
    }
    if cur.eat_kw("DROP_DATABASE") {
        let name = cur.ident()?;
        return Ok(Command::DropDatabase { name });
    }
    if is_aggregate_keyword(cur) {
        return parse_aggregate(cur).map(Command::Aggregate);
    }
    Err(format!("unrecognized statement near {:?}", cur.peek()))
}

fn parse_path_literal(cur: &mut Cursor) -> PResult<String> {
    match cur.literal()? {
        Literal::Value(Value::Text(s)) => Ok(s),
        other => Err(format!("expected path string, found {other:?}")),
    }
}

fn parse_procedure_body(cur: &mut Cursor) -> PResult<String> {
    // The body is an opaque blob: everything remaining up to `;` is kept
    // verbatim since procedure bodies are cataloged, never executed
    // (spec SPEC_FULL.md §3).
    cur.expect_kw("AS")?;
    let mut words = Vec::new();
    while !cur.at_end() {
        match cur.bump() {
            Some(Token::Ident(s)) => words.push(s),
            Some(Token::Str(s)) => words.push(s),
            _ => break,
        }
    }
    Ok(words.join(" "))
}

fn parse_create_table(cur: &mut Cursor) -> PResult<Command> {
    let name = cur.ident()?;
    let mut columns = Vec::new();
    if cur.eat(&Token::LParen) {
        loop {
            columns.push(cur.ident()?);
            if cur.eat(&Token::Comma) {
                continue;
            }
            break;
        }
        if !cur.eat(&Token::RParen) {
            return Err("expected `)` to close column list".into());
        }
    }
    Ok(Command::CreateTable { name, columns })
}

fn parse_create_index(cur: &mut Cursor) -> PResult<Command> {
    cur.eat_kw("ON");
    let table = cur.ident()?;
    if !cur.eat(&Token::LParen) {
        return Err("expected `(` before indexed field".into());
    }
    let field = cur.ident()?;
    if !cur.eat(&Token::RParen) {
        return Err("expected `)` after indexed field".into());
    }
    Ok(Command::CreateIndex { table, field })
}

fn parse_insert(cur: &mut Cursor) -> PResult<Command> {
    let table = cur.ident()?;
    let mut columns = Vec::new();
    if cur.eat(&Token::LParen) {
        loop {
            columns.push(cur.ident()?);
            if cur.eat(&Token::Comma) {
                continue;
            }
            break;
        }
        if !cur.eat(&Token::RParen) {
            return Err("expected `)` to close column list".into());
        }
    }
    cur.expect_kw("VALUES")?;
    if !cur.eat(&Token::LParen) {
        return Err("expected `(` before VALUES list".into());
    }
    let mut values = Vec::new();
    loop {
        values.push(cur.literal()?);
        if cur.eat(&Token::Comma) {
            continue;
        }
        break;
    }
    if !cur.eat(&Token::RParen) {
        return Err("expected `)` to close VALUES list".into());
    }
    if !columns.is_empty() && columns.len() != values.len() {
        return Err("column count does not match value count".into());
    }
    Ok(Command::Insert { table, columns, values })
}

fn join_kind_for(kw: &str) -> Option<JoinKind> {
    match kw {
        "INNER_JOIN" => Some(JoinKind::Inner),
        "LEFT_JOIN" => Some(JoinKind::Left),
        "RIGHT_JOIN" => Some(JoinKind::Right),
        "FULL_OUTER_JOIN" => Some(JoinKind::FullOuter),
        "CROSS_JOIN" => Some(JoinKind::Cross),
        "JOIN" => Some(JoinKind::Inner),
        _ => None,
    }
}

fn parse_select(cur: &mut Cursor) -> PResult<SelectStmt> {
    cur.expect_kw("SELECT")?;
    let distinct = cur.eat_kw("DISTINCT");
    let projection = if cur.eat(&Token::Star) {
        Projection::Star
    } else {
        let mut fields = Vec::new();
        loop {
            fields.push(cur.ident()?);
            if cur.eat(&Token::Comma) {
                continue;
            }
            break;
        }
        Projection::Fields(fields)
    };
    cur.expect_kw("FROM")?;
    let table = cur.ident()?;

    let mut joins = Vec::new();
    loop {
        let kind = ["INNER_JOIN", "LEFT_JOIN", "RIGHT_JOIN", "FULL_OUTER_JOIN", "CROSS_JOIN", "JOIN"]
            .iter()
            .find_map(|kw| if cur.eat_kw(kw) { join_kind_for(kw) } else { None });
        let Some(kind) = kind else { break };
        let join_table = cur.ident()?;
        let (left_field, right_field) = if kind == JoinKind::Cross {
            (String::new(), String::new())
        } else {
            cur.expect_kw("ON")?;
            let left_field = parse_dotted_field(cur)?;
            if !cur.eat(&Token::Eq) {
                return Err("expected `=` in join condition".into());
            }
            let right_field = parse_dotted_field(cur)?;
            (left_field, right_field)
        };
        joins.push(JoinClause { kind, table: join_table, left_field, right_field });
    }

    let criteria = if cur.eat_kw("WHERE") { Some(parse_criteria(cur)?) } else { None };

    let order_by = if cur.eat_kw("ORDER_BY") {
        let field = cur.ident()?;
        let dir = if cur.eat_kw("DESC") {
            SortDir::Desc
        } else {
            cur.eat_kw("ASC");
            SortDir::Asc
        };
        Some((field, dir))
    } else {
        None
    };

    let limit = if cur.eat_kw("LIMIT") { Some(cur.uint_literal()?) } else { None };
    let offset = if cur.eat_kw("OFFSET") { Some(cur.uint_literal()?) } else { None };

    Ok(SelectStmt { projection, distinct, table, joins, criteria, order_by, limit, offset })
}

/// A possibly `table.field`-qualified name, collapsed to the bare field
/// name (schema-less rows carry no table qualifier).
fn parse_dotted_field(cur: &mut Cursor) -> PResult<String> {
    let mut name = cur.ident()?;
    if cur.eat(&Token::Dot) {
        name = cur.ident()?;
    }
    Ok(name)
}

fn parse_update(cur: &mut Cursor) -> PResult<Command> {
    let table = cur.ident()?;
    cur.expect_kw("SET")?;
    let mut assignments = Vec::new();
    loop {
        let field = cur.ident()?;
        if !cur.eat(&Token::Eq) {
            return Err("expected `=` in SET assignment".into());
        }
        let value = cur.literal()?;
        assignments.push((field, value));
        if cur.eat(&Token::Comma) {
            continue;
        }
        break;
    }
    let criteria = if cur.eat_kw("WHERE") { Some(parse_criteria(cur)?) } else { None };
    Ok(Command::Update { table, assignments, criteria })
}

fn parse_delete(cur: &mut Cursor) -> PResult<Command> {
    let table = cur.ident()?;
    let criteria = if cur.eat_kw("WHERE") { Some(parse_criteria(cur)?) } else { None };
    Ok(Command::Delete { table, criteria })
}

fn parse_create_view(cur: &mut Cursor) -> PResult<Command> {
    let name = cur.ident()?;
    cur.expect_kw("AS")?;
    let select = parse_select(cur)?;
    Ok(Command::CreateView { name, select })
}

fn parse_define_schema(cur: &mut Cursor) -> PResult<Command> {
    let table = cur.ident()?;
    if !cur.eat(&Token::LParen) {
        return Err("expected `(` to open schema column list".into());
    }
    let mut columns = Vec::new();
    loop {
        let name = cur.ident()?;
        let ty_name = cur.ident()?;
        let ty = SqlType::from_keyword(&ty_name)
            .ok_or_else(|| format!("unknown column type `{ty_name}`"))?;
        let required = cur.eat_kw("REQUIRED");
        let default = if cur.eat_kw("DEFAULT") { Some(cur.literal()?.resolve()) } else { None };
        columns.push(SchemaColumn { name, ty, required, default });
        if cur.eat(&Token::Comma) {
            continue;
        }
        break;
    }
    if !cur.eat(&Token::RParen) {
        return Err("expected `)` to close schema column list".into());
    }
    Ok(Command::DefineSchema { table, columns })
}

fn parse_create_trigger(cur: &mut Cursor) -> PResult<Command> {
    let name = cur.ident()?;
    let timing = if cur.eat_kw("BEFORE") {
        TriggerTiming::Before
    } else if cur.eat_kw("AFTER") {
        TriggerTiming::After
    } else {
        return Err("expected BEFORE or AFTER".into());
    };
    let event = if cur.eat_kw("INSERT") {
        TriggerEvent::Insert
    } else if cur.eat_kw("UPDATE") {
        TriggerEvent::Update
    } else if cur.eat_kw("DELETE") {
        TriggerEvent::Delete
    } else {
        return Err("expected INSERT, UPDATE, or DELETE".into());
    };
    cur.expect_kw("ON")?;
    let table = cur.ident()?;
    cur.expect_kw("EXECUTE")?;
    let action = cur.ident()?;
    Ok(Command::CreateTrigger { name, table, timing, event, action })
}

fn is_aggregate_keyword(cur: &Cursor) -> bool {
    ["COUNT", "SUM", "AVG", "MIN", "MAX"].iter().any(|kw| cur.kw(kw))
}

fn parse_agg_func(cur: &mut Cursor) -> PResult<AggregateItem> {
    let func = if cur.eat_kw("COUNT") {
        AggFunc::Count
    } else if cur.eat_kw("SUM") {
        AggFunc::Sum
    } else if cur.eat_kw("AVG") {
        AggFunc::Avg
    } else if cur.eat_kw("MIN") {
        AggFunc::Min
    } else if cur.eat_kw("MAX") {
        AggFunc::Max
    } else {
        return Err(format!("expected aggregate function, found {:?}", cur.peek()));
    };
    if !cur.eat(&Token::LParen) {
        return Err("expected `(` after aggregate function".into());
    }
    let field = if cur.eat(&Token::Star) { None } else { Some(cur.ident()?) };
    if !cur.eat(&Token::RParen) {
        return Err("expected `)` after aggregate argument".into());
    }
    Ok(AggregateItem { func, field })
}

fn parse_aggregate(cur: &mut Cursor) -> PResult<AggregateStmt> {
    let mut items = vec![parse_agg_func(cur)?];
    while cur.eat(&Token::Comma) {
        items.push(parse_agg_func(cur)?);
    }
    cur.expect_kw("FROM")?;
    let table = cur.ident()?;
    let criteria = if cur.eat_kw("WHERE") { Some(parse_criteria(cur)?) } else { None };
    let group_by = if cur.eat_kw("GROUP_BY") {
        let mut fields = vec![cur.ident()?];
        while cur.eat(&Token::Comma) {
            fields.push(cur.ident()?);
        }
        fields
    } else {
        Vec::new()
    };
    let having = if cur.eat_kw("HAVING") { Some(parse_criteria(cur)?) } else { None };
    Ok(AggregateStmt { table, group_by, items, criteria, having })
}

/// WHERE/HAVING grammar (spec §4.D): group adjacent AND-linked
/// comparisons first, then join the resulting groups with OR, so `AND`
/// binds tighter than `OR`.
fn parse_criteria(cur: &mut Cursor) -> PResult<Criteria> {
    let mut or_groups = vec![parse_and_group(cur)?];
    while cur.eat_kw("OR") {
        or_groups.push(parse_and_group(cur)?);
    }
    if or_groups.len() == 1 {
        Ok(or_groups.into_iter().next().unwrap())
    } else {
        Ok(Criteria::Or(or_groups))
    }
}

fn parse_and_group(cur: &mut Cursor) -> PResult<Criteria> {
    let mut terms = vec![parse_predicate(cur)?];
    while cur.eat_kw("AND") {
        terms.push(parse_predicate(cur)?);
    }
    if terms.len() == 1 {
        Ok(terms.into_iter().next().unwrap())
    } else {
        Ok(Criteria::And(terms))
    }
}

fn parse_predicate(cur: &mut Cursor) -> PResult<Criteria> {
    let field = parse_dotted_field(cur)?;

    if cur.eat_kw("BETWEEN") {
        let lo = cur.literal()?;
        cur.expect_kw("AND")?;
        let hi = cur.literal()?;
        return Ok(Criteria::Between { field, lo, hi });
    }
    if cur.eat_kw("NOT_IN") {
        return parse_in_list(cur, field, true);
    }
    if cur.eat_kw("IN") {
        return parse_in_list(cur, field, false);
    }
    if cur.eat_kw("LIKE") {
        let pattern = match cur.literal()? {
            Literal::Value(Value::Text(s)) => s,
            other => return Err(format!("expected string pattern for LIKE, found {other:?}")),
        };
        return Ok(Criteria::Like { field, pattern });
    }
    if cur.eat_kw("IS_NOT_NULL") {
        return Ok(Criteria::IsNull { field, negated: true });
    }
    if cur.eat_kw("IS_NULL") {
        return Ok(Criteria::IsNull { field, negated: false });
    }

    let op = if cur.eat(&Token::Eq) {
        CompareOp::Eq
    } else if cur.eat(&Token::Ne) {
        CompareOp::Ne
    } else if cur.eat(&Token::Le) {
        CompareOp::Le
    } else if cur.eat(&Token::Ge) {
        CompareOp::Ge
    } else if cur.eat(&Token::Lt) {
        CompareOp::Lt
    } else if cur.eat(&Token::Gt) {
        CompareOp::Gt
    } else {
        return Err(format!("expected comparison operator, found {:?}", cur.peek()));
    };
    let value = cur.literal()?;
    Ok(Criteria::Compare { field, op, value })
}

fn parse_in_list(cur: &mut Cursor, field: String, negated: bool) -> PResult<Criteria> {
    if !cur.eat(&Token::LParen) {
        return Err("expected `(` after IN".into());
    }
    let mut values = Vec::new();
    loop {
        values.push(cur.literal()?);
        if cur.eat(&Token::Comma) {
            continue;
        }
        break;
    }
    if !cur.eat(&Token::RParen) {
        return Err("expected `)` to close IN list".into());
    }
    Ok(Criteria::In { field, values, negated })
}
