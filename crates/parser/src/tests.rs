use super::*;

#[test]
fn parses_create_table_and_insert_and_select() {
    match parse("CREATE TABLE users (id, name, age)") {
        Command::CreateTable { name, columns } => {
            assert_eq!(name, "users");
            assert_eq!(columns, vec!["id", "name", "age"]);
        }
        other => panic!("expected CreateTable, got {other:?}"),
    }

    match parse("INSERT INTO users (id, name, age) VALUES (1, 'Will', 27)") {
        Command::Insert { table, columns, values } => {
            assert_eq!(table, "users");
            assert_eq!(columns, vec!["id", "name", "age"]);
            assert_eq!(values[1], Literal::Value(Value::Text("Will".into())));
        }
        other => panic!("expected Insert, got {other:?}"),
    }

    match parse("SELECT id, name FROM users WHERE age > 20") {
        Command::Select(stmt) => {
            assert_eq!(stmt.table, "users");
            assert!(matches!(stmt.projection, Projection::Fields(ref f) if f.len() == 2));
            assert!(matches!(
                stmt.criteria,
                Some(Criteria::Compare { op: CompareOp::Gt, .. })
            ));
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn dialect_statements_parse_identically_to_english() {
    let english = parse("CREATE TABLE kebun (id)");
    let dialect = parse("BUAT TABEL kebun (id)");
    assert!(matches!(english, Command::CreateTable { .. }));
    assert!(matches!(dialect, Command::CreateTable { .. }));

    match parse("PILIH * DARI kebun DIMANA id = 1") {
        Command::Select(stmt) => {
            assert_eq!(stmt.table, "kebun");
            assert!(matches!(stmt.projection, Projection::Star));
            assert!(matches!(stmt.criteria, Some(Criteria::Compare { op: CompareOp::Eq, .. })));
        }
        other => panic!("expected Select, got {other:?}"),
    }

    match parse("TAMBAH KE kebun (id) NILAI (1)") {
        Command::Insert { table, .. } => assert_eq!(table, "kebun"),
        other => panic!("expected Insert, got {other:?}"),
    }

    match parse("HAPUS DARI kebun DIMANA id = 1") {
        Command::Delete { table, .. } => assert_eq!(table, "kebun"),
        other => panic!("expected Delete, got {other:?}"),
    }

    assert!(matches!(parse("BUAT BASISDATA plantation"), Command::CreateDatabase { .. }));
    assert!(matches!(parse("PAKAI plantation"), Command::UseDatabase { .. }));
    assert!(matches!(parse("TAMPIL BASISDATA"), Command::ShowDatabases));
    assert!(matches!(parse("HAPUS BASISDATA plantation"), Command::DropDatabase { .. }));
}

#[test]
fn and_binds_tighter_than_or() {
    match parse("SELECT * FROM t WHERE a = 1 AND b = 2 OR c = 3") {
        Command::Select(stmt) => match stmt.criteria.unwrap() {
            Criteria::Or(groups) => {
                assert_eq!(groups.len(), 2);
                assert!(matches!(groups[0], Criteria::And(ref terms) if terms.len() == 2));
                assert!(matches!(groups[1], Criteria::Compare { .. }));
            }
            other => panic!("expected Or at the top, got {other:?}"),
        },
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn between_in_like_and_is_null_predicates() {
    match parse("SELECT * FROM t WHERE age BETWEEN 10 AND 20") {
        Command::Select(stmt) => assert!(matches!(stmt.criteria, Some(Criteria::Between { .. }))),
        other => panic!("unexpected {other:?}"),
    }
    match parse("SELECT * FROM t WHERE id IN (1, 2, 3)") {
        Command::Select(stmt) => {
            assert!(matches!(stmt.criteria, Some(Criteria::In { negated: false, .. })))
        }
        other => panic!("unexpected {other:?}"),
    }
    match parse("SELECT * FROM t WHERE id NOT IN (1, 2)") {
        Command::Select(stmt) => {
            assert!(matches!(stmt.criteria, Some(Criteria::In { negated: true, .. })))
        }
        other => panic!("unexpected {other:?}"),
    }
    match parse("SELECT * FROM t WHERE name LIKE 'A%'") {
        Command::Select(stmt) => assert!(matches!(stmt.criteria, Some(Criteria::Like { .. }))),
        other => panic!("unexpected {other:?}"),
    }
    match parse("SELECT * FROM t WHERE dept IS NOT NULL") {
        Command::Select(stmt) => {
            assert!(matches!(stmt.criteria, Some(Criteria::IsNull { negated: true, .. })))
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn joins_order_by_limit_offset() {
    match parse(
        "SELECT * FROM employees LEFT JOIN departments ON employees.dept = departments.id ORDER BY id DESC LIMIT 10 OFFSET 5",
    ) {
        Command::Select(stmt) => {
            assert_eq!(stmt.joins.len(), 1);
            assert_eq!(stmt.joins[0].kind, JoinKind::Left);
            assert_eq!(stmt.joins[0].left_field, "dept");
            assert_eq!(stmt.joins[0].right_field, "id");
            assert_eq!(stmt.order_by, Some(("id".to_string(), SortDir::Desc)));
            assert_eq!(stmt.limit, Some(10));
            assert_eq!(stmt.offset, Some(5));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn aggregate_with_group_by_and_having() {
    match parse("COUNT(*), SUM(amount) FROM sales GROUP BY region HAVING COUNT(*) > 1") {
        Command::Aggregate(stmt) => {
            assert_eq!(stmt.table, "sales");
            assert_eq!(stmt.items.len(), 2);
            assert_eq!(stmt.items[0].func, AggFunc::Count);
            assert_eq!(stmt.group_by, vec!["region"]);
            assert!(stmt.having.is_some());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn explain_wraps_inner_command() {
    match parse("EXPLAIN ANALYZE SELECT * FROM t") {
        Command::Explain { analyze, inner } => {
            assert!(analyze);
            assert!(matches!(*inner, Command::Select(_)));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn transaction_keywords() {
    assert!(matches!(parse("BEGIN"), Command::Begin));
    assert!(matches!(parse("COMMIT"), Command::Commit));
    assert!(matches!(parse("ROLLBACK"), Command::Rollback));
}

#[test]
fn empty_input_and_malformed_input() {
    assert!(matches!(parse(""), Command::Empty));
    assert!(matches!(parse("   "), Command::Empty));
    assert!(matches!(parse("SELECT FROM"), Command::Error(_)));
    assert!(matches!(parse("NONSENSE TOKENS HERE"), Command::Error(_)));
}

#[test]
fn parameter_binding_resolves_named_params() {
    let cmd = parse("INSERT INTO t (id) VALUES (@id)");
    let mut params = std::collections::BTreeMap::new();
    params.insert("id".to_string(), Value::Number(42.0));
    let bound = cmd.bind(&params);
    match bound {
        Command::Insert { values, .. } => {
            assert_eq!(values[0], Literal::Value(Value::Number(42.0)));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn unbound_parameter_degrades_to_opaque_string() {
    let cmd = parse("SELECT * FROM t WHERE id = @missing");
    let bound = cmd.bind(&std::collections::BTreeMap::new());
    match bound {
        Command::Select(stmt) => match stmt.criteria {
            Some(Criteria::Compare { value, .. }) => {
                assert_eq!(value.resolve(), Value::Text("@missing".into()));
            }
            other => panic!("unexpected {other:?}"),
        },
        other => panic!("unexpected {other:?}"),
    }
}
