//! End-to-end executor tests: scan and projection over real heap files.

use std::sync::Arc;

use minirel::datum::{Type, Value};
use minirel::executor::{
    BinaryOperator, ColumnInfo, ColumnStats, ExecutorError, Expression, FileScanNode, PlanNode,
    ProjectNode, Schema, SchemaRef, SelectValue, TableStats,
};
use minirel::heap::{HeapFile, Record};
use minirel::storage::{MemoryStorage, PageCache};

/// Builds the scenario table T: schema (t.a, t.b), rows [(1, 2), (3, 4)].
fn scan_t() -> FileScanNode<MemoryStorage> {
    let file = HeapFile::new(Arc::new(PageCache::new(MemoryStorage::with_page_size(64))));
    file.insert_tuple(&Record::new(vec![Value::Int32(1), Value::Int32(2)]))
        .unwrap();
    file.insert_tuple(&Record::new(vec![Value::Int32(3), Value::Int32(4)]))
        .unwrap();

    let schema: SchemaRef = Arc::new(Schema::new(vec![
        ColumnInfo::with_table("a", "t", Type::Integer),
        ColumnInfo::with_table("b", "t", Type::Integer),
    ]));
    let table_stats = TableStats::new(file.page_count() as u32, 2, 12.0);
    let column_stats = vec![
        ColumnStats::with_unique_values(2),
        ColumnStats::with_unique_values(2),
    ];
    FileScanNode::new(file, "t", schema, table_stats, column_stats)
}

fn drain(node: &mut dyn PlanNode) -> Vec<Vec<Value>> {
    let mut rows = Vec::new();
    while let Some(tuple) = node.get_next_tuple().unwrap() {
        rows.push(tuple.values().to_vec());
    }
    rows
}

#[test]
fn test_trivial_projection_over_scan() {
    // SELECT * FROM t
    let mut plan = ProjectNode::new(Box::new(scan_t()), vec![SelectValue::wildcard()]);
    plan.prepare().unwrap();

    let first = plan.get_next_tuple().unwrap().unwrap();
    // The trivial projection passes scan tuples through, identity included.
    assert!(first.id.is_some());
    assert_eq!(first.values(), &[Value::Int32(1), Value::Int32(2)]);

    let second = plan.get_next_tuple().unwrap().unwrap();
    assert_eq!(second.values(), &[Value::Int32(3), Value::Int32(4)]);
    assert!(plan.get_next_tuple().unwrap().is_none());

    plan.clean_up();
}

#[test]
fn test_expression_projection_over_scan() {
    // SELECT a, a + b AS s FROM t
    let spec = vec![
        SelectValue::expr(Expression::column("a")),
        SelectValue::aliased(
            Expression::binary(
                Expression::column("a"),
                BinaryOperator::Add,
                Expression::column("b"),
            ),
            "s",
        ),
    ];
    let mut plan = ProjectNode::new(Box::new(scan_t()), spec);
    plan.prepare().unwrap();

    let columns = plan.schema().columns().to_vec();
    assert_eq!(columns[0], ColumnInfo::with_table("a", "t", Type::Integer));
    assert_eq!(columns[1], ColumnInfo::new("s", Type::Integer));

    // The computed column assumes one distinct value per input row.
    assert_eq!(plan.stats()[1], ColumnStats::with_unique_values(2));

    assert_eq!(
        drain(&mut plan),
        vec![
            vec![Value::Int32(1), Value::Int32(3)],
            vec![Value::Int32(3), Value::Int32(7)],
        ]
    );
    plan.clean_up();
}

#[test]
fn test_qualified_wildcard_over_mixed_schema() {
    // A stored two-table row set (as a join result would produce), schema
    // (t.a, t.b, u.c); SELECT t.* keeps only t's columns.
    let file = HeapFile::new(Arc::new(PageCache::new(MemoryStorage::with_page_size(64))));
    file.insert_tuple(&Record::new(vec![
        Value::Int32(1),
        Value::Int32(2),
        Value::Int32(9),
    ]))
    .unwrap();

    let schema: SchemaRef = Arc::new(Schema::new(vec![
        ColumnInfo::with_table("a", "t", Type::Integer),
        ColumnInfo::with_table("b", "t", Type::Integer),
        ColumnInfo::with_table("c", "u", Type::Integer),
    ]));
    let scan = FileScanNode::new(
        file,
        "t_join_u",
        schema,
        TableStats::new(1, 1, 17.0),
        vec![ColumnStats::unknown(); 3],
    );

    let mut plan = ProjectNode::new(Box::new(scan), vec![SelectValue::table_wildcard("t")]);
    plan.prepare().unwrap();

    let names: Vec<_> = plan
        .schema()
        .columns()
        .iter()
        .map(|c| c.display_name())
        .collect();
    assert_eq!(names, vec!["t.a", "t.b"]);
    assert_eq!(drain(&mut plan), vec![vec![Value::Int32(1), Value::Int32(2)]]);
    plan.clean_up();
}

#[test]
fn test_scalar_subquery_fails_prepare() {
    let mut plan = ProjectNode::new(
        Box::new(scan_t()),
        vec![SelectValue::wildcard(), SelectValue::ScalarSubquery],
    );
    assert!(matches!(plan.prepare(), Err(ExecutorError::Unsupported(_))));
    plan.clean_up();
}

#[test]
fn test_initialize_restarts_whole_pipeline() {
    let mut plan = ProjectNode::new(
        Box::new(scan_t()),
        vec![SelectValue::expr(Expression::column("b"))],
    );
    plan.prepare().unwrap();

    assert_eq!(drain(&mut plan).len(), 2);
    assert!(plan.get_next_tuple().unwrap().is_none());

    plan.initialize();
    assert_eq!(
        drain(&mut plan),
        vec![vec![Value::Int32(2)], vec![Value::Int32(4)]]
    );
    plan.clean_up();
}

#[test]
fn test_marking_through_projection_over_scan() {
    let mut plan = ProjectNode::new(
        Box::new(scan_t()),
        vec![SelectValue::expr(Expression::column("a"))],
    );
    plan.prepare().unwrap();
    assert!(plan.supports_marking());

    plan.get_next_tuple().unwrap();
    plan.mark_current_position().unwrap();
    plan.get_next_tuple().unwrap();
    assert!(plan.get_next_tuple().unwrap().is_none());

    // Rewinding to the mark resumes the stream mid-way.
    plan.reset_to_last_mark().unwrap();
    assert_eq!(drain(&mut plan), vec![vec![Value::Int32(3)]]);
    plan.clean_up();
}

#[test]
fn test_duplicate_executes_independently() {
    let mut plan = ProjectNode::new(
        Box::new(scan_t()),
        vec![SelectValue::expr(Expression::column("a"))],
    );
    plan.prepare().unwrap();
    plan.get_next_tuple().unwrap();

    let mut copy = plan.duplicate();
    assert_eq!(
        drain(copy.as_mut()),
        vec![vec![Value::Int32(1)], vec![Value::Int32(3)]]
    );

    // The original continues from where it was.
    assert_eq!(drain(&mut plan), vec![vec![Value::Int32(3)]]);
    plan.clean_up();
    copy.clean_up();
}

#[test]
fn test_plan_equality_and_diagnostics() {
    let make = || {
        ProjectNode::new(
            Box::new(scan_t()),
            vec![
                SelectValue::wildcard(),
                SelectValue::aliased(
                    Expression::binary(
                        Expression::column("a"),
                        BinaryOperator::Mul,
                        Expression::Integer(2),
                    ),
                    "d",
                ),
            ],
        )
    };

    let x = make();
    let y = make();
    assert!(x.eq_node(&y));
    assert_eq!(x.to_string(), "Project[values: [*, a * 2 AS d]]");
}

#[test]
fn test_clean_up_is_idempotent() {
    let mut plan = ProjectNode::new(Box::new(scan_t()), vec![SelectValue::wildcard()]);
    plan.prepare().unwrap();
    plan.get_next_tuple().unwrap();

    plan.clean_up();
    plan.clean_up();
}

#[test]
fn test_projection_preserves_order_tuple_for_tuple() {
    let file = HeapFile::new(Arc::new(PageCache::new(MemoryStorage::with_page_size(64))));
    for n in 0..25 {
        file.insert_tuple(&Record::new(vec![Value::Int32(n)])).unwrap();
    }

    let schema: SchemaRef = Arc::new(Schema::new(vec![ColumnInfo::with_table(
        "n",
        "t",
        Type::Integer,
    )]));
    let scan = FileScanNode::new(
        file,
        "t",
        schema,
        TableStats::new(4, 25, 7.0),
        vec![ColumnStats::with_unique_values(25)],
    );
    let mut plan = ProjectNode::new(
        Box::new(scan),
        vec![SelectValue::expr(Expression::binary(
            Expression::column("n"),
            BinaryOperator::Add,
            Expression::Integer(1),
        ))],
    );
    plan.prepare().unwrap();

    let rows = drain(&mut plan);
    assert_eq!(rows.len(), 25);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row, &vec![Value::Int32(i as i32 + 1)]);
    }
    plan.clean_up();
}
