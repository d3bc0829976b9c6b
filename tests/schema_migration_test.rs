// ==========================================
// 历史库结构迁移集成测试
// ==========================================
// 测试目标: 旧列名库打开后自动迁移，数据保留，导入继续可用
// ==========================================


use syspro_planner::app::AppState;
use syspro_planner::logging;
use test_helpers::{
    create_legacy_db, create_test_state, db_path_in, execute_sql, read_order_column,
    table_column_names, write_file, ORDER_HEADER,
};

#[test]
fn test_legacy_db_is_migrated_on_open() {
    logging::init_test();
    let dir = tempfile::tempdir().unwrap();
    let db_path = db_path_in(&dir);
    create_legacy_db(&db_path).unwrap();

    let state = AppState::new(db_path.clone()).unwrap();
    let applied = &state.startup_schema.migrations.applied;
    assert_eq!(applied.len(), 3);
    assert!(applied[0].changes.contains(&"Fec#Puesta -> Fec.Puesta".to_string()));
    assert!(applied[0].changes.contains(&"Pos#OFA -> Pos.OFA".to_string()));
    assert!(applied[1].changes.contains(&"LAR_DEC".to_string()));
    drop(state);

    // 历史数据原样保留（位置号不回填补零）
    assert_eq!(read_order_column(&db_path, "Pos.OFA").unwrap(), vec![Some("10".to_string())]);
    assert_eq!(
        read_order_column(&db_path, "Fec.Puesta").unwrap(),
        vec![Some("2024-01-15".to_string())]
    );

    // 再次打开不再执行任何迁移
    let reopened = AppState::new(db_path).unwrap();
    assert!(reopened.startup_schema.migrations.applied.is_empty());
    assert!(reopened.startup_schema.renamed_columns.is_empty());
    let report = reopened.migrate().unwrap();
    assert!(report.renamed_columns.is_empty());
    assert!(report.added_columns.is_empty());
}

#[test]
fn test_import_into_migrated_legacy_db() {
    logging::init_test();
    let dir = tempfile::tempdir().unwrap();
    let db_path = db_path_in(&dir);
    create_legacy_db(&db_path).unwrap();
    let state = AppState::new(db_path.clone()).unwrap();

    let content = format!(
        "{},Cliente\n{}\n{}\n",
        ORDER_HEADER,
        "5100001,10,M1,1,T1,MAT1,Tabla,1.5,4,2440,CLEAR,1.0,Otro",
        "5100005,1,M1,2,T1,MAT1,Tabla,,,2440,,0.5,Beta"
    );
    let csv = write_file(dir.path(), "pedidos.csv", &content);
    let report = state.import_api.import_orders(&csv, Some("planner")).unwrap();

    // 旧库中的 "10" 与新行的 "0010" 视为同一键
    assert_eq!(report.inserted, 1);
    assert_eq!(report.duplicates.len(), 1);
    assert_eq!(report.duplicates[0].row_number, 1);
    assert!(!report.duplicates[0].in_batch);
    assert!(report.incomplete.is_empty());
    assert!(report.ignored_columns.is_empty());

    let added = state.order_api.search_orders("5100005").unwrap();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].thickness.as_deref(), Some("1,5"));
    assert_eq!(added[0].width.as_deref(), Some("4"));
    assert_eq!(added[0].quality.as_deref(), Some("CLEAR"));
    drop(state);

    assert_eq!(
        read_order_column(&db_path, "Cliente").unwrap(),
        vec![Some("ACME".to_string()), Some("Beta".to_string())]
    );
    assert_eq!(
        read_order_column(&db_path, "Pos.OFA").unwrap(),
        vec![Some("10".to_string()), Some("0001".to_string())]
    );
}

#[test]
fn test_legacy_columns_renamed_again_on_reopen() {
    logging::init_test();
    let (dir, state) = create_test_state().unwrap();
    let db_path = state.db_path.clone();
    drop(state);

    // 外部工具整表替换回旧列名
    create_legacy_db(&db_path).unwrap();

    let reopened = AppState::new(db_path).unwrap();
    let schema = &reopened.startup_schema;
    assert!(schema.migrations.applied.is_empty());
    assert_eq!(
        schema.renamed_columns,
        vec!["Fec#Puesta -> Fec.Puesta", "Pos#OFA -> Pos.OFA"]
    );
    assert!(schema.added_columns.contains(&"LAR_DEC".to_string()));

    let orders = reopened.order_api.list_orders().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].position.as_deref(), Some("10"));
    assert_eq!(orders[0].placement_date.as_deref(), Some("2024-01-15"));
    assert_eq!(orders[0].thickness.as_deref(), Some("1,5"));
    drop(dir);
}

#[test]
fn test_failed_rename_leaves_legacy_table_untouched() {
    logging::init_test();
    let dir = tempfile::tempdir().unwrap();
    let db_path = db_path_in(&dir);
    create_legacy_db(&db_path).unwrap();
    let before = table_column_names(&db_path, "Pedidos").unwrap();

    execute_sql(&db_path, "CREATE VIEW broken_view AS SELECT * FROM missing_table;").unwrap();
    assert!(AppState::new(db_path.clone()).is_err());

    assert_eq!(table_column_names(&db_path, "Pedidos").unwrap(), before);
    assert!(before.contains(&"Pos#OFA".to_string()));
    assert_eq!(read_order_column(&db_path, "Pos#OFA").unwrap(), vec![Some("10".to_string())]);

    execute_sql(&db_path, "DROP VIEW broken_view;").unwrap();
    let state = AppState::new(db_path).unwrap();
    assert_eq!(state.startup_schema.migrations.applied.len(), 3);
}
