// ==========================================
// 看板对账集成测试
// ==========================================
// 测试目标: 订单 + 库存导入后的对账、筛选与级联可选项
// ==========================================


use syspro_planner::api::ReconciliationSummary;
use syspro_planner::app::AppState;
use syspro_planner::domain::OrderFilter;
use syspro_planner::logging;
use tempfile::TempDir;
use test_helpers::{create_test_state, write_file, write_order_csv};

const STOCK_HEADER: &str = "ESP_CUB,ANC_CUB,LAR_CUB,CALIDAD,M3,Vol_Util,CAMP_1,Bodega";

fn seeded_state() -> (TempDir, AppState) {
    logging::init_test();
    let (dir, state) = create_test_state().expect("Failed to create test state");

    let orders = write_order_csv(
        dir.path(),
        "pedidos.csv",
        &[
            "5100001,10,M1,2,T1,MAT1,Tabla,1_1/2,4,2440,CLEAR_GB,1.5",
            "5100002,10,M1,1,T1,MAT1,Tabla,1.5,4,2440,CLEAR,0.5",
            "5100003,10,M2,1,T2,MAT2,Tabla,2,6,1220,MCM,1.0",
            "5100004,10,,1,T2,MAT2,Tabla,2,6,1220,MCM,9.0",
        ],
    );
    state.import_api.import_orders(&orders, None).unwrap();

    let stock = write_file(
        dir.path(),
        "stock.csv",
        &format!(
            "{}\n1.5,4,2440,CLEAR_GB,3,2.5,x,B1\n3/4,4,2440,MCM_PECA,1,0.75,x,B1\n",
            STOCK_HEADER
        ),
    );
    let report = state.import_api.import_stock(&stock).unwrap();
    assert_eq!(report.imported, 2);
    assert_eq!(report.dropped_columns, vec!["CAMP_1".to_string()]);
    assert_eq!(report.ignored_columns, vec!["Bodega".to_string()]);

    (dir, state)
}

fn row<'a>(
    summary: &'a ReconciliationSummary,
    thickness: &str,
) -> &'a syspro_planner::domain::ReconciliationRow {
    summary
        .rows
        .iter()
        .find(|r| r.key.thickness.as_deref() == Some(thickness))
        .unwrap_or_else(|| panic!("missing group {}", thickness))
}

#[test]
fn test_reconcile_full_outer_join() {
    let (_dir, state) = seeded_state();

    let summary = state.dashboard_api.reconcile(&OrderFilter::default()).unwrap();
    assert_eq!(summary.rows.len(), 3);

    let clear = row(&summary, "1,5");
    assert_eq!(clear.key.quality.as_deref(), Some("CLEAR"));
    assert_eq!(clear.ordered_volume_m3, 2.0);
    assert_eq!(clear.stock_volume_m3, 2.5);
    assert_eq!(clear.difference_m3, 0.5);

    let short = row(&summary, "2");
    assert_eq!(short.stock_volume_m3, 0.0);
    assert_eq!(short.difference_m3, -1.0);
    assert!(short.is_shortage());

    let stock_only = row(&summary, "0,75");
    assert_eq!(stock_only.ordered_volume_m3, 0.0);
    assert_eq!(stock_only.key.quality.as_deref(), Some("MCM"));

    // 无机台的订单不参与对账
    assert_eq!(summary.total_ordered_m3, 3.0);
    assert_eq!(summary.total_stock_m3, 3.25);
    assert_eq!(summary.shortage_count, 1);
}

#[test]
fn test_machine_filter_applies_to_orders_only() {
    let (_dir, state) = seeded_state();

    let filter = OrderFilter {
        machines: vec!["M1".to_string()],
        ..Default::default()
    };
    let summary = state.dashboard_api.reconcile(&filter).unwrap();
    let thicknesses: Vec<&str> = summary
        .rows
        .iter()
        .filter_map(|r| r.key.thickness.as_deref())
        .collect();
    assert_eq!(thicknesses, vec!["0,75", "1,5"]);

    let filter = OrderFilter {
        thicknesses: vec!["1.5".to_string()],
        ..Default::default()
    };
    let summary = state.dashboard_api.reconcile(&filter).unwrap();
    assert_eq!(summary.rows.len(), 1);
    assert_eq!(summary.rows[0].difference_m3, 0.5);
}

#[test]
fn test_filtered_orders_view() {
    let (_dir, state) = seeded_state();

    let orders = state
        .dashboard_api
        .filtered_orders(&OrderFilter::default())
        .unwrap();
    let sequences: Vec<Option<i64>> = orders.iter().map(|o| o.sequence).collect();
    assert_eq!(sequences, vec![Some(1), Some(1), Some(2)]);
    assert!(orders.iter().all(|o| o.order_number.as_deref() != Some("5100004")));

    let by_number = state
        .dashboard_api
        .filtered_orders(&OrderFilter {
            order_number_query: Some("0003".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(by_number.len(), 1);
    assert_eq!(by_number[0].machine.as_deref(), Some("M2"));
}

#[test]
fn test_cascading_filter_options() {
    let (_dir, state) = seeded_state();

    let all = state
        .dashboard_api
        .filter_options(&OrderFilter::default())
        .unwrap();
    assert_eq!(all.machines, vec!["M1", "M2"]);
    assert_eq!(all.thicknesses, vec!["1,5", "2"]);
    assert_eq!(all.qualities, vec!["CLEAR", "MCM"]);

    let m2 = state
        .dashboard_api
        .filter_options(&OrderFilter {
            machines: vec!["M2".to_string()],
            ..Default::default()
        })
        .unwrap();
    assert_eq!(m2.machines, vec!["M1", "M2"]);
    assert_eq!(m2.thicknesses, vec!["2"]);
    assert_eq!(m2.widths, vec!["6"]);
    assert_eq!(m2.lengths, vec!["1220"]);
}

#[test]
fn test_stock_import_replaces_table() {
    let (dir, state) = seeded_state();

    let stock = write_file(
        dir.path(),
        "stock2.csv",
        &format!("{}\n2,6,1220,,1,1.5,x,B2\n", STOCK_HEADER),
    );
    state.import_api.import_stock(&stock).unwrap();

    let summary = state.dashboard_api.reconcile(&OrderFilter::default()).unwrap();
    assert_eq!(summary.total_stock_m3, 1.5);

    // 空白 CALIDAD 按 USA 入库，不与 MCM 订单合并
    let usa = summary
        .rows
        .iter()
        .find(|r| r.key.quality.as_deref() == Some("USA"))
        .unwrap();
    assert_eq!(usa.stock_volume_m3, 1.5);
    assert_eq!(row(&summary, "2").key.quality.as_deref(), Some("MCM"));
}
