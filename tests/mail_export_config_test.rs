// ==========================================
// 邮箱扫描 / 表格导出 / 配置集成测试
// ==========================================
// 测试目标: 配置驱动的邮箱扫描与导出目录，配置校验
// ==========================================


use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use syspro_planner::api::ApiError;
use syspro_planner::app::AppState;
use syspro_planner::logging;
use tempfile::TempDir;
use test_helpers::{create_test_state, write_file, write_order_csv};

const INBOX: &str = r#"[
    {"Subject": "Publicación a SAP", "Body": "OFA 5100009, 5100001", "ReceivedTime": "2024-06-09T10:00:00"},
    {"Subject": "Publicación a SAP", "Body": "5100007 y 5100009", "ReceivedTime": "2024-06-08T09:00:00"},
    {"Subject": "Otro asunto", "Body": "5100008", "ReceivedTime": "2024-06-10T08:00:00"},
    {"Subject": "Publicación a SAP", "Body": "5100005", "ReceivedTime": "2024-06-07T12:00:00"},
    {"Subject": "Publicación a SAP", "Body": "5100006", "ReceivedTime": "2024-06-05T12:00:00"}
]"#;

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 10)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn state_with_order() -> (TempDir, AppState) {
    logging::init_test();
    let (dir, state) = create_test_state().expect("Failed to create test state");
    let csv = write_order_csv(
        dir.path(),
        "pedidos.csv",
        &["5100001,10,M1,1,T1,MAT1,Tabla,1.5,4,2440,CLEAR,1.0"],
    );
    state.import_api.import_orders(&csv, None).unwrap();
    (dir, state)
}

#[test]
fn test_scan_mail_writes_new_order_numbers() {
    let (dir, state) = state_with_order();
    let inbox = write_file(dir.path(), "inbox.json", INBOX);
    let handoff = dir.path().join("handoff.txt");

    let response = state
        .import_api
        .scan_mail(&inbox, now(), Some(&handoff))
        .unwrap();

    assert_eq!(response.scanned_messages, 5);
    assert_eq!(response.new_order_numbers, vec!["5100009", "5100007", "5100005"]);
    assert_eq!(response.handoff_file, handoff);
    assert_eq!(
        fs::read_to_string(&handoff).unwrap(),
        "5100009\n5100007\n5100005\n"
    );
}

#[test]
fn test_scan_mail_follows_config() {
    let (dir, state) = state_with_order();
    let inbox = write_file(dir.path(), "inbox.json", INBOX);
    let handoff = dir.path().join("erp").join("pegar.txt");

    state
        .config_api
        .update_config("erp.handoff_file", &handoff.to_string_lossy())
        .unwrap();
    state.config_api.update_config("mail.lookback_days", "1").unwrap();

    let response = state.import_api.scan_mail(&inbox, now(), None).unwrap();
    assert_eq!(response.new_order_numbers, vec!["5100009"]);
    assert_eq!(fs::read_to_string(&handoff).unwrap(), "5100009\n");

    state.config_api.update_config("mail.subject", "Otro asunto").unwrap();
    let response = state.import_api.scan_mail(&inbox, now(), None).unwrap();
    assert_eq!(response.new_order_numbers, vec!["5100008"]);
}

#[test]
fn test_scan_mail_missing_inbox() {
    let (dir, state) = state_with_order();
    let result = state
        .import_api
        .scan_mail(&dir.path().join("nope.json"), now(), Some(&dir.path().join("h.txt")));
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[test]
fn test_export_tables() {
    let (dir, state) = state_with_order();
    let stock = write_file(
        dir.path(),
        "stock.csv",
        "ESP_CUB,ANC_CUB,LAR_CUB,CALIDAD,M3,Vol_Util\n1.5,4,2440,CLEAR_GB,3,2.5\n",
    );
    state.import_api.import_stock(&stock).unwrap();

    let out = dir.path().join("out");
    let report = state.dashboard_api.export_tables(Some(&out)).unwrap();
    assert_eq!(report.orders.rows, 1);
    assert_eq!(report.stock.rows, 1);

    let orders_csv = fs::read_to_string(&report.orders.path).unwrap();
    let mut lines = orders_csv.lines();
    assert!(lines.next().unwrap().contains("OFA"));
    assert!(lines.next().unwrap().contains("5100001"));

    let stock_csv = fs::read_to_string(&report.stock.path).unwrap();
    assert!(stock_csv.contains("CLEAR"));
    assert!(report.stock.path.starts_with(&out));
}

#[test]
fn test_export_uses_configured_dir() {
    let (dir, state) = state_with_order();
    let configured = dir.path().join("exports");
    state
        .config_api
        .update_config("export.dir", &configured.to_string_lossy())
        .unwrap();

    let report = state.dashboard_api.export_tables(None).unwrap();
    assert!(report.orders.path.starts_with(&configured));
    assert!(report.orders.path.exists());
    assert_eq!(report.stock.rows, 0);
}

#[test]
fn test_config_defaults_and_validation() {
    let (_dir, state) = state_with_order();

    let entries = state.config_api.list_configs().unwrap();
    let lookback = entries.iter().find(|e| e.key == "mail.lookback_days").unwrap();
    assert_eq!(lookback.value, "3");
    assert!(lookback.is_default);

    let subject = state.config_api.get_config("mail.subject").unwrap();
    assert_eq!(subject.value, "Publicación a SAP");

    assert!(matches!(
        state.config_api.update_config("mail.lookback_days", "-1"),
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        state.config_api.update_config("mail.order_pattern", "("),
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        state.config_api.update_config("no.such.key", "x"),
        Err(ApiError::ValidationError(_))
    ));
    assert!(matches!(
        state.config_api.get_config("no.such.key"),
        Err(ApiError::NotFound(_))
    ));

    let updated = state.config_api.update_config("mail.lookback_days", "7").unwrap();
    assert_eq!(updated.value, "7");
    assert!(!updated.is_default);
}
