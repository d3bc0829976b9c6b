// ==========================================
// SysPro 排产看板 - 版本化迁移
// ==========================================
// 职责: 把任意历史版本的订单库带到当前结构
// - v1: 历史列改名（Fec#Puesta → Fec.Puesta, Pos#OFA → Pos.OFA）
// - v2: 补齐缺失的规范列
// - v3: (OFA, Pos.OFA) 查询索引
// 红线: 每一步先检查后执行，与 schema_version 记录在同一事务内
// ==========================================

use crate::db::schema::ensure_base_schema;
use crate::db::{quote_ident, read_schema_version, table_columns};
use crate::domain::order::columns as order_cols;
use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::{debug, info, instrument};

/// 单个迁移步骤
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    apply: fn(&Connection) -> rusqlite::Result<Vec<String>>,
}

pub const MIGRATIONS: [Migration; 3] = [
    Migration {
        version: 1,
        description: "normalize_legacy_order_columns",
        apply: rename_legacy_columns,
    },
    Migration {
        version: 2,
        description: "ensure_order_columns",
        apply: add_missing_order_columns,
    },
    Migration {
        version: 3,
        description: "order_key_index",
        apply: create_order_key_index,
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedMigration {
    pub version: i64,
    pub description: String,
    pub changes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub applied: Vec<AppliedMigration>,
    pub current_version: i64,
}

/// 执行全部未记录的迁移
///
/// # 返回
/// - MigrationReport: 本次实际执行的步骤及当前版本
///
/// # 说明
/// 任一步骤失败时该步骤整体回滚，已提交的前序步骤保留
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<MigrationReport> {
    ensure_base_schema(conn)?;

    let start = read_schema_version(conn)?.unwrap_or(0);
    let mut current = start;
    let mut report = MigrationReport::default();

    for migration in MIGRATIONS.iter().filter(|m| m.version > start) {
        let tx = conn.unchecked_transaction()?;
        let changes = (migration.apply)(&tx)?;
        tx.execute(
            "INSERT INTO schema_version (version, description) VALUES (?1, ?2)",
            params![migration.version, migration.description],
        )?;
        tx.commit()?;

        info!(
            version = migration.version,
            description = migration.description,
            changes = ?changes,
            "迁移已执行"
        );

        current = migration.version;
        report.applied.push(AppliedMigration {
            version: migration.version,
            description: migration.description.to_string(),
            changes,
        });
    }

    if report.applied.is_empty() {
        debug!(version = current, "schema 已是最新");
    }
    report.current_version = current;
    Ok(report)
}

/// 历史列改名（可单独调用，自带事务）
///
/// # 返回
/// - 本次改名的列，形如 "Fec#Puesta -> Fec.Puesta"；已规范时为空
pub fn normalize_legacy_order_columns(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let tx = conn.unchecked_transaction()?;
    let renamed = rename_legacy_columns(&tx)?;
    tx.commit()?;
    Ok(renamed)
}

/// 补齐缺失的规范列（可单独调用，自带事务）
pub fn ensure_order_columns(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let tx = conn.unchecked_transaction()?;
    let added = add_missing_order_columns(&tx)?;
    tx.commit()?;
    Ok(added)
}

fn rename_legacy_columns(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let live = table_columns(conn, order_cols::TABLE)?;
    let mut renamed = Vec::new();

    for (legacy, canonical) in order_cols::LEGACY_RENAMES {
        let has_legacy = live.iter().any(|c| c == legacy);
        let has_canonical = live.iter().any(|c| c == canonical);
        if !has_legacy || has_canonical {
            continue;
        }

        conn.execute(
            &format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {}",
                quote_ident(order_cols::TABLE),
                quote_ident(legacy),
                quote_ident(canonical)
            ),
            [],
        )?;
        renamed.push(format!("{} -> {}", legacy, canonical));
    }

    Ok(renamed)
}

fn add_missing_order_columns(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let live = table_columns(conn, order_cols::TABLE)?;
    let mut added = Vec::new();

    for (name, ty) in order_cols::KNOWN {
        if live.iter().any(|c| c == name) {
            continue;
        }
        conn.execute(
            &format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                quote_ident(order_cols::TABLE),
                quote_ident(name),
                ty
            ),
            [],
        )?;
        added.push(name.to_string());
    }

    Ok(added)
}

fn create_order_key_index(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    conn.execute(
        &format!(
            "CREATE INDEX IF NOT EXISTS idx_pedidos_ofa_pos ON {} ({}, {})",
            quote_ident(order_cols::TABLE),
            quote_ident(order_cols::ORDER_NUMBER),
            quote_ident(order_cols::POSITION)
        ),
        [],
    )?;
    Ok(vec!["idx_pedidos_ofa_pos".to_string()])
}
