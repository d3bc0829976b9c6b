// ==========================================
// SysPro 排产看板 - 基础表结构
// ==========================================
// 职责: 新库建表（CREATE TABLE IF NOT EXISTS）
// 说明: 旧库中已存在的 Pedidos 不会被重建，缺列/错名交给 migrations
// ==========================================

use crate::db::quote_ident;
use crate::domain::order::columns as order_cols;
use crate::domain::stock::columns as stock_cols;
use rusqlite::Connection;
use tracing::debug;

/// 根据已知列清单拼出建表语句
fn create_table_sql(table: &str, known: &[(&str, &str)]) -> String {
    let cols = known
        .iter()
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE IF NOT EXISTS {} ({})", quote_ident(table), cols)
}

/// 建立全部基础表（幂等）
pub fn ensure_base_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL DEFAULT 'global',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS "HistorialCargas" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fecha_hora TEXT NOT NULL,
            cantidad INTEGER NOT NULL DEFAULT 0,
            archivo TEXT,
            usuario_pc TEXT
        );
        "#,
    )?;

    conn.execute(&create_table_sql(order_cols::TABLE, &order_cols::KNOWN), [])?;
    conn.execute(&create_table_sql(stock_cols::TABLE, &stock_cols::KNOWN), [])?;

    debug!("基础表结构已就绪");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{table_columns, table_exists};

    #[test]
    fn test_ensure_base_schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_base_schema(&conn).unwrap();
        // 再执行一次不报错
        ensure_base_schema(&conn).unwrap();

        for table in ["schema_version", "config_kv", "HistorialCargas", "Pedidos", "StockBlanks"] {
            assert!(table_exists(&conn, table).unwrap(), "missing table {}", table);
        }

        let cols = table_columns(&conn, "Pedidos").unwrap();
        assert_eq!(cols.len(), order_cols::KNOWN.len());
        assert!(cols.iter().any(|c| c == "Pos.OFA"));
        assert!(cols.iter().any(|c| c == "Vol#M3"));
    }
}
