// ==========================================
// SysPro 排产看板 - 库存仓储
// ==========================================
// 职责: StockBlanks 表整表替换与读取
// ==========================================

use crate::db::quote_ident;
use crate::domain::stock::columns as cols;
use crate::domain::stock::StockItem;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_values::{real_value, text_value};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct StockRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StockRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 整表替换（同一事务：先清空再写入）
    ///
    /// # 返回
    /// - 写入行数
    pub fn replace_all(&self, items: &[StockItem]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let table = quote_ident(cols::TABLE);

        tx.execute(&format!("DELETE FROM {}", table), [])?;

        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} ({}, {}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            table,
            quote_ident(cols::THICKNESS),
            quote_ident(cols::WIDTH),
            quote_ident(cols::LENGTH),
            quote_ident(cols::QUALITY),
            quote_ident(cols::GROSS_VOLUME),
            quote_ident(cols::USABLE_VOLUME),
        ))?;

        let mut count = 0;
        for item in items {
            stmt.execute(params![
                item.thickness,
                item.width,
                item.length,
                item.quality,
                item.gross_volume_m3,
                item.usable_volume_m3,
            ])?;
            count += 1;
        }
        drop(stmt);

        tx.commit()?;
        Ok(count)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<StockItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, {}, {}, {}, {}, {} FROM {} ORDER BY rowid",
            quote_ident(cols::THICKNESS),
            quote_ident(cols::WIDTH),
            quote_ident(cols::LENGTH),
            quote_ident(cols::QUALITY),
            quote_ident(cols::GROSS_VOLUME),
            quote_ident(cols::USABLE_VOLUME),
            quote_ident(cols::TABLE),
        ))?;

        let items = stmt
            .query_map([], |row| {
                Ok(StockItem {
                    thickness: text_value(row.get_ref(0)?),
                    width: text_value(row.get_ref(1)?),
                    length: text_value(row.get_ref(2)?),
                    quality: text_value(row.get_ref(3)?),
                    gross_volume_m3: real_value(row.get_ref(4)?),
                    usable_volume_m3: real_value(row.get_ref(5)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }
}
