// ==========================================
// SysPro 排产看板 - 导入批次仓储
// ==========================================
// 职责: HistorialCargas 表的读写
// 红线: 批次一经写入不可修改
// ==========================================

use crate::domain::load_batch::{LoadBatch, NewLoadBatch, LOADED_AT_FORMAT};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_values::{int_value, text_value};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

/// 默认历史条数
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

pub struct LoadBatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LoadBatchRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在调用方事务内写入批次
    ///
    /// # 返回
    /// - 新批次 id
    pub(crate) fn insert_in_tx(conn: &Connection, batch: &NewLoadBatch) -> rusqlite::Result<i64> {
        conn.execute(
            r#"INSERT INTO "HistorialCargas" (fecha_hora, cantidad, archivo, usuario_pc)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![
                batch.loaded_at.format(LOADED_AT_FORMAT).to_string(),
                batch.row_count,
                batch.source_file,
                batch.operator,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 最近的导入批次（新 → 旧）
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<LoadBatch>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT id, fecha_hora, cantidad, archivo, usuario_pc
               FROM "HistorialCargas" ORDER BY id DESC LIMIT ?1"#,
        )?;

        let raw = stmt
            .query_map(params![limit as i64], map_raw_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawBatchRow::into_domain).collect()
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<LoadBatch>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                r#"SELECT id, fecha_hora, cantidad, archivo, usuario_pc
                   FROM "HistorialCargas" WHERE id = ?1"#,
                params![id],
                map_raw_row,
            )
            .optional()?;
        raw.map(RawBatchRow::into_domain).transpose()
    }
}

struct RawBatchRow {
    id: i64,
    loaded_at: Option<String>,
    row_count: Option<i64>,
    source_file: Option<String>,
    operator: Option<String>,
}

fn map_raw_row(row: &Row<'_>) -> rusqlite::Result<RawBatchRow> {
    Ok(RawBatchRow {
        id: row.get(0)?,
        loaded_at: text_value(row.get_ref(1)?),
        row_count: int_value(row.get_ref(2)?),
        source_file: text_value(row.get_ref(3)?),
        operator: text_value(row.get_ref(4)?),
    })
}

impl RawBatchRow {
    fn into_domain(self) -> RepositoryResult<LoadBatch> {
        let raw_time = self.loaded_at.unwrap_or_default();
        let loaded_at = parse_loaded_at(&raw_time).ok_or_else(|| RepositoryError::FieldValueError {
            field: "fecha_hora".to_string(),
            message: format!("无法解析时间: {}", raw_time),
        })?;

        Ok(LoadBatch {
            id: self.id,
            loaded_at,
            row_count: self.row_count.unwrap_or(0),
            source_file: self.source_file,
            operator: self.operator,
        })
    }
}

// 兼容历史库中带 'T' 或毫秒的写法
fn parse_loaded_at(raw: &str) -> Option<NaiveDateTime> {
    [LOADED_AT_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::ensure_base_schema;
    use chrono::NaiveDate;

    fn setup() -> (Arc<Mutex<Connection>>, LoadBatchRepository) {
        let conn = Connection::open_in_memory().unwrap();
        ensure_base_schema(&conn).unwrap();
        let shared = Arc::new(Mutex::new(conn));
        let repo = LoadBatchRepository::from_connection(shared.clone());
        (shared, repo)
    }

    fn batch(day: u32) -> NewLoadBatch {
        NewLoadBatch {
            loaded_at: NaiveDate::from_ymd_opt(2024, 3, day)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap(),
            row_count: day as i64,
            source_file: Some(format!("pedidos_{}.xlsx", day)),
            operator: Some("planner".to_string()),
        }
    }

    #[test]
    fn test_list_recent_newest_first() {
        let (conn, repo) = setup();
        {
            let c = conn.lock().unwrap();
            for day in 1..=12 {
                LoadBatchRepository::insert_in_tx(&c, &batch(day)).unwrap();
            }
        }

        let recent = repo.list_recent(DEFAULT_HISTORY_LIMIT).unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].row_count, 12);
        assert_eq!(recent[9].row_count, 3);
    }

    #[test]
    fn test_find_by_id_roundtrips_timestamp() {
        let (conn, repo) = setup();
        let id = {
            let c = conn.lock().unwrap();
            LoadBatchRepository::insert_in_tx(&c, &batch(5)).unwrap()
        };

        let found = repo.find_by_id(id).unwrap().unwrap();
        assert_eq!(found.loaded_at, batch(5).loaded_at);
        assert_eq!(found.source_file.as_deref(), Some("pedidos_5.xlsx"));
        assert!(repo.find_by_id(id + 100).unwrap().is_none());
    }

    #[test]
    fn test_parse_loaded_at_variants() {
        assert!(parse_loaded_at("2024-03-01 08:30:00").is_some());
        assert!(parse_loaded_at("2024-03-01T08:30:00").is_some());
        assert!(parse_loaded_at("2024-03-01 08:30:00.123").is_some());
        assert!(parse_loaded_at("yesterday").is_none());
    }
}
