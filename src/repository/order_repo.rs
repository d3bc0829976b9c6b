// ==========================================
// SysPro 排产看板 - 订单仓储
// ==========================================
// 职责: Pedidos 表的查询/写入/单元格编辑
// 红线: Repository 不含业务规则（去重/补全/规范化在 importer）
// 约束: 列名含 '.' 与 '#'，SQL 中一律经 quote_ident 引用
// ==========================================

use crate::db::{quote_ident, table_columns};
use crate::domain::load_batch::NewLoadBatch;
use crate::domain::order::columns as cols;
use crate::domain::order::{MaterialAttributes, Order, OrderEdit, RawOrderRecord};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::load_batch_repo::LoadBatchRepository;
use crate::repository::row_values::{int_value, real_value, text_value};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex};
use tracing::debug;

// ==========================================
// OrderRepository
// ==========================================
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

/// SELECT rowid + 全部已知列
fn select_sql() -> String {
    let list = cols::KNOWN
        .iter()
        .map(|(name, _)| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT rowid, {} FROM {}", list, quote_ident(cols::TABLE))
}

fn map_order_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    // 列顺序与 cols::KNOWN 一致，0 号为 rowid
    Ok(Order {
        id: row.get(0)?,
        recorded_at: text_value(row.get_ref(1)?),
        order_number: text_value(row.get_ref(2)?),
        position: text_value(row.get_ref(3)?),
        machine: text_value(row.get_ref(4)?),
        sequence: int_value(row.get_ref(5)?),
        placement_week: text_value(row.get_ref(6)?),
        placement_date: text_value(row.get_ref(7)?),
        order_date: text_value(row.get_ref(8)?),
        template: text_value(row.get_ref(9)?),
        material_code: text_value(row.get_ref(10)?),
        material_text: text_value(row.get_ref(11)?),
        thickness: text_value(row.get_ref(12)?),
        width: text_value(row.get_ref(13)?),
        length: text_value(row.get_ref(14)?),
        quality: text_value(row.get_ref(15)?),
        units: real_value(row.get_ref(16)?),
        volume_m3: real_value(row.get_ref(17)?),
        load_id: int_value(row.get_ref(18)?),
    })
}

impl OrderRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 取连接并确认 Pedidos 含全部已知列
    ///
    /// # 说明
    /// SQLite 会把不存在的双引号列名当作字符串字面量，
    /// 缺列时必须在查询前报错，否则读出的是列名本身
    fn get_checked_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        let conn = self.get_conn()?;
        let live = table_columns(&conn, cols::TABLE)?;
        let missing: Vec<&str> = cols::KNOWN
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| !live.iter().any(|c| c == name))
            .collect();
        if !missing.is_empty() {
            return Err(RepositoryError::ValidationError(format!(
                "{} 缺少列: {}（请先执行 migrate）",
                cols::TABLE,
                missing.join(", ")
            )));
        }
        Ok(conn)
    }

    /// 目标表实际列名（导入时据此裁剪字段）
    pub fn column_names(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        Ok(table_columns(&conn, cols::TABLE)?)
    }

    fn query_orders(&self, sql: &str, args: Vec<Value>) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_checked_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let orders = stmt
            .query_map(params_from_iter(args), map_order_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(orders)
    }

    /// 全部订单（新 → 旧）
    pub fn list_all(&self) -> RepositoryResult<Vec<Order>> {
        self.query_orders(&format!("{} ORDER BY rowid DESC", select_sql()), Vec::new())
    }

    /// 按订单号子串搜索
    pub fn search_by_order_number(&self, query: &str) -> RepositoryResult<Vec<Order>> {
        let sql = format!(
            "{} WHERE {} LIKE ?1 ORDER BY rowid DESC",
            select_sql(),
            quote_ident(cols::ORDER_NUMBER)
        );
        self.query_orders(&sql, vec![Value::Text(format!("%{}%", query.trim()))])
    }

    /// 某批次导入的订单（按导入顺序）
    pub fn list_by_load(&self, load_id: i64) -> RepositoryResult<Vec<Order>> {
        let sql = format!(
            "{} WHERE {} = ?1 ORDER BY rowid",
            select_sql(),
            quote_ident(cols::LOAD_ID)
        );
        self.query_orders(&sql, vec![Value::Integer(load_id)])
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Order>> {
        let conn = self.get_checked_conn()?;
        let order = conn
            .query_row(
                &format!("{} WHERE rowid = ?1", select_sql()),
                params![id],
                map_order_row,
            )
            .optional()?;
        Ok(order)
    }

    /// 已存在的 (OFA, Pos.OFA) 原值
    ///
    /// # 说明
    /// 返回库内原始文本，键的规范化由调用方完成
    pub fn existing_keys(&self) -> RepositoryResult<Vec<(String, Option<String>)>> {
        let conn = self.get_checked_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, {} FROM {} WHERE {} IS NOT NULL",
            quote_ident(cols::ORDER_NUMBER),
            quote_ident(cols::POSITION),
            quote_ident(cols::TABLE),
            quote_ident(cols::ORDER_NUMBER),
        ))?;
        let keys = stmt
            .query_map([], |row| {
                Ok((text_value(row.get_ref(0)?), text_value(row.get_ref(1)?)))
            })?
            .filter_map(|r| match r {
                Ok((Some(ofa), pos)) => Some(Ok((ofa, pos))),
                Ok((None, _)) => None,
                Err(e) => Some(Err(e)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    /// 已存在的订单号（任意行号）
    pub fn existing_order_numbers(&self) -> RepositoryResult<HashSet<String>> {
        let conn = self.get_checked_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT {} FROM {}",
            quote_ident(cols::ORDER_NUMBER),
            quote_ident(cols::TABLE),
        ))?;
        let numbers = stmt
            .query_map([], |row| Ok(text_value(row.get_ref(0)?)))?
            .filter_map(|r| r.transpose())
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(numbers)
    }

    /// 同模板+同物料的最近一条完整属性
    ///
    /// # 参数
    /// - template / material_code: 去首尾空白后做文本相等比较
    ///
    /// # 返回
    /// - 最大 rowid 且厚/宽/等级均非空的那一行
    pub fn latest_material_attributes(
        &self,
        template: &str,
        material_code: &str,
    ) -> RepositoryResult<Option<MaterialAttributes>> {
        let conn = self.get_checked_conn()?;
        let sql = format!(
            "SELECT {t}, {w}, {q} FROM {table}
             WHERE TRIM(CAST({tpl} AS TEXT)) = ?1 AND TRIM(CAST({mat} AS TEXT)) = ?2
               AND NULLIF(TRIM(CAST({t} AS TEXT)), '') IS NOT NULL
               AND NULLIF(TRIM(CAST({w} AS TEXT)), '') IS NOT NULL
               AND NULLIF(TRIM(CAST({q} AS TEXT)), '') IS NOT NULL
             ORDER BY rowid DESC LIMIT 1",
            t = quote_ident(cols::THICKNESS),
            w = quote_ident(cols::WIDTH),
            q = quote_ident(cols::QUALITY),
            tpl = quote_ident(cols::TEMPLATE),
            mat = quote_ident(cols::MATERIAL_CODE),
            table = quote_ident(cols::TABLE),
        );

        let found = conn
            .query_row(&sql, params![template.trim(), material_code.trim()], |row| {
                Ok((
                    text_value(row.get_ref(0)?),
                    text_value(row.get_ref(1)?),
                    text_value(row.get_ref(2)?),
                ))
            })
            .optional()?;

        Ok(match found {
            Some((Some(thickness), Some(width), Some(quality))) => Some(MaterialAttributes {
                thickness,
                width,
                quality,
            }),
            _ => None,
        })
    }

    /// 写入一个导入批次及其订单行（同一事务）
    ///
    /// # 参数
    /// - batch: 批次信息（写入 HistorialCargas）
    /// - records: 已清洗、去重的订单行，每行打上新批次 id
    /// - recorded_at: Hora_Grabado
    ///
    /// # 返回
    /// - (批次 id, 插入行数)
    ///
    /// # 说明
    /// 任一行失败则批次记录一并回滚
    pub fn insert_load_with_orders(
        &self,
        batch: &NewLoadBatch,
        records: &[RawOrderRecord],
        recorded_at: &str,
    ) -> RepositoryResult<(i64, usize)> {
        let conn = self.get_checked_conn()?;
        let tx = conn.unchecked_transaction()?;

        let load_id = LoadBatchRepository::insert_in_tx(&tx, batch)?;

        // 历史列：取所有行 extra_columns 的并集
        let extras: BTreeSet<&str> = records
            .iter()
            .flat_map(|r| r.extra_columns.keys().map(String::as_str))
            .collect();

        let names = cols::KNOWN
            .iter()
            .map(|(name, _)| *name)
            .chain(extras.iter().copied())
            .map(quote_ident)
            .collect::<Vec<_>>();
        let placeholders = (1..=names.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(cols::TABLE),
            names.join(", "),
            placeholders
        ))?;

        let mut inserted = 0;
        for r in records {
            let mut values: Vec<Value> = vec![
                Value::Text(recorded_at.to_string()),
                opt_text(&r.order_number),
                opt_text(&r.position),
                opt_text(&r.machine),
                r.sequence.map_or(Value::Null, Value::Integer),
                opt_text(&r.placement_week),
                opt_text(&r.placement_date),
                opt_text(&r.order_date),
                opt_text(&r.template),
                opt_text(&r.material_code),
                opt_text(&r.material_text),
                opt_text(&r.thickness),
                opt_text(&r.width),
                opt_text(&r.length),
                opt_text(&r.quality),
                r.units.map_or(Value::Null, Value::Real),
                r.volume_m3.map_or(Value::Null, Value::Real),
                Value::Integer(load_id),
            ];
            for extra in &extras {
                values.push(
                    r.extra_columns
                        .get(*extra)
                        .map_or(Value::Null, |v| Value::Text(v.clone())),
                );
            }
            stmt.execute(params_from_iter(values))?;
            inserted += 1;
        }
        drop(stmt);

        tx.commit()?;
        debug!(load_id, inserted, "批次写入完成");
        Ok((load_id, inserted))
    }

    /// 批量应用单元格编辑（同一事务）
    ///
    /// # 返回
    /// - 被修改的行数
    ///
    /// # 错误
    /// - NotFound: 任一 id 不存在，整批回滚
    pub fn apply_edits(&self, edits: &[OrderEdit]) -> RepositoryResult<usize> {
        let conn = self.get_checked_conn()?;
        let tx = conn.unchecked_transaction()?;
        let table = quote_ident(cols::TABLE);

        let mut updated = 0;
        for edit in edits {
            let mut sets: Vec<String> = Vec::new();
            let mut args: Vec<Value> = Vec::new();
            let mut push = |col: &str, value: Value| {
                args.push(value);
                sets.push(format!("{} = ?{}", quote_ident(col), args.len()));
            };

            if let Some(v) = &edit.machine {
                push(cols::MACHINE, text_or_null(v));
            }
            if let Some(v) = edit.sequence {
                push(cols::SEQUENCE, Value::Integer(v));
            }
            if let Some(v) = &edit.material_code {
                push(cols::MATERIAL_CODE, text_or_null(v));
            }
            if let Some(v) = &edit.material_text {
                push(cols::MATERIAL_TEXT, text_or_null(v));
            }
            if let Some(v) = &edit.thickness {
                push(cols::THICKNESS, text_or_null(v));
            }
            if let Some(v) = &edit.width {
                push(cols::WIDTH, text_or_null(v));
            }
            if let Some(v) = &edit.length {
                push(cols::LENGTH, text_or_null(v));
            }
            if let Some(v) = &edit.quality {
                push(cols::QUALITY, text_or_null(v));
            }
            if let Some(v) = edit.volume_m3 {
                push(cols::VOLUME, Value::Real(v));
            }

            let affected = if sets.is_empty() {
                tx.query_row(
                    &format!("SELECT COUNT(*) FROM {} WHERE rowid = ?1", table),
                    params![edit.id],
                    |row| row.get::<_, i64>(0),
                )? as usize
            } else {
                args.push(Value::Integer(edit.id));
                let sql = format!(
                    "UPDATE {} SET {} WHERE rowid = ?{}",
                    table,
                    sets.join(", "),
                    args.len()
                );
                tx.execute(&sql, params_from_iter(args))?
            };

            if affected == 0 {
                return Err(RepositoryError::NotFound {
                    entity: cols::TABLE.to_string(),
                    id: edit.id.to_string(),
                });
            }
            updated += affected;
        }

        tx.commit()?;
        Ok(updated)
    }
}

fn opt_text(v: &Option<String>) -> Value {
    v.as_ref().map_or(Value::Null, |s| Value::Text(s.clone()))
}

fn text_or_null(v: &str) -> Value {
    let trimmed = v.trim();
    if trimmed.is_empty() {
        Value::Null
    } else {
        Value::Text(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use chrono::NaiveDate;

    fn setup() -> OrderRepository {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        OrderRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn new_batch(rows: i64) -> NewLoadBatch {
        NewLoadBatch {
            loaded_at: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            row_count: rows,
            source_file: Some("pedidos.csv".to_string()),
            operator: None,
        }
    }

    fn record(ofa: &str, pos: &str, thickness: Option<&str>) -> RawOrderRecord {
        RawOrderRecord {
            order_number: Some(ofa.to_string()),
            position: Some(pos.to_string()),
            template: Some("T1".to_string()),
            material_code: Some("M1".to_string()),
            thickness: thickness.map(str::to_string),
            width: Some("100".to_string()),
            quality: Some("CLEAR".to_string()),
            volume_m3: Some(1.5),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_load_tags_rows() {
        let repo = setup();
        let (load_id, inserted) = repo
            .insert_load_with_orders(
                &new_batch(2),
                &[record("5100001", "0010", Some("38")), record("5100001", "0020", None)],
                "2024-05-01 09:00:00",
            )
            .unwrap();
        assert_eq!(inserted, 2);

        let rows = repo.list_by_load(load_id).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|o| o.load_id == Some(load_id)));
        assert_eq!(rows[0].position.as_deref(), Some("0010"));
        assert_eq!(rows[0].volume_m3, Some(1.5));
    }

    #[test]
    fn test_latest_material_attributes_prefers_newest_complete_row() {
        let repo = setup();
        let mut older = record("1", "0010", Some("25"));
        older.quality = Some("MCM".to_string());
        let newer = record("2", "0010", Some("38"));
        let incomplete = record("3", "0010", None);
        repo.insert_load_with_orders(&new_batch(3), &[older, newer, incomplete], "x")
            .unwrap();

        let attrs = repo.latest_material_attributes(" T1 ", "M1").unwrap().unwrap();
        assert_eq!(attrs.thickness, "38");
        assert_eq!(attrs.quality, "CLEAR");
        assert!(repo.latest_material_attributes("T9", "M1").unwrap().is_none());
    }

    #[test]
    fn test_apply_edits_rolls_back_on_unknown_id() {
        let repo = setup();
        repo.insert_load_with_orders(&new_batch(1), &[record("5100001", "0010", Some("38"))], "x")
            .unwrap();
        let id = repo.list_all().unwrap()[0].id;

        let edits = vec![
            OrderEdit {
                id,
                machine: Some("M02".to_string()),
                ..Default::default()
            },
            OrderEdit {
                id: id + 999,
                sequence: Some(3),
                ..Default::default()
            },
        ];
        let err = repo.apply_edits(&edits).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
        assert_eq!(repo.find_by_id(id).unwrap().unwrap().machine, None);

        let ok = repo.apply_edits(&edits[..1]).unwrap();
        assert_eq!(ok, 1);
        assert_eq!(repo.find_by_id(id).unwrap().unwrap().machine.as_deref(), Some("M02"));
    }

    #[test]
    fn test_existing_keys_and_numbers() {
        let repo = setup();
        repo.insert_load_with_orders(
            &new_batch(2),
            &[record("5100001", "0010", None), record("5100002", "0010", None)],
            "x",
        )
        .unwrap();

        let keys = repo.existing_keys().unwrap();
        assert_eq!(keys.len(), 2);
        let numbers = repo.existing_order_numbers().unwrap();
        assert!(numbers.contains("5100001"));
        assert!(numbers.contains("5100002"));

        let found = repo.search_by_order_number("0002").unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_missing_known_column_fails_loudly() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"CREATE TABLE "Pedidos" ("OFA" TEXT, "Pos#OFA" TEXT, "Fec#Puesta" TEXT);
               INSERT INTO "Pedidos" VALUES ('5100001', '10', '2024-01-02');"#,
        )
        .unwrap();
        let repo = OrderRepository::from_connection(Arc::new(Mutex::new(conn)));

        match repo.list_all() {
            Err(RepositoryError::ValidationError(msg)) => {
                assert!(msg.contains("Pos.OFA"));
                assert!(msg.contains("Fec.Puesta"));
            }
            other => panic!("Expected ValidationError, got {:?}", other),
        }
        assert!(matches!(repo.existing_keys(), Err(RepositoryError::ValidationError(_))));
        assert_eq!(repo.column_names().unwrap().len(), 3);
    }
}

