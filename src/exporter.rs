// ==========================================
// SysPro 排产看板 - 表格导出
// ==========================================
// 职责: Pedidos / StockBlanks 整表导出为 CSV
// 输出: <dir>/Pedidos_export.csv, <dir>/StockBlanks_export.csv
// 说明: 全部列原样导出（含历史列），缺失值为空串
// ==========================================

use crate::domain::order::columns as order_cols;
use crate::domain::stock::columns as stock_cols;
use crate::repository::row_values::read_table_as_text;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{info, instrument};

pub const ORDERS_EXPORT_FILE: &str = "Pedidos_export.csv";
pub const STOCK_EXPORT_FILE: &str = "StockBlanks_export.csv";

/// 导出错误类型
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("读取表失败 (table={table}): {message}")]
    TableReadError { table: String, message: String },

    #[error("写入文件失败: {0}")]
    FileWriteError(String),

    #[error("CSV 写入失败: {0}")]
    CsvWriteError(#[from] csv::Error),
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::FileWriteError(err.to_string())
    }
}

pub type ExportResult<T> = Result<T, ExportError>;

/// 单个文件导出结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedFile {
    pub table: String,
    pub path: PathBuf,
    pub rows: usize,
}

/// 导出结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportReport {
    pub orders: ExportedFile,
    pub stock: ExportedFile,
}

pub struct Exporter {
    conn: Arc<Mutex<Connection>>,
}

impl Exporter {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 导出两张表到目录（目录不存在则创建，同名文件覆盖）
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub fn export_tables(&self, dir: &Path) -> ExportResult<ExportReport> {
        std::fs::create_dir_all(dir)?;

        let orders = self.export_table(order_cols::TABLE, &dir.join(ORDERS_EXPORT_FILE))?;
        let stock = self.export_table(stock_cols::TABLE, &dir.join(STOCK_EXPORT_FILE))?;

        info!(
            orders = orders.rows,
            stock = stock.rows,
            "表格导出完成"
        );
        Ok(ExportReport { orders, stock })
    }

    fn export_table(&self, table: &str, path: &Path) -> ExportResult<ExportedFile> {
        let (headers, rows) = {
            let conn = self
                .conn
                .lock()
                .map_err(|e| ExportError::LockError(e.to_string()))?;
            read_table_as_text(&conn, table).map_err(|e| ExportError::TableReadError {
                table: table.to_string(),
                message: e.to_string(),
            })?
        };

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&headers)?;
        for row in &rows {
            writer.write_record(row)?;
        }
        writer.flush()?;

        Ok(ExportedFile {
            table: table.to_string(),
            path: path.to_path_buf(),
            rows: rows.len(),
        })
    }
}
