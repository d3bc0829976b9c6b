// ==========================================
// SysPro 排产看板 - 导入 API
// ==========================================
// 职责: 订单/抽取库/库存导入，邮箱扫描新订单号
// ==========================================

use crate::api::error::ApiResult;
use crate::config::{ConfigManager, ImportConfigReader};
use crate::domain::import_report::{OrderImportReport, StockImportReport};
use crate::importer::conflict_handler::ConflictHandler;
use crate::importer::file_parser::ExtractParser;
use crate::importer::mail_scan::{write_handoff_file, MailSource, OrderNumberScanner};
use crate::importer::{JsonMailboxSource, OrderImporter, StockImporter};
use crate::repository::{OrderRepository, StockRepository};
use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

/// 邮箱扫描结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailScanResponse {
    /// 邮箱文件中的消息总数
    pub scanned_messages: usize,
    /// 库中尚不存在的订单号（按首次出现顺序）
    pub new_order_numbers: Vec<String>,
    /// 写出的 ERP 交接文件
    pub handoff_file: PathBuf,
}

/// 导入 API
pub struct ImportApi {
    conn: Arc<Mutex<Connection>>,
    config_manager: Arc<ConfigManager>,
}

impl ImportApi {
    pub fn new(conn: Arc<Mutex<Connection>>, config_manager: Arc<ConfigManager>) -> Self {
        Self {
            conn,
            config_manager,
        }
    }

    fn order_repo(&self) -> OrderRepository {
        OrderRepository::from_connection(self.conn.clone())
    }

    /// 导入订单表格（.xlsx/.xls/.ods/.csv，或按扩展名识别的 SQLite 抽取库）
    ///
    /// # 参数
    /// - file_path: 文件路径
    /// - operator: 记录到 HistorialCargas.usuario_pc
    ///
    /// # 返回
    /// - OrderImportReport: 插入数、重复行、拒绝行、补全失败行
    pub fn import_orders(&self, file_path: &Path, operator: Option<&str>) -> ApiResult<OrderImportReport> {
        let importer = OrderImporter::new(self.order_repo());
        let report = importer.import_file(file_path, operator)?;
        Ok(report)
    }

    /// 导入 ERP 抽取库中的订单表
    ///
    /// # 参数
    /// - table: 抽取库中的表名（默认 Pedidos）
    ///
    /// # 说明
    /// 与表格导入走同一条流水线（去重/补全/批次记录）
    pub fn import_extract(
        &self,
        extract_path: &Path,
        table: Option<&str>,
        operator: Option<&str>,
    ) -> ApiResult<OrderImportReport> {
        let mut parser = ExtractParser::default();
        if let Some(t) = table.map(str::trim).filter(|t| !t.is_empty()) {
            parser.table = t.to_string();
        }
        let importer = OrderImporter::with_components(
            self.order_repo(),
            Box::new(parser),
            Box::new(ConflictHandler),
        );
        let report = importer.import_file(extract_path, operator)?;
        Ok(report)
    }

    /// 导入库存表格（整表替换 StockBlanks）
    pub fn import_stock(&self, file_path: &Path) -> ApiResult<StockImportReport> {
        let importer = StockImporter::new(StockRepository::from_connection(self.conn.clone()));
        let report = importer.import_file(file_path)?;
        Ok(report)
    }

    /// 扫描导出的邮箱文件，找出库中没有的订单号并写交接文件
    ///
    /// # 参数
    /// - mailbox_path: 邮箱导出文件（JSON 数组）
    /// - now: 计算收件天数的基准时间
    /// - handoff_override: 指定交接文件路径（否则读配置 erp.handoff_file）
    pub fn scan_mail(
        &self,
        mailbox_path: &Path,
        now: NaiveDateTime,
        handoff_override: Option<&Path>,
    ) -> ApiResult<MailScanResponse> {
        let config = self.config_manager.as_ref();
        let scanner = OrderNumberScanner::new(
            &config.get_mail_subject()?,
            config.get_mail_lookback_days()?,
            &config.get_mail_order_pattern()?,
        )?;

        let messages = JsonMailboxSource::new(mailbox_path).fetch_messages()?;
        let existing = self.order_repo().existing_order_numbers()?;
        let new_order_numbers = scanner.new_order_numbers(&messages, now, &existing);

        let handoff_file = match handoff_override {
            Some(p) => p.to_path_buf(),
            None => config.get_erp_handoff_file()?,
        };
        write_handoff_file(&handoff_file, &new_order_numbers)?;

        info!(
            new = new_order_numbers.len(),
            handoff = %handoff_file.display(),
            "新订单号已写入交接文件"
        );

        Ok(MailScanResponse {
            scanned_messages: messages.len(),
            new_order_numbers,
            handoff_file,
        })
    }
}
