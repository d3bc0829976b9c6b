// ==========================================
// SysPro 排产看板 - 订单导入器
// ==========================================
// 职责: 整合导入流程，从文件/抽取库到 Pedidos
// 流程: 解析 → 映射 → 清洗 → 补全 → 去重 → 落库（批次+订单同一事务）
// ==========================================

use crate::domain::import_report::{DuplicateRow, OrderImportReport, RejectedRow};
use crate::domain::load_batch::{NewLoadBatch, LOADED_AT_FORMAT};
use crate::domain::order::RawOrderRecord;
use crate::importer::attribute_completion::AttributeCompletion;
use crate::importer::conflict_handler::ConflictHandler as ConflictHandlerImpl;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::FieldMapper as FieldMapperImpl;
use crate::importer::file_parser::{SourceTable, UniversalFileParser};
use crate::importer::importer_trait::{ConflictHandler, FieldMapper, FileParser, OrderStore};
use chrono::Local;
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

// ==========================================
// OrderImporter
// ==========================================
pub struct OrderImporter<S: OrderStore> {
    store: S,
    file_parser: Box<dyn FileParser>,
    conflict_handler: Box<dyn ConflictHandler>,
    data_cleaner: DataCleaner,
}

impl<S: OrderStore> OrderImporter<S> {
    /// 使用默认组件（按扩展名选择解析器）
    pub fn new(store: S) -> Self {
        Self::with_components(store, Box::new(UniversalFileParser), Box::new(ConflictHandlerImpl))
    }

    pub fn with_components(
        store: S,
        file_parser: Box<dyn FileParser>,
        conflict_handler: Box<dyn ConflictHandler>,
    ) -> Self {
        Self {
            store,
            file_parser,
            conflict_handler,
            data_cleaner: DataCleaner,
        }
    }

    /// 从文件导入订单
    ///
    /// # 参数
    /// - file_path: .xlsx/.xls/.ods/.csv 或 SQLite 抽取库
    /// - operator: 记录到批次的操作员
    #[instrument(skip(self, file_path), fields(file = %file_path.as_ref().display()))]
    pub fn import_file<P: AsRef<Path>>(
        &self,
        file_path: P,
        operator: Option<&str>,
    ) -> ImportResult<OrderImportReport> {
        let path = file_path.as_ref();
        let table = self.file_parser.parse_to_raw_records(path)?;
        info!(rows = table.rows.len(), columns = table.headers.len(), "文件解析完成");

        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        self.import_table(&source, table, operator)
    }

    /// 导入已解析的表
    ///
    /// # 返回
    /// - OrderImportReport: 插入数、重复、拒绝、不完整行等
    ///
    /// # 说明
    /// 没有可插入的行时仍会记录一个导入批次
    pub fn import_table(
        &self,
        source: &str,
        table: SourceTable,
        operator: Option<&str>,
    ) -> ImportResult<OrderImportReport> {
        let start_time = Instant::now();
        let total_rows = table.rows.len();

        // === 步骤 1: 字段映射 ===
        let live_columns = self.store.column_names()?;
        let mapper = FieldMapperImpl::new(&table.headers, &live_columns);
        if !mapper.ignored_columns().is_empty() {
            warn!(ignored = ?mapper.ignored_columns(), "源文件存在目标表没有的列");
        }

        let mut records = Vec::with_capacity(total_rows);
        let mut rejected = Vec::new();
        for (row_number, row) in table.numbered_rows() {
            match mapper.map_to_order_record(row, row_number) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(row_number, error = %e, "字段映射失败");
                    rejected.push(RejectedRow {
                        row_number,
                        reason: e.to_string(),
                    });
                }
            }
        }

        // === 步骤 2: 清洗 ===
        for record in &mut records {
            self.data_cleaner.clean_order(record);
        }

        // 无订单号的行无法去重，拒绝
        let (mut records, missing_key): (Vec<RawOrderRecord>, Vec<RawOrderRecord>) =
            records.into_iter().partition(|r| r.order_number.is_some());
        rejected.extend(missing_key.into_iter().map(|r| RejectedRow {
            row_number: r.row_number,
            reason: "OFA 为空".to_string(),
        }));
        rejected.sort_by_key(|r| r.row_number);

        // === 步骤 3: 属性补全 ===
        let incomplete = AttributeCompletion::new(&self.store).complete(&mut records)?;
        if !incomplete.is_empty() {
            warn!(count = incomplete.len(), "部分订单缺少原料属性");
        }

        // === 步骤 4: 去重 ===
        let existing = ConflictHandlerImpl::normalize_existing_keys(self.store.existing_keys()?);
        let mut duplicates: Vec<DuplicateRow> = self
            .conflict_handler
            .detect_duplicates(&records)
            .into_iter()
            .map(|(row_number, key)| DuplicateRow {
                row_number,
                key,
                in_batch: true,
            })
            .collect();
        let in_batch_rows: HashSet<usize> = duplicates.iter().map(|d| d.row_number).collect();

        duplicates.extend(
            self.conflict_handler
                .detect_cross_batch_duplicates(&records, &existing)
                .into_iter()
                .filter(|(row_number, _)| !in_batch_rows.contains(row_number))
                .map(|(row_number, key)| DuplicateRow {
                    row_number,
                    key,
                    in_batch: false,
                }),
        );
        duplicates.sort_by_key(|d| d.row_number);

        let skip: HashSet<usize> = duplicates.iter().map(|d| d.row_number).collect();
        records.retain(|r| !skip.contains(&r.row_number));
        debug!(to_insert = records.len(), duplicates = duplicates.len(), "去重完成");

        // === 步骤 5: 落库 ===
        let now = Local::now().naive_local();
        let batch = NewLoadBatch {
            loaded_at: now,
            row_count: total_rows as i64,
            source_file: Some(source.to_string()),
            operator: operator.map(str::to_string),
        };
        let recorded_at = now.format(LOADED_AT_FORMAT).to_string();
        let (load_id, inserted) = self.store.insert_load_with_orders(&batch, &records, &recorded_at)?;

        let report = OrderImportReport {
            load_id,
            source: source.to_string(),
            total_rows,
            inserted,
            duplicates,
            rejected,
            incomplete,
            ignored_columns: mapper.ignored_columns().to_vec(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            load_id,
            source = %report.source,
            total_rows,
            inserted,
            duplicates = report.duplicates.len(),
            rejected = report.rejected.len(),
            incomplete = report.incomplete.len(),
            elapsed_ms = report.elapsed_ms,
            "订单导入完成"
        );
        Ok(report)
    }
}
