// ==========================================
// SysPro 排产看板 - 导入接口
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// 流程: 解析 → 映射 → 清洗 → 补全 → 去重 → 落库
// ==========================================

use crate::domain::load_batch::NewLoadBatch;
use crate::domain::order::{MaterialAttributes, OrderKey, RawOrderRecord};
use crate::importer::error::ImportResult;
use crate::importer::file_parser::SourceTable;
use crate::repository::{OrderRepository, RepositoryResult};
use std::collections::{HashMap, HashSet};
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 实现者: CsvParser, ExcelParser, ExtractParser
pub trait FileParser: Send + Sync {
    /// 解析文件为表头 + 原始行（HashMap<列名, 值>）
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<SourceTable>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
pub trait FieldMapper: Send + Sync {
    /// 将原始行映射为 RawOrderRecord
    ///
    /// # 参数
    /// - row: 原始行（源列名 → 值）
    /// - row_number: 行号（用于报告）
    ///
    /// # 返回
    /// - Err: 类型转换失败（该行被拒绝）
    fn map_to_order_record(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> ImportResult<RawOrderRecord>;
}

// ==========================================
// ConflictHandler Trait
// ==========================================
pub trait ConflictHandler: Send + Sync {
    /// 同批次内重复（不含首次出现）
    fn detect_duplicates(&self, records: &[RawOrderRecord]) -> Vec<(usize, OrderKey)>;

    /// 与库中已有键重复
    fn detect_cross_batch_duplicates(
        &self,
        records: &[RawOrderRecord],
        existing: &HashSet<OrderKey>,
    ) -> Vec<(usize, OrderKey)>;
}

// ==========================================
// OrderStore Trait
// ==========================================
// 导入流程对 Pedidos 的最小依赖面
// 实现者: OrderRepository
pub trait OrderStore {
    fn column_names(&self) -> RepositoryResult<Vec<String>>;

    fn existing_keys(&self) -> RepositoryResult<Vec<(String, Option<String>)>>;

    fn latest_material_attributes(
        &self,
        template: &str,
        material_code: &str,
    ) -> RepositoryResult<Option<MaterialAttributes>>;

    fn insert_load_with_orders(
        &self,
        batch: &NewLoadBatch,
        records: &[RawOrderRecord],
        recorded_at: &str,
    ) -> RepositoryResult<(i64, usize)>;
}

impl OrderStore for OrderRepository {
    fn column_names(&self) -> RepositoryResult<Vec<String>> {
        OrderRepository::column_names(self)
    }

    fn existing_keys(&self) -> RepositoryResult<Vec<(String, Option<String>)>> {
        OrderRepository::existing_keys(self)
    }

    fn latest_material_attributes(
        &self,
        template: &str,
        material_code: &str,
    ) -> RepositoryResult<Option<MaterialAttributes>> {
        OrderRepository::latest_material_attributes(self, template, material_code)
    }

    fn insert_load_with_orders(
        &self,
        batch: &NewLoadBatch,
        records: &[RawOrderRecord],
        recorded_at: &str,
    ) -> RepositoryResult<(i64, usize)> {
        OrderRepository::insert_load_with_orders(self, batch, records, recorded_at)
    }
}
