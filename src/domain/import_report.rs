// ==========================================
// SysPro 排产看板 - 导入结果
// ==========================================
// 用途: 导入流程返回给操作员的汇总（重复/拒绝/不完整行均为数据）
// ==========================================

use crate::domain::order::{IncompleteOrder, OrderKey};
use serde::{Deserialize, Serialize};

/// 重复行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateRow {
    pub row_number: usize,
    pub key: OrderKey,
    pub in_batch: bool, // true: 同批次重复; false: 库中已存在
}

/// 被拒绝的行（无法映射或缺少订单号）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRow {
    pub row_number: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderImportReport {
    pub load_id: i64,
    pub source: String,
    pub total_rows: usize,
    pub inserted: usize,
    pub duplicates: Vec<DuplicateRow>,
    pub rejected: Vec<RejectedRow>,
    pub incomplete: Vec<IncompleteOrder>,
    pub ignored_columns: Vec<String>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockImportReport {
    pub source: String,
    pub total_rows: usize,
    pub imported: usize,
    pub dropped_columns: Vec<String>, // CAMP* 列
    pub ignored_columns: Vec<String>, // 其他未知列
    pub elapsed_ms: u64,
}
