// ==========================================
// SysPro 排产看板 - 冲突处理器实现
// ==========================================
// 职责: 检测同批次内/跨批次重复的 (OFA, Pos.OFA)
// 规则: 同批次首次出现者保留；库中已存在的键不再写入
// ==========================================

use crate::domain::order::{OrderKey, RawOrderRecord};
use crate::importer::data_cleaner::pad_position;
use crate::importer::importer_trait::ConflictHandler as ConflictHandlerTrait;
use std::collections::{HashMap, HashSet};

pub struct ConflictHandler;

impl ConflictHandler {
    /// 由库内原值构造规范键（历史行的行号可能未补零）
    pub fn normalize_existing_keys(raw: Vec<(String, Option<String>)>) -> HashSet<OrderKey> {
        raw.into_iter()
            .map(|(ofa, pos)| OrderKey {
                order_number: ofa.trim().to_string(),
                position: pos.map(|p| pad_position(&p)).unwrap_or_default(),
            })
            .collect()
    }
}

impl ConflictHandlerTrait for ConflictHandler {
    /// 检测同批次内重复
    ///
    /// # 返回
    /// - Vec<(行号, 键)>: 重复记录列表（不包括第一次出现）
    fn detect_duplicates(&self, records: &[RawOrderRecord]) -> Vec<(usize, OrderKey)> {
        let mut first_occurrence: HashMap<OrderKey, usize> = HashMap::new();
        let mut duplicates = Vec::new();

        for record in records {
            if let Some(key) = record.natural_key() {
                if first_occurrence.contains_key(&key) {
                    duplicates.push((record.row_number, key));
                } else {
                    first_occurrence.insert(key, record.row_number);
                }
            }
        }

        duplicates
    }

    /// 检测跨批次重复
    ///
    /// # 参数
    /// - existing: 库中已存在的规范键
    fn detect_cross_batch_duplicates(
        &self,
        records: &[RawOrderRecord],
        existing: &HashSet<OrderKey>,
    ) -> Vec<(usize, OrderKey)> {
        records
            .iter()
            .filter_map(|record| {
                record
                    .natural_key()
                    .filter(|key| existing.contains(key))
                    .map(|key| (record.row_number, key))
            })
            .collect()
    }
}
