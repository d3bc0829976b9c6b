// ==========================================
// SysPro 排产看板 - 原料属性补全
// ==========================================
// 规则: 新行缺厚度/宽度/等级时，取同 TEMPLATE + 同 Materia 的最近一条
//       完整历史订单，只填缺失项
// 输出: 无法补全的行（去重，保持出现顺序）
// ==========================================

use crate::domain::order::{IncompleteOrder, MaterialAttributes, RawOrderRecord};
use crate::importer::data_cleaner::{clean_dimension, clean_order_quality};
use crate::importer::error::ImportResult;
use crate::importer::importer_trait::OrderStore;
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub struct AttributeCompletion<'a, S: OrderStore> {
    store: &'a S,
    // (template, material) → 参考属性；同一批次内重复查询走缓存
    cache: HashMap<(String, String), Option<MaterialAttributes>>,
}

impl<'a, S: OrderStore> AttributeCompletion<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            cache: HashMap::new(),
        }
    }

    fn reference_for(&mut self, template: &str, material: &str) -> ImportResult<Option<MaterialAttributes>> {
        let key = (template.trim().to_string(), material.trim().to_string());
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.clone());
        }
        let found = self.store.latest_material_attributes(&key.0, &key.1)?;
        self.cache.insert(key, found.clone());
        Ok(found)
    }

    /// 补全缺失属性（原地）
    ///
    /// # 返回
    /// - 仍不完整的行
    pub fn complete(&mut self, records: &mut [RawOrderRecord]) -> ImportResult<Vec<IncompleteOrder>> {
        let mut incomplete = Vec::new();
        let mut seen = HashSet::new();
        let mut filled = 0usize;

        for record in records.iter_mut() {
            if !record.is_missing_material_attributes() {
                continue;
            }

            if let (Some(template), Some(material)) =
                (record.template.clone(), record.material_code.clone())
            {
                if let Some(reference) = self.reference_for(&template, &material)? {
                    // 参考行可能来自未清洗的历史数据，统一再规范一次
                    if record.thickness.is_none() {
                        record.thickness = clean_dimension(Some(reference.thickness));
                    }
                    if record.width.is_none() {
                        record.width = clean_dimension(Some(reference.width));
                    }
                    if record.quality.is_none() {
                        record.quality = clean_order_quality(Some(reference.quality));
                    }
                    filled += 1;
                }
            }

            if record.is_missing_material_attributes() {
                let entry = IncompleteOrder {
                    order_number: record.order_number.clone(),
                    position: record.position.clone(),
                    template: record.template.clone(),
                    material_code: record.material_code.clone(),
                };
                if seen.insert(entry.clone()) {
                    incomplete.push(entry);
                }
            }
        }

        debug!(filled, incomplete = incomplete.len(), "属性补全完成");
        Ok(incomplete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::load_batch::NewLoadBatch;
    use crate::repository::RepositoryResult;
    use std::cell::Cell;

    struct FakeStore {
        lookups: Cell<usize>,
    }

    impl OrderStore for FakeStore {
        fn column_names(&self) -> RepositoryResult<Vec<String>> {
            Ok(Vec::new())
        }

        fn existing_keys(&self) -> RepositoryResult<Vec<(String, Option<String>)>> {
            Ok(Vec::new())
        }

        fn latest_material_attributes(
            &self,
            template: &str,
            material_code: &str,
        ) -> RepositoryResult<Option<MaterialAttributes>> {
            self.lookups.set(self.lookups.get() + 1);
            Ok((template == "T1" && material_code == "M1").then(|| MaterialAttributes {
                thickness: "38.0".to_string(),
                width: "4".to_string(),
                quality: "CLEAR_GB".to_string(),
            }))
        }

        fn insert_load_with_orders(
            &self,
            _batch: &NewLoadBatch,
            records: &[RawOrderRecord],
            _recorded_at: &str,
        ) -> RepositoryResult<(i64, usize)> {
            Ok((1, records.len()))
        }
    }

    fn record(ofa: &str, template: &str, width: Option<&str>) -> RawOrderRecord {
        RawOrderRecord {
            order_number: Some(ofa.to_string()),
            position: Some("0010".to_string()),
            template: Some(template.to_string()),
            material_code: Some("M1".to_string()),
            width: width.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_fills_only_missing_values() {
        let store = FakeStore { lookups: Cell::new(0) };
        let mut records = vec![record("1", "T1", Some("6")), record("2", "T1", None)];

        let incomplete = AttributeCompletion::new(&store).complete(&mut records).unwrap();

        assert!(incomplete.is_empty());
        assert_eq!(records[0].width.as_deref(), Some("6"));
        assert_eq!(records[0].thickness.as_deref(), Some("38"));
        assert_eq!(records[0].quality.as_deref(), Some("CLEAR"));
        assert_eq!(records[1].width.as_deref(), Some("4"));
        // 第二行命中缓存
        assert_eq!(store.lookups.get(), 1);
    }

    #[test]
    fn test_unmatched_rows_reported_once() {
        let store = FakeStore { lookups: Cell::new(0) };
        let mut records = vec![
            record("1", "T9", None),
            record("1", "T9", None),
            record("2", "T9", None),
        ];

        let incomplete = AttributeCompletion::new(&store).complete(&mut records).unwrap();
        assert_eq!(incomplete.len(), 2);
        assert_eq!(incomplete[0].order_number.as_deref(), Some("1"));
        assert_eq!(incomplete[0].template.as_deref(), Some("T9"));
    }
}
