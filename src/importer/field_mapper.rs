// ==========================================
// SysPro 排产看板 - 字段映射器实现
// ==========================================
// 职责: 源列名 → Pedidos 列名映射 + 类型转换
// 规则:
// - 先按别名表改名（Pos#OFA → Pos.OFA 等）
// - 已知列进入 RawOrderRecord 对应字段
// - 目标表存在的其他列原样保留
// - 目标表不存在的列忽略并上报
// ==========================================

use crate::domain::order::columns as cols;
use crate::domain::order::RawOrderRecord;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::FieldMapper as FieldMapperTrait;
use std::collections::{BTreeMap, HashMap};

/// 源文件列名别名 → 规范列名
pub const HEADER_ALIASES: [(&str, &str); 5] = [
    ("Pos#OFA", cols::POSITION),
    ("Fec#Puesta", cols::PLACEMENT_DATE),
    ("Material", cols::MATERIAL_CODE),
    ("Vol.M3", cols::VOLUME),
    ("Unit", cols::UNITS),
];

/// 规范化列名（别名改写）
pub fn canonical_header(header: &str) -> &str {
    let trimmed = header.trim();
    HEADER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == trimmed)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(trimmed)
}

pub struct FieldMapper {
    /// 规范列名 → 源列名
    sources: HashMap<String, String>,
    /// 目标表存在、非已知列的源列（规范名 → 源列名）
    extras: BTreeMap<String, String>,
    ignored: Vec<String>,
}

impl FieldMapper {
    /// 根据源表头与目标表实际列构建映射
    ///
    /// # 参数
    /// - headers: 源文件表头
    /// - live_columns: Pedidos 当前列名
    pub fn new(headers: &[String], live_columns: &[String]) -> Self {
        let mut sources = HashMap::new();
        let mut extras = BTreeMap::new();
        let mut ignored = Vec::new();

        for header in headers {
            if header.trim().is_empty() {
                continue;
            }
            let canonical = canonical_header(header);
            let is_known = cols::KNOWN.iter().any(|(name, _)| *name == canonical);
            let is_live = live_columns.iter().any(|c| c == canonical);

            // 系统列不接受外部写入
            if canonical == cols::LOAD_ID || canonical == cols::RECORDED_AT {
                ignored.push(header.clone());
                continue;
            }

            // 同一规范列出现多次时保留第一个
            if sources.contains_key(canonical) || extras.contains_key(canonical) {
                ignored.push(header.clone());
                continue;
            }

            if is_known {
                sources.insert(canonical.to_string(), header.clone());
            } else if is_live {
                extras.insert(canonical.to_string(), header.clone());
            } else {
                ignored.push(header.clone());
            }
        }

        Self {
            sources,
            extras,
            ignored,
        }
    }

    /// 被忽略的源列
    pub fn ignored_columns(&self) -> &[String] {
        &self.ignored
    }

    /// 提取字符串字段（空白视为缺失）
    fn get_string(&self, row: &HashMap<String, String>, column: &str) -> Option<String> {
        let source = self.sources.get(column)?;
        row.get(source).and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// 解析浮点数（接受 ',' 小数点）
    fn parse_f64(
        &self,
        row: &HashMap<String, String>,
        column: &str,
        row_number: usize,
    ) -> ImportResult<Option<f64>> {
        match self.get_string(row, column) {
            None => Ok(None),
            Some(value) => value
                .replace(',', ".")
                .parse::<f64>()
                .map(Some)
                .map_err(|_| ImportError::TypeConversionError {
                    row: row_number,
                    field: column.to_string(),
                    message: format!("无法解析为数值: {}", value),
                }),
        }
    }

    /// 解析整数（接受 "3.0" 这类整值浮点）
    fn parse_i64(
        &self,
        row: &HashMap<String, String>,
        column: &str,
        row_number: usize,
    ) -> ImportResult<Option<i64>> {
        match self.get_string(row, column) {
            None => Ok(None),
            Some(value) => value
                .parse::<i64>()
                .ok()
                .or_else(|| {
                    value
                        .replace(',', ".")
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.fract() == 0.0)
                        .map(|f| f as i64)
                })
                .map(Some)
                .ok_or_else(|| ImportError::TypeConversionError {
                    row: row_number,
                    field: column.to_string(),
                    message: format!("无法解析为整数: {}", value),
                }),
        }
    }
}

impl FieldMapperTrait for FieldMapper {
    fn map_to_order_record(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> ImportResult<RawOrderRecord> {
        let extra_columns = self
            .extras
            .iter()
            .filter_map(|(canonical, source)| {
                row.get(source)
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (canonical.clone(), v.trim().to_string()))
            })
            .collect();

        Ok(RawOrderRecord {
            order_number: self.get_string(row, cols::ORDER_NUMBER),
            position: self.get_string(row, cols::POSITION),
            machine: self.get_string(row, cols::MACHINE),
            sequence: self.parse_i64(row, cols::SEQUENCE, row_number)?,
            placement_week: self.get_string(row, cols::PLACEMENT_WEEK),
            placement_date: self.get_string(row, cols::PLACEMENT_DATE),
            order_date: self.get_string(row, cols::ORDER_DATE),
            template: self.get_string(row, cols::TEMPLATE),
            material_code: self.get_string(row, cols::MATERIAL_CODE),
            material_text: self.get_string(row, cols::MATERIAL_TEXT),
            thickness: self.get_string(row, cols::THICKNESS),
            width: self.get_string(row, cols::WIDTH),
            length: self.get_string(row, cols::LENGTH),
            quality: self.get_string(row, cols::QUALITY),
            units: self.parse_f64(row, cols::UNITS, row_number)?,
            volume_m3: self.parse_f64(row, cols::VOLUME, row_number)?,
            extra_columns,
            row_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn live() -> Vec<String> {
        let mut cols: Vec<String> = cols::KNOWN.iter().map(|(n, _)| n.to_string()).collect();
        cols.push("Observacion".to_string());
        cols
    }

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_aliases_are_applied() {
        let mapper = FieldMapper::new(
            &headers(&["OFA", "Pos#OFA", "Material", "Vol.M3", "Unit", "Fec#Puesta"]),
            &live(),
        );
        let record = mapper
            .map_to_order_record(
                &row(&[
                    ("OFA", "5100001"),
                    ("Pos#OFA", "10"),
                    ("Material", "M-100"),
                    ("Vol.M3", "1,25"),
                    ("Unit", "40"),
                    ("Fec#Puesta", "2024-01-15"),
                ]),
                1,
            )
            .unwrap();

        assert_eq!(record.position.as_deref(), Some("10"));
        assert_eq!(record.material_code.as_deref(), Some("M-100"));
        assert_eq!(record.volume_m3, Some(1.25));
        assert_eq!(record.units, Some(40.0));
        assert_eq!(record.placement_date.as_deref(), Some("2024-01-15"));
        assert!(mapper.ignored_columns().is_empty());
    }

    #[test]
    fn test_unknown_columns_ignored_and_live_extras_kept() {
        let mapper = FieldMapper::new(
            &headers(&["OFA", "Cliente", "Observacion", "id_carga"]),
            &live(),
        );
        assert_eq!(mapper.ignored_columns(), &["Cliente".to_string(), "id_carga".to_string()]);

        let record = mapper
            .map_to_order_record(
                &row(&[("OFA", "1"), ("Cliente", "X"), ("Observacion", "urgente")]),
                1,
            )
            .unwrap();
        assert_eq!(
            record.extra_columns.get("Observacion").map(String::as_str),
            Some("urgente")
        );
    }

    #[test]
    fn test_bad_sequence_is_type_error() {
        let mapper = FieldMapper::new(&headers(&["OFA", "Sec"]), &live());
        let ok = mapper
            .map_to_order_record(&row(&[("OFA", "1"), ("Sec", "3.0")]), 1)
            .unwrap();
        assert_eq!(ok.sequence, Some(3));

        let err = mapper
            .map_to_order_record(&row(&[("OFA", "1"), ("Sec", "abc")]), 7)
            .unwrap_err();
        assert!(matches!(err, ImportError::TypeConversionError { row: 7, .. }));
    }
}
