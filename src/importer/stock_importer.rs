// ==========================================
// SysPro 排产看板 - 库存导入器
// ==========================================
// 职责: 库存表格 → StockBlanks（整表替换）
// 规则:
// - CAMP* 列丢弃（大小写不敏感）
// - 其他未知列忽略并上报
// - 尺寸走 Dimension 规范化，CALIDAD 走等级全映射
// ==========================================

use crate::domain::import_report::StockImportReport;
use crate::domain::stock::columns as cols;
use crate::domain::stock::StockItem;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::{SourceTable, UniversalFileParser};
use crate::importer::importer_trait::FileParser;
use crate::repository::StockRepository;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{info, instrument, warn};

pub struct StockImporter {
    repo: StockRepository,
    file_parser: Box<dyn FileParser>,
    data_cleaner: DataCleaner,
}

/// 源列 → 规范列的分拣结果
struct StockColumnPlan {
    sources: HashMap<&'static str, String>,
    dropped: Vec<String>,
    ignored: Vec<String>,
}

impl StockColumnPlan {
    fn new(headers: &[String]) -> Self {
        let mut sources = HashMap::new();
        let mut dropped = Vec::new();
        let mut ignored = Vec::new();

        for header in headers {
            let trimmed = header.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.to_uppercase().starts_with(cols::DISCARDED_PREFIX) {
                dropped.push(header.clone());
                continue;
            }
            match cols::KNOWN.iter().find(|(name, _)| *name == trimmed) {
                Some((name, _)) if !sources.contains_key(name) => {
                    sources.insert(*name, header.clone());
                }
                _ => ignored.push(header.clone()),
            }
        }

        Self {
            sources,
            dropped,
            ignored,
        }
    }

    fn text(&self, row: &HashMap<String, String>, column: &str) -> Option<String> {
        self.sources
            .get(column)
            .and_then(|source| row.get(source))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn number(&self, row: &HashMap<String, String>, column: &str, row_number: usize) -> Option<f64> {
        let raw = self.text(row, column)?;
        match raw.replace(',', ".").parse::<f64>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(row_number, column, value = %raw, "库存体积无法解析，按空值处理");
                None
            }
        }
    }
}

impl StockImporter {
    pub fn new(repo: StockRepository) -> Self {
        Self {
            repo,
            file_parser: Box::new(UniversalFileParser),
            data_cleaner: DataCleaner,
        }
    }

    #[instrument(skip(self, file_path), fields(file = %file_path.as_ref().display()))]
    pub fn import_file<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<StockImportReport> {
        let path = file_path.as_ref();
        let table = self.file_parser.parse_to_raw_records(path)?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        self.import_table(&source, table)
    }

    /// 导入已解析的库存表（整表替换）
    pub fn import_table(&self, source: &str, table: SourceTable) -> ImportResult<StockImportReport> {
        let start_time = Instant::now();
        let plan = StockColumnPlan::new(&table.headers);
        if !plan.ignored.is_empty() {
            warn!(ignored = ?plan.ignored, "库存文件存在未知列");
        }

        let items: Vec<StockItem> = table
            .numbered_rows()
            .map(|(row_number, row)| {
                let mut item = StockItem {
                    thickness: plan.text(row, cols::THICKNESS),
                    width: plan.text(row, cols::WIDTH),
                    length: plan.text(row, cols::LENGTH),
                    quality: plan.text(row, cols::QUALITY),
                    gross_volume_m3: plan.number(row, cols::GROSS_VOLUME, row_number),
                    usable_volume_m3: plan.number(row, cols::USABLE_VOLUME, row_number),
                };
                self.data_cleaner.clean_stock(&mut item);
                item
            })
            .collect();

        let imported = self.repo.replace_all(&items)?;

        let report = StockImportReport {
            source: source.to_string(),
            total_rows: table.rows.len(),
            imported,
            dropped_columns: plan.dropped,
            ignored_columns: plan.ignored,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        };
        info!(
            source = %report.source,
            imported,
            dropped = report.dropped_columns.len(),
            "库存导入完成"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_plan_drops_camp_and_ignores_unknown() {
        let headers: Vec<String> = ["ESP_CUB", "camp1", "CAMPO_X", "Bodega", "Vol_Util"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let plan = StockColumnPlan::new(&headers);
        assert_eq!(plan.dropped, vec!["camp1".to_string(), "CAMPO_X".to_string()]);
        assert_eq!(plan.ignored, vec!["Bodega".to_string()]);
        assert_eq!(plan.sources.len(), 2);
    }
}
