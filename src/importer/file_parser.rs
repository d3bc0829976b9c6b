// ==========================================
// SysPro 排产看板 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls/.ods) / CSV (.csv) / SQLite 抽取库 (.sqlite/.db)
// 输出: 表头 + 行（列名 → 去空白文本）
// ==========================================

use crate::db::{open_readonly_connection, quote_ident, table_exists};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::FileParser;
use crate::repository::row_values::text_value;
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// 解析结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceTable {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
    /// 与 rows 一一对应的源数据行号（1 起，表头不计，空白单元格行也占号）
    /// CSV 中完全没有内容的物理空行不算记录
    pub row_numbers: Vec<usize>,
    data_rows_seen: usize,
}

impl SourceTable {
    pub fn with_headers(headers: Vec<String>) -> Self {
        Self {
            headers,
            ..Default::default()
        }
    }

    /// 带源行号遍历
    pub fn numbered_rows(&self) -> impl Iterator<Item = (usize, &HashMap<String, String>)> + '_ {
        self.row_numbers.iter().copied().zip(self.rows.iter())
    }

    /// 按表头组装一行，跳过完全空白的行（行号照常递增）
    fn push_row(&mut self, cells: impl IntoIterator<Item = String>) {
        self.data_rows_seen += 1;
        let row_number = self.data_rows_seen;
        let mut row_map = HashMap::new();
        for (col_idx, value) in cells.into_iter().enumerate() {
            if let Some(header) = self.headers.get(col_idx) {
                if header.is_empty() {
                    continue;
                }
                row_map.insert(header.clone(), value.trim().to_string());
            }
        }

        if row_map.values().all(|v| v.is_empty()) {
            return;
        }
        self.rows.push(row_map);
        self.row_numbers.push(row_number);
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<SourceTable> {
        ensure_exists(file_path)?;
        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let mut table = SourceTable::with_headers(
            reader
                .headers()?
                .iter()
                .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
                .collect(),
        );

        for result in reader.records() {
            let record = result?;
            table.push_row(record.iter().map(str::to_string));
        }

        Ok(table)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
// 只读第一个工作表，第一行为表头
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<SourceTable> {
        ensure_exists(file_path)?;
        let ext = extension_of(file_path);
        if !matches!(ext.as_str(), "xlsx" | "xlsm" | "xls" | "ods") {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;

        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无数据行".to_string()))?;

        let mut table = SourceTable::with_headers(
            header_row
                .iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect(),
        );

        for data_row in rows {
            table.push_row(data_row.iter().map(|cell| cell.to_string()));
        }

        Ok(table)
    }
}

// ==========================================
// 抽取库 Parser（ERP 导出的 SQLite 文件）
// ==========================================
pub struct ExtractParser {
    pub table: String,
}

impl Default for ExtractParser {
    fn default() -> Self {
        Self {
            table: crate::domain::order::columns::TABLE.to_string(),
        }
    }
}

impl FileParser for ExtractParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<SourceTable> {
        ensure_exists(file_path)?;
        let path_str = file_path
            .to_str()
            .ok_or_else(|| ImportError::FileReadError(file_path.display().to_string()))?;

        let conn = open_readonly_connection(path_str)
            .map_err(|e| ImportError::ExtractReadError(e.to_string()))?;
        if !table_exists(&conn, &self.table)? {
            return Err(ImportError::ExtractReadError(format!(
                "抽取库中不存在表 {}",
                self.table
            )));
        }

        let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_ident(&self.table)))?;
        let mut table =
            SourceTable::with_headers(stmt.column_names().iter().map(|c| c.to_string()).collect());
        let width = table.headers.len();

        let raw_rows = stmt
            .query_map([], |row| {
                let mut cells = Vec::with_capacity(width);
                for idx in 0..width {
                    cells.push(text_value(row.get_ref(idx)?).unwrap_or_default());
                }
                Ok(cells)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for cells in raw_rows {
            table.push_row(cells);
        }
        Ok(table)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<SourceTable> {
        let path = file_path.as_ref();
        match extension_of(path).as_str() {
            "csv" => CsvParser.parse_to_raw_records(path),
            "xlsx" | "xlsm" | "xls" | "ods" => ExcelParser.parse_to_raw_records(path),
            "sqlite" | "db" => ExtractParser::default().parse_to_raw_records(path),
            ext => Err(ImportError::UnsupportedFormat(ext.to_string())),
        }
    }
}

impl FileParser for UniversalFileParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<SourceTable> {
        self.parse(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(lines: &[&str]) -> NamedTempFile {
        let mut temp_file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let temp_file = csv_file(&["OFA,Pos#OFA,Maq", "5100001,10,M01", "5100002,20,M02"]);

        let table = CsvParser.parse_to_raw_records(temp_file.path()).unwrap();

        assert_eq!(table.headers, vec!["OFA", "Pos#OFA", "Maq"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("OFA"), Some(&"5100001".to_string()));
        assert_eq!(table.rows[1].get("Pos#OFA"), Some(&"20".to_string()));
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse_to_raw_records(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let temp_file = csv_file(&["OFA,Maq", "5100001,M01", ",", "5100002,M02"]);

        let table = CsvParser.parse_to_raw_records(temp_file.path()).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.row_numbers, vec![1, 3]);
    }

    #[test]
    fn test_csv_parser_row_numbers_count_blank_records() {
        let temp_file = csv_file(&["OFA,Maq", "5100001,M01", ",", " , ", "5100002,M02"]);

        let table = CsvParser.parse_to_raw_records(temp_file.path()).unwrap();
        let numbered: Vec<(usize, Option<&String>)> = table
            .numbered_rows()
            .map(|(n, row)| (n, row.get("OFA")))
            .collect();
        assert_eq!(
            numbered,
            vec![(1, Some(&"5100001".to_string())), (4, Some(&"5100002".to_string()))]
        );
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let temp_file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        let result = UniversalFileParser.parse(temp_file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_extract_parser_reads_pedidos_table() {
        let extract = tempfile::Builder::new().suffix(".sqlite").tempfile().unwrap();
        {
            let conn = rusqlite::Connection::open(extract.path()).unwrap();
            conn.execute_batch(
                r#"
                CREATE TABLE "Pedidos" ("OFA" INTEGER, "Pos.OFA" INTEGER, "EspesroMP" REAL);
                INSERT INTO "Pedidos" VALUES (5100001, 10, 38.0);
                INSERT INTO "Pedidos" VALUES (5100002, 20, 1.5);
                "#,
            )
            .unwrap();
        }

        let table = UniversalFileParser.parse(extract.path()).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("OFA"), Some(&"5100001".to_string()));
        assert_eq!(table.rows[0].get("EspesroMP"), Some(&"38".to_string()));
    }

    #[test]
    fn test_extract_parser_missing_table() {
        let extract = tempfile::Builder::new().suffix(".db").tempfile().unwrap();
        {
            let conn = rusqlite::Connection::open(extract.path()).unwrap();
            conn.execute_batch("CREATE TABLE other (x TEXT);").unwrap();
        }
        let result = ExtractParser::default().parse_to_raw_records(extract.path());
        assert!(matches!(result, Err(ImportError::ExtractReadError(_))));
    }
}
