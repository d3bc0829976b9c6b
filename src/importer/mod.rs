// ==========================================
// SysPro 排产看板 - 导入层
// ==========================================
// 职责: 外部数据导入（订单/库存/邮箱）
// 支持: Excel, CSV, SQLite 抽取库, 邮箱 JSON
// ==========================================

pub mod attribute_completion;
pub mod conflict_handler;
pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod importer_trait;
pub mod mail_scan;
pub mod order_importer;
pub mod stock_importer;

// 重导出核心类型
pub use attribute_completion::AttributeCompletion;
pub use conflict_handler::ConflictHandler as ConflictHandlerImpl;
pub use data_cleaner::DataCleaner;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper as FieldMapperImpl;
pub use file_parser::{CsvParser, ExcelParser, ExtractParser, SourceTable, UniversalFileParser};
pub use mail_scan::{JsonMailboxSource, MailMessage, MailSource, OrderNumberScanner};
pub use order_importer::OrderImporter;
pub use stock_importer::StockImporter;

// 重导出 Trait 接口
pub use importer_trait::{ConflictHandler, FieldMapper, FileParser, OrderStore};
