// ==========================================
// SysPro 排产看板 - 领域层
// ==========================================
// 职责: 实体与值类型，不含数据访问
// ==========================================

pub mod import_report;
pub mod load_batch;
pub mod order;
pub mod reconciliation;
pub mod stock;
pub mod types;

pub use import_report::{DuplicateRow, OrderImportReport, RejectedRow, StockImportReport};
pub use load_batch::{LoadBatch, NewLoadBatch};
pub use order::{IncompleteOrder, MaterialAttributes, Order, OrderEdit, OrderKey, RawOrderRecord};
pub use reconciliation::{DimensionKey, FilterOptions, OrderFilter, ReconciliationRow};
pub use stock::StockItem;
pub use types::{Dimension, Quality};
