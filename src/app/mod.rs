// ==========================================
// SysPro 排产看板 - 应用层
// ==========================================
// 职责: 装配连接、仓储、引擎与 API，供命令行使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState, SchemaReport, DB_PATH_ENV};
