// ==========================================
// SysPro 排产看板 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 订单/库存对账与导入（人工最终控制权）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与值类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 对账/筛选规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 导出 - CSV
pub mod exporter;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/建表/迁移）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Dimension, Quality};

// 领域实体
pub use domain::{
    DimensionKey, LoadBatch, Order, OrderEdit, OrderFilter, OrderImportReport, ReconciliationRow,
    StockImportReport, StockItem,
};

// 引擎
pub use engine::ReconciliationEngine;

// API
pub use api::{ApiError, ApiResult, ConfigApi, DashboardApi, ImportApi, OrderApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "SysPro 排产看板";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
