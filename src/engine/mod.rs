// ==========================================
// SysPro 排产看板 - 引擎层
// ==========================================
// 职责: 对账/筛选规则
// 红线: Engine 不拼 SQL
// ==========================================

pub mod reconciliation;

pub use reconciliation::ReconciliationEngine;
