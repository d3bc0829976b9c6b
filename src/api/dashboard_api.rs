// ==========================================
// SysPro 排产看板 - 看板 API
// ==========================================
// 职责: 订单/库存对账、级联筛选项、筛选后的订单视图、表格导出
// 架构: API 层 → Engine 层 (ReconciliationEngine) + Repository 层
// ==========================================

use crate::api::error::ApiResult;
use crate::config::{ConfigManager, ImportConfigReader};
use crate::domain::order::Order;
use crate::domain::reconciliation::{FilterOptions, OrderFilter, ReconciliationRow};
use crate::engine::ReconciliationEngine;
use crate::exporter::{ExportReport, Exporter};
use crate::repository::{OrderRepository, StockRepository};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

/// 对账汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub rows: Vec<ReconciliationRow>,
    pub total_ordered_m3: f64,
    pub total_stock_m3: f64,
    pub total_difference_m3: f64,
    /// 库存不足的分组数
    pub shortage_count: usize,
}

impl ReconciliationSummary {
    fn from_rows(rows: Vec<ReconciliationRow>) -> Self {
        let total_ordered_m3: f64 = rows.iter().map(|r| r.ordered_volume_m3).sum();
        let total_stock_m3: f64 = rows.iter().map(|r| r.stock_volume_m3).sum();
        let shortage_count = rows.iter().filter(|r| r.is_shortage()).count();
        Self {
            rows,
            total_ordered_m3,
            total_stock_m3,
            total_difference_m3: total_stock_m3 - total_ordered_m3,
            shortage_count,
        }
    }
}

/// 看板 API
pub struct DashboardApi {
    order_repo: Arc<OrderRepository>,
    stock_repo: Arc<StockRepository>,
    exporter: Arc<Exporter>,
    config_manager: Arc<ConfigManager>,
    engine: ReconciliationEngine,
}

impl DashboardApi {
    pub fn new(
        order_repo: Arc<OrderRepository>,
        stock_repo: Arc<StockRepository>,
        exporter: Arc<Exporter>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            order_repo,
            stock_repo,
            exporter,
            config_manager,
            engine: ReconciliationEngine::new(),
        }
    }

    /// 筛选后的订单视图（按 Sec 升序）
    pub fn filtered_orders(&self, filter: &OrderFilter) -> ApiResult<Vec<Order>> {
        let orders = self.order_repo.list_all()?;
        Ok(self.engine.filter_orders(&orders, filter))
    }

    /// 按 (厚, 宽, 长, 等级) 对账
    ///
    /// # 说明
    /// - 机台条件只作用于订单
    /// - 差额 = 库存 − 订单，负数表示库存不足
    #[instrument(skip(self, filter))]
    pub fn reconcile(&self, filter: &OrderFilter) -> ApiResult<ReconciliationSummary> {
        let orders = self.order_repo.list_all()?;
        let stock = self.stock_repo.list_all()?;
        let rows = self.engine.reconcile_filtered(&orders, &stock, filter);
        debug!(groups = rows.len(), "对账完成");
        Ok(ReconciliationSummary::from_rows(rows))
    }

    /// 级联筛选可选项
    pub fn filter_options(&self, filter: &OrderFilter) -> ApiResult<FilterOptions> {
        let orders = self.order_repo.list_all()?;
        Ok(self.engine.filter_options(&orders, filter))
    }

    /// 导出 Pedidos / StockBlanks
    ///
    /// # 参数
    /// - dir: 导出目录；None 时读配置 export.dir
    pub fn export_tables(&self, dir: Option<&Path>) -> ApiResult<ExportReport> {
        let dir = match dir {
            Some(d) => d.to_path_buf(),
            None => self.config_manager.get_export_dir()?,
        };
        Ok(self.exporter.export_tables(&dir)?)
    }
}
