// ==========================================
// SysPro 排产看板 - 订单 API
// ==========================================
// 职责: 订单查询、单元格编辑、导入批次历史
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::load_batch::LoadBatch;
use crate::domain::order::{Order, OrderEdit};
use crate::domain::types::{Dimension, Quality};
use crate::repository::{LoadBatchRepository, OrderRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// 某一导入批次及其订单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadDetail {
    pub batch: LoadBatch,
    pub orders: Vec<Order>,
}

/// 订单 API
pub struct OrderApi {
    order_repo: Arc<OrderRepository>,
    load_batch_repo: Arc<LoadBatchRepository>,
}

impl OrderApi {
    pub fn new(order_repo: Arc<OrderRepository>, load_batch_repo: Arc<LoadBatchRepository>) -> Self {
        Self {
            order_repo,
            load_batch_repo,
        }
    }

    /// 全部订单（最新导入在前）
    pub fn list_orders(&self) -> ApiResult<Vec<Order>> {
        Ok(self.order_repo.list_all()?)
    }

    /// 按订单号子串搜索（空查询等同于全部）
    pub fn search_orders(&self, query: &str) -> ApiResult<Vec<Order>> {
        let q = query.trim();
        if q.is_empty() {
            return self.list_orders();
        }
        Ok(self.order_repo.search_by_order_number(q)?)
    }

    pub fn get_order(&self, id: i64) -> ApiResult<Order> {
        self.order_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("订单(id={})不存在", id)))
    }

    /// 批量应用单元格编辑
    ///
    /// # 说明
    /// - 尺寸/等级先规范化再写入，空串表示清空该单元格
    /// - 同一事务：任一 id 不存在则整批回滚
    ///
    /// # 返回
    /// - 被修改的行数
    #[instrument(skip(self, edits), fields(count = edits.len()))]
    pub fn edit_orders(&self, edits: Vec<OrderEdit>) -> ApiResult<usize> {
        let mut normalized = Vec::with_capacity(edits.len());
        for edit in edits {
            if edit.is_empty() {
                return Err(ApiError::InvalidInput(format!(
                    "订单(id={})的编辑不包含任何字段",
                    edit.id
                )));
            }
            normalized.push(normalize_edit(edit));
        }

        let updated = self.order_repo.apply_edits(&normalized)?;
        info!(updated, "订单编辑已保存");
        Ok(updated)
    }

    /// 最近的导入批次（最新在前）
    pub fn load_history(&self, limit: usize) -> ApiResult<Vec<LoadBatch>> {
        if limit == 0 {
            return Err(ApiError::InvalidInput("limit 必须大于 0".to_string()));
        }
        Ok(self.load_batch_repo.list_recent(limit)?)
    }

    /// 某一导入批次的订单
    pub fn load_detail(&self, load_id: i64) -> ApiResult<LoadDetail> {
        let batch = self
            .load_batch_repo
            .find_by_id(load_id)?
            .ok_or_else(|| ApiError::NotFound(format!("导入批次(id={})不存在", load_id)))?;
        let orders = self.order_repo.list_by_load(load_id)?;
        Ok(LoadDetail { batch, orders })
    }
}

fn normalize_dimension_edit(value: Option<String>) -> Option<String> {
    value.map(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            String::new()
        } else {
            Dimension::normalize_text(trimmed)
        }
    })
}

fn normalize_edit(mut edit: OrderEdit) -> OrderEdit {
    edit.thickness = normalize_dimension_edit(edit.thickness.take());
    edit.width = normalize_dimension_edit(edit.width.take());
    edit.length = normalize_dimension_edit(edit.length.take());
    edit.quality = edit.quality.take().map(|q| {
        Quality::canonicalize(&q)
            .map(|c| c.as_str().to_string())
            .unwrap_or_default()
    });
    edit
}
