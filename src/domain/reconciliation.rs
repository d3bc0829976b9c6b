// ==========================================
// SysPro 排产看板 - 对账领域模型
// ==========================================
// 职责: 对账键、对账结果行、筛选条件与可选项
// 对账口径: 订单取 Vol#M3，库存取 Vol_Util，差额 = 库存 − 订单
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// DimensionKey - 对账分组键
// ==========================================
// 四个分量均为规范化后的文本；缺失分量单独成组
// 排序: 缺失分量排在最前（Option 的自然顺序）
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DimensionKey {
    pub thickness: Option<String>,
    pub width: Option<String>,
    pub length: Option<String>,
    pub quality: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRow {
    pub key: DimensionKey,
    pub ordered_volume_m3: f64,
    pub stock_volume_m3: f64,
    pub difference_m3: f64, // stock − ordered
}

impl ReconciliationRow {
    pub fn new(key: DimensionKey, ordered_volume_m3: f64, stock_volume_m3: f64) -> Self {
        Self {
            key,
            ordered_volume_m3,
            stock_volume_m3,
            difference_m3: stock_volume_m3 - ordered_volume_m3,
        }
    }

    /// 库存不足
    pub fn is_shortage(&self) -> bool {
        self.difference_m3 < 0.0
    }
}

// ==========================================
// OrderFilter - 看板筛选条件
// ==========================================
// 每个多选字段为空表示不过滤
// machines 只作用于订单侧
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderFilter {
    pub machines: Vec<String>,
    pub thicknesses: Vec<String>,
    pub widths: Vec<String>,
    pub lengths: Vec<String>,
    pub qualities: Vec<String>,
    pub order_number_query: Option<String>,
}

impl OrderFilter {
    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
            && self.thicknesses.is_empty()
            && self.widths.is_empty()
            && self.lengths.is_empty()
            && self.qualities.is_empty()
            && self
                .order_number_query
                .as_deref()
                .map_or(true, |q| q.trim().is_empty())
    }
}

// ==========================================
// FilterOptions - 级联可选项
// ==========================================
// 机台 → 厚度 → 宽度 → 长度 → 等级，每级只列出上一级筛选后仍存在的值
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub machines: Vec<String>,
    pub thicknesses: Vec<String>,
    pub widths: Vec<String>,
    pub lengths: Vec<String>,
    pub qualities: Vec<String>,
}
