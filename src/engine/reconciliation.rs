// ==========================================
// SysPro 排产看板 - 订单/库存对账引擎
// ==========================================
// 职责: 按 (厚, 宽, 长, 等级) 汇总订单体积与库存可用体积
// 输入: 订单、库存、筛选条件
// 输出: 对账行（全外连接，缺失侧记 0，差额 = 库存 − 订单）
// 红线: Engine 不拼 SQL；分组前统一规范化
// ==========================================

use crate::domain::order::Order;
use crate::domain::reconciliation::{DimensionKey, FilterOptions, OrderFilter, ReconciliationRow};
use crate::domain::stock::StockItem;
use crate::domain::types::{Dimension, Quality};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::instrument;

fn normalize_dimension(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(Dimension::normalize_text)
}

fn normalize_order_quality(value: Option<&str>) -> Option<String> {
    value
        .and_then(Quality::canonicalize)
        .map(|q| q.as_str().to_string())
}

// 库存等级为全映射，空白按 USA
fn normalize_stock_quality(value: Option<&str>) -> Option<String> {
    let quality = Quality::canonicalize(value.unwrap_or("")).unwrap_or(Quality::Usa);
    Some(quality.as_str().to_string())
}

fn normalize_list(values: &[String], normalize: impl Fn(Option<&str>) -> Option<String>) -> BTreeSet<String> {
    values
        .iter()
        .filter_map(|v| normalize(Some(v.as_str())))
        .collect()
}

fn matches(selected: &BTreeSet<String>, value: &Option<String>) -> bool {
    selected.is_empty() || value.as_ref().map_or(false, |v| selected.contains(v))
}

/// 尺寸感知排序：可解析的按数值，其余按文本排在后面
fn dimension_order(a: &String, b: &String) -> Ordering {
    match (Dimension::parse(a), Dimension::parse(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn sorted_options(values: impl Iterator<Item = String>, by_dimension: bool) -> Vec<String> {
    let mut list: Vec<String> = values.collect::<BTreeSet<_>>().into_iter().collect();
    if by_dimension {
        list.sort_by(dimension_order);
    }
    list
}

/// 已规范化的筛选条件
struct NormalizedFilter {
    machines: BTreeSet<String>,
    thicknesses: BTreeSet<String>,
    widths: BTreeSet<String>,
    lengths: BTreeSet<String>,
    qualities: BTreeSet<String>,
    order_number_query: Option<String>,
}

impl NormalizedFilter {
    fn from(filter: &OrderFilter) -> Self {
        Self {
            machines: filter
                .machines
                .iter()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
            thicknesses: normalize_list(&filter.thicknesses, normalize_dimension),
            widths: normalize_list(&filter.widths, normalize_dimension),
            lengths: normalize_list(&filter.lengths, normalize_dimension),
            qualities: normalize_list(&filter.qualities, normalize_order_quality),
            order_number_query: filter
                .order_number_query
                .as_ref()
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
        }
    }

    fn accepts_key(&self, key: &DimensionKey) -> bool {
        matches(&self.thicknesses, &key.thickness)
            && matches(&self.widths, &key.width)
            && matches(&self.lengths, &key.length)
            && matches(&self.qualities, &key.quality)
    }
}

// ==========================================
// ReconciliationEngine
// ==========================================
#[derive(Debug, Default)]
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self
    }

    /// 订单的规范化对账键
    pub fn order_key(order: &Order) -> DimensionKey {
        DimensionKey {
            thickness: normalize_dimension(order.thickness.as_deref()),
            width: normalize_dimension(order.width.as_deref()),
            length: normalize_dimension(order.length.as_deref()),
            quality: normalize_order_quality(order.quality.as_deref()),
        }
    }

    /// 库存的规范化对账键
    pub fn stock_key(item: &StockItem) -> DimensionKey {
        DimensionKey {
            thickness: normalize_dimension(item.thickness.as_deref()),
            width: normalize_dimension(item.width.as_deref()),
            length: normalize_dimension(item.length.as_deref()),
            quality: normalize_stock_quality(item.quality.as_deref()),
        }
    }

    /// 筛选订单
    ///
    /// # 规则
    /// - 机台为空的订单不进入筛选视图
    /// - 结果按 Sec 升序，缺失排最后（同 Sec 保持输入顺序）
    pub fn filter_orders(&self, orders: &[Order], filter: &OrderFilter) -> Vec<Order> {
        let nf = NormalizedFilter::from(filter);

        let mut filtered: Vec<Order> = orders
            .iter()
            .filter(|o| {
                let machine = o
                    .machine
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty());
                let Some(machine) = machine else {
                    return false;
                };
                if !nf.machines.is_empty() && !nf.machines.contains(machine) {
                    return false;
                }
                if let Some(query) = &nf.order_number_query {
                    if !o.order_number.as_deref().map_or(false, |n| n.contains(query.as_str())) {
                        return false;
                    }
                }
                nf.accepts_key(&Self::order_key(o))
            })
            .cloned()
            .collect();

        filtered.sort_by(|a, b| match (a.sequence, b.sequence) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        filtered
    }

    /// 筛选库存（机台与订单号条件不作用于库存）
    pub fn filter_stock(&self, stock: &[StockItem], filter: &OrderFilter) -> Vec<StockItem> {
        let nf = NormalizedFilter::from(filter);
        stock
            .iter()
            .filter(|item| nf.accepts_key(&Self::stock_key(item)))
            .cloned()
            .collect()
    }

    /// 对账汇总
    ///
    /// # 返回
    /// - 每个键恰好一行，按键排序（缺失分量在前）
    #[instrument(skip(self, orders, stock), fields(orders = orders.len(), stock = stock.len()))]
    pub fn reconcile(&self, orders: &[Order], stock: &[StockItem]) -> Vec<ReconciliationRow> {
        let mut totals: BTreeMap<DimensionKey, (f64, f64)> = BTreeMap::new();

        for order in orders {
            let entry = totals.entry(Self::order_key(order)).or_insert((0.0, 0.0));
            entry.0 += order.volume_m3.unwrap_or(0.0);
        }
        for item in stock {
            let entry = totals.entry(Self::stock_key(item)).or_insert((0.0, 0.0));
            entry.1 += item.usable_volume_m3.unwrap_or(0.0);
        }

        totals
            .into_iter()
            .map(|(key, (ordered, in_stock))| ReconciliationRow::new(key, ordered, in_stock))
            .collect()
    }

    /// 先筛选再对账
    pub fn reconcile_filtered(
        &self,
        orders: &[Order],
        stock: &[StockItem],
        filter: &OrderFilter,
    ) -> Vec<ReconciliationRow> {
        let orders = self.filter_orders(orders, filter);
        let stock = self.filter_stock(stock, filter);
        self.reconcile(&orders, &stock)
    }

    /// 级联筛选可选项
    ///
    /// # 规则
    /// 机台取全部订单；厚度取机台筛选后；宽度取厚度筛选后；
    /// 长度取宽度筛选后；等级取长度筛选后
    pub fn filter_options(&self, orders: &[Order], filter: &OrderFilter) -> FilterOptions {
        let nf = NormalizedFilter::from(filter);

        let with_keys: Vec<(Option<String>, DimensionKey)> = orders
            .iter()
            .map(|o| {
                let machine = o
                    .machine
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string);
                (machine, Self::order_key(o))
            })
            .collect();

        let machines = sorted_options(with_keys.iter().filter_map(|(m, _)| m.clone()), false);

        let stage: Vec<&(Option<String>, DimensionKey)> = with_keys
            .iter()
            .filter(|(m, _)| nf.machines.is_empty() || m.as_ref().map_or(false, |m| nf.machines.contains(m)))
            .collect();
        let thicknesses = sorted_options(stage.iter().filter_map(|(_, k)| k.thickness.clone()), true);

        let stage: Vec<_> = stage
            .into_iter()
            .filter(|(_, k)| matches(&nf.thicknesses, &k.thickness))
            .collect();
        let widths = sorted_options(stage.iter().filter_map(|(_, k)| k.width.clone()), true);

        let stage: Vec<_> = stage
            .into_iter()
            .filter(|(_, k)| matches(&nf.widths, &k.width))
            .collect();
        let lengths = sorted_options(stage.iter().filter_map(|(_, k)| k.length.clone()), true);

        let stage: Vec<_> = stage
            .into_iter()
            .filter(|(_, k)| matches(&nf.lengths, &k.length))
            .collect();
        let qualities = sorted_options(stage.iter().filter_map(|(_, k)| k.quality.clone()), false);

        FilterOptions {
            machines,
            thicknesses,
            widths,
            lengths,
            qualities,
        }
    }
}
