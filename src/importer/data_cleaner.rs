// ==========================================
// SysPro 排产看板 - 数据清洗器实现
// ==========================================
// 职责: 入库前的值规范化
// - Pos.OFA 补零到 4 位
// - 尺寸 → Dimension 规范文本
// - 等级 → Quality 规范码（空白视为缺失）
// - Excel 序列日期 → YYYY-MM-DD
// 红线: 清洗不报错，无法识别的值原样保留
// ==========================================

use crate::domain::order::RawOrderRecord;
use crate::domain::stock::StockItem;
use crate::domain::types::{Dimension, Quality};
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Pos.OFA 宽度
pub const POSITION_WIDTH: usize = 4;

// Excel 序列日期起点（含 1900 闰年错误的修正）
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
// 9999-12-31
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

pub struct DataCleaner;

impl DataCleaner {
    /// 清洗一条订单记录（原地）
    pub fn clean_order(&self, record: &mut RawOrderRecord) {
        record.order_number = normalize_null(record.order_number.take());
        record.position = normalize_null(record.position.take()).map(|p| pad_position(&p));
        record.machine = normalize_null(record.machine.take());
        record.template = normalize_null(record.template.take());
        record.material_code = normalize_null(record.material_code.take());

        record.thickness = clean_dimension(record.thickness.take());
        record.width = clean_dimension(record.width.take());
        record.length = clean_dimension(record.length.take());
        record.quality = clean_order_quality(record.quality.take());

        record.placement_date = normalize_null(record.placement_date.take()).map(|d| clean_date(&d));
        record.order_date = normalize_null(record.order_date.take()).map(|d| clean_date(&d));
    }

    /// 清洗一条库存记录（原地）
    ///
    /// # 说明
    /// 库存等级走全映射：空白也映射为 USA
    pub fn clean_stock(&self, item: &mut StockItem) {
        item.thickness = clean_dimension(item.thickness.take());
        item.width = clean_dimension(item.width.take());
        item.length = clean_dimension(item.length.take());
        item.quality = Some(
            Quality::from_source_code(item.quality.as_deref().unwrap_or(""))
                .as_str()
                .to_string(),
        );
    }
}

pub fn normalize_null(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// 行号补零（"10" → "0010"；"10.0" 先去掉整值小数）
pub fn pad_position(raw: &str) -> String {
    let trimmed = raw.trim();
    let base = match trimmed.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && !trimmed.contains(|c: char| c.is_ascii_alphabetic()) => {
            format!("{}", f as i64)
        }
        _ => trimmed.to_string(),
    };

    let (sign, digits) = match base.strip_prefix('-') {
        Some(rest) => ("-", rest.to_string()),
        None => ("", base.clone()),
    };
    let width = POSITION_WIDTH.saturating_sub(sign.len());
    format!("{}{:0>width$}", sign, digits, width = width)
}

pub fn clean_dimension(value: Option<String>) -> Option<String> {
    normalize_null(value).map(|v| Dimension::normalize_text(&v))
}

/// 订单等级：空白 → 缺失；规范码保持；其余按映射表
pub fn clean_order_quality(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .and_then(Quality::canonicalize)
        .map(|q| q.as_str().to_string())
}

/// 日期清洗
///
/// # 规则
/// - Excel 序列值 → YYYY-MM-DD
/// - 常见日期/日期时间写法 → YYYY-MM-DD
/// - 其他原样返回
pub fn clean_date(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Ok(serial) = trimmed.replace(',', ".").parse::<f64>() {
        if let Some(date) = excel_serial_to_date(serial) {
            return date.format("%Y-%m-%d").to_string();
        }
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d-%m-%Y %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return dt.date().format("%Y-%m-%d").to_string();
        }
    }
    for fmt in ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y/%m/%d", "%Y%m%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return date.format("%Y-%m-%d").to_string();
        }
    }

    trimmed.to_string()
}

/// Excel 序列日期（仅取日期部分）
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=EXCEL_MAX_SERIAL).contains(&serial) {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_position() {
        assert_eq!(pad_position("10"), "0010");
        assert_eq!(pad_position("10.0"), "0010");
        assert_eq!(pad_position("0010"), "0010");
        assert_eq!(pad_position("12345"), "12345");
        assert_eq!(pad_position("A1"), "00A1");
    }

    #[test]
    fn test_clean_date() {
        assert_eq!(clean_date("45306"), "2024-01-15");
        assert_eq!(clean_date("45306.5"), "2024-01-15");
        assert_eq!(clean_date("2024-01-15 00:00:00"), "2024-01-15");
        assert_eq!(clean_date("15.01.2024"), "2024-01-15");
        assert_eq!(clean_date("semana 3"), "semana 3");
        assert_eq!(clean_date("20240115"), "2024-01-15");
        assert_eq!(clean_date("0"), "0");
    }

    #[test]
    fn test_clean_order_normalizes_fields() {
        let mut record = RawOrderRecord {
            order_number: Some(" 5100001 ".to_string()),
            position: Some("10".to_string()),
            thickness: Some("1_1/2".to_string()),
            width: Some("2/4".to_string()),
            length: Some("abc".to_string()),
            quality: Some("clear_gb_peca".to_string()),
            ..Default::default()
        };
        DataCleaner.clean_order(&mut record);

        assert_eq!(record.order_number.as_deref(), Some("5100001"));
        assert_eq!(record.position.as_deref(), Some("0010"));
        assert_eq!(record.thickness.as_deref(), Some("1,5"));
        assert_eq!(record.width.as_deref(), Some("0,5"));
        assert_eq!(record.length.as_deref(), Some("abc"));
        assert_eq!(record.quality.as_deref(), Some("USA"));
    }

    #[test]
    fn test_blank_order_quality_is_missing_but_stock_blank_is_usa() {
        assert_eq!(clean_order_quality(Some("  ".to_string())), None);
        assert_eq!(clean_order_quality(Some("MCR".to_string())), Some("MCR".to_string()));

        let mut item = StockItem::default();
        DataCleaner.clean_stock(&mut item);
        assert_eq!(item.quality.as_deref(), Some("USA"));
    }
}
