// ==========================================
// SysPro 排产看板 - 宽松取值
// ==========================================
// 历史库列无固定类型（同一列可能混有 INTEGER/REAL/TEXT），
// 这里按目标类型宽松转换，转换不了的一律视为缺失
// ==========================================

use crate::db::quote_ident;
use rusqlite::types::ValueRef;
use rusqlite::Connection;

/// 取文本；空白视为缺失
pub fn text_value(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(format_real(f)),
        ValueRef::Text(t) => {
            let s = String::from_utf8_lossy(t);
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
    }
}

pub fn real_value(value: ValueRef<'_>) -> Option<f64> {
    match value {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(t) => String::from_utf8_lossy(t)
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok(),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

pub fn int_value(value: ValueRef<'_>) -> Option<i64> {
    match value {
        ValueRef::Integer(i) => Some(i),
        ValueRef::Real(f) if f.fract() == 0.0 => Some(f as i64),
        ValueRef::Text(_) => real_value(value).filter(|f| f.fract() == 0.0).map(|f| f as i64),
        _ => None,
    }
}

/// 整数值的浮点不带 ".0"
pub fn format_real(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// 整表按文本读出（导出用）
///
/// # 返回
/// - (列名, 行)；缺失值为空串
pub fn read_table_as_text(
    conn: &Connection,
    table: &str,
) -> rusqlite::Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM {} ORDER BY rowid", quote_ident(table)))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let rows = stmt
        .query_map([], |row| {
            let mut cells = Vec::with_capacity(width);
            for idx in 0..width {
                cells.push(text_value(row.get_ref(idx)?).unwrap_or_default());
            }
            Ok(cells)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((columns, rows))
}
