// ==========================================
// SysPro 排产看板 - 领域值类型
// ==========================================
// 职责: 尺寸 (Dimension) 与材质等级 (Quality) 的解析与规范化
// 红线: 规范化永不向外抛错，无法解析的值原样返回
// ==========================================

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 材质等级 (Quality)
// ==========================================
// 规范化后只允许四种取值
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Quality {
    Clear, // CLEAR_GB
    Mcm,   // MCM / MCM_PECA
    Usa,   // CLEAR_GB_PECA / CLEAR_GB_TA / 空白
    Mcr,   // 其他
}

impl Quality {
    pub const ALL: [Quality; 4] = [Quality::Clear, Quality::Mcm, Quality::Usa, Quality::Mcr];

    /// 库存源码 → 规范等级（全映射，任何输入都有结果）
    ///
    /// # 规则
    /// - CLEAR_GB → CLEAR
    /// - MCM_PECA / MCM → MCM
    /// - CLEAR_GB_PECA / CLEAR_GB_TA / 空白 / NONE / (EN BLANCO) → USA
    /// - 其他 → MCR
    pub fn from_source_code(raw: &str) -> Quality {
        let code = raw.trim().to_uppercase();
        match code.as_str() {
            "CLEAR_GB" => Quality::Clear,
            "MCM_PECA" | "MCM" => Quality::Mcm,
            "CLEAR_GB_PECA" | "CLEAR_GB_TA" | "(EN BLANCO)" | "" | "NONE" => Quality::Usa,
            _ => Quality::Mcr,
        }
    }

    /// 解析已规范的等级文本（大小写不敏感）
    pub fn parse_canonical(raw: &str) -> Option<Quality> {
        match raw.trim().to_uppercase().as_str() {
            "CLEAR" => Some(Quality::Clear),
            "MCM" => Some(Quality::Mcm),
            "USA" => Some(Quality::Usa),
            "MCR" => Some(Quality::Mcr),
            _ => None,
        }
    }

    /// 订单侧等级清洗
    ///
    /// - 空白 → None（视为缺失，交给属性补全）
    /// - 已是规范值 → 保持
    /// - 其他源码 → 走 from_source_code 映射
    ///
    /// 对规范值幂等，因此分组前可以重复调用。
    pub fn canonicalize(raw: &str) -> Option<Quality> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Quality::parse_canonical(trimmed).unwrap_or_else(|| Quality::from_source_code(trimmed)))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Clear => "CLEAR",
            Quality::Mcm => "MCM",
            Quality::Usa => "USA",
            Quality::Mcr => "MCR",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 尺寸 (Dimension)
// ==========================================
// 十进制定点值，入库边界解析一次
// 显示格式: 整数不带小数；否则保留 4 位小数，小数点用 ','
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dimension(Decimal);

impl Dimension {
    /// 小数位数
    pub const SCALE: u32 = 4;

    /// 解析尺寸文本
    ///
    /// # 支持格式
    /// - 小数: "1.5" / "1,5"
    /// - 分数: "3/4"
    /// - 带分数: "1_1/2" / "1 1/2"
    ///
    /// # 返回
    /// - None: 无法解析（含分母为 0）
    pub fn parse(raw: &str) -> Option<Dimension> {
        let text = raw.trim().replace(',', ".");
        if text.is_empty() {
            return None;
        }

        let value = if let Some((whole, frac)) = text.split_once('_') {
            parse_mixed(whole, frac)?
        } else if text.contains('/') && text.contains(char::is_whitespace) {
            let mut parts = text.split_whitespace();
            let whole = parts.next()?;
            let frac = parts.next()?;
            if parts.next().is_some() {
                return None;
            }
            parse_mixed(whole, frac)?
        } else if text.contains('/') {
            parse_fraction(&text)?
        } else {
            parse_decimal(&text)?
        };

        Some(Dimension::from_decimal(value))
    }

    /// 从十进制值构造（按 SCALE 做银行家舍入）
    pub fn from_decimal(value: Decimal) -> Dimension {
        Dimension(
            value
                .round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointNearestEven)
                .normalize(),
        )
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_integral(&self) -> bool {
        self.0.fract().is_zero()
    }

    /// 规范化任意尺寸文本，无法解析时原样返回
    pub fn normalize_text(raw: &str) -> String {
        match Dimension::parse(raw) {
            Some(dim) => dim.to_string(),
            None => raw.to_string(),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integral() {
            write!(f, "{}", self.0.trunc().normalize())
        } else {
            write!(f, "{}", self.0.normalize().to_string().replace('.', ","))
        }
    }
}

impl Serialize for Dimension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
        .or_else(|| text.parse::<f64>().ok().and_then(Decimal::from_f64))
}

// 分数要求分子/分母均为整数
fn parse_fraction(text: &str) -> Option<Decimal> {
    let (num, den) = text.split_once('/')?;
    let num: i64 = num.trim().parse().ok()?;
    let den: i64 = den.trim().parse().ok()?;
    if den == 0 {
        return None;
    }
    Decimal::from(num).checked_div(Decimal::from(den))
}

// 带分数: 整数部分的符号作用于整体
fn parse_mixed(whole: &str, frac: &str) -> Option<Decimal> {
    let whole = parse_decimal(whole)?;
    let frac_text = frac.trim();
    if frac_text.contains('_') {
        return None;
    }
    let frac = if frac_text.contains('/') {
        parse_fraction(frac_text)?
    } else {
        parse_decimal(frac_text)?
    };

    if whole.is_sign_negative() {
        whole.checked_sub(frac)
    } else {
        whole.checked_add(frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &str) -> String {
        Dimension::normalize_text(raw)
    }

    #[test]
    fn test_dimension_mixed_numbers() {
        assert_eq!(norm("1_1/2"), "1,5");
        assert_eq!(norm("1 1/2"), "1,5");
        assert_eq!(norm("2_3/4"), "2,75");
    }

    #[test]
    fn test_dimension_fraction_and_decimal() {
        assert_eq!(norm("2/4"), "0,5");
        assert_eq!(norm("1/3"), "0,3333");
        assert_eq!(norm("1.25"), "1,25");
        assert_eq!(norm("1,25"), "1,25");
        assert_eq!(norm(" 38 "), "38");
        assert_eq!(norm("38.0"), "38");
    }

    #[test]
    fn test_dimension_rounding_half_even() {
        // 1/32 = 0.03125 → 0.0312
        assert_eq!(norm("1/32"), "0,0312");
        assert_eq!(norm("0.00005"), "0");
        assert_eq!(norm("2.00001"), "2");
    }

    #[test]
    fn test_dimension_unparsable_passthrough() {
        assert_eq!(norm("abc"), "abc");
        assert_eq!(norm("1/0"), "1/0");
        assert_eq!(norm(""), "");
        assert_eq!(norm("1_2_3"), "1_2_3");
        assert_eq!(norm("1.5/2"), "1.5/2");
    }

    #[test]
    fn test_dimension_idempotent() {
        for raw in ["1_1/2", "2/4", "1/3", "0.03125", "7", "12,7", "5/8", "3 3/16"] {
            let once = norm(raw);
            assert_eq!(norm(&once), once, "not idempotent for {}", raw);
        }
    }

    #[test]
    fn test_dimension_fraction_matches_decimal_division() {
        for (a, b) in [(1i64, 3i64), (5, 8), (7, 16), (22, 7), (9, 4)] {
            let direct = Dimension::from_decimal(Decimal::from(a) / Decimal::from(b)).to_string();
            assert_eq!(norm(&format!("{}/{}", a, b)), direct);
        }
    }

    #[test]
    fn test_quality_mapping() {
        assert_eq!(Quality::from_source_code("CLEAR_GB"), Quality::Clear);
        assert_eq!(Quality::from_source_code("mcm_peca"), Quality::Mcm);
        assert_eq!(Quality::from_source_code("MCM"), Quality::Mcm);
        assert_eq!(Quality::from_source_code("clear_gb_peca"), Quality::Usa);
        assert_eq!(Quality::from_source_code("CLEAR_GB_TA"), Quality::Usa);
        assert_eq!(Quality::from_source_code("  "), Quality::Usa);
        assert_eq!(Quality::from_source_code("none"), Quality::Usa);
        assert_eq!(Quality::from_source_code("(en blanco)"), Quality::Usa);
        assert_eq!(Quality::from_source_code("XYZ"), Quality::Mcr);
    }

    #[test]
    fn test_quality_canonicalize_keeps_canonical_codes() {
        assert_eq!(Quality::canonicalize("clear"), Some(Quality::Clear));
        assert_eq!(Quality::canonicalize("USA"), Some(Quality::Usa));
        assert_eq!(Quality::canonicalize("CLEAR_GB"), Some(Quality::Clear));
        assert_eq!(Quality::canonicalize(""), None);
        for q in Quality::ALL {
            assert_eq!(Quality::canonicalize(q.as_str()), Some(q));
        }
    }
}
