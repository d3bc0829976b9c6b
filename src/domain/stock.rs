// ==========================================
// SysPro 排产看板 - 原料库存领域模型
// ==========================================
// 对齐: StockBlanks 表
// 生命周期: 每次导入整表替换，无历史
// ==========================================

use serde::{Deserialize, Serialize};

pub mod columns {
    pub const TABLE: &str = "StockBlanks";

    pub const THICKNESS: &str = "ESP_CUB";
    pub const WIDTH: &str = "ANC_CUB";
    pub const LENGTH: &str = "LAR_CUB";
    pub const QUALITY: &str = "CALIDAD";
    pub const GROSS_VOLUME: &str = "M3";
    pub const USABLE_VOLUME: &str = "Vol_Util";

    pub const KNOWN: [(&str, &str); 6] = [
        (THICKNESS, "TEXT"),
        (WIDTH, "TEXT"),
        (LENGTH, "TEXT"),
        (QUALITY, "TEXT"),
        (GROSS_VOLUME, "REAL"),
        (USABLE_VOLUME, "REAL"),
    ];

    /// 源文件中以此前缀开头的列一律丢弃
    pub const DISCARDED_PREFIX: &str = "CAMP";
}

// ==========================================
// StockItem - 库存行
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    pub thickness: Option<String>,       // ESP_CUB
    pub width: Option<String>,           // ANC_CUB
    pub length: Option<String>,          // LAR_CUB
    pub quality: Option<String>,         // CALIDAD
    pub gross_volume_m3: Option<f64>,    // M3
    pub usable_volume_m3: Option<f64>,   // Vol_Util（对账口径）
}
