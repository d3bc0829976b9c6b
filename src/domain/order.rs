// ==========================================
// SysPro 排产看板 - 订单领域模型
// ==========================================
// 对齐: Pedidos 表（列名沿用历史库，含 '.' 与 '#'）
// 生命周期: 导入时创建 → 表格编辑原地修改 → 永不删除
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// Pedidos 列名
// ==========================================
pub mod columns {
    pub const TABLE: &str = "Pedidos";

    pub const RECORDED_AT: &str = "Hora_Grabado";
    pub const ORDER_NUMBER: &str = "OFA";
    pub const POSITION: &str = "Pos.OFA";
    pub const MACHINE: &str = "Maq";
    pub const SEQUENCE: &str = "Sec";
    pub const PLACEMENT_WEEK: &str = "SemanaPues";
    pub const PLACEMENT_DATE: &str = "Fec.Puesta";
    pub const ORDER_DATE: &str = "FechaOFA";
    pub const TEMPLATE: &str = "TEMPLATE";
    pub const MATERIAL_CODE: &str = "Materia";
    pub const MATERIAL_TEXT: &str = "Textomat";
    pub const THICKNESS: &str = "EspesroMP";
    pub const WIDTH: &str = "AnchoMP";
    pub const LENGTH: &str = "LAR_DEC";
    pub const QUALITY: &str = "CalidadMP";
    pub const UNITS: &str = "Units";
    pub const VOLUME: &str = "Vol#M3";
    pub const LOAD_ID: &str = "id_carga";

    /// 目标表已知列（顺序即建表顺序）及其 SQL 类型
    pub const KNOWN: [(&str, &str); 18] = [
        (RECORDED_AT, "TEXT"),
        (ORDER_NUMBER, "TEXT"),
        (POSITION, "TEXT"),
        (MACHINE, "TEXT"),
        (SEQUENCE, "INTEGER"),
        (PLACEMENT_WEEK, "TEXT"),
        (PLACEMENT_DATE, "TEXT"),
        (ORDER_DATE, "TEXT"),
        (TEMPLATE, "TEXT"),
        (MATERIAL_CODE, "TEXT"),
        (MATERIAL_TEXT, "TEXT"),
        (THICKNESS, "TEXT"),
        (WIDTH, "TEXT"),
        (LENGTH, "TEXT"),
        (QUALITY, "TEXT"),
        (UNITS, "REAL"),
        (VOLUME, "REAL"),
        (LOAD_ID, "INTEGER"),
    ];

    /// 历史列名 → 规范列名
    pub const LEGACY_RENAMES: [(&str, &str); 2] =
        [("Fec#Puesta", PLACEMENT_DATE), ("Pos#OFA", POSITION)];
}

// ==========================================
// Order - 订单行（Pedidos）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64, // rowid

    pub recorded_at: Option<String>,    // Hora_Grabado
    pub order_number: Option<String>,   // OFA
    pub position: Option<String>,       // Pos.OFA（4 位补零）
    pub machine: Option<String>,        // Maq
    pub sequence: Option<i64>,          // Sec
    pub placement_week: Option<String>, // SemanaPues
    pub placement_date: Option<String>, // Fec.Puesta
    pub order_date: Option<String>,     // FechaOFA

    pub template: Option<String>,      // TEMPLATE
    pub material_code: Option<String>, // Materia
    pub material_text: Option<String>, // Textomat

    // 原料尺寸/等级（规范文本）
    pub thickness: Option<String>, // EspesroMP
    pub width: Option<String>,     // AnchoMP
    pub length: Option<String>,    // LAR_DEC
    pub quality: Option<String>,   // CalidadMP

    pub units: Option<f64>,     // Units
    pub volume_m3: Option<f64>, // Vol#M3

    pub load_id: Option<i64>, // id_carga → HistorialCargas.id
}

// ==========================================
// RawOrderRecord - 导入中间结构体
// ==========================================
// 用途: 文件解析 → 字段映射 → 清洗/补全 → 落库
// 生命周期: 仅在导入流程内
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOrderRecord {
    pub order_number: Option<String>,
    pub position: Option<String>,
    pub machine: Option<String>,
    pub sequence: Option<i64>,
    pub placement_week: Option<String>,
    pub placement_date: Option<String>,
    pub order_date: Option<String>,
    pub template: Option<String>,
    pub material_code: Option<String>,
    pub material_text: Option<String>,
    pub thickness: Option<String>,
    pub width: Option<String>,
    pub length: Option<String>,
    pub quality: Option<String>,
    pub units: Option<f64>,
    pub volume_m3: Option<f64>,

    // 目标表存在、但不在已知列清单内的历史列（原样写入）
    pub extra_columns: BTreeMap<String, String>,

    // 元信息
    pub row_number: usize, // 源文件行号（1 起）
}

impl RawOrderRecord {
    /// 是否缺少任一可补全属性（厚/宽/等级）
    pub fn is_missing_material_attributes(&self) -> bool {
        self.thickness.is_none() || self.width.is_none() || self.quality.is_none()
    }

    /// 去重自然键: (OFA, Pos.OFA)
    pub fn natural_key(&self) -> Option<OrderKey> {
        let order_number = self.order_number.as_ref()?;
        Some(OrderKey {
            order_number: order_number.clone(),
            position: self.position.clone().unwrap_or_default(),
        })
    }
}

// ==========================================
// OrderKey - 去重自然键
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderKey {
    pub order_number: String,
    pub position: String,
}

impl std::fmt::Display for OrderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.order_number, self.position)
    }
}

// ==========================================
// MaterialAttributes - 可补全的原料属性
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialAttributes {
    pub thickness: String,
    pub width: String,
    pub quality: String,
}

// ==========================================
// IncompleteOrder - 补全失败的行
// ==========================================
// 作为数据返回给操作员，不是错误
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncompleteOrder {
    pub order_number: Option<String>,
    pub position: Option<String>,
    pub template: Option<String>,
    pub material_code: Option<String>,
}

// ==========================================
// OrderEdit - 表格单元格编辑
// ==========================================
// None 表示该字段不修改
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderEdit {
    pub id: i64,
    pub machine: Option<String>,
    pub sequence: Option<i64>,
    pub material_code: Option<String>,
    pub material_text: Option<String>,
    pub thickness: Option<String>,
    pub width: Option<String>,
    pub length: Option<String>,
    pub quality: Option<String>,
    pub volume_m3: Option<f64>,
}

impl OrderEdit {
    pub fn is_empty(&self) -> bool {
        self.machine.is_none()
            && self.sequence.is_none()
            && self.material_code.is_none()
            && self.material_text.is_none()
            && self.thickness.is_none()
            && self.width.is_none()
            && self.length.is_none()
            && self.quality.is_none()
            && self.volume_m3.is_none()
    }
}
