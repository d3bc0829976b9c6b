// ==========================================
// SysPro 排产看板 - 导入批次
// ==========================================
// 对齐: HistorialCargas 表
// 生命周期: 每次导入创建一条，之后不可变
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub mod columns {
    pub const TABLE: &str = "HistorialCargas";
}

/// 批次时间存储格式
pub const LOADED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBatch {
    pub id: i64,                     // id
    pub loaded_at: NaiveDateTime,    // fecha_hora
    pub row_count: i64,              // cantidad（源数据行数）
    pub source_file: Option<String>, // archivo
    pub operator: Option<String>,    // usuario_pc
}

/// 待写入的批次（id 由数据库生成）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoadBatch {
    pub loaded_at: NaiveDateTime,
    pub row_count: i64,
    pub source_file: Option<String>,
    pub operator: Option<String>,
}
