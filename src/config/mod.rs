// ==========================================
// SysPro 排产看板 - 配置层
// ==========================================
// 职责: 系统配置读取/写入，代码内置默认值
// 存储: config_kv 表（scope_id = 'global'）
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

pub use config_manager::{config_keys, defaults, ConfigEntry, ConfigManager};
pub use import_config_trait::ImportConfigReader;
