// ==========================================
// SysPro 排产看板 - 配置管理 API
// ==========================================
// 职责: 配置查询、更新
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{config_keys, ConfigEntry, ConfigManager};
use std::sync::Arc;

/// 配置管理 API
pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
}

impl ConfigApi {
    pub fn new(config_manager: Arc<ConfigManager>) -> Self {
        Self { config_manager }
    }

    /// 全部已知配置的生效值（含默认值标记）
    pub fn list_configs(&self) -> ApiResult<Vec<ConfigEntry>> {
        Ok(self.config_manager.list_all()?)
    }

    /// 单个配置的生效值
    pub fn get_config(&self, key: &str) -> ApiResult<ConfigEntry> {
        self.list_configs()?
            .into_iter()
            .find(|e| e.key == key)
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "未知配置键: {}（可用: {}）",
                    key,
                    config_keys::ALL.join(", ")
                ))
            })
    }

    /// 更新配置
    pub fn update_config(&self, key: &str, value: &str) -> ApiResult<ConfigEntry> {
        self.config_manager.set_config_value(key, value)?;
        self.get_config(key)
    }
}
