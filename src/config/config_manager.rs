// ==========================================
// SysPro 排产看板 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (scope_id + key → value)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 邮箱扫描
    pub const MAIL_SUBJECT: &str = "mail.subject";
    pub const MAIL_LOOKBACK_DAYS: &str = "mail.lookback_days";
    pub const MAIL_ORDER_PATTERN: &str = "mail.order_pattern";

    // ERP 交接文件（新订单号清单）
    pub const ERP_HANDOFF_FILE: &str = "erp.handoff_file";

    // 导出目录
    pub const EXPORT_DIR: &str = "export.dir";

    pub const ALL: [&str; 5] = [
        MAIL_SUBJECT,
        MAIL_LOOKBACK_DAYS,
        MAIL_ORDER_PATTERN,
        ERP_HANDOFF_FILE,
        EXPORT_DIR,
    ];
}

// ==========================================
// 默认值
// ==========================================
pub mod defaults {
    pub const MAIL_SUBJECT: &str = "Publicación a SAP";
    pub const MAIL_LOOKBACK_DAYS: i64 = 3;
    pub const MAIL_ORDER_PATTERN: &str = r"510000\d+";
    pub const ERP_HANDOFF_FILE: &str = "Pegar en SAP1.txt";
    pub const EXPORT_DIR: &str = ".";

    /// 键 → 默认值文本
    pub fn for_key(key: &str) -> Option<String> {
        use super::config_keys as k;
        match key {
            k::MAIL_SUBJECT => Some(MAIL_SUBJECT.to_string()),
            k::MAIL_LOOKBACK_DAYS => Some(MAIL_LOOKBACK_DAYS.to_string()),
            k::MAIL_ORDER_PATTERN => Some(MAIL_ORDER_PATTERN.to_string()),
            k::ERP_HANDOFF_FILE => Some(ERP_HANDOFF_FILE.to_string()),
            k::EXPORT_DIR => Some(EXPORT_DIR.to_string()),
            _ => None,
        }
    }
}

/// 配置项（生效值）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub is_default: bool,
    pub updated_at: Option<String>,
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 已存储的值
    /// - None: 未设置（调用方使用默认值）
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn get_config_or_default(&self, key: &str) -> RepositoryResult<String> {
        match self.get_global_config_value(key)? {
            Some(v) => Ok(v),
            None => defaults::for_key(key).ok_or_else(|| RepositoryError::NotFound {
                entity: "config".to_string(),
                id: key.to_string(),
            }),
        }
    }

    /// 写入配置（UPSERT）
    ///
    /// # 说明
    /// - 只接受 config_keys::ALL 中的键
    /// - mail.lookback_days 必须是非负整数
    pub fn set_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        if !config_keys::ALL.contains(&key) {
            return Err(RepositoryError::ValidationError(format!(
                "未知配置键: {}",
                key
            )));
        }
        if key == config_keys::MAIL_LOOKBACK_DAYS {
            match value.trim().parse::<i64>() {
                Ok(days) if days >= 0 => {}
                _ => {
                    return Err(RepositoryError::FieldValueError {
                        field: key.to_string(),
                        message: format!("需要非负整数，实际为 '{}'", value),
                    })
                }
            }
        }
        if key == config_keys::MAIL_ORDER_PATTERN {
            if let Err(e) = regex::Regex::new(value) {
                return Err(RepositoryError::FieldValueError {
                    field: key.to_string(),
                    message: e.to_string(),
                });
            }
        }

        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;
        info!(key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 列出全部已知配置的生效值
    pub fn list_all(&self) -> RepositoryResult<Vec<ConfigEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT value, updated_at FROM config_kv WHERE scope_id = ?1 AND key = ?2",
        )?;

        let mut entries = Vec::with_capacity(config_keys::ALL.len());
        for key in config_keys::ALL {
            let stored = stmt
                .query_row(params![GLOBAL_SCOPE, key], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
                })
                .optional()?;
            let entry = match stored {
                Some((value, updated_at)) => ConfigEntry {
                    key: key.to_string(),
                    value,
                    is_default: false,
                    updated_at,
                },
                None => ConfigEntry {
                    key: key.to_string(),
                    value: defaults::for_key(key).unwrap_or_default(),
                    is_default: true,
                    updated_at: None,
                },
            };
            entries.push(entry);
        }
        Ok(entries)
    }

    fn read(&self, key: &str) -> ImportResult<String> {
        self.get_config_or_default(key)
            .map_err(|e| ImportError::ConfigReadError {
                key: key.to_string(),
                message: e.to_string(),
            })
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
impl ImportConfigReader for ConfigManager {
    fn get_mail_subject(&self) -> ImportResult<String> {
        self.read(config_keys::MAIL_SUBJECT)
    }

    fn get_mail_lookback_days(&self) -> ImportResult<i64> {
        let value = self.read(config_keys::MAIL_LOOKBACK_DAYS)?;
        match value.trim().parse::<i64>() {
            Ok(days) if days >= 0 => Ok(days),
            _ => {
                warn!(
                    config_key = config_keys::MAIL_LOOKBACK_DAYS,
                    raw_value = %value,
                    "回溯天数配置格式错误，使用默认值"
                );
                Ok(defaults::MAIL_LOOKBACK_DAYS)
            }
        }
    }

    fn get_mail_order_pattern(&self) -> ImportResult<String> {
        self.read(config_keys::MAIL_ORDER_PATTERN)
    }

    fn get_erp_handoff_file(&self) -> ImportResult<PathBuf> {
        Ok(PathBuf::from(self.read(config_keys::ERP_HANDOFF_FILE)?))
    }

    fn get_export_dir(&self) -> ImportResult<PathBuf> {
        Ok(PathBuf::from(self.read(config_keys::EXPORT_DIR)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::ensure_base_schema;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        ensure_base_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_unset() {
        let cfg = manager();
        assert_eq!(cfg.get_mail_subject().unwrap(), "Publicación a SAP");
        assert_eq!(cfg.get_mail_lookback_days().unwrap(), 3);
        assert_eq!(cfg.get_mail_order_pattern().unwrap(), r"510000\d+");
        assert!(cfg.list_all().unwrap().iter().all(|e| e.is_default));
    }

    #[test]
    fn test_set_overrides_default() {
        let cfg = manager();
        cfg.set_config_value(config_keys::MAIL_LOOKBACK_DAYS, "7").unwrap();
        cfg.set_config_value(config_keys::MAIL_LOOKBACK_DAYS, "5").unwrap();
        assert_eq!(cfg.get_mail_lookback_days().unwrap(), 5);

        let entry = cfg
            .list_all()
            .unwrap()
            .into_iter()
            .find(|e| e.key == config_keys::MAIL_LOOKBACK_DAYS)
            .unwrap();
        assert!(!entry.is_default);
        assert!(entry.updated_at.is_some());
    }

    #[test]
    fn test_set_rejects_unknown_key_and_bad_values() {
        let cfg = manager();
        assert!(matches!(
            cfg.set_config_value("nope", "1"),
            Err(RepositoryError::ValidationError(_))
        ));
        assert!(matches!(
            cfg.set_config_value(config_keys::MAIL_LOOKBACK_DAYS, "-1"),
            Err(RepositoryError::FieldValueError { .. })
        ));
        assert!(matches!(
            cfg.set_config_value(config_keys::MAIL_ORDER_PATTERN, "("),
            Err(RepositoryError::FieldValueError { .. })
        ));
    }
}
