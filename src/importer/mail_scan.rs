// ==========================================
// SysPro 排产看板 - 邮箱扫描（新订单号）
// ==========================================
// 输入: 导出的邮箱消息（JSON 数组）
// 规则:
// - 主题完全等于配置主题，且收件天数 ≤ 回溯天数
// - 正文按配置正则提取订单号，按首次出现去重
// - 去掉 Pedidos 中已有的订单号
// 输出: 新订单号列表 + ERP 交接文件（每行一个）
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailMessage {
    #[serde(alias = "Subject")]
    pub subject: String,
    #[serde(alias = "Body", default)]
    pub body: String,
    #[serde(alias = "ReceivedTime", alias = "received_time")]
    pub received_at: NaiveDateTime,
}

// ==========================================
// MailSource Trait
// ==========================================
// 实现者: JsonMailboxSource
pub trait MailSource {
    fn fetch_messages(&self) -> ImportResult<Vec<MailMessage>>;
}

pub struct JsonMailboxSource {
    path: PathBuf,
}

impl JsonMailboxSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl MailSource for JsonMailboxSource {
    fn fetch_messages(&self) -> ImportResult<Vec<MailMessage>> {
        if !self.path.exists() {
            return Err(ImportError::FileNotFound(self.path.display().to_string()));
        }
        let raw = fs::read_to_string(&self.path)?;
        let messages: Vec<MailMessage> = serde_json::from_str(&raw)?;
        debug!(count = messages.len(), "邮箱文件读取完成");
        Ok(messages)
    }
}

// ==========================================
// OrderNumberScanner
// ==========================================
pub struct OrderNumberScanner {
    subject: String,
    lookback_days: i64,
    pattern: Regex,
}

impl OrderNumberScanner {
    /// # 错误
    /// - ConfigValueError: 正则无法编译
    pub fn new(subject: &str, lookback_days: i64, pattern: &str) -> ImportResult<Self> {
        let pattern = Regex::new(pattern).map_err(|e| ImportError::ConfigValueError {
            key: "mail.order_pattern".to_string(),
            value: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            subject: subject.to_string(),
            lookback_days,
            pattern,
        })
    }

    fn is_relevant(&self, message: &MailMessage, now: NaiveDateTime) -> bool {
        message.subject == self.subject && (now - message.received_at).num_days() <= self.lookback_days
    }

    /// 提取订单号（去重，保持首次出现顺序）
    pub fn extract(&self, messages: &[MailMessage], now: NaiveDateTime) -> Vec<String> {
        let mut seen = HashSet::new();
        messages
            .iter()
            .filter(|m| self.is_relevant(m, now))
            .flat_map(|m| self.pattern.find_iter(&m.body).map(|hit| hit.as_str().to_string()))
            .filter(|number| seen.insert(number.clone()))
            .collect()
    }

    /// 提取并去掉库中已有的订单号
    pub fn new_order_numbers(
        &self,
        messages: &[MailMessage],
        now: NaiveDateTime,
        existing: &HashSet<String>,
    ) -> Vec<String> {
        let found = self.extract(messages, now);
        let total = found.len();
        let fresh: Vec<String> = found.into_iter().filter(|n| !existing.contains(n)).collect();
        info!(found = total, new = fresh.len(), "邮箱扫描完成");
        fresh
    }
}

/// 写 ERP 交接文件（覆盖写，每行一个订单号）
pub fn write_handoff_file(path: &Path, numbers: &[String]) -> ImportResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    for number in numbers {
        writeln!(file, "{}", number)?;
    }
    Ok(())
}
