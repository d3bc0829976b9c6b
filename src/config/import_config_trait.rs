// ==========================================
// SysPro 排产看板 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入/扫描/导出所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::importer::error::ImportResult;
use std::path::PathBuf;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取，缺省走 defaults）
pub trait ImportConfigReader {
    /// 邮件主题（完全匹配）
    ///
    /// # 默认值
    /// - "Publicación a SAP"
    fn get_mail_subject(&self) -> ImportResult<String>;

    /// 邮件回溯天数（按整天计，含边界）
    ///
    /// # 默认值
    /// - 3
    fn get_mail_lookback_days(&self) -> ImportResult<i64>;

    /// 订单号正则
    ///
    /// # 默认值
    /// - `510000\d+`
    fn get_mail_order_pattern(&self) -> ImportResult<String>;

    /// ERP 交接文件路径
    fn get_erp_handoff_file(&self) -> ImportResult<PathBuf>;

    /// 导出目录
    fn get_export_dir(&self) -> ImportResult<PathBuf>;
}
