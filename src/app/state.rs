// ==========================================
// SysPro 排产看板 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享连接和 API 实例
// 说明: 单进程单连接，所有仓储共享 Arc<Mutex<Connection>>
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::Serialize;

use crate::api::{ApiError, ApiResult, ConfigApi, DashboardApi, ImportApi, OrderApi};
use crate::config::ConfigManager;
use crate::db::migrations::{
    ensure_order_columns, normalize_legacy_order_columns, run_migrations, MigrationReport,
};
use crate::db::open_sqlite_connection;
use crate::exporter::Exporter;
use crate::repository::{LoadBatchRepository, OrderRepository, StockRepository};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "SYSPRO_DB_PATH";

/// 结构检查结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
    pub migrations: MigrationReport,
    /// 迁移之后仍被改名的历史列（外部工具写回旧列名时出现）
    pub renamed_columns: Vec<String>,
    /// 迁移之后仍被补齐的列
    pub added_columns: Vec<String>,
}

/// 应用状态
///
/// 包含共享连接和所有 API 实例
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 启动时的结构检查结果
    pub startup_schema: SchemaReport,

    /// 导入 API
    pub import_api: Arc<ImportApi>,

    /// 订单 API
    pub order_api: Arc<OrderApi>,

    /// 看板 API
    pub dashboard_api: Arc<DashboardApi>,

    /// 配置管理 API
    pub config_api: Arc<ConfigApi>,

    conn: Arc<Mutex<Connection>>,
}

impl AppState {
    /// 创建新的 AppState 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（不存在时新建）
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开连接并应用统一 PRAGMA
    /// 2. 执行未记录的迁移，再检查历史列名与缺列（每次启动都做）
    /// 3. 创建所有 Repository 与 API 实例
    pub fn new(db_path: String) -> ApiResult<Self> {
        tracing::info!(db_path = %db_path, "初始化 AppState");

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(format!("无法打开数据库 {}: {}", db_path, e)))?;
        let startup_schema = check_schema(&conn)
            .map_err(|e| ApiError::DatabaseTransactionError(format!("结构检查失败: {}", e)))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化 Repository 层
        // ==========================================
        let order_repo = Arc::new(OrderRepository::from_connection(conn.clone()));
        let stock_repo = Arc::new(StockRepository::from_connection(conn.clone()));
        let load_batch_repo = Arc::new(LoadBatchRepository::from_connection(conn.clone()));
        let config_manager = Arc::new(ConfigManager::from_connection(conn.clone())?);
        let exporter = Arc::new(Exporter::from_connection(conn.clone()));

        // ==========================================
        // 初始化 API 层
        // ==========================================
        let import_api = Arc::new(ImportApi::new(conn.clone(), config_manager.clone()));
        let order_api = Arc::new(OrderApi::new(order_repo.clone(), load_batch_repo));
        let dashboard_api = Arc::new(DashboardApi::new(
            order_repo,
            stock_repo,
            exporter,
            config_manager.clone(),
        ));
        let config_api = Arc::new(ConfigApi::new(config_manager));

        tracing::info!(
            schema_version = startup_schema.migrations.current_version,
            applied = startup_schema.migrations.applied.len(),
            renamed = ?startup_schema.renamed_columns,
            added = ?startup_schema.added_columns,
            "AppState 初始化完成"
        );

        Ok(Self {
            db_path,
            startup_schema,
            import_api,
            order_api,
            dashboard_api,
            config_api,
            conn,
        })
    }

    /// 结构检查：执行迁移，再做一次历史列改名与补列
    ///
    /// # 说明
    /// 幂等：第二次执行不会产生任何改动
    pub fn migrate(&self) -> ApiResult<SchemaReport> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ApiError::DatabaseError(format!("数据库锁获取失败: {}", e)))?;

        check_schema(&conn).map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))
    }
}

/// 迁移 + 历史列改名 + 补列
///
/// # 说明
/// 迁移只执行一次，但 Pedidos 可能被外部工具整表替换回旧列名，
/// 所以改名与补列在每次打开时都要再检查
fn check_schema(conn: &Connection) -> rusqlite::Result<SchemaReport> {
    let migrations = run_migrations(conn)?;
    let renamed_columns = normalize_legacy_order_columns(conn)?;
    let added_columns = ensure_order_columns(conn)?;

    if !renamed_columns.is_empty() || !added_columns.is_empty() {
        tracing::warn!(
            renamed = ?renamed_columns,
            added = ?added_columns,
            "Pedidos 结构已被外部改动，已重新规范化"
        );
    }

    Ok(SchemaReport {
        migrations,
        renamed_columns,
        added_columns,
    })
}

/// 默认数据库路径
///
/// # 优先级
/// 1. 环境变量 SYSPRO_DB_PATH
/// 2. <用户数据目录>/syspro-planner/pedidos.sqlite
/// 3. ./pedidos.sqlite
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./pedidos.sqlite");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("syspro-planner");
        // 目录创建失败时 open 会给出明确错误
        std::fs::create_dir_all(&dir).ok();
        path = dir.join("pedidos.sqlite");
    }

    path.to_string_lossy().to_string()
}
