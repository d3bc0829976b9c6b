// ==========================================
// SysPro 排产看板 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口，屏蔽数据库细节
// 约束: 所有取值查询使用参数化；表名/列名经 quote_ident
// ==========================================

pub mod error;
pub mod load_batch_repo;
pub mod order_repo;
pub mod row_values;
pub mod stock_repo;

pub use error::{RepositoryError, RepositoryResult};
pub use load_batch_repo::{LoadBatchRepository, DEFAULT_HISTORY_LIMIT};
pub use order_repo::OrderRepository;
pub use stock_repo::StockRepository;
