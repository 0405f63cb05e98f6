// ==========================================
// 仓库订单履约看板 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod order_line_repo;
pub mod overlay_repo;
pub mod sales_repo;
pub mod shop_repo;
pub mod stock_repo;
pub mod time_fmt;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use order_line_repo::OrderLineRepository;
pub use overlay_repo::{OverlayRepository, OverlaySets, OverlaySource};
pub use sales_repo::SalesRepository;
pub use shop_repo::ShopRepository;
pub use stock_repo::StockRepository;
