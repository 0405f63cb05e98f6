// ==========================================
// 仓库订单履约看板 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供命令行/上层调用
// ==========================================

pub mod dashboard_api;
pub mod error;
pub mod import_api;
pub mod order_api;
pub mod sku_lock;

// 重导出核心类型
pub use dashboard_api::{DashboardApi, DashboardView, RecycleBinRow};
pub use error::{ApiError, ApiResult, StockShortage};
pub use import_api::{ImportApi, ImportApiResponse};
pub use order_api::{AcceptResult, OrderApi, PrintResult};
pub use sku_lock::SkuLockRegistry;
