// ==========================================
// 仓库订单履约看板 - 引擎层
// ==========================================
// 职责: 实现分配规则与派生指标,不拼 SQL
// 红线: Engine 不拼 SQL, 不写库
// ==========================================

pub mod allocation;
pub mod kpi;
pub mod priority;
pub mod report_overlay;
pub mod rollup;

// 重导出核心引擎
pub use allocation::AllocationEngine;
pub use kpi::summarize;
pub use priority::PlatformPrioritySorter;
pub use report_overlay::apply_report_overlay;
pub use rollup::{fully_low_stock_orders, fully_ready_orders, never_opened_sales_orders};
