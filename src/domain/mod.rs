// ==========================================
// 仓库订单履约看板 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、引擎输入输出
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod allocation;
pub mod filter;
pub mod order;
pub mod types;

// 重导出核心类型
pub use allocation::{
    AllocationOutcome, AnnotatedRow, KpiSummary, OrderLineSnapshot, ReportRow, ReportStatus,
    SalesLabel, SalesSnapshot, NOT_IN_SBS_LABEL, NOT_OPENED_LABEL,
};
pub use filter::{DashboardFilter, DashboardMode};
pub use order::{
    resolve_stock_qty, CancelledOrder, DeletedOrder, IssuedOrder, NewOrderLine, OrderLine,
    PrintMark, PrintTracking, Product, SalesRecord, Shop, Stock,
};
pub use types::{AllocationStatus, IssueSource, Platform, PrintKind};
