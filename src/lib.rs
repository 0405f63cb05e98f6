// ==========================================
// 仓库订单履约看板 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 多平台订单的库存分配与履约跟踪
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 库存分配规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AllocationStatus, IssueSource, Platform, PrintKind};

// 领域实体
pub use domain::{
    AllocationOutcome, AnnotatedRow, DashboardFilter, DashboardMode, KpiSummary, OrderLine,
    OrderLineSnapshot, ReportRow, ReportStatus,
};

// 引擎
pub use engine::{AllocationEngine, PlatformPrioritySorter};

// API
pub use api::{DashboardApi, ImportApi, OrderApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "仓库订单履约看板";
