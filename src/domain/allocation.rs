// ==========================================
// 仓库订单履约看板 - 分配引擎输入/输出
// ==========================================
// 输入: OrderLineSnapshot (调用方预先解析库存/覆盖集合)
// 输出: AnnotatedRow + KpiSummary
// ==========================================

use crate::domain::order::PrintTracking;
use crate::domain::types::{AllocationStatus, Platform};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 尚未同步到 SBS 的显示文案
pub const NOT_IN_SBS_LABEL: &str = "Orderยังไม่นำเข้าSBS";

/// 已同步但未开销售单的显示文案
pub const NOT_OPENED_LABEL: &str = "ยังไม่มีการเปิดใบขาย";

// ==========================================
// SalesSnapshot - 销售单原始状态
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalesSnapshot {
    /// sales 表中没有该 order_id
    NotInSbs,
    /// 有 sales 记录（status 可能为空）
    Synced { status: Option<String> },
}

// ==========================================
// SalesLabel - 分类后的销售单标签
// ==========================================
// NotInSbs 与 NotOpened 是两种不同的否定状态，不可混淆
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalesLabel {
    NotInSbs,
    NotOpened,
    Status(String),
}

impl SalesLabel {
    pub fn from_snapshot(sales: &SalesSnapshot) -> Self {
        match sales {
            SalesSnapshot::NotInSbs => SalesLabel::NotInSbs,
            // 仅空串视为未开单；空白状态是有效标签
            SalesSnapshot::Synced { status } => match status.as_deref() {
                Some(s) if !s.is_empty() => SalesLabel::Status(s.to_string()),
                _ => SalesLabel::NotOpened,
            },
        }
    }

    pub fn display_text(&self) -> &str {
        match self {
            SalesLabel::NotInSbs => NOT_IN_SBS_LABEL,
            SalesLabel::NotOpened => NOT_OPENED_LABEL,
            SalesLabel::Status(s) => s.as_str(),
        }
    }
}

impl fmt::Display for SalesLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_text())
    }
}

// ==========================================
// OrderLineSnapshot - 引擎输入行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineSnapshot {
    pub line_id: i64,
    pub shop_id: i64,
    pub platform: Platform,
    pub shop_name: String,
    pub order_id: String,
    pub sku: String,
    pub qty: i64,
    pub order_time: Option<NaiveDateTime>,

    /// 已按 Product > Stock 解析的起始库存
    pub stock_qty: i64,
    pub sales: SalesSnapshot,

    pub accepted: bool,
    pub accepted_at: Option<NaiveDateTime>,
    pub accepted_by: Option<String>,
    pub is_cancelled: bool,
    pub is_issued: bool,

    // ===== 仅展示，原样透传 =====
    pub brand: String,
    pub model: String,
    pub logistic_type: String,
    pub dispatch_round: Option<i64>,
    pub printing: PrintTracking,
    pub scanned_at: Option<NaiveDateTime>,
    pub scanned_by: Option<String>,
}

impl OrderLineSnapshot {
    /// 以最少字段构造快照，其余字段取默认值
    pub fn new(
        line_id: i64,
        order_id: &str,
        sku: &str,
        platform: Platform,
        qty: i64,
        stock_qty: i64,
    ) -> Self {
        Self {
            line_id,
            shop_id: 0,
            platform,
            shop_name: String::new(),
            order_id: order_id.to_string(),
            sku: sku.to_string(),
            qty,
            order_time: None,
            stock_qty,
            sales: SalesSnapshot::NotInSbs,
            accepted: false,
            accepted_at: None,
            accepted_by: None,
            is_cancelled: false,
            is_issued: false,
            brand: String::new(),
            model: String::new(),
            logistic_type: String::new(),
            dispatch_round: None,
            printing: PrintTracking::default(),
            scanned_at: None,
            scanned_by: None,
        }
    }
}

// ==========================================
// AnnotatedRow - 引擎输出行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRow {
    #[serde(flatten)]
    pub line: OrderLineSnapshot,

    pub is_packed: bool,
    pub is_not_in_sbs: bool,
    pub sales_label: SalesLabel,

    /// 同 SKU 未打包、未取消行的需求总量（仅展示）
    pub all_qty: i64,

    pub allocation_status: AllocationStatus,
    /// 本行是否扣减了运行库存
    pub reserved: bool,
    /// 本行决策后的 SKU 剩余库存
    pub stock_after: i64,
    /// 已接单但库存未覆盖（超卖）
    pub oversold: bool,
}

impl AnnotatedRow {
    pub fn order_id(&self) -> &str {
        &self.line.order_id
    }

    pub fn sku(&self) -> &str {
        &self.line.sku
    }

    /// 仍在处理中（未打包、未取消）
    pub fn is_active(&self) -> bool {
        !self.is_packed && !self.line.is_cancelled
    }
}

// ==========================================
// KpiSummary - 看板指标
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub total_items: usize,
    pub total_qty: i64,

    /// 范围内全部订单数
    pub orders_total: usize,
    /// 未打包/未取消的订单数（含已出库）
    pub orders_unique: usize,

    // ===== 行级状态计数 =====
    pub ready: usize,
    pub accepted: usize,
    pub low: usize,
    pub nostock: usize,
    pub notenough: usize,
    pub packed: usize,
    pub cancelled: usize,

    // ===== 订单级可操作汇总（不含已出库）=====
    pub orders_ready: usize,
    pub orders_low: usize,

    pub orders_cancelled: usize,
    pub orders_not_in_sbs: usize,
    pub orders_nosales: usize,

    /// 已接单但未预留库存的行数
    pub accepted_oversold: usize,
}

/// 引擎完整输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub rows: Vec<AnnotatedRow>,
    pub kpis: KpiSummary,
}

// ==========================================
// 报表叠加状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    /// 与分配状态一致
    Allocation(AllocationStatus),
    /// 已扫码出库，报表视为已打包
    ScannedPacked,
    /// 回收站中的订单（不参与分配）
    Deleted,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportStatus::Allocation(s) => write!(f, "{}", s),
            ReportStatus::ScannedPacked => write!(f, "SCANNED_PACKED"),
            ReportStatus::Deleted => write!(f, "DELETED"),
        }
    }
}

/// 报表行 = 分配结果 + 叠加状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(flatten)]
    pub row: AnnotatedRow,
    pub report_status: ReportStatus,
}
