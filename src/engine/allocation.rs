// ==========================================
// 仓库订单履约看板 - 库存分配引擎
// ==========================================
// 红线: 纯计算，不读写数据库，不保留跨次运行状态
// 红线: 同一 SKU 的运行库存只减不增
// ==========================================
// 职责: 对每条订单行给出分配状态并预留库存
// 输入: OrderLineSnapshot 列表（调用方已解析库存与覆盖集合）
// 输出: AnnotatedRow 列表 + KpiSummary
// ==========================================

mod core;
mod decision;


pub use core::AllocationEngine;
pub use decision::{decide, provisional_status, Commitment, Decision, RowFacts};
