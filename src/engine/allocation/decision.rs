use crate::domain::types::AllocationStatus;

// ==========================================
// 单行决策
// ==========================================
// 优先级（从上到下，命中即返回）:
// 1) 已打包   → PACKED，不动库存
// 2) 已取消   → CANCELLED，不动库存
// 3) 计算临时状态（运行库存 vs 需求量）
// 4) 已接单   → ACCEPTED；库存覆盖时预留
// 5) 已出库   → 临时状态；库存覆盖时预留
// 6) 新订单   → 临时状态；库存覆盖时预留
// ==========================================

/// 订单行的承诺程度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commitment {
    /// 操作员已接单
    Accepted,
    /// 已交接仓库，尚未接单
    Issued,
    /// 未处理
    Fresh,
}

/// 决策所需的行事实
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowFacts {
    pub is_packed: bool,
    pub is_cancelled: bool,
    pub accepted: bool,
    pub is_issued: bool,
    pub qty: i64,
}

impl RowFacts {
    /// 接单优先于出库，出库优先于新订单
    pub fn commitment(&self) -> Commitment {
        if self.accepted {
            Commitment::Accepted
        } else if self.is_issued {
            Commitment::Issued
        } else {
            Commitment::Fresh
        }
    }
}

/// 单行决策结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub status: AllocationStatus,
    /// 是否从运行库存中扣减本行数量
    pub reserve: bool,
    /// 已接单但库存未覆盖
    pub oversold: bool,
}

impl Decision {
    fn frozen(status: AllocationStatus) -> Self {
        Self {
            status,
            reserve: false,
            oversold: false,
        }
    }
}

/// 临时状态：仅由运行库存与需求量决定
///
/// - stock <= 0                  → SHORTAGE
/// - stock < qty                 → NOT_ENOUGH
/// - stock - qty <= threshold    → LOW_STOCK
/// - 其他                        → READY_ACCEPT
pub fn provisional_status(current_stock: i64, qty: i64, low_stock_threshold: i64) -> AllocationStatus {
    if current_stock <= 0 {
        AllocationStatus::Shortage
    } else if current_stock < qty {
        AllocationStatus::NotEnough
    } else if current_stock - qty <= low_stock_threshold {
        AllocationStatus::LowStock
    } else {
        AllocationStatus::ReadyAccept
    }
}

/// 按固定优先级给出单行决策
pub fn decide(facts: &RowFacts, current_stock: i64, low_stock_threshold: i64) -> Decision {
    if facts.is_packed {
        return Decision::frozen(AllocationStatus::Packed);
    }
    if facts.is_cancelled {
        return Decision::frozen(AllocationStatus::Cancelled);
    }

    let provisional = provisional_status(current_stock, facts.qty, low_stock_threshold);
    let reserve = provisional.covers_demand();

    match facts.commitment() {
        // 接单状态不被库存结果覆盖；库存不足时不预留（超卖由 oversold 暴露）
        Commitment::Accepted => Decision {
            status: AllocationStatus::Accepted,
            reserve,
            oversold: !reserve,
        },
        Commitment::Issued | Commitment::Fresh => Decision {
            status: provisional,
            reserve,
            oversold: false,
        },
    }
}
