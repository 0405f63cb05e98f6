// ==========================================
// 仓库订单履约看板 - KPI 汇总
// ==========================================
// 职责: 完全由标注行推导看板指标，不引入新规则
// ==========================================

use crate::domain::allocation::{AnnotatedRow, KpiSummary};
use crate::domain::types::AllocationStatus;
use crate::engine::rollup::{fully_low_stock_orders, fully_ready_orders, never_opened_sales_orders};
use std::collections::HashSet;

/// 汇总 KPI
pub fn summarize(rows: &[AnnotatedRow]) -> KpiSummary {
    let count_status = |status: AllocationStatus| {
        rows.iter()
            .filter(|r| r.allocation_status == status)
            .count()
    };

    let distinct_orders = |pred: &dyn Fn(&AnnotatedRow) -> bool| {
        rows.iter()
            .filter(|r| !r.order_id().is_empty() && pred(r))
            .map(|r| r.order_id())
            .collect::<HashSet<_>>()
            .len()
    };

    // 已出库订单不再计入"可操作"，避免重复交接
    let issued_orders: HashSet<&str> = rows
        .iter()
        .filter(|r| r.line.is_issued)
        .map(|r| r.order_id())
        .collect();

    let orders_ready = fully_ready_orders(rows)
        .iter()
        .filter(|id| !issued_orders.contains(id.as_str()))
        .count();
    let orders_low = fully_low_stock_orders(rows)
        .iter()
        .filter(|id| !issued_orders.contains(id.as_str()))
        .count();

    KpiSummary {
        total_items: rows.len(),
        total_qty: rows.iter().fold(0i64, |acc, r| acc.saturating_add(r.line.qty)),
        orders_total: distinct_orders(&|_| true),
        orders_unique: distinct_orders(&|r| r.is_active()),
        ready: count_status(AllocationStatus::ReadyAccept),
        accepted: count_status(AllocationStatus::Accepted),
        low: count_status(AllocationStatus::LowStock),
        nostock: count_status(AllocationStatus::Shortage),
        notenough: count_status(AllocationStatus::NotEnough),
        packed: count_status(AllocationStatus::Packed),
        cancelled: count_status(AllocationStatus::Cancelled),
        orders_ready,
        orders_low,
        orders_cancelled: distinct_orders(&|r| r.line.is_cancelled),
        orders_not_in_sbs: distinct_orders(&|r| r.is_not_in_sbs),
        orders_nosales: never_opened_sales_orders(rows).len(),
        accepted_oversold: rows.iter().filter(|r| r.oversold).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AllocationConfig;
    use crate::domain::allocation::{OrderLineSnapshot, SalesSnapshot};
    use crate::domain::types::Platform;
    use crate::engine::AllocationEngine;

    #[test]
    fn test_kpi_counts() {
        let ready = OrderLineSnapshot::new(1, "ORD-1", "SKU-A", Platform::Shopee, 1, 20);
        let mut issued = OrderLineSnapshot::new(2, "ORD-2", "SKU-A", Platform::Shopee, 1, 20);
        issued.is_issued = true;
        let mut packed = OrderLineSnapshot::new(3, "ORD-3", "SKU-A", Platform::Shopee, 5, 20);
        packed.sales = SalesSnapshot::Synced {
            status: Some("packed".to_string()),
        };
        let mut cancelled = OrderLineSnapshot::new(4, "ORD-4", "SKU-B", Platform::Lazada, 2, 0);
        cancelled.is_cancelled = true;
        let shortage = OrderLineSnapshot::new(5, "ORD-5", "SKU-B", Platform::Lazada, 2, 0);

        let outcome = AllocationEngine::new(AllocationConfig::default())
            .allocate(vec![ready, issued, packed, cancelled, shortage], false);
        let k = &outcome.kpis;

        assert_eq!(k.total_items, 5);
        assert_eq!(k.total_qty, 11);
        assert_eq!(k.orders_total, 5);
        assert_eq!(k.orders_unique, 3);
        assert_eq!(k.ready, 2);
        assert_eq!(k.packed, 1);
        assert_eq!(k.cancelled, 1);
        assert_eq!(k.nostock, 1);
        // ORD-2 已出库，不算可操作
        assert_eq!(k.orders_ready, 1);
        assert_eq!(k.orders_cancelled, 1);
        assert_eq!(k.orders_not_in_sbs, 4);
        assert_eq!(k.orders_nosales, 0);
        assert_eq!(k.accepted_oversold, 0);
    }

    #[test]
    fn test_kpi_counts_oversold_acceptance() {
        let mut accepted = OrderLineSnapshot::new(1, "ORD-1", "SKU-A", Platform::Shopee, 3, 1);
        accepted.accepted = true;

        let outcome =
            AllocationEngine::new(AllocationConfig::default()).allocate(vec![accepted], true);
        assert_eq!(outcome.kpis.accepted, 1);
        assert_eq!(outcome.kpis.accepted_oversold, 1);
    }
}
