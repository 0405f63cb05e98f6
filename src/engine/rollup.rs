// ==========================================
// 仓库订单履约看板 - 订单级汇总判定
// ==========================================
// 职责: 按 order_id 分组后的整单判定（供报表层使用）
// 红线: 纯函数，不访问数据库
// ==========================================

use crate::domain::allocation::{AnnotatedRow, SalesLabel};
use crate::domain::types::AllocationStatus;
use std::collections::{BTreeMap, BTreeSet};

/// 按 order_id 分组（忽略空 order_id）
pub fn group_by_order(rows: &[AnnotatedRow]) -> BTreeMap<&str, Vec<&AnnotatedRow>> {
    let mut grouped: BTreeMap<&str, Vec<&AnnotatedRow>> = BTreeMap::new();
    for row in rows.iter().filter(|r| !r.order_id().is_empty()) {
        grouped.entry(row.order_id()).or_default().push(row);
    }
    grouped
}

/// 整单可接单: 所有行均为 READY_ACCEPT，且没有已接单/已打包的行
pub fn fully_ready_orders(rows: &[AnnotatedRow]) -> BTreeSet<String> {
    collect_orders(rows, |lines| {
        lines.iter().all(|r| {
            r.allocation_status == AllocationStatus::ReadyAccept && !r.line.accepted && !r.is_packed
        })
    })
}

/// 整单低库存可接单:
/// - 没有已打包/已接单的行
/// - 所有行 ∈ {READY_ACCEPT, LOW_STOCK}
/// - 至少一行 LOW_STOCK
pub fn fully_low_stock_orders(rows: &[AnnotatedRow]) -> BTreeSet<String> {
    collect_orders(rows, |lines| {
        let untouched = lines.iter().all(|r| !r.is_packed && !r.line.accepted);
        let all_covered = lines.iter().all(|r| {
            matches!(
                r.allocation_status,
                AllocationStatus::ReadyAccept | AllocationStatus::LowStock
            )
        });
        let any_low = lines
            .iter()
            .any(|r| r.allocation_status == AllocationStatus::LowStock);
        untouched && all_covered && any_low
    })
}

/// 已同步 SBS 但从未开销售单的订单
///
/// 与"尚未同步 SBS"严格区分；已取消订单不计入
pub fn never_opened_sales_orders(rows: &[AnnotatedRow]) -> BTreeSet<String> {
    collect_orders(rows, |lines| {
        lines.iter().all(|r| {
            r.sales_label == SalesLabel::NotOpened && !r.is_not_in_sbs && !r.line.is_cancelled
        })
    })
}

fn collect_orders<F>(rows: &[AnnotatedRow], predicate: F) -> BTreeSet<String>
where
    F: Fn(&[&AnnotatedRow]) -> bool,
{
    group_by_order(rows)
        .into_iter()
        .filter(|(_, lines)| predicate(lines))
        .map(|(order_id, _)| order_id.to_string())
        .collect()
}
