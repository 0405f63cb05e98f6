// ==========================================
// 仓库订单履约看板 - 报表叠加状态
// ==========================================
// 职责: 在分配结果之上叠加报表层状态（不影响库存计算）
// 规则: 已扫码出库且未打包/未取消的行 → SCANNED_PACKED
// ==========================================

use crate::domain::allocation::{AnnotatedRow, ReportRow, ReportStatus};
use crate::domain::types::AllocationStatus;

/// 计算单行报表状态
pub fn report_status(row: &AnnotatedRow) -> ReportStatus {
    let finished = matches!(
        row.allocation_status,
        AllocationStatus::Packed | AllocationStatus::Cancelled
    );
    if row.line.scanned_at.is_some() && !finished {
        ReportStatus::ScannedPacked
    } else {
        ReportStatus::Allocation(row.allocation_status)
    }
}

/// 为全部行叠加报表状态
pub fn apply_report_overlay(rows: Vec<AnnotatedRow>) -> Vec<ReportRow> {
    rows.into_iter()
        .map(|row| {
            let report_status = report_status(&row);
            ReportRow { row, report_status }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AllocationConfig;
    use crate::domain::allocation::OrderLineSnapshot;
    use crate::domain::types::Platform;
    use crate::engine::AllocationEngine;
    use chrono::NaiveDate;

    #[test]
    fn test_scanned_line_is_reported_packed() {
        let mut scanned = OrderLineSnapshot::new(1, "ORD-1", "SKU-A", Platform::Shopee, 1, 10);
        scanned.scanned_at = NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0);
        let mut cancelled = OrderLineSnapshot::new(2, "ORD-2", "SKU-A", Platform::Shopee, 1, 10);
        cancelled.scanned_at = scanned.scanned_at;
        cancelled.is_cancelled = true;
        let plain = OrderLineSnapshot::new(3, "ORD-3", "SKU-A", Platform::Shopee, 1, 10);

        let outcome = AllocationEngine::new(AllocationConfig::default())
            .allocate(vec![scanned, cancelled, plain], false);
        let report = apply_report_overlay(outcome.rows);

        assert_eq!(report[0].report_status, ReportStatus::ScannedPacked);
        // 扫码不改变分配结果本身
        assert_eq!(report[0].row.allocation_status, AllocationStatus::ReadyAccept);
        assert_eq!(
            report[1].report_status,
            ReportStatus::Allocation(AllocationStatus::Cancelled)
        );
        assert_eq!(
            report[2].report_status,
            ReportStatus::Allocation(AllocationStatus::ReadyAccept)
        );
    }
}
