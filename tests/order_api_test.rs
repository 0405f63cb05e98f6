// ==========================================
// OrderApi 集成测试
// ==========================================
// 测试范围:
// 1. 接单: 成功 / 库存不足拒绝 / 强制接单超卖 / 撤销
// 2. 业务规则: 未知订单、已取消、已删除
// 3. 并发: 最后一件库存的两次并发接单只有一个成功
// 4. 打印 / 出库交接 / 派车轮次 / 清库
// ==========================================


use futures::future::join_all;
use std::sync::Arc;
use test_helpers::TestEnv;
use warehouse_fulfillment::api::ApiError;
use warehouse_fulfillment::domain::DashboardFilter;
use warehouse_fulfillment::{AllocationStatus, IssueSource, PrintKind};

// ==========================================
// 接单
// ==========================================

#[tokio::test]
async fn test_accept_reserves_stock() {
    let env = TestEnv::new().unwrap();
    env.set_stock("SKU-A", 10);
    env.set_stock("SKU-B", 10);
    env.add_line("Shopee", "Main Store", "ORD-1", "SKU-A", 2, None);
    env.add_line("Shopee", "Main Store", "ORD-1", "SKU-B", 1, None);

    let result = env.order_api.accept_order("ORD-1", "alice", false).await.unwrap();
    assert_eq!(result.lines_accepted, 2);
    assert!(result.forced_shortages.is_empty());

    let lines = env.order_line_repo.find_by_order_id("ORD-1").unwrap();
    assert!(lines.iter().all(|l| l.accepted));
    assert!(lines.iter().all(|l| l.accepted_by.as_deref() == Some("alice")));
    assert!(lines.iter().all(|l| l.accepted_at.is_some()));

    let view = env
        .dashboard_api
        .load_dashboard(&DashboardFilter::active())
        .await
        .unwrap();
    assert_eq!(view.kpis.accepted, 2);
    assert_eq!(view.kpis.accepted_oversold, 0);
    let a = view.rows.iter().find(|r| r.row.sku() == "SKU-A").unwrap();
    assert_eq!(a.row.allocation_status, AllocationStatus::Accepted);
    assert!(a.row.reserved);
    assert_eq!(a.row.stock_after, 8);

    // 重复接单不再改动
    let again = env.order_api.accept_order("ORD-1", "bob", false).await.unwrap();
    assert_eq!(again.lines_accepted, 0);
    let lines = env.order_line_repo.find_by_order_id("ORD-1").unwrap();
    assert!(lines.iter().all(|l| l.accepted_by.as_deref() == Some("alice")));
}

#[tokio::test]
async fn test_accept_rejected_when_stock_short() {
    let env = TestEnv::new().unwrap();
    env.set_stock("SKU-A", 10);
    env.set_stock("SKU-B", 1);
    env.add_line("Shopee", "Main Store", "ORD-1", "SKU-A", 2, None);
    env.add_line("Shopee", "Main Store", "ORD-1", "SKU-B", 3, None);

    let err = env
        .order_api
        .accept_order("ORD-1", "alice", false)
        .await
        .unwrap_err();

    match err {
        ApiError::InsufficientStock { order_id, shortages } => {
            assert_eq!(order_id, "ORD-1");
            assert_eq!(shortages.len(), 1);
            assert_eq!(shortages[0].sku, "SKU-B");
            assert_eq!(shortages[0].status, "NOT_ENOUGH");
            assert_eq!(shortages[0].available, 1);
        }
        other => panic!("期望 InsufficientStock，实际 {:?}", other),
    }

    // 整单不接，部分行也不写入
    let lines = env.order_line_repo.find_by_order_id("ORD-1").unwrap();
    assert!(lines.iter().all(|l| !l.accepted));
}

#[tokio::test]
async fn test_forced_accept_is_surfaced_as_oversold() {
    let env = TestEnv::new().unwrap();
    env.set_stock("SKU-A", 1);
    env.add_line("Shopee", "Main Store", "ORD-1", "SKU-A", 3, None);

    let result = env.order_api.accept_order("ORD-1", "alice", true).await.unwrap();
    assert_eq!(result.lines_accepted, 1);
    assert_eq!(result.forced_shortages.len(), 1);

    let view = env
        .dashboard_api
        .load_dashboard(&DashboardFilter::active())
        .await
        .unwrap();
    let row = &view.rows[0].row;
    assert_eq!(row.allocation_status, AllocationStatus::Accepted);
    assert!(row.oversold);
    assert!(!row.reserved);
    assert_eq!(row.stock_after, 1);
    assert_eq!(view.kpis.accepted_oversold, 1);
}

#[tokio::test]
async fn test_unaccept_releases_stock() {
    let env = TestEnv::new().unwrap();
    env.set_stock("SKU-A", 1);
    env.add_line("Shopee", "Main Store", "ORD-1", "SKU-A", 1, Some("2025-03-01 08:00:00"));
    env.add_line("Shopee", "Main Store", "ORD-2", "SKU-A", 1, Some("2025-03-01 09:00:00"));

    env.order_api.accept_order("ORD-1", "alice", false).await.unwrap();
    assert!(matches!(
        env.order_api.accept_order("ORD-2", "alice", false).await,
        Err(ApiError::InsufficientStock { .. })
    ));

    assert_eq!(env.order_api.unaccept_order("ORD-1").unwrap(), 1);
    let lines = env.order_line_repo.find_by_order_id("ORD-1").unwrap();
    assert!(!lines[0].accepted);
    assert!(lines[0].accepted_at.is_none());
}

// ==========================================
// 业务规则
// ==========================================

#[tokio::test]
async fn test_accept_validation_errors() {
    let env = TestEnv::new().unwrap();
    env.set_stock("SKU-A", 10);
    env.add_line("Shopee", "Main Store", "ORD-CANCEL", "SKU-A", 1, None);
    env.add_line("Shopee", "Main Store", "ORD-DEL", "SKU-A", 1, None);

    assert!(matches!(
        env.order_api.accept_order("  ", "alice", false).await,
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        env.order_api.accept_order("ORD-NOPE", "alice", false).await,
        Err(ApiError::NotFound(_))
    ));

    env.order_api.cancel_order("ORD-CANCEL", "缺货").unwrap();
    assert!(matches!(
        env.order_api.accept_order("ORD-CANCEL", "alice", true).await,
        Err(ApiError::BusinessRuleViolation(_))
    ));

    env.order_api.soft_delete_order("ORD-DEL", "admin").unwrap();
    assert!(matches!(
        env.order_api.accept_order("ORD-DEL", "alice", true).await,
        Err(ApiError::BusinessRuleViolation(_))
    ));

    // 撤销取消后可接单
    assert!(env.order_api.uncancel_order("ORD-CANCEL").unwrap());
    let result = env
        .order_api
        .accept_order("ORD-CANCEL", "alice", false)
        .await
        .unwrap();
    assert_eq!(result.lines_accepted, 1);
}

#[tokio::test]
async fn test_cancel_keeps_original_time_and_updates_note() {
    let env = TestEnv::new().unwrap();
    env.add_line("Shopee", "Main Store", "ORD-1", "SKU-A", 1, None);

    env.order_api.cancel_order("ORD-1", "first").unwrap();
    let first = env.overlay_repo.find_cancelled("ORD-1").unwrap().unwrap();
    env.order_api.cancel_order("ORD-1", "second").unwrap();
    let second = env.overlay_repo.find_cancelled("ORD-1").unwrap().unwrap();

    assert_eq!(second.note, "second");
    assert_eq!(second.cancelled_at, first.cancelled_at);
}

// ==========================================
// 并发
// ==========================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_accepts_for_last_unit() {
    let env = TestEnv::new().unwrap();
    env.set_stock("SKU-A", 1);
    env.add_line("Shopee", "Main Store", "ORD-1", "SKU-A", 1, Some("2025-03-01 08:00:00"));
    env.add_line("Shopee", "Main Store", "ORD-2", "SKU-A", 1, Some("2025-03-01 09:00:00"));

    let api = Arc::clone(&env.order_api);
    let tasks = ["ORD-2", "ORD-1"].into_iter().map(|order_id| {
        let api = Arc::clone(&api);
        tokio::spawn(async move { api.accept_order(order_id, "picker", false).await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1);

    let view = env
        .dashboard_api
        .load_dashboard(&DashboardFilter::active())
        .await
        .unwrap();
    assert_eq!(view.kpis.accepted, 1);
    assert_eq!(view.kpis.accepted_oversold, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_accepts_of_same_order_write_once() {
    let env = TestEnv::new().unwrap();
    env.set_stock("SKU-A", 10);
    env.add_line("Shopee", "Main Store", "ORD-1", "SKU-A", 2, None);

    let tasks = (0..4).map(|i| {
        let api = Arc::clone(&env.order_api);
        tokio::spawn(async move { api.accept_order("ORD-1", &format!("picker{}", i), false).await })
    });
    let accepted: usize = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap().lines_accepted)
        .sum();

    assert_eq!(accepted, 1);
}

// ==========================================
// 打印 / 出库 / 派车 / 清库
// ==========================================

#[tokio::test]
async fn test_warehouse_print_issues_orders() {
    let env = TestEnv::new().unwrap();
    env.set_stock("SKU-A", 10);
    env.add_line("Shopee", "Main Store", "ORD-1", "SKU-A", 1, None);
    env.add_line("Shopee", "Main Store", "ORD-2", "SKU-A", 1, None);

    let ids = vec!["ORD-1".to_string(), " ORD-1 ".to_string()];
    let result = env
        .order_api
        .mark_printed(&ids, PrintKind::Warehouse, "printer")
        .unwrap();
    assert_eq!(result.lines_marked, 1);
    assert_eq!(result.newly_issued, 1);

    let line = &env.order_line_repo.find_by_order_id("ORD-1").unwrap()[0];
    assert_eq!(line.printing.warehouse.count, 1);
    assert_eq!(line.printing.warehouse.last_by.as_deref(), Some("printer"));

    let issued = env.overlay_repo.find_issued("ORD-1").unwrap().unwrap();
    assert_eq!(issued.source, IssueSource::Print);

    // 报表打印不触发出库
    let report = env
        .order_api
        .mark_printed(&["ORD-2".to_string()], PrintKind::LowStock, "printer")
        .unwrap();
    assert_eq!(report.newly_issued, 0);

    // 已出库订单不计入整单可接单
    let view = env
        .dashboard_api
        .load_dashboard(&DashboardFilter::active())
        .await
        .unwrap();
    assert_eq!(view.kpis.orders_ready, 1);

    // 已出库订单重复标记不覆盖首次来源
    let n = env
        .order_api
        .issue_orders(&["ORD-1".to_string(), "ORD-2".to_string()], IssueSource::Manual)
        .unwrap();
    assert_eq!(n, 1);
    let issued = env.overlay_repo.find_issued("ORD-1").unwrap().unwrap();
    assert_eq!(issued.source, IssueSource::Print);

    assert!(matches!(
        env.order_api.mark_printed(&[], PrintKind::Picking, "printer"),
        Err(ApiError::InvalidInput(_))
    ));
}

#[test]
fn test_dispatch_round_and_purge() {
    let env = TestEnv::new().unwrap();
    env.add_line("Shopee", "Main Store", "ORD-1", "SKU-A", 1, None);
    env.add_line("Shopee", "Main Store", "ORD-1", "SKU-B", 1, None);

    assert!(matches!(
        env.order_api.assign_dispatch_round(&["ORD-1".to_string()], 0),
        Err(ApiError::InvalidInput(_))
    ));
    assert_eq!(
        env.order_api
            .assign_dispatch_round(&["ORD-1".to_string()], 2)
            .unwrap(),
        2
    );
    let lines = env.order_line_repo.find_by_order_id("ORD-1").unwrap();
    assert!(lines.iter().all(|l| l.dispatch_round == Some(2)));

    env.order_api.cancel_order("ORD-1", "x").unwrap();
    assert_eq!(env.order_api.purge_all_orders().unwrap(), 2);
    assert!(env.order_line_repo.find_by_order_id("ORD-1").unwrap().is_empty());
    assert!(env.overlay_repo.find_cancelled("ORD-1").unwrap().is_none());
}
