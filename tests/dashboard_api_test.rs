// ==========================================
// DashboardApi 集成测试
// ==========================================
// 测试范围:
// 1. 数据库快照 → 分配引擎: 平台优先级、库存来源优先级、阈值配置
// 2. 看板模式: Active / AllTime / Today / Range
// 3. 订单级覆盖: 取消、删除（回收站）、扫码叠加
// ==========================================


use test_helpers::{date, TestEnv};
use warehouse_fulfillment::api::DashboardView;
use warehouse_fulfillment::config::config_keys;
use warehouse_fulfillment::domain::{DashboardFilter, ReportRow, ReportStatus};
use warehouse_fulfillment::AllocationStatus;

fn row<'a>(view: &'a DashboardView, order_id: &str, sku: &str) -> &'a ReportRow {
    view.rows
        .iter()
        .find(|r| r.row.order_id() == order_id && r.row.sku() == sku)
        .unwrap_or_else(|| panic!("看板中没有 {} / {}", order_id, sku))
}

fn has_order(view: &DashboardView, order_id: &str) -> bool {
    view.rows.iter().any(|r| r.row.order_id() == order_id)
}

// ==========================================
// 分配规则
// ==========================================

#[tokio::test]
async fn test_platform_priority_through_store() {
    let env = TestEnv::new().unwrap();
    env.set_stock("SKU-A", 5);
    // TikTok 行下单更早，但 Shopee 优先
    env.add_line("TikTok", "Gadget Home", "ORD-B", "SKU-A", 4, Some("2025-03-01 08:00:00"));
    env.add_line("Shopee", "Gadget Home", "ORD-A", "SKU-A", 3, Some("2025-03-01 09:00:00"));

    let view = env
        .dashboard_api
        .load_dashboard(&DashboardFilter::active())
        .await
        .unwrap();

    let a = row(&view, "ORD-A", "SKU-A");
    assert_eq!(a.row.allocation_status, AllocationStatus::LowStock);
    assert_eq!(a.row.stock_after, 2);

    let b = row(&view, "ORD-B", "SKU-A");
    assert_eq!(b.row.allocation_status, AllocationStatus::NotEnough);
    assert_eq!(b.row.all_qty, 7);

    assert_eq!(view.kpis.low, 1);
    assert_eq!(view.kpis.notenough, 1);
    assert_eq!(view.kpis.orders_low, 1);
    assert!(!view.run_id.is_empty());
}

#[tokio::test]
async fn test_product_stock_overrides_stock_table() {
    let env = TestEnv::new().unwrap();
    env.set_stock("SKU-A", 0);
    env.set_product_stock("SKU-A", Some(20));
    env.set_stock("SKU-B", 10);
    env.set_product_stock("SKU-B", None);
    env.add_line("Shopee", "Main Store", "ORD-1", "SKU-A", 2, None);
    env.add_line("Shopee", "Main Store", "ORD-1", "SKU-B", 2, None);
    env.add_line("Shopee", "Main Store", "ORD-1", "SKU-C", 1, None);

    let view = env
        .dashboard_api
        .load_dashboard(&DashboardFilter::active())
        .await
        .unwrap();

    // 商品 stock_qty 优先，缺失时取 stocks 表，再缺失按 0
    assert_eq!(row(&view, "ORD-1", "SKU-A").row.line.stock_qty, 20);
    assert_eq!(row(&view, "ORD-1", "SKU-B").row.line.stock_qty, 10);
    assert_eq!(row(&view, "ORD-1", "SKU-C").row.line.stock_qty, 0);
    assert_eq!(
        row(&view, "ORD-1", "SKU-C").row.allocation_status,
        AllocationStatus::Shortage
    );
}

#[tokio::test]
async fn test_configured_threshold_is_applied() {
    let env = TestEnv::new().unwrap();
    env.set_stock("SKU-A", 5);
    env.add_line("Shopee", "Main Store", "ORD-1", "SKU-A", 3, None);

    let view = env
        .dashboard_api
        .load_dashboard(&DashboardFilter::active())
        .await
        .unwrap();
    assert_eq!(
        row(&view, "ORD-1", "SKU-A").row.allocation_status,
        AllocationStatus::LowStock
    );

    env.config_manager
        .set_global_config_value(config_keys::LOW_STOCK_THRESHOLD, "1")
        .unwrap();
    let view = env
        .dashboard_api
        .load_dashboard(&DashboardFilter::active())
        .await
        .unwrap();
    assert_eq!(
        row(&view, "ORD-1", "SKU-A").row.allocation_status,
        AllocationStatus::ReadyAccept
    );
}

// ==========================================
// 看板模式
// ==========================================

#[tokio::test]
async fn test_active_mode_drops_packed_and_cancelled() {
    let env = TestEnv::new().unwrap();
    env.set_stock("SKU-A", 10);
    env.add_line("Shopee", "Main Store", "ORD-PACKED", "SKU-A", 2, None);
    env.add_line("Shopee", "Main Store", "ORD-CANCEL", "SKU-A", 2, None);
    env.add_line("Shopee", "Main Store", "ORD-OPEN", "SKU-A", 2, None);
    env.set_sales("ORD-PACKED", Some("Packed"));
    env.order_api.cancel_order("ORD-CANCEL", "客户取消").unwrap();

    let active = env
        .dashboard_api
        .load_dashboard(&DashboardFilter::active())
        .await
        .unwrap();
    assert_eq!(active.rows.len(), 1);
    assert!(has_order(&active, "ORD-OPEN"));

    let all = env
        .dashboard_api
        .load_dashboard(&DashboardFilter::all_time())
        .await
        .unwrap();
    assert_eq!(all.rows.len(), 3);
    assert_eq!(
        row(&all, "ORD-PACKED", "SKU-A").row.allocation_status,
        AllocationStatus::Packed
    );
    assert_eq!(
        row(&all, "ORD-CANCEL", "SKU-A").row.allocation_status,
        AllocationStatus::Cancelled
    );
    // 已打包 / 已取消行不扣库存
    assert_eq!(row(&all, "ORD-OPEN", "SKU-A").row.stock_after, 8);
    assert_eq!(all.kpis.orders_total, 3);
    assert_eq!(all.kpis.orders_unique, 1);
    assert_eq!(all.kpis.orders_cancelled, 1);
}

#[tokio::test]
async fn test_today_mode_filters_by_import_date() {
    let env = TestEnv::new().unwrap();
    env.add_line_on("2025-03-01", "ORD-OLD", "SKU-A", 1);
    env.add_line_on("2025-03-02", "ORD-NEW", "SKU-A", 1);

    let view = env
        .dashboard_api
        .load_dashboard(&DashboardFilter::today(date("2025-03-02")))
        .await
        .unwrap();

    assert_eq!(view.rows.len(), 1);
    assert!(has_order(&view, "ORD-NEW"));
}

#[tokio::test]
async fn test_range_mode_import_window_and_order_time() {
    let env = TestEnv::new().unwrap();
    env.add_line_on("2025-03-01", "ORD-1", "SKU-A", 1);
    env.add_line_on("2025-03-05", "ORD-2", "SKU-A", 1);
    env.add_line_on("2025-03-09", "ORD-3", "SKU-A", 1);

    let mut filter = DashboardFilter::range();
    filter.import_from = Some(date("2025-03-02"));
    filter.import_to = Some(date("2025-03-09"));
    let view = env.dashboard_api.load_dashboard(&filter).await.unwrap();
    assert!(!has_order(&view, "ORD-1"));
    assert!(has_order(&view, "ORD-2"));
    assert!(has_order(&view, "ORD-3"));

    let env = TestEnv::new().unwrap();
    env.add_line("Shopee", "Main Store", "ORD-EARLY", "SKU-A", 1, Some("2025-03-01 10:00:00"));
    env.add_line("Shopee", "Main Store", "ORD-EDGE", "SKU-A", 1, Some("2025-03-02 00:00:00"));
    env.add_line("Shopee", "Main Store", "ORD-NOTIME", "SKU-A", 1, None);

    let mut filter = DashboardFilter::range();
    filter.date_from = Some(test_helpers::ts("2025-03-01 00:00:00"));
    filter.date_to = Some(test_helpers::ts("2025-03-02 00:00:00"));
    let view = env.dashboard_api.load_dashboard(&filter).await.unwrap();
    // 上界开区间，无下单时间的行不满足区间
    assert_eq!(view.rows.len(), 1);
    assert!(has_order(&view, "ORD-EARLY"));
}

#[tokio::test]
async fn test_platform_and_shop_filters() {
    let env = TestEnv::new().unwrap();
    env.add_line("Shopee", "Store One", "ORD-1", "SKU-A", 1, None);
    env.add_line("Lazada", "Store Two", "ORD-2", "SKU-A", 1, None);

    let view = env
        .dashboard_api
        .load_dashboard(
            &DashboardFilter::active().with_platform(warehouse_fulfillment::Platform::Lazada),
        )
        .await
        .unwrap();
    assert_eq!(view.rows.len(), 1);
    assert!(has_order(&view, "ORD-2"));

    let shop = env
        .shop_repo
        .list()
        .unwrap()
        .into_iter()
        .find(|s| s.name == "Store One")
        .unwrap();
    let view = env
        .dashboard_api
        .load_dashboard(&DashboardFilter::active().with_shop(shop.id))
        .await
        .unwrap();
    assert_eq!(view.rows.len(), 1);
    assert!(has_order(&view, "ORD-1"));
}

// ==========================================
// 覆盖集合
// ==========================================

#[tokio::test]
async fn test_deleted_orders_excluded_and_listed_in_recycle_bin() {
    let env = TestEnv::new().unwrap();
    env.set_stock("SKU-A", 2);
    env.add_line("Shopee", "Main Store", "ORD-DEL", "SKU-A", 2, Some("2025-03-01 08:00:00"));
    env.add_line("Shopee", "Main Store", "ORD-KEEP", "SKU-A", 2, Some("2025-03-01 09:00:00"));

    let before = env
        .dashboard_api
        .load_dashboard(&DashboardFilter::all_time())
        .await
        .unwrap();
    assert_eq!(
        row(&before, "ORD-KEEP", "SKU-A").row.allocation_status,
        AllocationStatus::Shortage
    );

    assert!(env.order_api.soft_delete_order("ORD-DEL", "admin").unwrap());

    let after = env
        .dashboard_api
        .load_dashboard(&DashboardFilter::all_time())
        .await
        .unwrap();
    assert!(!has_order(&after, "ORD-DEL"));
    // 删除的订单不再占用库存
    assert_eq!(
        row(&after, "ORD-KEEP", "SKU-A").row.allocation_status,
        AllocationStatus::LowStock
    );

    let bin = env.dashboard_api.list_recycle_bin().unwrap();
    assert_eq!(bin.len(), 1);
    assert_eq!(bin[0].line.order_id, "ORD-DEL");
    assert_eq!(bin[0].report_status, ReportStatus::Deleted);

    assert!(env.order_api.restore_order("ORD-DEL").unwrap());
    assert!(env.dashboard_api.list_recycle_bin().unwrap().is_empty());
}

#[tokio::test]
async fn test_scanned_line_reported_as_scanned_packed() {
    let env = TestEnv::new().unwrap();
    env.set_stock("SKU-A", 10);
    env.add_line("Shopee", "Main Store", "ORD-1", "SKU-A", 1, None);
    env.add_line("Shopee", "Main Store", "ORD-2", "SKU-A", 1, None);
    env.order_api.record_scan("ORD-1", "packer01").unwrap();

    let view = env
        .dashboard_api
        .load_dashboard(&DashboardFilter::active())
        .await
        .unwrap();

    let scanned = row(&view, "ORD-1", "SKU-A");
    assert_eq!(scanned.report_status, ReportStatus::ScannedPacked);
    assert_eq!(scanned.row.allocation_status, AllocationStatus::ReadyAccept);
    assert_eq!(scanned.row.line.scanned_by.as_deref(), Some("packer01"));
    assert_eq!(
        row(&view, "ORD-2", "SKU-A").report_status,
        ReportStatus::Allocation(AllocationStatus::ReadyAccept)
    );
}

#[tokio::test]
async fn test_sales_labels_feed_order_kpis() {
    let env = TestEnv::new().unwrap();
    env.set_stock("SKU-A", 10);
    env.add_line("Shopee", "Main Store", "ORD-NOSALES", "SKU-A", 1, None);
    env.add_line("Shopee", "Main Store", "ORD-UNOPENED", "SKU-A", 1, None);
    env.add_line("Shopee", "Main Store", "ORD-OPENED", "SKU-A", 1, None);
    env.set_sales("ORD-UNOPENED", None);
    env.set_sales("ORD-OPENED", Some("opened_partial"));

    let view = env
        .dashboard_api
        .load_dashboard(&DashboardFilter::active())
        .await
        .unwrap();

    assert!(row(&view, "ORD-NOSALES", "SKU-A").row.is_not_in_sbs);
    assert_eq!(view.kpis.orders_not_in_sbs, 1);
    assert_eq!(view.kpis.orders_nosales, 1);
    assert_eq!(view.kpis.orders_ready, 3);
}
