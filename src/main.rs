// ==========================================
// 仓库订单履约看板 - 命令行入口
// ==========================================
// 用法:
//   warehouse-fulfillment [--db PATH] [--mode active|all|today] [--json]
//                         [--import-orders FILE --platform NAME [--shop NAME]]
//                         [--import-stock FILE] [--import-products FILE]
//                         [--import-sales FILE]
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use std::path::PathBuf;
use warehouse_fulfillment::app::{get_default_db_path, AppState};
use warehouse_fulfillment::{logging, DashboardFilter, KpiSummary};

#[derive(Debug, Default)]
struct CliArgs {
    db_path: Option<String>,
    mode: String,
    json: bool,
    import_orders: Option<PathBuf>,
    platform: Option<String>,
    shop: Option<String>,
    import_stock: Option<PathBuf>,
    import_products: Option<PathBuf>,
    import_sales: Option<PathBuf>,
}

fn parse_args() -> Result<CliArgs> {
    let mut parsed = CliArgs {
        mode: "active".to_string(),
        ..Default::default()
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .ok_or_else(|| anyhow!("参数 {} 缺少取值", name))
        };
        match arg.as_str() {
            "--db" => parsed.db_path = Some(value("--db")?),
            "--mode" => parsed.mode = value("--mode")?.to_lowercase(),
            "--json" => parsed.json = true,
            "--import-orders" => parsed.import_orders = Some(value("--import-orders")?.into()),
            "--platform" => parsed.platform = Some(value("--platform")?),
            "--shop" => parsed.shop = Some(value("--shop")?),
            "--import-stock" => parsed.import_stock = Some(value("--import-stock")?.into()),
            "--import-products" => {
                parsed.import_products = Some(value("--import-products")?.into())
            }
            "--import-sales" => parsed.import_sales = Some(value("--import-sales")?.into()),
            other => bail!("未知参数: {}", other),
        }
    }

    if parsed.import_orders.is_some() && parsed.platform.is_none() {
        bail!("--import-orders 需要同时指定 --platform");
    }
    Ok(parsed)
}

fn build_filter(mode: &str) -> Result<DashboardFilter> {
    match mode {
        "active" => Ok(DashboardFilter::active()),
        "all" => Ok(DashboardFilter::all_time()),
        "today" => Ok(DashboardFilter::today(chrono::Local::now().date_naive())),
        other => bail!("未知模式: {}（可选 active|all|today）", other),
    }
}

fn print_kpis(kpis: &KpiSummary) {
    println!("订单行数        {}", kpis.total_items);
    println!("总件数          {}", kpis.total_qty);
    println!("订单数          {}", kpis.orders_total);
    println!("待处理订单数    {}", kpis.orders_unique);
    println!("可接单          {}", kpis.ready);
    println!("已接单          {}", kpis.accepted);
    println!("低库存          {}", kpis.low);
    println!("无库存          {}", kpis.nostock);
    println!("库存不足        {}", kpis.notenough);
    println!("已打包          {}", kpis.packed);
    println!("已取消          {}", kpis.cancelled);
    println!("整单可发        {}", kpis.orders_ready);
    println!("整单低库存      {}", kpis.orders_low);
    println!("已接单超卖行    {}", kpis.accepted_oversold);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;
    logging::init(args.json);

    tracing::info!("{} v{}", warehouse_fulfillment::APP_NAME, warehouse_fulfillment::VERSION);

    let db_path = args.db_path.clone().unwrap_or_else(get_default_db_path);
    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    if let Some(path) = &args.import_stock {
        let resp = state.import_api.import_stock_file(path)?;
        tracing::info!(written = resp.written, "库存已导入");
    }
    if let Some(path) = &args.import_products {
        let resp = state.import_api.import_products_file(path)?;
        tracing::info!(written = resp.written, "商品已导入");
    }
    if let Some(path) = &args.import_sales {
        let resp = state.import_api.import_sales_file(path)?;
        tracing::info!(written = resp.written, "销售单已导入");
    }
    if let (Some(path), Some(platform)) = (&args.import_orders, &args.platform) {
        let report = state.import_api.import_orders_file(
            path,
            platform,
            args.shop.as_deref(),
            chrono::Local::now().date_naive(),
        )?;
        tracing::info!(
            added = report.added,
            skipped_existing = report.skipped_existing,
            skipped_no_shop = report.skipped_no_shop,
            "订单已导入"
        );
    }

    let filter = build_filter(&args.mode)?;
    let view = state
        .dashboard_api
        .load_dashboard(&filter)
        .await
        .context("看板计算失败")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view.kpis)?);
    } else {
        println!("== {} ({}) ==", warehouse_fulfillment::APP_NAME, args.mode);
        print_kpis(&view.kpis);
    }
    Ok(())
}
