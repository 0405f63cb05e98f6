// ==========================================
// 仓库订单履约看板 - 应用状态
// ==========================================
// 职责: 组装共享连接、仓储、配置与各 API 实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{DashboardApi, ImportApi, OrderApi, SkuLockRegistry};
use crate::config::config_manager::ConfigManager;
use crate::config::AllocationConfigReader;
use crate::importer::{MasterDataImporter, OrderImporter};
use crate::repository::{
    OrderLineRepository, OverlayRepository, OverlaySource, SalesRepository, ShopRepository,
    StockRepository,
};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "WAREHOUSE_FULFILLMENT_DB_PATH";

/// 应用状态
///
/// 所有仓储共用同一个 SQLite 连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 看板API
    pub dashboard_api: Arc<DashboardApi>,

    /// 订单操作API
    pub order_api: Arc<OrderApi>,

    /// 导入API
    pub import_api: Arc<ImportApi>,

    /// 店铺仓储
    pub shop_repo: Arc<ShopRepository>,

    /// 库存/商品仓储
    pub stock_repo: Arc<StockRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// 打开（必要时创建）数据库并初始化 schema
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = crate::db::open_and_init(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 仓储层
        // ==========================================
        let shop_repo = Arc::new(ShopRepository::from_connection(conn.clone()));
        let stock_repo = Arc::new(StockRepository::from_connection(conn.clone()));
        let sales_repo = Arc::new(SalesRepository::from_connection(conn.clone()));
        let order_line_repo = Arc::new(OrderLineRepository::from_connection(conn.clone()));
        let overlay_repo = Arc::new(OverlayRepository::from_connection(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let config_reader: Arc<dyn AllocationConfigReader> = config_manager.clone();
        let overlay_source: Arc<dyn OverlaySource> = overlay_repo.clone();

        // ==========================================
        // API层
        // ==========================================
        let dashboard_api = Arc::new(DashboardApi::new(
            order_line_repo.clone(),
            overlay_source,
            config_reader.clone(),
        ));

        let order_api = Arc::new(OrderApi::new(
            order_line_repo.clone(),
            overlay_repo,
            config_reader,
            Arc::new(SkuLockRegistry::new()),
        ));

        let import_api = Arc::new(ImportApi::new(
            Arc::new(OrderImporter::new(shop_repo.clone(), order_line_repo)),
            Arc::new(MasterDataImporter::new(stock_repo.clone(), sales_repo)),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            config_manager,
            dashboard_api,
            order_api,
            import_api,
            shop_repo,
            stock_repo,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先读取环境变量 `WAREHOUSE_FULFILLMENT_DB_PATH`，否则使用用户数据目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./warehouse_fulfillment.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("warehouse-fulfillment");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("warehouse_fulfillment.db");
        }
    }

    path.to_string_lossy().to_string()
}
