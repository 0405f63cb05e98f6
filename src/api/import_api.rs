// ==========================================
// 仓库订单履约看板 - 导入 API
// ==========================================
// 职责: 封装 CSV 解析 + 各类导入器，统一错误与耗时日志
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::types::Platform;
use crate::importer::{CsvParser, MasterDataImporter, OrderImportReport, OrderImporter};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// 主数据导入响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportApiResponse {
    pub kind: String,
    pub written: usize,
    /// 导入耗时（毫秒）
    pub elapsed_ms: u128,
}

pub struct ImportApi {
    order_importer: Arc<OrderImporter>,
    master_data_importer: Arc<MasterDataImporter>,
}

impl ImportApi {
    pub fn new(
        order_importer: Arc<OrderImporter>,
        master_data_importer: Arc<MasterDataImporter>,
    ) -> Self {
        Self {
            order_importer,
            master_data_importer,
        }
    }

    /// 导入订单文件
    pub fn import_orders_file(
        &self,
        path: &Path,
        platform: &str,
        fallback_shop: Option<&str>,
        import_date: NaiveDate,
    ) -> ApiResult<OrderImportReport> {
        let start = Instant::now();
        let table = CsvParser.parse_file(path)?;
        let report = self.order_importer.import(
            &table,
            &Platform::normalize(platform),
            fallback_shop,
            import_date,
        )?;

        tracing::info!(
            file = %path.display(),
            added = report.added,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "订单文件导入完成"
        );
        Ok(report)
    }

    pub fn import_stock_file(&self, path: &Path) -> ApiResult<ImportApiResponse> {
        self.run_master("STOCK", path, |t| self.master_data_importer.import_stock(t))
    }

    pub fn import_products_file(&self, path: &Path) -> ApiResult<ImportApiResponse> {
        self.run_master("PRODUCTS", path, |t| self.master_data_importer.import_products(t))
    }

    pub fn import_sales_file(&self, path: &Path) -> ApiResult<ImportApiResponse> {
        self.run_master("SALES", path, |t| self.master_data_importer.import_sales(t))
    }

    fn run_master<F>(&self, kind: &str, path: &Path, import: F) -> ApiResult<ImportApiResponse>
    where
        F: FnOnce(&crate::importer::CsvTable) -> crate::importer::ImportResult<usize>,
    {
        let start = Instant::now();
        let table = CsvParser.parse_file(path)?;
        let written = import(&table)?;
        let elapsed_ms = start.elapsed().as_millis();

        tracing::info!(kind, file = %path.display(), written, elapsed_ms = elapsed_ms as u64, "主数据导入完成");
        Ok(ImportApiResponse {
            kind: kind.to_string(),
            written,
            elapsed_ms,
        })
    }
}
