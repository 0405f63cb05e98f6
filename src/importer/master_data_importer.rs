// ==========================================
// 仓库订单履约看板 - 库存 / 商品 / 销售单导入器
// ==========================================
// 库存: 重复 SKU 数量相加，数量无法解析按 0，写入时同步商品 stock_qty
// 商品: sku + 品牌 + 型号（不覆盖已有 stock_qty）
// 销售单: 按 order_id 覆盖写入
// ==========================================

use crate::domain::order::{Product, SalesRecord};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{self, parse_qty, require_column, resolve_column};
use crate::importer::file_parser::CsvTable;
use crate::repository::{SalesRepository, StockRepository};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub struct MasterDataImporter {
    stock_repo: Arc<StockRepository>,
    sales_repo: Arc<SalesRepository>,
}

fn cell(row: &HashMap<String, String>, col: Option<&String>) -> String {
    col.and_then(|c| row.get(c))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

impl MasterDataImporter {
    pub fn new(stock_repo: Arc<StockRepository>, sales_repo: Arc<SalesRepository>) -> Self {
        Self {
            stock_repo,
            sales_repo,
        }
    }

    /// 导入库存，返回写入的 SKU 数
    pub fn import_stock(&self, table: &CsvTable) -> ImportResult<usize> {
        let sku_col = require_column(&table.headers, field_mapper::STOCK_SKU, "sku")?;
        let qty_col = require_column(&table.headers, field_mapper::STOCK_QTY, "qty")?;

        let mut totals: BTreeMap<String, i64> = BTreeMap::new();
        for row in &table.rows {
            let sku = cell(row, Some(&sku_col));
            if sku.is_empty() {
                continue;
            }
            let qty = parse_qty(&cell(row, Some(&qty_col))).unwrap_or(0);
            let total = totals.entry(sku).or_insert(0);
            *total = total.saturating_add(qty);
        }

        let entries: Vec<(String, i64)> = totals.into_iter().collect();
        let written = self.stock_repo.upsert_stocks(&entries)?;
        tracing::info!(skus = written, "库存导入完成");
        Ok(written)
    }

    /// 导入商品主数据，返回写入条数
    pub fn import_products(&self, table: &CsvTable) -> ImportResult<usize> {
        let sku_col = require_column(&table.headers, field_mapper::PRODUCT_SKU, "sku")?;
        let brand_col = resolve_column(&table.headers, field_mapper::PRODUCT_BRAND);
        let model_col = resolve_column(&table.headers, field_mapper::PRODUCT_MODEL);

        let mut products: BTreeMap<String, Product> = BTreeMap::new();
        for row in &table.rows {
            let sku = cell(row, Some(&sku_col));
            if sku.is_empty() {
                continue;
            }
            products.insert(
                sku.clone(),
                Product {
                    sku,
                    brand: cell(row, brand_col.as_ref()),
                    model: cell(row, model_col.as_ref()),
                    stock_qty: None,
                },
            );
        }

        let list: Vec<Product> = products.into_values().collect();
        let written = self.stock_repo.upsert_products(&list)?;
        tracing::info!(products = written, "商品导入完成");
        Ok(written)
    }

    /// 导入销售单状态，返回写入条数
    pub fn import_sales(&self, table: &CsvTable) -> ImportResult<usize> {
        let order_col = require_column(&table.headers, field_mapper::SALES_ORDER_ID, "order_id")?;
        let po_col = resolve_column(&table.headers, field_mapper::SALES_PO);
        let status_col = resolve_column(&table.headers, field_mapper::SALES_STATUS);

        let records: Vec<SalesRecord> = table
            .rows
            .iter()
            .filter_map(|row| {
                let order_id = cell(row, Some(&order_col));
                if order_id.is_empty() {
                    return None;
                }
                let optional = |col: Option<&String>| col.map(|_| cell(row, col));
                Some(SalesRecord {
                    order_id,
                    po_no: optional(po_col.as_ref()),
                    status: optional(status_col.as_ref()),
                })
            })
            .collect();

        if records.is_empty() && !table.is_empty() {
            return Err(ImportError::EmptyFile("没有有效的销售单行".to_string()));
        }

        let written = self.sales_repo.upsert_many(&records)?;
        tracing::info!(records = written, "销售单导入完成");
        Ok(written)
    }
}
