// ==========================================
// 仓库订单履约看板 - 订单导入器
// ==========================================
// 规则:
// - 只插入不覆盖，去重键 = (店铺, order_id, sku)
// - 同一文件内重复键合并，数量相加
// - 数量缺失/无法解析按 1；合并后为 0 也按 1
// - 店铺取文件列，缺失时使用调用方传入的店铺名；仍为空则跳过并计数
// ==========================================

use crate::domain::order::{NewOrderLine, Shop};
use crate::domain::types::Platform;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{
    self, parse_order_time, parse_qty, require_column, resolve_column,
};
use crate::importer::file_parser::CsvTable;
use crate::repository::{OrderLineRepository, ShopRepository};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// 订单导入结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderImportReport {
    /// 新增订单行
    pub added: usize,
    /// 系统中已存在（未做修改）
    pub skipped_existing: usize,
    /// 无店铺名被跳过
    pub skipped_no_shop: usize,
}

/// 文件内合并后的订单行
#[derive(Debug, Clone, PartialEq)]
struct MergedLine {
    qty: i64,
    item_name: String,
    order_time: Option<NaiveDateTime>,
    logistic_type: String,
}

pub struct OrderImporter {
    shop_repo: Arc<ShopRepository>,
    order_line_repo: Arc<OrderLineRepository>,
}

impl OrderImporter {
    pub fn new(shop_repo: Arc<ShopRepository>, order_line_repo: Arc<OrderLineRepository>) -> Self {
        Self {
            shop_repo,
            order_line_repo,
        }
    }

    /// 导入订单表
    ///
    /// # 参数
    /// - `platform`: 文件所属平台
    /// - `fallback_shop`: 文件无店铺列（或单元格为空）时使用的店铺名
    /// - `import_date`: 写入 order_lines.import_date
    pub fn import(
        &self,
        table: &CsvTable,
        platform: &Platform,
        fallback_shop: Option<&str>,
        import_date: NaiveDate,
    ) -> ImportResult<OrderImportReport> {
        let merged = merge_rows(table, fallback_shop)?;
        if merged.is_empty() {
            return Err(ImportError::EmptyFile("没有有效的订单行".to_string()));
        }

        let mut report = OrderImportReport::default();
        let mut shop_ids: BTreeMap<String, i64> = BTreeMap::new();
        let mut new_lines = Vec::with_capacity(merged.len());

        for ((shop_name, order_id, sku), line) in merged {
            if shop_name.is_empty() {
                report.skipped_no_shop += 1;
                continue;
            }

            let shop_id = match shop_ids.get(&shop_name) {
                Some(id) => *id,
                None => {
                    let shop = self.shop_repo.get_or_create(platform, &shop_name)?;
                    shop_ids.insert(shop_name.clone(), shop.id);
                    shop.id
                }
            };

            new_lines.push(NewOrderLine {
                shop_id,
                order_id,
                sku,
                item_name: line.item_name,
                qty: if line.qty > 0 { line.qty } else { 1 },
                order_time: line.order_time,
                logistic_type: line.logistic_type,
                import_date: Some(import_date),
            });
        }

        let (added, skipped_existing) = self.order_line_repo.insert_many(&new_lines)?;
        report.added = added;
        report.skipped_existing = skipped_existing;

        if report.skipped_no_shop > 0 {
            tracing::warn!(skipped = report.skipped_no_shop, "订单行缺少店铺名，已跳过");
        }
        tracing::info!(
            platform = %platform,
            added = report.added,
            skipped_existing = report.skipped_existing,
            "订单导入完成"
        );
        Ok(report)
    }
}

/// 按 (店铺, order_id, sku) 合并文件内的行（保持稳定顺序）
fn merge_rows(
    table: &CsvTable,
    fallback_shop: Option<&str>,
) -> ImportResult<BTreeMap<(String, String, String), MergedLine>> {
    let order_col = require_column(&table.headers, field_mapper::ORDER_ID, "order_id")?;
    let sku_col = require_column(&table.headers, field_mapper::SKU, "sku")?;
    let shop_col = resolve_column(&table.headers, field_mapper::SHOP);
    let name_col = resolve_column(&table.headers, field_mapper::ITEM_NAME);
    let qty_col = resolve_column(&table.headers, field_mapper::QTY);
    let time_col = resolve_column(&table.headers, field_mapper::ORDER_TIME);
    let logi_col = resolve_column(&table.headers, field_mapper::LOGISTICS);

    let fallback = fallback_shop.map(Shop::clean_name).unwrap_or_default();
    let cell = |row: &std::collections::HashMap<String, String>, col: &Option<String>| -> String {
        col.as_ref()
            .and_then(|c| row.get(c))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    let mut merged: BTreeMap<(String, String, String), MergedLine> = BTreeMap::new();
    for row in &table.rows {
        let order_id = row.get(&order_col).map(|v| v.trim()).unwrap_or_default();
        let sku = row.get(&sku_col).map(|v| v.trim()).unwrap_or_default();
        if order_id.is_empty() || sku.is_empty() {
            continue;
        }

        let shop_name = match Shop::clean_name(&cell(row, &shop_col)) {
            name if name.is_empty() => fallback.clone(),
            name => name,
        };
        let qty = parse_qty(&cell(row, &qty_col)).unwrap_or(1).max(0);
        let item_name = cell(row, &name_col);
        let order_time = parse_order_time(&cell(row, &time_col));
        let logistic_type = cell(row, &logi_col);

        let entry = merged
            .entry((shop_name, order_id.to_string(), sku.to_string()))
            .or_insert_with(|| MergedLine {
                qty: 0,
                item_name: String::new(),
                order_time: None,
                logistic_type: String::new(),
            });
        entry.qty = entry.qty.saturating_add(qty);
        if entry.item_name.is_empty() {
            entry.item_name = item_name;
        }
        if order_time.is_some() {
            entry.order_time = order_time;
        }
        if !logistic_type.is_empty() {
            entry.logistic_type = logistic_type;
        }
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::file_parser::CsvParser;

    fn table(csv: &str) -> CsvTable {
        CsvParser.parse_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_merge_sums_duplicate_keys() {
        let t = table(
            "Order ID,SKU,Qty,Shop\n\
             ORD-1,SKU-A,2,Gadget Home (Shopee)\n\
             ORD-1,SKU-A,3,Gadget Home\n\
             ORD-1,SKU-B,,Gadget Home\n",
        );
        let merged = merge_rows(&t, None).unwrap();

        assert_eq!(merged.len(), 2);
        let a = &merged[&("Gadget Home".to_string(), "ORD-1".to_string(), "SKU-A".to_string())];
        assert_eq!(a.qty, 5);
        let b = &merged[&("Gadget Home".to_string(), "ORD-1".to_string(), "SKU-B".to_string())];
        assert_eq!(b.qty, 1);
    }

    #[test]
    fn test_merge_saturates_huge_quantities() {
        let t = table(
            "Order ID,SKU,Qty,Shop\n\
             ORD-1,SKU-A,1e30,Main\n\
             ORD-1,SKU-A,5,Main\n",
        );
        let merged = merge_rows(&t, None).unwrap();
        let a = &merged[&("Main".to_string(), "ORD-1".to_string(), "SKU-A".to_string())];
        assert_eq!(a.qty, i64::MAX);
    }

    #[test]
    fn test_merge_uses_fallback_shop() {
        let t = table("orderNumber,sellerSku,quantity\nORD-1,SKU-A,1\n");
        let merged = merge_rows(&t, Some("Main Store")).unwrap();
        assert!(merged.contains_key(&(
            "Main Store".to_string(),
            "ORD-1".to_string(),
            "SKU-A".to_string()
        )));
    }

    #[test]
    fn test_merge_requires_order_and_sku_columns() {
        let t = table("Something,Qty\nx,1\n");
        assert!(matches!(
            merge_rows(&t, None),
            Err(ImportError::MissingColumn { .. })
        ));
    }
}
