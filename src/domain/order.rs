// ==========================================
// 仓库订单履约看板 - 订单与库存实体
// ==========================================
// 对应表: shops / order_lines / products / stocks / sales
//         cancelled_orders / issued_orders / deleted_orders
// ==========================================

use crate::domain::types::{IssueSource, Platform};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Shop - 店铺
// ==========================================
// 唯一键: (platform, name)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub id: i64,
    pub platform: Platform,
    pub name: String,
}

impl Shop {
    /// 清理店铺名称
    ///
    /// - 去除下拉框附带的 " (Shopee)" 等后缀
    /// - 去除 "•" 等装饰符号
    pub fn clean_name(raw: &str) -> String {
        let mut s = raw.trim().to_string();
        if s.ends_with(')') {
            if let Some(pos) = s.rfind(" (") {
                s.truncate(pos);
            }
        }
        s.replace('•', " ").trim().to_string()
    }
}

// ==========================================
// PrintMark - 单类打印追踪
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintMark {
    pub count: i64,
    pub last_at: Option<NaiveDateTime>,
    pub last_by: Option<String>,
}

/// 订单行全部打印追踪
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintTracking {
    pub warehouse: PrintMark,
    pub picking: PrintMark,
    pub low_stock: PrintMark,
    pub no_stock: PrintMark,
    pub not_enough: PrintMark,
}

// ==========================================
// OrderLine - 订单行
// ==========================================
// 一个 (order_id, sku) 一行；导入只插入不覆盖
// 不变式: qty >= 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub shop_id: i64,
    pub order_id: String,
    pub sku: String,
    pub item_name: String,
    pub qty: i64,
    pub order_time: Option<NaiveDateTime>,
    pub logistic_type: String,
    pub import_date: Option<NaiveDate>,

    // 接单
    pub accepted: bool,
    pub accepted_at: Option<NaiveDateTime>,
    pub accepted_by: Option<String>,

    // 打印追踪
    pub printing: PrintTracking,

    // 派车轮次
    pub dispatch_round: Option<i64>,

    // 扫码
    pub scanned_at: Option<NaiveDateTime>,
    pub scanned_by: Option<String>,
}

/// 导入用新订单行
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderLine {
    pub shop_id: i64,
    pub order_id: String,
    pub sku: String,
    pub item_name: String,
    pub qty: i64,
    pub order_time: Option<NaiveDateTime>,
    pub logistic_type: String,
    pub import_date: Option<NaiveDate>,
}

// ==========================================
// Product / Stock
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub sku: String,
    pub brand: String,
    pub model: String,
    /// 若存在则优先于 stocks.qty
    pub stock_qty: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub sku: String,
    pub qty: i64,
}

/// 库存数据源优先级: Product.stock_qty > Stock.qty > 0
pub fn resolve_stock_qty(product_stock_qty: Option<i64>, stock_qty: Option<i64>) -> i64 {
    product_stock_qty.or(stock_qty).unwrap_or(0)
}

// ==========================================
// SalesRecord - 销售单状态
// ==========================================
// 缺少记录 = 订单尚未同步到 SBS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub order_id: String,
    pub po_no: Option<String>,
    pub status: Option<String>,
}

// ==========================================
// 订单级覆盖集合
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelledOrder {
    pub order_id: String,
    pub note: String,
    pub cancelled_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedOrder {
    pub order_id: String,
    pub source: IssueSource,
    /// 首次记录时间，重复标记不覆盖
    pub issued_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedOrder {
    pub order_id: String,
    pub deleted_at: NaiveDateTime,
    pub deleted_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_stock_qty_precedence() {
        assert_eq!(resolve_stock_qty(Some(7), Some(3)), 7);
        assert_eq!(resolve_stock_qty(None, Some(3)), 3);
        assert_eq!(resolve_stock_qty(Some(0), Some(3)), 0);
        assert_eq!(resolve_stock_qty(None, None), 0);
    }

    #[test]
    fn test_clean_shop_name() {
        assert_eq!(Shop::clean_name("Gadget Home (Shopee)"), "Gadget Home");
        assert_eq!(Shop::clean_name(" •Gadget Home "), "Gadget Home");
        assert_eq!(Shop::clean_name("Plain"), "Plain");
    }
}
