// ==========================================
// 仓库订单履约看板 - 字段映射器
// ==========================================
// 职责: 源表头 → 标准字段（别名表）+ 单元格类型转换
// 匹配规则: 先精确匹配，再忽略大小写的相等/包含匹配
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

// ==========================================
// 订单文件
// ==========================================
pub const ORDER_ID: &[&str] = &[
    "orderNumber", "Order Number", "order_id", "Order ID", "order_sn", "Order No",
    "เลข Order", "No.", "OrderNo",
];
pub const SKU: &[&str] = &[
    "sellerSku", "Seller SKU", "SKU", "Sku", "Item SKU", "SKU Reference No.", "รหัสสินค้า",
];
pub const ITEM_NAME: &[&str] = &[
    "itemName", "Item Name", "Product Name", "ชื่อสินค้า", "ชื่อรุ่น", "title", "name",
];
pub const QTY: &[&str] = &[
    "quantity", "Quantity", "Qty", "จำนวน", "จำนวนที่สั่ง", "Purchased Qty", "Order Item Qty",
];
pub const ORDER_TIME: &[&str] = &[
    "createdAt", "create_time", "created_time", "Order Time", "OrderDate", "Order Date",
    "วันที่สั่งซื้อ", "Paid Time", "paid_time", "Created Time", "createTime",
];
pub const LOGISTICS: &[&str] = &[
    "logistic_type", "Logistics Service", "Shipping Provider", "ประเภทขนส่ง",
    "Shipment Method", "Delivery Type",
];
pub const SHOP: &[&str] = &["ชื่อร้าน", "Shop", "Shop Name", "Store", "Store Name", "ร้าน", "ร้านค้า"];

// ==========================================
// 库存 / 商品 / 销售单文件
// ==========================================
pub const STOCK_SKU: &[&str] = &[
    "รหัสสินค้า", "SKU", "sku", "รหัส", "รหัส สินค้า", "รหัสสินค้า*", "รหัสสินค้า Sabuy Soft",
    "SKU Reference No.", "รหัส/sku", "รหัสสินค้า/sku",
];
pub const STOCK_QTY: &[&str] = &[
    "คงเหลือ", "Stock", "stock", "Available", "จำนวน", "Qty", "QTY", "STOCK", "ปัจจุบัน",
    "ยอดคงเหลือ", "จำนวนคงเหลือ", "คงเหลือในสต๊อก",
];
pub const PRODUCT_SKU: &[&str] = &["รหัสสินค้า", "SKU", "sku"];
pub const PRODUCT_BRAND: &[&str] = &["Brand", "แบรนด์"];
pub const PRODUCT_MODEL: &[&str] = &["ชื่อสินค้า", "รุ่น", "Model", "Product"];
pub const SALES_ORDER_ID: &[&str] = &["เลข Order", "Order ID", "order_id", "orderNumber", "Order Number"];
pub const SALES_PO: &[&str] = &["เลขที่ PO", "PO", "เอกสาร", "Document No", "เลขที่เอกสาร"];
pub const SALES_STATUS: &[&str] = &["สถานะ", "Status"];

/// 在表头中查找别名对应的列
pub fn resolve_column(headers: &[String], aliases: &[&str]) -> Option<String> {
    // 1) 精确匹配（按别名顺序）
    for alias in aliases {
        if let Some(h) = headers.iter().find(|h| h.as_str() == *alias) {
            return Some(h.clone());
        }
    }

    // 2) 忽略大小写: 相等或包含
    let lowered: Vec<(String, &String)> = headers
        .iter()
        .map(|h| (h.trim().to_lowercase(), h))
        .collect();
    for alias in aliases {
        let key = alias.to_lowercase();
        if let Some((_, original)) = lowered
            .iter()
            .find(|(lower, _)| *lower == key || lower.contains(&key))
        {
            return Some((*original).clone());
        }
    }
    None
}

/// 必需列: 找不到时返回 MissingColumn
pub fn require_column(headers: &[String], aliases: &[&str], field: &str) -> ImportResult<String> {
    resolve_column(headers, aliases).ok_or_else(|| ImportError::MissingColumn {
        field: field.to_string(),
    })
}

/// 解析数量；空值或无法解析返回 None（兼容 "1,200" / "3.0"）
pub fn parse_qty(raw: &str) -> Option<i64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<i64>()
        .ok()
        .or_else(|| cleaned.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];

/// 解析下单时间（多种平台导出格式；纯数字按 Unix 秒处理）
pub fn parse_order_time(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(ts) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    {
        return Some(ts);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
    {
        return d.and_hms_opt(0, 0, 0);
    }
    if s.chars().all(|c| c.is_ascii_digit()) && s.len() >= 9 {
        return s
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.naive_utc());
    }
    None
}
