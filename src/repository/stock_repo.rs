// ==========================================
// 仓库订单履约看板 - 商品与库存仓储
// ==========================================
// 表: products / stocks
// 库存解析: products.stock_qty > stocks.qty > 0
// ==========================================

use crate::domain::order::{resolve_stock_qty, Product};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::sync::{Arc, Mutex};

pub struct StockRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StockRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入单个 SKU 库存（同步已存在商品的 stock_qty）
    pub fn upsert_stock(&self, sku: &str, qty: i64) -> RepositoryResult<()> {
        self.upsert_stocks(&[(sku.to_string(), qty)]).map(|_| ())
    }

    /// 批量写入库存，单事务；返回写入条数
    pub fn upsert_stocks(&self, entries: &[(String, i64)]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let written = write_stocks(&tx, entries)?;
        tx.commit()?;
        Ok(written)
    }

    /// 写入商品主数据
    ///
    /// stock_qty 为 None 时保留原值
    pub fn upsert_product(&self, product: &Product) -> RepositoryResult<()> {
        self.upsert_products(std::slice::from_ref(product)).map(|_| ())
    }

    pub fn upsert_products(&self, products: &[Product]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO products (sku, brand, model, stock_qty)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(sku) DO UPDATE SET
                    brand = excluded.brand,
                    model = excluded.model,
                    stock_qty = COALESCE(excluded.stock_qty, products.stock_qty)
                "#,
            )?;
            for p in products.iter().filter(|p| !p.sku.trim().is_empty()) {
                written += stmt.execute(params![p.sku.trim(), p.brand, p.model, p.stock_qty])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    pub fn find_product(&self, sku: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        let product = conn
            .query_row(
                "SELECT sku, brand, model, stock_qty FROM products WHERE sku = ?1",
                [sku],
                |row| {
                    Ok(Product {
                        sku: row.get(0)?,
                        brand: row.get(1)?,
                        model: row.get(2)?,
                        stock_qty: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(product)
    }

    /// 按解析规则得到 SKU 起始库存
    pub fn resolved_stock_qty(&self, sku: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let product_qty: Option<i64> = conn
            .query_row("SELECT stock_qty FROM products WHERE sku = ?1", [sku], |row| {
                row.get(0)
            })
            .optional()?
            .flatten();
        let stock_qty: Option<i64> = conn
            .query_row("SELECT qty FROM stocks WHERE sku = ?1", [sku], |row| row.get(0))
            .optional()?;
        Ok(resolve_stock_qty(product_qty, stock_qty))
    }
}

fn write_stocks(tx: &Transaction, entries: &[(String, i64)]) -> RepositoryResult<usize> {
    let mut upsert = tx.prepare(
        "INSERT INTO stocks (sku, qty) VALUES (?1, ?2) ON CONFLICT(sku) DO UPDATE SET qty = excluded.qty",
    )?;
    let mut sync_product = tx.prepare("UPDATE products SET stock_qty = ?2 WHERE sku = ?1")?;

    let mut written = 0;
    for (sku, qty) in entries {
        let sku = sku.trim();
        if sku.is_empty() {
            continue;
        }
        written += upsert.execute(params![sku, qty])?;
        sync_product.execute(params![sku, qty])?;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn repo() -> StockRepository {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        StockRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn product(sku: &str, stock_qty: Option<i64>) -> Product {
        Product {
            sku: sku.to_string(),
            brand: "ACME".to_string(),
            model: "M1".to_string(),
            stock_qty,
        }
    }

    #[test]
    fn test_product_stock_overrides_stock_table() {
        let repo = repo();
        repo.upsert_stock("SKU-A", 4).unwrap();
        assert_eq!(repo.resolved_stock_qty("SKU-A").unwrap(), 4);

        repo.upsert_product(&product("SKU-A", Some(9))).unwrap();
        assert_eq!(repo.resolved_stock_qty("SKU-A").unwrap(), 9);

        assert_eq!(repo.resolved_stock_qty("UNKNOWN").unwrap(), 0);
    }

    #[test]
    fn test_stock_upsert_syncs_existing_product() {
        let repo = repo();
        repo.upsert_product(&product("SKU-A", Some(9))).unwrap();
        repo.upsert_stock("SKU-A", 2).unwrap();

        assert_eq!(repo.find_product("SKU-A").unwrap().unwrap().stock_qty, Some(2));
        assert_eq!(repo.resolved_stock_qty("SKU-A").unwrap(), 2);
    }

    #[test]
    fn test_product_upsert_keeps_stock_when_absent() {
        let repo = repo();
        repo.upsert_product(&product("SKU-A", Some(5))).unwrap();
        let mut renamed = product("SKU-A", None);
        renamed.brand = "Other".to_string();
        repo.upsert_product(&renamed).unwrap();

        let p = repo.find_product("SKU-A").unwrap().unwrap();
        assert_eq!(p.brand, "Other");
        assert_eq!(p.stock_qty, Some(5));
    }
}
