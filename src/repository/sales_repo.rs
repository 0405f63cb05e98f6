// ==========================================
// 仓库订单履约看板 - 销售单状态仓储
// ==========================================
// 表: sales（缺少记录 = 订单尚未同步到 SBS）
// ==========================================

use crate::domain::order::SalesRecord;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct SalesRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SalesRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn upsert(&self, record: &SalesRecord) -> RepositoryResult<()> {
        self.upsert_many(std::slice::from_ref(record)).map(|_| ())
    }

    /// 批量写入，单事务
    pub fn upsert_many(&self, records: &[SalesRecord]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO sales (order_id, po_no, status) VALUES (?1, ?2, ?3)
                ON CONFLICT(order_id) DO UPDATE SET
                    po_no = excluded.po_no,
                    status = excluded.status
                "#,
            )?;
            for r in records.iter().filter(|r| !r.order_id.trim().is_empty()) {
                written += stmt.execute(params![r.order_id.trim(), r.po_no, r.status])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    pub fn find(&self, order_id: &str) -> RepositoryResult<Option<SalesRecord>> {
        let conn = self.get_conn()?;
        let record = conn
            .query_row(
                "SELECT order_id, po_no, status FROM sales WHERE order_id = ?1",
                [order_id],
                |row| {
                    Ok(SalesRecord {
                        order_id: row.get(0)?,
                        po_no: row.get(1)?,
                        status: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }
}
