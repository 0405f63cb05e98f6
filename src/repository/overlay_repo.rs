// ==========================================
// 仓库订单履约看板 - 订单级覆盖集合仓储
// ==========================================
// 表: cancelled_orders / issued_orders / deleted_orders
// 约定: 覆盖表缺失 → 空集合 + warn 日志；其他 SQL 错误照常返回
// ==========================================

use crate::db::table_exists;
use crate::domain::order::{CancelledOrder, DeletedOrder, IssuedOrder};
use crate::domain::types::IssueSource;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::time_fmt::{format_ts, parse_ts};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

// ==========================================
// OverlaySource - 覆盖集合读取接口
// ==========================================
pub trait OverlaySource: Send + Sync {
    fn cancelled_order_ids(&self) -> RepositoryResult<HashSet<String>>;
    fn issued_order_ids(&self) -> RepositoryResult<HashSet<String>>;
    fn deleted_order_ids(&self) -> RepositoryResult<HashSet<String>>;
}

/// 一次看板计算使用的覆盖集合快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlaySets {
    pub cancelled: HashSet<String>,
    pub issued: HashSet<String>,
    pub deleted: HashSet<String>,
}

impl OverlaySets {
    pub fn load(source: &dyn OverlaySource) -> RepositoryResult<Self> {
        Ok(Self {
            cancelled: source.cancelled_order_ids()?,
            issued: source.issued_order_ids()?,
            deleted: source.deleted_order_ids()?,
        })
    }
}

// ==========================================
// OverlayRepository
// ==========================================
pub struct OverlayRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OverlayRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 取消 =====

    /// 标记取消；重复取消只更新备注，保留首次取消时间
    pub fn cancel(&self, order_id: &str, note: &str, at: NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO cancelled_orders (order_id, note, cancelled_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(order_id) DO UPDATE SET note = excluded.note
            "#,
            params![order_id, note, format_ts(&at)],
        )?;
        Ok(())
    }

    /// 撤销取消，返回是否存在记录
    pub fn uncancel(&self, order_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let n = conn.execute("DELETE FROM cancelled_orders WHERE order_id = ?1", [order_id])?;
        Ok(n > 0)
    }

    pub fn find_cancelled(&self, order_id: &str) -> RepositoryResult<Option<CancelledOrder>> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                "SELECT order_id, note, cancelled_at FROM cancelled_orders WHERE order_id = ?1",
                [order_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        Ok(found.and_then(|(order_id, note, at)| {
            parse_ts(at).map(|cancelled_at| CancelledOrder {
                order_id,
                note,
                cancelled_at,
            })
        }))
    }

    // ===== 出库交接 =====

    /// 批量标记出库（首次记录生效），返回新增数量
    pub fn issue_many(
        &self,
        order_ids: &[String],
        source: IssueSource,
        at: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let mut added = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO issued_orders (order_id, source, issued_at) VALUES (?1, ?2, ?3)",
            )?;
            let at = format_ts(&at);
            for order_id in order_ids.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
                added += stmt.execute(params![order_id, source.to_db_str(), at])?;
            }
        }
        tx.commit()?;
        Ok(added)
    }

    pub fn find_issued(&self, order_id: &str) -> RepositoryResult<Option<IssuedOrder>> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                "SELECT order_id, source, issued_at FROM issued_orders WHERE order_id = ?1",
                [order_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        Ok(found.and_then(|(order_id, source, at)| {
            parse_ts(at).map(|issued_at| IssuedOrder {
                order_id,
                source: IssueSource::from_db_str(&source),
                issued_at,
            })
        }))
    }

    // ===== 回收站 =====

    /// 软删除，返回是否为新删除
    pub fn mark_deleted(
        &self,
        order_id: &str,
        deleted_by: Option<&str>,
        at: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let n = conn.execute(
            "INSERT OR IGNORE INTO deleted_orders (order_id, deleted_at, deleted_by) VALUES (?1, ?2, ?3)",
            params![order_id, format_ts(&at), deleted_by],
        )?;
        Ok(n > 0)
    }

    pub fn restore(&self, order_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let n = conn.execute("DELETE FROM deleted_orders WHERE order_id = ?1", [order_id])?;
        Ok(n > 0)
    }

    /// 回收站列表（最近删除在前）
    pub fn list_deleted(&self) -> RepositoryResult<Vec<DeletedOrder>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT order_id, deleted_at, deleted_by FROM deleted_orders ORDER BY deleted_at DESC, order_id",
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(raw
            .into_iter()
            .filter_map(|(order_id, at, deleted_by)| {
                parse_ts(at).map(|deleted_at| DeletedOrder {
                    order_id,
                    deleted_at,
                    deleted_by,
                })
            })
            .collect())
    }

    /// 读取单列 order_id 集合；表不存在时返回空集合
    fn read_id_set(&self, table: &'static str) -> RepositoryResult<HashSet<String>> {
        let conn = self.get_conn()?;
        if !table_exists(&conn, table)? {
            tracing::warn!(table, "覆盖表不存在，按空集合处理");
            return Ok(HashSet::new());
        }

        let mut stmt = conn.prepare(&format!("SELECT order_id FROM {}", table))?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(ids)
    }
}

impl OverlaySource for OverlayRepository {
    fn cancelled_order_ids(&self) -> RepositoryResult<HashSet<String>> {
        self.read_id_set("cancelled_orders")
    }

    fn issued_order_ids(&self) -> RepositoryResult<HashSet<String>> {
        self.read_id_set("issued_orders")
    }

    fn deleted_order_ids(&self) -> RepositoryResult<HashSet<String>> {
        self.read_id_set("deleted_orders")
    }
}
