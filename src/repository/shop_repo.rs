// ==========================================
// 仓库订单履约看板 - 店铺仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::order::Shop;
use crate::domain::types::Platform;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

/// 店铺仓储
/// 职责: 管理 shops 表，按 (platform, name) 去重
pub struct ShopRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShopRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查找或创建店铺（名称先清理）
    pub fn get_or_create(&self, platform: &Platform, raw_name: &str) -> RepositoryResult<Shop> {
        let name = Shop::clean_name(raw_name);
        if name.is_empty() {
            return Err(RepositoryError::FieldValueError {
                field: "shop_name".to_string(),
                message: "店铺名称为空".to_string(),
            });
        }

        let platform = platform.canonical();
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO shops (platform, name) VALUES (?1, ?2)",
            params![platform.display_name(), name],
        )?;
        let id: i64 = conn.query_row(
            "SELECT id FROM shops WHERE platform = ?1 AND name = ?2",
            params![platform.display_name(), name],
            |row| row.get(0),
        )?;

        Ok(Shop {
            id,
            platform,
            name,
        })
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Shop>> {
        let conn = self.get_conn()?;
        let shop = conn
            .query_row(
                "SELECT id, platform, name FROM shops WHERE id = ?1",
                [id],
                map_shop,
            )
            .optional()?;
        Ok(shop)
    }

    /// 全部店铺（按平台、名称排序）
    pub fn list(&self) -> RepositoryResult<Vec<Shop>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id, platform, name FROM shops ORDER BY platform, name")?;
        let shops = stmt
            .query_map([], map_shop)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(shops)
    }
}

fn map_shop(row: &rusqlite::Row) -> rusqlite::Result<Shop> {
    Ok(Shop {
        id: row.get(0)?,
        platform: Platform::normalize(&row.get::<_, String>(1)?),
        name: row.get(2)?,
    })
}
