// ==========================================
// 仓库订单履约看板 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::allocation_config::{
    DEFAULT_LOW_STOCK_THRESHOLD, DEFAULT_PACKED_KEYWORDS, DEFAULT_PLATFORM_PRIORITY,
};
use crate::config::allocation_config_trait::{AllocationConfigReader, ConfigResult};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取 JSON 字符串数组；缺失或格式错误时回退默认值
    fn get_string_list_or_default(&self, key: &str, default: &[&str]) -> ConfigResult<Vec<String>> {
        let fallback = || default.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(fallback()),
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(list) => {
                let list: Vec<String> = list
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if list.is_empty() {
                    Ok(fallback())
                } else {
                    Ok(list)
                }
            }
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    "配置格式错误（期望 JSON 字符串数组），使用默认值"
                );
                Ok(fallback())
            }
        }
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 随看板结果一起记录，便于复盘当时的分配参数
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

// ==========================================
// AllocationConfigReader Trait 实现
// ==========================================
#[async_trait]
impl AllocationConfigReader for ConfigManager {
    async fn get_low_stock_threshold(&self) -> ConfigResult<i64> {
        let default = DEFAULT_LOW_STOCK_THRESHOLD.to_string();
        let value = self.get_config_or_default(config_keys::LOW_STOCK_THRESHOLD, &default)?;
        match value.trim().parse::<i64>() {
            Ok(v) if v >= 0 => Ok(v),
            _ => {
                tracing::warn!(
                    config_key = config_keys::LOW_STOCK_THRESHOLD,
                    raw_value = %value,
                    "低库存阈值无效，使用默认值"
                );
                Ok(DEFAULT_LOW_STOCK_THRESHOLD)
            }
        }
    }

    async fn get_platform_priority(&self) -> ConfigResult<Vec<String>> {
        let list = self.get_string_list_or_default(
            config_keys::PLATFORM_PRIORITY,
            &DEFAULT_PLATFORM_PRIORITY,
        )?;
        Ok(list.into_iter().map(|s| s.to_uppercase()).collect())
    }

    async fn get_packed_keywords(&self) -> ConfigResult<Vec<String>> {
        self.get_string_list_or_default(config_keys::PACKED_KEYWORDS, &DEFAULT_PACKED_KEYWORDS)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 分配引擎
    pub const LOW_STOCK_THRESHOLD: &str = "allocation/low_stock_threshold";
    pub const PLATFORM_PRIORITY: &str = "allocation/platform_priority"; // JSON 数组
    pub const PACKED_KEYWORDS: &str = "allocation/packed_keywords"; // JSON 数组
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AllocationConfig;
    use crate::db::init_schema;

    fn setup() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let manager = setup();
        let cfg = manager.load_allocation_config().await.unwrap();
        assert_eq!(cfg, AllocationConfig::default());
    }

    #[tokio::test]
    async fn test_overrides_are_read() {
        let manager = setup();
        manager
            .set_global_config_value(config_keys::LOW_STOCK_THRESHOLD, "5")
            .unwrap();
        manager
            .set_global_config_value(config_keys::PLATFORM_PRIORITY, r#"["lazada","shopee"]"#)
            .unwrap();

        let cfg = manager.load_allocation_config().await.unwrap();
        assert_eq!(cfg.low_stock_threshold, 5);
        assert_eq!(cfg.platform_priority, vec!["LAZADA", "SHOPEE"]);
    }

    #[tokio::test]
    async fn test_invalid_values_fall_back_to_defaults() {
        let manager = setup();
        manager
            .set_global_config_value(config_keys::LOW_STOCK_THRESHOLD, "-1")
            .unwrap();
        manager
            .set_global_config_value(config_keys::PACKED_KEYWORDS, "packed,opened_full")
            .unwrap();

        let cfg = manager.load_allocation_config().await.unwrap();
        assert_eq!(cfg.low_stock_threshold, DEFAULT_LOW_STOCK_THRESHOLD);
        assert_eq!(cfg.packed_keywords.len(), DEFAULT_PACKED_KEYWORDS.len());
    }

    #[test]
    fn test_config_snapshot() {
        let manager = setup();
        manager
            .set_global_config_value(config_keys::LOW_STOCK_THRESHOLD, "4")
            .unwrap();
        let snapshot = manager.get_config_snapshot().unwrap();
        let parsed: BTreeMap<String, String> = serde_json::from_str(&snapshot).unwrap();
        assert_eq!(
            parsed.get(config_keys::LOW_STOCK_THRESHOLD).map(String::as_str),
            Some("4")
        );
    }
}
