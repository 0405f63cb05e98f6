// ==========================================
// 仓库订单履约看板 - 分配配置读取 Trait
// ==========================================
// 职责: 定义分配引擎调用方所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::allocation_config::AllocationConfig;
use async_trait::async_trait;
use std::error::Error;

/// 配置读取结果
pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// AllocationConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait AllocationConfigReader: Send + Sync {
    /// 获取低库存阈值
    ///
    /// # 默认值
    /// - 3
    async fn get_low_stock_threshold(&self) -> ConfigResult<i64>;

    /// 获取平台优先级（平台代码，靠前者优先）
    ///
    /// # 默认值
    /// - ["SHOPEE", "TIKTOK", "LAZADA"]
    async fn get_platform_priority(&self) -> ConfigResult<Vec<String>>;

    /// 获取"已打包"关键字列表
    async fn get_packed_keywords(&self) -> ConfigResult<Vec<String>>;

    /// 一次性读取完整分配配置
    async fn load_allocation_config(&self) -> ConfigResult<AllocationConfig> {
        Ok(AllocationConfig {
            low_stock_threshold: self.get_low_stock_threshold().await?,
            platform_priority: self.get_platform_priority().await?,
            packed_keywords: self.get_packed_keywords().await?,
        })
    }
}
