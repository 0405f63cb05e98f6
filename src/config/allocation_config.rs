// ==========================================
// 仓库订单履约看板 - 分配引擎参数
// ==========================================
// 存储: config_kv 表 (allocation/*)
// ==========================================

use crate::domain::types::Platform;
use serde::{Deserialize, Serialize};

/// 低库存阈值默认值: 本行预留后剩余 <= 3 视为 LOW_STOCK
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 3;

/// 默认平台优先级（靠前者优先占用库存）
pub const DEFAULT_PLATFORM_PRIORITY: [&str; 3] = ["SHOPEE", "TIKTOK", "LAZADA"];

/// 默认"已打包"关键字（大小写不敏感的包含匹配）
pub const DEFAULT_PACKED_KEYWORDS: [&str; 4] = ["ครบตามจำนวน", "packed", "แพ็คแล้ว", "opened_full"];

// ==========================================
// AllocationConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationConfig {
    pub low_stock_threshold: i64,
    /// 平台代码（Platform::code），按优先级从高到低
    pub platform_priority: Vec<String>,
    pub packed_keywords: Vec<String>,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            platform_priority: DEFAULT_PLATFORM_PRIORITY
                .iter()
                .map(|s| s.to_string())
                .collect(),
            packed_keywords: DEFAULT_PACKED_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl AllocationConfig {
    /// 平台排名（越小越优先）
    ///
    /// 未列出的平台并列排在所有已列出平台之后
    pub fn platform_rank(&self, platform: &Platform) -> usize {
        let code = platform.code();
        self.platform_priority
            .iter()
            .position(|p| p.trim().eq_ignore_ascii_case(&code))
            .unwrap_or(self.platform_priority.len())
    }

    /// 销售单状态文本是否表示已打包
    pub fn is_packed_label(&self, label: &str) -> bool {
        let lower = label.to_lowercase();
        self.packed_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .any(|k| !k.is_empty() && lower.contains(&k))
    }
}
