// ==========================================
// 仓库订单履约看板 - 领域类型定义
// ==========================================
// 平台 / 分配状态 / 出库来源 / 打印类型
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 销售平台 (Platform)
// ==========================================
// 数据库存储显示名 (Shopee / TikTok / Lazada / 其他平台统一大写)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    Shopee,
    TikTok,
    Lazada,
    Other(String),
}

impl Platform {
    /// 平台名称归一化（大小写/空格不敏感）
    ///
    /// # 示例
    /// - "shopee" / "SHOPEE" / " Shopee " → Shopee
    /// - "Tik Tok" / "tiktok shop" → TikTok
    /// - "line" / " LINE " → Other("LINE")
    /// - 空字符串 → Other("OTHER")
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        let key: String = trimmed
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        if key.starts_with("shopee") {
            Platform::Shopee
        } else if key.starts_with("tiktok") {
            Platform::TikTok
        } else if key.starts_with("lazada") {
            Platform::Lazada
        } else if trimmed.is_empty() {
            Platform::Other("OTHER".to_string())
        } else {
            Platform::Other(trimmed.to_uppercase())
        }
    }

    /// 归一化后的形式（直接构造的 Other 名称也统一大小写）
    pub fn canonical(&self) -> Self {
        Platform::normalize(self.display_name())
    }

    /// 配置用平台代码（大写）
    pub fn code(&self) -> String {
        match self {
            Platform::Shopee => "SHOPEE".to_string(),
            Platform::TikTok => "TIKTOK".to_string(),
            Platform::Lazada => "LAZADA".to_string(),
            Platform::Other(name) => name.trim().to_uppercase(),
        }
    }

    /// 显示名（与数据库 shops.platform 列一致）
    pub fn display_name(&self) -> &str {
        match self {
            Platform::Shopee => "Shopee",
            Platform::TikTok => "TikTok",
            Platform::Lazada => "Lazada",
            Platform::Other(name) => name.as_str(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl From<String> for Platform {
    fn from(raw: String) -> Self {
        Platform::normalize(&raw)
    }
}

impl From<&str> for Platform {
    fn from(raw: &str) -> Self {
        Platform::normalize(raw)
    }
}

impl From<Platform> for String {
    fn from(platform: Platform) -> Self {
        platform.display_name().to_string()
    }
}

// ==========================================
// 分配状态 (Allocation Status)
// ==========================================
// 每条订单行有且仅有一个分配状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationStatus {
    Packed,      // 已打包 / 已开齐销售单
    Cancelled,   // 已取消
    Shortage,    // 无库存
    NotEnough,   // 库存不足
    LowStock,    // 可接单（余量低）
    ReadyAccept, // 可接单
    Accepted,    // 已接单
}

impl AllocationStatus {
    /// 全部状态（统计/校验用）
    pub const ALL: [AllocationStatus; 7] = [
        AllocationStatus::Packed,
        AllocationStatus::Cancelled,
        AllocationStatus::Shortage,
        AllocationStatus::NotEnough,
        AllocationStatus::LowStock,
        AllocationStatus::ReadyAccept,
        AllocationStatus::Accepted,
    ];

    /// 该状态是否表示"库存覆盖本行需求"（可以预留库存）
    pub fn covers_demand(&self) -> bool {
        matches!(self, AllocationStatus::ReadyAccept | AllocationStatus::LowStock)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationStatus::Packed => "PACKED",
            AllocationStatus::Cancelled => "CANCELLED",
            AllocationStatus::Shortage => "SHORTAGE",
            AllocationStatus::NotEnough => "NOT_ENOUGH",
            AllocationStatus::LowStock => "LOW_STOCK",
            AllocationStatus::ReadyAccept => "READY_ACCEPT",
            AllocationStatus::Accepted => "ACCEPTED",
        }
    }
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 出库来源 (Issue Source)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueSource {
    Manual, // 人工标记
    Import, // 文件导入
    Print,  // 打印单据触发
}

impl IssueSource {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            IssueSource::Manual => "MANUAL",
            IssueSource::Import => "IMPORT",
            IssueSource::Print => "PRINT",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "IMPORT" => IssueSource::Import,
            "PRINT" => IssueSource::Print,
            _ => IssueSource::Manual,
        }
    }
}

impl fmt::Display for IssueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 打印类型 (Print Kind)
// ==========================================
// 每种打印类型在 order_lines 表中对应 count / at / by 三列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrintKind {
    Warehouse, // 仓库单
    Picking,   // 拣货单
    LowStock,  // 低库存报表
    NoStock,   // 无库存报表
    NotEnough, // 库存不足报表
}

impl PrintKind {
    /// 对应列名前缀
    pub fn column_prefix(&self) -> &'static str {
        match self {
            PrintKind::Warehouse => "printed_warehouse",
            PrintKind::Picking => "printed_picking",
            PrintKind::LowStock => "printed_lowstock",
            PrintKind::NoStock => "printed_nostock",
            PrintKind::NotEnough => "printed_notenough",
        }
    }

    /// 打印后是否视为已交接仓库（自动写入 issued_orders）
    pub fn marks_issued(&self) -> bool {
        matches!(self, PrintKind::Warehouse | PrintKind::Picking)
    }
}

impl fmt::Display for PrintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrintKind::Warehouse => write!(f, "WAREHOUSE"),
            PrintKind::Picking => write!(f, "PICKING"),
            PrintKind::LowStock => write!(f, "LOW_STOCK"),
            PrintKind::NoStock => write!(f, "NO_STOCK"),
            PrintKind::NotEnough => write!(f, "NOT_ENOUGH"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_normalize() {
        assert_eq!(Platform::normalize(" shopee "), Platform::Shopee);
        assert_eq!(Platform::normalize("Tik Tok Shop"), Platform::TikTok);
        assert_eq!(Platform::normalize("LAZADA"), Platform::Lazada);
        assert_eq!(
            Platform::normalize("Line MyShop"),
            Platform::Other("LINE MYSHOP".to_string())
        );
        assert_eq!(Platform::normalize("line"), Platform::normalize(" LINE "));
        assert_eq!(Platform::normalize(""), Platform::Other("OTHER".to_string()));
        assert_eq!(
            Platform::Other("line".to_string()).canonical(),
            Platform::Other("LINE".to_string())
        );
    }

    #[test]
    fn test_platform_serde_uses_display_name() {
        let json = serde_json::to_string(&Platform::TikTok).unwrap();
        assert_eq!(json, "\"TikTok\"");
        let back: Platform = serde_json::from_str("\"tiktok\"").unwrap();
        assert_eq!(back, Platform::TikTok);
    }

    #[test]
    fn test_allocation_status_covers_demand() {
        let covering: Vec<_> = AllocationStatus::ALL
            .iter()
            .filter(|s| s.covers_demand())
            .collect();
        assert_eq!(
            covering,
            vec![&AllocationStatus::LowStock, &AllocationStatus::ReadyAccept]
        );
        assert_eq!(AllocationStatus::NotEnough.to_string(), "NOT_ENOUGH");
    }

    #[test]
    fn test_issue_source_roundtrip_from_db() {
        assert_eq!(IssueSource::from_db_str("print"), IssueSource::Print);
        assert_eq!(IssueSource::from_db_str("???"), IssueSource::Manual);
    }
}
