// ==========================================
// 仓库订单履约看板 - 看板过滤条件
// ==========================================
// 职责: 描述调用方的筛选意图；SQL 谓词由仓储层生成
// ==========================================

use crate::domain::types::Platform;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// DashboardMode - 看板模式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DashboardMode {
    /// 待处理: 不按日期过滤，剔除已打包/已取消
    #[default]
    Active,
    /// 全部时间: 不按日期过滤
    AllTime,
    /// 今日导入
    Today,
    /// 按导入日期/下单时间区间
    Range,
}

// ==========================================
// DashboardFilter
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardFilter {
    pub platform: Option<Platform>,
    pub shop_id: Option<i64>,
    pub mode: DashboardMode,

    /// Today 模式下的"今天"（由调用方提供）
    pub today: Option<NaiveDate>,

    // ===== Range 模式 =====
    pub import_from: Option<NaiveDate>,
    pub import_to: Option<NaiveDate>,
    pub import_date: Option<NaiveDate>,
    /// 下单时间 [date_from, date_to)
    pub date_from: Option<NaiveDateTime>,
    pub date_to: Option<NaiveDateTime>,

    // ===== 任意模式: 接单时间 [accepted_from, accepted_to) =====
    pub accepted_from: Option<NaiveDateTime>,
    pub accepted_to: Option<NaiveDateTime>,

    /// 仅限指定 SKU（接单重算时使用）
    pub skus: Option<Vec<String>>,
}

impl DashboardFilter {
    pub fn active() -> Self {
        Self {
            mode: DashboardMode::Active,
            ..Default::default()
        }
    }

    pub fn all_time() -> Self {
        Self {
            mode: DashboardMode::AllTime,
            ..Default::default()
        }
    }

    pub fn today(today: NaiveDate) -> Self {
        Self {
            mode: DashboardMode::Today,
            today: Some(today),
            ..Default::default()
        }
    }

    pub fn range() -> Self {
        Self {
            mode: DashboardMode::Range,
            ..Default::default()
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_shop(mut self, shop_id: i64) -> Self {
        self.shop_id = Some(shop_id);
        self
    }

    pub fn with_skus(mut self, skus: Vec<String>) -> Self {
        self.skus = Some(skus);
        self
    }

    /// 是否剔除已完成工作（已打包/已取消）
    pub fn is_active_only(&self) -> bool {
        self.mode == DashboardMode::Active
    }
}
