// ==========================================
// 仓库订单履约看板 - 看板 API
// ==========================================
// 职责: 过滤条件 → 拉取快照 → 分配引擎 → 报表叠加状态
// 数据流: DashboardFilter → OrderLineRepository → AllocationEngine → DashboardView
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{AllocationConfig, AllocationConfigReader};
use crate::domain::allocation::{
    AllocationOutcome, KpiSummary, OrderLineSnapshot, ReportRow, ReportStatus, SalesLabel,
};
use crate::domain::filter::DashboardFilter;
use crate::engine::{apply_report_overlay, AllocationEngine};
use crate::repository::{OrderLineRepository, OverlaySets, OverlaySource};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

// ==========================================
// DashboardView - 看板结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardView {
    /// 本次计算的唯一标识（日志关联用）
    pub run_id: String,
    pub generated_at: NaiveDateTime,
    pub filter: DashboardFilter,
    pub rows: Vec<ReportRow>,
    pub kpis: KpiSummary,
}

/// 回收站行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecycleBinRow {
    #[serde(flatten)]
    pub line: OrderLineSnapshot,
    pub sales_label: SalesLabel,
    pub report_status: ReportStatus,
}

// ==========================================
// DashboardApi
// ==========================================
pub struct DashboardApi {
    order_line_repo: Arc<OrderLineRepository>,
    overlay_source: Arc<dyn OverlaySource>,
    config_reader: Arc<dyn AllocationConfigReader>,
}

impl DashboardApi {
    pub fn new(
        order_line_repo: Arc<OrderLineRepository>,
        overlay_source: Arc<dyn OverlaySource>,
        config_reader: Arc<dyn AllocationConfigReader>,
    ) -> Self {
        Self {
            order_line_repo,
            overlay_source,
            config_reader,
        }
    }

    /// 读取当前分配配置
    pub async fn load_config(&self) -> ApiResult<AllocationConfig> {
        self.config_reader
            .load_allocation_config()
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))
    }

    /// 仅运行分配（不叠加报表状态）
    pub async fn run_allocation(&self, filter: &DashboardFilter) -> ApiResult<AllocationOutcome> {
        let config = self.load_config().await?;
        let overlays = OverlaySets::load(self.overlay_source.as_ref())?;
        let lines = self.order_line_repo.fetch_snapshots(filter, &overlays)?;

        Ok(AllocationEngine::new(config).allocate(lines, filter.is_active_only()))
    }

    /// 加载看板
    ///
    /// # 返回
    /// - rows: 与订单行一一对应的报表行（按订单行 id 排序）
    /// - kpis: 由分配结果推导的指标
    #[instrument(skip(self, filter), fields(mode = ?filter.mode))]
    pub async fn load_dashboard(&self, filter: &DashboardFilter) -> ApiResult<DashboardView> {
        let run_id = Uuid::new_v4().to_string();
        let outcome = self.run_allocation(filter).await?;

        tracing::info!(
            run_id = %run_id,
            rows = outcome.rows.len(),
            orders = outcome.kpis.orders_total,
            oversold = outcome.kpis.accepted_oversold,
            "看板计算完成"
        );

        Ok(DashboardView {
            run_id,
            generated_at: chrono::Local::now().naive_local(),
            filter: filter.clone(),
            rows: apply_report_overlay(outcome.rows),
            kpis: outcome.kpis,
        })
    }

    /// 回收站: 已软删除订单的行（不参与分配）
    pub fn list_recycle_bin(&self) -> ApiResult<Vec<RecycleBinRow>> {
        let overlays = OverlaySets::load(self.overlay_source.as_ref())?;
        let lines = self.order_line_repo.fetch_deleted_snapshots(&overlays)?;

        Ok(lines
            .into_iter()
            .map(|line| RecycleBinRow {
                sales_label: SalesLabel::from_snapshot(&line.sales),
                report_status: ReportStatus::Deleted,
                line,
            })
            .collect())
    }
}
