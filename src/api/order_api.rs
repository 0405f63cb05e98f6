// ==========================================
// 仓库订单履约看板 - 订单操作 API
// ==========================================
// 职责: 接单 / 取消 / 出库交接 / 回收站 / 打印 / 派车轮次 / 扫码
// 并发: 接单周期按 SKU 串行（SkuLockRegistry）
// ==========================================

use crate::api::error::{ApiError, ApiResult, StockShortage};
use crate::api::sku_lock::SkuLockRegistry;
use crate::config::AllocationConfigReader;
use crate::domain::allocation::OrderLineSnapshot;
use crate::domain::filter::DashboardFilter;
use crate::domain::order::OrderLine;
use crate::domain::types::{IssueSource, PrintKind};
use crate::engine::AllocationEngine;
use crate::repository::{OrderLineRepository, OverlayRepository, OverlaySets, OverlaySource};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::instrument;

/// 接单结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptResult {
    pub order_id: String,
    /// 本次新标记为已接单的行数
    pub lines_accepted: usize,
    /// 强制接单时的超卖明细（非强制时恒为空）
    pub forced_shortages: Vec<StockShortage>,
}

/// 打印结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintResult {
    pub lines_marked: usize,
    pub newly_issued: usize,
}

// ==========================================
// OrderApi
// ==========================================
pub struct OrderApi {
    order_line_repo: Arc<OrderLineRepository>,
    overlay_repo: Arc<OverlayRepository>,
    config_reader: Arc<dyn AllocationConfigReader>,
    sku_locks: Arc<SkuLockRegistry>,
}

impl OrderApi {
    pub fn new(
        order_line_repo: Arc<OrderLineRepository>,
        overlay_repo: Arc<OverlayRepository>,
        config_reader: Arc<dyn AllocationConfigReader>,
        sku_locks: Arc<SkuLockRegistry>,
    ) -> Self {
        Self {
            order_line_repo,
            overlay_repo,
            config_reader,
            sku_locks,
        }
    }

    fn now() -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    /// 读取订单全部行；不存在时返回 NotFound
    fn require_order(&self, order_id: &str) -> ApiResult<Vec<OrderLine>> {
        let order_id = validate_order_id(order_id)?;
        let lines = self.order_line_repo.find_by_order_id(order_id)?;
        if lines.is_empty() {
            return Err(ApiError::NotFound(format!("订单(order_id={})不存在", order_id)));
        }
        Ok(lines)
    }

    // ==========================================
    // 接单
    // ==========================================

    /// 接单
    ///
    /// # 规则
    /// - 已取消 / 已删除的订单不可接单
    /// - 本单任一未接单行不是 READY_ACCEPT / LOW_STOCK → InsufficientStock
    /// - force = true 时跳过库存校验，超卖明细写入返回值
    #[instrument(skip(self, accepted_by))]
    pub async fn accept_order(
        &self,
        order_id: &str,
        accepted_by: &str,
        force: bool,
    ) -> ApiResult<AcceptResult> {
        let lines = self.require_order(order_id)?;
        let order_id = order_id.trim();

        if self.overlay_repo.find_cancelled(order_id)?.is_some() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "订单已取消，不可接单: {}",
                order_id
            )));
        }
        if self.overlay_repo.deleted_order_ids()?.contains(order_id) {
            return Err(ApiError::BusinessRuleViolation(format!(
                "订单已删除，不可接单: {}",
                order_id
            )));
        }
        if lines.iter().all(|l| l.accepted) {
            return Ok(AcceptResult {
                order_id: order_id.to_string(),
                lines_accepted: 0,
                forced_shortages: Vec::new(),
            });
        }

        // 配置在加锁前读取，缩短持锁时间
        let config = self
            .config_reader
            .load_allocation_config()
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        let skus: BTreeSet<String> = lines.iter().map(|l| l.sku.clone()).collect();
        let _locks = self.sku_locks.acquire(&skus).await;

        // === 持锁: 重新读取竞争行 → 重算 → 写入 ===
        let overlays = OverlaySets::load(self.overlay_repo.as_ref())?;
        let filter = DashboardFilter::active().with_skus(skus.into_iter().collect());
        let snapshot = self.order_line_repo.fetch_snapshots(&filter, &overlays)?;

        let engine = AllocationEngine::new(config);
        let shortages = find_acceptance_shortages(&engine, snapshot, order_id);

        if !shortages.is_empty() && !force {
            tracing::info!(shortages = shortages.len(), "库存不足，拒绝接单");
            return Err(ApiError::InsufficientStock {
                order_id: order_id.to_string(),
                shortages,
            });
        }

        let n = self
            .order_line_repo
            .set_accepted(order_id, accepted_by, Self::now())?;

        if shortages.is_empty() {
            tracing::info!(lines = n, accepted_by, "接单成功");
        } else {
            tracing::warn!(lines = n, accepted_by, shortages = shortages.len(), "强制接单（超卖）");
        }

        Ok(AcceptResult {
            order_id: order_id.to_string(),
            lines_accepted: n,
            forced_shortages: shortages,
        })
    }

    /// 撤销接单
    pub fn unaccept_order(&self, order_id: &str) -> ApiResult<usize> {
        self.require_order(order_id)?;
        let n = self.order_line_repo.clear_accepted(order_id.trim())?;
        tracing::info!(order_id, lines = n, "撤销接单");
        Ok(n)
    }

    // ==========================================
    // 取消
    // ==========================================

    pub fn cancel_order(&self, order_id: &str, note: &str) -> ApiResult<()> {
        self.require_order(order_id)?;
        self.overlay_repo
            .cancel(order_id.trim(), note.trim(), Self::now())?;
        tracing::info!(order_id, note, "订单已取消");
        Ok(())
    }

    pub fn uncancel_order(&self, order_id: &str) -> ApiResult<bool> {
        let order_id = validate_order_id(order_id)?;
        let removed = self.overlay_repo.uncancel(order_id)?;
        tracing::info!(order_id, removed, "撤销取消");
        Ok(removed)
    }

    // ==========================================
    // 出库交接
    // ==========================================

    /// 批量标记出库，返回新标记数量（已出库的订单保留首次记录）
    pub fn issue_orders(&self, order_ids: &[String], source: IssueSource) -> ApiResult<usize> {
        let n = self.overlay_repo.issue_many(order_ids, source, Self::now())?;
        tracing::info!(requested = order_ids.len(), newly_issued = n, %source, "出库交接");
        Ok(n)
    }

    // ==========================================
    // 回收站
    // ==========================================

    pub fn soft_delete_order(&self, order_id: &str, deleted_by: &str) -> ApiResult<bool> {
        self.require_order(order_id)?;
        let added = self
            .overlay_repo
            .mark_deleted(order_id.trim(), Some(deleted_by), Self::now())?;
        tracing::info!(order_id, deleted_by, added, "订单移入回收站");
        Ok(added)
    }

    pub fn restore_order(&self, order_id: &str) -> ApiResult<bool> {
        let order_id = validate_order_id(order_id)?;
        let restored = self.overlay_repo.restore(order_id)?;
        tracing::info!(order_id, restored, "订单从回收站恢复");
        Ok(restored)
    }

    // ==========================================
    // 打印 / 派车 / 扫码
    // ==========================================

    /// 记录打印；仓库单与拣货单同时视为出库交接
    pub fn mark_printed(
        &self,
        order_ids: &[String],
        kind: PrintKind,
        printed_by: &str,
    ) -> ApiResult<PrintResult> {
        let ids = clean_order_ids(order_ids);
        if ids.is_empty() {
            return Err(ApiError::InvalidInput("订单列表不能为空".to_string()));
        }

        let now = Self::now();
        let lines_marked = self
            .order_line_repo
            .mark_printed(&ids, kind, printed_by, now)?;
        let newly_issued = if kind.marks_issued() {
            self.overlay_repo.issue_many(&ids, IssueSource::Print, now)?
        } else {
            0
        };

        tracing::info!(%kind, orders = ids.len(), lines_marked, newly_issued, "打印记录");
        Ok(PrintResult {
            lines_marked,
            newly_issued,
        })
    }

    pub fn assign_dispatch_round(&self, order_ids: &[String], round: i64) -> ApiResult<usize> {
        if round < 1 {
            return Err(ApiError::InvalidInput(format!("派车轮次必须 >= 1: {}", round)));
        }
        let ids = clean_order_ids(order_ids);
        let n = self.order_line_repo.assign_dispatch_round(&ids, round)?;
        tracing::info!(round, orders = ids.len(), lines = n, "分配派车轮次");
        Ok(n)
    }

    pub fn record_scan(&self, order_id: &str, scanned_by: &str) -> ApiResult<usize> {
        self.require_order(order_id)?;
        let n = self
            .order_line_repo
            .record_scan(order_id.trim(), scanned_by, Self::now())?;
        tracing::info!(order_id, scanned_by, lines = n, "扫码出库");
        Ok(n)
    }

    /// 管理员清库
    pub fn purge_all_orders(&self) -> ApiResult<usize> {
        let n = self.order_line_repo.purge_all()?;
        tracing::warn!(lines = n, "已清空全部订单数据");
        Ok(n)
    }
}

// ==========================================
// 接单校验
// ==========================================

/// 本单未接单且库存未覆盖的行
fn find_acceptance_shortages(
    engine: &AllocationEngine,
    snapshot: Vec<OrderLineSnapshot>,
    order_id: &str,
) -> Vec<StockShortage> {
    engine
        .allocate(snapshot, true)
        .rows
        .iter()
        .filter(|r| r.order_id() == order_id && !r.line.accepted)
        .filter(|r| !r.allocation_status.covers_demand())
        .map(|r| StockShortage {
            sku: r.line.sku.clone(),
            qty: r.line.qty,
            status: r.allocation_status.to_string(),
            available: r.stock_after,
        })
        .collect()
}

fn validate_order_id(order_id: &str) -> ApiResult<&str> {
    let trimmed = order_id.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidInput("order_id 不能为空".to_string()));
    }
    Ok(trimmed)
}

fn clean_order_ids(order_ids: &[String]) -> Vec<String> {
    order_ids
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
