use super::decision::{decide, RowFacts};
use crate::config::AllocationConfig;
use crate::domain::allocation::{
    AllocationOutcome, AnnotatedRow, OrderLineSnapshot, SalesLabel, SalesSnapshot,
};
use crate::domain::types::AllocationStatus;
use crate::engine::kpi::summarize;
use crate::engine::priority::PlatformPrioritySorter;
use std::collections::HashMap;
use tracing::instrument;

// ==========================================
// 分类后的中间行（步骤 1 输出）
// ==========================================
struct ClassifiedRow {
    line: OrderLineSnapshot,
    is_packed: bool,
    is_not_in_sbs: bool,
    sales_label: SalesLabel,
}

impl ClassifiedRow {
    fn facts(&self) -> RowFacts {
        RowFacts {
            is_packed: self.is_packed,
            is_cancelled: self.line.is_cancelled,
            accepted: self.line.accepted,
            is_issued: self.line.is_issued,
            qty: self.line.qty,
        }
    }

    fn consumes_demand(&self) -> bool {
        !self.is_packed && !self.line.is_cancelled
    }
}

/// 单行分配结果（步骤 3 输出）
#[derive(Debug, Clone, Copy)]
struct RowAllocation {
    status: AllocationStatus,
    reserved: bool,
    stock_after: i64,
    oversold: bool,
}

// ==========================================
// AllocationEngine - 库存分配引擎
// ==========================================
// 红线: 无副作用，同一快照多次运行结果一致
pub struct AllocationEngine {
    config: AllocationConfig,
}

impl AllocationEngine {
    pub fn new(config: AllocationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 执行一次完整分配
    ///
    /// # 参数
    /// - `lines`: 订单行快照（已剔除 sku/order_id 为空的行）
    /// - `active_only`: 为 true 时先剔除已打包/已取消的行
    ///
    /// # 返回
    /// 与输入顺序一致的标注行 + KPI 汇总
    #[instrument(skip(self, lines), fields(input_rows = lines.len()))]
    pub fn allocate(&self, lines: Vec<OrderLineSnapshot>, active_only: bool) -> AllocationOutcome {
        // === 步骤 1: 分类 ===
        let classified: Vec<ClassifiedRow> = lines
            .into_iter()
            .map(|line| self.classify(line))
            .filter(|row| !(active_only && !row.consumes_demand()))
            .collect();

        // === 步骤 2: SKU 需求汇总（仅展示）===
        let demand = demand_by_sku(&classified);

        // === 步骤 3: 按 SKU 分组，优先级顺序单次扫描 ===
        let allocations = self.allocate_all_skus(&classified);

        let rows: Vec<AnnotatedRow> = classified
            .into_iter()
            .zip(allocations)
            .map(|(row, alloc)| {
                let all_qty = demand.get(&row.line.sku).copied().unwrap_or(0);
                AnnotatedRow {
                    line: row.line,
                    is_packed: row.is_packed,
                    is_not_in_sbs: row.is_not_in_sbs,
                    sales_label: row.sales_label,
                    all_qty,
                    allocation_status: alloc.status,
                    reserved: alloc.reserved,
                    stock_after: alloc.stock_after,
                    oversold: alloc.oversold,
                }
            })
            .collect();

        // === 步骤 4: KPI ===
        let kpis = summarize(&rows);

        tracing::debug!(
            output_rows = rows.len(),
            ready = kpis.ready,
            low = kpis.low,
            nostock = kpis.nostock,
            notenough = kpis.notenough,
            accepted = kpis.accepted,
            "分配完成"
        );

        AllocationOutcome { rows, kpis }
    }

    /// 步骤 1: 销售单标签 + 打包判定
    fn classify(&self, line: OrderLineSnapshot) -> ClassifiedRow {
        let is_not_in_sbs = matches!(line.sales, SalesSnapshot::NotInSbs);
        let sales_label = SalesLabel::from_snapshot(&line.sales);

        // 未同步 SBS 的订单永远不会被判定为已打包
        let is_packed = match &sales_label {
            SalesLabel::Status(s) if !is_not_in_sbs => self.config.is_packed_label(s),
            _ => false,
        };

        ClassifiedRow {
            line,
            is_packed,
            is_not_in_sbs,
            sales_label,
        }
    }

    /// 步骤 3: 对每个 SKU 分组独立分配，结果按输入下标回填
    fn allocate_all_skus(&self, rows: &[ClassifiedRow]) -> Vec<RowAllocation> {
        let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, row) in rows.iter().enumerate() {
            groups.entry(row.line.sku.as_str()).or_default().push(idx);
        }

        let lines: Vec<&OrderLineSnapshot> = rows.iter().map(|r| &r.line).collect();
        let sorter = PlatformPrioritySorter::new(&self.config);

        let mut result: Vec<Option<RowAllocation>> = vec![None; rows.len()];
        for (_sku, mut indices) in groups {
            sorter.sort_indices(&mut indices, &lines);
            let decisions = self.allocate_sku_group(&indices, rows);
            for (idx, alloc) in indices.into_iter().zip(decisions) {
                result[idx] = Some(alloc);
            }
        }

        result
            .into_iter()
            .map(|alloc| {
                // 每个下标恰好属于一个分组
                alloc.unwrap_or(RowAllocation {
                    status: AllocationStatus::Shortage,
                    reserved: false,
                    stock_after: 0,
                    oversold: false,
                })
            })
            .collect()
    }

    /// 单 SKU 运行库存折叠
    ///
    /// 起始库存取排序后第一行的 stock_qty（同 SKU 共享同一库存快照）
    fn allocate_sku_group(&self, sorted: &[usize], rows: &[ClassifiedRow]) -> Vec<RowAllocation> {
        let threshold = self.config.low_stock_threshold;
        let start = sorted
            .first()
            .map(|&i| rows[i].line.stock_qty)
            .unwrap_or(0);

        let (_remaining, decisions) = sorted.iter().fold(
            (start, Vec::with_capacity(sorted.len())),
            |(stock, mut acc), &idx| {
                let row = &rows[idx];
                let decision = decide(&row.facts(), stock, threshold);
                let next = if decision.reserve {
                    stock - row.line.qty
                } else {
                    stock
                };
                acc.push(RowAllocation {
                    status: decision.status,
                    reserved: decision.reserve,
                    stock_after: next,
                    oversold: decision.oversold,
                });
                (next, acc)
            },
        );

        decisions
    }
}

/// 同 SKU 未打包、未取消行的需求总量
fn demand_by_sku(rows: &[ClassifiedRow]) -> HashMap<String, i64> {
    rows.iter()
        .filter(|row| row.consumes_demand())
        .fold(HashMap::new(), |mut acc, row| {
            let total = acc.entry(row.line.sku.clone()).or_insert(0);
            *total = total.saturating_add(row.line.qty);
            acc
        })
}
