// ==========================================
// 仓库订单履约看板 - 平台优先级排序
// ==========================================
// 职责: 同 SKU 内订单行的库存抢占顺序
// 排序键:
// 1) 平台排名升序 (Shopee > TikTok > Lazada > 其他)
// 2) 下单时间升序 (先到先得)，无时间者排最后
// 相同键保持输入顺序（稳定排序）
// ==========================================

use crate::config::AllocationConfig;
use crate::domain::allocation::OrderLineSnapshot;
use std::cmp::Ordering;

// ==========================================
// PlatformPrioritySorter
// ==========================================
pub struct PlatformPrioritySorter<'a> {
    config: &'a AllocationConfig,
}

impl<'a> PlatformPrioritySorter<'a> {
    pub fn new(config: &'a AllocationConfig) -> Self {
        Self { config }
    }

    /// 比较两个订单行的抢占优先级
    ///
    /// # 返回
    /// - Ordering::Less: a 优先于 b
    pub fn compare(&self, a: &OrderLineSnapshot, b: &OrderLineSnapshot) -> Ordering {
        let rank_a = self.config.platform_rank(&a.platform);
        let rank_b = self.config.platform_rank(&b.platform);

        rank_a.cmp(&rank_b).then_with(|| match (a.order_time, b.order_time) {
            (Some(ta), Some(tb)) => ta.cmp(&tb),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
    }

    /// 对一组下标按其订单行优先级排序
    pub fn sort_indices(&self, indices: &mut [usize], lines: &[&OrderLineSnapshot]) {
        indices.sort_by(|&i, &j| self.compare(lines[i], lines[j]));
    }
}
