// ==========================================
// 仓库订单履约看板 - 订单行仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责:
// - 导入只插入不覆盖（按 shop_id + order_id + sku 去重）
// - 按看板过滤条件拉取引擎输入快照（库存解析 Product > Stock > 0）
// - 接单 / 打印 / 派车轮次 / 扫码 的状态写入
// ==========================================

use crate::domain::allocation::{OrderLineSnapshot, SalesSnapshot};
use crate::domain::filter::{DashboardFilter, DashboardMode};
use crate::domain::order::{resolve_stock_qty, NewOrderLine, OrderLine, PrintMark, PrintTracking};
use crate::domain::types::{Platform, PrintKind};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::overlay_repo::OverlaySets;
use crate::repository::time_fmt::{format_date, format_ts, parse_date, parse_ts};
use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::sync::{Arc, Mutex};

/// 五类打印追踪列（count, at, by）
const PRINT_COLUMNS: &str = r#"
    ol.printed_warehouse, ol.printed_warehouse_at, ol.printed_warehouse_by,
    ol.printed_picking, ol.printed_picking_at, ol.printed_picking_by,
    ol.printed_lowstock, ol.printed_lowstock_at, ol.printed_lowstock_by,
    ol.printed_nostock, ol.printed_nostock_at, ol.printed_nostock_by,
    ol.printed_notenough, ol.printed_notenough_at, ol.printed_notenough_by
"#;

/// 引擎快照查询（列顺序与 map_snapshot 对应）
const SNAPSHOT_SELECT: &str = r#"
    SELECT
        ol.id, ol.shop_id, s.platform, s.name,
        ol.order_id, ol.sku, ol.qty, ol.order_time,
        p.stock_qty, st.qty,
        sa.order_id IS NOT NULL, sa.status,
        ol.accepted, ol.accepted_at, ol.accepted_by,
        COALESCE(p.brand, ''), COALESCE(p.model, ''),
        ol.logistic_type, ol.dispatch_round, ol.scanned_at, ol.scanned_by,
"#;

const SNAPSHOT_FROM: &str = r#"
    FROM order_lines ol
    JOIN shops s ON s.id = ol.shop_id
    LEFT JOIN products p ON p.sku = ol.sku
    LEFT JOIN stocks st ON st.sku = ol.sku
    LEFT JOIN sales sa ON sa.order_id = ol.order_id
"#;

const LINE_SELECT: &str = r#"
    SELECT
        ol.id, ol.shop_id, ol.order_id, ol.sku, ol.item_name, ol.qty,
        ol.order_time, ol.logistic_type, ol.import_date,
        ol.accepted, ol.accepted_at, ol.accepted_by,
        ol.dispatch_round, ol.scanned_at, ol.scanned_by,
"#;

// ==========================================
// OrderLineRepository
// ==========================================
pub struct OrderLineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderLineRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 导入
    // ==========================================

    /// 插入订单行；去重键已存在时忽略
    ///
    /// # 返回
    /// - Ok(true): 新插入
    /// - Ok(false): 已存在，未做任何修改
    pub fn insert_if_absent(&self, line: &NewOrderLine) -> RepositoryResult<bool> {
        let (added, _) = self.insert_many(std::slice::from_ref(line))?;
        Ok(added == 1)
    }

    /// 批量插入（单事务），返回 (新增数, 已存在跳过数)
    pub fn insert_many(&self, lines: &[NewOrderLine]) -> RepositoryResult<(usize, usize)> {
        for line in lines {
            validate_new_line(line)?;
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let mut added = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO order_lines (
                    shop_id, order_id, sku, item_name, qty,
                    order_time, logistic_type, import_date
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(shop_id, order_id, sku) DO NOTHING
                "#,
            )?;
            for line in lines {
                added += stmt.execute(params![
                    line.shop_id,
                    line.order_id.trim(),
                    line.sku.trim(),
                    line.item_name,
                    line.qty,
                    line.order_time.as_ref().map(format_ts),
                    line.logistic_type,
                    line.import_date.as_ref().map(format_date),
                ])?;
            }
        }
        tx.commit()?;

        Ok((added, lines.len() - added))
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn find_by_order_id(&self, order_id: &str) -> RepositoryResult<Vec<OrderLine>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} {} FROM order_lines ol WHERE ol.order_id = ?1 ORDER BY ol.id",
            LINE_SELECT, PRINT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let lines = stmt
            .query_map([order_id], map_line)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lines)
    }

    /// 拉取引擎输入快照
    ///
    /// - 已软删除的订单不参与任何计算
    /// - is_cancelled / is_issued 由覆盖集合解析
    /// - sku 或 order_id 为空的行被跳过（warn 日志）
    pub fn fetch_snapshots(
        &self,
        filter: &DashboardFilter,
        overlays: &OverlaySets,
    ) -> RepositoryResult<Vec<OrderLineSnapshot>> {
        let (clauses, values) = build_filter_clauses(filter);
        let rows = self.query_snapshots(&clauses, values)?;

        Ok(apply_overlays(rows, overlays)
            .filter(|l| !overlays.deleted.contains(&l.order_id))
            .collect())
    }

    /// 回收站: 仅返回已软删除订单的行
    pub fn fetch_deleted_snapshots(
        &self,
        overlays: &OverlaySets,
    ) -> RepositoryResult<Vec<OrderLineSnapshot>> {
        if overlays.deleted.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = overlays.deleted.iter().cloned().collect();
        let clause = format!("ol.order_id IN ({})", placeholders(ids.len()));
        let values = ids.into_iter().map(Value::from).collect();
        let rows = self.query_snapshots(&[clause], values)?;

        Ok(apply_overlays(rows, overlays).collect())
    }

    fn query_snapshots(
        &self,
        clauses: &[String],
        values: Vec<Value>,
    ) -> RepositoryResult<Vec<OrderLineSnapshot>> {
        let mut sql = format!("{} {} {}", SNAPSHOT_SELECT, PRINT_COLUMNS, SNAPSHOT_FROM);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY ol.id");

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), map_snapshot)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let total = rows.len();
        let kept: Vec<OrderLineSnapshot> = rows
            .into_iter()
            .filter(|l| !l.sku.trim().is_empty() && !l.order_id.trim().is_empty())
            .collect();
        if kept.len() < total {
            tracing::warn!(skipped = total - kept.len(), "跳过 sku 或 order_id 为空的订单行");
        }
        Ok(kept)
    }

    // ==========================================
    // 状态写入
    // ==========================================

    /// 标记整单已接单，返回更新行数
    pub fn set_accepted(
        &self,
        order_id: &str,
        accepted_by: &str,
        at: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let n = tx.execute(
            r#"
            UPDATE order_lines
            SET accepted = 1, accepted_at = ?2, accepted_by = ?3
            WHERE order_id = ?1 AND accepted = 0
            "#,
            params![order_id, format_ts(&at), accepted_by],
        )?;
        tx.commit()?;
        Ok(n)
    }

    pub fn clear_accepted(&self, order_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let n = conn.execute(
            r#"
            UPDATE order_lines
            SET accepted = 0, accepted_at = NULL, accepted_by = NULL
            WHERE order_id = ?1
            "#,
            [order_id],
        )?;
        Ok(n)
    }

    /// 打印计数 +1 并记录最近打印人/时间
    pub fn mark_printed(
        &self,
        order_ids: &[String],
        kind: PrintKind,
        printed_by: &str,
        at: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        if order_ids.is_empty() {
            return Ok(0);
        }
        let col = kind.column_prefix();
        let sql = format!(
            "UPDATE order_lines SET {col} = {col} + 1, {col}_at = ?1, {col}_by = ?2 WHERE order_id IN ({})",
            placeholders_from(3, order_ids.len()),
        );

        let mut values = vec![Value::from(format_ts(&at)), Value::from(printed_by.to_string())];
        values.extend(order_ids.iter().cloned().map(Value::from));

        let conn = self.get_conn()?;
        let n = conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(n)
    }

    pub fn assign_dispatch_round(&self, order_ids: &[String], round: i64) -> RepositoryResult<usize> {
        if order_ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "UPDATE order_lines SET dispatch_round = ?1 WHERE order_id IN ({})",
            placeholders_from(2, order_ids.len()),
        );
        let mut values = vec![Value::from(round)];
        values.extend(order_ids.iter().cloned().map(Value::from));

        let conn = self.get_conn()?;
        let n = conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(n)
    }

    pub fn record_scan(
        &self,
        order_id: &str,
        scanned_by: &str,
        at: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let n = conn.execute(
            "UPDATE order_lines SET scanned_at = ?2, scanned_by = ?3 WHERE order_id = ?1",
            params![order_id, format_ts(&at), scanned_by],
        )?;
        Ok(n)
    }

    /// 管理员清库: 删除全部订单行与订单级覆盖记录，返回删除的订单行数
    pub fn purge_all(&self) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let n = tx.execute("DELETE FROM order_lines", [])?;
        tx.execute_batch(
            r#"
            DELETE FROM cancelled_orders;
            DELETE FROM issued_orders;
            DELETE FROM deleted_orders;
            "#,
        )?;
        tx.commit()?;
        Ok(n)
    }
}

// ==========================================
// 过滤条件 → SQL 谓词
// ==========================================

/// 生成 WHERE 子句与参数（参数按出现顺序绑定到 ?）
pub fn build_filter_clauses(filter: &DashboardFilter) -> (Vec<String>, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    if let Some(platform) = &filter.platform {
        clauses.push("s.platform = ?".to_string());
        values.push(Value::from(platform.canonical().display_name().to_string()));
    }
    if let Some(shop_id) = filter.shop_id {
        clauses.push("ol.shop_id = ?".to_string());
        values.push(Value::from(shop_id));
    }

    match filter.mode {
        DashboardMode::Active | DashboardMode::AllTime => {}
        DashboardMode::Today => {
            let today = filter
                .today
                .unwrap_or_else(|| chrono::Local::now().date_naive());
            clauses.push("ol.import_date = ?".to_string());
            values.push(Value::from(format_date(&today)));
        }
        DashboardMode::Range => {
            if let Some(d) = filter.import_date {
                clauses.push("ol.import_date = ?".to_string());
                values.push(Value::from(format_date(&d)));
            }
            if let Some(d) = filter.import_from {
                clauses.push("ol.import_date >= ?".to_string());
                values.push(Value::from(format_date(&d)));
            }
            if let Some(d) = filter.import_to {
                clauses.push("ol.import_date <= ?".to_string());
                values.push(Value::from(format_date(&d)));
            }
            if let Some(ts) = filter.date_from {
                clauses.push("ol.order_time >= ?".to_string());
                values.push(Value::from(format_ts(&ts)));
            }
            if let Some(ts) = filter.date_to {
                clauses.push("ol.order_time < ?".to_string());
                values.push(Value::from(format_ts(&ts)));
            }
        }
    }

    if let Some(ts) = filter.accepted_from {
        clauses.push("ol.accepted_at >= ?".to_string());
        values.push(Value::from(format_ts(&ts)));
    }
    if let Some(ts) = filter.accepted_to {
        clauses.push("ol.accepted_at < ?".to_string());
        values.push(Value::from(format_ts(&ts)));
    }

    if let Some(skus) = &filter.skus {
        if skus.is_empty() {
            clauses.push("0".to_string());
        } else {
            clauses.push(format!("ol.sku IN ({})", placeholders(skus.len())));
            values.extend(skus.iter().cloned().map(Value::from));
        }
    }

    (clauses, values)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// 从 ?{start} 开始的编号占位符
fn placeholders_from(start: usize, n: usize) -> String {
    (start..start + n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn apply_overlays<'a>(
    rows: Vec<OrderLineSnapshot>,
    overlays: &'a OverlaySets,
) -> impl Iterator<Item = OrderLineSnapshot> + 'a {
    rows.into_iter().map(move |mut l| {
        l.is_cancelled = overlays.cancelled.contains(&l.order_id);
        l.is_issued = overlays.issued.contains(&l.order_id);
        l
    })
}

fn validate_new_line(line: &NewOrderLine) -> RepositoryResult<()> {
    if line.order_id.trim().is_empty() {
        return Err(RepositoryError::FieldValueError {
            field: "order_id".to_string(),
            message: "order_id 为空".to_string(),
        });
    }
    if line.sku.trim().is_empty() {
        return Err(RepositoryError::FieldValueError {
            field: "sku".to_string(),
            message: format!("order_id={} 的 sku 为空", line.order_id),
        });
    }
    if line.qty < 0 {
        return Err(RepositoryError::FieldValueError {
            field: "qty".to_string(),
            message: format!("qty 不能为负数: {}", line.qty),
        });
    }
    Ok(())
}

// ==========================================
// 行映射
// ==========================================

fn read_print_tracking(row: &Row, start: usize) -> rusqlite::Result<PrintTracking> {
    let mark = |i: usize| -> rusqlite::Result<PrintMark> {
        Ok(PrintMark {
            count: row.get(start + i * 3)?,
            last_at: parse_ts(row.get(start + i * 3 + 1)?),
            last_by: row.get(start + i * 3 + 2)?,
        })
    };
    Ok(PrintTracking {
        warehouse: mark(0)?,
        picking: mark(1)?,
        low_stock: mark(2)?,
        no_stock: mark(3)?,
        not_enough: mark(4)?,
    })
}

fn map_snapshot(row: &Row) -> rusqlite::Result<OrderLineSnapshot> {
    let product_stock: Option<i64> = row.get(8)?;
    let stock: Option<i64> = row.get(9)?;
    let in_sbs: bool = row.get(10)?;
    let sales = if in_sbs {
        SalesSnapshot::Synced {
            status: row.get(11)?,
        }
    } else {
        SalesSnapshot::NotInSbs
    };

    Ok(OrderLineSnapshot {
        line_id: row.get(0)?,
        shop_id: row.get(1)?,
        platform: Platform::normalize(&row.get::<_, String>(2)?),
        shop_name: row.get(3)?,
        order_id: row.get(4)?,
        sku: row.get(5)?,
        qty: row.get(6)?,
        order_time: parse_ts(row.get(7)?),
        stock_qty: resolve_stock_qty(product_stock, stock),
        sales,
        accepted: row.get(12)?,
        accepted_at: parse_ts(row.get(13)?),
        accepted_by: row.get(14)?,
        is_cancelled: false,
        is_issued: false,
        brand: row.get(15)?,
        model: row.get(16)?,
        logistic_type: row.get(17)?,
        dispatch_round: row.get(18)?,
        scanned_at: parse_ts(row.get(19)?),
        scanned_by: row.get(20)?,
        printing: read_print_tracking(row, 21)?,
    })
}

fn map_line(row: &Row) -> rusqlite::Result<OrderLine> {
    Ok(OrderLine {
        id: row.get(0)?,
        shop_id: row.get(1)?,
        order_id: row.get(2)?,
        sku: row.get(3)?,
        item_name: row.get(4)?,
        qty: row.get(5)?,
        order_time: parse_ts(row.get(6)?),
        logistic_type: row.get(7)?,
        import_date: parse_date(row.get(8)?),
        accepted: row.get(9)?,
        accepted_at: parse_ts(row.get(10)?),
        accepted_by: row.get(11)?,
        dispatch_round: row.get(12)?,
        scanned_at: parse_ts(row.get(13)?),
        scanned_by: row.get(14)?,
        printing: read_print_tracking(row, 15)?,
    })
}
