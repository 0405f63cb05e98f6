// ==========================================
// 时间字段的 TEXT 存储格式
// ==========================================
// 统一格式: "%Y-%m-%d %H:%M:%S" / "%Y-%m-%d"，保证字符串比较即时间比较
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};

pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

pub fn format_date(d: &NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

/// 解析失败视为缺失（兼容历史数据中的 ISO "T" 分隔）
pub fn parse_ts(raw: Option<String>) -> Option<NaiveDateTime> {
    let raw = raw?;
    let s = raw.trim();
    NaiveDateTime::parse_from_str(s, TS_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

pub fn parse_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok())
}
