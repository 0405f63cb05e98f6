// ==========================================
// 仓库订单履约看板 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 幂等建表 + schema_version 记录
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 表是否存在
pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1 LIMIT 1",
            [table],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false))
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    if !table_exists(conn, "schema_version")? {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 打开连接并确保 schema 存在；版本不一致时仅告警
pub fn open_and_init(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = open_sqlite_connection(db_path)?;
    init_schema(&conn)?;
    match read_schema_version(&conn)? {
        Some(v) if v != CURRENT_SCHEMA_VERSION => {
            tracing::warn!(
                db_version = v,
                expected = CURRENT_SCHEMA_VERSION,
                "数据库 schema_version 与程序期望不一致"
            );
        }
        _ => {}
    }
    Ok(conn)
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS shops (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    platform TEXT NOT NULL,
    name TEXT NOT NULL,
    UNIQUE(platform, name)
);

CREATE TABLE IF NOT EXISTS products (
    sku TEXT PRIMARY KEY,
    brand TEXT NOT NULL DEFAULT '',
    model TEXT NOT NULL DEFAULT '',
    stock_qty INTEGER
);

CREATE TABLE IF NOT EXISTS stocks (
    sku TEXT PRIMARY KEY,
    qty INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS sales (
    order_id TEXT PRIMARY KEY,
    po_no TEXT,
    status TEXT
);

CREATE TABLE IF NOT EXISTS order_lines (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    shop_id INTEGER NOT NULL REFERENCES shops(id),
    order_id TEXT NOT NULL,
    sku TEXT NOT NULL,
    item_name TEXT NOT NULL DEFAULT '',
    qty INTEGER NOT NULL DEFAULT 0 CHECK (qty >= 0),
    order_time TEXT,
    logistic_type TEXT NOT NULL DEFAULT '',
    import_date TEXT,

    accepted INTEGER NOT NULL DEFAULT 0,
    accepted_at TEXT,
    accepted_by TEXT,

    printed_warehouse INTEGER NOT NULL DEFAULT 0,
    printed_warehouse_at TEXT,
    printed_warehouse_by TEXT,
    printed_picking INTEGER NOT NULL DEFAULT 0,
    printed_picking_at TEXT,
    printed_picking_by TEXT,
    printed_lowstock INTEGER NOT NULL DEFAULT 0,
    printed_lowstock_at TEXT,
    printed_lowstock_by TEXT,
    printed_nostock INTEGER NOT NULL DEFAULT 0,
    printed_nostock_at TEXT,
    printed_nostock_by TEXT,
    printed_notenough INTEGER NOT NULL DEFAULT 0,
    printed_notenough_at TEXT,
    printed_notenough_by TEXT,

    dispatch_round INTEGER,
    scanned_at TEXT,
    scanned_by TEXT,

    UNIQUE(shop_id, order_id, sku)
);

CREATE INDEX IF NOT EXISTS idx_order_lines_order_id ON order_lines(order_id);
CREATE INDEX IF NOT EXISTS idx_order_lines_sku ON order_lines(sku);
CREATE INDEX IF NOT EXISTS idx_order_lines_import_date ON order_lines(import_date);

CREATE TABLE IF NOT EXISTS cancelled_orders (
    order_id TEXT PRIMARY KEY,
    note TEXT NOT NULL DEFAULT '',
    cancelled_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS issued_orders (
    order_id TEXT PRIMARY KEY,
    source TEXT NOT NULL,
    issued_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS deleted_orders (
    order_id TEXT PRIMARY KEY,
    deleted_at TEXT NOT NULL,
    deleted_by TEXT
);
"#;
