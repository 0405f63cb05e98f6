// ==========================================
// 仓库订单履约看板 - 导入层
// ==========================================
// 职责: 外部 CSV 导入（订单 / 库存 / 商品 / 销售单）
// ==========================================

pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod master_data_importer;
pub mod order_importer;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, CsvTable};
pub use master_data_importer::MasterDataImporter;
pub use order_importer::{OrderImportReport, OrderImporter};
