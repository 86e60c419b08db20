//! `chartkit_io_xlsx` v1:
//! Rust-side XLSX table/chart helper kernel.
//!
//! Architecture mirrors Python `io/xlsx` modules:
//! - `conf`   : constants and defaults
//! - `spec`   : specs/models/options
//! - `util`   : pure helper functions
//! - `table`  : dataframe copy kernels
//! - `chart`  : chart construction
//! - `writer` : stateful workbook session
pub mod chart;
pub mod conf;
pub mod spec;
pub mod table;
pub mod util;
pub mod writer;

pub use chart::{create_bar_chart, create_scatter_chart, plan_scatter_series};
pub use conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
pub use spec::{
    EnumCellValue, EnumChartSeriesShape, SpecBarChartOptions, SpecCellRange, SpecChartSeries,
    SpecScatterChartOptions, SpecTableCopyReport,
};
pub use table::{copy_dataframe_block, copy_dataframe_rows};
pub use util::{
    derive_axis_bounds, derive_column_letters, derive_range_formula, parse_cell_anchor,
    parse_range_formula, sanitize_sheet_name, validate_cell_range,
};
pub use writer::XlsxChartBook;
