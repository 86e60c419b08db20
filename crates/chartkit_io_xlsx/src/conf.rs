//! XLSX constants and chart defaults.

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Sheet targeted when no title is given.
pub const C_SHEET_NAME_DEFAULT: &str = "Sheet1";

/// Default chart height in centimeters.
pub const N_CM_CHART_HEIGHT_DEFAULT: f64 = 10.0;
/// Default chart width in centimeters.
pub const N_CM_CHART_WIDTH_DEFAULT: f64 = 20.0;
/// Built-in chart style index applied to every chart.
pub const N_IDX_CHART_STYLE_DEFAULT: u8 = 2;
/// Pixels per centimeter at the 96 dpi the drawing layer assumes.
pub const N_PX_PER_CM: f64 = 96.0 / 2.54;
