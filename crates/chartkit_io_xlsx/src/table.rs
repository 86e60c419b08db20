//! DataFrame-to-worksheet copy kernels.

use polars::prelude::{AnyValue, Column, DataFrame};
use rust_xlsxwriter::Worksheet;

use crate::conf::{N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX};
use crate::spec::{EnumCellValue, SpecCellRange};
use crate::util::{cast_col_index, cast_row_index, derive_xlsx_error_text};

////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Map one dataframe value onto the normalized cell value model.
pub fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::Boolean(val) => EnumCellValue::Boolean(val),
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::UInt8(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt16(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt32(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int8(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int16(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int128(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        _ => EnumCellValue::String(value.to_string()),
    }
}

/// Write one unformatted cell; `None` leaves the cell untouched.
pub fn write_cell(
    worksheet: &mut Worksheet,
    row_1based: usize,
    col_1based: usize,
    value: &EnumCellValue,
) -> Result<(), String> {
    let n_row = cast_row_index(row_1based)?;
    let n_col = cast_col_index(col_1based)?;

    match value {
        EnumCellValue::None => {}
        EnumCellValue::String(val) => {
            worksheet
                .write_string(n_row, n_col, val.as_str())
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::Number(val) => {
            worksheet
                .write_number(n_row, n_col, *val)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::Boolean(val) => {
            worksheet
                .write_boolean(n_row, n_col, *val)
                .map_err(derive_xlsx_error_text)?;
        }
    }

    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SequentialRowsCopy

/// Write dataframe rows sequentially starting at `row_start` (1-based),
/// optionally preceded by the column-name header row.
///
/// Returns the full occupied cell range, header included.
pub fn copy_dataframe_rows(
    worksheet: &mut Worksheet,
    df: &DataFrame,
    row_start: usize,
    if_header: bool,
) -> Result<SpecCellRange, String> {
    if row_start == 0 {
        return Err("row_start is 1-based and must be >= 1.".to_string());
    }

    let l_colnames = df.get_column_names_str();
    let n_width = l_colnames.len();
    let n_height = df.height();
    let n_rows_total = n_height + usize::from(if_header);

    if n_width == 0 {
        return Err("DataFrame must have at least one column.".to_string());
    }
    if n_rows_total == 0 {
        return Err("DataFrame has no rows to copy.".to_string());
    }
    validate_copy_extent(row_start + n_rows_total - 1, n_width)?;

    let mut n_row_cursor = row_start;
    if if_header {
        for (n_idx_col, c_colname) in l_colnames.iter().enumerate() {
            write_cell(
                worksheet,
                n_row_cursor,
                n_idx_col + 1,
                &EnumCellValue::String((*c_colname).to_string()),
            )?;
        }
        n_row_cursor += 1;
    }

    let l_cols = df.get_columns();
    for n_idx_row in 0..n_height {
        for (n_idx_col, col) in l_cols.iter().enumerate() {
            let value = derive_cell_value_from_any_value(
                col.get(n_idx_row)
                    .map_err(|err| format!("Failed to access cell value: {err}"))?,
            );
            write_cell(worksheet, n_row_cursor + n_idx_row, n_idx_col + 1, &value)?;
        }
    }

    Ok(SpecCellRange {
        sheet_name: worksheet.name(),
        row_min: row_start,
        row_max: row_start + n_rows_total - 1,
        col_min: 1,
        col_max: n_width,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region AnchoredBlockCopy

/// Write a dataframe as an anchored block: row labels in the anchor column,
/// column headers in the anchor row, body at `(+1, +1)` offsets.
///
/// `col_labels` optionally names the dataframe column supplying the row
/// labels; that column is excluded from the body. Without it, 0-based row
/// numbers are used. Returns the body-block range, labels and header
/// excluded, for use as a chart data source.
pub fn copy_dataframe_block(
    worksheet: &mut Worksheet,
    df: &DataFrame,
    row_anchor: usize,
    col_anchor: usize,
    col_labels: Option<&str>,
) -> Result<SpecCellRange, String> {
    if row_anchor == 0 || col_anchor == 0 {
        return Err("Block anchors are 1-based and must be >= 1.".to_string());
    }

    let n_height = df.height();
    if n_height == 0 {
        return Err("DataFrame has no rows to copy.".to_string());
    }

    let col_label_values = match col_labels {
        Some(c_name) => Some(
            df.column(c_name)
                .map_err(|_| format!("Label column not found: {c_name:?}."))?,
        ),
        None => None,
    };
    let l_cols_body: Vec<&Column> = df
        .get_columns()
        .iter()
        .filter(|col| col_labels.is_none_or(|c_name| col.name().as_str() != c_name))
        .collect();
    let n_width_body = l_cols_body.len();
    if n_width_body == 0 {
        return Err("DataFrame must have at least one body column.".to_string());
    }

    validate_copy_extent(row_anchor + n_height, col_anchor + n_width_body)?;

    for (n_idx_col, col) in l_cols_body.iter().enumerate() {
        write_cell(
            worksheet,
            row_anchor,
            col_anchor + 1 + n_idx_col,
            &EnumCellValue::String(col.name().to_string()),
        )?;
    }

    for n_idx_row in 0..n_height {
        let value = match col_label_values {
            Some(col) => derive_cell_value_from_any_value(
                col.get(n_idx_row)
                    .map_err(|err| format!("Failed to access label value: {err}"))?,
            ),
            None => EnumCellValue::Number(n_idx_row as f64),
        };
        write_cell(worksheet, row_anchor + 1 + n_idx_row, col_anchor, &value)?;
    }

    for n_idx_row in 0..n_height {
        for (n_idx_col, col) in l_cols_body.iter().enumerate() {
            let value = derive_cell_value_from_any_value(
                col.get(n_idx_row)
                    .map_err(|err| format!("Failed to access cell value: {err}"))?,
            );
            write_cell(
                worksheet,
                row_anchor + 1 + n_idx_row,
                col_anchor + 1 + n_idx_col,
                &value,
            )?;
        }
    }

    Ok(SpecCellRange {
        sheet_name: worksheet.name(),
        row_min: row_anchor + 1,
        row_max: row_anchor + n_height,
        col_min: col_anchor + 1,
        col_max: col_anchor + n_width_body,
    })
}

fn validate_copy_extent(row_last: usize, col_last: usize) -> Result<(), String> {
    if row_last > N_NROWS_EXCEL_MAX {
        return Err(format!(
            "Copy exceeds the Excel row limit: last row {row_last}."
        ));
    }
    if col_last > N_NCOLS_EXCEL_MAX {
        return Err(format!(
            "Copy exceeds the Excel column limit: last column {col_last}."
        ));
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use polars::df;
    use rust_xlsxwriter::Worksheet;

    use super::*;

    fn create_test_worksheet() -> Worksheet {
        let mut worksheet = Worksheet::new();
        worksheet.set_name("Data").unwrap();
        worksheet
    }

    #[test]
    fn test_copy_dataframe_rows_covers_header_and_body() {
        let df_data = df!(
            "time" => [0.0, 1.0, 2.0],
            "speed" => [3.5, 4.0, 4.5],
        )
        .unwrap();
        let mut worksheet = create_test_worksheet();

        let range = copy_dataframe_rows(&mut worksheet, &df_data, 1, true).unwrap();

        assert_eq!(
            range,
            SpecCellRange {
                sheet_name: "Data".to_string(),
                row_min: 1,
                row_max: 4,
                col_min: 1,
                col_max: 2,
            }
        );
        assert_eq!(range.height(), df_data.height() + 1);
        assert_eq!(range.width(), df_data.width());
    }

    #[test]
    fn test_copy_dataframe_rows_headerless_from_offset() {
        let df_data = df!("v" => [1i64, 2, 3, 4]).unwrap();
        let mut worksheet = create_test_worksheet();

        let range = copy_dataframe_rows(&mut worksheet, &df_data, 5, false).unwrap();

        assert_eq!(range.row_min, 5);
        assert_eq!(range.row_max, 8);
        assert_eq!(range.width(), 1);
    }

    #[test]
    fn test_copy_dataframe_rows_rejects_degenerate_frames() {
        let mut worksheet = create_test_worksheet();

        let df_empty = DataFrame::empty();
        assert!(copy_dataframe_rows(&mut worksheet, &df_empty, 1, true).is_err());

        let df_no_rows = df!("v" => Vec::<i64>::new()).unwrap();
        assert!(copy_dataframe_rows(&mut worksheet, &df_no_rows, 1, false).is_err());
        assert!(copy_dataframe_rows(&mut worksheet, &df_no_rows, 0, true).is_err());
    }

    #[test]
    fn test_copy_dataframe_rows_rejects_excel_row_overflow() {
        let df_data = df!("v" => [1i64, 2]).unwrap();
        let mut worksheet = create_test_worksheet();

        assert!(copy_dataframe_rows(&mut worksheet, &df_data, 1_048_576, false).is_err());
    }

    #[test]
    fn test_copy_dataframe_block_returns_body_block_range() {
        let df_data = df!(
            "a" => [1.0, 2.0],
            "b" => [3.0, 4.0],
            "c" => [5.0, 6.0],
        )
        .unwrap();
        let mut worksheet = create_test_worksheet();

        // anchored at B3: labels in column B, headers in row 3, body at C4
        let range = copy_dataframe_block(&mut worksheet, &df_data, 3, 2, None).unwrap();

        assert_eq!(
            range,
            SpecCellRange {
                sheet_name: "Data".to_string(),
                row_min: 4,
                row_max: 5,
                col_min: 3,
                col_max: 5,
            }
        );
    }

    #[test]
    fn test_copy_dataframe_block_excludes_label_column_from_body() {
        let df_data = df!(
            "run" => ["r1", "r2"],
            "score" => [0.5, 0.7],
        )
        .unwrap();
        let mut worksheet = create_test_worksheet();

        let range = copy_dataframe_block(&mut worksheet, &df_data, 1, 1, Some("run")).unwrap();

        assert_eq!(range.width(), 1);
        assert_eq!(range.height(), 2);
        assert_eq!(range.col_min, 2);

        assert!(copy_dataframe_block(&mut worksheet, &df_data, 1, 1, Some("missing")).is_err());
    }

    #[test]
    fn test_derive_cell_value_from_any_value_keeps_types() {
        assert_eq!(
            derive_cell_value_from_any_value(AnyValue::Int64(7)),
            EnumCellValue::Number(7.0)
        );
        assert_eq!(
            derive_cell_value_from_any_value(AnyValue::Boolean(true)),
            EnumCellValue::Boolean(true)
        );
        assert_eq!(
            derive_cell_value_from_any_value(AnyValue::String("x")),
            EnumCellValue::String("x".to_string())
        );
        assert_eq!(
            derive_cell_value_from_any_value(AnyValue::Null),
            EnumCellValue::None
        );
    }
}
