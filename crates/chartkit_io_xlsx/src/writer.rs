//! Stateful workbook session that owns sheets, copies and chart placement.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;
use std::path::PathBuf;

use polars::prelude::{DataFrame, IpcReader, SerReader};
use rust_xlsxwriter::{Chart, Workbook};

use crate::conf::{C_SHEET_NAME_DEFAULT, N_LEN_EXCEL_SHEET_NAME_MAX};
use crate::spec::{SpecCellRange, SpecTableCopyReport};
use crate::table::{copy_dataframe_block, copy_dataframe_rows};
use crate::util::{
    cast_col_index, cast_row_index, derive_xlsx_error_text, parse_cell_anchor,
    sanitize_sheet_name,
};

/// Stateful workbook writer.
///
/// Tracks sheet names and per-sheet append cursors so sequential copies land
/// below earlier content. The workbook is buffered in memory until
/// [`Self::close`] is called.
pub struct XlsxChartBook {
    path_file_out: PathBuf,
    workbook: Workbook,
    set_sheet_names_existing: BTreeSet<String>,
    dict_row_cursor_by_sheet: BTreeMap<String, usize>,
    l_reports: Vec<SpecTableCopyReport>,
    if_closed: bool,
}

impl XlsxChartBook {
    /// Create a writer bound to an output path.
    pub fn new(path_file_out: PathBuf) -> Self {
        Self {
            path_file_out,
            workbook: Workbook::new(),
            set_sheet_names_existing: BTreeSet::new(),
            dict_row_cursor_by_sheet: BTreeMap::new(),
            l_reports: Vec::new(),
            if_closed: false,
        }
    }

    /// Return output file path as string.
    pub fn file_out(&self) -> String {
        self.path_file_out.to_string_lossy().to_string()
    }

    /// Return immutable snapshot of per-copy reports.
    pub fn report(&self) -> Vec<SpecTableCopyReport> {
        self.l_reports.clone()
    }

    /// Flush workbook to disk. Idempotent.
    ///
    /// An otherwise untouched workbook still gets its default sheet, so an
    /// empty session saves a valid file.
    pub fn close(&mut self) -> Result<(), String> {
        if self.if_closed {
            return Ok(());
        }
        if self.set_sheet_names_existing.is_empty() {
            self.ensure_worksheet(C_SHEET_NAME_DEFAULT)?;
        }
        self.workbook
            .save(&self.path_file_out)
            .map_err(derive_xlsx_error_text)?;
        self.if_closed = true;
        Ok(())
    }

    /// Append a dataframe into the sheet named `title`, creating it on
    /// demand, or into the default sheet when `title` is `None`.
    ///
    /// A given `title` always creates a fresh sheet; the name is sanitized
    /// and suffixed until unique, with any adjustment surfaced as a report
    /// warning. Rows start at the sheet's current append cursor.
    pub fn copy_dataframe_to_worksheet(
        &mut self,
        df: &DataFrame,
        title: Option<&str>,
        if_header: bool,
    ) -> Result<SpecTableCopyReport, String> {
        if self.if_closed {
            return Err("Cannot write after close().".to_string());
        }

        let mut l_warnings = Vec::new();
        let c_sheet_name = match title {
            None => {
                self.ensure_worksheet(C_SHEET_NAME_DEFAULT)?;
                C_SHEET_NAME_DEFAULT.to_string()
            }
            Some(c_title) => {
                let c_sanitized = sanitize_sheet_name(c_title, "_");
                let c_unique = self.derive_unique_sheet_name(&c_sanitized);
                if c_unique != c_title {
                    l_warnings.push(format!("Sheet name adjusted: {c_title:?} -> {c_unique:?}."));
                }
                self.create_worksheet(&c_unique)?;
                c_unique
            }
        };

        let n_row_start = self
            .dict_row_cursor_by_sheet
            .get(&c_sheet_name)
            .copied()
            .unwrap_or(1);
        let worksheet = self
            .workbook
            .worksheet_from_name(&c_sheet_name)
            .map_err(derive_xlsx_error_text)?;
        let range_cells = copy_dataframe_rows(worksheet, df, n_row_start, if_header)?;
        self.dict_row_cursor_by_sheet
            .insert(c_sheet_name.clone(), range_cells.row_max + 1);

        let report = SpecTableCopyReport {
            sheet_name: c_sheet_name,
            n_rows_written: range_cells.height(),
            n_cols_written: range_cells.width(),
            range_cells,
            warnings: l_warnings,
        };
        self.l_reports.push(report.clone());
        Ok(report)
    }

    /// Same entry as [`Self::copy_dataframe_to_worksheet`], accepting a
    /// Polars IPC payload.
    pub fn copy_dataframe_to_worksheet_from_ipc_bytes(
        &mut self,
        v_ipc_df: &[u8],
        title: Option<&str>,
        if_header: bool,
    ) -> Result<SpecTableCopyReport, String> {
        if self.if_closed {
            return Err("Cannot write after close().".to_string());
        }

        let df_data = derive_dataframe_from_ipc_bytes(v_ipc_df)?;
        self.copy_dataframe_to_worksheet(&df_data, title, if_header)
    }

    /// Block-copy a dataframe into an existing sheet at an `A1`-style
    /// anchor; returns the body-block range for use as a chart data source.
    pub fn copy_dataframe_to_cells(
        &mut self,
        sheet_name: &str,
        df: &DataFrame,
        start_cell: &str,
        col_labels: Option<&str>,
    ) -> Result<SpecCellRange, String> {
        if self.if_closed {
            return Err("Cannot write after close().".to_string());
        }
        if !self.set_sheet_names_existing.contains(sheet_name) {
            return Err(format!("Worksheet not found: {sheet_name:?}."));
        }

        let (n_row_anchor, n_col_anchor) = parse_cell_anchor(start_cell)?;
        let worksheet = self
            .workbook
            .worksheet_from_name(sheet_name)
            .map_err(derive_xlsx_error_text)?;
        let range_body = copy_dataframe_block(worksheet, df, n_row_anchor, n_col_anchor, col_labels)?;

        let n_row_cursor = self
            .dict_row_cursor_by_sheet
            .get(sheet_name)
            .copied()
            .unwrap_or(1);
        self.dict_row_cursor_by_sheet.insert(
            sheet_name.to_string(),
            usize::max(n_row_cursor, range_body.row_max + 1),
        );

        let report = SpecTableCopyReport {
            sheet_name: sheet_name.to_string(),
            n_rows_written: range_body.height() + 1,
            n_cols_written: range_body.width() + 1,
            range_cells: SpecCellRange {
                sheet_name: range_body.sheet_name.clone(),
                row_min: range_body.row_min - 1,
                row_max: range_body.row_max,
                col_min: range_body.col_min - 1,
                col_max: range_body.col_max,
            },
            warnings: vec![],
        };
        self.l_reports.push(report);
        Ok(range_body)
    }

    /// Place a constructed chart on an existing sheet at an `A1`-style
    /// anchor.
    pub fn insert_chart(
        &mut self,
        sheet_name: &str,
        anchor: &str,
        chart: &Chart,
    ) -> Result<(), String> {
        if self.if_closed {
            return Err("Cannot write after close().".to_string());
        }

        let (n_row_anchor, n_col_anchor) = parse_cell_anchor(anchor)?;
        let worksheet = self
            .workbook
            .worksheet_from_name(sheet_name)
            .map_err(derive_xlsx_error_text)?;
        worksheet
            .insert_chart(
                cast_row_index(n_row_anchor)?,
                cast_col_index(n_col_anchor)?,
                chart,
            )
            .map_err(derive_xlsx_error_text)?;
        Ok(())
    }

    fn ensure_worksheet(&mut self, sheet_name: &str) -> Result<(), String> {
        if self.set_sheet_names_existing.contains(sheet_name) {
            return Ok(());
        }
        self.create_worksheet(sheet_name)
    }

    fn create_worksheet(&mut self, sheet_name: &str) -> Result<(), String> {
        let worksheet = self.workbook.add_worksheet();
        worksheet
            .set_name(sheet_name)
            .map_err(derive_xlsx_error_text)?;
        self.set_sheet_names_existing.insert(sheet_name.to_string());
        self.dict_row_cursor_by_sheet.insert(sheet_name.to_string(), 1);
        Ok(())
    }

    fn derive_unique_sheet_name(&self, name: &str) -> String {
        if !self.set_sheet_names_existing.contains(name) {
            return name.to_string();
        }

        let base_name: String = name
            .chars()
            .take(usize::max(1, N_LEN_EXCEL_SHEET_NAME_MAX - 3))
            .collect();

        let mut n_idx = 2usize;
        loop {
            let candidate: String = format!("{base_name}__{n_idx}")
                .chars()
                .take(N_LEN_EXCEL_SHEET_NAME_MAX)
                .collect();
            if !self.set_sheet_names_existing.contains(&candidate) {
                return candidate;
            }
            n_idx += 1;
        }
    }
}

fn derive_dataframe_from_ipc_bytes(v_ipc_df: &[u8]) -> Result<DataFrame, String> {
    IpcReader::new(Cursor::new(v_ipc_df))
        .finish()
        .map_err(|err| format!("Failed to read IPC DataFrame bytes: {err}"))
}

#[cfg(test)]
mod tests {
    use polars::df;

    use crate::chart::create_bar_chart;
    use crate::spec::SpecBarChartOptions;

    use super::*;

    fn create_test_book(tag: &str) -> XlsxChartBook {
        let path_file_out =
            std::env::temp_dir().join(format!("chartkit_io_xlsx_writer_{tag}.xlsx"));
        XlsxChartBook::new(path_file_out)
    }

    #[test]
    fn test_copy_to_worksheet_appends_at_cursor_for_default_sheet() {
        let df_data = df!("v" => [1.0, 2.0]).unwrap();
        let mut book = create_test_book("cursor");

        let report_first = book
            .copy_dataframe_to_worksheet(&df_data, None, true)
            .unwrap();
        assert_eq!(report_first.sheet_name, "Sheet1");
        assert_eq!(report_first.range_cells.row_min, 1);
        assert_eq!(report_first.range_cells.row_max, 3);

        let report_second = book
            .copy_dataframe_to_worksheet(&df_data, None, false)
            .unwrap();
        assert_eq!(report_second.sheet_name, "Sheet1");
        assert_eq!(report_second.range_cells.row_min, 4);
        assert_eq!(report_second.range_cells.row_max, 5);

        assert_eq!(book.report().len(), 2);
    }

    #[test]
    fn test_copy_to_worksheet_uniquifies_and_sanitizes_titles() {
        let df_data = df!("v" => [1i64]).unwrap();
        let mut book = create_test_book("names");

        let report_first = book
            .copy_dataframe_to_worksheet(&df_data, Some("speed"), true)
            .unwrap();
        assert_eq!(report_first.sheet_name, "speed");
        assert!(report_first.warnings.is_empty());

        let report_second = book
            .copy_dataframe_to_worksheet(&df_data, Some("speed"), true)
            .unwrap();
        assert_eq!(report_second.sheet_name, "speed__2");
        assert_eq!(report_second.warnings.len(), 1);

        let report_third = book
            .copy_dataframe_to_worksheet(&df_data, Some("a/b"), true)
            .unwrap();
        assert_eq!(report_third.sheet_name, "a_b");
        assert_eq!(report_third.warnings.len(), 1);
    }

    #[test]
    fn test_copy_to_cells_requires_existing_sheet_and_returns_body() {
        let df_data = df!(
            "time" => [0.0, 1.0, 2.0],
            "speed" => [3.0, 4.0, 5.0],
        )
        .unwrap();
        let mut book = create_test_book("cells");

        assert!(
            book.copy_dataframe_to_cells("Results", &df_data, "B2", None)
                .is_err()
        );

        book.copy_dataframe_to_worksheet(&df_data, Some("Results"), true)
            .unwrap();
        let range_body = book
            .copy_dataframe_to_cells("Results", &df_data, "B6", None)
            .unwrap();
        assert_eq!(range_body.sheet_name, "Results");
        assert_eq!(range_body.row_min, 7);
        assert_eq!(range_body.row_max, 9);
        assert_eq!(range_body.col_min, 3);
        assert_eq!(range_body.col_max, 4);

        assert!(
            book.copy_dataframe_to_cells("Results", &df_data, "??", None)
                .is_err()
        );
    }

    #[test]
    fn test_insert_chart_places_onto_existing_sheet() {
        let df_data = df!(
            "label" => ["a", "b"],
            "total" => [10.0, 20.0],
        )
        .unwrap();
        let mut book = create_test_book("chart");

        book.copy_dataframe_to_worksheet(&df_data, Some("Totals"), true)
            .unwrap();
        let range_body = book
            .copy_dataframe_to_cells("Totals", &df_data, "A5", Some("label"))
            .unwrap();

        let range_categories = SpecCellRange {
            col_min: 1,
            col_max: 1,
            ..range_body.clone()
        };
        let chart =
            create_bar_chart(&range_categories, &range_body, &SpecBarChartOptions::default())
                .unwrap();

        assert!(book.insert_chart("Totals", "D2", &chart).is_ok());
        assert!(book.insert_chart("Missing", "D2", &chart).is_err());
    }

    #[test]
    fn test_close_is_idempotent_and_guards_later_writes() {
        let df_data = df!("v" => [1i64]).unwrap();
        let mut book = create_test_book("close");

        book.copy_dataframe_to_worksheet(&df_data, None, true)
            .unwrap();
        assert!(book.close().is_ok());
        assert!(book.close().is_ok());
        assert!(
            book.copy_dataframe_to_worksheet(&df_data, None, true)
                .is_err()
        );
    }

    #[test]
    fn test_close_on_empty_session_saves_default_sheet() {
        let mut book = create_test_book("empty");
        assert!(book.close().is_ok());
    }
}
