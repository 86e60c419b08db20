//! Stateless helper utilities shared by the copy and chart kernels.

use rust_xlsxwriter::XlsxError;

use crate::conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, N_PX_PER_CM,
    TUP_EXCEL_ILLEGAL,
};
use crate::spec::SpecCellRange;

////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to a valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellAddressing

/// Convert a 1-based column index to Excel column letters (`1 -> "A"`).
pub fn derive_column_letters(col_1based: usize) -> String {
    let mut l_letters = Vec::new();
    let mut n_rest = col_1based;
    while n_rest > 0 {
        let n_digit = (n_rest - 1) % 26;
        l_letters.push((b'A' + n_digit as u8) as char);
        n_rest = (n_rest - 1) / 26;
    }
    l_letters.iter().rev().collect()
}

/// Convert Excel column letters to a 1-based column index (`"A" -> 1`).
pub fn parse_column_letters(letters: &str) -> Result<usize, String> {
    if letters.is_empty() {
        return Err("Column letters must not be empty.".to_string());
    }

    let mut n_col = 0usize;
    for chr in letters.chars() {
        let chr_upper = chr.to_ascii_uppercase();
        if !chr_upper.is_ascii_uppercase() {
            return Err(format!("Invalid column letters: {letters:?}."));
        }
        n_col = n_col * 26 + (chr_upper as usize - 'A' as usize + 1);
        if n_col > N_NCOLS_EXCEL_MAX {
            return Err(format!("Column letters out of range: {letters:?}."));
        }
    }

    Ok(n_col)
}

/// Parse an `A1`-style cell address into a 1-based `(row, col)` pair.
pub fn parse_cell_anchor(anchor: &str) -> Result<(usize, usize), String> {
    let c_anchor = anchor.trim();
    let n_split = c_anchor
        .chars()
        .take_while(|chr| chr.is_ascii_alphabetic())
        .count();
    let (c_letters, c_digits) = c_anchor.split_at(n_split);
    if c_letters.is_empty()
        || c_digits.is_empty()
        || !c_digits.chars().all(|chr| chr.is_ascii_digit())
    {
        return Err(format!("Invalid cell anchor: {anchor:?}."));
    }

    let n_col = parse_column_letters(c_letters)?;
    let n_row: usize = c_digits
        .parse()
        .map_err(|_| format!("Invalid cell anchor: {anchor:?}."))?;
    if n_row == 0 || n_row > N_NROWS_EXCEL_MAX {
        return Err(format!("Cell anchor row out of range: {anchor:?}."));
    }

    Ok((n_row, n_col))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RangeFormulas

/// Validate ordering and Excel limits of a cell range.
pub fn validate_cell_range(range: &SpecCellRange) -> Result<(), String> {
    if range.sheet_name.trim().is_empty() {
        return Err("Cell range sheet name must not be empty.".to_string());
    }
    if range.row_min == 0 || range.col_min == 0 {
        return Err(format!("Cell range indices are 1-based: {range:?}."));
    }
    if range.row_min > range.row_max || range.col_min > range.col_max {
        return Err(format!("Cell range is inverted: {range:?}."));
    }
    if range.row_max > N_NROWS_EXCEL_MAX || range.col_max > N_NCOLS_EXCEL_MAX {
        return Err(format!("Cell range exceeds Excel limits: {range:?}."));
    }
    Ok(())
}

/// Print a cell range as an absolute range formula (`Sheet1!$A$2:$B$10`).
///
/// Single-cell ranges collapse to one address. Sheet names that need quoting
/// are quoted with embedded quotes doubled.
pub fn derive_range_formula(range: &SpecCellRange) -> String {
    let c_sheet = quote_sheet_name(&range.sheet_name);
    let c_cell_min = format!("${}${}", derive_column_letters(range.col_min), range.row_min);
    if range.row_min == range.row_max && range.col_min == range.col_max {
        return format!("{c_sheet}!{c_cell_min}");
    }

    format!(
        "{c_sheet}!{c_cell_min}:${}${}",
        derive_column_letters(range.col_max),
        range.row_max
    )
}

/// Parse an absolute range formula back into a cell range.
///
/// Accepts single-cell and rectangular forms, with or without `$` anchors,
/// and quoted sheet names.
pub fn parse_range_formula(formula: &str) -> Result<SpecCellRange, String> {
    let c_formula = formula.trim();
    let (c_sheet_name, c_cells) = split_sheet_prefix(c_formula)?;

    let (c_first, c_second) = match c_cells.split_once(':') {
        Some((c_first, c_second)) => (c_first, c_second),
        None => (c_cells, c_cells),
    };
    let (n_row_min, n_col_min) = parse_cell_anchor(&c_first.replace('$', ""))?;
    let (n_row_max, n_col_max) = parse_cell_anchor(&c_second.replace('$', ""))?;

    let range = SpecCellRange {
        sheet_name: c_sheet_name,
        row_min: n_row_min,
        row_max: n_row_max,
        col_min: n_col_min,
        col_max: n_col_max,
    };
    validate_cell_range(&range)?;
    Ok(range)
}

fn quote_sheet_name(name: &str) -> String {
    let if_plain = !name.is_empty()
        && !name.chars().next().is_some_and(|chr| chr.is_ascii_digit())
        && name.chars().all(|chr| chr.is_alphanumeric() || chr == '_');
    if if_plain {
        return name.to_string();
    }

    format!("'{}'", name.replace('\'', "''"))
}

fn split_sheet_prefix(formula: &str) -> Result<(String, &str), String> {
    let Some(c_rest) = formula.strip_prefix('\'') else {
        let Some((c_sheet, c_cells)) = formula.split_once('!') else {
            return Err(format!(
                "Range formula must include a sheet name: {formula:?}."
            ));
        };
        if c_sheet.is_empty() {
            return Err(format!("Range formula sheet name is empty: {formula:?}."));
        }
        return Ok((c_sheet.to_string(), c_cells));
    };

    let mut c_name = String::new();
    let mut iter_chars = c_rest.chars();
    loop {
        let Some(chr) = iter_chars.next() else {
            return Err(format!("Unterminated sheet name quote: {formula:?}."));
        };
        if chr != '\'' {
            c_name.push(chr);
            continue;
        }
        // doubled quote is an escaped quote, a lone quote closes the name
        if iter_chars.clone().next() == Some('\'') {
            iter_chars.next();
            c_name.push('\'');
        } else {
            break;
        }
    }

    let Some(c_cells) = iter_chars.as_str().strip_prefix('!') else {
        return Err(format!(
            "Range formula must include a sheet name: {formula:?}."
        ));
    };
    if c_name.is_empty() {
        return Err(format!("Range formula sheet name is empty: {formula:?}."));
    }
    Ok((c_name, c_cells))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region NumericHelpers

/// Derive `(min, max)` axis bounds from the finite values of a sample.
pub fn derive_axis_bounds(sample: &[f64]) -> Result<(f64, f64), String> {
    let mut bounds: Option<(f64, f64)> = None;
    for value in sample {
        if !value.is_finite() {
            continue;
        }
        bounds = Some(match bounds {
            Some((n_min, n_max)) => (f64::min(n_min, *value), f64::max(n_max, *value)),
            None => (*value, *value),
        });
    }

    bounds.ok_or_else(|| "Axis bound sample must contain at least one finite value.".to_string())
}

/// Convert a chart dimension in centimeters to drawing-layer pixels.
pub fn convert_cm_to_px(size_cm: f64) -> Result<u32, String> {
    if !size_cm.is_finite() || size_cm <= 0.0 {
        return Err(format!(
            "Chart size must be a positive number of centimeters, got: {size_cm}."
        ));
    }

    Ok(u32::max(1, (size_cm * N_PX_PER_CM).round() as u32))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region IndexCasts

/// Cast a 1-based row index to the 0-based writer row type.
pub fn cast_row_index(row_1based: usize) -> Result<u32, String> {
    let n_row0 = row_1based
        .checked_sub(1)
        .ok_or_else(|| format!("Row index is 1-based, got: {row_1based}."))?;
    u32::try_from(n_row0).map_err(|_| format!("row index overflow: {row_1based}"))
}

/// Cast a 1-based column index to the 0-based writer column type.
pub fn cast_col_index(col_1based: usize) -> Result<u16, String> {
    let n_col0 = col_1based
        .checked_sub(1)
        .ok_or_else(|| format!("Column index is 1-based, got: {col_1based}."))?;
    u16::try_from(n_col0).map_err(|_| format!("column index overflow: {col_1based}"))
}

/// Map a writer error to user-facing text.
pub fn derive_xlsx_error_text(err: XlsxError) -> String {
    format!("xlsx write error: {err}")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_column_letters_covers_multi_letter_columns() {
        assert_eq!(derive_column_letters(1), "A");
        assert_eq!(derive_column_letters(26), "Z");
        assert_eq!(derive_column_letters(27), "AA");
        assert_eq!(derive_column_letters(703), "AAA");
        assert_eq!(derive_column_letters(16_384), "XFD");
    }

    #[test]
    fn test_parse_column_letters_round_trips_and_rejects_overflow() {
        for n_col in [1usize, 2, 25, 26, 27, 52, 702, 703, 16_384] {
            assert_eq!(parse_column_letters(&derive_column_letters(n_col)), Ok(n_col));
        }
        assert!(parse_column_letters("XFE").is_err());
        assert!(parse_column_letters("").is_err());
        assert!(parse_column_letters("A1").is_err());
    }

    #[test]
    fn test_parse_cell_anchor_accepts_lowercase_and_rejects_garbage() {
        assert_eq!(parse_cell_anchor("A1"), Ok((1, 1)));
        assert_eq!(parse_cell_anchor("b3"), Ok((3, 2)));
        assert_eq!(parse_cell_anchor(" AA10 "), Ok((10, 27)));
        assert!(parse_cell_anchor("A0").is_err());
        assert!(parse_cell_anchor("1A").is_err());
        assert!(parse_cell_anchor("A").is_err());
        assert!(parse_cell_anchor("12").is_err());
        assert!(parse_cell_anchor("A1B2").is_err());
    }

    #[test]
    fn test_range_formula_round_trip_plain_sheet() {
        let range = SpecCellRange {
            sheet_name: "Data".to_string(),
            row_min: 2,
            row_max: 10,
            col_min: 1,
            col_max: 3,
        };

        let c_formula = derive_range_formula(&range);
        assert_eq!(c_formula, "Data!$A$2:$C$10");
        assert_eq!(parse_range_formula(&c_formula), Ok(range));
    }

    #[test]
    fn test_range_formula_round_trip_quoted_sheet() {
        let range = SpecCellRange {
            sheet_name: "Run 1 'a'".to_string(),
            row_min: 1,
            row_max: 1,
            col_min: 2,
            col_max: 2,
        };

        let c_formula = derive_range_formula(&range);
        assert_eq!(c_formula, "'Run 1 ''a'''!$B$1");
        assert_eq!(parse_range_formula(&c_formula), Ok(range));
    }

    #[test]
    fn test_parse_range_formula_rejects_missing_sheet_and_inverted_ranges() {
        assert!(parse_range_formula("$A$1:$B$2").is_err());
        assert!(parse_range_formula("!$A$1").is_err());
        assert!(parse_range_formula("Data!$B$2:$A$1").is_err());
        assert!(parse_range_formula("'Data!$A$1").is_err());
    }

    #[test]
    fn test_derive_axis_bounds_ignores_non_finite_values() {
        assert_eq!(derive_axis_bounds(&[3.0, -1.5, 2.0]), Ok((-1.5, 3.0)));
        assert_eq!(
            derive_axis_bounds(&[f64::NAN, 7.0, f64::INFINITY]),
            Ok((7.0, 7.0))
        );
        assert!(derive_axis_bounds(&[]).is_err());
        assert!(derive_axis_bounds(&[f64::NAN]).is_err());
    }

    #[test]
    fn test_convert_cm_to_px_rounds_and_rejects_non_positive() {
        assert_eq!(convert_cm_to_px(10.0), Ok(378));
        assert_eq!(convert_cm_to_px(20.0), Ok(756));
        assert!(convert_cm_to_px(0.0).is_err());
        assert!(convert_cm_to_px(-1.0).is_err());
        assert!(convert_cm_to_px(f64::NAN).is_err());
    }

    #[test]
    fn test_sanitize_sheet_name_replaces_illegal_chars_and_truncates() {
        assert_eq!(sanitize_sheet_name("speed/run: 1", "_"), "speed_run_ 1");
        assert_eq!(sanitize_sheet_name("  ", "_"), "Sheet");
        assert_eq!(
            sanitize_sheet_name(&"x".repeat(40), "_"),
            "x".repeat(N_LEN_EXCEL_SHEET_NAME_MAX)
        );
    }
}
