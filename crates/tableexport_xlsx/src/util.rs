//! Stateless helper utilities used by the XLSX writer.

use tableexport_source::{EnumCellValue, EnumValueType};

use crate::conf::{
    EnumFmtKey, N_LEN_EXCEL_SHEET_NAME_MAX, N_LEVEL_EXCEL_OUTLINE_MAX, N_NCOLS_EXCEL_MAX,
    N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
use crate::spec::{
    EnumIntegerCoerceMode, EnumXlsxCellValue, SpecRowOutlineGroup, SpecSheetSlice,
    SpecXlsxReport, SpecXlsxValuePolicy,
};

////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Convert `NaN`/`Inf` to policy string; `None` for finite values.
pub fn convert_nan_inf_to_str(x: f64, value_policy: &SpecXlsxValuePolicy) -> Option<String> {
    if x.is_nan() {
        return Some(value_policy.nan_str.clone());
    }
    if x.is_infinite() {
        return Some(if x.is_sign_positive() {
            value_policy.posinf_str.clone()
        } else {
            value_policy.neginf_str.clone()
        });
    }
    None
}

fn convert_non_finite(
    x: f64,
    if_keep_missing_values: bool,
    value_policy: &SpecXlsxValuePolicy,
) -> EnumXlsxCellValue {
    if !if_keep_missing_values {
        return EnumXlsxCellValue::None;
    }
    EnumXlsxCellValue::String(
        convert_nan_inf_to_str(x, value_policy).unwrap_or_else(|| value_policy.nan_str.clone()),
    )
}

/// Normalize one source cell according to its resolved type and value policy.
///
/// Values whose shape disagrees with the resolved type fall back to text;
/// numeric text in numeric cells is parsed.
pub fn convert_cell_value(
    value: &EnumCellValue,
    value_type: EnumValueType,
    if_keep_missing_values: bool,
    value_policy: &SpecXlsxValuePolicy,
) -> EnumXlsxCellValue {
    if value.is_none() {
        return if if_keep_missing_values {
            EnumXlsxCellValue::String(value_policy.missing_value_str.clone())
        } else {
            EnumXlsxCellValue::None
        };
    }

    match value_type {
        EnumValueType::Text => EnumXlsxCellValue::String(value.to_display_string()),
        EnumValueType::Boolean => match value {
            EnumCellValue::Boolean(b) => EnumXlsxCellValue::Boolean(*b),
            _ => EnumXlsxCellValue::String(value.to_display_string()),
        },
        EnumValueType::Integer => match value {
            EnumCellValue::Integer(n) => EnumXlsxCellValue::Number(*n as f64),
            EnumCellValue::Number(n) => {
                if !n.is_finite() {
                    convert_non_finite(*n, if_keep_missing_values, value_policy)
                } else if value_policy.integer_coerce == EnumIntegerCoerceMode::Coerce {
                    EnumXlsxCellValue::Number(n.trunc())
                } else if n.fract() == 0.0 {
                    EnumXlsxCellValue::Number(*n)
                } else {
                    EnumXlsxCellValue::String(n.to_string())
                }
            }
            EnumCellValue::String(s) => {
                if let Ok(v) = s.trim().parse::<i64>() {
                    EnumXlsxCellValue::Number(v as f64)
                } else if value_policy.integer_coerce == EnumIntegerCoerceMode::Coerce
                    && let Ok(v) = s.trim().parse::<f64>()
                {
                    if v.is_finite() {
                        EnumXlsxCellValue::Number(v.trunc())
                    } else {
                        convert_non_finite(v, if_keep_missing_values, value_policy)
                    }
                } else {
                    EnumXlsxCellValue::String(s.clone())
                }
            }
            _ => EnumXlsxCellValue::String(value.to_display_string()),
        },
        EnumValueType::Decimal => match value {
            EnumCellValue::Integer(n) => EnumXlsxCellValue::Number(*n as f64),
            EnumCellValue::Number(n) => {
                if n.is_finite() {
                    EnumXlsxCellValue::Number(*n)
                } else {
                    convert_non_finite(*n, if_keep_missing_values, value_policy)
                }
            }
            EnumCellValue::String(s) => match s.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => EnumXlsxCellValue::Number(v),
                Ok(v) => convert_non_finite(v, if_keep_missing_values, value_policy),
                Err(_) => EnumXlsxCellValue::String(s.clone()),
            },
            _ => EnumXlsxCellValue::String(value.to_display_string()),
        },
    }
}

/// Pick the body format preset for a normalized value.
pub fn select_format_key(value: &EnumXlsxCellValue, value_type: EnumValueType) -> EnumFmtKey {
    match value {
        EnumXlsxCellValue::Number(_) if value_type == EnumValueType::Integer => {
            EnumFmtKey::Integer
        }
        EnumXlsxCellValue::Number(_) => EnumFmtKey::Decimal,
        EnumXlsxCellValue::Boolean(_) => EnumFmtKey::Boolean,
        EnumXlsxCellValue::String(_) | EnumXlsxCellValue::None => EnumFmtKey::Text,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Split a logical table into Excel-compliant sheet slices.
pub fn plan_sheet_slices(
    height_table: usize,
    width_table: usize,
    height_header: usize,
    sheet_name: &str,
    report: &mut SpecXlsxReport,
) -> Result<Vec<SpecSheetSlice>, String> {
    if height_header == 0 {
        return Err("height_header must be >= 1.".to_string());
    }

    let n_rows_data_max = N_NROWS_EXCEL_MAX.saturating_sub(height_header);
    if n_rows_data_max == 0 {
        return Err(format!(
            "Header too tall: height_header={height_header} exceeds Excel limit."
        ));
    }

    let mut l_col_slices = Vec::new();
    let mut n_col_start = 0;
    while n_col_start < width_table {
        let n_col_end = usize::min(width_table, n_col_start + N_NCOLS_EXCEL_MAX);
        l_col_slices.push((n_col_start, n_col_end));
        n_col_start = n_col_end;
    }
    if l_col_slices.is_empty() {
        l_col_slices.push((0, 0));
    }

    let mut l_row_slices = Vec::new();
    let mut n_row_start = 0;
    while n_row_start < height_table {
        let n_row_end = usize::min(height_table, n_row_start + n_rows_data_max);
        l_row_slices.push((n_row_start, n_row_end));
        n_row_start = n_row_end;
    }
    if l_row_slices.is_empty() {
        l_row_slices.push((0, 0));
    }

    let n_parts_total = l_col_slices.len() * l_row_slices.len();

    let mut l_sheet_parts = Vec::new();
    let mut n_idx_part = 1;
    for (col_start, col_end) in &l_col_slices {
        for (row_start, row_end) in &l_row_slices {
            let c_part_sheet_name = if n_parts_total == 1 {
                sheet_name.to_string()
            } else {
                create_sheet_identifier(sheet_name, n_idx_part)
            };

            l_sheet_parts.push(SpecSheetSlice {
                sheet_name: c_part_sheet_name,
                row_start_inclusive: *row_start,
                row_end_exclusive: *row_end,
                col_start_inclusive: *col_start,
                col_end_exclusive: *col_end,
                row_outline_groups: Vec::new(),
            });
            n_idx_part += 1;
        }
    }

    if n_parts_total > 1 {
        report.warn(format!(
            "Excel limit overflow: split into {} sheets (columns-first, then rows).",
            l_sheet_parts.len()
        ));
    }

    Ok(l_sheet_parts)
}

/// Create suffixed sheet name (`base_1`, `base_2`, ...), respecting length cap.
pub fn create_sheet_identifier(base_name: &str, part_idx_1based: usize) -> String {
    let c_sheet_name_suffix = format!("_{part_idx_1based}");
    let n_len_base_name_max = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_sheet_name_suffix.len());

    let c_sheet_name_base: String = base_name
        .chars()
        .take(usize::max(1, n_len_base_name_max))
        .collect();

    format!("{c_sheet_name_base}{c_sheet_name_suffix}")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region HierarchyOutline

/// Convert sorted indices to contiguous inclusive ranges.
pub fn derive_contiguous_ranges(sorted_indices: &[usize]) -> Vec<(usize, usize)> {
    let Some((&n_first, l_rest)) = sorted_indices.split_first() else {
        return vec![];
    };

    let mut l_contiguous_ranges = Vec::new();
    let mut n_idx_start = n_first;
    let mut n_idx_end = n_first;

    for idx in l_rest {
        if *idx == n_idx_end + 1 {
            n_idx_end = *idx;
        } else {
            l_contiguous_ranges.push((n_idx_start, n_idx_end));
            n_idx_start = *idx;
            n_idx_end = *idx;
        }
    }

    l_contiguous_ranges.push((n_idx_start, n_idx_end));
    l_contiguous_ranges
}

/// Plan nested row outline groups from per-row hierarchy depths.
///
/// A group at level `L` covers every maximal run of rows whose depth is
/// `>= L`. Levels above Excel's outline maximum are clamped. Groups are
/// ordered outermost level first, then by row.
pub fn plan_row_outline_groups(row_depths: &[usize]) -> Vec<SpecRowOutlineGroup> {
    let n_level_max = row_depths
        .iter()
        .copied()
        .max()
        .unwrap_or(0)
        .min(N_LEVEL_EXCEL_OUTLINE_MAX);

    let mut l_groups = Vec::new();
    for n_level in 1..=n_level_max {
        let l_rows_at_level: Vec<usize> = row_depths
            .iter()
            .enumerate()
            .filter_map(|(n_idx, depth)| (*depth >= n_level).then_some(n_idx))
            .collect();
        for (row_start, row_end) in derive_contiguous_ranges(&l_rows_at_level) {
            l_groups.push(SpecRowOutlineGroup {
                level: n_level,
                row_idx_start: row_start,
                row_idx_end: row_end,
            });
        }
    }
    l_groups
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
