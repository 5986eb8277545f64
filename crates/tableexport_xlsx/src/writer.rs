//! XLSX writer that drains a `TableSource` into workbook sheets.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet};
use tableexport_source::{
    ColumnId, DataFrameTableSource, EnumCellAlignment, TableSource, TableSourceError,
    collect_rows_depth_first, select_visible_column_ids,
};
use tracing::{debug, warn};

use crate::conf::{EnumFmtKey, N_LEN_EXCEL_SHEET_NAME_MAX, N_LEVEL_EXCEL_OUTLINE_MAX};
use crate::error::XlsxExportError;
use crate::spec::{
    EnumAutofitColumnsRule, EnumXlsxCellValue, SpecAutofitCellsPolicy, SpecCellFormat,
    SpecSheetSlice, SpecTableSheetWriteOptions, SpecXlsxFormatSet, SpecXlsxReport,
    SpecXlsxWriteOptions,
};
use crate::util::{
    convert_cell_value, plan_row_outline_groups, plan_sheet_slices, sanitize_sheet_name,
    select_format_key,
};

const N_HEIGHT_HEADER: usize = 1;

const TUP_FMT_KEYS_BODY: [EnumFmtKey; 4] = [
    EnumFmtKey::Text,
    EnumFmtKey::Integer,
    EnumFmtKey::Decimal,
    EnumFmtKey::Boolean,
];

/// Body formats resolved per (preset, alignment).
struct BodyFormats {
    dict_formats: BTreeMap<(EnumFmtKey, EnumCellAlignment), Format>,
    fmt_fallback: Format,
}

impl BodyFormats {
    fn new(formats: &SpecXlsxFormatSet) -> Self {
        let mut dict_formats = BTreeMap::new();
        for key in TUP_FMT_KEYS_BODY {
            for (alignment, c_align) in [
                (EnumCellAlignment::Left, "left"),
                (EnumCellAlignment::Right, "right"),
            ] {
                let fmt_aligned = formats.get(key).with_(SpecCellFormat {
                    align: Some(c_align.to_string()),
                    ..Default::default()
                });
                dict_formats.insert((key, alignment), derive_rust_xlsx_format(&fmt_aligned));
            }
        }

        Self {
            dict_formats,
            fmt_fallback: derive_rust_xlsx_format(&formats.text),
        }
    }

    fn get(&self, key: EnumFmtKey, alignment: EnumCellAlignment) -> &Format {
        self.dict_formats
            .get(&(key, alignment))
            .unwrap_or(&self.fmt_fallback)
    }
}

/// One body cell read from the source, already normalized for the workbook.
struct BufferedCell {
    value: EnumXlsxCellValue,
    key_fmt: EnumFmtKey,
    alignment: EnumCellAlignment,
}

/// Stateful workbook writer.
pub struct XlsxWriter {
    path_file_out: PathBuf,
    workbook: Workbook,
    formats: SpecXlsxFormatSet,
    write_options: SpecXlsxWriteOptions,
    set_sheet_names_existing: BTreeSet<String>,
    l_reports: Vec<SpecXlsxReport>,
    if_closed: bool,
}

impl XlsxWriter {
    /// Create writer bound to output path and format/options presets.
    ///
    /// The workbook is buffered in memory until [`Self::close`] is called.
    pub fn new(
        path_file_out: PathBuf,
        formats: SpecXlsxFormatSet,
        write_options: SpecXlsxWriteOptions,
    ) -> Self {
        Self {
            path_file_out,
            workbook: Workbook::new(),
            formats,
            write_options,
            set_sheet_names_existing: BTreeSet::new(),
            l_reports: Vec::new(),
            if_closed: false,
        }
    }

    /// Create writer with default presets and options.
    pub fn with_defaults(path_file_out: PathBuf) -> Self {
        Self::new(
            path_file_out,
            SpecXlsxFormatSet::default(),
            SpecXlsxWriteOptions::default(),
        )
    }

    /// Return output file path as string.
    pub fn file_out(&self) -> String {
        self.path_file_out.to_string_lossy().to_string()
    }

    /// Return immutable snapshot of per-table write reports.
    pub fn report(&self) -> Vec<SpecXlsxReport> {
        self.l_reports.clone()
    }

    /// Flush workbook to disk. Idempotent.
    pub fn close(&mut self) -> Result<(), XlsxExportError> {
        if self.if_closed {
            return Ok(());
        }
        self.workbook.save(&self.path_file_out)?;
        self.if_closed = true;
        debug!(file_out = %self.path_file_out.display(), "workbook saved");
        Ok(())
    }

    /// Write one table from IPC-serialized dataframe bytes.
    pub fn write_table_from_ipc_bytes(
        &mut self,
        v_ipc_df: &[u8],
        table_name: &str,
        options: &SpecTableSheetWriteOptions,
    ) -> Result<(), XlsxExportError> {
        if self.if_closed {
            return Err(XlsxExportError::Closed);
        }
        let source = DataFrameTableSource::from_ipc_bytes(v_ipc_df)
            .map_err(|err| XlsxExportError::with_table(table_name, err))?;
        self.write_table(&source, table_name, options)
    }

    /// Write one table as one sheet (or several when Excel limits overflow).
    ///
    /// The whole table is read before any sheet is created. Sheets are added
    /// to the workbook and their names reserved only when every step
    /// succeeded, so a failed call leaves the workbook unchanged.
    pub fn write_table<S>(
        &mut self,
        source: &S,
        table_name: &str,
        options: &SpecTableSheetWriteOptions,
    ) -> Result<(), XlsxExportError>
    where
        S: TableSource + ?Sized,
    {
        if self.if_closed {
            return Err(XlsxExportError::Closed);
        }
        validate_policy_autofit(&options.policy_autofit)?;

        let to_export_error = |err: TableSourceError| XlsxExportError::with_table(table_name, err);

        let if_keep_missing_values = options
            .if_keep_missing_values
            .unwrap_or(self.write_options.keep_missing_values);
        let value_policy = &self.write_options.value_policy;

        ////////////////////////////////////////////////////////////////////////
        // #region ReadSource

        let l_column_ids: Vec<ColumnId> = if options.if_include_hidden_columns {
            source.column_ids().to_vec()
        } else {
            select_visible_column_ids(source).map_err(to_export_error)?
        };
        let l_headers = l_column_ids
            .iter()
            .map(|column_id| source.column_header(column_id))
            .collect::<Result<Vec<_>, _>>()
            .map_err(to_export_error)?;
        let l_rows = collect_rows_depth_first(source).map_err(to_export_error)?;

        let mut l_cells: Vec<Vec<BufferedCell>> = Vec::with_capacity(l_rows.len());
        for row in &l_rows {
            let mut l_row_cells = Vec::with_capacity(l_column_ids.len());
            for column_id in &l_column_ids {
                let value_raw = source
                    .cell_value(&row.item_id, column_id)
                    .map_err(to_export_error)?;
                let alignment = source
                    .cell_alignment(&row.item_id, column_id)
                    .map_err(to_export_error)?;
                let value_type = source
                    .cell_value_type(&row.item_id, column_id)
                    .map_err(to_export_error)?;

                let value =
                    convert_cell_value(&value_raw, value_type, if_keep_missing_values, value_policy);
                let key_fmt = select_format_key(&value, value_type);
                l_row_cells.push(BufferedCell {
                    value,
                    key_fmt,
                    alignment,
                });
            }
            l_cells.push(l_row_cells);
        }

        // #endregion
        ////////////////////////////////////////////////////////////////////////
        // #region BuildSheets

        let mut report = SpecXlsxReport {
            table_name: table_name.to_string(),
            n_rows: l_rows.len(),
            n_columns: l_column_ids.len(),
            ..Default::default()
        };

        let if_group_rows = options.if_group_hierarchy && source.is_hierarchical();
        let n_depth_max = l_rows.iter().map(|row| row.depth).max().unwrap_or(0);
        if if_group_rows && n_depth_max > N_LEVEL_EXCEL_OUTLINE_MAX {
            report.warn(format!(
                "Hierarchy depth {n_depth_max} exceeds Excel outline limit; \
                 levels beyond {N_LEVEL_EXCEL_OUTLINE_MAX} are flattened."
            ));
        }

        let l_sheet_parts = plan_sheet_slices(
            l_rows.len(),
            l_column_ids.len(),
            N_HEIGHT_HEADER,
            &sanitize_sheet_name(table_name, "_"),
            &mut report,
        )
        .map_err(XlsxExportError::InvalidOptions)?;

        let n_row_freeze = options.row_freeze.unwrap_or(N_HEIGHT_HEADER);
        let fmt_header = derive_rust_xlsx_format(&self.formats.header);
        let formats_body = BodyFormats::new(&self.formats);
        let if_autofit_columns = !matches!(
            options.policy_autofit.rule_columns,
            EnumAutofitColumnsRule::None
        );
        let n_rows_autofit_max = options
            .policy_autofit
            .height_body_inferred_max
            .unwrap_or(usize::MAX);

        let mut set_sheet_names_pending = BTreeSet::new();
        let mut l_worksheets = Vec::with_capacity(l_sheet_parts.len());

        for sheet_slice in l_sheet_parts {
            let sheet_name_unique =
                self.derive_unique_sheet_name(&sheet_slice.sheet_name, &set_sheet_names_pending);
            set_sheet_names_pending.insert(sheet_name_unique.to_lowercase());

            let mut worksheet = Worksheet::new();
            worksheet.set_name(&sheet_name_unique)?;

            let n_col_start = sheet_slice.col_start_inclusive;
            let n_col_end = sheet_slice.col_end_exclusive;
            let n_width_slice = n_col_end - n_col_start;
            let l_rows_slice =
                &l_rows[sheet_slice.row_start_inclusive..sheet_slice.row_end_exclusive];
            let l_cells_slice =
                &l_cells[sheet_slice.row_start_inclusive..sheet_slice.row_end_exclusive];

            let mut l_width_by_col_header = vec![0usize; n_width_slice];
            let mut l_width_by_col_body = vec![0usize; n_width_slice];

            for (n_idx_col, c_header) in l_headers[n_col_start..n_col_end].iter().enumerate() {
                if c_header.is_empty() {
                    worksheet.write_blank(0, cast_col_num(n_idx_col)?, &fmt_header)?;
                } else {
                    worksheet.write_string_with_format(
                        0,
                        cast_col_num(n_idx_col)?,
                        c_header,
                        &fmt_header,
                    )?;
                    l_width_by_col_header[n_idx_col] = estimate_unicode_string_width(c_header);
                }
            }

            worksheet.set_freeze_panes(
                cast_row_num(n_row_freeze)?,
                cast_col_num(options.col_freeze)?,
            )?;

            for (n_row_local, l_row_cells) in l_cells_slice.iter().enumerate() {
                let if_measure_row = if_autofit_columns && n_row_local < n_rows_autofit_max;
                for (n_idx_col, cell) in l_row_cells[n_col_start..n_col_end].iter().enumerate() {
                    if if_measure_row {
                        l_width_by_col_body[n_idx_col] = usize::max(
                            l_width_by_col_body[n_idx_col],
                            estimate_width_len(&cell.value, cell.key_fmt),
                        );
                    }
                    write_cell_with_format(
                        &mut worksheet,
                        N_HEIGHT_HEADER + n_row_local,
                        n_idx_col,
                        &cell.value,
                        formats_body.get(cell.key_fmt, cell.alignment),
                    )?;
                }
            }

            let l_outline_groups = if if_group_rows {
                let l_depths: Vec<usize> = l_rows_slice.iter().map(|row| row.depth).collect();
                plan_row_outline_groups(&l_depths)
            } else {
                Vec::new()
            };
            for group in &l_outline_groups {
                worksheet.group_rows(
                    cast_row_num(N_HEIGHT_HEADER + group.row_idx_start)?,
                    cast_row_num(N_HEIGHT_HEADER + group.row_idx_end)?,
                )?;
            }

            if if_autofit_columns {
                let n_min = usize::max(1, options.policy_autofit.width_cell_min);
                let n_max = usize::min(
                    255,
                    usize::max(n_min, options.policy_autofit.width_cell_max),
                );
                let n_pad = options.policy_autofit.width_cell_padding;

                for n_idx_col in 0..n_width_slice {
                    let n_width_recorded = match options.policy_autofit.rule_columns {
                        EnumAutofitColumnsRule::Body => l_width_by_col_body[n_idx_col],
                        EnumAutofitColumnsRule::All => usize::max(
                            l_width_by_col_header[n_idx_col],
                            l_width_by_col_body[n_idx_col],
                        ),
                        EnumAutofitColumnsRule::Header | EnumAutofitColumnsRule::None => {
                            l_width_by_col_header[n_idx_col]
                        }
                    };
                    let n_width_final =
                        usize::min(n_max, usize::max(n_min, n_width_recorded + n_pad));
                    worksheet.set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)?;
                }
            }

            debug!(
                table = table_name,
                sheet = %sheet_name_unique,
                n_rows = l_rows_slice.len(),
                n_columns = n_width_slice,
                n_outline_groups = l_outline_groups.len(),
                "sheet built"
            );

            l_worksheets.push(worksheet);
            report.sheets.push(SpecSheetSlice {
                sheet_name: sheet_name_unique,
                row_outline_groups: l_outline_groups,
                ..sheet_slice
            });
        }

        // #endregion
        ////////////////////////////////////////////////////////////////////////

        for worksheet in l_worksheets {
            self.workbook.push_worksheet(worksheet);
        }
        self.set_sheet_names_existing.extend(set_sheet_names_pending);

        for c_warning in &report.warnings {
            warn!(table = table_name, "{c_warning}");
        }
        self.l_reports.push(report);
        Ok(())
    }

    fn derive_unique_sheet_name(
        &self,
        name: &str,
        set_sheet_names_pending: &BTreeSet<String>,
    ) -> String {
        // Excel compares sheet names case-insensitively.
        let if_taken = |candidate: &str| {
            let c_key = candidate.to_lowercase();
            self.set_sheet_names_existing.contains(&c_key) || set_sheet_names_pending.contains(&c_key)
        };
        if !if_taken(name) {
            return name.to_string();
        }

        let mut n_idx = 2usize;
        loop {
            let c_suffix = format!("__{n_idx}");
            let n_len_base_max = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_suffix.len());
            let c_base: String = name.chars().take(usize::max(1, n_len_base_max)).collect();
            let candidate = format!("{c_base}{c_suffix}");
            if !if_taken(&candidate) {
                return candidate;
            }
            n_idx += 1;
        }
    }
}

/// Estimate displayed width units for one normalized cell value.
///
/// Used by autofit inference logic.
pub fn estimate_width_len(value: &EnumXlsxCellValue, key_fmt: EnumFmtKey) -> usize {
    match value {
        EnumXlsxCellValue::None => 0,
        EnumXlsxCellValue::String(s) => estimate_unicode_string_width(s),
        EnumXlsxCellValue::Boolean(b) => {
            if *b {
                4
            } else {
                5
            }
        }
        EnumXlsxCellValue::Number(n) => match key_fmt {
            EnumFmtKey::Integer => (*n as i64).to_string().len(),
            _ => format!("{n:.4}").len(),
        },
    }
}

fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

fn validate_policy_autofit(policy_autofit: &SpecAutofitCellsPolicy) -> Result<(), XlsxExportError> {
    if policy_autofit.width_cell_min == 0 {
        return Err(XlsxExportError::InvalidOptions(
            "policy_autofit.width_cell_min must be >= 1.".to_string(),
        ));
    }
    if policy_autofit.width_cell_max < policy_autofit.width_cell_min {
        return Err(XlsxExportError::InvalidOptions(
            "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min.".to_string(),
        ));
    }
    Ok(())
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumXlsxCellValue,
    format: &Format,
) -> Result<(), XlsxExportError> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match value {
        EnumXlsxCellValue::None => {
            worksheet.write_blank(n_row, n_col, format)?;
        }
        EnumXlsxCellValue::String(val) => {
            worksheet.write_string_with_format(n_row, n_col, val, format)?;
        }
        EnumXlsxCellValue::Number(val) => {
            worksheet.write_number_with_format(n_row, n_col, *val, format)?;
        }
        EnumXlsxCellValue::Boolean(val) => {
            worksheet.write_boolean_with_format(n_row, n_col, *val, format)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }

    format
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    match align.trim().to_ascii_lowercase().as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32, XlsxExportError> {
    u32::try_from(value)
        .map_err(|_| XlsxExportError::IndexOverflow(format!("row index {value}")))
}

fn cast_col_num(value: usize) -> Result<u16, XlsxExportError> {
    u16::try_from(value)
        .map_err(|_| XlsxExportError::IndexOverflow(format!("column index {value}")))
}

#[cfg(test)]
mod tests {
    use polars::df;
    use polars::prelude::{IpcWriter, SerWriter};
    use tableexport_source::{
        Column as GridColumn, DataProvider, EnumCellValue, EnumValueType, Grid, GridTableSource,
        ListDataProvider, TreeData,
    };

    use super::*;
    use crate::spec::SpecRowOutlineGroup;

    #[derive(Debug, Clone)]
    struct Order {
        id: &'static str,
        amount: f64,
        note: Option<&'static str>,
    }

    fn build_order_grid() -> Grid<Order> {
        Grid::new(ListDataProvider::new(vec![
            Order {
                id: "A1",
                amount: 42.5,
                note: Some("first"),
            },
            Order {
                id: "B2",
                amount: f64::NAN,
                note: None,
            },
        ]))
        .with_column(GridColumn::new("id", |o: &Order| o.id.into()))
        .with_column(
            GridColumn::new("amount", |o: &Order| o.amount.into())
                .with_caption("Amount")
                .with_presentation_type(EnumValueType::Decimal),
        )
        .with_column(GridColumn::new("note", |o: &Order| o.note.into()).with_hidden(true))
    }

    struct TornDownProvider;

    impl DataProvider<Order> for TornDownProvider {
        fn fetch(&self) -> Result<Vec<Order>, TableSourceError> {
            Err(TableSourceError::data_access("grid detached"))
        }
    }

    #[test]
    fn test_write_flat_grid_skips_hidden_columns() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("orders.xlsx");
        let grid = build_order_grid();
        let source = GridTableSource::new(&grid).expect("source");

        let mut writer = XlsxWriter::with_defaults(path.clone());
        writer
            .write_table(&source, "Orders", &SpecTableSheetWriteOptions::default())
            .expect("write");
        writer.close().expect("close");

        let l_reports = writer.report();
        assert_eq!(l_reports.len(), 1);
        assert_eq!(l_reports[0].table_name, "Orders");
        assert_eq!(l_reports[0].n_rows, 2);
        assert_eq!(l_reports[0].n_columns, 2);
        assert_eq!(l_reports[0].sheets[0].sheet_name, "Orders");
        assert!(path.exists());
        assert!(std::fs::metadata(&path).expect("metadata").len() > 0);
    }

    #[test]
    fn test_write_includes_hidden_columns_on_request() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let grid = build_order_grid();
        let source = GridTableSource::new(&grid).expect("source");
        let options = SpecTableSheetWriteOptions {
            if_include_hidden_columns: true,
            if_keep_missing_values: Some(true),
            ..SpecTableSheetWriteOptions::default()
        };

        let mut writer = XlsxWriter::with_defaults(tmp.path().join("all.xlsx"));
        writer.write_table(&source, "All", &options).expect("write");
        assert_eq!(writer.report()[0].n_columns, 3);
    }

    #[test]
    fn test_write_hierarchical_grid_groups_children() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("tree.xlsx");

        let mut tree = TreeData::new();
        tree.add_item(None, "R").expect("root");
        tree.add_items(Some(&"R"), ["C1", "C2"]).expect("children");
        tree.add_item(Some(&"C1"), "G1").expect("grandchild");
        let grid = Grid::new(tree)
            .with_column(GridColumn::new("name", |s: &&'static str| (*s).into()))
            .with_column(GridColumn::new("len", |s: &&'static str| {
                EnumCellValue::Integer(s.len() as i64)
            }));
        let source = GridTableSource::new(&grid).expect("source");

        let mut writer = XlsxWriter::with_defaults(path.clone());
        writer
            .write_table(&source, "Tree", &SpecTableSheetWriteOptions::default())
            .expect("write");
        writer
            .write_table(
                &source,
                "Flat",
                &SpecTableSheetWriteOptions {
                    if_group_hierarchy: false,
                    ..SpecTableSheetWriteOptions::default()
                },
            )
            .expect("write");
        writer.close().expect("close");

        let l_reports = writer.report();
        assert_eq!(l_reports[0].n_rows, 4);
        assert!(l_reports[0].warnings.is_empty());
        // Rows: R, C1, G1, C2.
        assert_eq!(
            l_reports[0].sheets[0].row_outline_groups,
            vec![
                SpecRowOutlineGroup {
                    level: 1,
                    row_idx_start: 1,
                    row_idx_end: 3,
                },
                SpecRowOutlineGroup {
                    level: 2,
                    row_idx_start: 2,
                    row_idx_end: 2,
                },
            ]
        );
        assert!(l_reports[1].sheets[0].row_outline_groups.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_deep_hierarchy_is_clamped_with_warning() {
        let tmp = tempfile::tempdir().expect("tempdir");

        let mut tree = TreeData::new();
        tree.add_item(None, 0_usize).expect("root");
        for n_node in 1..10_usize {
            tree.add_item(Some(&(n_node - 1)), n_node).expect("child");
        }
        let grid = Grid::new(tree).with_column(GridColumn::new("node", |n: &usize| {
            EnumCellValue::Integer(*n as i64)
        }));
        let source = GridTableSource::new(&grid).expect("source");

        let mut writer = XlsxWriter::with_defaults(tmp.path().join("deep.xlsx"));
        writer
            .write_table(&source, "Deep", &SpecTableSheetWriteOptions::default())
            .expect("write");
        writer.close().expect("close");

        let report = &writer.report()[0];
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("outline limit"));

        let l_groups = &report.sheets[0].row_outline_groups;
        assert_eq!(l_groups.len(), N_LEVEL_EXCEL_OUTLINE_MAX);
        assert_eq!(
            l_groups.iter().map(|g| g.level).max(),
            Some(N_LEVEL_EXCEL_OUTLINE_MAX)
        );
        // Innermost kept level spans every row at depth 7 and below.
        assert_eq!(l_groups[N_LEVEL_EXCEL_OUTLINE_MAX - 1].row_idx_start, 7);
        assert_eq!(l_groups[N_LEVEL_EXCEL_OUTLINE_MAX - 1].row_idx_end, 9);
    }

    #[test]
    fn test_write_dataframe_source() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let df = df!(
            "id" => ["A1", "B2"],
            "qty" => [3_i64, 4_i64]
        )
        .expect("df");
        let source = DataFrameTableSource::new(&df).expect("source");

        let mut writer = XlsxWriter::with_defaults(tmp.path().join("df.xlsx"));
        writer
            .write_table(&source, "Frame", &SpecTableSheetWriteOptions::default())
            .expect("write");
        writer.close().expect("close");
        assert_eq!(writer.report()[0].n_columns, 2);
    }

    #[test]
    fn test_write_table_from_ipc_bytes() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("ipc.xlsx");
        let mut df = df!(
            "id" => ["A1", "B2", "C3"],
            "amount" => [1.5_f64, 2.0, 3.25]
        )
        .expect("df");
        let mut v_ipc_df: Vec<u8> = Vec::new();
        IpcWriter::new(&mut v_ipc_df)
            .finish(&mut df)
            .expect("ipc encode");

        let mut writer = XlsxWriter::with_defaults(path.clone());
        assert_eq!(writer.file_out(), path.to_string_lossy());
        writer
            .write_table_from_ipc_bytes(&v_ipc_df, "Ipc", &SpecTableSheetWriteOptions::default())
            .expect("write");

        let err = writer
            .write_table_from_ipc_bytes(b"garbage", "Bad", &SpecTableSheetWriteOptions::default())
            .expect_err("must fail");
        assert!(matches!(
            &err,
            XlsxExportError::Source { table, source } if table == "Bad" && source.kind() == "DataAccessError"
        ));
        writer.close().expect("close");

        let l_reports = writer.report();
        assert_eq!(l_reports.len(), 1);
        assert_eq!(l_reports[0].n_rows, 3);
        assert_eq!(l_reports[0].n_columns, 2);
        assert!(path.exists());
    }

    /// Three rows; reading any cell of row index 1 fails.
    struct FlakySource {
        column_ids: Vec<ColumnId>,
    }

    impl TableSource for FlakySource {
        type ItemId = usize;

        fn column_ids(&self) -> &[ColumnId] {
            &self.column_ids
        }

        fn is_hierarchical(&self) -> bool {
            false
        }

        fn root_item_ids(&self) -> Result<Vec<usize>, TableSourceError> {
            self.item_ids()
        }

        fn item_ids(&self) -> Result<Vec<usize>, TableSourceError> {
            Ok(vec![0, 1, 2])
        }

        fn children(&self, _item_id: &usize) -> Result<Vec<usize>, TableSourceError> {
            Ok(Vec::new())
        }

        fn column_header(&self, column_id: &ColumnId) -> Result<String, TableSourceError> {
            Ok(column_id.to_string())
        }

        fn is_column_hidden(&self, _column_id: &ColumnId) -> Result<bool, TableSourceError> {
            Ok(false)
        }

        fn cell_alignment(
            &self,
            _item_id: &usize,
            _column_id: &ColumnId,
        ) -> Result<EnumCellAlignment, TableSourceError> {
            Ok(EnumCellAlignment::Right)
        }

        fn cell_value(
            &self,
            item_id: &usize,
            _column_id: &ColumnId,
        ) -> Result<EnumCellValue, TableSourceError> {
            if *item_id == 1 {
                return Err(TableSourceError::data_access("connection lost"));
            }
            Ok(EnumCellValue::Integer(*item_id as i64))
        }

        fn cell_value_type(
            &self,
            _item_id: &usize,
            _column_id: &ColumnId,
        ) -> Result<EnumValueType, TableSourceError> {
            Ok(EnumValueType::Integer)
        }
    }

    #[test]
    fn test_failed_write_leaves_workbook_unchanged() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let source = FlakySource {
            column_ids: vec![ColumnId::from("n")],
        };
        let options = SpecTableSheetWriteOptions::default();

        let mut writer = XlsxWriter::with_defaults(tmp.path().join("flaky.xlsx"));
        let err = writer
            .write_table(&source, "Broken", &options)
            .expect_err("must fail");
        assert!(matches!(err, XlsxExportError::Source { .. }));
        assert!(writer.workbook.worksheet_from_index(0).is_err());
        assert!(writer.set_sheet_names_existing.is_empty());
        assert!(writer.report().is_empty());

        // The name stays free for a later successful table.
        let grid = build_order_grid();
        let source_ok = GridTableSource::new(&grid).expect("source");
        writer
            .write_table(&source_ok, "Broken", &options)
            .expect("write");
        assert_eq!(writer.report()[0].sheets[0].sheet_name, "Broken");
        assert!(writer.workbook.worksheet_from_index(0).is_ok());
        assert!(writer.workbook.worksheet_from_index(1).is_err());
        writer.close().expect("close");
    }

    #[test]
    fn test_unique_sheet_names_for_long_repeated_name() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut writer = XlsxWriter::with_defaults(tmp.path().join("long.xlsx"));
        let c_name = "A".repeat(N_LEN_EXCEL_SHEET_NAME_MAX);
        let set_pending = BTreeSet::new();

        let mut l_names = Vec::new();
        for _ in 0..12 {
            let c_unique = writer.derive_unique_sheet_name(&c_name, &set_pending);
            writer
                .set_sheet_names_existing
                .insert(c_unique.to_lowercase());
            l_names.push(c_unique);
        }

        let set_distinct: BTreeSet<&String> = l_names.iter().collect();
        assert_eq!(set_distinct.len(), 12);
        assert!(
            l_names
                .iter()
                .all(|c| c.chars().count() <= N_LEN_EXCEL_SHEET_NAME_MAX)
        );
        assert_eq!(l_names[0], c_name);
        assert!(l_names[11].ends_with("__12"));
    }

    #[test]
    fn test_source_failure_reports_table_and_kind() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let grid = Grid::new(TornDownProvider)
            .with_column(GridColumn::new("id", |o: &Order| o.id.into()));
        let source = GridTableSource::new(&grid).expect("source");

        let mut writer = XlsxWriter::with_defaults(tmp.path().join("broken.xlsx"));
        let err = writer
            .write_table(&source, "Broken", &SpecTableSheetWriteOptions::default())
            .expect_err("must fail");

        match &err {
            XlsxExportError::Source { table, source } => {
                assert_eq!(table, "Broken");
                assert_eq!(source.kind(), "DataAccessError");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let c_msg = err.to_string();
        assert!(c_msg.contains("Broken"));
        assert!(c_msg.contains("DataAccessError"));
        assert!(writer.report().is_empty());
    }

    #[test]
    fn test_write_after_close_is_rejected() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let grid = build_order_grid();
        let source = GridTableSource::new(&grid).expect("source");

        let mut writer = XlsxWriter::with_defaults(tmp.path().join("closed.xlsx"));
        writer.close().expect("close");
        writer.close().expect("close is idempotent");
        assert!(matches!(
            writer.write_table(&source, "Late", &SpecTableSheetWriteOptions::default()),
            Err(XlsxExportError::Closed)
        ));
    }

    #[test]
    fn test_repeated_table_names_get_unique_sheets() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let grid = build_order_grid();
        let source = GridTableSource::new(&grid).expect("source");
        let options = SpecTableSheetWriteOptions::default();

        let mut writer = XlsxWriter::with_defaults(tmp.path().join("dup.xlsx"));
        writer.write_table(&source, "Orders", &options).expect("write");
        writer.write_table(&source, "orders", &options).expect("write");
        writer.write_table(&source, "Or/ders", &options).expect("write");

        let l_names: Vec<String> = writer
            .report()
            .into_iter()
            .map(|r| r.sheets[0].sheet_name.clone())
            .collect();
        assert_eq!(l_names, vec!["Orders", "orders__2", "Or_ders"]);
    }

    #[test]
    fn test_invalid_autofit_policy_is_rejected() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let grid = build_order_grid();
        let source = GridTableSource::new(&grid).expect("source");
        let options = SpecTableSheetWriteOptions {
            policy_autofit: SpecAutofitCellsPolicy {
                width_cell_min: 0,
                ..SpecAutofitCellsPolicy::default()
            },
            ..SpecTableSheetWriteOptions::default()
        };

        let mut writer = XlsxWriter::with_defaults(tmp.path().join("bad.xlsx"));
        assert!(matches!(
            writer.write_table(&source, "Bad", &options),
            Err(XlsxExportError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_estimate_width_len() {
        assert_eq!(
            estimate_width_len(&EnumXlsxCellValue::Number(1234.0), EnumFmtKey::Integer),
            4
        );
        assert_eq!(
            estimate_width_len(&EnumXlsxCellValue::Number(1.5), EnumFmtKey::Decimal),
            6
        );
        assert_eq!(
            estimate_width_len(&EnumXlsxCellValue::String("ab".into()), EnumFmtKey::Text),
            2
        );
        assert_eq!(estimate_width_len(&EnumXlsxCellValue::None, EnumFmtKey::Text), 0);
    }
}
