use crate::error::{DashboardError, Result};
use crate::loader::COLUMNS;
use crate::orders::OrderRecord;

/// Export format accepted by the download route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            other => Err(DashboardError::BadRequest(format!(
                "unsupported export format '{}'",
                other
            ))),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "orders.csv",
            ExportFormat::Xlsx => "orders.xlsx",
        }
    }
}

fn text_fields(record: &OrderRecord) -> [String; 7] {
    [
        record.order_date.format("%Y-%m-%d").to_string(),
        record.city.clone(),
        record.state.clone(),
        record.region.clone(),
        record.category.clone(),
        record.segment.clone(),
        record.ship_mode.clone(),
    ]
}

/// Convert order rows to CSV
///
/// Writes a header row with the source column names followed by one line per
/// order. Dates are written as `YYYY-MM-DD`; quoting is handled by the csv
/// writer.
///
/// # Arguments
/// * `rows` - Orders to export, usually a filtered subset of the table
///
/// # Returns
/// * `Result<Vec<u8>>` - CSV content as UTF-8 bytes
pub fn to_csv(rows: &[&OrderRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(COLUMNS)?;

    for record in rows {
        let [date, city, state, region, category, segment, ship_mode] = text_fields(record);
        writer.write_record([
            date,
            city,
            state,
            region,
            category,
            segment,
            ship_mode,
            record.sales.to_string(),
            record.profit.to_string(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| DashboardError::Export(e.to_string()))
}

/// Convert order rows to an XLSX workbook
///
/// The workbook has a single `Orders` sheet with a bold header row, so the
/// file can be loaded again by [`crate::loader::load_orders`].
///
/// # Arguments
/// * `rows` - Orders to export
///
/// # Returns
/// * `Result<Vec<u8>>` - XLSX file content as bytes
#[cfg(feature = "web")]
pub fn to_xlsx(rows: &[&OrderRecord]) -> Result<Vec<u8>> {
    use rust_xlsxwriter::{Format, Workbook};

    let export_err = |e: rust_xlsxwriter::XlsxError| DashboardError::Export(e.to_string());

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(crate::loader::DEFAULT_SHEET)
        .map_err(export_err)?;

    let bold = Format::new().set_bold();
    for (col, name) in COLUMNS.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *name, &bold)
            .map_err(export_err)?;
    }

    for (i, record) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        for (col, value) in text_fields(record).into_iter().enumerate() {
            worksheet
                .write_string(row, col as u16, value)
                .map_err(export_err)?;
        }
        worksheet
            .write_number(row, 7, record.sales)
            .map_err(export_err)?;
        worksheet
            .write_number(row, 8, record.profit)
            .map_err(export_err)?;
    }

    workbook.save_to_buffer().map_err(export_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::OrderFilter;
    use crate::orders::fixtures::sample_table;

    #[test]
    fn test_export_format_parse() {
        assert_eq!(ExportFormat::parse("CSV").unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::parse("xlsx").unwrap(), ExportFormat::Xlsx);
        assert!(matches!(
            ExportFormat::parse("pdf"),
            Err(DashboardError::BadRequest(_))
        ));
    }

    #[test]
    fn test_to_csv_writes_header_and_filtered_rows() {
        let table = sample_table();
        let rows = table.filter(&OrderFilter::new(Some("Los Angeles"), Some("Technology")));
        let csv = String::from_utf8(to_csv(&rows).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "Order Date,City,State,Region,Category,Segment,Ship Mode,Sales,Profit"
        );
        assert_eq!(
            lines[1],
            "2014-06-09,Los Angeles,California,West,Technology,Consumer,Standard Class,907.15,90.72"
        );
        assert_eq!(lines.len(), 2);
    }

    #[cfg(feature = "web")]
    #[test]
    fn test_xlsx_export_loads_back() {
        let table = sample_table();
        let rows = table.filter(&OrderFilter::new(None, Some("Furniture")));
        let bytes = to_xlsx(&rows).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.xlsx");
        std::fs::write(&path, bytes).unwrap();

        let loaded = crate::loader::load_orders(&path, crate::loader::DEFAULT_SHEET).unwrap();
        let expected: Vec<OrderRecord> = rows.into_iter().cloned().collect();
        assert_eq!(loaded.records(), expected.as_slice());
    }
}
