use crate::error::{DashboardError, Result};
use crate::orders::{OrderRecord, OrdersTable};
use chrono::{Days, NaiveDate, NaiveDateTime};
use std::path::Path;

/// Sheet the order records live in
pub const DEFAULT_SHEET: &str = "Orders";

/// Header names of the columns the dashboard needs, in `OrderRecord` order
pub const COLUMNS: [&str; 9] = [
    "Order Date",
    "City",
    "State",
    "Region",
    "Category",
    "Segment",
    "Ship Mode",
    "Sales",
    "Profit",
];

/// Cell value as read from either a workbook or a CSV file
#[derive(Debug, Clone, PartialEq)]
enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Error(String),
}

impl RawCell {
    fn is_empty(&self) -> bool {
        matches!(self, RawCell::Empty)
    }
}

/// Load the order table from a workbook or CSV file
///
/// The reader is picked from the file extension: `xlsx`, `xlsm`, `xls` and
/// `ods` are read as workbooks, `csv` as comma-separated text.
///
/// # Arguments
/// * `path` - Path to the data file
/// * `sheet` - Worksheet holding the orders (ignored for CSV)
///
/// # Returns
/// * `Result<OrdersTable>` - The loaded table or the first error found
///
/// # Examples
/// ```no_run
/// use sales_dashboard::loader::{load_orders, DEFAULT_SHEET};
///
/// match load_orders("Superstore_Sales.xlsx", DEFAULT_SHEET) {
///     Ok(table) => println!("Loaded {} orders", table.len()),
///     Err(e) => eprintln!("Error loading orders: {}", e),
/// }
/// ```
pub fn load_orders(path: impl AsRef<Path>, sheet: &str) -> Result<OrdersTable> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    let table = match extension.as_deref() {
        Some("csv") => from_csv(path)?,
        #[cfg(feature = "web")]
        Some("xlsx") | Some("xlsm") | Some("xls") | Some("ods") => from_workbook(path, sheet)?,
        #[cfg(not(feature = "web"))]
        Some("xlsx") | Some("xlsm") | Some("xls") | Some("ods") => {
            let _ = sheet;
            return Err(DashboardError::UnsupportedFormat(
                "workbook support requires the 'web' feature".to_string(),
            ));
        }
        Some(ext) => return Err(DashboardError::UnsupportedFormat(ext.to_string())),
        None => {
            return Err(DashboardError::UnsupportedFormat(
                "file has no extension".to_string(),
            ));
        }
    };

    log::info!("Loaded {} orders from {}", table.len(), path.display());
    Ok(table)
}

/// Load the order table from a worksheet of an Excel or OpenDocument file
///
/// The first row of the sheet is the header. Columns are looked up by name,
/// so their order does not matter and extra columns are ignored. Rows where
/// every cell is blank are skipped.
///
/// # Arguments
/// * `path` - Path to the workbook
/// * `sheet` - Name of the worksheet to read
///
/// # Returns
/// * `Result<OrdersTable>` - The loaded table, or `MissingSheet`,
///   `MissingColumn` or `InvalidCell` describing the first problem
#[cfg(feature = "web")]
pub fn from_workbook(path: &Path, sheet: &str) -> Result<OrdersTable> {
    use calamine::{Reader, open_workbook_auto};

    let mut workbook = open_workbook_auto(path)?;
    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Err(DashboardError::MissingSheet(sheet.to_string()));
    }

    let range = workbook.worksheet_range(sheet)?;
    // absolute row of the header, so error messages match the spreadsheet
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(|cell| header_name(&workbook_cell(cell))).collect())
        .unwrap_or_default();
    let columns = locate_columns(&header)?;

    log::debug!(
        "Reading sheet '{}' of {} ({} data rows)",
        sheet,
        path.display(),
        range.height().saturating_sub(1)
    );

    let mut records = Vec::new();
    for (offset, row) in rows.enumerate() {
        let cells: Vec<RawCell> = row.iter().map(workbook_cell).collect();
        if cells.iter().all(RawCell::is_empty) {
            continue;
        }
        records.push(build_record(first_row + offset + 2, &columns, &cells)?);
    }

    Ok(OrdersTable::new(records))
}

/// Load the order table from a CSV file with a header row
///
/// Uses the same header names and cell conversion rules as the workbook
/// reader. A leading UTF-8 byte order mark is ignored.
pub fn from_csv(path: &Path) -> Result<OrdersTable> {
    let content = std::fs::read(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_slice());

    let header: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{FEFF}').trim().to_string())
        .collect();
    let columns = locate_columns(&header)?;

    let mut records = Vec::new();
    for (offset, result) in reader.records().enumerate() {
        let row = result?;
        let line = row
            .position()
            .map(|p| record_line(&content, p))
            .unwrap_or(offset + 2);
        let cells: Vec<RawCell> = row
            .iter()
            .map(|field| {
                if field.is_empty() {
                    RawCell::Empty
                } else {
                    RawCell::Text(field.to_string())
                }
            })
            .collect();
        if cells.iter().all(RawCell::is_empty) {
            continue;
        }
        records.push(build_record(line, &columns, &cells)?);
    }

    Ok(OrdersTable::new(records))
}

/// 1-based file line a CSV record starts on
///
/// The reader may report the position in front of blank lines it skipped,
/// so those are stepped over before counting.
fn record_line(content: &[u8], position: &csv::Position) -> usize {
    let start = (position.byte() as usize).min(content.len());
    let skipped = content[start..]
        .iter()
        .take_while(|b| matches!(b, b'\r' | b'\n'))
        .filter(|&&b| b == b'\n')
        .count();
    position.line() as usize + skipped
}

#[cfg(feature = "web")]
fn workbook_cell(cell: &calamine::Data) -> RawCell {
    use calamine::Data;

    match cell {
        Data::Empty => RawCell::Empty,
        Data::String(s) | Data::DateTimeIso(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                RawCell::Empty
            } else {
                RawCell::Text(trimmed.to_string())
            }
        }
        Data::Float(f) => RawCell::Number(*f),
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Bool(b) => RawCell::Text(b.to_string()),
        Data::DateTime(dt) => match serial_to_date(dt.as_f64()) {
            Some(date) => RawCell::Date(date),
            None => RawCell::Number(dt.as_f64()),
        },
        other => RawCell::Error(format!("unsupported cell value {:?}", other)),
    }
}

fn header_name(cell: &RawCell) -> String {
    match cell {
        RawCell::Text(s) => s.clone(),
        RawCell::Number(n) => format_number(*n),
        RawCell::Date(d) => d.to_string(),
        RawCell::Empty | RawCell::Error(_) => String::new(),
    }
}

/// Finds the index of every required column in the header row
fn locate_columns(header: &[String]) -> Result<[usize; 9]> {
    let mut indices = [0usize; 9];
    for (slot, name) in indices.iter_mut().zip(COLUMNS) {
        *slot = header
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| DashboardError::MissingColumn(name.to_string()))?;
    }
    Ok(indices)
}

fn build_record(row: usize, columns: &[usize; 9], cells: &[RawCell]) -> Result<OrderRecord> {
    let cell = |i: usize| cells.get(columns[i]).unwrap_or(&RawCell::Empty);

    Ok(OrderRecord {
        order_date: date_value(cell(0), row, COLUMNS[0])?,
        city: text_value(cell(1), row, COLUMNS[1])?,
        state: text_value(cell(2), row, COLUMNS[2])?,
        region: text_value(cell(3), row, COLUMNS[3])?,
        category: text_value(cell(4), row, COLUMNS[4])?,
        segment: text_value(cell(5), row, COLUMNS[5])?,
        ship_mode: text_value(cell(6), row, COLUMNS[6])?,
        sales: number_value(cell(7), row, COLUMNS[7])?,
        profit: number_value(cell(8), row, COLUMNS[8])?,
    })
}

fn invalid(row: usize, column: &str, reason: impl Into<String>) -> DashboardError {
    DashboardError::InvalidCell {
        row,
        column: column.to_string(),
        reason: reason.into(),
    }
}

fn text_value(cell: &RawCell, row: usize, column: &str) -> Result<String> {
    match cell {
        RawCell::Text(s) => Ok(s.clone()),
        RawCell::Number(n) => Ok(format_number(*n)),
        RawCell::Date(d) => Ok(d.to_string()),
        RawCell::Empty => Err(invalid(row, column, "missing value")),
        RawCell::Error(e) => Err(invalid(row, column, e.clone())),
    }
}

fn number_value(cell: &RawCell, row: usize, column: &str) -> Result<f64> {
    match cell {
        RawCell::Number(n) => Ok(*n),
        RawCell::Text(s) => s
            .parse::<f64>()
            .map_err(|_| invalid(row, column, format!("expected a number, found '{}'", s))),
        RawCell::Date(d) => Err(invalid(
            row,
            column,
            format!("expected a number, found date {}", d),
        )),
        RawCell::Empty => Err(invalid(row, column, "missing value")),
        RawCell::Error(e) => Err(invalid(row, column, e.clone())),
    }
}

fn date_value(cell: &RawCell, row: usize, column: &str) -> Result<NaiveDate> {
    match cell {
        RawCell::Date(d) => Ok(*d),
        RawCell::Number(n) => serial_to_date(*n)
            .ok_or_else(|| invalid(row, column, format!("{} is not a valid date serial", n))),
        RawCell::Text(s) => parse_date_text(s)
            .ok_or_else(|| invalid(row, column, format!("unrecognised date '{}'", s))),
        RawCell::Empty => Err(invalid(row, column, "missing value")),
        RawCell::Error(e) => Err(invalid(row, column, e.clone())),
    }
}

/// Whole numbers print without a fractional part ("90036", not "90036.0")
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Converts an Excel serial day number (1900 date system) to a date
///
/// Serials from 61 on count from 1899-12-30 because Excel treats 1900 as a
/// leap year; the fractional part (time of day) is dropped.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let days = serial.trunc() as u64;
    let epoch = if days < 61 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    epoch.checked_add_days(Days::new(days))
}

const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Parses the textual date layouts found in exported order sheets
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_serial_to_date() {
        assert_eq!(serial_to_date(42682.0), Some(date(2016, 11, 8)));
        assert_eq!(serial_to_date(42682.75), Some(date(2016, 11, 8)));
        assert_eq!(serial_to_date(1.0), Some(date(1900, 1, 1)));
        assert_eq!(serial_to_date(61.0), Some(date(1900, 3, 1)));
        assert_eq!(serial_to_date(0.0), None);
        assert_eq!(serial_to_date(f64::NAN), None);
    }

    #[test]
    fn test_parse_date_text_formats() {
        let expected = Some(date(2017, 4, 15));
        assert_eq!(parse_date_text("2017-04-15"), expected);
        assert_eq!(parse_date_text("2017-04-15 00:00:00"), expected);
        assert_eq!(parse_date_text("2017-04-15T13:45:00"), expected);
        assert_eq!(parse_date_text("04/15/2017"), expected);
        assert_eq!(parse_date_text("15.04.2017"), expected);
        assert_eq!(parse_date_text("yesterday"), None);
    }

    #[test]
    fn test_locate_columns_reports_missing_column() {
        let header: Vec<String> = COLUMNS[..8].iter().map(|s| s.to_string()).collect();
        match locate_columns(&header) {
            Err(DashboardError::MissingColumn(name)) => assert_eq!(name, "Profit"),
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_from_csv_reads_rows_by_header_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(
            &path,
            "Row ID,Profit,Sales,Ship Mode,Segment,Category,Region,State,City,Order Date\n\
             1,41.91,261.96,Second Class,Consumer,Furniture,South,Kentucky,Henderson,2016-11-08\n\
             ,,,,,,,,,\n\
             2,-3.8,\"1,0\",Standard Class,Consumer,Office Supplies,West,California,\
             \"Los Angeles, CA\",06/12/2016\n",
        )
        .unwrap();

        let err = load_orders(&path, DEFAULT_SHEET).unwrap_err();
        match err {
            DashboardError::InvalidCell { row, column, .. } => {
                assert_eq!(row, 4);
                assert_eq!(column, "Sales");
            }
            other => panic!("expected InvalidCell, got {:?}", other),
        }

        fs::write(
            &path,
            "Row ID,Profit,Sales,Ship Mode,Segment,Category,Region,State,City,Order Date\n\
             1,41.91,261.96,Second Class,Consumer,Furniture,South,Kentucky,Henderson,2016-11-08\n\
             ,,,,,,,,,\n\
             2,-3.8,10.5,Standard Class,Consumer,Office Supplies,West,California,\
             \"Los Angeles, CA\",06/12/2016\n",
        )
        .unwrap();

        let table = load_orders(&path, DEFAULT_SHEET).unwrap();
        assert_eq!(table.len(), 2);
        let second = &table.records()[1];
        assert_eq!(second.city, "Los Angeles, CA");
        assert_eq!(second.order_date, date(2016, 6, 12));
        assert_eq!(second.sales, 10.5);
        assert_eq!(second.profit, -3.8);
    }

    #[test]
    fn test_from_csv_reports_file_line_after_blank_and_multiline_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(
            &path,
            "Order Date,City,State,Region,Category,Segment,Ship Mode,Sales,Profit\n\
             2016-11-08,Henderson,Kentucky,South,Furniture,Consumer,Second Class,261.96,41.91\n\
             \n\
             2016-11-08,Henderson,Kentucky,South,Furniture,Consumer,Second Class,bad,1.0\n",
        )
        .unwrap();

        match load_orders(&path, DEFAULT_SHEET).unwrap_err() {
            DashboardError::InvalidCell { row, column, .. } => {
                assert_eq!(row, 4);
                assert_eq!(column, "Sales");
            }
            other => panic!("expected InvalidCell, got {:?}", other),
        }

        fs::write(
            &path,
            "Order Date,City,State,Region,Category,Segment,Ship Mode,Sales,Profit\n\
             2016-11-08,\"Hender\nson\",Kentucky,South,Furniture,Consumer,\
             Second Class,261.96,41.91\n\
             2016-11-08,Henderson,Kentucky,South,Furniture,Consumer,Second Class,9.5,oops\n",
        )
        .unwrap();

        match load_orders(&path, DEFAULT_SHEET).unwrap_err() {
            DashboardError::InvalidCell { row, column, .. } => {
                assert_eq!(row, 4);
                assert_eq!(column, "Profit");
            }
            other => panic!("expected InvalidCell, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_orders("orders.json", DEFAULT_SHEET).unwrap_err();
        assert!(matches!(err, DashboardError::UnsupportedFormat(ext) if ext == "json"));
    }

    #[cfg(feature = "web")]
    mod workbook {
        use super::*;
        use rust_xlsxwriter::Workbook;
        use std::path::PathBuf;

        const HEADER: [&str; 10] = [
            "Row ID",
            "Order Date",
            "Ship Mode",
            "Segment",
            "City",
            "State",
            "Region",
            "Category",
            "Sales",
            "Profit",
        ];

        /// Writes a workbook with the given sheet name and rows below `HEADER`
        fn write_workbook(dir: &Path, sheet: &str, rows: &[Vec<Cell>]) -> PathBuf {
            let path = dir.join("Superstore_Sales.xlsx");
            let mut workbook = Workbook::new();
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(sheet).unwrap();
            for (c, name) in HEADER.iter().enumerate() {
                worksheet.write_string(0, c as u16, *name).unwrap();
            }
            for (r, row) in rows.iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    let (r, c) = (r as u32 + 1, c as u16);
                    match cell {
                        Cell::Text(s) => worksheet.write_string(r, c, *s).unwrap(),
                        Cell::Number(n) => worksheet.write_number(r, c, *n).unwrap(),
                    };
                }
            }
            workbook.save(&path).unwrap();
            path
        }

        enum Cell {
            Text(&'static str),
            Number(f64),
        }

        use Cell::{Number as N, Text as T};

        fn henderson_row(date: Cell) -> Vec<Cell> {
            vec![
                N(1.0),
                date,
                T("Second Class"),
                T("Consumer"),
                T("Henderson"),
                T("Kentucky"),
                T("South"),
                T("Furniture"),
                N(261.96),
                N(41.91),
            ]
        }

        #[test]
        fn test_from_workbook_converts_cells() {
            let dir = tempfile::tempdir().unwrap();
            let blank: Vec<Cell> = (0..HEADER.len()).map(|_| T("")).collect();
            let path = write_workbook(
                dir.path(),
                DEFAULT_SHEET,
                &[
                    henderson_row(T("2016-11-08")),
                    blank,
                    henderson_row(N(42682.0)),
                    vec![
                        N(3.0),
                        T("2017-12-01 00:00:00"),
                        T("Same Day"),
                        T("Corporate"),
                        N(10024.0),
                        T("New York"),
                        T("East"),
                        T("Technology"),
                        N(372.1),
                        N(-81.4),
                    ],
                ],
            );

            let table = load_orders(&path, DEFAULT_SHEET).unwrap();
            assert_eq!(table.len(), 3);

            let records = table.records();
            assert_eq!(records[0], records[1]);
            assert_eq!(records[0].order_date, date(2016, 11, 8));
            assert_eq!(records[0].ship_mode, "Second Class");
            assert_eq!(records[2].city, "10024");
            assert_eq!(records[2].order_date, date(2017, 12, 1));
            assert_eq!(records[2].profit, -81.4);
        }

        #[test]
        fn test_from_workbook_requires_sheet() {
            let dir = tempfile::tempdir().unwrap();
            let path = write_workbook(dir.path(), "Returns", &[henderson_row(T("2016-11-08"))]);

            match load_orders(&path, DEFAULT_SHEET) {
                Err(DashboardError::MissingSheet(name)) => assert_eq!(name, "Orders"),
                other => panic!("expected MissingSheet, got {:?}", other),
            }
        }

        #[test]
        fn test_from_workbook_reports_row_of_bad_cell() {
            let dir = tempfile::tempdir().unwrap();
            let mut bad = henderson_row(T("2016-11-08"));
            bad[8] = T("n/a");
            let path = write_workbook(
                dir.path(),
                DEFAULT_SHEET,
                &[henderson_row(T("2016-11-08")), bad],
            );

            match load_orders(&path, DEFAULT_SHEET) {
                Err(DashboardError::InvalidCell { row, column, reason }) => {
                    assert_eq!(row, 3);
                    assert_eq!(column, "Sales");
                    assert!(reason.contains("n/a"));
                }
                other => panic!("expected InvalidCell, got {:?}", other),
            }
        }
    }
}
