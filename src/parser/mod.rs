//! Table loading: CSV with encoding and delimiter auto-detection, Excel via
//! calamine. Rows become JSON objects keyed by header label; no fish-trade
//! logic lives here.
//!
//! Hebrew exports commonly arrive as UTF-8 or Windows-1255 CSV, or as
//! `.xlsx` straight out of the bookkeeping system. Both loaders produce the
//! same [`ParseResult`] so the pipeline does not care which one ran.

use calamine::{open_workbook_auto, Data, Reader};
use serde_json::{json, Map, Value};
use std::path::Path;

/// Table parsing error with context.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub line: usize,
    pub column: Option<String>,
    pub value: Option<String>,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.column, &self.value) {
            (Some(col), Some(val)) => {
                write!(f, "Line {}, column '{}' (value '{}'): {}", self.line, col, val, self.message)
            }
            (Some(col), None) => {
                write!(f, "Line {}, column '{}': {}", self.line, col, self.message)
            }
            _ => {
                write!(f, "Line {}: {}", self.line, self.message)
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column: None,
            value: None,
            message: message.into(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// How the table was physically encoded on disk.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum TableFormat {
    Csv { encoding: String, delimiter: char },
    Excel { sheet: String },
}

impl std::fmt::Display for TableFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableFormat::Csv { encoding, delimiter } => {
                let d = match delimiter {
                    '\t' => "TAB".to_string(),
                    c => c.to_string(),
                };
                write!(f, "csv ({}, '{}')", encoding, d)
            }
            TableFormat::Excel { sheet } => write!(f, "excel (sheet '{}')", sheet),
        }
    }
}

/// Result of parsing with metadata.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed records as JSON objects keyed by header label.
    pub records: Vec<Value>,
    /// Column headers in file order.
    pub headers: Vec<String>,
    /// Physical format details.
    pub format: TableFormat,
}

// =============================================================================
// Encoding / Delimiter Detection (CSV)
// =============================================================================

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        // Hebrew code pages: the visual/logical distinction does not matter
        // for decoding, windows-1255 covers both exports we see.
        "iso-8859-8" | "iso-8859-8-i" | "windows-1255" | "cp1255" => "windows-1255".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.to_string()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        "windows-1255" | "cp1255" | "iso-8859-8" => {
            encoding_rs::WINDOWS_1255.decode(bytes).0.to_string()
        }
        _ => String::from_utf8_lossy(bytes).to_string(),
    }
}

/// Detect the delimiter by counting occurrences in the first line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

// =============================================================================
// CSV Parsing
// =============================================================================

/// Parse CSV text into header-keyed JSON rows with an explicit delimiter.
///
/// Empty lines are skipped; short rows are padded with empty cells; extra
/// cells beyond the header are ignored.
pub fn parse_csv_content(content: &str, delimiter: char) -> Result<(Vec<String>, Vec<Value>), ParseError> {
    let mut lines = content.lines();

    let header_line = lines
        .next()
        .ok_or_else(|| ParseError::new(1, "Empty CSV file"))?;

    let headers: Vec<String> = header_line
        .split(delimiter)
        .map(|s| s.trim().trim_matches('"').trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(ParseError::new(1, "No headers found"));
    }

    let mut records = Vec::new();

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }

        let values: Vec<&str> = line.split(delimiter).collect();
        let mut obj = Map::new();

        for (i, header) in headers.iter().enumerate() {
            let raw_value = values
                .get(i)
                .map(|s| s.trim().trim_matches('"'))
                .unwrap_or("");

            obj.insert(header.clone(), json!(raw_value));
        }

        records.push(Value::Object(obj));
    }

    Ok((headers, records))
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
///
/// Valid UTF-8 is taken as-is; detection only arbitrates legacy code pages
/// (Hebrew exports in Windows-1255 are the common case).
pub fn parse_csv_bytes_auto(bytes: &[u8]) -> Result<ParseResult, ParseError> {
    let encoding = if std::str::from_utf8(bytes).is_ok() {
        "utf-8".to_string()
    } else {
        detect_encoding(bytes)
    };
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let (headers, records) = parse_csv_content(&content, delimiter)?;

    Ok(ParseResult {
        records,
        headers,
        format: TableFormat::Csv { encoding, delimiter },
    })
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn parse_csv_file<P: AsRef<Path>>(path: P) -> Result<ParseResult, ParseError> {
    let bytes = std::fs::read(path.as_ref())
        .map_err(|e| ParseError::new(0, format!("Cannot read file: {}", e)))?;
    parse_csv_bytes_auto(&bytes)
}

// =============================================================================
// Excel Parsing
// =============================================================================

/// Parse the first worksheet of an Excel file into header-keyed JSON rows.
pub fn parse_excel_file<P: AsRef<Path>>(path: P) -> Result<ParseResult, ParseError> {
    let mut workbook = open_workbook_auto(path.as_ref())
        .map_err(|e| ParseError::new(0, format!("Cannot open workbook: {}", e)))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ParseError::new(0, "Workbook has no worksheet"))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ParseError::new(0, format!("Cannot read worksheet '{}': {}", sheet_name, e)))?;

    let mut rows = range.rows();

    let header_cells = rows
        .next()
        .ok_or_else(|| ParseError::new(1, "Worksheet has no header row"))?;

    let headers: Vec<String> = header_cells.iter().map(header_cell_to_string).collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(ParseError::new(1, "No headers found"));
    }

    let mut records = Vec::new();

    for row in rows {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }

        let mut obj = Map::new();
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let cell = row.get(i).unwrap_or(&Data::Empty);
            obj.insert(header.clone(), data_to_json(cell));
        }
        records.push(Value::Object(obj));
    }

    Ok(ParseResult {
        records,
        headers,
        format: TableFormat::Excel { sheet: sheet_name },
    })
}

fn header_cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

/// Map a calamine cell to the JSON value the pipeline coerces from.
fn data_to_json(cell: &Data) -> Value {
    match cell {
        Data::Empty => json!(""),
        Data::String(s) => json!(s.trim()),
        Data::Float(f) => json!(f),
        Data::Int(i) => json!(i),
        Data::Bool(b) => json!(b),
        Data::DateTime(dt) => json!(dt.as_f64()),
        other => json!(other.to_string()),
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Extensions accepted as Excel input.
pub const EXCEL_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "xlsm"];

/// Load a table file, choosing the loader by extension.
pub fn load_table_file<P: AsRef<Path>>(path: P) -> Result<ParseResult, ParseError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if ext == "csv" {
        parse_csv_file(path)
    } else if EXCEL_EXTENSIONS.contains(&ext.as_str()) {
        parse_excel_file(path)
    } else {
        Err(ParseError::new(0, format!("Unsupported table format: '{}'", ext)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let csv = "name;age\nAlice;30\nBob;25";
        let (headers, rows) = parse_csv_content(csv, ';').unwrap();

        assert_eq!(headers, vec!["name", "age"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Alice");
        assert_eq!(rows[1]["age"], "25");
    }

    #[test]
    fn test_quoted_values() {
        let csv = "name;value\n\"Alice\";\"Hello World\"";
        let (_, rows) = parse_csv_content(csv, ';').unwrap();

        assert_eq!(rows[0]["name"], "Alice");
        assert_eq!(rows[0]["value"], "Hello World");
    }

    #[test]
    fn test_empty_lines_skipped() {
        let csv = "a;b\n1;2\n\n3;4\n";
        let (_, rows) = parse_csv_content(csv, ';').unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_missing_values_become_empty_cells() {
        let csv = "a;b;c\n1;;3\n1;2";
        let (_, rows) = parse_csv_content(csv, ';').unwrap();

        assert_eq!(rows[0]["b"], "");
        assert_eq!(rows[1]["c"], "");
    }

    #[test]
    fn test_empty_csv_error() {
        let result = parse_csv_content("", ';');
        assert!(result.is_err());
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
    }

    #[test]
    fn test_auto_parse_utf8_hebrew() {
        let csv = "אסמכתת בסיס,סה'כ משקל\n129520,1000\n";
        let result = parse_csv_bytes_auto(csv.as_bytes()).unwrap();

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0]["אסמכתת בסיס"], "129520");
        match result.format {
            TableFormat::Csv { ref encoding, delimiter } => {
                assert_eq!(delimiter, ',');
                assert!(!encoding.is_empty());
            }
            _ => panic!("expected csv format"),
        }
    }

    #[test]
    fn test_windows_1255_decoding() {
        // "שלום" in windows-1255
        let bytes: &[u8] = &[0xF9, 0xEC, 0xE5, 0xED];
        let decoded = decode_content(bytes, "windows-1255");
        assert_eq!(decoded, "שלום");
    }

    #[test]
    fn test_encoding_normalization() {
        assert_eq!(detect_encoding("plain ascii text, nothing else".as_bytes()), "utf-8");
    }

    #[test]
    fn test_error_message_format() {
        let err = ParseError::new(5, "Invalid value")
            .with_column("age")
            .with_value("abc");

        let msg = err.to_string();
        assert!(msg.contains("Line 5"));
        assert!(msg.contains("column 'age'"));
        assert!(msg.contains("value 'abc'"));
    }

    #[test]
    fn test_load_table_file_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, "a,b\n1,2").unwrap();

        let err = load_table_file(&path).unwrap_err();
        assert!(err.message.contains("Unsupported"));
    }

    #[test]
    fn test_excel_rows_match_csv_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.xlsx");

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "a").unwrap();
        sheet.write_string(0, 1, "b").unwrap();
        sheet.write_string(1, 0, "x").unwrap();
        sheet.write_number(1, 1, 42.0).unwrap();
        workbook.save(&path).unwrap();

        let excel = parse_excel_file(&path).unwrap();
        let (csv_headers, csv_rows) = parse_csv_content("a,b\nx,42", ',').unwrap();

        assert_eq!(excel.headers, csv_headers);
        assert_eq!(excel.records.len(), csv_rows.len());
        assert_eq!(excel.records[0]["a"], csv_rows[0]["a"]);
        // numeric cells coerce to the same value regardless of source format
        assert_eq!(
            crate::models::cell_to_f64(excel.records[0].get("b")),
            crate::models::cell_to_f64(csv_rows[0].get("b")),
        );
        assert!(matches!(excel.format, TableFormat::Excel { .. }));
    }

    #[test]
    fn test_load_table_file_reads_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "a,b\n1,2").unwrap();

        let result = load_table_file(&path).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0]["a"], "1");
    }
}
