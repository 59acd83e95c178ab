//! Raw sheet ingestion and normalization.
//!
//! - [`normalize`] - Two header rows → [`crate::models::Table`]
//! - CSV import with encoding and delimiter auto-detection, producing the
//!   same raw rows a spreadsheet export would: no header handling here,
//!   every line (banner and header rows included) is kept as-is.

pub mod normalize;

pub use normalize::{combine_headers, make_unique, normalize, UNNAMED};

use std::path::Path;

use crate::error::{SheetError, SheetResult};

/// Raw rows plus what was detected while reading them
#[derive(Debug, Clone)]
pub struct ParsedSheet {
    /// Rows of raw cell text, banner and header rows included
    pub rows: Vec<Vec<String>>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> SheetResult<String> {
    let content = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        },
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };

    // Spreadsheet exports often start with a BOM
    Ok(content.trim_start_matches('\u{feff}').to_string())
}

/// Number of leading lines inspected by [`detect_delimiter`]
const DELIMITER_SAMPLE_LINES: usize = 5;

/// Detect the delimiter by counting occurrences in the first non-empty lines.
///
/// Asset sheets open with a one-cell banner, so a single line is not enough.
pub fn detect_delimiter(content: &str) -> char {
    let sample: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(DELIMITER_SAMPLE_LINES)
        .collect();

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count: usize = sample.iter().map(|l| l.matches(sep).count()).sum();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Split CSV content into raw rows.
///
/// Records may have different lengths. A blank line between records
/// becomes an empty row, so row positions match the sheet (the Sheets API
/// returns `[]` for the same row). Quoted fields are unquoted, cell text is
/// otherwise kept verbatim.
pub fn parse_rows(content: &str, delimiter: char) -> SheetResult<Vec<Vec<String>>> {
    if !delimiter.is_ascii() {
        return Err(SheetError::Encoding(format!(
            "delimiter '{}' is not a single byte",
            delimiter
        )));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(content.as_bytes());

    // The reader drops blank lines; line numbers tell where they were
    let mut rows = Vec::new();
    let mut record = csv::StringRecord::new();
    let mut next_line: u64 = 1;
    while reader.read_record(&mut record)? {
        let line = record.position().map(|p| p.line()).unwrap_or(next_line);
        for _ in next_line..line {
            rows.push(Vec::new());
        }
        rows.push(record.iter().map(String::from).collect());
        next_line = reader.position().line();
    }

    Ok(rows)
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> SheetResult<ParsedSheet> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    let rows = parse_rows(&content, delimiter)?;

    Ok(ParsedSheet {
        rows,
        encoding,
        delimiter,
    })
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
///
/// # Example
/// ```ignore
/// let sheet = parse_csv_file_auto("assets.csv")?;
/// let table = normalize(&sheet.rows);
/// ```
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> SheetResult<ParsedSheet> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}
