// Ingestion resolver: raw upload bytes -> Table

use crate::data::{unique_headers, Table};
use crate::error::IngestError;
use anyhow::{anyhow, bail, Context, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::borrow::Cow;
use std::fmt;
use std::io::Cursor;
use std::path::Path;

/// Largest header row index a caller may ask for
pub const MAX_HEADER_ROW: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Spreadsheet,
}

impl FileKind {
    /// Infer the kind from an uploaded file's name
    pub fn from_file_name(name: &str) -> Result<Self, IngestError> {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(FileKind::Csv),
            Some("xlsx") | Some("xlsm") | Some("xls") | Some("ods") => Ok(FileKind::Spreadsheet),
            _ => Err(IngestError::UnsupportedFileKind(name.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Iso8859_1,
    Latin1,
    UnicodeEscape,
}

impl TextEncoding {
    pub const CANDIDATES: [TextEncoding; 4] = [
        TextEncoding::Utf8,
        TextEncoding::Iso8859_1,
        TextEncoding::Latin1,
        TextEncoding::UnicodeEscape,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Iso8859_1 => "ISO-8859-1",
            TextEncoding::Latin1 => "latin1",
            TextEncoding::UnicodeEscape => "unicode_escape",
        }
    }

    /// Decode raw bytes to text, failing if the bytes are not valid for this encoding
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, str>> {
        match self {
            TextEncoding::Utf8 => decode_utf8(bytes),
            // ISO-8859-1 and Latin-1 are the same table: byte value == code point
            TextEncoding::Iso8859_1 | TextEncoding::Latin1 => Ok(Cow::Owned(decode_latin1(bytes))),
            TextEncoding::UnicodeEscape => decode_unicode_escape(bytes).map(Cow::Owned),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Semicolon,
    Tab,
    Pipe,
}

impl Delimiter {
    pub const CANDIDATES: [Delimiter; 4] = [
        Delimiter::Comma,
        Delimiter::Semicolon,
        Delimiter::Tab,
        Delimiter::Pipe,
    ];

    pub fn as_byte(&self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
            Delimiter::Pipe => b'|',
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Delimiter::Comma => "','",
            Delimiter::Semicolon => "';'",
            Delimiter::Tab => "'\\t'",
            Delimiter::Pipe => "'|'",
        };
        f.write_str(repr)
    }
}

/// One candidate parse configuration for delimited text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub encoding: TextEncoding,
    pub delimiter: Delimiter,
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "encoding {} and delimiter {}", self.encoding, self.delimiter)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedAttempt {
    pub attempt: Attempt,
    pub reason: String,
}

impl fmt::Display for FailedAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to load with {}: {}", self.attempt, self.reason)
    }
}

/// The fixed, ordered list of configurations tried for delimited text.
/// Encodings form the outer loop, delimiters the inner one.
pub fn candidate_attempts() -> Vec<Attempt> {
    TextEncoding::CANDIDATES
        .iter()
        .flat_map(|&encoding| {
            Delimiter::CANDIDATES
                .iter()
                .map(move |&delimiter| Attempt { encoding, delimiter })
        })
        .collect()
}

/// Outcome of a successful resolution
#[derive(Debug, Clone)]
pub struct Resolution {
    pub table: Table,
    /// The configuration that produced the table; `None` for spreadsheets
    pub attempt: Option<Attempt>,
    /// Every attempt that failed before the winning one
    pub failed_attempts: Vec<FailedAttempt>,
}

/// Parse an uploaded file into a table.
///
/// Spreadsheets are parsed once. Delimited text is tried against every
/// candidate in [`candidate_attempts`] order and the first configuration that
/// parses wins. The resulting table has its decimal commas normalized.
pub fn resolve(bytes: &[u8], header_row: usize, kind: FileKind) -> Result<Resolution, IngestError> {
    if header_row > MAX_HEADER_ROW {
        return Err(IngestError::HeaderRowOutOfRange {
            row: header_row,
            max: MAX_HEADER_ROW,
        });
    }

    let mut resolution = match kind {
        FileKind::Spreadsheet => {
            let table = parse_spreadsheet(bytes, header_row).map_err(|e| {
                log::warn!("Failed to load spreadsheet: {:#}", e);
                IngestError::Spreadsheet(format!("{:#}", e))
            })?;
            Resolution {
                table,
                attempt: None,
                failed_attempts: Vec::new(),
            }
        }
        FileKind::Csv => resolve_delimited(bytes, header_row)?,
    };

    resolution.table.normalize_decimal_commas();

    log::info!(
        "Loaded {} rows x {} columns{}",
        resolution.table.num_rows(),
        resolution.table.num_columns(),
        resolution
            .attempt
            .map(|a| format!(" with {}", a))
            .unwrap_or_default()
    );

    Ok(resolution)
}

fn resolve_delimited(bytes: &[u8], header_row: usize) -> Result<Resolution, IngestError> {
    let mut failed_attempts = Vec::new();

    for attempt in candidate_attempts() {
        let parsed = attempt
            .encoding
            .decode(bytes)
            .and_then(|text| parse_delimited(&text, attempt.delimiter, header_row));

        match parsed {
            Ok(table) => {
                return Ok(Resolution {
                    table,
                    attempt: Some(attempt),
                    failed_attempts,
                });
            }
            Err(e) => {
                let failed = FailedAttempt {
                    attempt,
                    reason: format!("{:#}", e),
                };
                log::warn!("{}", failed);
                failed_attempts.push(failed);
            }
        }
    }

    Err(IngestError::Exhausted {
        attempts: failed_attempts,
    })
}

/// A raw record and the 1-based source line it came from
type Record = (u64, Vec<String>);

fn parse_delimited(text: &str, delimiter: Delimiter, header_row: usize) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter.as_byte())
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records: Vec<Record> = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to read CSV record")?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        records.push((line, record.iter().map(str::to_string).collect()));
    }

    table_from_records(records, header_row)
}

fn parse_spreadsheet(bytes: &[u8], header_row: usize) -> Result<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .context("Failed to open workbook")?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("Workbook has no worksheets"))?;

    let range = workbook
        .worksheet_range(&sheet)
        .with_context(|| format!("Failed to read worksheet '{}'", sheet))?;

    let first_row = range.start().map(|(row, _)| row as u64).unwrap_or(0);

    let records: Vec<Record> = range
        .rows()
        .enumerate()
        .filter(|(_, cells)| cells.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|(idx, cells)| {
            let line = first_row + idx as u64 + 1;
            (line, cells.iter().map(|c| c.to_string()).collect())
        })
        .collect();

    table_from_records(records, header_row)
}

/// Split records at the header row: earlier records are dropped, the header
/// record names the columns, later records become data rows.
fn table_from_records(mut records: Vec<Record>, header_row: usize) -> Result<Table> {
    if records.is_empty() {
        bail!("No columns to parse from file");
    }
    if header_row >= records.len() {
        bail!(
            "Header row {} is past the end of the file ({} rows)",
            header_row,
            records.len()
        );
    }

    let data = records.split_off(header_row + 1);
    let (_, raw_header) = records
        .pop()
        .ok_or_else(|| anyhow!("Header row {} is missing", header_row))?;
    let width = raw_header.len();

    let mut rows = Vec::with_capacity(data.len());
    for (line, mut fields) in data {
        if fields.len() > width {
            bail!(
                "Error tokenizing data. Expected {} fields in line {}, saw {}",
                width,
                line,
                fields.len()
            );
        }
        fields.resize(width, String::new());
        rows.push(fields);
    }

    Table::new(unique_headers(raw_header), rows)
}

fn decode_utf8(bytes: &[u8]) -> Result<Cow<'_, str>> {
    let body = match encoding_rs::Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) if encoding == encoding_rs::UTF_8 => &bytes[bom_len..],
        _ => bytes,
    };

    encoding_rs::UTF_8
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| anyhow!("'utf-8' codec can't decode the input: invalid byte sequence"))
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Read bytes as Latin-1, then interpret backslash escape sequences
fn decode_unicode_escape(bytes: &[u8]) -> Result<String> {
    let mut output = String::with_capacity(bytes.len());
    let mut chars = bytes.iter().map(|&b| char::from(b)).peekable();
    let mut position = 0usize;

    while let Some(c) = chars.next() {
        position += 1;
        if c != '\\' {
            output.push(c);
            continue;
        }

        let escape = chars.next().ok_or_else(|| {
            anyhow!(
                "'unicodeescape' codec can't decode byte at position {}: \\ at end of string",
                position - 1
            )
        })?;
        position += 1;

        match escape {
            '\n' => {}
            '\\' => output.push('\\'),
            '\'' => output.push('\''),
            '"' => output.push('"'),
            'a' => output.push('\u{07}'),
            'b' => output.push('\u{08}'),
            'f' => output.push('\u{0C}'),
            'n' => output.push('\n'),
            'r' => output.push('\r'),
            't' => output.push('\t'),
            'v' => output.push('\u{0B}'),
            '0'..='7' => {
                let mut value = escape.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                            position += 1;
                        }
                        None => break,
                    }
                }
                let decoded = char::from_u32(value)
                    .ok_or_else(|| anyhow!("Invalid octal escape at position {}", position))?;
                output.push(decoded);
            }
            'x' | 'u' | 'U' => {
                let digits = match escape {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let mut value: u32 = 0;
                for _ in 0..digits {
                    let digit = chars
                        .peek()
                        .and_then(|c| c.to_digit(16))
                        .ok_or_else(|| {
                            anyhow!(
                                "'unicodeescape' codec can't decode bytes at position {}: \
                                 truncated \\{} escape",
                                position - 2,
                                escape
                            )
                        })?;
                    value = value * 16 + digit;
                    chars.next();
                    position += 1;
                }
                let decoded = char::from_u32(value).ok_or_else(|| {
                    anyhow!(
                        "'unicodeescape' codec can't decode bytes at position {}: \
                         illegal Unicode character",
                        position
                    )
                })?;
                output.push(decoded);
            }
            'N' => bail!(
                "'unicodeescape' codec can't decode bytes at position {}: \
                 named escapes are not supported",
                position - 2
            ),
            other => {
                output.push('\\');
                output.push(other);
            }
        }
    }

    Ok(output)
}
