use std::io::{self, Read, Seek};

use super::LineSource;

const QUOTE: u8 = b'"';
const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Streaming CSV tokenizer with a byte-offset resume contract.
///
/// Every call to [`CsvTokenizer::parse`] returns at most `row_limit` data
/// rows starting at `start_offset`, and [`CsvTokenizer::last_position`] is the
/// offset to pass as `start_offset` next time. Splitting a parse at that
/// offset yields exactly the rows of a single uninterrupted parse.
#[derive(Debug, Clone)]
pub struct CsvTokenizer {
    delimiter: Vec<u8>,
    has_header: bool,
    row_limit: usize,
    start_offset: u64,
    header: Option<Vec<String>>,
    last_position: u64,
}

impl CsvTokenizer {
    pub fn new(delimiter: impl Into<Vec<u8>>) -> Self {
        let mut delimiter = delimiter.into();
        if delimiter.is_empty() {
            delimiter = b",".to_vec();
        }

        Self {
            delimiter,
            has_header: false,
            row_limit: 0,
            start_offset: 0,
            header: None,
            last_position: 0,
        }
    }

    pub fn has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Data rows per call, 0 for no limit.
    pub fn row_limit(mut self, limit: usize) -> Self {
        self.row_limit = limit;
        self
    }

    pub fn start_offset(mut self, offset: u64) -> Self {
        self.start_offset = offset;
        self
    }

    /// Lowercased column names, once a header has been read.
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    pub fn last_position(&self) -> u64 {
        self.last_position
    }

    pub fn parse<R: Read + Seek>(
        &mut self,
        source: &mut LineSource<R>,
    ) -> io::Result<Vec<Vec<String>>> {
        let mut start = self.start_offset;

        if self.has_header {
            source.seek(0)?;
            let names = self.next_row(source)?.unwrap_or_default();
            self.header = Some(names.iter().map(|n| n.trim().to_lowercase()).collect());
            start = start.max(source.offset());
        }

        source.seek(start)?;

        let mut rows = Vec::new();
        while self.row_limit == 0 || rows.len() < self.row_limit {
            match self.next_row(source)? {
                Some(row) => rows.push(row),
                None => break,
            }
        }

        self.last_position = source.offset();
        Ok(rows)
    }

    /// Read one logical row, pulling more physical lines while a quoted
    /// field is open. `None` at end of input.
    fn next_row<R: Read + Seek>(
        &self,
        source: &mut LineSource<R>,
    ) -> io::Result<Option<Vec<String>>> {
        let mut row = Vec::new();
        let mut field = Vec::new();
        let mut in_quotes = false;
        let mut continuing = false;

        loop {
            let line_start = source.offset();
            let raw = match source.next_line()? {
                Some(raw) => raw,
                None if continuing => {
                    // Unterminated quote: keep what we have.
                    row.push(decode(field));
                    return Ok(Some(row));
                }
                None => return Ok(None),
            };

            let mut line = strip_line_end(&raw);
            if line_start == 0 && line.starts_with(BOM) {
                line = &line[BOM.len()..];
            }

            if continuing {
                field.push(b'\n');
            } else if line.is_empty() {
                continue;
            }

            let mut i = 0;
            while i < line.len() {
                let byte = line[i];

                if byte == QUOTE {
                    if in_quotes && line.get(i + 1) == Some(&QUOTE) {
                        field.push(QUOTE);
                        i += 2;
                    } else {
                        in_quotes = !in_quotes;
                        i += 1;
                    }
                    continue;
                }

                if !in_quotes && line[i..].starts_with(&self.delimiter) {
                    row.push(decode(std::mem::take(&mut field)));
                    i += self.delimiter.len();
                    continue;
                }

                field.push(byte);
                i += 1;
            }

            if in_quotes {
                continuing = true;
                continue;
            }

            row.push(decode(field));
            return Ok(Some(row));
        }
    }
}

fn strip_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}
