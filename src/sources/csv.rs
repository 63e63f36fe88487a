use std::fs::File;
use std::io::{Cursor, Read, Seek};

use tracing::debug;

use crate::csv::{CsvTokenizer, LineSource};
use crate::domain::{Feed, FetchResult, Item, ParseResult, ParserConfig, ParserKind, StageState};
use crate::errors::ImportResult;
use crate::sources::traits::Parser;

/// Batched CSV parsing. The parse stage's pointer is the byte offset to
/// resume from and its total is the size of the fetched content, so the
/// fraction is "bytes consumed / bytes fetched".
pub struct CsvParser;

impl CsvParser {
    pub fn new() -> Self {
        Self
    }

    fn read_batch<R: Read + Seek>(
        reader: R,
        config: &ParserConfig,
        start: u64,
        limit: usize,
    ) -> ImportResult<(Vec<Item>, u64)> {
        let mut source = LineSource::new(reader);
        let mut tokenizer = CsvTokenizer::new(config.delimiter_bytes())
            .has_header(config.has_header)
            .row_limit(limit)
            .start_offset(start);

        let rows = tokenizer.parse(&mut source)?;
        let header = tokenizer.header().unwrap_or_default();

        let items = rows
            .into_iter()
            .map(|row| {
                let mut item = Item::new();
                for (i, value) in row.into_iter().enumerate() {
                    let key = header
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| i.to_string());
                    item.set(key, value);
                }
                item
            })
            .collect();

        Ok((items, tokenizer.last_position()))
    }
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for CsvParser {
    fn kind(&self) -> ParserKind {
        ParserKind::Csv
    }

    fn parse(
        &self,
        feed: &Feed,
        fetched: &FetchResult,
        config: &ParserConfig,
        state: &mut StageState,
        limit: usize,
    ) -> ImportResult<ParseResult> {
        let total = fetched.len()?;
        let start = state.pointer_u64().unwrap_or(0);

        let (items, last) = match fetched {
            FetchResult::File { path } => Self::read_batch(File::open(path)?, config, start, limit)?,
            FetchResult::Raw { bytes } => {
                Self::read_batch(Cursor::new(bytes.as_slice()), config, start, limit)?
            }
        };

        debug!(
            source = %feed.source,
            rows = items.len(),
            from = start,
            to = last,
            "Parsed CSV batch"
        );

        state.pointer = Some(last.to_string());
        state.progress(total, last);

        Ok(ParseResult::new(items))
    }
}
