//! Streaming parser front end.
//!
//! One [`Parser`] drives a single input: it dispatches on the base format,
//! feeds decoded records through a [`ChunkDriver`] that batches them into
//! header-aligned chunks, infers column types on the first batch, and
//! enforces cancellation and the memory policy at row boundaries.

use std::io::Read;

use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::filetype::BaseFormat;
use crate::infer;
use crate::pool::{MemoryPolicy, MemoryStatus, RecordPool};
use crate::schema::{validate_header, Chunk, ColumnInfo, ColumnType, Record, Table};
use crate::{csv_in, ltsv_in, parquet_in, xlsx_in};

/// Default rows per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

pub struct ParseOptions {
    pub chunk_size: usize,
    pub cancel: CancelToken,
    pub memory: Option<Box<dyn MemoryPolicy>>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            cancel: CancelToken::new(),
            memory: None,
        }
    }
}

pub struct Parser {
    format: BaseFormat,
    table: String,
    options: ParseOptions,
    pool: RecordPool,
}

impl Parser {
    pub fn new(format: BaseFormat, table: impl Into<String>, options: ParseOptions) -> Self {
        Self {
            format,
            table: table.into(),
            options,
            pool: RecordPool::new(),
        }
    }

    /// Stream the input, invoking `on_chunk` zero or more times with up to
    /// `chunk_size` rows per call. For XLSX only the first sheet is read;
    /// the loader fans out the remaining sheets for re-readable sources.
    pub fn parse_chunked<R, F>(&mut self, reader: R, on_chunk: F) -> Result<()>
    where
        R: Read,
        F: FnMut(&Chunk) -> Result<()>,
    {
        let format = self.format;
        let mut driver = self.driver(on_chunk);
        match format {
            BaseFormat::Csv => csv_in::parse(b',', reader, &mut driver)?,
            BaseFormat::Tsv => csv_in::parse(b'\t', reader, &mut driver)?,
            BaseFormat::Ltsv => ltsv_in::parse(reader, &mut driver)?,
            BaseFormat::Parquet => parquet_in::parse(reader, &mut driver)?,
            BaseFormat::Xlsx => xlsx_in::parse_first_sheet(reader, &mut driver)?,
        }
        driver.finish()
    }

    /// Loader entry point for XLSX fan-out: run one already-extracted sheet
    /// range through the chunk pipeline under this parser's table name.
    pub(crate) fn parse_sheet<F>(
        &mut self,
        range: &calamine::Range<calamine::Data>,
        on_chunk: F,
    ) -> Result<()>
    where
        F: FnMut(&Chunk) -> Result<()>,
    {
        let mut driver = self.driver(on_chunk);
        xlsx_in::parse_range(range, &mut driver)?;
        driver.finish()
    }

    fn driver<'a, F: FnMut(&Chunk) -> Result<()>>(&'a mut self, on_chunk: F) -> ChunkDriver<'a, F> {
        ChunkDriver {
            table: &self.table,
            chunk_size: self.options.chunk_size.max(1),
            cancel: &self.options.cancel,
            memory: self.options.memory.as_deref_mut(),
            pool: &mut self.pool,
            on_chunk,
            header: None,
            columns: None,
            pending: Vec::new(),
            rows_seen: 0,
            chunks_emitted: 0,
        }
    }

    /// Materialise the whole input as one in-memory table.
    pub fn parse_whole<R: Read>(&mut self, reader: R) -> Result<Table> {
        let mut header: Vec<String> = Vec::new();
        let mut columns: Vec<ColumnInfo> = Vec::new();
        let mut records: Vec<Record> = Vec::new();

        self.parse_chunked(reader, |chunk| {
            if header.is_empty() {
                header = chunk.header.clone();
                columns = chunk.columns.clone();
            }
            records.extend(chunk.records.iter().cloned());
            Ok(())
        })?;

        Ok(Table {
            name: self.table.clone(),
            header,
            records,
            columns,
        })
    }
}

/// Batches records into chunks on behalf of a format reader.
///
/// State machine: header must be set exactly once before the first push;
/// the first flush infers the column types which then hold for the rest of
/// the input; `finish` emits a trailing zero-row chunk when the header was
/// readable but no records followed, so header-only inputs still create
/// their (empty, all-TEXT) table downstream.
pub(crate) struct ChunkDriver<'a, F: FnMut(&Chunk) -> Result<()>> {
    table: &'a str,
    chunk_size: usize,
    cancel: &'a CancelToken,
    memory: Option<&'a mut (dyn MemoryPolicy + 'static)>,
    pool: &'a mut RecordPool,
    on_chunk: F,
    header: Option<Vec<String>>,
    columns: Option<Vec<ColumnInfo>>,
    pending: Vec<Record>,
    rows_seen: u64,
    chunks_emitted: usize,
}

impl<F: FnMut(&Chunk) -> Result<()>> ChunkDriver<'_, F> {
    pub(crate) fn table(&self) -> &str {
        self.table
    }

    pub(crate) fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub(crate) fn header_len(&self) -> usize {
        self.header.as_ref().map(Vec::len).unwrap_or(0)
    }

    pub(crate) fn take_record(&mut self, width: usize) -> Record {
        self.pool.take_record(width)
    }

    pub(crate) fn take_string(&mut self) -> String {
        self.pool.take_string()
    }

    pub(crate) fn set_header(&mut self, raw: Vec<String>) -> Result<()> {
        let header = validate_header(self.table, raw)?;
        debug!(table = self.table, columns = header.len(), "header read");
        self.header = Some(header);
        Ok(())
    }

    pub(crate) fn push(&mut self, record: Record) -> Result<()> {
        self.cancel.check()?;
        self.rows_seen += 1;

        if let Some(policy) = self.memory.as_deref_mut() {
            match policy.observe(self.rows_seen) {
                MemoryStatus::Ok => {}
                MemoryStatus::Warning => {
                    self.chunk_size = (self.chunk_size / 2).max(1);
                    self.pool.trim();
                    warn!(
                        table = self.table,
                        chunk_size = self.chunk_size,
                        "memory warning, halving chunk size"
                    );
                }
                MemoryStatus::Exceeded => {
                    return Err(Error::MemoryLimitExceeded {
                        rows: self.rows_seen,
                    });
                }
            }
        }

        self.pending.push(record);
        if self.pending.len() >= self.chunk_size {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let header = match &self.header {
            Some(h) => h.clone(),
            None => return Err(Error::parse(self.table, "records before header")),
        };

        if self.columns.is_none() {
            self.columns = Some(infer_columns(&header, &self.pending));
        }
        let columns = self.columns.clone().unwrap_or_default();

        let mut chunk = Chunk {
            table_name: self.table.to_string(),
            header,
            records: std::mem::take(&mut self.pending),
            columns,
        };
        (self.on_chunk)(&chunk)?;
        self.chunks_emitted += 1;

        for record in chunk.records.drain(..) {
            self.pool.put_record(record);
        }
        Ok(())
    }

    pub(crate) fn finish(&mut self) -> Result<()> {
        if self.header.is_some() && (!self.pending.is_empty() || self.chunks_emitted == 0) {
            self.flush()?;
        }
        debug!(
            table = self.table,
            rows = self.rows_seen,
            chunks = self.chunks_emitted,
            "input parsed"
        );
        Ok(())
    }
}

#[cfg(test)]
impl<'a, F: FnMut(&Chunk) -> Result<()>> ChunkDriver<'a, F> {
    /// Bare driver for format-reader unit tests.
    pub(crate) fn for_tests(
        table: &'a str,
        chunk_size: usize,
        cancel: &'a CancelToken,
        pool: &'a mut RecordPool,
        on_chunk: F,
    ) -> Self {
        Self {
            table,
            chunk_size,
            cancel,
            memory: None,
            pool,
            on_chunk,
            header: None,
            columns: None,
            pending: Vec::new(),
            rows_seen: 0,
            chunks_emitted: 0,
        }
    }
}

fn infer_columns(header: &[String], records: &[Record]) -> Vec<ColumnInfo> {
    header
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let values: Vec<&str> = records.iter().map(|r| r[i].as_str()).collect();
            let column_type = if values.is_empty() {
                ColumnType::Text
            } else {
                infer::infer(&values)
            };
            ColumnInfo::new(name.clone(), column_type)
        })
        .collect()
}

/// Decode one raw field as UTF-8, tolerating stray bytes.
pub(crate) fn decode_field(field: &[u8], out: &mut String) {
    let field = field.strip_prefix(&[0xef, 0xbb, 0xbf][..]).unwrap_or(field);
    let (text, _, had_errors) = encoding_rs::UTF_8.decode(field);
    if had_errors {
        warn!("field contained invalid UTF-8, decoded lossily");
    }
    out.push_str(&text);
}
