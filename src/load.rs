//! Chunked loading of resolved inputs into SQLite.
//!
//! Each input gets its own transaction: the table is created from the
//! first chunk's schema, one prepared insert is reused for every record,
//! and the source reader is closed as soon as its parser returns. XLSX
//! inputs backed by a path or virtual filesystem fan out into one table
//! per non-empty sheet.

use std::fs::File;
use std::io::Read;

use calamine::Reader as _;

use rusqlite::{params_from_iter, Connection, Statement};
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::compress;
use crate::error::{Error, Result};
use crate::filetype::{BaseFormat, FileType};
use crate::parse::{ParseOptions, Parser};
use crate::pool::{MemoryPolicy, RssWatchdog};
use crate::resolve::{ResolvedInput, Source};
use crate::schema::Chunk;
use crate::xlsx_in;

pub(crate) struct LoadOptions {
    pub chunk_size: usize,
    pub cancel: CancelToken,
    pub memory_limit: Option<u64>,
}

impl LoadOptions {
    fn parser_options(&self) -> ParseOptions {
        ParseOptions {
            chunk_size: self.chunk_size,
            cancel: self.cancel.clone(),
            memory: self
                .memory_limit
                .and_then(RssWatchdog::new)
                .map(|w| Box::new(w) as Box<dyn MemoryPolicy>),
        }
    }
}

pub(crate) fn load_inputs(
    conn: &Connection,
    inputs: Vec<ResolvedInput>,
    options: &LoadOptions,
) -> Result<()> {
    for input in inputs {
        load_one(conn, input, options)?;
    }
    Ok(())
}

fn load_one(conn: &Connection, input: ResolvedInput, options: &LoadOptions) -> Result<()> {
    let origin = input.origin();
    let ResolvedInput {
        source,
        table_name,
        file_type,
    } = input;

    let fan_out = file_type.base == BaseFormat::Xlsx
        && matches!(source, Source::Path(_) | Source::Vfs { .. });

    let reader = open_source(source, file_type)?;
    if fan_out {
        load_xlsx_fanout(conn, &table_name, reader, options)
    } else {
        ensure_absent(conn, &table_name)?;
        let mut parser = Parser::new(file_type.base, table_name.as_str(), options.parser_options());
        load_chunks(conn, |sink| parser.parse_chunked(reader, sink))?;
        info!(table = %table_name, origin = %origin, "table loaded");
        Ok(())
    }
}

/// Open the underlying bytes and layer the input's decompressor.
fn open_source(source: Source, file_type: FileType) -> Result<Box<dyn Read + Send>> {
    let raw: Box<dyn Read + Send> = match source {
        Source::Path(path) => {
            Box::new(File::open(&path).map_err(|e| Error::file_io(path, e))?)
        }
        Source::Stream(reader) => reader,
        Source::Vfs { fs, entry } => fs.open(&entry)?,
    };
    compress::reader(file_type.compression, raw)
}

/// Every non-empty sheet becomes a sibling table named `<base>_<sheet>`.
fn load_xlsx_fanout(
    conn: &Connection,
    base: &str,
    reader: Box<dyn Read + Send>,
    options: &LoadOptions,
) -> Result<()> {
    let mut workbook = xlsx_in::read_workbook(base, reader)?;
    let sheets = workbook.sheet_names().to_vec();

    let mut loaded = 0usize;
    for sheet in &sheets {
        let range = workbook.worksheet_range(sheet)?;
        if !xlsx_in::range_has_content(&range) {
            debug!(base, sheet = %sheet, "skipping empty sheet");
            continue;
        }
        let table_name = format!("{base}_{}", sanitize_sheet_name(sheet));
        ensure_absent(conn, &table_name)?;
        let mut parser = Parser::new(BaseFormat::Xlsx, table_name.as_str(), options.parser_options());
        load_chunks(conn, |sink| parser.parse_sheet(&range, sink))?;
        info!(table = %table_name, sheet = %sheet, "sheet loaded");
        loaded += 1;
    }

    if loaded == 0 {
        return Err(Error::EmptyInput {
            table: base.to_string(),
        });
    }
    Ok(())
}

/// Sheet names become identifier-safe: anything outside `[A-Za-z0-9_]`
/// turns into `_`, a leading digit gains a `table_` prefix, and an empty
/// result becomes `table`.
fn sanitize_sheet_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() {
        return "table".to_string();
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert_str(0, "table_");
    }
    out
}

/// Run one input's chunks inside a transaction: create the table from the
/// first chunk, then reuse a single prepared insert.
fn load_chunks(
    conn: &Connection,
    drive: impl FnOnce(&mut dyn FnMut(&Chunk) -> Result<()>) -> Result<()>,
) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt: Option<Statement<'_>> = None;
        let tx_ref = &tx;
        let mut sink = |chunk: &Chunk| -> Result<()> {
            if stmt.is_none() {
                tx_ref.execute_batch(&create_table_sql(chunk))?;
                if !chunk.header.is_empty() {
                    stmt = Some(tx_ref.prepare(&insert_sql(chunk))?);
                }
            }
            if let Some(stmt) = stmt.as_mut() {
                for record in &chunk.records {
                    stmt.execute(params_from_iter(record.iter()))?;
                }
            }
            Ok(())
        };
        drive(&mut sink)?;
    }
    tx.commit()?;
    Ok(())
}

fn ensure_absent(conn: &Connection, table: &str) -> Result<()> {
    if table_exists(conn, table)? {
        return Err(Error::DuplicateTable {
            table: table.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let mut stmt =
        conn.prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
    Ok(stmt.exists([table])?)
}

fn create_table_sql(chunk: &Chunk) -> String {
    let columns: Vec<String> = chunk
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.column_type.sql_type()))
        .collect();
    format!(
        "CREATE TABLE {} ({})",
        quote_ident(&chunk.table_name),
        columns.join(", ")
    )
}

fn insert_sql(chunk: &Chunk) -> String {
    let placeholders = vec!["?"; chunk.header.len()].join(", ");
    format!(
        "INSERT INTO {} VALUES ({})",
        quote_ident(&chunk.table_name),
        placeholders
    )
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
