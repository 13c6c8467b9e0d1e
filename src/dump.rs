//! Serialising engine tables back to files.
//!
//! The dumper walks the catalog, streams every user table through a format
//! writer layered over a compression writer, and overwrites prior output.
//! Equal engine state always produces the same files.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::compress;
use crate::error::{Error, Result};
use crate::filetype::{BaseFormat, Compression, FileType};
use crate::load::quote_ident;
use crate::schema::Cell;
use crate::writer_csv::DelimitedWriter;
use crate::writer_ltsv::LtsvWriter;
use crate::writer_parquet::ParquetTableWriter;

/// Output format and compression for a dump. The pair must be writable:
/// Bzip2 has no writer, Parquet refuses external compression, and there is
/// no XLSX writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpOptions {
    pub format: BaseFormat,
    pub compression: Compression,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            format: BaseFormat::Csv,
            compression: Compression::None,
        }
    }
}

impl DumpOptions {
    pub fn new(format: BaseFormat, compression: Compression) -> Self {
        Self {
            format,
            compression,
        }
    }

    pub fn file_type(&self) -> FileType {
        FileType::new(self.format, self.compression)
    }

    pub fn validate(&self) -> Result<()> {
        if self.format == BaseFormat::Xlsx {
            return Err(Error::UnsupportedDumpFormat {
                format: self.format,
            });
        }
        if self.compression == Compression::Bzip2
            || (self.format == BaseFormat::Parquet && self.compression != Compression::None)
        {
            return Err(Error::UnsupportedCompression {
                format: self.format,
                compression: self.compression,
            });
        }
        Ok(())
    }
}

/// Write every user table in `conn` to `dir` as
/// `<table><format.ext><compression.ext>`, creating the directory if
/// missing. Existing files are overwritten.
pub fn dump_database(
    conn: &Connection,
    dir: impl AsRef<Path>,
    options: &DumpOptions,
) -> Result<()> {
    let dir = dir.as_ref();
    options.validate()?;
    create_output_dir(dir)?;

    let tables = user_tables(conn)?;
    for table in &tables {
        dump_table(conn, dir, table, options)?;
    }
    info!(dir = %dir.display(), tables = tables.len(), "database dumped");
    Ok(())
}

#[cfg(unix)]
fn create_output_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o750)
        .create(dir)
        .map_err(|e| Error::file_io(dir, e))
}

#[cfg(not(unix))]
fn create_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| Error::file_io(dir, e))
}

/// All user tables, excluding the engine's own `sqlite_*` bookkeeping.
pub(crate) fn user_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Column names in declaration order.
fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

enum FormatWriter {
    Delimited(DelimitedWriter),
    Ltsv(LtsvWriter),
    Parquet(ParquetTableWriter),
}

impl FormatWriter {
    fn write_record(&mut self, record: &[Cell]) -> Result<()> {
        match self {
            FormatWriter::Delimited(w) => w.write_record(record),
            FormatWriter::Ltsv(w) => w.write_record(record),
            FormatWriter::Parquet(w) => w.write_record(record),
        }
    }

    fn finish(self) -> Result<()> {
        match self {
            FormatWriter::Delimited(w) => w.finish(),
            FormatWriter::Ltsv(w) => w.finish(),
            FormatWriter::Parquet(w) => w.finish(),
        }
    }
}

fn dump_table(conn: &Connection, dir: &Path, table: &str, options: &DumpOptions) -> Result<()> {
    let header = column_names(conn, table)?;
    let path = dir.join(format!("{table}{}", options.file_type().extension()));
    debug!(table, path = %path.display(), "dumping table");

    let file = File::create(&path).map_err(|e| Error::file_io(&path, e))?;
    let sink = compress::writer(
        options.format,
        options.compression,
        Box::new(BufWriter::new(file)),
    )?;

    let mut writer = match options.format {
        BaseFormat::Csv => {
            let mut w = DelimitedWriter::new(b',', sink);
            w.write_header(&header)?;
            FormatWriter::Delimited(w)
        }
        BaseFormat::Tsv => {
            let mut w = DelimitedWriter::new(b'\t', sink);
            w.write_header(&header)?;
            FormatWriter::Delimited(w)
        }
        BaseFormat::Ltsv => FormatWriter::Ltsv(LtsvWriter::new(header.clone(), sink)),
        BaseFormat::Parquet => FormatWriter::Parquet(ParquetTableWriter::new(header.clone(), sink)),
        BaseFormat::Xlsx => {
            return Err(Error::UnsupportedDumpFormat {
                format: options.format,
            })
        }
    };

    let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_ident(table)))?;
    let mut rows = stmt.query([])?;
    let mut record: Vec<Cell> = Vec::with_capacity(header.len());
    while let Some(row) = rows.next()? {
        record.clear();
        for i in 0..header.len() {
            record.push(value_to_cell(row.get_ref(i)?));
        }
        writer.write_record(&record)?;
    }

    writer.finish()
}

fn value_to_cell(value: ValueRef<'_>) -> Cell {
    match value {
        ValueRef::Null => Cell::Null,
        ValueRef::Integer(i) => Cell::Text(i.to_string()),
        ValueRef::Real(r) => Cell::Text(r.to_string()),
        ValueRef::Text(t) => Cell::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Cell::Text(String::from_utf8_lossy(b).into_owned()),
    }
}
