//! XLSX reading via calamine.
//!
//! Workbooks need random access, so the stream is buffered fully. The
//! parser path reads only the first sheet; the loader re-opens re-readable
//! sources and fans every non-empty sheet out to its own table.

use std::io::{Cursor, Read};

use calamine::{Data, Range, Reader, Xlsx};

use crate::error::{Error, Result};
use crate::parse::ChunkDriver;
use crate::schema::{Cell, Chunk};

pub(crate) type Workbook = Xlsx<Cursor<Vec<u8>>>;

/// Buffer the stream and open it as a workbook.
pub(crate) fn read_workbook<R: Read>(table: &str, mut reader: R) -> Result<Workbook> {
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;
    if buffer.is_empty() {
        return Err(Error::EmptyInput {
            table: table.to_string(),
        });
    }
    Ok(Xlsx::new(Cursor::new(buffer))?)
}

/// Parser entry point: first sheet only.
pub(crate) fn parse_first_sheet<R, F>(reader: R, driver: &mut ChunkDriver<'_, F>) -> Result<()>
where
    R: Read,
    F: FnMut(&Chunk) -> Result<()>,
{
    let mut workbook = read_workbook(driver.table(), reader)?;
    let names = workbook.sheet_names().to_vec();
    let first = names.first().ok_or_else(|| Error::EmptyInput {
        table: driver.table().to_string(),
    })?;
    let range = workbook.worksheet_range(first)?;
    parse_range(&range, driver)
}

/// Load one sheet's cell range through the driver. Leading empty rows are
/// skipped; the first non-empty row is the header; short rows pad with
/// empty strings and extra trailing cells are dropped.
pub(crate) fn parse_range<F>(range: &Range<Data>, driver: &mut ChunkDriver<'_, F>) -> Result<()>
where
    F: FnMut(&Chunk) -> Result<()>,
{
    let mut rows = range.rows().skip_while(|row| row_is_empty(row));

    let header_row = rows.next().ok_or_else(|| Error::EmptyInput {
        table: driver.table().to_string(),
    })?;
    let mut header: Vec<String> = header_row.iter().map(cell_text).collect();
    while header.last().is_some_and(|name| name.trim().is_empty()) {
        header.pop();
    }
    driver.set_header(header)?;

    let width = driver.header_len();
    for row in rows {
        let mut record = driver.take_record(width);
        for i in 0..width {
            let mut value = driver.take_string();
            if let Some(cell) = row.get(i) {
                push_cell_text(cell, &mut value);
            }
            record.push(Cell::Text(value));
        }
        driver.push(record)?;
    }
    Ok(())
}

pub(crate) fn row_is_empty(row: &[Data]) -> bool {
    row.iter().all(|cell| matches!(cell, Data::Empty))
}

pub(crate) fn range_has_content(range: &Range<Data>) -> bool {
    range.rows().any(|row| !row_is_empty(row))
}

fn cell_text(cell: &Data) -> String {
    let mut out = String::new();
    push_cell_text(cell, &mut out);
    out
}

fn push_cell_text(cell: &Data, out: &mut String) {
    match cell {
        Data::Empty => {}
        Data::String(s) => out.push_str(s),
        Data::Int(i) => out.push_str(&i.to_string()),
        Data::Float(f) => out.push_str(&f.to_string()),
        Data::Bool(b) => out.push(if *b { '1' } else { '0' }),
        Data::DateTime(dt) => out.push_str(&dt.as_f64().to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => out.push_str(s),
        Data::Error(e) => out.push_str(&e.to_string()),
    }
}
