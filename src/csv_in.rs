//! Chunked CSV/TSV reading.

use std::io::{BufRead, BufReader, Read};

use csv::{ByteRecord, ReaderBuilder};

use crate::error::{Error, Result};
use crate::parse::{decode_field, ChunkDriver};
use crate::schema::{Cell, Chunk};

const UTF8_BOM: &[u8] = &[0xef, 0xbb, 0xbf];

/// Parse a delimited stream. The first record is the header; every data row
/// must have exactly the header's field count (the underlying reader is not
/// flexible, so a mismatch is a parse error).
pub(crate) fn parse<R, F>(delimiter: u8, reader: R, driver: &mut ChunkDriver<'_, F>) -> Result<()>
where
    R: Read,
    F: FnMut(&Chunk) -> Result<()>,
{
    let mut buffered = BufReader::new(reader);

    // Zero payload bytes is EmptyInput; anything else (even whitespace) is
    // left to the parser proper.
    let head = buffered.fill_buf()?;
    if head.is_empty() {
        return Err(Error::EmptyInput {
            table: driver.table().to_string(),
        });
    }
    let bom = head.starts_with(UTF8_BOM);
    if bom {
        buffered.consume(UTF8_BOM.len());
    }

    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(false)
        .from_reader(buffered);

    let mut raw = ByteRecord::new();
    if !read_record(driver.table(), &mut csv_reader, &mut raw)? {
        return Err(Error::EmptyInput {
            table: driver.table().to_string(),
        });
    }

    let mut header = Vec::with_capacity(raw.len());
    for field in raw.iter() {
        let mut name = String::new();
        decode_field(field, &mut name);
        header.push(name);
    }
    driver.set_header(header)?;

    while read_record(driver.table(), &mut csv_reader, &mut raw)? {
        let mut record = driver.take_record(raw.len());
        for field in raw.iter() {
            let mut value = driver.take_string();
            decode_field(field, &mut value);
            record.push(Cell::Text(value));
        }
        driver.push(record)?;
    }

    Ok(())
}

fn read_record<R: Read>(
    table: &str,
    reader: &mut csv::Reader<R>,
    record: &mut ByteRecord,
) -> Result<bool> {
    reader
        .read_byte_record(record)
        .map_err(|e| Error::parse(table, e.to_string()))
}
