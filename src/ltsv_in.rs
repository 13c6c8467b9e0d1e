//! LTSV reading: tab-separated `key:value` pairs, one record per line.
//!
//! LTSV carries no header row, so the whole stream is read up front and
//! processed in two passes: pass one unions the keys of every line in
//! first-seen order (the header), pass two aligns each line to that header,
//! filling absent keys with the empty string.

use std::collections::{HashMap, HashSet};
use std::io::{BufRead, BufReader, Read};

use crate::error::{Error, Result};
use crate::parse::ChunkDriver;
use crate::schema::{Cell, Chunk};

pub(crate) fn parse<R, F>(reader: R, driver: &mut ChunkDriver<'_, F>) -> Result<()>
where
    R: Read,
    F: FnMut(&Chunk) -> Result<()>,
{
    let mut buffered = BufReader::new(reader);
    let head = buffered.fill_buf()?;
    if head.is_empty() {
        return Err(Error::EmptyInput {
            table: driver.table().to_string(),
        });
    }

    let mut text = String::new();
    buffered.read_to_string(&mut text)?;

    // Pass 1: collect records and the ordered key union.
    let mut keys: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut rows: Vec<Vec<(String, String)>> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let mut pairs: Vec<(String, String)> = Vec::new();
        for field in line.split('\t') {
            if let Some((key, value)) = field.split_once(':') {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                pairs.push((key.to_string(), value.to_string()));
            }
        }
        if pairs.is_empty() {
            continue;
        }
        for (key, _) in &pairs {
            if seen.insert(key.clone()) {
                keys.push(key.clone());
            }
        }
        rows.push(pairs);
    }

    if rows.is_empty() {
        return Err(Error::NoValidRecords {
            table: driver.table().to_string(),
        });
    }

    driver.set_header(keys.clone())?;

    // Pass 2: align every record to the header. A key repeated within one
    // line keeps its last value.
    for pairs in rows {
        let by_key: HashMap<&str, &str> = pairs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let mut record = driver.take_record(keys.len());
        for key in &keys {
            let mut value = driver.take_string();
            if let Some(v) = by_key.get(key.as_str()) {
                value.push_str(v);
            }
            record.push(Cell::Text(value));
        }
        driver.push(record)?;
    }

    Ok(())
}
