//! Parquet output: an all-string nullable schema written as one record
//! batch. Rows are buffered because the footer needs complete column
//! statistics; external compression is rejected upstream since Parquet
//! carries its own codecs.

use arrow2::array::{Array, Utf8Array};
use arrow2::chunk::Chunk as ArrowChunk;
use arrow2::datatypes::{DataType, Field, Schema};
use arrow2::io::parquet::write::{
    transverse, CompressionOptions, Encoding, FileWriter, RowGroupIterator, Version, WriteOptions,
};

use crate::compress::FinishWrite;
use crate::error::Result;
use crate::schema::Cell;

pub(crate) struct ParquetTableWriter {
    sink: Box<dyn FinishWrite>,
    header: Vec<String>,
    columns: Vec<Vec<Option<String>>>,
}

impl ParquetTableWriter {
    pub(crate) fn new(header: Vec<String>, sink: Box<dyn FinishWrite>) -> Self {
        let columns = vec![Vec::new(); header.len()];
        Self {
            sink,
            header,
            columns,
        }
    }

    pub(crate) fn write_record(&mut self, record: &[Cell]) -> Result<()> {
        for (i, column) in self.columns.iter_mut().enumerate() {
            column.push(match record.get(i) {
                Some(Cell::Text(s)) => Some(s.clone()),
                Some(Cell::Null) | None => None,
            });
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<()> {
        let fields: Vec<Field> = self
            .header
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect();
        let schema = Schema::from(fields);

        let row_count = self.columns.first().map(Vec::len).unwrap_or(0);

        let options = WriteOptions {
            write_statistics: true,
            compression: CompressionOptions::Uncompressed,
            version: Version::V2,
            data_pagesize_limit: None,
        };
        let mut writer = FileWriter::try_new(self.sink, schema.clone(), options)?;

        if row_count > 0 {
            let arrays: Vec<Box<dyn Array>> = self
                .columns
                .into_iter()
                .map(|column| {
                    let array: Utf8Array<i32> = column.into_iter().collect();
                    array.boxed()
                })
                .collect();
            let chunk = ArrowChunk::new(arrays);

            let encodings: Vec<Vec<Encoding>> = schema
                .fields
                .iter()
                .map(|f| transverse(&f.data_type, |_| Encoding::Plain))
                .collect();
            let row_groups = RowGroupIterator::try_new(
                std::iter::once(arrow2::error::Result::Ok(chunk)),
                &schema,
                options,
                encodings,
            )?;
            for group in row_groups {
                writer.write(group?)?;
            }
        }

        writer.end(None)?;
        writer.into_inner().finish()
    }
}
