//! Parquet reading via Arrow record batches.
//!
//! Parquet needs random access, so the stream is buffered fully before the
//! footer is read. Every cell is rendered to text with a fixed mapping;
//! the Arrow schema contributes only the header names, and column typing is
//! left to the inference pass like any other format.

use std::io::{Cursor, Read};

use arrow2::array::{Array, BinaryArray, BooleanArray, PrimitiveArray, Utf8Array};
use arrow2::datatypes::DataType;
use arrow2::io::parquet::read::{infer_schema, FileReader};
use parquet2::read::read_metadata;

use crate::error::{Error, Result};
use crate::parse::ChunkDriver;
use crate::schema::{Cell, Chunk};

pub(crate) fn parse<R, F>(mut reader: R, driver: &mut ChunkDriver<'_, F>) -> Result<()>
where
    R: Read,
    F: FnMut(&Chunk) -> Result<()>,
{
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;
    if buffer.is_empty() {
        return Err(Error::EmptyInput {
            table: driver.table().to_string(),
        });
    }

    let mut cursor = Cursor::new(buffer);
    let metadata = read_metadata(&mut cursor)?;
    let schema = infer_schema(&metadata)?;

    let header: Vec<String> = schema.fields.iter().map(|f| f.name.clone()).collect();
    driver.set_header(header)?;

    let batch_size = driver.chunk_size();
    let batches = FileReader::new(
        cursor,
        metadata.row_groups,
        schema,
        Some(batch_size),
        None,
        None,
    );

    for batch in batches {
        let batch = batch?;
        let arrays = batch.arrays();
        for row in 0..batch.len() {
            let mut record = driver.take_record(arrays.len());
            for array in arrays {
                record.push(cell_at(driver.table(), array.as_ref(), row)?);
            }
            driver.push(record)?;
        }
    }

    Ok(())
}

/// Render one Arrow cell as text. Booleans become `"1"`/`"0"`, dates and
/// timestamps their raw integer value, binary is decoded as UTF-8.
fn cell_at(table: &str, array: &dyn Array, row: usize) -> Result<Cell> {
    if array.is_null(row) {
        return Ok(Cell::Null);
    }

    let text = match array.data_type() {
        DataType::Boolean => {
            let a = downcast::<BooleanArray>(table, array)?;
            if a.value(row) { "1" } else { "0" }.to_string()
        }
        DataType::Int8 => downcast::<PrimitiveArray<i8>>(table, array)?.value(row).to_string(),
        DataType::Int16 => downcast::<PrimitiveArray<i16>>(table, array)?.value(row).to_string(),
        DataType::Int32 => downcast::<PrimitiveArray<i32>>(table, array)?.value(row).to_string(),
        DataType::Int64 => downcast::<PrimitiveArray<i64>>(table, array)?.value(row).to_string(),
        DataType::UInt8 => downcast::<PrimitiveArray<u8>>(table, array)?.value(row).to_string(),
        DataType::UInt16 => downcast::<PrimitiveArray<u16>>(table, array)?.value(row).to_string(),
        DataType::UInt32 => downcast::<PrimitiveArray<u32>>(table, array)?.value(row).to_string(),
        DataType::UInt64 => downcast::<PrimitiveArray<u64>>(table, array)?.value(row).to_string(),
        DataType::Float32 => downcast::<PrimitiveArray<f32>>(table, array)?.value(row).to_string(),
        DataType::Float64 => downcast::<PrimitiveArray<f64>>(table, array)?.value(row).to_string(),
        DataType::Utf8 => downcast::<Utf8Array<i32>>(table, array)?.value(row).to_string(),
        DataType::LargeUtf8 => downcast::<Utf8Array<i64>>(table, array)?.value(row).to_string(),
        DataType::Binary => {
            String::from_utf8_lossy(downcast::<BinaryArray<i32>>(table, array)?.value(row))
                .into_owned()
        }
        DataType::LargeBinary => {
            String::from_utf8_lossy(downcast::<BinaryArray<i64>>(table, array)?.value(row))
                .into_owned()
        }
        DataType::Date32 => downcast::<PrimitiveArray<i32>>(table, array)?.value(row).to_string(),
        DataType::Date64 | DataType::Timestamp(_, _) => {
            downcast::<PrimitiveArray<i64>>(table, array)?.value(row).to_string()
        }
        DataType::Time32(_) => downcast::<PrimitiveArray<i32>>(table, array)?.value(row).to_string(),
        DataType::Time64(_) => downcast::<PrimitiveArray<i64>>(table, array)?.value(row).to_string(),
        other => {
            return Err(Error::parse(
                table,
                format!("unsupported parquet column type {other:?}"),
            ))
        }
    };
    Ok(Cell::Text(text))
}

fn downcast<'a, T: 'static>(table: &str, array: &'a dyn Array) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::parse(table, "parquet column storage did not match its type"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filetype::BaseFormat;
    use crate::parse::{ParseOptions, Parser};
    use crate::schema::ColumnType;
    use arrow2::array::{Float64Array, Int64Array};
    use arrow2::chunk::Chunk as ArrowChunk;
    use arrow2::datatypes::{Field, Schema};
    use arrow2::io::parquet::write::{
        transverse, CompressionOptions, Encoding, FileWriter, RowGroupIterator, Version,
        WriteOptions,
    };

    /// Build a small parquet file in memory.
    fn sample_parquet() -> Vec<u8> {
        let schema = Schema::from(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("name", DataType::Utf8, true),
            Field::new("score", DataType::Float64, true),
            Field::new("active", DataType::Boolean, true),
        ]);

        let id = Int64Array::from_slice([1, 2, 3]).boxed();
        let name: Utf8Array<i32> = [Some("Gina"), None, Some("Vika")].into_iter().collect();
        let name = name.boxed();
        let score = Float64Array::from_slice([1.5, 2.0, 3.25]).boxed();
        let active = BooleanArray::from_slice([true, false, true]).boxed();
        let chunk = ArrowChunk::new(vec![id, name, score, active]);

        let options = WriteOptions {
            write_statistics: true,
            compression: CompressionOptions::Uncompressed,
            version: Version::V2,
            data_pagesize_limit: None,
        };
        let encodings: Vec<Vec<Encoding>> = schema
            .fields
            .iter()
            .map(|f| transverse(&f.data_type, |_| Encoding::Plain))
            .collect();
        let row_groups = RowGroupIterator::try_new(
            std::iter::once(Ok(chunk)),
            &schema,
            options,
            encodings,
        )
        .unwrap();

        let mut writer = FileWriter::try_new(Vec::new(), schema, options).unwrap();
        for group in row_groups {
            writer.write(group.unwrap()).unwrap();
        }
        writer.end(None).unwrap();
        writer.into_inner()
    }

    #[test]
    fn reads_parquet_into_text_records() {
        let bytes = sample_parquet();
        let mut parser = Parser::new(BaseFormat::Parquet, "sample", ParseOptions::default());
        let table = parser.parse_whole(Cursor::new(bytes)).unwrap();

        assert_eq!(table.header, vec!["id", "name", "score", "active"]);
        assert_eq!(table.records.len(), 3);
        assert_eq!(table.records[0][0], Cell::text("1"));
        assert_eq!(table.records[0][3], Cell::text("1"));
        assert_eq!(table.records[1][1], Cell::Null);
        assert_eq!(table.records[2][2], Cell::text("3.25"));
    }

    #[test]
    fn parquet_types_come_from_inference_not_arrow() {
        let bytes = sample_parquet();
        let mut parser = Parser::new(BaseFormat::Parquet, "sample", ParseOptions::default());
        let table = parser.parse_whole(Cursor::new(bytes)).unwrap();

        assert_eq!(table.columns[0].column_type, ColumnType::Integer);
        assert_eq!(table.columns[1].column_type, ColumnType::Text);
        assert_eq!(table.columns[2].column_type, ColumnType::Real);
        // Booleans render as "1"/"0" and therefore infer INTEGER.
        assert_eq!(table.columns[3].column_type, ColumnType::Integer);
    }

    #[test]
    fn respects_chunk_size() {
        let bytes = sample_parquet();
        let mut parser = Parser::new(
            BaseFormat::Parquet,
            "sample",
            ParseOptions {
                chunk_size: 2,
                ..ParseOptions::default()
            },
        );
        let mut sizes = Vec::new();
        parser
            .parse_chunked(Cursor::new(bytes), |chunk| {
                sizes.push(chunk.records.len());
                Ok(())
            })
            .unwrap();
        assert_eq!(sizes, vec![2, 1]);
    }

    #[test]
    fn empty_stream_is_empty_input() {
        let mut parser = Parser::new(BaseFormat::Parquet, "sample", ParseOptions::default());
        let err = parser.parse_whole(Cursor::new(Vec::new())).unwrap_err();
        assert!(matches!(err, Error::EmptyInput { .. }));
    }
}
