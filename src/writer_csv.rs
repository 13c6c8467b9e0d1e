//! Delimited (CSV/TSV) output over an arbitrary sink.

use csv::WriterBuilder;

use crate::compress::FinishWrite;
use crate::error::{Error, Result};
use crate::schema::Cell;

pub(crate) struct DelimitedWriter {
    writer: csv::Writer<Box<dyn FinishWrite>>,
}

impl DelimitedWriter {
    pub(crate) fn new(delimiter: u8, sink: Box<dyn FinishWrite>) -> Self {
        Self {
            writer: WriterBuilder::new().delimiter(delimiter).from_writer(sink),
        }
    }

    pub(crate) fn write_header(&mut self, header: &[String]) -> Result<()> {
        self.writer.write_record(header)?;
        Ok(())
    }

    /// NULL serialises to the empty field.
    pub(crate) fn write_record(&mut self, record: &[Cell]) -> Result<()> {
        self.writer
            .write_record(record.iter().map(|cell| cell.as_str()))?;
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<()> {
        let sink = self.writer.into_inner().map_err(|e| {
            Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })?;
        sink.finish()
    }
}
