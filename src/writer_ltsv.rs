//! LTSV output: `key:value` pairs joined by tabs, no header row.

use std::io::Write;

use crate::compress::FinishWrite;
use crate::error::Result;
use crate::schema::Cell;

pub(crate) struct LtsvWriter {
    sink: Box<dyn FinishWrite>,
    header: Vec<String>,
    line: String,
}

impl LtsvWriter {
    pub(crate) fn new(header: Vec<String>, sink: Box<dyn FinishWrite>) -> Self {
        Self {
            sink,
            header,
            line: String::new(),
        }
    }

    pub(crate) fn write_record(&mut self, record: &[Cell]) -> Result<()> {
        self.line.clear();
        for (i, name) in self.header.iter().enumerate() {
            if i > 0 {
                self.line.push('\t');
            }
            self.line.push_str(name);
            self.line.push(':');
            if let Some(cell) = record.get(i) {
                self.line.push_str(cell.as_str());
            }
        }
        self.line.push('\n');
        self.sink.write_all(self.line.as_bytes())?;
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<()> {
        self.sink.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress;
    use crate::filetype::{BaseFormat, Compression};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn records_become_tab_joined_pairs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.ltsv");
        let file = fs::File::create(&path).unwrap();
        let sink = compress::writer(BaseFormat::Ltsv, Compression::None, Box::new(file)).unwrap();

        let mut writer = LtsvWriter::new(vec!["host".to_string(), "status".to_string()], sink);
        writer
            .write_record(&[Cell::text("a"), Cell::text("200")])
            .unwrap();
        writer.write_record(&[Cell::Null, Cell::text("404")]).unwrap();
        writer.finish().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "host:a\tstatus:200\nhost:\tstatus:404\n");
    }
}
