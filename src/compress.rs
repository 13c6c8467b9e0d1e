//! Transparent decompression readers and compression writers.
//!
//! Readers validate the stream's magic bytes up front so a corrupt or
//! mislabelled file fails with [`Error::CompressionInit`] at open rather
//! than midway through a load. Bzip2 is read-only.

use std::io::{BufRead, BufReader, Read, Write};

use bzip2::bufread::BzDecoder;
use flate2::bufread::MultiGzDecoder;
use flate2::write::GzEncoder;
use xz2::bufread::XzDecoder;
use xz2::write::XzEncoder;

use crate::error::{Error, Result};
use crate::filetype::{BaseFormat, Compression};

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";
const XZ_MAGIC: &[u8] = &[0xfd, b'7', b'z', b'X', b'Z', 0x00];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];

/// Layer a decompressor over `raw`. `Compression::None` returns the raw
/// reader unchanged.
pub fn reader(kind: Compression, raw: Box<dyn Read + Send>) -> Result<Box<dyn Read + Send>> {
    if kind == Compression::None {
        return Ok(raw);
    }

    let mut buffered = BufReader::new(raw);
    check_magic(kind, &mut buffered)?;

    Ok(match kind {
        Compression::None => unreachable!("handled above"),
        Compression::Gzip => Box::new(MultiGzDecoder::new(buffered)),
        Compression::Bzip2 => Box::new(BzDecoder::new(buffered)),
        Compression::Xz => Box::new(XzDecoder::new(buffered)),
        Compression::Zstd => Box::new(
            zstd::stream::read::Decoder::with_buffer(buffered)
                .map_err(|e| Error::CompressionInit {
                    message: format!("zstd: {e}"),
                })?,
        ),
    })
}

fn check_magic(kind: Compression, buffered: &mut BufReader<Box<dyn Read + Send>>) -> Result<()> {
    let magic = match kind {
        Compression::None => return Ok(()),
        Compression::Gzip => GZIP_MAGIC,
        Compression::Bzip2 => BZIP2_MAGIC,
        Compression::Xz => XZ_MAGIC,
        Compression::Zstd => ZSTD_MAGIC,
    };
    let head = buffered.fill_buf()?;
    if head.len() < magic.len() || &head[..magic.len()] != magic {
        return Err(Error::CompressionInit {
            message: format!("{kind} stream has an invalid header"),
        });
    }
    Ok(())
}

/// A writer that must be finalised exactly once to flush trailing codec
/// frames into the underlying sink.
pub trait FinishWrite: Write {
    fn finish(self: Box<Self>) -> Result<()>;
}

impl std::fmt::Debug for dyn FinishWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<dyn FinishWrite>")
    }
}

/// Layer a compressor over `sink`. Bzip2 has no writer and Parquet carries
/// its own internal compression; both are rejected.
pub fn writer(
    format: BaseFormat,
    kind: Compression,
    sink: Box<dyn Write>,
) -> Result<Box<dyn FinishWrite>> {
    match (format, kind) {
        (_, Compression::Bzip2) | (BaseFormat::Parquet, Compression::Gzip)
        | (BaseFormat::Parquet, Compression::Xz) | (BaseFormat::Parquet, Compression::Zstd) => {
            return Err(Error::UnsupportedCompression {
                format,
                compression: kind,
            })
        }
        _ => {}
    }

    Ok(match kind {
        Compression::None => Box::new(Plain(sink)),
        Compression::Gzip => Box::new(Gz(GzEncoder::new(sink, flate2::Compression::default()))),
        Compression::Xz => Box::new(Xz(XzEncoder::new(sink, 6))),
        Compression::Zstd => Box::new(Zst(zstd::stream::write::Encoder::new(sink, 0)?)),
        Compression::Bzip2 => unreachable!("rejected above"),
    })
}

struct Plain(Box<dyn Write>);

impl Write for Plain {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }
}

impl FinishWrite for Plain {
    fn finish(mut self: Box<Self>) -> Result<()> {
        self.0.flush()?;
        Ok(())
    }
}

struct Gz(GzEncoder<Box<dyn Write>>);

impl Write for Gz {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }
}

impl FinishWrite for Gz {
    fn finish(self: Box<Self>) -> Result<()> {
        let mut inner = self.0.finish()?;
        inner.flush()?;
        Ok(())
    }
}

struct Xz(XzEncoder<Box<dyn Write>>);

impl Write for Xz {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }
}

impl FinishWrite for Xz {
    fn finish(self: Box<Self>) -> Result<()> {
        let mut inner = self.0.finish()?;
        inner.flush()?;
        Ok(())
    }
}

struct Zst(zstd::stream::write::Encoder<'static, Box<dyn Write>>);

impl Write for Zst {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }
}

impl FinishWrite for Zst {
    fn finish(self: Box<Self>) -> Result<()> {
        let mut inner = self.0.finish()?;
        inner.flush()?;
        Ok(())
    }
}
