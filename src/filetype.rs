//! File-type classification from file names.
//!
//! Classification is pure string work: lowercase the basename, strip one
//! compression suffix if present, then match the remaining extension against
//! the known base formats. The filesystem is never touched here.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseFormat {
    Csv,
    Tsv,
    Ltsv,
    Parquet,
    Xlsx,
}

impl BaseFormat {
    pub const ALL: [BaseFormat; 5] = [
        BaseFormat::Csv,
        BaseFormat::Tsv,
        BaseFormat::Ltsv,
        BaseFormat::Parquet,
        BaseFormat::Xlsx,
    ];

    /// Canonical extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            BaseFormat::Csv => ".csv",
            BaseFormat::Tsv => ".tsv",
            BaseFormat::Ltsv => ".ltsv",
            BaseFormat::Parquet => ".parquet",
            BaseFormat::Xlsx => ".xlsx",
        }
    }

    fn from_suffix(name: &str) -> Option<Self> {
        BaseFormat::ALL
            .into_iter()
            .find(|base| name.ends_with(base.extension()))
    }
}

impl fmt::Display for BaseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BaseFormat::Csv => "csv",
            BaseFormat::Tsv => "tsv",
            BaseFormat::Ltsv => "ltsv",
            BaseFormat::Parquet => "parquet",
            BaseFormat::Xlsx => "xlsx",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    pub const ALL: [Compression; 5] = [
        Compression::None,
        Compression::Gzip,
        Compression::Bzip2,
        Compression::Xz,
        Compression::Zstd,
    ];

    /// Canonical extension suffix; empty for `None`.
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip => ".gz",
            Compression::Bzip2 => ".bz2",
            Compression::Xz => ".xz",
            Compression::Zstd => ".zst",
        }
    }

    fn from_suffix(name: &str) -> Option<Self> {
        [
            Compression::Gzip,
            Compression::Bzip2,
            Compression::Xz,
            Compression::Zstd,
        ]
        .into_iter()
        .find(|c| name.ends_with(c.extension()))
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Bzip2 => "bzip2",
            Compression::Xz => "xz",
            Compression::Zstd => "zstd",
        };
        f.write_str(name)
    }
}

/// A recognised `(base format, compression)` pair. Unsupported names
/// classify to `None` rather than a sentinel variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileType {
    pub base: BaseFormat,
    pub compression: Compression,
}

impl FileType {
    pub fn new(base: BaseFormat, compression: Compression) -> Self {
        Self { base, compression }
    }

    /// Classify a path by its basename. Case-insensitive.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let name = basename(path.as_ref()).to_ascii_lowercase();
        let (compression, stem) = match Compression::from_suffix(&name) {
            Some(c) => (c, &name[..name.len() - c.extension().len()]),
            None => (Compression::None, name.as_str()),
        };
        BaseFormat::from_suffix(stem).map(|base| FileType { base, compression })
    }

    /// Canonical filename extension, e.g. `.tsv.gz`.
    pub fn extension(&self) -> String {
        format!("{}{}", self.base.extension(), self.compression.extension())
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Whether the path names a file this crate can ingest.
pub fn is_supported(path: impl AsRef<Path>) -> bool {
    FileType::from_path(path).is_some()
}

/// The cross-product of supported base formats and compressions as glob
/// patterns (`*.csv`, `*.csv.gz`, ...). 25 patterns.
pub fn supported_patterns() -> Vec<String> {
    let mut patterns = Vec::with_capacity(BaseFormat::ALL.len() * Compression::ALL.len());
    for base in BaseFormat::ALL {
        for compression in Compression::ALL {
            patterns.push(format!(
                "*{}{}",
                base.extension(),
                compression.extension()
            ));
        }
    }
    patterns
}

/// The basename with one compression suffix stripped, if any.
pub fn strip_compression(path: impl AsRef<Path>) -> String {
    let name = basename(path.as_ref());
    let lower = name.to_ascii_lowercase();
    match Compression::from_suffix(&lower) {
        Some(c) => name[..name.len() - c.extension().len()].to_string(),
        None => name.to_string(),
    }
}

/// Derive a table name from a path: basename with one compression suffix
/// stripped (if any), then one format suffix stripped. Original case is
/// preserved; only suffix matching is case-insensitive.
pub fn table_name_from_path(path: impl AsRef<Path>) -> String {
    // ASCII lowering keeps byte offsets aligned with the original name.
    let name = basename(path.as_ref());
    let lower = name.to_ascii_lowercase();

    let mut end = name.len();
    let mut stem = lower.as_str();
    if let Some(c) = Compression::from_suffix(stem) {
        end -= c.extension().len();
        stem = &stem[..end];
    }
    if let Some(base) = BaseFormat::from_suffix(stem) {
        end -= base.extension().len();
    }
    name[..end].to_string()
}

fn basename(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_plain_formats() {
        let ft = FileType::from_path("data/users.csv").unwrap();
        assert_eq!(ft.base, BaseFormat::Csv);
        assert_eq!(ft.compression, Compression::None);

        assert_eq!(
            FileType::from_path("x.parquet").unwrap().base,
            BaseFormat::Parquet
        );
        assert_eq!(FileType::from_path("x.xlsx").unwrap().base, BaseFormat::Xlsx);
        assert_eq!(FileType::from_path("x.ltsv").unwrap().base, BaseFormat::Ltsv);
    }

    #[test]
    fn classifies_compressed_formats() {
        let ft = FileType::from_path("/a/b/sales.tsv.gz").unwrap();
        assert_eq!(ft.base, BaseFormat::Tsv);
        assert_eq!(ft.compression, Compression::Gzip);
        assert_eq!(ft.extension(), ".tsv.gz");

        assert_eq!(
            FileType::from_path("log.csv.zst").unwrap().compression,
            Compression::Zstd
        );
        assert_eq!(
            FileType::from_path("log.csv.bz2").unwrap().compression,
            Compression::Bzip2
        );
        assert_eq!(
            FileType::from_path("log.csv.xz").unwrap().compression,
            Compression::Xz
        );
    }

    #[test]
    fn classification_is_case_insensitive() {
        let ft = FileType::from_path("REPORT.CSV.GZ").unwrap();
        assert_eq!(ft.base, BaseFormat::Csv);
        assert_eq!(ft.compression, Compression::Gzip);
    }

    #[test]
    fn rejects_unknown_names() {
        assert!(FileType::from_path("notes.txt").is_none());
        assert!(FileType::from_path("archive.gz").is_none());
        assert!(FileType::from_path("binary.csv.lz4").is_none());
        assert!(FileType::from_path("noextension").is_none());
    }

    #[test]
    fn pattern_cross_product() {
        let patterns = supported_patterns();
        assert_eq!(patterns.len(), 25);
        assert!(patterns.contains(&"*.csv".to_string()));
        assert!(patterns.contains(&"*.tsv.gz".to_string()));
        assert!(patterns.contains(&"*.parquet.zst".to_string()));
    }

    #[test]
    fn strip_compression_removes_one_suffix() {
        assert_eq!(strip_compression("a/b/data.csv.gz"), "data.csv");
        assert_eq!(strip_compression("data.csv"), "data.csv");
        assert_eq!(strip_compression("DATA.CSV.ZST"), "DATA.CSV");
    }

    #[test]
    fn table_names_strip_one_suffix_pair() {
        assert_eq!(table_name_from_path("/a/b/sales.csv.gz"), "sales");
        assert_eq!(table_name_from_path("data.backup.csv"), "data.backup");
        assert_eq!(table_name_from_path("plain.tsv"), "plain");
        assert_eq!(table_name_from_path("Mixed.CSV"), "Mixed");
    }

    #[test]
    fn classify_roundtrips_canonical_extension() {
        for base in BaseFormat::ALL {
            for compression in Compression::ALL {
                let ft = FileType::new(base, compression);
                let name = format!("t{}", ft.extension());
                assert_eq!(FileType::from_path(&name), Some(ft), "{name}");
                assert_eq!(table_name_from_path(&name), "t");
            }
        }
    }
}
