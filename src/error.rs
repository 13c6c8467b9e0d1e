use std::path::PathBuf;

use thiserror::Error;

use crate::filetype::{BaseFormat, Compression};

#[derive(Error, Debug)]
pub enum Error {
    #[error("no inputs supplied")]
    NoInputs,

    #[error("no supported files under {path}")]
    NoSupportedFiles { path: String },

    #[error("unsupported file type: {path}")]
    UnsupportedFileType { path: String },

    #[error("path does not exist: {path}")]
    PathDoesNotExist { path: PathBuf },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("table {table} already exists")]
    DuplicateTable { table: String },

    #[error("duplicate column {column:?} in header of {table}")]
    DuplicateColumn { table: String, column: String },

    #[error("empty input for table {table}")]
    EmptyInput { table: String },

    #[error("no valid records in {table}")]
    NoValidRecords { table: String },

    #[error("parse error in {table}: {message}")]
    Parse { table: String, message: String },

    #[error("invalid compressed stream: {message}")]
    CompressionInit { message: String },

    #[error("cannot write {format} with {compression} compression")]
    UnsupportedCompression {
        format: BaseFormat,
        compression: Compression,
    },

    #[error("no writer available for {format}")]
    UnsupportedDumpFormat { format: BaseFormat },

    #[error("memory limit exceeded after {rows} rows")]
    MemoryLimitExceeded { rows: u64 },

    #[error("operation cancelled")]
    Cancelled,

    #[error("auto-save without an output directory requires file path inputs only")]
    AutoSaveOverwriteOnNonFile,

    #[error("transaction committed, but auto-save failed: {source}")]
    AutoSaveFailed {
        #[source]
        source: Box<Error>,
        /// Set when the underlying connection close also failed after the
        /// dump error.
        close_error: Option<Box<Error>>,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow2::error::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] arrow2::io::parquet::read::ParquetError),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] calamine::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error on {path}: {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(table: &str, message: impl Into<String>) -> Self {
        Error::Parse {
            table: table.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
