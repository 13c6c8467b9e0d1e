//! Query CSV, TSV, LTSV, Parquet and Excel workbooks with SQL.
//!
//! `sqltab` loads structured files, optionally compressed with gzip,
//! bzip2, xz, or zstd, into an in-memory SQLite database and returns a
//! handle that derefs to [`rusqlite::Connection`]. Each input becomes a
//! table named after its source; column types are inferred per column;
//! data is loaded in bounded-memory chunks. Opt-in auto-save serialises
//! every table back to a directory on transaction commit or handle close.
//!
//! ```no_run
//! let db = sqltab::open(["data/users.csv"])?;
//! let count: i64 = db.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
//! # Ok::<(), sqltab::Error>(())
//! ```
//!
//! Inputs can also be open byte streams with a declared type, or read-only
//! virtual filesystems; see [`Builder`]. Mutations are written back with
//! [`Db::dump`], or automatically via [`AutoSave`]:
//!
//! ```no_run
//! use sqltab::{AutoSave, Builder};
//!
//! let mut db = Builder::new()
//!     .path("data")
//!     .auto_save(AutoSave::on_commit("out"))
//!     .open()?;
//!
//! let tx = db.transaction()?;
//! tx.execute("UPDATE users SET age = age + 1", [])?;
//! tx.commit()?; // tables are dumped to out/ here
//! # Ok::<(), sqltab::Error>(())
//! ```

mod builder;
mod cancel;
mod compress;
mod csv_in;
mod dump;
mod error;
mod filetype;
mod handle;
mod infer;
mod load;
mod ltsv_in;
mod parquet_in;
mod parse;
mod pool;
mod resolve;
mod schema;
mod vfs;
mod writer_csv;
mod writer_ltsv;
mod writer_parquet;
mod xlsx_in;

pub use builder::Builder;
pub use cancel::CancelToken;
pub use dump::{dump_database, DumpOptions};
pub use error::{Error, Result};
pub use filetype::{
    is_supported, strip_compression, supported_patterns, table_name_from_path, BaseFormat,
    Compression, FileType,
};
pub use handle::{AutoSave, Db, SaveTrigger, SaveTx};
pub use infer::{infer, MAX_SAMPLE};
pub use parse::{ParseOptions, Parser, DEFAULT_CHUNK_SIZE};
pub use pool::{MemoryPolicy, MemoryStatus, RssWatchdog};
pub use resolve::{Input, ResolvedInput};
pub use schema::{Cell, Chunk, ColumnInfo, ColumnType, Record, Table};
pub use vfs::{MemoryFs, VirtualFs};

use std::path::Path;

/// Open one or more paths (files or directories) with default options.
pub fn open<I, P>(paths: I) -> Result<Db>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut builder = Builder::new();
    for path in paths {
        builder = builder.path(path);
    }
    builder.open()
}
