//! Building a database handle from a set of inputs.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;
use tracing::info;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::filetype::FileType;
use crate::handle::{AutoSave, AutoSaveState, Db};
use crate::load::{load_inputs, LoadOptions};
use crate::parse::DEFAULT_CHUNK_SIZE;
use crate::resolve::{resolve, Input};
use crate::vfs::VirtualFs;

/// Collects inputs and options, then opens an in-memory SQLite database
/// with one table per input (plus XLSX sheet fan-out).
///
/// ```no_run
/// use sqltab::{AutoSave, Builder};
///
/// let mut db = Builder::new()
///     .path("data/users.csv")
///     .path("data/archive")
///     .auto_save(AutoSave::on_commit("out"))
///     .open()?;
///
/// let count: i64 = db.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
/// # Ok::<(), sqltab::Error>(())
/// ```
pub struct Builder {
    inputs: Vec<Input>,
    chunk_size: usize,
    memory_limit: Option<u64>,
    cancel: CancelToken,
    auto_save: Option<AutoSave>,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            memory_limit: None,
            cancel: CancelToken::new(),
            auto_save: None,
        }
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file or directory. Directories are walked recursively and
    /// every supported file inside becomes a table.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.inputs.push(Input::Path(path.as_ref().to_path_buf()));
        self
    }

    pub fn paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            self = self.path(path);
        }
        self
    }

    /// Add an open byte stream with a declared table name and file type.
    pub fn stream(
        mut self,
        reader: impl Read + Send + 'static,
        table_name: impl Into<String>,
        file_type: FileType,
    ) -> Self {
        self.inputs.push(Input::Stream {
            table_name: table_name.into(),
            file_type,
            reader: Box::new(reader),
        });
        self
    }

    /// Add a read-only virtual filesystem; every supported entry becomes a
    /// table.
    pub fn vfs(mut self, fs: impl VirtualFs + 'static) -> Self {
        self.inputs.push(Input::Vfs(Arc::new(fs)));
        self
    }

    /// Rows per chunk during loading. Must be positive; defaults to 1000.
    pub fn chunk_size(mut self, rows: usize) -> Self {
        self.chunk_size = rows;
        self
    }

    /// Abort loading with `MemoryLimitExceeded` if the process's resident
    /// memory crosses `bytes` while parsing.
    pub fn memory_limit(mut self, bytes: u64) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    /// Cancellation token observed at row boundaries during loading.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn auto_save(mut self, save: AutoSave) -> Self {
        self.auto_save = Some(save);
        self
    }

    /// Resolve inputs, load every table, and hand back the database.
    /// Fails without side effects visible to the caller: if any input
    /// fails to load, no handle is returned.
    pub fn open(self) -> Result<Db> {
        let Builder {
            inputs,
            chunk_size,
            memory_limit,
            cancel,
            auto_save,
        } = self;

        if chunk_size == 0 {
            return Err(Error::InvalidInput(
                "chunk size must be positive".to_string(),
            ));
        }
        let auto_save = resolve_auto_save(&inputs, auto_save)?;

        let resolved = resolve(inputs)?;
        let conn = Connection::open_in_memory()?;
        load_inputs(
            &conn,
            resolved,
            &LoadOptions {
                chunk_size,
                cancel,
                memory_limit,
            },
        )?;

        info!("database ready");
        Ok(Db::new(conn, auto_save))
    }
}

/// Validate the auto-save configuration at build time. Overwrite mode
/// (no output directory) saves next to the first original path and is
/// refused when any input is not a filesystem path.
fn resolve_auto_save(
    inputs: &[Input],
    auto_save: Option<AutoSave>,
) -> Result<Option<AutoSaveState>> {
    let Some(save) = auto_save else {
        return Ok(None);
    };
    save.options.validate()?;

    let dir = match save.output_dir {
        Some(dir) => dir,
        None => {
            if !inputs.iter().all(|i| matches!(i, Input::Path(_))) {
                return Err(Error::AutoSaveOverwriteOnNonFile);
            }
            let first = inputs
                .iter()
                .find_map(|i| match i {
                    Input::Path(p) => Some(p.as_path()),
                    _ => None,
                })
                .ok_or(Error::NoInputs)?;
            parent_dir(first)
        }
    };

    Ok(Some(AutoSaveState {
        trigger: save.trigger,
        dir,
        options: save.options,
    }))
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
