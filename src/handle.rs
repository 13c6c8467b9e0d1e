//! The caller-visible database handle and its auto-save hooks.
//!
//! [`Db`] owns the SQLite connection and derefs to it, so the whole
//! rusqlite query surface is available unchanged. Auto-save fires
//! synchronously: after a successful commit when the trigger is
//! `OnCommit`, and before the underlying close when it is `OnClose`.

use std::ops::Deref;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dump::{dump_database, user_tables, DumpOptions};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveTrigger {
    OnClose,
    OnCommit,
}

/// Auto-save configuration accepted by the builder. Without an explicit
/// output directory the dump overwrites files next to the first original
/// path, which is only valid when every input is a filesystem path.
#[derive(Debug, Clone)]
pub struct AutoSave {
    pub(crate) trigger: SaveTrigger,
    pub(crate) output_dir: Option<PathBuf>,
    pub(crate) options: DumpOptions,
}

impl AutoSave {
    pub fn on_commit(dir: impl Into<PathBuf>) -> Self {
        Self {
            trigger: SaveTrigger::OnCommit,
            output_dir: Some(dir.into()),
            options: DumpOptions::default(),
        }
    }

    pub fn on_close(dir: impl Into<PathBuf>) -> Self {
        Self {
            trigger: SaveTrigger::OnClose,
            output_dir: Some(dir.into()),
            options: DumpOptions::default(),
        }
    }

    /// Save back into the parent directory of the first original path.
    pub fn overwrite_on_commit() -> Self {
        Self {
            trigger: SaveTrigger::OnCommit,
            output_dir: None,
            options: DumpOptions::default(),
        }
    }

    /// Save back into the parent directory of the first original path.
    pub fn overwrite_on_close() -> Self {
        Self {
            trigger: SaveTrigger::OnClose,
            output_dir: None,
            options: DumpOptions::default(),
        }
    }

    pub fn options(mut self, options: DumpOptions) -> Self {
        self.options = options;
        self
    }
}

/// Auto-save with its output directory fixed at build time.
#[derive(Debug, Clone)]
pub(crate) struct AutoSaveState {
    pub(crate) trigger: SaveTrigger,
    pub(crate) dir: PathBuf,
    pub(crate) options: DumpOptions,
}

/// An open database handle with every input loaded as a table.
#[derive(Debug)]
pub struct Db {
    conn: Option<Connection>,
    auto_save: Option<AutoSaveState>,
}

impl Db {
    pub(crate) fn new(conn: Connection, auto_save: Option<AutoSaveState>) -> Self {
        Self {
            conn: Some(conn),
            auto_save,
        }
    }

    fn conn(&self) -> &Connection {
        self.conn
            .as_ref()
            .expect("connection is owned until close() consumes the handle")
    }

    /// Begin a transaction whose `commit` fires the auto-save dumper when
    /// the trigger is `OnCommit`. Dropping the returned transaction
    /// without committing rolls it back.
    pub fn transaction(&mut self) -> Result<SaveTx<'_>> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        Ok(SaveTx {
            tx: Some(tx),
            conn,
            save: self.auto_save.as_ref(),
        })
    }

    /// Names of all user tables.
    pub fn table_names(&self) -> Result<Vec<String>> {
        user_tables(self.conn())
    }

    /// Serialise every user table to `dir` with the given options,
    /// independent of any auto-save configuration.
    pub fn dump(&self, dir: impl AsRef<Path>, options: &DumpOptions) -> Result<()> {
        dump_database(self.conn(), dir, options)
    }

    /// Close the handle. With an `OnClose` trigger the dumper runs first;
    /// a dump failure is reported even when the close itself succeeds.
    pub fn close(mut self) -> Result<()> {
        let save_result = self.auto_save_on_close();
        let Some(conn) = self.conn.take() else {
            return save_result;
        };
        let close_result = conn.close().map_err(|(_, e)| Error::Sqlite(e));

        match (save_result, close_result) {
            (Ok(()), close) => close,
            (Err(save), Ok(())) => Err(save),
            (Err(save), Err(close)) => Err(match save {
                Error::AutoSaveFailed { source, .. } => Error::AutoSaveFailed {
                    source,
                    close_error: Some(Box::new(close)),
                },
                other => other,
            }),
        }
    }

    fn auto_save_on_close(&self) -> Result<()> {
        match &self.auto_save {
            Some(state) if state.trigger == SaveTrigger::OnClose => {
                dump_database(self.conn(), &state.dir, &state.options).map_err(|e| {
                    Error::AutoSaveFailed {
                        source: Box::new(e),
                        close_error: None,
                    }
                })
            }
            _ => Ok(()),
        }
    }
}

impl Deref for Db {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn()
    }
}

impl Drop for Db {
    fn drop(&mut self) {
        if self.conn.is_some() {
            if let Err(e) = self.auto_save_on_close() {
                warn!(error = %e, "auto-save on drop failed");
            }
        }
    }
}

/// A transaction wrapper that passes rollback through unchanged and runs
/// the dumper after a successful commit.
pub struct SaveTx<'a> {
    tx: Option<rusqlite::Transaction<'a>>,
    conn: &'a Connection,
    save: Option<&'a AutoSaveState>,
}

impl SaveTx<'_> {
    pub fn commit(mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit()?;
        }
        if let Some(state) = self.save {
            if state.trigger == SaveTrigger::OnCommit {
                dump_database(self.conn, &state.dir, &state.options).map_err(|e| {
                    Error::AutoSaveFailed {
                        source: Box::new(e),
                        close_error: None,
                    }
                })?;
            }
        }
        Ok(())
    }

    pub fn rollback(mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback()?;
        }
        Ok(())
    }
}

impl Deref for SaveTx<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn
    }
}
