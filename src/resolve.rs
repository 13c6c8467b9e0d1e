//! Input resolution: paths, directories, streams, and virtual filesystems
//! collapse into an ordered list of named, typed byte sources.
//!
//! This is the only stage allowed to touch the real filesystem for
//! classification. Caller-declared order is preserved between sources;
//! directory walks are sorted so a single walk is stable.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::filetype::{table_name_from_path, Compression, FileType};
use crate::vfs::VirtualFs;

/// One caller-supplied source.
pub enum Input {
    /// A file or directory on disk.
    Path(PathBuf),
    /// An open byte stream with a declared table name and file type.
    Stream {
        table_name: String,
        file_type: FileType,
        reader: Box<dyn Read + Send>,
    },
    /// A read-only virtual filesystem; every supported entry becomes a table.
    Vfs(Arc<dyn VirtualFs>),
}

pub(crate) enum Source {
    Path(PathBuf),
    Stream(Box<dyn Read + Send>),
    Vfs { fs: Arc<dyn VirtualFs>, entry: String },
}

/// A validated, named, typed byte source ready for loading.
pub struct ResolvedInput {
    pub(crate) source: Source,
    pub table_name: String,
    pub file_type: FileType,
}

impl std::fmt::Debug for ResolvedInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedInput")
            .field("table_name", &self.table_name)
            .field("file_type", &self.file_type)
            .finish()
    }
}

impl ResolvedInput {
    /// Where the bytes come from, for log and error context.
    pub fn origin(&self) -> String {
        match &self.source {
            Source::Path(p) => p.display().to_string(),
            Source::Stream(_) => format!("<stream:{}>", self.table_name),
            Source::Vfs { entry, .. } => format!("<vfs:{entry}>"),
        }
    }
}

pub(crate) fn resolve(inputs: Vec<Input>) -> Result<Vec<ResolvedInput>> {
    if inputs.is_empty() {
        return Err(Error::NoInputs);
    }

    let mut resolved = Vec::new();
    for input in inputs {
        match input {
            Input::Path(path) => resolve_path(&path, &mut resolved)?,
            Input::Stream {
                table_name,
                file_type,
                reader,
            } => {
                if table_name.trim().is_empty() {
                    return Err(Error::InvalidInput(
                        "stream inputs require a non-empty table name".to_string(),
                    ));
                }
                resolved.push(ResolvedInput {
                    source: Source::Stream(reader),
                    table_name,
                    file_type,
                });
            }
            Input::Vfs(fs) => resolve_vfs(fs, &mut resolved)?,
        }
    }

    if resolved.is_empty() {
        return Err(Error::NoInputs);
    }
    info!(inputs = resolved.len(), "inputs resolved");
    for input in &resolved {
        debug!(
            table = %input.table_name,
            file_type = %input.file_type,
            origin = %input.origin(),
            "resolved input"
        );
    }
    Ok(resolved)
}

fn resolve_path(path: &Path, resolved: &mut Vec<ResolvedInput>) -> Result<()> {
    let meta = std::fs::metadata(path).map_err(|_| Error::PathDoesNotExist {
        path: path.to_path_buf(),
    })?;

    if meta.is_dir() {
        return resolve_directory(path, resolved);
    }

    let file_type = FileType::from_path(path).ok_or_else(|| Error::UnsupportedFileType {
        path: path.display().to_string(),
    })?;
    resolved.push(ResolvedInput {
        source: Source::Path(path.to_path_buf()),
        table_name: table_name_from_path(path),
        file_type,
    });
    Ok(())
}

fn resolve_directory(dir: &Path, resolved: &mut Vec<ResolvedInput>) -> Result<()> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if let Some(file_type) = FileType::from_path(path) {
            found.push(ResolvedInput {
                source: Source::Path(path.to_path_buf()),
                table_name: table_name_from_path(path),
                file_type,
            });
        } else {
            debug!(path = %path.display(), "skipping unsupported file");
        }
    }

    if found.is_empty() {
        return Err(Error::NoSupportedFiles {
            path: dir.display().to_string(),
        });
    }
    drop_shadowed_compressed(&mut found);
    resolved.extend(found);
    Ok(())
}

fn resolve_vfs(fs: Arc<dyn VirtualFs>, resolved: &mut Vec<ResolvedInput>) -> Result<()> {
    let mut found = Vec::new();
    for entry in fs.list() {
        if let Some(file_type) = FileType::from_path(&entry) {
            found.push(ResolvedInput {
                source: Source::Vfs {
                    fs: Arc::clone(&fs),
                    entry: entry.clone(),
                },
                table_name: table_name_from_path(&entry),
                file_type,
            });
        }
    }

    if found.is_empty() {
        return Err(Error::NoSupportedFiles {
            path: "<virtual filesystem>".to_string(),
        });
    }
    drop_shadowed_compressed(&mut found);
    resolved.extend(found);
    Ok(())
}

/// Within one directory or virtual filesystem, an uncompressed file shadows
/// compressed variants of the same logical table.
fn drop_shadowed_compressed(inputs: &mut Vec<ResolvedInput>) {
    let uncompressed: HashSet<String> = inputs
        .iter()
        .filter(|i| i.file_type.compression == Compression::None)
        .map(|i| i.table_name.clone())
        .collect();
    inputs.retain(|i| {
        i.file_type.compression == Compression::None || !uncompressed.contains(&i.table_name)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filetype::BaseFormat;
    use crate::vfs::MemoryFs;
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn resolves_a_single_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("users.csv");
        fs::write(&file, "a,b\n1,2\n").unwrap();

        let resolved = resolve(vec![Input::Path(file)]).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].table_name, "users");
        assert_eq!(resolved[0].file_type.base, BaseFormat::Csv);
    }

    #[test]
    fn missing_path_fails() {
        let err = resolve(vec![Input::Path(PathBuf::from("/no/such/file.csv"))]).unwrap_err();
        assert!(matches!(err, Error::PathDoesNotExist { .. }));
    }

    #[test]
    fn unsupported_file_fails() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        fs::write(&file, "hello").unwrap();

        let err = resolve(vec![Input::Path(file)]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType { .. }));
    }

    #[test]
    fn directory_walk_keeps_supported_files_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "x\n1\n").unwrap();
        fs::write(dir.path().join("b.tsv"), "y\n2\n").unwrap();
        fs::write(dir.path().join("readme.md"), "nope").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/c.ltsv"), "k:1\n").unwrap();

        let resolved = resolve(vec![Input::Path(dir.path().to_path_buf())]).unwrap();
        let names: Vec<_> = resolved.iter().map(|r| r.table_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn directory_without_supported_files_fails() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("readme.md"), "nope").unwrap();

        let err = resolve(vec![Input::Path(dir.path().to_path_buf())]).unwrap_err();
        assert!(matches!(err, Error::NoSupportedFiles { .. }));
    }

    #[test]
    fn no_inputs_fails() {
        assert!(matches!(resolve(Vec::new()).unwrap_err(), Error::NoInputs));
    }

    #[test]
    fn stream_requires_table_name() {
        let input = Input::Stream {
            table_name: "  ".to_string(),
            file_type: FileType::new(BaseFormat::Csv, Compression::None),
            reader: Box::new(Cursor::new(b"a\n1\n".to_vec())),
        };
        assert!(matches!(
            resolve(vec![input]).unwrap_err(),
            Error::InvalidInput(_)
        ));
    }

    #[test]
    fn uncompressed_shadows_compressed_in_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("data.csv"), "a\n1\n").unwrap();
        fs::write(dir.path().join("data.csv.gz"), "fake").unwrap();

        let resolved = resolve(vec![Input::Path(dir.path().to_path_buf())]).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].file_type.compression, Compression::None);
    }

    #[test]
    fn vfs_entries_resolve_like_paths() {
        let fs = MemoryFs::new()
            .with_file("nested/users.csv", "a\n1\n")
            .with_file("skip.bin", "junk")
            .with_file("logs.ltsv", "k:v\n");

        let resolved = resolve(vec![Input::Vfs(Arc::new(fs))]).unwrap();
        let names: Vec<_> = resolved.iter().map(|r| r.table_name.as_str()).collect();
        assert_eq!(names, vec!["logs", "users"]);
    }

    #[test]
    fn uncompressed_shadows_compressed_in_vfs() {
        let fs = MemoryFs::new()
            .with_file("data.csv", "a\n1\n")
            .with_file("data.csv.zst", "fake")
            .with_file("other.csv.gz", "fake");

        let resolved = resolve(vec![Input::Vfs(Arc::new(fs))]).unwrap();
        let kept: Vec<_> = resolved
            .iter()
            .map(|r| (r.table_name.as_str(), r.file_type.compression))
            .collect();
        // `data` keeps only its uncompressed variant; `other` has no
        // uncompressed sibling and stays compressed.
        assert_eq!(
            kept,
            vec![("data", Compression::None), ("other", Compression::Gzip)]
        );
    }

    #[test]
    fn vfs_without_supported_entries_fails() {
        let fs = MemoryFs::new().with_file("only.bin", "junk");
        let err = resolve(vec![Input::Vfs(Arc::new(fs))]).unwrap_err();
        assert!(matches!(err, Error::NoSupportedFiles { .. }));
    }

    #[test]
    fn caller_order_is_preserved_between_sources() {
        let dir = tempdir().unwrap();
        let z = dir.path().join("z.csv");
        let a = dir.path().join("a.csv");
        fs::write(&z, "x\n1\n").unwrap();
        fs::write(&a, "y\n2\n").unwrap();

        let resolved = resolve(vec![Input::Path(z), Input::Path(a)]).unwrap();
        let names: Vec<_> = resolved.iter().map(|r| r.table_name.as_str()).collect();
        assert_eq!(names, vec!["z", "a"]);
    }
}
