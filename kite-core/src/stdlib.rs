//! Loading the Kite standard library from disk.
//!
//! The compiler itself takes the std library as one source string. A std
//! directory holds any number of `.kite` files which are concatenated in
//! path order; the bundled one lives in `kite-core/stdlib`.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::CoreError;

pub const STDLIB_EXTENSION: &str = "kite";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdlibFile {
    /// Path relative to the std root.
    pub path: PathBuf,
    pub contents: String,
}

pub fn default_stdlib_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("stdlib")
}

/// Every `.kite` file under `root`, sorted by relative path.
pub fn load_stdlib_files(root: impl AsRef<Path>) -> Result<Vec<StdlibFile>, std::io::Error> {
    let root = root.as_ref();
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().is_some_and(|ext| ext == STDLIB_EXTENSION)
        {
            let contents = fs::read_to_string(path)?;
            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            files.push(StdlibFile {
                path: relative,
                contents,
            });
        }
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// The std source string for a std directory.
pub fn load_stdlib_source(root: impl AsRef<Path>) -> Result<String, CoreError> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(CoreError::MissingStdlib(root.to_path_buf()));
    }
    let files = load_stdlib_files(root)?;
    tracing::debug!(root = %root.display(), files = files.len(), "loaded std library");
    let mut source = String::new();
    for file in files {
        source.push_str(&file.contents);
        if !source.ends_with('\n') {
            source.push('\n');
        }
    }
    Ok(source)
}
