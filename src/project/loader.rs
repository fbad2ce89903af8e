//! Reading and parsing NED files off the engine lock.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use crate::parser::{Parse, parse};
use crate::resources::{FileSystem, NedError};

/// A file read from disk and parsed.
#[derive(Debug)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub text: Arc<str>,
    pub parse: Parse,
}

/// Read and parse one file.
pub fn read_and_parse(fs: &dyn FileSystem, path: &Path) -> Result<LoadedFile, NedError> {
    tracing::debug!(path = %path.display(), "reading from disk");
    let text = fs
        .read_to_string(path)
        .map_err(|e| NedError::io(path, e))?;
    let parse = parse(&text);
    Ok(LoadedFile {
        path: path.to_path_buf(),
        text: Arc::from(text),
        parse,
    })
}

/// Files below `folders` accepted by `wanted`, deduplicated, in path order.
pub fn collect_files(
    fs: &dyn FileSystem,
    folders: &[PathBuf],
    wanted: impl Fn(&Path) -> bool,
) -> (Vec<PathBuf>, Vec<NedError>) {
    let mut paths = Vec::new();
    let mut errors = Vec::new();
    for folder in folders {
        match fs.list_files(folder) {
            Ok(files) => paths.extend(files.into_iter().filter(|p| wanted(p))),
            Err(e) => errors.push(NedError::io(folder, e)),
        }
    }
    paths.sort();
    paths.dedup();
    (paths, errors)
}

/// Read and parse `paths` in parallel. Results keep the order of `paths`.
pub fn read_all(fs: &dyn FileSystem, paths: &[PathBuf]) -> Vec<Result<LoadedFile, NedError>> {
    paths
        .par_iter()
        .map(|path| read_and_parse(fs, path))
        .collect()
}
