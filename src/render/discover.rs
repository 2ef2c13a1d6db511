//! Input-tree discovery.
//!
//! Walks the input directory depth-first, applying the ignore matcher and
//! building the parent-pointer hierarchy: the directory's index file (at most
//! one of `index.md` / `index.html`) becomes the parent of every other entry
//! in that directory and, transitively, of everything below it. The index
//! file is always pushed before its siblings so its arena id exists by the
//! time they need it.

use std::path::{Path, PathBuf};

use crate::config::IgnoreMatcher;

use super::input::{FileId, InputFile};

const INDEX_NAMES: [&str; 2] = ["index.md", "index.html"];

#[derive(thiserror::Error, Debug)]
pub enum DiscoverError {
    #[error("duplicate index files in {dir}: {first} and {second}")]
    DuplicateIndex {
        dir: PathBuf,
        first: String,
        second: String,
    },

    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read directory entry in {path}: {source}")]
    ReadEntry {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Walk the input tree and build the file arena.
///
/// The caller is responsible for the missing-input-root case; this function
/// expects `input_dir` to exist.
pub fn discover(
    input_dir: &Path,
    output_dir: &Path,
    prefix: &str,
    matcher: &IgnoreMatcher,
) -> Result<Vec<InputFile>, DiscoverError> {
    let mut files = Vec::new();
    walk(
        input_dir, input_dir, output_dir, prefix, matcher, None, &mut files,
    )?;
    Ok(files)
}

fn walk(
    dir: &Path,
    input_dir: &Path,
    output_dir: &Path,
    prefix: &str,
    matcher: &IgnoreMatcher,
    parent: Option<FileId>,
    files: &mut Vec<InputFile>,
) -> Result<(), DiscoverError> {
    let entries = std::fs::read_dir(dir).map_err(|source| DiscoverError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DiscoverError::ReadEntry {
            path: dir.to_path_buf(),
            source,
        })?;

        if matcher.is_ignored(&entry.file_name().to_string_lossy()) {
            continue;
        }
        paths.push(entry.path());
    }

    // Directory read order is filesystem-dependent; sort for deterministic
    // discovery and batching.
    paths.sort();

    let mut index_pos: Option<usize> = None;
    for (pos, path) in paths.iter().enumerate() {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if INDEX_NAMES.contains(&name) && path.is_file() {
            if let Some(first) = index_pos {
                return Err(DiscoverError::DuplicateIndex {
                    dir: dir.to_path_buf(),
                    first: file_name_of(&paths[first]),
                    second: name.to_string(),
                });
            }
            index_pos = Some(pos);
        }
    }

    // The index file, if any, is the parent of everything else in this
    // directory and below.
    let mut current_parent = parent;
    if let Some(pos) = index_pos {
        let id = FileId(files.len());
        files.push(make_file(&paths[pos], input_dir, output_dir, prefix, parent));
        current_parent = Some(id);
    }

    for (pos, path) in paths.iter().enumerate() {
        if Some(pos) == index_pos {
            continue;
        }

        if path.is_dir() {
            walk(
                path,
                input_dir,
                output_dir,
                prefix,
                matcher,
                current_parent,
                files,
            )?;
        } else if path.is_file() {
            files.push(make_file(path, input_dir, output_dir, prefix, current_parent));
        }
    }

    Ok(())
}

fn make_file(
    path: &Path,
    input_dir: &Path,
    output_dir: &Path,
    prefix: &str,
    parent: Option<FileId>,
) -> InputFile {
    let relative = path.strip_prefix(input_dir).unwrap_or(path).to_path_buf();
    InputFile::new(path.to_path_buf(), relative, parent, output_dir, prefix)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
