// Copyright 2025 Pants project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glob::Pattern;
use log::{debug, warn};

use crate::section::Section;

///
/// An in-memory mapping from filename to file contents, line-split with line terminators kept.
///
/// Grouping in the core is by identity: bears sharing an `Arc<FileDict>` analyze the same
/// contents. Line contents are themselves behind an `Arc` so that deduplicating a file across
/// sections shares rather than copies it.
///
#[derive(Clone, Debug, Default)]
pub struct FileDict {
    files: HashMap<PathBuf, Arc<Vec<String>>>,
}

impl FileDict {
    pub fn empty() -> FileDict {
        FileDict::default()
    }

    pub fn new(files: HashMap<PathBuf, Arc<Vec<String>>>) -> FileDict {
        FileDict { files }
    }

    pub fn lines(&self, path: &Path) -> Option<&[String]> {
        self.files.get(path).map(|lines| lines.as_slice())
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

///
/// Returns all filenames requested for analysis in the given section: everything matching its
/// `files` globs, minus `ignore` matches, restricted to `limit_files` matches when any are set.
///
pub fn collect_filenames(section: &Section) -> Vec<PathBuf> {
    let ignore = compile_patterns(section.ignore());
    let limit = compile_patterns(section.limit_files());

    let mut filenames = Vec::new();
    for file_glob in section.files() {
        let entries = match glob::glob(file_glob) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Invalid file glob '{file_glob}': {err}. Leaving it out.");
                continue;
            }
        };
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(err) => {
                    warn!("Failed to access a path for '{file_glob}': {err}. Leaving it out.");
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            if ignore.iter().any(|pattern| pattern.matches_path(&path)) {
                continue;
            }
            if !limit.is_empty() && !limit.iter().any(|pattern| pattern.matches_path(&path)) {
                continue;
            }
            filenames.push(path);
        }
    }
    filenames.sort();
    filenames.dedup();
    filenames
}

///
/// Loads the files requested by the given sections into one file-dictionary per section.
///
/// Contents are shared across sections by filename so that no file is read twice, and files
/// that fail to load are logged, skipped, and not re-attempted for later sections.
///
pub fn load_files(sections: &[Arc<Section>]) -> Vec<(Arc<Section>, Arc<FileDict>)> {
    let mut master: HashMap<PathBuf, Arc<Vec<String>>> = HashMap::new();
    let mut corrupt: HashSet<PathBuf> = HashSet::new();

    let mut loaded = Vec::new();
    for section in sections {
        let mut files = HashMap::new();
        for filename in collect_filenames(section) {
            if let Some(lines) = master.get(&filename) {
                files.insert(filename, lines.clone());
            } else if corrupt.contains(&filename) {
                // Already failed to load for an earlier section.
            } else {
                match read_lines(&filename) {
                    Ok(lines) => {
                        let lines = Arc::new(lines);
                        master.insert(filename.clone(), lines.clone());
                        files.insert(filename, lines);
                    }
                    Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                        warn!(
                            "Failed to read file '{}'. It seems to contain non-unicode \
                             characters. Leaving it out.",
                            filename.display()
                        );
                        corrupt.insert(filename);
                    }
                    Err(err) => {
                        warn!(
                            "Failed to read file '{}' because of an unknown error. Leaving it \
                             out: {err}",
                            filename.display()
                        );
                        corrupt.insert(filename);
                    }
                }
            }
        }
        loaded.push((section.clone(), Arc::new(FileDict::new(files))));
    }

    debug!("Loaded {} file(s).", master.len());
    loaded
}

fn compile_patterns(globs: &[String]) -> Vec<Pattern> {
    globs
        .iter()
        .filter_map(|file_glob| match Pattern::new(file_glob) {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                warn!("Invalid glob '{file_glob}': {err}. Leaving it out.");
                None
            }
        })
        .collect()
}

// Splits inclusively so every line keeps its terminator.
fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents.split_inclusive('\n').map(str::to_owned).collect())
}
