// Licensed under the Apache-2.0 license

//! Generated artifacts and how they reach the disk.
//!
//! Rendering never touches the filesystem; it produces a [`GeneratedFiles`]
//! value holding the full text of every artifact. Writing then happens in
//! two steps so a failure cannot leave a mix of old and new files behind:
//!
//! ```text
//! for each changed file: stage a temp file next to its destination
//! all staged?            rename every temp file into place
//! ```
//!
//! Files whose contents already match are not rewritten, which keeps their
//! timestamps stable for the build system.

use crate::error::{GeneratorError, GeneratorResult};
use log::{debug, info};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// One rendered artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<PathBuf>, contents: String) -> Self {
        Self {
            path: path.into(),
            contents,
        }
    }

    /// Whether the file on disk already holds exactly these contents.
    fn is_current(&self) -> bool {
        std::fs::read(&self.path).is_ok_and(|existing| existing == self.contents.as_bytes())
    }
}

/// How an artifact on disk differs from its rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Staleness {
    Missing,
    Outdated,
}

/// Outcome of [`GeneratedFiles::write`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
}

/// Every artifact of one generation run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneratedFiles {
    files: Vec<GeneratedFile>,
}

fn write_error(path: &Path, source: std::io::Error) -> GeneratorError {
    GeneratorError::Write {
        path: path.to_path_buf(),
        source,
    }
}

impl GeneratedFiles {
    pub fn new(files: Vec<GeneratedFile>) -> Self {
        Self { files }
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratedFile> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Contents rendered for `path`, if it is one of the artifacts.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        let path = path.as_ref();
        self.files
            .iter()
            .find(|f| f.path == path)
            .map(|f| f.contents.as_str())
    }

    /// Write every changed artifact.
    ///
    /// Nothing is renamed into place until every changed file has been
    /// staged, so an error while staging leaves all destinations untouched.
    pub fn write(&self) -> GeneratorResult<WriteSummary> {
        let mut summary = WriteSummary::default();
        let mut staged = Vec::new();

        for file in &self.files {
            if file.is_current() {
                debug!("{} is up to date", file.path.display());
                summary.unchanged.push(file.path.clone());
                continue;
            }
            staged.push((file, Self::stage(file)?));
        }

        for (file, temp) in staged {
            temp.persist(&file.path)
                .map_err(|e| write_error(&file.path, e.error))?;
            info!("Wrote {}", file.path.display());
            summary.written.push(file.path.clone());
        }

        Ok(summary)
    }

    fn stage(file: &GeneratedFile) -> GeneratorResult<NamedTempFile> {
        let dir = match file.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| write_error(&file.path, e))?;
        let mut temp = NamedTempFile::new_in(dir).map_err(|e| write_error(&file.path, e))?;
        temp.write_all(file.contents.as_bytes())
            .and_then(|_| temp.flush())
            .map_err(|e| write_error(&file.path, e))?;
        Ok(temp)
    }

    /// Compare every artifact with the disk without writing anything.
    ///
    /// Returns the artifacts that would change, in rendering order.
    pub fn check(&self) -> Vec<(PathBuf, Staleness)> {
        self.files
            .iter()
            .filter_map(|file| {
                if !file.path.exists() {
                    Some((file.path.clone(), Staleness::Missing))
                } else if !file.is_current() {
                    Some((file.path.clone(), Staleness::Outdated))
                } else {
                    None
                }
            })
            .collect()
    }
}
