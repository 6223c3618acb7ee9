use crate::error::ScriptsError;
use core_types::{ScriptBatch, ScriptFile};
use std::cmp::Ordering;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Finds the scripts of a run.
#[derive(Debug, Clone)]
pub struct ScriptLocator {
    extensions: Vec<String>,
}

impl ScriptLocator {
    /// `extensions` are compared case-insensitively and without the leading dot.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_string())
                .collect(),
        }
    }

    /// Collects every regular file under `root` with an accepted extension.
    ///
    /// A missing `root` is created and yields an empty batch. Within each
    /// directory, files come first sorted by name, then subdirectories sorted by
    /// name, each descended before the next one. Returned paths are absolute.
    pub fn locate(&self, root: &Path) -> Result<ScriptBatch, ScriptsError> {
        let discovery = |source: io::Error| ScriptsError::Discovery {
            root: root.to_path_buf(),
            source,
        };

        if !root.exists() {
            fs::create_dir_all(root).map_err(discovery)?;
            tracing::info!(dir = %root.display(), "Script directory did not exist and was created");
        }
        if !root.is_dir() {
            return Err(discovery(io::Error::new(
                io::ErrorKind::InvalidInput,
                "script path is not a directory",
            )));
        }
        let root = fs::canonicalize(root).map_err(discovery)?;

        let mut scripts = Vec::new();
        for entry in WalkDir::new(&root)
            .min_depth(1)
            .follow_links(false)
            .sort_by(files_then_directories)
        {
            let entry = entry.map_err(|e| discovery(e.into()))?;
            if is_script_file(&entry) && self.accepts(entry.file_name()) {
                scripts.push(ScriptFile::new(entry.into_path()));
            }
        }

        tracing::debug!(root = %root.display(), count = scripts.len(), "Scripts located");
        Ok(ScriptBatch::new(scripts))
    }

    /// Whether a file name carries one of the accepted extensions.
    pub fn accepts(&self, file_name: &OsStr) -> bool {
        let Some(ext) = file_name.to_str().and_then(extension_of) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(ext))
    }
}

/// Everything after the last `.`; a name without a dot has no extension.
fn extension_of(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(_, ext)| ext)
}

/// Regular files, or symlinks that resolve to one. Linked directories are never descended.
fn is_script_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
}

fn files_then_directories(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}
