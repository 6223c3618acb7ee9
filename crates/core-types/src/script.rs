use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A script discovered on disk. Identity is the absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptFile {
    path: PathBuf,
}

impl ScriptFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The final path component, lossily converted for display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn parent(&self) -> Option<&Path> {
        self.path.parent()
    }
}

/// The ordered scripts of one run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptBatch {
    scripts: Vec<ScriptFile>,
}

impl ScriptBatch {
    pub fn new(scripts: Vec<ScriptFile>) -> Self {
        Self { scripts }
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScriptFile> {
        self.scripts.iter()
    }

    pub fn paths(&self) -> Vec<&Path> {
        self.scripts.iter().map(ScriptFile::path).collect()
    }
}

impl<'a> IntoIterator for &'a ScriptBatch {
    type Item = &'a ScriptFile;
    type IntoIter = std::slice::Iter<'a, ScriptFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.scripts.iter()
    }
}
