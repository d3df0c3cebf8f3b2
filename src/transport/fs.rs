use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::AtlasError;
use crate::types::ResourceName;

/// Filesystem directory holding resource documents by file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceDir {
    root: PathBuf,
}

impl ResourceDir {
    /// Create a reader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory the documents are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of resource `name`.
    pub fn path_of(&self, name: ResourceName) -> PathBuf {
        self.root.join(name)
    }

    /// Read resource `name` as UTF-8 text.
    ///
    /// A missing file is `ResourceUnavailable`; other IO failures propagate.
    pub fn read(&self, name: ResourceName) -> Result<String, AtlasError> {
        let path = self.path_of(name);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(AtlasError::ResourceUnavailable {
                    name,
                    reason: format!("{} does not exist", path.display()),
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}
