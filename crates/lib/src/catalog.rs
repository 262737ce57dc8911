//! Candidate permission catalogs.
//!
//! A catalog is the ordered list of permission names that get probed. Order
//! only decides shard boundaries and the scan order of elimination.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

const BUILTIN: &str = include_str!("../data/permissions.txt");

/// Errors raised while loading a catalog.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("failed to read permission catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog contained no permission names.
    #[error("permission catalog {source_name} is empty")]
    Empty { source_name: String },
}

/// An ordered sequence of candidate permission names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    permissions: Vec<String>,
}

impl Catalog {
    /// Wrap an existing list without filtering.
    pub fn new(permissions: Vec<String>) -> Self {
        Self { permissions }
    }

    /// The catalog bundled with the library.
    pub fn builtin() -> Self {
        Self::from_text(BUILTIN)
    }

    /// Parse one permission per line. Blank lines and `#` comments are skipped.
    pub fn from_text(text: &str) -> Self {
        let permissions = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();
        Self { permissions }
    }

    /// Read a catalog file, rejecting files with no permission names.
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CatalogError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let catalog = Self::from_text(&text);
        if catalog.is_empty() {
            return Err(CatalogError::Empty {
                source_name: path.display().to_string(),
            });
        }
        debug!(path = %path.display(), count = catalog.len(), "Loaded permission catalog");
        Ok(catalog)
    }

    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

impl From<Vec<String>> for Catalog {
    fn from(permissions: Vec<String>) -> Self {
        Self::new(permissions)
    }
}

impl FromIterator<String> for Catalog {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
