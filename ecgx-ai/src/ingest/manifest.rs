//! Record manifest (`RECORDS` file): the set of record paths known to be valid

use super::DatasetError;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct RecordManifest {
    ids: HashSet<String>,
}

impl RecordManifest {
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = Self::from_lines(&content);
        tracing::debug!(
            path = %path.display(),
            records = manifest.len(),
            "Loaded record manifest"
        );
        Ok(manifest)
    }

    /// Newline-delimited ids; blank lines ignored, whitespace trimmed
    pub fn from_lines(content: &str) -> Self {
        let ids = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self { ids }
    }

    pub fn contains(&self, record: &str) -> bool {
        self.ids.contains(record.trim())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for RecordManifest {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}
