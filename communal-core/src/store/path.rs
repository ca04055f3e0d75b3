use std::fmt::Display;

use super::{StoreError, StoreResult};

/// The address of a document, made of `collection/document` segment pairs.
/// Example: `users/abc/communitySnippets/rust`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath(String);

impl DocumentPath {
    pub fn new<I, S>(segments: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segments: Vec<String> = segments
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();

        if segments.is_empty() || segments.len() % 2 != 0 {
            return Err(StoreError::InvalidPath(format!(
                "expected collection/document pairs, got {} segments",
                segments.len()
            )));
        }

        if let Some(segment) = segments.iter().find(|s| s.is_empty() || s.contains('/')) {
            return Err(StoreError::InvalidPath(format!(
                "invalid segment {segment:?}"
            )));
        }

        Ok(Self(segments.join("/")))
    }

    /// Parses a slash separated path
    pub fn parse(path: &str) -> StoreResult<Self> {
        Self::new(path.split('/'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id of the document within its collection
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// The path of the collection this document belongs to
    pub fn collection(&self) -> &str {
        self.0
            .rsplit_once('/')
            .map(|(collection, _)| collection)
            .unwrap_or_default()
    }
}

impl Display for DocumentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
