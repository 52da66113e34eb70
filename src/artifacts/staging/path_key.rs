use crate::artifacts::objects::tree::PATH_SEPARATOR;
use crate::errors::{StageError, StageResult};

/// A validated, non-empty sequence of path segments
///
/// The last segment names the entry itself, the preceding ones its
/// containing directories. Paths are relative: no leading separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey {
    segments: Vec<String>,
}

impl PathKey {
    pub fn parse(path: &str) -> StageResult<Self> {
        if path.is_empty() {
            return Err(StageError::invalid_path(path, "path is empty"));
        }

        let segments = path
            .split(char::from(PATH_SEPARATOR))
            .map(|segment| match segment {
                "" => Err(StageError::invalid_path(path, "path has an empty segment")),
                "." | ".." => Err(StageError::invalid_path(path, "path has a relative segment")),
                s if s.contains('\0') => Err(StageError::invalid_path(path, "path has a NUL byte")),
                s => Ok(s.to_string()),
            })
            .collect::<StageResult<Vec<_>>>()?;

        Ok(PathKey { segments })
    }

    /// Containing directories, outermost first
    pub fn parents(&self) -> &[String] {
        &self.segments[..self.segments.len() - 1]
    }

    /// The entry's own name
    pub fn name(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }
}

impl TryFrom<&str> for PathKey {
    type Error = StageError;

    fn try_from(path: &str) -> StageResult<Self> {
        Self::parse(path)
    }
}

impl std::fmt::Display for PathKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}
