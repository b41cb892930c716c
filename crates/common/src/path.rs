//! Virtual storage paths of the form `container/relative/path`.

use std::fmt;
use std::str::FromStr;

/// Separator between path segments, in virtual paths and object keys alike.
pub const SEPARATOR: char = '/';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("storage path is empty")]
    Empty,

    #[error("storage path has no container: {0}")]
    NoContainer(String),

    #[error("storage path has an empty or dot segment: {0}")]
    BadSegment(String),

    #[error("storage path contains an illegal character: {0}")]
    IllegalCharacter(String),
}

/// A path addressing a file or directory inside a container.
///
/// The relative part may be empty, which addresses the container root
/// (only meaningful for directory operations).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoragePath {
    container: String,
    relative: String,
}

impl StoragePath {
    pub fn new(container: &str, relative: &str) -> Result<Self, PathError> {
        if container.is_empty() {
            return Err(PathError::NoContainer(relative.to_string()));
        }
        validate(container, container)?;
        let relative = relative.trim_matches(SEPARATOR);
        if !relative.is_empty() {
            validate(relative, relative)?;
        }
        Ok(Self {
            container: container.to_string(),
            relative: relative.to_string(),
        })
    }

    /// The root directory of a container.
    pub fn container_root(container: &str) -> Result<Self, PathError> {
        Self::new(container, "")
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Whether this addresses the container itself rather than an entry in it.
    pub fn is_root(&self) -> bool {
        self.relative.is_empty()
    }

    /// Last segment of the relative path.
    pub fn file_name(&self) -> Option<&str> {
        self.relative.rsplit(SEPARATOR).next().filter(|s| !s.is_empty())
    }

    pub fn join(&self, child: &str) -> Result<Self, PathError> {
        let relative = if self.relative.is_empty() {
            child.to_string()
        } else {
            format!("{}{}{}", self.relative, SEPARATOR, child)
        };
        Self::new(&self.container, &relative)
    }
}

fn validate(value: &str, whole: &str) -> Result<(), PathError> {
    if value.contains(['\\', '\0']) {
        return Err(PathError::IllegalCharacter(whole.to_string()));
    }
    if value
        .split(SEPARATOR)
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(PathError::BadSegment(whole.to_string()));
    }
    Ok(())
}

impl FromStr for StoragePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_start_matches(SEPARATOR);
        if s.is_empty() {
            return Err(PathError::Empty);
        }
        match s.split_once(SEPARATOR) {
            Some((container, relative)) => Self::new(container, relative),
            None => Self::container_root(s),
        }
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.relative.is_empty() {
            write!(f, "{}", self.container)
        } else {
            write!(f, "{}{}{}", self.container, SEPARATOR, self.relative)
        }
    }
}
