//! Operation outcomes returned across the adapter boundary.

use std::fmt;

/// A fatal outcome. Each variant has a stable identifier for callers to
/// branch on; provider wording never appears here, only in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fatal {
    /// Unknown container, malformed path or oversized key
    InvalidPath { path: String },
    CreateFailed { path: String },
    StoreFailed { source: String, path: String },
    CopyFailed { src: String, dst: String },
    DeleteFailed { path: String },
    /// The local source file of a store could not be read
    ReadFailed { path: String },
    /// Any failure not classified above
    Internal { backend: String },
}

impl Fatal {
    pub fn identifier(&self) -> &'static str {
        match self {
            Fatal::InvalidPath { .. } => "backend-fail-invalidpath",
            Fatal::CreateFailed { .. } => "backend-fail-create",
            Fatal::StoreFailed { .. } => "backend-fail-store",
            Fatal::CopyFailed { .. } => "backend-fail-copy",
            Fatal::DeleteFailed { .. } => "backend-fail-delete",
            Fatal::ReadFailed { .. } => "backend-fail-read",
            Fatal::Internal { .. } => "backend-fail-internal",
        }
    }

    /// Paths (or the backend name) the identifier refers to.
    pub fn params(&self) -> Vec<&str> {
        match self {
            Fatal::InvalidPath { path }
            | Fatal::CreateFailed { path }
            | Fatal::DeleteFailed { path }
            | Fatal::ReadFailed { path } => vec![path],
            Fatal::StoreFailed { source, path } => vec![source, path],
            Fatal::CopyFailed { src, dst } => vec![src, dst],
            Fatal::Internal { backend } => vec![backend],
        }
    }
}

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.identifier(), self.params().join(", "))
    }
}

/// Result of a mutating operation: ok unless it carries a [`Fatal`].
///
/// Warnings are diagnostics for operators and never change the outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct Status {
    fatals: Vec<Fatal>,
    warnings: Vec<String>,
}

impl Status {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn fatal(fatal: Fatal) -> Self {
        Self {
            fatals: vec![fatal],
            warnings: Vec::new(),
        }
    }

    pub fn invalid_path(path: impl ToString) -> Self {
        Self::fatal(Fatal::InvalidPath {
            path: path.to_string(),
        })
    }

    pub fn is_ok(&self) -> bool {
        self.fatals.is_empty()
    }

    pub fn fatals(&self) -> &[Fatal] {
        &self.fatals
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn push_fatal(&mut self, fatal: Fatal) {
        self.fatals.push(fatal);
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.push_warning(warning);
        self
    }

    /// Whether any fatal has the given identifier.
    pub fn has(&self, identifier: &str) -> bool {
        self.fatals.iter().any(|f| f.identifier() == identifier)
    }

    /// Fold another outcome into this one.
    pub fn merge(&mut self, other: Status) {
        self.fatals.extend(other.fatals);
        self.warnings.extend(other.warnings);
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fatals.is_empty() {
            return write!(f, "ok");
        }
        let fatals: Vec<String> = self.fatals.iter().map(ToString::to_string).collect();
        write!(f, "{}", fatals.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_with_warnings_is_ok() {
        let status = Status::ok().with_warning("slow response");
        assert!(status.is_ok());
        assert_eq!(status.warnings(), ["slow response".to_string()]);
        assert_eq!(status.to_string(), "ok");
    }

    #[test]
    fn test_merge() {
        let mut status = Status::ok();
        status.merge(Status::fatal(Fatal::DeleteFailed {
            path: "media/.htsecure".to_string(),
        }));
        status.merge(Status::invalid_path("nope/x"));
        assert!(!status.is_ok());
        assert!(status.has("backend-fail-delete"));
        assert!(status.has("backend-fail-invalidpath"));
        assert_eq!(
            status.to_string(),
            "backend-fail-delete: media/.htsecure; backend-fail-invalidpath: nope/x"
        );
    }

    #[test]
    fn test_copy_cites_both_paths() {
        let fatal = Fatal::CopyFailed {
            src: "a/x".to_string(),
            dst: "b/y".to_string(),
        };
        assert_eq!(fatal.params(), vec!["a/x", "b/y"]);
    }
}
