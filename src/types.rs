//! Shared result types used by every validator.
//!
//! Each validator starts a run with an empty [`ValidationResult`], pushes
//! [`Issue`]s into it as checks fail, and hands the finished value back to
//! the caller. Nothing here is persisted between runs.
//!
//! The only contract consumed by CI is the exit code derived from
//! [`ValidationResult::is_valid`]: any error-severity issue fails the run,
//! warnings never do.

use serde::Serialize;

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks success: the run exits non-zero.
    Error,
    /// Reported, never blocks.
    Warning,
}

/// A single finding attributed to a file (and optionally a line in it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub file: String,
    /// 1-based line number. `None` means the issue concerns the whole file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub severity: Severity,
    pub message: String,
    /// Offending snippet, for source auditors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Issue {
    pub fn new(severity: Severity, file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            severity,
            message: message.into(),
            code: None,
        }
    }

    pub fn error(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, file, message)
    }

    pub fn warning(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, file, message)
    }

    /// Attach a 1-based line number. Line 0 is treated as file-level.
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = (line > 0).then_some(line);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Aggregated outcome of one validator run.
///
/// `S` carries the component-specific counters (URL counts for the sitemap,
/// file counts for the image auditors, ...).
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult<S> {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub stats: S,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

impl<S: Default> Default for ValidationResult<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S> ValidationResult<S> {
    pub fn new(stats: S) -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            stats,
            recommendations: Vec::new(),
        }
    }

    /// Route an issue into the errors or warnings list by its severity.
    pub fn push(&mut self, issue: Issue) {
        match issue.severity {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
        }
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        for issue in issues {
            self.push(issue);
        }
    }

    /// True iff no error-severity issue was recorded.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// All issues, errors first.
    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.errors.iter().chain(self.warnings.iter())
    }
}

/// Component counters that know how to describe themselves in a summary.
pub trait Stats: Serialize {
    /// Lines appended to the human-readable summary, e.g. `"URLs: 12 (11 unique)"`.
    fn summary(&self) -> Vec<String>;
}

impl Stats for () {
    fn summary(&self) -> Vec<String> {
        Vec::new()
    }
}
