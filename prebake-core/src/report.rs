//! Diagnostics accumulated across a run.
//!
//! Parse-level problems are local: they are recorded here and the run
//! continues. The CLI renders the report to stderr once the pipeline
//! finishes (or aborts).

use std::path::PathBuf;
use tracing::warn;

/// A malformed line that was reported and skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIssue {
    pub file: PathBuf,
    /// 1-based line number of the offending logical line.
    pub line: usize,
    pub message: String,
}

/// The same alias declared in more than one file. Later declarations
/// collapse into the first; the run continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasCollision {
    pub alias: String,
    pub first: PathBuf,
    pub later: Vec<PathBuf>,
}

/// A reference to a local stage that carried an explicit tag. The tag is
/// ignored during matching; the bake file builds the untagged stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredTag {
    /// Alias of the internal stage the reference resolved to.
    pub stage: String,
    pub tag: String,
    /// Alias of the stage whose edge carried the tag.
    pub referenced_by: String,
}

/// Run-level diagnostics container.
#[derive(Debug, Default)]
pub struct Report {
    pub parse_issues: Vec<ParseIssue>,
    pub collisions: Vec<AliasCollision>,
    pub ignored_tags: Vec<IgnoredTag>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_issue(&mut self, file: &std::path::Path, line: usize, message: impl Into<String>) {
        let message = message.into();
        warn!(file = %file.display(), line, %message, "parse issue");
        self.parse_issues.push(ParseIssue { file: file.to_path_buf(), line, message });
    }

    pub fn alias_collision(&mut self, alias: &str, first: &std::path::Path, later: &std::path::Path) {
        warn!(alias, first = %first.display(), later = %later.display(), "alias declared in multiple files");
        if let Some(existing) = self.collisions.iter_mut().find(|c| c.alias == alias) {
            existing.later.push(later.to_path_buf());
            return;
        }
        self.collisions.push(AliasCollision {
            alias: alias.to_string(),
            first: first.to_path_buf(),
            later: vec![later.to_path_buf()],
        });
    }

    pub fn ignored_tag(&mut self, stage: &str, tag: &str, referenced_by: &str) {
        warn!(stage, tag, referenced_by, "tag on local stage reference ignored");
        self.ignored_tags.push(IgnoredTag {
            stage: stage.to_string(),
            tag: tag.to_string(),
            referenced_by: referenced_by.to_string(),
        });
    }

    /// True when nothing was recorded.
    pub fn is_clean(&self) -> bool {
        self.parse_issues.is_empty() && self.collisions.is_empty() && self.ignored_tags.is_empty()
    }
}
