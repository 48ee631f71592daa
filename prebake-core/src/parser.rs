//! Per-file stage extraction.
//!
//! Walks a build file's logical lines and produces the ordered list of
//! stages it declares. Each stage records its base reference as its
//! first edge; `COPY --from=` and `RUN --mount=...,from=...` directives
//! attach further edges to the stage currently open. Stages are
//! immutable once the file is parsed.

use std::path::{Path, PathBuf};

use crate::classify::{classify, stitch, Directive};
use crate::report::Report;

/// How an edge was introduced in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// The stage's `FROM` clause.
    Base,
    /// `COPY --from=<ref>`.
    Copy,
    /// `RUN --mount=...,from=<ref>`.
    Mount,
}

/// One dependency reference emitted inside a stage, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRef {
    /// The reference exactly as written (may carry registry/tag/digest).
    pub reference: String,
    pub kind: EdgeKind,
}

/// A build unit declared by a stage-introduction line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Declared alias, or `<file-basename>#<position>` for anonymous
    /// stages.
    pub alias: String,
    /// True when the alias was synthesized for an anonymous stage.
    pub synthetic: bool,
    /// The `FROM` reference, verbatim.
    pub base_ref: String,
    pub origin_file: PathBuf,
    /// Zero-based index within this file's stage sequence.
    pub position: usize,
    /// Base edge first, then copy/mount edges in source order.
    pub edges: Vec<EdgeRef>,
}

/// True when the file's first effective logical line is a stage
/// introduction. Files are discovered extension-blind, so this sniff is
/// what decides build-file candidacy.
pub fn is_build_file(content: &str) -> bool {
    stitch(content)
        .lines
        .first()
        .and_then(|line| line.text.split_whitespace().next().map(str::to_string))
        .is_some_and(|kw| kw.eq_ignore_ascii_case("FROM"))
}

/// Parses one build file into its ordered stage list.
///
/// Malformed lines are recorded on `report` and skipped; parsing always
/// continues. A file with no stage directives yields an empty list.
pub fn parse_file(path: &Path, content: &str, report: &mut Report) -> Vec<Stage> {
    let stitched = stitch(content);
    if let Some(line) = stitched.unterminated {
        report.parse_issue(path, line, "unterminated line continuation");
    }

    let basename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Dockerfile".to_string());

    let mut stages: Vec<Stage> = Vec::new();
    let mut current: Option<Stage> = None;

    for line in &stitched.lines {
        let directives = match classify(&line.text) {
            Ok(directives) => directives,
            Err(message) => {
                report.parse_issue(path, line.number, message);
                continue;
            }
        };

        for directive in directives {
            match directive {
                Directive::Stage { base, alias } => {
                    if let Some(done) = current.take() {
                        stages.push(done);
                    }
                    let position = stages.len();
                    let (alias, synthetic) = match alias {
                        Some(alias) => (alias, false),
                        None => (format!("{basename}#{position}"), true),
                    };
                    current = Some(Stage {
                        alias,
                        synthetic,
                        base_ref: base.clone(),
                        origin_file: path.to_path_buf(),
                        position,
                        edges: vec![EdgeRef { reference: base, kind: EdgeKind::Base }],
                    });
                }
                Directive::CopyFrom { reference } => {
                    attach(&mut current, reference, EdgeKind::Copy, path, line.number, report);
                }
                Directive::MountFrom { reference } => {
                    attach(&mut current, reference, EdgeKind::Mount, path, line.number, report);
                }
            }
        }
    }

    if let Some(done) = current.take() {
        stages.push(done);
    }
    stages
}

fn attach(
    current: &mut Option<Stage>,
    reference: String,
    kind: EdgeKind,
    path: &Path,
    line: usize,
    report: &mut Report,
) {
    match current {
        Some(stage) => stage.edges.push(EdgeRef { reference, kind }),
        None => report.parse_issue(path, line, "dependency directive before any FROM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> (Vec<Stage>, Report) {
        let mut report = Report::new();
        let stages = parse_file(Path::new("svc/Dockerfile"), content, &mut report);
        (stages, report)
    }

    #[test]
    fn test_single_stage() {
        let (stages, report) = parse("FROM alpine:3.19 AS base\nRUN apk add curl\n");
        assert!(report.is_clean());
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].alias, "base");
        assert_eq!(stages[0].base_ref, "alpine:3.19");
        assert_eq!(stages[0].position, 0);
        assert_eq!(stages[0].edges.len(), 1);
        assert_eq!(stages[0].edges[0].kind, EdgeKind::Base);
    }

    #[test]
    fn test_stage_order_preserved() {
        let (stages, _) = parse(
            "FROM rust:1.79 AS build\nRUN cargo build\nFROM debian:bookworm AS runtime\nCOPY --from=build /out /app\n",
        );
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].alias, "build");
        assert_eq!(stages[1].alias, "runtime");
        assert_eq!(stages[1].position, 1);
        assert_eq!(stages[1].edges.len(), 2);
        assert_eq!(stages[1].edges[1].reference, "build");
        assert_eq!(stages[1].edges[1].kind, EdgeKind::Copy);
    }

    #[test]
    fn test_anonymous_stage_synthetic_alias() {
        let (stages, _) = parse("FROM golang:1.22 AS builder\nFROM alpine:3.19\n");
        assert_eq!(stages.len(), 2);
        assert!(!stages[0].synthetic);
        assert!(stages[1].synthetic);
        assert_eq!(stages[1].alias, "Dockerfile#1");
    }

    #[test]
    fn test_mount_edge_attaches_to_current_stage() {
        let (stages, _) = parse(
            "FROM alpine AS p\nFROM alpine AS q\nRUN --mount=type=bind,from=p,source=/f,target=/g cp /g /out\n",
        );
        assert_eq!(stages[1].edges.len(), 2);
        assert_eq!(stages[1].edges[1].reference, "p");
        assert_eq!(stages[1].edges[1].kind, EdgeKind::Mount);
    }

    #[test]
    fn test_malformed_from_skipped_and_reported() {
        let (stages, report) = parse("FROM\nFROM alpine AS ok\n");
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].alias, "ok");
        assert_eq!(report.parse_issues.len(), 1);
        assert_eq!(report.parse_issues[0].line, 1);
    }

    #[test]
    fn test_edge_before_any_stage_reported() {
        let (stages, report) = parse("COPY --from=ghost /a /b\nFROM alpine AS ok\n");
        assert_eq!(stages.len(), 1);
        assert_eq!(report.parse_issues.len(), 1);
        assert!(report.parse_issues[0].message.contains("before any FROM"));
    }

    #[test]
    fn test_no_stage_directives_yields_empty() {
        let (stages, report) = parse("RUN echo hi\nENV A=b\n");
        assert!(stages.is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn test_is_build_file_sniff() {
        assert!(is_build_file("# comment\nFROM alpine\n"));
        assert!(is_build_file("  from alpine as x\n"));
        assert!(!is_build_file("#!/bin/sh\necho FROM nothing\n"));
        assert!(!is_build_file("fn main() {}\n"));
        assert!(!is_build_file(""));
    }

    #[test]
    fn test_continuation_carries_mount_reference() {
        let (stages, _) = parse(
            "FROM alpine AS p\nFROM alpine AS q\nRUN --mount=type=bind,from=p,target=/g \\\n    cp /g /out\n",
        );
        assert_eq!(stages[1].edges.len(), 2);
        assert_eq!(stages[1].edges[1].reference, "p");
    }
}
