//! Bake-file rendering and atomic output.
//!
//! One `target` block per internal, non-anonymous stage and one `group`
//! block per batch. Ordering and whitespace are fixed so two runs over
//! identical inputs produce byte-identical files. The file is written
//! through a named temp file and renamed into place; a failed run never
//! leaves a partial bake file behind.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use tracing::debug;

use crate::error::{PrebakeError, Result};
use crate::graph::Graph;
use crate::schedule::Schedule;

/// Renders the bake configuration for a schedule.
pub fn render(root: &Path, graph: &Graph, schedule: &Schedule) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "// docker-bake.hcl generated by prebake");
    let _ = writeln!(out, "// source: {}", root.display());
    let _ = writeln!(out);

    // Targets in lexicographic alias order (node map iteration order).
    for node in graph.target_nodes() {
        let origin = node.origin_file.as_deref().unwrap_or_else(|| Path::new("."));
        let context = match origin.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.display().to_string(),
            _ => ".".to_string(),
        };
        let _ = writeln!(out, "target \"{}\" {{", node.name);
        let _ = writeln!(out, "  context    = \"{}\"", context);
        let _ = writeln!(out, "  dockerfile = \"{}\"", origin.display());
        let _ = writeln!(out, "  target     = \"{}\"", node.name);
        let _ = writeln!(out, "}}");
        let _ = writeln!(out);
    }

    // Groups one-based in batch order. Anonymous stages cannot be
    // targeted by the build driver, so they are filtered out; a batch
    // left empty emits no group and consumes no number.
    let mut group_index = 0usize;
    for batch in &schedule.batches {
        let members: Vec<&String> = batch
            .iter()
            .filter(|alias| graph.nodes.get(*alias).is_some_and(|n| !n.synthetic))
            .collect();
        if members.is_empty() {
            continue;
        }
        group_index += 1;
        let quoted: Vec<String> = members.iter().map(|m| format!("\"{m}\"")).collect();
        let _ = writeln!(out, "group \"group{}\" {{", group_index);
        let _ = writeln!(out, "  targets = [{}]", quoted.join(", "));
        let _ = writeln!(out, "}}");
        let _ = writeln!(out);
    }

    out
}

/// Writes `contents` to `path` atomically (temp file + rename).
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let io_err = |source| PrebakeError::Io { path: path.to_path_buf(), source };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(contents.as_bytes()).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    debug!(path = %path.display(), bytes = contents.len(), "wrote bake file");
    Ok(())
}
