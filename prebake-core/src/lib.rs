//! prebake core library.
//!
//! Resolves the cross-file stage graph of a tree of multi-stage build
//! files and plans the batched build order: walk the tree, parse each
//! build file into stages, merge them into one classified graph, layer
//! the internal subgraph into batches, and render a docker-bake
//! configuration expressing the plan.

pub mod bake;
pub mod classify;
pub mod error;
pub mod graph;
pub mod image;
pub mod parser;
pub mod report;
pub mod schedule;
pub mod walker;

pub use error::{PrebakeError, Result};
pub use graph::{Graph, Node, NodeKind};
pub use image::ImageRef;
pub use parser::{EdgeKind, EdgeRef, Stage};
pub use report::Report;
pub use schedule::Schedule;

use std::path::Path;

/// Everything a run produces short of the output file.
#[derive(Debug)]
pub struct Plan {
    pub graph: Graph,
    pub schedule: Schedule,
    pub report: Report,
    /// Rendered bake configuration.
    pub hcl: String,
    /// Stages parsed, before collision collapsing.
    pub stage_count: usize,
}

/// Runs the pipeline over `root`: discover, parse, build the graph,
/// layer batches, render. Does not touch the output file.
pub fn plan(root: &Path) -> Result<Plan> {
    let mut report = Report::new();

    let mut stages = Vec::new();
    for file in walker::discover(root)? {
        stages.extend(parser::parse_file(&file.path, &file.content, &mut report));
    }
    let stage_count = stages.len();

    let graph = Graph::build(stages, &mut report);
    let schedule = Schedule::layer(&graph)?;
    let hcl = bake::render(root, &graph, &schedule);

    Ok(Plan { graph, schedule, report, hcl, stage_count })
}
