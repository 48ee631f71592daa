//! Global stage graph construction.
//!
//! Merges per-file parse results into one graph, resolves every edge
//! reference against the locally declared aliases, and classifies each
//! distinct reference as internal, external-base, or external-dep.
//! Resolution matches on the reference's bare name; tags are advisory
//! and only feed warnings. The alias table is built once and never
//! mutated afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::debug;

use crate::image::ImageRef;
use crate::parser::{EdgeKind, Stage};
use crate::report::Report;

/// Classification of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Declared by a stage in the corpus; must be built here.
    Internal,
    /// Only ever the base of a stage; pulled from a registry.
    ExternalBase,
    /// Consumed as a build artifact but not declared locally; pulled
    /// from a registry.
    ExternalDep,
}

/// A node in the global stage graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    /// File that declared the stage (internal nodes only).
    pub origin_file: Option<PathBuf>,
    /// Zero-based stage index within the origin file (internal only).
    pub position: Option<usize>,
    /// True for anonymous stages carrying a synthetic alias.
    pub synthetic: bool,
    /// Internal stages that reference this node (external nodes only;
    /// internal dependents live in the adjacency maps).
    pub dependents: BTreeSet<String>,
    /// Tags seen on references to this node (external nodes only).
    pub tags: BTreeSet<String>,
}

/// The merged, classified stage graph.
#[derive(Debug, Default)]
pub struct Graph {
    /// All nodes keyed by name, internal and external alike.
    pub nodes: BTreeMap<String, Node>,
    /// Internal-only predecessor adjacency: alias -> stages it needs.
    pub preds: BTreeMap<String, BTreeSet<String>>,
    /// Internal-only successor adjacency: alias -> stages needing it.
    pub succs: BTreeMap<String, BTreeSet<String>>,
    /// Internal stages referenced from a file other than their origin.
    pub crossover: BTreeSet<String>,
    /// Distinct registry prefixes seen on any reference.
    pub registries: BTreeSet<String>,
    /// Distinct tags seen on any reference.
    pub tags: BTreeSet<String>,
}

impl Graph {
    /// Builds the graph from every parsed stage, recording collisions
    /// and ignored tags on `report`.
    pub fn build(stages: Vec<Stage>, report: &mut Report) -> Graph {
        // One authoritative pass: first declaration of an alias wins,
        // later declarations collapse into it with a warning.
        let mut retained: Vec<Stage> = Vec::new();
        let mut first_origin: BTreeMap<String, PathBuf> = BTreeMap::new();
        for stage in stages {
            match first_origin.get(&stage.alias) {
                Some(first) => {
                    report.alias_collision(&stage.alias, first, &stage.origin_file);
                }
                None => {
                    first_origin.insert(stage.alias.clone(), stage.origin_file.clone());
                    retained.push(stage);
                }
            }
        }

        // Alias table: non-synthetic aliases only. Anonymous stages are
        // nodes but cannot be targeted by name.
        let alias_table: BTreeMap<&str, &Stage> = retained
            .iter()
            .filter(|s| !s.synthetic)
            .map(|s| (s.alias.as_str(), s))
            .collect();

        let mut graph = Graph::default();
        let mut artifact_refs: BTreeSet<String> = BTreeSet::new();

        for stage in &retained {
            graph.nodes.insert(
                stage.alias.clone(),
                Node {
                    name: stage.alias.clone(),
                    kind: NodeKind::Internal,
                    origin_file: Some(stage.origin_file.clone()),
                    position: Some(stage.position),
                    synthetic: stage.synthetic,
                    dependents: BTreeSet::new(),
                    tags: BTreeSet::new(),
                },
            );
            graph.preds.entry(stage.alias.clone()).or_default();
            graph.succs.entry(stage.alias.clone()).or_default();
        }

        for stage in &retained {
            for edge in &stage.edges {
                let image = ImageRef::parse(&edge.reference);
                if let Some(registry) = &image.registry {
                    graph.registries.insert(registry.clone());
                }
                if let Some(tag) = &image.tag {
                    graph.tags.insert(tag.clone());
                }

                if image.name == stage.alias {
                    // Pathological self-reference; not an edge.
                    debug!(stage = %stage.alias, "dropping self-loop");
                    continue;
                }

                match alias_table.get(image.name.as_str()) {
                    Some(dependency) => {
                        if let Some(tag) = &image.tag {
                            report.ignored_tag(&image.name, tag, &stage.alias);
                        }
                        if dependency.origin_file != stage.origin_file {
                            graph.crossover.insert(image.name.clone());
                        }
                        graph
                            .preds
                            .entry(stage.alias.clone())
                            .or_default()
                            .insert(image.name.clone());
                        graph
                            .succs
                            .entry(image.name.clone())
                            .or_default()
                            .insert(stage.alias.clone());
                    }
                    None => {
                        let node = graph.nodes.entry(image.name.clone()).or_insert_with(|| Node {
                            name: image.name.clone(),
                            kind: NodeKind::ExternalBase,
                            origin_file: None,
                            position: None,
                            synthetic: false,
                            dependents: BTreeSet::new(),
                            tags: BTreeSet::new(),
                        });
                        // A literal reference to a synthetic alias lands
                        // here; anonymous stages cannot be depended on,
                        // so the reference is dropped.
                        if node.kind == NodeKind::Internal {
                            continue;
                        }
                        if edge.kind != EdgeKind::Base {
                            artifact_refs.insert(image.name.clone());
                        }
                        node.dependents.insert(stage.alias.clone());
                        if let Some(tag) = &image.tag {
                            node.tags.insert(tag.clone());
                        }
                    }
                }
            }
        }

        // External classification is final once every file is merged: a
        // reference consumed as an artifact anywhere is external-dep.
        for name in &artifact_refs {
            if let Some(node) = graph.nodes.get_mut(name) {
                if node.kind == NodeKind::ExternalBase {
                    node.kind = NodeKind::ExternalDep;
                }
            }
        }

        graph
    }

    /// True when `name` is a declared stage (anonymous ones included).
    pub fn is_internal(&self, name: &str) -> bool {
        self.nodes.get(name).is_some_and(|n| n.kind == NodeKind::Internal)
    }

    /// All internal nodes, sorted by alias.
    pub fn internal_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| n.kind == NodeKind::Internal)
    }

    /// Internal, non-anonymous nodes: the emitted bake targets.
    pub fn target_nodes(&self) -> impl Iterator<Item = &Node> {
        self.internal_nodes().filter(|n| !n.synthetic)
    }

    /// External nodes with their dependents, sorted by name.
    pub fn external_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| n.kind != NodeKind::Internal)
    }
}
