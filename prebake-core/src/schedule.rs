//! Batch scheduling.
//!
//! Longest-path layering over the internal subgraph: batch 0 holds every
//! internal stage with no internal predecessors, batch k holds the
//! stages whose deepest internal predecessor sits in batch k-1. External
//! predecessors gate nothing. Within a batch, members are ordered
//! lexicographically so the emitted file is reproducible.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{PrebakeError, Result};
use crate::graph::Graph;

/// An ordered sequence of batches covering every internal stage once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub batches: Vec<Vec<String>>,
}

impl Schedule {
    /// Layers the internal subgraph by Kahn-style in-degree peeling.
    ///
    /// Returns [`PrebakeError::Cycle`] listing the residual nodes if any
    /// stage never reaches in-degree zero.
    pub fn layer(graph: &Graph) -> Result<Schedule> {
        // In-degree counts only internal predecessors.
        let mut indeg: BTreeMap<&str, usize> = graph
            .internal_nodes()
            .map(|n| (n.name.as_str(), graph.preds.get(&n.name).map_or(0, |p| p.len())))
            .collect();

        let total = indeg.len();
        let mut assigned = 0usize;
        let mut batches: Vec<Vec<String>> = Vec::new();

        // BTreeMap iteration keeps every batch lexicographically sorted.
        let mut frontier: Vec<&str> =
            indeg.iter().filter(|(_, d)| **d == 0).map(|(n, _)| *n).collect();

        while !frontier.is_empty() {
            let mut next: Vec<&str> = Vec::new();
            for &name in &frontier {
                if let Some(succs) = graph.succs.get(name) {
                    for succ in succs {
                        let d = indeg.get_mut(succ.as_str()).expect("successor is internal");
                        *d -= 1;
                        if *d == 0 {
                            next.push(succ.as_str());
                        }
                    }
                }
            }
            next.sort_unstable();
            assigned += frontier.len();
            batches.push(frontier.iter().map(|s| s.to_string()).collect());
            frontier = next;
        }

        if assigned != total {
            let nodes: Vec<String> = indeg
                .iter()
                .filter(|(_, d)| **d > 0)
                .map(|(n, _)| n.to_string())
                .collect();
            return Err(PrebakeError::Cycle { nodes });
        }

        debug!(batches = batches.len(), stages = total, "layered schedule");
        Ok(Schedule { batches })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_file;
    use crate::report::Report;
    use std::path::Path;

    fn schedule_of(files: &[(&str, &str)]) -> Result<Schedule> {
        let mut report = Report::new();
        let mut stages = Vec::new();
        for (path, content) in files {
            stages.extend(parse_file(Path::new(path), content, &mut report));
        }
        Schedule::layer(&Graph::build(stages, &mut report))
    }

    fn batch(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_linear_chain_one_stage_per_batch() {
        let s = schedule_of(&[(
            "Dockerfile",
            "FROM alpine AS a\nFROM a AS b\nFROM b AS c\nFROM c AS d\n",
        )])
        .unwrap();
        assert_eq!(s.batches, vec![batch(&["a"]), batch(&["b"]), batch(&["c"]), batch(&["d"])]);
    }

    #[test]
    fn test_diamond() {
        let s = schedule_of(&[
            ("r/Dockerfile", "FROM debian AS r\n"),
            ("l/Dockerfile", "FROM r AS l\n"),
            ("m/Dockerfile", "FROM r AS m\n"),
            ("j/Dockerfile", "FROM l AS j\nCOPY --from=m /x /x\n"),
        ])
        .unwrap();
        assert_eq!(s.batches, vec![batch(&["r"]), batch(&["l", "m"]), batch(&["j"])]);
    }

    #[test]
    fn test_external_predecessors_do_not_gate() {
        let s = schedule_of(&[(
            "Dockerfile",
            "FROM ubuntu:plucky AS x\nCOPY --from=busybox /bin/busybox /bin/\nFROM x AS y\n",
        )])
        .unwrap();
        assert_eq!(s.batches, vec![batch(&["x"]), batch(&["y"])]);
    }

    #[test]
    fn test_mount_edge_orders_batches() {
        let s = schedule_of(&[(
            "Dockerfile",
            "FROM alpine AS p\nFROM alpine AS q\nRUN --mount=type=bind,from=p,source=/f,target=/g cp /g /o\n",
        )])
        .unwrap();
        assert_eq!(s.batches, vec![batch(&["p"]), batch(&["q"])]);
    }

    #[test]
    fn test_level_is_deepest_predecessor() {
        // e depends on both a (level 0) and d (level 2): lands at level 3.
        let s = schedule_of(&[(
            "Dockerfile",
            "FROM alpine AS a\nFROM a AS c\nFROM c AS d\nFROM a AS e\nCOPY --from=d /x /x\n",
        )])
        .unwrap();
        assert_eq!(
            s.batches,
            vec![batch(&["a"]), batch(&["c"]), batch(&["d"]), batch(&["e"])]
        );
    }

    #[test]
    fn test_cycle_detected() {
        let err = schedule_of(&[(
            "Dockerfile",
            "FROM beta AS alpha\nFROM alpha AS beta\n",
        )])
        .unwrap_err();
        match err {
            PrebakeError::Cycle { nodes } => {
                assert_eq!(nodes, vec!["alpha".to_string(), "beta".to_string()]);
            }
            other => panic!("expected cycle, got {other}"),
        }
    }

    #[test]
    fn test_batch_count_is_longest_path_plus_one() {
        let s = schedule_of(&[(
            "Dockerfile",
            "FROM alpine AS a\nFROM a AS b\nFROM alpine AS w\nFROM alpine AS v\n",
        )])
        .unwrap();
        assert_eq!(s.batches.len(), 2);
        assert_eq!(s.batches[0], batch(&["a", "v", "w"]));
    }
}
