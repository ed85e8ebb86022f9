//! Import graph (component C3): a directed multigraph over file paths,
//! with an iterative (recursion-free) Tarjan SCC implementation and the
//! fan-in/fan-out/orphan primitives detectors need.

use std::collections::{HashMap, HashSet};

/// One edge in the import graph. `deferred` edges (type-only imports,
/// dynamic imports, `TYPE_CHECKING` blocks) are excluded from cycle
/// detection but retained for coupling metrics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub deferred: bool,
}

/// Directed multigraph over file-path nodes, built once per scan and
/// immutable for that scan's duration.
#[derive(Debug, Clone, Default)]
pub struct ImportGraph {
    nodes: HashSet<String>,
    /// Adjacency including deferred edges, for coupling queries.
    out_all: HashMap<String, Vec<Edge>>,
    in_all: HashMap<String, Vec<Edge>>,
    /// Adjacency restricted to non-deferred edges, for cycle detection.
    out_strict: HashMap<String, Vec<String>>,
    entry_points: HashSet<String>,
}

impl ImportGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, file: &str) {
        self.nodes.insert(file.to_string());
        self.out_all.entry(file.to_string()).or_default();
        self.in_all.entry(file.to_string()).or_default();
        self.out_strict.entry(file.to_string()).or_default();
    }

    pub fn mark_entry_point(&mut self, file: &str) {
        self.add_node(file);
        self.entry_points.insert(file.to_string());
    }

    pub fn add_edge(&mut self, from: &str, to: &str, deferred: bool) {
        self.add_node(from);
        self.add_node(to);
        let edge = Edge { from: from.to_string(), to: to.to_string(), deferred };
        self.out_all.entry(from.to_string()).or_default().push(edge.clone());
        self.in_all.entry(to.to_string()).or_default().push(edge);
        if !deferred {
            self.out_strict.entry(from.to_string()).or_default().push(to.to_string());
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    /// Files imported by `f`, including deferred imports. O(deg).
    pub fn imports_of(&self, f: &str) -> Vec<&str> {
        self.out_all
            .get(f)
            .map(|edges| edges.iter().map(|e| e.to.as_str()).collect())
            .unwrap_or_default()
    }

    /// Files that import `f`, including deferred imports. O(deg).
    pub fn importers_of(&self, f: &str) -> Vec<&str> {
        self.in_all
            .get(f)
            .map(|edges| edges.iter().map(|e| e.from.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn fan_in(&self, f: &str) -> usize {
        self.in_all.get(f).map(Vec::len).unwrap_or(0)
    }

    pub fn fan_out(&self, f: &str) -> usize {
        self.out_all.get(f).map(Vec::len).unwrap_or(0)
    }

    /// A file is orphaned iff it has zero fan-in and is not a declared
    /// entry point.
    pub fn is_orphaned(&self, f: &str) -> bool {
        self.nodes.contains(f) && self.fan_in(f) == 0 && !self.entry_points.contains(f)
    }

    pub fn orphans(&self) -> Vec<&str> {
        self.nodes().filter(|f| self.is_orphaned(f)).collect()
    }

    /// Strongly connected components over the non-deferred edge set,
    /// computed with an iterative (stack-based) Tarjan's algorithm so
    /// that repositories with very deep import chains do not overflow
    /// the call stack (design note: "recursive graph algorithms").
    /// Components of size 1 with no self-loop are omitted, since they
    /// are not cycles.
    pub fn sccs(&self) -> Vec<Vec<String>> {
        let mut index_counter = 0usize;
        let mut indices: HashMap<&str, usize> = HashMap::new();
        let mut lowlink: HashMap<&str, usize> = HashMap::new();
        let mut on_stack: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = Vec::new();
        let mut result: Vec<Vec<String>> = Vec::new();

        // Explicit work-stack frame: the node being visited and an index
        // into its neighbor list for resumable iteration.
        enum Frame<'a> {
            Enter(&'a str),
            Resume(&'a str, usize),
        }

        let mut sorted_nodes: Vec<&str> = self.nodes().collect();
        sorted_nodes.sort_unstable();

        for start in sorted_nodes {
            if indices.contains_key(start) {
                continue;
            }
            let mut work: Vec<Frame> = vec![Frame::Enter(start)];

            while let Some(frame) = work.pop() {
                match frame {
                    Frame::Enter(v) => {
                        let idx = index_counter;
                        index_counter += 1;
                        indices.insert(v, idx);
                        lowlink.insert(v, idx);
                        stack.push(v);
                        on_stack.insert(v);
                        work.push(Frame::Resume(v, 0));
                    }
                    Frame::Resume(v, next_i) => {
                        let neighbors = self.out_strict.get(v).cloned().unwrap_or_default();
                        let mut i = next_i;
                        let mut descended = false;
                        while i < neighbors.len() {
                            let w: &str = self.nodes.get(neighbors[i].as_str()).map(String::as_str).unwrap_or("");
                            if w.is_empty() {
                                i += 1;
                                continue;
                            }
                            if !indices.contains_key(w) {
                                work.push(Frame::Resume(v, i + 1));
                                work.push(Frame::Enter(w));
                                descended = true;
                                break;
                            } else if on_stack.contains(w) {
                                let w_idx = indices[w];
                                let v_low = lowlink[v];
                                lowlink.insert(v, v_low.min(w_idx));
                            }
                            i += 1;
                        }
                        if descended {
                            continue;
                        }
                        // All neighbors processed; propagate lowlink to
                        // the parent frame once we pop back to it, and
                        // emit a component if v is a root.
                        if lowlink[v] == indices[v] {
                            let mut component = Vec::new();
                            loop {
                                let w = stack.pop().expect("stack non-empty while unwinding SCC");
                                on_stack.remove(w);
                                component.push(w.to_string());
                                if w == v {
                                    break;
                                }
                            }
                            if component.len() >= 2
                                || component.iter().any(|m| {
                                    self.out_strict
                                        .get(m.as_str())
                                        .map(|succs| succs.iter().any(|s| s == m))
                                        .unwrap_or(false)
                                })
                            {
                                result.push(component);
                            }
                        }
                        // Propagate this node's (possibly updated) lowlink
                        // up to whichever frame called it, by checking the
                        // new top of `work` for a matching Resume(parent,_).
                        if let Some(Frame::Resume(parent, _)) = work.last() {
                            let v_low = lowlink[v];
                            let p_low = lowlink[parent];
                            lowlink.insert(*parent, p_low.min(v_low));
                        }
                    }
                }
            }
        }
        result.sort();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(edges: &[(&str, &str)]) -> ImportGraph {
        let mut g = ImportGraph::new();
        for (a, b) in edges {
            g.add_edge(a, b, false);
        }
        g
    }

    #[test]
    fn acyclic_graph_has_no_sccs() {
        let g = build(&[("a", "b"), ("b", "c")]);
        assert!(g.sccs().is_empty());
    }

    #[test]
    fn simple_cycle_is_one_scc() {
        let g = build(&[("a", "b"), ("b", "a")]);
        let sccs = g.sccs();
        assert_eq!(sccs.len(), 1);
        let mut members = sccs[0].clone();
        members.sort();
        assert_eq!(members, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn self_loop_is_its_own_scc() {
        let g = build(&[("a", "a")]);
        assert_eq!(g.sccs().len(), 1);
    }

    #[test]
    fn deferred_edges_excluded_from_cycles() {
        let mut g = ImportGraph::new();
        g.add_edge("a", "b", false);
        g.add_edge("b", "a", true);
        assert!(g.sccs().is_empty());
        // but still counted for fan-in/out
        assert_eq!(g.fan_out("b"), 1);
        assert_eq!(g.fan_in("a"), 1);
    }

    #[test]
    fn orphan_requires_zero_fan_in_and_not_entry() {
        let mut g = ImportGraph::new();
        g.add_edge("main", "lib", false);
        g.mark_entry_point("main");
        g.add_node("unused");
        assert!(!g.is_orphaned("main"));
        assert!(!g.is_orphaned("lib"));
        assert!(g.is_orphaned("unused"));
    }

    #[test]
    fn handles_long_chain_without_stack_overflow() {
        let mut g = ImportGraph::new();
        let n = 20_000;
        for i in 0..n {
            g.add_edge(&format!("f{i}"), &format!("f{}", i + 1), false);
        }
        // Long acyclic chain: no SCCs, and it must simply not crash.
        assert!(g.sccs().is_empty());
    }

    #[test]
    fn three_node_cycle_identity_survives_partial_refactor() {
        let full = build(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let sccs = full.sccs();
        assert_eq!(sccs.len(), 1);
        assert_eq!(sccs[0].len(), 3);
    }
}
