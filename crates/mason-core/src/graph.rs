//! Target dependency graph: cycle detection, topological ordering, export.

use std::collections::HashMap;

use log::debug;
use serde::Serialize;

use crate::config::{BuildConfig, TargetType};
use mason_syntax::error::{Error, Result};

struct Node {
    name: String,
    kind: TargetType,
}

/// Directed graph over the targets of a [`BuildConfig`]: an edge `A -> B`
/// exists for each `B` in `A.dependencies` that names another target.
/// Dependency names that are not targets (system libraries) do not appear.
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    /// adjacency in declaration order, deduplicated
    edges: Vec<Vec<usize>>,
}

impl Graph {
    pub fn from_config(config: &BuildConfig) -> Self {
        let mut nodes = Vec::with_capacity(config.targets.len());
        let mut index = HashMap::new();
        for (i, target) in config.targets.iter().enumerate() {
            index.insert(target.name.clone(), i);
            nodes.push(Node {
                name: target.name.clone(),
                kind: target.kind,
            });
        }
        let mut edges = vec![Vec::new(); nodes.len()];
        for (i, target) in config.targets.iter().enumerate() {
            for dep in &target.dependencies {
                if let Some(&j) = index.get(dep.as_str()) {
                    if !edges[i].contains(&j) {
                        edges[i].push(j);
                    }
                }
            }
        }
        debug!(
            "target graph: {} nodes, {} edges",
            nodes.len(),
            edges.iter().map(Vec::len).sum::<usize>()
        );
        Graph {
            nodes,
            index,
            edges,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// True when the dependency edges contain a cycle.
    pub fn has_cycle(&self) -> bool {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        fn visit(n: usize, colors: &mut [Color], edges: &[Vec<usize>]) -> bool {
            colors[n] = Color::Gray;
            for &m in &edges[n] {
                match colors[m] {
                    Color::Gray => return true,
                    Color::White => {
                        if visit(m, colors, edges) {
                            return true;
                        }
                    }
                    Color::Black => {}
                }
            }
            colors[n] = Color::Black;
            false
        }

        let mut colors = vec![Color::White; self.nodes.len()];
        for n in 0..self.nodes.len() {
            if colors[n] == Color::White && visit(n, &mut colors, &self.edges) {
                return true;
            }
        }
        false
    }

    /// Names in build order: every target appears after all of its
    /// dependencies. Ties are broken by target declaration order. On cyclic
    /// input the targets caught in cycles are left out; use
    /// [`Graph::validate`] first to reject those graphs.
    pub fn topological_sort(&self) -> Vec<String> {
        self.kahn().0
    }

    /// Rejects cyclic graphs with [`Error::Cycle`] naming the targets that
    /// could not be ordered.
    pub fn validate(&self) -> Result<()> {
        let (_, unordered) = self.kahn();
        if unordered.is_empty() {
            Ok(())
        } else {
            Err(Error::Cycle { names: unordered })
        }
    }

    // Kahn's algorithm over reversed edges, peeling lowest declaration
    // index first. Returns (ordered names, names left unordered).
    fn kahn(&self) -> (Vec<String>, Vec<String>) {
        let n = self.nodes.len();
        let mut in_degree: Vec<usize> = self.edges.iter().map(Vec::len).collect();
        let mut dependents = vec![Vec::new(); n];
        for (from, tos) in self.edges.iter().enumerate() {
            for &to in tos {
                dependents[to].push(from);
            }
        }

        use std::cmp::Reverse;
        use std::collections::BinaryHeap;
        let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
            .filter(|&i| in_degree[i] == 0)
            .map(Reverse)
            .collect();

        let mut order = Vec::with_capacity(n);
        let mut placed = vec![false; n];
        while let Some(Reverse(i)) = ready.pop() {
            placed[i] = true;
            order.push(self.nodes[i].name.clone());
            for &j in &dependents[i] {
                in_degree[j] -= 1;
                if in_degree[j] == 0 {
                    ready.push(Reverse(j));
                }
            }
        }
        let unordered = (0..n)
            .filter(|&i| !placed[i])
            .map(|i| self.nodes[i].name.clone())
            .collect();
        (order, unordered)
    }

    /// Render the graph as GraphViz DOT, one node per target with a fill
    /// color by kind and one edge per dependency.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph mason {\n");
        out.push_str("  rankdir=LR;\n");
        out.push_str("  node [shape=box, style=filled];\n\n");
        for node in &self.nodes {
            let color = match node.kind {
                TargetType::Executable => "#90EE90",
                TargetType::StaticLibrary => "#87CEEB",
                TargetType::SharedLibrary => "#FFE4B5",
                _ => "#D3D3D3",
            };
            out.push_str(&format!("  \"{}\" [fillcolor=\"{}\"];\n", node.name, color));
        }
        out.push('\n');
        for (from, tos) in self.edges.iter().enumerate() {
            for &to in tos {
                out.push_str(&format!(
                    "  \"{}\" -> \"{}\";\n",
                    self.nodes[from].name, self.nodes[to].name
                ));
            }
        }
        out.push_str("}\n");
        out
    }

    /// Render the graph as JSON: `{"nodes": [{"name", "type"}], "edges":
    /// [{"from", "to"}]}`.
    pub fn to_json(&self) -> String {
        #[derive(Serialize)]
        struct JsonNode<'a> {
            name: &'a str,
            #[serde(rename = "type")]
            kind: &'a str,
        }
        #[derive(Serialize)]
        struct JsonEdge<'a> {
            from: &'a str,
            to: &'a str,
        }
        #[derive(Serialize)]
        struct JsonGraph<'a> {
            nodes: Vec<JsonNode<'a>>,
            edges: Vec<JsonEdge<'a>>,
        }

        let doc = JsonGraph {
            nodes: self
                .nodes
                .iter()
                .map(|n| JsonNode {
                    name: &n.name,
                    kind: n.kind.label(),
                })
                .collect(),
            edges: self
                .edges
                .iter()
                .enumerate()
                .flat_map(|(from, tos)| {
                    tos.iter().map(move |&to| JsonEdge {
                        from: &self.nodes[from].name,
                        to: &self.nodes[to].name,
                    })
                })
                .collect(),
        };
        serde_json::to_string_pretty(&doc).unwrap_or_default()
    }
}
