//! Clustering of predicted duplicates
//!
//! Records are nodes, predicted-duplicate pairs are edges, and clusters are
//! the connected components. Linkage is chained: if A~B and B~C are
//! duplicates then A, B and C share a cluster even when A~C scored below the
//! threshold.
//!
//! Nodes are indexed by sorted identifier and components are found with a
//! disjoint-set forest, so cluster ids depend only on the identifiers and
//! edges, never on the order pairs were scored in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scoring::ScoredPair;

/// Disjoint-set forest with path halving and union by size
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    /// Representative of `x`'s set
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets of `a` and `b`; false if already merged
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        true
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}

/// Weighted edge between two node indices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub a: usize,
    pub b: usize,
    /// Pair score; kept on the graph but unused for component discovery
    pub weight: f64,
}

/// Undirected graph over every identifier in a batch
#[derive(Debug, Clone, Default)]
pub struct DuplicateGraph {
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
}

impl DuplicateGraph {
    /// Graph with one node per identifier, indexed in sorted order
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut nodes: Vec<String> = identifiers.into_iter().map(Into::into).collect();
        nodes.sort();
        nodes.dedup();
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        Self {
            nodes,
            index,
            edges: Vec::new(),
        }
    }

    /// Add an edge; identifiers not yet in the graph become new nodes
    pub fn add_edge(&mut self, id1: &str, id2: &str, weight: f64) {
        let a = self.node(id1);
        let b = self.node(id2);
        self.edges.push(Edge { a, b, weight });
    }

    fn node(&mut self, id: &str) -> usize {
        if let Some(&i) = self.index.get(id) {
            return i;
        }
        let i = self.nodes.len();
        self.nodes.push(id.to_string());
        self.index.insert(id.to_string(), i);
        i
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Connected components with deterministic cluster ids
    ///
    /// Identifiers are visited in sorted order; each not-yet-seen component
    /// takes the next id starting at 1. The result is sorted by size
    /// descending, then cluster id ascending.
    pub fn components(&self) -> Vec<Cluster> {
        let mut forest = UnionFind::new(self.nodes.len());
        for edge in &self.edges {
            forest.union(edge.a, edge.b);
        }

        // Visiting order: sorted identifiers, including any added by edges
        let mut order: Vec<usize> = (0..self.nodes.len()).collect();
        order.sort_by(|&x, &y| self.nodes[x].cmp(&self.nodes[y]));

        let mut cluster_of_root: HashMap<usize, usize> = HashMap::new();
        let mut clusters: Vec<Cluster> = Vec::new();
        for i in order {
            let root = forest.find(i);
            let slot = *cluster_of_root.entry(root).or_insert_with(|| {
                clusters.push(Cluster {
                    cluster_id: clusters.len() + 1,
                    members: Vec::new(),
                });
                clusters.len() - 1
            });
            clusters[slot].members.push(self.nodes[i].clone());
        }

        clusters.sort_by(|a, b| {
            b.size()
                .cmp(&a.size())
                .then_with(|| a.cluster_id.cmp(&b.cluster_id))
        });
        clusters
    }
}

/// One connected component of the duplicate graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Stable id, 1-based
    pub cluster_id: usize,
    /// Member identifiers, ascending
    pub members: Vec<String>,
}

impl Cluster {
    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.binary_search_by(|m| m.as_str().cmp(id)).is_ok()
    }

    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }
}

/// One clusters-table row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub unique_id: String,
    pub cluster_id: usize,
    pub cluster_size: usize,
}

/// Cluster every identifier using the duplicate pairs as edges
///
/// Pairs with `is_duplicate == false` are ignored, so the full scored list can
/// be passed in.
pub fn build_clusters<I, S>(identifiers: I, pairs: &[ScoredPair]) -> Vec<Cluster>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut graph = DuplicateGraph::new(identifiers);
    for pair in pairs.iter().filter(|p| p.is_duplicate) {
        graph.add_edge(&pair.id1, &pair.id2, pair.score);
    }

    let clusters = graph.components();
    debug!(
        "Clustered {} identifiers over {} edges into {} clusters",
        graph.node_count(),
        graph.edges().len(),
        clusters.len()
    );
    clusters
}

/// Flatten clusters into table rows, keeping cluster order
pub fn cluster_assignments(clusters: &[Cluster]) -> Vec<ClusterAssignment> {
    clusters
        .iter()
        .flat_map(|cluster| {
            cluster.members.iter().map(move |id| ClusterAssignment {
                unique_id: id.clone(),
                cluster_id: cluster.cluster_id,
                cluster_size: cluster.size(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::FeatureVector;

    fn dup(id1: &str, id2: &str) -> ScoredPair {
        ScoredPair {
            id1: id1.to_string(),
            id2: id2.to_string(),
            score: 0.9,
            features: FeatureVector::default(),
            is_duplicate: true,
        }
    }

    #[test]
    fn test_union_find() {
        let mut uf = UnionFind::new(4);
        assert!(uf.union(0, 1));
        assert!(uf.union(2, 3));
        assert!(!uf.union(1, 0));
        assert_eq!(uf.find(0), uf.find(1));
        assert_ne!(uf.find(1), uf.find(2));
        assert!(uf.union(1, 3));
        assert_eq!(uf.find(0), uf.find(2));
        assert_eq!(uf.len(), 4);
    }

    #[test]
    fn test_chained_linkage() {
        let clusters = build_clusters(["a", "b", "c"], &[dup("a", "b"), dup("b", "c")]);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].size(), 3);
        assert_eq!(clusters[0].members, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_singletons_are_kept() {
        let clusters = build_clusters(["x", "a", "b"], &[dup("a", "b")]);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members, vec!["a", "b"]);
        assert_eq!(clusters[0].cluster_id, 1);
        assert!(clusters[1].is_singleton());
        assert_eq!(clusters[1].members, vec!["x"]);
        assert_eq!(clusters[1].cluster_id, 2);
    }

    #[test]
    fn test_non_duplicates_ignored() {
        let mut not_dup = dup("a", "b");
        not_dup.is_duplicate = false;
        let clusters = build_clusters(["a", "b"], &[not_dup]);
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(Cluster::is_singleton));
    }

    #[test]
    fn test_cluster_ids_follow_sorted_identifiers() {
        // "d" sorts last, so its big cluster still gets a later id
        let ids = ["d", "c", "b", "a"];
        let clusters = build_clusters(ids, &[dup("c", "d")]);
        let by_id: Vec<(usize, Vec<String>)> = clusters
            .iter()
            .map(|c| (c.cluster_id, c.members.clone()))
            .collect();
        assert_eq!(
            by_id,
            vec![
                (3, vec!["c".to_string(), "d".to_string()]),
                (1, vec!["a".to_string()]),
                (2, vec!["b".to_string()]),
            ]
        );
    }

    #[test]
    fn test_assignments_order() {
        let clusters = build_clusters(["a", "b", "c"], &[dup("b", "c")]);
        let rows = cluster_assignments(&clusters);
        assert_eq!(
            rows,
            vec![
                ClusterAssignment {
                    unique_id: "b".to_string(),
                    cluster_id: 2,
                    cluster_size: 2
                },
                ClusterAssignment {
                    unique_id: "c".to_string(),
                    cluster_id: 2,
                    cluster_size: 2
                },
                ClusterAssignment {
                    unique_id: "a".to_string(),
                    cluster_id: 1,
                    cluster_size: 1
                },
            ]
        );
    }

    #[test]
    fn test_edge_weights_retained() {
        let mut graph = DuplicateGraph::new(["a", "b"]);
        graph.add_edge("a", "b", 0.93);
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.edges()[0].weight, 0.93);
    }

    #[test]
    fn test_cluster_contains() {
        let clusters = build_clusters(["a", "b", "c"], &[dup("a", "c")]);
        assert!(clusters[0].contains("a"));
        assert!(clusters[0].contains("c"));
        assert!(!clusters[0].contains("b"));
    }
}
