//! Weighted scratch graph shared by the partition backends.

use std::collections::{HashMap, HashSet, VecDeque};

/// Undirected weighted graph in adjacency-list form.
///
/// Built once per run from the flattened edge list and shared by all
/// backends. Parallel edges are allowed; they simply contribute weight twice.
pub(crate) struct WeightedGraph {
    pub(crate) n: usize,
    /// Adjacency: node -> [(neighbor, weight)]
    pub(crate) adj: Vec<Vec<(usize, f64)>>,
    /// Weighted degree of each node.
    pub(crate) degrees: Vec<f64>,
    /// Total edge weight (2m in the modularity formula).
    pub(crate) total_weight: f64,
}

impl WeightedGraph {
    pub(crate) fn from_edges(n: usize, edges: &[(usize, usize, f64)]) -> Self {
        let mut adj = vec![Vec::new(); n];
        let mut degrees = vec![0.0; n];
        let mut total_weight = 0.0;

        for &(i, j, w) in edges {
            adj[i].push((j, w));
            adj[j].push((i, w));
            degrees[i] += w;
            degrees[j] += w;
            total_weight += 2.0 * w; // each edge counted twice
        }

        Self {
            n,
            adj,
            degrees,
            total_weight,
        }
    }

    /// Sum of edge weights from `node` into community `target`.
    pub(crate) fn weight_to_community(
        &self,
        node: usize,
        target: usize,
        communities: &[usize],
    ) -> f64 {
        self.adj[node]
            .iter()
            .filter(|(neighbor, _)| communities[*neighbor] == target)
            .map(|(_, w)| w)
            .sum()
    }
}

/// Connected components within a subset of nodes, edges restricted to the
/// subset.
pub(crate) fn components_in_subset(
    graph: &WeightedGraph,
    node_set: &HashSet<usize>,
) -> Vec<Vec<usize>> {
    let mut visited = HashSet::new();
    let mut components = Vec::new();

    for &start in node_set {
        if visited.contains(&start) {
            continue;
        }

        let mut component = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            component.push(node);

            for &(neighbor, _) in &graph.adj[node] {
                if node_set.contains(&neighbor) && !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        if !component.is_empty() {
            components.push(component);
        }
    }

    components
}

/// Densify arbitrary community ids to consecutive integers starting at 0.
///
/// Ids are assigned in ascending order of the original id, so the output is
/// independent of traversal order.
pub(crate) fn renumber(assignment: &[usize]) -> Vec<usize> {
    let mut unique: Vec<usize> = assignment.to_vec();
    unique.sort_unstable();
    unique.dedup();

    let mapping: HashMap<usize, usize> = unique
        .into_iter()
        .enumerate()
        .map(|(new, old)| (old, new))
        .collect();

    assignment
        .iter()
        .map(|&c| mapping.get(&c).copied().unwrap_or(0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrees_and_total_weight() {
        let g = WeightedGraph::from_edges(3, &[(0, 1, 1.0), (1, 2, 2.0)]);
        assert_eq!(g.degrees, vec![1.0, 3.0, 2.0]);
        assert_eq!(g.total_weight, 6.0);
    }

    #[test]
    fn renumber_is_dense_and_order_stable() {
        assert_eq!(renumber(&[5, 2, 5, 9]), vec![1, 0, 1, 2]);
    }

    #[test]
    fn components_respect_the_subset() {
        // 0-1-2 path; restricting to {0, 2} disconnects them.
        let g = WeightedGraph::from_edges(3, &[(0, 1, 1.0), (1, 2, 1.0)]);
        let subset: HashSet<usize> = [0, 2].into_iter().collect();
        let mut comps = components_in_subset(&g, &subset);
        comps.sort();
        assert_eq!(comps, vec![vec![0], vec![2]]);
    }
}
