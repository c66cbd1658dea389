//! Legacy greedy-modularity backend (the "taynaud" flavor).
//!
//! A single-level greedy best-partition pass over the plain undirected
//! graph, with the node→community mapping densified to sequential ids.
//! Kept for compatibility with old pipelines; prefer the seeded optimizer
//! or the multilevel flavor.

use super::graph::{renumber, WeightedGraph};
use super::traits::Partitioner;
use crate::error::{Error, Result};

/// Single-level greedy modularity partitioning.
#[derive(Debug, Clone)]
pub(crate) struct GreedyModularity {
    /// Maximum sweeps over all nodes.
    max_iter: usize,
}

impl GreedyModularity {
    pub(crate) fn new() -> Self {
        Self { max_iter: 100 }
    }
}

impl Partitioner for GreedyModularity {
    fn partition(&self, n: usize, edges: &[(usize, usize, f64)]) -> Result<Vec<usize>> {
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        if edges.is_empty() {
            return Ok((0..n).collect());
        }

        let graph = WeightedGraph::from_edges(n, edges);
        let m = graph.total_weight / 2.0;

        let mut communities: Vec<usize> = (0..n).collect();
        let mut community_degrees = graph.degrees.clone();

        for _sweep in 0..self.max_iter {
            let mut moved = false;

            for node in 0..n {
                let current = communities[node];
                let ki = graph.degrees[node];

                community_degrees[current] -= ki;

                let mut candidates: Vec<usize> = graph.adj[node]
                    .iter()
                    .map(|&(neighbor, _)| communities[neighbor])
                    .collect();
                candidates.sort_unstable();
                candidates.dedup();

                let mut best = current;
                let mut best_gain =
                    modularity_gain(&graph, &communities, &community_degrees, node, current, m);

                for &target in &candidates {
                    if target == current {
                        continue;
                    }
                    let gain =
                        modularity_gain(&graph, &communities, &community_degrees, node, target, m);
                    if gain > best_gain + 1e-10 {
                        best_gain = gain;
                        best = target;
                    }
                }

                community_degrees[current] += ki;

                if best != current {
                    communities[node] = best;
                    community_degrees[current] -= ki;
                    community_degrees[best] += ki;
                    moved = true;
                }
            }

            if !moved {
                break;
            }
        }

        Ok(renumber(&communities))
    }
}

fn modularity_gain(
    graph: &WeightedGraph,
    communities: &[usize],
    community_degrees: &[f64],
    node: usize,
    target: usize,
    m: f64,
) -> f64 {
    let ki_in = graph.weight_to_community(node, target, communities);
    let sigma_tot = community_degrees[target];
    ki_in / m - sigma_tot * graph.degrees[node] / (2.0 * m * m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_densified() {
        let edges = vec![
            (0, 1, 1.0),
            (1, 2, 1.0),
            (0, 2, 1.0),
            (3, 4, 1.0),
            (4, 5, 1.0),
            (3, 5, 1.0),
        ];
        let membership = GreedyModularity::new().partition(6, &edges).unwrap();
        let max = *membership.iter().max().unwrap();
        assert_eq!(max, 1);
        assert_eq!(membership[0], membership[1]);
        assert_ne!(membership[0], membership[3]);
    }

    #[test]
    fn empty_graph_is_an_error() {
        assert_eq!(
            GreedyModularity::new().partition(0, &[]),
            Err(Error::EmptyInput)
        );
    }
}
