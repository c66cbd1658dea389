//! Multilevel modularity backend (the "igraph" flavor).
//!
//! Fast modularity optimization through local node moves and graph
//! aggregation (Blondel et al. 2008):
//!
//! 1. **Local moving**: start with singletons, repeatedly move nodes to the
//!    neighboring community with the highest modularity gain.
//! 2. **Aggregation**: contract communities into meta-nodes; edges between
//!    communities sum, internal edges become self-loops.
//! 3. Repeat on the meta-graph until modularity stops improving.
//!
//! This flavor always runs on the undirected view and has **no resolution
//! parameter**; the procedure is fixed at standard modularity (gamma = 1).
//! Node visits are index-ordered and candidate scans are sorted, so the
//! backend is deterministic without any seed.
//!
//! ## References
//!
//! Blondel et al. (2008). "Fast unfolding of communities in large networks."
//! Journal of Statistical Mechanics: Theory and Experiment, P10008.

use super::graph::renumber;
use super::traits::Partitioner;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Multilevel modularity community detection.
#[derive(Debug, Clone)]
pub(crate) struct Multilevel {
    /// Maximum iterations per level.
    max_iter: usize,
    /// Maximum levels of aggregation.
    max_levels: usize,
    /// Minimum modularity improvement to continue.
    min_modularity_gain: f64,
}

impl Multilevel {
    pub(crate) fn new() -> Self {
        Self {
            max_iter: 100,
            max_levels: 10,
            min_modularity_gain: 1e-7,
        }
    }

    /// Modularity of a weighted partition at gamma = 1.
    fn modularity(
        &self,
        n: usize,
        edges: &[(usize, usize, f64)],
        self_loops: &[f64],
        communities: &[usize],
    ) -> f64 {
        let m: f64 = edges.iter().map(|(_, _, w)| w).sum::<f64>() + self_loops.iter().sum::<f64>();
        if m == 0.0 {
            return 0.0;
        }

        let mut degrees = vec![0.0; n];
        for &(i, j, w) in edges {
            degrees[i] += w;
            degrees[j] += w;
        }
        for (i, &sl) in self_loops.iter().enumerate() {
            degrees[i] += 2.0 * sl; // self-loops counted twice for degree
        }

        let mut q = 0.0;
        for &(i, j, w) in edges {
            if communities[i] == communities[j] {
                q += w - degrees[i] * degrees[j] / (2.0 * m);
            }
        }
        for (i, &sl) in self_loops.iter().enumerate() {
            if sl > 0.0 {
                q += sl - degrees[i] * degrees[i] / (4.0 * m);
            }
        }

        q / m
    }

    /// Phase 1: local moving. Returns (communities, improved).
    fn local_moving(
        &self,
        n: usize,
        edges: &[(usize, usize, f64)],
        self_loops: &[f64],
    ) -> (Vec<usize>, bool) {
        let mut adj: Vec<HashMap<usize, f64>> = vec![HashMap::new(); n];
        for &(i, j, w) in edges {
            *adj[i].entry(j).or_insert(0.0) += w;
            *adj[j].entry(i).or_insert(0.0) += w;
        }

        let m: f64 = edges.iter().map(|(_, _, w)| w).sum::<f64>() + self_loops.iter().sum::<f64>();
        if m == 0.0 {
            return ((0..n).collect(), false);
        }

        let mut degrees = vec![0.0; n];
        for &(i, j, w) in edges {
            degrees[i] += w;
            degrees[j] += w;
        }
        for (i, &sl) in self_loops.iter().enumerate() {
            degrees[i] += 2.0 * sl;
        }

        let mut communities: Vec<usize> = (0..n).collect();
        let mut community_degrees = degrees.clone();
        let mut any_improved = false;

        for _iter in 0..self.max_iter {
            let mut improved = false;

            for node in 0..n {
                let current = communities[node];
                let ki = degrees[node];

                community_degrees[current] -= ki;

                let mut community_weights: HashMap<usize, f64> = HashMap::new();
                for (&neighbor, &w) in &adj[node] {
                    *community_weights.entry(communities[neighbor]).or_insert(0.0) += w;
                }
                // Sorted scan keeps tie-breaking independent of hash order.
                let mut candidates: Vec<(usize, f64)> = community_weights.into_iter().collect();
                candidates.sort_unstable_by(|a, b| a.0.cmp(&b.0));

                let mut best_community = current;
                let mut best_gain = 0.0;

                for (target, ki_in) in candidates {
                    let sigma_tot = community_degrees[target];
                    let gain = ki_in / m - sigma_tot * ki / (2.0 * m * m);
                    if gain > best_gain {
                        best_gain = gain;
                        best_community = target;
                    }
                }

                if best_community != current {
                    communities[node] = best_community;
                    community_degrees[best_community] += ki;
                    improved = true;
                    any_improved = true;
                } else {
                    community_degrees[current] += ki;
                }
            }

            if !improved {
                break;
            }
        }

        (communities, any_improved)
    }

    /// Phase 2: aggregate communities into meta-nodes.
    /// Returns (new_edges, new_self_loops, meta-node -> original nodes).
    #[allow(clippy::type_complexity)]
    fn aggregate(
        &self,
        edges: &[(usize, usize, f64)],
        self_loops: &[f64],
        communities: &[usize],
    ) -> (Vec<(usize, usize, f64)>, Vec<f64>, Vec<Vec<usize>>) {
        let mut unique: Vec<usize> = communities.to_vec();
        unique.sort_unstable();
        unique.dedup();
        let n_new = unique.len();

        let comm_to_new: HashMap<usize, usize> =
            unique.iter().enumerate().map(|(i, &c)| (c, i)).collect();

        let mut new_to_old: Vec<Vec<usize>> = vec![Vec::new(); n_new];
        for (node, &comm) in communities.iter().enumerate() {
            new_to_old[comm_to_new[&comm]].push(node);
        }

        let mut new_edge_weights: HashMap<(usize, usize), f64> = HashMap::new();
        let mut new_self_loops = vec![0.0; n_new];

        for &(i, j, w) in edges {
            let ci = comm_to_new[&communities[i]];
            let cj = comm_to_new[&communities[j]];
            if ci == cj {
                new_self_loops[ci] += w;
            } else {
                let key = if ci < cj { (ci, cj) } else { (cj, ci) };
                *new_edge_weights.entry(key).or_insert(0.0) += w;
            }
        }
        for (i, &sl) in self_loops.iter().enumerate() {
            new_self_loops[comm_to_new[&communities[i]]] += sl;
        }

        let mut new_edges: Vec<(usize, usize, f64)> = new_edge_weights
            .into_iter()
            .map(|((i, j), w)| (i, j, w))
            .collect();
        new_edges.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        (new_edges, new_self_loops, new_to_old)
    }

    /// Expand a partition of the aggregated level back to original nodes.
    fn expand(partition: &[usize], node_mapping: &[Vec<usize>]) -> Vec<usize> {
        let max_node = node_mapping.iter().flatten().copied().max().unwrap_or(0);
        let mut result = vec![0; max_node + 1];

        for (meta, originals) in node_mapping.iter().enumerate() {
            for &orig in originals {
                result[orig] = partition[meta];
            }
        }
        result
    }
}

impl Partitioner for Multilevel {
    fn partition(&self, n: usize, edges: &[(usize, usize, f64)]) -> Result<Vec<usize>> {
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        if edges.is_empty() {
            return Ok((0..n).collect());
        }

        let mut current_n = n;
        let mut current_edges = edges.to_vec();
        let mut current_self_loops = vec![0.0; n];

        let mut mapping_stack: Vec<Vec<Vec<usize>>> = Vec::new();
        let mut prev_modularity = f64::NEG_INFINITY;

        for _level in 0..self.max_levels {
            let (partition, improved) =
                self.local_moving(current_n, &current_edges, &current_self_loops);

            if !improved {
                break;
            }

            let mod_now =
                self.modularity(current_n, &current_edges, &current_self_loops, &partition);
            if mod_now - prev_modularity < self.min_modularity_gain {
                break;
            }
            prev_modularity = mod_now;

            let (new_edges, new_self_loops, node_mapping) =
                self.aggregate(&current_edges, &current_self_loops, &partition);

            // No contraction happened; a further level would repeat itself.
            if node_mapping.len() == current_n {
                break;
            }

            current_n = node_mapping.len();
            current_edges = new_edges;
            current_self_loops = new_self_loops;
            mapping_stack.push(node_mapping);
        }

        let mut result: Vec<usize> = (0..current_n).collect();
        while let Some(mapping) = mapping_stack.pop() {
            result = Self::expand(&result, &mapping);
        }

        if result.len() < n {
            result.resize(n, 0);
        }
        result.truncate(n);

        Ok(renumber(&result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn triangle_is_one_community() {
        let ml = Multilevel::new();
        let membership = ml
            .partition(3, &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)])
            .unwrap();
        assert_eq!(membership[0], membership[1]);
        assert_eq!(membership[1], membership[2]);
    }

    #[test]
    fn bridged_cliques_split_in_two() {
        let edges = vec![
            (0, 1, 1.0),
            (1, 2, 1.0),
            (0, 2, 1.0),
            (3, 4, 1.0),
            (4, 5, 1.0),
            (3, 5, 1.0),
            (2, 3, 1.0),
        ];
        let ml = Multilevel::new();
        let membership = ml.partition(6, &edges).unwrap();
        assert_eq!(membership[0], membership[1]);
        assert_eq!(membership[1], membership[2]);
        assert_eq!(membership[3], membership[4]);
        assert_eq!(membership[4], membership[5]);
        assert_ne!(membership[0], membership[3]);
    }

    #[test]
    fn repeated_runs_agree_without_a_seed() {
        let edges = vec![(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (3, 0, 1.0)];
        let ml = Multilevel::new();
        let first = ml.partition(4, &edges).unwrap();
        for _ in 0..5 {
            assert_eq!(ml.partition(4, &edges).unwrap(), first);
        }
    }

    #[test]
    fn isolated_nodes_stay_apart() {
        let ml = Multilevel::new();
        let membership = ml.partition(2, &[]).unwrap();
        let distinct: HashSet<usize> = membership.iter().copied().collect();
        assert_eq!(distinct.len(), 2);
    }

    #[test]
    fn empty_graph_is_an_error() {
        let ml = Multilevel::new();
        assert_eq!(ml.partition(0, &[]), Err(Error::EmptyInput));
    }
}
