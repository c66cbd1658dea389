//! Sparse adjacency handling.
//!
//! The similarity graph arrives as an N×N sparse matrix whose row/column
//! order is aligned to the sample order of the container. This module
//! validates that shape, slices the matrix to an induced subgraph when a
//! sample restriction is active, and builds the directed-or-undirected
//! petgraph view the partition backends consume.

use crate::error::{Error, Result};
use nalgebra_sparse::{CooMatrix, CsrMatrix, SparseEntry};
use petgraph::graph::{DiGraph, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Check that the adjacency is square and covers `n_obs` samples.
pub(crate) fn validate(adjacency: &CsrMatrix<f64>, n_obs: usize) -> Result<()> {
    if adjacency.nrows() != adjacency.ncols() {
        return Err(Error::ShapeMismatch {
            expected: "square adjacency".into(),
            actual: format!("{}x{}", adjacency.nrows(), adjacency.ncols()),
        });
    }
    if adjacency.nrows() != n_obs {
        return Err(Error::ShapeMismatch {
            expected: format!("{n_obs}x{n_obs} (one row per sample)"),
            actual: format!("{}x{}", adjacency.nrows(), adjacency.ncols()),
        });
    }
    Ok(())
}

/// Induced subgraph on `keep`, a sorted list of sample positions.
///
/// Rows and columns are sliced identically; entries with either endpoint
/// outside `keep` are dropped.
pub(crate) fn restrict(adjacency: &CsrMatrix<f64>, keep: &[usize]) -> Result<CsrMatrix<f64>> {
    let mut new_index = vec![usize::MAX; adjacency.nrows()];
    for (new, &old) in keep.iter().enumerate() {
        new_index[old] = new;
    }

    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut vals = Vec::new();
    for (i, j, &w) in adjacency.triplet_iter() {
        let (ni, nj) = (new_index[i], new_index[j]);
        if ni != usize::MAX && nj != usize::MAX {
            rows.push(ni);
            cols.push(nj);
            vals.push(w);
        }
    }

    let coo = CooMatrix::try_from_triplets(keep.len(), keep.len(), rows, cols, vals)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(CsrMatrix::from(&coo))
}

/// A petgraph view over the adjacency, node order aligned with row order.
///
/// Undirected views take one edge per unordered pair (upper triangle of a
/// symmetric matrix; a lone lower-triangle entry is kept so asymmetric input
/// never silently drops samples' edges). Directed views take every stored
/// entry as an arc. Self-loops and explicit zeros are skipped either way.
pub(crate) enum GraphView {
    Directed(DiGraph<(), f64>),
    Undirected(UnGraph<(), f64>),
}

impl GraphView {
    pub(crate) fn from_adjacency(adjacency: &CsrMatrix<f64>, directed: bool) -> Self {
        let n = adjacency.nrows();
        if directed {
            let mut graph = DiGraph::with_capacity(n, adjacency.nnz());
            let nodes: Vec<NodeIndex> = (0..n).map(|_| graph.add_node(())).collect();
            for (i, j, &w) in adjacency.triplet_iter() {
                if i != j && w != 0.0 {
                    let _ = graph.add_edge(nodes[i], nodes[j], w);
                }
            }
            GraphView::Directed(graph)
        } else {
            let mut graph = UnGraph::with_capacity(n, adjacency.nnz() / 2 + 1);
            let nodes: Vec<NodeIndex> = (0..n).map(|_| graph.add_node(())).collect();
            for (i, j, &w) in adjacency.triplet_iter() {
                if i == j || w == 0.0 {
                    continue;
                }
                let take = i < j || !has_entry(adjacency, j, i);
                if take {
                    let _ = graph.add_edge(nodes[i], nodes[j], w);
                }
            }
            GraphView::Undirected(graph)
        }
    }

    pub(crate) fn node_count(&self) -> usize {
        match self {
            GraphView::Directed(g) => g.node_count(),
            GraphView::Undirected(g) => g.node_count(),
        }
    }

    /// Flatten to a weighted undirected edge list for the optimizers.
    ///
    /// With `use_weights` unset every edge gets unit weight. In a directed
    /// view, the symmetric arc pair (i→j, j→i) accumulates onto one edge;
    /// that uniform doubling rescales all weights alike and leaves the
    /// modularity ranking untouched.
    pub(crate) fn weighted_edges(&self, use_weights: bool) -> Vec<(usize, usize, f64)> {
        match self {
            GraphView::Undirected(g) => g
                .edge_references()
                .map(|e| {
                    let (i, j) = ordered(e.source().index(), e.target().index());
                    (i, j, if use_weights { *e.weight() } else { 1.0 })
                })
                .collect(),
            GraphView::Directed(g) => {
                let mut acc: HashMap<(usize, usize), f64> = HashMap::new();
                for e in g.edge_references() {
                    let key = ordered(e.source().index(), e.target().index());
                    let w = if use_weights { *e.weight() } else { 1.0 };
                    *acc.entry(key).or_insert(0.0) += w;
                }
                let mut edges: Vec<(usize, usize, f64)> =
                    acc.into_iter().map(|((i, j), w)| (i, j, w)).collect();
                // Stable output order regardless of hash state.
                edges.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
                edges
            }
        }
    }
}

fn ordered(i: usize, j: usize) -> (usize, usize) {
    if i < j {
        (i, j)
    } else {
        (j, i)
    }
}

fn has_entry(adjacency: &CsrMatrix<f64>, i: usize, j: usize) -> bool {
    matches!(adjacency.get_entry(i, j), Some(SparseEntry::NonZero(_)))
}
