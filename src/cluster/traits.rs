//! Backend seam for the partition algorithms.

use crate::error::Result;

/// A partitioning backend.
///
/// Takes the flattened weighted edge list over `n` nodes and returns one
/// community id per node, densified to consecutive integers starting at 0.
/// One adapter exists per flavor; the orchestrator picks exactly one per
/// call.
pub(crate) trait Partitioner {
    fn partition(&self, n: usize, edges: &[(usize, usize, f64)]) -> Result<Vec<usize>>;
}
