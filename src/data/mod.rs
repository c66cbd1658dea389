//! Annotated-data container.
//!
//! [`AnnData`] is the caller-owned structure the orchestrator reads from and
//! writes back into: a per-sample table of categorical annotations (`obs`)
//! plus an unstructured metadata store (`uns`) holding the precomputed
//! neighbor connectivities and run-parameter records.
//!
//! The container is deliberately small. Storage and indexing semantics of
//! full annotated-data formats are out of scope; this is the minimal contract
//! the clustering orchestrator needs.

mod categorical;

pub use categorical::{natural_cmp, Categorical};

use crate::error::{Error, Result};
use nalgebra_sparse::CsrMatrix;
use std::collections::BTreeMap;

/// Fixed `uns` namespace under which run parameters are recorded.
pub const PARAMS_KEY: &str = "louvain";

/// Provenance record for a clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterParams {
    /// Resolution parameter the run was invoked with, if any.
    pub resolution: Option<f64>,
    /// Seed for the backend's random generator.
    pub random_state: u64,
}

/// Unstructured metadata store.
///
/// Holds the precomputed adjacency under a fixed slot and one
/// [`ClusterParams`] record per namespace. A record is overwritten by any
/// subsequent run using the same namespace.
#[derive(Debug, Clone, Default)]
pub struct Unstructured {
    connectivities: Option<CsrMatrix<f64>>,
    cluster_params: BTreeMap<String, ClusterParams>,
}

impl Unstructured {
    /// The precomputed neighbor connectivities, if stored.
    pub fn connectivities(&self) -> Option<&CsrMatrix<f64>> {
        self.connectivities.as_ref()
    }

    /// Store precomputed neighbor connectivities.
    pub fn set_connectivities(&mut self, connectivities: CsrMatrix<f64>) {
        self.connectivities = Some(connectivities);
    }

    /// The run-parameter record under `namespace`, if any.
    pub fn cluster_params(&self, namespace: &str) -> Option<&ClusterParams> {
        self.cluster_params.get(namespace)
    }

    /// Write a run-parameter record, replacing any prior one.
    pub fn record_params(&mut self, namespace: impl Into<String>, params: ClusterParams) {
        let _ = self.cluster_params.insert(namespace.into(), params);
    }
}

/// Annotated single-cell data container.
///
/// Rows of every `obs` column and of the stored connectivities matrix are
/// aligned to the same sample order. Mutation happens in place; callers that
/// want the copy-and-return style clone first (`AnnData` is `Clone`).
#[derive(Debug, Clone, Default)]
pub struct AnnData {
    n_obs: usize,
    obs: BTreeMap<String, Categorical>,
    uns: Unstructured,
}

impl AnnData {
    /// Create a container for `n_obs` samples with no annotations.
    pub fn new(n_obs: usize) -> Self {
        Self {
            n_obs,
            obs: BTreeMap::new(),
            uns: Unstructured::default(),
        }
    }

    /// Number of samples.
    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    /// The annotation column under `key`, if present.
    pub fn obs(&self, key: &str) -> Option<&Categorical> {
        self.obs.get(key)
    }

    /// Keys of all annotation columns.
    pub fn obs_keys(&self) -> impl Iterator<Item = &str> {
        self.obs.keys().map(String::as_str)
    }

    /// Insert (or replace) an annotation column.
    ///
    /// The column length must equal [`AnnData::n_obs`].
    pub fn insert_obs(&mut self, key: impl Into<String>, column: Categorical) -> Result<()> {
        if column.len() != self.n_obs {
            return Err(Error::ShapeMismatch {
                expected: format!("{} samples", self.n_obs),
                actual: format!("{} values", column.len()),
            });
        }
        let _ = self.obs.insert(key.into(), column);
        Ok(())
    }

    /// The unstructured metadata store.
    pub fn uns(&self) -> &Unstructured {
        &self.uns
    }

    /// Mutable access to the unstructured metadata store.
    pub fn uns_mut(&mut self) -> &mut Unstructured {
        &mut self.uns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_obs_validates_length() {
        let mut adata = AnnData::new(3);
        let too_short = Categorical::from_values(["a", "b"]);
        assert!(adata.insert_obs("batch", too_short).is_err());

        let ok = Categorical::from_values(["a", "b", "a"]);
        adata.insert_obs("batch", ok).unwrap();
        assert_eq!(adata.obs("batch").unwrap().value(2), "a");
    }

    #[test]
    fn params_record_is_overwritten() {
        let mut adata = AnnData::new(0);
        adata.uns_mut().record_params(
            PARAMS_KEY,
            ClusterParams {
                resolution: Some(0.5),
                random_state: 0,
            },
        );
        adata.uns_mut().record_params(
            PARAMS_KEY,
            ClusterParams {
                resolution: None,
                random_state: 7,
            },
        );
        let params = adata.uns().cluster_params(PARAMS_KEY).unwrap();
        assert_eq!(params.resolution, None);
        assert_eq!(params.random_state, 7);
    }
}
