//! # scclust
//!
//! Graph-based community clustering for annotated single-cell data.
//!
//! The crate wraps community detection over a precomputed cell-similarity
//! graph: validate inputs, optionally restrict to a subset of samples,
//! dispatch to a partition backend, and write the cluster labels back into
//! the annotated-data container as a categorical column with naturally
//! sorted categories.
//!
//! Building the nearest-neighbor graph itself is an upstream concern; this
//! crate starts from its sparse adjacency matrix.
//!
//! ```rust
//! use nalgebra_sparse::{CooMatrix, CsrMatrix};
//! use scclust::{louvain, AnnData, Flavor, LouvainOptions};
//!
//! // Two disconnected triangles over six cells.
//! let (rows, cols, vals) = (
//!     vec![0, 1, 0, 3, 4, 3, 1, 2, 2, 4, 5, 5],
//!     vec![1, 2, 2, 4, 5, 5, 0, 1, 0, 3, 4, 3],
//!     vec![1.0; 12],
//! );
//! let coo = CooMatrix::try_from_triplets(6, 6, rows, cols, vals).unwrap();
//! let adjacency = CsrMatrix::from(&coo);
//!
//! let mut adata = AnnData::new(6);
//! adata.uns_mut().set_connectivities(adjacency);
//!
//! let opts = LouvainOptions::new().with_flavor(Flavor::Igraph);
//! louvain(&mut adata, &opts).unwrap();
//!
//! let labels = adata.obs("louvain").unwrap();
//! assert_eq!(labels.categories(), &["0", "1"]);
//! ```

mod adjacency;
pub mod cluster;
pub mod data;
/// Error types used across `scclust`.
pub mod error;

pub use cluster::{louvain, Flavor, LouvainOptions, PartitionKind};
pub use data::{natural_cmp, AnnData, Categorical, ClusterParams, Unstructured, PARAMS_KEY};
pub use error::{Error, Result};
