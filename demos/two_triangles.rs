//! Cluster two disconnected triangles and print the labels.
//!
//! Run with `cargo run --example two_triangles`.

use nalgebra_sparse::{CooMatrix, CsrMatrix};
use scclust::{louvain, AnnData, LouvainOptions};

fn main() {
    env_logger::init();

    // Symmetric adjacency: triangles over cells 0-2 and 3-5.
    let edges = [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)];
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut vals = Vec::new();
    for &(i, j) in &edges {
        rows.extend([i, j]);
        cols.extend([j, i]);
        vals.extend([1.0, 1.0]);
    }
    let coo = CooMatrix::try_from_triplets(6, 6, rows, cols, vals).unwrap();

    let mut adata = AnnData::new(6);
    adata.uns_mut().set_connectivities(CsrMatrix::from(&coo));

    let opts = LouvainOptions::new().with_random_state(0);
    louvain(&mut adata, &opts).unwrap();

    let labels = adata.obs("louvain").unwrap();
    for (cell, label) in labels.values().enumerate() {
        println!("cell {cell}: cluster {label}");
    }
    println!("categories: {:?}", labels.categories());
}
