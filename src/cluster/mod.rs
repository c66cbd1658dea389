//! Cluster orchestration.
//!
//! [`louvain`] is the single entry point: it validates parameters, resolves
//! the adjacency source, optionally restricts the graph to a subset of
//! samples, dispatches to one partition backend, and writes the resulting
//! labels back as a naturally sorted categorical column together with a
//! run-parameters record.
//!
//! The backends sit behind the crate-internal `Partitioner` seam, one
//! adapter per flavor:
//!
//! - [`Flavor::Vtraag`]: seeded optimizer over a selectable quality
//!   objective ([`PartitionKind`]), resolution-aware, honors `directed`;
//! - [`Flavor::Igraph`]: fixed multilevel modularity, always undirected,
//!   resolution has no effect (a warning is logged if one is supplied);
//! - [`Flavor::Taynaud`]: legacy single-level greedy modularity.
//!
//! All validation failures are immediate and fatal; nothing is written to
//! the container on any error path.

mod graph;
mod greedy;
mod multilevel;
mod traits;
#[cfg(feature = "vtraag")]
mod vtraag;

use crate::adjacency::{self, GraphView};
use crate::data::{natural_cmp, AnnData, Categorical, ClusterParams, PARAMS_KEY};
use crate::error::{Error, Result};
use log::{debug, info, warn};
use nalgebra_sparse::CsrMatrix;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use traits::Partitioner;

/// Which partitioning backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flavor {
    /// Seeded quality optimizer with a selectable partition objective.
    #[default]
    Vtraag,
    /// Fixed multilevel modularity procedure on the undirected graph.
    Igraph,
    /// Legacy single-level greedy modularity.
    #[deprecated(note = "legacy flavor kept for old pipelines; use Vtraag or Igraph")]
    Taynaud,
}

impl Flavor {
    /// The wire/config name of this flavor.
    #[allow(deprecated)]
    pub fn as_str(&self) -> &'static str {
        match self {
            Flavor::Vtraag => "vtraag",
            Flavor::Igraph => "igraph",
            Flavor::Taynaud => "taynaud",
        }
    }

    /// The flavors this build can actually run.
    ///
    /// The optimized backend is feature-gated; when it is compiled out,
    /// requesting it fails fast with [`Error::BackendUnavailable`] rather
    /// than falling back silently.
    #[allow(deprecated)]
    pub fn supported() -> &'static [Flavor] {
        #[cfg(feature = "vtraag")]
        {
            &[Flavor::Vtraag, Flavor::Igraph, Flavor::Taynaud]
        }
        #[cfg(not(feature = "vtraag"))]
        {
            &[Flavor::Igraph, Flavor::Taynaud]
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flavor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "vtraag" => Ok(Flavor::Vtraag),
            "igraph" => Ok(Flavor::Igraph),
            #[allow(deprecated)]
            "taynaud" => Ok(Flavor::Taynaud),
            other => Err(Error::UnknownFlavor(other.to_string())),
        }
    }
}

/// Quality objective for the optimized flavor.
///
/// Only meaningful with [`Flavor::Vtraag`]; combining an override with any
/// other flavor is a fatal input error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartitionKind {
    /// Resolution-parameterized modularity (configuration null model).
    #[default]
    RbConfiguration,
    /// Plain modularity; the resolution parameter is ignored.
    Modularity,
    /// Constant Potts model; resolution-limit free.
    Cpm,
}

/// Parameters for [`louvain`].
///
/// Defaults mirror the common case: optimized flavor, seed 0, directed
/// graph view, unit edge weights, no restriction.
#[derive(Debug, Clone)]
pub struct LouvainOptions {
    resolution: Option<f64>,
    random_state: u64,
    restrict_to: Option<(String, Vec<String>)>,
    key_added: Option<String>,
    adjacency: Option<CsrMatrix<f64>>,
    flavor: Flavor,
    directed: bool,
    use_weights: bool,
    partition: Option<PartitionKind>,
}

impl Default for LouvainOptions {
    fn default() -> Self {
        Self {
            resolution: None,
            random_state: 0,
            restrict_to: None,
            key_added: None,
            adjacency: None,
            flavor: Flavor::default(),
            directed: true,
            use_weights: false,
            partition: None,
        }
    }
}

impl LouvainOptions {
    /// Options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolution parameter; higher values find more, smaller clusters.
    ///
    /// Only the optimized flavor uses it (default 1.0 there). With
    /// [`Flavor::Igraph`] it has no effect and merely logs a warning.
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = Some(resolution);
        self
    }

    /// Seed for the optimized backend's random generator.
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    /// Restrict clustering to the samples carrying one of `categories` in
    /// the annotation column `key`.
    pub fn with_restriction(
        mut self,
        key: impl Into<String>,
        categories: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.restrict_to = Some((
            key.into(),
            categories.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Output column key. Defaults to `"louvain"`, or `<restrict_key>_R`
    /// when a restriction is active.
    pub fn with_key_added(mut self, key: impl Into<String>) -> Self {
        self.key_added = Some(key.into());
        self
    }

    /// Explicit adjacency matrix; takes precedence over the one stored on
    /// the container.
    pub fn with_adjacency(mut self, adjacency: CsrMatrix<f64>) -> Self {
        self.adjacency = Some(adjacency);
        self
    }

    /// Backend flavor.
    pub fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// Interpret the adjacency as a directed graph (default true).
    ///
    /// [`Flavor::Igraph`] and [`Flavor::Taynaud`] always use the
    /// undirected view.
    pub fn with_directed(mut self, directed: bool) -> Self {
        self.directed = directed;
        self
    }

    /// Use edge weights from the adjacency instead of unit weights.
    pub fn with_use_weights(mut self, use_weights: bool) -> Self {
        self.use_weights = use_weights;
        self
    }

    /// Partition objective override for the optimized flavor.
    pub fn with_partition(mut self, partition: PartitionKind) -> Self {
        self.partition = Some(partition);
        self
    }
}

/// A validated sample restriction.
struct Restriction {
    key: String,
    /// Requested categories, natural-sort ordered and deduplicated.
    categories: Vec<String>,
    /// Positions of the restricted samples, ascending.
    indices: Vec<usize>,
    /// Restriction-column values; the merge base for unrestricted samples.
    base_values: Vec<String>,
}

/// Cluster samples into subgroups via community detection on the similarity
/// graph.
///
/// Mutates `adata` in place: writes the cluster labels as a categorical
/// `obs` column (categories in natural sort order) and records resolution
/// and seed under the fixed `"louvain"` namespace in `uns`. Callers wanting
/// the copy-and-return style clone the container first.
///
/// # Errors
///
/// Fails fast, with nothing written, when no adjacency source resolves, a
/// restriction names an unknown column or category, a partition override is
/// combined with a non-optimized flavor, or the requested backend is
/// compiled out.
pub fn louvain(adata: &mut AnnData, opts: &LouvainOptions) -> Result<()> {
    info!("running Louvain clustering (flavor \"{}\")", opts.flavor);

    if opts.partition.is_some() && opts.flavor != Flavor::Vtraag {
        return Err(Error::PartitionTypeUnsupported {
            flavor: opts.flavor.as_str(),
        });
    }
    if opts.flavor == Flavor::Igraph && opts.resolution.is_some() {
        warn!("`resolution` parameter has no effect for flavor \"igraph\"");
    }

    if opts.adjacency.is_none() && adata.uns().connectivities().is_none() {
        return Err(Error::MissingAdjacency);
    }

    let restriction = resolve_restriction(adata, opts)?;

    let groups = {
        let adjacency = match (&opts.adjacency, adata.uns().connectivities()) {
            (Some(a), _) => a,
            (None, Some(a)) => a,
            (None, None) => return Err(Error::MissingAdjacency),
        };
        adjacency::validate(adjacency, adata.n_obs())?;

        let restricted = match &restriction {
            Some(r) => Some(adjacency::restrict(adjacency, &r.indices)?),
            None => None,
        };
        let run_adjacency = restricted.as_ref().unwrap_or(adjacency);

        let directed = opts.flavor == Flavor::Vtraag && opts.directed;
        if !directed {
            debug!("using the undirected graph");
        }
        let view = GraphView::from_adjacency(run_adjacency, directed);
        let edges = view.weighted_edges(opts.use_weights);
        dispatch(opts, view.node_count(), &edges)?
    };

    let n_clusters = groups.iter().collect::<BTreeSet<_>>().len();

    let (key, column) = match &restriction {
        None => {
            let key = opts
                .key_added
                .clone()
                .unwrap_or_else(|| PARAMS_KEY.to_string());
            let values: Vec<String> = groups.iter().map(ToString::to_string).collect();
            (key, Categorical::from_values(values))
        }
        Some(r) => {
            let key = opts
                .key_added
                .clone()
                .unwrap_or_else(|| format!("{}_R", r.key));
            let prefix = format!("{},", r.categories.join("-"));
            let mut values = r.base_values.clone();
            for (pos, &sample) in r.indices.iter().enumerate() {
                values[sample] = format!("{prefix}{}", groups[pos]);
            }
            (key, Categorical::from_values(values))
        }
    };

    adata.insert_obs(key.clone(), column)?;
    adata.uns_mut().record_params(
        PARAMS_KEY,
        ClusterParams {
            resolution: opts.resolution,
            random_state: opts.random_state,
        },
    );

    info!("found {n_clusters} clusters and added '{key}' (obs, categorical)");
    Ok(())
}

fn resolve_restriction(adata: &AnnData, opts: &LouvainOptions) -> Result<Option<Restriction>> {
    let Some((key, categories)) = &opts.restrict_to else {
        return Ok(None);
    };
    if categories.is_empty() {
        return Err(Error::InvalidParameter {
            name: "restrict_to",
            message: "category list is empty",
        });
    }

    let column = adata.obs(key).ok_or_else(|| Error::MissingObsColumn {
        key: key.clone(),
    })?;
    for category in categories {
        if !column.categories().iter().any(|c| c == category) {
            return Err(Error::UnknownCategory {
                category: category.clone(),
                key: key.clone(),
            });
        }
    }

    let wanted: HashSet<&str> = categories.iter().map(String::as_str).collect();
    let indices: Vec<usize> = column
        .values()
        .enumerate()
        .filter(|(_, v)| wanted.contains(v))
        .map(|(i, _)| i)
        .collect();

    let mut sorted_categories = categories.clone();
    sorted_categories.sort_by(|a, b| natural_cmp(a, b));
    sorted_categories.dedup();

    Ok(Some(Restriction {
        key: key.clone(),
        categories: sorted_categories,
        indices,
        base_values: column.values().map(str::to_string).collect(),
    }))
}

#[allow(deprecated)]
fn dispatch(opts: &LouvainOptions, n: usize, edges: &[(usize, usize, f64)]) -> Result<Vec<usize>> {
    match opts.flavor {
        Flavor::Vtraag => {
            #[cfg(feature = "vtraag")]
            {
                info!("using the seeded quality optimizer");
                let kind = opts.partition.unwrap_or_default();
                let resolution = opts.resolution.unwrap_or(1.0);
                vtraag::QualityOptimizer::new(kind, resolution, opts.random_state)
                    .partition(n, edges)
            }
            #[cfg(not(feature = "vtraag"))]
            {
                Err(Error::BackendUnavailable { flavor: "vtraag" })
            }
        }
        Flavor::Igraph => multilevel::Multilevel::new().partition(n, edges),
        Flavor::Taynaud => greedy::GreedyModularity::new().partition(n, edges),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra_sparse::CooMatrix;

    /// Symmetric adjacency from undirected edge tuples.
    fn symmetric(n: usize, edges: &[(usize, usize, f64)]) -> CsrMatrix<f64> {
        let mut rows = Vec::new();
        let mut cols = Vec::new();
        let mut vals = Vec::new();
        for &(i, j, w) in edges {
            rows.push(i);
            cols.push(j);
            vals.push(w);
            rows.push(j);
            cols.push(i);
            vals.push(w);
        }
        let coo = CooMatrix::try_from_triplets(n, n, rows, cols, vals).unwrap();
        CsrMatrix::from(&coo)
    }

    /// Two disconnected triangles over samples 0-2 and 3-5.
    fn two_triangles() -> CsrMatrix<f64> {
        symmetric(
            6,
            &[
                (0, 1, 1.0),
                (1, 2, 1.0),
                (0, 2, 1.0),
                (3, 4, 1.0),
                (4, 5, 1.0),
                (3, 5, 1.0),
            ],
        )
    }

    /// `k` disconnected triangles over `3k` samples.
    fn triangles(k: usize) -> CsrMatrix<f64> {
        let mut edges = Vec::new();
        for t in 0..k {
            let base = 3 * t;
            edges.push((base, base + 1, 1.0));
            edges.push((base + 1, base + 2, 1.0));
            edges.push((base, base + 2, 1.0));
        }
        symmetric(3 * k, &edges)
    }

    #[test]
    fn two_triangles_igraph_gives_two_clusters() {
        let mut adata = AnnData::new(6);
        let opts = LouvainOptions::new()
            .with_flavor(Flavor::Igraph)
            .with_adjacency(two_triangles());
        louvain(&mut adata, &opts).unwrap();

        let labels = adata.obs("louvain").unwrap();
        assert_eq!(labels.categories(), &["0", "1"]);
        for i in 0..3 {
            assert_eq!(labels.value(i), "0");
        }
        for i in 3..6 {
            assert_eq!(labels.value(i), "1");
        }
    }

    #[test]
    #[cfg(feature = "vtraag")]
    fn default_flavor_is_deterministic_under_fixed_seed() {
        let mut edges = vec![
            (0, 1, 1.0),
            (1, 2, 1.0),
            (0, 2, 1.0),
            (3, 4, 1.0),
            (4, 5, 1.0),
            (3, 5, 1.0),
            (2, 3, 0.1),
        ];
        edges.push((5, 0, 0.1));
        let adjacency = symmetric(6, &edges);

        let opts = LouvainOptions::new()
            .with_random_state(42)
            .with_use_weights(true)
            .with_adjacency(adjacency);

        let mut first = AnnData::new(6);
        louvain(&mut first, &opts).unwrap();
        let reference: Vec<String> = first
            .obs("louvain")
            .unwrap()
            .values()
            .map(str::to_string)
            .collect();

        for _ in 0..5 {
            let mut adata = AnnData::new(6);
            louvain(&mut adata, &opts).unwrap();
            let got: Vec<String> = adata
                .obs("louvain")
                .unwrap()
                .values()
                .map(str::to_string)
                .collect();
            assert_eq!(got, reference);
        }
    }

    #[test]
    #[cfg(feature = "vtraag")]
    fn category_count_matches_distinct_memberships() {
        let mut adata = AnnData::new(36);
        let opts = LouvainOptions::new().with_adjacency(triangles(12));
        louvain(&mut adata, &opts).unwrap();

        let labels = adata.obs("louvain").unwrap();
        let distinct: HashSet<&str> = labels.values().collect();
        assert_eq!(labels.n_categories(), distinct.len());
        assert_eq!(labels.n_categories(), 12);
    }

    #[test]
    #[cfg(feature = "vtraag")]
    fn categories_are_naturally_sorted() {
        let mut adata = AnnData::new(36);
        let opts = LouvainOptions::new().with_adjacency(triangles(12));
        louvain(&mut adata, &opts).unwrap();

        let cats = adata.obs("louvain").unwrap().categories().to_vec();
        // "2" sorts before "10" under natural order.
        let expected: Vec<String> = (0..12).map(|i| i.to_string()).collect();
        assert_eq!(cats, expected);
    }

    #[test]
    #[cfg(feature = "vtraag")]
    fn restriction_merges_labels_and_preserves_outsiders() {
        let mut adata = AnnData::new(9);
        adata
            .insert_obs(
                "batch",
                Categorical::from_values(["A", "A", "A", "B", "B", "B", "C", "C", "C"]),
            )
            .unwrap();
        // Triangles within A, within B, within C.
        adata.uns_mut().set_connectivities(triangles(3));

        // Unsorted category list on purpose; the prefix must come out sorted.
        let opts = LouvainOptions::new().with_restriction("batch", ["B", "A"]);
        louvain(&mut adata, &opts).unwrap();

        let labels = adata.obs("batch_R").unwrap();
        for i in 0..3 {
            assert_eq!(labels.value(i), "A-B,0");
        }
        for i in 3..6 {
            assert_eq!(labels.value(i), "A-B,1");
        }
        for i in 6..9 {
            assert_eq!(labels.value(i), "C");
        }
        assert_eq!(labels.categories(), &["A-B,0", "A-B,1", "C"]);
    }

    #[test]
    fn igraph_with_resolution_warns_but_succeeds() {
        let mut adata = AnnData::new(6);
        let opts = LouvainOptions::new()
            .with_flavor(Flavor::Igraph)
            .with_resolution(0.5)
            .with_adjacency(two_triangles());
        louvain(&mut adata, &opts).unwrap();
        assert!(adata.obs("louvain").is_some());
    }

    #[test]
    fn partition_override_requires_optimized_flavor() {
        let mut adata = AnnData::new(6);
        let opts = LouvainOptions::new()
            .with_flavor(Flavor::Igraph)
            .with_partition(PartitionKind::Modularity)
            .with_adjacency(two_triangles());
        assert_eq!(
            louvain(&mut adata, &opts),
            Err(Error::PartitionTypeUnsupported { flavor: "igraph" })
        );
    }

    #[test]
    fn missing_adjacency_is_fatal() {
        let mut adata = AnnData::new(4);
        assert_eq!(
            louvain(&mut adata, &LouvainOptions::new()),
            Err(Error::MissingAdjacency)
        );
        assert!(adata.obs("louvain").is_none());
    }

    #[test]
    fn unknown_restriction_category_is_fatal() {
        let mut adata = AnnData::new(6);
        adata
            .insert_obs(
                "batch",
                Categorical::from_values(["A", "A", "A", "B", "B", "B"]),
            )
            .unwrap();
        adata.uns_mut().set_connectivities(two_triangles());

        let opts = LouvainOptions::new().with_restriction("batch", ["Z"]);
        assert_eq!(
            louvain(&mut adata, &opts),
            Err(Error::UnknownCategory {
                category: "Z".into(),
                key: "batch".into(),
            })
        );
    }

    #[test]
    fn missing_restriction_column_is_fatal() {
        let mut adata = AnnData::new(6);
        adata.uns_mut().set_connectivities(two_triangles());
        let opts = LouvainOptions::new().with_restriction("celltype", ["A"]);
        assert_eq!(
            louvain(&mut adata, &opts),
            Err(Error::MissingObsColumn {
                key: "celltype".into(),
            })
        );
    }

    #[test]
    fn flavor_parses_from_strings() {
        assert_eq!("vtraag".parse::<Flavor>().unwrap(), Flavor::Vtraag);
        assert_eq!("igraph".parse::<Flavor>().unwrap(), Flavor::Igraph);
        assert_eq!(
            "leiden".parse::<Flavor>(),
            Err(Error::UnknownFlavor("leiden".into()))
        );
    }

    #[test]
    #[cfg(feature = "vtraag")]
    fn stored_connectivities_are_used_when_no_explicit_adjacency() {
        let mut adata = AnnData::new(6);
        adata.uns_mut().set_connectivities(two_triangles());
        louvain(&mut adata, &LouvainOptions::new()).unwrap();
        assert_eq!(adata.obs("louvain").unwrap().n_categories(), 2);
    }

    #[test]
    #[cfg(feature = "vtraag")]
    fn run_params_are_recorded_and_overwritten() {
        let mut adata = AnnData::new(6);
        adata.uns_mut().set_connectivities(two_triangles());

        louvain(
            &mut adata,
            &LouvainOptions::new().with_resolution(0.8).with_random_state(3),
        )
        .unwrap();
        let params = adata.uns().cluster_params(PARAMS_KEY).unwrap();
        assert_eq!(params.resolution, Some(0.8));
        assert_eq!(params.random_state, 3);

        louvain(&mut adata, &LouvainOptions::new()).unwrap();
        let params = adata.uns().cluster_params(PARAMS_KEY).unwrap();
        assert_eq!(params.resolution, None);
        assert_eq!(params.random_state, 0);
    }

    #[test]
    #[cfg(feature = "vtraag")]
    fn key_added_overrides_the_default() {
        let mut adata = AnnData::new(6);
        let opts = LouvainOptions::new()
            .with_key_added("communities")
            .with_adjacency(two_triangles());
        louvain(&mut adata, &opts).unwrap();
        assert!(adata.obs("communities").is_some());
        assert!(adata.obs("louvain").is_none());
    }

    #[test]
    #[allow(deprecated)]
    fn legacy_flavor_produces_dense_labels() {
        let mut adata = AnnData::new(6);
        let opts = LouvainOptions::new()
            .with_flavor(Flavor::Taynaud)
            .with_adjacency(two_triangles());
        louvain(&mut adata, &opts).unwrap();
        let labels = adata.obs("louvain").unwrap();
        assert_eq!(labels.categories(), &["0", "1"]);
    }

    #[test]
    fn dimension_mismatch_is_fatal() {
        let mut adata = AnnData::new(5);
        let opts = LouvainOptions::new().with_adjacency(two_triangles());
        assert!(matches!(
            louvain(&mut adata, &opts),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn supported_flavors_include_the_default_backend() {
        assert!(Flavor::supported().contains(&Flavor::Igraph));
        #[cfg(feature = "vtraag")]
        assert!(Flavor::supported().contains(&Flavor::Vtraag));
    }
}
