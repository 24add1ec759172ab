use kodama::{Method, linkage};
use tracing::debug;

use crate::error::{DetourError, Result};
use crate::features::RoadFeatureExtractor;
use crate::road::RoadTestCase;
use crate::tree::Hierarchy;

/// Condensed pairwise Euclidean distances between `n` feature vectors, ordered
/// `(0,1), (0,2), .., (0,n-1), (1,2), ..`.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceTable {
    n: usize,
    condensed: Vec<f64>,
}

impl DistanceTable {
    pub fn from_features(features: &[Vec<f64>]) -> Result<Self> {
        let n = features.len();
        if let Some(first) = features.first() {
            if let Some(i) = features.iter().position(|f| f.len() != first.len()) {
                return Err(DetourError::Configuration(format!(
                    "feature vector {} has length {}, expected {}",
                    i,
                    features[i].len(),
                    first.len()
                )));
            }
        }

        let mut condensed = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                condensed.push(euclidean(&features[i], &features[j]));
            }
        }
        Ok(Self { n, condensed })
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn condensed(&self) -> &[f64] {
        &self.condensed
    }

    /// Distance between objects `i` and `j`, in either order.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        if i == j {
            return 0.0;
        }
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        self.condensed[self.n * i + j - ((i + 2) * (i + 1)) / 2]
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

pub trait HierarchyBuilder {
    /// Builds a binary similarity tree whose leaf `i` holds `features[i]`,
    /// along with the pairwise distances it was built from.
    fn build(&self, features: &[Vec<f64>]) -> Result<(Hierarchy, DistanceTable)>;
}

/// Agglomerative clustering with Ward's minimum variance linkage.
///
/// Leaves take arena ids `0..n` and the cluster formed at step `s` takes id
/// `n + s`, so the root is `2n - 2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WardClusterer;

impl HierarchyBuilder for WardClusterer {
    fn build(&self, features: &[Vec<f64>]) -> Result<(Hierarchy, DistanceTable)> {
        if features.is_empty() {
            return Err(DetourError::Configuration(
                "cannot cluster an empty set of roads".to_string(),
            ));
        }
        let distances = DistanceTable::from_features(features)?;
        let n = features.len();

        let mut hierarchy = Hierarchy::new();
        for road in 0..n {
            hierarchy.push_leaf(road);
        }
        if n == 1 {
            hierarchy.set_root(0);
            return Ok((hierarchy, distances));
        }

        // linkage works in place on its input
        let mut condensed = distances.condensed().to_vec();
        let dendrogram = linkage(&mut condensed, n, Method::Ward);
        let mut root = 0;
        for step in dendrogram.steps() {
            root = hierarchy.push_internal(step.cluster1, step.cluster2);
        }
        hierarchy.set_root(root);

        debug!(
            roads = n,
            nodes = hierarchy.len(),
            "built ward hierarchy"
        );
        Ok((hierarchy, distances))
    }
}

/// Clusters roads by the features a [`RoadFeatureExtractor`] derives from them.
#[derive(Debug, Clone)]
pub struct RoadClusterer<E, B = WardClusterer> {
    extractor: E,
    builder: B,
}

impl<E: RoadFeatureExtractor> RoadClusterer<E, WardClusterer> {
    pub fn new(extractor: E) -> Self {
        Self::with_builder(extractor, WardClusterer)
    }
}

impl<E: RoadFeatureExtractor, B: HierarchyBuilder> RoadClusterer<E, B> {
    pub fn with_builder(extractor: E, builder: B) -> Self {
        Self { extractor, builder }
    }

    pub fn features<Id>(&self, roads: &[RoadTestCase<Id>]) -> Result<Vec<Vec<f64>>> {
        roads
            .iter()
            .enumerate()
            .map(|(i, road)| {
                self.extractor
                    .extract_features(road.points())
                    .map_err(|e| e.at_road(i))
            })
            .collect()
    }

    pub fn cluster<Id>(&self, roads: &[RoadTestCase<Id>]) -> Result<(Hierarchy, DistanceTable)> {
        let features = self.features(roads)?;
        self.builder.build(&features)
    }
}
