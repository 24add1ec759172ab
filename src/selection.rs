//! Test case selection and prioritization over not-executed roads.
//!
//! Every call rebuilds the similarity hierarchy of executed and not-executed
//! roads, then repeatedly retrieves a selectable road until the count bounds
//! or the windowed stopping rule end the selection. The order of selection is
//! the priority order.

use ordered_float::OrderedFloat;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::clustering::{DistanceTable, HierarchyBuilder, RoadClusterer, WardClusterer};
use crate::config::{
    DEFAULT_M_CLOSEST_NEIGHBOR_COUNT, DEFAULT_W_SELECTION_THRESHOLD, DetourConfig,
    check_ratio_bounds,
};
use crate::error::{DetourError, Result};
use crate::features::{CurvatureFeatureExtractor, RoadFeatureExtractor};
use crate::retrieval::Retriever;
use crate::road::RoadTestCase;
use crate::tree::AnnotatedTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Exhausted,
    MaxCount,
    Window,
}

pub struct Detour<Id, E = CurvatureFeatureExtractor, B = WardClusterer> {
    /// Executed roads first, then not-executed ones.
    roads: Vec<RoadTestCase<Id>>,
    executed_count: usize,
    clusterer: RoadClusterer<E, B>,
    random_seed: u64,
}

impl<Id> Detour<Id> {
    /// Curvature features reduced to `config.road_section_count` sections,
    /// clustered with Ward linkage.
    pub fn from_config(
        executed: Vec<RoadTestCase<Id>>,
        not_executed: Vec<RoadTestCase<Id>>,
        config: &DetourConfig,
    ) -> Result<Self> {
        config.validate()?;
        let extractor = CurvatureFeatureExtractor::new(config.road_section_count)?;
        Self::new(
            executed,
            not_executed,
            RoadClusterer::new(extractor),
            config.random_seed,
        )
    }
}

impl<Id, E: RoadFeatureExtractor, B: HierarchyBuilder> Detour<Id, E, B> {
    pub fn new(
        executed: Vec<RoadTestCase<Id>>,
        not_executed: Vec<RoadTestCase<Id>>,
        clusterer: RoadClusterer<E, B>,
        random_seed: u64,
    ) -> Result<Self> {
        if let Some(i) = executed.iter().position(|r| r.is_selectable()) {
            return Err(DetourError::Configuration(format!(
                "executed road {i} has no pass/fail outcome"
            )));
        }
        if let Some(i) = not_executed.iter().position(|r| !r.is_selectable()) {
            return Err(DetourError::Configuration(format!(
                "not-executed road {i} already has an outcome"
            )));
        }

        let executed_count = executed.len();
        let mut roads = executed;
        roads.extend(not_executed);
        Ok(Self {
            roads,
            executed_count,
            clusterer,
            random_seed,
        })
    }

    pub fn roads(&self) -> &[RoadTestCase<Id>] {
        &self.roads
    }

    pub fn executed_count(&self) -> usize {
        self.executed_count
    }

    pub fn selectable_count(&self) -> usize {
        self.roads.len() - self.executed_count
    }

    /// Builds a fresh hierarchy with full selectable counts and a freshly seeded
    /// random stream.
    pub fn session(&self) -> Result<SelectionSession<'_, Id>> {
        let (hierarchy, distances) = self
            .clusterer
            .cluster(&self.roads)
            .map_err(|e| e.in_input_lists(self.executed_count))?;
        let tree = AnnotatedTree::annotate(&hierarchy, &self.roads)?;
        Ok(SelectionSession {
            roads: &self.roads,
            tree,
            distances,
            rng: StdRng::seed_from_u64(self.random_seed),
        })
    }

    /// Selects between `min_ratio` and `max_ratio` of the not-executed roads.
    ///
    /// Selection ends early, once past the minimum, when each of the last `w`
    /// selected roads has only passing roads among its `m` closest executed
    /// roads.
    pub fn select(&self, min_ratio: f64, max_ratio: f64, m: usize, w: usize) -> Result<Vec<&Id>> {
        check_ratio_bounds(min_ratio, max_ratio)?;
        if self.selectable_count() == 0 {
            info!("no selectable roads, nothing to select");
            return Ok(Vec::new());
        }

        let mut session = self.session()?;
        let total_selectable = session.tree.selectable_count();
        let min_count = ((min_ratio * total_selectable as f64).floor() as usize).max(1);
        let max_count = ((max_ratio * total_selectable as f64).floor() as usize).max(1);

        let oracle_ids = session.oracle_ids();
        let oracle_count = oracle_ids.len();
        if m > oracle_count {
            warn!(
                m,
                oracle_count, "fewer executed roads than closest neighbour count, clamping"
            );
        }
        info!(
            roads = self.roads.len(),
            selectable = total_selectable,
            min_count,
            max_count,
            "starting selection"
        );

        let mut selected = Vec::with_capacity(max_count);
        let mut streak = 0;
        let reason = loop {
            if session.tree.selectable_count() == 0 {
                break StopReason::Exhausted;
            }
            let road = session.select_next()?;
            selected.push(road);

            if session.is_questionable(&oracle_ids, road, m) {
                streak += 1;
            } else {
                streak = 0;
            }

            if selected.len() == max_count {
                break StopReason::MaxCount;
            }
            if selected.len() >= min_count && streak >= w {
                break StopReason::Window;
            }
        };

        info!(selected = selected.len(), ?reason, "selection finished");
        Ok(selected.into_iter().map(|i| self.roads[i].id()).collect())
    }

    /// Orders `ratio` of the not-executed roads by priority. Equal bounds leave
    /// the windowed stop no room to fire.
    pub fn prioritize(&self, ratio: f64) -> Result<Vec<&Id>> {
        self.select(
            ratio,
            ratio,
            DEFAULT_M_CLOSEST_NEIGHBOR_COUNT,
            DEFAULT_W_SELECTION_THRESHOLD,
        )
    }
}

/// Mutable state of a single selection call.
pub struct SelectionSession<'a, Id> {
    roads: &'a [RoadTestCase<Id>],
    tree: AnnotatedTree,
    distances: DistanceTable,
    rng: StdRng,
}

impl<Id> SelectionSession<'_, Id> {
    pub fn tree(&self) -> &AnnotatedTree {
        &self.tree
    }

    pub fn distances(&self) -> &DistanceTable {
        &self.distances
    }

    /// Indices of executed roads.
    pub fn oracle_ids(&self) -> Vec<usize> {
        (0..self.roads.len())
            .filter(|&i| !self.roads[i].is_selectable())
            .collect()
    }

    /// Retrieves and consumes the next road, returning its index.
    pub fn select_next(&mut self) -> Result<usize> {
        let root = self.tree.root();
        let leaf = Retriever::new(&self.tree, &self.distances).retrieve(root, &mut self.rng)?;
        self.tree.consume(leaf);
        self.tree
            .road_of(leaf)
            .ok_or(DetourError::UndefinedSelection { node: leaf })
    }

    /// The `m` oracles closest to road `i`, nearest first. `m` is clamped to
    /// the number of oracles.
    pub fn m_closest_oracles(&self, oracle_ids: &[usize], i: usize, m: usize) -> Vec<usize> {
        let mut by_distance: Vec<(usize, f64)> = oracle_ids
            .iter()
            .map(|&oracle| (oracle, self.distances.get(i, oracle)))
            .collect();
        by_distance.sort_by_key(|&(_, d)| OrderedFloat(d));
        by_distance.into_iter().take(m).map(|(id, _)| id).collect()
    }

    /// Whether the closest oracles of road `i` are all passing.
    pub fn is_questionable(&self, oracle_ids: &[usize], i: usize, m: usize) -> bool {
        self.m_closest_oracles(oracle_ids, i, m)
            .into_iter()
            .all(|oracle| !self.roads[oracle].is_failing())
    }
}
