//! Picks one selectable leaf out of an annotated hierarchy.
//!
//! The descent favours branches with a high ratio of failing oracles, drawing
//! between the two children at random so that repeated retrievals stay diverse.
//! Once neither child holds both a failing oracle and a selectable road, the
//! selectable road closest to any failing oracle underneath wins.

use itertools::iproduct;
use rand::Rng;
use tracing::debug;

use crate::clustering::DistanceTable;
use crate::error::{DetourError, Result};
use crate::tree::{AnnotatedTree, NodeId};

#[derive(Debug, Clone, Copy)]
struct Branch {
    id: NodeId,
    fail_ratio: f64,
    has_failing: bool,
    has_selectable: bool,
}

impl Branch {
    fn of(tree: &AnnotatedTree, id: NodeId) -> Self {
        let node = tree.node(id);
        Self {
            id,
            fail_ratio: node.fail_ratio(),
            has_failing: node.fail_count > 0,
            has_selectable: node.selectable_count > 0,
        }
    }

    fn qualifies(&self) -> bool {
        self.has_failing && self.has_selectable
    }

    fn weight(&self) -> f64 {
        if self.has_selectable {
            self.fail_ratio
        } else {
            0.0
        }
    }
}

pub struct Retriever<'a> {
    tree: &'a AnnotatedTree,
    distances: &'a DistanceTable,
}

impl<'a> Retriever<'a> {
    pub fn new(tree: &'a AnnotatedTree, distances: &'a DistanceTable) -> Self {
        Self { tree, distances }
    }

    /// Returns a leaf beneath `start` whose road is still selectable. Counts are
    /// left untouched, consuming the leaf is up to the caller.
    pub fn retrieve<R: Rng + ?Sized>(&self, start: NodeId, rng: &mut R) -> Result<NodeId> {
        let mut current = start;
        loop {
            let Some((left, right)) = self.tree.children(current) else {
                return Ok(current);
            };
            let left = Branch::of(self.tree, left);
            let right = Branch::of(self.tree, right);

            if !(left.qualifies() || right.qualifies()) {
                return self.closest_to_failing(current);
            }

            let (left_weight, right_weight) = (left.weight(), right.weight());
            let take_left = rng.random_bool(left_weight / (left_weight + right_weight));
            debug!(
                node = current,
                left_weight, right_weight, take_left, "descending similarity tree"
            );
            current = if take_left { left.id } else { right.id };
        }
    }

    /// Selectable leaf under `root` that is nearest to a failing oracle under
    /// `root`. Ties keep the first (failing, selectable) pair in leaf order.
    fn closest_to_failing(&self, root: NodeId) -> Result<NodeId> {
        let leaves = self.tree.leaves_under(root);
        let selectables: Vec<NodeId> = leaves
            .iter()
            .copied()
            .filter(|&id| self.tree.node(id).selectable_count == 1)
            .collect();
        let failing: Vec<NodeId> = leaves
            .iter()
            .copied()
            .filter(|&id| self.tree.node(id).fail_count == 1)
            .collect();

        let distance = |&(f, s): &(NodeId, NodeId)| -> f64 {
            match (self.tree.road_of(f), self.tree.road_of(s)) {
                (Some(f), Some(s)) => self.distances.get(f, s),
                _ => f64::INFINITY,
            }
        };

        iproduct!(failing.iter().copied(), selectables.iter().copied())
            .min_by(|a, b| distance(a).total_cmp(&distance(b)))
            .map(|(_, selectable)| selectable)
            .ok_or(DetourError::UndefinedSelection { node: root })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::road::{Outcome, RoadTestCase};
    use crate::tree::Hierarchy;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn roads(outcomes: &[Outcome]) -> Vec<RoadTestCase<usize>> {
        outcomes
            .iter()
            .enumerate()
            .map(|(i, &o)| RoadTestCase::new(i, Vec::new(), o))
            .collect()
    }

    fn line_distances(positions: &[f64]) -> DistanceTable {
        let features: Vec<Vec<f64>> = positions.iter().map(|&p| vec![p]).collect();
        DistanceTable::from_features(&features).unwrap()
    }

    // (0, (1, 2)) with 0 failing, 1 and 2 selectable
    fn fallback_tree() -> AnnotatedTree {
        let mut h = Hierarchy::new();
        let l: Vec<NodeId> = (0..3).map(|r| h.push_leaf(r)).collect();
        let inner = h.push_internal(l[1], l[2]);
        let root = h.push_internal(l[0], inner);
        h.set_root(root);
        let roads = roads(&[Outcome::Failing, Outcome::Unknown, Outcome::Unknown]);
        AnnotatedTree::annotate(&h, &roads).unwrap()
    }

    #[test]
    fn test_fallback_picks_nearest_selectable() {
        let tree = fallback_tree();
        let distances = line_distances(&[0.0, 5.0, 1.0]);
        let retriever = Retriever::new(&tree, &distances);
        let mut rng = StdRng::seed_from_u64(0);
        let leaf = retriever.retrieve(tree.root(), &mut rng).unwrap();
        assert_eq!(tree.road_of(leaf), Some(2));
    }

    #[test]
    fn test_fallback_tie_keeps_first_pair() {
        let tree = fallback_tree();
        let distances = line_distances(&[0.0, 1.0, -1.0]);
        let retriever = Retriever::new(&tree, &distances);
        let mut rng = StdRng::seed_from_u64(0);
        let leaf = retriever.retrieve(tree.root(), &mut rng).unwrap();
        assert_eq!(tree.road_of(leaf), Some(1));
    }

    #[test]
    fn test_no_failing_oracle_is_undefined() {
        let mut h = Hierarchy::new();
        let a = h.push_leaf(0);
        let b = h.push_leaf(1);
        let root = h.push_internal(a, b);
        h.set_root(root);
        let tree =
            AnnotatedTree::annotate(&h, &roads(&[Outcome::Passing, Outcome::Unknown])).unwrap();
        let distances = line_distances(&[0.0, 1.0]);
        let mut rng = StdRng::seed_from_u64(0);
        let err = Retriever::new(&tree, &distances)
            .retrieve(tree.root(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, DetourError::UndefinedSelection { node } if node == root));
    }

    #[test]
    fn test_descends_only_into_weighted_side() {
        // ((F, S), (P, S)): only the left side has a failing oracle
        let mut h = Hierarchy::new();
        let l: Vec<NodeId> = (0..4).map(|r| h.push_leaf(r)).collect();
        let left = h.push_internal(l[0], l[1]);
        let right = h.push_internal(l[2], l[3]);
        let root = h.push_internal(left, right);
        h.set_root(root);
        let tree = AnnotatedTree::annotate(
            &h,
            &roads(&[
                Outcome::Failing,
                Outcome::Unknown,
                Outcome::Passing,
                Outcome::Unknown,
            ]),
        )
        .unwrap();
        let distances = line_distances(&[0.0, 1.0, 2.0, 3.0]);
        let retriever = Retriever::new(&tree, &distances);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let leaf = retriever.retrieve(tree.root(), &mut rng).unwrap();
            assert_eq!(tree.road_of(leaf), Some(1));
        }
    }

    #[test]
    fn test_retrieved_leaf_is_selectable() {
        // (((F, S), (F, S)), ((P, S), (F, S)))
        let outcomes = [
            Outcome::Failing,
            Outcome::Unknown,
            Outcome::Failing,
            Outcome::Unknown,
            Outcome::Passing,
            Outcome::Unknown,
            Outcome::Failing,
            Outcome::Unknown,
        ];
        let mut h = Hierarchy::new();
        let l: Vec<NodeId> = (0..8).map(|r| h.push_leaf(r)).collect();
        let pairs: Vec<NodeId> = l.chunks(2).map(|c| h.push_internal(c[0], c[1])).collect();
        let a = h.push_internal(pairs[0], pairs[1]);
        let b = h.push_internal(pairs[2], pairs[3]);
        let root = h.push_internal(a, b);
        h.set_root(root);
        let mut tree = AnnotatedTree::annotate(&h, &roads(&outcomes)).unwrap();
        let distances = line_distances(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);

        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = Vec::new();
        while tree.selectable_count() > 0 {
            let leaf = Retriever::new(&tree, &distances)
                .retrieve(tree.root(), &mut rng)
                .unwrap();
            assert_eq!(tree.node(leaf).selectable_count, 1);
            seen.push(tree.road_of(leaf).unwrap());
            tree.consume(leaf);
        }
        seen.sort();
        assert_eq!(seen, vec![1, 3, 5, 7]);
    }

    #[test]
    fn test_draw_follows_fail_ratio() {
        // ((F, S), ((F, P), S)): the left side has fail ratio 1, the right 1/2,
        // so the left selectable should come up two times out of three
        let mut h = Hierarchy::new();
        let l: Vec<NodeId> = (0..5).map(|r| h.push_leaf(r)).collect();
        let left = h.push_internal(l[0], l[1]);
        let inner = h.push_internal(l[2], l[3]);
        let right = h.push_internal(inner, l[4]);
        let root = h.push_internal(left, right);
        h.set_root(root);
        let tree = AnnotatedTree::annotate(
            &h,
            &roads(&[
                Outcome::Failing,
                Outcome::Unknown,
                Outcome::Failing,
                Outcome::Passing,
                Outcome::Unknown,
            ]),
        )
        .unwrap();
        let distances = line_distances(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let retriever = Retriever::new(&tree, &distances);

        let draws = 30_000;
        let mut rng = StdRng::seed_from_u64(1);
        let mut left_count = 0;
        for _ in 0..draws {
            let leaf = retriever.retrieve(tree.root(), &mut rng).unwrap();
            match tree.road_of(leaf) {
                Some(1) => left_count += 1,
                Some(4) => {}
                other => panic!("retrieved non-selectable road {other:?}"),
            }
        }
        let share = left_count as f64 / draws as f64;
        assert!((share - 2.0 / 3.0).abs() < 0.02, "left share {share}");
    }
}
