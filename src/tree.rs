//! Arena-backed similarity hierarchy.
//!
//! A [`Hierarchy`] is the bare binary tree handed back by a clustering step.
//! [`AnnotatedTree`] adds, for every node, how many failing oracles and how many
//! still selectable roads live beneath it, plus a parent link so that consuming
//! a leaf can update its ancestors. Nodes are addressed by index into the arena,
//! and every traversal uses an explicit stack since agglomerative trees can be
//! arbitrarily deep.

use crate::error::{DetourError, Result};
use crate::road::RoadTestCase;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Holds the index of the road in the combined road list.
    Leaf { road: usize },
    Internal { left: NodeId, right: NodeId },
}

#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    nodes: Vec<(NodeKind, usize)>,
    root: NodeId,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_leaf(&mut self, road: usize) -> NodeId {
        self.nodes.push((NodeKind::Leaf { road }, 1));
        self.nodes.len() - 1
    }

    /// Both children must already be in the arena.
    pub fn push_internal(&mut self, left: NodeId, right: NodeId) -> NodeId {
        let leaf_count = self.nodes[left].1 + self.nodes[right].1;
        self.nodes.push((NodeKind::Internal { left, right }, leaf_count));
        self.nodes.len() - 1
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id].0
    }

    pub fn leaf_count(&self, id: NodeId) -> usize {
        self.nodes[id].1
    }
}

#[derive(Debug, Clone)]
pub struct HierarchyNode {
    pub kind: NodeKind,
    pub leaf_count: usize,
    pub fail_count: usize,
    /// Live count, decremented as leaves get consumed.
    pub selectable_count: usize,
    pub parent: Option<NodeId>,
}

impl HierarchyNode {
    pub fn is_leaf(&self) -> bool {
        self.leaf_count == 1
    }

    /// Executed roads beneath this node, counting consumed selections as well.
    pub fn oracle_count(&self) -> usize {
        self.leaf_count - self.selectable_count
    }

    pub fn fail_ratio(&self) -> f64 {
        let oracles = self.oracle_count();
        if oracles > 0 {
            self.fail_count as f64 / oracles as f64
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnnotatedTree {
    nodes: Vec<HierarchyNode>,
    root: NodeId,
}

impl AnnotatedTree {
    /// Walks the hierarchy once, bottom up, attaching failing and selectable
    /// counts taken from `roads` (indexed the same way the hierarchy leaves are).
    pub fn annotate<Id>(hierarchy: &Hierarchy, roads: &[RoadTestCase<Id>]) -> Result<Self> {
        if hierarchy.is_empty() {
            return Err(DetourError::Configuration(
                "cannot annotate an empty hierarchy".to_string(),
            ));
        }

        let mut nodes: Vec<HierarchyNode> = (0..hierarchy.len())
            .map(|id| HierarchyNode {
                kind: hierarchy.kind(id),
                leaf_count: hierarchy.leaf_count(id),
                fail_count: 0,
                selectable_count: 0,
                parent: None,
            })
            .collect();

        // Post-order: a node is finalized when popped the second time
        let mut stack = vec![(hierarchy.root(), false)];
        while let Some((id, children_done)) = stack.pop() {
            let kind = nodes[id].kind;
            match kind {
                NodeKind::Leaf { road } => {
                    let road = roads.get(road).ok_or_else(|| {
                        DetourError::Configuration(format!(
                            "hierarchy leaf {id} refers to road {road}, only {} roads given",
                            roads.len()
                        ))
                    })?;
                    nodes[id].fail_count = usize::from(road.is_failing());
                    nodes[id].selectable_count = usize::from(road.is_selectable());
                }
                NodeKind::Internal { left, right } if children_done => {
                    nodes[id].fail_count = nodes[left].fail_count + nodes[right].fail_count;
                    nodes[id].selectable_count =
                        nodes[left].selectable_count + nodes[right].selectable_count;
                }
                NodeKind::Internal { left, right } => {
                    nodes[left].parent = Some(id);
                    nodes[right].parent = Some(id);
                    stack.push((id, true));
                    stack.push((right, false));
                    stack.push((left, false));
                }
            }
        }

        Ok(Self {
            nodes,
            root: hierarchy.root(),
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &HierarchyNode {
        &self.nodes[id]
    }

    pub fn children(&self, id: NodeId) -> Option<(NodeId, NodeId)> {
        match self.nodes[id].kind {
            NodeKind::Internal { left, right } => Some((left, right)),
            NodeKind::Leaf { .. } => None,
        }
    }

    pub fn road_of(&self, id: NodeId) -> Option<usize> {
        match self.nodes[id].kind {
            NodeKind::Leaf { road } => Some(road),
            NodeKind::Internal { .. } => None,
        }
    }

    pub fn selectable_count(&self) -> usize {
        self.nodes[self.root].selectable_count
    }

    /// Leaves beneath `id`, left to right.
    pub fn leaves_under(&self, id: NodeId) -> Vec<NodeId> {
        let mut leaves = Vec::with_capacity(self.nodes[id].leaf_count);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match self.nodes[current].kind {
                NodeKind::Leaf { .. } => leaves.push(current),
                NodeKind::Internal { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        leaves
    }

    /// Marks a selected leaf as consumed on the leaf and all its ancestors.
    pub fn consume(&mut self, leaf: NodeId) {
        let mut current = Some(leaf);
        while let Some(id) = current {
            let node = &mut self.nodes[id];
            node.selectable_count = node.selectable_count.saturating_sub(1);
            current = node.parent;
        }
    }
}
