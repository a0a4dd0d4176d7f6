use std::sync::Arc;

use ahash::{HashMap, HashMapExt};
use smallvec::SmallVec;
use tracing::{error, warn};

use crate::drawable::Drawable;
use crate::error::DrawError;
use crate::id::StateSetId;
use crate::render_leaf::{LeafTransforms, RenderBin, RenderLeaf};
use crate::state::State;
use crate::state_set::{RenderingHint, StateSet};

use crate::util::trim_vector_if_needed;

/// Leaves a single node may keep allocated across a reset.
pub const DEFAULT_MAX_RETAINED_LEAF_CAPACITY: usize = 4_096;

/// Position of a leaf inside the graph: owning node plus insertion index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeafRef {
    pub node: usize,
    pub index: usize,
}

/// One distinct state set at one position of the effective-state hierarchy.
#[derive(Debug)]
pub struct StateGraphNode {
    state_set: Option<Arc<StateSet>>,
    children: HashMap<StateSetId, usize>,
    leaves: Vec<RenderLeaf>,
    active: bool,
}

impl StateGraphNode {
    fn new(state_set: Option<Arc<StateSet>>) -> Self {
        Self {
            state_set,
            children: HashMap::new(),
            leaves: Vec::new(),
            active: false,
        }
    }

    pub fn state_set(&self) -> Option<&StateSet> {
        self.state_set.as_deref()
    }

    pub fn leaves(&self) -> &[RenderLeaf] {
        &self.leaves
    }

    /// `true` when a leaf was attached to this node or below it since the
    /// last reset.
    pub fn is_active(&self) -> bool {
        self.active
    }

    fn clear_frame_state(&mut self, max_leaf_capacity: usize) {
        self.leaves.clear();
        self.active = false;
        trim_vector_if_needed(&mut self.leaves, max_leaf_capacity);
    }
}

/// Tree of state sets built during cull, stored in an arena so node ids stay
/// valid for as long as the structure is kept.
///
/// Node 0 is the root and carries no state set. Children are keyed by state
/// set identity: attaching through the same `Arc<StateSet>` twice lands on
/// the same node, two separately built state sets never share one.
pub struct StateGraph {
    tree: easy_tree::Tree<StateGraphNode>,
}

impl StateGraph {
    pub const ROOT: usize = 0;

    pub fn new() -> Self {
        let mut tree = easy_tree::Tree::new();
        tree.add_node(StateGraphNode::new(None));
        Self { tree }
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.len() <= 1
    }

    pub fn node(&self, index: usize) -> Result<&StateGraphNode, DrawError> {
        self.tree.get(index).ok_or(DrawError::MissingNode(index))
    }

    fn node_mut(&mut self, index: usize) -> Result<&mut StateGraphNode, DrawError> {
        self.tree.get_mut(index).ok_or(DrawError::MissingNode(index))
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        if index >= self.tree.len() {
            return None;
        }
        self.tree.parent_index_unchecked(index)
    }

    pub fn children(&self, index: usize) -> &[usize] {
        if index >= self.tree.len() {
            return &[];
        }
        self.tree.children(index)
    }

    pub fn find_child(&self, parent: usize, state_set: StateSetId) -> Option<usize> {
        self.tree
            .get(parent)
            .and_then(|node| node.children.get(&state_set).copied())
    }

    /// Returns the child of `parent` that represents `state_set`, creating and
    /// linking it on first use.
    pub fn get_or_create_child(
        &mut self,
        parent: usize,
        state_set: &Arc<StateSet>,
    ) -> Result<usize, DrawError> {
        if let Some(child) = self.node(parent)?.children.get(&state_set.id()) {
            return Ok(*child);
        }

        let child = self
            .tree
            .add_child(parent, StateGraphNode::new(Some(Arc::clone(state_set))));
        self.node_mut(parent)?.children.insert(state_set.id(), child);
        Ok(child)
    }

    /// Resolves the node for `chain` (outermost state set first), creating
    /// missing nodes along the way.
    pub fn find_or_insert(&mut self, chain: &[Arc<StateSet>]) -> Result<usize, DrawError> {
        chain
            .iter()
            .try_fold(Self::ROOT, |node, state_set| {
                self.get_or_create_child(node, state_set)
            })
    }

    /// Appends a leaf to `node` and marks the path to the root active.
    pub fn attach_leaf(
        &mut self,
        node: usize,
        drawable: Arc<dyn Drawable>,
        transforms: LeafTransforms,
        depth: f32,
        bin: RenderBin,
    ) -> Result<LeafRef, DrawError> {
        let target = self.node_mut(node)?;
        let index = target.leaves.len();
        target
            .leaves
            .push(RenderLeaf::new(node, drawable, transforms, depth, bin));

        let mut current = Some(node);
        while let Some(ancestor) = current {
            let entry = self.node_mut(ancestor)?;
            if entry.active {
                break;
            }
            entry.active = true;
            current = self.parent(ancestor);
        }

        Ok(LeafRef { node, index })
    }

    /// Cull-side entry point: resolve the node for `chain` and attach a leaf
    /// to it. The bin comes from the innermost state set with a hint.
    pub fn attach(
        &mut self,
        chain: &[Arc<StateSet>],
        drawable: Arc<dyn Drawable>,
        transforms: LeafTransforms,
        depth: f32,
    ) -> Result<LeafRef, DrawError> {
        let node = self.find_or_insert(chain)?;
        self.attach_leaf(node, drawable, transforms, depth, bin_for_chain(chain))
    }

    pub fn leaf(&self, leaf: LeafRef) -> Result<&RenderLeaf, DrawError> {
        self.node(leaf.node)?
            .leaves
            .get(leaf.index)
            .ok_or(DrawError::MissingLeafOwner {
                leaf: leaf.index,
                node: leaf.node,
            })
    }

    pub fn leaf_count(&self) -> usize {
        (0..self.tree.len())
            .filter_map(|index| self.tree.get(index))
            .map(|node| node.leaves.len())
            .sum()
    }

    /// Drops every leaf and active marker. Nodes and their links stay, so
    /// the next frame reuses them without allocating.
    pub fn reset(&mut self) {
        self.reset_with_policy(DEFAULT_MAX_RETAINED_LEAF_CAPACITY);
    }

    /// Like [`StateGraph::reset`], releasing leaf storage above
    /// `max_leaf_capacity` per node.
    pub fn reset_with_policy(&mut self, max_leaf_capacity: usize) {
        for index in 0..self.tree.len() {
            if let Some(node) = self.tree.get_mut(index) {
                node.clear_frame_state(max_leaf_capacity);
            }
        }
    }

    /// Throws the whole structure away, keeping only a fresh root.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Number of edges between `index` and the root.
    pub fn depth(&self, index: usize) -> Result<usize, DrawError> {
        self.node(index)?;

        let mut depth = 0;
        let mut current = index;
        while let Some(parent) = self.tree.parent_index_unchecked(current) {
            depth += 1;
            if depth >= self.tree.len() {
                error!(node = index, "state graph ancestor chain does not terminate");
                return Err(DrawError::AncestorCycle(index));
            }
            current = parent;
        }
        Ok(depth)
    }

    /// Nearest node that is an ancestor of (or equal to) both inputs. An
    /// absent input has no ancestry, which makes the root the answer.
    pub fn find_common_ancestor(
        &self,
        a: Option<usize>,
        b: Option<usize>,
    ) -> Result<usize, DrawError> {
        let (Some(mut a), Some(mut b)) = (a, b) else {
            return Ok(Self::ROOT);
        };

        let mut depth_a = self.depth(a)?;
        let mut depth_b = self.depth(b)?;
        while depth_a > depth_b {
            a = self.parent(a).ok_or(DrawError::AncestorCycle(a))?;
            depth_a -= 1;
        }
        while depth_b > depth_a {
            b = self.parent(b).ok_or(DrawError::AncestorCycle(b))?;
            depth_b -= 1;
        }
        while a != b {
            a = self.parent(a).ok_or(DrawError::AncestorCycle(a))?;
            b = self.parent(b).ok_or(DrawError::AncestorCycle(b))?;
        }
        Ok(a)
    }

    /// Rewinds the pushed state sets from `from` to the common ancestor, then
    /// pushes the state sets from there down to `to`.
    ///
    /// `from` must be the node whose chain is currently pushed on `state`.
    /// Nodes without a state set contribute nothing in either direction.
    pub fn move_state_graph(
        &self,
        state: &mut State,
        from: Option<usize>,
        to: Option<usize>,
    ) -> Result<(), DrawError> {
        if from == to {
            return Ok(());
        }

        let ancestor = self.find_common_ancestor(from, to)?;

        let mut current = from;
        while let Some(index) = current {
            if index == ancestor {
                break;
            }
            if self.node(index)?.state_set.is_some() {
                state.pop_state_set()?;
            }
            current = self.parent(index);
        }

        let mut path: SmallVec<[usize; 16]> = SmallVec::new();
        let mut current = to;
        while let Some(index) = current {
            if index == ancestor {
                break;
            }
            path.push(index);
            current = self.parent(index);
        }

        for index in path.iter().rev() {
            if let Some(state_set) = &self.node(*index)?.state_set {
                state.push_state_set(Arc::clone(state_set));
            }
        }

        Ok(())
    }

    /// Depth-first walk over active nodes, emitting the leaves of `bin` in
    /// insertion order per node. Siblings are visited in creation order.
    pub fn flatten_into(&self, bin: RenderBin, out: &mut Vec<LeafRef>) -> Result<(), DrawError> {
        let mut stack: SmallVec<[usize; 32]> = SmallVec::new();
        stack.push(Self::ROOT);

        while let Some(index) = stack.pop() {
            let node = self.node(index)?;
            if !node.active {
                continue;
            }

            out.extend(
                node.leaves
                    .iter()
                    .enumerate()
                    .filter(|(_, leaf)| leaf.bin() == bin)
                    .map(|(leaf_index, _)| LeafRef {
                        node: index,
                        index: leaf_index,
                    }),
            );

            stack.extend(self.children(index).iter().rev().copied());
        }

        Ok(())
    }

    /// Rebuilds the structure from scratch when it grew past `max_nodes`.
    /// Returns whether it did.
    pub fn trim_to_policy(&mut self, max_nodes: usize) -> bool {
        if self.tree.len() <= max_nodes {
            return false;
        }
        warn!(
            nodes = self.tree.len(),
            max_nodes, "state graph exceeded retained node policy, rebuilding"
        );
        self.clear();
        true
    }
}

impl Default for StateGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// The innermost state set with an explicit hint decides the bin.
pub fn bin_for_chain(chain: &[Arc<StateSet>]) -> RenderBin {
    chain
        .iter()
        .rev()
        .find_map(|state_set| match state_set.rendering_hint() {
            RenderingHint::Default => None,
            RenderingHint::Opaque => Some(RenderBin::Opaque),
            RenderingHint::Transparent => Some(RenderBin::Transparent),
        })
        .unwrap_or(RenderBin::Opaque)
}
