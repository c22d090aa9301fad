//! Structural edits that keep the set of leaves but change how they share space.

use tracing::{debug, instrument, trace};

use super::{CycleDir, Direction, Flip, Rotation, SplitType};
use crate::common::collections::HashMap;
use crate::model::error::{LayoutError, Result};
use crate::model::{Client, DesktopId, NodeId, World};

const EVEN_RATIO: f64 = 0.5;

impl World {
    /// Rotates every internal node of the subtree rooted at `n`.
    #[instrument(level = "debug", skip(self))]
    pub fn rotate_tree(&mut self, n: NodeId, rot: Rotation) -> Result<()> {
        self.node(n)?;
        self.rotate_subtree(n, rot);
        self.nodes.propagate_flags_upward(n);
        Ok(())
    }

    pub(crate) fn rotate_subtree(&mut self, n: NodeId, rot: Rotation) {
        let internal: Vec<NodeId> =
            n.traverse_preorder(&self.nodes).filter(|&c| !self.nodes[c].is_leaf()).collect();
        for c in internal {
            if rot.crosses(self.nodes[c].split_type) {
                self.nodes.swap_children(c);
                let node = &mut self.nodes[c];
                node.split_ratio = 1.0 - node.split_ratio;
            }
            if rot.toggles_split() {
                let node = &mut self.nodes[c];
                node.split_type = node.split_type.toggled();
            }
        }
        self.nodes.rebuild_constraints(n);
    }

    /// Mirrors the subtree rooted at `n` across `flip`.
    #[instrument(level = "debug", skip(self))]
    pub fn flip_tree(&mut self, n: NodeId, flip: Flip) -> Result<()> {
        self.node(n)?;
        let split = flip.split_type();
        let matching: Vec<NodeId> = n
            .traverse_preorder(&self.nodes)
            .filter(|&c| !self.nodes[c].is_leaf() && self.nodes[c].split_type == split)
            .collect();
        for c in matching {
            self.nodes.swap_children(c);
            let node = &mut self.nodes[c];
            node.split_ratio = 1.0 - node.split_ratio;
        }
        Ok(())
    }

    /// Resets the ratio of every occupied internal node under `n` to an even split.
    pub fn equalize_tree(&mut self, n: NodeId) -> Result<()> {
        self.node(n)?;
        let ratio = EVEN_RATIO;
        let mut stack = vec![n];
        while let Some(c) = stack.pop() {
            let node = &mut self.nodes[c];
            if node.vacant || node.is_leaf() {
                continue;
            }
            node.split_ratio = ratio;
            stack.extend(node.first_child);
            stack.extend(node.second_child);
        }
        Ok(())
    }

    /// Gives every occupied leaf under `n` the same share of space.
    ///
    /// Vacant subtrees weigh nothing; a node with an empty side keeps its ratio.
    pub fn balance_tree(&mut self, n: NodeId) -> Result<()> {
        self.node(n)?;
        let order: Vec<NodeId> = n.traverse_postorder(&self.nodes).collect();
        let mut weight = HashMap::default();
        for c in order {
            let node = &self.nodes[c];
            let w: u32 = if node.vacant {
                0
            } else {
                match (node.first_child, node.second_child) {
                    (Some(a), Some(b)) => {
                        let (wa, wb) = (weight[&a], weight[&b]);
                        if wa > 0 && wb > 0 {
                            self.nodes[c].split_ratio = wa as f64 / (wa + wb) as f64;
                        }
                        wa + wb
                    }
                    _ => 1,
                }
            };
            weight.insert(c, w);
        }
        trace!(leaves = weight.get(&n).copied().unwrap_or(0), "balanced");
        Ok(())
    }

    /// Moves the window of each tiled leaf under `n` one leaf along the leaf
    /// order. Leaf nodes keep their place and their own flags, so the tree
    /// shape is unchanged and focus stays in its slot.
    #[instrument(level = "debug", skip(self))]
    pub fn circulate_leaves(&mut self, d: DesktopId, n: NodeId, dir: CycleDir) -> Result<()> {
        self.check_member(d, n)?;
        let leaves: Vec<NodeId> = n
            .leaves(&self.nodes)
            .filter(|&f| self.nodes[f].is_tiled() && !self.nodes[f].hidden)
            .collect();
        let k = leaves.len();
        if k < 2 {
            return Ok(());
        }
        let mut payloads: Vec<(u32, Option<Client>)> = leaves
            .iter()
            .map(|&f| {
                let node = &mut self.nodes[f];
                (node.id, node.client.take())
            })
            .collect();
        match dir {
            CycleDir::Next => payloads.rotate_right(1),
            CycleDir::Prev => payloads.rotate_left(1),
        }
        for (&f, (id, client)) in leaves.iter().zip(payloads) {
            let node = &mut self.nodes[f];
            node.id = id;
            node.client = client;
        }
        self.nodes.rebuild_constraints(n);
        self.nodes.propagate_flags_upward(n);
        debug!(count = k, %dir, "circulated windows");
        Ok(())
    }

    pub fn set_ratio(&mut self, n: NodeId, ratio: f64) -> Result<()> {
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(LayoutError::InvalidRatio(ratio));
        }
        self.node_mut(n)?.split_ratio = ratio;
        Ok(())
    }

    /// The closest ancestor of `n` whose split line borders `n` on side `dir`.
    pub fn find_fence(&self, n: NodeId, dir: Direction) -> Option<NodeId> {
        let r = self.nodes.get(n)?.rectangle;
        n.ancestors(&self.nodes).skip(1).find(|&p| {
            let node = &self.nodes[p];
            let pr = node.rectangle;
            match (dir, node.split_type) {
                (Direction::North, SplitType::Horizontal) => pr.y < r.y,
                (Direction::South, SplitType::Horizontal) => pr.bottom() > r.bottom(),
                (Direction::West, SplitType::Vertical) => pr.x < r.x,
                (Direction::East, SplitType::Vertical) => pr.right() > r.right(),
                _ => false,
            }
        })
    }

    /// Grows `n` by `delta` pixels on side `dir` by moving the bordering fence.
    /// Negative deltas shrink it.
    #[instrument(level = "debug", skip(self))]
    pub fn resize_fence(&mut self, n: NodeId, dir: Direction, delta: i32) -> Result<()> {
        self.node(n)?;
        let fence = self.find_fence(n, dir).ok_or(LayoutError::NoFence)?;
        let node = &self.nodes[fence];
        let (a, b) = match (node.first_child, node.second_child) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(LayoutError::NoFence),
        };
        let (total, min_first, min_second) = match node.split_type {
            SplitType::Vertical => (
                node.rectangle.width as i32,
                self.nodes[a].constraints.min_width as i32,
                self.nodes[b].constraints.min_width as i32,
            ),
            SplitType::Horizontal => (
                node.rectangle.height as i32,
                self.nodes[a].constraints.min_height as i32,
                self.nodes[b].constraints.min_height as i32,
            ),
        };
        let shift = if dir.is_leading() { -delta } else { delta };
        let first = (total as f64 * node.split_ratio) as i32 + shift;
        if total <= 0 || first < min_first || total - first < min_second || first <= 0 || first >= total {
            debug!(first, total, "resize rejected");
            return Err(LayoutError::ConstraintViolation);
        }
        self.nodes[fence].split_ratio = first as f64 / total as f64;
        Ok(())
    }
}
