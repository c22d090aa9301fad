use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use super::client::Client;
use super::geometry::Rect;
use crate::layout_engine::{Direction, SplitMode, SplitType};

pub const MIN_WIDTH: u16 = 32;
pub const MIN_HEIGHT: u16 = 32;

/// Minimum footprint of a subtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    pub min_width: u16,
    pub min_height: u16,
}

impl Default for Constraints {
    fn default() -> Self {
        Constraints {
            min_width: MIN_WIDTH,
            min_height: MIN_HEIGHT,
        }
    }
}

impl Constraints {
    /// Aggregate of two children split along `split`.
    pub fn combine(split: SplitType, a: Constraints, b: Constraints) -> Constraints {
        match split {
            SplitType::Vertical => Constraints {
                min_width: a.min_width.saturating_add(b.min_width),
                min_height: a.min_height.max(b.min_height),
            },
            SplitType::Horizontal => Constraints {
                min_width: a.min_width.max(b.min_width),
                min_height: a.min_height.saturating_add(b.min_height),
            },
        }
    }
}

/// Pending split attached to a node, consumed by the next insertion there.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presel {
    pub split_dir: Direction,
    pub split_ratio: f64,
}

/// Element of a desktop's binary layout tree.
///
/// A node is either internal, with exactly two children and no client, or a
/// leaf holding zero or one client. A leaf without a client is a receptacle.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: u32,
    pub split_type: SplitType,
    pub split_ratio: f64,
    pub split_mode: SplitMode,
    pub vacant: bool,
    pub hidden: bool,
    pub sticky: bool,
    pub private: bool,
    pub locked: bool,
    pub marked: bool,
    pub constraints: Constraints,
    pub rectangle: Rect,
    pub presel: Option<Presel>,
    pub client: Option<Client>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,
    pub(crate) second_child: Option<NodeId>,
}

impl Node {
    pub fn new(id: u32, split_ratio: f64) -> Node {
        Node {
            id,
            split_type: SplitType::Vertical,
            split_ratio,
            split_mode: SplitMode::Automatic,
            vacant: false,
            hidden: false,
            sticky: false,
            private: false,
            locked: false,
            marked: false,
            constraints: Constraints::default(),
            rectangle: Rect::default(),
            presel: None,
            client: None,
            parent: None,
            first_child: None,
            second_child: None,
        }
    }

    pub fn is_leaf(&self) -> bool { self.first_child.is_none() && self.second_child.is_none() }

    pub fn is_receptacle(&self) -> bool { self.is_leaf() && self.client.is_none() }

    pub fn is_tiled(&self) -> bool { self.client.as_ref().is_some_and(|c| c.is_tiled()) }

    /// Vacancy of a leaf as derived from its own state.
    pub(crate) fn leaf_vacancy(&self) -> bool {
        self.hidden || self.client.as_ref().is_some_and(|c| !c.is_tiled())
    }

    pub(crate) fn leaf_constraints(&self) -> Constraints {
        let mut c = Constraints::default();
        if let Some(client) = &self.client {
            if let Some((w, h)) = client.size_hints.min_size {
                c.min_width = c.min_width.max(w);
                c.min_height = c.min_height.max(h);
            }
        }
        c
    }
}

slotmap::new_key_type! {
    /// Handle to a node of some desktop's tree.
    pub struct NodeId;
}

/// Arena holding the nodes of every desktop tree.
#[derive(Default)]
pub struct NodeMap {
    map: SlotMap<NodeId, Node>,
}

impl NodeMap {
    pub fn new() -> NodeMap { NodeMap { map: SlotMap::default() } }

    pub fn len(&self) -> usize { self.map.len() }

    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    pub fn contains(&self, id: NodeId) -> bool { self.map.contains_key(id) }

    pub fn get(&self, id: NodeId) -> Option<&Node> { self.map.get(id) }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> { self.map.get_mut(id) }

    pub(crate) fn insert(&mut self, node: Node) -> NodeId { self.map.insert(node) }

    /// The node carrying the external identifier `id`.
    pub fn find_id(&self, id: u32) -> Option<NodeId> {
        self.map.iter().find(|(_, node)| node.id == id).map(|(n, _)| n)
    }

    /// Frees every node of the subtree rooted at `root`, returning them in post-order.
    pub(crate) fn remove_subtree(&mut self, root: NodeId) -> Vec<Node> {
        let ids: Vec<NodeId> = root.traverse_postorder(self).collect();
        ids.into_iter().filter_map(|id| self.map.remove(id)).collect()
    }

    /// Points the slot that holds `old` (a child of `parent`) at `new`.
    ///
    /// Returns false when `old` has no parent; the caller owns the root slot.
    pub(crate) fn replace_child(&mut self, old: NodeId, new: NodeId) -> bool {
        let Some(p) = old.parent(self) else {
            return false;
        };
        let parent = &mut self.map[p];
        if parent.first_child == Some(old) {
            parent.first_child = Some(new);
        } else {
            parent.second_child = Some(new);
        }
        self.map[new].parent = Some(p);
        true
    }

    pub(crate) fn swap_children(&mut self, n: NodeId) {
        let node = &mut self.map[n];
        std::mem::swap(&mut node.first_child, &mut node.second_child);
    }

    /// Recomputes the constraints of `n` from its children.
    pub(crate) fn update_constraints(&mut self, n: NodeId) {
        let node = &self.map[n];
        let constraints = match (node.first_child, node.second_child) {
            (Some(a), Some(b)) => Constraints::combine(
                node.split_type,
                self.map[a].constraints,
                self.map[b].constraints,
            ),
            _ => node.leaf_constraints(),
        };
        self.map[n].constraints = constraints;
    }

    /// Recomputes constraints for the whole subtree rooted at `n`.
    pub(crate) fn rebuild_constraints(&mut self, n: NodeId) {
        let ids: Vec<NodeId> = n.traverse_postorder(self).collect();
        for id in ids {
            self.update_constraints(id);
        }
    }

    /// Refreshes vacancy, hidden state and constraints of every ancestor of `n`.
    pub(crate) fn propagate_flags_upward(&mut self, n: NodeId) {
        let mut cur = n.parent(self);
        while let Some(p) = cur {
            let (a, b) = self.children(p);
            let vacant = self.map[a].vacant && self.map[b].vacant;
            let hidden = self.map[a].hidden && self.map[b].hidden;
            let node = &mut self.map[p];
            node.vacant = vacant;
            node.hidden = hidden;
            self.update_constraints(p);
            cur = p.parent(self);
        }
    }

    /// Re-derives the vacancy of leaf `n` and propagates it upward.
    pub(crate) fn refresh_vacancy(&mut self, n: NodeId) {
        if n.is_leaf(self) {
            let vacant = self.map[n].leaf_vacancy();
            self.map[n].vacant = vacant;
        }
        self.update_constraints(n);
        self.propagate_flags_upward(n);
    }

    #[track_caller]
    fn children(&self, n: NodeId) -> (NodeId, NodeId) {
        let node = &self.map[n];
        match (node.first_child, node.second_child) {
            (Some(a), Some(b)) => (a, b),
            _ => panic!("internal node {n:?} without two children"),
        }
    }
}

impl Index<NodeId> for NodeMap {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output { &self.map[index] }
}

impl IndexMut<NodeId> for NodeMap {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output { &mut self.map[index] }
}

impl NodeId {
    pub fn parent(self, map: &NodeMap) -> Option<NodeId> { map.get(self).and_then(|n| n.parent) }

    pub fn first_child(self, map: &NodeMap) -> Option<NodeId> {
        map.get(self).and_then(|n| n.first_child)
    }

    pub fn second_child(self, map: &NodeMap) -> Option<NodeId> {
        map.get(self).and_then(|n| n.second_child)
    }

    pub fn is_leaf(self, map: &NodeMap) -> bool { map.get(self).is_some_and(|n| n.is_leaf()) }

    pub fn is_first_child(self, map: &NodeMap) -> bool {
        self.parent(map).is_some_and(|p| p.first_child(map) == Some(self))
    }

    pub fn is_second_child(self, map: &NodeMap) -> bool {
        self.parent(map).is_some_and(|p| p.second_child(map) == Some(self))
    }

    /// The other child of this node's parent.
    pub fn brother(self, map: &NodeMap) -> Option<NodeId> {
        let p = self.parent(map)?;
        if p.first_child(map) == Some(self) {
            p.second_child(map)
        } else {
            p.first_child(map)
        }
    }

    /// Returns an iterator over all ancestors of the current node, including itself.
    pub fn ancestors(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let mut next = Some(self);
        std::iter::from_fn(move || {
            let node = next;
            next = node.and_then(|n| n.parent(map));
            node
        })
    }

    pub fn is_descendant_of(self, ancestor: NodeId, map: &NodeMap) -> bool {
        self.ancestors(map).any(|a| a == ancestor)
    }

    pub fn first_extrema(self, map: &NodeMap) -> NodeId {
        let mut n = self;
        while let Some(c) = n.first_child(map) {
            n = c;
        }
        n
    }

    pub fn second_extrema(self, map: &NodeMap) -> NodeId {
        let mut n = self;
        while let Some(c) = n.second_child(map) {
            n = c;
        }
        n
    }

    /// The leaf following this one within the subtree rooted at `root`.
    pub fn next_leaf(self, root: NodeId, map: &NodeMap) -> Option<NodeId> {
        let mut p = self;
        while p != root && p.is_second_child(map) {
            p = p.parent(map)?;
        }
        if p == root {
            return None;
        }
        Some(p.parent(map)?.second_child(map)?.first_extrema(map))
    }

    /// The leaf preceding this one within the subtree rooted at `root`.
    pub fn prev_leaf(self, root: NodeId, map: &NodeMap) -> Option<NodeId> {
        let mut p = self;
        while p != root && p.is_first_child(map) {
            p = p.parent(map)?;
        }
        if p == root {
            return None;
        }
        Some(p.parent(map)?.first_child(map)?.second_extrema(map))
    }

    /// In-order successor over the whole tree, internal nodes included.
    pub fn next_node(self, map: &NodeMap) -> Option<NodeId> {
        if let Some(c) = self.second_child(map) {
            return Some(c.first_extrema(map));
        }
        let mut p = self;
        while p.is_second_child(map) {
            p = p.parent(map)?;
        }
        if p.is_first_child(map) { p.parent(map) } else { None }
    }

    /// In-order predecessor over the whole tree, internal nodes included.
    pub fn prev_node(self, map: &NodeMap) -> Option<NodeId> {
        if let Some(c) = self.first_child(map) {
            return Some(c.second_extrema(map));
        }
        let mut p = self;
        while p.is_first_child(map) {
            p = p.parent(map)?;
        }
        if p.is_second_child(map) { p.parent(map) } else { None }
    }

    pub fn leaves(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let mut next = Some(self.first_extrema(map));
        std::iter::from_fn(move || {
            let leaf = next?;
            next = leaf.next_leaf(self, map);
            Some(leaf)
        })
    }

    pub fn traverse_preorder(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        PreorderTraversal { top: self, cur: Some(self), map }
    }

    pub fn traverse_postorder(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        PostorderTraversal {
            top: self,
            cur: Some(self.first_extrema(map)),
            map,
        }
    }

    /// Nodes of the subtree in in-order sequence.
    pub fn traverse_inorder(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let last = self.second_extrema(map);
        let mut next = Some(self.first_extrema(map));
        std::iter::from_fn(move || {
            let node = next?;
            next = if node == last { None } else { node.next_node(map) };
            Some(node)
        })
    }
}

struct PreorderTraversal<'a> {
    top: NodeId,
    cur: Option<NodeId>,
    map: &'a NodeMap,
}

impl<'a> Iterator for PreorderTraversal<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cur?;
        if let Some(child) = node.first_child(self.map) {
            self.cur = Some(child);
        } else {
            self.cur = None;
            for ancestor in node.ancestors(self.map) {
                if ancestor == self.top {
                    break;
                }
                if ancestor.is_first_child(self.map) {
                    self.cur = ancestor.brother(self.map);
                    break;
                }
            }
        }
        Some(node)
    }
}

struct PostorderTraversal<'a> {
    top: NodeId,
    cur: Option<NodeId>,
    map: &'a NodeMap,
}

impl<'a> Iterator for PostorderTraversal<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cur?;
        self.cur = None;
        if node != self.top {
            if node.is_first_child(self.map) {
                self.cur = node.brother(self.map).map(|b| b.first_extrema(self.map));
            } else {
                self.cur = node.parent(self.map);
            }
        }
        Some(node)
    }
}
