//! Serializable snapshots of the world for queries and debugging.

use serde::Serialize;

use super::client::Client;
use super::desktop::DesktopId;
use super::geometry::{Padding, Rect};
use super::tree::{Constraints, NodeId, Presel};
use super::world::World;
use crate::common::collections::HashMap;
use crate::layout_engine::{Layout, SplitMode, SplitType};

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorldState {
    pub focused_monitor_id: Option<u32>,
    pub primary_monitor_id: Option<u32>,
    pub clients_count: usize,
    pub monitors: Vec<MonitorState>,
    pub focus_history: Vec<HistoryState>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorState {
    pub name: String,
    pub id: u32,
    pub wired: bool,
    pub sticky_count: u32,
    pub window_gap: i32,
    pub border_width: u32,
    pub padding: Padding,
    pub rectangle: Rect,
    pub focused_desktop_id: Option<u32>,
    pub desktops: Vec<DesktopState>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DesktopState {
    pub name: String,
    pub id: u32,
    pub layout: Layout,
    pub user_layout: Layout,
    pub window_gap: i32,
    pub border_width: u32,
    pub padding: Padding,
    pub focused_node_id: Option<u32>,
    pub root: Option<NodeState>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeState {
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
    pub presel: Option<Presel>,
    pub rectangle: Rect,
    pub constraints: Constraints,
    pub first_child: Option<Box<NodeState>>,
    pub second_child: Option<Box<NodeState>>,
    pub client: Option<Client>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryState {
    pub monitor_id: u32,
    pub desktop_id: u32,
    pub node_id: Option<u32>,
}

impl World {
    pub fn query_state(&self) -> WorldState {
        let monitors = self
            .monitor_order
            .iter()
            .map(|&m| {
                let monitor = &self.monitors[m];
                MonitorState {
                    name: monitor.name.clone(),
                    id: monitor.id,
                    wired: monitor.wired,
                    sticky_count: monitor.sticky_count,
                    window_gap: monitor.window_gap,
                    border_width: monitor.border_width,
                    padding: monitor.padding,
                    rectangle: monitor.rectangle,
                    focused_desktop_id: monitor.desk.map(|d| self.desktops[d].id),
                    desktops: monitor.desktops.iter().map(|&d| self.desktop_state(d)).collect(),
                }
            })
            .collect();
        let focus_history = self
            .history
            .iter()
            .filter(|e| e.latest)
            .map(|e| HistoryState {
                monitor_id: self.monitors.get(e.monitor).map_or(0, |m| m.id),
                desktop_id: self.desktops.get(e.desktop).map_or(0, |d| d.id),
                node_id: e.node.and_then(|n| self.nodes.get(n)).map(|n| n.id),
            })
            .collect();
        WorldState {
            focused_monitor_id: self.mon.map(|m| self.monitors[m].id),
            primary_monitor_id: self.primary.map(|m| self.monitors[m].id),
            clients_count: self.clients_count,
            monitors,
            focus_history,
        }
    }

    pub fn query_state_json(&self) -> serde_json::Result<String> { serde_json::to_string_pretty(&self.query_state()) }

    fn desktop_state(&self, d: DesktopId) -> DesktopState {
        let desktop = &self.desktops[d];
        DesktopState {
            name: desktop.name.clone(),
            id: desktop.id,
            layout: desktop.layout,
            user_layout: desktop.user_layout,
            window_gap: desktop.window_gap,
            border_width: desktop.border_width,
            padding: desktop.padding,
            focused_node_id: desktop.focus.map(|n| self.nodes[n].id),
            root: desktop.root.and_then(|r| self.node_state(r)),
        }
    }

    /// Builds the nested state of the subtree `root` bottom-up.
    pub fn node_state(&self, root: NodeId) -> Option<NodeState> {
        let mut built: HashMap<NodeId, NodeState> = HashMap::default();
        for n in root.traverse_postorder(&self.nodes) {
            let node = &self.nodes[n];
            let mut take = |c: Option<NodeId>| c.and_then(|c| built.remove(&c)).map(Box::new);
            let (first_child, second_child) = (take(node.first_child), take(node.second_child));
            let state = NodeState {
                id: node.id,
                split_type: node.split_type,
                split_ratio: node.split_ratio,
                split_mode: node.split_mode,
                vacant: node.vacant,
                hidden: node.hidden,
                sticky: node.sticky,
                private: node.private,
                locked: node.locked,
                marked: node.marked,
                presel: node.presel,
                rectangle: node.rectangle,
                constraints: node.constraints,
                first_child,
                second_child,
                client: node.client.clone(),
            };
            built.insert(n, state);
        }
        built.remove(&root)
    }

    /// Renders the tree of `d` for debugging, marking the focused node.
    pub fn draw_tree(&self, d: DesktopId) -> Result<String, std::fmt::Error> {
        let Some(desktop) = self.desktops.get(d) else {
            return Ok(String::new());
        };
        let Some(root) = desktop.root else {
            return Ok(format!("{} (empty)\n", desktop.name));
        };
        let mut built: HashMap<NodeId, ascii_tree::Tree> = HashMap::default();
        for n in root.traverse_postorder(&self.nodes) {
            let node = &self.nodes[n];
            let mark = if desktop.focus == Some(n) { "☒ " } else { "☐ " };
            let r = node.rectangle;
            let desc = match &node.client {
                Some(c) => format!(
                    "{mark}{} {} {} {}x{}+{}+{}",
                    node.id, c.class_name, c.state, r.width, r.height, r.x, r.y
                ),
                None if node.is_leaf() => format!("{mark}{} receptacle", node.id),
                None => format!("{mark}{} {} {:.3}", node.id, node.split_type, node.split_ratio),
            };
            let children: Vec<_> = [node.first_child, node.second_child]
                .into_iter()
                .flatten()
                .filter_map(|c| built.remove(&c))
                .collect();
            let tree = if children.is_empty() {
                ascii_tree::Tree::Leaf(vec![desc])
            } else {
                ascii_tree::Tree::Node(desc, children)
            };
            built.insert(n, tree);
        }
        let mut out = String::new();
        if let Some(tree) = built.remove(&root) {
            ascii_tree::write_tree(&mut out, &tree)?;
        }
        Ok(out)
    }
}
