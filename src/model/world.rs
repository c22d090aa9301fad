use slotmap::SlotMap;

use super::client::Client;
use super::desktop::{Desktop, DesktopId};
use super::error::{LayoutError, Result};
use super::geometry::Rect;
use super::history::History;
use super::monitor::{Monitor, MonitorId};
use super::selector::Coordinates;
use super::tree::{Node, NodeId, NodeMap};
use crate::common::config::Settings;
use crate::layout_engine::Layout;

/// Supplies identifiers for nodes, desktops and monitors that do not come
/// with one from the window system.
pub trait IdSource {
    fn next_id(&mut self) -> u32;
}

/// Hands out increasing identifiers starting after `0`.
#[derive(Debug, Default)]
pub struct SequentialIds(u32);

impl SequentialIds {
    pub fn starting_at(first: u32) -> Self { SequentialIds(first.saturating_sub(1)) }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> u32 {
        self.0 = self.0.wrapping_add(1).max(1);
        self.0
    }
}

/// All layout state: monitors, their desktops, every desktop tree and the
/// focus history.
pub struct World {
    pub nodes: NodeMap,
    pub desktops: SlotMap<DesktopId, Desktop>,
    pub monitors: SlotMap<MonitorId, Monitor>,
    /// Monitors in reading order of their rectangles.
    pub monitor_order: Vec<MonitorId>,
    /// The focused monitor.
    pub mon: Option<MonitorId>,
    pub primary: Option<MonitorId>,
    pub history: History,
    pub settings: Settings,
    pub clients_count: usize,
    ids: Box<dyn IdSource>,
}

impl World {
    pub fn new(settings: Settings) -> World {
        World::with_id_source(settings, Box::new(SequentialIds::default()))
    }

    pub fn with_id_source(settings: Settings, ids: Box<dyn IdSource>) -> World {
        World {
            nodes: NodeMap::new(),
            desktops: SlotMap::default(),
            monitors: SlotMap::default(),
            monitor_order: Vec::new(),
            mon: None,
            primary: None,
            history: History::new(settings.record_history),
            settings,
            clients_count: 0,
            ids,
        }
    }

    pub fn next_id(&mut self) -> u32 { self.ids.next_id() }

    pub fn node(&self, n: NodeId) -> Result<&Node> { self.nodes.get(n).ok_or(LayoutError::StaleNode(n)) }

    pub fn node_mut(&mut self, n: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(n).ok_or(LayoutError::StaleNode(n))
    }

    pub fn desktop(&self, d: DesktopId) -> Result<&Desktop> {
        self.desktops.get(d).ok_or(LayoutError::StaleDesktop(d))
    }

    pub fn desktop_mut(&mut self, d: DesktopId) -> Result<&mut Desktop> {
        self.desktops.get_mut(d).ok_or(LayoutError::StaleDesktop(d))
    }

    pub fn monitor(&self, m: MonitorId) -> Result<&Monitor> {
        self.monitors.get(m).ok_or(LayoutError::StaleMonitor(m))
    }

    pub fn monitor_mut(&mut self, m: MonitorId) -> Result<&mut Monitor> {
        self.monitors.get_mut(m).ok_or(LayoutError::StaleMonitor(m))
    }

    /// Creates a detached leaf. Window-backed leaves pass the window id;
    /// other nodes draw one from the id source that no node holds yet.
    pub fn make_node(&mut self, id: Option<u32>) -> NodeId {
        let id = id.unwrap_or_else(|| self.fresh_node_id(None));
        self.nodes.insert(Node::new(id, self.settings.split_ratio))
    }

    /// A source of distinct ids yields a free one within `len + 2` draws.
    fn fresh_node_id(&mut self, reserved: Option<u32>) -> u32 {
        let mut id = self.next_id();
        for _ in 0..=self.nodes.len() {
            if Some(id) != reserved && self.nodes.find_id(id).is_none() {
                break;
            }
            id = self.next_id();
        }
        id
    }

    /// Makes `window` available as a node id. An internal node or receptacle
    /// holding it is renumbered; a managed window holding it is an error.
    pub(crate) fn claim_window_id(&mut self, window: u32) -> Result<()> {
        let Some(n) = self.nodes.find_id(window) else {
            return Ok(());
        };
        if self.nodes[n].client.is_some() {
            return Err(LayoutError::DuplicateWindow(window));
        }
        let id = self.fresh_node_id(Some(window));
        self.nodes[n].id = id;
        Ok(())
    }

    pub fn make_client(&self) -> Client { Client::new(self.settings.border_width) }

    /// Creates a detached leaf holding `client` for window `window`.
    pub fn make_window_node(&mut self, window: u32, client: Client) -> NodeId {
        let n = self.make_node(Some(window));
        self.nodes[n].client = Some(client);
        let constraints = self.nodes[n].leaf_constraints();
        self.nodes[n].constraints = constraints;
        self.nodes[n].vacant = self.nodes[n].leaf_vacancy();
        n
    }

    /// The focused desktop, i.e. the current desktop of the focused monitor.
    pub fn focused_desktop(&self) -> Option<DesktopId> { self.mon.and_then(|m| self.monitors.get(m)?.desk) }

    pub fn focused_node(&self) -> Option<NodeId> {
        self.focused_desktop().and_then(|d| self.desktops.get(d)?.focus)
    }

    /// Coordinates of the focused monitor, desktop and node.
    pub fn focused(&self) -> Coordinates {
        Coordinates {
            monitor: self.mon,
            desktop: self.focused_desktop(),
            node: self.focused_node(),
        }
    }

    /// Desktops in global order: monitor order, then each monitor's list.
    pub fn desktop_order(&self) -> Vec<(MonitorId, DesktopId)> {
        self.monitor_order
            .iter()
            .flat_map(|&m| self.monitors[m].desktops.iter().map(move |&d| (m, d)))
            .collect()
    }

    /// Locates the desktop whose tree contains `n`.
    pub fn desktop_of(&self, n: NodeId) -> Option<DesktopId> {
        let root = n.ancestors(&self.nodes).last()?;
        self.desktops.iter().find(|(_, d)| d.root == Some(root)).map(|(id, _)| id)
    }

    pub fn locate(&self, n: NodeId) -> Option<Coordinates> {
        let d = self.desktop_of(n)?;
        Some(Coordinates::new(self.desktops[d].monitor, d, Some(n)))
    }

    /// Whether some leaf of the subtree holds a visible client.
    pub fn is_focusable(&self, n: NodeId) -> bool { self.first_focusable_leaf(n).is_some() }

    pub fn first_focusable_leaf(&self, n: NodeId) -> Option<NodeId> {
        n.leaves(&self.nodes).find(|&f| {
            let node = &self.nodes[f];
            node.client.is_some() && !node.hidden
        })
    }

    /// Visible tiled leaves, counting receptacles when asked to.
    pub fn tiled_count(&self, n: Option<NodeId>, include_receptacles: bool) -> usize {
        let Some(n) = n else {
            return 0;
        };
        n.leaves(&self.nodes)
            .filter(|&f| {
                let node = &self.nodes[f];
                !node.hidden
                    && match &node.client {
                        None => include_receptacles,
                        Some(c) => c.is_tiled(),
                    }
            })
            .count()
    }

    pub fn clients_count_in(&self, n: NodeId) -> usize {
        n.traverse_preorder(&self.nodes)
            .filter(|&f| self.nodes[f].client.is_some())
            .count()
    }

    /// Number of sticky subtrees, counting each outermost sticky node once.
    pub fn sticky_count(&self, n: NodeId) -> u32 {
        let mut count = 0;
        let mut stack = vec![n];
        while let Some(f) = stack.pop() {
            let node = &self.nodes[f];
            if node.sticky {
                count += 1;
            } else {
                stack.extend(node.first_child);
                stack.extend(node.second_child);
            }
        }
        count
    }

    fn window_gap(&self, d: DesktopId) -> i32 {
        let desktop = &self.desktops[d];
        if self.settings.gapless_monocle && desktop.layout == Layout::Monocle {
            0
        } else {
            desktop.window_gap
        }
    }

    /// Geometry of `n` as perceived by the user: the floating rectangle of a
    /// floating client, the tiled rectangle of other clients, and the node
    /// area without its gap otherwise.
    pub fn get_rectangle(&self, m: Option<MonitorId>, d: Option<DesktopId>, n: Option<NodeId>) -> Rect {
        let Some(node) = n.and_then(|n| self.nodes.get(n)) else {
            return m.and_then(|m| self.monitors.get(m)).map(|m| m.rectangle).unwrap_or_default();
        };
        match &node.client {
            Some(c) if c.is_floating() => c.floating_rectangle,
            Some(c) => c.tiled_rectangle,
            None => {
                let wg = d.filter(|d| self.desktops.contains_key(*d)).map_or(0, |d| self.window_gap(d));
                let r = node.rectangle;
                Rect::new(
                    r.x,
                    r.y,
                    (r.width as i32 - wg).max(0) as u16,
                    (r.height as i32 - wg).max(0) as u16,
                )
            }
        }
    }

    pub fn node_area(&self, d: DesktopId, n: NodeId) -> u32 { self.get_rectangle(None, Some(d), Some(n)).area() }

    /// Working area of desktop `d`: the monitor rectangle without padding and
    /// the outer gap.
    pub fn desktop_area(&self, d: DesktopId) -> Rect {
        let desktop = &self.desktops[d];
        let monitor = &self.monitors[desktop.monitor];
        let mut rect = (monitor.padding + desktop.padding).apply(&monitor.rectangle);
        if desktop.layout == Layout::Monocle {
            rect = self.settings.monocle_padding.apply(&rect);
        }
        if !self.settings.gapless_monocle || desktop.layout != Layout::Monocle {
            let wg = desktop.window_gap;
            rect = rect.inset(wg, 0, 0, wg);
        }
        rect
    }

    pub fn is_urgent(&self, d: DesktopId) -> bool {
        self.desktops[d].root.is_some_and(|root| {
            root.leaves(&self.nodes)
                .any(|f| self.nodes[f].client.as_ref().is_some_and(|c| c.urgent))
        })
    }
}
