//! Selector resolution: finding nodes, desktops and monitors relative to a
//! reference location.

use tracing::{instrument, trace};

use super::{AreaPeak, CycleDir, Direction, HistoryDir, Layout, SplitType};
use crate::model::client::{ClientState, StackLayer};
use crate::model::selector::{
    DesktopDescriptor, DesktopSelect, MonitorDescriptor, MonitorSelect, NodeDescriptor, NodeSelect, check,
};
use crate::model::{Client, Coordinates, DesktopId, History, MonitorId, NodeId, Selector, World};

impl World {
    pub fn node_matches(&self, loc: &Coordinates, reference: &Coordinates, sel: &NodeSelect) -> bool {
        let Some(n) = loc.node else {
            return false;
        };
        let Some(node) = self.nodes.get(n) else {
            return false;
        };
        let client = node.client.as_ref();
        let focused = self.focused_node() == Some(n);
        let active = loc
            .desktop
            .zip(loc.monitor)
            .is_some_and(|(d, m)| self.monitors.get(m).is_some_and(|m| m.desk == Some(d)));

        let on_client = |wanted: Option<bool>, f: &dyn Fn(&Client) -> bool| {
            wanted.is_none_or(|w| client.is_some_and(|c| f(c) == w))
        };
        let related = |wanted: Option<bool>, f: &dyn Fn(NodeId) -> bool| {
            wanted.is_none_or(|w| reference.node.is_some_and(|r| f(r) == w))
        };
        let same_class = match (sel.same_class, client, reference.node.and_then(|r| self.nodes.get(r)?.client.as_ref())) {
            (Some(w), Some(a), Some(b)) => (a.class_name == b.class_name) == w,
            _ => true,
        };

        check(sel.automatic, node.presel.is_none())
            && check(sel.focused, focused)
            && check(sel.active, active)
            && check(sel.local, loc.desktop.is_some() && loc.desktop == reference.desktop)
            && check(sel.leaf, node.is_leaf())
            && check(sel.window, client.is_some())
            && check(sel.hidden, node.hidden)
            && check(sel.sticky, node.sticky)
            && check(sel.private, node.private)
            && check(sel.locked, node.locked)
            && check(sel.marked, node.marked)
            && on_client(sel.tiled, &|c| c.state == ClientState::Tiled)
            && on_client(sel.pseudo_tiled, &|c| c.state == ClientState::PseudoTiled)
            && on_client(sel.floating, &|c| c.state == ClientState::Floating)
            && on_client(sel.fullscreen, &|c| c.state == ClientState::Fullscreen)
            && on_client(sel.urgent, &|c| c.urgent)
            && on_client(sel.below, &|c| c.layer == StackLayer::Below)
            && on_client(sel.normal, &|c| c.layer == StackLayer::Normal)
            && on_client(sel.above, &|c| c.layer == StackLayer::Above)
            && same_class
            && related(sel.descendant_of, &|r| n.is_descendant_of(r, &self.nodes))
            && related(sel.ancestor_of, &|r| r.is_descendant_of(n, &self.nodes))
            && check(sel.horizontal, node.split_type == SplitType::Horizontal)
            && check(sel.vertical, node.split_type == SplitType::Vertical)
    }

    pub fn desktop_matches(&self, loc: &Coordinates, reference: &Coordinates, sel: &DesktopSelect) -> bool {
        let Some(d) = loc.desktop else {
            return false;
        };
        let Some(desktop) = self.desktops.get(d) else {
            return false;
        };
        let active = self.monitors.get(desktop.monitor).is_some_and(|m| m.desk == Some(d));
        check(sel.occupied, desktop.root.is_some())
            && check(sel.focused, self.focused_desktop() == Some(d))
            && check(sel.active, active)
            && check(sel.urgent, self.is_urgent(d))
            && check(sel.local, reference.monitor == Some(desktop.monitor))
            && check(sel.tiled, desktop.layout == Layout::Tiled)
            && check(sel.monocle, desktop.layout == Layout::Monocle)
            && check(sel.user_tiled, desktop.user_layout == Layout::Tiled)
            && check(sel.user_monocle, desktop.user_layout == Layout::Monocle)
    }

    pub fn monitor_matches(&self, loc: &Coordinates, _reference: &Coordinates, sel: &MonitorSelect) -> bool {
        let Some(m) = loc.monitor else {
            return false;
        };
        let Some(monitor) = self.monitors.get(m) else {
            return false;
        };
        let occupied = monitor.desk.is_some_and(|d| self.desktops[d].root.is_some());
        check(sel.occupied, occupied) && check(sel.focused, self.mon == Some(m))
    }

    /// Every node in global order: monitors, their desktops, then pre-order.
    fn node_scan(&self) -> impl Iterator<Item = Coordinates> + '_ {
        self.desktop_order().into_iter().flat_map(move |(m, d)| {
            self.desktops[d]
                .root
                .into_iter()
                .flat_map(move |r| r.traverse_preorder(&self.nodes))
                .map(move |n| Coordinates::new(m, d, Some(n)))
        })
    }

    pub fn find_any_node(&self, reference: &Coordinates, sel: &NodeSelect) -> Option<Coordinates> {
        self.node_scan().find(|loc| self.node_matches(loc, reference, sel))
    }

    pub fn find_any_desktop(&self, reference: &Coordinates, sel: &DesktopSelect) -> Option<Coordinates> {
        self.desktop_order()
            .into_iter()
            .map(|(m, d)| Coordinates::desktop(m, d))
            .find(|loc| self.desktop_matches(loc, reference, sel))
    }

    pub fn find_any_monitor(&self, reference: &Coordinates, sel: &MonitorSelect) -> Option<Coordinates> {
        self.monitor_order
            .iter()
            .map(|&m| Coordinates::monitor(m))
            .find(|loc| self.monitor_matches(loc, reference, sel))
    }

    /// Closest strict ancestor of the reference node accepted by `sel`.
    pub fn find_first_ancestor(&self, reference: &Coordinates, sel: &NodeSelect) -> Option<Coordinates> {
        let (m, d, n) = (reference.monitor?, reference.desktop?, reference.node?);
        n.ancestors(&self.nodes)
            .skip(1)
            .map(|a| Coordinates::new(m, d, Some(a)))
            .find(|loc| self.node_matches(loc, reference, sel))
    }

    /// Next node accepted by `sel` along the global in-order ring, wrapping
    /// around. A reference without a node starts at the neighbouring desktop.
    pub fn find_closest_node(&self, reference: &Coordinates, dir: CycleDir, sel: &NodeSelect) -> Option<Coordinates> {
        let order = self.desktop_order();
        let ring: Vec<(usize, Coordinates)> = order
            .iter()
            .enumerate()
            .flat_map(|(i, &(m, d))| {
                self.desktops[d]
                    .root
                    .into_iter()
                    .flat_map(move |r| r.traverse_inorder(&self.nodes))
                    .map(move |n| (i, Coordinates::new(m, d, Some(n))))
            })
            .collect();

        let candidates: Vec<&Coordinates> = match reference.node {
            Some(n) => {
                let pos = ring.iter().position(|(_, c)| c.node == Some(n))?;
                let after = ring[pos + 1..].iter().chain(&ring[..pos]);
                match dir {
                    CycleDir::Next => after.map(|(_, c)| c).collect(),
                    CycleDir::Prev => {
                        let mut v: Vec<&Coordinates> = after.map(|(_, c)| c).collect();
                        v.reverse();
                        v
                    }
                }
            }
            None => {
                let r = reference.desktop.and_then(|d| order.iter().position(|&(_, e)| e == d))?;
                match dir {
                    CycleDir::Next => ring
                        .iter()
                        .filter(|(i, _)| *i > r)
                        .chain(ring.iter().filter(|(i, _)| *i <= r))
                        .map(|(_, c)| c)
                        .collect(),
                    CycleDir::Prev => ring
                        .iter()
                        .rev()
                        .filter(|(i, _)| *i < r)
                        .chain(ring.iter().rev().filter(|(i, _)| *i >= r))
                        .map(|(_, c)| c)
                        .collect(),
                }
            }
        };
        candidates.into_iter().copied().find(|loc| self.node_matches(loc, reference, sel))
    }

    /// Items of `ring` after `pos` in direction `dir`, wrapping and
    /// excluding `pos` itself.
    fn cyclic<T: Copy>(ring: &[T], pos: usize, dir: CycleDir) -> impl Iterator<Item = T> + '_ {
        let len = ring.len();
        (1..len).map(move |k| match dir {
            CycleDir::Next => ring[(pos + k) % len],
            CycleDir::Prev => ring[(pos + len - k) % len],
        })
    }

    pub fn closest_desktop(&self, reference: &Coordinates, dir: CycleDir, sel: &DesktopSelect) -> Option<Coordinates> {
        let order = self.desktop_order();
        let d = reference.desktop?;
        let pos = order.iter().position(|&(_, e)| e == d)?;
        World::cyclic(&order, pos, dir)
            .map(|(m, d)| Coordinates::desktop(m, d))
            .find(|loc| self.desktop_matches(loc, reference, sel))
    }

    pub fn closest_monitor(&self, reference: &Coordinates, dir: CycleDir, sel: &MonitorSelect) -> Option<Coordinates> {
        let m = reference.monitor?;
        let pos = self.monitor_order.iter().position(|&e| e == m)?;
        World::cyclic(&self.monitor_order, pos, dir)
            .map(Coordinates::monitor)
            .find(|loc| self.monitor_matches(loc, reference, sel))
    }

    /// Nearest visible window on side `dir` of the reference node, among the
    /// shown desktops. Ties go to the most recently focused window.
    #[instrument(level = "trace", skip(self))]
    pub fn find_nearest_neighbor(
        &self,
        reference: &Coordinates,
        dir: Direction,
        sel: &NodeSelect,
    ) -> Option<Coordinates> {
        let n = reference.node?;
        let rect = self.get_rectangle(reference.monitor, reference.desktop, Some(n));
        let tightness = self.settings.directional_focus_tightness;
        let mut best: Option<(u32, u32, Coordinates)> = None;
        for &m in &self.monitor_order {
            let Some(d) = self.monitors[m].desk else { continue };
            let Some(root) = self.desktops[d].root else { continue };
            for f in root.leaves(&self.nodes) {
                let node = &self.nodes[f];
                let loc = Coordinates::new(m, d, Some(f));
                if f == n || node.client.is_none() || node.hidden || f.is_descendant_of(n, &self.nodes) {
                    continue;
                }
                let r = self.get_rectangle(Some(m), Some(d), Some(f));
                if !self.node_matches(&loc, reference, sel) || !rect.on_dir_side(&r, dir, tightness) {
                    continue;
                }
                let fd = rect.boundary_distance(&r, dir);
                let fr = self.history.rank(f);
                if best.is_none_or(|(bd, br, _)| fd < bd || (fd == bd && fr < br)) {
                    best = Some((fd, fr, loc));
                }
            }
        }
        trace!(?best, "nearest neighbour");
        best.map(|(_, _, loc)| loc)
    }

    /// Closest monitor on side `dir` of `m`.
    pub fn nearest_monitor(&self, m: MonitorId, dir: Direction, sel: &MonitorSelect) -> Option<MonitorId> {
        let rect = self.monitors.get(m)?.rectangle;
        let reference = Coordinates::monitor(m);
        let tightness = self.settings.directional_focus_tightness;
        self.monitor_order
            .iter()
            .copied()
            .filter(|&f| f != m)
            .filter(|&f| {
                let r = self.monitors[f].rectangle;
                rect.on_dir_side(&r, dir, tightness)
                    && self.monitor_matches(&Coordinates::monitor(f), &reference, sel)
            })
            .min_by_key(|&f| rect.boundary_distance(&self.monitors[f].rectangle, dir))
    }

    /// Occupied leaf with the largest or smallest area, first found on ties.
    pub fn find_by_area(&self, peak: AreaPeak, reference: &Coordinates, sel: &NodeSelect) -> Option<Coordinates> {
        let mut best: Option<(u32, Coordinates)> = None;
        for (m, d) in self.desktop_order() {
            let Some(root) = self.desktops[d].root else { continue };
            for f in root.leaves(&self.nodes) {
                let loc = Coordinates::new(m, d, Some(f));
                if self.nodes[f].vacant || !self.node_matches(&loc, reference, sel) {
                    continue;
                }
                let area = self.node_area(d, f);
                let better = best.is_none_or(|(a, _)| match peak {
                    AreaPeak::Biggest => area > a,
                    AreaPeak::Smallest => area < a,
                });
                if better {
                    best = Some((area, loc));
                }
            }
        }
        best.map(|(_, loc)| loc)
    }

    pub fn find_by_id(&self, id: u32) -> Option<Coordinates> {
        self.node_scan().find(|loc| loc.node.is_some_and(|n| self.nodes[n].id == id))
    }

    /// Runs a history query with the needle, lending `self` to the predicate.
    fn with_history<T>(&mut self, f: impl FnOnce(&mut History, &World) -> T) -> T {
        let mut history = std::mem::take(&mut self.history);
        let out = f(&mut history, self);
        self.history = history;
        out
    }

    pub fn history_find_node(&mut self, dir: HistoryDir, reference: &Coordinates, sel: &NodeSelect) -> Option<Coordinates> {
        self.with_history(|h, w| {
            h.find(dir, |e| {
                e.node.is_some_and(|n| Some(n) != reference.node && w.nodes.get(n).is_some_and(|x| !x.hidden))
                    && w.node_matches(&e.loc(), reference, sel)
            })
        })
    }

    pub fn history_find_desktop(
        &mut self,
        dir: HistoryDir,
        reference: &Coordinates,
        sel: &DesktopSelect,
    ) -> Option<Coordinates> {
        self.with_history(|h, w| {
            h.find(dir, |e| Some(e.desktop) != reference.desktop && w.desktop_matches(&e.loc(), reference, sel))
        })
        .map(|c| Coordinates { node: None, ..c })
    }

    pub fn history_find_monitor(
        &mut self,
        dir: HistoryDir,
        reference: &Coordinates,
        sel: &MonitorSelect,
    ) -> Option<Coordinates> {
        self.with_history(|h, w| {
            h.find(dir, |e| Some(e.monitor) != reference.monitor && w.monitor_matches(&e.loc(), reference, sel))
        })
        .and_then(|c| c.monitor.map(Coordinates::monitor))
    }

    pub fn history_find_newest_node(&self, reference: &Coordinates, sel: &NodeSelect) -> Option<Coordinates> {
        self.history.find_newest(|e| {
            e.node.is_some_and(|n| self.nodes.get(n).is_some_and(|x| !x.hidden)) && self.node_matches(&e.loc(), reference, sel)
        })
    }

    pub fn history_find_newest_desktop(&self, reference: &Coordinates, sel: &DesktopSelect) -> Option<Coordinates> {
        self.history
            .find_newest(|e| self.desktop_matches(&e.loc(), reference, sel))
            .map(|c| Coordinates { node: None, ..c })
    }

    pub fn history_find_newest_monitor(&self, reference: &Coordinates, sel: &MonitorSelect) -> Option<Coordinates> {
        self.history
            .find_newest(|e| self.monitor_matches(&e.loc(), reference, sel))
            .and_then(|c| c.monitor.map(Coordinates::monitor))
    }

    /// Resolves `selector` relative to `reference`.
    #[instrument(level = "debug", skip(self))]
    pub fn resolve(&mut self, selector: &Selector, reference: &Coordinates) -> Option<Coordinates> {
        let found = match selector {
            Selector::Node(desc, sel) => self.resolve_node(desc, sel, reference),
            Selector::Desktop(desc, sel) => self.resolve_desktop(desc, sel, reference),
            Selector::Monitor(desc, sel) => self.resolve_monitor(desc, sel, reference),
        };
        trace!(?found, "resolved");
        found
    }

    fn resolve_node(&mut self, desc: &NodeDescriptor, sel: &NodeSelect, reference: &Coordinates) -> Option<Coordinates> {
        let found = match *desc {
            NodeDescriptor::Focused => Some(self.focused()).filter(|c| c.node.is_some()),
            NodeDescriptor::Any => return self.find_any_node(reference, sel),
            NodeDescriptor::FirstAncestor => return self.find_first_ancestor(reference, sel),
            NodeDescriptor::Cycle(dir) => return self.find_closest_node(reference, dir, sel),
            NodeDescriptor::Direction(dir) => return self.find_nearest_neighbor(reference, dir, sel),
            NodeDescriptor::History(dir) => return self.history_find_node(dir, reference, sel),
            NodeDescriptor::Newest => return self.history_find_newest_node(reference, sel),
            NodeDescriptor::Biggest => return self.find_by_area(AreaPeak::Biggest, reference, sel),
            NodeDescriptor::Smallest => return self.find_by_area(AreaPeak::Smallest, reference, sel),
            NodeDescriptor::Id(id) => self.find_by_id(id),
        };
        found.filter(|loc| self.node_matches(loc, reference, sel))
    }

    fn resolve_desktop(
        &mut self,
        desc: &DesktopDescriptor,
        sel: &DesktopSelect,
        reference: &Coordinates,
    ) -> Option<Coordinates> {
        let by = |pred: &dyn Fn(DesktopId) -> bool, w: &World| {
            w.desktop_order().into_iter().find(|&(_, d)| pred(d)).map(|(m, d)| Coordinates::desktop(m, d))
        };
        let found = match desc {
            DesktopDescriptor::Focused => {
                let c = self.focused();
                c.monitor.zip(c.desktop).map(|(m, d)| Coordinates::desktop(m, d))
            }
            DesktopDescriptor::Any => return self.find_any_desktop(reference, sel),
            DesktopDescriptor::Cycle(dir) => return self.closest_desktop(reference, *dir, sel),
            DesktopDescriptor::History(dir) => return self.history_find_desktop(*dir, reference, sel),
            DesktopDescriptor::Newest => return self.history_find_newest_desktop(reference, sel),
            DesktopDescriptor::Index(i) => i
                .checked_sub(1)
                .and_then(|i| self.desktop_order().get(i).copied())
                .map(|(m, d)| Coordinates::desktop(m, d)),
            DesktopDescriptor::Name(name) => by(&|d| self.desktops[d].name == *name, self),
            DesktopDescriptor::Id(id) => by(&|d| self.desktops[d].id == *id, self),
        };
        found.filter(|loc| self.desktop_matches(loc, reference, sel))
    }

    fn resolve_monitor(
        &mut self,
        desc: &MonitorDescriptor,
        sel: &MonitorSelect,
        reference: &Coordinates,
    ) -> Option<Coordinates> {
        let found = match desc {
            MonitorDescriptor::Focused => self.mon,
            MonitorDescriptor::Primary => self.primary,
            MonitorDescriptor::Any => return self.find_any_monitor(reference, sel),
            MonitorDescriptor::Cycle(dir) => return self.closest_monitor(reference, *dir, sel),
            MonitorDescriptor::Direction(dir) => {
                return self.nearest_monitor(reference.monitor?, *dir, sel).map(Coordinates::monitor);
            }
            MonitorDescriptor::History(dir) => return self.history_find_monitor(*dir, reference, sel),
            MonitorDescriptor::Newest => return self.history_find_newest_monitor(reference, sel),
            MonitorDescriptor::Index(i) => i.checked_sub(1).and_then(|i| self.monitor_order.get(i).copied()),
            MonitorDescriptor::Name(name) => {
                self.monitor_order.iter().copied().find(|&m| self.monitors[m].name == *name)
            }
            MonitorDescriptor::Id(id) => self.monitor_order.iter().copied().find(|&m| self.monitors[m].id == *id),
        };
        found.map(Coordinates::monitor).filter(|loc| self.monitor_matches(loc, reference, sel))
    }
}
