//! Monitors and desktops: creation, ordering, merging and removal.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};

use super::Layout;
use crate::model::client::Client;
use crate::model::desktop::DEFAULT_DESK_NAME;
use crate::model::error::{LayoutError, Result};
use crate::model::geometry::{Point, Rect};
use crate::model::monitor::adapt_geometry;
use crate::model::{Desktop, DesktopId, Monitor, MonitorId, NodeId, World};

/// One output of a topology snapshot handed to [`World::update_monitors`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub name: String,
    /// `None` when the output is connected but disabled.
    pub rect: Option<Rect>,
    pub connected: bool,
    #[serde(default)]
    pub primary: bool,
}

impl World {
    /// Creates a monitor and slots it into reading order.
    #[instrument(level = "debug", skip(self))]
    pub fn add_monitor(&mut self, name: &str, rect: Rect) -> MonitorId {
        let id = self.next_id();
        let mut monitor = Monitor::new(name, id, rect, self.settings.window_gap, self.settings.border_width);
        monitor.padding = self.settings.padding;
        let m = self.monitors.insert(monitor);
        self.monitor_order.push(m);
        self.reposition_monitor(m);
        if self.mon.is_none() {
            self.mon = Some(m);
        }
        info!(name, ?rect, "added monitor");
        m
    }

    pub(crate) fn sort_monitors(&mut self) {
        let monitors = &self.monitors;
        self.monitor_order
            .sort_by(|&a, &b| monitors[a].rectangle.position_cmp(&monitors[b].rectangle));
    }

    fn reposition_monitor(&mut self, m: MonitorId) {
        self.monitor_order.retain(|&e| e != m);
        let rect = self.monitors[m].rectangle;
        let at = self
            .monitor_order
            .iter()
            .position(|&a| rect.position_cmp(&self.monitors[a].rectangle) == Ordering::Less)
            .unwrap_or(self.monitor_order.len());
        self.monitor_order.insert(at, m);
    }

    /// Moves `m` to the position its rectangle calls for.
    pub fn reorder_monitor(&mut self, m: MonitorId) -> Result<()> {
        self.monitor(m)?;
        self.reposition_monitor(m);
        Ok(())
    }

    /// Removes `m` together with its desktops and every node they hold.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_monitor(&mut self, m: MonitorId) -> Result<()> {
        let desktops = self.monitor(m)?.desktops.clone();
        for d in desktops {
            self.discard_desktop(d)?;
        }
        self.monitor_order.retain(|&e| e != m);
        self.monitors.remove(m);
        if self.primary == Some(m) {
            self.primary = None;
        }
        if self.mon == Some(m) {
            self.mon = self
                .history
                .last_monitor(Some(m))
                .filter(|l| self.monitors.contains_key(*l))
                .or_else(|| self.monitor_order.first().copied());
            if self.mon.is_some() {
                self.focus_node(None, None, None)?;
            }
        }
        info!(?m, "removed monitor");
        Ok(())
    }

    /// Moves every desktop of `ms` to `md` and removes `ms`.
    #[instrument(level = "debug", skip(self))]
    pub fn merge_monitors(&mut self, ms: MonitorId, md: MonitorId) -> Result<()> {
        self.monitor(md)?;
        let desktops = self.monitor(ms)?.desktops.clone();
        if ms == md {
            return Ok(());
        }
        for d in desktops {
            self.move_desktop(d, md, false)?;
        }
        self.remove_monitor(ms)
    }

    /// Exchanges the positions of two monitors in the monitor order.
    pub fn swap_monitors(&mut self, m1: MonitorId, m2: MonitorId) -> Result<()> {
        self.monitor(m1)?;
        self.monitor(m2)?;
        let i = self.monitor_order.iter().position(|&e| e == m1);
        let j = self.monitor_order.iter().position(|&e| e == m2);
        if let (Some(i), Some(j)) = (i, j) {
            self.monitor_order.swap(i, j);
        }
        Ok(())
    }

    pub fn rename_monitor(&mut self, m: MonitorId, name: &str) -> Result<()> {
        let monitor = self.monitor_mut(m)?;
        trace!(from = %monitor.name, to = name, "renamed monitor");
        monitor.name = name.to_owned();
        Ok(())
    }

    pub fn monitor_from_point(&self, p: Point) -> Option<MonitorId> {
        self.monitor_order.iter().copied().find(|&m| self.monitors[m].rectangle.is_inside(p))
    }

    /// Monitor under the centre of the client's floating rectangle, or the
    /// one whose centre is closest.
    pub fn monitor_from_client(&self, c: &Client) -> Option<MonitorId> {
        let center = c.floating_rectangle.center();
        self.monitor_from_point(center).or_else(|| {
            self.monitor_order.iter().copied().min_by_key(|&m| {
                let mc = self.monitors[m].rectangle.center();
                (mc.x as i32 - center.x as i32).unsigned_abs() + (mc.y as i32 - center.y as i32).unsigned_abs()
            })
        })
    }

    /// Applies an output topology snapshot: known outputs are resized, new
    /// ones become monitors, and unplugged or overlapping monitors are merged
    /// away as the settings ask.
    #[instrument(level = "debug", skip_all)]
    pub fn update_monitors(&mut self, outputs: &[Output]) -> Result<()> {
        for m in self.monitors.values_mut() {
            m.wired = false;
        }

        for output in outputs {
            let existing = self.monitor_by_name(&output.name);
            match (output.connected, output.rect, existing) {
                (true, Some(rect), Some(m)) => {
                    self.update_root(m, rect)?;
                    self.monitors[m].wired = true;
                }
                (true, Some(rect), None) => {
                    let m = self.add_monitor(&output.name, rect);
                    self.monitors[m].wired = true;
                }
                (true, None, Some(m)) if !self.settings.remove_disabled_monitors => {
                    self.monitors[m].wired = true;
                }
                _ => {}
            }
            if output.primary {
                if let Some(m) = self.monitor_by_name(&output.name) {
                    self.primary = Some(m);
                }
            }
        }

        if self.settings.merge_overlapping_monitors {
            self.merge_overlapping()?;
        }

        let unplugged: Vec<MonitorId> =
            self.monitor_order.iter().copied().filter(|&m| !self.monitors[m].wired).collect();
        for m in unplugged {
            if !self.settings.remove_unplugged_monitors {
                continue;
            }
            let target = self.mon.filter(|&t| t != m && self.monitors[t].wired).or_else(|| {
                self.monitor_order.iter().copied().find(|&t| t != m && self.monitors[t].wired)
            });
            match target {
                Some(t) => self.merge_monitors(m, t)?,
                None => warn!(?m, "no monitor left to take over desktops"),
            }
        }

        let empty: Vec<MonitorId> =
            self.monitor_order.iter().copied().filter(|&m| self.monitors[m].desk.is_none()).collect();
        for m in empty {
            self.add_desktop(m, DEFAULT_DESK_NAME)?;
        }

        if self.mon.is_none() {
            self.mon = self.primary.or_else(|| self.monitor_order.first().copied());
        }
        if self.mon.is_some() {
            self.focus_node(None, None, None)?;
        }
        debug!(count = self.monitors.len(), "monitors updated");
        Ok(())
    }

    fn merge_overlapping(&mut self) -> Result<()> {
        let order = self.monitor_order.clone();
        for m in order {
            if !self.monitors.get(m).is_some_and(|e| e.wired) {
                continue;
            }
            let rect = self.monitors[m].rectangle;
            let covered: Vec<MonitorId> = self
                .monitor_order
                .iter()
                .copied()
                .filter(|&b| b != m && self.monitors[b].wired && rect.contains(&self.monitors[b].rectangle))
                .collect();
            for b in covered {
                if self.primary == Some(b) {
                    self.primary = Some(m);
                }
                self.merge_monitors(b, m)?;
            }
        }
        Ok(())
    }

    fn monitor_by_name(&self, name: &str) -> Option<MonitorId> {
        self.monitors.iter().find(|(_, m)| m.name == name).map(|(id, _)| id)
    }

    /// Appends a desktop to `m`. The first desktop of a monitor becomes its current one.
    pub fn add_desktop(&mut self, m: MonitorId, name: &str) -> Result<DesktopId> {
        let len = self.monitor(m)?.desktops.len();
        self.insert_desktop(m, name, len)
    }

    /// Creates a desktop at position `index` of monitor `m`.
    #[instrument(level = "debug", skip(self))]
    pub fn insert_desktop(&mut self, m: MonitorId, name: &str, index: usize) -> Result<DesktopId> {
        self.monitor(m)?;
        let id = self.next_id();
        let desktop = Desktop::new(name, id, m, self.settings.window_gap, self.settings.border_width);
        let d = self.desktops.insert(desktop);
        let monitor = &mut self.monitors[m];
        let index = index.min(monitor.desktops.len());
        monitor.desktops.insert(index, d);
        if monitor.desk.is_none() {
            monitor.desk = Some(d);
        }
        Ok(d)
    }

    /// Removes `d`, handing its nodes to the desktop its monitor falls back to.
    /// A monitor keeps at least one desktop.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_desktop(&mut self, d: DesktopId) -> Result<()> {
        let m = self.desktop(d)?.monitor;
        let monitor = &self.monitors[m];
        if monitor.desktops.len() <= 1 {
            return Err(LayoutError::LastDesktop(m));
        }
        let heir = if monitor.desk == Some(d) {
            self.history
                .last_desktop(m, Some(d))
                .filter(|h| monitor.desktops.contains(h))
                .or_else(|| monitor.desktops.iter().copied().find(|&e| e != d))
        } else {
            monitor.desk
        };
        if let Some(heir) = heir {
            self.merge_desktops(d, heir)?;
        }
        self.discard_desktop(d)
    }

    /// Unconditionally frees `d` and its tree.
    fn discard_desktop(&mut self, d: DesktopId) -> Result<()> {
        let m = self.desktop(d)?.monitor;
        let was_focused = self.focused_desktop() == Some(d);
        let was_active = self.monitors[m].desk == Some(d);

        self.history.remove_desktop(d);
        self.monitors[m].desktops.retain(|&e| e != d);
        if let Some(root) = self.desktops[d].root {
            if was_active {
                let sticky = self.sticky_count(root);
                let monitor = &mut self.monitors[m];
                monitor.sticky_count = monitor.sticky_count.saturating_sub(sticky);
            }
            self.clients_count = self.clients_count.saturating_sub(self.clients_count_in(root));
            self.nodes.remove_subtree(root);
        }
        self.desktops.remove(d);

        if was_active {
            let monitor = &self.monitors[m];
            let next = self
                .history
                .last_desktop(m, None)
                .filter(|h| monitor.desktops.contains(h))
                .or_else(|| monitor.desktops.first().copied());
            self.monitors[m].desk = next;
            if let Some(next) = next {
                if was_focused {
                    self.focus_node(Some(m), Some(next), None)?;
                } else {
                    self.activate_node(m, next, None)?;
                }
            }
        }
        debug!(?d, "removed desktop");
        Ok(())
    }

    pub fn rename_desktop(&mut self, d: DesktopId, name: &str) -> Result<()> {
        self.desktop_mut(d)?.name = name.to_owned();
        Ok(())
    }

    /// Moves `d` to monitor `md`. With `follow`, `d` becomes the focused desktop.
    #[instrument(level = "debug", skip(self))]
    pub fn transfer_desktop(&mut self, d: DesktopId, md: MonitorId, follow: bool) -> Result<()> {
        let ms = self.desktop(d)?.monitor;
        self.monitor(md)?;
        if ms == md {
            return Ok(());
        }
        if self.monitors[ms].desktops.len() <= 1 {
            return Err(LayoutError::LastDesktop(ms));
        }
        self.move_desktop(d, md, follow)
    }

    fn move_desktop(&mut self, d: DesktopId, md: MonitorId, follow: bool) -> Result<()> {
        let ms = self.desktops[d].monitor;
        let d_was_active = self.monitors[ms].desk == Some(d);
        let ms_was_focused = self.mon == Some(ms);

        let sticky: Vec<NodeId> = match self.desktops[d].root {
            Some(root) if d_was_active && self.monitors[ms].sticky_count > 0 => root
                .traverse_preorder(&self.nodes)
                .filter(|&n| self.nodes[n].sticky)
                .filter(|&n| !n.ancestors(&self.nodes).skip(1).any(|a| self.nodes[a].sticky))
                .collect(),
            _ => Vec::new(),
        };

        self.monitors[ms].desktops.retain(|&e| e != d);
        self.history.remove_desktop(d);
        if d_was_active {
            let monitor = &self.monitors[ms];
            let next = self.history.last_desktop(ms, None).or_else(|| monitor.desktops.first().copied());
            self.monitors[ms].desk = next;
        }
        self.monitors[md].desktops.push(d);
        self.desktops[d].monitor = md;

        for n in sticky {
            match self.monitors[ms].desk {
                Some(next) => {
                    let count = self.sticky_count(n);
                    let monitor = &mut self.monitors[ms];
                    monitor.sticky_count = monitor.sticky_count.saturating_sub(count);
                    let focus = self.desktops[next].focus;
                    self.unlink_node(d, n);
                    self.insert_node(next, n, focus)?;
                }
                None => {
                    let ids: Vec<NodeId> = n.traverse_preorder(&self.nodes).collect();
                    for id in ids {
                        self.nodes[id].sticky = false;
                    }
                    self.monitors[ms].sticky_count = 0;
                }
            }
        }
        if self.desktops[d].focus.is_none() && self.desktops[d].root.is_some() {
            self.desktops[d].focus = self.desktops[d].root.and_then(|r| self.first_focusable_leaf(r));
        }

        let (rs, rd) = (self.monitors[ms].rectangle, self.monitors[md].rectangle);
        if let Some(root) = self.desktops[d].root {
            let leaves: Vec<NodeId> = root.leaves(&self.nodes).collect();
            for f in leaves {
                if let Some(c) = self.nodes[f].client.as_mut() {
                    adapt_geometry(&rs, &rd, c);
                }
            }
        }

        if self.monitors[md].desk.is_none() {
            self.monitors[md].desk = Some(d);
        }
        if follow {
            self.focus_node(Some(md), Some(d), None)?;
        } else if d_was_active && ms_was_focused {
            self.focus_node(Some(ms), None, None)?;
        } else if let Some(next) = self.monitors[ms].desk.filter(|_| d_was_active) {
            self.activate_node(ms, next, None)?;
        }
        debug!(?d, ?ms, ?md, "moved desktop");
        Ok(())
    }

    /// Moves the whole tree of `ds` into `dd`, next to its focus.
    pub fn merge_desktops(&mut self, ds: DesktopId, dd: DesktopId) -> Result<()> {
        self.desktop(dd)?;
        let Some(root) = self.desktop(ds)?.root else {
            return Ok(());
        };
        if ds == dd {
            return Ok(());
        }
        let focus = self.desktops[dd].focus;
        self.transfer_node(ds, root, dd, focus, false)?;
        Ok(())
    }

    /// Exchanges two desktops, possibly across monitors. With `follow`, focus
    /// stays on the desktop it was on rather than on the position.
    #[instrument(level = "debug", skip(self))]
    pub fn swap_desktops(&mut self, d1: DesktopId, d2: DesktopId, follow: bool) -> Result<()> {
        let m1 = self.desktop(d1)?.monitor;
        let m2 = self.desktop(d2)?.monitor;
        if d1 == d2 {
            return Ok(());
        }
        let (p1, p2) = match (self.monitors[m1].position_of(d1), self.monitors[m2].position_of(d2)) {
            (Some(p1), Some(p2)) => (p1, p2),
            _ => return Err(LayoutError::InvalidTransfer("desktop missing from its monitor")),
        };
        let focused = self.focused_desktop();
        let d1_active = self.monitors[m1].desk == Some(d1);
        let d2_active = self.monitors[m2].desk == Some(d2);

        if m1 == m2 {
            self.monitors[m1].desktops.swap(p1, p2);
        } else {
            let sticky = |w: &World, m: MonitorId, active: bool| active && w.monitors[m].sticky_count > 0;
            if sticky(self, m1, d1_active) || sticky(self, m2, d2_active) {
                return Err(LayoutError::InvalidTransfer("sticky nodes stay on their monitor"));
            }
            self.monitors[m1].desktops[p1] = d2;
            self.monitors[m2].desktops[p2] = d1;
            self.desktops[d1].monitor = m2;
            self.desktops[d2].monitor = m1;
            if d1_active {
                self.monitors[m1].desk = Some(d2);
            }
            if d2_active {
                self.monitors[m2].desk = Some(d1);
            }
            self.history.retarget_desktop(d1, m2);
            self.history.retarget_desktop(d2, m1);
            let (r1, r2) = (self.monitors[m1].rectangle, self.monitors[m2].rectangle);
            for (d, rs, rd) in [(d1, r1, r2), (d2, r2, r1)] {
                if let Some(root) = self.desktops[d].root {
                    let leaves: Vec<NodeId> = root.leaves(&self.nodes).collect();
                    for f in leaves {
                        if let Some(c) = self.nodes[f].client.as_mut() {
                            adapt_geometry(&rs, &rd, c);
                        }
                    }
                }
            }
        }

        match focused {
            Some(f) if follow && (f == d1 || f == d2) => {
                let m = self.desktops[f].monitor;
                self.focus_node(Some(m), Some(f), None)?;
            }
            Some(f) if !follow && m1 != m2 && f == d1 && d1_active => {
                self.focus_node(Some(m1), Some(d2), None)?;
            }
            Some(f) if !follow && m1 != m2 && f == d2 && d2_active => {
                self.focus_node(Some(m2), Some(d1), None)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Sets the effective layout of `d`, or its preferred layout when `user`
    /// is set. A preferred layout only applies when `single_monocle` allows it.
    pub fn set_layout(&mut self, d: DesktopId, layout: Layout, user: bool) -> Result<bool> {
        let tiled = self.tiled_count(self.desktop(d)?.root, true);
        let single_monocle = self.settings.single_monocle;
        let desktop = &mut self.desktops[d];
        if (user && desktop.user_layout == layout) || (!user && desktop.layout == layout) {
            return Ok(false);
        }
        if user {
            desktop.user_layout = layout;
            if !single_monocle || tiled > 1 {
                desktop.layout = layout;
            }
        } else {
            desktop.layout = layout;
        }
        trace!(%layout, user, "layout changed");
        Ok(true)
    }
}
