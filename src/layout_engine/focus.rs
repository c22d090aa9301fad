//! Focus, activation and per-node state changes.

use tracing::{debug, instrument, trace, warn};

use super::Layout;
use crate::model::client::{ClientState, StackLayer};
use crate::model::error::{LayoutError, Result};
use crate::model::monitor::adapt_geometry;
use crate::model::{Client, Coordinates, DesktopId, MonitorId, NodeId, World};

impl World {
    /// Best node to hand focus to in `d`: the current focus if still usable,
    /// else the most recent visit, else the first focusable leaf.
    fn guess_focus(&self, d: DesktopId) -> Option<NodeId> {
        let desktop = &self.desktops[d];
        desktop
            .focus
            .filter(|&f| self.is_focusable(f))
            .or_else(|| self.history.last_node(d, None, &self.nodes).filter(|&f| self.is_focusable(f)))
            .or_else(|| desktop.root.and_then(|r| self.first_focusable_leaf(r)))
    }

    /// Focuses `n` on desktop `d` of monitor `m`, switching the monitor's
    /// current desktop when needed. Missing parts default to the focused
    /// monitor, its current desktop and a guessed node.
    #[instrument(level = "debug", skip(self))]
    pub fn focus_node(
        &mut self,
        m: Option<MonitorId>,
        d: Option<DesktopId>,
        n: Option<NodeId>,
    ) -> Result<bool> {
        let m = match m.or(self.mon) {
            Some(m) => m,
            None => return Ok(false),
        };
        let d = match d.or(self.monitor(m)?.desk) {
            Some(d) => d,
            None => return Ok(false),
        };
        if self.desktop(d)?.monitor != m {
            return Err(LayoutError::InvalidTransfer("desktop belongs to another monitor"));
        }
        let n = match n {
            Some(n) => {
                self.check_member(d, n)?;
                if !self.is_focusable(n) {
                    trace!(?n, "not focusable");
                    return Ok(false);
                }
                Some(n)
            }
            None => None,
        };

        if let Some(prev) = self.monitors[m].desk.filter(|&p| p != d) {
            self.transfer_sticky_nodes(m, prev, d)?;
        }
        let n = n.or_else(|| self.guess_focus(d));
        self.monitors[m].desk = Some(d);
        self.mon = Some(m);

        if let Some(n) = n {
            if let Some(c) = self.nodes[n].client.as_mut() {
                c.urgent = false;
            }
        }
        self.desktops[d].focus = n;
        self.history.add(m, d, n, true);
        debug!(?n, "focused");
        Ok(true)
    }

    /// Makes `n` the focus of a desktop that is not currently shown.
    #[instrument(level = "debug", skip(self))]
    pub fn activate_node(&mut self, m: MonitorId, d: DesktopId, n: Option<NodeId>) -> Result<bool> {
        self.monitor(m)?;
        self.desktop(d)?;
        let n = match n {
            Some(n) => {
                self.check_member(d, n)?;
                Some(n)
            }
            None => self.guess_focus(d),
        };
        if self.focused_desktop() == Some(d) || n.is_some_and(|n| !self.is_focusable(n)) {
            return Ok(false);
        }
        self.desktops[d].focus = n;
        self.history.add(m, d, n, false);
        Ok(true)
    }

    /// Re-establishes a focus on `d` after its focused subtree went away.
    pub(crate) fn refocus(&mut self, m: MonitorId, d: DesktopId) -> Result<()> {
        if self.focused_desktop() == Some(d) {
            self.focus_node(Some(m), Some(d), None)?;
        } else {
            self.activate_node(m, d, None)?;
        }
        Ok(())
    }

    /// Sticky nodes follow the monitor from desktop `ds` to `dd`.
    fn transfer_sticky_nodes(&mut self, m: MonitorId, ds: DesktopId, dd: DesktopId) -> Result<()> {
        let Some(root) = self.desktops[ds].root else {
            return Ok(());
        };
        let mut sticky = Vec::new();
        let mut stack = vec![root];
        while let Some(f) = stack.pop() {
            let node = &self.nodes[f];
            if node.sticky {
                sticky.push(f);
            } else {
                stack.extend(node.first_child);
                stack.extend(node.second_child);
            }
        }
        for n in sticky {
            let count = self.sticky_count(n);
            let monitor = &mut self.monitors[m];
            monitor.sticky_count = monitor.sticky_count.saturating_sub(count);
            self.move_node(ds, n, dd, self.desktops[dd].focus)?;
            trace!(?n, "moved sticky node");
        }
        Ok(())
    }

    /// Moves the subtree `ns` of desktop `ds` next to `nd` in desktop `dd`.
    /// With `follow`, focus moves along when it was inside `ns`.
    #[instrument(level = "debug", skip(self))]
    pub fn transfer_node(
        &mut self,
        ds: DesktopId,
        ns: NodeId,
        dd: DesktopId,
        nd: Option<NodeId>,
        follow: bool,
    ) -> Result<bool> {
        self.check_member(ds, ns)?;
        if let Some(nd) = nd {
            self.check_member(dd, nd)?;
            if nd.is_descendant_of(ns, &self.nodes) || ns.parent(&self.nodes) == Some(nd) {
                return Err(LayoutError::InvalidTransfer("target lies inside or around the source"));
            }
        }
        let (ms, md) = (self.desktops[ds].monitor, self.desktops[dd].monitor);
        let sc = if self.monitors[ms].sticky_count > 0 && self.monitors[ms].desk == Some(ds) {
            self.sticky_count(ns)
        } else {
            0
        };
        if sc > 0 && self.monitors[md].desk != Some(dd) {
            warn!(?ns, "sticky nodes stay on shown desktops");
            return Err(LayoutError::InvalidTransfer("sticky nodes stay on shown desktops"));
        }

        let focus = self.desktops[ds].focus.filter(|f| f.is_descendant_of(ns, &self.nodes));
        let moved = self.sticky_count(ns);
        let monitor = &mut self.monitors[ms];
        monitor.sticky_count = monitor.sticky_count.saturating_sub(moved);
        self.move_node(ds, ns, dd, nd)?;

        if ms != md {
            let (rs, rd) = (self.monitors[ms].rectangle, self.monitors[md].rectangle);
            let leaves: Vec<NodeId> = ns.leaves(&self.nodes).collect();
            for f in leaves {
                if let Some(c) = self.nodes[f].client.as_mut() {
                    adapt_geometry(&rs, &rd, c);
                }
            }
        }

        if ds == dd {
            if focus.is_some() {
                self.desktops[ds].focus = focus;
            }
        } else {
            if follow && focus.is_some() {
                self.focus_node(Some(md), Some(dd), focus)?;
            }
            if self.desktops[ds].focus.is_none() {
                self.refocus(ms, ds)?;
            }
        }
        Ok(true)
    }

    /// Unlinks `ns` from `ds` and inserts it into `dd`, pruning history when
    /// the desktop changes.
    fn move_node(&mut self, ds: DesktopId, ns: NodeId, dd: DesktopId, nd: Option<NodeId>) -> Result<()> {
        self.unlink_node(ds, ns);
        if ds != dd {
            self.history.remove_node(ns, true, &self.nodes);
        }
        self.insert_node(dd, ns, nd)?;
        Ok(())
    }

    /// Records a visit to `loc` in the focus history.
    pub fn record_visit(&mut self, loc: Coordinates, focused: bool) -> Result<()> {
        let (Some(m), Some(d)) = (loc.monitor, loc.desktop) else {
            return Ok(());
        };
        self.monitor(m)?;
        self.desktop(d)?;
        if let Some(n) = loc.node {
            self.check_member(d, n)?;
        }
        self.history.add(m, d, loc.node, focused);
        Ok(())
    }

    pub fn last_node(&self, d: DesktopId, exclude: Option<NodeId>) -> Option<NodeId> {
        self.history.last_node(d, exclude, &self.nodes)
    }

    pub fn last_desktop(&self, m: MonitorId, exclude: Option<DesktopId>) -> Option<DesktopId> {
        self.history.last_desktop(m, exclude)
    }

    pub fn last_monitor(&self, exclude: Option<MonitorId>) -> Option<MonitorId> { self.history.last_monitor(exclude) }

    fn client_of(&mut self, n: NodeId) -> Result<&mut Client> {
        self.node_mut(n)?.client.as_mut().ok_or(LayoutError::InvalidTransfer("node holds no window"))
    }

    /// Changes the state of the window held by `n`, keeping vacancy and the
    /// monocle switch of `single_monocle` in step.
    #[instrument(level = "debug", skip(self))]
    pub fn set_state(&mut self, d: DesktopId, n: NodeId, state: ClientState) -> Result<bool> {
        self.check_member(d, n)?;
        let client = self.client_of(n)?;
        if client.state == state {
            return Ok(false);
        }
        let was_tiled = client.is_tiled();
        client.last_state = client.state;
        client.state = state;
        if state == ClientState::Floating && client.floating_rectangle.is_empty() {
            client.floating_rectangle = client.tiled_rectangle;
        }
        let now_tiled = client.is_tiled();
        self.nodes.refresh_vacancy(n);

        if self.settings.single_monocle && was_tiled != now_tiled {
            let desktop = &self.desktops[d];
            let tiled = self.tiled_count(desktop.root, true);
            let user_layout = desktop.user_layout;
            if was_tiled && tiled <= 1 {
                self.set_layout(d, Layout::Monocle, false)?;
            } else if now_tiled && tiled > 1 {
                self.set_layout(d, user_layout, false)?;
            }
        }
        debug!(%state, "state changed");
        Ok(true)
    }

    pub fn set_layer(&mut self, n: NodeId, layer: StackLayer) -> Result<bool> {
        let client = self.client_of(n)?;
        if client.layer == layer {
            return Ok(false);
        }
        client.last_layer = client.layer;
        client.layer = layer;
        Ok(true)
    }

    /// Hides or shows the subtree `n`. Focus leaves a subtree that gets hidden.
    #[instrument(level = "debug", skip(self))]
    pub fn set_hidden(&mut self, d: DesktopId, n: NodeId, value: bool) -> Result<bool> {
        self.check_member(d, n)?;
        if self.nodes[n].hidden == value {
            return Ok(false);
        }
        let held_focus = self.desktops[d].focus.is_some_and(|f| f.is_descendant_of(n, &self.nodes));
        let ids: Vec<NodeId> = n.traverse_postorder(&self.nodes).collect();
        for id in ids {
            let node = &mut self.nodes[id];
            node.hidden = value;
            if let Some(c) = node.client.as_mut() {
                c.shown = !value;
            }
            if node.is_leaf() {
                node.vacant = node.leaf_vacancy();
            } else {
                let vacant = [node.first_child, node.second_child]
                    .into_iter()
                    .flatten()
                    .all(|c| self.nodes[c].vacant);
                self.nodes[id].vacant = vacant;
            }
            self.nodes.update_constraints(id);
        }
        self.nodes.propagate_flags_upward(n);

        let m = self.desktops[d].monitor;
        if value && held_focus {
            self.desktops[d].focus = None;
            self.refocus(m, d)?;
        } else if !value && self.desktops[d].focus.is_none() {
            self.refocus(m, d)?;
        }
        Ok(true)
    }

    /// Sticky nodes live on the shown desktop of their monitor and follow it.
    #[instrument(level = "debug", skip(self))]
    pub fn set_sticky(&mut self, d: DesktopId, n: NodeId, value: bool) -> Result<bool> {
        self.check_member(d, n)?;
        if self.nodes[n].sticky == value {
            return Ok(false);
        }
        let m = self.desktops[d].monitor;
        let mut target = d;
        if let Some(cur) = self.monitors[m].desk.filter(|&cur| value && cur != d) {
            self.transfer_node(d, n, cur, self.desktops[cur].focus, false)?;
            target = cur;
        }
        self.nodes[n].sticky = value;
        let monitor = &mut self.monitors[m];
        if value {
            monitor.sticky_count += 1;
        } else {
            monitor.sticky_count = monitor.sticky_count.saturating_sub(1);
        }
        trace!(?target, value, "sticky changed");
        Ok(true)
    }

    pub fn set_private(&mut self, n: NodeId, value: bool) -> Result<bool> {
        let node = self.node_mut(n)?;
        Ok(std::mem::replace(&mut node.private, value) != value)
    }

    pub fn set_locked(&mut self, n: NodeId, value: bool) -> Result<bool> {
        let node = self.node_mut(n)?;
        Ok(std::mem::replace(&mut node.locked, value) != value)
    }

    pub fn set_marked(&mut self, n: NodeId, value: bool) -> Result<bool> {
        let node = self.node_mut(n)?;
        Ok(std::mem::replace(&mut node.marked, value) != value)
    }

    /// The focused window never becomes urgent.
    pub fn set_urgent(&mut self, n: NodeId, value: bool) -> Result<bool> {
        if value && self.focused_node() == Some(n) {
            return Ok(false);
        }
        let client = self.client_of(n)?;
        Ok(std::mem::replace(&mut client.urgent, value) != value)
    }
}
