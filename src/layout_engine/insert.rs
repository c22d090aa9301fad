use tracing::{debug, instrument, trace};

use super::{AutomaticScheme, ChildPolarity, Direction, Layout, Rotation, SplitMode, SplitType};
use crate::model::error::{LayoutError, Result};
use crate::model::monitor::embrace_client;
use crate::model::tree::Presel;
use crate::model::{Client, DesktopId, NodeId, World};

impl World {
    /// Fails unless `n` belongs to the tree of desktop `d`.
    pub(crate) fn check_member(&self, d: DesktopId, n: NodeId) -> Result<()> {
        let desktop = self.desktop(d)?;
        self.node(n)?;
        let root = n.ancestors(&self.nodes).last();
        if root.is_some() && desktop.root == root {
            Ok(())
        } else {
            Err(LayoutError::NotInDesktop(n, d))
        }
    }

    /// Points the slot holding `old` (a parent's child or the desktop root) at `new`.
    pub(crate) fn replace_slot(&mut self, d: DesktopId, old: NodeId, new: NodeId) {
        if !self.nodes.replace_child(old, new) {
            self.nodes[new].parent = None;
            self.desktops[d].root = Some(new);
        }
    }

    /// Whether `n` or one of its ancestors refuses automatic siblings.
    pub(crate) fn is_private(&self, n: NodeId) -> bool {
        n.ancestors(&self.nodes).any(|a| self.nodes[a].private)
    }

    /// Largest leaf of `d` that may receive an automatic sibling, falling
    /// back to the largest preselected or non-private one.
    pub fn find_public(&self, d: DesktopId) -> Option<NodeId> {
        let root = self.desktops.get(d)?.root?;
        let mut manual: Option<(u32, NodeId)> = None;
        let mut automatic: Option<(u32, NodeId)> = None;
        for f in root.leaves(&self.nodes) {
            let node = &self.nodes[f];
            if node.vacant {
                continue;
            }
            let area = self.node_area(d, f);
            if manual.is_none_or(|(a, _)| area > a) && (node.presel.is_some() || !node.private) {
                manual = Some((area, f));
            }
            if automatic.is_none_or(|(a, _)| area > a) && node.presel.is_none() && !self.is_private(f) {
                automatic = Some((area, f));
            }
        }
        automatic.or(manual).map(|(_, f)| f)
    }

    /// Inserts the detached node `n` into desktop `d` next to `anchor`.
    ///
    /// Returns the effective anchor, or `None` when `n` became the root or
    /// replaced a receptacle.
    #[instrument(level = "debug", skip(self))]
    pub fn insert_node(
        &mut self,
        d: DesktopId,
        n: NodeId,
        anchor: Option<NodeId>,
    ) -> Result<Option<NodeId>> {
        let m = self.desktop(d)?.monitor;
        if self.node(n)?.parent.is_some() || self.desktops.values().any(|e| e.root == Some(n)) {
            return Err(LayoutError::InvalidTransfer("node is already attached"));
        }
        if let Some(a) = anchor {
            self.check_member(d, a)?;
        }

        let effective = match self.desktops[d].root {
            None => {
                self.desktops[d].root = Some(n);
                None
            }
            Some(root) => {
                let f = anchor
                    .or(self.desktops[d].focus)
                    .or_else(|| self.find_public(d))
                    .unwrap_or(root);
                if self.nodes[f].is_receptacle() && self.nodes[f].presel.is_none() {
                    self.replace_receptacle(d, f, n);
                    None
                } else {
                    Some(self.split_anchor(d, n, f))
                }
            }
        };

        self.monitors[m].sticky_count += self.sticky_count(n);
        self.nodes.propagate_flags_upward(n);
        if self.desktops[d].focus.is_none() && self.is_focusable(n) {
            self.desktops[d].focus = Some(n);
        }
        let desktop = &self.desktops[d];
        let user_layout = desktop.user_layout;
        if self.settings.single_monocle
            && desktop.layout == Layout::Monocle
            && self.tiled_count(desktop.root, true) > 1
        {
            self.set_layout(d, user_layout, false)?;
        }
        debug!(?effective, "inserted node");
        Ok(effective)
    }

    fn replace_receptacle(&mut self, d: DesktopId, f: NodeId, n: NodeId) {
        self.replace_slot(d, f, n);
        if self.desktops[d].focus == Some(f) {
            self.desktops[d].focus = None;
        }
        self.history.remove_node(f, false, &self.nodes);
        self.nodes[f].parent = None;
        self.nodes.remove_subtree(f);
        trace!("receptacle consumed");
    }

    fn split_anchor(&mut self, d: DesktopId, n: NodeId, mut f: NodeId) -> NodeId {
        let m = self.desktops[d].monitor;
        let c = self.make_node(None);

        if self.nodes[f].presel.is_none() && self.is_private(f) {
            if let Some(k) = self.find_public(d) {
                f = k;
            }
            if self.nodes[f].presel.is_none() && self.is_private(f) {
                let rect = self.get_rectangle(Some(m), Some(d), Some(f));
                let dir = if rect.width >= rect.height { Direction::East } else { Direction::South };
                self.nodes[f].presel = Some(Presel {
                    split_dir: dir,
                    split_ratio: self.settings.split_ratio,
                });
            }
        }
        let p = f.parent(&self.nodes);

        if let Some(presel) = self.nodes[f].presel {
            self.replace_slot(d, f, c);
            self.nodes[f].parent = Some(c);
            self.nodes[n].parent = Some(c);
            let (first, second) = if presel.split_dir.is_leading() { (n, f) } else { (f, n) };
            let node = &mut self.nodes[c];
            node.split_type = presel.split_dir.split_type();
            node.split_ratio = presel.split_ratio;
            node.split_mode = SplitMode::Manual;
            node.first_child = Some(first);
            node.second_child = Some(second);
            self.nodes[f].presel = None;
            self.nodes[n].marked = false;
            self.nodes.update_constraints(c);
            return f;
        }

        let single_tiled = self.nodes[f].is_tiled() && self.tiled_count(self.desktops[d].root, true) == 1;
        let scheme = self.settings.automatic_scheme;

        match p {
            Some(p) if scheme == AutomaticScheme::Spiral && !single_tiled => {
                self.replace_slot(d, p, c);
                let (split_type, split_ratio) = (self.nodes[p].split_type, self.nodes[p].split_ratio);
                let anchor_first = f.is_first_child(&self.nodes);
                self.nodes[p].parent = Some(c);
                self.nodes[n].parent = Some(c);
                let node = &mut self.nodes[c];
                node.split_type = split_type;
                node.split_ratio = split_ratio;
                let rot = if anchor_first {
                    node.first_child = Some(n);
                    node.second_child = Some(p);
                    Rotation::Deg90
                } else {
                    node.first_child = Some(p);
                    node.second_child = Some(n);
                    Rotation::Deg270
                };
                if !self.nodes[n].vacant {
                    self.rotate_subtree(p, rot);
                }
            }
            _ => {
                self.replace_slot(d, f, c);
                self.nodes[f].parent = Some(c);
                self.nodes[n].parent = Some(c);
                let (first, second) = match self.settings.initial_polarity {
                    ChildPolarity::FirstChild => (n, f),
                    ChildPolarity::SecondChild => (f, n),
                };
                let split_type = match p {
                    Some(p) if scheme != AutomaticScheme::LongestSide && !single_tiled => {
                        self.alternate_split(p)
                    }
                    _ => self.longest_side_split(d, f),
                };
                let node = &mut self.nodes[c];
                node.first_child = Some(first);
                node.second_child = Some(second);
                node.split_type = split_type;
            }
        }
        self.nodes.update_constraints(c);
        f
    }

    /// Wider anchors are split vertically. An anchor that was never
    /// arranged is measured against the desktop's working area.
    fn longest_side_split(&self, d: DesktopId, f: NodeId) -> SplitType {
        let mut rect = self.nodes[f].rectangle;
        if rect.is_empty() {
            rect = self.desktop_area(d);
        }
        if rect.width > rect.height { SplitType::Vertical } else { SplitType::Horizontal }
    }

    /// The opposite of the nearest ancestor split whose children are both occupied.
    fn alternate_split(&self, p: NodeId) -> SplitType {
        let has_vacant_child = |q: NodeId| {
            let node = &self.nodes[q];
            [node.first_child, node.second_child]
                .into_iter()
                .flatten()
                .any(|c| self.nodes[c].vacant)
        };
        let q = p.ancestors(&self.nodes).find(|&q| !has_vacant_child(q)).unwrap_or(p);
        self.nodes[q].split_type.toggled()
    }

    /// Wraps a new window in a leaf, inserts it next to the focus of `d`
    /// and focuses it. A floating rectangle lying off the monitor is pulled
    /// back onto it. Managing a window twice is rejected.
    #[instrument(level = "debug", skip(self, client))]
    pub fn manage_window(&mut self, d: DesktopId, window: u32, mut client: Client) -> Result<NodeId> {
        let m = self.desktop(d)?.monitor;
        self.claim_window_id(window)?;
        embrace_client(&self.monitors[m].rectangle, &mut client);
        let n = self.make_window_node(window, client);
        let anchor = self.desktops[d].focus;
        if let Err(e) = self.insert_node(d, n, anchor) {
            self.nodes.remove_subtree(n);
            return Err(e);
        }
        self.clients_count += 1;
        if self.focused_desktop() == Some(d) {
            self.focus_node(Some(m), Some(d), Some(n))?;
        } else {
            self.activate_node(m, d, Some(n))?;
        }
        Ok(n)
    }

    /// Inserts an empty leaf next to `anchor`, reserving space for a later window.
    pub fn insert_receptacle(&mut self, d: DesktopId, anchor: Option<NodeId>) -> Result<NodeId> {
        let r = self.make_node(None);
        if let Err(e) = self.insert_node(d, r, anchor) {
            self.nodes.remove_subtree(r);
            return Err(e);
        }
        Ok(r)
    }

    /// Detaches the subtree `n` from desktop `d`, promoting its sibling into
    /// the parent's place. `n` stays allocated.
    pub(crate) fn unlink_node(&mut self, d: DesktopId, n: NodeId) {
        let m = self.desktops[d].monitor;
        let Some(p) = n.parent(&self.nodes) else {
            let desktop = &mut self.desktops[d];
            desktop.root = None;
            desktop.focus = None;
            return;
        };

        if let Some(focus) = self.desktops[d].focus {
            if focus == p || focus.is_descendant_of(n, &self.nodes) {
                self.desktops[d].focus = None;
            }
        }
        self.history.remove_node(p, false, &self.nodes);
        self.nodes[p].presel = None;
        if self.nodes[p].sticky {
            let count = &mut self.monitors[m].sticky_count;
            *count = count.saturating_sub(1);
        }

        let Some(b) = n.brother(&self.nodes) else {
            return;
        };
        let g = p.parent(&self.nodes);
        let removed_first = n.is_first_child(&self.nodes);
        self.replace_slot(d, p, b);

        if !self.nodes[n].vacant && self.settings.removal_adjustment {
            match (self.settings.automatic_scheme, g) {
                (AutomaticScheme::Spiral, _) => {
                    let rot = if removed_first { Rotation::Deg270 } else { Rotation::Deg90 };
                    self.rotate_subtree(b, rot);
                }
                (AutomaticScheme::LongestSide, _) | (_, None) => {
                    let r = self.nodes[p].rectangle;
                    self.nodes[b].split_type =
                        if r.width > r.height { SplitType::Vertical } else { SplitType::Horizontal };
                }
                (AutomaticScheme::Alternate, Some(g)) => {
                    self.nodes[b].split_type = self.nodes[g].split_type.toggled();
                }
            }
            self.nodes.update_constraints(b);
        }

        let parent = &mut self.nodes[p];
        parent.first_child = None;
        parent.second_child = None;
        parent.parent = None;
        self.nodes.remove_subtree(p);
        self.nodes[n].parent = None;
        self.nodes.propagate_flags_upward(b);
        trace!(?n, ?b, "unlinked node");
    }

    /// Removes the subtree `n` from desktop `d` and frees it.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_node(&mut self, d: DesktopId, n: NodeId) -> Result<()> {
        self.check_member(d, n)?;
        let m = self.desktops[d].monitor;

        self.unlink_node(d, n);
        self.history.remove_node(n, true, &self.nodes);

        let monitor = &self.monitors[m];
        if monitor.sticky_count > 0 && monitor.desk == Some(d) {
            let sticky = self.sticky_count(n);
            let count = &mut self.monitors[m].sticky_count;
            *count = count.saturating_sub(sticky);
        }
        self.clients_count = self.clients_count.saturating_sub(self.clients_count_in(n));
        let freed = self.nodes.remove_subtree(n);
        debug!(count = freed.len(), "freed nodes");

        let desktop = &self.desktops[d];
        if self.settings.single_monocle
            && desktop.layout != Layout::Monocle
            && self.tiled_count(desktop.root, true) <= 1
        {
            self.set_layout(d, Layout::Monocle, false)?;
        }

        if self.mon.is_some() && self.desktops[d].focus.is_none() {
            if self.focused_desktop() == Some(d) {
                self.focus_node(Some(m), Some(d), None)?;
            } else {
                self.activate_node(m, d, None)?;
            }
        }
        Ok(())
    }

    pub fn presel_dir(&mut self, n: NodeId, dir: Direction) -> Result<()> {
        let ratio = self.settings.split_ratio;
        let node = self.node_mut(n)?;
        let presel = node.presel.get_or_insert(Presel { split_dir: dir, split_ratio: ratio });
        presel.split_dir = dir;
        trace!(?n, %dir, "preselected direction");
        Ok(())
    }

    pub fn presel_ratio(&mut self, n: NodeId, ratio: f64) -> Result<()> {
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(LayoutError::InvalidRatio(ratio));
        }
        let node = self.node_mut(n)?;
        let presel = node.presel.get_or_insert(Presel {
            split_dir: Direction::East,
            split_ratio: ratio,
        });
        presel.split_ratio = ratio;
        Ok(())
    }

    pub fn cancel_presel(&mut self, n: NodeId) -> Result<()> {
        self.node_mut(n)?.presel = None;
        Ok(())
    }

    /// Cancels every preselection in the subtree rooted at `n`.
    pub fn cancel_presel_in(&mut self, n: NodeId) -> Result<()> {
        self.node(n)?;
        let ids: Vec<NodeId> = n.traverse_preorder(&self.nodes).collect();
        for id in ids {
            self.nodes[id].presel = None;
        }
        Ok(())
    }
}
