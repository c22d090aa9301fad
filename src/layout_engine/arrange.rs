use serde::Serialize;
use tracing::{debug, instrument, trace};

use super::{Layout, SplitType};
use crate::model::client::ClientState;
use crate::model::error::Result;
use crate::model::geometry::Rect;
use crate::model::monitor::adapt_geometry;
use crate::model::{DesktopId, MonitorId, NodeId, World};

/// Where a window should be realized after an arrangement pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    #[serde(skip)]
    pub node: NodeId,
    pub id: u32,
    pub rectangle: Rect,
    pub border_width: u32,
    /// The rectangle differs from the one reported last time.
    pub changed: bool,
}

impl World {
    /// Derives the rectangle of every node of desktop `d` and returns the
    /// resulting window placements in leaf order. Hidden windows are laid
    /// out but not reported.
    #[instrument(level = "debug", skip(self))]
    pub fn arrange(&mut self, m: MonitorId, d: DesktopId) -> Result<Vec<Placement>> {
        self.monitor(m)?;
        let Some(root) = self.desktop(d)?.root else {
            return Ok(Vec::new());
        };
        let area = self.desktop_area(d);
        trace!(?area, "working area");

        let mut placements = Vec::new();
        let mut stack = vec![(root, area)];
        while let Some((n, rect)) = stack.pop() {
            self.nodes[n].rectangle = rect;
            match (self.nodes[n].first_child, self.nodes[n].second_child) {
                (Some(a), Some(b)) => {
                    let (ra, rb) = self.split_rect(d, n, rect);
                    stack.push((b, rb));
                    stack.push((a, ra));
                }
                _ => {
                    if let Some(p) = self.place_leaf(m, d, n, rect) {
                        placements.push(p);
                    }
                }
            }
        }
        debug!(count = placements.len(), "arranged");
        Ok(placements)
    }

    /// Splits `rect` between the children of `n`, clamping the fence so each
    /// side keeps its minimum size. A clamped fence rewrites the ratio.
    fn split_rect(&mut self, d: DesktopId, n: NodeId, rect: Rect) -> (Rect, Rect) {
        let node = &self.nodes[n];
        let (a, b) = match (node.first_child, node.second_child) {
            (Some(a), Some(b)) => (a, b),
            _ => return (rect, rect),
        };
        if self.desktops[d].layout == Layout::Monocle || self.nodes[a].vacant || self.nodes[b].vacant {
            return (rect, rect);
        }
        let (ca, cb) = (self.nodes[a].constraints, self.nodes[b].constraints);
        let ratio = node.split_ratio;
        match node.split_type {
            SplitType::Vertical => {
                let total = rect.width;
                let mut fence = (total as f64 * ratio) as u16;
                if ca.min_width as u32 + cb.min_width as u32 <= total as u32 {
                    if fence < ca.min_width {
                        fence = ca.min_width;
                        self.nodes[n].split_ratio = fence as f64 / total as f64;
                    } else if fence > total - cb.min_width {
                        fence = total - cb.min_width;
                        self.nodes[n].split_ratio = fence as f64 / total as f64;
                    }
                }
                (
                    Rect::new(rect.x, rect.y, fence, rect.height),
                    Rect::from_i32(
                        rect.x as i32 + fence as i32,
                        rect.y as i32,
                        (total - fence) as i32,
                        rect.height as i32,
                    ),
                )
            }
            SplitType::Horizontal => {
                let total = rect.height;
                let mut fence = (total as f64 * ratio) as u16;
                if ca.min_height as u32 + cb.min_height as u32 <= total as u32 {
                    if fence < ca.min_height {
                        fence = ca.min_height;
                        self.nodes[n].split_ratio = fence as f64 / total as f64;
                    } else if fence > total - cb.min_height {
                        fence = total - cb.min_height;
                        self.nodes[n].split_ratio = fence as f64 / total as f64;
                    }
                }
                (
                    Rect::new(rect.x, rect.y, rect.width, fence),
                    Rect::from_i32(
                        rect.x as i32,
                        rect.y as i32 + fence as i32,
                        rect.width as i32,
                        (total - fence) as i32,
                    ),
                )
            }
        }
    }

    fn place_leaf(&mut self, m: MonitorId, d: DesktopId, n: NodeId, rect: Rect) -> Option<Placement> {
        let desktop = &self.desktops[d];
        let wg = if self.settings.gapless_monocle && desktop.layout == Layout::Monocle {
            0
        } else {
            desktop.window_gap
        };
        let monocle = desktop.layout == Layout::Monocle;
        let only_window = self.monitor_order.len() == 1
            && desktop.root.is_some_and(|r| self.nodes[r].client.is_some());
        let monitor_rect = self.monitors[m].rectangle;
        let settings = &self.settings;
        let node = &mut self.nodes[n];
        let hidden = node.hidden;
        let id = node.id;
        let client = node.client.as_mut()?;

        let bw = if (settings.borderless_monocle && monocle && client.is_tiled())
            || (settings.borderless_singleton && only_window)
            || client.state == ClientState::Fullscreen
        {
            0
        } else {
            client.border_width
        };
        let bleed = wg + 2 * bw as i32;
        let shrink = |len: u16| if bleed < len as i32 { (len as i32 - bleed) as u16 } else { 1 };

        let mut r = match client.state {
            ClientState::Tiled => Rect::new(rect.x, rect.y, shrink(rect.width), shrink(rect.height)),
            ClientState::PseudoTiled => {
                let f = client.floating_rectangle;
                let width = shrink(rect.width).min(f.width);
                let height = shrink(rect.height).min(f.height);
                if settings.center_pseudo_tiled {
                    Rect::from_i32(
                        rect.x as i32 - bw as i32 + (rect.width as i32 - wg - width as i32) / 2,
                        rect.y as i32 - bw as i32 + (rect.height as i32 - wg - height as i32) / 2,
                        width as i32,
                        height as i32,
                    )
                } else {
                    Rect::new(rect.x, rect.y, width, height)
                }
            }
            ClientState::Floating => client.floating_rectangle,
            ClientState::Fullscreen => monitor_rect,
        };
        if client.is_tiled() {
            client.tiled_rectangle = r;
        }
        if settings.honor_size_hints {
            (r.width, r.height) = client.apply_size_hints(r.width, r.height);
        }

        let changed = client.realized != Some(r);
        client.realized = Some(r);
        if hidden {
            return None;
        }
        Some(Placement {
            node: n,
            id,
            rectangle: r,
            border_width: bw,
            changed,
        })
    }

    /// Moves monitor `m` to `rect`, carrying floating windows along
    /// proportionally, and re-arranges all of its desktops.
    #[instrument(level = "debug", skip(self))]
    pub fn update_root(&mut self, m: MonitorId, rect: Rect) -> Result<Vec<Placement>> {
        let last = self.monitor(m)?.rectangle;
        self.monitors[m].rectangle = rect;
        self.sort_monitors();
        let desktops = self.monitors[m].desktops.clone();
        let mut placements = Vec::new();
        for d in desktops {
            if let Some(root) = self.desktops[d].root {
                let leaves: Vec<NodeId> = root.leaves(&self.nodes).collect();
                for f in leaves {
                    if let Some(c) = self.nodes[f].client.as_mut() {
                        adapt_geometry(&last, &rect, c);
                    }
                }
            }
            placements.extend(self.arrange(m, d)?);
        }
        Ok(placements)
    }
}
