use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::geometry::Rect;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClientState {
    #[default]
    Tiled,
    PseudoTiled,
    Floating,
    Fullscreen,
}

impl ClientState {
    pub fn is_tiled(self) -> bool { matches!(self, ClientState::Tiled | ClientState::PseudoTiled) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StackLayer {
    Below,
    #[default]
    Normal,
    Above,
}

/// Sizing preferences advertised by a window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SizeHints {
    pub min_size: Option<(u16, u16)>,
    pub max_size: Option<(u16, u16)>,
    pub base_size: Option<(u16, u16)>,
    pub resize_inc: Option<(u16, u16)>,
    /// Minimum and maximum aspect ratios as `(numerator, denominator)` pairs.
    pub aspect: Option<((i32, i32), (i32, i32))>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub class_name: String,
    pub instance_name: String,
    pub state: ClientState,
    pub last_state: ClientState,
    pub layer: StackLayer,
    pub last_layer: StackLayer,
    pub border_width: u32,
    pub urgent: bool,
    pub shown: bool,
    pub tiled_rectangle: Rect,
    pub floating_rectangle: Rect,
    pub size_hints: SizeHints,
    /// Rectangle last handed to the window system.
    #[serde(skip)]
    pub(crate) realized: Option<Rect>,
}

pub const MISSING_VALUE: &str = "N/A";

impl Client {
    pub fn new(border_width: u32) -> Client {
        Client {
            class_name: MISSING_VALUE.to_owned(),
            instance_name: MISSING_VALUE.to_owned(),
            state: ClientState::Tiled,
            last_state: ClientState::Tiled,
            layer: StackLayer::Normal,
            last_layer: StackLayer::Normal,
            border_width,
            urgent: false,
            shown: false,
            tiled_rectangle: Rect::default(),
            floating_rectangle: Rect::default(),
            size_hints: SizeHints::default(),
            realized: None,
        }
    }

    pub fn with_class(mut self, class_name: &str, instance_name: &str) -> Client {
        self.class_name = class_name.to_owned();
        self.instance_name = instance_name.to_owned();
        self
    }

    pub fn with_floating_rectangle(mut self, rect: Rect) -> Client {
        self.floating_rectangle = rect;
        self
    }

    pub fn is_tiled(&self) -> bool { self.state.is_tiled() }

    pub fn is_floating(&self) -> bool { self.state == ClientState::Floating }

    /// Adjusts a candidate size to the client's hints: aspect, minimum,
    /// maximum and resize increments, in that order.
    pub fn apply_size_hints(&self, width: u16, height: u16) -> (u16, u16) {
        if self.state == ClientState::Fullscreen {
            return (width, height);
        }
        let hints = &self.size_hints;
        let (mut w, mut h) = (width as i64, height as i64);

        let (real_basew, real_baseh) = hints.base_size.map_or((0, 0), |(w, h)| (w as i64, h as i64));
        let (basew, baseh) = hints
            .base_size
            .or(hints.min_size)
            .map_or((0, 0), |(w, h)| (w as i64, h as i64));
        let (minw, minh) = hints
            .min_size
            .or(hints.base_size)
            .map_or((0, 0), |(w, h)| (w as i64, h as i64));

        if let Some(((min_num, min_den), (max_num, max_den))) = hints.aspect {
            if min_den > 0 && max_den > 0 && h > real_baseh && w > real_basew {
                let dx = (w - real_basew) as f64;
                let dy = (h - real_baseh) as f64;
                let ratio = dx / dy;
                let min = min_num as f64 / min_den as f64;
                let max = max_num as f64 / max_den as f64;
                if max > 0.0 && min > 0.0 && ratio > 0.0 {
                    if ratio < min {
                        h = (dx / min).max(0.0) as i64 + real_baseh;
                    } else if ratio > max {
                        w = (dy * max).max(0.0) as i64 + real_basew;
                    }
                }
            }
        }

        w = w.max(minw);
        h = h.max(minh);

        if let Some((maxw, maxh)) = hints.max_size {
            if maxw > 0 {
                w = w.min(maxw as i64);
            }
            if maxh > 0 {
                h = h.min(maxh as i64);
            }
        }

        if let Some((incw, inch)) = hints.resize_inc {
            if incw > 0 && inch > 0 {
                if w > basew {
                    w -= (w - basew) % incw as i64;
                }
                if h > baseh {
                    h -= (h - baseh) % inch as i64;
                }
            }
        }

        (
            w.clamp(1, u16::MAX as i64) as u16,
            h.clamp(1, u16::MAX as i64) as u16,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(hints: SizeHints) -> Client {
        let mut c = Client::new(1);
        c.size_hints = hints;
        c
    }

    #[test]
    fn no_hints_leave_size_untouched() {
        assert_eq!(client(SizeHints::default()).apply_size_hints(640, 480), (640, 480));
    }

    #[test]
    fn min_and_max_size() {
        let c = client(SizeHints {
            min_size: Some((100, 100)),
            max_size: Some((500, 400)),
            ..Default::default()
        });
        assert_eq!(c.apply_size_hints(50, 50), (100, 100));
        assert_eq!(c.apply_size_hints(800, 800), (500, 400));
    }

    #[test]
    fn resize_increments_round_down_from_base() {
        // Terminal-style hints: 10x20 cells over a 4x4 base.
        let c = client(SizeHints {
            base_size: Some((4, 4)),
            resize_inc: Some((10, 20)),
            ..Default::default()
        });
        assert_eq!(c.apply_size_hints(499, 599), (494, 584));
    }

    #[test]
    fn aspect_ratio_reduces_the_long_side() {
        let square = ((1, 1), (1, 1));
        let c = client(SizeHints { aspect: Some(square), ..Default::default() });
        assert_eq!(c.apply_size_hints(800, 600), (600, 600));
        assert_eq!(c.apply_size_hints(600, 800), (600, 600));
    }

    #[test]
    fn fullscreen_ignores_hints() {
        let mut c = client(SizeHints { max_size: Some((10, 10)), ..Default::default() });
        c.state = ClientState::Fullscreen;
        assert_eq!(c.apply_size_hints(800, 600), (800, 600));
    }

    #[test]
    fn tiled_states() {
        assert!(ClientState::Tiled.is_tiled());
        assert!(ClientState::PseudoTiled.is_tiled());
        assert!(!ClientState::Floating.is_tiled());
        assert!(!ClientState::Fullscreen.is_tiled());
    }
}
