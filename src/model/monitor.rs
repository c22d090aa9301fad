use super::client::Client;
use super::desktop::DesktopId;
use super::geometry::{Padding, Rect};

slotmap::new_key_type! {
    pub struct MonitorId;
}

pub const DEFAULT_MON_NAME: &str = "MONITOR";

/// Physical output holding an ordered list of desktops.
#[derive(Clone, Debug, PartialEq)]
pub struct Monitor {
    pub name: String,
    pub id: u32,
    /// Whether the output is currently connected and enabled.
    pub wired: bool,
    pub padding: Padding,
    pub window_gap: i32,
    pub border_width: u32,
    pub rectangle: Rect,
    pub sticky_count: u32,
    pub desktops: Vec<DesktopId>,
    pub desk: Option<DesktopId>,
}

impl Monitor {
    pub fn new(name: &str, id: u32, rectangle: Rect, window_gap: i32, border_width: u32) -> Self {
        Monitor {
            name: if name.is_empty() { DEFAULT_MON_NAME.to_owned() } else { name.to_owned() },
            id,
            wired: true,
            padding: Padding::default(),
            window_gap,
            border_width,
            rectangle,
            sticky_count: 0,
            desktops: Vec::new(),
            desk: None,
        }
    }

    pub fn position_of(&self, d: DesktopId) -> Option<usize> {
        self.desktops.iter().position(|&e| e == d)
    }
}

/// Pulls a floating rectangle lying entirely outside `m` back onto it.
pub fn embrace_client(m: &Rect, c: &mut Client) {
    let r = &mut c.floating_rectangle;
    if r.right() <= m.x as i32 {
        r.x = m.x;
    } else if r.x as i32 >= m.right() {
        r.x = (m.right() - r.width as i32).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
    }
    if r.bottom() <= m.y as i32 {
        r.y = m.y;
    } else if r.y as i32 >= m.bottom() {
        r.y = (m.bottom() - r.height as i32).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
    }
}

/// Remaps a floating rectangle from monitor `rs` to monitor `rd`, keeping
/// its relative position. The rectangle is clipped to `rs` while mapping and
/// the clipped margins are restored afterwards.
pub fn adapt_geometry(rs: &Rect, rd: &Rect, c: &mut Client) {
    let f = c.floating_rectangle;
    let (fx, fy, fw, fh) = (f.x as i32, f.y as i32, f.width as i32, f.height as i32);

    let left_adjust = (rs.x as i32 - fx).max(0);
    let top_adjust = (rs.y as i32 - fy).max(0);
    let right_adjust = ((fx + fw) - rs.right()).max(0);
    let bottom_adjust = ((fy + fh) - rs.bottom()).max(0);

    let cx = fx + left_adjust;
    let cy = fy + top_adjust;
    let cw = fw - (left_adjust + right_adjust);
    let ch = fh - (top_adjust + bottom_adjust);

    let dx_s = cx - rs.x as i32;
    let dy_s = cy - rs.y as i32;
    let deno_x = rs.width as i32 - cw;
    let deno_y = rs.height as i32 - ch;
    let dx_d = if deno_x == 0 { 0 } else { dx_s * (rd.width as i32 - cw) / deno_x };
    let dy_d = if deno_y == 0 { 0 } else { dy_s * (rd.height as i32 - ch) / deno_y };

    c.floating_rectangle = Rect::from_i32(
        rd.x as i32 + dx_d - left_adjust,
        rd.y as i32 + dy_d - top_adjust,
        cw + left_adjust + right_adjust,
        ch + top_adjust + bottom_adjust,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floating(r: Rect) -> Client { Client::new(1).with_floating_rectangle(r) }

    #[test]
    fn adapt_geometry_keeps_relative_position() {
        let rs = Rect::new(0, 0, 1000, 1000);
        let rd = Rect::new(1000, 0, 2000, 2000);
        let mut c = floating(Rect::new(450, 450, 100, 100));
        adapt_geometry(&rs, &rd, &mut c);
        assert_eq!(c.floating_rectangle, Rect::new(1950, 950, 100, 100));
    }

    #[test]
    fn adapt_geometry_restores_clipped_margins() {
        let rs = Rect::new(0, 0, 1000, 1000);
        let rd = Rect::new(0, 1000, 1000, 1000);
        let mut c = floating(Rect::new(-50, 100, 200, 100));
        adapt_geometry(&rs, &rd, &mut c);
        assert_eq!(c.floating_rectangle, Rect::new(-50, 1100, 200, 100));
    }

    #[test]
    fn embrace_pulls_back_lost_windows() {
        let m = Rect::new(0, 0, 1000, 800);
        let mut c = floating(Rect::new(1200, -300, 100, 100));
        embrace_client(&m, &mut c);
        assert_eq!(c.floating_rectangle, Rect::new(900, 0, 100, 100));
        let mut inside = floating(Rect::new(10, 10, 100, 100));
        embrace_client(&m, &mut inside);
        assert_eq!(inside.floating_rectangle, Rect::new(10, 10, 100, 100));
    }
}
