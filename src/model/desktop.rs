use super::geometry::Padding;
use super::monitor::MonitorId;
use super::tree::NodeId;
use crate::layout_engine::Layout;

slotmap::new_key_type! {
    pub struct DesktopId;
}

pub const DEFAULT_DESK_NAME: &str = "Desktop";

/// Named container owning one layout tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Desktop {
    pub name: String,
    pub id: u32,
    pub monitor: MonitorId,
    pub root: Option<NodeId>,
    /// Focused node of this desktop, always inside `root`'s tree.
    pub focus: Option<NodeId>,
    pub layout: Layout,
    pub user_layout: Layout,
    pub padding: Padding,
    pub window_gap: i32,
    pub border_width: u32,
}

impl Desktop {
    pub fn new(name: &str, id: u32, monitor: MonitorId, window_gap: i32, border_width: u32) -> Self {
        Desktop {
            name: if name.is_empty() { DEFAULT_DESK_NAME.to_owned() } else { name.to_owned() },
            id,
            monitor,
            root: None,
            focus: None,
            layout: Layout::Tiled,
            user_layout: Layout::Tiled,
            padding: Padding::default(),
            window_gap,
            border_width,
        }
    }

    pub fn is_occupied(&self) -> bool { self.root.is_some() }
}
