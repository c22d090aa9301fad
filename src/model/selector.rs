use serde::{Deserialize, Serialize};

use super::desktop::DesktopId;
use super::monitor::MonitorId;
use super::tree::NodeId;
use crate::layout_engine::{CycleDir, Direction, HistoryDir};

/// Non-owning locator of a monitor, desktop and node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Coordinates {
    pub monitor: Option<MonitorId>,
    pub desktop: Option<DesktopId>,
    pub node: Option<NodeId>,
}

impl Coordinates {
    pub fn new(monitor: MonitorId, desktop: DesktopId, node: Option<NodeId>) -> Self {
        Coordinates {
            monitor: Some(monitor),
            desktop: Some(desktop),
            node,
        }
    }

    pub fn monitor(monitor: MonitorId) -> Self {
        Coordinates { monitor: Some(monitor), ..Default::default() }
    }

    pub fn desktop(monitor: MonitorId, desktop: DesktopId) -> Self {
        Coordinates::new(monitor, desktop, None)
    }
}

/// Tri-state membership test: `None` accepts anything.
pub fn check(wanted: Option<bool>, actual: bool) -> bool { wanted.is_none_or(|w| w == actual) }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeSelect {
    pub automatic: Option<bool>,
    pub focused: Option<bool>,
    pub active: Option<bool>,
    pub local: Option<bool>,
    pub leaf: Option<bool>,
    pub window: Option<bool>,
    pub tiled: Option<bool>,
    pub pseudo_tiled: Option<bool>,
    pub floating: Option<bool>,
    pub fullscreen: Option<bool>,
    pub hidden: Option<bool>,
    pub sticky: Option<bool>,
    pub private: Option<bool>,
    pub locked: Option<bool>,
    pub marked: Option<bool>,
    pub urgent: Option<bool>,
    pub same_class: Option<bool>,
    pub descendant_of: Option<bool>,
    pub ancestor_of: Option<bool>,
    pub below: Option<bool>,
    pub normal: Option<bool>,
    pub above: Option<bool>,
    pub horizontal: Option<bool>,
    pub vertical: Option<bool>,
}

impl NodeSelect {
    pub fn any() -> Self { Self::default() }

    /// Leaves holding a window.
    pub fn windows() -> Self {
        NodeSelect {
            window: Some(true),
            ..Default::default()
        }
    }

    pub fn tiled() -> Self {
        NodeSelect {
            tiled: Some(true),
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DesktopSelect {
    pub occupied: Option<bool>,
    pub focused: Option<bool>,
    pub active: Option<bool>,
    pub urgent: Option<bool>,
    pub local: Option<bool>,
    pub tiled: Option<bool>,
    pub monocle: Option<bool>,
    pub user_tiled: Option<bool>,
    pub user_monocle: Option<bool>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorSelect {
    pub occupied: Option<bool>,
    pub focused: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeDescriptor {
    Focused,
    Any,
    FirstAncestor,
    Cycle(CycleDir),
    Direction(Direction),
    History(HistoryDir),
    Newest,
    Biggest,
    Smallest,
    Id(u32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DesktopDescriptor {
    Focused,
    Any,
    Cycle(CycleDir),
    History(HistoryDir),
    Newest,
    /// One-based position in the global desktop order.
    Index(usize),
    Name(String),
    Id(u32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MonitorDescriptor {
    Focused,
    Primary,
    Any,
    Cycle(CycleDir),
    Direction(Direction),
    History(HistoryDir),
    Newest,
    /// One-based position in the monitor order.
    Index(usize),
    Name(String),
    Id(u32),
}

/// A parsed selector expression: a descriptor narrowed by membership flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    Node(NodeDescriptor, NodeSelect),
    Desktop(DesktopDescriptor, DesktopSelect),
    Monitor(MonitorDescriptor, MonitorSelect),
}
