use thiserror::Error;

use super::desktop::DesktopId;
use super::monitor::MonitorId;
use super::tree::NodeId;

/// Reasons a world operation is rejected. A rejected operation leaves the
/// world unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("Node handle is no longer valid: {0:?}")]
    StaleNode(NodeId),
    #[error("Desktop handle is no longer valid: {0:?}")]
    StaleDesktop(DesktopId),
    #[error("Monitor handle is no longer valid: {0:?}")]
    StaleMonitor(MonitorId),
    #[error("Split ratio must lie strictly between 0 and 1, got {0}")]
    InvalidRatio(f64),
    #[error("Change would shrink a subtree below its minimum size")]
    ConstraintViolation,
    #[error("No fence in that direction")]
    NoFence,
    #[error("Invalid transfer: {0}")]
    InvalidTransfer(&'static str),
    #[error("Monitor {0:?} has only one desktop")]
    LastDesktop(MonitorId),
    #[error("Window {0:#x} is already managed")]
    DuplicateWindow(u32),
    #[error("Node {0:?} is not part of desktop {1:?}")]
    NotInDesktop(NodeId, DesktopId),
}

pub type Result<T, E = LayoutError> = std::result::Result<T, E>;
