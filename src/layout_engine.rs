//! Operations on the [`World`](crate::model::World): tree insertion and
//! removal, tree surgery, rectangle derivation, focus, containment of
//! desktops and monitors, and selector resolution.

mod arrange;
mod containment;
mod focus;
pub(crate) mod graph;
mod insert;
mod resolve;
mod surgery;

pub use arrange::Placement;
pub use containment::Output;
pub use graph::{
    AreaPeak, AutomaticScheme, ChildPolarity, CycleDir, Direction, Flip, HistoryDir, Layout,
    Rotation, SplitMode, SplitType, Tightness,
};

#[cfg(test)]
mod tests;
