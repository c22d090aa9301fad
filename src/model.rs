pub mod client;
pub mod desktop;
pub mod error;
pub mod geometry;
pub mod history;
pub mod monitor;
pub mod selector;
pub mod state;
pub mod tree;
pub mod world;

pub use client::{Client, ClientState, SizeHints, StackLayer};
pub use desktop::{Desktop, DesktopId};
pub use error::LayoutError;
pub use geometry::{Padding, Point, Rect};
pub use history::History;
pub use monitor::{Monitor, MonitorId};
pub use selector::{Coordinates, Selector};
pub use tree::{Node, NodeId, NodeMap};
pub use world::World;
