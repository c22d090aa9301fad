#![allow(clippy::too_many_arguments)]

pub mod common;
pub mod layout_engine;
pub mod model;
