//! Nested-ring layout engine for threaded comment discussions.

pub mod error;
pub mod graph;
pub mod settings;

pub use error::{Error, Result};
pub use graph::{Comment, LayoutEvent, ThreadLayout};
pub use settings::LayoutSettings;
