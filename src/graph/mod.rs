//! Ring geometry, force layout and reveal state for comment threads.

pub mod forces;
pub mod layout;
pub mod mapper;
pub mod quadtree;
pub mod reveal;
pub mod thread;
pub mod types;

pub use layout::{Camera, ForceLayout, LayoutStats};
pub use mapper::build_geometry;
pub use reveal::LayoutEvent;
pub use thread::{LayoutSnapshot, ThreadLayout};
pub use types::{
    author_color, flatten_comments, hsl_to_rgb, load_comments, Bucket, Circle, Comment, Geometry,
    Ring,
};
