//! Reframe Layout
//!
//! Maps an arbitrarily oriented source video and an optional overlay onto
//! a composited output canvas:
//! - **Orientation:** infer portrait/landscape from a decoded reference frame
//! - **Canvas:** working video size and per-layer frames
//! - **Transform:** the affine transform applied to the video track
//!
//! All sizes are in pixels with a y-down origin at the top-left corner.

pub mod canvas;
pub mod geometry;
pub mod orientation;
pub mod resolver;
pub mod transform;

pub use canvas::*;
pub use geometry::*;
pub use orientation::*;
pub use resolver::*;
pub use transform::*;
