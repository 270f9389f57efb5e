//! Reframe Render Engine
//!
//! Turns a recorded clip plus an optional overlay snapshot into a
//! composited, size-limited video file.
//!
//! # Pipeline Architecture
//!
//! ```text
//! clip.mov ──┬── Probe (size, rotation, audio)
//!            │          │
//!            └── Reference frame ──┐
//!                                  ├── Layout (orientation, canvas, transform)
//!                                  │          │
//! overlay snapshot ────────────────┼──────────┤
//!                                  ▼          ▼
//!                               Composition (background, video, overlay)
//!                                             │
//!                                             ▼
//!                                  Encode (H.264, byte limit)
//!                                             │
//!                                             ▼
//!                                         <uuid>.mov
//! ```

pub mod compositor;
pub mod editor;
pub mod export;
pub mod probe;
pub mod snapshot;
pub mod thumbnail;

pub use compositor::*;
pub use editor::*;
pub use export::*;
pub use probe::*;
pub use snapshot::*;
pub use thumbnail::*;
