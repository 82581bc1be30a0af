//! Rasterpad: an embeddable layered raster drawing engine.
//!
//! The host UI owns the window and widgets; it builds an [`Editor`], forwards
//! pointer input to it and calls its commands. The editor keeps a stack of
//! pixel layers, runs the active tool's gesture state machine against the
//! active layer, and exports the flattened result plus every layer as PNG.

pub mod logger;

pub mod color;
pub mod compositor;
pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod io;
pub mod layers;
pub mod marquee;
pub mod surface;
pub mod tools;

pub use color::{Swatch, hex2rgb, rgb2hex};
pub use compositor::{StateCollector, StateEntry};
pub use config::EditorParams;
pub use editor::{Editor, PressureSource};
pub use error::{EditorError, Result};
pub use geometry::{Point, SelectionRect};
pub use gesture::{GestureOutcome, Modifiers, PointerId, PointerInput};
pub use tools::{Cursor, ToolKind};
