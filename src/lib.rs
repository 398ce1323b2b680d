//! PhotoFE raster editing engine: non-destructive adjustments, one-shot
//! filters, a vector shape/text overlay, layers, collages and snapshot
//! undo/redo, all over 8-bit RGBA buffers.

#![allow(clippy::too_many_arguments)]

#[macro_use]
pub mod logger;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod error;
pub mod io;
pub mod ops;
pub mod project;

pub use canvas::{Color, PixelBuffer};
pub use error::{EditorError, EditorResult};
pub use project::Project;
