//! pixelmill: in-memory pixel-transform engine.
//!
//! Color filters run over a [`PixelBuffer`] on a rayon pool with the
//! destination statically partitioned into row blocks; a [`HistoryStack`]
//! keeps snapshots of destructive edits for revert. The [`Editor`] threads the
//! working image through explicit commands, and `io` handles PNG/JPEG/BMP.

pub mod logger;

pub mod canvas;
pub mod cli;
pub mod components;
pub mod config;
pub mod editor;
pub mod error;
pub mod io;
pub mod ops;

pub use canvas::{Color, PixelBuffer};
pub use components::history::HistoryStack;
pub use config::{EngineConfig, HistoryPolicy};
pub use editor::{EditCommand, Editor};
pub use error::{EngineError, Result};
pub use io::{SaveFormat, decode, encode};
pub use ops::adjustments::{Filter, FilterDescriptor};
pub use ops::filters::{CancelToken, FilterExecutor, apply_filter};
pub use ops::transform::{Axis, Interpolation, fit_to_box, flip, resize, rotate_90};
