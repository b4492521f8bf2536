//! Show-level data carried into the render graph.
//!
//! Everything here is plain data: no GL handles, no node logic. The host builds a [`Frame`] and a
//! [`ColorScheme`] every display tick and a [`Vibe`] every time the show mode changes.
#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

pub mod color;
pub mod config;
pub mod error;
pub mod frame;
pub mod mode;

pub use color::{Color, ColorScheme};
pub use config::ShowConfig;
pub use error::EngineError;
pub use frame::{Frame, FrameSignal};
pub use mode::{Mode, Vibe};

/// Canvas size used when a node has nothing upstream to size itself from.
pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;
