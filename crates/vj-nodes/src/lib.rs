#![forbid(unsafe_code)]

//! Canvas nodes: the GPU-owning half of the render graph.
//!
//! Every node here renders to `Option<RenderTarget>` against any [`vj_gpu::Gpu`]:
//! - [`PostProcess`] re-renders one upstream target through a [`CanvasEffect`]
//! - [`Generative`] renders a [`CanvasEffect`] with no upstream
//! - [`Black`], [`BlackoutSwitch`] and [`ModeSwitch`] route or blank
//!
//! Ownership rule: a node owns the targets it created and hands downstream read-only handles.
//! `None` from `render` means "nothing to show this tick".
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

mod black;
mod canvas;
pub mod effects;
mod generative;
mod post_process;
mod surface;
mod switch;

#[cfg(test)]
pub(crate) mod testing;

pub use black::Black;
pub use canvas::{Canvas, CanvasEffect};
pub use generative::Generative;
pub use post_process::PostProcess;
pub use surface::Surface;
pub use switch::{BlackoutSwitch, ModeSwitch, ModeSwitchBuilder};

pub use vj_gpu::{EngineError, Gpu, RenderTarget};

/// A boxed node in a canvas graph.
pub type CanvasNode<G> = vj_graph::BoxedNode<G, Option<RenderTarget>>;
