use tracing::warn;

use vj_core::{ColorScheme, Frame, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use vj_gpu::{EngineError, Gpu, RenderTarget};
use vj_graph::Node;

use crate::Surface;

/// Always-black output. No shader: the target is just cleared.
#[derive(Debug)]
pub struct Black {
    surface: Surface,
    width: u32,
    height: u32,
    active: bool,
}

impl Default for Black {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl Black {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: Surface::Uninitialized,
            width,
            height,
            active: false,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Black at an explicit size, e.g. to match a sibling branch's output.
    pub fn render_with_size(
        &mut self,
        gpu: &mut dyn Gpu,
        width: u32,
        height: u32,
    ) -> Option<RenderTarget> {
        debug_assert!(self.active, "Black rendered outside enter/exit");
        if !self.active {
            // Nothing would release a target allocated here.
            return None;
        }
        match self.surface.clear_black(gpu, width, height) {
            Ok(target) => Some(target),
            Err(e) => {
                warn!(error = %e, "black: target allocation failed");
                None
            }
        }
    }
}

impl<G: Gpu> Node<G, Option<RenderTarget>> for Black {
    fn enter(&mut self, ctx: &mut G) -> Result<(), EngineError> {
        self.surface.ensure_size(ctx, self.width, self.height)?;
        self.active = true;
        Ok(())
    }

    fn exit(&mut self, ctx: &mut G) {
        self.surface.release(ctx);
        self.active = false;
    }

    fn render(&mut self, _frame: &Frame, _scheme: &ColorScheme, ctx: &mut G) -> Option<RenderTarget> {
        let (w, h) = (self.width, self.height);
        self.render_with_size(ctx, w, h)
    }
}
