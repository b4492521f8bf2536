use tracing::debug;
use vj_gpu::{EngineError, Gpu, RenderTarget};

/// Size state of one node-owned render target.
///
/// Semantics:
/// - `Uninitialized` holds nothing on the GPU
/// - `Sized` owns exactly one target at that size
/// - a size change releases the old target before creating the new one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Surface {
    #[default]
    Uninitialized,
    Sized(RenderTarget),
}

impl Surface {
    pub fn target(&self) -> Option<RenderTarget> {
        match self {
            Surface::Uninitialized => None,
            Surface::Sized(t) => Some(*t),
        }
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.target().map(|t| t.size())
    }

    /// Return a target of exactly `width`x`height`, reallocating if the size changed.
    pub fn ensure_size(
        &mut self,
        gpu: &mut dyn Gpu,
        width: u32,
        height: u32,
    ) -> Result<RenderTarget, EngineError> {
        let (width, height) = (width.max(1), height.max(1));
        if let Surface::Sized(current) = *self {
            if current.size() == (width, height) {
                return Ok(current);
            }
            debug!(
                from = ?current.size(),
                to = ?(width, height),
                "surface: resizing"
            );
            self.release(gpu);
        }
        let target = gpu.create_render_target(width, height)?;
        *self = Surface::Sized(target);
        Ok(target)
    }

    pub fn release(&mut self, gpu: &mut dyn Gpu) {
        if let Surface::Sized(target) = std::mem::take(self) {
            gpu.delete_render_target(target);
        }
    }

    /// Bind at `width`x`height` and clear to opaque black.
    pub fn clear_black(
        &mut self,
        gpu: &mut dyn Gpu,
        width: u32,
        height: u32,
    ) -> Result<RenderTarget, EngineError> {
        let target = self.ensure_size(gpu, width, height)?;
        gpu.bind_target(&target);
        gpu.clear([0.0, 0.0, 0.0, 1.0]);
        Ok(target)
    }
}
