#![forbid(unsafe_code)]

//! Backend-agnostic GPU contract.
//!
//! Nodes talk to the graphics context only through [`Gpu`]. Handles are opaque ids issued by the
//! backend; ownership rules live with whoever created them (a node releases what it created and
//! nothing else). `vj-runtime-glow` implements this over OpenGL; [`HeadlessGpu`] implements it
//! as pure bookkeeping for tests and GL-less previews.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

pub mod contract;
mod headless;

pub use headless::{DrawCall, GpuStats, HeadlessGpu, ObjectKind, DRAW_HISTORY};
pub use vj_core::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

/// Vertex array + buffer pair for a draw primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u32);

/// Offscreen render target (FBO + color texture).
///
/// This is also the value handed downstream from `render`: consumers read `color`, never write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTarget {
    pub fbo: FramebufferId,
    pub color: TextureId,
    pub width: u32,
    pub height: u32,
}

impl RenderTarget {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    F32(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    I32(i32),
    /// Texture unit index for a `sampler2D`.
    Sampler(u32),
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::F32(v)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(v: [f32; 2]) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::I32(v)
    }
}

/// The one piece of shared state in a show: the graphics context.
///
/// Single-threaded by contract. Creation calls may fail (compile errors, lost context); draw-time
/// calls are infallible and must never block.
pub trait Gpu {
    /// Allocate a color texture of `width`x`height` and an FBO with it attached.
    fn create_render_target(&mut self, width: u32, height: u32) -> Result<RenderTarget, EngineError>;
    fn delete_render_target(&mut self, target: RenderTarget);

    /// Compile and link a program. Failures are fatal setup errors for the calling node.
    fn compile_program(&mut self, vert: &str, frag: &str) -> Result<ProgramId, EngineError>;
    fn delete_program(&mut self, program: ProgramId);

    /// Screen-covering triangle with `a_pos`/`a_uv` at locations 0/1.
    fn create_fullscreen_triangle(&mut self) -> Result<MeshId, EngineError>;
    fn delete_mesh(&mut self, mesh: MeshId);

    /// Bind `target` for drawing and set the viewport to its full size.
    fn bind_target(&mut self, target: &RenderTarget);
    fn clear(&mut self, rgba: [f32; 4]);
    fn use_program(&mut self, program: ProgramId);
    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    /// Set a uniform on `program` (which must be in use). Returns `false` if the program has no
    /// active uniform by that name.
    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) -> bool;

    fn draw(&mut self, mesh: MeshId);
}

/// Uniform writer for one program.
///
/// Every write goes through [`Uniforms::set`], which swallows names the shader compiler
/// optimized away: an unused uniform is not an error.
pub struct Uniforms<'a> {
    gpu: &'a mut dyn Gpu,
    program: ProgramId,
}

impl<'a> Uniforms<'a> {
    pub fn new(gpu: &'a mut dyn Gpu, program: ProgramId) -> Self {
        Self { gpu, program }
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    /// Returns whether the uniform exists in the compiled program.
    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) -> bool {
        let applied = self.gpu.set_uniform(self.program, name, value.into());
        if !applied {
            tracing::trace!(uniform = name, "uniform inactive in program, skipped");
        }
        applied
    }

    /// Bind `texture` to `unit` and point sampler `name` at it.
    pub fn texture(&mut self, name: &str, unit: u32, texture: TextureId) -> bool {
        self.gpu.bind_texture(unit, texture);
        self.set(name, UniformValue::Sampler(unit))
    }
}

impl std::fmt::Debug for Uniforms<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uniforms")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}
