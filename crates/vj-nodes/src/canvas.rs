use std::fmt;

use rand::rngs::StdRng;
use tracing::debug;

use vj_core::{ColorScheme, Frame, Vibe};
use vj_gpu::contract::{FULLSCREEN_VERT, RESOLUTION, TIME};
use vj_gpu::{EngineError, Gpu, MeshId, ProgramId, RenderTarget, Uniforms};

use crate::Surface;

/// One fullscreen shader pass: program, primitive, and the target it draws into.
///
/// `acquire` compiles the program (compile errors surface here); the target is sized lazily on
/// the first draw and reallocated whenever the requested size changes.
pub struct Canvas {
    fragment: String,
    program: Option<ProgramId>,
    mesh: Option<MeshId>,
    surface: Surface,
}

impl Canvas {
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
            program: None,
            mesh: None,
            surface: Surface::Uninitialized,
        }
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn is_acquired(&self) -> bool {
        self.program.is_some()
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn acquire(&mut self, gpu: &mut dyn Gpu) -> Result<(), EngineError> {
        if self.program.is_some() {
            return Ok(());
        }
        let program = gpu.compile_program(FULLSCREEN_VERT, &self.fragment)?;
        let mesh = match gpu.create_fullscreen_triangle() {
            Ok(mesh) => mesh,
            Err(e) => {
                gpu.delete_program(program);
                return Err(e);
            }
        };
        self.program = Some(program);
        self.mesh = Some(mesh);
        Ok(())
    }

    pub fn release(&mut self, gpu: &mut dyn Gpu) {
        self.surface.release(gpu);
        if let Some(program) = self.program.take() {
            gpu.delete_program(program);
        }
        if let Some(mesh) = self.mesh.take() {
            gpu.delete_mesh(mesh);
        }
    }

    /// Clear this canvas's own target to black at `width`x`height`.
    pub fn render_black(
        &mut self,
        gpu: &mut dyn Gpu,
        width: u32,
        height: u32,
    ) -> Result<RenderTarget, EngineError> {
        self.surface.clear_black(gpu, width, height)
    }

    /// Run the pass at `width`x`height`.
    ///
    /// `u_time` and `u_resolution` are set before `set_uniforms` runs; any name the compiler
    /// dropped is skipped.
    pub fn draw(
        &mut self,
        gpu: &mut dyn Gpu,
        width: u32,
        height: u32,
        time: f32,
        set_uniforms: impl FnOnce(&mut Uniforms<'_>),
    ) -> Result<RenderTarget, EngineError> {
        let (Some(program), Some(mesh)) = (self.program, self.mesh) else {
            return Err(EngineError::other("canvas drawn before acquire"));
        };
        let target = self.surface.clear_black(gpu, width, height)?;
        gpu.use_program(program);
        {
            let mut uniforms = Uniforms::new(&mut *gpu, program);
            uniforms.set(TIME, time);
            uniforms.set(RESOLUTION, [target.width as f32, target.height as f32]);
            set_uniforms(&mut uniforms);
        }
        gpu.draw(mesh);
        Ok(target)
    }
}

impl fmt::Debug for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canvas")
            .field("program", &self.program)
            .field("mesh", &self.mesh)
            .field("surface", &self.surface)
            .field("fragment_len", &self.fragment.len())
            .finish()
    }
}

/// The effect-specific half of a canvas node.
///
/// [`PostProcess`](crate::PostProcess) and [`Generative`](crate::Generative) own the canvas and
/// drive the lifecycle; an effect only supplies its fragment stage and its uniforms. Multi-pass
/// effects own extra [`Canvas`]es and run them in [`CanvasEffect::prepare`].
pub trait CanvasEffect {
    fn name(&self) -> &'static str;

    /// Fragment stage compiled against [`FULLSCREEN_VERT`].
    fn fragment_shader(&self) -> &str;

    /// Re-roll parameters for a new mode.
    fn generate(&mut self, _vibe: &Vibe, _rng: &mut StdRng) {}

    /// Effect uniforms for the final pass. Runs every tick.
    fn set_uniforms(&mut self, frame: &Frame, scheme: &ColorScheme, uniforms: &mut Uniforms<'_>);

    fn acquire_passes(&mut self, _gpu: &mut dyn Gpu) -> Result<(), EngineError> {
        Ok(())
    }

    fn release_passes(&mut self, _gpu: &mut dyn Gpu) {}

    /// Intermediate passes over the upstream target, run before the final pass.
    fn prepare(
        &mut self,
        _gpu: &mut dyn Gpu,
        _source: &RenderTarget,
        _frame: &Frame,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    fn describe(&self) -> String {
        self.name().to_string()
    }
}

/// Shared `enter` body: main canvas first, then the effect's private passes.
pub(crate) fn acquire_effect<E: CanvasEffect>(
    canvas: &mut Canvas,
    effect: &mut E,
    gpu: &mut dyn Gpu,
) -> Result<(), EngineError> {
    canvas.acquire(gpu)?;
    if let Err(e) = effect.acquire_passes(gpu) {
        effect.release_passes(gpu);
        canvas.release(gpu);
        return Err(e);
    }
    debug!(effect = effect.name(), "canvas: acquired");
    Ok(())
}

pub(crate) fn release_effect<E: CanvasEffect>(
    canvas: &mut Canvas,
    effect: &mut E,
    gpu: &mut dyn Gpu,
) {
    effect.release_passes(gpu);
    canvas.release(gpu);
    debug!(effect = effect.name(), "canvas: released");
}

#[cfg(test)]
mod tests {
    use super::*;
    use vj_gpu::{HeadlessGpu, ObjectKind, UniformValue};

    const FRAG: &str = r#"#version 330 core
in vec2 v_uv;
out vec4 o;
uniform float u_time;
uniform vec3 u_color;
void main() { o = vec4(u_color * u_time, 1.0); }
"#;

    #[test]
    fn acquire_is_idempotent_and_release_frees_everything() {
        let mut gpu = HeadlessGpu::new();
        let mut canvas = Canvas::new(FRAG);
        canvas.acquire(&mut gpu).unwrap();
        canvas.acquire(&mut gpu).unwrap();
        assert_eq!(gpu.stats().compiles, 1);
        assert_eq!(gpu.live_of(ObjectKind::Program), 1);

        canvas.draw(&mut gpu, 8, 8, 0.0, |_| {}).unwrap();
        canvas.release(&mut gpu);
        assert!(!canvas.is_acquired());
        assert_eq!(gpu.live_count(), 0);
        assert_eq!(gpu.stats().invalid_deletes, 0);
    }

    #[test]
    fn draw_sets_standard_uniforms_when_present() {
        let mut gpu = HeadlessGpu::new();
        let mut canvas = Canvas::new(FRAG);
        canvas.acquire(&mut gpu).unwrap();
        let target = canvas
            .draw(&mut gpu, 40, 20, 1.5, |u| {
                assert!(u.set("u_color", [1.0f32, 0.0, 0.0]));
                assert!(!u.set("u_missing", 1.0f32));
            })
            .unwrap();

        let draw = gpu.last_draw().unwrap();
        assert_eq!(draw.target, Some(target));
        assert_eq!(draw.uniforms.get(TIME), Some(&UniformValue::F32(1.5)));
        // Declared nowhere in FRAG, so never applied.
        assert!(!draw.uniforms.contains_key(RESOLUTION));
        assert_eq!(
            draw.uniforms.get("u_color"),
            Some(&UniformValue::Vec3([1.0, 0.0, 0.0]))
        );
    }

    #[test]
    fn draw_before_acquire_is_an_error() {
        let mut gpu = HeadlessGpu::new();
        let mut canvas = Canvas::new(FRAG);
        assert!(canvas.draw(&mut gpu, 8, 8, 0.0, |_| {}).is_err());
        assert_eq!(gpu.live_count(), 0);
    }

    #[test]
    fn compile_failure_leaves_nothing_live() {
        let mut gpu = HeadlessGpu::new();
        let mut canvas = Canvas::new("#version 330 core\nout vec4 o;\n");
        let err = canvas.acquire(&mut gpu).unwrap_err();
        assert!(err.is_shader_error());
        assert!(!canvas.is_acquired());
        assert_eq!(gpu.live_count(), 0);
    }
}
