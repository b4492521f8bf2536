use std::collections::{BTreeMap, HashMap, VecDeque};

use tracing::warn;

use crate::contract::active_uniforms;
use crate::{
    EngineError, FramebufferId, Gpu, MeshId, ProgramId, RenderTarget, TextureId, UniformValue,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Texture,
    Framebuffer,
    Program,
    Mesh,
}

/// Running totals kept by [`HeadlessGpu`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GpuStats {
    pub created: usize,
    pub deleted: usize,
    /// Deletes of ids that were never created or were already deleted.
    pub invalid_deletes: usize,
    pub compiles: usize,
    pub clears: usize,
    pub draws: usize,
}

/// Draws kept by [`HeadlessGpu`]; older ones are dropped so a long-running preview stays bounded.
pub const DRAW_HISTORY: usize = 64;

/// One recorded `draw`.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    /// `None` means the default framebuffer.
    pub target: Option<RenderTarget>,
    pub program: Option<ProgramId>,
    pub mesh: MeshId,
    pub textures: BTreeMap<u32, TextureId>,
    /// Uniform values on `program` at draw time.
    pub uniforms: BTreeMap<String, UniformValue>,
}

/// Bookkeeping-only [`Gpu`]: no pixels, exact accounting.
///
/// Tracks every live object, flags double/unknown deletes, records the last [`DRAW_HISTORY`]
/// draws with their uniform state, and
/// simulates the parts of a driver that matter to the node contract: programs without `main`
/// fail to compile, and uniforms that are declared but never referenced are eliminated.
#[derive(Debug, Default)]
pub struct HeadlessGpu {
    next_id: u32,
    live: HashMap<u32, ObjectKind>,
    targets: HashMap<FramebufferId, RenderTarget>,
    program_uniforms: HashMap<ProgramId, Vec<String>>,
    uniform_values: HashMap<ProgramId, BTreeMap<String, UniformValue>>,
    bound_target: Option<RenderTarget>,
    program: Option<ProgramId>,
    textures: BTreeMap<u32, TextureId>,
    last_clear: HashMap<FramebufferId, [f32; 4]>,
    draws: VecDeque<DrawCall>,
    stats: GpuStats,
    context_lost: bool,
}

impl HeadlessGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following create call fail with [`EngineError::ContextLost`].
    pub fn set_context_lost(&mut self, lost: bool) {
        self.context_lost = lost;
    }

    pub fn stats(&self) -> GpuStats {
        self.stats
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_of(&self, kind: ObjectKind) -> usize {
        self.live.values().filter(|k| **k == kind).count()
    }

    pub fn is_live_texture(&self, tex: TextureId) -> bool {
        self.live.get(&tex.0) == Some(&ObjectKind::Texture)
    }

    pub fn is_live_framebuffer(&self, fbo: FramebufferId) -> bool {
        self.live.get(&fbo.0) == Some(&ObjectKind::Framebuffer)
    }

    /// Live render target by FBO id.
    pub fn target(&self, fbo: FramebufferId) -> Option<RenderTarget> {
        self.targets.get(&fbo).copied()
    }

    /// Last clear color applied to `fbo`.
    pub fn last_clear(&self, fbo: FramebufferId) -> Option<[f32; 4]> {
        self.last_clear.get(&fbo).copied()
    }

    /// Recorded draws, oldest first.
    pub fn draws(&self) -> impl Iterator<Item = &DrawCall> {
        self.draws.iter()
    }

    pub fn last_draw(&self) -> Option<&DrawCall> {
        self.draws.back()
    }

    pub fn take_draws(&mut self) -> Vec<DrawCall> {
        self.draws.drain(..).collect()
    }

    fn alloc(&mut self, kind: ObjectKind) -> Result<u32, EngineError> {
        if self.context_lost {
            return Err(EngineError::ContextLost);
        }
        self.next_id += 1;
        self.live.insert(self.next_id, kind);
        self.stats.created += 1;
        Ok(self.next_id)
    }

    fn free(&mut self, id: u32, kind: ObjectKind) {
        match self.live.get(&id) {
            Some(k) if *k == kind => {
                self.live.remove(&id);
                self.stats.deleted += 1;
            }
            _ => {
                self.stats.invalid_deletes += 1;
                warn!(id, ?kind, "headless: delete of unknown or already-deleted object");
            }
        }
    }
}

fn check_stage(src: &str) -> Result<(), String> {
    if src.contains("void main") {
        Ok(())
    } else {
        Err("0:0: error: missing entry point 'main'".to_string())
    }
}

impl Gpu for HeadlessGpu {
    fn create_render_target(&mut self, width: u32, height: u32) -> Result<RenderTarget, EngineError> {
        let color = TextureId(self.alloc(ObjectKind::Texture)?);
        let fbo = FramebufferId(self.alloc(ObjectKind::Framebuffer)?);
        let target = RenderTarget {
            fbo,
            color,
            width: width.max(1),
            height: height.max(1),
        };
        self.targets.insert(fbo, target);
        Ok(target)
    }

    fn delete_render_target(&mut self, target: RenderTarget) {
        self.free(target.fbo.0, ObjectKind::Framebuffer);
        self.free(target.color.0, ObjectKind::Texture);
        self.targets.remove(&target.fbo);
        self.last_clear.remove(&target.fbo);
        if self.bound_target.map(|t| t.fbo) == Some(target.fbo) {
            self.bound_target = None;
        }
    }

    fn compile_program(&mut self, vert: &str, frag: &str) -> Result<ProgramId, EngineError> {
        self.stats.compiles += 1;
        check_stage(vert).map_err(EngineError::VertexCompile)?;
        check_stage(frag).map_err(EngineError::FragmentCompile)?;
        let program = ProgramId(self.alloc(ObjectKind::Program)?);
        self.program_uniforms.insert(program, active_uniforms(frag));
        Ok(program)
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.free(program.0, ObjectKind::Program);
        self.program_uniforms.remove(&program);
        self.uniform_values.remove(&program);
        if self.program == Some(program) {
            self.program = None;
        }
    }

    fn create_fullscreen_triangle(&mut self) -> Result<MeshId, EngineError> {
        Ok(MeshId(self.alloc(ObjectKind::Mesh)?))
    }

    fn delete_mesh(&mut self, mesh: MeshId) {
        self.free(mesh.0, ObjectKind::Mesh);
    }

    fn bind_target(&mut self, target: &RenderTarget) {
        self.bound_target = Some(*target);
    }

    fn clear(&mut self, rgba: [f32; 4]) {
        self.stats.clears += 1;
        if let Some(t) = self.bound_target {
            self.last_clear.insert(t.fbo, rgba);
        }
    }

    fn use_program(&mut self, program: ProgramId) {
        self.program = Some(program);
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.textures.insert(unit, texture);
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) -> bool {
        let active = self
            .program_uniforms
            .get(&program)
            .is_some_and(|names| names.iter().any(|n| n == name));
        if active {
            self.uniform_values
                .entry(program)
                .or_default()
                .insert(name.to_string(), value);
        }
        active
    }

    fn draw(&mut self, mesh: MeshId) {
        self.stats.draws += 1;
        let uniforms = self
            .program
            .and_then(|p| self.uniform_values.get(&p).cloned())
            .unwrap_or_default();
        if self.draws.len() == DRAW_HISTORY {
            self.draws.pop_front();
        }
        self.draws.push_back(DrawCall {
            target: self.bound_target,
            program: self.program,
            mesh,
            textures: self.textures.clone(),
            uniforms,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::FULLSCREEN_VERT;
    use crate::Uniforms;

    const FRAG: &str = r#"#version 330 core
in vec2 v_uv;
out vec4 o;
uniform float u_gain;
uniform float u_dead;
void main() { o = vec4(v_uv, 0.0, 1.0) * u_gain; }
"#;

    #[test]
    fn create_then_delete_leaves_nothing_live() {
        let mut gpu = HeadlessGpu::new();
        let t = gpu.create_render_target(64, 32).unwrap();
        let p = gpu.compile_program(FULLSCREEN_VERT, FRAG).unwrap();
        let m = gpu.create_fullscreen_triangle().unwrap();
        assert_eq!(gpu.live_count(), 4);
        assert_eq!(gpu.target(t.fbo).map(|t| t.size()), Some((64, 32)));

        gpu.delete_render_target(t);
        gpu.delete_program(p);
        gpu.delete_mesh(m);
        assert_eq!(gpu.live_count(), 0);
        assert_eq!(gpu.stats().invalid_deletes, 0);
    }

    #[test]
    fn double_delete_is_flagged() {
        let mut gpu = HeadlessGpu::new();
        let m = gpu.create_fullscreen_triangle().unwrap();
        gpu.delete_mesh(m);
        gpu.delete_mesh(m);
        assert_eq!(gpu.stats().invalid_deletes, 1);
    }

    #[test]
    fn fragment_without_main_fails_to_compile() {
        let mut gpu = HeadlessGpu::new();
        let err = gpu
            .compile_program(FULLSCREEN_VERT, "#version 330 core\nout vec4 o;")
            .unwrap_err();
        assert!(matches!(err, EngineError::FragmentCompile(_)));
        assert_eq!(gpu.live_count(), 0);
    }

    #[test]
    fn eliminated_uniforms_report_false() {
        let mut gpu = HeadlessGpu::new();
        let p = gpu.compile_program(FULLSCREEN_VERT, FRAG).unwrap();
        gpu.use_program(p);
        let mut u = Uniforms::new(&mut gpu, p);
        assert!(u.set("u_gain", 0.5f32));
        assert!(!u.set("u_dead", 1.0f32));
        assert!(!u.set("u_never_declared", 1.0f32));
    }

    #[test]
    fn context_loss_fails_creation() {
        let mut gpu = HeadlessGpu::new();
        gpu.set_context_lost(true);
        assert!(matches!(
            gpu.create_render_target(8, 8),
            Err(EngineError::ContextLost)
        ));
    }

    #[test]
    fn draws_snapshot_target_program_and_uniforms() {
        let mut gpu = HeadlessGpu::new();
        let t = gpu.create_render_target(16, 16).unwrap();
        let p = gpu.compile_program(FULLSCREEN_VERT, FRAG).unwrap();
        let m = gpu.create_fullscreen_triangle().unwrap();
        gpu.bind_target(&t);
        gpu.clear([0.0, 0.0, 0.0, 1.0]);
        gpu.use_program(p);
        gpu.set_uniform(p, "u_gain", UniformValue::F32(2.0));
        gpu.draw(m);

        let draw = gpu.last_draw().unwrap();
        assert_eq!(draw.target, Some(t));
        assert_eq!(draw.program, Some(p));
        assert_eq!(draw.uniforms.get("u_gain"), Some(&UniformValue::F32(2.0)));
        assert_eq!(gpu.last_clear(t.fbo), Some([0.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn draw_history_is_bounded() {
        let mut gpu = HeadlessGpu::new();
        let p = gpu.compile_program(FULLSCREEN_VERT, FRAG).unwrap();
        let m = gpu.create_fullscreen_triangle().unwrap();
        gpu.use_program(p);
        for i in 0..DRAW_HISTORY * 3 {
            gpu.set_uniform(p, "u_gain", UniformValue::F32(i as f32));
            gpu.draw(m);
        }
        assert_eq!(gpu.stats().draws, DRAW_HISTORY * 3);
        assert_eq!(gpu.draws().count(), DRAW_HISTORY);
        let last = (DRAW_HISTORY * 3 - 1) as f32;
        assert_eq!(
            gpu.last_draw().unwrap().uniforms.get("u_gain"),
            Some(&UniformValue::F32(last))
        );

        assert_eq!(gpu.take_draws().len(), DRAW_HISTORY);
        assert!(gpu.last_draw().is_none());
    }
}
