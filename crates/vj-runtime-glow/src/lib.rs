//! vj runtime (glow/OpenGL backend)
//
// This crate intentionally contains **only** the GL side of the `Gpu` contract:
// - compile/link shaders
// - manage render targets (FBO + texture)
// - draw the fullscreen triangle, set uniforms, bind textures
//
// It does NOT contain windowing, node logic, or scheduling. The host owns the GL context and
// makes it current before handing a `GlowGpu` to the graph.
#![allow(clippy::missing_safety_doc)]
#![deny(missing_debug_implementations)]

use std::collections::HashMap;

use glow::HasContext;
use tracing::debug;

use vj_gpu::contract::FULLSCREEN_TRIANGLE;
use vj_gpu::{FramebufferId, Gpu, MeshId, ProgramId, RenderTarget, TextureId, UniformValue};

pub use vj_core::EngineError;

/// Maps the contract's opaque ids onto native GL objects.
#[derive(Debug)]
struct HandleTable<T> {
    next: u32,
    slots: HashMap<u32, T>,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self {
            next: 0,
            slots: HashMap::new(),
        }
    }
}

impl<T: Copy> HandleTable<T> {
    fn insert(&mut self, native: T) -> u32 {
        self.next += 1;
        self.slots.insert(self.next, native);
        self.next
    }

    fn get(&self, id: u32) -> Option<T> {
        self.slots.get(&id).copied()
    }

    fn remove(&mut self, id: u32) -> Option<T> {
        self.slots.remove(&id)
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    /// Id the next `insert` will hand out.
    fn peek_next(&self) -> u32 {
        self.next + 1
    }
}

#[derive(Debug, Clone, Copy)]
struct NativeMesh {
    vao: glow::NativeVertexArray,
    vbo: glow::NativeBuffer,
}

/// [`Gpu`] over a current OpenGL 3.3 core context.
pub struct GlowGpu {
    gl: glow::Context,
    textures: HandleTable<glow::NativeTexture>,
    framebuffers: HandleTable<glow::NativeFramebuffer>,
    programs: HandleTable<glow::NativeProgram>,
    meshes: HandleTable<NativeMesh>,
}

impl std::fmt::Debug for GlowGpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // `glow::Context` holds a function table and does not implement Debug.
        f.debug_struct("GlowGpu")
            .field("textures", &self.textures.len())
            .field("framebuffers", &self.framebuffers.len())
            .field("programs", &self.programs.len())
            .field("meshes", &self.meshes.len())
            .field("gl", &"<glow context>")
            .finish()
    }
}

impl GlowGpu {
    pub fn new(gl: glow::Context) -> Self {
        Self {
            gl,
            textures: HandleTable::default(),
            framebuffers: HandleTable::default(),
            programs: HandleTable::default(),
            meshes: HandleTable::default(),
        }
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// Objects created through this backend and not yet deleted.
    pub fn live_objects(&self) -> usize {
        self.textures.len() + self.framebuffers.len() + self.programs.len() + self.meshes.len()
    }

    /// Blit `target` into the default framebuffer, scaled to `window_w`x`window_h`.
    pub fn present(&mut self, target: &RenderTarget, window_w: u32, window_h: u32) {
        let Some(fbo) = self.framebuffers.get(target.fbo.0) else {
            return;
        };
        unsafe {
            self.gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(fbo));
            self.gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
            self.gl.blit_framebuffer(
                0,
                0,
                target.width as i32,
                target.height as i32,
                0,
                0,
                window_w as i32,
                window_h as i32,
                glow::COLOR_BUFFER_BIT,
                glow::LINEAR,
            );
            self.gl.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
            self.gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
        }
    }

    /// Clear the default framebuffer (used when the graph has nothing to show).
    pub fn clear_screen(&mut self, window_w: u32, window_h: u32) {
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.gl.viewport(0, 0, window_w as i32, window_h as i32);
            self.gl.clear_color(0.0, 0.0, 0.0, 1.0);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }
}

/// Driver logs end in newlines and can be empty; prefix them with the program they belong to.
fn annotate(label: &str, log: &str) -> String {
    match log.trim_end() {
        "" => format!("{label}: (no info log)"),
        log => format!("{label}: {log}"),
    }
}

unsafe fn compile_stage(
    gl: &glow::Context,
    label: &str,
    stage: u32,
    src: &str,
) -> Result<glow::NativeShader, EngineError> {
    let shader = gl
        .create_shader(stage)
        .map_err(|e| EngineError::GlCreate(format!("{label}: create_shader failed: {e:?}")))?;
    gl.shader_source(shader, src);
    gl.compile_shader(shader);
    if gl.get_shader_compile_status(shader) {
        return Ok(shader);
    }
    let log = annotate(label, &gl.get_shader_info_log(shader));
    gl.delete_shader(shader);
    Err(if stage == glow::VERTEX_SHADER {
        EngineError::VertexCompile(log)
    } else {
        EngineError::FragmentCompile(log)
    })
}

/// Compile and link a vertex/fragment pair. `label` prefixes every error message.
pub unsafe fn compile_program(
    gl: &glow::Context,
    label: &str,
    vert_src: &str,
    frag_src: &str,
) -> Result<glow::NativeProgram, EngineError> {
    let vs = compile_stage(gl, label, glow::VERTEX_SHADER, vert_src)?;
    let fs = match compile_stage(gl, label, glow::FRAGMENT_SHADER, frag_src) {
        Ok(fs) => fs,
        Err(e) => {
            gl.delete_shader(vs);
            return Err(e);
        }
    };

    let program = match gl.create_program() {
        Ok(program) => program,
        Err(e) => {
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            return Err(EngineError::GlCreate(format!("{label}: create_program failed: {e:?}")));
        }
    };
    for shader in [vs, fs] {
        gl.attach_shader(program, shader);
    }
    gl.link_program(program);
    for shader in [vs, fs] {
        gl.detach_shader(program, shader);
        gl.delete_shader(shader);
    }

    if !gl.get_program_link_status(program) {
        let log = annotate(label, &gl.get_program_info_log(program));
        gl.delete_program(program);
        return Err(EngineError::Link(log));
    }
    Ok(program)
}

pub unsafe fn create_render_target(
    gl: &glow::Context,
    w: u32,
    h: u32,
) -> Result<(glow::NativeFramebuffer, glow::NativeTexture, u32, u32), EngineError> {
    let fbo = gl
        .create_framebuffer()
        .map_err(|e| EngineError::GlCreate(format!("create_framebuffer failed: {e:?}")))?;
    let tex = match gl.create_texture() {
        Ok(tex) => tex,
        Err(e) => {
            gl.delete_framebuffer(fbo);
            return Err(EngineError::GlCreate(format!("create_texture failed: {e:?}")));
        }
    };

    gl.bind_texture(glow::TEXTURE_2D, Some(tex));
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);

    let ww = w.max(1);
    let hh = h.max(1);
    gl.tex_image_2d(
        glow::TEXTURE_2D,
        0,
        glow::RGBA8 as i32,
        ww as i32,
        hh as i32,
        0,
        glow::RGBA,
        glow::UNSIGNED_BYTE,
        None,
    );

    gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
    gl.framebuffer_texture_2d(
        glow::FRAMEBUFFER,
        glow::COLOR_ATTACHMENT0,
        glow::TEXTURE_2D,
        Some(tex),
        0,
    );

    let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
    if status != glow::FRAMEBUFFER_COMPLETE {
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        gl.bind_texture(glow::TEXTURE_2D, None);
        gl.delete_framebuffer(fbo);
        gl.delete_texture(tex);
        return Err(EngineError::GlCreate(format!(
            "framebuffer incomplete: 0x{status:x}"
        )));
    }

    // Fresh targets start black rather than undefined.
    gl.viewport(0, 0, ww as i32, hh as i32);
    gl.clear_color(0.0, 0.0, 0.0, 1.0);
    gl.clear(glow::COLOR_BUFFER_BIT);

    gl.bind_framebuffer(glow::FRAMEBUFFER, None);
    gl.bind_texture(glow::TEXTURE_2D, None);

    Ok((fbo, tex, ww, hh))
}

unsafe fn create_fullscreen_triangle(gl: &glow::Context) -> Result<NativeMesh, EngineError> {
    let vao = gl
        .create_vertex_array()
        .map_err(|e| EngineError::GlCreate(format!("create_vertex_array: {e}")))?;
    let vbo = match gl.create_buffer() {
        Ok(vbo) => vbo,
        Err(e) => {
            gl.delete_vertex_array(vao);
            return Err(EngineError::GlCreate(format!("create_buffer: {e}")));
        }
    };

    gl.bind_vertex_array(Some(vao));
    gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
    gl.buffer_data_u8_slice(
        glow::ARRAY_BUFFER,
        bytemuck::cast_slice(&FULLSCREEN_TRIANGLE),
        glow::STATIC_DRAW,
    );

    let stride = 4 * std::mem::size_of::<f32>() as i32;
    gl.enable_vertex_attrib_array(0);
    gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, stride, 0);
    gl.enable_vertex_attrib_array(1);
    gl.vertex_attrib_pointer_f32(1, 2, glow::FLOAT, false, stride, 2 * 4);

    gl.bind_buffer(glow::ARRAY_BUFFER, None);
    gl.bind_vertex_array(None);

    Ok(NativeMesh { vao, vbo })
}

impl Gpu for GlowGpu {
    fn create_render_target(&mut self, width: u32, height: u32) -> Result<RenderTarget, EngineError> {
        let (fbo, tex, w, h) = unsafe { create_render_target(&self.gl, width, height)? };
        Ok(RenderTarget {
            fbo: FramebufferId(self.framebuffers.insert(fbo)),
            color: TextureId(self.textures.insert(tex)),
            width: w,
            height: h,
        })
    }

    fn delete_render_target(&mut self, target: RenderTarget) {
        unsafe {
            if let Some(fbo) = self.framebuffers.remove(target.fbo.0) {
                self.gl.delete_framebuffer(fbo);
            }
            if let Some(tex) = self.textures.remove(target.color.0) {
                self.gl.delete_texture(tex);
            }
        }
    }

    fn compile_program(&mut self, vert: &str, frag: &str) -> Result<ProgramId, EngineError> {
        let label = format!("program {}", self.programs.peek_next());
        let program = unsafe { compile_program(&self.gl, &label, vert, frag)? };
        let id = ProgramId(self.programs.insert(program));
        debug!(program = id.0, "glow: program linked");
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if let Some(p) = self.programs.remove(program.0) {
            unsafe { self.gl.delete_program(p) };
        }
    }

    fn create_fullscreen_triangle(&mut self) -> Result<MeshId, EngineError> {
        let mesh = unsafe { create_fullscreen_triangle(&self.gl)? };
        Ok(MeshId(self.meshes.insert(mesh)))
    }

    fn delete_mesh(&mut self, mesh: MeshId) {
        if let Some(m) = self.meshes.remove(mesh.0) {
            unsafe {
                self.gl.delete_vertex_array(m.vao);
                self.gl.delete_buffer(m.vbo);
            }
        }
    }

    fn bind_target(&mut self, target: &RenderTarget) {
        let fbo = self.framebuffers.get(target.fbo.0);
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, fbo);
            self.gl
                .viewport(0, 0, target.width as i32, target.height as i32);
            self.gl.disable(glow::DEPTH_TEST);
        }
    }

    fn clear(&mut self, rgba: [f32; 4]) {
        unsafe {
            self.gl.clear_color(rgba[0], rgba[1], rgba[2], rgba[3]);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    fn use_program(&mut self, program: ProgramId) {
        let p = self.programs.get(program.0);
        unsafe { self.gl.use_program(p) };
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        let tex = self.textures.get(texture.0);
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, tex);
        }
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) -> bool {
        let Some(p) = self.programs.get(program.0) else {
            return false;
        };
        // Compilers drop unused uniforms; a missing location is not an error.
        let Some(loc) = (unsafe { self.gl.get_uniform_location(p, name) }) else {
            return false;
        };
        unsafe {
            match value {
                UniformValue::F32(v) => self.gl.uniform_1_f32(Some(&loc), v),
                UniformValue::Vec2([x, y]) => self.gl.uniform_2_f32(Some(&loc), x, y),
                UniformValue::Vec3([x, y, z]) => self.gl.uniform_3_f32(Some(&loc), x, y, z),
                UniformValue::Vec4([x, y, z, w]) => self.gl.uniform_4_f32(Some(&loc), x, y, z, w),
                UniformValue::I32(v) => self.gl.uniform_1_i32(Some(&loc), v),
                UniformValue::Sampler(unit) => self.gl.uniform_1_i32(Some(&loc), unit as i32),
            }
        }
        true
    }

    fn draw(&mut self, mesh: MeshId) {
        let Some(m) = self.meshes.get(mesh.0) else {
            return;
        };
        unsafe {
            self.gl.bind_vertex_array(Some(m.vao));
            self.gl.draw_arrays(glow::TRIANGLES, 0, 3);
            self.gl.bind_vertex_array(None);
        }
    }
}
