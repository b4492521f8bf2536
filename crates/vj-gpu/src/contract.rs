//! Shader-side contract shared by every backend and every canvas effect.
//!
//! IMPORTANT: effects write fragment stages against these names. Adding names is additive;
//! renaming one is breaking for every effect.

/// Fixed vertex stage for every canvas effect.
pub const FULLSCREEN_VERT: &str = r#"#version 330 core
layout (location = 0) in vec2 a_pos;
layout (location = 1) in vec2 a_uv;
out vec2 v_uv;
void main() {
    v_uv = a_uv;
    gl_Position = vec4(a_pos, 0.0, 1.0);
}
"#;

/// Interleaved `a_pos.xy, a_uv.xy` for one triangle covering clip space.
pub const FULLSCREEN_TRIANGLE: [f32; 12] = [
    -1.0, -1.0, 0.0, 0.0, //
    3.0, -1.0, 2.0, 0.0, //
    -1.0, 3.0, 0.0, 2.0,
];

/// Sampler bound to the upstream node's color output (texture unit 0).
pub const INPUT_TEXTURE: &str = "input_texture";
pub const INPUT_TEXTURE_UNIT: u32 = 0;

/// Seconds since show start.
pub const TIME: &str = "u_time";
/// Target size in pixels (`vec2`).
pub const RESOLUTION: &str = "u_resolution";

/// Uniforms declared in `src` that are also referenced outside their declaration.
///
/// This is the floor of what a GLSL compiler keeps: a declared-but-unused uniform is always
/// eligible for elimination. Array suffixes (`weights[13]`) are stripped.
pub fn active_uniforms(src: &str) -> Vec<String> {
    let declared: Vec<String> = src
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("uniform "))
        .filter_map(|rest| {
            let decl = rest.trim_end_matches(';').trim();
            let name = decl.split_whitespace().nth(1)?;
            Some(name.split('[').next().unwrap_or(name).to_string())
        })
        .collect();

    declared
        .into_iter()
        .filter(|name| count_identifier(src, name) > 1)
        .collect()
}

fn count_identifier(src: &str, ident: &str) -> usize {
    src.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|tok| *tok == ident)
        .count()
}
