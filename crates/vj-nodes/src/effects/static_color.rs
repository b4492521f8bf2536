use vj_core::{Color, ColorScheme, Frame};
use vj_gpu::Uniforms;

use crate::CanvasEffect;

const FRAG: &str = r#"#version 330 core
in vec2 v_uv;
out vec4 frag_color;
uniform vec3 u_color;
void main() {
    frag_color = vec4(u_color, 1.0);
}
"#;

/// Solid fill, for backgrounds and test patterns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticColor {
    pub color: Color,
}

impl StaticColor {
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

impl Default for StaticColor {
    fn default() -> Self {
        Self::new(Color::WHITE)
    }
}

impl CanvasEffect for StaticColor {
    fn name(&self) -> &'static str {
        "StaticColor"
    }

    fn fragment_shader(&self) -> &str {
        FRAG
    }

    fn set_uniforms(&mut self, _frame: &Frame, _scheme: &ColorScheme, uniforms: &mut Uniforms<'_>) {
        uniforms.set("u_color", self.color.to_array());
    }

    fn describe(&self) -> String {
        let [r, g, b] = self.color.to_array();
        format!("StaticColor({r:.2}, {g:.2}, {b:.2})")
    }
}
