use rand::rngs::StdRng;
use rand::Rng;

use vj_core::{ColorScheme, Frame, FrameSignal, Mode, Vibe};
use vj_gpu::Uniforms;
use vj_graph::format_node_status;
use vj_nodes::CanvasEffect;

const FRAG: &str = r#"#version 330 core
in vec2 v_uv;
out vec4 frag_color;
uniform float u_time;
uniform vec2 u_resolution;
uniform float u_speed;
uniform float u_level;
uniform vec3 u_fg;
uniform vec3 u_bg;
void main() {
    vec2 p = v_uv * vec2(u_resolution.x / u_resolution.y, 1.0) * 4.0;
    float t = u_time * u_speed;
    float v = sin(p.x + t) + sin(p.y * 1.3 - t) + sin((p.x + p.y) * 0.7 + t * 0.5);
    float k = 0.5 + 0.5 * sin(v * 3.14159);
    frag_color = vec4(mix(u_bg, u_fg, k) * (0.4 + 0.6 * u_level), 1.0);
}
"#;

/// Procedural backdrop for the demo: scheme colors, speed re-rolled per mode.
#[derive(Debug)]
pub struct Plasma {
    signal: FrameSignal,
    speed: f32,
}

impl Default for Plasma {
    fn default() -> Self {
        Self {
            signal: FrameSignal::FreqAll,
            speed: 1.0,
        }
    }
}

impl CanvasEffect for Plasma {
    fn name(&self) -> &'static str {
        "Plasma"
    }

    fn fragment_shader(&self) -> &str {
        FRAG
    }

    fn generate(&mut self, vibe: &Vibe, rng: &mut StdRng) {
        self.signal = FrameSignal::random(rng);
        self.speed = match vibe.mode {
            Mode::Rave => rng.random_range(1.5..3.0),
            _ => rng.random_range(0.2..0.8),
        };
    }

    fn set_uniforms(&mut self, frame: &Frame, scheme: &ColorScheme, uniforms: &mut Uniforms<'_>) {
        uniforms.set("u_speed", self.speed);
        uniforms.set("u_level", frame.get(self.signal));
        uniforms.set("u_fg", scheme.fg.to_array());
        uniforms.set("u_bg", scheme.bg.to_array());
    }

    fn describe(&self) -> String {
        format_node_status(self.name(), Some(self.signal), &[("speed", self.speed)])
    }
}
