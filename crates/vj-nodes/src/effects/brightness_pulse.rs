use vj_core::{ColorScheme, Frame, FrameSignal};
use vj_gpu::Uniforms;
use vj_graph::format_node_status;

use crate::CanvasEffect;

const FRAG: &str = r#"#version 330 core
in vec2 v_uv;
out vec4 frag_color;
uniform sampler2D input_texture;
uniform float brightness_multiplier;
void main() {
    vec3 c = texture(input_texture, v_uv).rgb;
    frag_color = vec4(c * brightness_multiplier, 1.0);
}
"#;

/// Scales input brightness by one frame signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrightnessPulse {
    pub signal: FrameSignal,
    /// Gain applied to the signal.
    pub intensity: f32,
    /// Multiplier at zero signal.
    pub base_brightness: f32,
}

impl BrightnessPulse {
    pub fn new(signal: FrameSignal) -> Self {
        Self {
            signal,
            intensity: 0.8,
            base_brightness: 0.2,
        }
    }

    /// `base + intensity * signal`, clamped to `0..=2`.
    pub fn multiplier(&self, frame: &Frame) -> f32 {
        (self.base_brightness + self.intensity * frame.get(self.signal)).clamp(0.0, 2.0)
    }
}

impl Default for BrightnessPulse {
    fn default() -> Self {
        Self::new(FrameSignal::FreqAll)
    }
}

impl CanvasEffect for BrightnessPulse {
    fn name(&self) -> &'static str {
        "BrightnessPulse"
    }

    fn fragment_shader(&self) -> &str {
        FRAG
    }

    fn set_uniforms(&mut self, frame: &Frame, _scheme: &ColorScheme, uniforms: &mut Uniforms<'_>) {
        uniforms.set("brightness_multiplier", self.multiplier(frame));
    }

    fn describe(&self) -> String {
        format_node_status(
            self.name(),
            Some(self.signal),
            &[("intensity", self.intensity)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_follows_signal_and_clamps() {
        let pulse = BrightnessPulse::new(FrameSignal::FreqLow);
        assert!((pulse.multiplier(&Frame::silent(0.0)) - 0.2).abs() < 1e-6);
        let loud = Frame::silent(0.0).with(FrameSignal::FreqLow, 1.0);
        assert!((pulse.multiplier(&loud) - 1.0).abs() < 1e-6);

        let hot = BrightnessPulse {
            intensity: 5.0,
            ..pulse
        };
        assert_eq!(hot.multiplier(&loud), 2.0);
    }

    #[test]
    fn describe_names_the_signal() {
        assert_eq!(
            BrightnessPulse::default().describe(),
            "BrightnessPulse [freq_all, intensity:0.80]"
        );
    }
}
