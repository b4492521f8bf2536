use rand::rngs::StdRng;
use rand::Rng;

use vj_core::{ColorScheme, Frame, FrameSignal, Vibe};
use vj_gpu::contract::{INPUT_TEXTURE, INPUT_TEXTURE_UNIT};
use vj_gpu::{EngineError, Gpu, RenderTarget, TextureId, Uniforms};
use vj_graph::format_node_status;

use crate::{Canvas, CanvasEffect};

/// Separable 13-tap gaussian. `u_extract` keeps only pixels above `u_threshold` (first pass).
const BLUR_FRAG: &str = r#"#version 330 core
in vec2 v_uv;
out vec4 frag_color;
uniform sampler2D input_texture;
uniform vec2 u_resolution;
uniform vec2 u_direction;
uniform float u_radius;
uniform float u_threshold;
uniform int u_extract;

const float weights[13] = float[](
    0.0044, 0.0175, 0.0540, 0.1295, 0.2420, 0.3521, 0.3989,
    0.3521, 0.2420, 0.1295, 0.0540, 0.0175, 0.0044
);

vec3 bright(vec3 c) {
    if (u_extract == 0) {
        return c;
    }
    float luma = dot(c, vec3(0.299, 0.587, 0.114));
    return c * smoothstep(u_threshold - 0.1, u_threshold + 0.1, luma);
}

void main() {
    vec2 texel_step = u_direction * u_radius / u_resolution;
    vec3 sum = vec3(0.0);
    float total = 0.0;
    for (int i = -6; i <= 6; i++) {
        vec2 uv = v_uv + float(i) * texel_step;
        if (uv.x >= 0.0 && uv.x <= 1.0 && uv.y >= 0.0 && uv.y <= 1.0) {
            float w = weights[i + 6];
            sum += bright(texture(input_texture, uv).rgb) * w;
            total += w;
        }
    }
    frag_color = vec4(total > 0.0 ? sum / total : vec3(0.0), 1.0);
}
"#;

const COMPOSITE_FRAG: &str = r#"#version 330 core
in vec2 v_uv;
out vec4 frag_color;
uniform sampler2D input_texture;
uniform sampler2D bloom_texture;
uniform float bloom_intensity;
void main() {
    vec3 base = texture(input_texture, v_uv).rgb;
    vec3 glow = texture(bloom_texture, v_uv).rgb * bloom_intensity;
    vec3 c = base + glow;
    c.r *= 1.02;
    c.g *= 1.01;
    c = c / (1.0 + c * 0.3);
    frag_color = vec4(c, 1.0);
}
"#;

const BLOOM_TEXTURE: &str = "bloom_texture";
const BLOOM_TEXTURE_UNIT: u32 = 1;

const LOW_SIGNALS: [FrameSignal; 3] = [
    FrameSignal::SustainedLow,
    FrameSignal::FreqLow,
    FrameSignal::Dampen,
];

/// Soft glow around bright areas, driven by a low-frequency signal.
///
/// Passes per tick: threshold + horizontal blur, vertical blur, composite over the input. Both
/// blur targets are private to this effect and follow the input size.
#[derive(Debug)]
pub struct Bloom {
    pub signal: FrameSignal,
    pub base_intensity: f32,
    pub max_intensity: f32,
    /// Blur step in pixels.
    pub radius: f32,
    /// Luma above which pixels bloom.
    pub threshold: f32,
    blur_h: Canvas,
    blur_v: Canvas,
    bloom: Option<TextureId>,
}

impl Bloom {
    pub fn new(signal: FrameSignal) -> Self {
        Self {
            signal,
            base_intensity: 0.4,
            max_intensity: 0.8,
            radius: 4.0,
            threshold: 0.3,
            blur_h: Canvas::new(BLUR_FRAG),
            blur_v: Canvas::new(BLUR_FRAG),
            bloom: None,
        }
    }

    /// Quadratic response: `base + (max - base) * signal²`.
    pub fn intensity(&self, frame: &Frame) -> f32 {
        let s = frame.get(self.signal);
        self.base_intensity + (self.max_intensity - self.base_intensity) * s * s
    }
}

impl Default for Bloom {
    fn default() -> Self {
        Self::new(FrameSignal::SustainedLow)
    }
}

impl CanvasEffect for Bloom {
    fn name(&self) -> &'static str {
        "Bloom"
    }

    fn fragment_shader(&self) -> &str {
        COMPOSITE_FRAG
    }

    fn generate(&mut self, _vibe: &Vibe, rng: &mut StdRng) {
        self.signal = LOW_SIGNALS[rng.random_range(0..LOW_SIGNALS.len())];
        self.base_intensity = rng.random_range(0.3..0.5);
        self.max_intensity = rng.random_range(0.6..0.9);
        self.radius = rng.random_range(3.0..6.0);
        self.threshold = rng.random_range(0.2..0.4);
    }

    fn acquire_passes(&mut self, gpu: &mut dyn Gpu) -> Result<(), EngineError> {
        self.blur_h.acquire(gpu)?;
        self.blur_v.acquire(gpu)
    }

    fn release_passes(&mut self, gpu: &mut dyn Gpu) {
        self.blur_h.release(gpu);
        self.blur_v.release(gpu);
        self.bloom = None;
    }

    fn prepare(
        &mut self,
        gpu: &mut dyn Gpu,
        source: &RenderTarget,
        frame: &Frame,
    ) -> Result<(), EngineError> {
        let (w, h) = source.size();
        let (radius, threshold) = (self.radius, self.threshold);

        let horizontal = self.blur_h.draw(gpu, w, h, frame.time, |u| {
            u.texture(INPUT_TEXTURE, INPUT_TEXTURE_UNIT, source.color);
            u.set("u_direction", [1.0f32, 0.0]);
            u.set("u_radius", radius);
            u.set("u_threshold", threshold);
            u.set("u_extract", 1i32);
        })?;
        let vertical = self.blur_v.draw(gpu, w, h, frame.time, |u| {
            u.texture(INPUT_TEXTURE, INPUT_TEXTURE_UNIT, horizontal.color);
            u.set("u_direction", [0.0f32, 1.0]);
            u.set("u_radius", radius);
            u.set("u_extract", 0i32);
        })?;

        self.bloom = Some(vertical.color);
        Ok(())
    }

    fn set_uniforms(&mut self, frame: &Frame, _scheme: &ColorScheme, uniforms: &mut Uniforms<'_>) {
        uniforms.set("bloom_intensity", self.intensity(frame));
        if let Some(bloom) = self.bloom {
            uniforms.texture(BLOOM_TEXTURE, BLOOM_TEXTURE_UNIT, bloom);
        }
    }

    fn describe(&self) -> String {
        format_node_status(
            self.name(),
            Some(self.signal),
            &[("intensity", self.max_intensity), ("radius", self.radius)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Source;
    use crate::PostProcess;
    use rand::SeedableRng;
    use vj_core::Mode;
    use vj_gpu::{HeadlessGpu, ObjectKind, UniformValue};
    use vj_graph::Node;

    #[test]
    fn generate_stays_in_gentle_ranges() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut bloom = Bloom::default();
        for _ in 0..200 {
            bloom.generate(&Vibe::new(Mode::Gentle), &mut rng);
            assert!(LOW_SIGNALS.contains(&bloom.signal));
            assert!((0.3..0.5).contains(&bloom.base_intensity));
            assert!((0.6..0.9).contains(&bloom.max_intensity));
            assert!((3.0..6.0).contains(&bloom.radius));
            assert!((0.2..0.4).contains(&bloom.threshold));
        }
    }

    #[test]
    fn intensity_is_quadratic_in_signal() {
        let bloom = Bloom::new(FrameSignal::FreqLow);
        let half = Frame::silent(0.0).with(FrameSignal::FreqLow, 0.5);
        assert!((bloom.intensity(&half) - (0.4 + 0.4 * 0.25)).abs() < 1e-6);
        assert!((bloom.intensity(&Frame::silent(0.0)) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn three_passes_per_tick_with_private_targets() {
        let mut gpu = HeadlessGpu::new();
        let (source, size) = Source::boxed(Some((256, 128)));
        let mut node = PostProcess::with_seed(source, Bloom::default(), 11);
        node.enter_recursive(&mut gpu).unwrap();
        node.generate_recursive(&Vibe::new(Mode::Gentle), &mut gpu).unwrap();
        assert_eq!(gpu.live_of(ObjectKind::Program), 3);

        let out = node
            .render(&Frame::silent(0.0), &ColorScheme::default(), &mut gpu)
            .unwrap();
        let draws = gpu.take_draws();
        assert_eq!(draws.len(), 3);

        let targets: Vec<_> = draws.iter().filter_map(|d| d.target).collect();
        assert_eq!(targets.len(), 3);
        assert!(targets.iter().all(|t| t.size() == (256, 128)));
        assert_eq!(targets[2], out);
        assert_ne!(targets[0].fbo, targets[1].fbo);

        // Vertical pass reads the horizontal result; composite reads the vertical result.
        assert_eq!(draws[1].textures.get(&INPUT_TEXTURE_UNIT), Some(&targets[0].color));
        assert_eq!(draws[2].textures.get(&BLOOM_TEXTURE_UNIT), Some(&targets[1].color));
        assert_eq!(
            draws[2].uniforms.get(BLOOM_TEXTURE),
            Some(&UniformValue::Sampler(BLOOM_TEXTURE_UNIT))
        );

        size.set(Some((64, 64)));
        let live = gpu.live_count();
        node.render(&Frame::silent(0.1), &ColorScheme::default(), &mut gpu);
        assert_eq!(gpu.live_count(), live);

        node.exit_recursive(&mut gpu);
        assert_eq!(gpu.live_count(), 0);
        assert_eq!(gpu.stats().invalid_deletes, 0);
    }
}
