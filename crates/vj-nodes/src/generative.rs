use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::warn;

use vj_core::{ColorScheme, Frame, Vibe, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use vj_gpu::{EngineError, Gpu, RenderTarget};
use vj_graph::Node;

use crate::canvas::{acquire_effect, release_effect};
use crate::{Canvas, CanvasEffect};

/// Canvas node with no upstream: content comes from the effect's uniforms and `frame.time`.
pub struct Generative<E> {
    effect: E,
    canvas: Canvas,
    rng: StdRng,
    width: u32,
    height: u32,
    active: bool,
}

impl<E: CanvasEffect> Generative<E> {
    pub fn new(effect: E) -> Self {
        Self::with_rng(effect, StdRng::from_os_rng())
    }

    pub fn with_seed(effect: E, seed: u64) -> Self {
        Self::with_rng(effect, StdRng::seed_from_u64(seed))
    }

    fn with_rng(effect: E, rng: StdRng) -> Self {
        let canvas = Canvas::new(effect.fragment_shader());
        Self {
            effect,
            canvas,
            rng,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            active: false,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn effect(&self) -> &E {
        &self.effect
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }
}

impl<E: CanvasEffect> fmt::Debug for Generative<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generative")
            .field("effect", &self.effect.describe())
            .field("canvas", &self.canvas)
            .field("size", &(self.width, self.height))
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl<G: Gpu, E: CanvasEffect> Node<G, Option<RenderTarget>> for Generative<E> {
    fn enter(&mut self, ctx: &mut G) -> Result<(), EngineError> {
        acquire_effect(&mut self.canvas, &mut self.effect, ctx)?;
        self.active = true;
        Ok(())
    }

    fn exit(&mut self, ctx: &mut G) {
        release_effect(&mut self.canvas, &mut self.effect, ctx);
        self.active = false;
    }

    fn generate(&mut self, vibe: &Vibe, _ctx: &mut G) -> Result<(), EngineError> {
        self.effect.generate(vibe, &mut self.rng);
        Ok(())
    }

    fn render(&mut self, frame: &Frame, scheme: &ColorScheme, ctx: &mut G) -> Option<RenderTarget> {
        debug_assert!(self.active, "Generative rendered outside enter/exit");
        let effect = &mut self.effect;
        let drawn = self
            .canvas
            .draw(ctx, self.width, self.height, frame.time, |u| {
                effect.set_uniforms(frame, scheme, u)
            });
        match drawn {
            Ok(target) => Some(target),
            Err(e) => {
                warn!(effect = self.effect.name(), error = %e, "render degraded to black");
                self.canvas.render_black(ctx, self.width, self.height).ok()
            }
        }
    }

    fn describe(&self) -> String {
        self.effect.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::StaticColor;
    use vj_core::{Color, Mode};
    use vj_gpu::{HeadlessGpu, UniformValue};

    #[test]
    fn renders_at_its_own_size() {
        let mut gpu = HeadlessGpu::new();
        let mut node = Generative::new(StaticColor::new(Color::rgb(1.0, 0.0, 0.0))).with_size(100, 50);
        node.enter_recursive(&mut gpu).unwrap();
        node.generate_recursive(&Vibe::new(Mode::Gentle), &mut gpu).unwrap();

        let out = node
            .render(&Frame::silent(0.0), &ColorScheme::default(), &mut gpu)
            .unwrap();
        assert_eq!(out.size(), (100, 50));
        assert_eq!(
            gpu.last_draw().unwrap().uniforms.get("u_color"),
            Some(&UniformValue::Vec3([1.0, 0.0, 0.0]))
        );
    }

    #[test]
    fn enter_exit_cycles_hold_nothing_between_activations() {
        let mut gpu = HeadlessGpu::new();
        let mut node = Generative::new(StaticColor::new(Color::WHITE)).with_size(8, 8);
        for _ in 0..5 {
            node.enter_recursive(&mut gpu).unwrap();
            node.generate_recursive(&Vibe::new(Mode::Rave), &mut gpu).unwrap();
            node.render(&Frame::silent(0.0), &ColorScheme::default(), &mut gpu);
            node.exit_recursive(&mut gpu);
            assert_eq!(gpu.live_count(), 0);
        }
        assert_eq!(gpu.stats().invalid_deletes, 0);
        assert_eq!(gpu.stats().compiles, 5);
    }
}
