use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{trace, warn};

use vj_core::{ColorScheme, Frame, Vibe, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use vj_gpu::contract::{INPUT_TEXTURE, INPUT_TEXTURE_UNIT};
use vj_gpu::{EngineError, Gpu, RenderTarget};
use vj_graph::{BoxedNode, Node};

use crate::canvas::{acquire_effect, release_effect};
use crate::{Canvas, CanvasEffect, CanvasNode};

/// Re-renders one upstream target through an effect's fragment stage.
///
/// Per tick:
/// 1. render the input
/// 2. no (or empty) input → black at the default size
/// 3. otherwise size the canvas to the input, bind it as `input_texture` on unit 0, let the
///    effect set its uniforms, draw
///
/// The result is always this node's own target, never the input's.
pub struct PostProcess<G, E> {
    input: CanvasNode<G>,
    effect: E,
    canvas: Canvas,
    rng: StdRng,
    width: u32,
    height: u32,
    active: bool,
}

impl<G, E: CanvasEffect> PostProcess<G, E> {
    pub fn new(input: CanvasNode<G>, effect: E) -> Self {
        Self::with_rng(input, effect, StdRng::from_os_rng())
    }

    pub fn with_seed(input: CanvasNode<G>, effect: E, seed: u64) -> Self {
        Self::with_rng(input, effect, StdRng::seed_from_u64(seed))
    }

    fn with_rng(input: CanvasNode<G>, effect: E, rng: StdRng) -> Self {
        let canvas = Canvas::new(effect.fragment_shader());
        Self {
            input,
            effect,
            canvas,
            rng,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            active: false,
        }
    }

    /// Size of the black fallback when the input yields nothing.
    pub fn with_default_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn default_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn effect(&self) -> &E {
        &self.effect
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    fn process(
        &mut self,
        source: &RenderTarget,
        frame: &Frame,
        scheme: &ColorScheme,
        gpu: &mut dyn Gpu,
    ) -> Result<RenderTarget, EngineError> {
        self.effect.prepare(gpu, source, frame)?;
        let effect = &mut self.effect;
        self.canvas
            .draw(gpu, source.width, source.height, frame.time, |u| {
                u.texture(INPUT_TEXTURE, INPUT_TEXTURE_UNIT, source.color);
                effect.set_uniforms(frame, scheme, u);
            })
    }
}

impl<G, E: CanvasEffect> fmt::Debug for PostProcess<G, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostProcess")
            .field("effect", &self.effect.describe())
            .field("canvas", &self.canvas)
            .field("default_size", &(self.width, self.height))
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl<G: Gpu, E: CanvasEffect> Node<G, Option<RenderTarget>> for PostProcess<G, E> {
    fn inputs(&self) -> Vec<&BoxedNode<G, Option<RenderTarget>>> {
        vec![&self.input]
    }

    fn inputs_mut(&mut self) -> Vec<&mut BoxedNode<G, Option<RenderTarget>>> {
        vec![&mut self.input]
    }

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
        debug_assert!(self.active, "PostProcess rendered outside enter/exit");
        let upstream = self
            .input
            .render(frame, scheme, ctx)
            .filter(|t| !t.is_empty());

        let result = match upstream {
            Some(source) => self.process(&source, frame, scheme, ctx),
            None => {
                trace!(effect = self.effect.name(), "no upstream target, rendering black");
                self.canvas.render_black(ctx, self.width, self.height)
            }
        };

        match result {
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
