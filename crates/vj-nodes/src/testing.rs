use std::cell::{Cell, RefCell};
use std::rc::Rc;

use vj_core::{ColorScheme, Frame, Vibe};
use vj_gpu::{EngineError, HeadlessGpu, RenderTarget, Uniforms};
use vj_graph::Node;

use crate::{CanvasEffect, CanvasNode, Surface};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Counts {
    pub enters: usize,
    pub exits: usize,
    pub generates: usize,
    pub renders: usize,
}

/// Leaf that counts its lifecycle calls and owns one small target while active.
#[derive(Debug)]
pub struct Probe {
    name: &'static str,
    counts: Rc<RefCell<Counts>>,
    surface: Surface,
    active: bool,
}

impl Probe {
    pub fn boxed(name: &'static str) -> (CanvasNode<HeadlessGpu>, Rc<RefCell<Counts>>) {
        let counts = Rc::new(RefCell::new(Counts::default()));
        let probe = Probe {
            name,
            counts: counts.clone(),
            surface: Surface::Uninitialized,
            active: false,
        };
        (Box::new(probe), counts)
    }
}

impl Node<HeadlessGpu, Option<RenderTarget>> for Probe {
    fn enter(&mut self, ctx: &mut HeadlessGpu) -> Result<(), EngineError> {
        assert!(!self.active, "{} entered twice", self.name);
        self.active = true;
        self.surface.ensure_size(ctx, 16, 16)?;
        self.counts.borrow_mut().enters += 1;
        Ok(())
    }

    fn exit(&mut self, ctx: &mut HeadlessGpu) {
        assert!(self.active, "{} exited while inactive", self.name);
        self.active = false;
        self.surface.release(ctx);
        self.counts.borrow_mut().exits += 1;
    }

    fn generate(&mut self, _vibe: &Vibe, _ctx: &mut HeadlessGpu) -> Result<(), EngineError> {
        self.counts.borrow_mut().generates += 1;
        Ok(())
    }

    fn render(
        &mut self,
        _frame: &Frame,
        _scheme: &ColorScheme,
        ctx: &mut HeadlessGpu,
    ) -> Option<RenderTarget> {
        assert!(self.active, "{} rendered while inactive", self.name);
        self.counts.borrow_mut().renders += 1;
        self.surface.clear_black(ctx, 16, 16).ok()
    }

    fn describe(&self) -> String {
        format!("Probe({})", self.name)
    }
}

/// Upstream whose output size (or absence) the test controls.
#[derive(Debug)]
pub struct Source {
    size: Rc<Cell<Option<(u32, u32)>>>,
    surface: Surface,
}

impl Source {
    pub fn boxed(size: Option<(u32, u32)>) -> (CanvasNode<HeadlessGpu>, Rc<Cell<Option<(u32, u32)>>>) {
        let size = Rc::new(Cell::new(size));
        let source = Source {
            size: size.clone(),
            surface: Surface::Uninitialized,
        };
        (Box::new(source), size)
    }
}

impl Node<HeadlessGpu, Option<RenderTarget>> for Source {
    fn exit(&mut self, ctx: &mut HeadlessGpu) {
        self.surface.release(ctx);
    }

    fn render(
        &mut self,
        _frame: &Frame,
        _scheme: &ColorScheme,
        ctx: &mut HeadlessGpu,
    ) -> Option<RenderTarget> {
        let (w, h) = self.size.get()?;
        self.surface.clear_black(ctx, w, h).ok()
    }
}

/// Effect whose fragment stage never compiles.
#[derive(Debug)]
pub struct Broken;

impl CanvasEffect for Broken {
    fn name(&self) -> &'static str {
        "Broken"
    }

    fn fragment_shader(&self) -> &str {
        "#version 330 core\nout vec4 o;\n"
    }

    fn set_uniforms(&mut self, _frame: &Frame, _scheme: &ColorScheme, _uniforms: &mut Uniforms<'_>) {}
}
