#![forbid(unsafe_code)]

//! Render-graph vocabulary: the node lifecycle and the nodes that only route between other nodes.
//!
//! This crate is **contract-only**: no windowing, no GL handles. A node is generic over the
//! render context `C` (a GPU backend in production, anything in tests) and its render result `R`.
//!
//! Lifecycle, per activation:
//! `enter` → `generate` → `render`* → (`generate` → `render`*)* → `exit`.
//! Hosts drive the graph through [`Node::enter_recursive`], [`Node::generate_recursive`] and
//! [`Node::exit_recursive`], and call [`Node::render`] on the root once per display tick.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

mod random;
mod shared;
mod tree;

pub use random::Random;
pub use shared::Shared;
pub use tree::{format_node_status, print_tree};

pub use vj_core::{ColorScheme, EngineError, Frame, Vibe};

/// Owned, type-erased node. Inputs are always held this way.
pub type BoxedNode<C, R> = Box<dyn Node<C, R>>;

/// Builds a node around an input; used by [`pipeline`] and [`Random::over`].
pub type Constructor<C, R> = Box<dyn Fn(BoxedNode<C, R>) -> BoxedNode<C, R>>;

/// A vertex in the render DAG.
///
/// Contract:
/// - `render` is only called between a matching `enter` and `exit`.
/// - `generate` runs at least once after `enter` and before the first `render`.
/// - `enter`/`exit` may allocate and free backend objects; `render` must not (beyond lazily
///   resizing what it already owns) and must stay cheap.
pub trait Node<C, R> {
    /// Inputs reached by the recursive helpers. Switching nodes return only the active branch.
    fn inputs(&self) -> Vec<&BoxedNode<C, R>> {
        Vec::new()
    }

    fn inputs_mut(&mut self) -> Vec<&mut BoxedNode<C, R>> {
        Vec::new()
    }

    /// Acquire what this node needs to render.
    fn enter(&mut self, _ctx: &mut C) -> Result<(), EngineError> {
        Ok(())
    }

    /// Release everything acquired in `enter`.
    fn exit(&mut self, _ctx: &mut C) {}

    /// Re-roll parameters for the upcoming mode.
    ///
    /// The context is passed because switching nodes activate and deactivate branches here.
    fn generate(&mut self, _vibe: &Vibe, _ctx: &mut C) -> Result<(), EngineError> {
        Ok(())
    }

    fn render(&mut self, frame: &Frame, scheme: &ColorScheme, ctx: &mut C) -> R;

    /// One-line label used by [`print_tree`].
    fn describe(&self) -> String {
        short_type_name(std::any::type_name::<Self>()).to_string()
    }

    /// `enter` on this node, then on every input.
    fn enter_recursive(&mut self, ctx: &mut C) -> Result<(), EngineError> {
        self.enter(ctx)?;
        for input in self.inputs_mut() {
            input.enter_recursive(ctx)?;
        }
        Ok(())
    }

    /// `exit` on this node, then on every input.
    fn exit_recursive(&mut self, ctx: &mut C) {
        self.exit(ctx);
        for input in self.inputs_mut() {
            input.exit_recursive(ctx);
        }
    }

    /// `generate` on this node, then on every input.
    ///
    /// Inputs are collected after this node's own `generate`, so a switching node propagates
    /// into the branch it just selected.
    fn generate_recursive(&mut self, vibe: &Vibe, ctx: &mut C) -> Result<(), EngineError> {
        self.generate(vibe, ctx)?;
        for input in self.inputs_mut() {
            input.generate_recursive(vibe, ctx)?;
        }
        Ok(())
    }
}

/// Chain `operations` over `input`: `ops[n](... ops[1](ops[0](input)))`.
pub fn pipeline<C, R>(input: BoxedNode<C, R>, operations: &[Constructor<C, R>]) -> BoxedNode<C, R> {
    operations.iter().fold(input, |node, op| op(node))
}

/// `vj_nodes::effects::Bloom<vj_gpu::HeadlessGpu>` → `Bloom`
fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use vj_core::Mode;

    fn tick() -> (Frame, ColorScheme) {
        (Frame::silent(0.0), ColorScheme::default())
    }

    #[test]
    fn enter_recursive_enters_self_before_inputs() {
        let mut add = Add {
            children: vec![Constant::boxed("a", 1.0), Constant::boxed("b", 2.0)],
        };
        let mut ctx = Journal::default();
        add.enter_recursive(&mut ctx).unwrap();
        assert_eq!(ctx.take(), ["enter:add", "enter:a", "enter:b"]);

        add.exit_recursive(&mut ctx);
        assert_eq!(ctx.take(), ["exit:add", "exit:a", "exit:b"]);
    }

    #[test]
    fn enter_then_exit_leaves_nothing_active() {
        let mut add = Add {
            children: vec![Constant::boxed("a", 1.0), Constant::boxed("b", 2.0)],
        };
        let mut ctx = Journal::default();
        add.enter_recursive(&mut ctx).unwrap();
        add.exit_recursive(&mut ctx);
        for label in ["a", "b"] {
            assert_eq!(ctx.count(&format!("enter:{label}")), 1);
            assert_eq!(ctx.count(&format!("exit:{label}")), 1);
        }
    }

    #[test]
    fn generate_recursive_reaches_every_input() {
        let mut add = Add {
            children: vec![Constant::boxed("a", 1.0), Constant::boxed("b", 2.0)],
        };
        let mut ctx = Journal::default();
        add.enter_recursive(&mut ctx).unwrap();
        ctx.take();
        add.generate_recursive(&Vibe::new(Mode::Rave), &mut ctx).unwrap();
        assert_eq!(ctx.take(), ["generate:a", "generate:b"]);
    }

    #[test]
    fn arithmetic_graph_renders() {
        let mut ops: Vec<Constructor<Journal, f32>> = Vec::new();
        ops.push(Box::new(
            |n: BoxedNode<Journal, f32>| -> BoxedNode<Journal, f32> { Box::new(Double(n)) },
        ));
        ops.push(Box::new(
            |n: BoxedNode<Journal, f32>| -> BoxedNode<Journal, f32> { Box::new(Negate(n)) },
        ));
        let mut node = pipeline(
            Box::new(Add {
                children: vec![Constant::boxed("a", 1.5), Constant::boxed("b", 2.0)],
            }),
            &ops,
        );
        let mut ctx = Journal::default();
        let (frame, scheme) = tick();
        node.enter_recursive(&mut ctx).unwrap();
        node.generate_recursive(&Vibe::new(Mode::Gentle), &mut ctx)
            .unwrap();
        assert_eq!(node.render(&frame, &scheme, &mut ctx), -7.0);
        node.exit_recursive(&mut ctx);
    }

    #[test]
    fn short_type_name_strips_paths_and_generics() {
        assert_eq!(short_type_name("a::b::Bloom<c::HeadlessGpu>"), "Bloom");
        assert_eq!(short_type_name("Plain"), "Plain");
    }
}
