use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::{BoxedNode, ColorScheme, EngineError, Frame, Node, Vibe};

struct SharedInner<C, R> {
    node: RefCell<BoxedNode<C, R>>,
    activations: Cell<usize>,
}

/// A node reachable from several parents.
///
/// Activation-counted: the wrapped node is entered when the first parent activates it and exited
/// when the last one lets go. Driven only through the recursive lifecycle helpers.
pub struct Shared<C, R> {
    inner: Rc<SharedInner<C, R>>,
}

impl<C, R> Shared<C, R> {
    pub fn new(node: BoxedNode<C, R>) -> Self {
        Self {
            inner: Rc::new(SharedInner {
                node: RefCell::new(node),
                activations: Cell::new(0),
            }),
        }
    }

    /// Number of parents currently holding this node active.
    pub fn activations(&self) -> usize {
        self.inner.activations.get()
    }
}

impl<C, R> Clone for Shared<C, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<C, R> fmt::Debug for Shared<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("owners", &Rc::strong_count(&self.inner))
            .field("activations", &self.inner.activations.get())
            .finish()
    }
}

impl<C, R> Node<C, R> for Shared<C, R> {
    fn enter_recursive(&mut self, ctx: &mut C) -> Result<(), EngineError> {
        let n = self.inner.activations.get();
        if n == 0 {
            let mut node = self.inner.node.borrow_mut();
            if let Err(e) = node.enter_recursive(ctx) {
                // Still unowned, so no parent's exit will reach what was entered before the error.
                node.exit_recursive(ctx);
                return Err(e);
            }
        }
        self.inner.activations.set(n + 1);
        Ok(())
    }

    fn exit_recursive(&mut self, ctx: &mut C) {
        match self.inner.activations.get() {
            0 => debug!("shared: exit on inactive node ignored"),
            1 => {
                self.inner.node.borrow_mut().exit_recursive(ctx);
                self.inner.activations.set(0);
            }
            n => self.inner.activations.set(n - 1),
        }
    }

    fn generate_recursive(&mut self, vibe: &Vibe, ctx: &mut C) -> Result<(), EngineError> {
        self.inner.node.borrow_mut().generate_recursive(vibe, ctx)
    }

    fn render(&mut self, frame: &Frame, scheme: &ColorScheme, ctx: &mut C) -> R {
        self.inner.node.borrow_mut().render(frame, scheme, ctx)
    }

    fn describe(&self) -> String {
        format!("{} (shared)", self.inner.node.borrow().describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Add, Constant, Double, Failing, Journal, Negate};
    use crate::{Constructor, Random};
    use vj_core::Mode;

    #[test]
    fn enters_once_and_exits_with_last_owner() {
        let mut a = Shared::new(Constant::boxed("x", 1.0));
        let mut b = a.clone();
        let mut ctx = Journal::default();

        a.enter_recursive(&mut ctx).unwrap();
        b.enter_recursive(&mut ctx).unwrap();
        assert_eq!(ctx.count("enter:x"), 1);
        assert_eq!(a.activations(), 2);

        a.exit_recursive(&mut ctx);
        assert_eq!(ctx.count("exit:x"), 0);
        b.exit_recursive(&mut ctx);
        assert_eq!(ctx.count("exit:x"), 1);

        // A stray exit does not double-release.
        b.exit_recursive(&mut ctx);
        assert_eq!(ctx.count("exit:x"), 1);
    }

    #[test]
    fn failed_enter_releases_the_partially_entered_subtree() {
        let mut shared = Shared::new(Box::new(Add {
            children: vec![Constant::boxed("a", 1.0), Box::new(Failing)],
        }));
        let mut ctx = Journal::default();

        assert!(shared.enter_recursive(&mut ctx).is_err());
        assert_eq!(shared.activations(), 0);
        assert_eq!(ctx.count("enter:a"), 1);
        assert_eq!(ctx.count("exit:a"), 1);

        // The host's matching exit after the failure must not release twice.
        shared.exit_recursive(&mut ctx);
        assert_eq!(ctx.count("exit:a"), 1);
    }

    #[test]
    fn random_over_shares_one_input_between_candidates() {
        let mut ops: Vec<Constructor<Journal, f32>> = Vec::new();
        ops.push(Box::new(
            |n: BoxedNode<Journal, f32>| -> BoxedNode<Journal, f32> { Box::new(Double(n)) },
        ));
        ops.push(Box::new(
            |n: BoxedNode<Journal, f32>| -> BoxedNode<Journal, f32> { Box::new(Negate(n)) },
        ));
        let shared_probe;
        let mut node = {
            let src = Shared::new(Constant::boxed("src", 3.0));
            shared_probe = src.clone();
            Random::over(Box::new(src), &ops, Some(77)).unwrap()
        };
        let mut ctx = Journal::default();
        let (frame, scheme) = (Frame::silent(0.0), ColorScheme::default());

        node.enter_recursive(&mut ctx).unwrap();
        for _ in 0..100 {
            node.generate_recursive(&Vibe::new(Mode::Rave), &mut ctx)
                .unwrap();
            let v = node.render(&frame, &scheme, &mut ctx);
            assert!(v == 6.0 || v == -3.0);
        }
        node.exit_recursive(&mut ctx);
        assert_eq!(shared_probe.activations(), 0);

        // Each swap hands the input over (exit, then enter); it is never held twice and is fully
        // released at the end.
        assert!(ctx.count("enter:src") >= 1);
        assert_eq!(ctx.count("enter:src"), ctx.count("exit:src"));
    }
}
