use std::fmt;

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::{BoxedNode, ColorScheme, Constructor, EngineError, Frame, Node, Shared, Vibe};

const NODE: &str = "Random";

/// How the next candidate is drawn.
#[derive(Debug)]
enum Selection {
    Uniform(usize),
    Weighted(WeightedIndex<f32>),
}

impl Selection {
    fn weighted(weights: &[f32], candidates: usize) -> Result<Self, EngineError> {
        let invalid = |msg: String| EngineError::InvalidWeights { node: NODE, msg };
        if weights.len() != candidates {
            return Err(invalid(format!(
                "{} weights for {} candidates",
                weights.len(),
                candidates
            )));
        }
        if weights.iter().any(|w| w.is_nan() || *w < 0.0) {
            return Err(invalid("weights must be non-negative".to_string()));
        }
        if weights.iter().sum::<f32>() <= 0.0 {
            return Err(invalid("at least one weight must be positive".to_string()));
        }
        WeightedIndex::new(weights)
            .map(Selection::Weighted)
            .map_err(|e| invalid(e.to_string()))
    }

    fn pick(&self, rng: &mut StdRng) -> usize {
        match self {
            Selection::Uniform(n) => rng.random_range(0..*n),
            Selection::Weighted(index) => index.sample(rng),
        }
    }
}

/// Holds a fixed pool of alternative nodes and renders exactly one of them.
///
/// Every `generate` re-rolls the active candidate. When the pick changes the old candidate is
/// exited and the new one entered (only while this node is itself active); picking the same
/// candidate again costs nothing. Inactive candidates are never rendered and hold no resources.
/// Picks are uniform unless the node was built with [`Random::with_weights`].
pub struct Random<C, R> {
    candidates: Vec<BoxedNode<C, R>>,
    selection: Selection,
    current: usize,
    rng: StdRng,
    active: bool,
}

impl<C, R> Random<C, R> {
    /// Candidates with an OS-seeded RNG.
    pub fn new(candidates: Vec<BoxedNode<C, R>>) -> Result<Self, EngineError> {
        Self::with_rng(candidates, StdRng::from_os_rng())
    }

    /// Candidates with a fixed seed: the selection sequence is reproducible.
    pub fn with_seed(candidates: Vec<BoxedNode<C, R>>, seed: u64) -> Result<Self, EngineError> {
        Self::with_rng(candidates, StdRng::seed_from_u64(seed))
    }

    /// Candidates picked in proportion to `weights`, one per candidate.
    ///
    /// Weights must be non-negative with a positive sum; a zero-weight candidate is never picked.
    pub fn with_weights(
        candidates: Vec<BoxedNode<C, R>>,
        weights: &[f32],
        seed: Option<u64>,
    ) -> Result<Self, EngineError> {
        if candidates.is_empty() {
            return Err(EngineError::NoCandidates { node: NODE });
        }
        let selection = Selection::weighted(weights, candidates.len())?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self::build(candidates, selection, rng))
    }

    fn with_rng(candidates: Vec<BoxedNode<C, R>>, rng: StdRng) -> Result<Self, EngineError> {
        if candidates.is_empty() {
            return Err(EngineError::NoCandidates { node: NODE });
        }
        let selection = Selection::Uniform(candidates.len());
        Ok(Self::build(candidates, selection, rng))
    }

    fn build(candidates: Vec<BoxedNode<C, R>>, selection: Selection, mut rng: StdRng) -> Self {
        let current = selection.pick(&mut rng);
        Self {
            candidates,
            selection,
            current,
            rng,
            active: false,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &BoxedNode<C, R> {
        &self.candidates[self.current]
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl<C: 'static, R: 'static> Random<C, R> {
    /// Build one candidate per constructor, all over the same `input`.
    ///
    /// The input is wrapped in a [`Shared`] so whichever candidate is active drives its lifecycle.
    pub fn over(
        input: BoxedNode<C, R>,
        operations: &[Constructor<C, R>],
        seed: Option<u64>,
    ) -> Result<Self, EngineError> {
        let shared = Shared::new(input);
        let candidates = operations
            .iter()
            .map(|op| op(Box::new(shared.clone())))
            .collect();
        match seed {
            Some(seed) => Self::with_seed(candidates, seed),
            None => Self::new(candidates),
        }
    }
}

impl<C, R> fmt::Debug for Random<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Random")
            .field("candidates", &self.candidates.len())
            .field("selection", &self.selection)
            .field("current", &self.current)
            .field("active", &self.active)
            .finish()
    }
}

impl<C, R> Node<C, R> for Random<C, R> {
    fn inputs(&self) -> Vec<&BoxedNode<C, R>> {
        vec![&self.candidates[self.current]]
    }

    fn inputs_mut(&mut self) -> Vec<&mut BoxedNode<C, R>> {
        vec![&mut self.candidates[self.current]]
    }

    fn enter(&mut self, _ctx: &mut C) -> Result<(), EngineError> {
        self.active = true;
        Ok(())
    }

    fn exit(&mut self, _ctx: &mut C) {
        self.active = false;
    }

    fn generate(&mut self, _vibe: &Vibe, ctx: &mut C) -> Result<(), EngineError> {
        let next = self.selection.pick(&mut self.rng);
        if next == self.current {
            return Ok(());
        }
        debug!(
            from = self.current,
            to = next,
            candidate = %self.candidates[next].describe(),
            "random: switching candidate"
        );
        if self.active {
            self.candidates[self.current].exit_recursive(ctx);
            self.current = next;
            self.candidates[self.current].enter_recursive(ctx)?;
        } else {
            self.current = next;
        }
        Ok(())
    }

    fn render(&mut self, frame: &Frame, scheme: &ColorScheme, ctx: &mut C) -> R {
        debug_assert!(self.active, "Random rendered outside enter/exit");
        self.candidates[self.current].render(frame, scheme, ctx)
    }

    fn describe(&self) -> String {
        format!("Random [{}/{}]", self.current + 1, self.candidates.len())
    }
}
