use std::fmt;

use tracing::debug;

use vj_core::{ColorScheme, Frame, Mode, Vibe};
use vj_gpu::{EngineError, Gpu, RenderTarget};
use vj_graph::{BoxedNode, Node};

use crate::Black;

/// Point `current` at `next`. Branch lifecycles are only touched while the switch itself is
/// active; selecting the current branch again is free.
fn swap_branch<C, R>(
    node: &'static str,
    branches: &mut [BoxedNode<C, R>],
    current: &mut Option<usize>,
    next: usize,
    active: bool,
    ctx: &mut C,
) -> Result<(), EngineError> {
    if *current == Some(next) {
        return Ok(());
    }
    debug!(
        node,
        from = %current.map_or_else(|| "none".to_string(), |i| branches[i].describe()),
        to = %branches[next].describe(),
        active,
        "switching branch"
    );
    if !active {
        *current = Some(next);
        return Ok(());
    }
    if let Some(old) = current.take() {
        branches[old].exit_recursive(ctx);
    }
    *current = Some(next);
    branches[next].enter_recursive(ctx)
}

fn selected<C, R>(branches: &[BoxedNode<C, R>], current: Option<usize>) -> Vec<&BoxedNode<C, R>> {
    current.map(|i| &branches[i]).into_iter().collect()
}

fn selected_mut<C, R>(
    branches: &mut [BoxedNode<C, R>],
    current: Option<usize>,
) -> Vec<&mut BoxedNode<C, R>> {
    match current {
        Some(i) => vec![&mut branches[i]],
        None => Vec::new(),
    }
}

const NORMAL: usize = 0;
const BLACK: usize = 1;

/// Shows `normal` in every mode except [`Mode::Blackout`], where it shows a black child.
pub struct BlackoutSwitch<C, R> {
    branches: Vec<BoxedNode<C, R>>,
    current: Option<usize>,
    active: bool,
}

impl<C, R> BlackoutSwitch<C, R> {
    pub fn with_black(normal: BoxedNode<C, R>, black: BoxedNode<C, R>) -> Self {
        Self {
            branches: vec![normal, black],
            current: Some(NORMAL),
            active: false,
        }
    }

    pub fn is_blacked_out(&self) -> bool {
        self.current == Some(BLACK)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl<G: Gpu> BlackoutSwitch<G, Option<RenderTarget>> {
    /// Canvas graph variant: the black child is a default-size [`Black`].
    pub fn new(normal: BoxedNode<G, Option<RenderTarget>>) -> Self {
        Self::with_black(normal, Box::new(Black::default()))
    }
}

impl<C, R> fmt::Debug for BlackoutSwitch<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlackoutSwitch")
            .field("blacked_out", &self.is_blacked_out())
            .field("active", &self.active)
            .finish()
    }
}

impl<C, R> Node<C, R> for BlackoutSwitch<C, R> {
    fn inputs(&self) -> Vec<&BoxedNode<C, R>> {
        selected(&self.branches, self.current)
    }

    fn inputs_mut(&mut self) -> Vec<&mut BoxedNode<C, R>> {
        selected_mut(&mut self.branches, self.current)
    }

    fn enter(&mut self, _ctx: &mut C) -> Result<(), EngineError> {
        self.active = true;
        Ok(())
    }

    fn exit(&mut self, _ctx: &mut C) {
        self.active = false;
    }

    fn generate(&mut self, vibe: &Vibe, ctx: &mut C) -> Result<(), EngineError> {
        let next = if vibe.mode == Mode::Blackout { BLACK } else { NORMAL };
        swap_branch(
            "BlackoutSwitch",
            &mut self.branches,
            &mut self.current,
            next,
            self.active,
            ctx,
        )
    }

    fn render(&mut self, frame: &Frame, scheme: &ColorScheme, ctx: &mut C) -> R {
        debug_assert!(self.active, "BlackoutSwitch rendered outside enter/exit");
        let current = if self.is_blacked_out() { BLACK } else { NORMAL };
        self.branches[current].render(frame, scheme, ctx)
    }

    fn describe(&self) -> String {
        if self.is_blacked_out() {
            "BlackoutSwitch [blackout]".to_string()
        } else {
            "BlackoutSwitch".to_string()
        }
    }
}

/// N-way switch keyed by [`Mode`].
///
/// Modes without a branch keep whatever branch is active. No branch is selected until the
/// first `generate` names a registered mode, so entering the switch alone acquires nothing.
pub struct ModeSwitch<C, R> {
    modes: Vec<Mode>,
    branches: Vec<BoxedNode<C, R>>,
    current: Option<usize>,
    active: bool,
}

impl<C, R> ModeSwitch<C, R> {
    pub fn builder() -> ModeSwitchBuilder<C, R> {
        ModeSwitchBuilder::default()
    }

    pub fn new(branches: Vec<(Mode, BoxedNode<C, R>)>) -> Result<Self, EngineError> {
        branches
            .into_iter()
            .fold(Self::builder(), |b, (mode, node)| b.branch(mode, node))
            .build()
    }

    pub fn current_mode(&self) -> Option<Mode> {
        self.current.map(|i| self.modes[i])
    }

    pub fn current(&self) -> Option<&BoxedNode<C, R>> {
        self.current.map(|i| &self.branches[i])
    }

    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    pub fn has_mode(&self, mode: Mode) -> bool {
        self.modes.contains(&mode)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl<C, R> fmt::Debug for ModeSwitch<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeSwitch")
            .field("modes", &self.modes)
            .field("current", &self.current_mode())
            .field("active", &self.active)
            .finish()
    }
}

impl<C, R: Default> Node<C, R> for ModeSwitch<C, R> {
    fn inputs(&self) -> Vec<&BoxedNode<C, R>> {
        selected(&self.branches, self.current)
    }

    fn inputs_mut(&mut self) -> Vec<&mut BoxedNode<C, R>> {
        selected_mut(&mut self.branches, self.current)
    }

    fn enter(&mut self, _ctx: &mut C) -> Result<(), EngineError> {
        self.active = true;
        Ok(())
    }

    fn exit(&mut self, _ctx: &mut C) {
        self.active = false;
    }

    fn generate(&mut self, vibe: &Vibe, ctx: &mut C) -> Result<(), EngineError> {
        let Some(next) = self.modes.iter().position(|m| *m == vibe.mode) else {
            debug!(mode = %vibe.mode, keep = ?self.current_mode(), "mode switch: no branch for mode");
            return Ok(());
        };
        swap_branch(
            "ModeSwitch",
            &mut self.branches,
            &mut self.current,
            next,
            self.active,
            ctx,
        )
    }

    fn render(&mut self, frame: &Frame, scheme: &ColorScheme, ctx: &mut C) -> R {
        debug_assert!(self.active, "ModeSwitch rendered outside enter/exit");
        debug_assert!(self.current.is_some(), "ModeSwitch rendered before any mode selected a branch");
        match self.current {
            Some(i) => self.branches[i].render(frame, scheme, ctx),
            None => R::default(),
        }
    }

    fn describe(&self) -> String {
        match self.current_mode() {
            Some(mode) => format!("ModeSwitch [{mode}]"),
            None => "ModeSwitch".to_string(),
        }
    }
}

/// Collects `(mode, branch)` pairs for a [`ModeSwitch`].
pub struct ModeSwitchBuilder<C, R> {
    branches: Vec<(Mode, BoxedNode<C, R>)>,
    required: Vec<Mode>,
}

impl<C, R> Default for ModeSwitchBuilder<C, R> {
    fn default() -> Self {
        Self {
            branches: Vec::new(),
            required: Vec::new(),
        }
    }
}

impl<C, R> ModeSwitchBuilder<C, R> {
    pub fn branch(mut self, mode: Mode, node: BoxedNode<C, R>) -> Self {
        self.branches.push((mode, node));
        self
    }

    /// Fail [`build`](Self::build) unless `mode` has a branch.
    pub fn require(mut self, mode: Mode) -> Self {
        self.required.push(mode);
        self
    }

    pub fn build(self) -> Result<ModeSwitch<C, R>, EngineError> {
        const NODE: &str = "ModeSwitch";
        if self.branches.is_empty() {
            return Err(EngineError::NoBranches { node: NODE });
        }

        let mut modes = Vec::with_capacity(self.branches.len());
        let mut branches = Vec::with_capacity(self.branches.len());
        for (mode, node) in self.branches {
            if modes.contains(&mode) {
                return Err(EngineError::DuplicateBranch {
                    node: NODE,
                    mode: mode.to_string(),
                });
            }
            modes.push(mode);
            branches.push(node);
        }

        if let Some(missing) = self.required.iter().find(|m| !modes.contains(m)) {
            return Err(EngineError::MissingBranch {
                node: NODE,
                mode: missing.to_string(),
            });
        }

        Ok(ModeSwitch {
            modes,
            branches,
            current: None,
            active: false,
        })
    }
}

impl<C, R> fmt::Debug for ModeSwitchBuilder<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modes: Vec<Mode> = self.branches.iter().map(|(m, _)| *m).collect();
        f.debug_struct("ModeSwitchBuilder")
            .field("modes", &modes)
            .field("required", &self.required)
            .finish()
    }
}
