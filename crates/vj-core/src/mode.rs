use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Named show state used to key subgraph selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Blackout,
    Gentle,
    Rave,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Blackout, Mode::Gentle, Mode::Rave];

    pub fn name(self) -> &'static str {
        match self {
            Mode::Blackout => "blackout",
            Mode::Gentle => "gentle",
            Mode::Rave => "rave",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| EngineError::UnknownMode(s.to_string()))
    }
}

/// Mode-change signal handed to `generate`. Nodes must not keep it past the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vibe {
    pub mode: Mode,
}

impl Vibe {
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }
}
