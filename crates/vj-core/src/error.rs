use std::path::PathBuf;

/// Engine-level errors used across the vj crates.
///
/// Contract rule: this type lives in `vj-core` and is re-exported by the graph, GPU and node
/// crates, so a host only ever matches on one error type.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    // ---- Config ----
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json parse error at {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config at {}: {msg}", path.display())]
    InvalidConfig { path: PathBuf, msg: String },

    #[error("unknown mode '{0}'")]
    UnknownMode(String),

    #[error("unknown frame signal '{0}'")]
    UnknownSignal(String),

    // ---- Graph construction ----
    #[error("{node}: at least one candidate is required")]
    NoCandidates { node: &'static str },

    #[error("{node}: invalid weights: {msg}")]
    InvalidWeights { node: &'static str, msg: String },

    #[error("{node}: at least one mode branch is required")]
    NoBranches { node: &'static str },

    #[error("{node}: mode '{mode}' registered twice")]
    DuplicateBranch { node: &'static str, mode: String },

    #[error("{node}: no branch registered for required mode '{mode}'")]
    MissingBranch { node: &'static str, mode: String },

    // ---- GPU backend ----
    #[error("vertex shader compile error: {0}")]
    VertexCompile(String),

    #[error("fragment shader compile error: {0}")]
    FragmentCompile(String),

    #[error("program link error: {0}")]
    Link(String),

    #[error("backend object creation failed: {0}")]
    GlCreate(String),

    #[error("graphics context lost")]
    ContextLost,

    // ---- Fallback ----
    #[error("{0}")]
    Other(String),
}

impl EngineError {
    pub fn other<T: Into<String>>(s: T) -> Self {
        EngineError::Other(s.into())
    }

    /// True for errors raised while compiling or linking a shader program.
    pub fn is_shader_error(&self) -> bool {
        matches!(
            self,
            EngineError::VertexCompile(_) | EngineError::FragmentCompile(_) | EngineError::Link(_)
        )
    }
}
