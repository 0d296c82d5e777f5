use thiserror::Error;

pub type TreeResult<T> = Result<T, TreeError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("path does not exist: {0}")]
    PathNotFound(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("cannot remove the tree root")]
    RootViolation,

    #[error("comparing mismatched nodes: '{left}' vs '{right}'")]
    MismatchedCompare { left: String, right: String },
}

/// The action that was being applied to a path when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathAction {
    Add,
    Remove,
}

impl std::fmt::Display for PathAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathAction::Add => write!(f, "add"),
            PathAction::Remove => write!(f, "remove"),
        }
    }
}

/// A single per-path failure collected during a batch operation.
///
/// Stacking and diff marking never abort on individual paths; they complete
/// and hand the collected failures back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathError {
    pub path: String,
    pub action: PathAction,
    pub error: TreeError,
}

impl PathError {
    pub fn new(path: impl Into<String>, action: PathAction, error: TreeError) -> Self {
        Self { path: path.into(), action, error }
    }
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unable to {} '{}': {}", self.action, self.path, self.error)
    }
}
