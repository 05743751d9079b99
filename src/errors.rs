use crate::props::PropId;
use crate::registry::ViewId;

/// Errors surfaced by views, the view registry and the scripting boundary.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("{function}: {message}")]
    InvalidArgument {
        function: &'static str,
        message: String,
    },

    #[error("Could not call action {action} on view {view_id} - view not ready")]
    ViewNotReady { view_id: ViewId, action: String },

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Drawing failed: {0}")]
    DrawFailed(String),

    #[error(transparent)]
    Property(#[from] PropertyError),
}

impl ViewError {
    pub(crate) fn invalid_argument(function: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            function,
            message: message.into(),
        }
    }
}

/// Errors raised while applying property batches.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropertyError {
    #[error("Property names must not be empty")]
    EmptyName,

    #[error("Property {name} has an unexpected type: expected {expected}")]
    UnexpectedType { name: PropId, expected: &'static str },
}

/// Errors raised while constructing or mutating scene nodes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NodeError {
    #[error("{node}: expected a property object as first argument, got {got}")]
    InvalidArguments { node: &'static str, got: &'static str },

    #[error("Child index {index} out of range (len {len})")]
    ChildOutOfRange { index: usize, len: usize },

    #[error("{0} nodes cannot have children")]
    NotAContainer(&'static str),

    #[error("Unknown node type: {0}")]
    UnknownNode(String),

    #[error(transparent)]
    Property(#[from] PropertyError),
}
