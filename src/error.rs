//! Error type for protocol misuse and dispatch failures.
//!
//! Listener panics are not represented here: they are caught at the dispatch
//! boundary and logged. Mutating a bound component tree from the wrong thread
//! is a fatal precondition violation and panics instead of returning an error.

use crate::component::ComponentId;
use crate::geometry::Size;

/// Errors surfaced to callers of the toolkit API.
#[derive(Debug, thiserror::Error)]
pub enum ToolkitError {
    #[error("event queue stack underflow: no previous queue to pop back to")]
    EmptyQueueStack,

    #[error("component {0:?} cannot be added to itself")]
    SelfContainment(ComponentId),

    #[error("component {child:?} is an ancestor of {parent:?}; adding it would create a cycle")]
    AncestorCycle { parent: ComponentId, child: ComponentId },

    #[error("component {0:?} is not a container")]
    NotAContainer(ComponentId),

    #[error("component {child:?} is not a child of {parent:?}")]
    NotAChild { parent: ComponentId, child: ComponentId },

    #[error("unknown component {0:?}")]
    UnknownComponent(ComponentId),

    #[error("child index {index} out of range for container with {len} children")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("negative size {}x{} requested", .0.width, .0.height)]
    NegativeSize(Size),

    #[error("layout computation failed: {0}")]
    Layout(String),

    #[error("events from one queue are already being dispatched on another thread")]
    ConcurrentDispatch,

    #[error("the dispatch thread has already been started")]
    AlreadyStarted,

    #[error("the dispatch thread is not running")]
    NotRunning,

    #[error("a default toolkit is already installed")]
    DefaultAlreadyInstalled,

    #[error("invocation was dropped before completing: {0}")]
    InvocationFailed(String),

    #[error("failed to spawn dispatch thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ToolkitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_size_message() {
        let err = ToolkitError::NegativeSize(Size::new(-3, 4));
        assert_eq!(err.to_string(), "negative size -3x4 requested");
    }

    #[test]
    fn underflow_message() {
        let err = ToolkitError::EmptyQueueStack;
        assert!(err.to_string().contains("underflow"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "no threads");
        let err: ToolkitError = io.into();
        assert!(matches!(err, ToolkitError::Spawn(_)));
    }
}
