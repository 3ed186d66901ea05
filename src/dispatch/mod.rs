//! Event dispatch: the dispatch-thread context, the run loop, nested pumps
//! and event filters.

pub mod filter;
mod pump;
pub mod ui;

pub use filter::{EventFilter, FilterAction, ModalFilter};
pub use ui::Ui;

/// What the dispatch thread is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchState {
    /// Delivering events.
    Running,
    /// Blocked on an empty queue, or not started yet.
    #[default]
    Idle,
    /// Dispatching has been stopped for good.
    Stopped,
}
