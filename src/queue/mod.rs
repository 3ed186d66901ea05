//! The event queue and the queue stack.

pub mod event_queue;
mod guard;

pub use event_queue::EventQueue;
