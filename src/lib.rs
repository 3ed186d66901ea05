//! # toolkit-core
//!
//! The event-dispatch and layout-validation core of a retained-mode windowing
//! toolkit: one ordered event queue feeding a dedicated dispatch thread, and a
//! component/container tree that tracks validity, propagates invalidation up to
//! the nearest validate root and re-lays-out downward.
//!
//! ## Core Systems
//!
//! - **[`event`]**: Event records, kinds, payloads, typed listener registries
//! - **[`queue`]**: Thread-safe FIFO event queue with kind filtering and a push/pop stack
//! - **[`dispatch`]**: Dispatch-thread context, run loop, nested pumps, event filters
//! - **[`component`]**: Slotmap-backed component tree, validate protocol, focus, peers
//! - **[`layout`]**: Layout strategies: stack, border, and taffy-powered flex
//! - **[`toolkit`]**: The context object owning the queue stack and dispatch thread
//! - **[`geometry`]**: Offset, Size, Region, Insets primitives

// Foundation
pub mod config;
pub mod error;
pub mod geometry;
pub mod logging;

// Component tree
pub mod component;
pub mod layout;

// Events and dispatch
pub mod dispatch;
pub mod event;
pub mod queue;

// Application
pub mod toolkit;

// Test helpers
pub mod testing;

pub use component::{ComponentId, ComponentTree, Peer};
pub use config::ToolkitConfig;
pub use dispatch::Ui;
pub use error::{Result, ToolkitError};
pub use event::{Event, EventKind, Source};
pub use queue::EventQueue;
pub use toolkit::Toolkit;
