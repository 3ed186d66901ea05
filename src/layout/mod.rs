//! Layout strategies: the [`LayoutManager`] contract and the stack, border
//! and taffy-backed flex implementations.

pub mod border;
pub mod flex;
pub mod stack;
pub mod strategy;

pub use border::BorderLayout;
pub use flex::{FlexDirection, FlexLayout};
pub use stack::{Axis, StackLayout};
pub use strategy::{content_area, BorderRegion, Constraint, LayoutManager};
