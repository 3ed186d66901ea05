//! Component tree: node data, the native peer contract, the validate
//! protocol and keyboard focus.

pub mod node;
pub mod peer;
pub mod tree;

mod focus;
mod validate;

pub use node::{ComponentData, ComponentId};
pub use peer::Peer;
pub use tree::ComponentTree;
