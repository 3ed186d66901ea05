//! Event filters for nested pumps.

use crate::component::{ComponentId, ComponentTree};
use crate::event::Event;

/// Verdict of an [`EventFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAction {
    Accept,
    /// Set the event aside until the pump that installed the filter exits.
    Reject,
}

/// Decides which events a filtered pump lets through.
///
/// Filters see events after target resolution, so native input already
/// carries the component it will be delivered to.
pub trait EventFilter {
    fn accept(&self, tree: &ComponentTree, event: &Event) -> FilterAction;
}

impl<F> EventFilter for F
where
    F: Fn(&ComponentTree, &Event) -> FilterAction,
{
    fn accept(&self, tree: &ComponentTree, event: &Event) -> FilterAction {
        self(tree, event)
    }
}

/// Lets only input aimed inside one subtree through; everything that is not
/// mouse or key input passes.
#[derive(Debug, Clone, Copy)]
pub struct ModalFilter {
    root: ComponentId,
}

impl ModalFilter {
    pub fn new(root: ComponentId) -> Self {
        Self { root }
    }

    pub fn root(&self) -> ComponentId {
        self.root
    }
}

impl EventFilter for ModalFilter {
    fn accept(&self, tree: &ComponentTree, event: &Event) -> FilterAction {
        if !event.kind().is_input() {
            return FilterAction::Accept;
        }
        match event.target() {
            Some(target) if tree.is_same_or_ancestor(self.root, target) => FilterAction::Accept,
            _ => FilterAction::Reject,
        }
    }
}
