//! Keyboard focus: the focus owner and tab-order traversal.
//!
//! The traversal order is depth-first over the top-level components, visiting
//! only components that are focusable, showing and enabled. Focus changes
//! queue a focus-lost event for the previous owner followed by a
//! focus-gained event for the new one.

use super::node::ComponentId;
use super::tree::ComponentTree;
use crate::error::Result;
use crate::event::{Event, EventKind};

impl ComponentTree {
    /// The component holding keyboard focus, if any.
    pub fn focus_owner(&self) -> Option<ComponentId> {
        self.focus_owner
    }

    /// Whether `id` can currently take focus.
    pub fn can_focus(&self, id: ComponentId) -> bool {
        self.get(id)
            .is_some_and(|n| n.focusable && n.enabled && self.is_showing(id))
            && self.ancestors(id).iter().all(|&a| self.get(a).is_some_and(|n| n.enabled))
    }

    /// Focusable components in traversal order.
    pub fn focus_chain(&self) -> Vec<ComponentId> {
        self.top_levels
            .iter()
            .flat_map(|&top| self.walk_depth_first(top))
            .filter(|&id| self.can_focus(id))
            .collect()
    }

    /// Give focus to `id`.
    ///
    /// Returns `Ok(false)` if the component cannot take focus. Requesting
    /// focus for the current owner changes nothing and queues no events.
    pub fn request_focus(&mut self, id: ComponentId) -> Result<bool> {
        self.check_thread();
        self.node(id)?;
        if !self.can_focus(id) {
            return Ok(false);
        }
        if self.focus_owner == Some(id) {
            return Ok(true);
        }
        let previous = self.focus_owner.replace(id);
        if let Some(prev) = previous {
            self.notify(Event::focus(EventKind::FocusLost, prev, Some(id)));
        }
        self.notify(Event::focus(EventKind::FocusGained, id, previous));
        tracing::trace!(?previous, owner = ?id, "focus moved");
        Ok(true)
    }

    /// Move focus to the next component in traversal order, wrapping.
    pub fn focus_next(&mut self) -> Result<Option<ComponentId>> {
        let chain = self.focus_chain();
        if chain.is_empty() {
            return Ok(None);
        }
        let next = match self.focus_owner.and_then(|o| chain.iter().position(|&c| c == o)) {
            Some(idx) => (idx + 1) % chain.len(),
            None => 0,
        };
        self.request_focus(chain[next])?;
        Ok(Some(chain[next]))
    }

    /// Move focus to the previous component in traversal order, wrapping.
    pub fn focus_previous(&mut self) -> Result<Option<ComponentId>> {
        let chain = self.focus_chain();
        if chain.is_empty() {
            return Ok(None);
        }
        let prev = match self.focus_owner.and_then(|o| chain.iter().position(|&c| c == o)) {
            Some(0) | None => chain.len() - 1,
            Some(idx) => idx - 1,
        };
        self.request_focus(chain[prev])?;
        Ok(Some(chain[prev]))
    }

    /// Drop focus. The previous owner receives a focus-lost event.
    pub fn clear_focus(&mut self) {
        if let Some(prev) = self.focus_owner.take() {
            self.notify(Event::focus(EventKind::FocusLost, prev, None));
            tracing::trace!(previous = ?prev, "focus cleared");
        }
    }
}
