//! The native peer contract.
//!
//! A peer is the platform view a component delegates geometry, redraw and
//! focus to. The core never renders; it only calls these hooks.

use crate::geometry::{Region, Size};

use super::node::ComponentId;

/// Native widget handle attached to a component.
pub trait Peer: Send {
    /// The component's peer was attached under `parent`.
    fn attach(&mut self, parent: ComponentId);

    /// The component was removed from its container.
    fn detach(&mut self);

    /// Current native bounds.
    fn bounds(&self) -> Region;

    /// Move and resize the native view.
    fn set_bounds(&mut self, bounds: Region);

    /// Ask the native view to re-layout and re-measure.
    fn request_layout(&mut self);

    /// Schedule a redraw of `area`, or of the whole view for `None`.
    fn invalidate_for_redraw(&mut self, area: Option<Region>);

    /// Whether the native view holds input focus.
    fn is_focused(&self) -> bool;

    /// Ask for native input focus. Returns whether the request was granted.
    fn request_focus(&mut self) -> bool;

    /// The native view's natural size.
    fn measured_size(&self) -> Size;
}
