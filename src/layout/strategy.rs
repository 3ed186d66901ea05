//! The layout strategy contract.

use crate::component::{ComponentId, ComponentTree};
use crate::error::Result;
use crate::geometry::{Region, Size};

/// Where a child sits in a [`BorderLayout`](super::BorderLayout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorderRegion {
    North,
    South,
    East,
    West,
    Center,
}

/// Per-child placement hint passed when a child is added to a container.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Constraint {
    #[default]
    None,
    Region(BorderRegion),
    /// Flex grow factor.
    Grow(f32),
}

/// A pluggable strategy that positions a container's children.
///
/// The tree lends the container's layout out for the duration of each call,
/// so implementations are free to query child sizes and call
/// [`ComponentTree::set_bounds`] on children.
pub trait LayoutManager: Send {
    /// A child was added with `constraint`.
    fn add_layout_component(&mut self, _child: ComponentId, _constraint: &Constraint) {}

    /// A child was removed.
    fn remove_layout_component(&mut self, _child: ComponentId) {}

    /// Position the children of `parent` inside its content area.
    fn layout_container(&mut self, tree: &mut ComponentTree, parent: ComponentId) -> Result<()>;

    fn preferred_layout_size(&mut self, tree: &mut ComponentTree, parent: ComponentId) -> Size;

    fn minimum_layout_size(&mut self, tree: &mut ComponentTree, parent: ComponentId) -> Size;

    fn maximum_layout_size(&mut self, _tree: &mut ComponentTree, _parent: ComponentId) -> Size {
        Size::MAX
    }

    /// Horizontal alignment, 0.0 (left) to 1.0 (right).
    fn layout_alignment_x(&self, _tree: &ComponentTree, _parent: ComponentId) -> f32 {
        0.5
    }

    /// Vertical alignment, 0.0 (top) to 1.0 (bottom).
    fn layout_alignment_y(&self, _tree: &ComponentTree, _parent: ComponentId) -> f32 {
        0.5
    }

    /// Drop any cached state for `parent`.
    fn invalidate_layout(&mut self, _parent: ComponentId) {}
}

/// The area children may occupy: the container's size less its insets, in
/// the container's own coordinates.
pub fn content_area(tree: &ComponentTree, parent: ComponentId) -> Region {
    tree.bounds(parent).size().to_region().shrink(tree.insets(parent))
}

/// Visible children of `parent`, in list order.
pub(crate) fn visible_children(tree: &ComponentTree, parent: ComponentId) -> Vec<ComponentId> {
    tree.children(parent)
        .iter()
        .copied()
        .filter(|&c| tree.get(c).is_some_and(|n| n.is_visible()))
        .collect()
}
