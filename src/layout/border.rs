//! Five-region border layout.

use crate::component::{ComponentId, ComponentTree};
use crate::error::Result;
use crate::geometry::{Region, Size};

use super::strategy::{content_area, BorderRegion, Constraint, LayoutManager};

/// North and south span the full width at their preferred height; east and
/// west take their preferred width between them; center gets the rest.
///
/// A child added without a region constraint goes to the center. Adding a
/// second child to an occupied region replaces the first.
#[derive(Debug, Clone, Default)]
pub struct BorderLayout {
    hgap: i32,
    vgap: i32,
    north: Option<ComponentId>,
    south: Option<ComponentId>,
    east: Option<ComponentId>,
    west: Option<ComponentId>,
    center: Option<ComponentId>,
}

impl BorderLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Horizontal and vertical space between regions.
    pub fn with_gaps(mut self, hgap: i32, vgap: i32) -> Self {
        self.hgap = hgap.max(0);
        self.vgap = vgap.max(0);
        self
    }

    /// The child occupying `region`, if any.
    pub fn child_in(&self, region: BorderRegion) -> Option<ComponentId> {
        match region {
            BorderRegion::North => self.north,
            BorderRegion::South => self.south,
            BorderRegion::East => self.east,
            BorderRegion::West => self.west,
            BorderRegion::Center => self.center,
        }
    }

    fn slot_mut(&mut self, region: BorderRegion) -> &mut Option<ComponentId> {
        match region {
            BorderRegion::North => &mut self.north,
            BorderRegion::South => &mut self.south,
            BorderRegion::East => &mut self.east,
            BorderRegion::West => &mut self.west,
            BorderRegion::Center => &mut self.center,
        }
    }

    fn visible(tree: &ComponentTree, slot: Option<ComponentId>) -> Option<ComponentId> {
        slot.filter(|&c| tree.get(c).is_some_and(|n| n.is_visible()))
    }

    fn combine(
        &self,
        tree: &mut ComponentTree,
        parent: ComponentId,
        size_of: fn(&mut ComponentTree, ComponentId) -> Size,
    ) -> Size {
        let mut measure = |slot| Self::visible(tree, slot).map(|c| size_of(tree, c));
        let north = measure(self.north);
        let south = measure(self.south);
        let east = measure(self.east);
        let west = measure(self.west);
        let center = measure(self.center);

        let mut width: i32 = 0;
        let mut height: i32 = 0;
        for s in [east, west].into_iter().flatten() {
            width = width.saturating_add(s.width).saturating_add(self.hgap);
            height = height.max(s.height);
        }
        if let Some(s) = center {
            width = width.saturating_add(s.width);
            height = height.max(s.height);
        }
        for s in [north, south].into_iter().flatten() {
            width = width.max(s.width);
            height = height.saturating_add(s.height).saturating_add(self.vgap);
        }
        Size::new(width, height).grow(tree.insets(parent)).min(Size::MAX)
    }
}

impl LayoutManager for BorderLayout {
    fn add_layout_component(&mut self, child: ComponentId, constraint: &Constraint) {
        let region = match constraint {
            Constraint::Region(region) => *region,
            _ => BorderRegion::Center,
        };
        *self.slot_mut(region) = Some(child);
    }

    fn remove_layout_component(&mut self, child: ComponentId) {
        for slot in [&mut self.north, &mut self.south, &mut self.east, &mut self.west, &mut self.center] {
            if *slot == Some(child) {
                *slot = None;
            }
        }
    }

    fn layout_container(&mut self, tree: &mut ComponentTree, parent: ComponentId) -> Result<()> {
        let area = content_area(tree, parent);
        let (mut top, mut bottom) = (area.y, area.bottom());
        let (mut left, mut right) = (area.x, area.right());

        if let Some(c) = Self::visible(tree, self.north) {
            let h = tree.preferred_size(c).height;
            tree.set_bounds(c, Region::new(left, top, right.saturating_sub(left), h))?;
            top = top.saturating_add(h).saturating_add(self.vgap);
        }
        if let Some(c) = Self::visible(tree, self.south) {
            let h = tree.preferred_size(c).height;
            tree.set_bounds(c, Region::new(left, bottom.saturating_sub(h), right.saturating_sub(left), h))?;
            bottom = bottom.saturating_sub(h).saturating_sub(self.vgap);
        }
        let middle = bottom.saturating_sub(top).max(0);
        if let Some(c) = Self::visible(tree, self.east) {
            let w = tree.preferred_size(c).width;
            tree.set_bounds(c, Region::new(right.saturating_sub(w), top, w, middle))?;
            right = right.saturating_sub(w).saturating_sub(self.hgap);
        }
        if let Some(c) = Self::visible(tree, self.west) {
            let w = tree.preferred_size(c).width;
            tree.set_bounds(c, Region::new(left, top, w, middle))?;
            left = left.saturating_add(w).saturating_add(self.hgap);
        }
        if let Some(c) = Self::visible(tree, self.center) {
            tree.set_bounds(c, Region::new(left, top, right.saturating_sub(left).max(0), middle))?;
        }
        Ok(())
    }

    fn preferred_layout_size(&mut self, tree: &mut ComponentTree, parent: ComponentId) -> Size {
        self.combine(tree, parent, ComponentTree::preferred_size)
    }

    fn minimum_layout_size(&mut self, tree: &mut ComponentTree, parent: ComponentId) -> Size {
        self.combine(tree, parent, ComponentTree::minimum_size)
    }
}
