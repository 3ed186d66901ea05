//! Single-axis stacking layout.

use crate::component::{ComponentId, ComponentTree};
use crate::error::Result;
use crate::geometry::{Region, Size};

use super::strategy::{content_area, visible_children, LayoutManager};

/// Stacking direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    #[default]
    Vertical,
    Horizontal,
}

/// Places visible children one after another along an axis, each at its
/// preferred size, separated by `gap`, starting at the container's insets.
///
/// With `stretch`, children fill the cross axis of the content area.
#[derive(Debug, Clone, Default)]
pub struct StackLayout {
    axis: Axis,
    gap: i32,
    stretch: bool,
}

impl StackLayout {
    pub fn vertical() -> Self {
        Self { axis: Axis::Vertical, ..Self::default() }
    }

    pub fn horizontal() -> Self {
        Self { axis: Axis::Horizontal, ..Self::default() }
    }

    /// Space between consecutive children.
    pub fn with_gap(mut self, gap: i32) -> Self {
        self.gap = gap.max(0);
        self
    }

    /// Fill the cross axis.
    pub fn with_stretch(mut self, stretch: bool) -> Self {
        self.stretch = stretch;
        self
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn gap(&self) -> i32 {
        self.gap
    }

    /// Sum along the axis, max across it, plus gaps and insets. Clamped to
    /// [`Size::MAX`].
    fn accumulate(&self, tree: &ComponentTree, parent: ComponentId, sizes: &[Size]) -> Size {
        let count = i32::try_from(sizes.len().saturating_sub(1)).unwrap_or(i32::MAX);
        let gaps = self.gap.saturating_mul(count);
        let content = sizes.iter().fold(Size::ZERO, |acc, s| match self.axis {
            Axis::Vertical => Size::new(acc.width.max(s.width), acc.height.saturating_add(s.height)),
            Axis::Horizontal => Size::new(acc.width.saturating_add(s.width), acc.height.max(s.height)),
        });
        let content = match self.axis {
            Axis::Vertical => Size::new(content.width, content.height.saturating_add(gaps)),
            Axis::Horizontal => Size::new(content.width.saturating_add(gaps), content.height),
        };
        content.grow(tree.insets(parent)).min(Size::MAX)
    }
}

impl LayoutManager for StackLayout {
    fn layout_container(&mut self, tree: &mut ComponentTree, parent: ComponentId) -> Result<()> {
        let area = content_area(tree, parent);
        let mut cursor = match self.axis {
            Axis::Vertical => area.y,
            Axis::Horizontal => area.x,
        };
        for child in visible_children(tree, parent) {
            let pref = tree.preferred_size(child);
            let bounds = match self.axis {
                Axis::Vertical => {
                    let width = if self.stretch { area.width } else { pref.width };
                    let bounds = Region::new(area.x, cursor, width, pref.height);
                    cursor = cursor.saturating_add(pref.height).saturating_add(self.gap);
                    bounds
                }
                Axis::Horizontal => {
                    let height = if self.stretch { area.height } else { pref.height };
                    let bounds = Region::new(cursor, area.y, pref.width, height);
                    cursor = cursor.saturating_add(pref.width).saturating_add(self.gap);
                    bounds
                }
            };
            tree.set_bounds(child, bounds)?;
        }
        Ok(())
    }

    fn preferred_layout_size(&mut self, tree: &mut ComponentTree, parent: ComponentId) -> Size {
        let sizes: Vec<Size> = visible_children(tree, parent)
            .into_iter()
            .map(|c| tree.preferred_size(c))
            .collect();
        self.accumulate(tree, parent, &sizes)
    }

    fn minimum_layout_size(&mut self, tree: &mut ComponentTree, parent: ComponentId) -> Size {
        let sizes: Vec<Size> = visible_children(tree, parent)
            .into_iter()
            .map(|c| tree.minimum_size(c))
            .collect();
        self.accumulate(tree, parent, &sizes)
    }

    fn layout_alignment_x(&self, _tree: &ComponentTree, _parent: ComponentId) -> f32 {
        0.0
    }

    fn layout_alignment_y(&self, _tree: &ComponentTree, _parent: ComponentId) -> f32 {
        0.0
    }
}
