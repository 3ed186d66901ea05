//! Flexbox layout backed by taffy.
//!
//! Each pass builds a throwaway [`TaffyTree`] mirroring the visible children
//! of one container, computes it, and copies the results back as child
//! bounds. Coordinates are rounded to whole units.

use std::collections::HashMap;

use taffy::prelude::{
    AvailableSpace, Dimension, Display, FromLength, LengthPercentage, Style, TaffyAuto, TaffyTree,
};
use taffy::NodeId as TaffyNode;

use crate::component::{ComponentId, ComponentTree};
use crate::error::{Result, ToolkitError};
use crate::geometry::{Region, Size};

use super::strategy::{content_area, visible_children, Constraint, LayoutManager};

/// Main axis of a [`FlexLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlexDirection {
    #[default]
    Row,
    Column,
}

impl From<FlexDirection> for taffy::FlexDirection {
    fn from(d: FlexDirection) -> Self {
        match d {
            FlexDirection::Row => taffy::FlexDirection::Row,
            FlexDirection::Column => taffy::FlexDirection::Column,
        }
    }
}

/// Flexbox row or column. Children start at their preferred size; free
/// space is shared out by the grow factors given as [`Constraint::Grow`].
#[derive(Debug, Clone, Default)]
pub struct FlexLayout {
    direction: FlexDirection,
    gap: f32,
    grow: HashMap<ComponentId, f32>,
}

fn layout_error(err: taffy::TaffyError) -> ToolkitError {
    ToolkitError::Layout(err.to_string())
}

fn length(size: Size) -> taffy::geometry::Size<Dimension> {
    taffy::geometry::Size {
        width: Dimension::from_length(size.width as f32),
        height: Dimension::from_length(size.height as f32),
    }
}

impl FlexLayout {
    pub fn row() -> Self {
        Self { direction: FlexDirection::Row, ..Self::default() }
    }

    pub fn column() -> Self {
        Self { direction: FlexDirection::Column, ..Self::default() }
    }

    pub fn with_gap(mut self, gap: i32) -> Self {
        self.gap = gap.max(0) as f32;
        self
    }

    /// Grow factor registered for `child` (0 if none).
    pub fn grow_of(&self, child: ComponentId) -> f32 {
        self.grow.get(&child).copied().unwrap_or(0.0)
    }

    /// Build and compute a taffy tree for the visible children of `parent`.
    ///
    /// With `area`, the container is fixed to that size and children may grow
    /// or shrink; without, it sizes to its content.
    fn compute(
        &self,
        tree: &mut ComponentTree,
        parent: ComponentId,
        area: Option<Size>,
        size_of: fn(&mut ComponentTree, ComponentId) -> Size,
    ) -> Result<(Size, Vec<(ComponentId, Region)>)> {
        let kids = visible_children(tree, parent);
        let mut taffy: TaffyTree<()> = TaffyTree::new();

        let mut nodes: Vec<TaffyNode> = Vec::with_capacity(kids.len());
        for &child in &kids {
            let style = Style {
                size: length(size_of(tree, child)),
                flex_grow: self.grow_of(child),
                flex_shrink: 1.0,
                ..Default::default()
            };
            nodes.push(taffy.new_leaf(style).map_err(layout_error)?);
        }

        let gap = LengthPercentage::from_length(self.gap);
        let root_style = Style {
            display: Display::Flex,
            flex_direction: self.direction.into(),
            gap: taffy::geometry::Size { width: gap, height: gap },
            size: match area {
                Some(a) => length(a),
                None => taffy::geometry::Size { width: Dimension::AUTO, height: Dimension::AUTO },
            },
            ..Default::default()
        };
        let root = taffy.new_with_children(root_style, &nodes).map_err(layout_error)?;

        let available = match area {
            Some(a) => taffy::geometry::Size {
                width: AvailableSpace::Definite(a.width as f32),
                height: AvailableSpace::Definite(a.height as f32),
            },
            None => taffy::geometry::Size {
                width: AvailableSpace::MaxContent,
                height: AvailableSpace::MaxContent,
            },
        };
        taffy.compute_layout(root, available).map_err(layout_error)?;

        let root_layout = taffy.layout(root).map_err(layout_error)?;
        let total = Size::new(
            root_layout.size.width.round() as i32,
            root_layout.size.height.round() as i32,
        );
        let mut placed = Vec::with_capacity(kids.len());
        for (&child, &node) in kids.iter().zip(&nodes) {
            let layout = taffy.layout(node).map_err(layout_error)?;
            placed.push((
                child,
                Region {
                    x: layout.location.x.round() as i32,
                    y: layout.location.y.round() as i32,
                    width: layout.size.width.round().max(0.0) as i32,
                    height: layout.size.height.round().max(0.0) as i32,
                },
            ));
        }
        Ok((total, placed))
    }

    fn content_size(
        &self,
        tree: &mut ComponentTree,
        parent: ComponentId,
        size_of: fn(&mut ComponentTree, ComponentId) -> Size,
    ) -> Size {
        match self.compute(tree, parent, None, size_of) {
            Ok((size, _)) => size.grow(tree.insets(parent)),
            Err(err) => {
                tracing::warn!(?parent, %err, "flex measurement failed");
                Size::ZERO.grow(tree.insets(parent))
            }
        }
    }
}

impl LayoutManager for FlexLayout {
    fn add_layout_component(&mut self, child: ComponentId, constraint: &Constraint) {
        if let Constraint::Grow(factor) = constraint {
            self.grow.insert(child, factor.max(0.0));
        }
    }

    fn remove_layout_component(&mut self, child: ComponentId) {
        self.grow.remove(&child);
    }

    fn layout_container(&mut self, tree: &mut ComponentTree, parent: ComponentId) -> Result<()> {
        let area = content_area(tree, parent);
        let (_, placed) = self.compute(tree, parent, Some(area.size()), ComponentTree::preferred_size)?;
        for (child, bounds) in placed {
            tree.set_bounds(child, bounds.translate(area.offset()))?;
        }
        Ok(())
    }

    fn preferred_layout_size(&mut self, tree: &mut ComponentTree, parent: ComponentId) -> Size {
        self.content_size(tree, parent, ComponentTree::preferred_size)
    }

    fn minimum_layout_size(&mut self, tree: &mut ComponentTree, parent: ComponentId) -> Size {
        self.content_size(tree, parent, ComponentTree::minimum_size)
    }
}
