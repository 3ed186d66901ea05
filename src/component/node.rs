//! Node types: ComponentId, ComponentData.

use slotmap::new_key_type;

use crate::event::Listeners;
use crate::geometry::{Insets, Region, Size};
use crate::layout::LayoutManager;

use super::peer::Peer;

new_key_type! {
    /// Unique identifier for a component. Copy, lightweight (u64).
    pub struct ComponentId;
}

/// One size category (preferred, minimum or maximum).
///
/// An explicit value set by the application is sticky: invalidation clears
/// only the cached, computed value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SizeSlot {
    pub(crate) explicit: Option<Size>,
    pub(crate) cached: Option<Size>,
}

impl SizeSlot {
    pub(crate) fn get(&self) -> Option<Size> {
        self.explicit.or(self.cached)
    }

    pub(crate) fn clear_cache(&mut self) {
        self.cached = None;
    }
}

/// The container part of a component.
pub(crate) struct ContainerPart {
    pub(crate) layout: Option<Box<dyn LayoutManager>>,
    pub(crate) validate_root: bool,
    pub(crate) insets: Insets,
}

impl ContainerPart {
    pub(crate) fn new(validate_root: bool) -> Self {
        Self { layout: None, validate_root, insets: Insets::ZERO }
    }
}

/// Data associated with a single component.
pub struct ComponentData {
    pub(crate) name: String,
    pub(crate) bounds: Region,
    pub(crate) valid: bool,
    pub(crate) visible: bool,
    pub(crate) enabled: bool,
    pub(crate) focusable: bool,
    pub(crate) preferred: SizeSlot,
    pub(crate) minimum: SizeSlot,
    pub(crate) maximum: SizeSlot,
    pub(crate) listeners: Listeners,
    pub(crate) peer: Option<Box<dyn Peer>>,
    pub(crate) container: Option<ContainerPart>,
}

impl ComponentData {
    pub(crate) fn new(name: impl Into<String>, container: Option<ContainerPart>) -> Self {
        Self {
            name: name.into(),
            bounds: Region::EMPTY,
            valid: false,
            visible: true,
            enabled: true,
            focusable: false,
            preferred: SizeSlot::default(),
            minimum: SizeSlot::default(),
            maximum: SizeSlot::default(),
            listeners: Listeners::new(),
            peer: None,
            container,
        }
    }

    /// Debug name given at creation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bounds relative to the parent's origin.
    pub fn bounds(&self) -> Region {
        self.bounds
    }

    /// Whether the cached layout is authoritative.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_focusable(&self) -> bool {
        self.focusable
    }

    /// Whether this component can hold children.
    pub fn is_container(&self) -> bool {
        self.container.is_some()
    }

    /// Whether upward invalidation stops here.
    pub fn is_validate_root(&self) -> bool {
        self.container.as_ref().is_some_and(|c| c.validate_root)
    }

    /// Whether a layout strategy is installed.
    pub fn has_layout(&self) -> bool {
        self.container.as_ref().is_some_and(|c| c.layout.is_some())
    }

    /// Container insets; zero for plain components.
    pub fn insets(&self) -> Insets {
        self.container.as_ref().map(|c| c.insets).unwrap_or(Insets::ZERO)
    }

    /// Whether a native peer is attached.
    pub fn has_peer(&self) -> bool {
        self.peer.is_some()
    }

    /// Whether the application fixed the preferred size.
    pub fn is_preferred_size_set(&self) -> bool {
        self.preferred.explicit.is_some()
    }

    pub fn is_minimum_size_set(&self) -> bool {
        self.minimum.explicit.is_some()
    }

    pub fn is_maximum_size_set(&self) -> bool {
        self.maximum.explicit.is_some()
    }

    /// Registered listeners.
    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    /// Mark invalid and drop computed (non-explicit) sizes.
    pub(crate) fn mark_invalid(&mut self) {
        self.valid = false;
        self.preferred.clear_cache();
        self.minimum.clear_cache();
        self.maximum.clear_cache();
    }
}

impl std::fmt::Debug for ComponentData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentData")
            .field("name", &self.name)
            .field("bounds", &self.bounds)
            .field("valid", &self.valid)
            .field("visible", &self.visible)
            .field("container", &self.container.is_some())
            .field("validate_root", &self.is_validate_root())
            .field("peer", &self.peer.is_some())
            .finish()
    }
}
