//! The component tree: a slotmap arena with ordered child lists and
//! non-owning parent back-references.
//!
//! The child list is the only owning edge. A removed component stays in the
//! arena as a detached top-level component until it is disposed.

use std::sync::Arc;
use std::thread::{self, ThreadId};

use slotmap::{SecondaryMap, SlotMap};

use super::node::{ComponentData, ComponentId, ContainerPart};
use super::peer::Peer;
use crate::error::{Result, ToolkitError};
use crate::event::{Event, EventKind, ListenerSlot, Payload};
use crate::geometry::{Insets, Offset, Region, Size};
use crate::layout::{Constraint, LayoutManager};

/// Empty slice constant for returning when a component has no children.
const EMPTY_CHILDREN: &[ComponentId] = &[];

/// The component/container tree.
///
/// Mutation is single-writer: once [`bind_owner`](Self::bind_owner) has been
/// called (the dispatch thread does this on startup), every mutating call
/// from another thread panics.
pub struct ComponentTree {
    pub(super) nodes: SlotMap<ComponentId, ComponentData>,
    pub(super) children: SecondaryMap<ComponentId, Vec<ComponentId>>,
    pub(super) parent: SecondaryMap<ComponentId, ComponentId>,
    pub(super) top_levels: Vec<ComponentId>,
    pub(super) focus_owner: Option<ComponentId>,
    pub(super) owner: Option<ThreadId>,
    pub(super) outbox: Vec<Event>,
    pub(super) validate_passes: u64,
}

impl ComponentTree {
    /// Create an empty tree, not bound to any thread.
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            children: SecondaryMap::new(),
            parent: SecondaryMap::new(),
            top_levels: Vec::new(),
            focus_owner: None,
            owner: None,
            outbox: Vec::new(),
            validate_passes: 0,
        }
    }

    // ── Thread ownership ─────────────────────────────────────────────

    /// Restrict mutation to `thread`.
    pub fn bind_owner(&mut self, thread: ThreadId) {
        self.owner = Some(thread);
    }

    /// The thread allowed to mutate this tree, if bound.
    pub fn owner(&self) -> Option<ThreadId> {
        self.owner
    }

    /// Panics if the tree is bound to a thread other than the current one.
    pub(super) fn check_thread(&self) {
        if let Some(owner) = self.owner {
            let current = thread::current();
            assert!(
                owner == current.id(),
                "component tree mutated off the dispatch thread (from {:?} {:?}); \
                 marshal the change through invoke_later or invoke_and_wait",
                current.id(),
                current.name(),
            );
        }
    }

    // ── Creation ─────────────────────────────────────────────────────

    fn insert(&mut self, data: ComponentData) -> ComponentId {
        self.check_thread();
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        self.top_levels.push(id);
        id
    }

    /// Create a detached leaf component.
    pub fn create_component(&mut self, name: impl Into<String>) -> ComponentId {
        self.insert(ComponentData::new(name, None))
    }

    /// Create a detached container with no layout.
    pub fn create_container(&mut self, name: impl Into<String>) -> ComponentId {
        self.insert(ComponentData::new(name, Some(ContainerPart::new(false))))
    }

    /// Create a detached container that stops upward invalidation
    /// (a window, a scroll viewport).
    pub fn create_validate_root(&mut self, name: impl Into<String>) -> ComponentId {
        self.insert(ComponentData::new(name, Some(ContainerPart::new(true))))
    }

    // ── Lookup ───────────────────────────────────────────────────────

    /// Immutable access to a component's data.
    pub fn get(&self, id: ComponentId) -> Option<&ComponentData> {
        self.nodes.get(id)
    }

    pub(super) fn node_mut(&mut self, id: ComponentId) -> Result<&mut ComponentData> {
        self.nodes.get_mut(id).ok_or(ToolkitError::UnknownComponent(id))
    }

    pub(super) fn node(&self, id: ComponentId) -> Result<&ComponentData> {
        self.nodes.get(id).ok_or(ToolkitError::UnknownComponent(id))
    }

    /// Whether the tree contains `id`.
    pub fn contains(&self, id: ComponentId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of components, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The parent container, if attached.
    pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        self.parent.get(id).copied()
    }

    /// Children in insertion (paint and traversal) order.
    pub fn children(&self, id: ComponentId) -> &[ComponentId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(EMPTY_CHILDREN)
    }

    /// Components with no parent, in creation/detachment order.
    pub fn top_levels(&self) -> &[ComponentId] {
        &self.top_levels
    }

    /// Ancestors from the immediate parent up to the top-level component.
    pub fn ancestors(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut result = Vec::new();
        let mut current = id;
        while let Some(p) = self.parent.get(current).copied() {
            result.push(p);
            current = p;
        }
        result
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn is_same_or_ancestor(&self, ancestor: ComponentId, id: ComponentId) -> bool {
        ancestor == id || self.ancestors(id).contains(&ancestor)
    }

    /// Whether `id` is a container.
    pub fn is_container(&self, id: ComponentId) -> bool {
        self.nodes.get(id).is_some_and(ComponentData::is_container)
    }

    /// Pre-order depth-first traversal starting from `start`.
    pub fn walk_depth_first(&self, start: ComponentId) -> Vec<ComponentId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        result
    }

    // ── Structure ────────────────────────────────────────────────────

    /// Append `child` to `parent`.
    pub fn add(&mut self, parent: ComponentId, child: ComponentId, constraint: Constraint) -> Result<()> {
        self.add_at(parent, child, None, constraint)
    }

    /// Insert `child` into `parent` at `index` (or at the end for `None`).
    ///
    /// A child that already has a parent is removed from it first. The
    /// container is always invalidated.
    pub fn add_at(
        &mut self,
        parent: ComponentId,
        child: ComponentId,
        index: Option<usize>,
        constraint: Constraint,
    ) -> Result<()> {
        self.check_thread();
        if !self.node(parent)?.is_container() {
            return Err(ToolkitError::NotAContainer(parent));
        }
        self.node(child)?;
        if parent == child {
            return Err(ToolkitError::SelfContainment(child));
        }
        if self.is_same_or_ancestor(child, parent) {
            return Err(ToolkitError::AncestorCycle { parent, child });
        }

        let old_parent = self.parent(child);
        let len = self.children(parent).len() - usize::from(old_parent == Some(parent));
        let index = index.unwrap_or(len);
        if index > len {
            return Err(ToolkitError::IndexOutOfRange { index, len });
        }
        if let Some(old) = old_parent {
            self.remove(old, child)?;
        }

        self.top_levels.retain(|&c| c != child);
        self.parent.insert(child, parent);
        if let Some(kids) = self.children.get_mut(parent) {
            kids.insert(index, child);
        }
        self.with_layout(parent, |layout, _| layout.add_layout_component(child, &constraint));
        if let Some(peer) = self.node_mut(child)?.peer.as_mut() {
            peer.attach(parent);
        }

        self.node_mut(child)?.mark_invalid();
        self.invalidate(parent)?;
        self.notify(Event::with_payload(EventKind::ComponentAdded, parent, Payload::Child(child)));
        tracing::trace!(?parent, ?child, index, "child added");
        Ok(())
    }

    /// Detach `child` from `parent`. The child becomes a top-level component.
    pub fn remove(&mut self, parent: ComponentId, child: ComponentId) -> Result<()> {
        self.check_thread();
        self.node(parent)?;
        self.node(child)?;
        if self.parent(child) != Some(parent) {
            return Err(ToolkitError::NotAChild { parent, child });
        }

        if let Some(owner) = self.focus_owner {
            if self.is_same_or_ancestor(child, owner) {
                self.clear_focus();
            }
        }

        self.with_layout(parent, |layout, _| layout.remove_layout_component(child));
        if let Some(kids) = self.children.get_mut(parent) {
            kids.retain(|&c| c != child);
        }
        self.parent.remove(child);
        self.top_levels.push(child);
        if let Some(peer) = self.node_mut(child)?.peer.as_mut() {
            peer.detach();
        }

        self.invalidate(parent)?;
        self.notify(Event::with_payload(EventKind::ComponentRemoved, parent, Payload::Child(child)));
        tracing::trace!(?parent, ?child, "child removed");
        Ok(())
    }

    /// Detach every child of `parent`, last to first.
    pub fn remove_all(&mut self, parent: ComponentId) -> Result<()> {
        let kids = self.children(parent).to_vec();
        for child in kids.into_iter().rev() {
            self.remove(parent, child)?;
        }
        Ok(())
    }

    /// Detach `id` and drop it and all its descendants from the arena.
    pub fn dispose(&mut self, id: ComponentId) -> Result<()> {
        self.check_thread();
        self.node(id)?;
        if let Some(parent) = self.parent(id) {
            self.remove(parent, id)?;
        }
        if let Some(owner) = self.focus_owner {
            if self.is_same_or_ancestor(id, owner) {
                self.clear_focus();
            }
        }
        self.top_levels.retain(|&c| c != id);
        for current in self.walk_depth_first(id) {
            self.children.remove(current);
            self.parent.remove(current);
            if let Some(mut data) = self.nodes.remove(current) {
                if let Some(peer) = data.peer.as_mut() {
                    peer.detach();
                }
            }
        }
        tracing::trace!(?id, "component disposed");
        Ok(())
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Attach a native peer. The peer is told about the current parent and
    /// bounds.
    pub fn set_peer(&mut self, id: ComponentId, mut peer: Box<dyn Peer>) -> Result<()> {
        self.check_thread();
        let parent = self.parent(id);
        let node = self.node_mut(id)?;
        peer.set_bounds(node.bounds);
        if let Some(parent) = parent {
            peer.attach(parent);
        }
        node.peer = Some(peer);
        self.invalidate(id)
    }

    pub(crate) fn peer_mut(&mut self, id: ComponentId) -> Option<&mut (dyn Peer + 'static)> {
        self.nodes.get_mut(id)?.peer.as_deref_mut()
    }

    /// Install or clear the layout strategy of a container.
    ///
    /// Existing children are registered with the new layout with
    /// [`Constraint::None`].
    pub fn set_layout(&mut self, id: ComponentId, layout: Option<Box<dyn LayoutManager>>) -> Result<()> {
        self.check_thread();
        let kids = self.children(id).to_vec();
        let part = self.node_mut(id)?.container.as_mut().ok_or(ToolkitError::NotAContainer(id))?;
        part.layout = layout;
        if let Some(layout) = part.layout.as_mut() {
            for child in kids {
                layout.add_layout_component(child, &Constraint::None);
            }
        }
        self.invalidate(id)
    }

    /// Make a container a validate root, or not.
    pub fn set_validate_root(&mut self, id: ComponentId, validate_root: bool) -> Result<()> {
        self.check_thread();
        let part = self.node_mut(id)?.container.as_mut().ok_or(ToolkitError::NotAContainer(id))?;
        part.validate_root = validate_root;
        Ok(())
    }

    /// Set a container's insets.
    pub fn set_insets(&mut self, id: ComponentId, insets: Insets) -> Result<()> {
        self.check_thread();
        let part = self.node_mut(id)?.container.as_mut().ok_or(ToolkitError::NotAContainer(id))?;
        if part.insets != insets {
            part.insets = insets;
            self.invalidate(id)?;
        }
        Ok(())
    }

    /// Container insets; zero for plain components and unknown ids.
    pub fn insets(&self, id: ComponentId) -> Insets {
        self.nodes.get(id).map(ComponentData::insets).unwrap_or(Insets::ZERO)
    }

    /// Set whether the component takes part in focus traversal.
    pub fn set_focusable(&mut self, id: ComponentId, focusable: bool) -> Result<()> {
        self.check_thread();
        self.node_mut(id)?.focusable = focusable;
        if !focusable && self.focus_owner == Some(id) {
            self.clear_focus();
        }
        Ok(())
    }

    /// Enable or disable the component.
    pub fn set_enabled(&mut self, id: ComponentId, enabled: bool) -> Result<()> {
        self.check_thread();
        self.node_mut(id)?.enabled = enabled;
        if !enabled && self.focus_owner == Some(id) {
            self.clear_focus();
        }
        Ok(())
    }

    /// Show or hide the component. Visibility changes invalidate the parent.
    pub fn set_visible(&mut self, id: ComponentId, visible: bool) -> Result<()> {
        self.check_thread();
        let node = self.node_mut(id)?;
        if node.visible == visible {
            return Ok(());
        }
        node.visible = visible;
        if !visible {
            if let Some(owner) = self.focus_owner {
                if self.is_same_or_ancestor(id, owner) {
                    self.clear_focus();
                }
            }
        }
        if let Some(parent) = self.parent(id) {
            self.invalidate(parent)?;
        }
        let kind = if visible { EventKind::ComponentShown } else { EventKind::ComponentHidden };
        self.notify(Event::new(kind, id));
        Ok(())
    }

    /// Whether the component and all its ancestors are visible.
    pub fn is_showing(&self, id: ComponentId) -> bool {
        self.nodes.get(id).is_some_and(|n| n.visible)
            && self.ancestors(id).iter().all(|&a| self.nodes.get(a).is_some_and(|n| n.visible))
    }

    // ── Listeners ────────────────────────────────────────────────────

    /// Register a listener. Returns `Ok(false)` if it was already registered.
    pub fn add_listener<L: ListenerSlot + ?Sized>(&mut self, id: ComponentId, listener: Arc<L>) -> Result<bool> {
        self.check_thread();
        Ok(self.node_mut(id)?.listeners.add(listener))
    }

    /// Unregister a listener. Returns `Ok(false)` if it was never registered.
    pub fn remove_listener<L: ListenerSlot + ?Sized>(&mut self, id: ComponentId, listener: &Arc<L>) -> Result<bool> {
        self.check_thread();
        Ok(self.node_mut(id)?.listeners.remove(listener))
    }

    // ── Geometry ─────────────────────────────────────────────────────

    /// Bounds relative to the parent; [`Region::EMPTY`] for unknown ids.
    pub fn bounds(&self, id: ComponentId) -> Region {
        self.nodes.get(id).map(ComponentData::bounds).unwrap_or(Region::EMPTY)
    }

    /// Move and resize. A size change invalidates the component; any change
    /// invalidates a valid parent.
    pub fn set_bounds(&mut self, id: ComponentId, bounds: Region) -> Result<()> {
        self.check_thread();
        if bounds.size().is_negative() {
            return Err(ToolkitError::NegativeSize(bounds.size()));
        }
        let node = self.node_mut(id)?;
        let old = node.bounds;
        if old == bounds {
            return Ok(());
        }
        node.bounds = bounds;
        if let Some(peer) = node.peer.as_mut() {
            peer.set_bounds(bounds);
        }

        let resized = old.size() != bounds.size();
        let moved = old.offset() != bounds.offset();
        if resized {
            self.invalidate(id)?;
            self.notify(Event::new(EventKind::ComponentResized, id));
        }
        if moved {
            self.notify(Event::new(EventKind::ComponentMoved, id));
        }
        if let Some(parent) = self.parent(id) {
            self.invalidate_if_valid(parent)?;
        }
        Ok(())
    }

    /// Move, keeping the size.
    pub fn set_location(&mut self, id: ComponentId, location: Offset) -> Result<()> {
        let size = self.node(id)?.bounds.size();
        self.set_bounds(id, Region::from_parts(location, size))
    }

    /// Resize, keeping the location.
    pub fn set_size(&mut self, id: ComponentId, size: Size) -> Result<()> {
        let origin = self.node(id)?.bounds.offset();
        self.set_bounds(id, Region::from_parts(origin, size))
    }

    /// Origin of `id` in its top-level component's coordinate space.
    pub fn location_in_top_level(&self, id: ComponentId) -> Offset {
        let mut origin = Offset::ZERO;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            origin = origin + self.bounds(current).offset();
            current = parent;
        }
        origin
    }

    /// Origin of `id` in native (screen) coordinates: its own offset plus
    /// the offsets of every ancestor, top-level included.
    pub fn location_on_screen(&self, id: ComponentId) -> Offset {
        self.location_in_top_level(id) + self.bounds(self.top_level_of(id)).offset()
    }

    /// The top-level component above `id` (or `id` itself).
    pub fn top_level_of(&self, id: ComponentId) -> ComponentId {
        self.ancestors(id).last().copied().unwrap_or(id)
    }

    /// The deepest showing component under the native point (x, y).
    /// Top-level components are tested most recent first.
    pub fn component_at(&self, x: i32, y: i32) -> Option<ComponentId> {
        for &top in self.top_levels.iter().rev() {
            let Some(node) = self.nodes.get(top) else { continue };
            if !node.visible || !node.bounds.contains(x, y) {
                continue;
            }
            return Some(self.deepest_at(top, x.saturating_sub(node.bounds.x), y.saturating_sub(node.bounds.y)));
        }
        None
    }

    fn deepest_at(&self, container: ComponentId, x: i32, y: i32) -> ComponentId {
        for &child in self.children(container) {
            let Some(node) = self.nodes.get(child) else { continue };
            if node.visible && node.bounds.contains(x, y) {
                return self.deepest_at(child, x.saturating_sub(node.bounds.x), y.saturating_sub(node.bounds.y));
            }
        }
        container
    }

    // ── Sizes ────────────────────────────────────────────────────────

    /// Fix (or with `None`, release) the preferred size.
    pub fn set_preferred_size(&mut self, id: ComponentId, size: Option<Size>) -> Result<()> {
        self.set_size_slot(id, size, |n| &mut n.preferred)
    }

    /// Fix (or with `None`, release) the minimum size.
    pub fn set_minimum_size(&mut self, id: ComponentId, size: Option<Size>) -> Result<()> {
        self.set_size_slot(id, size, |n| &mut n.minimum)
    }

    /// Fix (or with `None`, release) the maximum size.
    pub fn set_maximum_size(&mut self, id: ComponentId, size: Option<Size>) -> Result<()> {
        self.set_size_slot(id, size, |n| &mut n.maximum)
    }

    fn set_size_slot(
        &mut self,
        id: ComponentId,
        size: Option<Size>,
        slot: impl FnOnce(&mut ComponentData) -> &mut super::node::SizeSlot,
    ) -> Result<()> {
        self.check_thread();
        if let Some(s) = size {
            if s.is_negative() {
                return Err(ToolkitError::NegativeSize(s));
            }
        }
        let slot = slot(self.node_mut(id)?);
        slot.explicit = size;
        slot.cached = None;
        self.invalidate(id)
    }

    /// The size the native peer or the current bounds suggest.
    fn intrinsic_size(&self, id: ComponentId) -> Size {
        match self.nodes.get(id) {
            Some(node) => match node.peer.as_ref() {
                Some(peer) => peer.measured_size(),
                None => node.bounds.size(),
            },
            None => Size::ZERO,
        }
    }

    /// Preferred size: explicit, else cached, else computed by the layout
    /// (containers) or the peer/current size (everything else).
    pub fn preferred_size(&mut self, id: ComponentId) -> Size {
        let Some(node) = self.nodes.get(id) else { return Size::ZERO };
        if let Some(size) = node.preferred.get() {
            return size;
        }
        let size = self
            .with_layout(id, |layout, tree| layout.preferred_layout_size(tree, id))
            .unwrap_or_else(|| self.intrinsic_size(id));
        if let Some(node) = self.nodes.get_mut(id) {
            node.preferred.cached = Some(size);
        }
        size
    }

    /// Minimum size, resolved like [`preferred_size`](Self::preferred_size).
    pub fn minimum_size(&mut self, id: ComponentId) -> Size {
        let Some(node) = self.nodes.get(id) else { return Size::ZERO };
        if let Some(size) = node.minimum.get() {
            return size;
        }
        let size = self
            .with_layout(id, |layout, tree| layout.minimum_layout_size(tree, id))
            .unwrap_or_else(|| self.intrinsic_size(id));
        if let Some(node) = self.nodes.get_mut(id) {
            node.minimum.cached = Some(size);
        }
        size
    }

    /// Maximum size; unbounded ([`Size::MAX`]) unless fixed or limited by
    /// the layout.
    pub fn maximum_size(&mut self, id: ComponentId) -> Size {
        let Some(node) = self.nodes.get(id) else { return Size::ZERO };
        if let Some(size) = node.maximum.get() {
            return size;
        }
        let size = self
            .with_layout(id, |layout, tree| layout.maximum_layout_size(tree, id))
            .unwrap_or(Size::MAX);
        if let Some(node) = self.nodes.get_mut(id) {
            node.maximum.cached = Some(size);
        }
        size
    }

    // ── Generated events ─────────────────────────────────────────────

    /// Queue an event generated by a tree mutation. Component and container
    /// events are only generated for components with a matching listener.
    pub(super) fn notify(&mut self, event: Event) {
        let wanted = match (event.kind().listener_kind(), event.target()) {
            (Some(kind), Some(target)) if !matches!(kind, crate::event::ListenerKind::Focus) => {
                self.nodes.get(target).is_some_and(|n| n.listeners.has(kind))
            }
            _ => true,
        };
        if wanted {
            self.outbox.push(event);
        }
    }

    /// Request a redraw of `area` (or all) of `id`.
    pub fn repaint(&mut self, id: ComponentId, area: Option<Region>) -> Result<()> {
        self.node(id)?;
        self.outbox.push(Event::paint(id, area));
        Ok(())
    }

    /// Drain events generated by mutations since the last call.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbox)
    }

    /// Whether mutations have generated events not yet taken.
    pub fn has_pending_events(&self) -> bool {
        !self.outbox.is_empty()
    }
}

impl Default for ComponentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ComponentTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentTree")
            .field("components", &self.nodes.len())
            .field("top_levels", &self.top_levels)
            .field("focus_owner", &self.focus_owner)
            .field("pending_events", &self.outbox.len())
            .finish()
    }
}
