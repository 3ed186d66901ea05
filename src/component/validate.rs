//! The invalidate-upward / validate-downward protocol.
//!
//! `invalidate` marks a component invalid and climbs through valid ancestors
//! until it reaches a validate root or a component without a parent.
//! `validate` then lays out a subtree top-down, children in list order.

use super::node::ComponentId;
use super::tree::ComponentTree;
use crate::error::Result;
use crate::layout::LayoutManager;

impl ComponentTree {
    /// Mark `id` invalid, drop its computed sizes and propagate to the
    /// parent if the parent is still valid.
    pub fn invalidate(&mut self, id: ComponentId) -> Result<()> {
        self.check_thread();
        let mut current = id;
        loop {
            let node = self.node_mut(current)?;
            node.mark_invalid();
            let stop_here = node.is_validate_root();
            if let Some(part) = node.container.as_mut() {
                if let Some(layout) = part.layout.as_mut() {
                    layout.invalidate_layout(current);
                }
            }
            if stop_here {
                return Ok(());
            }
            match self.parent(current) {
                Some(parent) if self.get(parent).is_some_and(|p| p.valid) => current = parent,
                _ => return Ok(()),
            }
        }
    }

    /// Invalidate `id` only if it is currently valid.
    pub(crate) fn invalidate_if_valid(&mut self, id: ComponentId) -> Result<()> {
        if self.node(id)?.valid {
            self.invalidate(id)?;
        }
        Ok(())
    }

    /// Whether the cached layout of `id` is authoritative.
    pub fn is_valid(&self, id: ComponentId) -> bool {
        self.get(id).is_some_and(|n| n.valid)
    }

    /// Whether upward invalidation stops at `id`.
    pub fn is_validate_root(&self, id: ComponentId) -> bool {
        self.get(id).is_some_and(|n| n.is_validate_root())
    }

    /// Number of `validate` calls that performed layout work.
    pub fn validate_passes(&self) -> u64 {
        self.validate_passes
    }

    /// Lay out `id` and everything below it. A no-op if already valid.
    pub fn validate(&mut self, id: ComponentId) -> Result<()> {
        self.check_thread();
        let node = self.node(id)?;
        if node.valid {
            return Ok(());
        }
        let is_container = node.is_container();
        self.validate_passes += 1;
        tracing::trace!(?id, pass = self.validate_passes, "validate");
        if is_container {
            self.validate_tree(id)
        } else {
            self.mark_valid(id)
        }
    }

    /// Top-down pass over a container: lay out, recurse into invalid
    /// children in list order, then mark valid.
    pub fn validate_tree(&mut self, id: ComponentId) -> Result<()> {
        self.check_thread();
        if !self.node(id)?.valid {
            self.do_layout(id)?;
            let kids = self.children(id).to_vec();
            for child in kids {
                let node = self.node(child)?;
                if node.valid {
                    continue;
                }
                if node.is_container() {
                    self.validate_tree(child)?;
                } else {
                    self.mark_valid(child)?;
                }
            }
        }
        self.mark_valid(id)
    }

    /// Run the container's layout strategy, if any.
    ///
    /// A container with no children and no peer has nothing to lay out.
    pub fn do_layout(&mut self, id: ComponentId) -> Result<()> {
        let node = self.node(id)?;
        if self.children(id).is_empty() && !node.has_peer() {
            return Ok(());
        }
        self.with_layout(id, |layout, tree| layout.layout_container(tree, id))
            .unwrap_or(Ok(()))
    }

    /// Invalidate `id`, then validate from the nearest validate root above
    /// it (or from the top of its tree).
    pub fn revalidate(&mut self, id: ComponentId) -> Result<()> {
        self.invalidate(id)?;
        let mut root = id;
        if let Some(parent) = self.parent(id) {
            root = parent;
            while !self.is_validate_root(root) {
                match self.parent(root) {
                    Some(p) => root = p,
                    None => break,
                }
            }
        }
        tracing::trace!(?id, ?root, "revalidate");
        self.validate(root)
    }

    fn mark_valid(&mut self, id: ComponentId) -> Result<()> {
        let node = self.node_mut(id)?;
        node.valid = true;
        if let Some(peer) = node.peer.as_mut() {
            peer.request_layout();
        }
        Ok(())
    }

    /// Run `f` with the container's layout temporarily taken out of the
    /// tree, so the layout can query and move the children.
    ///
    /// Returns `None` if `id` has no layout (or the layout is already in
    /// use further up the stack).
    pub(crate) fn with_layout<R>(
        &mut self,
        id: ComponentId,
        f: impl FnOnce(&mut dyn LayoutManager, &mut ComponentTree) -> R,
    ) -> Option<R> {
        let mut layout = self.nodes.get_mut(id)?.container.as_mut()?.layout.take()?;
        let result = f(layout.as_mut(), self);
        if let Some(part) = self.nodes.get_mut(id).and_then(|n| n.container.as_mut()) {
            if part.layout.is_none() {
                part.layout = Some(layout);
            }
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Insets, Region, Size};
    use crate::layout::{Constraint, StackLayout};
    use crate::testing::{PeerCall, RecordingPeer};

    // ── Helpers ──────────────────────────────────────────────────────

    fn chain() -> (ComponentTree, ComponentId, ComponentId, ComponentId) {
        let mut tree = ComponentTree::new();
        let a = tree.create_validate_root("A");
        let b = tree.create_container("B");
        let c = tree.create_component("C");
        tree.add(a, b, Constraint::None).unwrap();
        tree.add(b, c, Constraint::None).unwrap();
        tree.validate(a).unwrap();
        (tree, a, b, c)
    }

    // ── Invalidate ───────────────────────────────────────────────────

    #[test]
    fn components_start_invalid() {
        let mut tree = ComponentTree::new();
        let c = tree.create_component("C");
        assert!(!tree.is_valid(c));
    }

    #[test]
    fn invalidate_climbs_to_root() {
        let (mut tree, a, b, c) = chain();
        assert!(tree.is_valid(a) && tree.is_valid(b) && tree.is_valid(c));
        tree.invalidate(c).unwrap();
        assert!(!tree.is_valid(c));
        assert!(!tree.is_valid(b));
        assert!(!tree.is_valid(a));
    }

    #[test]
    fn invalidate_stops_at_validate_root() {
        let mut tree = ComponentTree::new();
        let outer = tree.create_container("outer");
        let root = tree.create_validate_root("root");
        let leaf = tree.create_component("leaf");
        tree.add(outer, root, Constraint::None).unwrap();
        tree.add(root, leaf, Constraint::None).unwrap();
        tree.validate(outer).unwrap();

        tree.invalidate(leaf).unwrap();
        assert!(!tree.is_valid(root));
        assert!(tree.is_valid(outer));
    }

    #[test]
    fn invalidate_clears_computed_but_not_explicit_sizes() {
        let mut tree = ComponentTree::new();
        let c = tree.create_component("C");
        tree.set_bounds(c, Region::new(0, 0, 4, 2)).unwrap();
        tree.set_preferred_size(c, Some(Size::new(30, 3))).unwrap();
        assert_eq!(tree.minimum_size(c), Size::new(4, 2));

        tree.set_bounds(c, Region::new(0, 0, 8, 2)).unwrap();
        assert_eq!(tree.minimum_size(c), Size::new(8, 2));
        assert_eq!(tree.preferred_size(c), Size::new(30, 3));

        tree.set_preferred_size(c, None).unwrap();
        assert_eq!(tree.preferred_size(c), Size::new(8, 2));
    }

    // ── Validate ─────────────────────────────────────────────────────

    #[test]
    fn validate_is_idempotent() {
        let (mut tree, a, _, c) = chain();
        tree.invalidate(c).unwrap();
        let before = tree.validate_passes();
        tree.validate(a).unwrap();
        tree.validate(a).unwrap();
        assert_eq!(tree.validate_passes(), before + 1);
    }

    #[test]
    fn revalidate_runs_one_pass_from_root() {
        let (mut tree, a, b, c) = chain();
        let before = tree.validate_passes();
        tree.revalidate(c).unwrap();
        assert_eq!(tree.validate_passes(), before + 1);
        assert!(tree.is_valid(a) && tree.is_valid(b) && tree.is_valid(c));
    }

    #[test]
    fn revalidate_detached_component_validates_itself() {
        let mut tree = ComponentTree::new();
        let c = tree.create_component("C");
        tree.revalidate(c).unwrap();
        assert!(tree.is_valid(c));
    }

    #[test]
    fn validate_asks_peers_to_relayout() {
        let mut tree = ComponentTree::new();
        let a = tree.create_validate_root("A");
        let x = tree.create_component("X");
        let peer = RecordingPeer::new(Size::new(5, 1));
        let calls = peer.calls();
        tree.set_peer(x, Box::new(peer)).unwrap();
        tree.add(a, x, Constraint::None).unwrap();
        tree.validate(a).unwrap();
        assert!(calls.lock().contains(&PeerCall::RequestLayout));
    }

    #[test]
    fn stacked_children_follow_insets_and_gap() {
        let mut tree = ComponentTree::new();
        let a = tree.create_validate_root("A");
        let x = tree.create_component("X");
        let y = tree.create_component("Y");
        tree.set_insets(a, Insets::new(10, 0, 0, 10)).unwrap();
        tree.set_layout(a, Some(Box::new(StackLayout::vertical().with_gap(5)))).unwrap();
        tree.add(a, x, Constraint::None).unwrap();
        tree.add(a, y, Constraint::None).unwrap();
        tree.set_bounds(a, Region::new(0, 0, 80, 80)).unwrap();
        tree.set_bounds(x, Region::new(10, 10, 50, 20)).unwrap();
        tree.set_bounds(y, Region::new(10, 40, 50, 20)).unwrap();

        tree.invalidate(a).unwrap();
        tree.validate(a).unwrap();

        assert_eq!(tree.bounds(x).y, 10);
        assert_eq!(tree.bounds(y).y, 35);
        assert!(tree.is_valid(a));
        assert!(tree.is_valid(x));
        assert!(tree.is_valid(y));
    }

    #[test]
    fn empty_container_skips_layout() {
        let mut tree = ComponentTree::new();
        let a = tree.create_container("A");
        tree.set_layout(a, Some(Box::new(StackLayout::vertical()))).unwrap();
        tree.validate(a).unwrap();
        assert!(tree.is_valid(a));
    }
}
