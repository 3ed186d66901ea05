//! The dispatch-thread context.
//!
//! A [`Ui`] exists only on the thread that dispatches events. It owns the
//! component tree; listeners reach the tree through short borrows, and any
//! events a tree mutation generates are posted to the active queue as soon
//! as the borrow ends.

use std::any::Any;
use std::cell::{Cell, Ref, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::thread;
use std::time::Instant;

use crate::component::{ComponentId, ComponentTree};
use crate::event::{Event, EventKind, Payload, Source};
use crate::toolkit::Toolkit;

use super::filter::{EventFilter, FilterAction};

thread_local! {
    static CURRENT: RefCell<Option<Ui>> = const { RefCell::new(None) };
}

/// One active filter and the events it has set aside.
pub(super) struct FilterFrame {
    pub(super) id: u64,
    pub(super) filter: Box<dyn EventFilter>,
    pub(super) deferred: Vec<Event>,
}

/// Pointer bookkeeping for click synthesis, drag capture and enter/exit.
#[derive(Debug, Default)]
struct MouseState {
    pressed_on: Option<ComponentId>,
    hover: Option<ComponentId>,
}

pub(super) struct UiInner {
    pub(super) toolkit: Toolkit,
    tree: RefCell<ComponentTree>,
    pub(super) filters: RefCell<Vec<FilterFrame>>,
    pub(super) next_filter_id: Cell<u64>,
    pub(super) depth: Cell<usize>,
    mouse: RefCell<MouseState>,
}

/// Dispatch-thread handle: the component tree plus the pumps.
///
/// `Ui` is deliberately `!Send`; off-thread code reaches it through
/// [`Toolkit::invoke_later`] and [`Toolkit::invoke_and_wait`].
#[derive(Clone)]
pub struct Ui {
    pub(super) inner: Rc<UiInner>,
}

impl Ui {
    /// Bind `tree` to the current thread and make this thread's dispatch
    /// context.
    pub(crate) fn new(toolkit: Toolkit, mut tree: ComponentTree) -> Ui {
        tree.bind_owner(thread::current().id());
        let ui = Ui {
            inner: Rc::new(UiInner {
                toolkit,
                tree: RefCell::new(tree),
                filters: RefCell::new(Vec::new()),
                next_filter_id: Cell::new(0),
                depth: Cell::new(0),
                mouse: RefCell::new(MouseState::default()),
            }),
        };
        CURRENT.with(|current| *current.borrow_mut() = Some(ui.clone()));
        ui.flush();
        ui
    }

    /// The dispatch context of the current thread, if it is a dispatch thread.
    pub fn current() -> Option<Ui> {
        CURRENT.with(|current| current.borrow().clone())
    }

    /// Forget the current thread's dispatch context.
    pub(crate) fn release_current() {
        CURRENT.with(|current| current.borrow_mut().take());
    }

    /// The toolkit this context dispatches for.
    pub fn toolkit(&self) -> &Toolkit {
        &self.inner.toolkit
    }

    /// Shared borrow of the tree. Do not hold it across a call that mutates.
    pub fn tree(&self) -> Ref<'_, ComponentTree> {
        self.inner.tree.borrow()
    }

    /// Mutate the tree, then post whatever events the mutation generated.
    pub fn with_tree<R>(&self, f: impl FnOnce(&mut ComponentTree) -> R) -> R {
        let result = f(&mut self.inner.tree.borrow_mut());
        self.flush();
        result
    }

    /// Post events generated by tree mutations to the active queue.
    pub fn flush(&self) {
        let events = self.inner.tree.borrow_mut().take_events();
        if events.is_empty() {
            return;
        }
        let queue = self.inner.toolkit.event_queue();
        for event in events {
            queue.post_event(event);
        }
    }

    /// Current nesting depth of event pumps (0 outside any pump).
    pub fn pump_depth(&self) -> usize {
        self.inner.depth.get()
    }

    // ── Delivery ─────────────────────────────────────────────────────

    /// Deliver one event now, on this thread.
    ///
    /// A panic raised by a listener or an invocation is caught and logged;
    /// delivery of later events is unaffected.
    pub fn dispatch_event(&self, event: Event) {
        let started = Instant::now();
        let summary = event.summary();
        tracing::trace!(
            kind = ?summary.kind,
            serial = summary.serial,
            waited = ?started.saturating_duration_since(event.posted_at()),
            "dispatching"
        );
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.deliver(event)));
        if let Err(payload) = outcome {
            tracing::error!(
                kind = ?summary.kind,
                source = ?summary.source,
                panic = %panic_message(&*payload),
                "panic during event dispatch"
            );
        }
        self.flush();

        if let Some(threshold) = self.inner.toolkit.config().slow_dispatch {
            let elapsed = started.elapsed();
            if elapsed > threshold {
                tracing::warn!(kind = ?summary.kind, ?elapsed, "slow event dispatch");
            }
        }
    }

    fn deliver(&self, mut event: Event) {
        if let Some(invocation) = event.take_invocation() {
            invocation.run(self);
            return;
        }
        if !self.resolve_target(&mut event) {
            return;
        }
        let Some(target) = event.target() else { return };

        if matches!(event.kind(), EventKind::MouseMoved | EventKind::MouseDragged) {
            self.track_hover(target, &event);
        }

        self.notify_listeners(target, &mut event);
        if !event.is_consumed() {
            self.default_action(target, &event);
        }
    }

    fn notify_listeners(&self, target: ComponentId, event: &mut Event) {
        let delivery = match self.tree().get(target) {
            Some(node) => node.listeners().delivery_for(event.kind()),
            None => return,
        };
        if !delivery.is_empty() {
            tracing::trace!(kind = ?event.kind(), ?target, listeners = delivery.len(), "deliver");
            delivery.deliver(self, event);
        }
    }

    fn default_action(&self, target: ComponentId, event: &Event) {
        match (event.kind(), event.payload()) {
            (EventKind::FocusGained, _) => self.with_tree(|tree| {
                if let Some(peer) = tree.peer_mut(target) {
                    if !peer.is_focused() {
                        peer.request_focus();
                    }
                }
            }),
            (EventKind::Paint, Payload::Paint(area)) => {
                let area = *area;
                self.with_tree(|tree| {
                    if let Some(peer) = tree.peer_mut(target) {
                        peer.invalidate_for_redraw(area);
                    }
                })
            }
            (EventKind::MousePressed, _) => {
                let focusable = self.tree().can_focus(target);
                if focusable {
                    if let Err(err) = self.with_tree(|tree| tree.request_focus(target)) {
                        tracing::debug!(%err, ?target, "focus on press not granted");
                    }
                }
                self.inner.mouse.borrow_mut().pressed_on = Some(target);
            }
            (EventKind::MouseReleased, _) => {
                let pressed_on = self.inner.mouse.borrow_mut().pressed_on.take();
                if pressed_on == Some(target) {
                    if let Some(data) = event.mouse_data() {
                        let click = Event::mouse(EventKind::MouseClicked, target, *data);
                        self.inner.toolkit.post_event(click);
                    }
                }
            }
            _ => {}
        }
    }

    // ── Target resolution ────────────────────────────────────────────

    /// Resolve a native-sourced event to the component it concerns.
    ///
    /// Returns `false` if the event has nowhere to go (or was fully handled
    /// here, as a native resize is).
    pub(super) fn resolve_target(&self, event: &mut Event) -> bool {
        if event.source() != Source::Native || event.kind() == EventKind::Invocation {
            return true;
        }
        let kind = event.kind();
        if kind.is_mouse() {
            return self.resolve_mouse(event);
        }
        if kind.is_key() {
            let owner = self.tree().focus_owner();
            return match owner {
                Some(owner) => {
                    event.retarget(owner);
                    true
                }
                None => {
                    tracing::trace!(?kind, "key event with no focus owner dropped");
                    false
                }
            };
        }
        if let (EventKind::ComponentResized, Payload::Resize(size)) = (kind, event.payload()) {
            let size = *size;
            self.with_tree(|tree| {
                for top in tree.top_levels().to_vec() {
                    if tree.is_showing(top) {
                        if let Err(err) = tree.set_size(top, size).and_then(|_| tree.revalidate(top)) {
                            tracing::warn!(?top, %err, "native resize failed");
                        }
                    }
                }
            });
            return false;
        }
        tracing::trace!(?kind, "untargeted native event dropped");
        false
    }

    fn resolve_mouse(&self, event: &mut Event) -> bool {
        let Some(data) = event.mouse_data() else { return false };
        let (x, y) = (data.x, data.y);
        let captured = match event.kind() {
            EventKind::MouseDragged | EventKind::MouseReleased => self.inner.mouse.borrow().pressed_on,
            _ => None,
        };
        let tree = self.tree();
        let target = captured
            .filter(|&c| tree.contains(c))
            .or_else(|| tree.component_at(x, y));
        let Some(target) = target else { return false };
        let origin = tree.location_on_screen(target);
        drop(tree);

        event.retarget(target);
        if let Some(data) = event.mouse_data_mut() {
            data.x -= origin.x;
            data.y -= origin.y;
        }
        true
    }

    fn track_hover(&self, target: ComponentId, event: &Event) {
        let previous = self.inner.mouse.borrow_mut().hover.replace(target);
        if previous == Some(target) {
            return;
        }
        let Some(data) = event.mouse_data() else { return };
        if let Some(old) = previous.filter(|&c| self.tree().contains(c)) {
            let mut exited = Event::mouse(EventKind::MouseExited, old, *data);
            self.notify_listeners(old, &mut exited);
        }
        let mut entered = Event::mouse(EventKind::MouseEntered, target, *data);
        self.notify_listeners(target, &mut entered);
    }

    // ── Filters ──────────────────────────────────────────────────────

    /// Index of the innermost active filter that rejects `event`.
    pub(super) fn rejecting_filter(&self, event: &Event) -> Option<usize> {
        let filters = self.inner.filters.borrow();
        let tree = self.tree();
        filters
            .iter()
            .rposition(|frame| frame.filter.accept(&tree, event) == FilterAction::Reject)
    }
}

impl std::fmt::Debug for Ui {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ui")
            .field("pump_depth", &self.inner.depth.get())
            .field("filters", &self.inner.filters.borrow().len())
            .finish()
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::event::{
        ActionListener, ContainerListener, FocusListener, Key, KeyListener, MouseData, MouseListener,
    };
    use crate::geometry::{Region, Size};
    use crate::layout::Constraint;
    use crate::testing::{PeerCall, Pilot, RecordingListener, RecordingPeer};

    struct Panicking;
    impl ActionListener for Panicking {
        fn action_performed(&self, _ui: &Ui, _event: &mut Event) {
            panic!("listener failure");
        }
    }

    /// A window at the origin holding one button at (2, 2) sized 5x1.
    fn window() -> (ComponentTree, ComponentId, ComponentId) {
        let mut tree = ComponentTree::new();
        let win = tree.create_validate_root("Window");
        let button = tree.create_component("Button");
        tree.add(win, button, Constraint::None).unwrap();
        tree.set_bounds(win, Region::new(0, 0, 20, 10)).unwrap();
        tree.set_bounds(button, Region::new(2, 2, 5, 1)).unwrap();
        (tree, win, button)
    }

    // ── Invocations ──────────────────────────────────────────────────

    #[test]
    fn invocation_runs_on_dispatch() {
        let (tree, _, _) = window();
        let pilot = Pilot::new(tree).unwrap();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        pilot.toolkit().invoke_later(move |ui| {
            assert!(ui.toolkit().is_dispatch_thread());
            flag.store(true, Ordering::SeqCst);
        });
        pilot.process();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn listener_panic_does_not_stop_dispatch() {
        let (tree, _, button) = window();
        let pilot = Pilot::new(tree).unwrap();
        pilot
            .ui()
            .with_tree(|t| t.add_listener::<dyn ActionListener>(button, Arc::new(Panicking)))
            .unwrap();
        let after = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&after);
        pilot.toolkit().post_event(Event::action(button, "boom"));
        pilot.toolkit().invoke_later(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        pilot.process();
        assert_eq!(after.load(Ordering::SeqCst), 1);
    }

    // ── Listener delivery ────────────────────────────────────────────

    #[test]
    fn listeners_run_in_registration_order() {
        let (tree, _, button) = window();
        let pilot = Pilot::new(tree).unwrap();
        let first = Arc::new(RecordingListener::named("first"));
        let second = Arc::new(RecordingListener::sharing("second", &first.log()));
        pilot.ui().with_tree(|t| {
            t.add_listener::<dyn ActionListener>(button, first.clone()).unwrap();
            t.add_listener::<dyn ActionListener>(button, second.clone()).unwrap();
        });
        pilot.toolkit().post_event(Event::action(button, "go"));
        pilot.process();

        let names: Vec<_> = first.delivered().into_iter().map(|d| d.listener).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn delivery_is_by_kind() {
        let (tree, _, button) = window();
        let pilot = Pilot::new(tree).unwrap();
        let keys = Arc::new(RecordingListener::named("keys"));
        let actions = Arc::new(RecordingListener::named("actions"));
        pilot.ui().with_tree(|t| {
            t.add_listener::<dyn KeyListener>(button, keys.clone()).unwrap();
            t.add_listener::<dyn ActionListener>(button, actions.clone()).unwrap();
        });
        pilot
            .toolkit()
            .post_event(Event::key(EventKind::KeyTyped, button, Key::Char('x'), Default::default()));
        pilot.process();
        assert_eq!(keys.kinds(), vec![EventKind::KeyTyped]);
        assert!(actions.kinds().is_empty());
    }

    #[test]
    fn tree_changes_reach_container_listeners() {
        let (tree, win, _) = window();
        let pilot = Pilot::new(tree).unwrap();
        let listener = Arc::new(RecordingListener::default());
        let label = pilot.ui().with_tree(|t| {
            t.add_listener::<dyn ContainerListener>(win, listener.clone()).unwrap();
            let label = t.create_component("Label");
            t.add(win, label, Constraint::None).unwrap();
            label
        });
        pilot.process();
        let delivered = listener.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].kind, EventKind::ComponentAdded);
        assert_eq!(delivered[0].target, Some(win));
        assert!(pilot.ui().tree().contains(label));
    }

    // ── Native input ─────────────────────────────────────────────────

    #[test]
    fn click_is_hit_tested_and_synthesized() {
        let (tree, _, button) = window();
        let pilot = Pilot::new(tree).unwrap();
        let listener = Arc::new(RecordingListener::default());
        pilot
            .ui()
            .with_tree(|t| t.add_listener::<dyn MouseListener>(button, listener.clone()))
            .unwrap();

        pilot.click(3, 2);
        pilot.process();

        assert_eq!(
            listener.kinds(),
            vec![EventKind::MousePressed, EventKind::MouseReleased, EventKind::MouseClicked]
        );
        assert!(listener.delivered().iter().all(|d| d.target == Some(button)));
    }

    #[test]
    fn press_focuses_focusable_target() {
        let (tree, _, button) = window();
        let pilot = Pilot::new(tree).unwrap();
        pilot.ui().with_tree(|t| t.set_focusable(button, true)).unwrap();

        pilot.click(3, 2);
        pilot.process();
        assert_eq!(pilot.ui().tree().focus_owner(), Some(button));
    }

    #[test]
    fn mouse_coordinates_become_component_relative() {
        let (tree, _, button) = window();
        let pilot = Pilot::new(tree).unwrap();
        let seen = Arc::new(parking_lot::Mutex::new(None));

        struct Capture(Arc<parking_lot::Mutex<Option<(i32, i32)>>>);
        impl MouseListener for Capture {
            fn mouse_pressed(&self, _ui: &Ui, event: &mut Event) {
                if let Some(data) = event.mouse_data() {
                    *self.0.lock() = Some((data.x, data.y));
                }
            }
        }
        pilot
            .ui()
            .with_tree(|t| t.add_listener::<dyn MouseListener>(button, Arc::new(Capture(seen.clone()))))
            .unwrap();

        pilot.toolkit().post_event(Event::mouse(
            EventKind::MousePressed,
            Source::Native,
            MouseData::at(4, 2),
        ));
        pilot.process();
        assert_eq!(*seen.lock(), Some((2, 0)));
    }

    #[test]
    fn keys_go_to_focus_owner() {
        let (tree, _, button) = window();
        let pilot = Pilot::new(tree).unwrap();
        let keys = Arc::new(RecordingListener::named("keys"));
        pilot.ui().with_tree(|t| {
            t.set_focusable(button, true).unwrap();
            t.add_listener::<dyn KeyListener>(button, keys.clone()).unwrap();
        });

        pilot.press_key(Key::Enter);
        pilot.process();
        assert!(keys.kinds().is_empty());

        pilot.ui().with_tree(|t| t.request_focus(button)).unwrap();
        pilot.press_key(Key::Enter);
        pilot.process();
        assert_eq!(keys.kinds(), vec![EventKind::KeyPressed, EventKind::KeyReleased]);
    }

    #[test]
    fn focus_gained_asks_peer_unless_consumed() {
        let (tree, _, button) = window();
        let pilot = Pilot::new(tree).unwrap();
        let peer = RecordingPeer::new(Size::new(5, 1));
        let calls = peer.calls();
        let focus = Arc::new(RecordingListener::default());
        pilot.ui().with_tree(|t| {
            t.set_peer(button, Box::new(peer)).unwrap();
            t.set_focusable(button, true).unwrap();
            t.add_listener::<dyn FocusListener>(button, focus.clone()).unwrap();
            t.request_focus(button).unwrap();
        });
        pilot.process();
        assert_eq!(focus.kinds(), vec![EventKind::FocusGained]);
        assert!(calls.lock().contains(&PeerCall::RequestFocus));
    }

    #[test]
    fn focused_peer_is_not_asked_again() {
        let (tree, _, button) = window();
        let pilot = Pilot::new(tree).unwrap();
        let peer = RecordingPeer::new(Size::new(5, 1));
        let calls = peer.calls();
        pilot.ui().with_tree(|t| {
            t.set_peer(button, Box::new(peer)).unwrap();
            t.set_focusable(button, true).unwrap();
            t.request_focus(button).unwrap();
        });
        pilot.process();
        pilot.toolkit().post_event(Event::focus(EventKind::FocusGained, button, None));
        pilot.process();

        let asked = calls.lock().iter().filter(|c| **c == PeerCall::RequestFocus).count();
        assert_eq!(asked, 1);
    }

    #[test]
    fn consumed_focus_event_skips_peer() {
        let (tree, _, button) = window();
        let pilot = Pilot::new(tree).unwrap();
        let peer = RecordingPeer::new(Size::new(5, 1));
        let calls = peer.calls();
        let consumer = Arc::new(RecordingListener::default().consuming());
        pilot.ui().with_tree(|t| {
            t.set_peer(button, Box::new(peer)).unwrap();
            t.set_focusable(button, true).unwrap();
            t.add_listener::<dyn FocusListener>(button, consumer.clone()).unwrap();
            t.request_focus(button).unwrap();
        });
        pilot.process();
        assert!(!calls.lock().contains(&PeerCall::RequestFocus));
    }

    #[test]
    fn paint_reaches_peer() {
        let (tree, _, button) = window();
        let pilot = Pilot::new(tree).unwrap();
        let peer = RecordingPeer::new(Size::new(5, 1));
        let calls = peer.calls();
        pilot.ui().with_tree(|t| {
            t.set_peer(button, Box::new(peer)).unwrap();
            t.repaint(button, Some(Region::new(0, 0, 1, 1))).unwrap();
        });
        pilot.process();
        assert!(calls
            .lock()
            .contains(&PeerCall::InvalidateForRedraw(Some(Region::new(0, 0, 1, 1)))));
    }

    #[test]
    fn native_resize_resizes_and_revalidates_top_levels() {
        let (tree, win, _) = window();
        let pilot = Pilot::new(tree).unwrap();
        pilot.resize(60, 30);
        pilot.process();
        let tree = pilot.ui().tree();
        assert_eq!(tree.bounds(win).size(), Size::new(60, 30));
        assert!(tree.is_valid(win));
    }
}
