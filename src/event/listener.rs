//! Listener traits and per-component typed registries.
//!
//! Each [`ListenerKind`] has its own trait with one callback per sub-kind, all
//! defaulting to no-ops so implementors override only what they need. A
//! component's [`Listeners`] keeps one ordered registry per kind; registration
//! order is delivery order. Delivery is a kind switch: an event reaches only
//! the listeners of its own kind.

use std::sync::Arc;

use super::kind::{EventKind, ListenerKind};
use super::record::Event;
use crate::dispatch::Ui;

// ---------------------------------------------------------------------------
// Listener traits
// ---------------------------------------------------------------------------

/// Geometry and visibility changes.
pub trait ComponentListener: Send + Sync {
    fn component_moved(&self, _ui: &Ui, _event: &mut Event) {}
    fn component_resized(&self, _ui: &Ui, _event: &mut Event) {}
    fn component_shown(&self, _ui: &Ui, _event: &mut Event) {}
    fn component_hidden(&self, _ui: &Ui, _event: &mut Event) {}
}

/// Children added to or removed from a container.
pub trait ContainerListener: Send + Sync {
    fn component_added(&self, _ui: &Ui, _event: &mut Event) {}
    fn component_removed(&self, _ui: &Ui, _event: &mut Event) {}
}

/// Keyboard focus transfer.
pub trait FocusListener: Send + Sync {
    fn focus_gained(&self, _ui: &Ui, _event: &mut Event) {}
    fn focus_lost(&self, _ui: &Ui, _event: &mut Event) {}
}

/// Keyboard input.
pub trait KeyListener: Send + Sync {
    fn key_typed(&self, _ui: &Ui, _event: &mut Event) {}
    fn key_pressed(&self, _ui: &Ui, _event: &mut Event) {}
    fn key_released(&self, _ui: &Ui, _event: &mut Event) {}
}

/// Pointer buttons and crossing.
pub trait MouseListener: Send + Sync {
    fn mouse_clicked(&self, _ui: &Ui, _event: &mut Event) {}
    fn mouse_pressed(&self, _ui: &Ui, _event: &mut Event) {}
    fn mouse_released(&self, _ui: &Ui, _event: &mut Event) {}
    fn mouse_entered(&self, _ui: &Ui, _event: &mut Event) {}
    fn mouse_exited(&self, _ui: &Ui, _event: &mut Event) {}
}

/// Pointer motion.
pub trait MouseMotionListener: Send + Sync {
    fn mouse_moved(&self, _ui: &Ui, _event: &mut Event) {}
    fn mouse_dragged(&self, _ui: &Ui, _event: &mut Event) {}
}

/// Wheel rotation.
pub trait MouseWheelListener: Send + Sync {
    fn mouse_wheel_moved(&self, ui: &Ui, event: &mut Event);
}

/// Semantic "activate" events.
pub trait ActionListener: Send + Sync {
    fn action_performed(&self, ui: &Ui, event: &mut Event);
}

// ---------------------------------------------------------------------------
// Registries
// ---------------------------------------------------------------------------

/// All listener registries of one component.
#[derive(Default, Clone)]
pub struct Listeners {
    component: Vec<Arc<dyn ComponentListener>>,
    container: Vec<Arc<dyn ContainerListener>>,
    focus: Vec<Arc<dyn FocusListener>>,
    key: Vec<Arc<dyn KeyListener>>,
    mouse: Vec<Arc<dyn MouseListener>>,
    mouse_motion: Vec<Arc<dyn MouseMotionListener>>,
    mouse_wheel: Vec<Arc<dyn MouseWheelListener>>,
    action: Vec<Arc<dyn ActionListener>>,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("component", &self.component.len())
            .field("container", &self.container.len())
            .field("focus", &self.focus.len())
            .field("key", &self.key.len())
            .field("mouse", &self.mouse.len())
            .field("mouse_motion", &self.mouse_motion.len())
            .field("mouse_wheel", &self.mouse_wheel.len())
            .field("action", &self.action.len())
            .finish()
    }
}

/// Maps a listener trait object type to its registry.
///
/// Implemented for each `dyn …Listener` type, so registration is written as
/// `listeners.add::<dyn MouseListener>(Arc::new(handler))`.
pub trait ListenerSlot: Send + Sync + 'static {
    const KIND: ListenerKind;
    fn slot(listeners: &Listeners) -> &Vec<Arc<Self>>;
    fn slot_mut(listeners: &mut Listeners) -> &mut Vec<Arc<Self>>;
}

macro_rules! listener_slot {
    ($trait:ident, $field:ident, $kind:ident) => {
        impl ListenerSlot for dyn $trait {
            const KIND: ListenerKind = ListenerKind::$kind;
            fn slot(listeners: &Listeners) -> &Vec<Arc<Self>> {
                &listeners.$field
            }
            fn slot_mut(listeners: &mut Listeners) -> &mut Vec<Arc<Self>> {
                &mut listeners.$field
            }
        }
    };
}

listener_slot!(ComponentListener, component, Component);
listener_slot!(ContainerListener, container, Container);
listener_slot!(FocusListener, focus, Focus);
listener_slot!(KeyListener, key, Key);
listener_slot!(MouseListener, mouse, Mouse);
listener_slot!(MouseMotionListener, mouse_motion, MouseMotion);
listener_slot!(MouseWheelListener, mouse_wheel, MouseWheel);
listener_slot!(ActionListener, action, Action);

impl Listeners {
    /// Create empty registries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`. Returns `false` (and changes nothing) if this exact
    /// listener is already registered.
    pub fn add<L: ListenerSlot + ?Sized>(&mut self, listener: Arc<L>) -> bool {
        let slot = L::slot_mut(self);
        if slot.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            return false;
        }
        slot.push(listener);
        true
    }

    /// Unregister `listener`. Removing a listener that was never added is a
    /// no-op and returns `false`.
    pub fn remove<L: ListenerSlot + ?Sized>(&mut self, listener: &Arc<L>) -> bool {
        let slot = L::slot_mut(self);
        let before = slot.len();
        slot.retain(|l| !Arc::ptr_eq(l, listener));
        slot.len() != before
    }

    /// Number of listeners registered for `L`.
    pub fn count<L: ListenerSlot + ?Sized>(&self) -> usize {
        L::slot(self).len()
    }

    /// Whether any listener of `kind` is registered.
    pub fn has(&self, kind: ListenerKind) -> bool {
        match kind {
            ListenerKind::Component => !self.component.is_empty(),
            ListenerKind::Container => !self.container.is_empty(),
            ListenerKind::Focus => !self.focus.is_empty(),
            ListenerKind::Key => !self.key.is_empty(),
            ListenerKind::Mouse => !self.mouse.is_empty(),
            ListenerKind::MouseMotion => !self.mouse_motion.is_empty(),
            ListenerKind::MouseWheel => !self.mouse_wheel.is_empty(),
            ListenerKind::Action => !self.action.is_empty(),
        }
    }

    /// Snapshot the listeners an event of `kind` is delivered to.
    ///
    /// The snapshot owns its `Arc`s, so listeners may register or remove
    /// listeners (or mutate the tree) while it is being delivered.
    pub fn delivery_for(&self, kind: EventKind) -> Delivery {
        match kind.listener_kind() {
            Some(ListenerKind::Component) => Delivery::Component(self.component.clone()),
            Some(ListenerKind::Container) => Delivery::Container(self.container.clone()),
            Some(ListenerKind::Focus) => Delivery::Focus(self.focus.clone()),
            Some(ListenerKind::Key) => Delivery::Key(self.key.clone()),
            Some(ListenerKind::Mouse) => Delivery::Mouse(self.mouse.clone()),
            Some(ListenerKind::MouseMotion) => Delivery::MouseMotion(self.mouse_motion.clone()),
            Some(ListenerKind::MouseWheel) => Delivery::MouseWheel(self.mouse_wheel.clone()),
            Some(ListenerKind::Action) => Delivery::Action(self.action.clone()),
            None => Delivery::Nothing,
        }
    }
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// An owned, ordered list of listeners for one event kind.
pub enum Delivery {
    Nothing,
    Component(Vec<Arc<dyn ComponentListener>>),
    Container(Vec<Arc<dyn ContainerListener>>),
    Focus(Vec<Arc<dyn FocusListener>>),
    Key(Vec<Arc<dyn KeyListener>>),
    Mouse(Vec<Arc<dyn MouseListener>>),
    MouseMotion(Vec<Arc<dyn MouseMotionListener>>),
    MouseWheel(Vec<Arc<dyn MouseWheelListener>>),
    Action(Vec<Arc<dyn ActionListener>>),
}

impl Delivery {
    /// Number of listeners that will be called.
    pub fn len(&self) -> usize {
        match self {
            Delivery::Nothing => 0,
            Delivery::Component(v) => v.len(),
            Delivery::Container(v) => v.len(),
            Delivery::Focus(v) => v.len(),
            Delivery::Key(v) => v.len(),
            Delivery::Mouse(v) => v.len(),
            Delivery::MouseMotion(v) => v.len(),
            Delivery::MouseWheel(v) => v.len(),
            Delivery::Action(v) => v.len(),
        }
    }

    /// Whether no listener will be called.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every listener, in registration order, with the callback matching
    /// the event's kind.
    pub fn deliver(self, ui: &Ui, event: &mut Event) {
        use EventKind as K;
        let kind = event.kind();
        match self {
            Delivery::Nothing => {}
            Delivery::Component(ls) => {
                for l in ls {
                    match kind {
                        K::ComponentMoved => l.component_moved(ui, event),
                        K::ComponentResized => l.component_resized(ui, event),
                        K::ComponentShown => l.component_shown(ui, event),
                        K::ComponentHidden => l.component_hidden(ui, event),
                        _ => {}
                    }
                }
            }
            Delivery::Container(ls) => {
                for l in ls {
                    match kind {
                        K::ComponentAdded => l.component_added(ui, event),
                        K::ComponentRemoved => l.component_removed(ui, event),
                        _ => {}
                    }
                }
            }
            Delivery::Focus(ls) => {
                for l in ls {
                    match kind {
                        K::FocusGained => l.focus_gained(ui, event),
                        K::FocusLost => l.focus_lost(ui, event),
                        _ => {}
                    }
                }
            }
            Delivery::Key(ls) => {
                for l in ls {
                    match kind {
                        K::KeyTyped => l.key_typed(ui, event),
                        K::KeyPressed => l.key_pressed(ui, event),
                        K::KeyReleased => l.key_released(ui, event),
                        _ => {}
                    }
                }
            }
            Delivery::Mouse(ls) => {
                for l in ls {
                    match kind {
                        K::MouseClicked => l.mouse_clicked(ui, event),
                        K::MousePressed => l.mouse_pressed(ui, event),
                        K::MouseReleased => l.mouse_released(ui, event),
                        K::MouseEntered => l.mouse_entered(ui, event),
                        K::MouseExited => l.mouse_exited(ui, event),
                        _ => {}
                    }
                }
            }
            Delivery::MouseMotion(ls) => {
                for l in ls {
                    match kind {
                        K::MouseMoved => l.mouse_moved(ui, event),
                        K::MouseDragged => l.mouse_dragged(ui, event),
                        _ => {}
                    }
                }
            }
            Delivery::MouseWheel(ls) => {
                for l in ls {
                    l.mouse_wheel_moved(ui, event);
                }
            }
            Delivery::Action(ls) => {
                for l in ls {
                    l.action_performed(ui, event);
                }
            }
        }
    }
}
