//! Recording doubles for the native peer and for listeners.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::component::{ComponentId, Peer};
use crate::dispatch::Ui;
use crate::event::{
    ActionListener, ComponentListener, ContainerListener, Event, EventKind, FocusListener,
    KeyListener, MouseListener, MouseMotionListener, MouseWheelListener,
};
use crate::geometry::{Region, Size};

// ---------------------------------------------------------------------------
// RecordingPeer
// ---------------------------------------------------------------------------

/// One call made on a [`RecordingPeer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerCall {
    Attach(ComponentId),
    Detach,
    SetBounds(Region),
    RequestLayout,
    InvalidateForRedraw(Option<Region>),
    RequestFocus,
}

/// A peer that reports a fixed measured size and records every call.
///
/// The call log is shared, so it stays readable after the peer has been
/// moved into the tree.
#[derive(Debug)]
pub struct RecordingPeer {
    measured: Size,
    bounds: Region,
    focused: bool,
    calls: Arc<Mutex<Vec<PeerCall>>>,
}

impl RecordingPeer {
    pub fn new(measured: Size) -> Self {
        Self {
            measured,
            bounds: Region::EMPTY,
            focused: false,
            calls: Arc::default(),
        }
    }

    /// Shared handle to the call log.
    pub fn calls(&self) -> Arc<Mutex<Vec<PeerCall>>> {
        Arc::clone(&self.calls)
    }

    fn record(&self, call: PeerCall) {
        self.calls.lock().push(call);
    }
}

impl Peer for RecordingPeer {
    fn attach(&mut self, parent: ComponentId) {
        self.record(PeerCall::Attach(parent));
    }

    fn detach(&mut self) {
        self.record(PeerCall::Detach);
    }

    fn bounds(&self) -> Region {
        self.bounds
    }

    fn set_bounds(&mut self, bounds: Region) {
        self.bounds = bounds;
        self.record(PeerCall::SetBounds(bounds));
    }

    fn request_layout(&mut self) {
        self.record(PeerCall::RequestLayout);
    }

    fn invalidate_for_redraw(&mut self, area: Option<Region>) {
        self.record(PeerCall::InvalidateForRedraw(area));
    }

    fn is_focused(&self) -> bool {
        self.focused
    }

    fn request_focus(&mut self) -> bool {
        self.focused = true;
        self.record(PeerCall::RequestFocus);
        true
    }

    fn measured_size(&self) -> Size {
        self.measured
    }
}

// ---------------------------------------------------------------------------
// RecordingListener
// ---------------------------------------------------------------------------

/// One delivery seen by a [`RecordingListener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub listener: String,
    pub kind: EventKind,
    pub target: Option<ComponentId>,
    pub serial: u64,
}

/// Shared, ordered delivery log. Several listeners can write to one log to
/// observe their relative order.
pub type DeliveryLog = Arc<Mutex<Vec<Delivered>>>;

/// A listener of every kind that logs each delivery.
#[derive(Debug)]
pub struct RecordingListener {
    name: String,
    log: DeliveryLog,
    consume: bool,
}

impl Default for RecordingListener {
    fn default() -> Self {
        Self::named("listener")
    }
}

impl RecordingListener {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), log: Arc::default(), consume: false }
    }

    /// A listener writing into an existing log.
    pub fn sharing(name: impl Into<String>, log: &DeliveryLog) -> Self {
        Self { name: name.into(), log: Arc::clone(log), consume: false }
    }

    /// Consume every event delivered to this listener.
    pub fn consuming(mut self) -> Self {
        self.consume = true;
        self
    }

    pub fn log(&self) -> DeliveryLog {
        Arc::clone(&self.log)
    }

    /// Deliveries so far, in order.
    pub fn delivered(&self) -> Vec<Delivered> {
        self.log.lock().clone()
    }

    /// Kinds delivered so far, in order.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.log.lock().iter().map(|d| d.kind).collect()
    }

    fn record(&self, event: &mut Event) {
        self.log.lock().push(Delivered {
            listener: self.name.clone(),
            kind: event.kind(),
            target: event.target(),
            serial: event.serial(),
        });
        if self.consume {
            event.consume();
        }
    }
}

macro_rules! record_all {
    ($trait:ident: $($method:ident),+) => {
        impl $trait for RecordingListener {
            $(fn $method(&self, _ui: &Ui, event: &mut Event) {
                self.record(event);
            })+
        }
    };
}

record_all!(ComponentListener: component_moved, component_resized, component_shown, component_hidden);
record_all!(ContainerListener: component_added, component_removed);
record_all!(FocusListener: focus_gained, focus_lost);
record_all!(KeyListener: key_typed, key_pressed, key_released);
record_all!(MouseListener: mouse_clicked, mouse_pressed, mouse_released, mouse_entered, mouse_exited);
record_all!(MouseMotionListener: mouse_moved, mouse_dragged);
record_all!(MouseWheelListener: mouse_wheel_moved);
record_all!(ActionListener: action_performed);
