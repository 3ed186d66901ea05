//! The event record: kind, source, consumed flag and payload.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::input::{Key, Modifiers, MouseButton};
use super::kind::EventKind;
use crate::component::ComponentId;
use crate::dispatch::Ui;
use crate::geometry::{Region, Size};

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Where an event came from, and therefore where it will be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Produced by the native input layer; not yet resolved to a component.
    Native,
    /// Targeted at a component in the tree.
    Component(ComponentId),
}

impl Source {
    /// The target component, if resolved.
    pub fn component(self) -> Option<ComponentId> {
        match self {
            Source::Component(id) => Some(id),
            Source::Native => None,
        }
    }
}

impl From<ComponentId> for Source {
    fn from(id: ComponentId) -> Self {
        Source::Component(id)
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Pointer state carried by mouse events.
///
/// Coordinates are top-level relative while the source is
/// [`Source::Native`] and component relative once retargeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseData {
    pub x: i32,
    pub y: i32,
    pub button: Option<MouseButton>,
    pub click_count: u32,
    pub modifiers: Modifiers,
    /// Wheel notches; negative is away from the user.
    pub wheel_rotation: i32,
}

impl MouseData {
    /// Pointer state at (x, y) with no button.
    pub fn at(x: i32, y: i32) -> Self {
        Self { x, y, ..Self::default() }
    }

    /// Set the button (builder).
    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = Some(button);
        self
    }
}

/// Keyboard state carried by key events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyData {
    pub key: Key,
    pub modifiers: Modifiers,
}

/// Focus transfer details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FocusData {
    /// The component losing (for gained) or gaining (for lost) focus.
    pub opposite: Option<ComponentId>,
    pub temporary: bool,
}

/// A closure to run on the dispatch thread.
pub struct Invocation(Box<dyn FnOnce(&Ui) + Send>);

impl Invocation {
    /// Wrap a closure.
    pub fn new(f: impl FnOnce(&Ui) + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    pub(crate) fn run(self, ui: &Ui) {
        (self.0)(ui)
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Invocation(..)")
    }
}

/// Kind-specific event data.
#[derive(Debug)]
pub enum Payload {
    None,
    Mouse(MouseData),
    Key(KeyData),
    Focus(FocusData),
    Action(String),
    /// Area to redraw; `None` means the whole component.
    Paint(Option<Region>),
    /// The child added to or removed from a container.
    Child(ComponentId),
    /// New top-level size reported by the native layer.
    Resize(Size),
    Invocation(Invocation),
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Something that happened, tagged with a kind and a source.
///
/// Events are posted once, dequeued once and dispatched once. The serial
/// number is assigned at construction and increases monotonically across the
/// process, which makes queue order observable in tests and logs.
#[derive(Debug)]
pub struct Event {
    serial: u64,
    kind: EventKind,
    source: Source,
    consumed: bool,
    payload: Payload,
    posted_at: Instant,
}

/// Copyable view of an event's routing data, returned by queue peeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSummary {
    pub serial: u64,
    pub kind: EventKind,
    pub source: Source,
}

impl Event {
    /// Create an event with no payload.
    pub fn new(kind: EventKind, source: impl Into<Source>) -> Self {
        Self::with_payload(kind, source, Payload::None)
    }

    /// Create an event carrying `payload`.
    pub fn with_payload(kind: EventKind, source: impl Into<Source>, payload: Payload) -> Self {
        Self {
            serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
            kind,
            source: source.into(),
            consumed: false,
            payload,
            posted_at: Instant::now(),
        }
    }

    /// A mouse event.
    pub fn mouse(kind: EventKind, source: impl Into<Source>, data: MouseData) -> Self {
        debug_assert!(kind.is_mouse(), "{kind:?} is not a mouse event kind");
        Self::with_payload(kind, source, Payload::Mouse(data))
    }

    /// A key event.
    pub fn key(kind: EventKind, source: impl Into<Source>, key: Key, modifiers: Modifiers) -> Self {
        debug_assert!(kind.is_key(), "{kind:?} is not a key event kind");
        Self::with_payload(kind, source, Payload::Key(KeyData { key, modifiers }))
    }

    /// A focus-gained or focus-lost event.
    pub fn focus(kind: EventKind, target: ComponentId, opposite: Option<ComponentId>) -> Self {
        debug_assert!(matches!(kind, EventKind::FocusGained | EventKind::FocusLost));
        Self::with_payload(
            kind,
            target,
            Payload::Focus(FocusData { opposite, temporary: false }),
        )
    }

    /// An action event with a command string.
    pub fn action(source: ComponentId, command: impl Into<String>) -> Self {
        Self::with_payload(EventKind::ActionPerformed, source, Payload::Action(command.into()))
    }

    /// A request to redraw `area` of `target` (or all of it).
    pub fn paint(target: ComponentId, area: Option<Region>) -> Self {
        Self::with_payload(EventKind::Paint, target, Payload::Paint(area))
    }

    /// A closure to run on the dispatch thread.
    pub fn invocation(f: impl FnOnce(&Ui) + Send + 'static) -> Self {
        Self::with_payload(
            EventKind::Invocation,
            Source::Native,
            Payload::Invocation(Invocation::new(f)),
        )
    }

    /// Monotonic creation serial.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// When the event was last appended to a queue. Until then, when it was
    /// created.
    pub fn posted_at(&self) -> Instant {
        self.posted_at
    }

    pub(crate) fn mark_posted(&mut self) {
        self.posted_at = Instant::now();
    }

    /// The dispatch discriminator.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Current source.
    pub fn source(&self) -> Source {
        self.source
    }

    /// The target component, if the source has been resolved.
    pub fn target(&self) -> Option<ComponentId> {
        self.source.component()
    }

    /// Replace the source. Used when native input is resolved to a component.
    pub fn retarget(&mut self, source: impl Into<Source>) {
        self.source = source.into();
    }

    /// Mark the event consumed; default processing after listeners is skipped.
    pub fn consume(&mut self) {
        self.consumed = true;
    }

    /// Whether a listener consumed the event.
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// The payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Pointer data, for mouse events.
    pub fn mouse_data(&self) -> Option<&MouseData> {
        match &self.payload {
            Payload::Mouse(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn mouse_data_mut(&mut self) -> Option<&mut MouseData> {
        match &mut self.payload {
            Payload::Mouse(data) => Some(data),
            _ => None,
        }
    }

    /// Key data, for key events.
    pub fn key_data(&self) -> Option<&KeyData> {
        match &self.payload {
            Payload::Key(data) => Some(data),
            _ => None,
        }
    }

    /// Focus details, for focus events.
    pub fn focus_data(&self) -> Option<&FocusData> {
        match &self.payload {
            Payload::Focus(data) => Some(data),
            _ => None,
        }
    }

    /// The command string, for action events.
    pub fn action_command(&self) -> Option<&str> {
        match &self.payload {
            Payload::Action(command) => Some(command),
            _ => None,
        }
    }

    /// Copyable routing summary.
    pub fn summary(&self) -> EventSummary {
        EventSummary { serial: self.serial, kind: self.kind, source: self.source }
    }

    pub(crate) fn take_invocation(&mut self) -> Option<Invocation> {
        match std::mem::replace(&mut self.payload, Payload::None) {
            Payload::Invocation(inv) => Some(inv),
            other => {
                self.payload = other;
                None
            }
        }
    }

    /// Merge `newer` into `self` if both are paint requests for the same
    /// component. Returns `true` when merged; `newer` should then be dropped.
    pub(crate) fn coalesce_paint(&mut self, newer: &Event) -> bool {
        if self.kind != EventKind::Paint || newer.kind != EventKind::Paint {
            return false;
        }
        if self.source != newer.source {
            return false;
        }
        let merged = match (&self.payload, &newer.payload) {
            (Payload::Paint(Some(a)), Payload::Paint(Some(b))) => Some(a.union(*b)),
            _ => None,
        };
        self.payload = Payload::Paint(merged);
        true
    }
}
