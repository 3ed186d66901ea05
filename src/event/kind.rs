//! Event kinds and the listener kinds they are delivered to.

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// Dispatch discriminator for an [`Event`](super::Event).
///
/// Every kind has a stable integer id, grouped by family in the ranges
/// applications built against the classic toolkit expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum EventKind {
    ComponentMoved = 100,
    ComponentResized = 101,
    ComponentShown = 102,
    ComponentHidden = 103,
    ComponentAdded = 300,
    ComponentRemoved = 301,
    KeyTyped = 400,
    KeyPressed = 401,
    KeyReleased = 402,
    MouseClicked = 500,
    MousePressed = 501,
    MouseReleased = 502,
    MouseMoved = 503,
    MouseEntered = 504,
    MouseExited = 505,
    MouseDragged = 506,
    MouseWheel = 507,
    Paint = 800,
    ActionPerformed = 1001,
    FocusGained = 1004,
    FocusLost = 1005,
    Invocation = 1200,
}

impl EventKind {
    /// Every kind, in id order.
    pub const ALL: [EventKind; 22] = [
        EventKind::ComponentMoved,
        EventKind::ComponentResized,
        EventKind::ComponentShown,
        EventKind::ComponentHidden,
        EventKind::ComponentAdded,
        EventKind::ComponentRemoved,
        EventKind::KeyTyped,
        EventKind::KeyPressed,
        EventKind::KeyReleased,
        EventKind::MouseClicked,
        EventKind::MousePressed,
        EventKind::MouseReleased,
        EventKind::MouseMoved,
        EventKind::MouseEntered,
        EventKind::MouseExited,
        EventKind::MouseDragged,
        EventKind::MouseWheel,
        EventKind::Paint,
        EventKind::ActionPerformed,
        EventKind::FocusGained,
        EventKind::FocusLost,
        EventKind::Invocation,
    ];

    /// The integer id of this kind.
    #[inline]
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Look up a kind by integer id.
    pub fn from_id(id: u32) -> Option<EventKind> {
        Self::ALL.iter().copied().find(|k| k.id() == id)
    }

    /// The listener kind this event is delivered to, if any.
    ///
    /// Paint and invocation events have no listeners; they are handled by the
    /// dispatcher itself.
    pub const fn listener_kind(self) -> Option<ListenerKind> {
        use EventKind::*;
        match self {
            ComponentMoved | ComponentResized | ComponentShown | ComponentHidden => {
                Some(ListenerKind::Component)
            }
            ComponentAdded | ComponentRemoved => Some(ListenerKind::Container),
            KeyTyped | KeyPressed | KeyReleased => Some(ListenerKind::Key),
            MouseClicked | MousePressed | MouseReleased | MouseEntered | MouseExited => {
                Some(ListenerKind::Mouse)
            }
            MouseMoved | MouseDragged => Some(ListenerKind::MouseMotion),
            MouseWheel => Some(ListenerKind::MouseWheel),
            ActionPerformed => Some(ListenerKind::Action),
            FocusGained | FocusLost => Some(ListenerKind::Focus),
            Paint | Invocation => None,
        }
    }

    /// Whether this is a pointer event (retargeted by hit testing).
    pub const fn is_mouse(self) -> bool {
        matches!(self.id(), 500..=507)
    }

    /// Whether this is a keyboard event (retargeted to the focus owner).
    pub const fn is_key(self) -> bool {
        matches!(self.id(), 400..=402)
    }

    /// Whether this is user input (mouse or keyboard).
    pub const fn is_input(self) -> bool {
        self.is_mouse() || self.is_key()
    }
}

// ---------------------------------------------------------------------------
// ListenerKind
// ---------------------------------------------------------------------------

/// Closed set of listener registries a component carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Component,
    Container,
    Focus,
    Key,
    Mouse,
    MouseMotion,
    MouseWheel,
    Action,
}
