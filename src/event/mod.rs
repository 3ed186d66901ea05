//! Event system: kinds, records, listeners, terminal input.

pub mod input;
pub mod kind;
pub mod listener;
pub mod record;

pub use input::{from_terminal, pump_terminal_input, Key, Modifiers, MouseButton};
pub use kind::{EventKind, ListenerKind};
pub use listener::{
    ActionListener, ComponentListener, ContainerListener, Delivery, FocusListener, KeyListener,
    ListenerSlot, Listeners, MouseListener, MouseMotionListener, MouseWheelListener,
};
pub use record::{Event, EventSummary, FocusData, Invocation, KeyData, MouseData, Payload, Source};
