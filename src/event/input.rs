//! Input vocabulary (keys, modifiers, buttons) and the crossterm input source.
//!
//! [`from_terminal`] turns a crossterm event into zero or more native-sourced
//! [`Event`]s; [`pump_terminal_input`] is a producer loop that reads the
//! terminal and posts them to a toolkit until dispatching stops.

use std::ops::{BitAnd, BitOr};
use std::time::Duration;

use super::kind::EventKind;
use super::record::{Event, MouseData, Payload, Source};
use crate::geometry::Size;
use crate::toolkit::Toolkit;

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Keyboard key, decoupled from crossterm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Tab,
    BackTab,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
}

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

/// Modifier key bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(pub u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const SHIFT: Modifiers = Modifiers(1);
    pub const CTRL: Modifiers = Modifiers(2);
    pub const ALT: Modifiers = Modifiers(4);

    /// Check whether `self` contains all the bits in `other`.
    pub fn contains(self, other: Modifiers) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check whether no modifier bits are set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;
    fn bitor(self, rhs: Self) -> Self::Output {
        Modifiers(self.0 | rhs.0)
    }
}

impl BitAnd for Modifiers {
    type Output = Modifiers;
    fn bitand(self, rhs: Self) -> Self::Output {
        Modifiers(self.0 & rhs.0)
    }
}

/// Mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

// ---------------------------------------------------------------------------
// crossterm conversion
// ---------------------------------------------------------------------------

fn convert_modifiers(m: crossterm::event::KeyModifiers) -> Modifiers {
    use crossterm::event::KeyModifiers;
    let mut out = Modifiers::NONE;
    if m.contains(KeyModifiers::SHIFT) {
        out = out | Modifiers::SHIFT;
    }
    if m.contains(KeyModifiers::CONTROL) {
        out = out | Modifiers::CTRL;
    }
    if m.contains(KeyModifiers::ALT) {
        out = out | Modifiers::ALT;
    }
    out
}

fn convert_key(code: crossterm::event::KeyCode) -> Option<Key> {
    use crossterm::event::KeyCode;
    Some(match code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        KeyCode::Tab => Key::Tab,
        KeyCode::BackTab => Key::BackTab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::F(n) => Key::F(n),
        _ => return None,
    })
}

fn convert_mouse_button(b: crossterm::event::MouseButton) -> MouseButton {
    match b {
        crossterm::event::MouseButton::Left => MouseButton::Left,
        crossterm::event::MouseButton::Right => MouseButton::Right,
        crossterm::event::MouseButton::Middle => MouseButton::Middle,
    }
}

/// Convert a terminal event into native-sourced toolkit events.
///
/// A character key press yields `KeyPressed` followed by `KeyTyped`. Terminal
/// focus changes, pastes and unmapped keys yield nothing.
pub fn from_terminal(event: crossterm::event::Event) -> Vec<Event> {
    use crossterm::event::{Event as Ct, KeyEventKind, MouseEventKind};

    match event {
        Ct::Key(ke) => {
            let Some(key) = convert_key(ke.code) else {
                return Vec::new();
            };
            let modifiers = convert_modifiers(ke.modifiers);
            match ke.kind {
                KeyEventKind::Release => {
                    vec![Event::key(EventKind::KeyReleased, Source::Native, key, modifiers)]
                }
                KeyEventKind::Press | KeyEventKind::Repeat => {
                    let mut out =
                        vec![Event::key(EventKind::KeyPressed, Source::Native, key, modifiers)];
                    if let Key::Char(_) = key {
                        out.push(Event::key(EventKind::KeyTyped, Source::Native, key, modifiers));
                    }
                    out
                }
            }
        }
        Ct::Mouse(me) => {
            let mut data = MouseData::at(i32::from(me.column), i32::from(me.row));
            data.modifiers = convert_modifiers(me.modifiers);
            let kind = match me.kind {
                MouseEventKind::Down(b) => {
                    data.button = Some(convert_mouse_button(b));
                    data.click_count = 1;
                    EventKind::MousePressed
                }
                MouseEventKind::Up(b) => {
                    data.button = Some(convert_mouse_button(b));
                    data.click_count = 1;
                    EventKind::MouseReleased
                }
                MouseEventKind::Drag(b) => {
                    data.button = Some(convert_mouse_button(b));
                    EventKind::MouseDragged
                }
                MouseEventKind::Moved => EventKind::MouseMoved,
                MouseEventKind::ScrollUp | MouseEventKind::ScrollLeft => {
                    data.wheel_rotation = -1;
                    EventKind::MouseWheel
                }
                MouseEventKind::ScrollDown | MouseEventKind::ScrollRight => {
                    data.wheel_rotation = 1;
                    EventKind::MouseWheel
                }
            };
            vec![Event::mouse(kind, Source::Native, data)]
        }
        Ct::Resize(w, h) => vec![Event::with_payload(
            EventKind::ComponentResized,
            Source::Native,
            Payload::Resize(Size::new(i32::from(w), i32::from(h))),
        )],
        Ct::FocusGained | Ct::FocusLost | Ct::Paste(_) => Vec::new(),
    }
}

/// Read terminal input and post it to `toolkit` until dispatching stops.
///
/// Blocks the calling thread; run it on a producer thread. Polls with a short
/// timeout so a stop request is observed promptly.
pub fn pump_terminal_input(toolkit: &Toolkit) -> std::io::Result<()> {
    const POLL: Duration = Duration::from_millis(50);
    while !toolkit.is_stopped() {
        if !crossterm::event::poll(POLL)? {
            continue;
        }
        for event in from_terminal(crossterm::event::read()?) {
            toolkit.post_event(event);
        }
    }
    tracing::debug!("terminal input source finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{
        Event as Ct, KeyCode, KeyEvent as CtKeyEvent, KeyEventKind, KeyEventState, KeyModifiers,
        MouseEvent as CtMouseEvent, MouseEventKind,
    };

    // ── Modifiers ────────────────────────────────────────────────────

    #[test]
    fn modifiers_combined() {
        let mods = Modifiers::CTRL | Modifiers::ALT;
        assert!(mods.contains(Modifiers::CTRL));
        assert!(mods.contains(Modifiers::ALT));
        assert!(!mods.contains(Modifiers::SHIFT));
        assert_eq!(mods & Modifiers::CTRL, Modifiers::CTRL);
        assert!(Modifiers::NONE.is_empty());
    }

    // ── from_terminal ────────────────────────────────────────────────

    #[test]
    fn char_press_yields_pressed_then_typed() {
        let events = from_terminal(Ct::Key(CtKeyEvent::new(
            KeyCode::Char('a'),
            KeyModifiers::SHIFT,
        )));
        let kinds: Vec<_> = events.iter().map(Event::kind).collect();
        assert_eq!(kinds, vec![EventKind::KeyPressed, EventKind::KeyTyped]);
        let data = events[0].key_data().unwrap();
        assert_eq!(data.key, Key::Char('a'));
        assert!(data.modifiers.contains(Modifiers::SHIFT));
        assert!(events.iter().all(|e| e.source() == Source::Native));
    }

    #[test]
    fn non_char_press_has_no_typed() {
        let events = from_terminal(Ct::Key(CtKeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::KeyPressed);
    }

    #[test]
    fn key_release() {
        let ct = CtKeyEvent {
            code: KeyCode::Tab,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        let events = from_terminal(Ct::Key(ct));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::KeyReleased);
    }

    #[test]
    fn unmapped_key_is_dropped() {
        let events = from_terminal(Ct::Key(CtKeyEvent::new(KeyCode::Insert, KeyModifiers::NONE)));
        assert!(events.is_empty());
    }

    #[test]
    fn mouse_down_maps_to_pressed() {
        let events = from_terminal(Ct::Mouse(CtMouseEvent {
            kind: MouseEventKind::Down(crossterm::event::MouseButton::Left),
            column: 7,
            row: 3,
            modifiers: KeyModifiers::CONTROL,
        }));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::MousePressed);
        let data = events[0].mouse_data().unwrap();
        assert_eq!((data.x, data.y), (7, 3));
        assert_eq!(data.button, Some(MouseButton::Left));
        assert!(data.modifiers.contains(Modifiers::CTRL));
    }

    #[test]
    fn scroll_maps_to_wheel_rotation() {
        let up = from_terminal(Ct::Mouse(CtMouseEvent {
            kind: MouseEventKind::ScrollUp,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        }));
        assert_eq!(up[0].kind(), EventKind::MouseWheel);
        assert_eq!(up[0].mouse_data().unwrap().wheel_rotation, -1);
    }

    #[test]
    fn resize_carries_size() {
        let events = from_terminal(Ct::Resize(120, 40));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::ComponentResized);
        assert!(matches!(events[0].payload(), Payload::Resize(s) if *s == Size::new(120, 40)));
    }

    #[test]
    fn focus_and_paste_ignored() {
        assert!(from_terminal(Ct::FocusGained).is_empty());
        assert!(from_terminal(Ct::Paste("hi".into())).is_empty());
    }
}
