//! Pilot: drive a toolkit headlessly from the test thread.
//!
//! The pilot attaches the calling thread as the dispatch thread, so tests
//! can post native input and then process it synchronously.

use crate::component::ComponentTree;
use crate::config::ToolkitConfig;
use crate::dispatch::Ui;
use crate::error::Result;
use crate::event::{Event, EventKind, Key, Modifiers, MouseButton, MouseData, Payload, Source};
use crate::geometry::Size;
use crate::toolkit::Toolkit;

/// A headless toolkit driver for testing.
///
/// ```ignore
/// let mut tree = ComponentTree::new();
/// let window = tree.create_validate_root("Window");
/// let pilot = Pilot::new(tree)?;
/// pilot.click(3, 2);
/// pilot.process();
/// ```
pub struct Pilot {
    toolkit: Toolkit,
    ui: Ui,
}

impl Pilot {
    /// Attach a fresh toolkit to the current thread with `tree`.
    pub fn new(tree: ComponentTree) -> Result<Self> {
        Self::with_config(ToolkitConfig::default(), tree)
    }

    pub fn with_config(config: ToolkitConfig, tree: ComponentTree) -> Result<Self> {
        let toolkit = Toolkit::new(config);
        let ui = toolkit.attach_current_thread(tree)?;
        Ok(Self { toolkit, ui })
    }

    pub fn toolkit(&self) -> &Toolkit {
        &self.toolkit
    }

    pub fn ui(&self) -> &Ui {
        &self.ui
    }

    // ── Input simulation ─────────────────────────────────────────────

    /// Post a native key press followed by its release.
    pub fn press_key(&self, key: Key) {
        self.press_key_with(key, Modifiers::NONE);
    }

    pub fn press_key_with(&self, key: Key, modifiers: Modifiers) {
        self.toolkit.post_event(Event::key(EventKind::KeyPressed, Source::Native, key, modifiers));
        self.toolkit.post_event(Event::key(EventKind::KeyReleased, Source::Native, key, modifiers));
    }

    /// Post a native left-button press and release at (x, y).
    pub fn click(&self, x: i32, y: i32) {
        let data = MouseData::at(x, y).with_button(MouseButton::Left);
        self.toolkit.post_event(Event::mouse(EventKind::MousePressed, Source::Native, data));
        self.toolkit.post_event(Event::mouse(EventKind::MouseReleased, Source::Native, data));
    }

    /// Post a native pointer move to (x, y).
    pub fn move_mouse(&self, x: i32, y: i32) {
        self.toolkit
            .post_event(Event::mouse(EventKind::MouseMoved, Source::Native, MouseData::at(x, y)));
    }

    /// Post a native resize of the top-level components.
    pub fn resize(&self, width: i32, height: i32) {
        self.toolkit.post_event(Event::with_payload(
            EventKind::ComponentResized,
            Source::Native,
            Payload::Resize(Size::new(width, height)),
        ));
    }

    // ── Processing ───────────────────────────────────────────────────

    /// Dispatch until the active queue is empty, including events generated
    /// while dispatching.
    pub fn process(&self) {
        if self.toolkit.event_queue().is_empty() {
            return;
        }
        let toolkit = self.toolkit.clone();
        self.ui.pump_events(move || !toolkit.event_queue().is_empty());
    }
}

impl Drop for Pilot {
    fn drop(&mut self) {
        self.toolkit.stop_dispatching();
        Ui::release_current();
    }
}
