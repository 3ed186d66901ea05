//! The toolkit context: the queue stack, the dispatch thread and
//! cross-thread invocation.
//!
//! A [`Toolkit`] is a cheap cloneable handle usable from any thread. The
//! component tree lives on the dispatch thread, either one spawned by
//! [`Toolkit::start`] or the caller's own via
//! [`Toolkit::attach_current_thread`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::component::ComponentTree;
use crate::config::ToolkitConfig;
use crate::dispatch::ui::panic_message;
use crate::dispatch::{DispatchState, Ui};
use crate::error::{Result, ToolkitError};
use crate::event::Event;
use crate::queue::EventQueue;

/// Process-wide toolkit installed by [`Toolkit::init_default`].
static DEFAULT: Mutex<Option<Toolkit>> = Mutex::new(None);

struct Inner {
    config: ToolkitConfig,
    base: EventQueue,
    state: Mutex<DispatchState>,
    stopped: AtomicBool,
    dispatch_thread: Mutex<Option<ThreadId>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to an event queue stack and its dispatch thread.
#[derive(Clone)]
pub struct Toolkit {
    inner: Arc<Inner>,
}

impl Toolkit {
    /// Create a toolkit. Nothing is dispatched until [`start`](Self::start)
    /// or [`attach_current_thread`](Self::attach_current_thread).
    pub fn new(config: ToolkitConfig) -> Self {
        let base = EventQueue::new();
        base.set_paint_coalescing(config.coalesce_paint);
        Self {
            inner: Arc::new(Inner {
                config,
                base,
                state: Mutex::new(DispatchState::Idle),
                stopped: AtomicBool::new(false),
                dispatch_thread: Mutex::new(None),
                handle: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ToolkitConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the dispatch thread, moving `tree` onto it.
    pub fn start(&self, tree: ComponentTree) -> Result<()> {
        let mut handle = self.inner.handle.lock();
        if handle.is_some() || self.inner.dispatch_thread.lock().is_some() {
            return Err(ToolkitError::AlreadyStarted);
        }
        let toolkit = self.clone();
        let spawned = thread::Builder::new()
            .name(self.inner.config.thread_name.clone())
            .spawn(move || {
                *toolkit.inner.dispatch_thread.lock() = Some(thread::current().id());
                let ui = Ui::new(toolkit, tree);
                ui.run();
                Ui::release_current();
            })?;
        *self.inner.dispatch_thread.lock() = Some(spawned.thread().id());
        tracing::info!(thread = %self.inner.config.thread_name, "dispatch thread started");
        *handle = Some(spawned);
        Ok(())
    }

    /// Make the calling thread the dispatch thread and return its context.
    ///
    /// The caller drives dispatch itself with [`Ui::run`] or
    /// [`Ui::pump_events`].
    pub fn attach_current_thread(&self, tree: ComponentTree) -> Result<Ui> {
        {
            let mut dispatch_thread = self.inner.dispatch_thread.lock();
            if dispatch_thread.is_some() {
                return Err(ToolkitError::AlreadyStarted);
            }
            *dispatch_thread = Some(thread::current().id());
        }
        tracing::debug!(thread = ?thread::current().name(), "dispatch attached to current thread");
        Ok(Ui::new(self.clone(), tree))
    }

    /// Ask the dispatch loop to stop after the current event.
    pub fn stop_dispatching(&self) {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.inner.state.lock() = DispatchState::Stopped;
        self.event_queue().wakeup();
        tracing::info!("dispatching stopped");
    }

    /// Whether [`stop_dispatching`](Self::stop_dispatching) has been called.
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Stop dispatching and wait for a spawned dispatch thread to finish.
    ///
    /// Called from the dispatch thread itself, this only stops.
    pub fn shutdown(&self) -> Result<()> {
        self.stop_dispatching();
        if self.is_dispatch_thread() {
            return Ok(());
        }
        let handle = self.inner.handle.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("dispatch thread panicked");
            }
        }
        Ok(())
    }

    /// What the dispatch loop is doing.
    pub fn dispatch_state(&self) -> DispatchState {
        *self.inner.state.lock()
    }

    /// Record a loop transition. `Stopped` is final.
    pub(crate) fn set_state(&self, next: DispatchState) {
        let mut state = self.inner.state.lock();
        if *state != DispatchState::Stopped && *state != next {
            tracing::trace!(from = ?*state, to = ?next, "dispatch state");
            *state = next;
        }
    }

    // ── Thread identity ──────────────────────────────────────────────

    /// Whether the caller is running on the dispatch thread.
    pub fn is_dispatch_thread(&self) -> bool {
        *self.inner.dispatch_thread.lock() == Some(thread::current().id())
    }

    /// Panic unless called on the dispatch thread.
    pub fn assert_dispatch_thread(&self) {
        assert!(
            self.is_dispatch_thread(),
            "must be called on the dispatch thread (called from {:?})",
            thread::current().name()
        );
    }

    // ── Queues ───────────────────────────────────────────────────────

    /// Post an event to the active queue.
    pub fn post_event(&self, event: Event) {
        self.inner.base.post_event(event);
    }

    /// The active (top) queue.
    pub fn event_queue(&self) -> EventQueue {
        self.inner.base.top()
    }

    /// The queue at the bottom of the stack.
    pub fn base_queue(&self) -> &EventQueue {
        &self.inner.base
    }

    /// Push `queue` on top of the stack; it becomes the active queue.
    pub fn push_queue(&self, queue: EventQueue) {
        queue.set_paint_coalescing(self.inner.config.coalesce_paint);
        self.inner.base.push(queue);
    }

    /// Pop the active queue off the stack.
    pub fn pop_queue(&self) -> Result<()> {
        self.inner.base.pop()
    }

    // ── Invocation ───────────────────────────────────────────────────

    /// Run `f` on the dispatch thread after the events already queued.
    pub fn invoke_later(&self, f: impl FnOnce(&Ui) + Send + 'static) {
        self.post_event(Event::invocation(f));
    }

    /// Run `f` on the dispatch thread and wait for its result.
    ///
    /// On the dispatch thread itself `f` runs inline, since waiting would
    /// deadlock. A panic in `f` surfaces as
    /// [`ToolkitError::InvocationFailed`].
    pub fn invoke_and_wait<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&Ui) -> R + Send + 'static,
    {
        if self.is_dispatch_thread() {
            tracing::warn!("invoke_and_wait called on the dispatch thread; running inline");
            let ui = Ui::current().ok_or(ToolkitError::NotRunning)?;
            return panic::catch_unwind(AssertUnwindSafe(|| f(&ui)))
                .map_err(|payload| ToolkitError::InvocationFailed(panic_message(&*payload)));
        }
        if self.is_stopped() {
            return Err(ToolkitError::NotRunning);
        }

        let (tx, rx) = oneshot::channel();
        self.invoke_later(move |ui| {
            // The waiter may have given up; nothing to report then.
            let _ = tx.send(f(ui));
        });
        rx.blocking_recv().map_err(|_| {
            ToolkitError::InvocationFailed("invocation panicked or was discarded".to_owned())
        })
    }

    // ── Process-wide default ─────────────────────────────────────────

    /// Install a process-wide toolkit.
    pub fn init_default(config: ToolkitConfig) -> Result<Toolkit> {
        let mut slot = DEFAULT.lock();
        if slot.is_some() {
            return Err(ToolkitError::DefaultAlreadyInstalled);
        }
        let toolkit = Toolkit::new(config);
        *slot = Some(toolkit.clone());
        Ok(toolkit)
    }

    /// The process-wide toolkit, if installed.
    pub fn default_instance() -> Option<Toolkit> {
        DEFAULT.lock().clone()
    }

    /// Shut down and uninstall the process-wide toolkit.
    pub fn shutdown_default() -> Result<()> {
        let toolkit = DEFAULT.lock().take().ok_or(ToolkitError::NotRunning)?;
        toolkit.shutdown()
    }
}

impl std::fmt::Debug for Toolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolkit")
            .field("state", &self.dispatch_state())
            .field("stopped", &self.is_stopped())
            .field("queue", &self.event_queue())
            .finish()
    }
}
