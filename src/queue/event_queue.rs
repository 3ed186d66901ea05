//! FIFO event queue with blocking retrieval and push/pop stacking.
//!
//! Queues form a stack through their links: the `next` link is held by the
//! queue that was pushed over and points at its replacement; the `previous`
//! link points back down and is weak. Posting to a superseded queue forwards
//! to the queue above it, so producers holding an old handle keep working.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Condvar, Mutex};

use super::guard::{DispatchGuard, DispatcherSlot};
use crate::dispatch::Ui;
use crate::error::{Result, ToolkitError};
use crate::event::{Event, EventKind, EventSummary};

/// Serializes push and pop so a stack change never interleaves with another.
static STACK_LOCK: Mutex<()> = Mutex::new(());

struct State {
    events: VecDeque<Event>,
    /// Set when this queue has been pushed over (points up) or popped
    /// (points back down to the queue that replaced it).
    next: Option<EventQueue>,
    previous: Weak<Shared>,
    wakeup: bool,
    closed: bool,
    coalesce_paint: bool,
}

struct Shared {
    state: Mutex<State>,
    available: Condvar,
    dispatcher: DispatcherSlot,
}

/// A thread-safe, cloneable handle to an event queue.
#[derive(Clone)]
pub struct EventQueue {
    inner: Arc<Shared>,
}

impl EventQueue {
    /// Create an empty, unstacked queue. Paint coalescing starts off.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Shared {
                state: Mutex::new(State {
                    events: VecDeque::new(),
                    next: None,
                    previous: Weak::new(),
                    wakeup: false,
                    closed: false,
                    coalesce_paint: false,
                }),
                available: Condvar::new(),
                dispatcher: DispatcherSlot::default(),
            }),
        }
    }

    /// Enable or disable merging of queued paint events.
    pub fn set_paint_coalescing(&self, enabled: bool) {
        self.inner.state.lock().coalesce_paint = enabled;
    }

    /// Whether two handles refer to the same queue.
    pub fn same_queue(&self, other: &EventQueue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ── Posting ──────────────────────────────────────────────────────

    /// Append `event` and wake one waiter. Never blocks on the consumer.
    ///
    /// A superseded queue forwards to its replacement. A closed queue drops
    /// the event.
    pub fn post_event(&self, mut event: Event) {
        let mut state = self.inner.state.lock();
        if let Some(next) = state.next.clone() {
            drop(state);
            next.post_event(event);
            return;
        }
        if state.closed {
            tracing::trace!(kind = ?event.kind(), "post to closed queue dropped");
            return;
        }
        if state.coalesce_paint && event.kind() == EventKind::Paint {
            if state.events.iter_mut().any(|queued| queued.coalesce_paint(&event)) {
                tracing::trace!(source = ?event.source(), "paint coalesced");
                return;
            }
        }
        event.mark_posted();
        state.events.push_back(event);
        drop(state);
        self.inner.available.notify_one();
    }

    /// Put `events` back at the head of the queue, in order.
    pub fn requeue_front(&self, events: Vec<Event>) {
        if events.is_empty() {
            return;
        }
        let mut state = self.inner.state.lock();
        if let Some(next) = state.next.clone() {
            drop(state);
            next.requeue_front(events);
            return;
        }
        for event in events.into_iter().rev() {
            state.events.push_front(event);
        }
        drop(state);
        self.inner.available.notify_all();
    }

    // ── Retrieval ────────────────────────────────────────────────────

    /// Remove the head event, blocking while the queue is empty.
    ///
    /// Returns `None` without an event once this queue has been pushed over,
    /// popped, woken with [`wakeup`](Self::wakeup) or closed; the caller
    /// should then look up the active queue again.
    pub fn get_next_event(&self) -> Option<Event> {
        let mut state = self.inner.state.lock();
        loop {
            if state.next.is_some() || state.closed {
                return None;
            }
            if let Some(event) = state.events.pop_front() {
                return Some(event);
            }
            if std::mem::take(&mut state.wakeup) {
                return None;
            }
            self.inner.available.wait(&mut state);
        }
    }

    /// Remove the head event if there is one.
    pub fn try_next_event(&self) -> Option<Event> {
        self.inner.state.lock().events.pop_front()
    }

    /// Remove the first queued event of `kind`, leaving the others in order.
    pub fn get_next_event_of(&self, kind: EventKind) -> Option<Event> {
        let mut state = self.inner.state.lock();
        let index = state.events.iter().position(|e| e.kind() == kind)?;
        state.events.remove(index)
    }

    /// Routing summary of the head event.
    pub fn peek_event(&self) -> Option<EventSummary> {
        self.inner.state.lock().events.front().map(Event::summary)
    }

    /// Routing summary of the first queued event of `kind`.
    pub fn peek_event_of(&self, kind: EventKind) -> Option<EventSummary> {
        let state = self.inner.state.lock();
        state.events.iter().find(|e| e.kind() == kind).map(Event::summary)
    }

    /// Inspect the head event in place.
    pub fn peek_with<R>(&self, f: impl FnOnce(&Event) -> R) -> Option<R> {
        self.inner.state.lock().events.front().map(f)
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.inner.state.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().events.is_empty()
    }

    /// Make a blocked (or the next) [`get_next_event`](Self::get_next_event)
    /// return `None` once the queue is empty.
    pub fn wakeup(&self) {
        self.inner.state.lock().wakeup = true;
        self.inner.available.notify_all();
    }

    /// Stop accepting events and release all waiters.
    pub fn close(&self) {
        let mut state = self.inner.state.lock();
        state.closed = true;
        drop(state);
        self.inner.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    /// Deliver `event` through `ui` while holding this queue's dispatcher
    /// guard. Nested calls from the dispatching thread are allowed; any other
    /// thread gets [`ToolkitError::ConcurrentDispatch`].
    pub fn dispatch_event(&self, ui: &Ui, event: Event) -> Result<()> {
        let _guard = DispatchGuard::enter(&self.inner.dispatcher)?;
        ui.dispatch_event(event);
        Ok(())
    }

    // ── Stack ────────────────────────────────────────────────────────

    /// The active queue of the stack this queue belongs to.
    pub fn top(&self) -> EventQueue {
        let mut current = self.clone();
        loop {
            // A popped queue's link points back down; following it and
            // climbing from there still ends at the active queue.
            let next = current.inner.state.lock().next.clone();
            match next {
                Some(next) => current = next,
                None => return current,
            }
        }
    }

    /// Whether this queue is the active queue of its stack.
    pub fn is_top(&self) -> bool {
        self.inner.state.lock().next.is_none()
    }

    /// Push `new` on top of this queue's stack.
    ///
    /// Pending events move to `new` in order, posts to the old top are
    /// forwarded to `new` from now on, and threads blocked on the old top
    /// are woken.
    pub fn push(&self, new: EventQueue) {
        let _stack = STACK_LOCK.lock();
        let top = self.top();
        if top.same_queue(&new) {
            return;
        }
        let mut old_state = top.inner.state.lock();
        let mut new_state = new.inner.state.lock();
        new_state.next = None;
        new_state.closed = false;
        new_state.previous = Arc::downgrade(&top.inner);
        let moved = old_state.events.len();
        new_state.events.extend(old_state.events.drain(..));
        old_state.next = Some(new.clone());
        drop(new_state);
        drop(old_state);
        tracing::debug!(moved, "event queue pushed");
        top.inner.available.notify_all();
        new.inner.available.notify_all();
    }

    /// Pop the top of this queue's stack, making the queue below it active
    /// again. Pending events move back down in order.
    pub fn pop(&self) -> Result<()> {
        let _stack = STACK_LOCK.lock();
        let top = self.top();
        let previous = {
            let state = top.inner.state.lock();
            state.previous.upgrade().map(|inner| EventQueue { inner })
        }
        .ok_or(ToolkitError::EmptyQueueStack)?;

        let mut top_state = top.inner.state.lock();
        let mut prev_state = previous.inner.state.lock();
        let moved = top_state.events.len();
        prev_state.events.extend(top_state.events.drain(..));
        prev_state.next = None;
        top_state.previous = Weak::new();
        top_state.next = Some(previous.clone());
        drop(prev_state);
        drop(top_state);
        tracing::debug!(moved, "event queue popped");
        top.inner.available.notify_all();
        previous.inner.available.notify_all();
        Ok(())
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("EventQueue")
            .field("pending", &state.events.len())
            .field("superseded", &state.next.is_some())
            .field("closed", &state.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentTree;
    use crate::geometry::Region;
    use std::thread;
    use std::time::Duration;

    fn ids(n: usize) -> Vec<crate::ComponentId> {
        let mut tree = ComponentTree::new();
        (0..n).map(|i| tree.create_component(format!("c{i}"))).collect()
    }

    fn serials(queue: &EventQueue) -> Vec<u64> {
        std::iter::from_fn(|| queue.try_next_event()).map(|e| e.serial()).collect()
    }

    // ── FIFO ─────────────────────────────────────────────────────────

    #[test]
    fn events_come_out_in_post_order() {
        let queue = EventQueue::new();
        let events: Vec<Event> = (0..5).map(|_| Event::invocation(|_| {})).collect();
        let expected: Vec<u64> = events.iter().map(Event::serial).collect();
        for e in events {
            queue.post_event(e);
        }
        assert_eq!(serials(&queue), expected);
    }

    #[test]
    fn post_stamps_the_event() {
        let queue = EventQueue::new();
        let event = Event::invocation(|_| {});
        thread::sleep(Duration::from_millis(5));
        let before = std::time::Instant::now();
        queue.post_event(event);
        let taken = queue.try_next_event().unwrap();
        assert!(taken.posted_at() >= before);
    }

    #[test]
    fn blocked_consumer_receives_later_post() {
        let queue = EventQueue::new();
        let producer = queue.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.post_event(Event::invocation(|_| {}));
        });
        let event = queue.get_next_event();
        handle.join().unwrap();
        assert_eq!(event.map(|e| e.kind()), Some(EventKind::Invocation));
    }

    #[test]
    fn wakeup_releases_blocked_consumer() {
        let queue = EventQueue::new();
        let waker = queue.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            waker.wakeup();
        });
        assert!(queue.get_next_event().is_none());
        handle.join().unwrap();
    }

    #[test]
    fn closed_queue_drops_posts() {
        let queue = EventQueue::new();
        queue.close();
        queue.post_event(Event::invocation(|_| {}));
        assert!(queue.is_empty());
        assert!(queue.get_next_event().is_none());
    }

    // ── Selective retrieval ──────────────────────────────────────────

    #[test]
    fn get_next_event_of_keeps_relative_order() {
        let c = ids(1)[0];
        let queue = EventQueue::new();
        let a = Event::invocation(|_| {});
        let paint = Event::paint(c, None);
        let b = Event::invocation(|_| {});
        let (sa, sp, sb) = (a.serial(), paint.serial(), b.serial());
        queue.post_event(a);
        queue.post_event(paint);
        queue.post_event(b);

        assert_eq!(queue.peek_event_of(EventKind::Paint).map(|s| s.serial), Some(sp));
        assert_eq!(queue.get_next_event_of(EventKind::Paint).map(|e| e.serial()), Some(sp));
        assert!(queue.get_next_event_of(EventKind::Paint).is_none());
        assert_eq!(serials(&queue), vec![sa, sb]);
    }

    #[test]
    fn peek_does_not_remove() {
        let queue = EventQueue::new();
        assert!(queue.peek_event().is_none());
        queue.post_event(Event::invocation(|_| {}));
        let summary = queue.peek_event().unwrap();
        assert_eq!(summary.kind, EventKind::Invocation);
        assert_eq!(queue.peek_with(|e| e.serial()), Some(summary.serial));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn requeue_front_goes_ahead_of_pending() {
        let queue = EventQueue::new();
        let pending = Event::invocation(|_| {});
        let first = Event::invocation(|_| {});
        let second = Event::invocation(|_| {});
        let expected = vec![first.serial(), second.serial(), pending.serial()];
        queue.post_event(pending);
        queue.requeue_front(vec![first, second]);
        assert_eq!(serials(&queue), expected);
    }

    // ── Coalescing ───────────────────────────────────────────────────

    #[test]
    fn paints_for_same_component_merge() {
        let c = ids(1)[0];
        let queue = EventQueue::new();
        queue.set_paint_coalescing(true);
        queue.post_event(Event::paint(c, Some(Region::new(0, 0, 2, 2))));
        queue.post_event(Event::paint(c, Some(Region::new(5, 5, 1, 1))));
        assert_eq!(queue.len(), 1);
        let merged = queue.try_next_event().unwrap();
        assert!(matches!(
            merged.payload(),
            crate::event::Payload::Paint(Some(r)) if *r == Region::new(0, 0, 6, 6)
        ));
    }

    #[test]
    fn paints_are_kept_apart_by_default() {
        let c = ids(1)[0];
        let queue = EventQueue::new();
        let first = Event::paint(c, None);
        let second = Event::paint(c, None);
        let expected = vec![first.serial(), second.serial()];
        queue.post_event(first);
        queue.post_event(second);
        assert_eq!(serials(&queue), expected);
    }

    #[test]
    fn coalescing_can_be_disabled() {
        let c = ids(1)[0];
        let queue = EventQueue::new();
        queue.set_paint_coalescing(true);
        queue.set_paint_coalescing(false);
        queue.post_event(Event::paint(c, None));
        queue.post_event(Event::paint(c, None));
        assert_eq!(queue.len(), 2);
    }

    // ── Stack ────────────────────────────────────────────────────────

    #[test]
    fn push_moves_pending_and_forwards_posts() {
        let base = EventQueue::new();
        let first = Event::invocation(|_| {});
        let s1 = first.serial();
        base.post_event(first);

        let pushed = EventQueue::new();
        base.push(pushed.clone());
        assert!(base.top().same_queue(&pushed));
        assert!(base.is_empty());

        let second = Event::invocation(|_| {});
        let s2 = second.serial();
        base.post_event(second);
        assert!(base.get_next_event().is_none());
        assert_eq!(serials(&pushed), vec![s1, s2]);
    }

    #[test]
    fn pop_returns_pending_to_previous() {
        let base = EventQueue::new();
        let pushed = EventQueue::new();
        base.push(pushed.clone());
        let event = Event::invocation(|_| {});
        let serial = event.serial();
        pushed.post_event(event);

        pushed.pop().unwrap();
        assert!(base.is_top());
        assert!(base.top().same_queue(&base));
        assert_eq!(serials(&base), vec![serial]);

        // A producer still holding the popped handle reaches the base queue.
        let late = Event::invocation(|_| {});
        let late_serial = late.serial();
        pushed.post_event(late);
        assert_eq!(serials(&base), vec![late_serial]);
    }

    #[test]
    fn pop_without_previous_is_an_error() {
        let base = EventQueue::new();
        assert!(matches!(base.pop(), Err(ToolkitError::EmptyQueueStack)));
    }

    #[test]
    fn push_wakes_consumer_blocked_on_old_top() {
        let base = EventQueue::new();
        let consumer = base.clone();
        let handle = thread::spawn(move || consumer.get_next_event().is_none());
        thread::sleep(Duration::from_millis(20));
        base.push(EventQueue::new());
        assert!(handle.join().unwrap());
    }

    #[test]
    fn nested_push_pop_restores_each_level() {
        let base = EventQueue::new();
        let middle = EventQueue::new();
        let upper = EventQueue::new();
        base.push(middle.clone());
        base.push(upper.clone());
        assert!(base.top().same_queue(&upper));
        base.pop().unwrap();
        assert!(base.top().same_queue(&middle));
        base.pop().unwrap();
        assert!(base.top().same_queue(&base));
    }
}
