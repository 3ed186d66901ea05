//! The dispatch loop and nested event pumps.
//!
//! Every pump pulls from whichever queue is active when it asks, so a queue
//! pushed or popped mid-pump takes effect on the next event. A pump
//! dispatches one event before it first consults its condition.

use crate::event::Event;
use crate::queue::EventQueue;

use super::filter::EventFilter;
use super::ui::{FilterFrame, Ui};
use super::DispatchState;

/// Restores the pump depth on exit, including on unwind.
struct DepthGuard<'a>(&'a Ui);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        let depth = &self.0.inner.depth;
        depth.set(depth.get().saturating_sub(1));
    }
}

/// Removes a pump's filter on exit and puts its deferred events back at the
/// head of the active queue.
struct FilterGuard<'a> {
    ui: &'a Ui,
    id: u64,
}

impl Drop for FilterGuard<'_> {
    fn drop(&mut self) {
        let frame = {
            let mut filters = self.ui.inner.filters.borrow_mut();
            filters
                .iter()
                .position(|f| f.id == self.id)
                .map(|index| filters.remove(index))
        };
        if let Some(frame) = frame {
            tracing::trace!(deferred = frame.deferred.len(), "event filter removed");
            self.ui.toolkit().event_queue().requeue_front(frame.deferred);
        }
    }
}

impl Ui {
    /// Dispatch events until the toolkit is stopped, then drop whatever is
    /// still queued.
    pub fn run(&self) {
        tracing::debug!("dispatch loop started");
        self.pump_events(|| true);
        self.discard_pending();
        tracing::debug!("dispatch loop finished");
    }

    /// Dispatch events until `cond` returns `false`, the toolkit stops or the
    /// active queue is closed.
    ///
    /// `cond` is evaluated only after an event has been taken and
    /// dispatched, never before the first one. An interrupted wait goes
    /// back to the active queue without consulting it.
    pub fn pump_events(&self, mut cond: impl FnMut() -> bool) {
        let depth = &self.inner.depth;
        depth.set(depth.get() + 1);
        let _depth = DepthGuard(self);
        tracing::trace!(depth = depth.get(), "pump entered");

        loop {
            if self.toolkit().is_stopped() {
                break;
            }
            let Some((queue, event)) = self.next_event() else {
                if self.toolkit().event_queue().is_closed() {
                    break;
                }
                continue;
            };
            self.dispatch_from(&queue, event);
            if !cond() {
                break;
            }
        }
        tracing::trace!(depth = depth.get(), "pump exited");
    }

    /// Like [`pump_events`](Self::pump_events), with `filter` active for the
    /// duration of the pump. Events it (or any enclosing pump's filter)
    /// rejects are set aside and requeued in order when this pump exits.
    pub fn pump_events_for_filter(
        &self,
        cond: impl FnMut() -> bool,
        filter: impl EventFilter + 'static,
    ) {
        let id = self.inner.next_filter_id.get();
        self.inner.next_filter_id.set(id + 1);
        self.inner.filters.borrow_mut().push(FilterFrame {
            id,
            filter: Box::new(filter),
            deferred: Vec::new(),
        });
        let _frame = FilterGuard { ui: self, id };
        self.pump_events(cond);
    }

    /// Take the next event from the active queue, blocking while it is
    /// empty. `None` means the wait was interrupted.
    fn next_event(&self) -> Option<(EventQueue, Event)> {
        let toolkit = self.toolkit();
        let queue = toolkit.event_queue();
        if let Some(event) = queue.try_next_event() {
            return Some((queue, event));
        }
        toolkit.set_state(DispatchState::Idle);
        let event = queue.get_next_event();
        toolkit.set_state(DispatchState::Running);
        event.map(|event| (queue, event))
    }

    /// Resolve, filter and deliver one event pulled from `queue`.
    fn dispatch_from(&self, queue: &EventQueue, mut event: Event) {
        if !self.resolve_target(&mut event) {
            return;
        }
        if let Some(index) = self.rejecting_filter(&event) {
            tracing::trace!(kind = ?event.kind(), "event deferred by filter");
            self.inner.filters.borrow_mut()[index].deferred.push(event);
            return;
        }
        if let Err(err) = queue.dispatch_event(self, event) {
            tracing::error!(%err, "event dropped");
        }
    }

    fn discard_pending(&self) {
        let queue = self.toolkit().event_queue();
        queue.close();
        let dropped = std::iter::from_fn(|| queue.try_next_event()).count();
        if dropped > 0 {
            tracing::debug!(dropped, "pending events discarded at shutdown");
        }
    }
}
