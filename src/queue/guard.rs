//! At-most-one-dispatcher guard.

use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::error::{Result, ToolkitError};

/// The thread currently dispatching from a queue and its nesting depth.
#[derive(Debug, Default)]
pub(crate) struct DispatcherSlot(Mutex<Option<(ThreadId, usize)>>);

#[cfg(test)]
impl DispatcherSlot {
    /// The dispatching thread, if any.
    pub(crate) fn owner(&self) -> Option<ThreadId> {
        self.0.lock().map(|(thread, _)| thread)
    }
}

/// Held for the duration of one delivery. Nested deliveries from the same
/// thread (a modal pump inside a listener) stack; another thread is refused.
#[derive(Debug)]
pub(crate) struct DispatchGuard<'a> {
    slot: &'a DispatcherSlot,
}

impl<'a> DispatchGuard<'a> {
    pub(crate) fn enter(slot: &'a DispatcherSlot) -> Result<Self> {
        let me = thread::current().id();
        let mut current = slot.0.lock();
        match current.as_mut() {
            None => *current = Some((me, 1)),
            Some((owner, depth)) if *owner == me => *depth += 1,
            Some(_) => return Err(ToolkitError::ConcurrentDispatch),
        }
        Ok(Self { slot })
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let mut current = self.slot.0.lock();
        if let Some((_, depth)) = current.as_mut() {
            *depth -= 1;
            if *depth == 0 {
                *current = None;
            }
        }
    }
}
