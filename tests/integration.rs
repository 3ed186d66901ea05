//! Integration tests for toolkit-core.
//!
//! These tests exercise the public API from outside the crate with a real
//! dispatch thread: producers on other threads, cross-thread invocation, the
//! queue stack, and the validate protocol as seen by application code.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use pretty_assertions::{assert_eq, assert_ne};

use toolkit_core::dispatch::DispatchState;
use toolkit_core::event::ActionListener;
use toolkit_core::geometry::{Insets, Region};
use toolkit_core::layout::{Constraint, StackLayout};
use toolkit_core::testing::RecordingListener;
use toolkit_core::{
    ComponentId, ComponentTree, Event, EventQueue, Toolkit, ToolkitConfig, ToolkitError,
};

fn started(tree: ComponentTree) -> Toolkit {
    let toolkit = Toolkit::new(ToolkitConfig::default().with_thread_name("test-dispatch"));
    toolkit.start(tree).unwrap();
    toolkit
}

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[test]
fn test_each_producer_is_delivered_in_post_order() {
    let toolkit = started(ComponentTree::new());
    let seen: Arc<Mutex<Vec<(usize, usize, thread::ThreadId)>>> = Arc::default();

    let producers: Vec<_> = (0..4)
        .map(|producer| {
            let toolkit = toolkit.clone();
            let seen = Arc::clone(&seen);
            thread::spawn(move || {
                for seq in 0..50 {
                    let seen = Arc::clone(&seen);
                    toolkit.invoke_later(move |_| {
                        seen.lock().push((producer, seq, thread::current().id()));
                    });
                }
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }
    toolkit.invoke_and_wait(|_| ()).unwrap();

    let seen = seen.lock().clone();
    assert_eq!(seen.len(), 200);
    for producer in 0..4 {
        let order: Vec<usize> = seen.iter().filter(|s| s.0 == producer).map(|s| s.1).collect();
        assert_eq!(order, (0..50).collect::<Vec<_>>());
    }
    let dispatcher = seen[0].2;
    assert!(seen.iter().all(|s| s.2 == dispatcher));
    assert_ne!(thread::current().id(), dispatcher);

    toolkit.shutdown().unwrap();
}

#[test]
fn test_listeners_see_events_in_queue_order() {
    let mut tree = ComponentTree::new();
    let button = tree.create_component("Button");
    let listener = Arc::new(RecordingListener::default());
    tree.add_listener::<dyn ActionListener>(button, listener.clone()).unwrap();
    let toolkit = started(tree);

    let events: Vec<Event> = (0..10).map(|i| Event::action(button, format!("cmd{i}"))).collect();
    let serials: Vec<u64> = events.iter().map(Event::serial).collect();
    for event in events {
        toolkit.post_event(event);
    }
    toolkit.invoke_and_wait(|_| ()).unwrap();

    let delivered: Vec<u64> = listener.delivered().iter().map(|d| d.serial).collect();
    assert_eq!(delivered, serials);
    toolkit.shutdown().unwrap();
}

// ---------------------------------------------------------------------------
// invoke_and_wait
// ---------------------------------------------------------------------------

#[test]
fn test_invoke_and_wait_returns_result() {
    let mut tree = ComponentTree::new();
    tree.create_component("a");
    tree.create_component("b");
    let toolkit = started(tree);

    let (len, on_dispatch) = toolkit
        .invoke_and_wait(|ui| (ui.tree().len(), ui.toolkit().is_dispatch_thread()))
        .unwrap();
    assert_eq!(len, 2);
    assert!(on_dispatch);
    assert!(!toolkit.is_dispatch_thread());
    toolkit.shutdown().unwrap();
}

#[test]
fn test_invoke_and_wait_runs_inline_on_dispatch_thread() {
    let toolkit = started(ComponentTree::new());
    let nested = toolkit
        .invoke_and_wait(|ui| ui.toolkit().invoke_and_wait(|_| 42))
        .unwrap();
    assert_eq!(nested.unwrap(), 42);
    toolkit.shutdown().unwrap();
}

#[test]
fn test_invoke_and_wait_reports_panics() {
    let toolkit = started(ComponentTree::new());
    let result: Result<(), _> = toolkit.invoke_and_wait(|_| panic!("boom"));
    assert!(matches!(result, Err(ToolkitError::InvocationFailed(_))));

    // The dispatch thread survives the panic.
    assert_eq!(toolkit.invoke_and_wait(|_| 7).unwrap(), 7);
    toolkit.shutdown().unwrap();
}

// ---------------------------------------------------------------------------
// Queue stack
// ---------------------------------------------------------------------------

#[test]
fn test_pushed_queue_takes_over_dispatch() {
    let toolkit = started(ComponentTree::new());
    let pushed = EventQueue::new();
    toolkit.push_queue(pushed.clone());
    assert!(toolkit.event_queue().same_queue(&pushed));

    // Posts through the base handle are forwarded and still dispatched.
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    toolkit.base_queue().post_event(Event::invocation(move |_| flag.store(true, Ordering::SeqCst)));
    assert!(wait_until(|| ran.load(Ordering::SeqCst)));

    toolkit.pop_queue().unwrap();
    assert!(toolkit.event_queue().same_queue(toolkit.base_queue()));
    assert!(matches!(toolkit.pop_queue(), Err(ToolkitError::EmptyQueueStack)));
    assert_eq!(toolkit.invoke_and_wait(|_| "still running").unwrap(), "still running");
    toolkit.shutdown().unwrap();
}

#[test]
fn test_second_thread_cannot_dispatch_same_queue() {
    let toolkit = started(ComponentTree::new());
    let barrier = Arc::new(Barrier::new(2));
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let hold = Arc::clone(&barrier);
    toolkit.invoke_later(move |_| {
        hold.wait();
        let _ = release_rx.recv();
    });
    barrier.wait();

    // The dispatch thread is inside a delivery from the base queue.
    let other = Toolkit::new(ToolkitConfig::default());
    let ui = other.attach_current_thread(ComponentTree::new()).unwrap();
    let result = toolkit.base_queue().dispatch_event(&ui, Event::invocation(|_| {}));
    assert!(matches!(result, Err(ToolkitError::ConcurrentDispatch)));

    release_tx.send(()).unwrap();
    other.stop_dispatching();
    toolkit.shutdown().unwrap();
}

// ---------------------------------------------------------------------------
// Validate protocol
// ---------------------------------------------------------------------------

#[test]
fn test_stacked_scenario_on_dispatch_thread() {
    let mut tree = ComponentTree::new();
    let a = tree.create_validate_root("A");
    let x = tree.create_component("X");
    let y = tree.create_component("Y");
    tree.set_insets(a, Insets::new(10, 0, 0, 10)).unwrap();
    tree.set_layout(a, Some(Box::new(StackLayout::vertical().with_gap(5)))).unwrap();
    tree.add(a, x, Constraint::None).unwrap();
    tree.add(a, y, Constraint::None).unwrap();
    tree.set_bounds(a, Region::new(0, 0, 100, 100)).unwrap();
    tree.set_bounds(x, Region::new(10, 10, 50, 20)).unwrap();
    tree.set_bounds(y, Region::new(10, 40, 50, 20)).unwrap();
    let toolkit = started(tree);

    let (xb, yb, valid) = toolkit
        .invoke_and_wait(move |ui| {
            ui.with_tree(|t| {
                t.invalidate(a).unwrap();
                t.validate(a).unwrap();
                (t.bounds(x), t.bounds(y), [t.is_valid(a), t.is_valid(x), t.is_valid(y)])
            })
        })
        .unwrap();
    assert_eq!(xb, Region::new(10, 10, 50, 20));
    assert_eq!(yb, Region::new(10, 35, 50, 20));
    assert_eq!(valid, [true, true, true]);
    toolkit.shutdown().unwrap();
}

#[test]
fn test_revalidate_lays_out_once_from_validate_root() {
    let mut tree = ComponentTree::new();
    let a = tree.create_validate_root("A");
    let b = tree.create_container("B");
    let c = tree.create_component("C");
    tree.add(a, b, Constraint::None).unwrap();
    tree.add(b, c, Constraint::None).unwrap();
    let toolkit = started(tree);

    let (passes, all_valid) = toolkit
        .invoke_and_wait(move |ui| {
            ui.with_tree(|t| {
                t.validate(a).unwrap();
                let before = t.validate_passes();
                t.invalidate(c).unwrap();
                t.revalidate(c).unwrap();
                (t.validate_passes() - before, [a, b, c].iter().all(|&id| t.is_valid(id)))
            })
        })
        .unwrap();
    assert_eq!(passes, 1);
    assert!(all_valid);
    toolkit.shutdown().unwrap();
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn test_start_twice_is_refused() {
    let toolkit = started(ComponentTree::new());
    assert!(matches!(toolkit.start(ComponentTree::new()), Err(ToolkitError::AlreadyStarted)));
    assert!(matches!(
        toolkit.attach_current_thread(ComponentTree::new()),
        Err(ToolkitError::AlreadyStarted)
    ));
    toolkit.shutdown().unwrap();
}

#[test]
fn test_idle_while_waiting_and_stopped_after_shutdown() {
    let toolkit = started(ComponentTree::new());
    toolkit.invoke_and_wait(|_| ()).unwrap();
    assert!(wait_until(|| toolkit.dispatch_state() == DispatchState::Idle));

    toolkit.shutdown().unwrap();
    assert_eq!(toolkit.dispatch_state(), DispatchState::Stopped);
    assert!(matches!(toolkit.invoke_and_wait(|_| ()), Err(ToolkitError::NotRunning)));
}

#[test]
fn test_process_wide_default() {
    let toolkit = Toolkit::init_default(ToolkitConfig::default()).unwrap();
    assert!(matches!(
        Toolkit::init_default(ToolkitConfig::default()),
        Err(ToolkitError::DefaultAlreadyInstalled)
    ));
    toolkit.start(ComponentTree::new()).unwrap();
    let via_default = Toolkit::default_instance().unwrap();
    assert_eq!(via_default.invoke_and_wait(|_| 1 + 1).unwrap(), 2);

    Toolkit::shutdown_default().unwrap();
    assert!(Toolkit::default_instance().is_none());
    assert!(toolkit.is_stopped());
    assert!(matches!(Toolkit::shutdown_default(), Err(ToolkitError::NotRunning)));
}

#[test]
fn test_unknown_component_is_an_error() {
    let mut tree = ComponentTree::new();
    let gone: ComponentId = tree.create_component("gone");
    tree.dispose(gone).unwrap();
    assert!(matches!(tree.set_visible(gone, false), Err(ToolkitError::UnknownComponent(_))));
}
