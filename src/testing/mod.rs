//! Headless testing support: a pilot that drives dispatch on the test
//! thread, and recording doubles for peers and listeners.

pub mod pilot;
pub mod recording;

pub use pilot::Pilot;
pub use recording::{Delivered, DeliveryLog, PeerCall, RecordingListener, RecordingPeer};
