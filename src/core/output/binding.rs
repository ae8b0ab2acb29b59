//! Client bindings and the events delivered to them.

use std::fmt::Debug;
use std::hash::Hash;

use super::mode::ModeFlags;
use super::state::{Subpixel, Transform};

/// First protocol version carrying `edid`, `enabled` and `uuid`.
pub const IDENTITY_SINCE: u32 = 2;

/// One wire event of the outputdevice protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDeviceEvent {
    Geometry {
        x: i32,
        y: i32,
        physical_width: i32,
        physical_height: i32,
        subpixel: Subpixel,
        make: String,
        model: String,
        transform: Transform,
    },
    Scale(i32),
    Uuid(String),
    Edid(String),
    Enabled(bool),
    Mode {
        flags: ModeFlags,
        width: i32,
        height: i32,
        refresh: i32,
        mode_id: i32,
    },
    /// Synchronization marker closing a batch.
    Done,
}

impl OutputDeviceEvent {
    /// Protocol version that introduced this event.
    pub fn since(&self) -> u32 {
        match self {
            Self::Uuid(_) | Self::Edid(_) | Self::Enabled(_) => IDENTITY_SINCE,
            _ => 1,
        }
    }
}

/// Transport end of one binding.
///
/// Sending is fire-and-forget: the transport queues the event and applies
/// its own backpressure. A sink whose client went away reports
/// `is_alive() == false` and is pruned on the next broadcast.
pub trait BindingSink: Clone {
    type Id: Clone + Eq + Hash + Debug;

    fn id(&self) -> Self::Id;

    /// Negotiated protocol version.
    fn version(&self) -> u32;

    fn is_alive(&self) -> bool;

    fn send(&self, event: &OutputDeviceEvent);

    /// The global is going away; no events follow this call.
    fn removed(&self);
}

/// A client's live subscription to one output global.
#[derive(Debug, Clone)]
pub struct ClientBinding<S> {
    sink: S,
    version: u32,
}

impl<S: BindingSink> ClientBinding<S> {
    pub fn new(sink: S) -> Self {
        let version = sink.version();
        Self { sink, version }
    }

    pub fn id(&self) -> S::Id {
        self.sink.id()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn is_alive(&self) -> bool {
        self.sink.is_alive()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Whether this binding may legally receive `event`.
    pub fn accepts(&self, event: &OutputDeviceEvent) -> bool {
        event.since() <= self.version
    }

    /// Deliver `batch` followed by `done`, skipping events newer than the
    /// negotiated version. Returns the number of events sent; a batch that is
    /// entirely gated out sends nothing, not even `done`.
    pub fn send_batch(&self, batch: &[OutputDeviceEvent]) -> usize {
        let mut sent = 0;
        for event in batch.iter().filter(|e| self.accepts(e)) {
            self.sink.send(event);
            sent += 1;
        }
        if sent > 0 {
            self.sink.send(&OutputDeviceEvent::Done);
            sent += 1;
        }
        sent
    }
}
