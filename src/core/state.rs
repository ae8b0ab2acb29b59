//! Global compositor state.
//!
//! `CompositorState` is the dispatch state of the Wayland display. It owns
//! the output registry and the protocol globals advertised for each output.
//! All mutation and all broadcast happen on the thread that dispatches the
//! display.

use std::collections::HashMap;
use std::time::Instant;

use wayland_server::backend::{ClientData, ClientId, DisconnectReason};
use wayland_server::DisplayHandle;

use crate::config::PROTOCOL_VERSION;
use crate::core::discovery::{OutputChange, OutputDiscoveryFeed};
use crate::core::output::OutputId;
use crate::core::registry::{LifecycleEvent, OutputRegistry};
use crate::core::wayland::output_device::{
    self, AdvertisedGlobal, OutputDeviceGlobal, OutputDeviceHandle, RetiringGlobals,
};

// ============================================================================
// Client State
// ============================================================================

/// Data stored with each Wayland client
#[derive(Debug, Default, Clone)]
pub struct ClientState {
    /// Client identifier
    pub id: Option<u32>,
}

impl ClientData for ClientState {
    fn initialized(&self, client_id: ClientId) {
        tracing::info!("Client initialized: {:?}", client_id);
    }

    fn disconnected(&self, client_id: ClientId, reason: DisconnectReason) {
        let reason_str = match reason {
            DisconnectReason::ConnectionClosed => "connection closed",
            DisconnectReason::ProtocolError(_) => "protocol error",
        };
        tracing::info!("Client disconnected: {:?} ({})", client_id, reason_str);
    }
}

// ============================================================================
// Main Compositor State
// ============================================================================

pub struct CompositorState {
    /// Every known output and its bindings
    pub outputs: OutputRegistry<OutputDeviceHandle>,

    /// Advertised outputdevice global per output
    pub globals: HashMap<OutputId, AdvertisedGlobal>,

    next_generation: u64,

    /// Disabled globals waiting for destruction
    pub retiring: RetiringGlobals,

    /// Version advertised on new globals
    pub protocol_version: u32,
}

impl CompositorState {
    pub fn new(min_version: u32) -> Self {
        Self::with_version(min_version, PROTOCOL_VERSION)
    }

    pub fn with_version(min_version: u32, protocol_version: u32) -> Self {
        Self {
            outputs: OutputRegistry::new(min_version),
            globals: HashMap::new(),
            next_generation: 1,
            retiring: RetiringGlobals::default(),
            protocol_version,
        }
    }

    /// Apply one discovery change and create or retire the matching global.
    pub fn apply_change(&mut self, dh: &DisplayHandle, change: &OutputChange) -> LifecycleEvent {
        let event = self.outputs.handle_change(change);
        match event {
            LifecycleEvent::Created(id) => {
                let data = OutputDeviceGlobal { output_id: id, generation: self.next_generation };
                self.next_generation += 1;
                let advertised = output_device::create_global(dh, data, self.protocol_version);
                if let Some(stale) = self.globals.insert(id, advertised) {
                    output_device::retire_global(dh, &mut self.retiring, stale.global);
                }
            }
            LifecycleEvent::Removed(id) => {
                if let Some(advertised) = self.globals.remove(&id) {
                    output_device::retire_global(dh, &mut self.retiring, advertised.global);
                    crate::wlog!(crate::util::logging::DISCOVERY, "{} removed, global retired", id);
                }
            }
            LifecycleEvent::Updated(_) | LifecycleEvent::Ignored(_) => {}
        }
        event
    }

    /// Whether `data` belongs to the global currently advertised for its output.
    pub fn is_current_global(&self, data: &OutputDeviceGlobal) -> bool {
        self.globals
            .get(&data.output_id)
            .map_or(false, |advertised| advertised.data == *data)
    }

    /// Drain `feed` and apply every change in arrival order.
    pub fn poll_discovery(&mut self, dh: &DisplayHandle, feed: &mut dyn OutputDiscoveryFeed) -> Vec<LifecycleEvent> {
        feed.poll_changes()
            .iter()
            .map(|change| self.apply_change(dh, change))
            .collect()
    }

    /// Destroy retired globals whose grace period has ended.
    pub fn sweep_retired_globals(&mut self, dh: &DisplayHandle, now: Instant) -> usize {
        output_device::destroy_expired_globals(dh, &mut self.retiring, now)
    }
}
