use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::time::{Duration, Instant};

use wayland_client::protocol::wl_registry::{self, WlRegistry};
use wayland_client::{Connection, EventQueue, QueueHandle};
use wayland_server::Display;

use crate::core::discovery::OutputChange;
use crate::core::output::{Mode, OutputId};
use crate::core::registry::LifecycleEvent;
use crate::core::state::{ClientState, CompositorState};
use crate::core::wayland::output_device::GLOBAL_REMOVAL_DELAY;

use super::support::descriptor;

fn added(id: u32) -> OutputChange {
    OutputChange::Added { id: OutputId(id), descriptor: descriptor("Virtual-1") }
}

#[test]
fn test_compositor_state_init() {
    let state = CompositorState::new(1);
    assert!(state.outputs.is_empty());
    assert!(state.globals.is_empty());
    assert!(state.retiring.is_empty());
    assert_eq!(state.protocol_version, crate::config::PROTOCOL_VERSION);
}

#[test]
fn test_added_output_advertises_global() {
    let display = Display::<CompositorState>::new().unwrap();
    let dh = display.handle();
    let mut state = CompositorState::new(1);

    let event = state.apply_change(&dh, &OutputChange::Added {
        id: OutputId(1),
        descriptor: descriptor("Virtual-1"),
    });
    assert_eq!(event, LifecycleEvent::Created(OutputId(1)));
    assert!(state.globals.contains_key(&OutputId(1)));
    assert_eq!(state.outputs.len(), 1);
}

#[test]
fn test_ignored_output_has_no_global() {
    let display = Display::<CompositorState>::new().unwrap();
    let dh = display.handle();
    let mut state = CompositorState::new(1);

    let mut desc = descriptor("Broken");
    desc.modes = vec![Mode::new(0, 0, 0)];
    let event = state.apply_change(&dh, &OutputChange::Added { id: OutputId(1), descriptor: desc });
    assert_eq!(event, LifecycleEvent::Ignored(OutputId(1)));
    assert!(state.globals.is_empty());
}

#[test]
fn test_removed_output_global_is_retired_then_destroyed() {
    let display = Display::<CompositorState>::new().unwrap();
    let dh = display.handle();
    let mut state = CompositorState::new(1);

    state.apply_change(&dh, &OutputChange::Added {
        id: OutputId(1),
        descriptor: descriptor("Virtual-1"),
    });
    let event = state.apply_change(&dh, &OutputChange::Removed { id: OutputId(1) });
    assert_eq!(event, LifecycleEvent::Removed(OutputId(1)));
    assert!(state.globals.is_empty());
    assert_eq!(state.retiring.len(), 1);

    assert_eq!(state.sweep_retired_globals(&dh, Instant::now()), 0);
    assert_eq!(state.retiring.len(), 1);

    let later = Instant::now() + GLOBAL_REMOVAL_DELAY + Duration::from_secs(1);
    assert_eq!(state.sweep_retired_globals(&dh, later), 1);
    assert!(state.retiring.is_empty());
}

#[test]
fn test_mode_switch_keeps_global() {
    let display = Display::<CompositorState>::new().unwrap();
    let dh = display.handle();
    let mut state = CompositorState::new(1);

    state.apply_change(&dh, &OutputChange::Added {
        id: OutputId(1),
        descriptor: descriptor("Virtual-1"),
    });
    let global = state.globals.get(&OutputId(1)).cloned();
    let event = state.apply_change(&dh, &OutputChange::ModeSwitched {
        id: OutputId(1),
        mode: Mode::new(1280, 720, 60000),
    });
    assert_eq!(event, LifecycleEvent::Updated(OutputId(1)));
    assert_eq!(state.globals.get(&OutputId(1)).cloned(), global);
    assert!(state.retiring.is_empty());
}

#[test]
fn test_readded_output_gets_new_generation() {
    let display = Display::<CompositorState>::new().unwrap();
    let dh = display.handle();
    let mut state = CompositorState::new(1);

    state.apply_change(&dh, &added(1));
    let old = state.globals[&OutputId(1)].data;
    assert!(state.is_current_global(&old));

    state.apply_change(&dh, &OutputChange::Removed { id: OutputId(1) });
    assert!(!state.is_current_global(&old));

    state.apply_change(&dh, &added(1));
    let new = state.globals[&OutputId(1)].data;
    assert_ne!(old.generation, new.generation);
    assert!(!state.is_current_global(&old));
    assert!(state.is_current_global(&new));
    assert_eq!(state.retiring.len(), 1);
}

// ============================================================================
// Client connection
// ============================================================================

mod client_protocol {
    #![allow(dead_code, non_camel_case_types, unused_unsafe, unused_variables)]
    #![allow(non_upper_case_globals, non_snake_case, unused_imports)]
    use wayland_client;
    use wayland_client::protocol::*;

    pub mod __interfaces {
        use wayland_client::protocol::__interfaces::*;
        wayland_scanner::generate_interfaces!("protocols/outputdevice.xml");
    }
    use self::__interfaces::*;

    wayland_scanner::generate_client_code!("protocols/outputdevice.xml");
}

use client_protocol::org_kde_kwin_outputdevice::{self as client_device, OrgKdeKwinOutputdevice as ClientDevice};

const INTERFACE: &str = "org_kde_kwin_outputdevice";

#[derive(Default)]
struct TestClient {
    globals: Vec<(u32, String)>,
    done: usize,
    scale: Option<i32>,
}

impl wayland_client::Dispatch<WlRegistry, ()> for TestClient {
    fn event(
        state: &mut Self,
        _registry: &WlRegistry,
        event: wl_registry::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_registry::Event::Global { name, interface, .. } = event {
            state.globals.push((name, interface));
        }
    }
}

impl wayland_client::Dispatch<ClientDevice, ()> for TestClient {
    fn event(
        state: &mut Self,
        _device: &ClientDevice,
        event: client_device::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            client_device::Event::Done => state.done += 1,
            client_device::Event::Scale { factor } => state.scale = Some(factor),
            _ => {}
        }
    }
}

/// Server display and one in-process client over a socket pair.
struct Session {
    display: Display<CompositorState>,
    state: CompositorState,
    conn: Connection,
    queue: EventQueue<TestClient>,
    registry: WlRegistry,
    client: TestClient,
}

impl Session {
    fn new(min_version: u32) -> Self {
        let display = Display::<CompositorState>::new().unwrap();
        let mut state = CompositorState::new(min_version);
        state.apply_change(&display.handle(), &added(1));

        let (server_end, client_end) = UnixStream::pair().unwrap();
        display
            .handle()
            .insert_client(server_end, Arc::new(ClientState::default()))
            .unwrap();
        let conn = Connection::from_socket(client_end).unwrap();
        let queue = conn.new_event_queue();
        let registry = conn.display().get_registry(&queue.handle(), ());

        let mut session = Self { display, state, conn, queue, registry, client: TestClient::default() };
        session.roundtrip();
        session
    }

    /// Exchange pending requests and events until both sides are idle.
    fn roundtrip(&mut self) {
        for _ in 0..4 {
            let _ = self.conn.flush();
            self.display.dispatch_clients(&mut self.state).unwrap();
            self.display.flush_clients().unwrap();
            if let Some(guard) = self.queue.prepare_read() {
                let _ = guard.read();
            }
            let _ = self.queue.dispatch_pending(&mut self.client);
        }
    }

    fn first_global(&self) -> u32 {
        self.client
            .globals
            .iter()
            .find(|(_, interface)| interface == INTERFACE)
            .map(|(name, _)| *name)
            .unwrap()
    }

    fn bind(&mut self, name: u32, version: u32) -> ClientDevice {
        let device = self.registry.bind::<ClientDevice, _, _>(name, version, &self.queue.handle(), ());
        self.roundtrip();
        device
    }

    fn binding_count(&self) -> usize {
        self.state.outputs.get(OutputId(1)).unwrap().binding_count()
    }
}

#[test]
fn test_client_bind_receives_state_and_updates() {
    let mut session = Session::new(1);
    let name = session.first_global();
    let device = session.bind(name, 2);
    assert_eq!(session.client.done, 1);
    assert_eq!(session.client.scale, Some(1));
    assert_eq!(session.binding_count(), 1);

    session.state.outputs.get_mut(OutputId(1)).unwrap().set_scale(2).unwrap();
    session.roundtrip();
    assert_eq!(session.client.scale, Some(2));
    assert_eq!(session.client.done, 2);

    device.release();
    session.roundtrip();
    assert_eq!(session.binding_count(), 0);
    assert!(session.conn.protocol_error().is_none());
}

#[test]
fn test_client_bind_below_minimum_version_is_rejected() {
    let mut session = Session::new(2);
    let name = session.first_global();
    let _device = session.bind(name, 1);

    let error = session.conn.protocol_error().expect("client should observe a protocol error");
    assert_eq!(error.object_interface, INTERFACE);
    assert_eq!(error.code, 0);
    assert_eq!(session.client.done, 0);
    assert_eq!(session.binding_count(), 0);
}

#[test]
fn test_client_bind_on_retired_global_is_inert() {
    let mut session = Session::new(1);
    let stale = session.first_global();

    let dh = session.display.handle();
    session.state.apply_change(&dh, &OutputChange::Removed { id: OutputId(1) });
    session.state.apply_change(&dh, &added(1));

    let _device = session.bind(stale, 2);
    assert!(session.conn.protocol_error().is_none());
    assert_eq!(session.client.done, 0);
    assert_eq!(session.binding_count(), 0);
}
