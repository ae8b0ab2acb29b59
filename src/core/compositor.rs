//! Compositor harness.
//!
//! The `Compositor` struct owns the Wayland display and its listening
//! socket. It accepts clients, dispatches their requests, flushes queued
//! events, and advertises or retires one outputdevice global per output as
//! discovery reports changes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use wayland_server::backend::ClientId;
use wayland_server::Display;

use crate::config::ServerConfig;
use crate::core::discovery::{OutputChange, OutputDiscoveryFeed};
use crate::core::output::OutputId;
use crate::core::registry::LifecycleEvent;
use crate::core::socket_manager::SocketManager;
use crate::core::state::{ClientState, CompositorState};

// ============================================================================
// Compositor Events
// ============================================================================

/// Events emitted by the compositor for the host to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositorEvent {
    /// A new client connected
    ClientConnected { client_id: ClientId },
    /// An output global was advertised
    OutputAdded { output_id: OutputId },
    /// An output changed
    OutputChanged { output_id: OutputId },
    /// An output global was retired
    OutputRemoved { output_id: OutputId },
}

// ============================================================================
// Main Compositor
// ============================================================================

pub struct Compositor {
    /// Wayland display
    display: Display<CompositorState>,

    /// Listening sockets
    socket_manager: SocketManager,

    config: ServerConfig,

    next_client_id: u32,

    /// Event queue for the host
    events: Vec<CompositorEvent>,

    running: bool,
}

impl Compositor {
    /// Create the display and bind the configured socket.
    pub fn new(config: ServerConfig) -> Result<Self> {
        tracing::info!("Creating compositor with socket: {}", config.socket_name);

        let display = Display::new().context("Failed to create Wayland display")?;

        let runtime_dir = Self::ensure_runtime_dir()?;
        let mut socket_manager = SocketManager::new(&runtime_dir)?;
        let info = socket_manager.bind(&config.socket_name)?;
        crate::wlog!(crate::util::logging::COMPOSITOR, "Listening on: {}", info.path.display());

        Ok(Self {
            display,
            socket_manager,
            config,
            next_client_id: 1,
            events: Vec::new(),
            running: false,
        })
    }

    /// Fresh dispatch state matching this compositor's configuration.
    pub fn new_state(&self) -> CompositorState {
        CompositorState::with_version(self.config.min_version, self.config.version)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn start(&mut self) -> Result<()> {
        if self.running {
            bail!("compositor already running");
        }
        self.running = true;
        tracing::info!("Compositor started");
        Ok(())
    }

    /// Retire every output global, flush, and close the sockets.
    pub fn stop(&mut self, state: &mut CompositorState) -> Result<()> {
        if !self.running {
            bail!("compositor is not running");
        }
        let dh = self.display.handle();
        let ids: Vec<OutputId> = state.outputs.ids().collect();
        for id in ids {
            state.apply_change(&dh, &OutputChange::Removed { id });
        }
        if let Err(e) = self.display.flush_clients() {
            tracing::warn!("Error flushing clients during shutdown: {}", e);
        }
        self.socket_manager.close_all();
        self.running = false;
        tracing::info!("Compositor stopped");
        Ok(())
    }

    // =========================================================================
    // Event Processing
    // =========================================================================

    /// Apply pending discovery changes, advertising/retiring globals.
    pub fn poll_discovery(&mut self, state: &mut CompositorState, feed: &mut dyn OutputDiscoveryFeed) {
        let dh = self.display.handle();
        for event in state.poll_discovery(&dh, feed) {
            let event = match event {
                LifecycleEvent::Created(output_id) => CompositorEvent::OutputAdded { output_id },
                LifecycleEvent::Updated(output_id) => CompositorEvent::OutputChanged { output_id },
                LifecycleEvent::Removed(output_id) => CompositorEvent::OutputRemoved { output_id },
                LifecycleEvent::Ignored(_) => continue,
            };
            self.events.push(event);
        }
    }

    /// Accept pending client connections
    pub fn accept_connections(&mut self) {
        let mut dh = self.display.handle();
        while let Some(stream) = self.socket_manager.accept_any() {
            let id = self.next_client_id;
            self.next_client_id += 1;
            match dh.insert_client(stream, Arc::new(ClientState { id: Some(id) })) {
                Ok(client) => {
                    tracing::info!("Accepted client connection: {} (backend={:?})", id, client.id());
                    self.events.push(CompositorEvent::ClientConnected { client_id: client.id() });
                }
                Err(e) => tracing::error!("Failed to insert client: {}", e),
            }
        }
    }

    /// Accept, dispatch and flush once. Returns the number of dispatched requests.
    pub fn dispatch(&mut self, state: &mut CompositorState) -> Result<usize> {
        if !self.running {
            return Ok(0);
        }
        self.accept_connections();

        let dispatched = self
            .display
            .dispatch_clients(state)
            .context("Failed to dispatch Wayland events")?;

        let dh = self.display.handle();
        state.sweep_retired_globals(&dh, Instant::now());

        self.display.flush_clients().context("Failed to flush clients")?;
        Ok(dispatched)
    }

    /// Take all pending events (clears the internal queue)
    pub fn take_events(&mut self) -> Vec<CompositorEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Use XDG_RUNTIME_DIR, or create a private per-user directory.
    fn ensure_runtime_dir() -> Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
            if std::fs::metadata(&dir).is_ok() {
                return Ok(PathBuf::from(dir));
            }
        }

        let uid = unsafe { libc::getuid() };
        let runtime_dir = PathBuf::from(format!("/tmp/outputdevice-{}", uid));
        std::fs::create_dir_all(&runtime_dir)?;

        let mut perms = std::fs::metadata(&runtime_dir)?.permissions();
        perms.set_mode(0o700);
        std::fs::set_permissions(&runtime_dir, perms)?;

        std::env::set_var("XDG_RUNTIME_DIR", &runtime_dir);
        tracing::debug!("Created XDG_RUNTIME_DIR: {}", runtime_dir.display());
        Ok(runtime_dir)
    }
}
