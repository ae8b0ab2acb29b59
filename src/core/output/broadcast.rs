//! Fan-out of output state to every live binding.
//!
//! `BroadcastGlobal` turns an accepted mutation into one event batch per
//! binding, each batch terminated by `done`. Passes iterate a snapshot of the
//! binding set taken at the start of the pass; bindings whose transport is
//! gone are skipped and pruned once the pass completes.

use crate::core::errors::{OutputError, Result};

use super::binding::{BindingSink, ClientBinding, OutputDeviceEvent};
use super::state::{OutputId, OutputState};

/// Event categories that can be re-sent independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Geometry,
    Scale,
    Edid,
    Enabled,
    Modes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Active,
    Removed,
}

pub struct BroadcastGlobal<S: BindingSink> {
    output: OutputId,
    bindings: Vec<ClientBinding<S>>,
    min_version: u32,
    phase: Phase,
}

impl<S: BindingSink> BroadcastGlobal<S> {
    pub fn new(output: OutputId, min_version: u32) -> Self {
        Self {
            output,
            bindings: Vec::new(),
            min_version: min_version.max(1),
            phase: Phase::Active,
        }
    }

    pub fn min_version(&self) -> u32 {
        self.min_version
    }

    pub fn is_removed(&self) -> bool {
        self.phase == Phase::Removed
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn bindings(&self) -> impl Iterator<Item = &ClientBinding<S>> {
        self.bindings.iter()
    }

    fn contains(&self, id: &S::Id) -> bool {
        self.bindings.iter().any(|b| &b.id() == id)
    }

    /// Register `sink` and replay the full state to it alone.
    pub(crate) fn bind(&mut self, state: &OutputState, sink: S) -> Result<()> {
        if self.phase == Phase::Removed {
            return Err(OutputError::GlobalRemoved);
        }
        if !state.initialized {
            return Err(OutputError::NotInitialized);
        }
        let binding = ClientBinding::new(sink);
        if binding.version() < self.min_version {
            return Err(OutputError::UnsupportedVersion {
                requested: binding.version(),
                minimum: self.min_version,
            });
        }
        if self.contains(&binding.id()) {
            tracing::warn!("{}: binding {:?} registered twice, ignoring", self.output, binding.id());
            return Ok(());
        }

        let sent = binding.send_batch(&full_state(state));
        crate::wlog!(crate::util::logging::OUTPUT,
            "{}: bound {:?} (version {}), replayed {} events",
            self.output, binding.id(), binding.version(), sent);
        self.bindings.push(binding);
        Ok(())
    }

    /// Drop the binding registered under `id`. Returns whether it existed.
    pub(crate) fn unbind(&mut self, id: &S::Id) -> bool {
        let before = self.bindings.len();
        self.bindings.retain(|b| &b.id() != id);
        let removed = self.bindings.len() < before;
        if removed {
            tracing::debug!("{}: unbound {:?}", self.output, id);
        }
        removed
    }

    /// Re-send `category` to every live binding. Returns the number of
    /// bindings that received a batch.
    pub(crate) fn broadcast(&mut self, state: &OutputState, category: Category) -> usize {
        if self.phase == Phase::Removed || !state.initialized {
            return 0;
        }
        let batch = category_events(state, category);
        let snapshot: Vec<ClientBinding<S>> = self.bindings.clone();
        let mut dead = Vec::new();
        let mut delivered = 0;

        for binding in &snapshot {
            if !binding.is_alive() {
                dead.push(binding.id());
                continue;
            }
            if binding.send_batch(&batch) > 0 {
                delivered += 1;
            }
        }

        if !dead.is_empty() {
            tracing::debug!("{}: pruning {} dead binding(s)", self.output, dead.len());
            self.bindings.retain(|b| !dead.contains(&b.id()));
        }

        tracing::debug!("{}: {:?} update delivered to {} binding(s)", self.output, category, delivered);
        delivered
    }

    /// Signal removal to every binding and stop accepting binds.
    pub(crate) fn remove(&mut self) {
        if self.phase == Phase::Removed {
            return;
        }
        self.phase = Phase::Removed;
        let bindings = std::mem::take(&mut self.bindings);
        for binding in bindings.iter().filter(|b| b.is_alive()) {
            binding.sink().removed();
        }
        crate::wlog!(crate::util::logging::OUTPUT,
            "{}: global removed, released {} binding(s)", self.output, bindings.len());
    }
}

fn geometry(state: &OutputState) -> OutputDeviceEvent {
    OutputDeviceEvent::Geometry {
        x: state.position.x,
        y: state.position.y,
        physical_width: state.physical_size.width,
        physical_height: state.physical_size.height,
        subpixel: state.subpixel,
        make: state.manufacturer.clone(),
        model: state.model.clone(),
        transform: state.transform,
    }
}

fn modes(state: &OutputState) -> Vec<OutputDeviceEvent> {
    state
        .modes
        .iter_flagged()
        .map(|(index, mode, flags)| OutputDeviceEvent::Mode {
            flags,
            width: mode.width,
            height: mode.height,
            refresh: mode.refresh,
            mode_id: index as i32,
        })
        .collect()
}

/// Events for one category, without the closing `done`.
pub(crate) fn category_events(state: &OutputState, category: Category) -> Vec<OutputDeviceEvent> {
    match category {
        Category::Geometry => vec![geometry(state)],
        Category::Scale => vec![OutputDeviceEvent::Scale(state.scale)],
        Category::Edid => vec![OutputDeviceEvent::Edid(state.edid.clone())],
        Category::Enabled => vec![OutputDeviceEvent::Enabled(state.enabled)],
        Category::Modes => modes(state),
    }
}

/// Bind-time replay in canonical order, without the closing `done`.
pub(crate) fn full_state(state: &OutputState) -> Vec<OutputDeviceEvent> {
    let mut events = vec![
        geometry(state),
        OutputDeviceEvent::Scale(state.scale),
        OutputDeviceEvent::Uuid(state.uuid.clone()),
        OutputDeviceEvent::Edid(state.edid.clone()),
        OutputDeviceEvent::Enabled(state.enabled),
    ];
    events.extend(modes(state));
    events
}
