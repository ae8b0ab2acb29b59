//! Per-output lifecycle: one [`OutputDevice`] per discovered output.

use std::collections::BTreeMap;

use crate::core::discovery::{OutputChange, OutputDescriptor, OutputDiscoveryFeed};
use crate::core::errors::{OutputError, Result};
use crate::core::output::{
    BindingSink, Mode, OutputDevice, OutputId, PhysicalSize, Position, PowerState, Subpixel, Transform,
};

/// What the registry did with a change; the caller uses it to create or
/// retire the matching protocol global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Created(OutputId),
    Updated(OutputId),
    Removed(OutputId),
    Ignored(OutputId),
}

/// Read-only view of an output for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSummary {
    pub id: OutputId,
    pub name: String,
    pub primary: bool,
    pub enabled: bool,
    pub position: Position,
    /// Resolution of the current mode, if any.
    pub size: Option<(i32, i32)>,
    pub physical_size: PhysicalSize,
    pub scale: i32,
    pub transform: Transform,
    pub subpixel: Subpixel,
    pub current_mode_index: Option<usize>,
    pub preferred_mode_index: Option<usize>,
    pub power_state: PowerState,
}

impl<S: BindingSink> From<&OutputDevice<S>> for OutputSummary {
    fn from(device: &OutputDevice<S>) -> Self {
        Self {
            id: device.id(),
            name: device.name().to_string(),
            primary: device.is_primary(),
            enabled: device.is_enabled(),
            position: device.position(),
            size: device.modes().current_mode().map(|m| (m.width, m.height)),
            physical_size: device.physical_size(),
            scale: device.scale(),
            transform: device.transform(),
            subpixel: device.subpixel(),
            current_mode_index: device.current_mode_index(),
            preferred_mode_index: device.preferred_mode_index(),
            power_state: device.power_state(),
        }
    }
}

pub struct OutputRegistry<S: BindingSink> {
    outputs: BTreeMap<OutputId, OutputDevice<S>>,
    min_version: u32,
}

impl<S: BindingSink> OutputRegistry<S> {
    pub fn new(min_version: u32) -> Self {
        Self {
            outputs: BTreeMap::new(),
            min_version,
        }
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn get(&self, id: OutputId) -> Option<&OutputDevice<S>> {
        self.outputs.get(&id)
    }

    pub fn get_mut(&mut self, id: OutputId) -> Option<&mut OutputDevice<S>> {
        self.outputs.get_mut(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = OutputId> + '_ {
        self.outputs.keys().copied()
    }

    pub fn primary(&self) -> Option<&OutputDevice<S>> {
        self.outputs.values().find(|o| o.is_primary())
    }

    pub fn summaries(&self) -> Vec<OutputSummary> {
        self.outputs.values().map(OutputSummary::from).collect()
    }

    /// Create and initialize an output. An output that cannot be
    /// initialized is discarded.
    pub fn add(&mut self, id: OutputId, descriptor: &OutputDescriptor) -> Result<()> {
        if self.outputs.contains_key(&id) {
            tracing::warn!("{} already registered, treating add as change", id);
            self.change(id, descriptor)?;
            return Ok(());
        }
        let mut device = OutputDevice::from_descriptor(id, descriptor, self.min_version);
        if let Err(e) = device.initialize() {
            tracing::warn!("Skipping {} ({}): {}", id, descriptor.name, e);
            return Err(e);
        }
        self.outputs.insert(id, device);
        Ok(())
    }

    pub fn change(&mut self, id: OutputId, descriptor: &OutputDescriptor) -> Result<()> {
        let device = self.outputs.get_mut(&id).ok_or(OutputError::UnknownOutput(id))?;
        device.apply(descriptor);
        Ok(())
    }

    pub fn switch_mode(&mut self, id: OutputId, mode: &Mode) -> Result<bool> {
        let device = self.outputs.get_mut(&id).ok_or(OutputError::UnknownOutput(id))?;
        device.set_current_mode_by_value(mode)
    }

    /// Signal removal to all bindings of the output, then drop it.
    pub fn remove(&mut self, id: OutputId) -> Result<()> {
        let mut device = self.outputs.remove(&id).ok_or(OutputError::UnknownOutput(id))?;
        device.remove();
        Ok(())
    }

    /// Apply one discovery change. Failures are logged, never propagated.
    pub fn handle_change(&mut self, change: &OutputChange) -> LifecycleEvent {
        let id = change.id();
        let result = match change {
            OutputChange::Added { id, descriptor } => {
                let existed = self.outputs.contains_key(id);
                self.add(*id, descriptor).map(|_| {
                    if existed {
                        LifecycleEvent::Updated(*id)
                    } else {
                        LifecycleEvent::Created(*id)
                    }
                })
            }
            OutputChange::Changed { id, descriptor } => {
                self.change(*id, descriptor).map(|_| LifecycleEvent::Updated(*id))
            }
            OutputChange::ModeSwitched { id, mode } => {
                self.switch_mode(*id, mode).map(|_| LifecycleEvent::Updated(*id))
            }
            OutputChange::Removed { id } => self.remove(*id).map(|_| LifecycleEvent::Removed(*id)),
        };
        match result {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Discovery change for {} ignored: {}", id, e);
                LifecycleEvent::Ignored(id)
            }
        }
    }

    /// Drain `feed` and apply every change in arrival order.
    pub fn poll(&mut self, feed: &mut dyn OutputDiscoveryFeed) -> Vec<LifecycleEvent> {
        feed.poll_changes()
            .iter()
            .map(|change| self.handle_change(change))
            .collect()
    }

    /// Register a binding on output `id`.
    pub fn bind(&mut self, id: OutputId, sink: S) -> Result<()> {
        let device = self.outputs.get_mut(&id).ok_or(OutputError::GlobalRemoved)?;
        device.bind(sink)
    }

    pub fn unbind(&mut self, id: OutputId, binding: &S::Id) -> bool {
        self.outputs
            .get_mut(&id)
            .map(|device| device.unbind(binding))
            .unwrap_or(false)
    }
}
