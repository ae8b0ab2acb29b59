//! org_kde_kwin_outputdevice protocol implementation.
//!
//! One global per output. Binding replays the full output state to the new
//! resource; later changes reach every bound resource through the output's
//! broadcast. Removing an output disables its global (clients receive
//! wl_registry.global_remove) and destroys it after a grace period.

use std::time::{Duration, Instant};

use wayland_server::{
    backend::{ClientId, GlobalId, ObjectId},
    Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New, Resource,
};

use crate::core::errors::OutputError;
use crate::core::output::{BindingSink, ModeFlags, OutputDeviceEvent, OutputId, Subpixel, Transform};
use crate::core::state::CompositorState;
use crate::core::wayland::protocol::server::org_kde_kwin_outputdevice::{
    self, Enablement, OrgKdeKwinOutputdevice,
};

/// Time a disabled global stays around so clients can process its removal.
pub const GLOBAL_REMOVAL_DELAY: Duration = Duration::from_secs(10);

/// Global data - references an output by ID
///
/// `generation` tells apart successive globals advertised for the same
/// output id, so a bind on a retired global never reaches a newer device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputDeviceGlobal {
    pub output_id: OutputId,
    pub generation: u64,
}

/// The global currently advertised for an output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisedGlobal {
    pub global: GlobalId,
    pub data: OutputDeviceGlobal,
}

/// Data stored with each bound outputdevice resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputDeviceData {
    pub output_id: OutputId,
}

/// Globals that have been disabled and await destruction.
#[derive(Debug, Default)]
pub struct RetiringGlobals {
    pending: Vec<(GlobalId, Instant)>,
}

impl RetiringGlobals {
    pub fn push(&mut self, global: GlobalId) {
        self.pending.push((global, Instant::now() + GLOBAL_REMOVAL_DELAY));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every global whose grace period has elapsed at `now`.
    pub fn take_expired(&mut self, now: Instant) -> Vec<GlobalId> {
        let (expired, pending): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|(_, deadline)| *deadline <= now);
        self.pending = pending;
        expired.into_iter().map(|(global, _)| global).collect()
    }
}

// ============================================================================
// Transport
// ============================================================================

/// A bound outputdevice resource as seen by the output broadcast.
#[derive(Debug, Clone)]
pub struct OutputDeviceHandle {
    resource: OrgKdeKwinOutputdevice,
}

impl OutputDeviceHandle {
    pub fn new(resource: OrgKdeKwinOutputdevice) -> Self {
        Self { resource }
    }

    pub fn resource(&self) -> &OrgKdeKwinOutputdevice {
        &self.resource
    }
}

fn wire_subpixel(subpixel: Subpixel) -> org_kde_kwin_outputdevice::Subpixel {
    use org_kde_kwin_outputdevice::Subpixel as Wire;
    match subpixel {
        Subpixel::Unknown => Wire::Unknown,
        Subpixel::None => Wire::None,
        Subpixel::HorizontalRgb => Wire::HorizontalRgb,
        Subpixel::HorizontalBgr => Wire::HorizontalBgr,
        Subpixel::VerticalRgb => Wire::VerticalRgb,
        Subpixel::VerticalBgr => Wire::VerticalBgr,
    }
}

fn wire_transform(transform: Transform) -> org_kde_kwin_outputdevice::Transform {
    use org_kde_kwin_outputdevice::Transform as Wire;
    match transform {
        Transform::Normal => Wire::Normal,
        Transform::Rotate90 => Wire::_90,
        Transform::Rotate180 => Wire::_180,
        Transform::Rotate270 => Wire::_270,
        Transform::Flipped => Wire::Flipped,
        Transform::Flipped90 => Wire::Flipped90,
        Transform::Flipped180 => Wire::Flipped180,
        Transform::Flipped270 => Wire::Flipped270,
    }
}

fn wire_mode_flags(flags: ModeFlags) -> org_kde_kwin_outputdevice::Mode {
    use org_kde_kwin_outputdevice::Mode as Wire;
    let mut wire = Wire::empty();
    if flags.contains(ModeFlags::CURRENT) {
        wire |= Wire::Current;
    }
    if flags.contains(ModeFlags::PREFERRED) {
        wire |= Wire::Preferred;
    }
    wire
}

impl BindingSink for OutputDeviceHandle {
    type Id = ObjectId;

    fn id(&self) -> ObjectId {
        self.resource.id()
    }

    fn version(&self) -> u32 {
        self.resource.version()
    }

    fn is_alive(&self) -> bool {
        self.resource.is_alive()
    }

    fn send(&self, event: &OutputDeviceEvent) {
        let output = &self.resource;
        match event {
            OutputDeviceEvent::Geometry {
                x,
                y,
                physical_width,
                physical_height,
                subpixel,
                make,
                model,
                transform,
            } => output.geometry(
                *x,
                *y,
                *physical_width,
                *physical_height,
                wire_subpixel(*subpixel),
                make.clone(),
                model.clone(),
                wire_transform(*transform),
            ),
            OutputDeviceEvent::Scale(factor) => output.scale(*factor),
            OutputDeviceEvent::Uuid(uuid) => output.uuid(uuid.clone()),
            OutputDeviceEvent::Edid(edid) => output.edid(edid.clone()),
            OutputDeviceEvent::Enabled(enabled) => output.enabled(if *enabled {
                Enablement::Enabled
            } else {
                Enablement::Disabled
            }),
            OutputDeviceEvent::Mode { flags, width, height, refresh, mode_id } => {
                output.mode(wire_mode_flags(*flags), *width, *height, *refresh, *mode_id)
            }
            OutputDeviceEvent::Done => output.done(),
        }
    }

    fn removed(&self) {
        // The removal itself reaches the client as wl_registry.global_remove.
        tracing::debug!("outputdevice {:?} released by global removal", self.resource.id());
    }
}

// ============================================================================
// Global lifecycle
// ============================================================================

/// Advertise the outputdevice global described by `data`.
pub fn create_global(dh: &DisplayHandle, data: OutputDeviceGlobal, version: u32) -> AdvertisedGlobal {
    let global = dh.create_global::<CompositorState, OrgKdeKwinOutputdevice, _>(version, data);
    crate::wlog!(crate::util::logging::PROTOCOL,
        "Created org_kde_kwin_outputdevice v{} for {} (generation {})",
        version, data.output_id, data.generation);
    AdvertisedGlobal { global, data }
}

/// Stop advertising `global`; it is destroyed once its grace period ends.
pub fn retire_global(dh: &DisplayHandle, retiring: &mut RetiringGlobals, global: GlobalId) {
    dh.disable_global::<CompositorState>(global.clone());
    retiring.push(global);
}

/// Destroy retired globals whose grace period has elapsed.
pub fn destroy_expired_globals(dh: &DisplayHandle, retiring: &mut RetiringGlobals, now: Instant) -> usize {
    let expired = retiring.take_expired(now);
    let count = expired.len();
    for global in expired {
        dh.remove_global::<CompositorState>(global);
    }
    if count > 0 {
        tracing::debug!("Destroyed {} retired outputdevice global(s)", count);
    }
    count
}

// ============================================================================
// org_kde_kwin_outputdevice
// ============================================================================

impl GlobalDispatch<OrgKdeKwinOutputdevice, OutputDeviceGlobal> for CompositorState {
    fn bind(
        state: &mut Self,
        _handle: &DisplayHandle,
        client: &Client,
        resource: New<OrgKdeKwinOutputdevice>,
        global_data: &OutputDeviceGlobal,
        data_init: &mut DataInit<'_, Self>,
    ) {
        let output_id = global_data.output_id;
        let output = data_init.init(resource, OutputDeviceData { output_id });

        if !state.is_current_global(global_data) {
            tracing::debug!(
                "org_kde_kwin_outputdevice bind on retired global for {} (generation {}) left inert",
                output_id, global_data.generation
            );
            return;
        }

        match state.outputs.bind(output_id, OutputDeviceHandle::new(output.clone())) {
            Ok(()) => {
                tracing::debug!(
                    "Bound org_kde_kwin_outputdevice v{} for client {:?} on {}",
                    output.version(), client.id(), output_id
                );
            }
            Err(OutputError::UnsupportedVersion { requested, minimum }) => {
                tracing::warn!(
                    "Rejecting org_kde_kwin_outputdevice v{} from client {:?} (minimum v{})",
                    requested, client.id(), minimum
                );
                output.post_error(
                    0u32,
                    format!("outputdevice version {} is below the minimum supported version {}", requested, minimum),
                );
            }
            Err(e) => {
                // Raced with output removal: the resource stays inert.
                tracing::debug!("org_kde_kwin_outputdevice bind on {} left inert: {}", output_id, e);
            }
        }
    }
}

impl Dispatch<OrgKdeKwinOutputdevice, OutputDeviceData> for CompositorState {
    fn request(
        state: &mut Self,
        client: &Client,
        resource: &OrgKdeKwinOutputdevice,
        request: org_kde_kwin_outputdevice::Request,
        data: &OutputDeviceData,
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        match request {
            org_kde_kwin_outputdevice::Request::Release => {
                state.outputs.unbind(data.output_id, &resource.id());
                tracing::debug!("org_kde_kwin_outputdevice released by client {:?}", client.id());
            }
            _ => {}
        }
    }

    fn destroyed(
        state: &mut Self,
        _client: ClientId,
        resource: &OrgKdeKwinOutputdevice,
        data: &OutputDeviceData,
    ) {
        state.outputs.unbind(data.output_id, &resource.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_mode_flags() {
        use org_kde_kwin_outputdevice::Mode as Wire;
        assert_eq!(wire_mode_flags(ModeFlags::empty()), Wire::empty());
        assert_eq!(
            wire_mode_flags(ModeFlags::CURRENT | ModeFlags::PREFERRED),
            Wire::Current | Wire::Preferred
        );
    }

    #[test]
    fn test_wire_transform() {
        use org_kde_kwin_outputdevice::Transform as Wire;
        assert_eq!(wire_transform(Transform::Rotate90), Wire::_90);
        assert_eq!(wire_transform(Transform::Flipped270), Wire::Flipped270);
    }
}
