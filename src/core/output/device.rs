//! The public output object: state plus the global that broadcasts it.

use bitflags::bitflags;

use crate::core::discovery::OutputDescriptor;
use crate::core::errors::{OutputError, Result};

use super::binding::BindingSink;
use super::broadcast::{BroadcastGlobal, Category};
use super::mode::{Mode, ModeTable};
use super::state::{OutputId, OutputState, PhysicalSize, Position, PowerState, Subpixel, Transform};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct Dirty: u8 {
        const GEOMETRY = 1 << 0;
        const SCALE = 1 << 1;
        const EDID = 1 << 2;
        const ENABLED = 1 << 3;
        const MODES = 1 << 4;
    }
}

impl Dirty {
    fn categories(self) -> impl Iterator<Item = Category> {
        [
            (Dirty::GEOMETRY, Category::Geometry),
            (Dirty::SCALE, Category::Scale),
            (Dirty::EDID, Category::Edid),
            (Dirty::ENABLED, Category::Enabled),
            (Dirty::MODES, Category::Modes),
        ]
        .into_iter()
        .filter(move |(flag, _)| self.contains(*flag))
        .map(|(_, category)| category)
    }
}

/// One display output as seen by the outputdevice protocol.
///
/// Every mutator is a no-op when the value is unchanged. Accepted changes
/// are re-sent to all bindings, one batch per affected category. Identity,
/// the mode list and the preferred mode freeze once [`initialize`] has run;
/// later attempts are logged and rejected.
///
/// [`initialize`]: OutputDevice::initialize
pub struct OutputDevice<S: BindingSink> {
    id: OutputId,
    state: OutputState,
    global: BroadcastGlobal<S>,
}

impl<S: BindingSink> OutputDevice<S> {
    pub fn new(id: OutputId, name: impl Into<String>, min_version: u32) -> Self {
        Self {
            id,
            state: OutputState::new(name),
            global: BroadcastGlobal::new(id, min_version),
        }
    }

    /// Build an uninitialized device carrying every attribute of `desc`.
    pub fn from_descriptor(id: OutputId, desc: &OutputDescriptor, min_version: u32) -> Self {
        let mut device = Self::new(id, desc.name.clone(), min_version);
        let state = &mut device.state;
        state.primary = desc.primary;
        if let Some(uuid) = &desc.uuid {
            state.uuid = uuid.clone();
        }
        state.enabled = desc.enabled;
        state.manufacturer = desc.manufacturer.clone();
        state.model = desc.model.clone();
        state.edid = desc.edid.clone();
        state.physical_size = desc.physical_size;
        state.position = desc.position;
        state.subpixel = desc.subpixel;
        state.transform = desc.transform;
        state.scale = desc.scale.max(1);
        state.power_state = desc.power_state;
        state.modes = ModeTable::from_modes(desc.modes.iter().copied());
        if let Some(index) = desc.preferred_mode.and_then(|i| device.locate(&desc.modes, i, "preferred")) {
            if let Err(e) = device.state.modes.set_preferred(Some(index)) {
                tracing::warn!("{}: ignoring preferred mode: {}", id, e);
            }
        }
        if let Some(index) = desc.current_mode.and_then(|i| device.locate(&desc.modes, i, "current")) {
            if let Err(e) = device.state.modes.set_current(Some(index)) {
                tracing::warn!("{}: ignoring current mode: {}", id, e);
            }
        }
        device
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Freeze identity and modes; from now on clients may bind.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state.initialized {
            return Err(OutputError::AlreadyInitialized);
        }
        if self.state.modes.is_empty() {
            tracing::warn!("{}: refusing to initialize without modes", self.id);
            return Err(OutputError::EmptyModeList);
        }
        if self.state.uuid.is_empty() {
            self.state.uuid = uuid::Uuid::new_v4().to_string();
        }
        self.state.initialized = true;
        crate::wlog!(crate::util::logging::OUTPUT,
            "{} ({}) initialized: uuid {}, {} mode(s)",
            self.id, self.state.name, self.state.uuid, self.state.modes.len());
        Ok(())
    }

    /// Register a new client binding and replay the full state to it.
    pub fn bind(&mut self, sink: S) -> Result<()> {
        self.global.bind(&self.state, sink)
    }

    pub fn unbind(&mut self, id: &S::Id) -> bool {
        self.global.unbind(id)
    }

    /// Announce removal to every binding. No further events are sent and
    /// new binds fail with [`OutputError::GlobalRemoved`].
    pub fn remove(&mut self) {
        self.global.remove();
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> OutputId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn is_initialized(&self) -> bool {
        self.state.initialized
    }

    pub fn is_removed(&self) -> bool {
        self.global.is_removed()
    }

    pub fn is_primary(&self) -> bool {
        self.state.primary
    }

    pub fn uuid(&self) -> &str {
        &self.state.uuid
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    pub fn manufacturer(&self) -> &str {
        &self.state.manufacturer
    }

    pub fn model(&self) -> &str {
        &self.state.model
    }

    pub fn edid(&self) -> &str {
        &self.state.edid
    }

    pub fn physical_size(&self) -> PhysicalSize {
        self.state.physical_size
    }

    pub fn position(&self) -> Position {
        self.state.position
    }

    pub fn subpixel(&self) -> Subpixel {
        self.state.subpixel
    }

    pub fn transform(&self) -> Transform {
        self.state.transform
    }

    pub fn scale(&self) -> i32 {
        self.state.scale
    }

    pub fn modes(&self) -> &ModeTable {
        &self.state.modes
    }

    pub fn current_mode_index(&self) -> Option<usize> {
        self.state.modes.current_index()
    }

    pub fn preferred_mode_index(&self) -> Option<usize> {
        self.state.modes.preferred_index()
    }

    pub fn power_state(&self) -> PowerState {
        self.state.power_state
    }

    pub fn binding_count(&self) -> usize {
        self.global.binding_count()
    }

    pub fn min_version(&self) -> u32 {
        self.global.min_version()
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    fn reject(&self, err: OutputError) -> OutputError {
        tracing::warn!("{} ({}): {}", self.id, self.state.name, err);
        err
    }

    /// Position in the mode table of the mode that `listed[index]` names.
    ///
    /// Discovery indices refer to its own list, which may contain duplicates
    /// or invalid entries the table dropped, so they are resolved by value.
    fn locate(&self, listed: &[Mode], index: usize, which: &str) -> Option<usize> {
        let found = listed.get(index).and_then(|mode| self.state.modes.position_of(mode));
        if found.is_none() {
            tracing::warn!(
                "{} ({}): {} mode index {} names no known mode, keeping the current one",
                self.id, self.state.name, which, index
            );
        }
        found
    }

    fn flush(&mut self, dirty: Dirty) {
        for category in dirty.categories() {
            self.global.broadcast(&self.state, category);
        }
    }

    fn update_uuid(&mut self, uuid: &str) -> Result<Dirty> {
        if self.state.uuid == uuid {
            return Ok(Dirty::empty());
        }
        if self.state.initialized {
            return Err(self.reject(OutputError::ImmutableAfterInit { field: "uuid" }));
        }
        self.state.uuid = uuid.to_string();
        Ok(Dirty::empty())
    }

    fn update_enabled(&mut self, enabled: bool) -> Dirty {
        if self.state.enabled == enabled {
            return Dirty::empty();
        }
        self.state.enabled = enabled;
        Dirty::ENABLED
    }

    fn update_manufacturer_model(&mut self, manufacturer: &str, model: &str) -> Dirty {
        let mut dirty = Dirty::empty();
        if self.state.manufacturer != manufacturer {
            self.state.manufacturer = manufacturer.to_string();
            dirty |= Dirty::GEOMETRY;
        }
        if self.state.model != model {
            self.state.model = model.to_string();
            dirty |= Dirty::GEOMETRY;
        }
        dirty
    }

    fn update_edid(&mut self, edid: &str) -> Dirty {
        if self.state.edid == edid {
            return Dirty::empty();
        }
        self.state.edid = edid.to_string();
        Dirty::EDID
    }

    fn update_geometry(&mut self, position: Position, physical_size: PhysicalSize) -> Dirty {
        let mut dirty = Dirty::empty();
        if self.state.position != position {
            self.state.position = position;
            dirty |= Dirty::GEOMETRY;
        }
        if self.state.physical_size != physical_size {
            self.state.physical_size = physical_size;
            dirty |= Dirty::GEOMETRY;
        }
        dirty
    }

    fn update_subpixel(&mut self, subpixel: Subpixel) -> Dirty {
        if self.state.subpixel == subpixel {
            return Dirty::empty();
        }
        self.state.subpixel = subpixel;
        Dirty::GEOMETRY
    }

    fn update_transform(&mut self, transform: Transform) -> Dirty {
        if self.state.transform == transform {
            return Dirty::empty();
        }
        self.state.transform = transform;
        Dirty::GEOMETRY
    }

    fn update_scale(&mut self, scale: i32) -> Result<Dirty> {
        if scale < 1 {
            return Err(self.reject(OutputError::InvalidScale(scale)));
        }
        if self.state.scale == scale {
            return Ok(Dirty::empty());
        }
        self.state.scale = scale;
        Ok(Dirty::SCALE)
    }

    fn update_modes(&mut self, modes: &[Mode]) -> Result<Dirty> {
        let table = ModeTable::from_modes(modes.iter().copied());
        if self.state.modes.modes() == table.modes() {
            return Ok(Dirty::empty());
        }
        if self.state.initialized {
            return Err(self.reject(OutputError::ImmutableAfterInit { field: "modes" }));
        }
        self.state.modes = table;
        Ok(Dirty::MODES)
    }

    fn update_current_mode(&mut self, index: usize) -> Result<Dirty> {
        match self.state.modes.set_current(Some(index)) {
            Ok(true) => Ok(Dirty::MODES),
            Ok(false) => Ok(Dirty::empty()),
            Err(e) => Err(self.reject(e)),
        }
    }

    fn update_preferred_mode(&mut self, index: usize) -> Result<Dirty> {
        if self.state.modes.preferred_index() == Some(index) {
            return Ok(Dirty::empty());
        }
        if self.state.initialized {
            return Err(self.reject(OutputError::ImmutableAfterInit { field: "preferred mode" }));
        }
        match self.state.modes.set_preferred(Some(index)) {
            Ok(_) => Ok(Dirty::MODES),
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Set the stable identifier. Only possible before initialization.
    pub fn set_uuid(&mut self, uuid: &str) -> Result<bool> {
        let changed = self.state.uuid != uuid;
        self.update_uuid(uuid)?;
        Ok(changed)
    }

    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        let dirty = self.update_enabled(enabled);
        self.flush(dirty);
        !dirty.is_empty()
    }

    pub fn set_manufacturer_model(&mut self, manufacturer: &str, model: &str) -> bool {
        let dirty = self.update_manufacturer_model(manufacturer, model);
        self.flush(dirty);
        !dirty.is_empty()
    }

    pub fn set_edid(&mut self, edid: &str) -> bool {
        let dirty = self.update_edid(edid);
        self.flush(dirty);
        !dirty.is_empty()
    }

    /// Update position and physical size together; one geometry batch at most.
    pub fn set_geometry(&mut self, position: Position, physical_size: PhysicalSize) -> bool {
        let dirty = self.update_geometry(position, physical_size);
        self.flush(dirty);
        !dirty.is_empty()
    }

    pub fn set_subpixel(&mut self, subpixel: Subpixel) -> bool {
        let dirty = self.update_subpixel(subpixel);
        self.flush(dirty);
        !dirty.is_empty()
    }

    pub fn set_transform(&mut self, transform: Transform) -> bool {
        let dirty = self.update_transform(transform);
        self.flush(dirty);
        !dirty.is_empty()
    }

    pub fn set_scale(&mut self, scale: i32) -> Result<bool> {
        let dirty = self.update_scale(scale)?;
        self.flush(dirty);
        Ok(!dirty.is_empty())
    }

    /// Replace the mode list. Only possible before initialization; both
    /// indices are reset to the first mode.
    pub fn set_modes(&mut self, modes: &[Mode]) -> Result<bool> {
        let dirty = self.update_modes(modes)?;
        self.flush(dirty);
        Ok(!dirty.is_empty())
    }

    pub fn set_current_mode(&mut self, index: usize) -> Result<bool> {
        let dirty = self.update_current_mode(index)?;
        self.flush(dirty);
        Ok(!dirty.is_empty())
    }

    /// Make the mode equal to `mode` current. Unknown modes are rejected.
    pub fn set_current_mode_by_value(&mut self, mode: &Mode) -> Result<bool> {
        match self.state.modes.position_of(mode) {
            Some(index) => self.set_current_mode(index),
            None => {
                tracing::debug!(
                    "{}: mode {}x{}@{} not in mode list, current mode unchanged",
                    self.id, mode.width, mode.height, mode.refresh
                );
                Ok(false)
            }
        }
    }

    /// Only possible before initialization.
    pub fn set_preferred_mode(&mut self, index: usize) -> Result<bool> {
        let dirty = self.update_preferred_mode(index)?;
        self.flush(dirty);
        Ok(!dirty.is_empty())
    }

    pub fn set_primary(&mut self, primary: bool) {
        self.state.primary = primary;
    }

    /// Convenience value for the presentation layer; not part of the protocol.
    pub fn set_power_state(&mut self, power_state: PowerState) {
        if self.state.power_state != power_state {
            tracing::debug!("{}: power state {:?} -> {:?}", self.id, self.state.power_state, power_state);
            self.state.power_state = power_state;
        }
    }

    /// Apply every attribute of `desc`, sending at most one batch per
    /// category. Differences in frozen fields are rejected individually.
    pub fn apply(&mut self, desc: &OutputDescriptor) {
        let mut dirty = Dirty::empty();

        // Rejections below are already logged by `reject`.
        if let Some(uuid) = &desc.uuid {
            self.update_uuid(uuid).ok();
        }
        if let Ok(d) = self.update_modes(&desc.modes) {
            dirty |= d;
        }
        if let Some(index) = desc.preferred_mode.and_then(|i| self.locate(&desc.modes, i, "preferred")) {
            if let Ok(d) = self.update_preferred_mode(index) {
                dirty |= d;
            }
        }
        if let Some(index) = desc.current_mode.and_then(|i| self.locate(&desc.modes, i, "current")) {
            if let Ok(d) = self.update_current_mode(index) {
                dirty |= d;
            }
        }
        dirty |= self.update_manufacturer_model(&desc.manufacturer, &desc.model);
        dirty |= self.update_geometry(desc.position, desc.physical_size);
        dirty |= self.update_subpixel(desc.subpixel);
        dirty |= self.update_transform(desc.transform);
        if let Ok(d) = self.update_scale(desc.scale) {
            dirty |= d;
        }
        dirty |= self.update_edid(&desc.edid);
        dirty |= self.update_enabled(desc.enabled);

        self.set_primary(desc.primary);
        self.set_power_state(desc.power_state);

        self.flush(dirty);
    }
}
