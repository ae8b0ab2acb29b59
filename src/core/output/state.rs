//! Authoritative per-output record.
//!
//! `OutputState` is the private half of an [`OutputDevice`](super::OutputDevice):
//! fields are only reachable through the device's accessors and mutators.

use std::fmt;

use super::mode::ModeTable;

/// Stable identifier of an output inside this compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(pub u32);

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "output-{}", self.0)
    }
}

/// Sentinel used for manufacturer and model until discovery fills them in.
pub const UNKNOWN: &str = "Unknown";

/// Physical pixel layout of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Subpixel {
    #[default]
    Unknown,
    None,
    HorizontalRgb,
    HorizontalBgr,
    VerticalRgb,
    VerticalBgr,
}

/// Rotation/mirroring applied to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transform {
    #[default]
    Normal,
    Rotate90,
    Rotate180,
    Rotate270,
    Flipped,
    Flipped90,
    Flipped180,
    Flipped270,
}

/// Display power state. Read by the presentation layer, never sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    #[default]
    On,
    Standby,
    Suspend,
    Off,
}

/// Top-left corner in compositor space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Physical size in millimeters; zero when unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhysicalSize {
    pub width: i32,
    pub height: i32,
}

impl PhysicalSize {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn is_unknown(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

#[derive(Debug, Clone)]
pub(crate) struct OutputState {
    pub(crate) initialized: bool,
    pub(crate) name: String,
    pub(crate) primary: bool,
    pub(crate) uuid: String,
    pub(crate) enabled: bool,
    pub(crate) manufacturer: String,
    pub(crate) model: String,
    pub(crate) edid: String,
    pub(crate) physical_size: PhysicalSize,
    pub(crate) position: Position,
    pub(crate) subpixel: Subpixel,
    pub(crate) transform: Transform,
    pub(crate) scale: i32,
    pub(crate) modes: ModeTable,
    pub(crate) power_state: PowerState,
}

impl OutputState {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            initialized: false,
            name: name.into(),
            primary: false,
            uuid: String::new(),
            enabled: true,
            manufacturer: UNKNOWN.to_string(),
            model: UNKNOWN.to_string(),
            edid: String::new(),
            physical_size: PhysicalSize::default(),
            position: Position::default(),
            subpixel: Subpixel::Unknown,
            transform: Transform::Normal,
            scale: 1,
            modes: ModeTable::new(),
            power_state: PowerState::On,
        }
    }
}
