//! Output discovery boundary.
//!
//! Real hot-plug backends and the fake-output configuration both feed the
//! registry through [`OutputDiscoveryFeed`], each change carrying the full
//! attribute set of the output.

use std::collections::VecDeque;
use std::path::PathBuf;

use crate::core::output::{Mode, OutputId, PhysicalSize, Position, PowerState, Subpixel, Transform, UNKNOWN};

/// Everything discovery knows about one output.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDescriptor {
    pub name: String,
    pub primary: bool,
    pub manufacturer: String,
    pub model: String,
    pub edid: String,
    /// `None` lets the output generate its own identifier at initialization.
    pub uuid: Option<String>,
    pub enabled: bool,
    pub physical_size: PhysicalSize,
    pub position: Position,
    pub subpixel: Subpixel,
    pub transform: Transform,
    pub scale: i32,
    pub modes: Vec<Mode>,
    pub current_mode: Option<usize>,
    pub preferred_mode: Option<usize>,
    pub power_state: PowerState,
}

impl OutputDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary: false,
            manufacturer: UNKNOWN.to_string(),
            model: UNKNOWN.to_string(),
            edid: String::new(),
            uuid: None,
            enabled: true,
            physical_size: PhysicalSize::default(),
            position: Position::default(),
            subpixel: Subpixel::Unknown,
            transform: Transform::Normal,
            scale: 1,
            modes: Vec::new(),
            current_mode: None,
            preferred_mode: None,
            power_state: PowerState::On,
        }
    }
}

/// A notification from discovery.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputChange {
    Added { id: OutputId, descriptor: OutputDescriptor },
    Changed { id: OutputId, descriptor: OutputDescriptor },
    /// The output now runs `mode`; the matching entry of its mode list
    /// becomes current.
    ModeSwitched { id: OutputId, mode: Mode },
    Removed { id: OutputId },
}

impl OutputChange {
    pub fn id(&self) -> OutputId {
        match self {
            Self::Added { id, .. }
            | Self::Changed { id, .. }
            | Self::ModeSwitched { id, .. }
            | Self::Removed { id } => *id,
        }
    }
}

/// Source of output add/change/remove notifications.
pub trait OutputDiscoveryFeed {
    /// Drain the changes that arrived since the last call.
    fn poll_changes(&mut self) -> Vec<OutputChange>;
}

/// Push-based feed for hosts that learn about outputs on their own.
#[derive(Debug, Default)]
pub struct ManualFeed {
    pending: VecDeque<OutputChange>,
}

impl ManualFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: OutputChange) {
        self.pending.push_back(change);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl OutputDiscoveryFeed for ManualFeed {
    fn poll_changes(&mut self) -> Vec<OutputChange> {
        self.pending.drain(..).collect()
    }
}

/// Synthesizes outputs from a fake-output JSON file, once.
#[derive(Debug)]
pub struct FakeOutputFeed {
    path: PathBuf,
    loaded: bool,
}

impl FakeOutputFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), loaded: false }
    }
}

impl OutputDiscoveryFeed for FakeOutputFeed {
    fn poll_changes(&mut self) -> Vec<OutputChange> {
        if self.loaded {
            return Vec::new();
        }
        self.loaded = true;

        crate::config::load_fake_outputs(&self.path)
            .into_iter()
            .enumerate()
            .map(|(i, descriptor)| OutputChange::Added {
                id: OutputId(i as u32 + 1),
                descriptor,
            })
            .collect()
    }
}
