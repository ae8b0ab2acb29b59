//! In-memory binding transport for tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::core::discovery::OutputDescriptor;
use crate::core::output::{BindingSink, Mode, OutputDevice, OutputDeviceEvent, OutputId};

/// Records every event delivered to it. Clones share the same log, so a
/// test keeps one handle while the output owns another.
#[derive(Debug, Clone)]
pub struct RecordingSink {
    id: u32,
    version: u32,
    events: Rc<RefCell<Vec<OutputDeviceEvent>>>,
    alive: Rc<Cell<bool>>,
    removed: Rc<Cell<bool>>,
    close_on_send: Rc<RefCell<Option<RecordingSink>>>,
}

impl RecordingSink {
    pub fn new(id: u32, version: u32) -> Self {
        Self {
            id,
            version,
            events: Rc::new(RefCell::new(Vec::new())),
            alive: Rc::new(Cell::new(true)),
            removed: Rc::new(Cell::new(false)),
            close_on_send: Rc::new(RefCell::new(None)),
        }
    }

    pub fn events(&self) -> Vec<OutputDeviceEvent> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    /// Simulate the client going away.
    pub fn close(&self) {
        self.alive.set(false);
    }

    pub fn was_removed(&self) -> bool {
        self.removed.get()
    }

    /// Close `other` as soon as this sink receives its next event.
    pub fn close_on_next_send(&self, other: &RecordingSink) {
        *self.close_on_send.borrow_mut() = Some(other.clone());
    }

    pub fn done_count(&self) -> usize {
        self.events.borrow().iter().filter(|e| **e == OutputDeviceEvent::Done).count()
    }
}

impl BindingSink for RecordingSink {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn is_alive(&self) -> bool {
        self.alive.get()
    }

    fn send(&self, event: &OutputDeviceEvent) {
        if let Some(other) = self.close_on_send.borrow_mut().take() {
            other.close();
        }
        self.events.borrow_mut().push(event.clone());
    }

    fn removed(&self) {
        self.removed.set(true);
    }
}

pub fn scenario_modes() -> Vec<Mode> {
    vec![Mode::new(1920, 1080, 60000), Mode::new(1280, 720, 60000)]
}

pub fn descriptor(name: &str) -> OutputDescriptor {
    let mut desc = OutputDescriptor::new(name);
    desc.modes = scenario_modes();
    desc
}

/// An initialized output with the two scenario modes.
pub fn initialized_output(min_version: u32) -> OutputDevice<RecordingSink> {
    let mut device = OutputDevice::from_descriptor(OutputId(1), &descriptor("Virtual-1"), min_version);
    device.initialize().unwrap();
    device
}
