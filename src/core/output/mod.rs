//! Output metadata and its per-client broadcast.
//!
//! - `mode`: modes and the ordered mode table
//! - `state`: the authoritative attribute record and its value types
//! - `binding`: wire events, the transport trait and client bindings
//! - `broadcast`: fan-out of state changes to live bindings
//! - `device`: the public output object tying state and broadcast together

pub mod binding;
pub mod broadcast;
pub mod device;
pub mod mode;
pub mod state;


pub use binding::{BindingSink, ClientBinding, OutputDeviceEvent, IDENTITY_SINCE};
pub use broadcast::{BroadcastGlobal, Category};
pub use device::OutputDevice;
pub use mode::{Mode, ModeFlags, ModeTable};
pub use state::{OutputId, PhysicalSize, Position, PowerState, Subpixel, Transform, UNKNOWN};
