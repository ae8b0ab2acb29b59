//! Common imports and types used throughout the crate.

pub use crate::core::discovery::{OutputChange, OutputDescriptor, OutputDiscoveryFeed};
pub use crate::core::errors::OutputError;
pub use crate::core::output::{BindingSink, Mode, OutputDevice, OutputDeviceEvent, OutputId};
pub use crate::core::registry::OutputRegistry;

pub type Result<T> = std::result::Result<T, crate::core::errors::OutputError>;
