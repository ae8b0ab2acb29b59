//! Wayland protocol implementations.
//!
//! Protocol dispatch lives here; output state and its broadcast logic live
//! in `core::output` and know nothing about Wayland objects.

pub mod protocol;
pub mod output_device;
