// outputdevice
//
// Compositor-side implementation of the org_kde_kwin_outputdevice global.
// Output state lives in core/output, the Wayland glue in core/wayland.

pub mod core;
pub mod config;
pub mod util;
pub mod prelude;

#[cfg(test)]
mod tests;
