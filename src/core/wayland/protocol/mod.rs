//! Wayland Protocol Bindings
//!
//! The outputdevice protocol is not shipped by any of the wayland-protocols
//! crates, so its server-side code is generated here by `wayland-scanner`
//! from `protocols/outputdevice.xml`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crate::core::wayland::protocol::server::org_kde_kwin_outputdevice::{
//!     self, OrgKdeKwinOutputdevice,
//! };
//! ```

#![allow(dead_code, non_camel_case_types, unused_unsafe, unused_variables)]
#![allow(non_upper_case_globals, non_snake_case, unused_imports)]
#![allow(missing_docs, clippy::all)]

/// Server-side bindings used to implement the global.
pub mod server {
    use wayland_server;
    use wayland_server::protocol::*;

    pub mod __interfaces {
        use wayland_server::protocol::__interfaces::*;
        wayland_scanner::generate_interfaces!("protocols/outputdevice.xml");
    }
    use self::__interfaces::*;

    wayland_scanner::generate_server_code!("protocols/outputdevice.xml");
}
