pub mod errors;
pub mod output;
pub mod discovery;
pub mod registry;
pub mod state;
pub mod compositor;
pub mod socket_manager;
pub mod wayland;

// Re-export key types
pub use compositor::{Compositor, CompositorEvent};
pub use registry::{LifecycleEvent, OutputRegistry, OutputSummary};
pub use state::CompositorState;
