pub(crate) mod support;

mod wayland;
