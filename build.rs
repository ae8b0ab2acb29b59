fn main() {
    // The protocol bindings are generated at compile time by wayland-scanner
    // from this file; rebuild when it changes.
    println!("cargo:rerun-if-changed=protocols/outputdevice.xml");
}
