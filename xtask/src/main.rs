/// Bundles the plugin through nih_plug_xtask:
///
///   cargo xtask bundle propagation-delay --release
///
/// The packaged plugins land in `target/bundled/`.
fn main() -> nih_plug_xtask::Result<()> {
    nih_plug_xtask::main()
}
