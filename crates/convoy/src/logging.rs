//! Thin `env_logger` wrapper, matching the binary-entry-point pattern the teacher's own CLI
//! crates (`fs_util`, `cargo_util`, `brfs`) use rather than installing a dedicated tracing
//! subscriber.

/// Initializes the `log` backend from `RUST_LOG`. Safe to call more than once (a later call is a
/// no-op); tests that exercise more than one `Engine` in the same process should call this once
/// up front rather than per-test.
pub fn init() {
    let _ = env_logger::try_init();
}
