use serde_json::{json, Value};

pub const PACKAGE: &str = env!("CARGO_PKG_VERSION");
/// `git describe` of the source tree, or `unknown` outside a checkout.
pub const REVISION: &str = env!("TASKSYNC_BUILD_REVISION");
pub const TARGET: &str = env!("TASKSYNC_BUILD_TARGET");

/// Shown by `--version` and `tasksync version`.
pub const FULL: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("TASKSYNC_BUILD_REVISION"),
    ", ",
    env!("TASKSYNC_BUILD_TARGET"),
    ")"
);

pub fn as_json() -> Value {
    json!({
        "version": PACKAGE,
        "revision": REVISION,
        "target": TARGET,
        "core": tasksync_core::version(),
    })
}
