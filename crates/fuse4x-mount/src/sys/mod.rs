//! Raw host bindings.

#[cfg(target_os = "macos")]
pub(crate) mod darwin;
