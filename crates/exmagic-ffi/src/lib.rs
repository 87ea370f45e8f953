//! exmagic FFI — bindings to libmagic and the host-facing call surfaces.

pub mod capi;
pub mod host;
pub mod magic;

pub use magic::{Cookie, Flags, classify_buffer, classify_file};
