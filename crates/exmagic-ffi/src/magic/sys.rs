//! Raw libmagic declarations (`magic.h`).
#![allow(non_camel_case_types)]

use libc::{c_char, c_int, c_void, size_t};

/// Opaque `struct magic_set`.
#[repr(C)]
pub struct magic_set {
    _private: [u8; 0],
}

pub type magic_t = *mut magic_set;

pub const MAGIC_NONE: c_int = 0x000_0000;
pub const MAGIC_SYMLINK: c_int = 0x000_0002;
pub const MAGIC_COMPRESS: c_int = 0x000_0004;
pub const MAGIC_MIME_TYPE: c_int = 0x000_0010;
pub const MAGIC_ERROR: c_int = 0x000_0200;
pub const MAGIC_MIME_ENCODING: c_int = 0x000_0400;

#[link(name = "magic")]
unsafe extern "C" {
    pub fn magic_open(flags: c_int) -> magic_t;
    pub fn magic_close(cookie: magic_t);
    pub fn magic_load(cookie: magic_t, filename: *const c_char) -> c_int;
    pub fn magic_buffer(cookie: magic_t, buffer: *const c_void, length: size_t) -> *const c_char;
    pub fn magic_file(cookie: magic_t, filename: *const c_char) -> *const c_char;
    pub fn magic_error(cookie: magic_t) -> *const c_char;
    pub fn magic_version() -> c_int;
}
