//! C ABI for hosts that bind through plain C calls.
//!
//! # Safety
//!
//! Pointer arguments must be valid for reads of the given length for the
//! duration of the call, and `out` must point to writable memory. NULL
//! pointers are reported as [`ExMagicStatus::BadArg`] rather than
//! dereferenced. A buffer written to `out` is owned by the caller and must
//! be released with [`exmagic_buf_free`].

use std::ptr;
use std::slice;

use exmagic_core::MagicError;
use libc::{c_char, c_int};

use crate::magic;

/// Stable status codes returned across the C boundary.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExMagicStatus {
    Ok = 0,
    BadArg = 1,
    AllocateMemory = 2,
    OpenMagic = 3,
    LoadDatabase = 4,
    Magic = 5,
    BuildBinary = 6,
}

impl ExMagicStatus {
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => Self::Ok,
            1 => Self::BadArg,
            2 => Self::AllocateMemory,
            3 => Self::OpenMagic,
            4 => Self::LoadDatabase,
            5 => Self::Magic,
            6 => Self::BuildBinary,
            _ => return None,
        })
    }
}

impl From<&MagicError> for ExMagicStatus {
    fn from(e: &MagicError) -> Self {
        match e {
            MagicError::BadArgument => Self::BadArg,
            MagicError::AllocateMemory => Self::AllocateMemory,
            MagicError::OpenMagic => Self::OpenMagic,
            MagicError::LoadDatabase(_) => Self::LoadDatabase,
            MagicError::Magic(_) => Self::Magic,
            MagicError::BuildBinary => Self::BuildBinary,
        }
    }
}

/// Owned result bytes handed to the caller. Not NUL-terminated.
#[repr(C)]
#[derive(Debug)]
pub struct ExMagicBuf {
    pub ptr: *mut u8,
    pub len: usize,
}

impl ExMagicBuf {
    fn from_vec(bytes: Vec<u8>) -> Self {
        let boxed = bytes.into_boxed_slice();
        let len = boxed.len();
        Self {
            ptr: Box::into_raw(boxed).cast::<u8>(),
            len,
        }
    }
}

/// Classify `content` against the database at `db`.
///
/// # Safety
/// See the module documentation. `content` may be NULL only when
/// `content_len` is 0.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn exmagic_from_buffer(
    content: *const u8,
    content_len: usize,
    db: *const u8,
    db_len: usize,
    out: *mut ExMagicBuf,
) -> ExMagicStatus {
    let Some(content) = (unsafe { bytes_arg(content, content_len, true) }) else {
        return ExMagicStatus::BadArg;
    };
    let Some(db) = (unsafe { bytes_arg(db, db_len, false) }) else {
        return ExMagicStatus::BadArg;
    };
    if out.is_null() {
        return ExMagicStatus::BadArg;
    }
    unsafe { write_result(magic::classify_buffer(content, db), out) }
}

/// Classify the file at `path` against the database at `db`.
///
/// # Safety
/// See the module documentation.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn exmagic_from_file(
    path: *const u8,
    path_len: usize,
    db: *const u8,
    db_len: usize,
    out: *mut ExMagicBuf,
) -> ExMagicStatus {
    let Some(path) = (unsafe { bytes_arg(path, path_len, false) }) else {
        return ExMagicStatus::BadArg;
    };
    let Some(db) = (unsafe { bytes_arg(db, db_len, false) }) else {
        return ExMagicStatus::BadArg;
    };
    if out.is_null() {
        return ExMagicStatus::BadArg;
    }
    unsafe { write_result(magic::classify_file(path, db), out) }
}

/// Release a buffer returned through `out`. Calling with a NULL `ptr` is a no-op.
///
/// # Safety
/// `buf` must come from this library and must not be freed twice.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn exmagic_buf_free(buf: ExMagicBuf) {
    if buf.ptr.is_null() {
        return;
    }
    let slice = ptr::slice_from_raw_parts_mut(buf.ptr, buf.len);
    drop(unsafe { Box::from_raw(slice) });
}

/// Reason atom for a status code, as a static NUL-terminated string.
/// Unknown codes yield `"unknown"`.
#[unsafe(no_mangle)]
pub extern "C" fn exmagic_status_reason(status: u32) -> *const c_char {
    let reason: &'static std::ffi::CStr = match ExMagicStatus::from_code(status) {
        None => c"unknown",
        Some(ExMagicStatus::Ok) => c"ok",
        Some(ExMagicStatus::BadArg) => c"badarg",
        Some(ExMagicStatus::AllocateMemory) => c"fail_to_allocate_memory",
        Some(ExMagicStatus::OpenMagic) => c"fail_to_open_magic",
        Some(ExMagicStatus::LoadDatabase) => c"fail_to_load_magic_database",
        Some(ExMagicStatus::Magic) => c"fail_to_magic",
        Some(ExMagicStatus::BuildBinary) => c"fail_to_build_binary",
    };
    reason.as_ptr()
}

/// Version of the linked libmagic.
#[unsafe(no_mangle)]
pub extern "C" fn exmagic_magic_version() -> c_int {
    magic::version()
}

unsafe fn bytes_arg<'a>(ptr: *const u8, len: usize, allow_empty_null: bool) -> Option<&'a [u8]> {
    if ptr.is_null() {
        let empty: &'a [u8] = &[];
        return (allow_empty_null && len == 0).then_some(empty);
    }
    Some(unsafe { slice::from_raw_parts(ptr, len) })
}

unsafe fn write_result(result: Result<Vec<u8>, MagicError>, out: *mut ExMagicBuf) -> ExMagicStatus {
    match result {
        Ok(mime) => {
            unsafe { out.write(ExMagicBuf::from_vec(mime)) };
            ExMagicStatus::Ok
        }
        Err(e) => ExMagicStatus::from(&e),
    }
}
