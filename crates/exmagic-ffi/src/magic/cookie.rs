use std::ffi::CStr;
use std::ops::BitOr;
use std::ptr::NonNull;

use exmagic_core::MagicError;
use libc::c_int;

use super::sys;

/// libmagic behaviour flags passed to `magic_open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags(c_int);

impl Flags {
    pub const NONE: Self = Self(sys::MAGIC_NONE);
    /// Follow symlinks when classifying a path.
    pub const SYMLINK: Self = Self(sys::MAGIC_SYMLINK);
    /// Look inside compressed files.
    pub const COMPRESS: Self = Self(sys::MAGIC_COMPRESS);
    pub const MIME_TYPE: Self = Self(sys::MAGIC_MIME_TYPE);
    /// Report OS errors (missing file, permission denied) as failures
    /// instead of as a textual result.
    pub const ERROR: Self = Self(sys::MAGIC_ERROR);
    pub const MIME_ENCODING: Self = Self(sys::MAGIC_MIME_ENCODING);
    pub const MIME: Self = Self(sys::MAGIC_MIME_TYPE | sys::MAGIC_MIME_ENCODING);

    pub const fn bits(self) -> c_int {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::MIME_TYPE | Self::ERROR
    }
}

impl BitOr for Flags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// Per-thread (opened, closed) handle counts, so parallel tests don't mix.
#[cfg(test)]
thread_local! {
    pub(crate) static HANDLE_COUNTS: std::cell::Cell<(usize, usize)> =
        const { std::cell::Cell::new((0, 0)) };
}

/// An open libmagic handle.
///
/// Closed on drop. Not `Send`: a cookie lives and dies inside one call.
#[derive(Debug)]
pub struct Cookie {
    raw: NonNull<sys::magic_set>,
}

impl Cookie {
    pub fn open(flags: Flags) -> Result<Self, MagicError> {
        // SAFETY: magic_open has no preconditions; NULL signals failure.
        let raw = unsafe { sys::magic_open(flags.bits()) };
        let raw = NonNull::new(raw).ok_or(MagicError::OpenMagic)?;
        #[cfg(test)]
        HANDLE_COUNTS.with(|c| c.set((c.get().0 + 1, c.get().1)));
        Ok(Self { raw })
    }

    /// Load a database into this handle.
    pub fn load(&self, database: &CStr) -> Result<(), MagicError> {
        // SAFETY: the cookie is open and `database` is NUL-terminated for the call.
        let rc = unsafe { sys::magic_load(self.raw.as_ptr(), database.as_ptr()) };
        if rc != 0 {
            return Err(MagicError::LoadDatabase(self.last_error()));
        }
        Ok(())
    }

    /// Classify an in-memory buffer.
    pub fn buffer(&self, content: &[u8]) -> Result<Vec<u8>, MagicError> {
        // SAFETY: libmagic reads at most `content.len()` bytes from the slice.
        let out = unsafe {
            sys::magic_buffer(self.raw.as_ptr(), content.as_ptr().cast(), content.len())
        };
        self.take_output(out)
    }

    /// Classify the file at `path`.
    pub fn file(&self, path: &CStr) -> Result<Vec<u8>, MagicError> {
        // SAFETY: the cookie is open and `path` is NUL-terminated for the call.
        let out = unsafe { sys::magic_file(self.raw.as_ptr(), path.as_ptr()) };
        self.take_output(out)
    }

    /// Last error message recorded on this handle.
    pub fn last_error(&self) -> String {
        // SAFETY: the returned string, if any, is owned by the cookie.
        let msg = unsafe { sys::magic_error(self.raw.as_ptr()) };
        if msg.is_null() {
            return "unknown libmagic error".to_string();
        }
        unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
    }

    // The result string belongs to the cookie and is invalidated by the next
    // call or by close, so it is copied out before either can happen.
    fn take_output(&self, out: *const libc::c_char) -> Result<Vec<u8>, MagicError> {
        if out.is_null() {
            return Err(MagicError::Magic(self.last_error()));
        }
        let text = unsafe { CStr::from_ptr(out) }.to_bytes();

        let mut owned = Vec::new();
        owned
            .try_reserve_exact(text.len())
            .map_err(|_| MagicError::BuildBinary)?;
        owned.extend_from_slice(text);
        Ok(owned)
    }
}

impl Drop for Cookie {
    fn drop(&mut self) {
        // SAFETY: `raw` came from magic_open and is closed exactly once.
        unsafe { sys::magic_close(self.raw.as_ptr()) };
        #[cfg(test)]
        HANDLE_COUNTS.with(|c| c.set((c.get().0, c.get().1 + 1)));
    }
}
