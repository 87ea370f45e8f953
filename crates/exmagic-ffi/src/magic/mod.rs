//! libmagic MIME type detection.
//!
//! Every call opens its own [`Cookie`], loads the requested database into
//! it and drops it before returning. Nothing is cached between calls.

mod cookie;
pub(crate) mod sys;

use std::ffi::{CStr, CString};

use exmagic_core::MagicError;
use tracing::{debug, warn};

pub use cookie::{Cookie, Flags};

/// Classify `content` as a MIME type using the database at `database_path`.
pub fn classify_buffer(content: &[u8], database_path: &[u8]) -> Result<Vec<u8>, MagicError> {
    classify_buffer_with(Flags::default(), content, database_path)
}

/// Classify the file at `file_path` as a MIME type using the database at `database_path`.
pub fn classify_file(file_path: &[u8], database_path: &[u8]) -> Result<Vec<u8>, MagicError> {
    classify_file_with(Flags::default(), file_path, database_path)
}

pub fn classify_buffer_with(
    flags: Flags,
    content: &[u8],
    database_path: &[u8],
) -> Result<Vec<u8>, MagicError> {
    debug!(len = content.len(), "classifying buffer");
    let result = to_cstring(database_path).and_then(|database| {
        let cookie = open_database(flags, &database)?;
        cookie.buffer(content)
    });
    traced("buffer", result)
}

pub fn classify_file_with(
    flags: Flags,
    file_path: &[u8],
    database_path: &[u8],
) -> Result<Vec<u8>, MagicError> {
    debug!(path = %String::from_utf8_lossy(file_path), "classifying file");
    let result = to_cstring(file_path).and_then(|path| {
        let database = to_cstring(database_path)?;
        let cookie = open_database(flags, &database)?;
        cookie.file(&path)
    });
    traced("file", result)
}

/// Open a handle and load the database at `database_path` into it, then
/// close it. Same path handling as the classify calls.
pub fn load_database(flags: Flags, database_path: &[u8]) -> Result<(), MagicError> {
    let database = to_cstring(database_path)?;
    open_database(flags, &database).map(drop)
}

/// Version of the linked libmagic, e.g. `545` for 5.45.
pub fn version() -> i32 {
    // SAFETY: magic_version takes no arguments and has no side effects.
    unsafe { sys::magic_version() }
}

fn open_database(flags: Flags, database: &CStr) -> Result<Cookie, MagicError> {
    let cookie = Cookie::open(flags)?;
    cookie.load(database)?;
    debug!(database = %database.to_string_lossy(), "magic database loaded");
    Ok(cookie)
}

/// Copy a byte path into an owned NUL-terminated string.
fn to_cstring(bytes: &[u8]) -> Result<CString, MagicError> {
    let mut owned = Vec::new();
    owned
        .try_reserve_exact(bytes.len() + 1)
        .map_err(|_| MagicError::AllocateMemory)?;
    owned.extend_from_slice(bytes);
    CString::new(owned).map_err(|_| MagicError::BadArgument)
}

fn traced(op: &'static str, result: Result<Vec<u8>, MagicError>) -> Result<Vec<u8>, MagicError> {
    match &result {
        Ok(mime) => debug!(op, mime = %String::from_utf8_lossy(mime), "classified"),
        Err(e) => warn!(op, reason = e.reason(), error = %e, "classification failed"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use exmagic_core::system_database;
    use std::os::unix::ffi::OsStrExt;
    use tempfile::TempDir;

    const PNG_HEADER: &[u8] = &[
        0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n', // signature
        0x00, 0x00, 0x00, 0x0d, b'I', b'H', b'D', b'R', // IHDR chunk
        0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1
        0x08, 0x06, 0x00, 0x00, 0x00, // rgba, 8-bit
        0x1f, 0x15, 0xc4, 0x89, // crc
    ];

    const MISSING_DB: &[u8] = b"/nonexistent/exmagic/magic.mgc";

    fn db() -> Option<Vec<u8>> {
        system_database().map(|p| p.as_os_str().as_bytes().to_vec())
    }

    #[test]
    fn test_to_cstring_rejects_interior_nul() {
        assert_eq!(to_cstring(b"a\0b").unwrap_err(), MagicError::BadArgument);
        assert_eq!(to_cstring(b"/usr/share").unwrap().as_bytes(), b"/usr/share");
        assert_eq!(to_cstring(b"").unwrap().as_bytes(), b"");
    }

    #[test]
    fn test_interior_nul_paths_are_bad_arguments() {
        assert_eq!(
            classify_buffer(b"x", b"magic\0.mgc").unwrap_err(),
            MagicError::BadArgument
        );
        assert_eq!(
            classify_file(b"fi\0le", MISSING_DB).unwrap_err(),
            MagicError::BadArgument
        );
    }

    #[test]
    fn test_missing_database_fails_to_load() {
        let err = classify_buffer(b"hello", MISSING_DB).unwrap_err();
        assert_eq!(err.reason(), "fail_to_load_magic_database");

        let err = classify_file(b"/etc/hostname", MISSING_DB).unwrap_err();
        assert_eq!(err.reason(), "fail_to_load_magic_database");
    }

    fn handle_counts() -> (usize, usize) {
        super::cookie::HANDLE_COUNTS.with(|c| c.get())
    }

    fn open_fd_count() -> usize {
        std::fs::read_dir("/proc/self/fd").map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn test_repeated_failures_release_handles() {
        let (opened, closed) = handle_counts();
        for _ in 0..2_000 {
            assert!(matches!(
                classify_buffer(b"hello", MISSING_DB),
                Err(MagicError::LoadDatabase(_))
            ));
        }
        let (opened_after, closed_after) = handle_counts();
        assert_eq!(opened_after - opened, 2_000);
        assert_eq!(closed_after - closed, 2_000);
    }

    #[test]
    fn test_every_exit_path_closes_its_handle() {
        let Some(db) = db() else { return };
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("pixel.bin");
        std::fs::write(&present, PNG_HEADER).unwrap();
        let present = present.as_os_str().as_bytes().to_vec();

        let (opened, closed) = handle_counts();
        let fds_before = open_fd_count();
        for _ in 0..300 {
            assert!(classify_file(&present, &db).is_ok());
            assert!(matches!(
                classify_file(b"/nonexistent/exmagic/input.bin", &db),
                Err(MagicError::Magic(_))
            ));
            assert!(matches!(
                classify_file(&present, MISSING_DB),
                Err(MagicError::LoadDatabase(_))
            ));
            assert!(classify_buffer(PNG_HEADER, &db).is_ok());
        }
        let fds_after = open_fd_count();
        let (opened_after, closed_after) = handle_counts();

        assert_eq!(opened_after - opened, 1_200);
        assert_eq!(closed_after - closed, 1_200);
        // Other tests run in parallel and may hold a few fds; a per-call leak
        // would show up as hundreds.
        assert!(
            fds_after <= fds_before + 16,
            "fds before={fds_before} after={fds_after}"
        );
    }

    #[test]
    fn test_load_database() {
        assert!(matches!(
            load_database(Flags::default(), MISSING_DB),
            Err(MagicError::LoadDatabase(_))
        ));
        assert_eq!(
            load_database(Flags::default(), b"magic\0.mgc"),
            Err(MagicError::BadArgument)
        );

        let (opened, closed) = handle_counts();
        if let Some(db) = db() {
            assert_eq!(load_database(Flags::default(), &db), Ok(()));
        }
        let (opened_after, closed_after) = handle_counts();
        assert_eq!(opened_after - opened, closed_after - closed);
    }

    #[test]
    fn test_version_is_positive() {
        assert!(version() > 0);
    }

    #[test]
    fn test_png_header_is_image_png() {
        let Some(db) = db() else { return };
        let mime = classify_buffer(PNG_HEADER, &db).unwrap();
        assert_eq!(mime, b"image/png");
    }

    #[test]
    fn test_empty_buffer_is_x_empty() {
        let Some(db) = db() else { return };
        let mime = classify_buffer(b"", &db).unwrap();
        assert_eq!(mime, b"application/x-empty");
    }

    #[test]
    fn test_plain_text() {
        let Some(db) = db() else { return };
        let mime = classify_buffer(b"hello world, this is plain text\n", &db).unwrap();
        assert_eq!(mime, b"text/plain");
    }

    #[test]
    fn test_buffer_classification_is_idempotent() {
        let Some(db) = db() else { return };
        let first = classify_buffer(PNG_HEADER, &db).unwrap();
        let second = classify_buffer(PNG_HEADER, &db).unwrap();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_mime_flag_adds_encoding() {
        let Some(db) = db() else { return };
        let mime = classify_buffer_with(Flags::MIME | Flags::ERROR, b"plain ascii text\n", &db)
            .unwrap();
        let mime = String::from_utf8(mime).unwrap();
        assert!(mime.starts_with("text/plain"), "{mime}");
        assert!(mime.contains("charset="), "{mime}");
    }

    #[test]
    fn test_file_on_disk() {
        let Some(db) = db() else { return };
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pixel.bin");
        std::fs::write(&path, PNG_HEADER).unwrap();

        let mime = classify_file(path.as_os_str().as_bytes(), &db).unwrap();
        assert_eq!(mime, b"image/png");
    }

    #[test]
    fn test_missing_file_fails_to_magic() {
        let Some(db) = db() else { return };
        let err = classify_file(b"/nonexistent/exmagic/input.bin", &db).unwrap_err();
        assert_eq!(err.reason(), "fail_to_magic");
    }
}
