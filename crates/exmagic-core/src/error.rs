use thiserror::Error;

/// Closed set of failures a single classification call can end in.
///
/// Each variant maps to one stable reason atom (see [`MagicError::reason`]),
/// which is what crosses the host boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MagicError {
    #[error("Bad argument")]
    BadArgument,

    #[error("Failed to allocate memory for a path")]
    AllocateMemory,

    #[error("Failed to open a libmagic handle")]
    OpenMagic,

    #[error("Failed to load magic database: {0}")]
    LoadDatabase(String),

    #[error("libmagic returned no result: {0}")]
    Magic(String),

    #[error("Failed to build the result binary")]
    BuildBinary,
}

impl MagicError {
    /// Every reason atom, in declaration order.
    pub const ALL_REASONS: [&'static str; 6] = [
        "badarg",
        "fail_to_allocate_memory",
        "fail_to_open_magic",
        "fail_to_load_magic_database",
        "fail_to_magic",
        "fail_to_build_binary",
    ];

    /// Stable reason atom for this failure.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::BadArgument => "badarg",
            Self::AllocateMemory => "fail_to_allocate_memory",
            Self::OpenMagic => "fail_to_open_magic",
            Self::LoadDatabase(_) => "fail_to_load_magic_database",
            Self::Magic(_) => "fail_to_magic",
            Self::BuildBinary => "fail_to_build_binary",
        }
    }
}

/// All errors that can occur in exmagic-core and its callers.
#[derive(Debug, Error)]
pub enum ExMagicError {
    #[error(transparent)]
    Magic(#[from] MagicError),

    #[error("No magic database found (tried: {0})")]
    DatabaseNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl ExMagicError {
    /// Reason atom used in JSON output.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Magic(e) => e.reason(),
            Self::DatabaseNotFound(_) => "database_not_found",
            Self::TomlParse(_) | Self::TomlSerialize(_) => "config_error",
            Self::Io(_) => "io_error",
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Magic(MagicError::BadArgument) => ExitCode::InvalidArgs,
            Self::Magic(_) => ExitCode::MagicFailure,
            Self::DatabaseNotFound(_) => ExitCode::NotFound,
            Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ExitCode::NotFound,
            Self::Io(_) => ExitCode::FileSystemError,
            Self::TomlParse(_) | Self::TomlSerialize(_) => ExitCode::GeneralError,
        }
    }
}

/// Exit codes for the `exmagic` binary.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NotFound = 2,
    InvalidArgs = 3,
    FileSystemError = 4,
    MagicFailure = 5,
}

pub type Result<T> = std::result::Result<T, ExMagicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_atoms_are_stable() {
        let all = [
            MagicError::BadArgument,
            MagicError::AllocateMemory,
            MagicError::OpenMagic,
            MagicError::LoadDatabase(String::new()),
            MagicError::Magic(String::new()),
            MagicError::BuildBinary,
        ];
        let reasons: Vec<&str> = all.iter().map(MagicError::reason).collect();
        assert_eq!(reasons, MagicError::ALL_REASONS);
    }

    #[test]
    fn test_detail_does_not_change_reason() {
        let e = MagicError::LoadDatabase("could not find any valid magic files!".into());
        assert_eq!(e.reason(), "fail_to_load_magic_database");
        assert!(e.to_string().contains("could not find"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::Success as i32, 0);
        assert_eq!(ExitCode::MagicFailure as i32, 5);

        let e: ExMagicError = MagicError::Magic("x".into()).into();
        assert_eq!(e.exit_code(), ExitCode::MagicFailure);
        assert_eq!(e.reason(), "fail_to_magic");

        let e: ExMagicError = MagicError::BadArgument.into();
        assert_eq!(e.exit_code(), ExitCode::InvalidArgs);

        let e = ExMagicError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(e.exit_code(), ExitCode::NotFound);
        assert_eq!(e.reason(), "io_error");
    }
}
