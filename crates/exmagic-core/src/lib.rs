pub mod config;
pub mod error;

pub use config::{AppConfig, DATABASE_CANDIDATES, resolve_database_from, system_database};
pub use error::{ExMagicError, ExitCode, MagicError, Result};
