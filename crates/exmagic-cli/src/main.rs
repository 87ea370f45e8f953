use std::collections::BTreeMap;
use std::io::Read;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use exmagic_core::{AppConfig, ExMagicError, ExitCode};
use exmagic_ffi::{Flags, magic};

mod logging;

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "exmagic",
    about = "MIME type detection backed by libmagic",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format.
    /// Also enabled by setting EXMAGIC_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Magic database to load. Defaults to the config file, then $MAGIC,
    /// then the usual system locations.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Append the charset to the MIME type (e.g. `text/plain; charset=us-ascii`).
    #[arg(long, global = true)]
    encoding: bool,

    /// Debug logging to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify files on disk.
    File {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Read a file (or stdin) into memory and classify the bytes.
    Buffer { path: Option<PathBuf> },

    /// Check config, database and libmagic.
    Doctor,

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show version information.
    Version,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show all config values.
    List,
    /// Get a specific config key.
    Get { key: String },
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();

    let config = AppConfig::load()?;
    logging::init(cli.verbose, &config.log.level);

    let json_output = cli.json
        || config.output.json
        || std::env::var("EXMAGIC_JSON").as_deref() == Ok("1");

    let flags = if cli.encoding {
        Flags::MIME | Flags::ERROR
    } else {
        Flags::default()
    };

    match cli.command {
        Commands::File { paths } => {
            let database = resolve_or_exit(&config, cli.database.as_deref(), json_output, &start);
            let database = database.as_os_str().as_bytes();

            let mut items = Vec::with_capacity(paths.len());
            let mut first_failure: Option<ExMagicError> = None;
            for path in &paths {
                match magic::classify_file_with(flags, path.as_os_str().as_bytes(), database) {
                    Ok(mime) => {
                        let mime = String::from_utf8_lossy(&mime).into_owned();
                        if !json_output {
                            println!("{}: {mime}", path.display());
                        }
                        items.push(serde_json::json!({"path":path,"mime":mime}));
                    }
                    Err(e) => {
                        if !json_output {
                            eprintln!("{}: {e}", path.display());
                        }
                        items.push(serde_json::json!({"path":path,"error":e.reason(),"message":e.to_string()}));
                        first_failure.get_or_insert(e.into());
                    }
                }
            }
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&file_envelope(items, first_failure.as_ref(), dur))?;
            }
            if let Some(e) = first_failure {
                std::process::exit(e.exit_code() as i32);
            }
        }

        Commands::Buffer { path } => {
            let database = resolve_or_exit(&config, cli.database.as_deref(), json_output, &start);
            let content = match read_input(path.as_deref()) {
                Ok(bytes) => bytes,
                Err(e) => fail(&e, json_output, &start),
            };
            debug!(len = content.len(), "input read");

            match magic::classify_buffer_with(flags, &content, database.as_os_str().as_bytes()) {
                Ok(mime) => {
                    let mime = String::from_utf8_lossy(&mime).into_owned();
                    let dur = start.elapsed().as_millis();
                    if json_output {
                        print_json(&ok_envelope(
                            serde_json::json!({ "mime": mime, "bytes": content.len() }),
                            dur,
                        ))?;
                    } else {
                        println!("{mime}");
                    }
                }
                Err(e) => fail(&ExMagicError::from(e), json_output, &start),
            }
        }

        // ── Doctor ─────────────────────────────────────────────────────────

        Commands::Doctor => {
            let mut issues = 0;

            let config_path = AppConfig::config_path();
            if config_path.exists() {
                println!("✓ Config: {}", config_path.display());
            } else {
                println!("○ Config: not found (using defaults)");
            }

            match config.resolve_database(cli.database.as_deref()) {
                Ok(db) => match magic::load_database(flags, db.as_os_str().as_bytes()) {
                    Ok(()) => println!("✓ Database: {}", db.display()),
                    Err(e) => {
                        issues += 1;
                        println!("✗ Database: {} ({e})", db.display());
                    }
                },
                Err(e) => {
                    issues += 1;
                    println!("✗ Database: {e}");
                }
            }

            println!("✓ libmagic: {}", libmagic_version());

            if issues == 0 {
                println!("\nAll checks passed ✓");
            } else {
                println!("\n{issues} issues found");
                std::process::exit(ExitCode::GeneralError as i32);
            }
        }

        // ── Config ─────────────────────────────────────────────────────────

        Commands::Config { action } => {
            let kv = config_key_values(&config, cli.database.as_deref());
            let dur = start.elapsed().as_millis();
            match action {
                ConfigAction::List => {
                    if json_output {
                        print_json(&ok_envelope(serde_json::json!(kv), dur))?;
                    } else {
                        for (k, v) in &kv {
                            println!("{k} = {v}");
                        }
                    }
                }
                ConfigAction::Get { key } => match kv.get(key.as_str()) {
                    Some(val) => {
                        if json_output {
                            print_json(&ok_envelope(serde_json::json!({"key":key,"value":val}), dur))?;
                        } else {
                            println!("{val}");
                        }
                    }
                    None => {
                        eprintln!("Unknown config key: {key}");
                        std::process::exit(ExitCode::NotFound as i32);
                    }
                },
            }
        }

        // ── Version ────────────────────────────────────────────────────────

        Commands::Version => {
            let version = env!("CARGO_PKG_VERSION");
            let libmagic = libmagic_version();
            let dur = start.elapsed().as_millis();
            if json_output {
                print_json(&ok_envelope(serde_json::json!({"version":version,"libmagic":libmagic}), dur))?;
            } else {
                println!("exmagic v{version} (libmagic {libmagic})");
            }
        }
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

/// Report `err` in the selected output mode and exit with its code.
fn fail(err: &ExMagicError, json_output: bool, start: &Instant) -> ! {
    let dur = start.elapsed().as_millis();
    if json_output {
        // stdout may be closed; the exit code still carries the failure.
        let _ = print_json(&error_envelope(err, dur));
    } else {
        eprintln!("error: {err}");
    }
    std::process::exit(err.exit_code() as i32);
}

fn resolve_or_exit(
    config: &AppConfig,
    explicit: Option<&Path>,
    json_output: bool,
    start: &Instant,
) -> PathBuf {
    match config.resolve_database(explicit) {
        Ok(db) => {
            debug!(database = %db.display(), "using magic database");
            db
        }
        Err(e) => fail(&e, json_output, start),
    }
}

fn read_input(path: Option<&Path>) -> exmagic_core::Result<Vec<u8>> {
    match path {
        Some(path) => Ok(std::fs::read(path)?),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().lock().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

fn libmagic_version() -> String {
    format_version(magic::version())
}

/// `545` → `5.45`
fn format_version(v: i32) -> String {
    format!("{}.{:02}", v / 100, v % 100)
}

// ─── JSON envelopes ─────────────────────────────────────────────────────────

fn ok_envelope(data: serde_json::Value, dur: u128) -> serde_json::Value {
    serde_json::json!({"status":"ok","data":data,"meta":{"duration_ms":dur}})
}

fn error_envelope(err: &ExMagicError, dur: u128) -> serde_json::Value {
    serde_json::json!({
        "status": "error",
        "error": err.reason(),
        "message": err.to_string(),
        "meta": { "duration_ms": dur }
    })
}

/// Batch result for `file`. Any failure turns it into an error envelope
/// carrying the first failure at top level; per-path results stay in `data`.
fn file_envelope(
    items: Vec<serde_json::Value>,
    first_failure: Option<&ExMagicError>,
    dur: u128,
) -> serde_json::Value {
    let failed = items.iter().filter(|i| i.get("error").is_some()).count();
    let data = serde_json::json!({ "items": items, "total": items.len(), "failed": failed });
    let mut body = match first_failure {
        Some(err) => error_envelope(err, dur),
        None => ok_envelope(serde_json::Value::Null, dur),
    };
    body["data"] = data;
    body
}

fn config_key_values(config: &AppConfig, explicit: Option<&Path>) -> BTreeMap<&'static str, String> {
    let mut map = BTreeMap::new();
    map.insert("config_path", AppConfig::config_path().to_string_lossy().to_string());
    map.insert(
        "magic.database_path",
        config.magic.database_path.clone().unwrap_or_default(),
    );
    map.insert(
        "resolved_database",
        config
            .resolve_database(explicit)
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default(),
    );
    map.insert("output.json", config.output.json.to_string());
    map.insert("log.level", config.log.level.clone());
    map
}
