use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use remote_control::{init_logging, init_logging_from_env, Config, LoggingMode, RemoteControl};

/// System-wide configuration used when nothing else is given
const DEFAULT_CONFIG_PATH: &str = "/etc/remote-control.conf";

/// Environment variable naming the configuration file
const CONFIG_ENV: &str = "REMOTE_CONTROL_CONFIG";

/// Remote-control daemon
///
/// Creates every hardware and network backend, then services them from one
/// main loop until interrupted.
#[derive(Parser, Debug)]
#[command(name = "remote-controld")]
#[command(about = "Embedded-device remote-control daemon")]
#[command(version)]
pub struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Logging mode: silent, development or debug
    #[arg(long)]
    pub log_mode: Option<LoggingMode>,

    /// Shorthand for --log-mode debug
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    fn logging_mode(&self) -> Option<LoggingMode> {
        if self.verbose {
            Some(LoggingMode::Debug)
        } else {
            self.log_mode
        }
    }
}

/// Pick the configuration file: command line, then environment, then the
/// system default if it exists
fn resolve_config_path(
    arg: Option<PathBuf>,
    env: Option<OsString>,
    default: &Path,
) -> Option<PathBuf> {
    arg.or_else(|| env.map(PathBuf::from))
        .or_else(|| default.exists().then(|| default.to_path_buf()))
}

fn load_config(args: &Args) -> Result<Config> {
    let path = resolve_config_path(
        args.config.clone(),
        std::env::var_os(CONFIG_ENV),
        Path::new(DEFAULT_CONFIG_PATH),
    );

    match path {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load configuration {}", path.display())),
        None => {
            tracing::info!("No configuration file, using defaults");
            Ok(Config::default())
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.logging_mode() {
        Some(mode) => init_logging(mode),
        None => init_logging_from_env(),
    }
    .context("Failed to initialize logging")?;

    let config = load_config(&args)?;
    let mut rc = RemoteControl::new(&config).context("Failed to start remote control")?;

    let quit = rc.quit_handle();
    ctrlc::set_handler(move || {
        tracing::info!("Interrupted, shutting down");
        quit.quit();
    })
    .context("Failed to install signal handler")?;

    rc.run();

    drop(rc);
    tracing::info!("Remote control stopped");
    Ok(())
}
