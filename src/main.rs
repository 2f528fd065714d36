pub mod models {
    pub mod fleet;
}

pub mod catalog;
pub mod client;
pub mod config;
pub mod tables;
pub mod utils;
pub mod services {
    pub mod events;
    pub mod flows;
    pub mod generate;
    pub mod heatmap;
    pub mod loads;
    pub mod performance;
    pub mod report;
    pub mod roster;
    pub mod summary;
    pub mod upload;
}

use crate::config::Config;
use crate::models::fleet::TIMESTAMP_FORMAT;
use crate::services::{generate, report, upload};
use log::{error, info};
use std::ffi::OsString;
use std::path::PathBuf;

const USAGE: &str = "usage: fleet-telemetry [--env-file PATH] [--yes] [generate|report|upload|all]";

#[derive(Debug)]
struct LoadedEnvFile {
    path: PathBuf,
    explicit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Generate,
    Report,
    Upload,
    All,
}

#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    env_file: Option<PathBuf>,
    command: Command,
    assume_yes: bool,
}

fn run(command: Command, assume_yes: bool) -> Result<(), String> {
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (seed={}, devices={}, events={}, reference={}, data_dir={}, output_dir={})",
        cfg.seed,
        cfg.device_count,
        cfg.event_count,
        cfg.reference_time.format(TIMESTAMP_FORMAT),
        cfg.data_dir.display(),
        cfg.output_dir.display()
    );

    match command {
        Command::Generate => {
            generate::run(&cfg)?;
        }
        Command::Report => {
            report::run(&cfg)?;
        }
        Command::Upload => upload::run(&cfg, assume_yes)?,
        Command::All => {
            generate::run(&cfg)?;
            report::run(&cfg)?;
        }
    }
    Ok(())
}

fn set_env_file(path: PathBuf, env_file: &mut Option<PathBuf>) -> Result<(), String> {
    if env_file.is_some() {
        return Err("`--env-file` provided more than once".to_string());
    }
    *env_file = Some(path);
    Ok(())
}

fn parse_args(args: impl IntoIterator<Item = OsString>) -> Result<CliArgs, String> {
    let mut args = args.into_iter();
    let mut env_file: Option<PathBuf> = None;
    let mut command: Option<Command> = None;
    let mut assume_yes = false;

    while let Some(arg) = args.next() {
        match arg.to_str() {
            Some("--env-file") => {
                let value = args
                    .next()
                    .ok_or_else(|| "`--env-file` requires a path argument".to_string())?;
                set_env_file(PathBuf::from(value), &mut env_file)?;
            }
            Some(s) if s.starts_with("--env-file=") => {
                let path_str = &s["--env-file=".len()..];
                if path_str.is_empty() {
                    return Err("`--env-file` requires a path argument".to_string());
                }
                set_env_file(PathBuf::from(path_str), &mut env_file)?;
            }
            Some("--yes" | "-y") => assume_yes = true,
            Some("-h" | "--help") => return Err(USAGE.to_string()),
            Some(name @ ("generate" | "report" | "upload" | "all")) => {
                if command.is_some() {
                    return Err(format!("more than one command given ({})", name));
                }
                command = Some(match name {
                    "generate" => Command::Generate,
                    "report" => Command::Report,
                    "upload" => Command::Upload,
                    _ => Command::All,
                });
            }
            Some(other) => return Err(format!("unrecognised argument: {}\n{}", other, USAGE)),
            None => return Err("argument contains invalid UTF-8".to_string()),
        }
    }

    Ok(CliArgs {
        env_file,
        command: command.unwrap_or(Command::All),
        assume_yes,
    })
}

/// Load the `.env` file named on the command line, or `./.env` when present.
/// Variables already set in the process environment win.
fn load_env(env_file: Option<PathBuf>) -> Result<Option<LoadedEnvFile>, String> {
    if let Some(path) = env_file {
        if !path.is_file() {
            return Err(format!("env file not found: {}", path.display()));
        }
        dotenvy::from_path(&path).map_err(|e| format!("failed to load {}: {}", path.display(), e))?;
        return Ok(Some(LoadedEnvFile { path, explicit: true }));
    }

    let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
    let default_path = cwd.join(".env");
    if default_path.is_file() {
        dotenvy::from_path(&default_path).map_err(|e| format!("failed to load {}: {}", default_path.display(), e))?;
        Ok(Some(LoadedEnvFile {
            path: default_path,
            explicit: false,
        }))
    } else {
        Ok(None)
    }
}

fn main() {
    let cli = match parse_args(std::env::args_os().skip(1)) {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(2);
        }
    };
    let loaded_env = match load_env(cli.env_file.clone()) {
        Ok(info) => info,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!(
        "fleet-telemetry {} (git {}) starting: {:?}",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH"),
        cli.command
    );
    if let Err(e) = run(cli.command, cli.assume_yes) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
