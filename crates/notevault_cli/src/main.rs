//! `notevault` executable.
//!
//! # Responsibility
//! - Parse arguments and resolve configuration (flag > env > file > default).
//! - Initialize logging, prepare the database, and run the HTTP server.
//! - Print startup failures to stderr and exit non-zero.

use clap::{Parser, Subcommand};
use log::error;
use notevault_core::{core_version, default_log_level, init_logging, LogConfig};
use notevault_server::config::{env_value, LOG_DIR_ENV, LOG_LEVEL_ENV};
use notevault_server::{NoteServer, ServerConfig};
use std::path::PathBuf;

/// Versioned notes server
#[derive(Parser, Debug)]
#[command(name = "notevault")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP API server
    Serve(ServeArgs),

    /// Print the core library version and exit
    Version,
}

#[derive(clap::Args, Debug, Default)]
struct ServeArgs {
    /// Path to a JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long)]
    db: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to
    #[arg(long)]
    port: Option<u16>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; stderr when omitted
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Serve(args) => serve(args),
        Command::Version => {
            println!("notevault_core version={}", core_version());
            Ok(())
        }
    };

    if let Err(message) = result {
        eprintln!("notevault: {message}");
        std::process::exit(1);
    }
}

fn serve(args: ServeArgs) -> Result<(), String> {
    let env = |key: &str| std::env::var(key).ok();
    init_logging(&resolve_log_config(&args, env))?;

    let config = resolve_server_config(&args, env)?;
    let server = NoteServer::with_config(config).map_err(|err| err.to_string())?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|err| format!("failed to start async runtime: {err}"))?;
    runtime.block_on(server.start()).map_err(|err| {
        error!("event=server_stop module=cli status=error error={err}");
        err.to_string()
    })
}

fn resolve_log_config(args: &ServeArgs, env: impl Fn(&str) -> Option<String>) -> LogConfig {
    let level = args
        .log_level
        .clone()
        .or_else(|| env_value(&env, LOG_LEVEL_ENV))
        .unwrap_or_else(|| default_log_level().to_string());
    let log_dir = args
        .log_dir
        .clone()
        .or_else(|| env_value(&env, LOG_DIR_ENV).map(PathBuf::from));
    LogConfig { level, log_dir }
}

fn resolve_server_config(
    args: &ServeArgs,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ServerConfig, String> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_json_file(path).map_err(|err| err.to_string())?,
        None => ServerConfig::default(),
    };
    config.apply_env_with(env);

    if let Some(db) = &args.db {
        config.db_path = db.clone();
    }
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_flags_are_parsed() {
        let cli = Cli::try_parse_from([
            "notevault", "serve", "--db", "/tmp/n.db", "--port", "9000", "--log-level", "warn",
        ])
        .unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve command");
        };
        assert_eq!(args.db, Some(PathBuf::from("/tmp/n.db")));
        assert_eq!(args.port, Some(9000));
        assert_eq!(args.log_level.as_deref(), Some("warn"));
    }

    #[test]
    fn flags_override_environment() {
        let env = |key: &str| match key {
            "NOTEVAULT_DB_PATH" => Some("/env/notes.db".to_string()),
            "NOTEVAULT_LOG_LEVEL" => Some("error".to_string()),
            _ => None,
        };

        let from_env = resolve_server_config(&ServeArgs::default(), env).unwrap();
        assert_eq!(from_env.db_path, PathBuf::from("/env/notes.db"));
        assert_eq!(resolve_log_config(&ServeArgs::default(), env).level, "error");

        let args = ServeArgs {
            db: Some(PathBuf::from("/flag/notes.db")),
            log_level: Some("debug".to_string()),
            ..ServeArgs::default()
        };
        assert_eq!(
            resolve_server_config(&args, env).unwrap().db_path,
            PathBuf::from("/flag/notes.db")
        );
        assert_eq!(resolve_log_config(&args, env).level, "debug");
    }

    #[test]
    fn defaults_apply_without_flags_or_environment() {
        let config = resolve_server_config(&ServeArgs::default(), no_env).unwrap();
        assert_eq!(config, ServerConfig::default());

        let log = resolve_log_config(&ServeArgs::default(), no_env);
        assert_eq!(log.level, default_log_level());
        assert_eq!(log.log_dir, None);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let args = ServeArgs {
            config: Some(PathBuf::from("/nonexistent/notevault.json")),
            ..ServeArgs::default()
        };
        let err = resolve_server_config(&args, no_env).unwrap_err();
        assert!(err.contains("failed to read config"));
    }
}
