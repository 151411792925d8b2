//! Tracing subscriber setup.
//!
//! Filter priority, highest first: `ROLO_LOG`, `RUST_LOG`, then the level
//! implied by `-v`/`-q`. The TUI owns the terminal, so interactive runs log
//! to a file under the cache directory instead of stderr.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use directories::BaseDirs;
use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ROLO_LOG";
const LOG_FILE_NAME: &str = "rolo.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    /// Verbose wins when both flags are given.
    pub const fn from_flags(verbose: bool, quiet: bool) -> Self {
        if verbose {
            Self::Verbose
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    pub const fn default_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::DEBUG,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Stderr,
    /// Append to `<cache dir>/rolo/rolo.log`.
    File,
}

/// Install the global subscriber. Returns the log file path when logging to a file.
pub fn init(verbosity: Verbosity, target: Target) -> Result<Option<PathBuf>> {
    let filter = build_env_filter(verbosity);

    match target {
        Target::Stderr => {
            let use_ansi = std::io::IsTerminal::is_terminal(&std::io::stderr());
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(use_ansi)
                .with_target(false)
                .without_time()
                .compact();
            // Ignore double init, e.g. when a test harness installed one already.
            let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
            Ok(None)
        }
        Target::File => {
            let path = log_path()?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true);
            let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
            Ok(Some(path))
        }
    }
}

pub fn log_path() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.cache_dir().join("rolo").join(LOG_FILE_NAME))
}

fn build_env_filter(verbosity: Verbosity) -> EnvFilter {
    let from_env = |name: &str| {
        std::env::var(name)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .and_then(|directives| EnvFilter::try_new(directives).ok())
    };

    from_env(LOG_ENV)
        .or_else(|| from_env("RUST_LOG"))
        .unwrap_or_else(|| directive_filter(verbosity))
}

fn directive_filter(verbosity: Verbosity) -> EnvFilter {
    let level = verbosity.default_level();
    let directive = match verbosity {
        Verbosity::Verbose => format!("{level},rolo=debug"),
        _ => level.to_string(),
    };
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Verbose);
    }

    #[test]
    fn test_default_levels() {
        assert_eq!(Verbosity::Quiet.default_level(), Level::ERROR);
        assert_eq!(Verbosity::Normal.default_level(), Level::WARN);
        assert_eq!(Verbosity::Verbose.default_level(), Level::DEBUG);
    }
}
