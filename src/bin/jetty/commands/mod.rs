//! Command implementations

use anyhow::{Context, Result};

use crate::cli::Cli;
use jetty::util::config::Config;

pub mod build;
pub mod build_file;
pub mod cc;
pub mod completions;
pub mod embed;
pub mod init;
pub mod init_freestanding;
pub mod library;
pub mod toolchain;

/// Configuration files, then environment, then command-line flags.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let cwd = std::env::current_dir().context("failed to read the current directory")?;
    let mut config = Config::discover(&cwd);

    config.build.verbose |= cli.verbose;
    config.build.pty |= cli.pty;
    if let Some(ref log_file) = cli.log_file {
        config.build.log_file = Some(log_file.clone());
    }

    Ok(config)
}
