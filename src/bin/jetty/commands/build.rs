//! `jetty build` command

use std::path::Path;

use anyhow::{bail, Result};

use crate::cli::BuildArgs;
use jetty::builder::BuildContext;
use jetty::ops::bootstrap;
use jetty::ops::jetty_init::BUILD_FILE;
use jetty::util::config::Config;

pub fn execute(args: BuildArgs, config: Config) -> Result<()> {
    run_description(Path::new(BUILD_FILE), &args.args, config)
}

/// Bootstrap and run the builder for `description`.
pub fn run_description(description: &Path, args: &[String], config: Config) -> Result<()> {
    if !description.is_file() {
        bail!("file not found: {}", description.display());
    }

    let ctx = BuildContext::new(config)?;
    bootstrap(&ctx, description, args)
}
