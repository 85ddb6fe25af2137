//! `jetty build-file` command

use anyhow::Result;

use super::build::run_description;
use crate::cli::BuildFileArgs;
use jetty::util::config::Config;

pub fn execute(args: BuildFileArgs, config: Config) -> Result<()> {
    run_description(&args.file, &args.args, config)
}
