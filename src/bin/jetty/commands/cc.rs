//! `jetty cc` command

use anyhow::Result;

use crate::cli::CcArgs;
use jetty::builder::BuildContext;
use jetty::ops::cc;
use jetty::util::config::Config;

pub fn execute(args: CcArgs, config: Config) -> Result<()> {
    let ctx = BuildContext::new(config)?;
    cc(&ctx, &args.args)
}
