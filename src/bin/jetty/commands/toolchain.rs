//! `jetty toolchain` command

use anyhow::Result;

use crate::cli::ToolchainArgs;
use jetty::builder::BuildContext;
use jetty::ops::resolve_toolchain;
use jetty::util::config::Config;

pub fn execute(args: ToolchainArgs, config: Config) -> Result<()> {
    let ctx = BuildContext::new(config)?;
    let tc = resolve_toolchain(&ctx, args.triple.as_deref(), args.llvm)?;

    println!("{}", tc);
    Ok(())
}
