//! `jetty embed` command

use anyhow::Result;

use crate::cli::EmbedArgs;
use jetty::ops::generate_embed;

pub fn execute(args: EmbedArgs) -> Result<()> {
    generate_embed(&args.input, &args.output)
}
