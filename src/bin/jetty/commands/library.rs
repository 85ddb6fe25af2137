//! `jetty library` command

use std::io::{self, Write};

use anyhow::{Context, Result};

use jetty::ops::ENGINE_HEADER;

pub fn execute() -> Result<()> {
    io::stdout()
        .lock()
        .write_all(ENGINE_HEADER.as_bytes())
        .context("failed to write to stdout")
}
