//! `jetty init` command

use std::path::Path;

use anyhow::Result;

use jetty::ops::init_project;

pub fn execute() -> Result<()> {
    for path in init_project(Path::new("."))? {
        eprintln!("     Created {}", path.display());
    }
    Ok(())
}
