//! `jetty init-freestanding` command

use std::path::Path;

use anyhow::Result;

use jetty::core::triple::Triple;
use jetty::ops::bootstrap::engine_library_path;
use jetty::ops::init_freestanding;
use jetty::util::config::Config;

pub fn execute(config: Config) -> Result<()> {
    let engine_lib = engine_library_path(&config.engine_lib_dir()?, Triple::host().vendor);
    if !engine_lib.is_file() {
        tracing::warn!(
            "engine library not found at {}, build.sh will not link until it exists",
            engine_lib.display()
        );
    }

    for path in init_freestanding(Path::new("."), &engine_lib)? {
        eprintln!("     Created {}", path.display());
    }
    Ok(())
}
