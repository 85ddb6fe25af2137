//! Implementation of `jetty init` and `jetty init-freestanding`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::ops::bootstrap::{host_system_libs, BUILDER_NAME, ENGINE_HEADER};
use crate::util::fs::write_string;
use crate::util::strbuf::StringBuilder;

/// Default build description name.
pub const BUILD_FILE: &str = "build.jetty";

/// Header written next to a freestanding description.
pub const HEADER_FILE: &str = "jetty.h";

/// Script that builds and runs a freestanding description.
pub const BUILD_SCRIPT: &str = "build.sh";

const BUILD_TEMPLATE: &str = include_str!("../../templates/build.jetty");
const MAIN_TEMPLATE: &str = include_str!("../../templates/main.c");

/// Scaffold `build.jetty` and `src/main.c` in `dir`.
///
/// Nothing is written if either file already exists.
pub fn init_project(dir: &Path) -> Result<Vec<PathBuf>> {
    create_files(vec![
        (dir.join(BUILD_FILE), BUILD_TEMPLATE.to_string()),
        (dir.join("src").join("main.c"), MAIN_TEMPLATE.to_string()),
    ])
}

/// Scaffold a project that builds without the `jetty` command: the
/// description includes a copy of the engine header, and `build.sh` compiles
/// it against the engine library at `engine_lib`.
pub fn init_freestanding(dir: &Path, engine_lib: &Path) -> Result<Vec<PathBuf>> {
    let description = format!("#include \"{}\"\n\n{}", HEADER_FILE, BUILD_TEMPLATE);

    let created = create_files(vec![
        (dir.join(BUILD_FILE), description),
        (dir.join(HEADER_FILE), ENGINE_HEADER.to_string()),
        (dir.join(BUILD_SCRIPT), build_script(engine_lib)),
        (dir.join("src").join("main.c"), MAIN_TEMPLATE.to_string()),
    ])?;

    make_executable(&dir.join(BUILD_SCRIPT))?;
    Ok(created)
}

/// `sh` script compiling the description into a builder and running it with
/// the script's arguments.
pub fn build_script(engine_lib: &Path) -> String {
    let builder = format!("build/.jetty/{}", BUILDER_NAME);
    let mut script = StringBuilder::new();

    script.push_line("#!/bin/sh");
    script.push_line("set -e");
    script.push_line("mkdir -p build/.jetty");
    script.push_fmt(format_args!(
        "${{CC:-cc}} -o {} -x c {} -x none {}",
        builder,
        BUILD_FILE,
        shell_quote(&engine_lib.display().to_string())
    ));
    for lib in host_system_libs() {
        script.push_fmt(format_args!(" -l{}", lib));
    }
    script.push('\n');
    script.push_fmt(format_args!("exec ./{} \"$@\"\n", builder));

    script.into_string()
}

fn shell_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', "'\\''"))
}

/// Write every file, or none if any of them already exists.
fn create_files(files: Vec<(PathBuf, String)>) -> Result<Vec<PathBuf>> {
    for (path, _) in &files {
        if path.exists() {
            bail!("`{}` already exists, aborting", path.display());
        }
    }

    let mut created = Vec::with_capacity(files.len());
    for (path, contents) in files {
        write_string(&path, &contents)?;
        created.push(path);
    }

    Ok(created)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    use crate::util::errors::BuildError;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| BuildError::file_io("make executable", path, e))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
