//! The meta-build: turning a build description into a running builder.
//!
//! A description (`build.jetty`) is C source. It is compiled together with
//! the engine header into `<dir>/build/.jetty/jetty_builder`, linked against the
//! engine's static library, and run. The builder binary is reused until the
//! description or the engine library changes.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::context::BuildContext;
use crate::builder::toolchain::Toolchain;
use crate::core::target::{Executable, Target, TargetKind};
use crate::core::triple::Vendor;
use crate::util::config::ENV_LOG_FILE;
use crate::util::fs::{mtime, read_to_string, remove_file_if_exists, write_string};
use crate::util::process::ProcessBuilder;
use crate::util::strbuf::StringBuilder;

/// The header every description is compiled with.
pub const ENGINE_HEADER: &str = include_str!("../../include/jetty.h");

/// File stem of the builder executable and its synthesized source.
pub const BUILDER_NAME: &str = "jetty_builder";

/// Name of the engine's static library, before platform decoration.
pub const ENGINE_LIB_NAME: &str = "jetty";

/// Where a builder stands relative to its description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    NoBuilder,
    StaleBuilder,
    FreshBuilder,
}

/// Folder holding the builder for `description`, kept apart from the
/// targets a description builds into `build/`.
pub fn builder_dir(description: &Path) -> PathBuf {
    description
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join("build")
        .join(".jetty")
}

/// `<dir>/build/.jetty/jetty_builder[.exe]`
pub fn builder_path(description: &Path, vendor: Vendor) -> PathBuf {
    builder_dir(description).join(TargetKind::Exe.output_filename(BUILDER_NAME, vendor))
}

/// `libjetty.a` or `jetty.lib` under `lib_dir`.
pub fn engine_library_path(lib_dir: &Path, vendor: Vendor) -> PathBuf {
    lib_dir.join(TargetKind::StaticLib.output_filename(ENGINE_LIB_NAME, vendor))
}

/// Decide whether the builder must be (re)built.
pub fn builder_state(description: &Path, builder: &Path, engine_lib: &Path) -> BuilderState {
    let Some(built) = mtime(builder) else {
        return BuilderState::NoBuilder;
    };

    let newer = |path: &Path| mtime(path).is_some_and(|t| t > built);
    if newer(description) || newer(engine_lib) {
        BuilderState::StaleBuilder
    } else {
        BuilderState::FreshBuilder
    }
}

/// Libraries a Rust static library needs from the host.
pub fn host_system_libs() -> &'static [&'static str] {
    if cfg!(target_os = "windows") {
        &["kernel32", "advapi32", "ntdll", "userenv", "ws2_32", "bcrypt"]
    } else if cfg!(target_os = "macos") {
        &["System", "c", "m"]
    } else {
        &["gcc_s", "util", "rt", "pthread", "m", "dl", "c"]
    }
}

/// The single translation unit a builder is compiled from: the engine
/// header, then the description with its own line numbers.
pub fn synthesize_source(description: &Path, text: &str) -> String {
    let mut source = StringBuilder::with_capacity(ENGINE_HEADER.len() + text.len() + 256);

    source.push_str(ENGINE_HEADER);
    if !source.at_line_start() {
        source.push('\n');
    }

    let name = description
        .display()
        .to_string()
        .replace('\\', "\\\\")
        .replace('"', "\\\"");
    source.push_fmt(format_args!("#line 1 \"{}\"\n", name));
    source.push_str(text);
    if !source.at_line_start() {
        source.push('\n');
    }

    source.into_string()
}

/// Link arguments for the engine library and what it depends on. They go
/// after everything else so the library's own references resolve.
fn engine_link_flags(tc: &Toolchain, engine_lib: &Path) -> Vec<String> {
    let mut flags = vec![engine_lib.display().to_string()];
    for lib in host_system_libs() {
        if tc.is_msvc() {
            flags.push(format!("{}.lib", lib));
        } else {
            flags.push(format!("-l{}", lib));
        }
    }
    flags
}

/// Compile and link the builder for `description`.
pub fn build_builder(ctx: &BuildContext, description: &Path, engine_lib: &Path) -> Result<PathBuf> {
    let tc = ctx.native_toolchain();
    let text = read_to_string(description)?;

    let dir = builder_dir(description);
    let source = dir.join(format!("{}.c", BUILDER_NAME));
    write_string(&source, &synthesize_source(description, &text))?;

    let mut target = Target::new(BUILDER_NAME, &dir)
        .source(&source)
        .toolchain(tc.clone());
    target.ldflags = engine_link_flags(&tc, engine_lib);

    tracing::info!("Building {}", description.display());
    let built = ctx.build_executable(&Executable::from_target(target));

    if !ctx.config().build.keep_builder_source {
        remove_file_if_exists(&source)?;
    }

    built
}

/// Run the builder, handing it the effective configuration.
pub fn run_builder(ctx: &BuildContext, builder: &Path, args: &[String]) -> Result<()> {
    // The builder's output is already logged here as it is echoed.
    let env = ctx
        .config()
        .export_env()
        .into_iter()
        .filter(|(key, _)| key != ENV_LOG_FILE);

    let cmd = ProcessBuilder::new(builder).args(args).envs(env);
    ctx.runner().run(&cmd)?;
    Ok(())
}

/// Build the builder for `description` if needed, then run it with `args`.
pub fn bootstrap(ctx: &BuildContext, description: &Path, args: &[String]) -> Result<()> {
    let vendor = ctx.native_toolchain().triple.vendor;
    let builder = builder_path(description, vendor);
    let engine_lib = engine_library_path(&ctx.config().engine_lib_dir()?, vendor);

    match builder_state(description, &builder, &engine_lib) {
        BuilderState::NoBuilder | BuilderState::StaleBuilder => {
            build_builder(ctx, description, &engine_lib)?;
        }
        BuilderState::FreshBuilder => {
            tracing::debug!("{} is up to date", builder.display());
        }
    }

    run_builder(ctx, &builder, args)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::core::triple::Triple;
    use crate::test_support::FakeRunner;
    use crate::util::config::Config;

    struct Fixture {
        tmp: TempDir,
        runner: FakeRunner,
        ctx: BuildContext,
        description: PathBuf,
        engine_lib: PathBuf,
        builder: PathBuf,
    }

    fn fixture(keep_source: bool) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let runner = FakeRunner::new();

        let mut tc = Toolchain::new(Triple::host());
        tc.cc = Some(PathBuf::from("cc"));
        tc.cxx = Some(PathBuf::from("c++"));
        tc.ld = Some(PathBuf::from("ld"));
        tc.ar = Some(PathBuf::from("ar"));
        let vendor = tc.triple.vendor;

        let mut config = Config::default();
        config.engine.lib_dir = Some(tmp.path().join("lib"));
        config.build.keep_builder_source = keep_source;

        let ctx = BuildContext::new(config)
            .unwrap()
            .with_runner(runner.clone())
            .with_native_toolchain(tc);

        let engine_lib = engine_library_path(&tmp.path().join("lib"), vendor);
        runner.touch(&engine_lib);
        let description = tmp.path().join("build.jetty");
        fs::write(&description, "int main(void) { return 0; }\n").unwrap();
        runner.touch(&description);
        let builder = builder_path(&description, vendor);

        Fixture {
            tmp,
            runner,
            ctx,
            description,
            engine_lib,
            builder,
        }
    }

    #[test]
    fn test_builder_paths() {
        let desc = Path::new("proj/build.jetty");
        assert_eq!(
            builder_path(desc, Vendor::Linux),
            PathBuf::from("proj/build/.jetty/jetty_builder")
        );
        assert_eq!(
            builder_path(desc, Vendor::Windows),
            PathBuf::from("proj/build/.jetty/jetty_builder.exe")
        );
        assert_eq!(
            builder_path(Path::new("build.jetty"), Vendor::Apple),
            PathBuf::from("build/.jetty/jetty_builder")
        );

        assert_eq!(
            engine_library_path(Path::new("lib"), Vendor::Linux),
            PathBuf::from("lib/libjetty.a")
        );
        assert_eq!(
            engine_library_path(Path::new("lib"), Vendor::Windows),
            PathBuf::from("lib/jetty.lib")
        );
    }

    #[test]
    fn test_synthesized_source_layout() {
        let source = synthesize_source(Path::new("dir/build.jetty"), "int main(void) { return 0; }");

        assert!(source.starts_with(ENGINE_HEADER));
        assert!(source.contains("\n#line 1 \"dir/build.jetty\"\nint main(void)"));
        assert!(source.ends_with("}\n"));
    }

    #[test]
    fn test_line_directive_escapes_path() {
        let source = synthesize_source(Path::new("C:\\proj\\build.jetty"), "");
        assert!(source.contains("#line 1 \"C:\\\\proj\\\\build.jetty\""));
    }

    #[test]
    fn test_builder_states() {
        let fx = fixture(false);
        assert_eq!(
            builder_state(&fx.description, &fx.builder, &fx.engine_lib),
            BuilderState::NoBuilder
        );

        fx.runner.touch(&fx.builder);
        assert_eq!(
            builder_state(&fx.description, &fx.builder, &fx.engine_lib),
            BuilderState::FreshBuilder
        );

        fx.runner.touch(&fx.description);
        assert_eq!(
            builder_state(&fx.description, &fx.builder, &fx.engine_lib),
            BuilderState::StaleBuilder
        );

        fx.runner.touch(&fx.builder);
        fx.runner.touch(&fx.engine_lib);
        assert_eq!(
            builder_state(&fx.description, &fx.builder, &fx.engine_lib),
            BuilderState::StaleBuilder
        );
    }

    #[test]
    fn test_bootstrap_builds_then_runs() {
        let fx = fixture(false);
        let args = vec!["release".to_string()];

        bootstrap(&fx.ctx, &fx.description, &args).unwrap();

        let calls = fx.runner.build_calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].has_arg("-c") || calls[0].has_arg("/c"));
        assert!(calls[1].has_arg(&fx.engine_lib.display().to_string()));
        assert_eq!(calls[2].program(), fx.builder.display().to_string());
        assert_eq!(calls[2].argv[1..], ["release".to_string()]);

        // The synthesized source is gone, the builder stays.
        assert!(!fx.tmp.path().join("build/.jetty/jetty_builder.c").exists());
        assert!(fx.builder.exists());
    }

    #[test]
    fn test_builder_objects_stay_out_of_target_folder() {
        let fx = fixture(false);
        bootstrap(&fx.ctx, &fx.description, &[]).unwrap();

        assert!(fx.tmp.path().join("build/.jetty/object").is_dir());
        // `build/` itself is left to the description's own targets.
        assert!(!fx.tmp.path().join("build/object").exists());
    }

    #[test]
    fn test_engine_library_links_before_system_libs() {
        let fx = fixture(false);
        bootstrap(&fx.ctx, &fx.description, &[]).unwrap();

        let link = &fx.runner.build_calls()[1];
        let lib_pos = link
            .argv
            .iter()
            .position(|a| *a == fx.engine_lib.display().to_string())
            .unwrap();
        let first_system = host_system_libs()[0];
        let sys_pos = link
            .argv
            .iter()
            .position(|a| a.contains(first_system))
            .unwrap();
        assert!(lib_pos < sys_pos);
    }

    #[test]
    fn test_fresh_builder_just_runs() {
        let fx = fixture(false);
        bootstrap(&fx.ctx, &fx.description, &[]).unwrap();
        fx.runner.clear_calls();

        bootstrap(&fx.ctx, &fx.description, &[]).unwrap();

        let calls = fx.runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program(), fx.builder.display().to_string());
    }

    #[test]
    fn test_edited_description_rebuilds() {
        let fx = fixture(false);
        bootstrap(&fx.ctx, &fx.description, &[]).unwrap();

        fx.runner.touch(&fx.description);
        fx.runner.clear_calls();
        bootstrap(&fx.ctx, &fx.description, &[]).unwrap();

        assert_eq!(fx.runner.build_calls().len(), 3);
    }

    #[test]
    fn test_keep_builder_source() {
        let fx = fixture(true);
        bootstrap(&fx.ctx, &fx.description, &[]).unwrap();

        let source = fs::read_to_string(fx.tmp.path().join("build/.jetty/jetty_builder.c")).unwrap();
        assert!(source.starts_with(ENGINE_HEADER));
        assert!(source.ends_with("int main(void) { return 0; }\n"));
    }

    #[test]
    fn test_missing_description() {
        let fx = fixture(false);
        let missing = fx.tmp.path().join("nope.jetty");

        let err = bootstrap(&fx.ctx, &missing, &[]).unwrap_err();
        assert!(format!("{:#}", err).contains("nope.jetty"));
        assert!(fx.runner.calls().is_empty());
    }
}
