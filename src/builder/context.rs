//! Build context - configuration, command runner and toolchains.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use anyhow::Result;

use crate::builder::native::NativeBuilder;
use crate::builder::toolchain::{self, Toolchain};
use crate::core::target::{Executable, Library, Target};
use crate::core::triple::Triple;
use crate::util::config::Config;
use crate::util::process::{CommandRunner, Executor};

/// State shared by one build invocation. Every subprocess goes through
/// `runner`; the native toolchain is resolved on first use.
pub struct BuildContext {
    config: Config,
    runner: Box<dyn CommandRunner>,
    native: OnceLock<Arc<Toolchain>>,
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("config", &self.config)
            .field("native", &self.native.get())
            .finish_non_exhaustive()
    }
}

impl BuildContext {
    /// Create a context running commands through a real [`Executor`].
    pub fn new(config: Config) -> Result<Self> {
        let executor = Executor::from_config(&config)?;
        Ok(BuildContext {
            config,
            runner: Box::new(executor),
            native: OnceLock::new(),
        })
    }

    /// Replace the command runner.
    pub fn with_runner(mut self, runner: impl CommandRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    /// Use `toolchain` instead of resolving the host's.
    pub fn with_native_toolchain(self, toolchain: Toolchain) -> Self {
        let native = OnceLock::new();
        let _ = native.set(Arc::new(toolchain));
        BuildContext { native, ..self }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    /// The host toolchain, resolved on first use.
    pub fn native_toolchain(&self) -> Arc<Toolchain> {
        self.native
            .get_or_init(|| Arc::new(toolchain::native_toolchain(self.runner())))
            .clone()
    }

    /// The toolchain for `triple`: native for the host, otherwise the cross
    /// toolchain under the configured toolchain directory.
    pub fn find_toolchain(&self, triple: &Triple) -> Result<Arc<Toolchain>> {
        if triple.is_host() {
            return Ok(self.native_toolchain());
        }
        toolchain::find_toolchain(&self.config.toolchain_dir(), triple).map(Arc::new)
    }

    /// The LLVM toolchain for `triple`.
    pub fn find_llvm_toolchain(&self, triple: &Triple) -> Arc<Toolchain> {
        Arc::new(toolchain::find_llvm_toolchain(
            &self.config.llvm_dir(),
            &self.config.toolchain_dir(),
            triple,
        ))
    }

    /// The toolchain `target` builds with.
    pub fn toolchain_for(&self, target: &Target) -> Arc<Toolchain> {
        match target.toolchain {
            Some(ref tc) => Arc::clone(tc),
            None => self.native_toolchain(),
        }
    }

    /// Build an executable and its libraries, returning the executable's path.
    pub fn build_executable(&self, exe: &Executable) -> Result<PathBuf> {
        NativeBuilder::new(self).build_executable(exe)
    }

    /// Build a library and its libraries, returning the library's path.
    pub fn build_library(&self, lib: &Library) -> Result<PathBuf> {
        NativeBuilder::new(self).build_library(lib)
    }
}
