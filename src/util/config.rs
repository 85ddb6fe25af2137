//! Configuration file support for Jetty.
//!
//! Jetty reads two configuration files:
//! - Global: `~/.jetty/config.toml` - User-wide defaults
//! - Project: `.jetty/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config, `JETTY_*` environment
//! variables take precedence over both, and command-line flags win last.
//! The bootstrapper hands the effective configuration to builder programs
//! through the same environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const ENV_VERBOSE: &str = "JETTY_VERBOSE";
pub const ENV_PTY: &str = "JETTY_PTY";
pub const ENV_LOG_FILE: &str = "JETTY_LOG_FILE";
pub const ENV_TOOLCHAIN_DIR: &str = "JETTY_TOOLCHAIN_DIR";
pub const ENV_LLVM_DIR: &str = "JETTY_LLVM_DIR";
pub const ENV_LIB_DIR: &str = "JETTY_LIB_DIR";

/// Default location of cross toolchains, relative to the working directory.
pub const DEFAULT_TOOLCHAIN_DIR: &str = "toolchains";

/// Jetty configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Toolchain locations
    pub toolchain: ToolchainDirs,

    /// Engine library settings
    pub engine: EngineConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Echo every command before running it
    pub verbose: bool,

    /// Run tools on a pseudo-terminal (unix only)
    pub pty: bool,

    /// Append tool output to this file
    pub log_file: Option<PathBuf>,

    /// Keep the synthesized builder source after bootstrapping
    pub keep_builder_source: bool,
}

/// Where cross and LLVM toolchains live.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainDirs {
    /// Root holding one directory per target triple
    pub dir: Option<PathBuf>,

    /// Flat LLVM installation (defaults to `<dir>/llvm`)
    pub llvm_dir: Option<PathBuf>,
}

/// Engine library settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the engine's static library
    pub lib_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Effective configuration for a run started in `cwd`: files, then
    /// environment.
    pub fn discover(cwd: &Path) -> Self {
        let global = global_config_path().unwrap_or_default();
        let mut config = load_config(&global, &project_config_path(cwd));
        config.apply_env();
        config
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.verbose {
            self.build.verbose = true;
        }
        if other.build.pty {
            self.build.pty = true;
        }
        if other.build.log_file.is_some() {
            self.build.log_file = other.build.log_file;
        }
        if other.build.keep_builder_source {
            self.build.keep_builder_source = true;
        }

        if other.toolchain.dir.is_some() {
            self.toolchain.dir = other.toolchain.dir;
        }
        if other.toolchain.llvm_dir.is_some() {
            self.toolchain.llvm_dir = other.toolchain.llvm_dir;
        }

        if other.engine.lib_dir.is_some() {
            self.engine.lib_dir = other.engine.lib_dir;
        }
    }

    /// Apply `JETTY_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply `JETTY_*` overrides from an arbitrary lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);

        if let Some(verbose) = lookup(ENV_VERBOSE).and_then(|v| parse_bool(&v)) {
            self.build.verbose = verbose;
        }
        if let Some(pty) = lookup(ENV_PTY).and_then(|v| parse_bool(&v)) {
            self.build.pty = pty;
        }
        if let Some(log_file) = path(ENV_LOG_FILE) {
            self.build.log_file = Some(log_file);
        }
        if let Some(dir) = path(ENV_TOOLCHAIN_DIR) {
            self.toolchain.dir = Some(dir);
        }
        if let Some(dir) = path(ENV_LLVM_DIR) {
            self.toolchain.llvm_dir = Some(dir);
        }
        if let Some(dir) = path(ENV_LIB_DIR) {
            self.engine.lib_dir = Some(dir);
        }
    }

    /// The environment a builder program needs to see this configuration.
    pub fn export_env(&self) -> Vec<(String, String)> {
        let flag = |on: bool| if on { "1" } else { "0" }.to_string();

        let mut vars = vec![
            (ENV_VERBOSE.to_string(), flag(self.build.verbose)),
            (ENV_PTY.to_string(), flag(self.build.pty)),
            (
                ENV_TOOLCHAIN_DIR.to_string(),
                self.toolchain_dir().display().to_string(),
            ),
            (
                ENV_LLVM_DIR.to_string(),
                self.llvm_dir().display().to_string(),
            ),
        ];

        if let Some(ref log_file) = self.build.log_file {
            vars.push((ENV_LOG_FILE.to_string(), log_file.display().to_string()));
        }
        if let Ok(dir) = self.engine_lib_dir() {
            vars.push((ENV_LIB_DIR.to_string(), dir.display().to_string()));
        }

        vars
    }

    /// Root of the cross toolchain layout.
    pub fn toolchain_dir(&self) -> PathBuf {
        self.toolchain
            .dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOOLCHAIN_DIR))
    }

    /// Root of the flat LLVM layout.
    pub fn llvm_dir(&self) -> PathBuf {
        self.toolchain
            .llvm_dir
            .clone()
            .unwrap_or_else(|| self.toolchain_dir().join("llvm"))
    }

    /// Directory holding the engine's static library; defaults to the
    /// directory of the running executable.
    pub fn engine_lib_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.engine.lib_dir {
            return Ok(dir.clone());
        }

        let exe = std::env::current_exe().context("failed to locate the running executable")?;
        exe.parent()
            .map(Path::to_path_buf)
            .with_context(|| format!("executable has no parent directory: {}", exe.display()))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Get the global jetty config directory (~/.jetty).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".jetty"))
}

/// Get the global config path (~/.jetty/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.jetty/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".jetty").join("config.toml")
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.jetty/config.toml)
/// 2. Global config (~/.jetty/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}
