//! Target definitions - what gets built.
//!
//! A [`Target`] carries everything shared by executables and libraries:
//! sources, per-language flags, include paths, link inputs and the
//! toolchain. [`Executable`] and [`Library`] wrap it with what differs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::builder::toolchain::Toolchain;
use crate::core::triple::Vendor;

/// Directory under a target's build folder holding its object files.
pub const OBJECT_DIR: &str = "object";

/// Source language, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// C and Objective-C
    C,
    /// C++ and Objective-C++
    Cxx,
    /// Assembly, preprocessed or not
    Asm,
}

impl Language {
    /// Classify a source file by its extension.
    pub fn from_path(path: &Path) -> Option<Language> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "c" | "m" => Some(Language::C),
            "cpp" | "cc" | "cxx" | "c++" | "mm" => Some(Language::Cxx),
            "s" | "S" | "asm" => Some(Language::Asm),
            _ => None,
        }
    }
}

/// The kind of target being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Executable binary
    Exe,

    /// Static library (.a / .lib)
    StaticLib,

    /// Shared/dynamic library (.so / .dylib / .dll)
    SharedLib,
}

impl TargetKind {
    /// Get the typical file extension for this target kind.
    pub fn extension(&self, vendor: Vendor) -> &'static str {
        match (self, vendor) {
            (TargetKind::Exe, Vendor::Windows) => "exe",
            (TargetKind::Exe, _) => "",
            (TargetKind::StaticLib, Vendor::Windows) => "lib",
            (TargetKind::StaticLib, _) => "a",
            (TargetKind::SharedLib, Vendor::Windows) => "dll",
            (TargetKind::SharedLib, Vendor::Apple) => "dylib",
            (TargetKind::SharedLib, _) => "so",
        }
    }

    /// Get the typical file prefix for this target kind.
    pub fn prefix(&self, vendor: Vendor) -> &'static str {
        match (self, vendor) {
            (TargetKind::Exe, _) | (_, Vendor::Windows) => "",
            _ => "lib",
        }
    }

    /// Get the output filename for a target.
    pub fn output_filename(&self, name: &str, vendor: Vendor) -> String {
        let prefix = self.prefix(vendor);
        let ext = self.extension(vendor);
        if ext.is_empty() {
            format!("{}{}", prefix, name)
        } else {
            format!("{}{}.{}", prefix, name, ext)
        }
    }
}

/// What executables and libraries have in common.
#[derive(Debug, Clone, Default)]
pub struct Target {
    pub name: String,
    pub build_folder: PathBuf,
    pub sources: Vec<PathBuf>,
    pub cflags: Vec<String>,
    pub cxxflags: Vec<String>,
    pub asmflags: Vec<String>,
    pub include_paths: Vec<PathBuf>,
    pub ldflags: Vec<String>,
    /// Apple frameworks; ignored for other vendors.
    pub frameworks: Vec<String>,
    pub system_libs: Vec<String>,
    /// Libraries linked into this target, built before it.
    pub libraries: Vec<Arc<Library>>,
    /// `None` builds with the native toolchain.
    pub toolchain: Option<Arc<Toolchain>>,
}

impl Target {
    pub fn new(name: impl Into<String>, build_folder: impl Into<PathBuf>) -> Self {
        Target {
            name: name.into(),
            build_folder: build_folder.into(),
            ..Default::default()
        }
    }

    pub fn source(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(path.into());
        self
    }

    pub fn sources<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.sources.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn cflag(mut self, flag: impl Into<String>) -> Self {
        self.cflags.push(flag.into());
        self
    }

    pub fn cxxflag(mut self, flag: impl Into<String>) -> Self {
        self.cxxflags.push(flag.into());
        self
    }

    pub fn asmflag(mut self, flag: impl Into<String>) -> Self {
        self.asmflags.push(flag.into());
        self
    }

    pub fn include(mut self, path: impl Into<PathBuf>) -> Self {
        self.include_paths.push(path.into());
        self
    }

    pub fn ldflag(mut self, flag: impl Into<String>) -> Self {
        self.ldflags.push(flag.into());
        self
    }

    pub fn framework(mut self, name: impl Into<String>) -> Self {
        self.frameworks.push(name.into());
        self
    }

    pub fn system_lib(mut self, name: impl Into<String>) -> Self {
        self.system_libs.push(name.into());
        self
    }

    pub fn library(mut self, library: impl Into<Arc<Library>>) -> Self {
        self.libraries.push(library.into());
        self
    }

    pub fn toolchain(mut self, toolchain: Arc<Toolchain>) -> Self {
        self.toolchain = Some(toolchain);
        self
    }

    /// Flags passed when compiling a source of `language`.
    pub fn flags_for(&self, language: Language) -> &[String] {
        match language {
            Language::C => &self.cflags,
            Language::Cxx => &self.cxxflags,
            Language::Asm => &self.asmflags,
        }
    }

    /// Folder holding this target's object files.
    pub fn object_dir(&self) -> PathBuf {
        self.build_folder.join(OBJECT_DIR)
    }

    /// Object file for `source`: `<build>/object/<stem>.<ext>`.
    pub fn object_path(&self, source: &Path, object_ext: &str) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.object_dir().join(format!("{}.{}", stem, object_ext))
    }

    /// Whether this target or any library it pulls in has C++ sources,
    /// which decides the link driver.
    pub fn uses_cxx(&self) -> bool {
        self.sources
            .iter()
            .any(|s| Language::from_path(s) == Some(Language::Cxx))
            || self.libraries.iter().any(|lib| lib.target.uses_cxx())
    }
}

/// A linked program.
#[derive(Debug, Clone)]
pub struct Executable {
    pub target: Target,
}

impl Executable {
    pub fn new(name: impl Into<String>, build_folder: impl Into<PathBuf>) -> Self {
        Executable {
            target: Target::new(name, build_folder),
        }
    }

    pub fn from_target(target: Target) -> Self {
        Executable { target }
    }

    pub fn kind(&self) -> TargetKind {
        TargetKind::Exe
    }
}

/// A static or shared library.
#[derive(Debug, Clone)]
pub struct Library {
    pub target: Target,
    pub shared: bool,
    /// Link dependents against this library's object files instead of
    /// its archive.
    pub use_objects: bool,
}

impl Library {
    pub fn new(name: impl Into<String>, build_folder: impl Into<PathBuf>) -> Self {
        Library::from_target(Target::new(name, build_folder))
    }

    pub fn from_target(target: Target) -> Self {
        Library {
            target,
            shared: false,
            use_objects: false,
        }
    }

    pub fn shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }

    pub fn use_objects(mut self, use_objects: bool) -> Self {
        self.use_objects = use_objects;
        self
    }

    pub fn kind(&self) -> TargetKind {
        if self.shared {
            TargetKind::SharedLib
        } else {
            TargetKind::StaticLib
        }
    }
}
