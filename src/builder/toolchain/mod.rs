//! Toolchains and how their commands are spelled.
//!
//! A [`Toolchain`] is a set of tool paths for one target triple. Tools are
//! optional: a cross toolchain directory missing `g++` is perfectly usable
//! for C-only targets, and the missing tool is only reported once a target
//! actually needs it.
//!
//! Command lines come in two dialects, chosen by the triple's runtime:
//! GNU-style ([`GnuStyle`], gcc and clang) and MSVC-style ([`MsvcStyle`],
//! cl, clang-cl, link, lld-link and lib).

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::target::Language;
use crate::core::triple::Triple;
use crate::util::errors::BuildError;
use crate::util::process::ProcessBuilder;

mod detect;
mod gcc;
mod msvc;

pub use detect::{find_llvm_toolchain, find_toolchain, native_toolchain};
pub use gcc::GnuStyle;
pub use msvc::MsvcStyle;

/// One of the tools a toolchain may provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    CCompiler,
    CxxCompiler,
    Linker,
    Archiver,
    AltCompiler,
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ToolKind::CCompiler => "C compiler",
            ToolKind::CxxCompiler => "C++ compiler",
            ToolKind::Linker => "linker",
            ToolKind::Archiver => "archiver",
            ToolKind::AltCompiler => "alternate compiler",
        })
    }
}

/// Tools for one target triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub triple: Triple,
    pub cc: Option<PathBuf>,
    pub cxx: Option<PathBuf>,
    pub ld: Option<PathBuf>,
    pub ar: Option<PathBuf>,
    /// Compiler used in place of `cc`/`cxx` for MSVC targets (clang-cl).
    pub alt_cc: Option<PathBuf>,
    pub sysroot: Option<PathBuf>,
}

impl Toolchain {
    /// A toolchain with no tools resolved yet.
    pub fn new(triple: Triple) -> Self {
        Toolchain {
            triple,
            cc: None,
            cxx: None,
            ld: None,
            ar: None,
            alt_cc: None,
            sysroot: None,
        }
    }

    pub fn tool(&self, kind: ToolKind) -> Option<&Path> {
        match kind {
            ToolKind::CCompiler => self.cc.as_deref(),
            ToolKind::CxxCompiler => self.cxx.as_deref(),
            ToolKind::Linker => self.ld.as_deref(),
            ToolKind::Archiver => self.ar.as_deref(),
            ToolKind::AltCompiler => self.alt_cc.as_deref(),
        }
    }

    /// The path of `kind`, or [`BuildError::ToolNotFound`].
    pub fn require(&self, kind: ToolKind) -> Result<&Path> {
        self.tool(kind).ok_or_else(|| {
            BuildError::ToolNotFound {
                triple: self.get_triple(),
                tool: kind,
            }
            .into()
        })
    }

    /// Which tool compiles `language`.
    pub fn compiler_kind(&self, language: Language) -> ToolKind {
        if self.is_msvc() && self.alt_cc.is_some() {
            return ToolKind::AltCompiler;
        }
        match language {
            Language::Cxx => ToolKind::CxxCompiler,
            Language::C | Language::Asm => ToolKind::CCompiler,
        }
    }

    /// Which tool drives the link step.
    pub fn link_driver_kind(&self, uses_cxx: bool) -> ToolKind {
        if self.is_msvc() {
            ToolKind::Linker
        } else if uses_cxx {
            ToolKind::CxxCompiler
        } else {
            ToolKind::CCompiler
        }
    }

    pub fn object_extension(&self) -> &'static str {
        if self.is_msvc() {
            "obj"
        } else {
            "o"
        }
    }

    pub fn is_msvc(&self) -> bool {
        self.triple.is_msvc()
    }

    /// The triple as written for `--target=` and directory names.
    pub fn get_triple(&self) -> String {
        self.triple.to_string()
    }

    /// The command dialect for this toolchain.
    pub fn style(&self) -> &'static dyn CommandStyle {
        if self.is_msvc() {
            &MsvcStyle
        } else {
            &GnuStyle
        }
    }
}

impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "triple:  {}", self.get_triple())?;
        for (label, kind) in [
            ("cc", ToolKind::CCompiler),
            ("c++", ToolKind::CxxCompiler),
            ("ld", ToolKind::Linker),
            ("ar", ToolKind::Archiver),
            ("alt cc", ToolKind::AltCompiler),
        ] {
            match self.tool(kind) {
                Some(path) => writeln!(f, "{:<8} {}", format!("{}:", label), path.display())?,
                None => writeln!(f, "{:<8} (none)", format!("{}:", label))?,
            }
        }
        match self.sysroot {
            Some(ref sysroot) => write!(f, "sysroot: {}", sysroot.display()),
            None => write!(f, "sysroot: (none)"),
        }
    }
}

/// Whether `tool` is a clang driver, which needs `--target=` to cross compile.
pub fn is_multi_target_driver(tool: &Path) -> bool {
    tool.file_name()
        .map(|name| name.to_string_lossy().contains("clang"))
        .unwrap_or(false)
}

/// Input for a compile or dependency-scan step.
#[derive(Debug, Clone, Copy)]
pub struct CompileInput<'a> {
    /// Compiler to run
    pub tool: &'a Path,
    /// Source file to compile
    pub source: &'a Path,
    /// Language flags
    pub flags: &'a [String],
    /// Include directories
    pub include_dirs: &'a [PathBuf],
}

/// A library handed to the linker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkLibrary {
    /// Link these object files directly.
    Objects(Vec<PathBuf>),
    /// Search `dir` for the library called `name`.
    Named { dir: PathBuf, name: String },
}

/// Input for a link step.
#[derive(Debug, Clone)]
pub struct LinkInput<'a> {
    /// Driver or linker to run
    pub driver: &'a Path,
    /// Output file (executable or shared library)
    pub output: &'a Path,
    /// Object files to link
    pub objects: &'a [PathBuf],
    /// Libraries, in link order
    pub libraries: Vec<LinkLibrary>,
    pub system_libs: &'a [String],
    pub frameworks: &'a [String],
    pub ldflags: &'a [String],
    pub shared: bool,
}

/// Input for an archive step (creating static library).
#[derive(Debug, Clone, Copy)]
pub struct ArchiveInput<'a> {
    pub archiver: &'a Path,
    /// Output archive file
    pub output: &'a Path,
    /// Object files to archive
    pub objects: &'a [PathBuf],
}

/// Spells compile, scan, link and archive commands for one dialect.
pub trait CommandStyle: Send + Sync {
    /// Compile `input.source` into `object`.
    fn compile_command(&self, tc: &Toolchain, input: &CompileInput<'_>, object: &Path)
        -> ProcessBuilder;

    /// Ask the compiler for the files `input.source` includes.
    fn scan_command(&self, tc: &Toolchain, input: &CompileInput<'_>) -> ProcessBuilder;

    /// Link an executable or shared library.
    fn link_command(&self, tc: &Toolchain, input: &LinkInput<'_>) -> ProcessBuilder;

    /// Create a static library.
    fn archive_command(&self, tc: &Toolchain, input: &ArchiveInput<'_>) -> ProcessBuilder;
}

/// `--target=` for clang drivers, then `--sysroot=` unless MSVC.
pub(crate) fn target_args(tc: &Toolchain, tool: &Path, mut cmd: ProcessBuilder) -> ProcessBuilder {
    if is_multi_target_driver(tool) {
        cmd = cmd.arg(format!("--target={}", tc.get_triple()));
    }
    if !tc.is_msvc() {
        if let Some(ref sysroot) = tc.sysroot {
            cmd = cmd.arg(format!("--sysroot={}", sysroot.display()));
        }
    }
    cmd
}
