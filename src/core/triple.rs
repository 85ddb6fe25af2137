//! Target triples.
//!
//! A triple is reduced to the three facts the engine acts on: instruction
//! set, vendor (which decides artifact naming and framework support) and
//! runtime (which decides the MSVC vs GNU command spelling). The spelling the
//! user wrote is kept whenever the canonical rendering would differ, so
//! `x86_64-unknown-linux-gnu` still names the `x86_64-unknown-linux-gnu`
//! toolchain directory.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Instruction set architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86_64,
    I686,
    Aarch64,
    Arm,
    Riscv64,
    Wasm32,
    Unknown,
}

impl Arch {
    fn parse(s: &str) -> Arch {
        match s {
            "x86_64" | "amd64" => Arch::X86_64,
            "i386" | "i486" | "i586" | "i686" | "x86" => Arch::I686,
            "aarch64" | "arm64" => Arch::Aarch64,
            "wasm32" => Arch::Wasm32,
            s if s.starts_with("riscv64") => Arch::Riscv64,
            s if s.starts_with("arm") || s.starts_with("thumb") => Arch::Arm,
            _ => Arch::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::I686 => "i686",
            Arch::Aarch64 => "aarch64",
            Arch::Arm => "arm",
            Arch::Riscv64 => "riscv64",
            Arch::Wasm32 => "wasm32",
            Arch::Unknown => "unknown",
        }
    }
}

/// Platform vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vendor {
    Apple,
    Linux,
    Windows,
    Unknown,
}

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Apple => "apple",
            Vendor::Linux => "linux",
            Vendor::Windows => "windows",
            Vendor::Unknown => "unknown",
        }
    }
}

/// C runtime / ABI environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Runtime {
    Darwin,
    Gnu,
    Musl,
    Msvc,
    Elf,
    Unknown,
}

impl Runtime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Runtime::Darwin => "darwin",
            Runtime::Gnu => "gnu",
            Runtime::Musl => "musl",
            Runtime::Msvc => "msvc",
            Runtime::Elf => "elf",
            Runtime::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TripleParseError {
    #[error("empty target triple")]
    Empty,

    #[error("malformed target triple `{0}`")]
    Malformed(String),
}

/// A compilation target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    pub arch: Arch,
    pub vendor: Vendor,
    pub runtime: Runtime,
    /// Spelling to render instead of the canonical form.
    pub name: Option<String>,
}

impl Triple {
    pub fn new(arch: Arch, vendor: Vendor, runtime: Runtime) -> Self {
        Triple {
            arch,
            vendor,
            runtime,
            name: None,
        }
    }

    /// The triple of the machine running the engine.
    pub fn host() -> Self {
        let arch = Arch::parse(std::env::consts::ARCH);

        let (vendor, runtime) = if cfg!(target_os = "macos") {
            (Vendor::Apple, Runtime::Darwin)
        } else if cfg!(target_os = "windows") {
            let runtime = if cfg!(target_env = "msvc") {
                Runtime::Msvc
            } else {
                Runtime::Gnu
            };
            (Vendor::Windows, runtime)
        } else if cfg!(target_os = "linux") {
            let runtime = if cfg!(target_env = "musl") {
                Runtime::Musl
            } else {
                Runtime::Gnu
            };
            (Vendor::Linux, runtime)
        } else {
            (Vendor::Unknown, Runtime::Unknown)
        };

        Triple::new(arch, vendor, runtime)
    }

    /// Parse a triple such as `aarch64-linux-gnu` or `x86_64-pc-windows-msvc`.
    pub fn parse(s: &str) -> Result<Self, TripleParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TripleParseError::Empty);
        }

        let mut parts = s.split('-');
        let arch = parts.next().unwrap_or_default();
        if arch.is_empty() {
            return Err(TripleParseError::Malformed(s.to_string()));
        }

        let mut triple = Triple::new(Arch::parse(arch), Vendor::Unknown, Runtime::Unknown);

        for part in parts {
            match part {
                "" => return Err(TripleParseError::Malformed(s.to_string())),
                "apple" => triple.vendor = Vendor::Apple,
                p if p.starts_with("darwin") || p.starts_with("macos") || p.starts_with("ios") => {
                    triple.vendor = Vendor::Apple;
                    triple.runtime = Runtime::Darwin;
                }
                "linux" => triple.vendor = Vendor::Linux,
                "windows" | "win32" | "w64" => triple.vendor = Vendor::Windows,
                "mingw32" => {
                    triple.vendor = Vendor::Windows;
                    triple.runtime = Runtime::Gnu;
                }
                "msvc" => triple.runtime = Runtime::Msvc,
                "elf" | "eabi" | "eabihf" | "none" => triple.runtime = Runtime::Elf,
                p if p.starts_with("gnu") => triple.runtime = Runtime::Gnu,
                p if p.starts_with("musl") => triple.runtime = Runtime::Musl,
                // `pc`, `unknown` and version suffixes carry nothing we act on.
                _ => {}
            }
        }

        if triple.canonical() != s {
            triple.name = Some(s.to_string());
        }

        Ok(triple)
    }

    /// `<arch>-<vendor>-<runtime>`, ignoring any stored spelling.
    pub fn canonical(&self) -> String {
        format!(
            "{}-{}-{}",
            self.arch.as_str(),
            self.vendor.as_str(),
            self.runtime.as_str()
        )
    }

    /// Whether two triples describe the same target, whatever their spelling.
    pub fn same_target(&self, other: &Triple) -> bool {
        self.arch == other.arch && self.vendor == other.vendor && self.runtime == other.runtime
    }

    pub fn is_host(&self) -> bool {
        self.same_target(&Triple::host())
    }

    pub fn is_msvc(&self) -> bool {
        self.runtime == Runtime::Msvc
    }

    pub fn is_apple(&self) -> bool {
        self.vendor == Vendor::Apple
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(ref name) => f.write_str(name),
            None => write!(
                f,
                "{}-{}-{}",
                self.arch.as_str(),
                self.vendor.as_str(),
                self.runtime.as_str()
            ),
        }
    }
}

impl FromStr for Triple {
    type Err = TripleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Triple::parse(s)
    }
}
