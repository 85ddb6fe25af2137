//! Toolchain resolution.
//!
//! Three flavors:
//! - the native toolchain, spelled as bare tool names found on `PATH`;
//! - cross toolchains under `<toolchain_dir>/<triple>/`;
//! - the flat LLVM layout under `<llvm_dir>/bin/`.

use std::env::consts::EXE_SUFFIX;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::triple::Triple;
use crate::util::errors::BuildError;
use crate::util::process::{find_executable, CommandRunner, ProcessBuilder};

use super::Toolchain;

/// SDK used when `xcrun` cannot tell us where the active one is.
const FALLBACK_MACOS_SDK: &str = "/Library/Developer/CommandLineTools/SDKs/MacOSX.sdk";

/// The host toolchain. Tools are left as names for `PATH` lookup at spawn
/// time; only macOS gets a sysroot.
pub fn native_toolchain(runner: &dyn CommandRunner) -> Toolchain {
    let triple = Triple::host();
    let mut tc = Toolchain::new(triple);

    let (cc, cxx, ld, ar) = if tc.triple.is_apple() {
        ("clang", "clang++", "ld", "ar")
    } else if tc.triple.is_msvc() {
        ("cl", "cl", "link", "lib")
    } else {
        ("cc", "c++", "ld", "ar")
    };

    for tool in [cc, cxx, ld, ar] {
        if find_executable(tool).is_none() {
            tracing::debug!("`{}` is not on PATH", tool);
        }
    }

    tc.cc = Some(PathBuf::from(cc));
    tc.cxx = Some(PathBuf::from(cxx));
    tc.ld = Some(PathBuf::from(ld));
    tc.ar = Some(PathBuf::from(ar));

    if tc.triple.is_apple() {
        tc.sysroot = Some(macos_sdk_path(runner));
    }

    tracing::debug!("native toolchain for {}", tc.get_triple());
    tc
}

fn macos_sdk_path(runner: &dyn CommandRunner) -> PathBuf {
    let cmd = ProcessBuilder::new("xcrun").arg("--show-sdk-path");
    match runner.run_capturing(&cmd) {
        Ok(result) if result.success() && !result.output.trim().is_empty() => {
            PathBuf::from(result.output.trim())
        }
        Ok(_) | Err(_) => {
            tracing::debug!("xcrun gave no SDK path, using {}", FALLBACK_MACOS_SDK);
            PathBuf::from(FALLBACK_MACOS_SDK)
        }
    }
}

fn probe(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

fn exe_name(name: &str) -> String {
    format!("{}{}", name, EXE_SUFFIX)
}

/// Find `tool` in a cross toolchain's `bin`, plain or triple-prefixed.
fn find_cross_tool(bin: &Path, triple: &str, tool: &str) -> Option<PathBuf> {
    probe(bin.join(exe_name(tool))).or_else(|| probe(bin.join(exe_name(&format!("{}-{}", triple, tool)))))
}

/// Resolve a cross toolchain laid out as `<root>/<triple>/bin/<tool>`.
///
/// Tools that are not present stay unresolved; asking for one later fails
/// with [`BuildError::ToolNotFound`].
pub fn find_toolchain(root: &Path, triple: &Triple) -> Result<Toolchain> {
    let name = triple.to_string();
    let dir = root.join(&name);

    if !dir.is_dir() {
        return Err(BuildError::ToolchainNotFound {
            triple: name,
            root: root.to_path_buf(),
        }
        .into());
    }

    let bin = dir.join("bin");
    let mut tc = Toolchain::new(triple.clone());
    tc.cc = find_cross_tool(&bin, &name, "gcc");
    tc.cxx = find_cross_tool(&bin, &name, "g++");
    tc.ld = find_cross_tool(&bin, &name, "ld");
    tc.ar = find_cross_tool(&bin, &name, "ar");

    let sysroot = dir.join("sys-root");
    if sysroot.is_dir() {
        tc.sysroot = Some(sysroot);
    }

    tracing::debug!("found toolchain {} in {}", name, dir.display());
    Ok(tc)
}

/// Resolve an LLVM toolchain from `<llvm_dir>/bin`, borrowing the sysroot of
/// a matching cross toolchain when one is installed.
pub fn find_llvm_toolchain(llvm_dir: &Path, toolchain_dir: &Path, triple: &Triple) -> Toolchain {
    let bin = llvm_dir.join("bin");
    let mut tc = Toolchain::new(triple.clone());

    tc.cc = probe(bin.join(exe_name("clang")));
    tc.cxx = probe(bin.join(exe_name("clang++")));
    tc.ar = probe(bin.join(exe_name("llvm-ar")));

    if triple.is_msvc() {
        tc.ld = probe(bin.join(exe_name("lld-link")));
        tc.alt_cc = probe(bin.join(exe_name("clang-cl")));
    } else {
        tc.ld = probe(bin.join(exe_name("lld")));
    }

    let sysroot = toolchain_dir.join(triple.to_string()).join("sys-root");
    if sysroot.is_dir() {
        tc.sysroot = Some(sysroot);
    }

    tc
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::test_support::FakeRunner;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_find_toolchain_prefers_plain_names() {
        let tmp = TempDir::new().unwrap();
        let triple = Triple::parse("aarch64-linux-gnu").unwrap();
        let bin = tmp.path().join("aarch64-linux-gnu/bin");

        touch(&bin.join(exe_name("gcc")));
        touch(&bin.join(exe_name("aarch64-linux-gnu-gcc")));
        touch(&bin.join(exe_name("aarch64-linux-gnu-ar")));
        fs::create_dir_all(tmp.path().join("aarch64-linux-gnu/sys-root")).unwrap();

        let tc = find_toolchain(tmp.path(), &triple).unwrap();
        assert_eq!(tc.cc, Some(bin.join(exe_name("gcc"))));
        assert_eq!(tc.ar, Some(bin.join(exe_name("aarch64-linux-gnu-ar"))));
        assert_eq!(tc.cxx, None);
        assert_eq!(tc.ld, None);
        assert_eq!(
            tc.sysroot,
            Some(tmp.path().join("aarch64-linux-gnu/sys-root"))
        );
    }

    #[test]
    fn test_find_toolchain_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let triple = Triple::parse("riscv64-linux-gnu").unwrap();

        let err = find_toolchain(tmp.path(), &triple).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::ToolchainNotFound { .. })
        ));
    }

    #[test]
    fn test_find_llvm_toolchain() {
        let tmp = TempDir::new().unwrap();
        let llvm = tmp.path().join("llvm");
        for tool in ["clang", "clang++", "llvm-ar", "lld", "lld-link", "clang-cl"] {
            touch(&llvm.join("bin").join(exe_name(tool)));
        }

        let gnu = find_llvm_toolchain(&llvm, tmp.path(), &Triple::parse("aarch64-linux-gnu").unwrap());
        assert_eq!(gnu.cc, Some(llvm.join("bin").join(exe_name("clang"))));
        assert_eq!(gnu.ld, Some(llvm.join("bin").join(exe_name("lld"))));
        assert_eq!(gnu.alt_cc, None);
        assert_eq!(gnu.sysroot, None);

        let msvc = find_llvm_toolchain(
            &llvm,
            tmp.path(),
            &Triple::parse("x86_64-pc-windows-msvc").unwrap(),
        );
        assert_eq!(msvc.ld, Some(llvm.join("bin").join(exe_name("lld-link"))));
        assert_eq!(msvc.alt_cc, Some(llvm.join("bin").join(exe_name("clang-cl"))));
    }

    #[test]
    fn test_native_toolchain_has_every_tool() {
        let runner = FakeRunner::new();
        let tc = native_toolchain(&runner);

        assert!(tc.triple.is_host());
        assert!(tc.cc.is_some());
        assert!(tc.cxx.is_some());
        assert!(tc.ld.is_some());
        assert!(tc.ar.is_some());
        assert_eq!(tc.sysroot.is_some(), tc.triple.is_apple());
    }
}
