//! MSVC command spelling, for cl, clang-cl, link and lld-link.

use std::path::Path;

use crate::util::process::ProcessBuilder;

use super::{target_args, ArchiveInput, CommandStyle, CompileInput, LinkInput, LinkLibrary, Toolchain};

/// Commands for MSVC-compatible tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsvcStyle;

impl MsvcStyle {
    fn compiler_prefix(tc: &Toolchain, input: &CompileInput<'_>) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(input.tool).arg("/nologo");
        cmd = target_args(tc, input.tool, cmd);

        cmd = cmd.args(input.flags);
        for dir in input.include_dirs {
            cmd = cmd.arg(format!("/I{}", dir.display()));
        }
        cmd
    }
}

/// `lib.exe` and `llvm-lib` take `/OUT:`; anything else is treated as `ar`.
fn is_lib_exe(archiver: &Path) -> bool {
    archiver
        .file_stem()
        .map(|stem| {
            let stem = stem.to_string_lossy().to_ascii_lowercase();
            stem == "lib" || stem == "llvm-lib"
        })
        .unwrap_or(false)
}

impl CommandStyle for MsvcStyle {
    fn compile_command(
        &self,
        tc: &Toolchain,
        input: &CompileInput<'_>,
        object: &Path,
    ) -> ProcessBuilder {
        MsvcStyle::compiler_prefix(tc, input)
            .arg(format!("/Fo:{}", object.display()))
            .arg("/c")
            .arg_path(input.source)
    }

    fn scan_command(&self, tc: &Toolchain, input: &CompileInput<'_>) -> ProcessBuilder {
        MsvcStyle::compiler_prefix(tc, input)
            .arg("/Zs")
            .arg("/sourceDependencies")
            .arg("-")
            .arg_path(input.source)
    }

    fn link_command(&self, _tc: &Toolchain, input: &LinkInput<'_>) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(input.driver).arg("/nologo");

        if input.shared {
            cmd = cmd.arg("/DLL");
        }

        cmd = cmd.arg(format!("/OUT:{}", input.output.display()));

        for obj in input.objects {
            cmd = cmd.arg_path(obj);
        }

        for lib in &input.libraries {
            match lib {
                LinkLibrary::Objects(objects) => {
                    for obj in objects {
                        cmd = cmd.arg_path(obj);
                    }
                }
                LinkLibrary::Named { dir, name } => {
                    cmd = cmd
                        .arg(format!("/LIBPATH:{}", dir.display()))
                        .arg(format!("{}.lib", name));
                }
            }
        }

        for lib in input.system_libs {
            cmd = cmd.arg(format!("{}.lib", lib));
        }

        cmd.args(input.ldflags)
    }

    fn archive_command(&self, _tc: &Toolchain, input: &ArchiveInput<'_>) -> ProcessBuilder {
        let mut cmd = if is_lib_exe(input.archiver) {
            ProcessBuilder::new(input.archiver)
                .arg("/nologo")
                .arg(format!("/OUT:{}", input.output.display()))
        } else {
            ProcessBuilder::new(input.archiver)
                .arg("rcs")
                .arg_path(input.output)
        };

        for obj in input.objects {
            cmd = cmd.arg_path(obj);
        }

        cmd
    }
}
