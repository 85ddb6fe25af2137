//! GCC/Clang command spelling.

use std::path::Path;

use crate::util::process::ProcessBuilder;

use super::{
    is_multi_target_driver, target_args, ArchiveInput, CommandStyle, CompileInput, LinkInput,
    LinkLibrary, Toolchain,
};

/// Commands for gcc, clang and compatible drivers.
#[derive(Debug, Clone, Copy, Default)]
pub struct GnuStyle;

impl GnuStyle {
    fn compiler_prefix(tc: &Toolchain, input: &CompileInput<'_>) -> ProcessBuilder {
        let mut cmd = target_args(tc, input.tool, ProcessBuilder::new(input.tool));

        cmd = cmd.args(input.flags);
        for dir in input.include_dirs {
            cmd = cmd.arg(format!("-I{}", dir.display()));
        }
        cmd
    }
}

/// Whether the configured linker is lld, which a clang driver must be told
/// about explicitly.
fn uses_lld(tc: &Toolchain) -> bool {
    tc.ld
        .as_deref()
        .and_then(Path::file_stem)
        .map(|stem| {
            let stem = stem.to_string_lossy();
            stem == "lld" || stem == "ld.lld"
        })
        .unwrap_or(false)
}

impl CommandStyle for GnuStyle {
    fn compile_command(
        &self,
        tc: &Toolchain,
        input: &CompileInput<'_>,
        object: &Path,
    ) -> ProcessBuilder {
        GnuStyle::compiler_prefix(tc, input)
            .arg("-o")
            .arg_path(object)
            .arg("-c")
            .arg_path(input.source)
    }

    fn scan_command(&self, tc: &Toolchain, input: &CompileInput<'_>) -> ProcessBuilder {
        GnuStyle::compiler_prefix(tc, input)
            .arg("-MM")
            .arg_path(input.source)
    }

    fn link_command(&self, tc: &Toolchain, input: &LinkInput<'_>) -> ProcessBuilder {
        let mut cmd = target_args(tc, input.driver, ProcessBuilder::new(input.driver));

        if uses_lld(tc) && is_multi_target_driver(input.driver) {
            cmd = cmd.arg("-fuse-ld=lld");
        }

        if input.shared {
            cmd = cmd.arg("-shared");
        }

        cmd = cmd.arg("-o").arg_path(input.output);

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
                        .arg(format!("-L{}", dir.display()))
                        .arg(format!("-l{}", name));
                }
            }
        }

        for lib in input.system_libs {
            cmd = cmd.arg(format!("-l{}", lib));
        }

        if tc.triple.is_apple() {
            for framework in input.frameworks {
                cmd = cmd.arg("-framework").arg(framework);
            }
        }

        cmd.args(input.ldflags)
    }

    fn archive_command(&self, _tc: &Toolchain, input: &ArchiveInput<'_>) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(input.archiver)
            .arg("rcs")
            .arg_path(input.output);

        for obj in input.objects {
            cmd = cmd.arg_path(obj);
        }

        cmd
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::core::triple::Triple;

    fn toolchain(triple: &str, cc: &str) -> Toolchain {
        let mut tc = Toolchain::new(Triple::parse(triple).unwrap());
        tc.cc = Some(PathBuf::from(cc));
        tc
    }

    #[test]
    fn test_compile_command() {
        let tc = toolchain("x86_64-linux-gnu", "gcc");
        let flags = vec!["-Wall".to_string(), "-O2".to_string()];
        let includes = vec![PathBuf::from("include")];
        let input = CompileInput {
            tool: Path::new("gcc"),
            source: Path::new("src/main.c"),
            flags: &flags,
            include_dirs: &includes,
        };

        let cmd = GnuStyle.compile_command(&tc, &input, Path::new("build/object/main.o"));
        assert_eq!(
            cmd.display_command(),
            "gcc -Wall -O2 -Iinclude -o build/object/main.o -c src/main.c"
        );

        let scan = GnuStyle.scan_command(&tc, &input);
        assert_eq!(scan.display_command(), "gcc -Wall -O2 -Iinclude -MM src/main.c");
    }

    #[test]
    fn test_clang_gets_target_and_sysroot() {
        let mut tc = toolchain("aarch64-linux-gnu", "/llvm/bin/clang");
        tc.sysroot = Some(PathBuf::from("/tc/sys-root"));
        let input = CompileInput {
            tool: Path::new("/llvm/bin/clang"),
            source: Path::new("a.c"),
            flags: &[],
            include_dirs: &[],
        };

        let cmd = GnuStyle.compile_command(&tc, &input, Path::new("a.o"));
        assert_eq!(
            cmd.get_args(),
            &[
                "--target=aarch64-linux-gnu",
                "--sysroot=/tc/sys-root",
                "-o",
                "a.o",
                "-c",
                "a.c"
            ]
        );
    }

    #[test]
    fn test_link_command() {
        let mut tc = toolchain("x86_64-linux-gnu", "cc");
        tc.ld = Some(PathBuf::from("/llvm/bin/lld"));

        let objects = vec![PathBuf::from("build/object/main.o")];
        let syslibs = vec!["m".to_string()];
        let frameworks = vec!["Cocoa".to_string()];
        let ldflags = vec!["-static".to_string()];
        let input = LinkInput {
            driver: Path::new("cc"),
            output: Path::new("build/app"),
            objects: &objects,
            libraries: vec![
                LinkLibrary::Named {
                    dir: PathBuf::from("build/util"),
                    name: "util".to_string(),
                },
                LinkLibrary::Objects(vec![PathBuf::from("build/raw/object/x.o")]),
            ],
            system_libs: &syslibs,
            frameworks: &frameworks,
            ldflags: &ldflags,
            shared: false,
        };

        // Frameworks are Apple-only and -fuse-ld needs a clang driver.
        let cmd = GnuStyle.link_command(&tc, &input);
        assert_eq!(
            cmd.display_command(),
            "cc -o build/app build/object/main.o -Lbuild/util -lutil build/raw/object/x.o -lm -static"
        );
    }

    #[test]
    fn test_apple_shared_link() {
        let mut tc = toolchain("arm64-apple-darwin", "clang");
        tc.ld = Some(PathBuf::from("ld.lld"));
        let frameworks = vec!["Cocoa".to_string()];
        let input = LinkInput {
            driver: Path::new("clang"),
            output: Path::new("libui.dylib"),
            objects: &[],
            libraries: Vec::new(),
            system_libs: &[],
            frameworks: &frameworks,
            ldflags: &[],
            shared: true,
        };

        let cmd = GnuStyle.link_command(&tc, &input);
        assert_eq!(
            cmd.get_args(),
            &[
                "--target=arm64-apple-darwin",
                "-fuse-ld=lld",
                "-shared",
                "-o",
                "libui.dylib",
                "-framework",
                "Cocoa"
            ]
        );
    }

    #[test]
    fn test_archive_command() {
        let tc = toolchain("x86_64-linux-gnu", "cc");
        let objects = vec![PathBuf::from("a.o"), PathBuf::from("b.o")];
        let input = ArchiveInput {
            archiver: Path::new("ar"),
            output: Path::new("libx.a"),
            objects: &objects,
        };

        assert_eq!(
            GnuStyle.archive_command(&tc, &input).display_command(),
            "ar rcs libx.a a.o b.o"
        );
    }
}
