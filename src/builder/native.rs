//! Native C/C++ compiler driver.
//!
//! Compiles sources into objects and links or archives them, skipping every
//! step whose outputs are newer than their inputs. A target tree is checked
//! as a whole before the first subprocess runs, then built depth-first:
//! libraries first, each one completely, then the target's own objects.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::builder::context::BuildContext;
use crate::builder::deps::get_dependencies;
use crate::builder::toolchain::{
    ArchiveInput, CompileInput, LinkInput, LinkLibrary, ToolKind, Toolchain,
};
use crate::core::target::{Executable, Language, Library, Target, TargetKind};
use crate::util::errors::BuildError;
use crate::util::fs::{ensure_dir, is_newer, remove_file_if_exists};

/// Native C/C++ builder.
pub struct NativeBuilder<'a> {
    ctx: &'a BuildContext,
}

fn same_toolchain(a: &Arc<Toolchain>, b: &Arc<Toolchain>) -> bool {
    Arc::ptr_eq(a, b) || **a == **b
}

impl<'a> NativeBuilder<'a> {
    /// Create a new native builder.
    pub fn new(ctx: &'a BuildContext) -> Self {
        NativeBuilder { ctx }
    }

    /// Build an executable, returning the path of the linked program.
    pub fn build_executable(&self, exe: &Executable) -> Result<PathBuf> {
        self.validate(&exe.target, TargetKind::Exe)?;
        self.build_target(&exe.target, TargetKind::Exe)
    }

    /// Build a library, returning the path of the archive or shared library.
    pub fn build_library(&self, lib: &Library) -> Result<PathBuf> {
        self.validate(&lib.target, lib.kind())?;
        self.build_target(&lib.target, lib.kind())
    }

    /// Check everything that can be checked without running a tool.
    fn validate(&self, target: &Target, kind: TargetKind) -> Result<()> {
        let tc = self.ctx.toolchain_for(target);

        for lib in &target.libraries {
            let lib_tc = self.ctx.toolchain_for(&lib.target);
            if !same_toolchain(&tc, &lib_tc) {
                return Err(BuildError::ToolchainMismatch {
                    target: target.name.clone(),
                    library: lib.target.name.clone(),
                    expected: tc.get_triple(),
                    found: lib_tc.get_triple(),
                }
                .into());
            }
            self.validate(&lib.target, lib.kind())?;
        }

        let mut objects: HashMap<PathBuf, &Path> = HashMap::new();
        for source in &target.sources {
            let language = Language::from_path(source).ok_or_else(|| {
                BuildError::UnsupportedSourceType {
                    path: source.clone(),
                }
            })?;
            tc.require(tc.compiler_kind(language))?;

            let object = target.object_path(source, tc.object_extension());
            if let Some(first) = objects.insert(object.clone(), source) {
                return Err(BuildError::ObjectCollision {
                    target: target.name.clone(),
                    first: first.to_path_buf(),
                    second: source.clone(),
                    object,
                }
                .into());
            }
        }

        let final_tool = match kind {
            TargetKind::StaticLib => ToolKind::Archiver,
            TargetKind::Exe | TargetKind::SharedLib => tc.link_driver_kind(target.uses_cxx()),
        };
        tc.require(final_tool)?;

        Ok(())
    }

    fn build_target(&self, target: &Target, kind: TargetKind) -> Result<PathBuf> {
        for lib in &target.libraries {
            self.build_target(&lib.target, lib.kind())?;
        }

        let tc = self.ctx.toolchain_for(target);
        ensure_dir(&target.object_dir())?;

        let mut objects = Vec::with_capacity(target.sources.len());
        for source in &target.sources {
            objects.push(self.compile_source(target, &tc, source)?);
        }

        // An archive only answers for its direct dependencies; a link also
        // needs everything those archives pull in.
        let libraries: Vec<&Library> = match kind {
            TargetKind::StaticLib => target.libraries.iter().map(|lib| lib.as_ref()).collect(),
            TargetKind::Exe | TargetKind::SharedLib => link_order(target),
        };

        let artifact = artifact_path(target, kind, &tc);
        if !self.artifact_stale(&libraries, &tc, &objects, &artifact) {
            tracing::debug!("{} is up to date", artifact.display());
            return Ok(artifact);
        }

        match kind {
            TargetKind::StaticLib => self.archive(&tc, &objects, &artifact)?,
            TargetKind::Exe | TargetKind::SharedLib => {
                let shared = kind == TargetKind::SharedLib;
                self.link(target, &libraries, &tc, &objects, &artifact, shared)?
            }
        }

        Ok(artifact)
    }

    /// Compile `source` into its object file unless the object is current.
    pub fn compile_source(
        &self,
        target: &Target,
        tc: &Toolchain,
        source: &Path,
    ) -> Result<PathBuf> {
        let language = Language::from_path(source).ok_or_else(|| {
            BuildError::UnsupportedSourceType {
                path: source.to_path_buf(),
            }
        })?;
        let tool = tc.require(tc.compiler_kind(language))?;
        let object = target.object_path(source, tc.object_extension());

        let input = CompileInput {
            tool,
            source,
            flags: target.flags_for(language),
            include_dirs: &target.include_paths,
        };

        if !self.object_stale(tc, &input, &object) {
            tracing::debug!("{} is up to date", object.display());
            return Ok(object);
        }

        tracing::info!("Compiling {}", source.display());
        let cmd = tc.style().compile_command(tc, &input, &object);
        self.ctx.runner().run(&cmd)?;

        Ok(object)
    }

    fn object_stale(&self, tc: &Toolchain, input: &CompileInput<'_>, object: &Path) -> bool {
        if !object.exists() {
            return true;
        }

        match get_dependencies(self.ctx.runner(), tc, input) {
            Some(deps) => deps.iter().any(|dep| is_newer(dep, object)),
            None => true,
        }
    }

    fn artifact_stale(
        &self,
        libraries: &[&Library],
        tc: &Toolchain,
        objects: &[PathBuf],
        artifact: &Path,
    ) -> bool {
        if !artifact.exists() {
            return true;
        }

        if objects.iter().any(|obj| is_newer(obj, artifact)) {
            return true;
        }

        libraries.iter().any(|lib| {
            let lib_artifact = artifact_path(&lib.target, lib.kind(), tc);
            is_newer(&lib_artifact, artifact)
                || (lib.use_objects
                    && library_objects(lib, tc)
                        .iter()
                        .any(|obj| is_newer(obj, artifact)))
        })
    }

    fn archive(&self, tc: &Toolchain, objects: &[PathBuf], artifact: &Path) -> Result<()> {
        tracing::info!("Archiving {}", artifact.display());

        // `ar rcs` only adds members; start over so removed sources disappear.
        remove_file_if_exists(artifact)?;

        let input = ArchiveInput {
            archiver: tc.require(ToolKind::Archiver)?,
            output: artifact,
            objects,
        };
        let cmd = tc.style().archive_command(tc, &input);
        self.ctx.runner().run(&cmd)?;
        Ok(())
    }

    fn link(
        &self,
        target: &Target,
        libraries: &[&Library],
        tc: &Toolchain,
        objects: &[PathBuf],
        artifact: &Path,
        shared: bool,
    ) -> Result<()> {
        tracing::info!("Linking {}", artifact.display());

        let libraries = libraries
            .iter()
            .map(|lib| {
                if lib.use_objects {
                    LinkLibrary::Objects(library_objects(lib, tc))
                } else {
                    LinkLibrary::Named {
                        dir: lib.target.build_folder.clone(),
                        name: lib.target.name.clone(),
                    }
                }
            })
            .collect();

        let input = LinkInput {
            driver: tc.require(tc.link_driver_kind(target.uses_cxx()))?,
            output: artifact,
            objects,
            libraries,
            system_libs: &target.system_libs,
            frameworks: &target.frameworks,
            ldflags: &target.ldflags,
            shared,
        };
        let cmd = tc.style().link_command(tc, &input);
        self.ctx.runner().run(&cmd)?;
        Ok(())
    }
}

/// `<build folder>/<platform file name>` for a target of `kind`.
pub fn artifact_path(target: &Target, kind: TargetKind, tc: &Toolchain) -> PathBuf {
    target
        .build_folder
        .join(kind.output_filename(&target.name, tc.triple.vendor))
}

/// Libraries on the link line of `target`, in order: each direct dependency
/// followed by what it pulls in, since an archive does not carry its own
/// dependencies. A shared library does, so the walk stops there. A library
/// reached twice keeps its last place, after everything that refers to it.
fn link_order(target: &Target) -> Vec<&Library> {
    let mut order = Vec::new();
    collect_link_order(&target.libraries, &mut order);

    let mut seen = HashSet::new();
    let mut kept: Vec<&Library> = order
        .into_iter()
        .rev()
        .filter(|&lib| seen.insert((&lib.target.build_folder, &lib.target.name)))
        .collect();
    kept.reverse();
    kept
}

fn collect_link_order<'t>(libraries: &'t [Arc<Library>], order: &mut Vec<&'t Library>) {
    for lib in libraries {
        order.push(lib.as_ref());
        if !lib.shared || lib.use_objects {
            collect_link_order(&lib.target.libraries, order);
        }
    }
}

fn library_objects(lib: &Library, tc: &Toolchain) -> Vec<PathBuf> {
    lib.target
        .sources
        .iter()
        .map(|source| lib.target.object_path(source, tc.object_extension()))
        .collect()
}
