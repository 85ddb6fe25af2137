//! C ABI for builder programs.
//!
//! Builders are C programs linked against the engine's static library. They
//! see opaque handles (`JBExecutable`, `JBLibrary`, `JBToolchain`) and the
//! functions declared in `include/jetty.h`. A builder is a short-lived,
//! single-purpose process, so every failure is final: the error is printed
//! and the builder exits with status 1.
//!
//! The process holds a single [`BuildContext`], created on first use from the
//! `JETTY_*` environment the bootstrapper exports plus any switches consumed
//! by [`jb_parse_arguments`].

use std::ffi::{c_char, c_int, CStr, CString};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard, Once, OnceLock};

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

use crate::builder::context::BuildContext;
use crate::builder::toolchain::Toolchain;
use crate::core::target::{Executable, Library, Target};
use crate::core::triple::Triple;
use crate::util::config::Config;
use crate::util::fs::{file_exists, glob_files};
use crate::util::process::{run_string, ProcessBuilder};

static CONTEXT: OnceLock<BuildContext> = OnceLock::new();
static SWITCHES: Mutex<Switches> = Mutex::new(Switches {
    verbose: false,
    pty: false,
});
static LOGGING: Once = Once::new();

/// Engine switches taken from a builder's command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Switches {
    pub verbose: bool,
    pub pty: bool,
}

impl Switches {
    /// Record `arg` if it is an engine switch.
    fn take(&mut self, arg: &[u8]) -> bool {
        match arg {
            b"--verbose" | b"-v" => self.verbose = true,
            b"--pty" => self.pty = true,
            _ => return false,
        }
        true
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn init_logging(verbose: bool) {
    LOGGING.call_once(|| {
        let filter = if verbose {
            EnvFilter::new("jetty=debug")
        } else {
            EnvFilter::new("jetty=info")
        };

        // A host program may already have a subscriber.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .try_init();
    });
}

fn create_context() -> Result<BuildContext> {
    let cwd = std::env::current_dir().context("failed to read the current directory")?;
    let mut config = Config::discover(&cwd);

    let switches = *lock(&SWITCHES);
    config.build.verbose |= switches.verbose;
    config.build.pty |= switches.pty;

    init_logging(config.build.verbose);
    BuildContext::new(config)
}

fn context() -> &'static BuildContext {
    if let Some(ctx) = CONTEXT.get() {
        return ctx;
    }
    match create_context() {
        Ok(ctx) => CONTEXT.get_or_init(|| ctx),
        Err(e) => fail(e),
    }
}

fn fail(err: anyhow::Error) -> ! {
    eprintln!("error: {:#}", err);
    std::process::exit(1);
}

fn or_fail<T>(result: Result<T>) -> T {
    result.unwrap_or_else(|e| fail(e))
}

/// Report a failure at a builder source location.
unsafe fn fail_at(file: *const c_char, line: c_int, err: anyhow::Error) -> ! {
    let file = if file.is_null() {
        "<unknown>".into()
    } else {
        CStr::from_ptr(file).to_string_lossy()
    };
    eprintln!("error: {}:{}: {:#}", file, line, err);
    std::process::exit(1);
}

unsafe fn string(ptr: *const c_char, what: &str) -> Result<String> {
    if ptr.is_null() {
        return Err(anyhow!("{} is NULL", what));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(str::to_string)
        .with_context(|| format!("{} is not valid UTF-8", what))
}

unsafe fn arg(ptr: *const c_char, what: &str) -> String {
    or_fail(string(ptr, what))
}

/// Read a NULL-terminated string array; a NULL array is empty.
unsafe fn string_array(ptr: *const *const c_char, what: &str) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    if ptr.is_null() {
        return Ok(strings);
    }

    let mut i = 0;
    while !(*ptr.add(i)).is_null() {
        strings.push(string(*ptr.add(i), what)?);
        i += 1;
    }
    Ok(strings)
}

unsafe fn handle<'a, T>(ptr: *mut T, what: &str) -> &'a mut T {
    match ptr.as_mut() {
        Some(handle) => handle,
        None => fail(anyhow!("{} handle is NULL", what)),
    }
}

unsafe fn handle_ref<'a, T>(ptr: *const T, what: &str) -> &'a T {
    match ptr.as_ref() {
        Some(handle) => handle,
        None => fail(anyhow!("{} handle is NULL", what)),
    }
}

fn path_to_cstring(path: &Path) -> Result<CString> {
    CString::new(path.display().to_string())
        .with_context(|| format!("path contains a NUL byte: {}", path.display()))
}

/// Opaque toolchain handle.
pub struct JBToolchain {
    toolchain: Arc<Toolchain>,
}

/// Opaque executable handle.
pub struct JBExecutable {
    exe: Executable,
    artifact: Option<CString>,
}

/// Opaque library handle.
pub struct JBLibrary {
    lib: Library,
    artifact: Option<CString>,
}

trait TargetHandle {
    fn target_mut(&mut self) -> &mut Target;
}

impl TargetHandle for JBExecutable {
    fn target_mut(&mut self) -> &mut Target {
        &mut self.exe.target
    }
}

impl TargetHandle for JBLibrary {
    fn target_mut(&mut self) -> &mut Target {
        &mut self.lib.target
    }
}

fn toolchain_handle(toolchain: Arc<Toolchain>) -> *mut JBToolchain {
    Box::into_raw(Box::new(JBToolchain { toolchain }))
}

/// Consume `--verbose`/`-v` and `--pty` from `argv`, compacting the rest in
/// place. Returns the new argument count.
///
/// # Safety
///
/// `argv` must hold `argc` valid C strings followed by a NULL entry.
#[no_mangle]
pub unsafe extern "C" fn jb_parse_arguments(argc: c_int, argv: *mut *mut c_char) -> c_int {
    if argv.is_null() || argc <= 1 {
        return argc.max(0);
    }

    let mut switches = lock(&SWITCHES);
    let mut kept = 1;
    for i in 1..argc as usize {
        let arg = *argv.add(i);
        if !arg.is_null() && switches.take(CStr::from_ptr(arg).to_bytes()) {
            continue;
        }
        *argv.add(kept) = arg;
        kept += 1;
    }
    *argv.add(kept) = ptr::null_mut();

    if CONTEXT.get().is_some() {
        tracing::warn!("engine already initialized; command-line switches ignored");
    }

    kept as c_int
}

/// Run a NULL-terminated argument vector.
///
/// # Safety
///
/// `argv` must be a NULL-terminated array of C strings; `file` a C string
/// or NULL.
#[no_mangle]
pub unsafe extern "C" fn jb_run(argv: *const *const c_char, file: *const c_char, line: c_int) {
    let argv = match string_array(argv, "argument") {
        Ok(argv) => argv,
        Err(e) => fail_at(file, line, e),
    };
    let Some(cmd) = ProcessBuilder::from_argv(&argv) else {
        fail_at(file, line, anyhow!("empty command"));
    };

    if let Err(e) = context().runner().run(&cmd) {
        fail_at(file, line, e);
    }
}

/// Run a command template with extra arguments appended.
///
/// # Safety
///
/// `cmd` must be a C string, `extra` a NULL-terminated array of C strings
/// or NULL, `file` a C string or NULL.
#[no_mangle]
pub unsafe extern "C" fn jb_run_string(
    cmd: *const c_char,
    extra: *const *const c_char,
    file: *const c_char,
    line: c_int,
) {
    let result = string(cmd, "command").and_then(|cmd| {
        let extra = string_array(extra, "argument")?;
        run_string(context().runner(), &cmd, &extra)
    });

    if let Err(e) = result {
        fail_at(file, line, e);
    }
}

/// # Safety
///
/// `path` must be a C string or NULL.
#[no_mangle]
pub unsafe extern "C" fn jb_file_exists(path: *const c_char) -> c_int {
    match string(path, "path") {
        Ok(path) => file_exists(Path::new(&path)) as c_int,
        Err(_) => 0,
    }
}

/// The host toolchain.
#[no_mangle]
pub extern "C" fn jb_native_toolchain() -> *mut JBToolchain {
    toolchain_handle(context().native_toolchain())
}

/// The cross toolchain for `triple`, or the native one for the host triple.
///
/// # Safety
///
/// `triple` must be a C string.
#[no_mangle]
pub unsafe extern "C" fn jb_find_toolchain(triple: *const c_char) -> *mut JBToolchain {
    let triple = or_fail(Triple::parse(&arg(triple, "triple")).map_err(Into::into));
    toolchain_handle(or_fail(context().find_toolchain(&triple)))
}

/// The LLVM toolchain for `triple`.
///
/// # Safety
///
/// `triple` must be a C string.
#[no_mangle]
pub unsafe extern "C" fn jb_find_llvm_toolchain(triple: *const c_char) -> *mut JBToolchain {
    let triple = or_fail(Triple::parse(&arg(triple, "triple")).map_err(Into::into));
    toolchain_handle(context().find_llvm_toolchain(&triple))
}

/// The toolchain's triple, to be released with [`jb_free_string`].
///
/// # Safety
///
/// `tc` must come from one of the toolchain constructors.
#[no_mangle]
pub unsafe extern "C" fn jb_toolchain_triple(tc: *const JBToolchain) -> *mut c_char {
    let tc = handle_ref(tc, "toolchain");
    match CString::new(tc.toolchain.get_triple()) {
        Ok(s) => s.into_raw(),
        Err(e) => fail(e.into()),
    }
}

/// # Safety
///
/// `tc` must come from one of the toolchain constructors, or be NULL.
#[no_mangle]
pub unsafe extern "C" fn jb_toolchain_free(tc: *mut JBToolchain) {
    if !tc.is_null() {
        drop(Box::from_raw(tc));
    }
}

/// # Safety
///
/// `s` must come from an engine function documented as caller-freed, or be
/// NULL.
#[no_mangle]
pub unsafe extern "C" fn jb_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// # Safety
///
/// `name` and `build_folder` must be C strings.
#[no_mangle]
pub unsafe extern "C" fn jb_executable_new(
    name: *const c_char,
    build_folder: *const c_char,
) -> *mut JBExecutable {
    let exe = Executable::new(arg(name, "name"), arg(build_folder, "build folder"));
    Box::into_raw(Box::new(JBExecutable {
        exe,
        artifact: None,
    }))
}

/// # Safety
///
/// `name` and `build_folder` must be C strings.
#[no_mangle]
pub unsafe extern "C" fn jb_library_new(
    name: *const c_char,
    build_folder: *const c_char,
    shared: c_int,
) -> *mut JBLibrary {
    let lib = Library::new(arg(name, "name"), arg(build_folder, "build folder")).shared(shared != 0);
    Box::into_raw(Box::new(JBLibrary {
        lib,
        artifact: None,
    }))
}

/// Link dependents against this library's objects instead of its archive.
///
/// # Safety
///
/// `lib` must come from [`jb_library_new`].
#[no_mangle]
pub unsafe extern "C" fn jb_library_use_objects(lib: *mut JBLibrary, use_objects: c_int) {
    handle(lib, "library").lib.use_objects = use_objects != 0;
}

/// Generates the per-field adders for one handle type.
macro_rules! target_adders {
    ($handle:ty, $what:literal, { $($name:ident => $field:ident,)* }) => {
        $(
            /// # Safety
            ///
            /// `this` must come from the matching constructor and `value`
            /// must be a C string.
            #[no_mangle]
            pub unsafe extern "C" fn $name(this: *mut $handle, value: *const c_char) {
                let value = arg(value, stringify!($field));
                handle(this, $what).target_mut().$field.push(value.into());
            }
        )*
    };
}

target_adders!(JBExecutable, "executable", {
    jb_executable_add_source => sources,
    jb_executable_add_cflag => cflags,
    jb_executable_add_cxxflag => cxxflags,
    jb_executable_add_asmflag => asmflags,
    jb_executable_add_include => include_paths,
    jb_executable_add_ldflag => ldflags,
    jb_executable_add_framework => frameworks,
    jb_executable_add_system_lib => system_libs,
});

target_adders!(JBLibrary, "library", {
    jb_library_add_source => sources,
    jb_library_add_cflag => cflags,
    jb_library_add_cxxflag => cxxflags,
    jb_library_add_asmflag => asmflags,
    jb_library_add_include => include_paths,
    jb_library_add_ldflag => ldflags,
    jb_library_add_framework => frameworks,
    jb_library_add_system_lib => system_libs,
});

/// Add every file matching `pattern`, in sorted order.
unsafe fn add_source_glob(target: &mut Target, pattern: *const c_char) {
    let pattern = arg(pattern, "pattern");
    let sources = or_fail(glob_files(Path::new(""), &[pattern]));
    target.sources.extend(sources);
}

/// # Safety
///
/// `exe` must come from [`jb_executable_new`] and `pattern` must be a C
/// string.
#[no_mangle]
pub unsafe extern "C" fn jb_executable_add_source_glob(exe: *mut JBExecutable, pattern: *const c_char) {
    add_source_glob(handle(exe, "executable").target_mut(), pattern);
}

/// # Safety
///
/// `lib` must come from [`jb_library_new`] and `pattern` must be a C string.
#[no_mangle]
pub unsafe extern "C" fn jb_library_add_source_glob(lib: *mut JBLibrary, pattern: *const c_char) {
    add_source_glob(handle(lib, "library").target_mut(), pattern);
}

/// Add a snapshot of `lib` as a dependency of `exe`.
///
/// # Safety
///
/// Both handles must come from their constructors.
#[no_mangle]
pub unsafe extern "C" fn jb_executable_add_library(exe: *mut JBExecutable, lib: *const JBLibrary) {
    let lib = Arc::new(handle_ref(lib, "library").lib.clone());
    handle(exe, "executable").target_mut().libraries.push(lib);
}

/// Add a snapshot of `dep` as a dependency of `lib`.
///
/// # Safety
///
/// Both handles must come from [`jb_library_new`].
#[no_mangle]
pub unsafe extern "C" fn jb_library_add_library(lib: *mut JBLibrary, dep: *const JBLibrary) {
    let dep = Arc::new(handle_ref(dep, "library").lib.clone());
    handle(lib, "library").target_mut().libraries.push(dep);
}

/// # Safety
///
/// `exe` must come from [`jb_executable_new`], `tc` from a toolchain
/// constructor.
#[no_mangle]
pub unsafe extern "C" fn jb_executable_set_toolchain(exe: *mut JBExecutable, tc: *const JBToolchain) {
    let tc = Arc::clone(&handle_ref(tc, "toolchain").toolchain);
    handle(exe, "executable").target_mut().toolchain = Some(tc);
}

/// # Safety
///
/// `lib` must come from [`jb_library_new`], `tc` from a toolchain
/// constructor.
#[no_mangle]
pub unsafe extern "C" fn jb_library_set_toolchain(lib: *mut JBLibrary, tc: *const JBToolchain) {
    let tc = Arc::clone(&handle_ref(tc, "toolchain").toolchain);
    handle(lib, "library").target_mut().toolchain = Some(tc);
}

/// Build `exe` and return the program's path, valid until the handle is
/// freed or built again.
///
/// # Safety
///
/// `exe` must come from [`jb_executable_new`].
#[no_mangle]
pub unsafe extern "C" fn jb_build_exe(exe: *mut JBExecutable) -> *const c_char {
    let exe = handle(exe, "executable");
    let path: PathBuf = or_fail(context().build_executable(&exe.exe));
    exe.artifact
        .insert(or_fail(path_to_cstring(&path)))
        .as_ptr()
}

/// Build `lib` and return the library's path, valid until the handle is
/// freed or built again.
///
/// # Safety
///
/// `lib` must come from [`jb_library_new`].
#[no_mangle]
pub unsafe extern "C" fn jb_build_lib(lib: *mut JBLibrary) -> *const c_char {
    let lib = handle(lib, "library");
    let path: PathBuf = or_fail(context().build_library(&lib.lib));
    lib.artifact
        .insert(or_fail(path_to_cstring(&path)))
        .as_ptr()
}

/// # Safety
///
/// `exe` must come from [`jb_executable_new`], or be NULL.
#[no_mangle]
pub unsafe extern "C" fn jb_executable_free(exe: *mut JBExecutable) {
    if !exe.is_null() {
        drop(Box::from_raw(exe));
    }
}

/// # Safety
///
/// `lib` must come from [`jb_library_new`], or be NULL.
#[no_mangle]
pub unsafe extern "C" fn jb_library_free(lib: *mut JBLibrary) {
    if !lib.is_null() {
        drop(Box::from_raw(lib));
    }
}
