//! Test utilities for Jetty unit tests.
//!
//! [`FakeRunner`] stands in for the real executor. It records every command
//! and imitates just enough of a compiler, linker and archiver to drive the
//! build engine: dependency scans answer from a table, compiles and links
//! write their output file. Every file it writes (and every file a test
//! creates through [`FakeRunner::touch`]) gets its modification time from a
//! monotonic fake clock, so staleness checks never depend on filesystem
//! timestamp resolution.
//!
//! # Example
//!
//! ```rust,ignore
//! let runner = FakeRunner::new();
//! runner.touch(&src.join("main.c"));
//! let ctx = BuildContext::new(Config::default()).with_runner(runner.clone());
//! ctx.build_executable(&exe)?;
//! assert_eq!(runner.build_calls().len(), 2);
//! ```

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use anyhow::Result;

use crate::util::process::{CommandRunner, ProcessBuilder, RunResult};

/// One command seen by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub argv: Vec<String>,
    /// Run through `run_capturing` rather than `run`.
    pub capturing: bool,
}

impl RecordedCall {
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or("")
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.argv.iter().skip(1).any(|a| a == arg)
    }
}

#[derive(Debug)]
struct FakeState {
    clock: SystemTime,
    calls: Vec<RecordedCall>,
    dependencies: HashMap<PathBuf, Vec<PathBuf>>,
    fail_scans: bool,
    failing_program: Option<String>,
}

/// Recording, file-writing stand-in for the process executor.
#[derive(Debug, Clone)]
pub struct FakeRunner {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeRunner {
    fn default() -> Self {
        FakeRunner::new()
    }
}

impl FakeRunner {
    pub fn new() -> Self {
        FakeRunner {
            state: Arc::new(Mutex::new(FakeState {
                // Ahead of real time so nothing written for real looks newer.
                clock: SystemTime::now() + Duration::from_secs(3600),
                calls: Vec::new(),
                dependencies: HashMap::new(),
                fail_scans: false,
                failing_program: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn tick(&self) -> SystemTime {
        let mut state = self.lock();
        state.clock += Duration::from_secs(1);
        state.clock
    }

    /// Create `path` if needed and stamp it with the next clock tick.
    pub fn touch(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        self.stamp(path).unwrap();
    }

    fn stamp(&self, path: &Path) -> std::io::Result<()> {
        let time = self.tick();
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.set_modified(time)
    }

    /// Headers the next scans of `source` report, besides the source itself.
    pub fn set_dependencies(&self, source: &Path, deps: &[PathBuf]) {
        self.lock()
            .dependencies
            .insert(source.to_path_buf(), deps.to_vec());
    }

    /// Make every dependency scan exit with an error.
    pub fn fail_scans(&self, fail: bool) {
        self.lock().fail_scans = fail;
    }

    /// Make every command whose program is named `name` exit with status 1.
    pub fn fail_program(&self, name: &str) {
        self.lock().failing_program = Some(name.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Compile, link and archive calls, without dependency scans.
    pub fn build_calls(&self) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| !c.capturing).collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn scan_output(&self, call: &RecordedCall, json: bool) -> String {
        let source = PathBuf::from(call.argv.last().cloned().unwrap_or_default());
        let deps = self
            .lock()
            .dependencies
            .get(&source)
            .cloned()
            .unwrap_or_default();

        if json {
            let quote = |p: &Path| serde_json::to_string(&p.display().to_string()).unwrap();
            let includes: Vec<String> = deps.iter().map(|d| quote(d.as_path())).collect();
            format!(
                "{{\"Version\": \"1.1\", \"Data\": {{\"Source\": {}, \"Includes\": [{}]}}}}",
                quote(source.as_path()),
                includes.join(", ")
            )
        } else if source.extension().is_some_and(|ext| ext == "s") {
            // Like gcc: no preprocessing, so no rule at all.
            String::new()
        } else {
            let stem = source.file_stem().unwrap_or_default().to_string_lossy();
            let mut rule = format!("{}.o: {}", stem, source.display());
            for dep in &deps {
                rule.push_str(" \\\n  ");
                rule.push_str(&dep.display().to_string().replace(' ', "\\ "));
            }
            rule.push('\n');
            rule
        }
    }

    /// The file a compile, link or archive command writes.
    fn output_of(call: &RecordedCall) -> Option<PathBuf> {
        let args = &call.argv[1..];

        for prefix in ["/Fo:", "/OUT:"] {
            if let Some(out) = args.iter().find_map(|a| a.strip_prefix(prefix)) {
                return Some(PathBuf::from(out));
            }
        }
        if let Some(pos) = args.iter().position(|a| a == "-o") {
            return args.get(pos + 1).map(PathBuf::from);
        }
        if args.first().map(String::as_str) == Some("rcs") {
            return args.get(1).map(PathBuf::from);
        }
        None
    }
}

impl CommandRunner for FakeRunner {
    fn spawn(&self, cmd: &ProcessBuilder, echo: bool) -> Result<RunResult> {
        let call = RecordedCall {
            argv: cmd.argv(),
            capturing: !echo,
        };
        self.lock().calls.push(call.clone());

        let program = Path::new(call.program())
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (fail_scans, failing) = {
            let state = self.lock();
            (state.fail_scans, state.failing_program.clone())
        };

        if failing.as_deref() == Some(program.as_str()) {
            return Ok(RunResult {
                code: Some(1),
                signal: None,
                output: format!("{}: simulated failure\n", program),
            });
        }

        let is_scan = call.has_arg("-MM") || call.has_arg("/sourceDependencies");
        if is_scan {
            if fail_scans {
                return Ok(RunResult {
                    code: Some(1),
                    signal: None,
                    output: "fatal error: scan failed\n".to_string(),
                });
            }
            return Ok(RunResult {
                code: Some(0),
                signal: None,
                output: self.scan_output(&call, call.has_arg("/sourceDependencies")),
            });
        }

        if let Some(out) = FakeRunner::output_of(&call) {
            if let Err(e) = self.stamp(&out) {
                return Ok(RunResult {
                    code: Some(1),
                    signal: None,
                    output: format!("cannot open output file {}: {}\n", out.display(), e),
                });
            }
        }

        Ok(RunResult {
            code: Some(0),
            signal: None,
            output: String::new(),
        })
    }
}
