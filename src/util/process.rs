//! Subprocess execution.
//!
//! Every compiler, linker and archiver invocation goes through a
//! [`CommandRunner`]. The real implementation, [`Executor`], merges the
//! child's stdout and stderr into one channel (a pipe, or a pseudo-terminal on
//! unix), drains it in bounded chunks while waiting for the child, streams it
//! to the console and optionally to a persistent log file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use crate::util::ansi::AnsiStripper;
use crate::util::config::Config;
use crate::util::errors::BuildError;
use crate::util::vec::GrowVec;

/// Size of a single read from the child's output channel.
pub const CHUNK_SIZE: usize = 4096;

/// How long one poll for output waits before checking the child again.
const POLL_TIMEOUT_MS: u16 = 50;

/// Builder for subprocess execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
        }
    }

    /// Create a builder from a full argument vector (`argv[0]` is the program).
    pub fn from_argv<S: AsRef<str>>(argv: &[S]) -> Option<Self> {
        let (program, rest) = argv.split_first()?;
        Some(ProcessBuilder::new(program.as_ref()).args(rest.iter().map(|s| s.as_ref())))
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add a path argument.
    pub fn arg_path(self, path: impl AsRef<Path>) -> Self {
        let arg = path.as_ref().display().to_string();
        self.arg(arg)
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .push((key.as_ref().to_string(), value.as_ref().to_string()));
        self
    }

    /// Set several environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            self = self.env(key, value);
        }
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// The full argument vector, program first.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.display().to_string());
        argv.extend(self.args.iter().cloned());
        argv
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Display the command for messages and logs.
    pub fn display_command(&self) -> String {
        self.argv().join(" ")
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Outcome of one child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Exit code, absent when the child was killed by a signal.
    pub code: Option<i32>,
    /// Terminating signal (unix only).
    pub signal: Option<i32>,
    /// Combined stdout and stderr.
    pub output: String,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn from_status(status: ExitStatus, output: Vec<u8>) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        RunResult {
            code: status.code(),
            signal,
            output: String::from_utf8_lossy(&output).into_owned(),
        }
    }
}

/// Turn a finished run into an error unless it exited with status zero.
pub fn check_status(cmd: &ProcessBuilder, result: RunResult) -> Result<RunResult> {
    if result.success() {
        return Ok(result);
    }

    let command = cmd.display_command();
    let err = match (result.code, result.signal) {
        (_, Some(signal)) => BuildError::ChildSignaled {
            command,
            signal,
            output: result.output,
        },
        (code, None) => BuildError::ChildNonZeroExit {
            command,
            code: code.unwrap_or(-1),
            output: result.output,
        },
    };
    Err(err.into())
}

/// Runs subprocesses on behalf of the build engine.
pub trait CommandRunner: Send + Sync {
    /// Spawn `cmd`, wait for it and collect its merged output.
    ///
    /// `echo` streams the output to the console while the child runs.
    /// Only failure to start the child is an error here.
    fn spawn(&self, cmd: &ProcessBuilder, echo: bool) -> Result<RunResult>;

    /// Run a command whose failure is fatal, streaming its output.
    fn run(&self, cmd: &ProcessBuilder) -> Result<RunResult> {
        let result = self.spawn(cmd, true)?;
        check_status(cmd, result)
    }

    /// Run a command quietly and hand back its output and status.
    fn run_capturing(&self, cmd: &ProcessBuilder) -> Result<RunResult> {
        self.spawn(cmd, false)
    }
}

impl<T: CommandRunner + ?Sized> CommandRunner for Arc<T> {
    fn spawn(&self, cmd: &ProcessBuilder, echo: bool) -> Result<RunResult> {
        (**self).spawn(cmd, echo)
    }
}

impl<T: CommandRunner + ?Sized> CommandRunner for Box<T> {
    fn spawn(&self, cmd: &ProcessBuilder, echo: bool) -> Result<RunResult> {
        (**self).spawn(cmd, echo)
    }
}

/// How the child's output reaches the parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Transport {
    /// An anonymous pipe shared by stdout and stderr.
    #[default]
    Pipe,
    /// A pseudo-terminal, so tools keep their colored output.
    Pty,
}

/// The process-spawning [`CommandRunner`].
#[derive(Debug, Default)]
pub struct Executor {
    verbose: bool,
    transport: Transport,
    log: Option<Mutex<File>>,
}

impl Executor {
    pub fn new() -> Self {
        Executor::default()
    }

    /// Build an executor from the effective configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = if config.build.pty {
            Transport::Pty
        } else {
            Transport::Pipe
        };

        let mut executor = Executor::new()
            .with_verbose(config.build.verbose)
            .with_transport(transport);

        if let Some(ref path) = config.build.log_file {
            executor = executor.with_log_file(path)?;
        }

        Ok(executor)
    }

    /// Echo every argument vector before spawning it.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        if transport == Transport::Pty && !cfg!(unix) {
            tracing::warn!("pseudo-terminal output is not supported on this host, using a pipe");
            self.transport = Transport::Pipe;
        } else {
            self.transport = transport;
        }
        self
    }

    /// Append all echoed output to `path`.
    pub fn with_log_file(mut self, path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| BuildError::file_io("open log file", path, e))?;
        self.log = Some(Mutex::new(file));
        Ok(self)
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    fn log_line(&self, line: &str) -> Result<()> {
        if let Some(ref log) = self.log {
            let mut file = log.lock().unwrap_or_else(|e| e.into_inner());
            writeln!(file, "{}", line).context("failed to write log file")?;
        }
        Ok(())
    }
}

impl CommandRunner for Executor {
    fn spawn(&self, cmd: &ProcessBuilder, echo: bool) -> Result<RunResult> {
        let display = cmd.display_command();
        if self.verbose {
            eprintln!("{}", display);
        }
        if echo {
            self.log_line(&display)?;
        }

        let log = if echo { self.log.as_ref() } else { None };
        let mut sink = OutputSink::new(echo, log, self.transport == Transport::Pty);

        let status = match self.transport {
            Transport::Pipe => run_pipe(cmd, &mut sink)?,
            #[cfg(unix)]
            Transport::Pty => pty::run_pty(cmd, &mut sink)?,
            #[cfg(not(unix))]
            Transport::Pty => run_pipe(cmd, &mut sink)?,
        };

        Ok(RunResult::from_status(status, sink.finish()))
    }
}

/// Destination for drained output: the captured buffer, plus the console and
/// log file when echoing.
struct OutputSink<'a> {
    captured: GrowVec<u8>,
    echo: bool,
    log: Option<&'a Mutex<File>>,
    stripper: Option<AnsiStripper>,
    plain: Vec<u8>,
}

impl<'a> OutputSink<'a> {
    fn new(echo: bool, log: Option<&'a Mutex<File>>, strip_for_log: bool) -> Self {
        OutputSink {
            captured: GrowVec::with_capacity(CHUNK_SIZE),
            echo,
            log,
            stripper: strip_for_log.then(AnsiStripper::new),
            plain: Vec::new(),
        }
    }

    fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.captured.extend(chunk.iter().copied());

        if self.echo {
            let mut stderr = io::stderr().lock();
            // The console is best effort; a closed stderr must not fail the build.
            let _ = stderr.write_all(chunk);
            let _ = stderr.flush();
        }

        if let Some(log) = self.log {
            let mut file = log.lock().unwrap_or_else(|e| e.into_inner());
            match self.stripper {
                Some(ref mut stripper) => {
                    self.plain.clear();
                    stripper.feed(chunk, &mut self.plain);
                    file.write_all(&self.plain)
                }
                None => file.write_all(chunk),
            }
            .context("failed to write log file")?;
        }

        Ok(())
    }

    fn finish(self) -> Vec<u8> {
        self.captured.into_vec()
    }
}

fn spawn_child(cmd: &ProcessBuilder, mut command: Command) -> Result<Child> {
    let child = command.spawn().map_err(|source| BuildError::SpawnFailure {
        program: cmd.get_program().display().to_string(),
        source,
    })?;
    // The command owns the parent's copies of the child's output handles.
    drop(command);
    Ok(child)
}

fn run_pipe(cmd: &ProcessBuilder, sink: &mut OutputSink<'_>) -> Result<ExitStatus> {
    let (reader, writer) = io::pipe().context("failed to create output pipe")?;

    let mut command = cmd.build_command();
    command
        .stdin(Stdio::null())
        .stdout(writer.try_clone().context("failed to clone output pipe")?)
        .stderr(writer);

    let mut child = spawn_child(cmd, command)?;

    #[cfg(unix)]
    {
        drain::drain_polled(&mut child, reader, sink, cmd)
    }
    #[cfg(not(unix))]
    {
        drain::drain_threaded(&mut child, reader, sink, cmd)
    }
}

#[cfg(unix)]
mod drain {
    use std::io::{self, Read};
    use std::os::fd::AsFd;
    use std::process::{Child, ExitStatus};

    use anyhow::{Context, Result};
    use nix::errno::Errno;
    use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

    use super::{OutputSink, ProcessBuilder, CHUNK_SIZE, POLL_TIMEOUT_MS};
    use crate::util::errors::BuildError;

    enum Readiness {
        Data,
        Idle,
    }

    fn wait_readable(reader: &impl AsFd, timeout_ms: u16) -> Result<Readiness> {
        let mut fds = [PollFd::new(reader.as_fd(), PollFlags::POLLIN)];
        loop {
            match poll(&mut fds, PollTimeout::from(timeout_ms)) {
                Ok(0) => return Ok(Readiness::Idle),
                Ok(_) => return Ok(Readiness::Data),
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e).context("failed to poll child output"),
            }
        }
    }

    /// Read one chunk. `None` is end of output; a pseudo-terminal reports
    /// that as `EIO` once every slave handle is closed.
    fn read_chunk(reader: &mut impl Read, buf: &mut [u8]) -> Result<Option<usize>> {
        loop {
            match reader.read(buf) {
                Ok(0) => return Ok(None),
                Ok(n) => return Ok(Some(n)),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.raw_os_error() == Some(Errno::EIO as i32) => return Ok(None),
                Err(e) => return Err(e).context("failed to read child output"),
            }
        }
    }

    pub(super) fn drain_polled<R: Read + AsFd>(
        child: &mut Child,
        mut reader: R,
        sink: &mut OutputSink<'_>,
        cmd: &ProcessBuilder,
    ) -> Result<ExitStatus> {
        let mut buf = [0u8; CHUNK_SIZE];
        let mut open = true;

        let status = loop {
            if open {
                if let Readiness::Data = wait_readable(&reader, POLL_TIMEOUT_MS)? {
                    match read_chunk(&mut reader, &mut buf)? {
                        Some(n) => sink.write(&buf[..n])?,
                        None => open = false,
                    }
                }
            }

            if let Some(status) = child.try_wait().context("failed to wait for child")? {
                break status;
            }

            if !open {
                std::thread::sleep(std::time::Duration::from_millis(u64::from(POLL_TIMEOUT_MS)));
            }
        };

        // Whatever the child wrote before exiting is still buffered.
        while open {
            match wait_readable(&reader, POLL_TIMEOUT_MS)? {
                Readiness::Data => match read_chunk(&mut reader, &mut buf)? {
                    Some(n) => sink.write(&buf[..n])?,
                    None => open = false,
                },
                // A grandchild may still hold the write end; stop once it goes quiet.
                Readiness::Idle => break,
            }
        }

        if open {
            if let Readiness::Data = wait_readable(&reader, 0)? {
                return Err(BuildError::UndrainedOutput {
                    command: cmd.display_command(),
                }
                .into());
            }
        }

        Ok(status)
    }
}

#[cfg(not(unix))]
mod drain {
    use std::io::{PipeReader, Read};
    use std::process::{Child, ExitStatus};
    use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
    use std::thread;
    use std::time::Duration;

    use anyhow::{Context, Result};

    use super::{OutputSink, ProcessBuilder, CHUNK_SIZE, POLL_TIMEOUT_MS};
    use crate::util::errors::BuildError;

    /// Pipes cannot be polled portably, so a pump thread reads them and
    /// hands chunks over a channel.
    pub(super) fn drain_threaded(
        child: &mut Child,
        mut reader: PipeReader,
        sink: &mut OutputSink<'_>,
        cmd: &ProcessBuilder,
    ) -> Result<ExitStatus> {
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        let pump = thread::spawn(move || {
            let mut buf = [0u8; CHUNK_SIZE];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let timeout = Duration::from_millis(u64::from(POLL_TIMEOUT_MS));
        let mut open = true;

        let status = loop {
            if open {
                match rx.recv_timeout(timeout) {
                    Ok(chunk) => sink.write(&chunk)?,
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => open = false,
                }
            } else {
                thread::sleep(timeout);
            }

            if let Some(status) = child.try_wait().context("failed to wait for child")? {
                break status;
            }
        };

        while open {
            match rx.recv_timeout(timeout) {
                Ok(chunk) => sink.write(&chunk)?,
                Err(RecvTimeoutError::Disconnected) => open = false,
                Err(RecvTimeoutError::Timeout) => break,
            }
        }

        if open {
            match rx.try_recv() {
                Ok(_) => {
                    return Err(BuildError::UndrainedOutput {
                        command: cmd.display_command(),
                    }
                    .into())
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                    tracing::debug!("`{}` left its output pipe open", cmd.display_command());
                }
            }
        } else if pump.join().is_err() {
            tracing::warn!("output pump for `{}` panicked", cmd.display_command());
        }

        Ok(status)
    }
}

#[cfg(unix)]
mod pty {
    use std::fs::File;
    use std::os::fd::OwnedFd;
    use std::process::{ExitStatus, Stdio};

    use anyhow::{Context, Result};
    use nix::pty::{openpty, Winsize};
    use nix::sys::termios::Termios;

    use super::{drain, spawn_child, OutputSink, ProcessBuilder};

    pub(super) fn run_pty(cmd: &ProcessBuilder, sink: &mut OutputSink<'_>) -> Result<ExitStatus> {
        let pair = openpty(None::<&Winsize>, None::<&Termios>)
            .context("failed to open pseudo-terminal")?;

        let slave_err: OwnedFd = pair
            .slave
            .try_clone()
            .context("failed to duplicate pseudo-terminal")?;

        let mut command = cmd.build_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::from(pair.slave))
            .stderr(Stdio::from(slave_err));

        let mut child = spawn_child(cmd, command)?;
        drain::drain_polled(&mut child, File::from(pair.master), sink, cmd)
    }
}

/// Split a command template on whitespace and expand `$NAME` references
/// from the process environment, then append `extra` verbatim.
pub fn expand_command<S: AsRef<str>>(template: &str, extra: &[S]) -> Vec<String> {
    expand_command_with(template, extra, |name| std::env::var(name).ok())
}

/// [`expand_command`] with an explicit variable lookup.
///
/// `NAME` is the longest run of ASCII alphanumerics after the `$`. Undefined
/// variables expand to nothing and a token left empty is dropped. A `$` not
/// followed by a name character stays as is. No quoting is recognized.
pub fn expand_command_with<S, F>(template: &str, extra: &[S], lookup: F) -> Vec<String>
where
    S: AsRef<str>,
    F: Fn(&str) -> Option<String>,
{
    let mut argv: GrowVec<String> = GrowVec::new();

    for token in template.split_whitespace() {
        let mut expanded = String::with_capacity(token.len());
        let mut rest = token;

        while let Some(pos) = rest.find('$') {
            expanded.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let name_len = after
                .bytes()
                .take_while(|b| b.is_ascii_alphanumeric())
                .count();

            if name_len == 0 {
                expanded.push('$');
            } else if let Some(value) = lookup(&after[..name_len]) {
                expanded.push_str(&value);
            }
            rest = &after[name_len..];
        }
        expanded.push_str(rest);

        if !expanded.is_empty() {
            argv.push(expanded);
        }
    }

    argv.extend(extra.iter().map(|s| s.as_ref().to_string()));
    argv.into_vec()
}

/// Expand a command template and run it as a fatal command.
pub fn run_string<S: AsRef<str>>(
    runner: &dyn CommandRunner,
    template: &str,
    extra: &[S],
) -> Result<RunResult> {
    let argv = expand_command(template, extra);
    let cmd = ProcessBuilder::from_argv(&argv)
        .with_context(|| format!("empty command: `{}`", template))?;
    runner.run(&cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("gcc").args(["-Wall", "-o", "output", "input.c"]);

        assert_eq!(pb.display_command(), "gcc -Wall -o output input.c");
        assert_eq!(pb.argv().len(), 5);
    }

    #[test]
    fn test_from_argv() {
        let pb = ProcessBuilder::from_argv(&["ar", "rcs", "libx.a"]).unwrap();
        assert_eq!(pb.get_program(), Path::new("ar"));
        assert_eq!(pb.get_args(), &["rcs", "libx.a"]);

        assert!(ProcessBuilder::from_argv::<&str>(&[]).is_none());
    }

    #[test]
    fn test_expand_command() {
        let lookup = |name: &str| match name {
            "CC" => Some("clang".to_string()),
            "OPT" => Some("2".to_string()),
            "EMPTY" => Some(String::new()),
            _ => None,
        };

        let argv = expand_command_with(
            "  $CC\t-O$OPT $EMPTY $UNSET -DX=$ cost$  main.c ",
            &["extra $CC"],
            lookup,
        );

        assert_eq!(
            argv,
            vec!["clang", "-O2", "-DX=$", "cost$", "main.c", "extra $CC"]
        );
    }

    #[test]
    fn test_expand_name_stops_at_punctuation() {
        let lookup = |name: &str| (name == "HOME").then(|| "/home/me".to_string());
        let argv = expand_command_with::<&str, _>("-I$HOME/include", &[], lookup);
        assert_eq!(argv, vec!["-I/home/me/include"]);
    }

    #[test]
    fn test_check_status() {
        let cmd = ProcessBuilder::new("cc").arg("-c").arg("x.c");

        let ok = RunResult {
            code: Some(0),
            ..Default::default()
        };
        assert!(check_status(&cmd, ok).is_ok());

        let failed = RunResult {
            code: Some(2),
            signal: None,
            output: "x.c:1: error".into(),
        };
        let err = check_status(&cmd, failed).unwrap_err();
        match err.downcast_ref::<BuildError>() {
            Some(BuildError::ChildNonZeroExit { code, output, .. }) => {
                assert_eq!(*code, 2);
                assert_eq!(output, "x.c:1: error");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let killed = RunResult {
            code: None,
            signal: Some(9),
            output: String::new(),
        };
        let err = check_status(&cmd, killed).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::ChildSignaled { signal: 9, .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_executor_merges_stdout_and_stderr() {
        let cmd = ProcessBuilder::new("sh").args(["-c", "echo out; echo err 1>&2; exit 3"]);
        let result = Executor::new().run_capturing(&cmd).unwrap();

        assert_eq!(result.code, Some(3));
        assert!(result.output.contains("out"));
        assert!(result.output.contains("err"));
    }

    #[cfg(unix)]
    #[test]
    fn test_executor_drains_large_output() {
        // Far more than one pipe buffer, written just before exit.
        let cmd = ProcessBuilder::new("sh").args(["-c", "i=0; while [ $i -lt 4000 ]; do echo line-$i; i=$((i+1)); done"]);
        let result = Executor::new().run_capturing(&cmd).unwrap();

        assert!(result.success());
        assert_eq!(result.output.lines().count(), 4000);
        assert!(result.output.ends_with("line-3999\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_executor_run_fails_on_nonzero() {
        let cmd = ProcessBuilder::new("sh").args(["-c", "exit 1"]);
        let err = Executor::new().run(&cmd).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::ChildNonZeroExit { code: 1, .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_executor_reports_signal() {
        let cmd = ProcessBuilder::new("sh").args(["-c", "kill -9 $$"]);
        let result = Executor::new().run_capturing(&cmd).unwrap();
        assert_eq!(result.code, None);
        assert_eq!(result.signal, Some(9));
    }

    #[test]
    fn test_executor_from_config() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        assert_eq!(Executor::from_config(&config).unwrap().transport(), Transport::Pipe);

        config.build.verbose = true;
        config.build.log_file = Some(tmp.path().join("build.log"));
        let executor = Executor::from_config(&config).unwrap();
        assert!(executor.is_verbose());
        assert!(tmp.path().join("build.log").is_file());

        config.build.log_file = Some(tmp.path().join("missing/build.log"));
        let err = Executor::from_config(&config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::FileIo { .. })
        ));
    }

    #[test]
    fn test_spawn_failure() {
        let cmd = ProcessBuilder::new("definitely-not-a-real-program-xyz");
        let err = Executor::new().run_capturing(&cmd).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::SpawnFailure { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_pty_log_is_stripped() {
        let tmp = tempfile::TempDir::new().unwrap();
        let log_path = tmp.path().join("build.log");

        let executor = Executor::new()
            .with_transport(Transport::Pty)
            .with_log_file(&log_path)
            .unwrap();

        let cmd = ProcessBuilder::new("printf").arg("\\033[31mred\\033[0m\\n");
        let result = executor.run(&cmd).unwrap();
        assert!(result.output.contains("\x1b[31m"));

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("red"));
        assert!(!log.contains('\x1b'));
    }
}
