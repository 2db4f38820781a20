//! External command execution utilities.
//!
//! Provides a Builder-based API for running external tools (the frontend
//! build, mostly) with captured output, optional PTY and an optional timeout.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! let output = Cmd::from_slice(&["npm", "run", "build"])
//!     .cwd(frontend_dir)
//!     .timeout(Some(Duration::from_secs(300)))
//!     .output()?;
//!
//! if !output.status.success() {
//!     eprintln!("{}", String::from_utf8_lossy(&output.stderr));
//! }
//! ```

use crate::{debug, log};
use portable_pty::{ChildKiller, CommandBuilder, NativePtySystem, PtySize, PtySystem};
use regex::Regex;
use std::{
    ffi::{OsStr, OsString},
    io::{self, Read},
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Output, Stdio},
    sync::OnceLock,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use thiserror::Error;

/// Interval between exit checks while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

// ============================================================================
// Errors
// ============================================================================

/// Failure to run a command to completion.
///
/// A non-zero exit status is *not* an error here: callers inspect
/// `Output::status` and decide.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for `{program}`")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` did not finish within {}s and was killed", .after.as_secs())]
    Timeout { program: String, after: Duration },

    #[error("pseudo-terminal error while running `{program}`: {message}")]
    Pty { program: String, message: String },
}

// ============================================================================
// Builder API
// ============================================================================

/// Command builder for external process execution.
#[derive(Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
    use_pty: bool,
    timeout: Option<Duration>,
    filter: Option<&'static FilterRule>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Create from a command array (e.g., `["npm", "run", "build"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        let args: Vec<_> = iter.map(|s| s.as_ref().to_owned()).collect();
        Self {
            program,
            args,
            ..Default::default()
        }
    }

    /// Add a single argument.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            let arg = arg.as_ref();
            if !arg.is_empty() {
                self.args.push(arg.to_owned());
            }
        }
        self
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Set environment variables for the subprocess.
    pub fn envs<K, V, I>(mut self, vars: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in vars {
            self.envs.push((k.as_ref().to_owned(), v.as_ref().to_owned()));
        }
        self
    }

    /// Enable PTY (pseudo-terminal) mode.
    ///
    /// PTY makes tools behave as if running in a real terminal (colors,
    /// spinners). stdout and stderr are merged into `Output::stdout`.
    pub fn pty(mut self, enable: bool) -> Self {
        self.use_pty = enable;
        self
    }

    /// Kill the process if it runs longer than `limit`.
    pub fn timeout(mut self, limit: Option<Duration>) -> Self {
        self.timeout = limit;
        self
    }

    /// Set output filter for logging successful runs.
    pub fn filter(mut self, filter: &'static FilterRule) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Execute the command, capturing its output.
    pub fn output(self) -> Result<Output, ExecError> {
        let filter = self.filter.unwrap_or(&SILENT_FILTER);
        let name = self.program_name();

        let output = if self.use_pty {
            self.run_with_pty()?
        } else {
            self.run_piped()?
        };

        if output.status.success() {
            filter.log(&name, String::from_utf8_lossy(&output.stdout).trim());
            filter.log(&name, String::from_utf8_lossy(&output.stderr).trim());
        }
        Ok(output)
    }

    /// Get the program name for error messages.
    fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Plain execution with stdout/stderr piped through reader threads.
    fn run_piped(self) -> Result<Output, ExecError> {
        let name = self.program_name();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.envs.iter().cloned())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            program: name.clone(),
            source,
        })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = wait_child(&mut child, self.timeout, &name)?;

        Ok(Output {
            status,
            stdout: join_reader(stdout),
            stderr: join_reader(stderr),
        })
    }

    /// Execution inside a pseudo-terminal.
    fn run_with_pty(self) -> Result<Output, ExecError> {
        let name = self.program_name();
        let pty_err = |e: anyhow::Error| ExecError::Pty {
            program: name.clone(),
            message: format!("{e:#}"),
        };

        let mut cmd_builder = CommandBuilder::new(&self.program);
        cmd_builder.args(&self.args);
        for (k, v) in &self.envs {
            cmd_builder.env(k, v);
        }
        if let Some(dir) = &self.cwd {
            cmd_builder.cwd(dir);
        }

        let pty_system = NativePtySystem::default();
        let pair = pty_system
            .openpty(PtySize {
                rows: 24,
                cols: 80,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(pty_err)?;

        let mut child = pair.slave.spawn_command(cmd_builder).map_err(pty_err)?;
        drop(pair.slave);

        // Read output in separate thread (PTY blocks until EOF)
        let reader = pair.master.try_clone_reader().map_err(pty_err)?;
        let output_handle = drain(reader);

        let started = Instant::now();
        let status = loop {
            let polled = child.try_wait().map_err(|source| ExecError::Wait {
                program: name.clone(),
                source,
            })?;
            if let Some(status) = polled {
                break status;
            }
            if let Some(limit) = self.timeout
                && started.elapsed() >= limit
            {
                child.kill().ok();
                return Err(ExecError::Timeout {
                    program: name,
                    after: limit,
                });
            }
            thread::sleep(POLL_INTERVAL);
        };
        drop(pair.master);

        let output = join_reader(Some(output_handle));

        Ok(Output {
            status: exit_status_from_code(status.exit_code()),
            stdout: output,
            stderr: Vec::new(),
        })
    }
}

// ============================================================================
// Process helpers
// ============================================================================

/// Read a stream to the end on a background thread.
fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = reader.read_to_end(&mut buf) {
            debug!("exec"; "output read stopped after {} bytes: {}", buf.len(), e);
        }
        buf
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Wait for a child, killing it once `timeout` has elapsed.
fn wait_child(
    child: &mut Child,
    timeout: Option<Duration>,
    name: &str,
) -> Result<ExitStatus, ExecError> {
    let wait_err = |source| ExecError::Wait {
        program: name.to_string(),
        source,
    };

    let Some(limit) = timeout else {
        return child.wait().map_err(wait_err);
    };

    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait().map_err(wait_err)? {
            return Ok(status);
        }
        if started.elapsed() >= limit {
            child.kill().ok();
            child.wait().ok();
            return Err(ExecError::Timeout {
                program: name.to_string(),
                after: limit,
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Convert a PTY exit code into `std::process::ExitStatus`.
#[allow(clippy::cast_possible_wrap)]
fn exit_status_from_code(code: u32) -> ExitStatus {
    #[cfg(unix)]
    let status = {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw((code as i32) << 8)
    };
    #[cfg(windows)]
    let status = {
        use std::os::windows::process::ExitStatusExt;
        ExitStatus::from_raw(code)
    };
    status
}

// ============================================================================
// Output Filtering
// ============================================================================

/// Filter rule for command output logging.
///
/// Used to reduce noise by skipping known warnings or irrelevant messages.
pub struct FilterRule {
    /// Prefixes to skip when logging output.
    pub skip_prefixes: &'static [&'static str],
}

impl FilterRule {
    /// Create a new filter rule.
    pub const fn new(skip_prefixes: &'static [&'static str]) -> Self {
        Self { skip_prefixes }
    }

    /// Check if a line should be skipped.
    fn should_skip(&self, line: &str) -> bool {
        line.is_empty() || self.skip_prefixes.iter().any(|p| line.starts_with(p))
    }

    /// Lines of `output` that pass the filter, ANSI codes stripped.
    fn retained(&self, output: &str) -> Vec<String> {
        output
            .lines()
            .map(|line| strip_ansi(line).trim().to_string())
            .filter(|line| !self.should_skip(line))
            .collect()
    }

    /// Log output lines that pass the filter.
    pub fn log(&self, name: &str, output: &str) {
        let lines = self.retained(output);
        if !lines.is_empty() {
            log!(name; "{}", lines.join("\n"));
        }
    }
}

/// Empty filter (no skipping).
pub const EMPTY_FILTER: FilterRule = FilterRule::new(&[]);

/// Silent filter (skip all output).
pub const SILENT_FILTER: FilterRule = FilterRule::new(&[""]);

/// Drops the npm/vite chatter that precedes every frontend build.
pub const NPM_FILTER: FilterRule = FilterRule::new(&["npm WARN", "npm notice", "> "]);

/// Strip ANSI escape codes from string.
pub fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").unwrap());
    re.replace_all(s, "")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_builder() {
        let cmd = Cmd::new("echo")
            .arg("hello")
            .args(["world", "!"])
            .cwd("/tmp");

        assert_eq!(cmd.program, OsString::from("echo"));
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_from_slice() {
        let cmd = Cmd::from_slice(&["npm", "run", "build"]);
        assert_eq!(cmd.program, OsString::from("npm"));
        assert_eq!(cmd.args, vec![OsString::from("run"), OsString::from("build")]);
    }

    #[test]
    fn test_empty_args_filtered() {
        let cmd = Cmd::new("echo").arg("").args(["a", "", "b"]);
        assert_eq!(cmd.args.len(), 2);
    }

    #[test]
    fn test_filter_rule() {
        let filter = FilterRule::new(&["npm WARN", "npm notice"]);
        assert!(filter.should_skip("npm WARN deprecated"));
        assert!(filter.should_skip("npm notice New version"));
        assert!(!filter.should_skip("dist/index.html  1.2 kB"));
        assert!(filter.should_skip(""));
    }

    #[test]
    fn test_filter_retained_strips_ansi() {
        let lines = EMPTY_FILTER.retained("\x1b[32mbuilt\x1b[0m in 1s\n\n  done  ");
        assert_eq!(lines, vec!["built in 1s", "done"]);
        assert!(SILENT_FILTER.retained("anything\nat all").is_empty());
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(strip_ansi("Plain text"), "Plain text");
    }

    #[cfg(unix)]
    #[test]
    fn test_output_captures_stdout() {
        let output = Cmd::new("echo").arg("hello").output().unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn test_output_nonzero_is_not_error() {
        let output = Cmd::from_slice(&["sh", "-c", "echo oops >&2; exit 3"])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "oops");
    }

    #[cfg(unix)]
    #[test]
    fn test_output_envs_and_cwd() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = Cmd::from_slice(&["sh", "-c", "echo $GREETING; pwd"])
            .envs([("GREETING", "hi")])
            .cwd(dir.path())
            .output()
            .unwrap();
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.starts_with("hi"));
        let leaf = dir.path().file_name().unwrap().to_str().unwrap();
        assert!(stdout.trim_end().ends_with(leaf));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_process() {
        let err = Cmd::from_slice(&["sleep", "5"])
            .timeout(Some(Duration::from_millis(200)))
            .output()
            .unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
    }

    #[test]
    fn test_spawn_error() {
        let err = Cmd::new("webstage-definitely-not-a-command")
            .output()
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    /// Yields one chunk, then fails like a closed PTY master.
    struct BrokenPipe {
        sent: bool,
    }

    impl Read for BrokenPipe {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::other("input/output error"));
            }
            self.sent = true;
            buf[..5].copy_from_slice(b"built");
            Ok(5)
        }
    }

    #[test]
    fn test_drain_keeps_output_read_before_error() {
        let handle = drain(BrokenPipe { sent: false });
        assert_eq!(join_reader(Some(handle)), b"built");
    }
}
