//! Run the CLI as a child process with a timeout and bounded output.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// Exit code reported when the CLI timed out, was killed by a signal, or never started.
pub const SYNTHETIC_FAILURE_CODE: i32 = -1;

/// Captured result of one CLI invocation.
#[derive(Debug, Clone)]
pub struct CliResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub execution_time: Duration,
    pub command: Vec<String>,
    pub working_dir: PathBuf,
    pub timed_out: bool,
    /// The binary could not be started (or waited on) at all.
    pub spawn_failed: bool,
    /// Bytes discarded from stdout and stderr beyond the output limit.
    pub truncated_bytes: usize,
}

impl CliResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    fn synthetic(command: Vec<String>, working_dir: &Path, started: Instant, stderr: String) -> Self {
        Self {
            exit_code: SYNTHETIC_FAILURE_CODE,
            stdout: String::new(),
            stderr,
            execution_time: started.elapsed(),
            command,
            working_dir: working_dir.to_path_buf(),
            timed_out: false,
            spawn_failed: false,
            truncated_bytes: 0,
        }
    }
}

/// Runs one binary with fixed limits.
#[derive(Debug, Clone)]
pub struct Executor {
    binary: PathBuf,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl Executor {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            output_limit_bytes,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run with `--config <config_path>`.
    pub fn run_with_config(&self, config_path: &Path, working_dir: &Path) -> CliResult {
        let args = vec!["--config".to_string(), config_path.display().to_string()];
        self.run(&args, working_dir)
    }

    /// Run with `--config <config_path> --verbose`.
    pub fn run_with_verbose(&self, config_path: &Path, working_dir: &Path) -> CliResult {
        let args = vec![
            "--config".to_string(),
            config_path.display().to_string(),
            "--verbose".to_string(),
        ];
        self.run(&args, working_dir)
    }

    /// Run the binary with `args` in `working_dir`.
    ///
    /// Never fails: a timeout or spawn error becomes a synthetic result with
    /// exit code [`SYNTHETIC_FAILURE_CODE`] and an explanation on stderr.
    #[instrument(skip_all, fields(binary = %self.binary.display(), timeout_secs = self.timeout.as_secs()))]
    pub fn run(&self, args: &[String], working_dir: &Path) -> CliResult {
        let mut command_line = vec![self.binary.display().to_string()];
        command_line.extend(args.iter().cloned());

        let started = Instant::now();
        let mut cmd = Command::new(&self.binary);
        cmd.args(args).current_dir(working_dir);

        match run_with_timeout(cmd, self.timeout, self.output_limit_bytes) {
            Ok(output) if output.timed_out => {
                let mut result = CliResult::synthetic(
                    command_line,
                    working_dir,
                    started,
                    format!("Command timed out after {} seconds", self.timeout.as_secs()),
                );
                result.stdout = String::from_utf8_lossy(&output.stdout).to_string();
                result.timed_out = true;
                result
            }
            Ok(output) => CliResult {
                exit_code: output.exit_code.unwrap_or(SYNTHETIC_FAILURE_CODE),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                execution_time: started.elapsed(),
                command: command_line,
                working_dir: working_dir.to_path_buf(),
                timed_out: false,
                spawn_failed: false,
                truncated_bytes: output.truncated_bytes,
            },
            Err(err) => {
                warn!(err = %err, "command failed to run");
                let mut result = CliResult::synthetic(
                    command_line,
                    working_dir,
                    started,
                    format!("Command failed: {err:#}"),
                );
                result.spawn_failed = true;
                result
            }
        }
    }
}

struct RawOutput {
    exit_code: Option<i32>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    truncated_bytes: usize,
    timed_out: bool,
}

/// Spawn `cmd`, drain both pipes on reader threads, and kill it after `timeout`.
fn run_with_timeout(mut cmd: Command, timeout: Duration, output_limit_bytes: usize) -> Result<RawOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = cmd.spawn().context("spawn command")?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, output_limit_bytes));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            timed_out = true;
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;
    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(RawOutput {
        exit_code: status.code(),
        stdout,
        stderr,
        truncated_bytes: stdout_truncated + stderr_truncated,
        timed_out,
    })
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
