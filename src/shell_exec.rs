//! External command execution with logging and concurrency limiting.
//!
//! Every git invocation goes through [`Cmd`], which:
//! - logs the command line at debug level (`$ git status --porcelain [myrepo]`)
//! - holds a permit from a process-wide [`Semaphore`] while the child runs
//! - emits a `[repocheck-trace]` debug line with the duration and outcome
//!
//! Commands block the calling thread until the child exits and its output is
//! fully read. There is no timeout: a hung git hangs the repository being
//! reconciled.

use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::sync::OnceLock;
use std::time::Instant;

use crate::sync::Semaphore;

static CMD_SEMAPHORE: OnceLock<Semaphore> = OnceLock::new();

/// Monotonic epoch for trace timestamps.
static TRACE_EPOCH: OnceLock<Instant> = OnceLock::new();

/// Default concurrent external commands. Tuned to avoid hitting OS limits
/// (file descriptors, process limits) while keeping Rayon's workers busy.
const DEFAULT_CONCURRENT_COMMANDS: usize = 32;

fn trace_epoch() -> &'static Instant {
    TRACE_EPOCH.get_or_init(Instant::now)
}

fn max_concurrent_commands() -> usize {
    std::env::var("REPOCHECK_MAX_CONCURRENT_COMMANDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_CONCURRENT_COMMANDS)
}

fn semaphore() -> &'static Semaphore {
    CMD_SEMAPHORE.get_or_init(|| Semaphore::new(max_concurrent_commands()))
}

/// Extract the numeric id from `ThreadId`'s debug format ("ThreadId(N)").
fn thread_id_number() -> u64 {
    let debug_str = format!("{:?}", std::thread::current().id());
    debug_str
        .strip_prefix("ThreadId(")
        .and_then(|s| s.strip_suffix(')'))
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Builder for executing commands with logging and tracing.
///
/// ```ignore
/// let output = Cmd::new("git")
///     .args(["status", "--porcelain"])
///     .current_dir(&repo_root)
///     .context("myrepo")
///     .run()?;
/// ```
pub struct Cmd {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    context: Option<String>,
    envs: Vec<(String, String)>,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            context: None,
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Set the logging context (the repository display name for git commands).
    pub fn context(mut self, ctx: impl Into<String>) -> Self {
        self.context = Some(ctx.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, val: impl Into<String>) -> Self {
        self.envs.push((key.into(), val.into()));
        self
    }

    /// The command line as logged, e.g. `git rev-list --count a..b`.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    /// Execute the command and return its captured output.
    ///
    /// Only spawn failures are errors here; callers decide what a non-zero
    /// exit status means.
    pub fn run(self) -> std::io::Result<Output> {
        let cmd_str = self.display();
        let ctx = self.context.as_deref().unwrap_or("-");
        log::debug!("$ {} [{}]", cmd_str, ctx);

        let _permit = semaphore().acquire();

        let t0 = Instant::now();
        let ts = t0.duration_since(*trace_epoch()).as_micros() as u64;
        let tid = thread_id_number();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdin(Stdio::null());
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        for (key, val) in &self.envs {
            cmd.env(key, val);
        }

        let result = cmd.output();

        let dur_us = t0.elapsed().as_micros() as u64;
        match &result {
            Ok(output) => log::debug!(
                "[repocheck-trace] ts={} tid={} context={} cmd=\"{}\" dur_us={} ok={}",
                ts,
                tid,
                ctx,
                cmd_str,
                dur_us,
                output.status.success()
            ),
            Err(e) => log::debug!(
                "[repocheck-trace] ts={} tid={} context={} cmd=\"{}\" dur_us={} err=\"{}\"",
                ts,
                tid,
                ctx,
                cmd_str,
                dur_us,
                e
            ),
        }

        result
    }
}
