//! This crate implements the process supervisor used by the judge. The
//! supervisor is responsible for executing untrusted commands in a monitored
//! environment.
//!
//! The supervisor implements:
//!
//! * Normal process operations: spawn, poll and reap a child process;
//!
//! * Wall-clock timeout: a fixed interval polling loop that marks the run as
//! timed out once the deadline elapses, without relying on the child's
//! cooperation;
//!
//! * Redirections: redirects stdin, stdout and stderr of the child process to
//! specific files, or to the null device when a slot is left unset;
//!
//! * Process group cleanup: every child is started as a process group leader,
//! and the whole group is terminated unconditionally when the run finishes,
//! on the natural-exit path as well as on the timeout path.
//!

#[macro_use]
extern crate log;
#[macro_use]
extern crate error_chain;
extern crate libc;
extern crate nix;

use std::fs::File;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use std::os::unix::process::{CommandExt, ExitStatusExt};

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;

error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }

    foreign_links {
        Io(::std::io::Error);
        Nix(::nix::Error);
    }

    errors {
        EmptyCommand {
            description("empty command line")
        }

        SpawnFailed(command: String) {
            description("failed to spawn command")
            display("failed to spawn command: \"{}\"", command)
        }
    }
}

/// Interval between consecutive liveness polls on the supervised child.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Specify redirections of the standard streams of the supervised process.
///
/// A stream whose slot is `None` is redirected to the null device rather than
/// inherited: the supervised command must never write to the supervising
/// process' own standard streams.
pub struct ProcessRedirection {
    /// Redirected `stdin`, or `None` to read from the null device.
    pub stdin: Option<File>,

    /// Redirected `stdout`, or `None` to discard the stream.
    pub stdout: Option<File>,

    /// Redirected `stderr`, or `None` to discard the stream.
    pub stderr: Option<File>
}

impl ProcessRedirection {
    /// Create a new `ProcessRedirection` instance with every slot unset.
    fn empty() -> Self {
        ProcessRedirection {
            stdin: None,
            stdout: None,
            stderr: None
        }
    }
}

impl Default for ProcessRedirection {
    fn default() -> Self {
        ProcessRedirection::empty()
    }
}

/// Exit status of a supervised process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessExitStatus {
    /// The process exited normally with the given exit code.
    Normal(i32),

    /// The process was killed by the delivery of a signal.
    KilledBySignal(i32)
}

impl ProcessExitStatus {
    /// Whether the process exited normally with a zero exit code.
    pub fn success(&self) -> bool {
        *self == ProcessExitStatus::Normal(0)
    }
}

/// Outcome of a supervised run.
#[derive(Clone, Copy, Debug)]
pub struct RunOutcome {
    /// Exit status of the supervised process.
    pub status: ProcessExitStatus,

    /// Whether the wall-clock deadline elapsed before the process exited.
    pub timed_out: bool
}

/// Provide mechanism to run a command line under supervision.
///
/// The command line is tokenized on whitespace at spawn time and the first
/// token is executed directly; no shell is involved and no quoting is
/// supported. Command lines handed to the supervisor are built from templates
/// that are splittable by construction.
pub struct SupervisedCommand {
    /// The command line to execute.
    command: String,

    /// Redirections to be applied to the child process.
    pub redirections: ProcessRedirection,

    /// Working directory of the child process.
    pub working_dir: Option<PathBuf>,

    /// Wall-clock deadline of the run. `None` if no deadline is set.
    pub timeout: Option<Duration>
}

impl SupervisedCommand {
    /// Create a new `SupervisedCommand` instance executing the given command
    /// line.
    pub fn new<T>(command: T) -> SupervisedCommand
        where T: Into<String> {
        SupervisedCommand {
            command: command.into(),
            redirections: ProcessRedirection::empty(),
            working_dir: None,
            timeout: None
        }
    }

    /// Get the command line this instance was created with.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Run the command to completion and return its outcome.
    ///
    /// The child process is made a session leader before `exec`, so that every
    /// descendant it forks stays reachable through its process group. The
    /// supervising thread then alternates between polling the child and
    /// sleeping until either the child exits or the deadline elapses.
    /// Whichever way the loop is left, the entire process group is terminated
    /// before this function returns.
    ///
    /// A command that cannot be started at all fails with
    /// `ErrorKind::SpawnFailed`; this is distinct from the command starting
    /// and then exiting with a non-zero code, which is reported through the
    /// returned `RunOutcome`.
    pub fn run(mut self) -> Result<RunOutcome> {
        let mut tokens = self.command.split_whitespace();
        let program = match tokens.next() {
            Some(program) => program,
            None => bail!(ErrorKind::EmptyCommand)
        };

        let mut command = Command::new(program);
        command.args(tokens);
        command.stdin(stdio_or_null(self.redirections.stdin.take()));
        command.stdout(stdio_or_null(self.redirections.stdout.take()));
        command.stderr(stdio_or_null(self.redirections.stderr.take()));
        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        // Make the child a session leader so that the whole group spawned
        // beneath it can be reached with a single `killpg`.
        unsafe {
            command.pre_exec(|| {
                nix::unistd::setsid()
                    .map(|_| ())
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
            });
        }

        let mut child = command.spawn()
            .chain_err(|| ErrorKind::SpawnFailed(self.command.clone()))?;
        let pid = child.id() as i32;
        trace!("Supervised child {} started: \"{}\"", pid, self.command);

        let started = Instant::now();
        let mut timed_out = false;
        let exited = loop {
            match child.try_wait()? {
                Some(status) => break Some(status),
                None => ()
            };

            match self.timeout {
                Some(timeout) => {
                    let elapsed = started.elapsed();
                    if elapsed >= timeout {
                        timed_out = true;
                        break None;
                    }
                    std::thread::sleep(std::cmp::min(POLL_INTERVAL, timeout - elapsed));
                },
                None => std::thread::sleep(POLL_INTERVAL)
            }
        };

        // Unconditional: on the natural-exit path the group may still contain
        // descendants forked by the child.
        terminate_group(Pid::from_raw(pid));

        let status = match exited {
            Some(status) => status,
            // The group has been signalled; reap the leader.
            None => child.wait()?
        };

        trace!("Supervised child {} finished: {:?}, timed out: {}", pid, status, timed_out);

        Ok(RunOutcome {
            status: exit_status_of(&status),
            timed_out
        })
    }
}

/// Send termination signals to every process in the given process group.
///
/// The signals are sent whether or not the group still exists; signalling a
/// dead group is swallowed rather than surfaced as an error, which makes this
/// function safe to call any number of times. SIGTERM is delivered first,
/// followed by SIGKILL for processes that ignore SIGTERM.
pub fn terminate_group(group: Pid) {
    for signal in &[Signal::SIGTERM, Signal::SIGKILL] {
        match killpg(group, *signal) {
            Ok(()) => (),
            Err(e) => trace!("killpg({}, {:?}) failed: {}", group, signal, e)
        }
    }
}

/// Map an unset redirection slot to the null device.
fn stdio_or_null(file: Option<File>) -> Stdio {
    match file {
        Some(file) => Stdio::from(file),
        None => Stdio::null()
    }
}

/// Convert the native exit status of a reaped child.
fn exit_status_of(status: &std::process::ExitStatus) -> ProcessExitStatus {
    match status.code() {
        Some(code) => ProcessExitStatus::Normal(code),
        None => ProcessExitStatus::KilledBySignal(status.signal().unwrap_or(libc::SIGKILL))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    #[test]
    fn test_run_success() {
        let outcome = SupervisedCommand::new("true").run().unwrap();
        assert_eq!(outcome.status, ProcessExitStatus::Normal(0));
        assert!(!outcome.timed_out);
    }

    #[test]
    fn test_run_nonzero_exit_code() {
        let outcome = SupervisedCommand::new("false").run().unwrap();
        assert_eq!(outcome.status, ProcessExitStatus::Normal(1));
        assert!(!outcome.timed_out);
    }

    #[test]
    fn test_empty_command_line() {
        match SupervisedCommand::new("   ").run() {
            Err(Error(ErrorKind::EmptyCommand, ..)) => (),
            other => panic!("unexpected result: {:?}", other)
        }
    }

    #[test]
    fn test_spawn_failure_is_distinct_from_nonzero_exit() {
        match SupervisedCommand::new("/nonexistent/judge-test-binary --flag").run() {
            Err(Error(ErrorKind::SpawnFailed(..), ..)) => (),
            other => panic!("unexpected result: {:?}", other)
        }
    }

    #[test]
    fn test_timeout_is_a_hard_upper_bound() {
        let mut command = SupervisedCommand::new("sleep 30");
        command.timeout = Some(Duration::from_millis(300));

        let started = Instant::now();
        let outcome = command.run().unwrap();

        assert!(outcome.timed_out);
        assert!(started.elapsed() < Duration::from_millis(300) + POLL_INTERVAL + Duration::from_millis(200));
    }

    #[test]
    fn test_timeout_terminates_descendants() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("spin.sh");
        fs::write(&script, "#!/bin/sh\nsleep 30 &\necho $! > child.pid\nwait\n").unwrap();

        let mut command = SupervisedCommand::new(format!("sh {}", script.display()));
        command.working_dir = Some(dir.path().to_path_buf());
        command.timeout = Some(Duration::from_millis(500));

        let outcome = command.run().unwrap();
        assert!(outcome.timed_out);

        // Leave the kernel a moment to deliver the group-wide SIGKILL.
        std::thread::sleep(Duration::from_millis(50));

        let raw = fs::read_to_string(dir.path().join("child.pid")).unwrap();
        let descendant = Pid::from_raw(raw.trim().parse().unwrap());
        let probe = nix::sys::signal::kill(descendant, None);
        assert_eq!(probe.unwrap_err().as_errno(), Some(nix::errno::Errno::ESRCH));
    }

    #[test]
    fn test_terminate_group_is_idempotent() {
        let mut child = std::process::Command::new("true")
            .stdout(Stdio::null())
            .spawn()
            .unwrap();
        child.wait().unwrap();

        let group = Pid::from_raw(child.id() as i32);
        terminate_group(group);
        terminate_group(group);
    }
}
