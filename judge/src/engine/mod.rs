//! This module implements the core logic of the judge, or the engine's
//! logic. The judge engine sequences the compile, execute and compare phases
//! of a judge task described in an `ExecutionRequest` value and maps every
//! outcome onto a terminal `Verdict`.
//!

pub mod checkers;

use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::PathBuf;

use supervisor::{ProcessExitStatus, SupervisedCommand};

use crate::{ExecutionRequest, Result, Verdict, EXIT_FAILURE};
use crate::languages::{self, Language};
use self::checkers::Comparison;

/// Name of the capture file accumulating compiler diagnostics and program
/// output in the working directory.
const CAPTURE_FILE_NAME: &str = "stdout";

/// Configuration for a judge engine instance.
#[derive(Clone, Debug)]
pub struct JudgeEngineConfig {
    /// The directory inside which the judge task is executed and its
    /// filesystem artifacts (the capture file and, for compiled languages,
    /// the executable) are produced. `None` runs in the process working
    /// directory. Concurrent invocations must not share a directory.
    pub work_dir: Option<PathBuf>
}

impl JudgeEngineConfig {
    /// Create a new `JudgeEngineConfig` instance.
    pub fn new() -> JudgeEngineConfig {
        JudgeEngineConfig {
            work_dir: None
        }
    }
}

/// A judge engine instance.
pub struct JudgeEngine {
    /// Configuration of the judge engine.
    pub config: JudgeEngineConfig
}

impl JudgeEngine {
    /// Create a new `JudgeEngine` object.
    pub fn new() -> JudgeEngine {
        JudgeEngine {
            config: JudgeEngineConfig::new()
        }
    }

    /// Create a new `JudgeEngine` object using the given configuration.
    pub fn with_config(config: JudgeEngineConfig) -> JudgeEngine {
        JudgeEngine { config }
    }

    /// Judge the program described by the given request.
    ///
    /// The run advances linearly through resolution, compilation, execution
    /// and comparison; any failure along the way maps onto a terminal
    /// verdict, and the first classification reached wins. Every outcome of
    /// the judged program itself is `Ok(verdict)`; `Err` is reserved for
    /// failures of the judge, such as an unreadable input file.
    pub fn judge(&self, request: &ExecutionRequest) -> Result<Verdict> {
        let language = match languages::resolve(&request.source, request.language.as_deref()) {
            Ok(language) => language,
            Err(..) => {
                debug!("No language registered for {}", request.source.display());
                return Ok(Verdict::unsupported_language());
            }
        };
        trace!("Resolved language: {}", language.name);

        let executable = languages::executable_name(&request.source);

        if let Some(command) = language.compile_command(&request.source, &executable) {
            match self.run_compiler(request, command)? {
                Some(verdict) => return Ok(verdict),
                None => ()
            };
        }

        self.run_judgee(request, language, &executable)
    }

    /// Execute the compile phase. Returns `Ok(Some(verdict))` when
    /// compilation failed and the run is over, `Ok(None)` when the program
    /// compiled and the run proceeds to execution.
    fn run_compiler(&self, request: &ExecutionRequest, command: String)
        -> Result<Option<Verdict>> {
        debug!("Compiling {}...", request.source.display());

        let capture = File::create(self.capture_path())?;

        let mut compiler = SupervisedCommand::new(command);
        // Compiler diagnostics are the failure evidence: stdout and stderr
        // both go to the capture file.
        compiler.redirections.stdout = Some(capture.try_clone()?);
        compiler.redirections.stderr = Some(capture);
        compiler.working_dir = self.config.work_dir.clone();
        compiler.timeout = Some(request.timeout);

        let outcome = match compiler.run() {
            Ok(outcome) => outcome,
            Err(supervisor::Error(supervisor::ErrorKind::SpawnFailed(..), ..)) => {
                // An unavailable compiler grades the same as a failing one.
                debug!("Compiler could not be started");
                return Ok(Some(Verdict::compilation_error()));
            },
            Err(e) => return Err(e.into())
        };

        if outcome.timed_out || !outcome.status.success() {
            trace!("Compiler failed: {:?}", outcome.status);
            return Ok(Some(Verdict::compilation_error()));
        }

        Ok(None)
    }

    /// Execute the judged program against the input file and grade its
    /// captured output.
    fn run_judgee(&self, request: &ExecutionRequest, language: &Language, executable: &str)
        -> Result<Verdict> {
        debug!("Executing {}...", executable);

        let input = File::open(&request.input)?;
        let capture = if language.is_interpreted() {
            // No compile phase ran; start the capture fresh.
            File::create(self.capture_path())?
        } else {
            // Program output accumulates after the compiler diagnostics.
            OpenOptions::new().append(true).open(self.capture_path())?
        };

        let mut judgee = SupervisedCommand::new(
            language.execute_command(&request.source, executable));
        judgee.redirections.stdin = Some(input);
        judgee.redirections.stdout = Some(capture);
        // The stderr slot stays unset: program stderr is discarded so it
        // cannot contaminate the graded output.
        judgee.working_dir = self.config.work_dir.clone();
        judgee.timeout = Some(request.timeout);

        let outcome = match judgee.run() {
            Ok(outcome) => outcome,
            Err(supervisor::Error(supervisor::ErrorKind::SpawnFailed(..), ..)) => {
                debug!("Judgee could not be started");
                return Ok(Verdict::execution_error(EXIT_FAILURE));
            },
            Err(e) => return Err(e.into())
        };
        trace!("Judgee finished: {:?}, timed out: {}", outcome.status, outcome.timed_out);

        if outcome.timed_out {
            return Ok(Verdict::time_limit_exceeded());
        }

        match outcome.status {
            ProcessExitStatus::Normal(0) => (),
            ProcessExitStatus::Normal(code) =>
                return Ok(Verdict::execution_error(code)),
            // 128 + signal number, the shell convention for signal deaths.
            ProcessExitStatus::KilledBySignal(signal) =>
                return Ok(Verdict::execution_error(128 + signal))
        };

        self.grade(request)
    }

    /// Grade the captured output against the reference output.
    fn grade(&self, request: &ExecutionRequest) -> Result<Verdict> {
        let output = BufReader::new(File::open(self.capture_path())?);
        let answer = BufReader::new(File::open(&request.answer)?);

        let verdict = match checkers::compare(output, answer)? {
            Comparison::ExactMatch => Verdict::success(),
            Comparison::FormatMismatch => Verdict::wrong_formatting(),
            Comparison::WrongAnswer => Verdict::wrong_answer()
        };

        Ok(verdict)
    }

    /// Path of the capture file inside the engine's working directory.
    fn capture_path(&self) -> PathBuf {
        match self.config.work_dir {
            Some(ref dir) => dir.join(CAPTURE_FILE_NAME),
            None => PathBuf::from(CAPTURE_FILE_NAME)
        }
    }
}
