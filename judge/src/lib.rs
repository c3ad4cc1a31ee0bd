//! This crate implements the core logic of an automated judge for single
//! program submissions. Given a source file, an input file and a reference
//! output file, the judge compiles the program if its language requires it,
//! executes it against the input under a wall-clock deadline, captures its
//! output and grades the capture, producing exactly one `Verdict`.
//!

#[macro_use]
extern crate log;
#[macro_use]
extern crate error_chain;
extern crate serde;
extern crate supervisor;

pub mod engine;
pub mod languages;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Serialize, Serializer};

error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }

    links {
        Supervisor(::supervisor::Error, ::supervisor::ErrorKind);
    }

    foreign_links {
        Io(::std::io::Error);
    }

    errors {
        UnsupportedLanguage(source: String) {
            description("unable to determine language")
            display("unable to determine language for \"{}\"", source)
        }
    }
}

/// Exit status of the judge process on the success path.
pub const EXIT_SUCCESS: i32 = 0;

/// Exit status of the judge process on every failure path, except execution
/// errors that propagate the judged program's own exit code.
pub const EXIT_FAILURE: i32 = 1;

/// The default wall-clock deadline applied to judged programs.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Describe a single judge invocation: which program to judge, which data to
/// judge it against and under which deadline.
///
/// Values of this type are constructed once from external input and stay
/// immutable for the lifetime of the run.
#[derive(Clone, Debug)]
pub struct ExecutionRequest {
    /// Path to the source file of the judged program.
    pub source: PathBuf,

    /// Path to the file fed to the judged program on its standard input.
    pub input: PathBuf,

    /// Path to the reference output file the captured output is graded
    /// against.
    pub answer: PathBuf,

    /// Wall-clock deadline applied to each supervised phase of the run.
    pub timeout: Duration,

    /// Explicit language name overriding extension based resolution, if any.
    pub language: Option<String>
}

impl ExecutionRequest {
    /// Create a new `ExecutionRequest` instance with the default timeout and
    /// no explicit language hint.
    pub fn new<T1, T2, T3>(source: T1, input: T2, answer: T3) -> ExecutionRequest
        where T1: Into<PathBuf>, T2: Into<PathBuf>, T3: Into<PathBuf> {
        ExecutionRequest {
            source: source.into(),
            input: input.into(),
            answer: answer.into(),
            timeout: DEFAULT_TIMEOUT,
            language: None
        }
    }
}

/// Numeric score code carried by every verdict.
///
/// The discriminants form the closed set 1 through 6 consumed by the grading
/// pipeline; they serialize as their numeric value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Score {
    CompilerError = 1,
    TimeLimitExceeded = 2,
    ExecutionError = 3,
    WrongAnswer = 4,
    WrongFormatting = 5,
    ProgramSuccess = 6
}

impl Serialize for Score {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
        where S: Serializer {
        serializer.serialize_u8(*self as u8)
    }
}

/// The terminal classification of a judged run.
///
/// Exactly one verdict is produced per invocation. Serializing a verdict
/// yields the judge's result object with its `result` and `score` keys; the
/// exit code travels out of band as the judge process' own exit status.
#[derive(Clone, Debug, Serialize)]
pub struct Verdict {
    /// Human readable result message.
    pub result: String,

    /// Numeric score code.
    pub score: Score,

    /// Exit status the judge process terminates with.
    #[serde(skip)]
    pub exit_code: i32
}

impl Verdict {
    /// Create a new `Verdict` instance.
    fn new<T>(result: T, score: Score, exit_code: i32) -> Verdict
        where T: Into<String> {
        Verdict {
            result: result.into(),
            score,
            exit_code
        }
    }

    /// The source file matched no registry entry.
    pub fn unsupported_language() -> Verdict {
        Verdict::new("Unable to determine language", Score::CompilerError, EXIT_FAILURE)
    }

    /// The compile command failed.
    pub fn compilation_error() -> Verdict {
        Verdict::new("Compilation Error", Score::CompilerError, EXIT_FAILURE)
    }

    /// The judged program could not be started, or exited abnormally. The
    /// given exit code is propagated verbatim as the judge's own exit status.
    pub fn execution_error(exit_code: i32) -> Verdict {
        Verdict::new("Execution Error", Score::ExecutionError, exit_code)
    }

    /// The judged program outlived its wall-clock deadline.
    pub fn time_limit_exceeded() -> Verdict {
        Verdict::new("Time Limit Exceeded", Score::TimeLimitExceeded, EXIT_FAILURE)
    }

    /// The captured output differs from the reference output in content.
    pub fn wrong_answer() -> Verdict {
        Verdict::new("Wrong Answer", Score::WrongAnswer, EXIT_FAILURE)
    }

    /// The captured output matches the reference output only after
    /// normalization.
    pub fn wrong_formatting() -> Verdict {
        Verdict::new("Output Format Error", Score::WrongFormatting, EXIT_FAILURE)
    }

    /// The captured output matches the reference output exactly.
    pub fn success() -> Verdict {
        Verdict::new("Success", Score::ProgramSuccess, EXIT_SUCCESS)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_codes_form_the_closed_set() {
        assert_eq!(Score::CompilerError as u8, 1);
        assert_eq!(Score::TimeLimitExceeded as u8, 2);
        assert_eq!(Score::ExecutionError as u8, 3);
        assert_eq!(Score::WrongAnswer as u8, 4);
        assert_eq!(Score::WrongFormatting as u8, 5);
        assert_eq!(Score::ProgramSuccess as u8, 6);
    }

    #[test]
    fn test_verdict_serializes_to_the_result_object() {
        let json = serde_json::to_value(&Verdict::success()).unwrap();
        assert_eq!(json, serde_json::json!({"result": "Success", "score": 6}));

        let json = serde_json::to_value(&Verdict::compilation_error()).unwrap();
        assert_eq!(json, serde_json::json!({"result": "Compilation Error", "score": 1}));
    }

    #[test]
    fn test_execution_error_propagates_the_exit_code() {
        let verdict = Verdict::execution_error(42);
        assert_eq!(verdict.exit_code, 42);
        assert_eq!(verdict.score, Score::ExecutionError);
    }
}
