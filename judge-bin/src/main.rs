#[macro_use]
extern crate error_chain;
extern crate clap;
extern crate serde_json;
extern crate stderrlog;
extern crate judge;

use std::str::FromStr;
use std::time::Duration;

use error_chain::ChainedError;

use judge::engine::JudgeEngine;
use judge::{ExecutionRequest, EXIT_FAILURE};


error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }

    links {
        Judge(::judge::Error, ::judge::ErrorKind);
    }

    foreign_links {
        Json(::serde_json::Error);
    }
}


fn get_arg_matches() -> clap::ArgMatches<'static> {
    clap::App::new("judge-bin")
        .version("0.1.0")
        .about("Compiles, executes and grades a single program submission.")
        .arg(clap::Arg::with_name("timeout")
            .short("t")
            .takes_value(true)
            .value_name("SECONDS")
            .default_value("30")
            .help("timeout duration before killing the judged program"))
        .arg(clap::Arg::with_name("verbose")
            .short("v")
            .help("display verbose debugging output"))
        .arg(clap::Arg::with_name("source")
            .required(true)
            .takes_value(true)
            .value_name("SOURCE")
            .help("path to the source file of the program to be judged"))
        .arg(clap::Arg::with_name("input")
            .required(true)
            .takes_value(true)
            .value_name("INPUT")
            .help("path to the file fed to the program on standard input"))
        .arg(clap::Arg::with_name("output")
            .required(true)
            .takes_value(true)
            .value_name("OUTPUT")
            .help("path to the reference output file"))
        .get_matches()
}

fn do_main() -> Result<i32> {
    let matches = get_arg_matches();

    // Logging goes to stderr only; stdout is reserved for the verdict
    // object.
    stderrlog::new()
        .verbosity(if matches.is_present("verbose") { 3 } else { 2 })
        .timestamp(stderrlog::Timestamp::Second)
        .init()
        .expect("failed to initialize the logger.");

    let timeout_value = matches.value_of("timeout").unwrap();
    let timeout = u64::from_str(timeout_value)
        .chain_err(|| Error::from(format!("invalid timeout value: {}", timeout_value)))
        ?;

    let mut request = ExecutionRequest::new(
        matches.value_of("source").unwrap(),
        matches.value_of("input").unwrap(),
        matches.value_of("output").unwrap());
    request.timeout = Duration::from_secs(timeout);

    let verdict = JudgeEngine::new().judge(&request)?;
    println!("{}", serde_json::to_string(&verdict)?);

    Ok(verdict.exit_code)
}

fn main() {
    match do_main() {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            eprintln!("error: {}", e.display_chain().to_string());
            std::process::exit(EXIT_FAILURE);
        }
    }
}
