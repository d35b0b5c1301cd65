#![allow(dead_code)]

mod errors;
mod eval;
mod exec;
mod interp;
mod label;
mod lexer;
mod numfmt;
mod stack;
mod token;
mod util;
mod vars;

use std::fs;
use std::io::{self, stdout};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;

use interp::Interpreter;

/// Hard cap on source size, matching the original loader's fixed input
/// buffer.
const MAX_SOURCE_BYTES: usize = 20 * 1024;

#[derive(Parser, Debug)]
#[command(name = "tbasic", about = "Runs a BASIC program")]
struct Cli {
    /// Program source file.
    ///
    /// Optional at the `clap` layer so a missing argument is reported
    /// through the same "Usage: tbasic <file_name>" path as any other
    /// file error, with exit code 1, instead of clap's own usage-error
    /// exit code.
    file_name: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match run() {
        Ok(aborted) => {
            if aborted {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            eprintln!("tbasic: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Runs the program at the given path, returning whether it aborted on
/// the error threshold. Exit status reflects abort-vs-normal-completion
/// only, not whether any individual error was reported along the way.
fn run() -> Result<bool> {
    let cli = Cli::parse();

    let Some(file_name) = cli.file_name else {
        bail!("Usage: tbasic <file_name>");
    };

    let raw = fs::read_to_string(&file_name)
        .with_context(|| format!("Usage: tbasic <file_name>\ncould not read {file_name:?}"))?;
    let source = raw.replace('\r', "");

    if source.len() > MAX_SOURCE_BYTES {
        bail!(
            "{file_name:?} is {} bytes, exceeding the {MAX_SOURCE_BYTES}-byte source cap",
            source.len()
        );
    }

    let stdin = io::stdin().lock();
    let mut interp = Interpreter::new(&source, stdout().lock(), stdin);
    interp.run();
    Ok(interp.aborted())
}
