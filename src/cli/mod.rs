// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line interface code. More specific options for `hyperflag`
//! subcommands are contained in modules.
//!
//! Only 3 things should be public in this module: `Hyperflag`,
//! `Hyperflag::run`, and `HyperflagError`.

mod combine;
mod convert;
mod error;
mod info;
mod or;
mod select;

pub use error::HyperflagError;

use std::path::PathBuf;

use clap::{AppSettings, Args, Parser, Subcommand};
use log::info;

use crate::{flags::FlagSet, io::expand_inputs};
use error::CliArgsError;

// Add build-time information from the "built" crate.
include!(concat!(env!("OUT_DIR"), "/built.rs"));

#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    about = r#"Flag and metric annotations for Murchison Widefield Array (MWA) radio telescope data
Source:        https://github.com/MWATelescope/mwa_hyperflag"#
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_subcommands = true)]
#[clap(propagate_version = true)]
#[clap(infer_long_args = true)]
pub struct Hyperflag {
    #[clap(flatten)]
    global_opts: GlobalArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    #[clap(global = true)]
    verbosity: u8,

    /// Only verify that arguments were correctly ingested and print out
    /// high-level information; nothing is written.
    #[clap(long)]
    #[clap(global = true)]
    dry_run: bool,
}

#[derive(Debug, Subcommand)]
#[clap(arg_required_else_help = true)]
enum Command {
    #[clap(about = "Print information on flag files.")]
    Info(info::InfoArgs),

    #[clap(about = r#"Convert a flag file to another type or mode, e.g. to a waterfall or to flags.
Conversions happen in the order: waterfall, polarisation collapse, mode."#)]
    Convert(convert::ConvertArgs),

    #[clap(alias = "add")]
    #[clap(about = "Combine flag files along an axis, or combine their metrics.")]
    Combine(combine::CombineArgs),

    #[clap(about = "Select a subset of a flag file.")]
    Select(select::SelectArgs),

    #[clap(about = "Logically OR the flags of flag files with the same shape.")]
    Or(or::OrArgs),
}

impl Hyperflag {
    pub fn run(self) -> Result<(), HyperflagError> {
        // Set up logging.
        let GlobalArgs { verbosity, dry_run } = self.global_opts;
        setup_logging(verbosity)
            .map_err(|e| HyperflagError::Generic(format!("Failed to initialise logging: {e}")))?;

        // Print the version of hyperflag and its build-time information.
        let sub_command = match &self.command {
            Command::Info(_) => "info",
            Command::Convert(_) => "convert",
            Command::Combine(_) => "combine",
            Command::Select(_) => "select",
            Command::Or(_) => "or",
        };
        info!("hyperflag {} {}", sub_command, env!("CARGO_PKG_VERSION"));
        display_build_info();

        match self.command {
            Command::Info(args) => args.run()?,
            Command::Convert(args) => args.run(dry_run)?,
            Command::Combine(args) => args.run(dry_run)?,
            Command::Select(args) => args.run(dry_run)?,
            Command::Or(args) => args.run(dry_run)?,
        }

        info!("hyperflag {} complete.", sub_command);
        Ok(())
    }
}

/// Read exactly one flag file, which may be given as a glob.
fn read_single_input(input: &str) -> Result<FlagSet, HyperflagError> {
    let files = expand_inputs(&[input])?;
    if files.len() > 1 {
        return Err(CliArgsError::MoreThanOneInput(files.len()).into());
    }
    Ok(FlagSet::read(files.first())?)
}

/// Expand the inputs (which may be globs), demanding a minimum number of
/// files.
fn expand_at_least(inputs: &[String], expected: usize) -> Result<vec1::Vec1<PathBuf>, HyperflagError> {
    let files = expand_inputs(inputs)?;
    if files.len() < expected {
        return Err(CliArgsError::TooFewInputs {
            expected,
            got: files.len(),
        }
        .into());
    }
    Ok(files)
}

/// Write a flag object, unless this is a dry run.
fn write_output(
    flags: &mut FlagSet,
    output: &std::path::Path,
    clobber: bool,
    dry_run: bool,
) -> Result<(), HyperflagError> {
    if dry_run {
        info!("Dry run; not writing {}", output.display());
        return Ok(());
    }
    flags.write(output, clobber)?;
    info!("Wrote {}", output.display());
    Ok(())
}

/// Activate a logger. All log messages are put onto `stdout`. `env_logger`
/// automatically only uses colours and fancy symbols if we're on a tty (e.g. a
/// terminal); piped output will be formatted sensibly. Source code lines are
/// displayed in log messages when verbosity >= 3.
fn setup_logging(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.try_init()
}

/// Write many info-level log lines of how this executable was compiled.
fn display_build_info() {
    let dirty = match GIT_DIRTY {
        Some(true) => " (dirty)",
        _ => "",
    };
    match GIT_COMMIT_HASH_SHORT {
        Some(hash) => {
            info!("Compiled on git commit hash: {hash}{dirty}");
        }
        None => info!("Compiled on git commit hash: <no git info>"),
    }
    if let Some(hr) = GIT_HEAD_REF {
        info!("            git head ref: {}", hr);
    }
    info!("            {}", BUILT_TIME_UTC);
    info!("         with compiler {}", RUSTC_VERSION);
    info!("");
}
