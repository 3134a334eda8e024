#![forbid(unsafe_code)]

//! Command-line argument parsing for the walkthrough demo.
//!
//! Parses args manually. Supports environment variable overrides via the
//! `STU_DEMO_*` prefix; explicit flags win over the environment.

use std::env;
use std::fmt;
use std::process;

use crate::script::{self, Action, ScriptError};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
Stu Walkthrough Demo: replay input against the product walkthrough

USAGE:
    stu-walkthrough-demo [OPTIONS]

OPTIONS:
    --step=ID            Open the walkthrough at step ID (URL ?step=ID)
    --source=NAME        Attribution source (URL ?source=NAME)
    --script=ACTIONS     Actions to replay, separated by spaces or ';'
    --jsonl              Print analytics as JSON lines instead of an array
    --no-session         Do not stamp events with a session id
    --help, -h           Show this help message
    --version, -V        Show version

ACTIONS:
    next, back, goto:N, next-note, prev-note, key:left, key:right,
    key:right@input, drag:DX,DY, reset, exit, sync

ENVIRONMENT VARIABLES:
    STU_DEMO_STEP             Override --step
    STU_DEMO_SOURCE           Override --source
    STU_DEMO_SCRIPT           Override --script
    STU_DEMO_JSONL            Set to 1 for --jsonl
    STU_WALKTHROUGH_*         Walkthrough configuration (step param, exit route, ...)
    RUST_LOG                  Log filter (logs go to stderr)";

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opts {
    /// Initial `step` query value.
    pub step: Option<String>,
    /// Initial `source` query value.
    pub source: Option<String>,
    /// Actions replayed after mount.
    pub script: Vec<Action>,
    /// Emit analytics as JSON lines.
    pub jsonl: bool,
    /// Stamp events with a session id.
    pub session: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            step: None,
            source: None,
            script: Vec::new(),
            jsonl: false,
            session: true,
        }
    }
}

/// What the binary should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(Opts),
    Help,
    Version,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    UnknownArgument(String),
    EmptyValue(&'static str),
    Script(ScriptError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownArgument(arg) => write!(f, "Unknown argument: {arg}"),
            Self::EmptyValue(flag) => write!(f, "Empty value for {flag}"),
            Self::Script(err) => write!(f, "Invalid script: {err}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Script(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ScriptError> for CliError {
    fn from(err: ScriptError) -> Self {
        Self::Script(err)
    }
}

impl Opts {
    /// Parse process arguments and environment; prints help/version or the
    /// error and exits where appropriate.
    pub fn parse() -> Self {
        let args: Vec<String> = env::args().skip(1).collect();
        match Self::parse_from(&args, |key| env::var(key).ok()) {
            Ok(Command::Run(opts)) => opts,
            Ok(Command::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Ok(Command::Version) => {
                println!("stu-walkthrough-demo {VERSION}");
                process::exit(0);
            }
            Err(err) => {
                eprintln!("{err}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    pub fn parse_from(
        args: &[String],
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Command, CliError> {
        let mut opts = Self::default();
        let mut script_text = None;

        // Environment first
        if let Some(val) = lookup("STU_DEMO_STEP").filter(|v| !v.is_empty()) {
            opts.step = Some(val);
        }
        if let Some(val) = lookup("STU_DEMO_SOURCE").filter(|v| !v.is_empty()) {
            opts.source = Some(val);
        }
        if let Some(val) = lookup("STU_DEMO_SCRIPT") {
            script_text = Some(val);
        }
        if let Some(val) = lookup("STU_DEMO_JSONL") {
            opts.jsonl = matches!(val.trim(), "1" | "true" | "yes" | "on");
        }

        for arg in args {
            match arg.as_str() {
                "--help" | "-h" => return Ok(Command::Help),
                "--version" | "-V" => return Ok(Command::Version),
                "--jsonl" => opts.jsonl = true,
                "--no-session" => opts.session = false,
                other => {
                    if let Some(val) = other.strip_prefix("--step=") {
                        opts.step = Some(non_empty(val, "--step")?);
                    } else if let Some(val) = other.strip_prefix("--source=") {
                        opts.source = Some(non_empty(val, "--source")?);
                    } else if let Some(val) = other.strip_prefix("--script=") {
                        script_text = Some(val.to_string());
                    } else {
                        return Err(CliError::UnknownArgument(other.to_string()));
                    }
                }
            }
        }

        if let Some(text) = script_text {
            opts.script = script::parse(&text)?;
        }
        Ok(Command::Run(opts))
    }
}

fn non_empty(val: &str, flag: &'static str) -> Result<String, CliError> {
    if val.is_empty() {
        Err(CliError::EmptyValue(flag))
    } else {
        Ok(val.to_string())
    }
}
