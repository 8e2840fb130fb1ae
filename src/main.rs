//! Purpose: `echoact` CLI entry point and command definitions.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit stable stdout formats (compact JSON on pipes).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::io::{self, IsTerminal, Read};
use std::net::SocketAddr;

use clap::{CommandFactory, Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};

mod command_dispatch;
mod serve;

use echoact::api::{
    ActionClient, Error, ErrorKind, RuntimeStamp, annotate, apply_param_default, echo,
    parse_params, parse_value, to_exit_code,
};

const DEFAULT_MAX_BODY_BYTES: u64 = 1024 * 1024;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint(clap_error_hint(&err)));
            }
        },
    };

    command_dispatch::dispatch_command(cli.command)
        .map_err(add_parse_hint)
        .map_err(add_io_hint)
        .map_err(add_internal_hint)
}

#[derive(Parser)]
#[command(
    name = "echoact",
    version,
    about = "JSON parameter-echo action over CLI and HTTP",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"The action accepts a JSON object, guarantees the `myparam` key is present
(defaulted to "myparam default" when absent), and echoes the object back.

Mental model:
  - `echo` runs the action locally (stdout JSON)
  - `serve` hosts the action over HTTP (/init, /run)
  - `call` invokes a hosted action
"#,
    after_help = r#"EXAMPLES
  $ echoact echo '{"greeting": "hi"}'
  # {"allparams":{"greeting":"hi","myparam":"myparam default"}}
  $ echoact serve                          # Terminal 1: host on 0.0.0.0:8080
  $ echoact call http://127.0.0.1:8080 '{"a": 1}'   # Terminal 2: invoke

LEARN MORE
  $ echoact <command> --help"#,
    arg_required_else_help = true,
    disable_help_subcommand = false
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        arg_required_else_help = true,
        about = "Run the echo action on a JSON params object",
        long_about = r#"Parse a JSON object, apply the `myparam` default, and print the result.

Input comes from an inline argument, a file (-f/--file), or stdin (--file -)."#,
        after_help = r#"EXAMPLES
  $ echoact echo '{"greeting": "hi"}'
  $ echoact echo '{"myparam": 7}'                  # stringified to "7"
  $ echoact echo --stamped '{}'                    # runtime + build stamp fields
  $ cat params.json | echoact echo --file -

NOTES
  - The params must be a single JSON object.
  - `--stamped` reads the REFRESHED_AT environment variable as the build stamp
    and prints one informational line before the JSON payload."#
    )]
    Echo {
        #[arg(help = "Inline JSON object with the action parameters")]
        params: Option<String>,
        #[arg(
            short = 'f',
            long = "file",
            help = "Read the params JSON from a file (use - for stdin)",
            conflicts_with = "params",
            value_hint = ValueHint::FilePath
        )]
        file: Option<String>,
        #[arg(
            long,
            help = "Annotate the output with runtime version and build stamp fields"
        )]
        stamped: bool,
    },
    #[command(
        about = "Host the action over HTTP",
        long_about = r#"Serve the action activation protocol:

  POST /init     no-op activation hook (empty 200)
  POST /run      echo the JSON request body back (200)
  GET  /healthz  liveness probe"#,
        after_help = r#"EXAMPLES
  $ echoact serve
  $ echoact serve --bind 127.0.0.1:9080
  $ curl -s -X POST localhost:8080/run -d '{"a": 1}'

NOTES
  - Binds all interfaces on port 8080 by default.
  - /run parses the body as JSON even without a content type.
  - Set RUST_LOG to adjust request tracing (default: info)."#
    )]
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080", help = "Bind address")]
        bind: String,
        #[arg(
            long,
            default_value_t = DEFAULT_MAX_BODY_BYTES,
            help = "Max request body size in bytes"
        )]
        max_body_bytes: u64,
    },
    #[command(
        arg_required_else_help = true,
        about = "Invoke a hosted action over HTTP",
        after_help = r#"EXAMPLES
  $ echoact call http://127.0.0.1:8080 '{"a": 1}'
  $ echoact call --init http://127.0.0.1:8080

NOTES
  - With --init and no payload, only the activation hook is sent."#
    )]
    Call {
        #[arg(help = "Base URL of a running echoact server, e.g. http://127.0.0.1:8080")]
        url: String,
        #[arg(help = "Inline JSON payload for /run")]
        params: Option<String>,
        #[arg(long, help = "Send the /init activation hook before invoking")]
        init: bool,
    },
    #[command(
        about = "Print version info as JSON",
        long_about = r#"Emit version info as JSON (stable, machine-readable)."#,
        after_help = r#"EXAMPLES
  $ echoact version"#
    )]
    Version,
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        long_about = r#"Generate shell completion scripts.

Prints a completion script for the given shell to stdout."#,
        after_help = r#"EXAMPLES
  $ echoact completion bash > ~/.local/share/bash-completion/completions/echoact
  $ echoact completion zsh > ~/.zfunc/_echoact"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let usage = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .map(str::trim);

    let Some(usage) = usage else {
        return "Try `echoact --help`.".to_string();
    };

    let tokens: Vec<&str> = usage.split_whitespace().collect();
    let Some(pos) = tokens.iter().position(|t| *t == "echoact") else {
        return "Try `echoact --help`.".to_string();
    };

    let mut parts = Vec::new();
    for token in tokens.iter().skip(pos + 1) {
        if token.starts_with('-') || token.starts_with('<') || token.starts_with('[') {
            break;
        }
        parts.push(*token);
    }

    if parts.is_empty() {
        return "Try `echoact --help`.".to_string();
    }

    format!("Try `echoact {} --help`.", parts.join(" "))
}

fn add_parse_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Parse || err.hint().is_some() {
        return err;
    }
    err.with_hint("Params must be a single valid JSON value, e.g. '{\"myparam\": \"value\"}'.")
}

fn add_io_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Io || err.hint().is_some() {
        return err;
    }
    err.with_hint("Check the address, file paths, and that the server is reachable.")
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Unexpected internal failure. Retry with RUST_BACKTRACE=1 and share command/context if it persists.",
    )
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
            .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
    } else {
        serde_json::to_string(&value)
            .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
    };
    println!("{json}");
}

fn emit_version_output() {
    if io::stdout().is_terminal() {
        println!("echoact {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(json!({
            "name": "echoact",
            "version": env!("CARGO_PKG_VERSION"),
        }));
    }
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    err.message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{:?} error", err.kind()))
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut source = StdError::source(err);
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(url) = err.url() {
        inner.insert("url".to_string(), json!(url));
    }
    if let Some(line) = err.line() {
        inner.insert("line".to_string(), json!(line));
    }
    if let Some(column) = err.column() {
        inner.insert("column".to_string(), json!(column));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = Vec::new();
    lines.push(format!("error: {}", error_message(err)));

    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(url) = err.url() {
        lines.push(format!("url: {url}"));
    }
    if let (Some(line), Some(column)) = (err.line(), err.column()) {
        lines.push(format!("at: line {line}, column {column}"));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!("caused by: {cause}"));
    }

    lines.join("\n")
}
