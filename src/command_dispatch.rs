//! Purpose: Hold top-level CLI command dispatch for `echoact`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Command behavior, output envelopes, and exit code semantics stay unchanged.
//! Invariants: Environment reads happen here, never inside the core transform.

use super::*;

const BUILD_STAMP_ENV: &str = "REFRESHED_AT";

pub(super) fn dispatch_command(command: Command) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "echoact", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output();
            Ok(RunOutcome::ok())
        }
        Command::Echo {
            params,
            file,
            stamped,
        } => {
            let raw = read_params_input(params, file)?;
            let mut map = parse_params(&raw)?;
            apply_param_default(&mut map);
            if stamped {
                let stamp = RuntimeStamp::current(std::env::var(BUILD_STAMP_ENV).ok());
                println!(
                    "echoact {} ({})",
                    env!("CARGO_PKG_VERSION"),
                    stamp.action_version()
                );
                annotate(&mut map, &stamp);
            }
            emit_json(echo(map));
            Ok(RunOutcome::ok())
        }
        Command::Serve {
            bind,
            max_body_bytes,
        } => {
            let bind: SocketAddr = bind.parse().map_err(|_| {
                Error::new(ErrorKind::Usage)
                    .with_message("invalid bind address")
                    .with_hint("Use a host:port value like 0.0.0.0:8080.")
            })?;
            let config = serve::ServeConfig {
                bind,
                max_body_bytes,
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))?;
            Ok(RunOutcome::ok())
        }
        Command::Call { url, params, init } => {
            let client = ActionClient::new(&url)?;
            if init {
                client.init()?;
                if params.is_none() {
                    emit_json(json!({ "ok": true }));
                    return Ok(RunOutcome::ok());
                }
            }
            let raw = params.ok_or_else(|| {
                Error::new(ErrorKind::Usage)
                    .with_message("call requires a JSON payload unless --init is set")
                    .with_hint("Pass inline JSON like '{\"a\": 1}' or use --init.")
            })?;
            let value = parse_value(&raw)?;
            let reply = client.run(&value)?;
            emit_json(reply);
            Ok(RunOutcome::ok())
        }
    }
}

fn read_params_input(params: Option<String>, file: Option<String>) -> Result<String, Error> {
    if let Some(raw) = params {
        return Ok(raw);
    }
    let Some(file) = file else {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("echo requires inline JSON or --file")
            .with_hint("Pass '{\"myparam\": \"value\"}' or --file params.json (use - for stdin)."));
    };
    if file == "-" {
        let mut raw = String::new();
        io::stdin().read_to_string(&mut raw).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read stdin")
                .with_source(err)
        })?;
        Ok(raw)
    } else {
        std::fs::read_to_string(&file).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read params file")
                .with_hint("Check the path, or use - to read from stdin.")
                .with_source(err)
        })
    }
}
