//! Purpose: Provide a blocking HTTP client for the echoact action endpoints.
//! Exports: `ActionClient`.
//! Role: Transport wrapper used by the `call` command and integration tests.
//! Invariants: Request/response envelopes align with the routes in `serve`.
//! Invariants: Server-reported errors surface as `ErrorKind::Remote`; transport
//! failures surface as `ErrorKind::Io`.
#![allow(clippy::result_large_err)]

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::core::error::{Error, ErrorKind};

type ApiResult<T> = Result<T, Error>;

#[derive(Debug)]
pub struct ActionClient {
    base_url: Url,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(default)]
    hint: Option<String>,
}

impl ActionClient {
    pub fn new(base_url: impl AsRef<str>) -> ApiResult<Self> {
        let base_url = Url::parse(base_url.as_ref()).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("invalid server url")
                .with_hint("Use a base URL like http://127.0.0.1:8080.")
                .with_source(err)
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("server url must use http or https scheme")
                .with_url(base_url.to_string()));
        }
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build();
        Ok(Self { base_url, agent })
    }

    /// Send the no-op activation hook. Any 2xx response counts as success.
    pub fn init(&self) -> ApiResult<()> {
        let url = self.endpoint("init")?;
        let response = self.agent.request_url("POST", &url).send_string("");
        match response {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(code, resp)) => Err(decode_error_response(code, resp, &url)),
            Err(ureq::Error::Transport(err)) => Err(transport_error(err, &url)),
        }
    }

    /// Invoke the action with a JSON payload and return the echoed value.
    pub fn run(&self, params: &Value) -> ApiResult<Value> {
        let url = self.endpoint("run")?;
        let payload = serde_json::to_string(params).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode request json")
                .with_source(err)
        })?;
        let response = self
            .agent
            .request_url("POST", &url)
            .set("Accept", "application/json")
            .set("Content-Type", "application/json")
            .send_string(&payload);
        match response {
            Ok(resp) => read_json_response(resp, &url),
            Err(ureq::Error::Status(code, resp)) => Err(decode_error_response(code, resp, &url)),
            Err(ureq::Error::Transport(err)) => Err(transport_error(err, &url)),
        }
    }

    /// Fetch the liveness probe payload.
    pub fn health(&self) -> ApiResult<Value> {
        let url = self.endpoint("healthz")?;
        let response = self
            .agent
            .request_url("GET", &url)
            .set("Accept", "application/json")
            .call();
        match response {
            Ok(resp) => read_json_response(resp, &url),
            Err(ureq::Error::Status(code, resp)) => Err(decode_error_response(code, resp, &url)),
            Err(ureq::Error::Transport(err)) => Err(transport_error(err, &url)),
        }
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                Error::new(ErrorKind::Usage)
                    .with_message("server url cannot be a base")
                    .with_url(self.base_url.to_string())
            })?
            .pop_if_empty()
            .push(path);
        Ok(url)
    }
}

fn read_json_response(response: ureq::Response, url: &Url) -> ApiResult<Value> {
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_url(url.to_string())
            .with_source(err)
    })?;
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::Remote)
            .with_message("server returned invalid JSON")
            .with_url(url.to_string())
            .with_source(err)
    })
}

fn decode_error_response(code: u16, response: ureq::Response, url: &Url) -> Error {
    let body = response.into_string().unwrap_or_default();
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => {
            let mut err = Error::new(ErrorKind::Remote)
                .with_message(format!(
                    "server error ({}): {}",
                    envelope.error.kind, envelope.error.message
                ))
                .with_url(url.to_string());
            if let Some(hint) = envelope.error.hint {
                err = err.with_hint(hint);
            }
            err
        }
        Err(_) => Error::new(ErrorKind::Remote)
            .with_message(format!("server returned status {code}"))
            .with_url(url.to_string()),
    }
}

fn transport_error(err: ureq::Transport, url: &Url) -> Error {
    Error::new(ErrorKind::Io)
        .with_message("request failed")
        .with_url(url.to_string())
        .with_source(err)
}
