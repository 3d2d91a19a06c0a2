//! `telebugs-mcp serve`: line-delimited JSON over stdin/stdout.
//!
//! Requests:
//!
//! ```text
//! {"id": 1, "op": "open",  "api_key": "..."}
//! {"id": 2, "op": "call",  "session": "...", "tool": "list_projects", "params": {}}
//! {"id": 3, "op": "close", "session": "..."}
//! ```
//!
//! Every reply echoes `id` and carries either `result` or
//! `failure {code, message}`. A tool rejection is a `result`; failures are
//! reserved for transport-level problems.

use crate::session::SessionRegistry;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value as Json, json};
use std::io::{self, BufRead, Write};
use telebugs_core::tools::{self, Tool};
use telebugs_core::{Store, StoreError, access};
use tracing::{debug, error, info};

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum Request {
    Open {
        api_key: String,
    },
    Call {
        session: String,
        tool: String,
        #[serde(default)]
        params: Json,
    },
    Close {
        session: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCode {
    Unauthenticated,
    InvalidSession,
    BadRequest,
    StorageFault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub code: FailureCode,
    pub message: String,
}

impl Failure {
    fn new(code: FailureCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn storage(err: &StoreError) -> Self {
        error!(%err, "storage fault");
        Self::new(FailureCode::StorageFault, err.to_string())
    }
}

#[derive(Debug, Serialize)]
struct Response {
    id: Json,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Json>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<Failure>,
}

impl Response {
    fn new(id: Json, outcome: Result<Json, Failure>) -> Self {
        match outcome {
            Ok(result) => Self {
                id,
                result: Some(result),
                failure: None,
            },
            Err(failure) => Self {
                id,
                result: None,
                failure: Some(failure),
            },
        }
    }
}

fn handle(store: &Store, registry: &mut SessionRegistry, request: Request) -> Result<Json, Failure> {
    match request {
        Request::Open { api_key } => {
            let ctx = access::resolve(store, &api_key)
                .map_err(|err| Failure::storage(&err))?
                .ok_or_else(|| Failure::new(FailureCode::Unauthenticated, "invalid API key"))?;
            let user_id = ctx.user_id();
            let projects = ctx.projects.ids();
            let session = registry.open(ctx);
            Ok(json!({ "session": session, "user_id": user_id, "projects": projects }))
        }
        Request::Call {
            session,
            tool,
            params,
        } => {
            let ctx = registry.get(&session).ok_or_else(|| {
                Failure::new(FailureCode::InvalidSession, "unknown or closed session")
            })?;
            let tool = tool
                .parse::<Tool>()
                .map_err(|err| Failure::new(FailureCode::BadRequest, err.to_string()))?;
            tools::call(store, ctx, tool, params).map_err(|err| Failure::storage(&err))
        }
        Request::Close { session } => {
            if registry.close(&session) {
                Ok(json!({ "closed": true }))
            } else {
                Err(Failure::new(
                    FailureCode::InvalidSession,
                    "unknown or closed session",
                ))
            }
        }
    }
}

fn handle_line(store: &Store, registry: &mut SessionRegistry, line: &str) -> Response {
    let value: Json = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(err) => {
            let failure = Failure::new(FailureCode::BadRequest, format!("malformed JSON: {err}"));
            return Response::new(Json::Null, Err(failure));
        }
    };
    let id = value.get("id").cloned().unwrap_or(Json::Null);

    let outcome = serde_json::from_value::<Request>(value)
        .map_err(|err| Failure::new(FailureCode::BadRequest, format!("invalid request: {err}")))
        .and_then(|request| handle(store, registry, request));
    Response::new(id, outcome)
}

/// Answer requests from `reader` until EOF. Sessions die with the loop.
pub fn serve<R: BufRead, W: Write>(store: &Store, reader: R, mut writer: W) -> Result<()> {
    let mut registry = SessionRegistry::new();
    let mut handled = 0u64;

    for line in reader.lines() {
        let line = line.context("failed to read request")?;
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(store, &mut registry, &line);
        debug!(failed = response.failure.is_some(), "request handled");
        serde_json::to_writer(&mut writer, &response).context("failed to write response")?;
        writeln!(writer)?;
        writer.flush()?;
        handled += 1;
    }

    info!(handled, open_sessions = registry.len(), "input closed");
    Ok(())
}

pub fn run_serve(store: &Store) -> Result<()> {
    info!("serving line-delimited JSON on stdin/stdout");
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve(store, stdin.lock(), stdout.lock())
}
