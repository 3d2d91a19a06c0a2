//! `telebugs-mcp call`: run one tool for one principal and print the reply.
//!
//! A rejection is still a reply: it is printed and the exit code is zero.
//! Missing or unknown credentials and storage faults exit non-zero.

use crate::credentials;
use crate::output::{CliError, OutputMode, render, render_error};
use anyhow::Result;
use clap::Args;
use serde_json::Value as Json;
use telebugs_core::tools::{self, Tool};
use telebugs_core::{Store, access};
use tracing::debug;

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Tool name, see `telebugs-mcp tools`.
    pub tool: String,

    /// Tool params as a JSON object.
    #[arg(long, short = 'p', value_name = "JSON")]
    pub params: Option<String>,
}

fn parse_params(raw: Option<&str>) -> Result<Json, CliError> {
    let Some(raw) = raw else {
        return Ok(Json::Null);
    };
    match serde_json::from_str::<Json>(raw) {
        Ok(value @ (Json::Object(_) | Json::Null)) => Ok(value),
        Ok(_) => Err(CliError::with_details(
            "--params must be a JSON object",
            "e.g. --params '{\"group_id\": 42}'",
            "bad_request",
        )),
        Err(err) => Err(CliError::with_details(
            format!("--params is not valid JSON: {err}"),
            "e.g. --params '{\"group_id\": 42}'",
            "bad_request",
        )),
    }
}

/// Validate the invocation, open the store, resolve the caller, run the tool.
pub fn run_call(
    args: &CallArgs,
    api_key_flag: Option<&str>,
    output: OutputMode,
    open_store: impl FnOnce() -> Result<Store>,
) -> Result<()> {
    let tool = match args.tool.parse::<Tool>() {
        Ok(tool) => tool,
        Err(err) => {
            render_error(
                output,
                &CliError::with_details(
                    err.to_string(),
                    "run `telebugs-mcp tools` to list tool names",
                    "unknown_tool",
                ),
            )?;
            anyhow::bail!("{err}");
        }
    };

    let params = match parse_params(args.params.as_deref()) {
        Ok(params) => params,
        Err(err) => {
            render_error(output, &err)?;
            anyhow::bail!("{}", err.message);
        }
    };

    let api_key = match credentials::require_api_key(api_key_flag) {
        Ok(key) => key,
        Err(err) => {
            render_error(output, &err)?;
            anyhow::bail!("{}", err.message);
        }
    };

    let store = open_store()?;
    let Some(ctx) = access::resolve(&store, &api_key)? else {
        render_error(
            output,
            &CliError::with_details(
                "invalid API key",
                "check the key belongs to an active Telebugs user",
                "unauthenticated",
            ),
        )?;
        anyhow::bail!("invalid API key");
    };

    debug!(tool = tool.as_str(), user_id = ctx.user_id(), "call");
    let reply = tools::call(&store, &ctx, tool, params)?;
    render(output, &reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_default_to_null() {
        assert_eq!(parse_params(None).unwrap(), Json::Null);
    }

    #[test]
    fn params_must_be_an_object() {
        let value = parse_params(Some(r#"{"group_id": 4}"#)).unwrap();
        assert_eq!(value["group_id"], 4);

        let err = parse_params(Some("[1, 2]")).unwrap_err();
        assert_eq!(err.error_code.as_deref(), Some("bad_request"));

        let err = parse_params(Some("{oops")).unwrap_err();
        assert!(err.message.starts_with("--params is not valid JSON"));
    }
}
