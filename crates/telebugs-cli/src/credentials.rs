//! API key resolution for the one-shot `call` command.
//!
//! The resolution chain: `--api-key` flag > `TELEBUGS_API_KEY` env. Either
//! may carry an `Authorization: Bearer` style prefix, which is stripped.

use crate::output::CliError;
use std::env;
use telebugs_core::access::bearer_token;

pub const API_KEY_ENV: &str = "TELEBUGS_API_KEY";

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }
}

fn normalize(raw: &str) -> Option<String> {
    let token = bearer_token(raw);
    (!token.is_empty()).then(|| token.to_string())
}

fn resolve_api_key_with(cli_flag: Option<&str>, env: &dyn EnvReader) -> Option<String> {
    if let Some(key) = cli_flag.and_then(normalize) {
        return Some(key);
    }
    env.get(API_KEY_ENV).as_deref().and_then(normalize)
}

/// Resolve the API key, or explain how to provide one.
pub fn require_api_key(cli_flag: Option<&str>) -> Result<String, CliError> {
    resolve_api_key_with(cli_flag, &RealEnv).ok_or_else(|| {
        CliError::with_details(
            "API key required",
            format!("pass --api-key or set {API_KEY_ENV}"),
            "unauthenticated",
        )
    })
}
