//! Error taxonomy shared by every tool.
//!
//! Two classes never mix:
//! - [`Rejection`]: a recoverable business outcome (not found, access denied,
//!   invalid state, invalid params). Serialized as `{"error": "..."}` and
//!   returned inside [`Reply`].
//! - [`StoreError`]: the storage engine could not run a statement. Fatal to the
//!   request, propagated unrecovered.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::path::PathBuf;

/// Machine-readable rejection codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidParams,
    EntityNotFound,
    AccessDenied,
    NotNoteAuthor,
    AlreadyResolved,
    NotResolved,
    CannotMuteResolved,
    AlreadyMuted,
    NotMuted,
    ConcurrentChange,
}

/// Coarse grouping of [`ErrorCode`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    InvalidParams,
    NotFound,
    AccessDenied,
    InvalidState,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidParams => "E1001",
            Self::EntityNotFound => "E2001",
            Self::AccessDenied => "E3001",
            Self::NotNoteAuthor => "E3002",
            Self::AlreadyResolved => "E4001",
            Self::NotResolved => "E4002",
            Self::CannotMuteResolved => "E4003",
            Self::AlreadyMuted => "E4004",
            Self::NotMuted => "E4005",
            Self::ConcurrentChange => "E4006",
        }
    }

    #[must_use]
    pub const fn class(self) -> ErrorClass {
        match self {
            Self::InvalidParams => ErrorClass::InvalidParams,
            Self::EntityNotFound => ErrorClass::NotFound,
            Self::AccessDenied | Self::NotNoteAuthor => ErrorClass::AccessDenied,
            Self::AlreadyResolved
            | Self::NotResolved
            | Self::CannotMuteResolved
            | Self::AlreadyMuted
            | Self::NotMuted
            | Self::ConcurrentChange => ErrorClass::InvalidState,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A recoverable business-rule failure.
///
/// Only the message crosses the tool boundary; the code stays in-process for
/// logging and tests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Rejection {
    code: ErrorCode,
    message: String,
}

impl Rejection {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// `"<Entity> not found"`.
    pub fn not_found(entity: &str) -> Self {
        Self::new(ErrorCode::EntityNotFound, format!("{entity} not found"))
    }

    /// `"Access denied to this <target>"`.
    pub fn access_denied(target: &str) -> Self {
        Self::new(ErrorCode::AccessDenied, format!("Access denied to this {target}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, message)
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        self.code.class()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Serialize for Rejection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("error", &self.message)?;
        map.end()
    }
}

/// The document a tool hands back: its success body or a rejection.
///
/// Untagged, so callers branch on whether the `error` key is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    Success(T),
    Rejected(Rejection),
}

impl<T> Reply<T> {
    #[must_use]
    pub const fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Success(_) => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }

    #[must_use]
    pub fn into_success(self) -> Option<T> {
        match self {
            Self::Success(body) => Some(body),
            Self::Rejected(_) => None,
        }
    }
}

impl<T: Serialize> Serialize for Reply<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Success(body) => body.serialize(serializer),
            Self::Rejected(rejection) => rejection.serialize(serializer),
        }
    }
}

/// A request field failed its bounds or format check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl From<ValidationError> for Rejection {
    fn from(err: ValidationError) -> Self {
        Self::invalid_params(err.to_string())
    }
}

/// Storage-engine failure. Never carries business meaning.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to open database {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to configure database connection: {0}")]
    Configure(#[source] rusqlite::Error),

    #[error("storage fault in {op}: {source}")]
    Query {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("storage fault in {op}: transaction aborted: {source}")]
    Transaction {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

/// Attach an operation label to a raw `rusqlite` result.
pub trait StoreContext<T> {
    /// # Errors
    ///
    /// Wraps the underlying `rusqlite::Error` as [`StoreError::Query`].
    fn op(self, op: &'static str) -> Result<T, StoreError>;
}

impl<T> StoreContext<T> for rusqlite::Result<T> {
    fn op(self, op: &'static str) -> Result<T, StoreError> {
        self.map_err(|source| StoreError::Query { op, source })
    }
}

/// What a tool returns: a reply document, or a storage fault.
pub type ToolResult<T> = Result<Reply<T>, StoreError>;

/// Internal short-circuit type so tool bodies can use `?` for both classes.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ToolError {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ValidationError> for ToolError {
    fn from(err: ValidationError) -> Self {
        Self::Rejected(err.into())
    }
}

/// Fold a tool body's outcome into the public [`ToolResult`] shape.
pub(crate) fn finish<T>(outcome: Result<T, ToolError>) -> ToolResult<T> {
    match outcome {
        Ok(body) => Ok(Reply::Success(body)),
        Err(ToolError::Rejected(rejection)) => {
            tracing::debug!(
                code = %rejection.code(),
                class = ?rejection.class(),
                message = rejection.message(),
                "tool rejected"
            );
            Ok(Reply::Rejected(rejection))
        }
        Err(ToolError::Store(err)) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorClass, ErrorCode, Rejection, Reply, ValidationError};
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::InvalidParams,
            ErrorCode::EntityNotFound,
            ErrorCode::AccessDenied,
            ErrorCode::NotNoteAuthor,
            ErrorCode::AlreadyResolved,
            ErrorCode::NotResolved,
            ErrorCode::CannotMuteResolved,
            ErrorCode::AlreadyMuted,
            ErrorCode::NotMuted,
            ErrorCode::ConcurrentChange,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn note_author_check_is_access_class() {
        assert_eq!(ErrorCode::NotNoteAuthor.class(), ErrorClass::AccessDenied);
        assert_eq!(ErrorCode::AlreadyMuted.class(), ErrorClass::InvalidState);
    }

    #[test]
    fn rejection_serializes_as_bare_error_object() {
        let value = serde_json::to_value(Rejection::not_found("Error group")).unwrap();
        assert_eq!(value, serde_json::json!({ "error": "Error group not found" }));
    }

    #[test]
    fn reply_success_serializes_body_untouched() {
        let reply: Reply<serde_json::Value> = Reply::Success(serde_json::json!({ "projects": [] }));
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value, serde_json::json!({ "projects": [] }));
    }

    #[test]
    fn validation_error_becomes_invalid_params() {
        let rejection = Rejection::from(ValidationError::new("limit", "must be between 1 and 100"));
        assert_eq!(rejection.code(), ErrorCode::InvalidParams);
        assert_eq!(rejection.message(), "Invalid limit: must be between 1 and 100");
    }

    #[test]
    fn access_denied_message_names_target() {
        let rejection = Rejection::access_denied("release");
        assert_eq!(rejection.message(), "Access denied to this release");
        assert_eq!(rejection.class(), ErrorClass::AccessDenied);
    }
}
