//! Error-group state transitions: resolve, unresolve, mute, unmute.
//!
//! Resolution and muting are independent axes stored as nullable timestamps.
//!
//! | transition | allowed from               | rejection otherwise                     |
//! |------------|----------------------------|-----------------------------------------|
//! | resolve    | not resolved               | already resolved                        |
//! | unresolve  | resolved                   | not resolved                            |
//! | mute       | not resolved and not muted | cannot mute resolved / already muted    |
//! | unmute     | muted                      | not muted                               |
//!
//! The same guard is repeated in the `UPDATE ... WHERE` clause, so a
//! transition that loses a race with another writer changes nothing and is
//! reported with the rejection matching the state it lost to. The reported
//! status is read back inside the write transaction.

use super::{
    OwnedGroup, check_optional_timestamp, now_timestamp, opt_text, owned_group, time_bound,
};
use crate::access::AuthContext;
use crate::db::{Store, WriteOutcome, WriteStatement};
use crate::error::{ErrorCode, Rejection, ToolError, ToolResult, ValidationError, finish};
use crate::model::{GroupId, GroupStatus, UserId};
use rusqlite::Connection;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupTransition {
    pub group_id: GroupId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MuteErrorGroup {
    pub group_id: GroupId,
    /// ISO-8601 date or date-time after which the mute lapses.
    #[serde(default)]
    pub muted_until: Option<String>,
}

impl MuteErrorGroup {
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a malformed `muted_until`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_optional_timestamp("muted_until", self.muted_until.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub success: bool,
    pub group_id: GroupId,
    /// Derived status after the transition.
    pub status: GroupStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MuteChange {
    #[serde(flatten)]
    pub change: StatusChange,
    pub muted_until: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Transition {
    Resolve,
    Unresolve,
    Mute { until: Option<String> },
    Unmute,
}

impl Transition {
    const fn name(&self) -> &'static str {
        match self {
            Self::Resolve => "resolve_error_group",
            Self::Unresolve => "unresolve_error_group",
            Self::Mute { .. } => "mute_error_group",
            Self::Unmute => "unmute_error_group",
        }
    }

    /// State validation against the group as currently stored.
    fn check(&self, group: &OwnedGroup) -> Result<(), Rejection> {
        let resolved = group.resolved_at.is_some();
        let muted = group.muted_at.is_some();
        let refusal = match self {
            Self::Resolve if resolved => {
                Some((ErrorCode::AlreadyResolved, "Error group is already resolved"))
            }
            Self::Unresolve if !resolved => {
                Some((ErrorCode::NotResolved, "Error group is not resolved"))
            }
            Self::Mute { .. } if resolved => Some((
                ErrorCode::CannotMuteResolved,
                "Cannot mute a resolved error group",
            )),
            Self::Mute { .. } if muted => {
                Some((ErrorCode::AlreadyMuted, "Error group is already muted"))
            }
            Self::Unmute if !muted => Some((ErrorCode::NotMuted, "Error group is not muted")),
            _ => None,
        };
        refusal.map_or(Ok(()), |(code, message)| Err(Rejection::new(code, message)))
    }

    fn statement(&self, group_id: GroupId, user_id: UserId, now: &str) -> WriteStatement {
        let now = Value::Text(now.to_string());
        let id = Value::Integer(group_id);
        let user = Value::Integer(user_id);
        let statement = match self {
            Self::Resolve => WriteStatement::new(
                "UPDATE groups SET resolved_at = ?1, resolver_id = ?2, updated_at = ?1 \
                 WHERE id = ?3 AND resolved_at IS NULL",
                vec![now, user, id],
            ),
            Self::Unresolve => WriteStatement::new(
                "UPDATE groups SET resolved_at = NULL, resolver_id = NULL, updated_at = ?1 \
                 WHERE id = ?2 AND resolved_at IS NOT NULL",
                vec![now, id],
            ),
            Self::Mute { until } => WriteStatement::new(
                "UPDATE groups SET muted_at = ?1, muter_id = ?2, muted_until = ?3, updated_at = ?1 \
                 WHERE id = ?4 AND resolved_at IS NULL AND muted_at IS NULL",
                vec![now, user, opt_text(until.as_deref()), id],
            ),
            Self::Unmute => WriteStatement::new(
                "UPDATE groups SET muted_at = NULL, muted_until = NULL, muter_id = NULL, \
                 updated_at = ?1 \
                 WHERE id = ?2 AND muted_at IS NOT NULL",
                vec![now, id],
            ),
        };
        statement.expect_rows(1)
    }
}

fn stored_status(conn: &Connection, group_id: GroupId) -> rusqlite::Result<GroupStatus> {
    conn.query_row(
        "SELECT resolved_at, muted_at FROM groups WHERE id = ?1",
        [group_id],
        |row| {
            let resolved_at: Option<String> = row.get(0)?;
            let muted_at: Option<String> = row.get(1)?;
            Ok(GroupStatus::derive(resolved_at, muted_at))
        },
    )
}

fn apply(
    store: &Store,
    ctx: &AuthContext,
    group_id: GroupId,
    transition: &Transition,
) -> Result<StatusChange, ToolError> {
    let group = owned_group(store, ctx, group_id)?;
    transition.check(&group)?;

    let now = now_timestamp();
    let statement = transition.statement(group.id, ctx.user_id(), &now);
    let written = store.execute_write_then(transition.name(), &[statement], |conn| {
        stored_status(conn, group.id)
    })?;
    let status = match written {
        (WriteOutcome::Committed(_), Some(status)) => status,
        _ => {
            // Lost a race; report against the state that won.
            let current = owned_group(store, ctx, group_id)?;
            transition.check(&current)?;
            return Err(Rejection::new(
                ErrorCode::ConcurrentChange,
                "Error group changed concurrently, retry",
            )
            .into());
        }
    };
    info!(
        op = transition.name(),
        group_id,
        user_id = ctx.user_id(),
        status = %status,
        "error group transitioned"
    );
    Ok(StatusChange {
        success: true,
        group_id,
        status,
    })
}

/// # Errors
///
/// Returns a [`crate::StoreError`] if the lookup or update fails.
pub fn resolve_error_group(
    store: &Store,
    ctx: &AuthContext,
    request: &GroupTransition,
) -> ToolResult<StatusChange> {
    finish(apply(store, ctx, request.group_id, &Transition::Resolve))
}

/// # Errors
///
/// Returns a [`crate::StoreError`] if the lookup or update fails.
pub fn unresolve_error_group(
    store: &Store,
    ctx: &AuthContext,
    request: &GroupTransition,
) -> ToolResult<StatusChange> {
    finish(apply(store, ctx, request.group_id, &Transition::Unresolve))
}

/// Mute an open group, optionally until a given time.
///
/// # Errors
///
/// Returns a [`crate::StoreError`] if the lookup or update fails.
pub fn mute_error_group(
    store: &Store,
    ctx: &AuthContext,
    request: &MuteErrorGroup,
) -> ToolResult<MuteChange> {
    let outcome = request.validate().map_err(ToolError::from).and_then(|()| {
        let until = time_bound(request.muted_until.as_deref()).map(str::to_string);
        let transition = Transition::Mute {
            until: until.clone(),
        };
        apply(store, ctx, request.group_id, &transition).map(|change| MuteChange {
            change,
            muted_until: until,
        })
    });
    finish(outcome)
}

/// # Errors
///
/// Returns a [`crate::StoreError`] if the lookup or update fails.
pub fn unmute_error_group(
    store: &Store,
    ctx: &AuthContext,
    request: &GroupTransition,
) -> ToolResult<StatusChange> {
    finish(apply(store, ctx, request.group_id, &Transition::Unmute))
}
