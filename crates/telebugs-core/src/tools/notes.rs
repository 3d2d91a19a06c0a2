//! Group notes. Both writes keep `groups.notes_count` in step with the
//! `notes` table inside one transaction.

use super::{now_timestamp, owned_group};
use crate::access::AuthContext;
use crate::db::{Store, WriteOutcome, WriteStatement};
use crate::error::{ErrorCode, Rejection, ToolError, ToolResult, ValidationError, finish};
use crate::model::{GroupId, NoteId, UserId};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddNote {
    pub group_id: GroupId,
    pub content: String,
}

impl AddNote {
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for blank content.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.content.trim().is_empty() {
            return Err(ValidationError::new("content", "must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteNote {
    pub group_id: GroupId,
    pub note_id: NoteId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NoteChange {
    pub success: bool,
    pub note_id: NoteId,
    pub group_id: GroupId,
}

/// Attach a note authored by the caller.
///
/// # Errors
///
/// Returns a [`crate::StoreError`] if the lookup or write fails.
pub fn add_note(store: &Store, ctx: &AuthContext, request: &AddNote) -> ToolResult<NoteChange> {
    finish(add(store, ctx, request))
}

fn add(store: &Store, ctx: &AuthContext, request: &AddNote) -> Result<NoteChange, ToolError> {
    request.validate()?;
    let group = owned_group(store, ctx, request.group_id)?;

    let now = Value::Text(now_timestamp());
    let statements = [
        WriteStatement::new(
            "INSERT INTO notes (group_id, user_id, content, automated, created_at, updated_at) \
             VALUES (?1, ?2, ?3, 0, ?4, ?4)",
            vec![
                Value::Integer(group.id),
                Value::Integer(ctx.user_id()),
                Value::Text(request.content.clone()),
                now.clone(),
            ],
        ),
        WriteStatement::new(
            "UPDATE groups SET notes_count = notes_count + 1, updated_at = ?1 WHERE id = ?2",
            vec![now, Value::Integer(group.id)],
        )
        .expect_rows(1),
    ];

    let note_id = match store.execute_write("add_note", &statements)? {
        WriteOutcome::Committed(summary) => summary.last_insert_rowid,
        WriteOutcome::RolledBack { .. } => return Err(Rejection::not_found("Error group").into()),
    };

    info!(note_id, group_id = group.id, user_id = ctx.user_id(), "note added");
    Ok(NoteChange {
        success: true,
        note_id,
        group_id: group.id,
    })
}

/// Delete one of the caller's own notes.
///
/// Group ownership is checked first, then the note must belong to that group,
/// then the caller must be its author.
///
/// # Errors
///
/// Returns a [`crate::StoreError`] if the lookup or write fails.
pub fn delete_note(
    store: &Store,
    ctx: &AuthContext,
    request: &DeleteNote,
) -> ToolResult<NoteChange> {
    finish(delete(store, ctx, request))
}

fn delete(store: &Store, ctx: &AuthContext, request: &DeleteNote) -> Result<NoteChange, ToolError> {
    let group = owned_group(store, ctx, request.group_id)?;

    let author: Option<UserId> = store.query_one(
        "fetch_note_author",
        "SELECT user_id FROM notes WHERE id = ?1 AND group_id = ?2",
        &[Value::Integer(request.note_id), Value::Integer(group.id)],
        |row| row.get(0),
    )?;
    let author = author.ok_or_else(|| Rejection::not_found("Note"))?;
    if author != ctx.user_id() {
        return Err(Rejection::new(
            ErrorCode::NotNoteAuthor,
            "You can only delete your own notes",
        )
        .into());
    }

    let now = Value::Text(now_timestamp());
    let statements = [
        WriteStatement::new(
            "DELETE FROM notes WHERE id = ?1 AND group_id = ?2",
            vec![Value::Integer(request.note_id), Value::Integer(group.id)],
        )
        .expect_rows(1),
        WriteStatement::new(
            "UPDATE groups SET notes_count = notes_count - 1, updated_at = ?1 WHERE id = ?2",
            vec![now, Value::Integer(group.id)],
        )
        .expect_rows(1),
    ];

    if let WriteOutcome::RolledBack { .. } = store.execute_write("delete_note", &statements)? {
        return Err(Rejection::not_found("Note").into());
    }

    info!(
        note_id = request.note_id,
        group_id = group.id,
        user_id = ctx.user_id(),
        "note deleted"
    );
    Ok(NoteChange {
        success: true,
        note_id: request.note_id,
        group_id: group.id,
    })
}
