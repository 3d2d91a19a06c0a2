//! Credential-to-principal resolution.

use super::scope::ProjectScope;
use crate::db::Store;
use crate::error::StoreError;
use crate::model::{ProjectId, UserId};
use rusqlite::types::Value;
use serde::Serialize;
use tracing::{debug, warn};

/// Stored `users.role` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Member,
    Administrator,
    Other(i64),
}

impl Role {
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Member,
            1 => Self::Administrator,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Member => 0,
            Self::Administrator => 1,
            Self::Other(code) => code,
        }
    }
}

impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Member => serializer.serialize_str("member"),
            Self::Administrator => serializer.serialize_str("administrator"),
            Self::Other(code) => serializer.serialize_i64(*code),
        }
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: UserId,
    pub name: String,
    pub email_address: String,
    pub role: Role,
}

/// A principal plus the projects it may access, fixed at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub principal: Principal,
    pub projects: ProjectScope,
}

impl AuthContext {
    #[must_use]
    pub const fn new(principal: Principal, projects: ProjectScope) -> Self {
        Self {
            principal,
            projects,
        }
    }

    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.principal.id
    }
}

/// Strip an `Authorization: Bearer` prefix if present.
#[must_use]
pub fn bearer_token(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("Bearer ")
        .map_or(trimmed, str::trim_start)
}

/// Resolve an API key to its active principal and project memberships.
///
/// Returns `Ok(None)` for blank, unknown, or deactivated credentials.
///
/// # Errors
///
/// Returns a [`StoreError`] if either lookup fails.
pub fn resolve(store: &Store, credential: &str) -> Result<Option<AuthContext>, StoreError> {
    let credential = bearer_token(credential);
    if credential.is_empty() {
        debug!("blank credential");
        return Ok(None);
    }

    let principal = store.query_one(
        "resolve_principal",
        "SELECT id, name, email_address, role FROM users WHERE api_key = ?1 AND active = 1",
        &[Value::Text(credential.to_string())],
        |row| {
            Ok(Principal {
                id: row.get(0)?,
                name: row.get(1)?,
                email_address: row.get(2)?,
                role: Role::from_code(row.get(3)?),
            })
        },
    )?;

    let Some(principal) = principal else {
        warn!("rejected credential: no active user");
        return Ok(None);
    };

    let memberships: Vec<ProjectId> = store.query_many(
        "resolve_memberships",
        "SELECT project_id FROM project_memberships WHERE user_id = ?1",
        &[Value::Integer(principal.id)],
        |row| row.get(0),
    )?;

    debug!(
        user_id = principal.id,
        projects = memberships.len(),
        "resolved principal"
    );
    Ok(Some(AuthContext::new(
        principal,
        ProjectScope::new(memberships),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn resolves_active_user_with_memberships() {
        let store = fixtures::store();
        fixtures::project(&store, 1, "api");
        fixtures::project(&store, 2, "web");
        fixtures::user(&store, 10, "Ada", "key-ada");
        fixtures::member(&store, 10, 1);
        fixtures::member(&store, 10, 2);

        let ctx = resolve(&store, "key-ada").unwrap().unwrap();
        assert_eq!(ctx.principal.id, 10);
        assert_eq!(ctx.principal.name, "Ada");
        assert_eq!(ctx.principal.role, Role::Member);
        assert_eq!(ctx.projects.ids(), vec![1, 2]);
    }

    #[test]
    fn unknown_or_blank_credential_is_none() {
        let store = fixtures::store();
        fixtures::user(&store, 10, "Ada", "key-ada");

        assert!(resolve(&store, "nope").unwrap().is_none());
        assert!(resolve(&store, "   ").unwrap().is_none());
        assert!(resolve(&store, "Bearer ").unwrap().is_none());
    }

    #[test]
    fn inactive_user_is_none() {
        let store = fixtures::store();
        fixtures::user(&store, 10, "Ada", "key-ada");
        store
            .connection()
            .execute("UPDATE users SET active = 0 WHERE id = 10", [])
            .unwrap();

        assert!(resolve(&store, "key-ada").unwrap().is_none());
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        assert_eq!(bearer_token("Bearer abc123"), "abc123");
        assert_eq!(bearer_token("  abc123 "), "abc123");
        assert_eq!(bearer_token("bearer abc"), "bearer abc");

        let store = fixtures::store();
        fixtures::user(&store, 10, "Ada", "key-ada");
        assert!(resolve(&store, "Bearer key-ada").unwrap().is_some());
    }

    #[test]
    fn user_without_memberships_has_empty_scope() {
        let store = fixtures::store();
        fixtures::user(&store, 11, "Bo", "key-bo");

        let ctx = resolve(&store, "key-bo").unwrap().unwrap();
        assert!(ctx.projects.is_empty());
    }

    #[test]
    fn role_codes() {
        assert_eq!(Role::from_code(1), Role::Administrator);
        assert_eq!(Role::from_code(7), Role::Other(7));
        assert_eq!(Role::Other(7).code(), 7);
    }
}
