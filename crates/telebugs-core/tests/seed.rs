//! Seeding helpers shared by the integration tests.
//!
//! Included with `#[path = "seed.rs"] mod seed;` so each test binary gets its
//! own copy.

#![allow(dead_code)]

use rusqlite::{Connection, params};
use telebugs_core::db::schema::SCHEMA_SQL;
use telebugs_core::{AuthContext, Store};

pub fn store() -> Store {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(SCHEMA_SQL).unwrap();
    Store::from_connection(conn).unwrap()
}

pub fn project(store: &Store, id: i64) {
    store
        .connection()
        .execute(
            "INSERT INTO projects (id, name, platform, timezone, groups_count, reports_count, created_at) \
             VALUES (?1, ?2, 20, 'UTC', 0, 0, '2024-01-01T00:00:00.000Z')",
            params![id, format!("project-{id}")],
        )
        .unwrap();
}

/// Insert an active user holding `api_key` and member of every `projects` id.
pub fn user(store: &Store, id: i64, api_key: &str, projects: &[i64]) {
    let conn = store.connection();
    conn.execute(
        "INSERT INTO users (id, name, email_address, role, api_key, active) \
         VALUES (?1, ?2, ?3, 0, ?4, 1)",
        params![id, format!("user-{id}"), format!("user-{id}@example.com"), api_key],
    )
    .unwrap();
    for project in projects {
        conn.execute(
            "INSERT INTO project_memberships (user_id, project_id) VALUES (?1, ?2)",
            params![id, project],
        )
        .unwrap();
    }
}

pub fn group(store: &Store, id: i64, project_id: i64, message: &str, last: &str) {
    let conn = store.connection();
    conn.execute(
        "INSERT INTO groups (id, project_id, error_type, error_message, culprit, fingerprint, \
         reports_count, first_occurred_at, last_occurred_at) \
         VALUES (?1, ?2, 'Error', ?3, 'lib.rs', ?4, 1, '2024-01-01T00:00:00.000Z', ?5)",
        params![id, project_id, message, format!("fp-{id}"), last],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO group_search_index (rowid, error_type, error_message, culprit) \
         VALUES (?1, 'Error', ?2, 'lib.rs')",
        params![id, message],
    )
    .unwrap();
}

pub fn ctx(store: &Store, api_key: &str) -> AuthContext {
    telebugs_core::access::resolve(store, api_key).unwrap().unwrap()
}
