//! In-memory database builders shared by unit tests.

use crate::access::{self, AuthContext};
use crate::db::Store;
use crate::db::schema::SCHEMA_SQL;
use rusqlite::{Connection, params};

pub fn store() -> Store {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.execute_batch(SCHEMA_SQL).expect("apply schema");
    Store::from_connection(conn).expect("wrap connection")
}

pub fn user(store: &Store, id: i64, name: &str, api_key: &str) {
    store
        .connection()
        .execute(
            "INSERT INTO users (id, name, email_address, role, api_key, active) \
             VALUES (?1, ?2, ?3, 0, ?4, 1)",
            params![id, name, format!("{}@example.com", name.to_lowercase()), api_key],
        )
        .expect("insert user");
}

pub fn member(store: &Store, user_id: i64, project_id: i64) {
    store
        .connection()
        .execute(
            "INSERT INTO project_memberships (user_id, project_id) VALUES (?1, ?2)",
            params![user_id, project_id],
        )
        .expect("insert membership");
}

pub fn project(store: &Store, id: i64, name: &str) {
    store
        .connection()
        .execute(
            "INSERT INTO projects (id, name, platform, timezone, groups_count, reports_count, created_at) \
             VALUES (?1, ?2, 20, 'UTC', 0, 0, '2024-01-01T00:00:00.000Z')",
            params![id, name],
        )
        .expect("insert project");
}

pub fn group(store: &Store, id: i64, project_id: i64, error_type: &str, message: &str, last: &str) {
    let conn = store.connection();
    conn.execute(
        "INSERT INTO groups (id, project_id, error_type, error_message, culprit, fingerprint, \
         reports_count, first_occurred_at, last_occurred_at) \
         VALUES (?1, ?2, ?3, ?4, 'app/main.rs', ?5, 1, '2024-01-01T00:00:00.000Z', ?6)",
        params![id, project_id, error_type, message, format!("fp-{id}"), last],
    )
    .expect("insert group");
    conn.execute(
        "INSERT INTO group_search_index (rowid, error_type, error_message, culprit) \
         VALUES (?1, ?2, ?3, 'app/main.rs')",
        params![id, error_type, message],
    )
    .expect("index group");
}

pub fn set_group(store: &Store, id: i64, assignment: &str) {
    store
        .connection()
        .execute(&format!("UPDATE groups SET {assignment} WHERE id = ?1"), [id])
        .expect("update group");
}

pub fn report(store: &Store, id: i64, group_id: i64, occurred_at: &str) {
    store
        .connection()
        .execute(
            "INSERT INTO reports (id, project_id, group_id, error_type, error_message, culprit, \
             environment, platform, release_version, server_name, handled, severity, occurred_at) \
             SELECT ?1, g.project_id, g.id, g.error_type, g.error_message, g.culprit, \
                    'production', 'rust', '1.0.0', 'web-1', 0, 0, ?3 \
             FROM groups g WHERE g.id = ?2",
            params![id, group_id, occurred_at],
        )
        .expect("insert report");
}

pub fn note(store: &Store, id: i64, group_id: i64, user_id: i64, content: &str, created_at: &str) {
    store
        .connection()
        .execute(
            "INSERT INTO notes (id, group_id, user_id, content, automated, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
            params![id, group_id, user_id, content, created_at],
        )
        .expect("insert note");
}

pub fn release(store: &Store, id: i64, project_id: i64, version: &str, created_at: &str) {
    store
        .connection()
        .execute(
            "INSERT INTO releases (id, project_id, version, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, project_id, version, created_at],
        )
        .expect("insert release");
}

pub fn artifact(store: &Store, id: i64, release_id: i64, name: &str, debug_id: Option<&str>) {
    store
        .connection()
        .execute(
            "INSERT INTO artifacts (id, release_id, name, debug_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, '2024-02-01T00:00:00.000Z')",
            params![id, release_id, name, debug_id],
        )
        .expect("insert artifact");
}

pub fn attach_blob(store: &Store, artifact_id: i64, byte_size: i64, content_type: &str) {
    let conn = store.connection();
    conn.execute(
        "INSERT INTO active_storage_blobs (byte_size, content_type) VALUES (?1, ?2)",
        params![byte_size, content_type],
    )
    .expect("insert blob");
    let blob_id = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO active_storage_attachments (record_type, record_id, blob_id) \
         VALUES ('Artifact', ?1, ?2)",
        params![artifact_id, blob_id],
    )
    .expect("insert attachment");
}

pub fn aggregate(store: &Store, project_id: i64, group_id: i64, period_type: i64, key: &str, count: i64) {
    store
        .connection()
        .execute(
            "INSERT INTO report_aggregates (project_id, group_id, period_type, period_key, count) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![project_id, group_id, period_type, key, count],
        )
        .expect("insert aggregate");
}

/// Resolve `api_key` against the fixture database.
pub fn ctx(store: &Store, api_key: &str) -> AuthContext {
    access::resolve(store, api_key)
        .expect("resolve principal")
        .expect("principal exists")
}

/// Two tenants: Ada (id 1) is a member of project 1, Bo (id 2) of project 2.
/// Each project has one open group (ids 10 and 20).
pub fn two_tenants() -> Store {
    let store = store();
    project(&store, 1, "api");
    project(&store, 2, "web");
    user(&store, 1, "Ada", "key-ada");
    user(&store, 2, "Bo", "key-bo");
    member(&store, 1, 1);
    member(&store, 2, 2);
    group(&store, 10, 1, "TypeError", "undefined is not a function", "2024-03-01T10:00:00.000Z");
    group(&store, 20, 2, "KeyError", "missing key 'id'", "2024-03-02T10:00:00.000Z");
    store
}
