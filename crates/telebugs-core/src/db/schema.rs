//! Reference layout of the Telebugs application tables this crate reads.
//!
//! The application owns and migrates its database; nothing here runs against
//! a production file. [`SCHEMA_SQL`] exists so tests and fixtures can build an
//! in-memory database with the same column names and types:
//! - timestamps are ISO-8601 `TEXT`
//! - `projects.platform`, `reports.severity` and
//!   `report_aggregates.period_type` are integer codes
//! - `group_search_index` is an FTS5 table keyed by `rowid = groups.id`

/// DDL for every table touched by the tools.
pub const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    email_address TEXT NOT NULL,
    role INTEGER NOT NULL DEFAULT 0,
    api_key TEXT UNIQUE,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    platform INTEGER,
    timezone TEXT,
    groups_count INTEGER NOT NULL DEFAULT 0,
    reports_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS project_memberships (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id),
    project_id INTEGER NOT NULL REFERENCES projects(id),
    UNIQUE (user_id, project_id)
);

CREATE TABLE IF NOT EXISTS groups (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL REFERENCES projects(id),
    error_type TEXT NOT NULL,
    error_message TEXT NOT NULL,
    culprit TEXT,
    fingerprint TEXT NOT NULL,
    reports_count INTEGER NOT NULL DEFAULT 0,
    notes_count INTEGER NOT NULL DEFAULT 0,
    first_occurred_at TEXT NOT NULL,
    last_occurred_at TEXT NOT NULL,
    resolved_at TEXT,
    resolver_id INTEGER REFERENCES users(id),
    muted_at TEXT,
    muted_until TEXT,
    muter_id INTEGER REFERENCES users(id),
    owner_id INTEGER REFERENCES users(id),
    merged_into_id INTEGER REFERENCES groups(id),
    created_at TEXT,
    updated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_groups_project_last
    ON groups(project_id, last_occurred_at DESC);

CREATE VIRTUAL TABLE IF NOT EXISTS group_search_index USING fts5(
    error_type,
    error_message,
    culprit
);

CREATE TABLE IF NOT EXISTS reports (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL REFERENCES projects(id),
    group_id INTEGER NOT NULL REFERENCES groups(id),
    error_type TEXT NOT NULL,
    error_message TEXT NOT NULL,
    culprit TEXT,
    log_message TEXT,
    environment TEXT,
    platform TEXT,
    release_version TEXT,
    server_name TEXT,
    handled INTEGER,
    severity INTEGER,
    occurred_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reports_project_occurred
    ON reports(project_id, occurred_at DESC);

CREATE TABLE IF NOT EXISTS backtraces (
    id INTEGER PRIMARY KEY,
    report_id INTEGER NOT NULL REFERENCES reports(id),
    exception_type TEXT,
    exception_module TEXT,
    exception_value TEXT
);

CREATE TABLE IF NOT EXISTS frames (
    id INTEGER PRIMARY KEY,
    backtrace_id INTEGER NOT NULL REFERENCES backtraces(id),
    position INTEGER NOT NULL,
    abs_path TEXT,
    filename TEXT,
    function TEXT,
    lineno INTEGER,
    colno INTEGER,
    context_line TEXT,
    pre_context TEXT,
    post_context TEXT,
    in_app INTEGER
);

CREATE TABLE IF NOT EXISTS contexts (
    id INTEGER PRIMARY KEY,
    report_id INTEGER NOT NULL REFERENCES reports(id),
    name TEXT,
    data TEXT
);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY,
    report_id INTEGER NOT NULL REFERENCES reports(id),
    key TEXT NOT NULL,
    value TEXT
);

CREATE TABLE IF NOT EXISTS error_breadcrumbs (
    id INTEGER PRIMARY KEY,
    report_id INTEGER NOT NULL REFERENCES reports(id),
    breadcrumb_type TEXT,
    category TEXT,
    level TEXT,
    message TEXT,
    data TEXT,
    timestamp TEXT
);

CREATE TABLE IF NOT EXISTS requests (
    id INTEGER PRIMARY KEY,
    report_id INTEGER NOT NULL REFERENCES reports(id),
    url TEXT,
    method TEXT,
    query_string TEXT,
    headers TEXT,
    data TEXT
);

CREATE TABLE IF NOT EXISTS report_users (
    id INTEGER PRIMARY KEY,
    report_id INTEGER NOT NULL REFERENCES reports(id),
    user_id TEXT,
    username TEXT,
    email TEXT,
    ip_address TEXT,
    geo_country_code TEXT,
    geo_region TEXT,
    geo_city TEXT
);

CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY,
    group_id INTEGER NOT NULL REFERENCES groups(id),
    user_id INTEGER NOT NULL REFERENCES users(id),
    content TEXT NOT NULL,
    automated INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS releases (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL REFERENCES projects(id),
    version TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS artifacts (
    id INTEGER PRIMARY KEY,
    release_id INTEGER NOT NULL REFERENCES releases(id),
    name TEXT NOT NULL,
    debug_id TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS active_storage_blobs (
    id INTEGER PRIMARY KEY,
    byte_size INTEGER NOT NULL,
    content_type TEXT
);

CREATE TABLE IF NOT EXISTS active_storage_attachments (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL DEFAULT 'file',
    record_type TEXT NOT NULL,
    record_id INTEGER NOT NULL,
    blob_id INTEGER NOT NULL REFERENCES active_storage_blobs(id)
);

CREATE TABLE IF NOT EXISTS report_aggregates (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL REFERENCES projects(id),
    group_id INTEGER NOT NULL REFERENCES groups(id),
    period_type INTEGER NOT NULL,
    period_key TEXT NOT NULL,
    count INTEGER NOT NULL DEFAULT 0
);
";

#[cfg(test)]
mod tests {
    use super::SCHEMA_SQL;
    use rusqlite::Connection;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .map(Result::unwrap)
            .collect()
    }

    #[test]
    fn schema_applies_cleanly_and_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();

        let tables = table_names(&conn);
        for expected in [
            "active_storage_attachments",
            "artifacts",
            "backtraces",
            "contexts",
            "error_breadcrumbs",
            "frames",
            "group_search_index",
            "groups",
            "notes",
            "project_memberships",
            "projects",
            "releases",
            "report_aggregates",
            "report_users",
            "reports",
            "requests",
            "tags",
            "users",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
        }
    }

    #[test]
    fn search_index_matches_on_rowid() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        conn.execute(
            "INSERT INTO group_search_index (rowid, error_type, error_message, culprit) \
             VALUES (42, 'TypeError', 'cannot read property of undefined', 'app.js')",
            [],
        )
        .unwrap();

        let rowid: i64 = conn
            .query_row(
                "SELECT rowid FROM group_search_index WHERE group_search_index MATCH '\"undef\"*'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(rowid, 42);
    }
}
