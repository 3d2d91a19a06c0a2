//! E2E tests for the `serve` loop over a real SQLite file.

use assert_cmd::Command;
use rusqlite::Connection;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use telebugs_core::db::schema::SCHEMA_SQL;
use tempfile::TempDir;

fn tb_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("telebugs-mcp"));
    cmd.current_dir(dir);
    cmd.env_remove("TELEBUGS_API_KEY");
    cmd.env_remove("TELEBUGS_DB_PATH");
    cmd.env("XDG_CONFIG_HOME", dir.join("config"));
    cmd.env("HOME", dir);
    cmd.env("TELEBUGS_LOG", "error");
    cmd
}

fn seed(dir: &Path) -> PathBuf {
    let path = dir.join("production.sqlite3");
    let conn = Connection::open(&path).expect("create db");
    conn.execute_batch(SCHEMA_SQL).expect("schema");
    conn.execute_batch(
        "INSERT INTO projects (id, name, platform, timezone, groups_count, reports_count, created_at) VALUES
           (1, 'api', 20, 'UTC', 1, 0, '2024-01-01T00:00:00.000Z'),
           (2, 'web', 20, 'UTC', 0, 0, '2024-01-01T00:00:00.000Z');
         INSERT INTO users (id, name, email_address, role, api_key, active) VALUES
           (1, 'Ada', 'ada@example.com', 0, 'key-ada', 1),
           (2, 'Bo', 'bo@example.com', 0, 'key-bo', 1);
         INSERT INTO project_memberships (user_id, project_id) VALUES (1, 1), (2, 2);
         INSERT INTO groups (id, project_id, error_type, error_message, culprit, fingerprint,
                             reports_count, first_occurred_at, last_occurred_at) VALUES
           (10, 1, 'TypeError', 'undefined is not a function', 'app.js', 'fp-10', 3,
            '2024-02-01T00:00:00.000Z', '2024-03-01T00:00:00.000Z');",
    )
    .expect("seed rows");
    path
}

/// Run `serve` with `requests` on stdin and parse one reply per line.
fn serve(dir: &Path, db: &Path, requests: &[Value]) -> Vec<Value> {
    let input: String = requests.iter().map(|r| format!("{r}\n")).collect();
    let output = tb_cmd(dir)
        .arg("--db")
        .arg(db)
        .arg("serve")
        .write_stdin(input)
        .output()
        .expect("serve should not crash");
    assert!(
        output.status.success(),
        "serve failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).expect("reply line is JSON"))
        .collect()
}

#[test]
fn open_only_session() {
    let dir = TempDir::new().unwrap();
    let db = seed(dir.path());

    let replies = serve(
        dir.path(),
        &db,
        &[json!({ "id": 1, "op": "open", "api_key": "key-ada" })],
    );
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["id"], 1);
    assert_eq!(replies[0]["result"]["user_id"], 1);
    assert_eq!(replies[0]["result"]["session"].as_str().unwrap().len(), 32);
}

#[test]
fn requests_against_unknown_sessions_fail() {
    let dir = TempDir::new().unwrap();
    let db = seed(dir.path());

    let replies = serve(
        dir.path(),
        &db,
        &[
            json!({ "id": "x", "op": "call", "session": "deadbeef", "tool": "list_projects" }),
            json!({ "id": "y", "op": "close", "session": "deadbeef" }),
            json!({ "id": "z", "op": "open", "api_key": "wrong" }),
        ],
    );
    assert_eq!(replies[0]["failure"]["code"], "invalid_session");
    assert_eq!(replies[1]["failure"]["code"], "invalid_session");
    assert_eq!(replies[2]["failure"]["code"], "unauthenticated");
    assert!(replies.iter().all(|r| r.get("result").is_none()));
}

#[test]
fn malformed_input_does_not_stop_the_loop() {
    let dir = TempDir::new().unwrap();
    let db = seed(dir.path());

    let output = tb_cmd(dir.path())
        .arg("--db")
        .arg(&db)
        .arg("serve")
        .write_stdin("garbage\n{\"id\": 5, \"op\": \"open\", \"api_key\": \"key-bo\"}\n")
        .output()
        .unwrap();
    assert!(output.status.success());
    let replies: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(replies[0]["failure"]["code"], "bad_request");
    assert_eq!(replies[1]["id"], 5);
    assert_eq!(replies[1]["result"]["projects"], json!([2]));
}

#[test]
fn missing_database_fails_before_reading_stdin() {
    let dir = TempDir::new().unwrap();

    tb_cmd(dir.path())
        .arg("--db")
        .arg(dir.path().join("absent.sqlite3"))
        .arg("serve")
        .write_stdin("{}\n")
        .assert()
        .failure();
}
