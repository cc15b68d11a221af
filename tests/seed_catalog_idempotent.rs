use rusqlite::Connection;
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    spawn_sidecar_with_env(&[])
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn spawn_sidecar_with_env(vars: &[(&str, &str)]) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_ecotaskd");
    let mut cmd = Command::new(exe);
    cmd.env_remove("ECOTASKD_WORKSPACE");
    for (k, v) in vars {
        cmd.env(k, v);
    }
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn ecotaskd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn table_count(workspace: &std::path::Path, table: &str) -> i64 {
    let conn = Connection::open(workspace.join("ecotask.sqlite3")).expect("open db");
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .expect("count")
}

#[test]
fn reselecting_a_workspace_does_not_duplicate_the_catalog() {
    let workspace = temp_dir("ecotask-seed-idempotent");

    {
        let (_child, mut stdin, mut reader) = spawn_sidecar();
        let first = request_ok(
            &mut stdin,
            &mut reader,
            "ws1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        assert_eq!(first["seeded"], json!({ "badges": 3, "tasks": 3 }));

        let again = request_ok(
            &mut stdin,
            &mut reader,
            "ws2",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        assert_eq!(again["seeded"], json!({ "badges": 0, "tasks": 0 }));
    }

    // A fresh process on the same workspace sees existing rows too.
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let reopened = request_ok(
        &mut stdin,
        &mut reader,
        "ws3",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(reopened["seeded"], json!({ "badges": 0, "tasks": 0 }));

    assert_eq!(table_count(&workspace, "badges"), 3);
    assert_eq!(table_count(&workspace, "eco_tasks"), 3);
    assert_eq!(table_count(&workspace, "quiz_questions"), 2);

    let tasks = request_ok(&mut stdin, &mut reader, "tasks", "tasks.list", json!({}));
    let summary: Vec<(String, i64, String)> = tasks["tasks"]
        .as_array()
        .expect("tasks")
        .iter()
        .map(|t| {
            (
                t["title"].as_str().unwrap_or_default().to_string(),
                t["pointsReward"].as_i64().unwrap_or_default(),
                t["taskType"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Waste Segregation Champion".to_string(), 50, "photo_upload".to_string()),
            ("Tree Planting Hero".to_string(), 100, "photo_upload".to_string()),
            ("Water Saver Quiz".to_string(), 25, "quiz".to_string()),
        ]
    );
}

#[test]
fn seeding_can_be_disabled_and_tasks_created_by_hand() {
    let workspace = temp_dir("ecotask-seed-disabled");
    let (_child, mut stdin, mut reader) = spawn_sidecar_with_env(&[("ECOTASKD_SEED", "0")]);
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected["seeded"], json!({ "badges": 0, "tasks": 0 }));
    assert_eq!(table_count(&workspace, "badges"), 0);

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "create",
        "tasks.create",
        json!({
            "title": "Energy Quiz",
            "description": "Switch it off.",
            "pointsReward": 40,
            "taskType": "quiz",
            "questions": [{
                "questionText": "Which bulb uses least power?",
                "optionA": "Incandescent",
                "optionB": "Halogen",
                "optionC": "LED",
                "correctAnswer": "C"
            }]
        }),
    );
    assert!(created["taskId"].as_str().is_some());
    assert_eq!(created["task"]["questions"][0]["correctAnswer"].as_str(), Some("C"));

    let bad = request(
        &mut stdin,
        &mut reader,
        "bad",
        "tasks.create",
        json!({ "title": "Free points", "pointsReward": 0, "taskType": "photo_upload" }),
    );
    assert_eq!(bad["error"]["code"].as_str(), Some("bad_params"));
    assert_eq!(table_count(&workspace, "eco_tasks"), 1);
}

#[test]
fn startup_workspace_from_environment() {
    let workspace = temp_dir("ecotask-seed-startup");
    let path = workspace.to_string_lossy().to_string();
    let (_child, mut stdin, mut reader) =
        spawn_sidecar_with_env(&[("ECOTASKD_WORKSPACE", path.as_str())]);

    let health = request_ok(&mut stdin, &mut reader, "health", "health", json!({}));
    assert_eq!(health["workspacePath"].as_str(), Some(path.as_str()));
    let badges = request_ok(&mut stdin, &mut reader, "badges", "badges.list", json!({}));
    assert_eq!(badges["badges"].as_array().expect("badges").len(), 3);
}

#[test]
fn concurrent_selects_of_a_fresh_workspace_seed_once() {
    let workspace = temp_dir("ecotask-seed-concurrent-select");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    // All selects go out before any response is read.
    for i in 0..4 {
        let payload = json!({
            "id": format!("ws-{}", i),
            "method": "workspace.select",
            "params": { "path": workspace.to_string_lossy() },
        });
        writeln!(stdin, "{}", payload).expect("write request");
    }
    stdin.flush().expect("flush requests");

    let mut badges = 0;
    let mut tasks = 0;
    for _ in 0..4 {
        let mut line = String::new();
        reader.read_line(&mut line).expect("read response line");
        let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response");
        assert_eq!(value["ok"].as_bool(), Some(true), "select failed: {}", value);
        badges += value["result"]["seeded"]["badges"].as_u64().unwrap_or_default();
        tasks += value["result"]["seeded"]["tasks"].as_u64().unwrap_or_default();
    }
    assert_eq!((badges, tasks), (3, 3));
    assert_eq!(table_count(&workspace, "badges"), 3);
    assert_eq!(table_count(&workspace, "eco_tasks"), 3);
}
