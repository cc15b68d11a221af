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
    let exe = env!("CARGO_BIN_EXE_ecotaskd");
    let mut child = Command::new(exe)
        .env_remove("ECOTASKD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn ecotaskd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request_ok(
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
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn find_task(tasks: &serde_json::Value, title: &str) -> serde_json::Value {
    tasks
        .get("tasks")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .find(|t| t.get("title").and_then(|v| v.as_str()) == Some(title))
        .expect("seeded task")
}

/// Selects `workspace` and registers one teacher with one student. Returns (teacherId, studentId).
fn setup_roster(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    workspace: &std::path::Path,
) -> (String, String) {
    request_ok(
        stdin,
        reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let teacher = request_ok(
        stdin,
        reader,
        "teacher",
        "teachers.create",
        json!({ "email": "green@school.org", "fullName": "Ms Green" }),
    );
    let teacher_id = teacher["teacherId"].as_str().expect("teacherId").to_string();
    let student = request_ok(
        stdin,
        reader,
        "student",
        "students.register",
        json!({ "teacherId": teacher_id, "idCard": "S-001", "fullName": "Ana", "className": "5B" }),
    );
    let student_id = student["studentId"].as_str().expect("studentId").to_string();
    (teacher_id, student_id)
}

fn quiz_answers(listed: &serde_json::Value, perfect: bool) -> (String, serde_json::Value) {
    let quiz = find_task(listed, "Water Saver Quiz");
    let questions = quiz["questions"].as_array().expect("questions");
    let q1 = questions[0]["id"].as_str().expect("q1").to_string();
    let q2 = questions[1]["id"].as_str().expect("q2").to_string();
    let second = if perfect { "C" } else { "A" };
    (
        quiz["id"].as_str().expect("quiz id").to_string(),
        json!({ q1: "B", q2: second }),
    )
}

#[test]
fn balance_equals_sum_of_approved_rewards() {
    let workspace = temp_dir("ecotask-points-ledger");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let (_teacher_id, student_id) = setup_roster(&mut stdin, &mut reader, &workspace);
    let listed = request_ok(&mut stdin, &mut reader, "list", "tasks.list", json!({}));

    let (quiz_id, good) = quiz_answers(&listed, true);
    let (_, bad) = quiz_answers(&listed, false);
    for (i, answers) in [good.clone(), bad, good].into_iter().enumerate() {
        request_ok(
            &mut stdin,
            &mut reader,
            &format!("quiz-{}", i),
            "submissions.submitQuiz",
            json!({ "studentId": student_id, "taskId": quiz_id, "answers": answers }),
        );
    }

    let mut photos = Vec::new();
    for (i, title) in ["Tree Planting Hero", "Waste Segregation Champion", "Tree Planting Hero"]
        .into_iter()
        .enumerate()
    {
        let task_id = find_task(&listed, title)["id"]
            .as_str()
            .expect("task id")
            .to_string();
        let resp = request_ok(
            &mut stdin,
            &mut reader,
            &format!("photo-{}", i),
            "submissions.submitPhoto",
            json!({ "studentId": student_id, "taskId": task_id }),
        );
        photos.push(resp["submissionId"].as_str().expect("id").to_string());
    }
    // One approved, one rejected, one left pending.
    request_ok(
        &mut stdin,
        &mut reader,
        "approve",
        "submissions.review",
        json!({ "submissionId": photos[0], "decision": "approve" }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "reject",
        "submissions.review",
        json!({ "submissionId": photos[1], "decision": "reject" }),
    );

    let profile = request_ok(
        &mut stdin,
        &mut reader,
        "profile",
        "students.get",
        json!({ "studentId": student_id }),
    );
    assert_eq!(profile["student"]["points"].as_i64(), Some(25 + 25 + 100));

    let conn = Connection::open(workspace.join("ecotask.sqlite3")).expect("open db");
    let (points, approved_sum): (i64, i64) = conn
        .query_row(
            "SELECT st.points,
                    (SELECT COALESCE(SUM(t.points_reward), 0)
                     FROM submissions s JOIN eco_tasks t ON t.id = s.task_id
                     WHERE s.student_id = st.id AND s.status = 'approved')
             FROM students st WHERE st.id = ?",
            [&student_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .expect("ledger sums");
    assert_eq!(points, approved_sum);

    let pending: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM submissions WHERE student_id = ? AND status = 'pending'",
            [&student_id],
            |r| r.get(0),
        )
        .expect("pending count");
    assert_eq!(pending, 1);
}
