use anyhow::Context;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DB_FILE_NAME: &str = "ecotask.sqlite3";

pub fn db_path(workspace: &Path) -> PathBuf {
    workspace.join(DB_FILE_NAME)
}

/// Opens (creating if needed) the workspace database and brings the schema up to date.
pub fn open_db(workspace: &Path, busy_timeout: Duration) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace directory {}",
            workspace.to_string_lossy()
        )
    })?;
    let conn = connect(workspace, busy_timeout)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Per-request connection to an already initialized workspace.
pub fn connect(workspace: &Path, busy_timeout: Duration) -> anyhow::Result<Connection> {
    let path = db_path(workspace);
    let conn = Connection::open(&path)
        .with_context(|| format!("failed to open database {}", path.to_string_lossy()))?;
    configure(&conn, busy_timeout)?;
    Ok(conn)
}

pub fn configure(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    // WAL lets readers proceed while a review transaction holds the write lock.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

/// `BEGIN IMMEDIATE`: takes the write lock before the first read, so check-then-write sequences
/// from concurrent connections serialize instead of racing.
pub fn write_tx(conn: &Connection) -> rusqlite::Result<Transaction<'_>> {
    Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
}

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS teachers(
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            id_card TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL,
            class_name TEXT NOT NULL,
            teacher_id TEXT NOT NULL,
            points INTEGER NOT NULL DEFAULT 0 CHECK(points >= 0),
            created_at TEXT NOT NULL,
            FOREIGN KEY(teacher_id) REFERENCES teachers(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_teacher ON students(teacher_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_points ON students(points)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS badges(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL,
            icon TEXT NOT NULL
        )",
        [],
    )?;

    // One row per (student, badge): the primary key is what makes awards idempotent.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS student_badges(
            student_id TEXT NOT NULL,
            badge_id TEXT NOT NULL,
            awarded_at TEXT NOT NULL,
            PRIMARY KEY(student_id, badge_id),
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(badge_id) REFERENCES badges(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS eco_tasks(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            points_reward INTEGER NOT NULL CHECK(points_reward > 0),
            task_type TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS quiz_questions(
            id TEXT PRIMARY KEY,
            task_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            question_text TEXT NOT NULL,
            option_a TEXT NOT NULL,
            option_b TEXT NOT NULL,
            option_c TEXT NOT NULL,
            correct_answer TEXT NOT NULL,
            FOREIGN KEY(task_id) REFERENCES eco_tasks(id),
            UNIQUE(task_id, position)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_quiz_questions_task ON quiz_questions(task_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS submissions(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            task_id TEXT NOT NULL,
            submission_data TEXT NOT NULL,
            status TEXT NOT NULL,
            submitted_at TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(task_id) REFERENCES eco_tasks(id)
        )",
        [],
    )?;
    ensure_submissions_reviewed_at(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_submissions_student ON submissions(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_submissions_status ON submissions(status)",
        [],
    )?;

    Ok(())
}

// Workspaces created before manual review timestamps existed lack the column.
fn ensure_submissions_reviewed_at(conn: &Connection) -> rusqlite::Result<()> {
    if table_has_column(conn, "submissions", "reviewed_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE submissions ADD COLUMN reviewed_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// In-memory database with the full schema, for unit tests.
#[cfg(test)]
pub fn open_in_memory() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.pragma_update(None, "foreign_keys", "ON")
        .expect("foreign keys");
    init_schema(&conn).expect("schema");
    conn
}
