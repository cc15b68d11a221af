use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::now_rfc3339;
use crate::error::{EngineError, EngineResult};
use crate::models::{PendingSubmission, Submission, SubmissionStatus};

pub const PHOTO_PLACEHOLDER: &str = "Photo awaiting review";

pub fn quiz_score_data(score: usize, total: usize) -> String {
    format!("Score: {score}/{total}")
}

pub fn insert_submission(
    conn: &Connection,
    student_id: &str,
    task_id: &str,
    submission_data: &str,
    status: SubmissionStatus,
) -> rusqlite::Result<Submission> {
    let submission = Submission {
        id: Uuid::new_v4().to_string(),
        student_id: student_id.to_string(),
        task_id: task_id.to_string(),
        submission_data: submission_data.to_string(),
        status,
        submitted_at: now_rfc3339(),
        reviewed_at: None,
    };
    conn.execute(
        "INSERT INTO submissions(id, student_id, task_id, submission_data, status, submitted_at)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &submission.id,
            &submission.student_id,
            &submission.task_id,
            &submission.submission_data,
            submission.status,
            &submission.submitted_at,
        ),
    )?;
    Ok(submission)
}

pub fn get_submission(conn: &Connection, submission_id: &str) -> EngineResult<Submission> {
    conn.query_row(
        &format!("SELECT {} FROM submissions WHERE id = ?", Submission::COLUMNS),
        [submission_id],
        Submission::from_row,
    )
    .optional()?
    .ok_or_else(|| EngineError::not_found("submission", submission_id))
}

/// Pending submission plus the reward of its task, if the submission is still pending.
pub(crate) fn pending_with_reward(
    conn: &Connection,
    submission_id: &str,
) -> rusqlite::Result<Option<(Submission, i64)>> {
    conn.query_row(
        "SELECT s.id, s.student_id, s.task_id, s.submission_data, s.status, s.submitted_at,
                s.reviewed_at, t.points_reward
         FROM submissions s
         JOIN eco_tasks t ON t.id = s.task_id
         WHERE s.id = ? AND s.status = 'pending'",
        [submission_id],
        |row| Ok((Submission::from_row(row)?, row.get::<_, i64>(7)?)),
    )
    .optional()
}

/// Flips a pending submission to `status`. Returns `false` when the row was not pending, so the
/// caller can tell it lost a race without re-reading.
pub(crate) fn decide(
    conn: &Connection,
    submission_id: &str,
    status: SubmissionStatus,
) -> rusqlite::Result<bool> {
    debug_assert!(status.is_terminal());
    let changed = conn.execute(
        "UPDATE submissions SET status = ?, reviewed_at = ? WHERE id = ? AND status = 'pending'",
        (status, now_rfc3339(), submission_id),
    )?;
    Ok(changed == 1)
}

pub fn pending_for_teacher(
    conn: &Connection,
    teacher_id: &str,
) -> EngineResult<Vec<PendingSubmission>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, st.id, st.full_name, t.id, t.title, s.submission_data, s.submitted_at
         FROM submissions s
         JOIN students st ON st.id = s.student_id
         JOIN eco_tasks t ON t.id = s.task_id
         WHERE st.teacher_id = ? AND s.status = 'pending'
         ORDER BY s.submitted_at, s.rowid",
    )?;
    let rows = stmt.query_map([teacher_id], |row| {
        Ok(PendingSubmission {
            id: row.get(0)?,
            student_id: row.get(1)?,
            student_name: row.get(2)?,
            task_id: row.get(3)?,
            task_title: row.get(4)?,
            submission_data: row.get(5)?,
            submitted_at: row.get(6)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn submissions_for_student(
    conn: &Connection,
    student_id: &str,
) -> EngineResult<Vec<Submission>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM submissions WHERE student_id = ? ORDER BY submitted_at DESC, rowid DESC",
        Submission::COLUMNS
    ))?;
    let rows = stmt.query_map([student_id], Submission::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
