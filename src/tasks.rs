use rusqlite::{Connection, OptionalExtension};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::now_rfc3339;
use crate::error::{EngineError, EngineResult};
use crate::models::{AnswerOption, EcoTask, QuizQuestion, TaskType};

/// Question as supplied when a task is created.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub correct_answer: AnswerOption,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub points_reward: i64,
    pub task_type: TaskType,
    pub questions: Vec<NewQuestion>,
}

fn questions_for_task(conn: &Connection, task_id: &str) -> rusqlite::Result<Vec<QuizQuestion>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM quiz_questions WHERE task_id = ? ORDER BY position",
        QuizQuestion::COLUMNS
    ))?;
    let rows = stmt.query_map([task_id], QuizQuestion::from_row)?;
    rows.collect()
}

pub fn get_task(conn: &Connection, task_id: &str) -> EngineResult<EcoTask> {
    let mut task = conn
        .query_row(
            &format!("SELECT {} FROM eco_tasks WHERE id = ?", EcoTask::COLUMNS),
            [task_id],
            EcoTask::from_row,
        )
        .optional()?
        .ok_or_else(|| EngineError::not_found("task", task_id))?;
    task.questions = questions_for_task(conn, &task.id)?;
    Ok(task)
}

pub fn list_tasks(conn: &Connection) -> EngineResult<Vec<EcoTask>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM eco_tasks ORDER BY rowid",
        EcoTask::COLUMNS
    ))?;
    let mut tasks = stmt
        .query_map([], EcoTask::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    for task in &mut tasks {
        task.questions = questions_for_task(conn, &task.id)?;
    }
    Ok(tasks)
}

fn validate(task: &NewTask) -> EngineResult<()> {
    if task.title.trim().is_empty() {
        return Err(EngineError::Validation("title must not be empty".into()));
    }
    if task.points_reward <= 0 {
        return Err(EngineError::Validation(
            "pointsReward must be a positive integer".into(),
        ));
    }
    match task.task_type {
        TaskType::PhotoUpload if !task.questions.is_empty() => {
            return Err(EngineError::Validation(
                "photo_upload tasks cannot carry quiz questions".into(),
            ));
        }
        _ => {}
    }
    for (i, q) in task.questions.iter().enumerate() {
        let blank = [&q.question_text, &q.option_a, &q.option_b, &q.option_c]
            .iter()
            .any(|s| s.trim().is_empty());
        if blank {
            return Err(EngineError::Validation(format!(
                "question {} has an empty text or option",
                i + 1
            )));
        }
    }
    Ok(())
}

// Writes the task row and its questions on `conn`. Callers own the transaction.
pub(crate) fn insert_task(conn: &Connection, task: &NewTask) -> rusqlite::Result<String> {
    let task_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO eco_tasks(id, title, description, points_reward, task_type, created_at)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &task_id,
            task.title.trim(),
            task.description.trim(),
            task.points_reward,
            task.task_type,
            now_rfc3339(),
        ),
    )?;
    for (position, q) in task.questions.iter().enumerate() {
        conn.execute(
            "INSERT INTO quiz_questions(
               id, task_id, position, question_text, option_a, option_b, option_c, correct_answer
             ) VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
            (
                Uuid::new_v4().to_string(),
                &task_id,
                position as i64,
                q.question_text.trim(),
                q.option_a.trim(),
                q.option_b.trim(),
                q.option_c.trim(),
                q.correct_answer,
            ),
        )?;
    }
    Ok(task_id)
}

/// Inserts the task and its questions as one unit.
#[instrument(level = "debug", skip(conn, task), fields(title = %task.title, task_type = %task.task_type))]
pub fn create_task(conn: &Connection, task: NewTask) -> EngineResult<EcoTask> {
    validate(&task)?;

    let tx = conn.unchecked_transaction()?;
    let task_id = insert_task(&tx, &task)?;
    tx.commit()?;

    info!(target: "registry", %task_id, questions = task.questions.len(), "task created");
    get_task(conn, &task_id)
}
