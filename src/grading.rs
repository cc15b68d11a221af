use rusqlite::Connection;
use std::collections::HashMap;
use tracing::{info, instrument, warn};

use crate::badges::{self, ECO_WARRIOR, FIRST_STEPS, QUIZ_WHIZ};
use crate::db::write_tx;
use crate::error::{EngineError, EngineResult};
use crate::ledger::{self, PHOTO_PLACEHOLDER};
use crate::models::{
    AnswerOption, QuizQuestion, ReviewDecision, Submission, SubmissionStatus, TaskType,
};
use crate::{registry, tasks};

pub const ALREADY_PROCESSED: &str = "Submission not found or already processed.";

const QUIZ_BADGES: [&str; 2] = [QUIZ_WHIZ, FIRST_STEPS];
const PHOTO_BADGES: [&str; 2] = [ECO_WARRIOR, FIRST_STEPS];

/// Chosen option per question id, as submitted by the student.
pub type QuizAnswers = HashMap<String, String>;

#[derive(Debug, Clone)]
pub struct QuizOutcome {
    pub submission: Submission,
    pub score: usize,
    pub total: usize,
    pub points_awarded: i64,
    pub badges_awarded: Vec<String>,
}

impl QuizOutcome {
    pub fn status(&self) -> SubmissionStatus {
        self.submission.status
    }
}

#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub submission_id: String,
    pub student_id: String,
    pub status: SubmissionStatus,
    pub points_awarded: i64,
    pub badges_awarded: Vec<String>,
}

/// Counts questions whose submitted answer equals the correct one. Missing or unrecognized
/// answers count as wrong; answers for questions outside the task are ignored.
pub fn score_answers(questions: &[QuizQuestion], answers: &QuizAnswers) -> (usize, usize) {
    let score = questions
        .iter()
        .filter(|q| {
            answers
                .get(&q.id)
                .and_then(|a| a.parse::<AnswerOption>().ok())
                == Some(q.correct_answer)
        })
        .count();
    (score, questions.len())
}

/// Only a perfect score passes; there is no partial credit.
pub fn quiz_status(score: usize, total: usize) -> SubmissionStatus {
    if score == total {
        SubmissionStatus::Approved
    } else {
        SubmissionStatus::Rejected
    }
}

#[instrument(level = "debug", skip(conn, answers), fields(answers = answers.len()))]
pub fn evaluate_quiz(
    conn: &Connection,
    student_id: &str,
    task_id: &str,
    answers: &QuizAnswers,
) -> EngineResult<QuizOutcome> {
    let task = tasks::get_task(conn, task_id)?;
    if task.task_type != TaskType::Quiz {
        return Err(EngineError::Validation(format!(
            "task {} is not a quiz",
            task.id
        )));
    }

    let (score, total) = score_answers(&task.questions, answers);
    let status = quiz_status(score, total);

    let tx = write_tx(conn)?;
    registry::get_student(&tx, student_id)?;
    let submission = ledger::insert_submission(
        &tx,
        student_id,
        &task.id,
        &ledger::quiz_score_data(score, total),
        status,
    )?;

    let mut points_awarded = 0;
    let mut badges_awarded = Vec::new();
    if status == SubmissionStatus::Approved {
        registry::add_points(&tx, student_id, task.points_reward)?;
        points_awarded = task.points_reward;
        badges_awarded = badges::award_badges_by_name(&tx, student_id, &QUIZ_BADGES)?;
    }
    tx.commit()?;

    info!(
        target: "grading",
        %student_id,
        task_id = %task.id,
        score,
        total,
        %status,
        points_awarded,
        "quiz graded"
    );
    Ok(QuizOutcome {
        submission,
        score,
        total,
        points_awarded,
        badges_awarded,
    })
}

/// Records a photo proof as pending. Points and badges wait for the teacher's review.
#[instrument(level = "debug", skip(conn))]
pub fn submit_photo(conn: &Connection, student_id: &str, task_id: &str) -> EngineResult<Submission> {
    let task = tasks::get_task(conn, task_id)?;
    if task.task_type != TaskType::PhotoUpload {
        return Err(EngineError::Validation(format!(
            "task {} does not take photo submissions",
            task.id
        )));
    }
    registry::get_student(conn, student_id)?;

    let submission = ledger::insert_submission(
        conn,
        student_id,
        &task.id,
        PHOTO_PLACEHOLDER,
        SubmissionStatus::Pending,
    )?;
    info!(target: "grading", %student_id, task_id = %task.id, submission_id = %submission.id, "photo submitted");
    Ok(submission)
}

/// Decides a pending submission. Anything not pending, including ids that never existed, is a
/// conflict.
#[instrument(level = "debug", skip(conn))]
pub fn review_submission(
    conn: &Connection,
    submission_id: &str,
    decision: ReviewDecision,
) -> EngineResult<ReviewOutcome> {
    // Points, badges and the status flip commit together. A second reviewer blocks on the write
    // lock and then finds the row already decided.
    let tx = write_tx(conn)?;

    let Some((submission, reward)) = ledger::pending_with_reward(&tx, submission_id)? else {
        warn!(target: "grading", %submission_id, "review on missing or decided submission");
        return Err(EngineError::Conflict(ALREADY_PROCESSED.into()));
    };

    let status = decision.resulting_status();
    if !ledger::decide(&tx, &submission.id, status)? {
        return Err(EngineError::Conflict(ALREADY_PROCESSED.into()));
    }

    let mut points_awarded = 0;
    let mut badges_awarded = Vec::new();
    if decision == ReviewDecision::Approve {
        registry::add_points(&tx, &submission.student_id, reward)?;
        points_awarded = reward;
        badges_awarded = badges::award_badges_by_name(&tx, &submission.student_id, &PHOTO_BADGES)?;
    }
    tx.commit()?;

    info!(
        target: "grading",
        %submission_id,
        student_id = %submission.student_id,
        %status,
        points_awarded,
        "submission reviewed"
    );
    Ok(ReviewOutcome {
        submission_id: submission.id,
        student_id: submission.student_id,
        status,
        points_awarded,
        badges_awarded,
    })
}
