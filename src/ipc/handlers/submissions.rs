use serde_json::json;

use crate::error::{EngineError, EngineResult};
use crate::grading::{self, QuizAnswers};
use crate::ipc::helpers::{str_param, with_conn};
use crate::ipc::types::{AppState, Request};
use crate::ledger;
use crate::models::{ReviewDecision, SubmissionStatus};

/// `params.answers` must be an object mapping question ids to option letters.
fn parse_answers(req: &Request) -> EngineResult<QuizAnswers> {
    let Some(raw) = req.params.get("answers") else {
        return Err(EngineError::Validation("missing params.answers".into()));
    };
    let Some(map) = raw.as_object() else {
        return Err(EngineError::Validation(
            "params.answers must be an object of questionId -> option".into(),
        ));
    };
    map.iter()
        .map(|(question_id, v)| match v.as_str() {
            Some(option) => Ok((question_id.clone(), option.trim().to_string())),
            None => Err(EngineError::Validation(format!(
                "params.answers.{question_id} must be a string"
            ))),
        })
        .collect()
}

fn handle_submit_photo(state: &AppState, req: &Request) -> serde_json::Value {
    with_conn(state, req, |conn| {
        let student_id = str_param(req, "studentId")?;
        let task_id = str_param(req, "taskId")?;
        let submission = grading::submit_photo(conn, &student_id, &task_id)?;
        Ok(json!({
            "message": "Submission received and awaiting teacher approval.",
            "submissionId": submission.id,
        }))
    })
}

fn handle_submit_quiz(state: &AppState, req: &Request) -> serde_json::Value {
    with_conn(state, req, |conn| {
        let student_id = str_param(req, "studentId")?;
        let task_id = str_param(req, "taskId")?;
        let answers = parse_answers(req)?;
        let outcome = grading::evaluate_quiz(conn, &student_id, &task_id, &answers)?;
        Ok(json!({
            "message": format!("Quiz submitted! You scored {}/{}.", outcome.score, outcome.total),
            "score": outcome.score,
            "total": outcome.total,
            "status": outcome.status().as_str(),
            "submissionId": outcome.submission.id,
            "pointsAwarded": outcome.points_awarded,
            "badgesAwarded": outcome.badges_awarded,
        }))
    })
}

fn handle_review(state: &AppState, req: &Request) -> serde_json::Value {
    with_conn(state, req, |conn| {
        let submission_id = str_param(req, "submissionId")?;
        let decision: ReviewDecision = str_param(req, "decision")?.trim().parse()?;
        let outcome = grading::review_submission(conn, &submission_id, decision)?;
        let message = match outcome.status {
            SubmissionStatus::Approved => "Submission approved and points awarded.",
            _ => "Submission rejected.",
        };
        Ok(json!({
            "message": message,
            "submissionId": outcome.submission_id,
            "studentId": outcome.student_id,
            "status": outcome.status.as_str(),
            "pointsAwarded": outcome.points_awarded,
            "badgesAwarded": outcome.badges_awarded,
        }))
    })
}

fn handle_list_pending(state: &AppState, req: &Request) -> serde_json::Value {
    with_conn(state, req, |conn| {
        let teacher_id = str_param(req, "teacherId")?;
        let submissions = ledger::pending_for_teacher(conn, &teacher_id)?;
        Ok(json!({ "submissions": submissions }))
    })
}

fn handle_list_for_student(state: &AppState, req: &Request) -> serde_json::Value {
    with_conn(state, req, |conn| {
        let student_id = str_param(req, "studentId")?;
        crate::registry::get_student(conn, &student_id)?;
        let submissions = ledger::submissions_for_student(conn, &student_id)?;
        Ok(json!({ "submissions": submissions }))
    })
}

pub fn try_handle(state: &AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "submissions.submitPhoto" => Some(handle_submit_photo(state, req)),
        "submissions.submitQuiz" => Some(handle_submit_quiz(state, req)),
        "submissions.review" => Some(handle_review(state, req)),
        "submissions.listPending" => Some(handle_list_pending(state, req)),
        "submissions.listForStudent" => Some(handle_list_for_student(state, req)),
        _ => None,
    }
}
