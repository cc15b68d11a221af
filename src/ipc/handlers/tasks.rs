use serde::Deserialize;
use serde_json::json;

use crate::badges;
use crate::error::EngineError;
use crate::ipc::helpers::{bool_param, opt_str_param, str_param, with_conn};
use crate::ipc::types::{AppState, Request};
use crate::models::{EcoTask, QuizQuestion};
use crate::tasks::{self, NewQuestion, NewTask};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionParams {
    question_text: String,
    option_a: String,
    option_b: String,
    option_c: String,
    correct_answer: String,
}

// Students see the options but never the correct letter unless includeAnswers is set.
fn question_json(q: &QuizQuestion, include_answers: bool) -> serde_json::Value {
    let mut v = json!({
        "id": q.id,
        "position": q.position,
        "questionText": q.question_text,
        "optionA": q.option_a,
        "optionB": q.option_b,
        "optionC": q.option_c,
    });
    if include_answers {
        v["correctAnswer"] = json!(q.correct_answer.as_str());
    }
    v
}

fn task_json(task: &EcoTask, include_answers: bool) -> serde_json::Value {
    let questions: Vec<serde_json::Value> = task
        .questions
        .iter()
        .map(|q| question_json(q, include_answers))
        .collect();
    json!({
        "id": task.id,
        "title": task.title,
        "description": task.description,
        "pointsReward": task.points_reward,
        "taskType": task.task_type.as_str(),
        "createdAt": task.created_at,
        "questions": questions,
    })
}

fn handle_tasks_list(state: &AppState, req: &Request) -> serde_json::Value {
    with_conn(state, req, |conn| {
        let include_answers = bool_param(req, "includeAnswers", false)?;
        let tasks: Vec<serde_json::Value> = tasks::list_tasks(conn)?
            .iter()
            .map(|t| task_json(t, include_answers))
            .collect();
        Ok(json!({ "tasks": tasks }))
    })
}

fn handle_tasks_get(state: &AppState, req: &Request) -> serde_json::Value {
    with_conn(state, req, |conn| {
        let task_id = str_param(req, "taskId")?;
        let include_answers = bool_param(req, "includeAnswers", false)?;
        let task = tasks::get_task(conn, &task_id)?;
        Ok(json!({ "task": task_json(&task, include_answers) }))
    })
}

fn parse_new_task(req: &Request) -> Result<NewTask, EngineError> {
    let title = str_param(req, "title")?;
    let description = opt_str_param(req, "description")?.unwrap_or_default();
    let points_reward = req
        .params
        .get("pointsReward")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| EngineError::Validation("params.pointsReward must be an integer".into()))?;
    let task_type = str_param(req, "taskType")?.parse()?;

    let questions = match req.params.get("questions") {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(v) => {
            let raw: Vec<QuestionParams> = serde_json::from_value(v.clone())
                .map_err(|e| EngineError::Validation(format!("params.questions: {e}")))?;
            raw.into_iter()
                .map(|q| {
                    Ok(NewQuestion {
                        correct_answer: q.correct_answer.trim().parse()?,
                        question_text: q.question_text,
                        option_a: q.option_a,
                        option_b: q.option_b,
                        option_c: q.option_c,
                    })
                })
                .collect::<Result<Vec<_>, EngineError>>()?
        }
    };

    Ok(NewTask {
        title,
        description,
        points_reward,
        task_type,
        questions,
    })
}

fn handle_tasks_create(state: &AppState, req: &Request) -> serde_json::Value {
    with_conn(state, req, |conn| {
        let task = tasks::create_task(conn, parse_new_task(req)?)?;
        Ok(json!({ "taskId": task.id, "task": task_json(&task, true) }))
    })
}

fn handle_badges_list(state: &AppState, req: &Request) -> serde_json::Value {
    with_conn(state, req, |conn| {
        let badges = badges::list_badges(conn)?;
        Ok(json!({ "badges": badges }))
    })
}

pub fn try_handle(state: &AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "tasks.list" => Some(handle_tasks_list(state, req)),
        "tasks.get" => Some(handle_tasks_get(state, req)),
        "tasks.create" => Some(handle_tasks_create(state, req)),
        "badges.list" => Some(handle_badges_list(state, req)),
        _ => None,
    }
}
