use serde_json::json;

use crate::ipc::helpers::{opt_u64_param, with_conn};
use crate::ipc::types::{AppState, Request};
use crate::models::StudentProfile;
use crate::{badges, leaderboard};

fn handle_leaderboard(state: &AppState, req: &Request) -> serde_json::Value {
    with_conn(state, req, |conn| {
        let limit = opt_u64_param(req, "limit")?
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
            .unwrap_or(state.config.leaderboard_limit);
        let mut students = Vec::new();
        for student in leaderboard::top_students(conn, limit)? {
            let badges = badges::badges_for_student(conn, &student.id)?;
            students.push(StudentProfile { student, badges });
        }
        Ok(json!({ "students": students }))
    })
}

pub fn try_handle(state: &AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "leaderboard" => Some(handle_leaderboard(state, req)),
        _ => None,
    }
}
