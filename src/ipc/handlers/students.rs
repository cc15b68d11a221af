use serde_json::json;

use crate::ipc::helpers::{str_param, with_conn};
use crate::ipc::types::{AppState, Request};
use crate::registry;

fn handle_teachers_create(state: &AppState, req: &Request) -> serde_json::Value {
    with_conn(state, req, |conn| {
        let email = str_param(req, "email")?;
        let full_name = str_param(req, "fullName")?;
        let teacher = registry::create_teacher(conn, &email, &full_name)?;
        Ok(json!({ "teacherId": teacher.id }))
    })
}

fn handle_teachers_lookup(state: &AppState, req: &Request) -> serde_json::Value {
    with_conn(state, req, |conn| {
        let email = str_param(req, "email")?;
        let teacher = registry::lookup_teacher_by_email(conn, &email)?;
        Ok(json!({ "teacher": teacher }))
    })
}

fn handle_students_register(state: &AppState, req: &Request) -> serde_json::Value {
    with_conn(state, req, |conn| {
        let teacher_id = str_param(req, "teacherId")?;
        let id_card = str_param(req, "idCard")?;
        let full_name = str_param(req, "fullName")?;
        let class_name = str_param(req, "className")?;
        let student =
            registry::register_student(conn, &teacher_id, &id_card, &full_name, &class_name)?;
        Ok(json!({ "studentId": student.id }))
    })
}

fn handle_students_get(state: &AppState, req: &Request) -> serde_json::Value {
    with_conn(state, req, |conn| {
        let student_id = str_param(req, "studentId")?;
        let profile = registry::student_profile(conn, &student_id)?;
        Ok(json!({ "student": profile }))
    })
}

fn handle_students_lookup_by_id_card(state: &AppState, req: &Request) -> serde_json::Value {
    with_conn(state, req, |conn| {
        let id_card = str_param(req, "idCard")?;
        let student = registry::get_student_by_id_card(conn, &id_card)?;
        Ok(json!({ "student": student }))
    })
}

fn handle_students_list(state: &AppState, req: &Request) -> serde_json::Value {
    with_conn(state, req, |conn| {
        let teacher_id = str_param(req, "teacherId")?;
        let students = registry::students_for_teacher(conn, &teacher_id)?;
        Ok(json!({ "students": students }))
    })
}

pub fn try_handle(state: &AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "teachers.create" => Some(handle_teachers_create(state, req)),
        "teachers.lookup" => Some(handle_teachers_lookup(state, req)),
        "students.register" => Some(handle_students_register(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "students.lookupByIdCard" => Some(handle_students_lookup_by_id_card(state, req)),
        "students.list" => Some(handle_students_list(state, req)),
        _ => None,
    }
}
