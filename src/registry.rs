use rusqlite::{Connection, OptionalExtension};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::badges;
use crate::db::{now_rfc3339, write_tx};
use crate::error::{EngineError, EngineResult};
use crate::models::{Student, StudentProfile, Teacher};

fn require_non_empty(field: &str, value: &str) -> EngineResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(EngineError::Validation(format!("{field} must not be empty")));
    }
    Ok(v.to_string())
}

#[instrument(level = "debug", skip(conn))]
pub fn create_teacher(conn: &Connection, email: &str, full_name: &str) -> EngineResult<Teacher> {
    let email = require_non_empty("email", email)?;
    let full_name = require_non_empty("fullName", full_name)?;

    // The uniqueness check and the insert share one write transaction.
    let tx = write_tx(conn)?;
    let taken: Option<i64> = tx
        .query_row("SELECT 1 FROM teachers WHERE email = ?", [&email], |r| r.get(0))
        .optional()?;
    if taken.is_some() {
        return Err(EngineError::Conflict(format!(
            "email already registered: {email}"
        )));
    }

    let teacher = Teacher {
        id: Uuid::new_v4().to_string(),
        email,
        full_name,
        created_at: now_rfc3339(),
    };
    tx.execute(
        "INSERT INTO teachers(id, email, full_name, created_at) VALUES(?, ?, ?, ?)",
        (&teacher.id, &teacher.email, &teacher.full_name, &teacher.created_at),
    )?;
    tx.commit()?;
    info!(target: "registry", teacher_id = %teacher.id, "teacher created");
    Ok(teacher)
}

pub fn get_teacher(conn: &Connection, teacher_id: &str) -> EngineResult<Teacher> {
    conn.query_row(
        &format!("SELECT {} FROM teachers WHERE id = ?", Teacher::COLUMNS),
        [teacher_id],
        Teacher::from_row,
    )
    .optional()?
    .ok_or_else(|| EngineError::not_found("teacher", teacher_id))
}

pub fn lookup_teacher_by_email(conn: &Connection, email: &str) -> EngineResult<Teacher> {
    let email = email.trim();
    conn.query_row(
        &format!("SELECT {} FROM teachers WHERE email = ?", Teacher::COLUMNS),
        [email],
        Teacher::from_row,
    )
    .optional()?
    .ok_or_else(|| EngineError::not_found("teacher", email))
}

/// Registers a student under `teacher_id`. The id card is unique across all teachers.
#[instrument(level = "debug", skip(conn, full_name, class_name))]
pub fn register_student(
    conn: &Connection,
    teacher_id: &str,
    id_card: &str,
    full_name: &str,
    class_name: &str,
) -> EngineResult<Student> {
    let id_card = require_non_empty("idCard", id_card)?;
    let full_name = require_non_empty("fullName", full_name)?;
    let class_name = class_name.trim().to_string();

    let tx = write_tx(conn)?;
    get_teacher(&tx, teacher_id)?;

    let taken: Option<String> = tx
        .query_row(
            "SELECT teacher_id FROM students WHERE id_card = ?",
            [&id_card],
            |r| r.get(0),
        )
        .optional()?;
    if let Some(owner) = taken {
        warn!(target: "registry", %id_card, %owner, "duplicate id card");
        return Err(EngineError::Conflict(format!(
            "student id card already registered: {id_card}"
        )));
    }

    let student = Student {
        id: Uuid::new_v4().to_string(),
        id_card,
        full_name,
        class_name,
        teacher_id: teacher_id.to_string(),
        points: 0,
        created_at: now_rfc3339(),
    };
    tx.execute(
        "INSERT INTO students(id, id_card, full_name, class_name, teacher_id, points, created_at)
         VALUES(?, ?, ?, ?, ?, 0, ?)",
        (
            &student.id,
            &student.id_card,
            &student.full_name,
            &student.class_name,
            &student.teacher_id,
            &student.created_at,
        ),
    )?;
    tx.commit()?;
    info!(target: "registry", student_id = %student.id, %teacher_id, "student registered");
    Ok(student)
}

pub fn get_student(conn: &Connection, student_id: &str) -> EngineResult<Student> {
    conn.query_row(
        &format!("SELECT {} FROM students WHERE id = ?", Student::COLUMNS),
        [student_id],
        Student::from_row,
    )
    .optional()?
    .ok_or_else(|| EngineError::not_found("student", student_id))
}

pub fn get_student_by_id_card(conn: &Connection, id_card: &str) -> EngineResult<Student> {
    let id_card = id_card.trim();
    conn.query_row(
        &format!("SELECT {} FROM students WHERE id_card = ?", Student::COLUMNS),
        [id_card],
        Student::from_row,
    )
    .optional()?
    .ok_or_else(|| EngineError::not_found("student", id_card))
}

pub fn students_for_teacher(conn: &Connection, teacher_id: &str) -> EngineResult<Vec<Student>> {
    get_teacher(conn, teacher_id)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM students WHERE teacher_id = ? ORDER BY rowid",
        Student::COLUMNS
    ))?;
    let rows = stmt.query_map([teacher_id], Student::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn student_profile(conn: &Connection, student_id: &str) -> EngineResult<StudentProfile> {
    let student = get_student(conn, student_id)?;
    let badges = badges::badges_for_student(conn, &student.id)?;
    Ok(StudentProfile { student, badges })
}

/// Adds an award to the balance. Only the grading engine calls this, inside its transaction.
pub(crate) fn add_points(conn: &Connection, student_id: &str, points: i64) -> EngineResult<()> {
    let changed = conn.execute(
        "UPDATE students SET points = points + ? WHERE id = ?",
        (points, student_id),
    )?;
    if changed == 0 {
        return Err(EngineError::not_found("student", student_id));
    }
    Ok(())
}
