use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::db::now_rfc3339;
use crate::models::Badge;

pub const FIRST_STEPS: &str = "First Steps";
pub const ECO_WARRIOR: &str = "Eco Warrior";
pub const QUIZ_WHIZ: &str = "Quiz Whiz";

pub fn get_badge_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Option<Badge>> {
    conn.query_row(
        &format!("SELECT {} FROM badges WHERE name = ?", Badge::COLUMNS),
        [name],
        Badge::from_row,
    )
    .optional()
}

pub fn list_badges(conn: &Connection) -> rusqlite::Result<Vec<Badge>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM badges ORDER BY rowid",
        Badge::COLUMNS
    ))?;
    let rows = stmt.query_map([], Badge::from_row)?;
    rows.collect()
}

pub fn badges_for_student(conn: &Connection, student_id: &str) -> rusqlite::Result<Vec<Badge>> {
    let mut stmt = conn.prepare(
        "SELECT b.id, b.name, b.description, b.icon
         FROM student_badges sb
         JOIN badges b ON b.id = sb.badge_id
         WHERE sb.student_id = ?
         ORDER BY sb.rowid",
    )?;
    let rows = stmt.query_map([student_id], Badge::from_row)?;
    rows.collect()
}

/// Adds `badge` to the student's set. Returns `false` without writing when already held.
pub fn award_badge(conn: &Connection, student_id: &str, badge: &Badge) -> rusqlite::Result<bool> {
    let held: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM student_badges WHERE student_id = ? AND badge_id = ?",
            (student_id, &badge.id),
            |r| r.get(0),
        )
        .optional()?;
    if held.is_some() {
        debug!(target: "grading", %student_id, badge = %badge.name, "badge already held");
        return Ok(false);
    }

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO student_badges(student_id, badge_id, awarded_at) VALUES(?, ?, ?)",
        (student_id, &badge.id, now_rfc3339()),
    )?;
    if inserted == 1 {
        info!(target: "grading", %student_id, badge = %badge.name, "badge awarded");
    }
    Ok(inserted == 1)
}

/// Catalog lookup followed by `award_badge`. A name missing from the catalog is skipped.
pub fn award_badge_by_name(
    conn: &Connection,
    student_id: &str,
    name: &str,
) -> rusqlite::Result<bool> {
    match get_badge_by_name(conn, name)? {
        Some(badge) => award_badge(conn, student_id, &badge),
        None => {
            debug!(target: "grading", badge = %name, "badge not in catalog; skipped");
            Ok(false)
        }
    }
}

/// Awards each named badge in order and returns the names that were newly granted.
pub fn award_badges_by_name(
    conn: &Connection,
    student_id: &str,
    names: &[&str],
) -> rusqlite::Result<Vec<String>> {
    let mut granted = Vec::new();
    for name in names {
        if award_badge_by_name(conn, student_id, name)? {
            granted.push((*name).to_string());
        }
    }
    Ok(granted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, registry, seed};

    fn setup() -> (Connection, String) {
        let conn = db::open_in_memory();
        seed::ensure_initial_data(&conn).expect("seed");
        let teacher = registry::create_teacher(&conn, "t@example.org", "Ms Green").expect("teacher");
        let student =
            registry::register_student(&conn, &teacher.id, "ID-1", "Ana", "5B").expect("student");
        (conn, student.id)
    }

    #[test]
    fn awarding_twice_keeps_one_row() {
        let (conn, student_id) = setup();
        let badge = get_badge_by_name(&conn, ECO_WARRIOR).unwrap().expect("seeded");

        assert!(award_badge(&conn, &student_id, &badge).unwrap());
        assert!(!award_badge(&conn, &student_id, &badge).unwrap());

        let held = badges_for_student(&conn, &student_id).unwrap();
        assert_eq!(held, vec![badge]);
    }

    #[test]
    fn missing_catalog_entry_is_a_no_op() {
        let (conn, student_id) = setup();
        assert!(!award_badge_by_name(&conn, &student_id, "Moon Walker").unwrap());
        assert!(badges_for_student(&conn, &student_id).unwrap().is_empty());
    }

    #[test]
    fn batch_award_reports_only_new_grants() {
        let (conn, student_id) = setup();
        let first = award_badges_by_name(&conn, &student_id, &[ECO_WARRIOR, FIRST_STEPS]).unwrap();
        assert_eq!(first, vec![ECO_WARRIOR.to_string(), FIRST_STEPS.to_string()]);
        let second = award_badges_by_name(&conn, &student_id, &[QUIZ_WHIZ, FIRST_STEPS]).unwrap();
        assert_eq!(second, vec![QUIZ_WHIZ.to_string()]);
        assert_eq!(badges_for_student(&conn, &student_id).unwrap().len(), 3);
    }
}
