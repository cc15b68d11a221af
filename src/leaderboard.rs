use rusqlite::Connection;

use crate::error::EngineResult;
use crate::models::Student;

/// Top `limit` students by points. Equal scores keep registration order (rowid).
pub fn top_students(conn: &Connection, limit: usize) -> EngineResult<Vec<Student>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM students ORDER BY points DESC, rowid ASC LIMIT ?",
        Student::COLUMNS
    ))?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt.query_map([limit], Student::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
