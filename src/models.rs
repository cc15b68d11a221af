use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    PhotoUpload,
    Quiz,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::PhotoUpload => "photo_upload",
            TaskType::Quiz => "quiz",
        }
    }
}

impl FromStr for TaskType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "photo_upload" => Ok(TaskType::PhotoUpload),
            "quiz" => Ok(TaskType::Quiz),
            other => Err(EngineError::Validation(format!(
                "unknown task type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, SubmissionStatus::Pending)
    }
}

impl FromStr for SubmissionStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubmissionStatus::Pending),
            "approved" => Ok(SubmissionStatus::Approved),
            "rejected" => Ok(SubmissionStatus::Rejected),
            other => Err(EngineError::Validation(format!(
                "unknown submission status: {other}"
            ))),
        }
    }
}

/// One of the three fixed quiz choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AnswerOption {
    A,
    B,
    C,
}

impl AnswerOption {
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerOption::A => "A",
            AnswerOption::B => "B",
            AnswerOption::C => "C",
        }
    }
}

impl FromStr for AnswerOption {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(AnswerOption::A),
            "B" => Ok(AnswerOption::B),
            "C" => Ok(AnswerOption::C),
            other => Err(EngineError::Validation(format!(
                "answer must be A, B or C (got {other:?})"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn resulting_status(self) -> SubmissionStatus {
        match self {
            ReviewDecision::Approve => SubmissionStatus::Approved,
            ReviewDecision::Reject => SubmissionStatus::Rejected,
        }
    }
}

impl FromStr for ReviewDecision {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(ReviewDecision::Approve),
            "reject" => Ok(ReviewDecision::Reject),
            other => Err(EngineError::Validation(format!(
                "decision must be approve or reject (got {other:?})"
            ))),
        }
    }
}

macro_rules! text_enum_sql {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let s = value.as_str()?;
                s.parse::<$ty>()
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum_sql!(TaskType);
text_enum_sql!(SubmissionStatus);
text_enum_sql!(AnswerOption);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub created_at: String,
}

impl Teacher {
    pub const COLUMNS: &'static str = "id, email, full_name, created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            full_name: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub id_card: String,
    pub full_name: String,
    pub class_name: String,
    pub teacher_id: String,
    pub points: i64,
    pub created_at: String,
}

impl Student {
    pub const COLUMNS: &'static str =
        "id, id_card, full_name, class_name, teacher_id, points, created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            id_card: row.get(1)?,
            full_name: row.get(2)?,
            class_name: row.get(3)?,
            teacher_id: row.get(4)?,
            points: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

/// A student together with the badges they hold.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    #[serde(flatten)]
    pub student: Student,
    pub badges: Vec<Badge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
}

impl Badge {
    pub const COLUMNS: &'static str = "id, name, description, icon";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            icon: row.get(3)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    pub task_id: String,
    pub position: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub correct_answer: AnswerOption,
}

impl QuizQuestion {
    pub const COLUMNS: &'static str =
        "id, task_id, position, question_text, option_a, option_b, option_c, correct_answer";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            task_id: row.get(1)?,
            position: row.get(2)?,
            question_text: row.get(3)?,
            option_a: row.get(4)?,
            option_b: row.get(5)?,
            option_c: row.get(6)?,
            correct_answer: row.get(7)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EcoTask {
    pub id: String,
    pub title: String,
    pub description: String,
    pub points_reward: i64,
    pub task_type: TaskType,
    pub created_at: String,
    pub questions: Vec<QuizQuestion>,
}

impl EcoTask {
    pub const COLUMNS: &'static str =
        "id, title, description, points_reward, task_type, created_at";

    /// Maps a task row; questions are attached by the caller.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            points_reward: row.get(3)?,
            task_type: row.get(4)?,
            created_at: row.get(5)?,
            questions: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub student_id: String,
    pub task_id: String,
    pub submission_data: String,
    pub status: SubmissionStatus,
    pub submitted_at: String,
    pub reviewed_at: Option<String>,
}

impl Submission {
    pub const COLUMNS: &'static str =
        "id, student_id, task_id, submission_data, status, submitted_at, reviewed_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            student_id: row.get(1)?,
            task_id: row.get(2)?,
            submission_data: row.get(3)?,
            status: row.get(4)?,
            submitted_at: row.get(5)?,
            reviewed_at: row.get(6)?,
        })
    }
}

/// Pending submission as shown in a teacher's review queue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSubmission {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub task_id: String,
    pub task_title: String,
    pub submission_data: String,
    pub submitted_at: String,
}
