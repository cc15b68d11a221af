use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use crate::badges::{ECO_WARRIOR, FIRST_STEPS, QUIZ_WHIZ};
use crate::db::write_tx;
use crate::models::{AnswerOption, TaskType};
use crate::tasks::{self, NewQuestion, NewTask};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub badges: usize,
    pub tasks: usize,
}

fn default_badges() -> [(&'static str, &'static str, &'static str); 3] {
    [
        (FIRST_STEPS, "Complete your first task!", "🦶"),
        (
            ECO_WARRIOR,
            "Get your first photo submission approved!",
            "🛡️",
        ),
        (QUIZ_WHIZ, "Ace your first quiz!", "🧠"),
    ]
}

fn default_tasks() -> Vec<NewTask> {
    vec![
        NewTask {
            title: "Waste Segregation Champion".into(),
            description: "Upload a photo of your segregated wet and dry waste bins at home.".into(),
            points_reward: 50,
            task_type: TaskType::PhotoUpload,
            questions: vec![],
        },
        NewTask {
            title: "Tree Planting Hero".into(),
            description: "Plant a sapling in your neighborhood and upload a geotagged photo."
                .into(),
            points_reward: 100,
            task_type: TaskType::PhotoUpload,
            questions: vec![],
        },
        NewTask {
            title: "Water Saver Quiz".into(),
            description: "Answer these questions about water conservation.".into(),
            points_reward: 25,
            task_type: TaskType::Quiz,
            questions: vec![
                NewQuestion {
                    question_text: "How much of Earth's water is fresh water?".into(),
                    option_a: "10%".into(),
                    option_b: "3%".into(),
                    option_c: "30%".into(),
                    correct_answer: AnswerOption::B,
                },
                NewQuestion {
                    question_text: "What is the best way to save water at home?".into(),
                    option_a: "Take shorter showers".into(),
                    option_b: "Only wash full loads of laundry".into(),
                    option_c: "Both A and B".into(),
                    correct_answer: AnswerOption::C,
                },
            ],
        },
    ]
}

fn count(conn: &Connection, table: &str) -> rusqlite::Result<i64> {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
}

/// Seeds the badge catalog and the default tasks when their tables are empty.
/// Running it again on a seeded workspace writes nothing.
pub fn ensure_initial_data(conn: &Connection) -> anyhow::Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    // Counts and inserts share one write transaction, so concurrent openers of a fresh
    // workspace seed it exactly once.
    let tx = write_tx(conn)?;
    if count(&tx, "badges")? == 0 {
        for (name, description, icon) in default_badges() {
            tx.execute(
                "INSERT INTO badges(id, name, description, icon) VALUES(?, ?, ?, ?)",
                (Uuid::new_v4().to_string(), name, description, icon),
            )?;
            summary.badges += 1;
        }
    }
    if count(&tx, "eco_tasks")? == 0 {
        for task in default_tasks() {
            tasks::insert_task(&tx, &task)?;
            summary.tasks += 1;
        }
    }
    tx.commit()?;

    if summary != SeedSummary::default() {
        info!(target: "seed", badges = summary.badges, tasks = summary.tasks, "catalog seeded");
    }
    Ok(summary)
}
