pub mod core;
pub mod leaderboard;
pub mod students;
pub mod submissions;
pub mod tasks;
